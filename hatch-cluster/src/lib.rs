//! Cluster-consistent workspace status cache
//!
//! Every node of a multi-master deployment must answer "is workspace X
//! running?" identically. The cache is a replicated map keyed by workspace
//! id, mutated only through CAS-style primitives, with a subscription
//! mechanism that delivers status changes originating from any cluster
//! member. The replication transport sits behind [`group::StatusGroup`];
//! the in-process implementation here serves single-process clusters and
//! tests, while consensus- or gossip-backed transports implement the same
//! seam.

pub mod cache;
pub mod error;
pub mod group;

pub use cache::{ClusterStatusCache, ReplicatedStatusMap};
pub use error::{ClusterError, Result};
pub use group::StatusGroup;
