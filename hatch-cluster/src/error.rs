use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClusterError>;

#[derive(Error, Debug)]
pub enum ClusterError {
    /// Joining the replication group failed. Fatal at node startup: a node
    /// without a cluster-wide view must not answer status queries.
    #[error("Cannot join replication group '{0}': group is closed")]
    Unavailable(String),
}
