//! Throttled workspace activity reporting
//!
//! Every inbound unit of work touching a workspace calls
//! [`ActivityNotifier::on_activity`]; the notifier bounds the resulting
//! control-plane traffic to at most one notification per threshold window,
//! with a periodic flush so activity near the end of a window is never
//! lost. Delivery failures are logged and contained; they never fail the
//! request that triggered them.

pub mod client;
pub mod notifier;

pub use client::{ActivityClient, HttpActivityClient, NotifyError};
pub use notifier::ActivityNotifier;
