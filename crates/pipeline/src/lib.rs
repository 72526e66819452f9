//! The notification pipeline: the fixed chain of stages a single
//! `(route, group-key, receiver)` flush traverses, from inhibition and
//! silence muting through cluster-aware dedup to a retried notifier call.

pub mod cluster;
pub mod error;
pub mod retry;
pub mod runner;
pub mod stages;

pub use cluster::{ClusterView, SoloCluster};
pub use error::PipelineError;
pub use retry::RetryStrategy;
pub use runner::{FlushOutcome, NotificationPipeline};
