pub mod mutation;
pub mod operations;
pub mod provisioner;
pub mod retry;

pub use mutation::{MutationMethod, MutationOrchestrator, MutationResponse};
pub use operations::{Completion, OperationTracker};
pub use provisioner::{ClusterProvisioner, LoggingProvisioner};
pub use retry::{retry_with_backoff, RetryConfig, Transient};
