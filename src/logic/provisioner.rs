use crate::model::{CloudError, OperationDocument, ResourceDocument};

/// Hand-off of accepted mutations to the orchestration backend.
///
/// The backend reports the outcome later through
/// `MutationOrchestrator::finish_operation`.
#[async_trait::async_trait]
pub trait ClusterProvisioner: Send + Sync {
    async fn submit(
        &self,
        resource: &ResourceDocument,
        operation: &OperationDocument,
    ) -> Result<(), CloudError>;
}

/// Provisioner for deployments where the backend polls the operations
/// partition for pending work. Submission only logs.
#[derive(Debug, Clone, Default)]
pub struct LoggingProvisioner;

#[async_trait::async_trait]
impl ClusterProvisioner for LoggingProvisioner {
    async fn submit(
        &self,
        resource: &ResourceDocument,
        operation: &OperationDocument,
    ) -> Result<(), CloudError> {
        log::info!(
            "submitted {:?} of {} as operation {} (provisioning state {:?})",
            operation.request,
            resource.id,
            operation.id,
            resource.provisioning_state
        );
        Ok(())
    }
}
