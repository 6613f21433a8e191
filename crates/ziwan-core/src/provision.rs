use crate::space::Space;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct ProvisionError(pub String);

/// Hook run when a new space has been created, e.g. to create the
/// space-scoped picture table of a sharded deployment.
///
/// Implementations must be idempotent: the hook may run again for a space
/// that was already provisioned.
#[async_trait]
pub trait SpaceProvisioner: Send + Sync + 'static {
    async fn on_space_created(&self, space: &Space) -> Result<(), ProvisionError>;
}

/// When the coordinator invokes its [`SpaceProvisioner`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionMode {
    /// The hook is never called.
    #[default]
    Disabled,
    /// Called before commit; a failure rolls the space back.
    WithinTransaction,
    /// Called after commit; a failure is logged and the space is kept.
    AfterCommit,
}

/// A provisioner that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvisioner;

#[async_trait]
impl SpaceProvisioner for NoopProvisioner {
    async fn on_space_created(&self, _space: &Space) -> Result<(), ProvisionError> {
        Ok(())
    }
}
