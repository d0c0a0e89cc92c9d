pub mod docker;

use async_trait::async_trait;
use futures::stream::BoxStream;
use shared::types::{ContainerDescriptor, ContainerId, RuntimeEvent};
use thiserror::Error;

pub use docker::DockerRuntime;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("container {0} not found")]
    NotFound(ContainerId),
    #[error("container runtime error: {0}")]
    Api(String),
}

pub type EventStream = BoxStream<'static, Result<RuntimeEvent, RuntimeError>>;

/// The container runtime: listing, inspection and the lifecycle event stream.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Running containers carrying `label`
    async fn list_containers(&self, label: &str) -> Result<Vec<ContainerDescriptor>, RuntimeError>;

    async fn get_container(&self, id: &ContainerId) -> Result<ContainerDescriptor, RuntimeError>;

    /// Every event emitted from the moment of this call onward
    fn events(&self) -> EventStream;
}
