pub mod docker;
#[cfg(test)]
pub(crate) mod fake;

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;

pub use bollard::errors::Error as EngineError;

/// Raw pull progress, one serialized progress record per item
pub type ProgressStream<'a> = BoxStream<'a, Result<Vec<u8>, EngineError>>;

/// What we ask the engine to create
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Fully qualified image reference
    pub image: String,
    /// Delete the container once it stops
    pub auto_remove: bool,
    /// Publish every declared port on an ephemeral host port
    pub publish_all_ports: bool,
}

impl ContainerSpec {
    pub fn disposable(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            auto_remove: true,
            publish_all_ports: true,
        }
    }
}

/// The parts of a container inspection we care about
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inspection {
    /// Declared exposed ports, e.g. `6379/tcp`
    pub exposed_ports: Vec<String>,
    /// Host ports each container port got published on
    pub published: BTreeMap<String, Vec<u16>>,
}

/// - Pulls images
/// - Drives the container lifecycle (create, start, inspect, stop, remove)
///
/// The handle keeps no local bookkeeping, so one instance can be shared by
/// any number of concurrent launches.
#[async_trait]
pub trait Engine: Send + Sync {
    fn pull_image(&self, reference: &str) -> ProgressStream<'_>;
    async fn create_container(&self, spec: ContainerSpec) -> Result<String, EngineError>;
    async fn start_container(&self, id: &str) -> Result<(), EngineError>;
    async fn inspect_container(&self, id: &str) -> Result<Inspection, EngineError>;
    /// No grace period is passed, the engine uses its own default
    async fn stop_container(&self, id: &str) -> Result<(), EngineError>;
    /// Kills (if needed) and deletes the container, whatever state it is in
    async fn remove_container(&self, id: &str) -> Result<(), EngineError>;
}
