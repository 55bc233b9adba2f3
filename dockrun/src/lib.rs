//! Throwaway containers for tests: pull an image, run it with every declared
//! port published, read back the ports, stop it again.
//!
//! ```no_run
//! # async fn example() -> Result<(), dockrun::LaunchError> {
//! let redis = dockrun::run("redis", dockrun::LaunchConfig::default()).await?;
//! let port = redis.ports().host_port("6379/tcp");
//! // ... talk to localhost:{port}
//! redis.stop().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod launcher;

pub use config::{LaunchConfig, DEFAULT_IMAGE_PREFIX};
pub use engine::{docker::Docker, Engine, EngineError};
pub use error::LaunchError;
pub use launcher::{Container, Launcher, Ports};

/// Launches `image` on the local docker daemon
///
/// Connects on every call, use a [`Launcher`] to share one connection.
pub async fn run(image: &str, config: LaunchConfig) -> Result<Container, LaunchError> {
    let launcher = Launcher::docker().map_err(LaunchError::Connect)?;
    launcher.launch(image, config).await
}
