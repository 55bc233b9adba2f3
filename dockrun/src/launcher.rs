use std::{
    collections::{BTreeMap, BTreeSet},
    future::Future,
    io::Write,
    sync::Arc,
    time::Duration,
};

use futures::TryStreamExt;
use tracing::{debug, info, warn};

use crate::{
    config::LaunchConfig,
    engine::{docker::Docker, ContainerSpec, Engine, EngineError, Inspection},
    error::LaunchError,
};

/// Starts disposable containers on an engine
#[derive(Clone)]
pub struct Launcher {
    engine: Arc<dyn Engine>,
}

impl Launcher {
    pub fn new(engine: impl Engine + 'static) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    pub fn from_arc(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Launcher for the local docker daemon
    pub fn docker() -> Result<Self, EngineError> {
        Ok(Self::new(Docker::connect()?))
    }

    /// Pulls `image`, then creates, starts and inspects a container from it.
    ///
    /// Every step has to succeed before the next one runs. Once the
    /// container exists it is owned by the returned [`Container`]: if start or
    /// inspect fails it is removed again before the error is returned, and if
    /// this future is dropped halfway the removal is spawned in the background.
    pub async fn launch(&self, image: &str, config: LaunchConfig) -> Result<Container, LaunchError> {
        let reference = config.reference(image);
        let LaunchConfig {
            mut progress,
            timeout,
            ..
        } = config;

        info!("pulling {}", reference);
        bounded(timeout, "pull", self.pull(&reference, &mut progress)).await?;

        let id = bounded(timeout, "create", async {
            self.engine
                .create_container(ContainerSpec::disposable(&reference))
                .await
                .map_err(LaunchError::Create)
        })
        .await?;
        debug!("created {} from {}", id, reference);

        let mut container = Container {
            engine: self.engine.clone(),
            id,
            ports: Ports::default(),
            armed: true,
        };

        if let Err(err) = self.start(&mut container, timeout).await {
            warn!("launching {} failed, removing {}", reference, container.id);
            cleanup(&mut container, timeout).await;
            return Err(err);
        }

        info!(
            "{} running as {} with ports {:?}",
            reference,
            container.id,
            container.ports.declared()
        );

        Ok(container)
    }

    /// Drains the whole pull stream into the progress sink
    async fn pull(&self, reference: &str, progress: &mut impl Write) -> Result<(), LaunchError> {
        let mut stream = self.engine.pull_image(reference);

        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|source| LaunchError::Pull {
                reference: reference.to_string(),
                source,
            })?
        {
            progress.write_all(&chunk).map_err(LaunchError::Progress)?;
        }

        progress.flush().map_err(LaunchError::Progress)
    }

    async fn start(
        &self,
        container: &mut Container,
        timeout: Option<Duration>,
    ) -> Result<(), LaunchError> {
        let id = container.id.clone();

        bounded(timeout, "start", async {
            self.engine
                .start_container(&id)
                .await
                .map_err(|source| LaunchError::Start {
                    id: id.clone(),
                    source,
                })
        })
        .await?;

        let inspection = bounded(timeout, "inspect", async {
            self.engine
                .inspect_container(&id)
                .await
                .map_err(|source| LaunchError::Inspect {
                    id: id.clone(),
                    source,
                })
        })
        .await?;

        container.ports = Ports::from(inspection);
        Ok(())
    }
}

/// Removes a container whose launch failed, logging instead of failing
async fn cleanup(container: &mut Container, timeout: Option<Duration>) {
    let removal = container.discard();
    let result = match timeout {
        None => removal.await,
        Some(limit) => match tokio::time::timeout(limit, removal).await {
            Ok(result) => result,
            Err(_) => {
                // still armed, dropping it retries in the background
                warn!("removing {} did not finish within {:?}", container.id, limit);
                return;
            }
        },
    };

    if let Err(e) = result {
        warn!("could not remove {}: {}", container.id, e);
    }
}

async fn bounded<T>(
    timeout: Option<Duration>,
    operation: &'static str,
    fut: impl Future<Output = Result<T, LaunchError>>,
) -> Result<T, LaunchError> {
    match timeout {
        None => fut.await,
        Some(timeout) => tokio::time::timeout(timeout, fut)
            .await
            .map_err(|_| LaunchError::Timeout { operation, timeout })?,
    }
}

/// A running container that was started by [`Launcher::launch`]
///
/// Call [`Container::stop`] when done. Dropping it instead spawns a forced
/// removal on the current tokio runtime, which only gets to run if that
/// runtime stays alive long enough.
pub struct Container {
    engine: Arc<dyn Engine>,
    id: String,
    ports: Ports,
    armed: bool,
}

impl Container {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Ports the image declares, with the host ports they were published on
    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// Stops the container, the engine removes it afterwards
    pub async fn stop(mut self) -> Result<(), LaunchError> {
        info!("stopping {}", self.id);

        let result = self.engine.stop_container(&self.id).await;
        self.armed = false;

        result.map_err(|source| LaunchError::Stop {
            id: self.id.clone(),
            source,
        })
    }

    async fn discard(&mut self) -> Result<(), EngineError> {
        let result = self.engine.remove_container(&self.id).await;
        self.armed = false;
        result
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("{} dropped outside of a runtime, leaving it running", self.id);
            return;
        };

        debug!("{} dropped without stop, removing it", self.id);
        let engine = self.engine.clone();
        let id = std::mem::take(&mut self.id);
        runtime.spawn(async move {
            if let Err(e) = engine.remove_container(&id).await {
                warn!("could not remove {}: {}", id, e);
            }
        });
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

/// Container ports, keyed by what the image declares (`6379/tcp`)
///
/// Iterating yields the declared ports. The host side of a port, the number
/// to actually connect to, comes from [`Ports::host_port`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Ports {
    declared: BTreeSet<String>,
    published: BTreeMap<String, Vec<u16>>,
}

impl Ports {
    pub fn declared(&self) -> &BTreeSet<String> {
        &self.declared
    }

    pub fn contains(&self, port: &str) -> bool {
        self.declared.contains(port)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.declared.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.declared.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declared.is_empty()
    }

    /// First host port `port` was published on
    pub fn host_port(&self, port: &str) -> Option<u16> {
        self.host_ports(port).first().copied()
    }

    pub fn host_ports(&self, port: &str) -> &[u16] {
        self.published.get(port).map(Vec::as_slice).unwrap_or_default()
    }
}

impl From<Inspection> for Ports {
    fn from(inspection: Inspection) -> Self {
        Self {
            declared: inspection.exposed_ports.into_iter().collect(),
            published: inspection.published,
        }
    }
}

impl<'a> IntoIterator for &'a Ports {
    type Item = &'a str;
    type IntoIter = Box<dyn Iterator<Item = &'a str> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
