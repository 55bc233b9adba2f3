use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, InspectContainerOptions, RemoveContainerOptions,
    StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::service::{ContainerInspectResponse, CreateImageInfo, HostConfig};
use futures::StreamExt;
use tracing::debug;

use super::{ContainerSpec, Engine, EngineError, Inspection, ProgressStream};

/// The local docker daemon, reached through the engine API
#[derive(Clone)]
pub struct Docker {
    docker: bollard::Docker,
}

impl Docker {
    /// Connects using the local defaults (unix socket, or `DOCKER_HOST`)
    pub fn connect() -> Result<Self, EngineError> {
        let docker = bollard::Docker::connect_with_local_defaults()?;
        Ok(Self::from_client(docker))
    }

    pub fn from_client(docker: bollard::Docker) -> Self {
        Self { docker }
    }
}

#[async_trait]
impl Engine for Docker {
    fn pull_image(&self, reference: &str) -> ProgressStream<'_> {
        debug!("pulling {}", reference);

        let (from_image, tag) = split_reference(reference);
        let options = CreateImageOptions {
            from_image: from_image.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        self.docker
            .create_image(Some(options), None, None)
            .map(|info| info.and_then(progress_line))
            .boxed()
    }

    async fn create_container(&self, spec: ContainerSpec) -> Result<String, EngineError> {
        let config = Config {
            image: Some(spec.image),
            host_config: Some(HostConfig {
                auto_remove: Some(spec.auto_remove),
                publish_all_ports: Some(spec.publish_all_ports),
                ..Default::default()
            }),
            ..Default::default()
        };

        // no name, the engine picks one
        let container = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await?;

        Ok(container.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker.start_container::<String>(id, None).await
    }

    async fn inspect_container(&self, id: &str) -> Result<Inspection, EngineError> {
        let response = self
            .docker
            .inspect_container(id, None::<InspectContainerOptions>)
            .await?;

        Ok(inspection(response))
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .stop_container(id, None::<StopContainerOptions>)
            .await
    }

    async fn remove_container(&self, id: &str) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };

        self.docker.remove_container(id, Some(options)).await
    }
}

/// Splits `name[:tag|@digest]` for the pull request
///
/// An empty tag would make the daemon pull every tag of the repository, so a
/// bare name gets `latest` like the docker cli does.
fn split_reference(reference: &str) -> (&str, &str) {
    if let Some((name, digest)) = reference.split_once('@') {
        return (name, digest);
    }

    // a ':' before the last '/' belongs to a registry port
    let name_start = reference.rfind('/').map(|i| i + 1).unwrap_or(0);
    match reference[name_start..].rfind(':') {
        Some(i) => {
            let colon = name_start + i;
            (&reference[..colon], &reference[colon + 1..])
        }
        None => (reference, "latest"),
    }
}

/// Re-encodes a progress record the way the daemon streamed it (json lines)
fn progress_line(info: CreateImageInfo) -> Result<Vec<u8>, EngineError> {
    // the daemon reports some pull failures in-band
    if let Some(error) = info.error {
        return Err(EngineError::DockerStreamError { error });
    }

    let mut line = serde_json::to_vec(&info).map_err(|e| EngineError::DockerStreamError {
        error: e.to_string(),
    })?;
    line.push(b'\n');

    Ok(line)
}

fn inspection(response: ContainerInspectResponse) -> Inspection {
    let mut exposed_ports: Vec<String> = response
        .config
        .and_then(|c| c.exposed_ports)
        .map(|ports| ports.into_keys().collect())
        .unwrap_or_default();
    exposed_ports.sort();

    let mut inspection = Inspection {
        exposed_ports,
        ..Default::default()
    };

    let bindings = response
        .network_settings
        .and_then(|n| n.ports)
        .unwrap_or_default();

    for (port, bindings) in bindings {
        let mut host_ports: Vec<u16> = bindings
            .unwrap_or_default()
            .into_iter()
            .filter_map(|b| b.host_port)
            .filter_map(|p| p.parse().ok())
            .collect();

        // ipv4 and ipv6 bindings usually share the host port
        host_ports.sort_unstable();
        host_ports.dedup();

        if !host_ports.is_empty() {
            inspection.published.insert(port, host_ports);
        }
    }

    inspection
}
