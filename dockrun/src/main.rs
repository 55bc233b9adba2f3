use std::time::Duration;

use anyhow::Context;
use dockrun::{LaunchConfig, Launcher, Ports};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(argh::FromArgs)]
/// run a throwaway container until ctrl-c
struct Arguments {
    #[argh(positional)]
    /// image to run, e.g. redis or postgres:16
    image: String,

    #[argh(
        option,
        short = 'p',
        default = "String::from(dockrun::DEFAULT_IMAGE_PREFIX)"
    )]
    /// prepended to the image name
    prefix: String,

    #[argh(option, short = 't')]
    /// seconds a single docker request may take
    timeout: Option<u64>,

    #[argh(switch)]
    /// print pull progress to stderr
    progress: bool,
}

fn print_ports(ports: &Ports) {
    for port in ports {
        let host: Vec<_> = ports
            .host_ports(port)
            .iter()
            .map(u16::to_string)
            .collect();

        if host.is_empty() {
            println!("{port}");
        } else {
            println!("{port} -> {}", host.join(","));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let Arguments {
        image,
        prefix,
        timeout,
        progress,
    } = argh::from_env();

    let mut config = LaunchConfig::default().with_image_prefix(prefix);
    if progress {
        config = config.with_progress(std::io::stderr());
    }
    if let Some(secs) = timeout {
        config = config.with_timeout(Duration::from_secs(secs));
    }

    let launcher = Launcher::docker().context("failed to connect to docker")?;
    let container = launcher
        .launch(&image, config)
        .await
        .with_context(|| format!("failed to launch {image}"))?;

    println!("{}", container.id());
    print_ports(container.ports());

    info!("running, ctrl-c to stop");
    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for ctrl-c")?;

    container.stop().await?;

    Ok(())
}
