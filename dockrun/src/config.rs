use std::{fmt, io::Write, time::Duration};

/// Prefix used when none is given, images resolve against docker hub
pub const DEFAULT_IMAGE_PREFIX: &str = "docker.io/library/";

/// How a launch is carried out
///
/// ```
/// use dockrun::LaunchConfig;
/// use std::time::Duration;
///
/// let config = LaunchConfig::default()
///     .with_image_prefix("ghcr.io/acme/")
///     .with_timeout(Duration::from_secs(60));
/// assert_eq!(config.image_prefix, "ghcr.io/acme/");
/// ```
pub struct LaunchConfig {
    /// Prepended to the image name, defaults to [`DEFAULT_IMAGE_PREFIX`]
    pub image_prefix: String,

    /// Receives the raw pull progress, discarded by default
    ///
    /// Written to with blocking calls from inside the launch future, so a
    /// slow sink stalls the runtime worker driving it. Buffer in memory or
    /// use something quick like stderr.
    pub progress: Box<dyn Write + Send>,

    /// Upper bound for every single engine request, unbounded by default
    pub timeout: Option<Duration>,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            image_prefix: DEFAULT_IMAGE_PREFIX.to_string(),
            progress: Box::new(std::io::sink()),
            timeout: None,
        }
    }
}

impl LaunchConfig {
    pub fn with_image_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.image_prefix = prefix.into();
        self
    }

    pub fn with_progress(mut self, out: impl Write + Send + 'static) -> Self {
        self.progress = Box::new(out);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// The fully qualified reference that gets pulled and run
    pub fn reference(&self, image: &str) -> String {
        format!("{}{}", self.image_prefix, image)
    }
}

impl fmt::Debug for LaunchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LaunchConfig")
            .field("image_prefix", &self.image_prefix)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
