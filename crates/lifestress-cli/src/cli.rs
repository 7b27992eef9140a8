//! Command-line flags and configuration layering.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use lifestress_common::config::{BackendKind, StressConfig};

/// lifestress — concurrent container lifecycle stress harness.
#[derive(Parser, Debug)]
#[command(name = "lifestress", version, about, long_about = None)]
pub struct Cli {
    /// Template to use.
    #[arg(long, env = "LIFESTRESS_TEMPLATE")]
    pub template: Option<String>,

    /// Number of operations to run concurrently.
    #[arg(long, env = "LIFESTRESS_COUNT")]
    pub count: Option<usize>,

    /// Number of times to run the test.
    #[arg(long, env = "LIFESTRESS_ITERATION")]
    pub iteration: Option<usize>,

    /// Enable debug output.
    #[arg(long, env = "LIFESTRESS_DEBUG")]
    pub debug: bool,

    /// Exit non-zero if any lifecycle operation failed.
    #[arg(long, env = "LIFESTRESS_STRICT")]
    pub strict: bool,

    /// Runtime to drive.
    #[arg(long, value_enum, env = "LIFESTRESS_BACKEND")]
    pub backend: Option<BackendArg>,

    /// Prefix for container names (`{prefix}{index}`).
    #[arg(long, env = "LIFESTRESS_NAME_PREFIX")]
    pub name_prefix: Option<String>,

    /// Alternate LXC path.
    #[arg(long, env = "LIFESTRESS_LXCPATH")]
    pub lxcpath: Option<PathBuf>,

    /// Latency added to each simulated operation, in milliseconds.
    #[arg(long = "delay-ms", env = "LIFESTRESS_DELAY_MS")]
    pub delay_ms: Option<u64>,

    /// JSON configuration file; flags override its values.
    #[arg(long, env = "LIFESTRESS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

/// Runtime selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    /// LXC command-line tools.
    Lxc,
    /// In-memory lifecycle model.
    Simulated,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Lxc => Self::Lxc,
            BackendArg::Simulated => Self::Simulated,
        }
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per line.
    Json,
}

impl Cli {
    /// Builds the run configuration: defaults, then the config file, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded or the result
    /// fails validation.
    pub fn resolve(&self) -> anyhow::Result<StressConfig> {
        let mut config = match &self.config {
            Some(path) => StressConfig::from_file(path)?,
            None => StressConfig::default(),
        };

        if let Some(template) = &self.template {
            config.template.clone_from(template);
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(iteration) = self.iteration {
            config.iteration = iteration;
        }
        if let Some(backend) = self.backend {
            config.backend = backend.into();
        }
        if let Some(prefix) = &self.name_prefix {
            config.name_prefix.clone_from(prefix);
        }
        if let Some(path) = &self.lxcpath {
            config.lxcpath = Some(path.clone());
        }
        if let Some(delay) = self.delay_ms {
            config.operation_delay_ms = delay;
        }
        config.debug |= self.debug;
        config.strict |= self.strict;

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn no_flags_yield_defaults() {
        let cli = Cli::try_parse_from(["lifestress"]).unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.template, "busybox");
        assert_eq!(config.count, 10);
        assert_eq!(config.iteration, 1);
        assert!(!config.debug);
        assert_eq!(cli.log_format, LogFormat::Text);
    }

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "lifestress",
            "--template",
            "alpine",
            "--count",
            "3",
            "--iteration",
            "2",
            "--debug",
            "--backend",
            "simulated",
        ])
        .unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.template, "alpine");
        assert_eq!(config.count, 3);
        assert_eq!(config.iteration, 2);
        assert!(config.debug);
        assert_eq!(config.backend, BackendKind::Simulated);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let body = serde_json::json!({ "template": "ubuntu", "count": 7, "strict": true });
        write!(file, "{body}").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let cli = Cli::try_parse_from(["lifestress", "--config", &path, "--count", "2"]).unwrap();
        let config = cli.resolve().unwrap();
        assert_eq!(config.template, "ubuntu");
        assert_eq!(config.count, 2);
        assert!(config.strict);
    }

    #[test]
    fn blank_template_is_rejected() {
        let cli = Cli::try_parse_from(["lifestress", "--template", ""]).unwrap();
        assert!(cli.resolve().is_err());
    }

    #[test]
    fn negative_count_is_a_parse_error() {
        assert!(Cli::try_parse_from(["lifestress", "--count", "-1"]).is_err());
    }

    #[test]
    fn unknown_backend_is_a_parse_error() {
        assert!(Cli::try_parse_from(["lifestress", "--backend", "docker"]).is_err());
    }
}
