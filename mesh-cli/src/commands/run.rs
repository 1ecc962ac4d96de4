//! Run a scenario against a Cirque service.

use anyhow::{Context, Result};
use mesh_harness::{scenario, CirqueClient, HarnessConfig, ScenarioDriver, TestResult, VirtualHome};
use std::path::{Path, PathBuf};

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "meshbed.toml";

/// Command line overrides for a run.
#[derive(Debug, Default)]
pub struct RunOptions {
    /// Explicit config file.
    pub config: Option<PathBuf>,
    /// Cirque base URL.
    pub cirque_url: Option<String>,
    /// Device log directory.
    pub log_dir: Option<PathBuf>,
    /// Skip log archiving.
    pub no_save_logs: bool,
}

/// Build the effective configuration: file, then `DEVICE_LOG_DIR`, then flags.
pub fn load_config(options: &RunOptions) -> Result<HarnessConfig> {
    let config = match &options.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            HarnessConfig::from_file(Path::new(DEFAULT_CONFIG_FILE))?
        }
        None => HarnessConfig::default(),
    };
    Ok(apply_flags(config.with_env_overrides(), options))
}

fn apply_flags(mut config: HarnessConfig, options: &RunOptions) -> HarnessConfig {
    if let Some(url) = &options.cirque_url {
        config.cirque.url = url.clone();
    }
    if let Some(dir) = &options.log_dir {
        config.logs.dir = Some(dir.clone());
    }
    if options.no_save_logs {
        config.logs.save = false;
    }
    config
}

/// Run the run command.
pub async fn run(name: &str, options: &RunOptions) -> Result<TestResult> {
    let scenario = scenario::find(name).with_context(|| format!("Unknown scenario: {}", name))?;
    let config = load_config(options)?;

    tracing::info!("Running {} against {}", scenario.name, config.cirque.url);
    let backend =
        CirqueClient::new(config.cirque_config()).context("Failed to create Cirque client")?;
    let home = VirtualHome::new(backend, config.home_settings());

    let mut driver = ScenarioDriver::new(scenario, home);
    let result = driver.run_test(config.log_dir()).await;

    println!("{}: {}", name, result);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[cirque]\nurl = \"http://from-file:5000\"\n\n[logs]\ndir = \"/from/file\""
        )
        .unwrap();

        let options = RunOptions {
            config: Some(file.path().to_path_buf()),
            cirque_url: Some("http://from-flag:5000".into()),
            ..RunOptions::default()
        };
        let config = apply_flags(HarnessConfig::from_file(file.path()).unwrap(), &options);
        assert_eq!(config.cirque.url, "http://from-flag:5000");
        assert_eq!(config.log_dir(), Some(Path::new("/from/file")));

        let options = RunOptions {
            log_dir: Some(PathBuf::from("/from/flag")),
            no_save_logs: true,
            ..RunOptions::default()
        };
        let config = apply_flags(HarnessConfig::default(), &options);
        assert_eq!(config.logs.dir.as_deref(), Some(Path::new("/from/flag")));
        assert_eq!(config.log_dir(), None);
    }

    #[test]
    fn missing_explicit_config_is_error() {
        let options = RunOptions {
            config: Some(PathBuf::from("/nonexistent/meshbed.toml")),
            ..RunOptions::default()
        };
        assert!(load_config(&options).is_err());
    }

    #[tokio::test]
    async fn unknown_scenario_is_error() {
        assert!(run("nope", &RunOptions::default()).await.is_err());
    }
}
