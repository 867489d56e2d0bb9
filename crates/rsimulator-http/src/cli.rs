use std::path::PathBuf;

use clap::Parser;

use crate::config::Config;

/// Serve canned responses for requests matching stored templates.
#[derive(Parser, Debug, Default)]
#[command(name = "rsimulator-http", version)]
pub struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "RSIMULATOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Template directory
    #[arg(short, long, env = "RSIMULATOR_ROOT")]
    pub root: Option<PathBuf>,

    /// Listen address (IP)
    #[arg(long, env = "RSIMULATOR_HOST")]
    pub host: Option<String>,

    #[arg(short, long, env = "RSIMULATOR_PORT")]
    pub port: Option<u16>,

    /// Memoize lookups
    #[arg(long, env = "RSIMULATOR_CACHE")]
    pub cache: bool,

    /// Maximum number of memoized lookups
    #[arg(long, env = "RSIMULATOR_CACHE_SIZE")]
    pub cache_size: Option<usize>,

    /// Do not run request/response scripts
    #[arg(long, env = "RSIMULATOR_NO_SCRIPTS")]
    pub no_scripts: bool,

    /// Allow `x-rsimulator-debug: true` requests to list every candidate
    #[arg(long, env = "RSIMULATOR_DIAGNOSTICS")]
    pub diagnostics: bool,

    #[arg(long, env = "RSIMULATOR_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    /// Configuration file (or defaults) with command line overrides applied,
    /// then validated.
    pub fn load_config(&self) -> Result<Config, anyhow::Error> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if let Some(root) = &self.root {
            config.root_path = Some(root.clone());
        }
        if let Some(host) = &self.host {
            config.listen.host = host.clone();
        }
        if let Some(port) = self.port {
            config.listen.port = port;
        }
        if self.cache {
            config.cache.enabled = true;
        }
        if let Some(size) = self.cache_size {
            config.cache.max_entries = size;
        }
        if self.no_scripts {
            config.scripting.enabled = false;
        }
        if self.diagnostics {
            config.diagnostics.enabled = true;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }

        config.validate()?;
        Ok(config)
    }
}
