use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::{InjectError, Result};
use crate::host::Target;

pub const DEFAULT_CONFIG_PATH: &str = "mqtt_config.json";
pub const DEFAULT_LOG_PATH: &str = "logs/buildlog.log";
pub const DOTENV_FILE: &str = ".env";

pub const CONFIG_PATH_VAR: &str = "MQTT_CONFIG_PATH";
pub const LOG_PATH_VAR: &str = "MQTT_BUILDLOG_PATH";
pub const TARGET_VAR: &str = "MQTT_INJECT_TARGET";
pub const OUTPUT_VAR: &str = "MQTT_INJECT_OUTPUT";

/// Where to read from and where to write to for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config_path: PathBuf,
    /// `None` disables the environment dump
    pub log_path: Option<PathBuf>,
    pub target: Target,
    /// `None` means stdout
    pub output: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            log_path: Some(PathBuf::from(DEFAULT_LOG_PATH)),
            target: Target::default(),
            output: None,
        }
    }
}

pub const USAGE: &str = "\
usage: mqtt-config-inject [--config PATH] [--log PATH | --no-dump]
                          [--target flags|header|cargo] [--output PATH]";

impl Settings {
    /// Settings for a real run: `.env` in the working directory, then the
    /// process environment, then command-line arguments.
    pub fn from_env_and_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        Self::layered(Path::new(DOTENV_FILE), |key| std::env::var(key).ok(), args)
    }

    /// Defaults, overridden by `dotenv_path`, overridden by `process`,
    /// overridden by `args`.
    pub fn layered<F, I>(dotenv_path: &Path, process: F, args: I) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
        I: IntoIterator<Item = String>,
    {
        let dotenv = read_dotenv(dotenv_path);
        let mut settings =
            Self::from_vars(|key| process(key).or_else(|| dotenv.get(key).cloned()))?;
        settings.apply_args(args)?;
        debug!("Settings: {:?}", settings);
        Ok(settings)
    }

    /// Defaults overridden by whatever `lookup` finds
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self::default();
        if let Some(path) = lookup(CONFIG_PATH_VAR) {
            settings.config_path = path.into();
        }
        if let Some(path) = lookup(LOG_PATH_VAR) {
            settings.log_path = Some(path.into());
        }
        if let Some(target) = lookup(TARGET_VAR) {
            settings.target = target.parse()?;
        }
        if let Some(path) = lookup(OUTPUT_VAR) {
            settings.output = Some(path.into());
        }
        Ok(settings)
    }

    pub fn apply_args<I>(&mut self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = String>,
    {
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => self.config_path = value_for(&arg, args.next())?.into(),
                "--log" => self.log_path = Some(value_for(&arg, args.next())?.into()),
                "--no-dump" => self.log_path = None,
                "--target" => self.target = value_for(&arg, args.next())?.parse()?,
                "--output" => self.output = Some(value_for(&arg, args.next())?.into()),
                other => {
                    return Err(InjectError::Usage(format!(
                        "unexpected argument '{other}'\n{USAGE}"
                    )))
                }
            }
        }
        Ok(())
    }
}

/// Pairs from a `.env` file without touching the process environment.
/// A missing file is normal; an unreadable one is skipped with a warning.
fn read_dotenv(path: &Path) -> HashMap<String, String> {
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter
            .filter_map(|item| {
                item.map_err(|err| warn!("Skipping line in {}: {}", path.display(), err))
                    .ok()
            })
            .collect(),
        Err(err) => {
            if !err.not_found() {
                warn!("Ignoring unreadable {}: {}", path.display(), err);
            }
            HashMap::new()
        }
    }
}

fn value_for(flag: &str, value: Option<String>) -> Result<String> {
    value.ok_or_else(|| InjectError::Usage(format!("{flag} needs a value\n{USAGE}")))
}
