use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::define::Define;
use crate::error::{InjectError, Result};

/// Whatever the host build tool hands us to register definitions on
pub trait BuildEnv {
    fn append_defines(&mut self, defines: Vec<Define>);

    /// Textual state of the environment for the debug log
    fn dump(&self) -> String;
}

/// Build environment of the firmware project.
///
/// Definitions are only ever appended.
#[derive(Debug, Clone, Default)]
pub struct ProjectEnv {
    defines: Vec<Define>,
    config_path: Option<PathBuf>,
    config_sha256: Option<String>,
    target: Option<&'static str>,
}

#[derive(Serialize)]
struct EnvDump<'a> {
    tool: &'static str,
    version: &'static str,
    config_path: Option<String>,
    config_sha256: Option<&'a str>,
    target: Option<&'static str>,
    #[serde(rename = "CPPDEFINES")]
    cppdefines: Vec<Value>,
}

impl ProjectEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember which configuration file fed this environment
    pub fn record_source(&mut self, path: &Path, bytes: &[u8]) {
        self.config_path = Some(path.to_path_buf());
        self.config_sha256 = Some(fingerprint(bytes));
    }

    pub fn set_target(&mut self, target: &'static str) {
        self.target = Some(target);
    }

    pub fn defines(&self) -> &[Define] {
        &self.defines
    }

    pub fn config_path(&self) -> Option<&Path> {
        self.config_path.as_deref()
    }

    pub fn config_sha256(&self) -> Option<&str> {
        self.config_sha256.as_deref()
    }
}

impl BuildEnv for ProjectEnv {
    fn append_defines(&mut self, defines: Vec<Define>) {
        for define in &defines {
            debug!("CPPDEFINES += {}", define);
        }
        self.defines.extend(defines);
    }

    fn dump(&self) -> String {
        // flags dump as a bare name, valued ones as [name, body]
        let cppdefines = self
            .defines
            .iter()
            .map(|d| match d.macro_body() {
                Some(body) => Value::from(vec![Value::from(d.name), Value::from(body)]),
                None => Value::from(d.name),
            })
            .collect();

        let dump = EnvDump {
            tool: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            config_path: self.config_path.as_ref().map(|p| p.display().to_string()),
            config_sha256: self.config_sha256.as_deref(),
            target: self.target,
            cppdefines,
        };
        // a struct of strings and arrays cannot fail to serialize
        serde_json::to_string_pretty(&dump).unwrap_or_default()
    }
}

/// Hex SHA-256 of the raw configuration bytes
pub fn fingerprint(bytes: &[u8]) -> String {
    Sha256::digest(bytes)
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Write the environment dump to `path`, creating its directory and
/// replacing any previous log.
pub fn write_dump(env: &impl BuildEnv, path: &Path) -> Result<()> {
    info!("Project environment dump at {}", path.display());
    write_file(path, env.dump())
}

/// Create the parent directory of `path` if needed, then replace the file
pub(crate) fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|err| InjectError::filesystem(dir, err))?;
    }
    fs::write(path, contents).map_err(|err| InjectError::filesystem(path, err))
}
