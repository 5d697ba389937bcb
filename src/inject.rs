use std::io::Write;

use log::info;

use crate::config::{read_config, ProjectConfig};
use crate::env::{write_dump, write_file, BuildEnv, ProjectEnv};
use crate::error::{InjectError, Result};
use crate::resolve::resolve;
use crate::settings::Settings;

/// Resolve the configuration at `settings.config_path` into `env`.
///
/// Nothing is appended unless the whole parameter set resolves.
pub fn inject(settings: &Settings, env: &mut ProjectEnv) -> Result<()> {
    let path = settings.config_path.as_path();
    info!("Reading configuration from {}", path.display());

    let bytes = read_config(path)?;
    let config = ProjectConfig::from_slice(&bytes, path)?;
    let params = resolve(&config)?;

    env.record_source(path, &bytes);
    env.set_target(settings.target.name());
    env.append_defines(params.to_defines());
    Ok(())
}

/// One full pre-build run: inject, hand the result to the host, then dump.
///
/// The build log is only written once the host has received every
/// definition.
pub fn run(settings: &Settings, stdout: &mut impl Write) -> Result<ProjectEnv> {
    let mut env = ProjectEnv::new();
    inject(settings, &mut env)?;

    let rendered = settings.target.render(&env)?;
    match &settings.output {
        Some(path) => {
            write_file(path, rendered)?;
            info!("Wrote {} output to {}", settings.target.name(), path.display());
        }
        None => stdout
            .write_all(rendered.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(InjectError::Output)?,
    }

    if let Some(log_path) = &settings.log_path {
        write_dump(&env, log_path)?;
    }
    Ok(env)
}
