use anyhow::{Context, Result};
use mqtt_config_inject::{run, Settings};

fn main() -> Result<()> {
    // stdout carries the rendered flags, so logging stays on stderr
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let settings = Settings::from_env_and_args(std::env::args().skip(1))?;
    log::info!("=== MQTT config injection ({}) ===", settings.target.name());

    let env = run(&settings, &mut std::io::stdout().lock())
        .with_context(|| format!("injecting {}", settings.config_path.display()))?;

    log::info!("Injected {} definitions", env.defines().len());
    Ok(())
}
