//! Load the layered configuration and print it with secrets masked.
//!
//! Usage: `service-desk-config [CONFIG_DIR] [ENVIRONMENT]`

use anyhow::Context;
use std::path::PathBuf;

use service_desk_core::config::ConfigManager;
use service_desk_core::logging::init_structured_logging;

fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let config_dir = args.next().map(PathBuf::from);
    let environment = args
        .next()
        .unwrap_or_else(ConfigManager::detect_environment);

    let manager = ConfigManager::load_from_directory_with_env(config_dir, &environment)
        .with_context(|| format!("loading configuration for environment '{environment}'"))?;

    init_structured_logging(&manager.config().logging);

    println!(
        "Configuration for '{}' from {}:",
        manager.environment(),
        manager.config_directory().display()
    );
    println!("{}", serde_json::to_string_pretty(&manager.debug_config())?);

    Ok(())
}
