use std::error::Error;

use clap::Subcommand;

use crate::core::config::{path_display, Config, CONFIG_KEYS};

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Set a configuration value
    Set {
        /// One of base_url, chat_model, utility_model, request_timeout_secs, data_dir
        key: String,
        value: String,
    },
    /// Reset a configuration value to its default
    Unset { key: String },
}

pub fn run(command: ConfigCommand) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    match command {
        ConfigCommand::Show => show(&config),
        ConfigCommand::Set { key, value } => {
            config.set_value(&key, &value)?;
            config.save()?;
            println!("✅ Set {key} to: {}", value.trim());
        }
        ConfigCommand::Unset { key } => {
            config.unset_value(&key)?;
            config.save()?;
            println!("✅ Unset {key}");
        }
    }
    Ok(())
}

fn show(config: &Config) {
    match Config::get_config_path() {
        Some(path) => println!("Configuration ({}):\n", path_display(path)),
        None => println!("Configuration (no config directory on this platform):\n"),
    }
    println!("  base_url:             {}", config.base_url());
    println!("  chat_model:           {}", config.chat_model());
    println!("  utility_model:        {}", config.utility_model());
    println!(
        "  request_timeout_secs: {}",
        config.request_timeout().as_secs()
    );
    match config.data_dir() {
        Some(dir) => println!("  data_dir:             {}", path_display(dir)),
        None => println!("  data_dir:             (platform default)"),
    }
    println!("\nKeys: {}", CONFIG_KEYS.join(", "));
}
