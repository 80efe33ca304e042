//! Configuration inspection command

use clap::Subcommand;
use mathroute_core::error::{Result, RouterError};

use super::helpers::{get_config_path, get_state_path, load_config, GlobalOpts};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (defaults, file, environment) as TOML
    Show,

    /// Print the config and state file locations
    Paths,
}

/// Handle configuration command
pub async fn handle(action: ConfigAction, opts: &GlobalOpts) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(opts)?;
            let rendered = toml::to_string_pretty(&config)
                .map_err(|e| RouterError::Internal(format!("Failed to render config: {}", e)))?;
            println!("{}", rendered);
        }
        ConfigAction::Paths => {
            match get_config_path(opts.config_path.clone()) {
                Some(path) => println!("config: {}", path.display()),
                None => println!("config: (defaults)"),
            }
            println!(
                "state:  {}",
                get_state_path(opts.state_path.clone()).display()
            );
        }
    }
    Ok(())
}
