//! Shared helper functions for CLI commands
//!
//! Path resolution for the state and config files, and agent construction
//! from persisted state.

use mathroute_core::{error::Result, RouterConfig, RoutingAgent, StateFile};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Global options shared by every subcommand
#[derive(Debug, Clone)]
pub struct GlobalOpts {
    pub config_path: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mathroute")
}

/// Get the default state path using XDG_DATA_HOME standard
pub fn get_default_state_path() -> PathBuf {
    data_dir().join("state.json")
}

/// Get the state path from CLI arg, env var, or default
pub fn get_state_path(cli_path: Option<PathBuf>) -> PathBuf {
    cli_path
        .or_else(|| std::env::var_os("MATHROUTE_STATE_PATH").map(PathBuf::from))
        .unwrap_or_else(get_default_state_path)
}

/// Get the config path from CLI arg, env var, or the default file if present
pub fn get_config_path(cli_path: Option<PathBuf>) -> Option<PathBuf> {
    cli_path
        .or_else(|| std::env::var_os("MATHROUTE_CONFIG").map(PathBuf::from))
        .or_else(|| {
            let default = data_dir().join("config.toml");
            default.exists().then_some(default)
        })
}

pub fn load_config(opts: &GlobalOpts) -> Result<RouterConfig> {
    let path = get_config_path(opts.config_path.clone());
    match &path {
        Some(p) => debug!("Loading config from {}", p.display()),
        None => debug!("No config file, using defaults and environment"),
    }
    Ok(RouterConfig::load(path.as_deref())?)
}

/// Build an agent restored from the state file
pub fn load_agent(opts: &GlobalOpts) -> Result<(RoutingAgent, PathBuf)> {
    let config = load_config(opts)?;
    let state_path = get_state_path(opts.state_path.clone());
    let state = StateFile::load(&state_path)?;

    let agent = RoutingAgent::builder(config).restore(state).build()?;
    Ok((agent, state_path))
}

pub async fn save_agent(agent: &RoutingAgent, path: &Path) -> Result<()> {
    agent.export_state().await?.save(path)
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
