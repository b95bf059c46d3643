use thiserror::Error;

use std::{fs, io, path::PathBuf};

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    IO(#[from] io::Error),
}

pub const ENV_VAR_HOME: &str = "SPLITROUTE_HOME";

#[cfg(windows)]
const DEFAULT_STATE_DIR: &str = r"C:\ProgramData\splitroute";
#[cfg(not(windows))]
const DEFAULT_STATE_DIR: &str = "/var/lib/splitroute";

pub fn state_dir(file: &str) -> Result<PathBuf, Error> {
    let state_path = get_home();
    let state_file = state_path.join(file);
    tracing::debug!("using state file: {}", state_file.display());
    fs::create_dir_all(&state_path)?;
    Ok(state_file)
}

fn get_home() -> PathBuf {
    if let Ok(home) = std::env::var(ENV_VAR_HOME) {
        return PathBuf::from(home);
    }
    PathBuf::from(DEFAULT_STATE_DIR)
}
