//! Host platform (linux for example) utility functions

use std::path::PathBuf;
use thiserror::Error;

/// Name of the environment variable giving the software's root directory
pub const SW_ROOT_ENV_VAR: &str = "DBW_SW_ROOT";

/// Errors associated with the host environment.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("The software root environment variable (DBW_SW_ROOT) is not set")]
    SwRootNotSet,
}

/// Get the software root directory from the host environment.
///
/// All parameter files and session outputs live under this directory.
pub fn get_dbw_sw_root() -> Result<PathBuf, HostError> {
    match std::env::var(SW_ROOT_ENV_VAR) {
        Ok(p) => Ok(PathBuf::from(p)),
        Err(_) => Err(HostError::SwRootNotSet),
    }
}
