//! Shared data model, configuration, error taxonomy, and logging for the
//! mix pipeline: the types `mixcraft-compat`, `mixcraft-acquisition`, and
//! `mixcraft-orchestrator` all build on.

pub mod config;
pub mod errors;
pub mod logger;
pub mod model;

use errors::DirectoryError;

/// Get the data directory for the application.
///
/// Follows the XDG Base Directory Specification on linux, and the
/// equivalents on other platforms.
///
/// # Errors
///
/// Returns an error if the data directory could not be found.
pub fn get_data_dir() -> Result<std::path::PathBuf, DirectoryError> {
    let directory = if let Ok(s) = std::env::var("MIXCRAFT_DATA") {
        std::path::PathBuf::from(s)
    } else if let Some(proj_dirs) = directories::ProjectDirs::from("com", "mixcraft", "mixcraft") {
        proj_dirs.data_local_dir().to_path_buf()
    } else {
        return Err(DirectoryError::Data);
    };
    Ok(directory)
}

/// Get the config directory for the application.
///
/// # Errors
///
/// Returns an error if the config directory could not be found.
pub fn get_config_dir() -> Result<std::path::PathBuf, DirectoryError> {
    let directory = if let Ok(s) = std::env::var("MIXCRAFT_CONFIG") {
        std::path::PathBuf::from(s)
    } else if let Some(proj_dirs) = directories::ProjectDirs::from("com", "mixcraft", "mixcraft") {
        proj_dirs.config_local_dir().to_path_buf()
    } else {
        return Err(DirectoryError::Config);
    };
    Ok(directory)
}
