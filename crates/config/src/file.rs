use std::io;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, Result};
use crate::resolve::PartialConfiguration;

/// Config file looked up in the working directory when none is named.
pub const DEFAULT_CONFIG_FILE: &str = "localnet.json";

/// Reads a JSON config file.
///
/// A missing file yields an empty configuration unless `required` is set.
///
/// # Errors
///
/// Returns [`Error::ConfigFileNotFound`] for a missing required file, or an
/// error if the file cannot be read or parsed.
pub async fn load_config_file(path: &Path, required: bool) -> Result<PartialConfiguration> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("loaded config file {}", path.display());
            Ok(serde_json::from_slice(&bytes)?)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            if required {
                Err(Error::ConfigFileNotFound(path.to_path_buf()))
            } else {
                debug!("no config file at {}, using defaults", path.display());
                Ok(PartialConfiguration::default())
            }
        }
        Err(e) => Err(Error::Io("failed to read config file", e)),
    }
}
