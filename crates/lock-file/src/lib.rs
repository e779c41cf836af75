//! Persistent lifecycle state of a managed home directory: whether genesis has
//! been built, from which configuration, and which process was last started.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;

pub use error::{Error, Result};

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use localnet_config::Configuration;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, trace};

/// File name of the lock file inside the home directory.
pub const LOCK_FILE_NAME: &str = "localnet.lock";

/// Snapshot of the lifecycle record.
///
/// `initialized` implies `config` holds the configuration genesis was built from.
/// `pid` is a hint only; it must be confirmed against the live process table.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleState {
    /// Last recorded node process id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Whether genesis data exists.
    #[serde(default)]
    pub initialized: bool,

    /// Configuration genesis was built from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Configuration>,
}

impl LifecycleState {
    /// Returns the committed configuration if genesis has been built.
    #[must_use]
    pub const fn initialized_config(&self) -> Option<&Configuration> {
        if self.initialized {
            self.config.as_ref()
        } else {
            None
        }
    }
}

/// Durable storage of [`LifecycleState`].
///
/// Every mutation is persisted completely before it returns.
#[async_trait]
pub trait LifecycleStore: Send + Sync + 'static {
    /// Reads the current state, creating the default record if none exists.
    async fn load(&self) -> Result<LifecycleState>;

    /// Commits a completed genesis: sets `initialized` and stores `config` together.
    async fn mark_initialized(&self, config: Configuration) -> Result<()>;

    /// Records or clears the running process id.
    async fn set_pid(&self, pid: Option<u32>) -> Result<()>;
}

/// [`LifecycleStore`] backed by a JSON file.
///
/// Writes go to a sibling temporary file which is then renamed over the lock
/// file, so readers never observe a partial record.
#[derive(Debug)]
pub struct LockFile {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl LockFile {
    /// Creates a store for the lock file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store for the lock file co-located with `home_dir`.
    pub fn in_home(home_dir: impl AsRef<Path>) -> Self {
        Self::new(home_dir.as_ref().join(LOCK_FILE_NAME))
    }

    /// Path of the lock file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Option<LifecycleState>> {
        match fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(Error::Deserialize),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io("failed to read lock file", e)),
        }
    }

    async fn write(&self, state: &LifecycleState) -> Result<()> {
        let bytes = serde_json::to_vec(state).map_err(Error::Serialize)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Io("failed to create lock file directory", e))?;
        }

        let tmp_path = self.path.with_extension("lock.tmp");
        fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| Error::Io("failed to write lock file", e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| Error::Io("failed to replace lock file", e))?;

        trace!("persisted lock file {}", self.path.display());

        Ok(())
    }

    async fn update<F>(&self, mutate: F) -> Result<()>
    where
        F: FnOnce(&mut LifecycleState) + Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut state = self.read().await?.unwrap_or_default();
        mutate(&mut state);

        self.write(&state).await
    }
}

#[async_trait]
impl LifecycleStore for LockFile {
    async fn load(&self) -> Result<LifecycleState> {
        let _guard = self.write_lock.lock().await;

        if let Some(state) = self.read().await? {
            return Ok(state);
        }

        debug!("creating lock file {}", self.path.display());

        let state = LifecycleState::default();
        self.write(&state).await?;

        Ok(state)
    }

    async fn mark_initialized(&self, config: Configuration) -> Result<()> {
        self.update(|state| {
            state.initialized = true;
            state.config = Some(config);
        })
        .await
    }

    async fn set_pid(&self, pid: Option<u32>) -> Result<()> {
        self.update(|state| state.pid = pid).await
    }
}
