//! Shared test utilities for integration tests
//!
//! Provides a recording configurator and serialized access to the process
//! environment, where the bootstrap publishes the logs folder.

use logboot::{Configurator, PropertyMap, LOGS_FOLDER_VARIABLE};
use parking_lot::Mutex as PlMutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Global mutex to serialize environment variable access across all tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Configurator that remembers what it was given.
#[derive(Default)]
pub struct RecordingConfigurator {
    last: PlMutex<Option<PropertyMap>>,
    configured: AtomicUsize,
    shutdowns: AtomicUsize,
}

impl RecordingConfigurator {
    pub fn last(&self) -> Option<PropertyMap> {
        self.last.lock().clone()
    }

    pub fn configured(&self) -> usize {
        self.configured.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

impl Configurator for RecordingConfigurator {
    fn configure(&self, properties: &PropertyMap) {
        *self.last.lock() = Some(properties.clone());
        self.configured.fetch_add(1, Ordering::SeqCst);
    }

    fn shutdown(&self) {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
    }
}

/// Run `f` while holding the environment lock, with the published variable
/// cleared before and after.
pub fn with_env_lock<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    std::env::remove_var(LOGS_FOLDER_VARIABLE);

    let result = f();

    std::env::remove_var(LOGS_FOLDER_VARIABLE);
    result
}

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}
