//! Logging bootstrap lifecycle
//!
//! [`LogBootstrap`] assembles the layered configuration and hands it to a
//! [`Configurator`] at most once until it is destroyed. `init` and `destroy`
//! check an atomic flag first and re-check it under the lock, so the common
//! already-initialized path never blocks.
//!
//! Initialization never fails from the caller's point of view: unreadable
//! sources only shrink the configuration and are recorded in the
//! [`MergeReport`] available from [`LogBootstrap::last_report`].

use crate::configurator::Configurator;
use crate::layers::collect_sources;
use crate::logging::TracingConfigurator;
use crate::merge::{merge_all, MergeReport};
use crate::properties::PropertyMap;
use crate::resources::ResourcePath;
use crate::settings::BootstrapSettings;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct BootstrapState {
    logs_folder: Option<PathBuf>,
    last_report: Option<MergeReport>,
}

/// Process-wide logging bootstrap.
pub struct LogBootstrap {
    settings: BootstrapSettings,
    resources: ResourcePath,
    configurator: Box<dyn Configurator>,
    initialized: AtomicBool,
    interrupted: AtomicBool,
    state: Mutex<BootstrapState>,
}

impl LogBootstrap {
    /// Create a bootstrap with settings from the environment and this crate's
    /// bundled resources.
    pub fn new(configurator: impl Configurator + 'static) -> Self {
        Self {
            settings: BootstrapSettings::load_or_default(),
            resources: ResourcePath::with_defaults(),
            configurator: Box::new(configurator),
            initialized: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            state: Mutex::new(BootstrapState::default()),
        }
    }

    pub fn with_settings(mut self, settings: BootstrapSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_resources(mut self, resources: ResourcePath) -> Self {
        self.resources = resources;
        self
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    pub fn resources(&self) -> &ResourcePath {
        &self.resources
    }

    /// Initialize with both the logs root and the config root set to the
    /// current directory.
    pub fn init(&self) {
        let cwd = current_dir();
        self.init_with(&cwd, &cwd);
    }

    /// Initialize with `logs/` under `logs_root` and configuration searched
    /// under the current directory.
    pub fn init_in(&self, logs_root: &Path) {
        self.init_with(logs_root, &current_dir());
    }

    /// Initialize with `logs/` under `logs_root` and external configuration
    /// under `<config_root>/config/log4j/`. No-op when already initialized.
    pub fn init_with(&self, logs_root: &Path, config_root: &Path) {
        if self.initialized.load(Ordering::Acquire) {
            return;
        }

        let mut state = self.state.lock();
        if self.initialized.load(Ordering::Acquire) {
            return;
        }

        let logs_folder = self.prepare_logs_folder(logs_root);
        if self.settings.publish_to_env {
            std::env::set_var(&self.settings.published_variable, &logs_folder);
        }

        self.configurator.prepare();
        let (mut properties, report) = self.assemble(config_root);
        properties.set_variable(
            self.settings.published_variable.clone(),
            logs_folder.to_string_lossy(),
        );
        if report.interrupted {
            self.interrupted.store(true, Ordering::Release);
        }

        self.configurator.configure(&properties);

        info!(
            logs_folder = %logs_folder.display(),
            keys = properties.len(),
            sources = report.merged().count(),
            "Logging initialized"
        );

        state.logs_folder = Some(logs_folder);
        state.last_report = Some(report);
        self.initialized.store(true, Ordering::Release);
    }

    /// Whether `init` has run and `destroy` has not run since.
    pub fn is_initialized(&self) -> bool {
        let _state = self.state.lock();
        self.initialized.load(Ordering::Acquire)
    }

    /// Unpublish the logs folder and shut the backend down. No-op when not
    /// initialized.
    pub fn destroy(&self) {
        if !self.initialized.load(Ordering::Acquire) {
            return;
        }

        let mut state = self.state.lock();
        if !self.initialized.load(Ordering::Acquire) {
            return;
        }

        info!("Logging shutting down");

        if self.settings.publish_to_env {
            std::env::remove_var(&self.settings.published_variable);
        }
        state.logs_folder = None;

        self.configurator.shutdown();
        self.initialized.store(false, Ordering::Release);
    }

    /// Absolute path of the logs folder while initialized.
    pub fn logs_folder(&self) -> Option<PathBuf> {
        self.state.lock().logs_folder.clone()
    }

    /// Outcome of the most recent assembly run by `init`.
    pub fn last_report(&self) -> Option<MergeReport> {
        self.state.lock().last_report.clone()
    }

    /// Whether a source read was interrupted since the last call. Clears the
    /// flag.
    pub fn take_interrupted(&self) -> bool {
        self.interrupted.swap(false, Ordering::AcqRel)
    }

    /// Merge every configuration layer for `config_root` without touching
    /// lifecycle state.
    pub fn assemble(&self, config_root: &Path) -> (PropertyMap, MergeReport) {
        let sources = collect_sources(&self.settings, &self.resources, config_root);
        debug!(count = sources.len(), "Merging configuration sources");
        merge_all(&sources)
    }

    fn prepare_logs_folder(&self, logs_root: &Path) -> PathBuf {
        let dir = self.settings.logs_dir(logs_root);
        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(logs_folder = %dir.display(), error = %e, "Could not create logs folder");
        }
        match std::path::absolute(&dir) {
            Ok(absolute) => dunce::simplified(&absolute).to_path_buf(),
            Err(_) => dir,
        }
    }
}

impl std::fmt::Debug for LogBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBootstrap")
            .field("settings", &self.settings)
            .field("initialized", &self.initialized.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        warn!(error = %e, "Current directory unavailable, using '.'");
        PathBuf::from(".")
    })
}

static GLOBAL: OnceLock<LogBootstrap> = OnceLock::new();

/// The process-wide bootstrap driving the global `tracing` subscriber.
pub fn global() -> &'static LogBootstrap {
    GLOBAL.get_or_init(|| LogBootstrap::new(TracingConfigurator::new()))
}

/// [`LogBootstrap::init`] on the [`global`] bootstrap.
pub fn init() {
    global().init()
}

/// [`LogBootstrap::init_in`] on the [`global`] bootstrap.
pub fn init_in(logs_root: &Path) {
    global().init_in(logs_root)
}

/// [`LogBootstrap::init_with`] on the [`global`] bootstrap.
pub fn init_with(logs_root: &Path, config_root: &Path) {
    global().init_with(logs_root, config_root)
}

/// [`LogBootstrap::is_initialized`] on the [`global`] bootstrap.
pub fn is_initialized() -> bool {
    global().is_initialized()
}

/// [`LogBootstrap::destroy`] on the [`global`] bootstrap.
pub fn destroy() {
    global().destroy()
}
