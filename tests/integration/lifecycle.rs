//! Integration tests for init/destroy lifecycle and the published logs folder

use logboot::logging::{AppenderTarget, LoggingPlan};
use logboot::{BootstrapSettings, LogBootstrap, ResourcePath, LOGS_FOLDER_VARIABLE};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::{with_env_lock, RecordingConfigurator};

fn bootstrap(recorder: &Arc<RecordingConfigurator>) -> LogBootstrap {
    LogBootstrap::new(recorder.clone()).with_settings(BootstrapSettings::default())
}

fn published() -> Option<PathBuf> {
    std::env::var_os(LOGS_FOLDER_VARIABLE).map(PathBuf::from)
}

#[test]
fn test_init_creates_logs_folder_and_publishes_it() {
    with_env_lock(|| {
        let temp_dir = TempDir::new().unwrap();
        let logs_root = temp_dir.path().join("fresh").join("root");
        let recorder = Arc::new(RecordingConfigurator::default());
        let bootstrap = bootstrap(&recorder);

        bootstrap.init_in(&logs_root);

        let expected = logs_root.join("logs");
        assert!(expected.is_dir(), "logs folder should be created with parents");
        assert_eq!(published(), Some(expected.clone()));
        assert_eq!(bootstrap.logs_folder(), Some(expected));
        assert!(bootstrap.is_initialized());

        bootstrap.destroy();
    });
}

#[test]
fn test_init_twice_is_idempotent() {
    with_env_lock(|| {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Arc::new(RecordingConfigurator::default());
        let bootstrap = bootstrap(&recorder);

        bootstrap.init_with(temp_dir.path(), temp_dir.path());
        let first_var = published();
        let first_folder = bootstrap.logs_folder();

        let other_root = temp_dir.path().join("other");
        bootstrap.init_with(&other_root, &other_root);

        assert_eq!(published(), first_var);
        assert_eq!(bootstrap.logs_folder(), first_folder);
        assert!(!other_root.join("logs").exists());
        assert_eq!(recorder.configured(), 1);
        assert!(bootstrap.is_initialized());

        bootstrap.destroy();
    });
}

#[test]
fn test_destroy_restores_pre_init_state() {
    with_env_lock(|| {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Arc::new(RecordingConfigurator::default());
        let bootstrap = bootstrap(&recorder);

        assert!(published().is_none());
        assert!(!bootstrap.is_initialized());

        bootstrap.init_in(temp_dir.path());
        assert!(published().is_some());

        bootstrap.destroy();
        assert!(published().is_none());
        assert!(!bootstrap.is_initialized());
        assert!(bootstrap.logs_folder().is_none());
        assert_eq!(recorder.shutdowns(), 1);

        bootstrap.destroy();
        assert_eq!(recorder.shutdowns(), 1);
    });
}

#[test]
fn test_init_after_destroy_reinitializes() {
    with_env_lock(|| {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        let recorder = Arc::new(RecordingConfigurator::default());
        let bootstrap = bootstrap(&recorder);

        bootstrap.init_in(first.path());
        bootstrap.destroy();
        bootstrap.init_in(second.path());

        assert_eq!(published(), Some(second.path().join("logs")));
        assert_eq!(recorder.configured(), 2);

        bootstrap.destroy();
    });
}

#[test]
fn test_publish_can_be_disabled() {
    with_env_lock(|| {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Arc::new(RecordingConfigurator::default());
        let bootstrap = LogBootstrap::new(recorder.clone()).with_settings(BootstrapSettings {
            publish_to_env: false,
            ..Default::default()
        });

        bootstrap.init_in(temp_dir.path());
        assert!(published().is_none());
        assert_eq!(bootstrap.logs_folder(), Some(temp_dir.path().join("logs")));

        bootstrap.destroy();
    });
}

#[test]
fn test_default_file_appender_lands_in_logs_folder_without_publishing() {
    with_env_lock(|| {
        let temp_dir = TempDir::new().unwrap();
        let recorder = Arc::new(RecordingConfigurator::default());
        let bootstrap = LogBootstrap::new(recorder.clone()).with_settings(BootstrapSettings {
            publish_to_env: false,
            ..Default::default()
        });

        bootstrap.init_in(temp_dir.path());
        assert!(published().is_none());

        let plan = LoggingPlan::from_properties(&recorder.last().unwrap());
        let files: Vec<_> = plan
            .appenders
            .iter()
            .filter_map(|appender| match &appender.target {
                AppenderTarget::File(path) => Some(path.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(files, vec![temp_dir.path().join("logs").join("application.log")]);

        bootstrap.destroy();
    });
}

#[test]
fn test_init_in_working_directory_with_nothing_to_merge() {
    with_env_lock(|| {
        let cwd = std::env::current_dir().unwrap();
        let logs = cwd.join("logs");
        let existed = logs.exists();

        let recorder = Arc::new(RecordingConfigurator::default());
        let bootstrap = bootstrap(&recorder).with_resources(ResourcePath::empty());

        bootstrap.init();

        assert!(bootstrap.is_initialized());
        assert!(logs.is_dir());
        assert_eq!(published(), Some(logs.clone()));
        let applied = recorder.last().expect("configurator should be called");
        assert!(applied.is_empty(), "unexpected keys: {:?}", applied);

        bootstrap.destroy();
        if !existed {
            std::fs::remove_dir_all(&logs).unwrap();
        }
    });
}
