//! Integration tests for layered configuration merging

use logboot::resources::{DEFAULT_RESOURCE, LOGGERS_RESOURCE};
use logboot::{
    BootstrapSettings, EmbeddedBundle, LogBootstrap, ResourcePath, SourceKind, SourceStatus,
};
use std::sync::Arc;
use tempfile::TempDir;

use crate::integration::{write_file, RecordingConfigurator};

const BASE_FILE: &str = "config/log4j/log4j.properties";
const LOGGERS_DIR: &str = "config/log4j/loggers";

fn settings() -> BootstrapSettings {
    BootstrapSettings {
        publish_to_env: false,
        ..Default::default()
    }
}

fn bootstrap_with(resources: ResourcePath) -> (LogBootstrap, Arc<RecordingConfigurator>) {
    let recorder = Arc::new(RecordingConfigurator::default());
    let bootstrap = LogBootstrap::new(recorder.clone())
        .with_settings(settings())
        .with_resources(resources);
    (bootstrap, recorder)
}

fn default_bundle(content: &'static str) -> EmbeddedBundle {
    EmbeddedBundle::new("app").with_static(DEFAULT_RESOURCE, content)
}

#[test]
fn test_external_base_overrides_embedded_default() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), BASE_FILE, "k=2\n");
    let resources =
        ResourcePath::empty().with_bundle(default_bundle("k=1\ndefault.only=yes\n"));
    let (bootstrap, recorder) = bootstrap_with(resources);

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    let applied = recorder.last().unwrap();
    assert_eq!(applied.get("k"), Some("2"));
    assert_eq!(applied.get("default.only"), Some("yes"));
}

#[test]
fn test_disjoint_logger_files_both_merged() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), &format!("{LOGGERS_DIR}/first.properties"), "a=x\n");
    write_file(temp_dir.path(), &format!("{LOGGERS_DIR}/second.properties"), "b=y\n");
    write_file(temp_dir.path(), &format!("{LOGGERS_DIR}/ignored.txt"), "c=z\n");
    let (bootstrap, recorder) = bootstrap_with(ResourcePath::empty());

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    let applied = recorder.last().unwrap();
    assert_eq!(applied.get("a"), Some("x"));
    assert_eq!(applied.get("b"), Some("y"));
    assert!(!applied.contains_key("c"));
}

#[test]
fn test_missing_loggers_directory_is_tolerated() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), BASE_FILE, "k=base\n");
    let (bootstrap, recorder) = bootstrap_with(ResourcePath::empty());

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    assert!(bootstrap.is_initialized());
    let report = bootstrap.last_report().unwrap();
    assert_eq!(report.of_kind(SourceKind::ExternalLogger).count(), 0);
    assert_eq!(recorder.last().unwrap().len(), 1);
}

#[test]
fn test_full_override_order() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), BASE_FILE, "level=base\nbase.key=1\n");
    write_file(
        temp_dir.path(),
        &format!("{LOGGERS_DIR}/db.properties"),
        "level=external-logger\n",
    );
    let resources = ResourcePath::empty()
        .with_bundle(default_bundle("level=default\ndefault.key=1\n"))
        .with_bundle(EmbeddedBundle::new("component").with_static(
            LOGGERS_RESOURCE,
            "level=embedded-logger\ncomponent.key=1\n",
        ));
    let (bootstrap, recorder) = bootstrap_with(resources);

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    let applied = recorder.last().unwrap();
    assert_eq!(applied.get("level"), Some("external-logger"));
    assert_eq!(applied.get("default.key"), Some("1"));
    assert_eq!(applied.get("base.key"), Some("1"));
    assert_eq!(applied.get("component.key"), Some("1"));

    let kinds: Vec<_> = bootstrap
        .last_report()
        .unwrap()
        .merged()
        .map(|o| o.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            SourceKind::EmbeddedDefault,
            SourceKind::ExternalBase,
            SourceKind::EmbeddedLoggers,
            SourceKind::ExternalLogger,
        ]
    );
}

#[test]
fn test_embedded_loggers_from_every_component() {
    let temp_dir = TempDir::new().unwrap();
    let resource_dir = TempDir::new().unwrap();
    write_file(resource_dir.path(), LOGGERS_RESOURCE, "from.dir=1\n");
    let resources = ResourcePath::empty()
        .with_bundle(EmbeddedBundle::new("one").with_static(LOGGERS_RESOURCE, "from.one=1\n"))
        .with_directory(resource_dir.path())
        .with_bundle(EmbeddedBundle::new("two").with_static(LOGGERS_RESOURCE, "from.two=1\n"));
    let (bootstrap, recorder) = bootstrap_with(resources);

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    let applied = recorder.last().unwrap();
    for key in ["from.one", "from.dir", "from.two"] {
        assert_eq!(applied.get(key), Some("1"), "missing {key}");
    }
}

#[test]
fn test_unreadable_embedded_loggers_reported_and_skipped() {
    let temp_dir = TempDir::new().unwrap();
    let resources = ResourcePath::empty()
        .with_bundle(default_bundle("k=1\n"))
        .with_bundle(
            EmbeddedBundle::new("broken").with_bytes(LOGGERS_RESOURCE, vec![b'x', b'=', 0xff]),
        )
        .with_bundle(EmbeddedBundle::new("fine").with_static(LOGGERS_RESOURCE, "ok=1\n"));
    let (bootstrap, recorder) = bootstrap_with(resources);

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    let applied = recorder.last().unwrap();
    assert_eq!(applied.get("k"), Some("1"));
    assert_eq!(applied.get("ok"), Some("1"));
    assert!(!applied.contains_key("x"));

    let report = bootstrap.last_report().unwrap();
    let failures: Vec<_> = report.reported_failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].kind, SourceKind::EmbeddedLoggers);
    assert!(failures[0].source.contains("broken"));
}

#[test]
fn test_malformed_external_logger_file_is_silent() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), &format!("{LOGGERS_DIR}/bad.properties"), "bad=\\u00\n");
    write_file(temp_dir.path(), &format!("{LOGGERS_DIR}/good.properties"), "good=1\n");
    let (bootstrap, recorder) = bootstrap_with(ResourcePath::empty());

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    assert_eq!(recorder.last().unwrap().get("good"), Some("1"));
    let report = bootstrap.last_report().unwrap();
    let bad: Vec<_> = report
        .of_kind(SourceKind::ExternalLogger)
        .filter(|o| !o.is_merged())
        .collect();
    assert_eq!(bad.len(), 1);
    assert!(matches!(
        bad[0].status,
        SourceStatus::Ignored { reported: false, .. }
    ));
}

#[test]
fn test_assemble_reflects_edits_between_calls() {
    let temp_dir = TempDir::new().unwrap();
    write_file(temp_dir.path(), BASE_FILE, "k=1\n");
    let (bootstrap, _) = bootstrap_with(ResourcePath::empty());

    let (first, _) = bootstrap.assemble(temp_dir.path());
    write_file(temp_dir.path(), BASE_FILE, "k=2\n");
    let (second, _) = bootstrap.assemble(temp_dir.path());

    assert_eq!(first.get("k"), Some("1"));
    assert_eq!(second.get("k"), Some("2"));
    assert!(!bootstrap.is_initialized());
}

#[test]
fn test_bundled_default_is_merged_verbatim() {
    let temp_dir = TempDir::new().unwrap();
    let (bootstrap, recorder) = bootstrap_with(ResourcePath::with_defaults());

    bootstrap.init_with(temp_dir.path(), temp_dir.path());

    let applied = recorder.last().unwrap();
    assert_eq!(applied.get("log4j.rootLogger"), Some("INFO, console, file"));
    assert_eq!(
        applied.get("log4j.appender.file.File"),
        Some("${logs.folder}/application.log")
    );
}
