//! Source layers in merge order: bundled default, external base file, bundled
//! logger resources, external per-logger files.

use crate::resources::ResourcePath;
use crate::settings::BootstrapSettings;
use crate::source::{SourceDescriptor, SourceKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// List every source to merge for `config_root`, lowest priority first.
pub fn collect_sources(
    settings: &BootstrapSettings,
    resources: &ResourcePath,
    config_root: &Path,
) -> Vec<SourceDescriptor> {
    let mut sources = Vec::new();

    sources.push(match resources.find(&settings.default_resource) {
        Some(location) => SourceDescriptor::embedded(SourceKind::EmbeddedDefault, location),
        None => SourceDescriptor::unavailable(
            SourceKind::EmbeddedDefault,
            settings.default_resource.as_str(),
        ),
    });

    sources.push(SourceDescriptor::file(
        SourceKind::ExternalBase,
        settings.base_file(config_root),
    ));

    sources.extend(
        resources
            .find_all(&settings.loggers_resource)
            .into_iter()
            .map(|location| SourceDescriptor::embedded(SourceKind::EmbeddedLoggers, location)),
    );

    sources.extend(
        logger_files(&settings.loggers_dir(config_root), &settings.loggers_suffix())
            .into_iter()
            .map(|path| SourceDescriptor::file(SourceKind::ExternalLogger, path)),
    );

    sources
}

/// Entries directly under `dir` whose name ends in `suffix`, sorted by name.
///
/// A missing or unreadable directory yields no entries.
pub fn logger_files(dir: &Path, suffix: &str) -> Vec<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().as_encoded_bytes().ends_with(suffix.as_bytes()))
        .map(|entry| entry.into_path())
        .collect()
}
