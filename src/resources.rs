//! Resource search path
//!
//! Bundled configuration is looked up by logical name (for example
//! `META-INF/log4j/loggers.properties`) across an ordered list of roots. A root
//! is an embedded bundle compiled into the program, a [`ResourceProvider`]
//! that produces content on demand, or a directory on disk. Several components can each contribute a resource under the same name.

use crate::source::{Location, ProviderHandle, ResourceProvider};
use std::borrow::Cow;
use std::path::PathBuf;
use tracing::warn;

/// Logical name of the default configuration resource.
pub const DEFAULT_RESOURCE: &str = "META-INF/log4j/log4j.properties";

/// Logical name of per-component logger resources.
pub const LOGGERS_RESOURCE: &str = "META-INF/log4j/loggers.properties";

/// Default configuration shipped with this crate.
const BUILTIN_DEFAULT: &str = include_str!("../resources/META-INF/log4j/log4j.properties");

/// An in-memory set of named resources.
#[derive(Debug, Clone)]
pub struct EmbeddedBundle {
    name: String,
    files: Vec<(String, Cow<'static, [u8]>)>,
}

impl EmbeddedBundle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            files: Vec::new(),
        }
    }

    /// Add a resource compiled into the binary, typically via `include_str!`.
    pub fn with_static(mut self, resource: impl Into<String>, content: &'static str) -> Self {
        self.files
            .push((resource.into(), Cow::Borrowed(content.as_bytes())));
        self
    }

    /// Add a resource from owned bytes.
    pub fn with_bytes(mut self, resource: impl Into<String>, content: Vec<u8>) -> Self {
        self.files.push((resource.into(), Cow::Owned(content)));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn lookup(&self, resource: &str) -> Option<Location> {
        self.files
            .iter()
            .find(|(name, _)| name == resource)
            .map(|(name, bytes)| Location::Embedded {
                bundle: self.name.clone(),
                resource: name.clone(),
                bytes: bytes.clone(),
            })
    }
}

/// One entry of the search path.
#[derive(Debug, Clone)]
pub enum ResourceRoot {
    Embedded(EmbeddedBundle),
    Provider(ProviderHandle),
    Directory(PathBuf),
}

impl ResourceRoot {
    fn lookup(&self, resource: &str) -> Option<Location> {
        match self {
            ResourceRoot::Embedded(bundle) => bundle.lookup(resource),
            ResourceRoot::Provider(provider) => provider.provides(resource).then(|| {
                Location::Provided {
                    provider: provider.clone(),
                    resource: resource.to_string(),
                }
            }),
            ResourceRoot::Directory(dir) => {
                let candidate = dir.join(resource);
                match candidate.metadata() {
                    Ok(meta) if meta.is_file() => Some(Location::File(candidate)),
                    Ok(_) => None,
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
                    Err(e) => {
                        warn!(
                            resource = %candidate.display(),
                            error = %e,
                            "Could not inspect resource on search path"
                        );
                        None
                    }
                }
            }
        }
    }
}

/// Ordered list of roots searched for bundled resources.
#[derive(Debug, Clone, Default)]
pub struct ResourcePath {
    roots: Vec<ResourceRoot>,
}

impl ResourcePath {
    /// A search path with no roots.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A search path holding this crate's bundled default configuration.
    pub fn with_defaults() -> Self {
        Self::empty().with_bundle(builtin_bundle())
    }

    pub fn with_bundle(mut self, bundle: EmbeddedBundle) -> Self {
        self.roots.push(ResourceRoot::Embedded(bundle));
        self
    }

    pub fn with_provider(mut self, provider: impl ResourceProvider + 'static) -> Self {
        self.roots
            .push(ResourceRoot::Provider(ProviderHandle::new(provider)));
        self
    }

    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.roots.push(ResourceRoot::Directory(dir.into()));
        self
    }

    pub fn roots(&self) -> &[ResourceRoot] {
        &self.roots
    }

    /// First root that provides `resource`.
    pub fn find(&self, resource: &str) -> Option<Location> {
        self.roots.iter().find_map(|root| root.lookup(resource))
    }

    /// Every root that provides `resource`, in search order.
    pub fn find_all(&self, resource: &str) -> Vec<Location> {
        self.roots
            .iter()
            .filter_map(|root| root.lookup(resource))
            .collect()
    }
}

/// The bundle carrying this crate's own default configuration.
pub fn builtin_bundle() -> EmbeddedBundle {
    EmbeddedBundle::new(env!("CARGO_PKG_NAME")).with_static(DEFAULT_RESOURCE, BUILTIN_DEFAULT)
}
