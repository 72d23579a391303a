//! Configuration sources: where a layer of properties comes from and how
//! failures to read it are treated.

use crate::error::BootstrapError;
use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Which layer a source belongs to. Variants are listed lowest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Default configuration bundled with the program.
    EmbeddedDefault,
    /// `<config root>/config/log4j/log4j.properties`
    ExternalBase,
    /// A `loggers.properties` resource contributed by a bundled component.
    EmbeddedLoggers,
    /// One `*.properties` file under `<config root>/config/log4j/loggers/`.
    ExternalLogger,
}

impl SourceKind {
    /// Whether a read failure for this layer is expected and stays silent.
    pub fn tolerates_missing(self) -> bool {
        matches!(self, SourceKind::ExternalBase | SourceKind::ExternalLogger)
    }
}

/// A component that produces resources on demand instead of embedding their
/// bytes up front.
pub trait ResourceProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Whether `resource` is provided at all.
    fn provides(&self, resource: &str) -> bool;

    /// A fresh reader over `resource`.
    fn open(&self, resource: &str) -> io::Result<Box<dyn Read + Send>>;
}

/// Shared handle to a [`ResourceProvider`]. Handles are equal when they point
/// at the same provider.
#[derive(Clone)]
pub struct ProviderHandle(Arc<dyn ResourceProvider>);

impl ProviderHandle {
    pub fn new(provider: impl ResourceProvider + 'static) -> Self {
        Self(Arc::new(provider))
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn provides(&self, resource: &str) -> bool {
        self.0.provides(resource)
    }
}

impl fmt::Debug for ProviderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ProviderHandle").field(&self.name()).finish()
    }
}

impl PartialEq for ProviderHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ProviderHandle {}

/// A readable location: an embedded resource, a provided resource or a file
/// on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Embedded {
        bundle: String,
        resource: String,
        bytes: Cow<'static, [u8]>,
    },
    Provided {
        provider: ProviderHandle,
        resource: String,
    },
    File(PathBuf),
}

impl Location {
    /// Convert a filesystem path into an absolute file location.
    ///
    /// The file does not need to exist. Relative paths are resolved against
    /// the current directory.
    pub fn from_path(path: &Path) -> Result<Location, BootstrapError> {
        if path.as_os_str().is_empty() {
            return Err(BootstrapError::InvalidPath(path.to_path_buf()));
        }
        let absolute = std::path::absolute(path)
            .map_err(|_| BootstrapError::InvalidPath(path.to_path_buf()))?;
        Ok(Location::File(dunce::simplified(&absolute).to_path_buf()))
    }

    /// Open a fresh reader. Files are reopened on every call so edits between
    /// runs are always picked up.
    pub fn open(&self) -> Result<Box<dyn Read + '_>, BootstrapError> {
        match self {
            Location::Embedded { bytes, .. } => Ok(Box::new(&bytes[..])),
            Location::Provided { provider, resource } => {
                let reader: Box<dyn Read> = provider.0.open(resource)?;
                Ok(reader)
            }
            Location::File(path) => {
                let file = std::fs::File::open(path)?;
                Ok(Box::new(BufReader::new(file)))
            }
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Embedded {
                bundle, resource, ..
            } => write!(f, "embedded:{}!/{}", bundle, resource),
            Location::Provided { provider, resource } => {
                write!(f, "provided:{}!/{}", provider.name(), resource)
            }
            Location::File(path) => write!(f, "file:{}", path.display()),
        }
    }
}

/// Where a source points before it has been resolved to a [`Location`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceTarget {
    Resolved(Location),
    Path(PathBuf),
    /// A named resource that the resource path does not provide.
    Unavailable(String),
}

/// One layer to merge into the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    pub kind: SourceKind,
    pub target: SourceTarget,
    pub tolerate_missing: bool,
}

impl SourceDescriptor {
    pub fn embedded(kind: SourceKind, location: Location) -> Self {
        Self {
            kind,
            target: SourceTarget::Resolved(location),
            tolerate_missing: kind.tolerates_missing(),
        }
    }

    pub fn unavailable(kind: SourceKind, resource: impl Into<String>) -> Self {
        Self {
            kind,
            target: SourceTarget::Unavailable(resource.into()),
            tolerate_missing: kind.tolerates_missing(),
        }
    }

    pub fn file(kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            target: SourceTarget::Path(path.into()),
            tolerate_missing: kind.tolerates_missing(),
        }
    }

    /// Resolve the target into a readable location.
    pub fn location(&self) -> Result<Location, BootstrapError> {
        match &self.target {
            SourceTarget::Resolved(location) => Ok(location.clone()),
            SourceTarget::Path(path) => Location::from_path(path),
            SourceTarget::Unavailable(resource) => Err(BootstrapError::ConfigError(format!(
                "resource not found: {}",
                resource
            ))),
        }
    }

    /// Human readable description of the target, available even when it does
    /// not resolve.
    pub fn describe(&self) -> String {
        match &self.target {
            SourceTarget::Resolved(location) => location.to_string(),
            SourceTarget::Path(path) => path.display().to_string(),
            SourceTarget::Unavailable(resource) => resource.clone(),
        }
    }
}
