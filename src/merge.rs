//! Merge rules: read each source and overwrite its keys into the accumulating
//! configuration, lowest priority first.
//!
//! A source that cannot be read contributes nothing. Whether the failure is
//! logged depends on the source's `tolerate_missing` flag; sources that do not
//! resolve to a location are always logged. Interrupted reads are recorded on a
//! side-channel flag and the merge carries on with the next source.

use crate::error::BootstrapError;
use crate::properties::PropertyMap;
use crate::source::{SourceDescriptor, SourceKind};
use std::io::{self, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error};

const READ_CHUNK: usize = 8 * 1024;

/// What happened to a single source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// The source was read and `keys` pairs were written.
    Merged { keys: usize },
    /// The source was skipped. `reported` is true when diagnostics were logged.
    Ignored { reason: String, reported: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOutcome {
    pub kind: SourceKind,
    pub source: String,
    pub status: SourceStatus,
}

impl SourceOutcome {
    pub fn is_merged(&self) -> bool {
        matches!(self.status, SourceStatus::Merged { .. })
    }

    pub fn is_reported(&self) -> bool {
        matches!(self.status, SourceStatus::Ignored { reported: true, .. })
    }
}

/// Per-source outcomes of one configuration assembly, in merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub outcomes: Vec<SourceOutcome>,
    /// Set when at least one read was interrupted.
    pub interrupted: bool,
}

impl MergeReport {
    pub fn merged(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.is_merged())
    }

    pub fn reported_failures(&self) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(|o| o.is_reported())
    }

    pub fn of_kind(&self, kind: SourceKind) -> impl Iterator<Item = &SourceOutcome> {
        self.outcomes.iter().filter(move |o| o.kind == kind)
    }
}

/// Merge every source in order into a fresh map.
pub fn merge_all(sources: &[SourceDescriptor]) -> (PropertyMap, MergeReport) {
    let mut properties = PropertyMap::new();
    let interrupted = AtomicBool::new(false);
    let outcomes = sources
        .iter()
        .map(|source| merge_source(&mut properties, source, &interrupted))
        .collect();

    let report = MergeReport {
        outcomes,
        interrupted: interrupted.load(Ordering::Relaxed),
    };
    (properties, report)
}

/// Merge one source into `target`.
pub fn merge_source(
    target: &mut PropertyMap,
    source: &SourceDescriptor,
    interrupted: &AtomicBool,
) -> SourceOutcome {
    let description = source.describe();
    debug!(source = %description, kind = ?source.kind, "Reading configuration source");

    let location = match source.location() {
        Ok(location) => location,
        Err(e) => {
            error!(source = %description, error = %e, "Could not resolve configuration source");
            error!(source = %description, "Ignoring configuration source");
            return SourceOutcome {
                kind: source.kind,
                source: description,
                status: SourceStatus::Ignored {
                    reason: e.to_string(),
                    reported: true,
                },
            };
        }
    };

    let description = location.to_string();
    let status = match location.open() {
        Ok(mut reader) => merge_reader(
            target,
            &description,
            &mut reader,
            source.tolerate_missing,
            interrupted,
        ),
        Err(e) => ignore(&description, e, source.tolerate_missing, interrupted),
    };

    SourceOutcome {
        kind: source.kind,
        source: description,
        status,
    }
}

/// Read properties from `reader` and merge them, or record why not.
fn merge_reader<R: Read + ?Sized>(
    target: &mut PropertyMap,
    description: &str,
    reader: &mut R,
    tolerate_missing: bool,
    interrupted: &AtomicBool,
) -> SourceStatus {
    match read_properties(reader) {
        Ok(properties) => SourceStatus::Merged {
            keys: target.merge_from(properties),
        },
        Err(e) => ignore(description, e, tolerate_missing, interrupted),
    }
}

fn ignore(
    description: &str,
    err: BootstrapError,
    tolerate_missing: bool,
    interrupted: &AtomicBool,
) -> SourceStatus {
    if err.is_interruption() {
        interrupted.store(true, Ordering::Relaxed);
    }
    if !tolerate_missing {
        error!(source = %description, error = %err, "Could not read configuration source");
        error!(source = %description, "Ignoring configuration source");
    }
    SourceStatus::Ignored {
        reason: err.to_string(),
        reported: !tolerate_missing,
    }
}

/// Drain `reader` and parse it as UTF-8 properties text.
///
/// Unlike `read_to_end`, an `Interrupted` error aborts the read so the caller
/// can observe it.
pub fn read_properties<R: Read + ?Sized>(reader: &mut R) -> Result<PropertyMap, BootstrapError> {
    let mut bytes = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => bytes.extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                return Err(BootstrapError::Interrupted(e.to_string()));
            }
            Err(e) => return Err(e.into()),
        }
    }

    let text = String::from_utf8(bytes)
        .map_err(|e| BootstrapError::Io(io::Error::new(io::ErrorKind::InvalidData, e)))?;
    let mut properties = PropertyMap::new();
    properties.load_str(&text)?;
    Ok(properties)
}
