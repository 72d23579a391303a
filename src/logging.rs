//! Logging System
//!
//! [`TracingConfigurator`] applies a merged log4j-style property map to a
//! global `tracing` subscriber. The subscriber is installed on first use with a
//! reloadable filter and a swappable set of sinks, so the bootstrap can be
//! destroyed and initialized again within one process.
//!
//! Understood keys:
//! - `log4j.rootLogger = LEVEL, appender, ...`
//! - `log4j.logger.<name> = LEVEL, appender, ...` (dots in `<name>` become `::`)
//! - `log4j.appender.<name> = <class>` where the class names a console or file
//!   appender, with `.Target` (`System.out` / `System.err`) or `.File`.
//!
//! Every referenced appender receives every event that passes the filter.

use crate::configurator::Configurator;
use crate::error::BootstrapError;
use crate::properties::PropertyMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tracing::warn;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry};

const ROOT_LOGGER_KEY: &str = "log4j.rootLogger";
const LOGGER_PREFIX: &str = "log4j.logger";
const APPENDER_PREFIX: &str = "log4j.appender";

/// Map a log4j level name to a `tracing` filter level.
pub fn parse_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_uppercase().as_str() {
        "ALL" | "TRACE" => Some("trace"),
        "DEBUG" => Some("debug"),
        "INFO" => Some("info"),
        "WARN" => Some("warn"),
        "ERROR" | "FATAL" => Some("error"),
        "OFF" => Some("off"),
        _ => None,
    }
}

/// Where an appender writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppenderTarget {
    Stdout,
    Stderr,
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppenderPlan {
    pub name: String,
    pub target: AppenderTarget,
}

/// The backend configuration derived from a property map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingPlan {
    /// Filter level for events not matched by a logger directive
    pub root_level: &'static str,

    /// `target=level` directives, sorted by target
    pub directives: Vec<String>,

    /// Appenders referenced by some logger, in first-reference order
    pub appenders: Vec<AppenderPlan>,
}

impl Default for LoggingPlan {
    fn default() -> Self {
        Self {
            root_level: "off",
            directives: Vec::new(),
            appenders: Vec::new(),
        }
    }
}

impl LoggingPlan {
    /// Translate a merged property map. Entries that can't be understood are
    /// logged and skipped.
    pub fn from_properties(properties: &PropertyMap) -> Self {
        let mut plan = LoggingPlan::default();
        let mut referenced: Vec<String> = Vec::new();

        if let Some(spec) = properties.get_substituted(ROOT_LOGGER_KEY) {
            let (level, appenders) = split_logger_spec(&spec);
            if let Some(level) = level {
                match parse_level(level) {
                    Some(parsed) => plan.root_level = parsed,
                    None => warn!(logger = "root", requested = level, "Unknown log level, keeping default"),
                }
            }
            reference(&mut referenced, appenders);
        }

        let loggers: BTreeMap<&str, &str> = properties.with_prefix(LOGGER_PREFIX).collect();
        for (name, raw_spec) in loggers {
            let spec = properties.substitute(raw_spec);
            let (level, appenders) = split_logger_spec(&spec);
            if let Some(level) = level {
                match parse_level(level) {
                    Some(parsed) => plan
                        .directives
                        .push(format!("{}={}", name.replace('.', "::"), parsed)),
                    None => {
                        warn!(logger = name, requested = level, "Unknown log level, ignoring logger");
                        continue;
                    }
                }
            }
            reference(&mut referenced, appenders);
        }

        for name in referenced {
            match appender_target(properties, &name) {
                Ok(target) => plan.appenders.push(AppenderPlan { name, target }),
                Err(e) => warn!(appender = %name, error = %e, "Skipping appender"),
            }
        }

        plan
    }

    /// The plan's filter in `EnvFilter` directive syntax.
    pub fn filter_directives(&self) -> String {
        std::iter::once(self.root_level.to_string())
            .chain(self.directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }

    fn build_filter(&self) -> EnvFilter {
        EnvFilter::try_new(self.filter_directives()).unwrap_or_else(|e| {
            warn!(error = %e, "Invalid logger directives, using root level only");
            EnvFilter::new(self.root_level)
        })
    }
}

/// Split `LEVEL, a, b` into an optional level and appender names. An empty
/// level keeps the inherited one.
fn split_logger_spec(spec: &str) -> (Option<&str>, Vec<&str>) {
    let mut parts = spec.split(',').map(str::trim);
    let level = parts.next().filter(|level| !level.is_empty());
    let appenders = parts.filter(|name| !name.is_empty()).collect();
    (level, appenders)
}

fn reference(referenced: &mut Vec<String>, appenders: Vec<&str>) {
    for name in appenders {
        if !referenced.iter().any(|existing| existing == name) {
            referenced.push(name.to_string());
        }
    }
}

fn appender_target(properties: &PropertyMap, name: &str) -> Result<AppenderTarget, BootstrapError> {
    let key = format!("{}.{}", APPENDER_PREFIX, name);
    let class = properties
        .get(&key)
        .ok_or_else(|| BootstrapError::ConfigError(format!("appender '{}' is not defined", name)))?;

    if class.contains("Console") {
        let target = properties
            .get_substituted(&format!("{}.Target", key))
            .unwrap_or_default();
        return Ok(if target.trim() == "System.err" {
            AppenderTarget::Stderr
        } else {
            AppenderTarget::Stdout
        });
    }

    if class.contains("File") {
        let file = properties
            .get_substituted(&format!("{}.File", key))
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| {
                BootstrapError::ConfigError(format!("file appender '{}' has no File option", name))
            })?;
        return Ok(AppenderTarget::File(PathBuf::from(file)));
    }

    Err(BootstrapError::ConfigError(format!(
        "unsupported appender class '{}'",
        class
    )))
}

enum Sink {
    Stdout,
    Stderr,
    File(File),
}

impl Sink {
    fn open(target: &AppenderTarget) -> Result<Sink, BootstrapError> {
        match target {
            AppenderTarget::Stdout => Ok(Sink::Stdout),
            AppenderTarget::Stderr => Ok(Sink::Stderr),
            AppenderTarget::File(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                Ok(Sink::File(file))
            }
        }
    }
}

impl Write for Sink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Sink::Stdout => io::stdout().write(buf),
            Sink::Stderr => io::stderr().write(buf),
            Sink::File(file) => file.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sink::Stdout => io::stdout().flush(),
            Sink::Stderr => io::stderr().flush(),
            Sink::File(file) => file.flush(),
        }
    }
}

/// Shared, replaceable set of sinks the fmt layer writes to.
#[derive(Clone, Default)]
struct SinkSet {
    sinks: Arc<Mutex<Vec<Sink>>>,
}

impl SinkSet {
    fn replace(&self, sinks: Vec<Sink>) {
        let old = std::mem::replace(&mut *self.sinks.lock(), sinks);
        flush_all(old);
    }

    fn clear(&self) {
        self.replace(Vec::new());
    }
}

fn flush_all(mut sinks: Vec<Sink>) {
    for sink in sinks.iter_mut() {
        let _ = sink.flush();
    }
}

struct SinkWriter<'a> {
    set: &'a SinkSet,
}

impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for sink in self.set.sinks.lock().iter_mut() {
            let _ = sink.write_all(buf);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        for sink in self.set.sinks.lock().iter_mut() {
            let _ = sink.flush();
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for SinkSet {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter { set: self }
    }
}

/// Handles to the installed global subscriber.
struct Installed {
    filter: reload::Handle<EnvFilter, Registry>,
    sinks: SinkSet,
}

/// `None` once another global subscriber won the race.
static INSTALLED: OnceLock<Option<Installed>> = OnceLock::new();

fn install() -> Option<Installed> {
    let (filter, handle) = reload::Layer::new(EnvFilter::new("off"));
    let sinks = SinkSet::default();

    let result = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_timer(ChronoUtc::rfc_3339())
                .with_ansi(false)
                .with_writer(sinks.clone()),
        )
        .try_init();

    match result {
        Ok(()) => Some(Installed {
            filter: handle,
            sinks,
        }),
        Err(e) => {
            warn!(error = %e, "A global subscriber is already installed, logging configuration ignored");
            None
        }
    }
}

/// Filter used between `prepare` and `configure`: only this crate's own
/// warnings and errors.
const DIAGNOSTICS_FILTER: &str = concat!(env!("CARGO_CRATE_NAME"), "=warn");

/// [`Configurator`] backed by the global `tracing` subscriber.
///
/// While the configuration is being assembled, this crate's own diagnostics
/// go to the diagnostics target (stderr unless changed). `configure` then
/// replaces both the filter and the sinks.
#[derive(Debug, Clone)]
pub struct TracingConfigurator {
    diagnostics: AppenderTarget,
}

impl Default for TracingConfigurator {
    fn default() -> Self {
        Self {
            diagnostics: AppenderTarget::Stderr,
        }
    }
}

impl TracingConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send diagnostics emitted before `configure` to `target`.
    pub fn with_diagnostics(mut self, target: AppenderTarget) -> Self {
        self.diagnostics = target;
        self
    }

    /// Apply an already translated plan.
    pub fn apply(&self, plan: &LoggingPlan) -> Result<(), BootstrapError> {
        let installed = installed()?;

        let mut sinks = Vec::with_capacity(plan.appenders.len());
        for appender in &plan.appenders {
            match Sink::open(&appender.target) {
                Ok(sink) => sinks.push(sink),
                Err(e) => warn!(appender = %appender.name, error = %e, "Could not open appender"),
            }
        }
        installed.sinks.replace(sinks);

        installed
            .filter
            .reload(plan.build_filter())
            .map_err(|e| BootstrapError::Logging(e.to_string()))
    }

    fn route_diagnostics(&self) -> Result<(), BootstrapError> {
        let installed = installed()?;
        let sink = Sink::open(&self.diagnostics).unwrap_or(Sink::Stderr);
        installed.sinks.replace(vec![sink]);
        installed
            .filter
            .reload(EnvFilter::new(DIAGNOSTICS_FILTER))
            .map_err(|e| BootstrapError::Logging(e.to_string()))
    }
}

fn installed() -> Result<&'static Installed, BootstrapError> {
    INSTALLED.get_or_init(install).as_ref().ok_or_else(|| {
        BootstrapError::Logging("global subscriber owned by someone else".to_string())
    })
}

impl Configurator for TracingConfigurator {
    fn prepare(&self) {
        if let Err(e) = self.route_diagnostics() {
            warn!(error = %e, "Could not route bootstrap diagnostics");
        }
    }

    fn configure(&self, properties: &PropertyMap) {
        let plan = LoggingPlan::from_properties(properties);
        if let Err(e) = self.apply(&plan) {
            warn!(error = %e, "Could not apply logging configuration");
        }
    }

    fn shutdown(&self) {
        let Some(Some(installed)) = INSTALLED.get() else {
            return;
        };
        if let Err(e) = installed.filter.reload(EnvFilter::new("off")) {
            warn!(error = %e, "Could not disable logging filter");
        }
        installed.sinks.clear();
    }
}
