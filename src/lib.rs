//! Logboot: layered `.properties` bootstrap for process-wide logging
//!
//! Merges a bundled default configuration, an optional external base file,
//! logger resources contributed by bundled components and per-logger override
//! files, then applies the result to the logging backend exactly once until
//! the bootstrap is destroyed.
//!
//! ```no_run
//! logboot::init();
//! tracing::info!("application started");
//! logboot::destroy();
//! ```

pub mod bootstrap;
pub mod configurator;
pub mod error;
pub mod layers;
pub mod logging;
pub mod merge;
pub mod properties;
pub mod resources;
pub mod settings;
pub mod source;

pub use bootstrap::{destroy, global, init, init_in, init_with, is_initialized, LogBootstrap};
pub use configurator::Configurator;
pub use error::BootstrapError;
pub use logging::TracingConfigurator;
pub use merge::{MergeReport, SourceOutcome, SourceStatus};
pub use properties::PropertyMap;
pub use resources::{EmbeddedBundle, ResourcePath};
pub use settings::{BootstrapSettings, LOGS_FOLDER_VARIABLE};
pub use source::{ResourceProvider, SourceKind};
