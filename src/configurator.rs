//! The seam between the bootstrap and the logging backend.

use crate::properties::PropertyMap;
use std::sync::Arc;

/// A logging backend that can be configured from a merged property map.
///
/// `prepare` runs before the configuration is assembled so diagnostics about
/// unreadable sources have somewhere to go. `configure` is called once per
/// initialization with the final map, even when it is empty. `shutdown`
/// releases everything the backend holds and is called once per teardown.
pub trait Configurator: Send + Sync {
    fn prepare(&self) {}

    fn configure(&self, properties: &PropertyMap);

    fn shutdown(&self);
}

impl<T: Configurator + ?Sized> Configurator for Arc<T> {
    fn prepare(&self) {
        (**self).prepare()
    }

    fn configure(&self, properties: &PropertyMap) {
        (**self).configure(properties)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}

impl<T: Configurator + ?Sized> Configurator for Box<T> {
    fn prepare(&self) {
        (**self).prepare()
    }

    fn configure(&self, properties: &PropertyMap) {
        (**self).configure(properties)
    }

    fn shutdown(&self) {
        (**self).shutdown()
    }
}
