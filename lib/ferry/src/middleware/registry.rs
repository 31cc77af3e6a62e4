//! Process-wide middleware registration.
//!
//! The registry is append-only. Clients take a snapshot when they are built,
//! so registering a middleware only affects clients built afterwards.

use std::fmt;
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use super::Middleware;

static GLOBAL: Registry = Registry::new();

/// Ordered, append-only set of middlewares.
///
/// [`Registry::global`] is the registry every [`crate::ClientBuilder::build`]
/// compiles against. Independent instances can be passed to
/// [`crate::ClientBuilder::build_with`].
pub struct Registry {
    middlewares: RwLock<Vec<Middleware>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            middlewares: RwLock::new(Vec::new()),
        }
    }

    /// The process-wide registry.
    #[must_use]
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Append a middleware.
    pub fn register(&self, middleware: Middleware) {
        debug!(middleware = middleware.name(), "registering middleware");
        self.middlewares
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(middleware);
    }

    /// Copy of the current registrations, in registration order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Middleware> {
        self.middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Names of the registered middlewares, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|middleware| middleware.name().to_owned())
            .collect()
    }

    /// Number of registered middlewares.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middlewares
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("middlewares", &self.names())
            .finish()
    }
}

/// Register a middleware with the process-wide registry.
///
/// Affects every client built afterwards; existing clients keep their chains.
pub fn register(middleware: Middleware) {
    Registry::global().register(middleware);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_registry_is_empty() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn registration_order_is_kept() {
        let registry = Registry::new();
        registry.register(Middleware::builder("first").build());
        registry.register(Middleware::builder("second").build());

        assert_eq!(registry.names(), ["first", "second"]);
    }

    #[test]
    fn snapshots_ignore_later_registrations() {
        let registry = Registry::new();
        registry.register(Middleware::builder("first").build());
        let snapshot = registry.snapshot();

        registry.register(Middleware::builder("second").build());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.len(), 2);
    }
}
