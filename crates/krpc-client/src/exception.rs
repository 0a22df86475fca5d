//! Translation of server error tags into typed exceptions.
//!
//! The server reports failures as `(service, name, description)`. Generated
//! service wrappers register one factory per exception class they know about;
//! anything unregistered surfaces as [`ClientError::Rpc`].

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use krpc_schema as schema;
use tracing::debug;

use crate::error::ClientError;

/// Builds a typed exception from the server's description.
pub type ExceptionFactory = Arc<dyn Fn(&str) -> Box<dyn Error + Send + Sync> + Send + Sync>;

/// Map from `(service, name)` to exception factory, owned by one client.
#[derive(Default)]
pub struct ExceptionRegistry {
    throwers: RwLock<HashMap<(String, String), ExceptionFactory>>,
}

impl ExceptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` for errors tagged `(service, name)`.
    ///
    /// Returns `true` when an earlier factory for the same tag was replaced.
    pub fn register<F, E>(
        &self,
        service: impl Into<String>,
        name: impl Into<String>,
        factory: F,
    ) -> bool
    where
        F: Fn(&str) -> E + Send + Sync + 'static,
        E: Error + Send + Sync + 'static,
    {
        let factory: ExceptionFactory =
            Arc::new(move |message: &str| -> Box<dyn Error + Send + Sync> {
                Box::new(factory(message))
            });
        self.register_factory(service, name, factory)
    }

    /// Register a factory that already boxes its error.
    pub fn register_factory(
        &self,
        service: impl Into<String>,
        name: impl Into<String>,
        factory: ExceptionFactory,
    ) -> bool {
        let key = (service.into(), name.into());
        debug!(service = %key.0, name = %key.1, "exception thrower registered");
        self.throwers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, factory)
            .is_some()
    }

    /// Remove the factory for `(service, name)`.
    pub fn unregister(&self, service: &str, name: &str) -> bool {
        self.throwers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(service.to_string(), name.to_string()))
            .is_some()
    }

    pub fn contains(&self, service: &str, name: &str) -> bool {
        self.lookup(service, name).is_some()
    }

    pub fn len(&self) -> usize {
        self.throwers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, service: &str, name: &str) -> Option<ExceptionFactory> {
        self.throwers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(service.to_string(), name.to_string()))
            .cloned()
    }

    /// Convert a server error into the error a caller should see.
    pub fn translate(&self, error: &schema::Error) -> ClientError {
        // The factory runs outside the lock.
        if let Some(factory) = self.lookup(&error.service, &error.name) {
            return ClientError::Service {
                service: error.service.clone(),
                name: error.name.clone(),
                source: factory(&error.description),
            };
        }
        ClientError::Rpc {
            service: error.service.clone(),
            name: error.name.clone(),
            message: error.description.clone(),
            stack_trace: (!error.stack_trace.is_empty()).then(|| error.stack_trace.clone()),
        }
    }
}

impl fmt::Debug for ExceptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let throwers = self.throwers.read().unwrap_or_else(PoisonError::into_inner);
        let mut tags: Vec<String> = throwers
            .keys()
            .map(|(service, name)| format!("{service}.{name}"))
            .collect();
        tags.sort();
        f.debug_struct("ExceptionRegistry")
            .field("throwers", &tags)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error, PartialEq)]
    #[error("invalid operation: {0}")]
    struct InvalidOperation(String);

    #[derive(Debug, thiserror::Error)]
    #[error("argument out of range: {0}")]
    struct OutOfRange(String);

    #[test]
    fn registered_tag_yields_typed_error() {
        let registry = ExceptionRegistry::new();
        registry.register("SpaceCenter", "InvalidOperation", |m: &str| {
            InvalidOperation(m.to_string())
        });

        let err = registry.translate(&schema::Error::typed(
            "SpaceCenter",
            "InvalidOperation",
            "no active vessel",
        ));

        assert_eq!(
            err.downcast_ref::<InvalidOperation>(),
            Some(&InvalidOperation("no active vessel".into()))
        );
        assert_eq!(err.remote_tag(), Some(("SpaceCenter", "InvalidOperation")));
    }

    #[test]
    fn unregistered_tag_yields_generic_error() {
        let registry = ExceptionRegistry::new();
        registry.register("SpaceCenter", "InvalidOperation", |m: &str| {
            InvalidOperation(m.to_string())
        });

        let mut wire = schema::Error::typed("SpaceCenter", "Other", "boom");
        wire.stack_trace = "at Foo()".into();
        match registry.translate(&wire) {
            ClientError::Rpc {
                service,
                name,
                message,
                stack_trace,
            } => {
                assert_eq!(service, "SpaceCenter");
                assert_eq!(name, "Other");
                assert_eq!(message, "boom");
                assert_eq!(stack_trace.as_deref(), Some("at Foo()"));
            }
            other => panic!("expected generic error, got {other:?}"),
        }
    }

    #[test]
    fn tags_are_scoped_by_service() {
        let registry = ExceptionRegistry::new();
        registry.register("A", "Err", |m: &str| InvalidOperation(m.to_string()));
        registry.register("B", "Err", |m: &str| OutOfRange(m.to_string()));

        let a = registry.translate(&schema::Error::typed("A", "Err", "x"));
        let b = registry.translate(&schema::Error::typed("B", "Err", "y"));
        assert!(a.downcast_ref::<InvalidOperation>().is_some());
        assert!(b.downcast_ref::<OutOfRange>().is_some());
    }

    #[test]
    fn register_replaces_and_unregister_removes() {
        let registry = ExceptionRegistry::new();
        assert!(!registry.register("S", "E", |m: &str| InvalidOperation(m.to_string())));
        assert!(registry.register("S", "E", |m: &str| OutOfRange(m.to_string())));
        assert_eq!(registry.len(), 1);

        let err = registry.translate(&schema::Error::typed("S", "E", "late"));
        assert!(err.downcast_ref::<OutOfRange>().is_some());

        assert!(registry.unregister("S", "E"));
        assert!(!registry.contains("S", "E"));
        assert!(registry.is_empty());
    }

    #[test]
    fn untyped_error_has_no_stack_trace() {
        let registry = ExceptionRegistry::new();
        let err = registry.translate(&schema::Error::untyped("procedure not found"));
        assert!(matches!(err, ClientError::Rpc { stack_trace: None, .. }));
        assert_eq!(err.to_string(), "rpc error: procedure not found");
    }

    #[test]
    fn debug_lists_tags() {
        let registry = ExceptionRegistry::new();
        registry.register("S", "E", |m: &str| InvalidOperation(m.to_string()));
        assert!(format!("{registry:?}").contains("S.E"));
    }
}
