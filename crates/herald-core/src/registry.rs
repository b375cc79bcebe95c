//! Handler registry keyed by request/response type identity.
//!
//! Populated once at startup through `&mut self`, then shared behind an
//! `Arc`. Resolves take `&self` and need no locking.

use crate::{Handler, HeraldError, HeraldResult, Request};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Type-erased binding. Holds an `Arc<dyn Handler<R>>` for one concrete `R`.
struct Binding {
    handler: Box<dyn Any + Send + Sync>,
    request_type: &'static str,
    response_type: &'static str,
}

/// Registry mapping `(request type, response type)` to one handler.
#[derive(Default)]
pub struct HandlerRegistry {
    bindings: HashMap<(TypeId, TypeId), Binding>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a set of registration sources.
    ///
    /// Fails on the first duplicate binding.
    pub fn from_sources(sources: &[&dyn RegistrationSource]) -> HeraldResult<Self> {
        let mut registry = Self::new();
        for source in sources {
            source.register_handlers(&mut registry)?;
            debug!(source = source.name(), "Registration source applied");
        }
        info!(handlers = registry.len(), "Handler registry built");
        Ok(registry)
    }

    /// Bind `handler` to request type `R`.
    ///
    /// The first registration wins; a second one for the same pair is
    /// rejected with [`HeraldError::DuplicateBinding`] and leaves the
    /// registry unchanged.
    pub fn register<R, H>(&mut self, handler: H) -> HeraldResult<()>
    where
        R: Request,
        H: Handler<R>,
    {
        self.register_arc::<R>(Arc::new(handler))
    }

    /// Bind an already shared handler to request type `R`.
    pub fn register_arc<R>(&mut self, handler: Arc<dyn Handler<R>>) -> HeraldResult<()>
    where
        R: Request,
    {
        let key = Self::key::<R>();
        if self.bindings.contains_key(&key) {
            let err = HeraldError::duplicate_binding::<R, R::Response>();
            warn!(error = %err, "Rejected duplicate handler binding");
            return Err(err);
        }

        let binding = Binding {
            handler: Box::new(handler),
            request_type: std::any::type_name::<R>(),
            response_type: std::any::type_name::<R::Response>(),
        };

        debug!(
            request = binding.request_type,
            response = binding.response_type,
            "Handler registered"
        );

        self.bindings.insert(key, binding);
        Ok(())
    }

    /// Resolve the handler bound to request type `R`.
    pub fn resolve<R>(&self) -> HeraldResult<Arc<dyn Handler<R>>>
    where
        R: Request,
    {
        self.bindings
            .get(&Self::key::<R>())
            .and_then(|binding| binding.handler.downcast_ref::<Arc<dyn Handler<R>>>())
            .cloned()
            .ok_or_else(HeraldError::handler_not_found::<R, R::Response>)
    }

    /// Check whether a handler is bound for request type `R`.
    #[must_use]
    pub fn contains<R: Request>(&self) -> bool {
        self.bindings.contains_key(&Self::key::<R>())
    }

    /// Number of bound handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether no handler is bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Request type names of all bindings, for diagnostics.
    #[must_use]
    pub fn request_types(&self) -> Vec<&'static str> {
        self.bindings.values().map(|b| b.request_type).collect()
    }

    fn key<R: Request>() -> (TypeId, TypeId) {
        (TypeId::of::<R>(), TypeId::of::<R::Response>())
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handler_count", &self.bindings.len())
            .field(
                "bindings",
                &self
                    .bindings
                    .values()
                    .map(|b| (b.request_type, b.response_type))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Supplies handler bindings at startup.
///
/// How handlers are discovered (manual lists, generated code, plugins) is up
/// to the implementor; the registry only sees explicit `register` calls.
pub trait RegistrationSource {
    /// Source name used in logs.
    fn name(&self) -> &str;

    /// Register every handler this source provides.
    fn register_handlers(&self, registry: &mut HandlerRegistry) -> HeraldResult<()>;
}
