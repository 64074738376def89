//! Container core: binding table, singleton cells and the resolution path.
//!
//! Every resolution runs through a [`Resolution`], which records the keys
//! currently under construction on this call path. A key that shows up twice
//! on that path is a cycle and fails fast instead of recursing until the
//! stack runs out. Singleton construction is additionally tracked
//! container-wide (see `inflight`), which catches cycles that leave the path:
//! a factory resolving through [`Resolution::container`], or two threads each
//! building one half of a cycle.

use once_cell::sync::OnceCell;
use std::any::{type_name, Any};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::args::{Arguments, NamedArgs};
use super::error::ResolveError;
use super::inflight::{Claim, InFlight};
use super::key::{Lifecycle, ServiceKey};

/// Default limit on how many services may be under construction at once on
/// a single resolution path.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Type-erased service instance as stored in the container.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory = dyn Fn(&mut Resolution<'_>) -> Result<Instance, ResolveError> + Send + Sync;

/// A type the container can build without an explicit binding.
///
/// This is the typed replacement for constructor introspection: the
/// implementation asks the [`Resolution`] for each dependency it needs and
/// supplies defaults for plain values itself.
///
/// ```rust
/// use switchyard::container::{Container, Injectable, Resolution, ResolveError};
/// use std::sync::Arc;
///
/// struct Clock;
/// impl Injectable for Clock {
///     fn construct(_: &mut Resolution<'_>) -> Result<Self, ResolveError> {
///         Ok(Clock)
///     }
/// }
///
/// struct Greeter {
///     clock: Arc<Clock>,
///     greeting: String,
/// }
/// impl Injectable for Greeter {
///     fn construct(r: &mut Resolution<'_>) -> Result<Self, ResolveError> {
///         Ok(Greeter {
///             clock: r.make::<Clock>()?,
///             greeting: "hello".to_string(),
///         })
///     }
/// }
///
/// let container = Container::new();
/// let greeter = container.make::<Greeter>().unwrap();
/// assert_eq!(greeter.greeting, "hello");
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    /// Build an instance, resolving dependencies through `resolution`.
    fn construct(resolution: &mut Resolution<'_>) -> Result<Self, ResolveError>;
}

enum Producer {
    /// Closure run on every construction
    Factory(Box<Factory>),
    /// Resolve another key in place of this one
    Alias(ServiceKey),
    /// Pre-built instance handed out as is
    Value(Instance),
}

struct Binding {
    producer: Producer,
    lifecycle: Lifecycle,
    /// Populated once for singleton bindings, unused for transient ones.
    /// Only the thread holding the [`InFlight`] claim ever initializes it.
    instance: OnceCell<Instance>,
}

/// Service container mapping [`ServiceKey`]s to producers.
///
/// Registration takes `&mut self` and happens during start-up. Once the
/// container is shared (typically behind an `Arc`), resolution only needs
/// `&self`; singleton construction is synchronized per binding.
pub struct Container {
    bindings: HashMap<ServiceKey, Binding>,
    /// Registration order, used by [`Container::warm_up`]
    order: Vec<ServiceKey>,
    max_depth: usize,
    in_flight: InFlight,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("bindings", &self.order)
            .field("max_depth", &self.max_depth)
            .finish()
    }
}

impl Container {
    /// Create an empty container with [`DEFAULT_MAX_DEPTH`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            order: Vec::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            in_flight: InFlight::default(),
        }
    }

    /// Override the resolution depth limit (minimum 1)
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth.max(1);
        self
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Register a transient binding for `T`: `factory` runs on every resolution.
    pub fn bind<T, F>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolution<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert(
            ServiceKey::of::<T>(),
            Producer::Factory(boxed(factory)),
            Lifecycle::Transient,
        );
    }

    /// Register a transient binding under a string key.
    pub fn bind_named<T, F>(&mut self, name: impl Into<Cow<'static, str>>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolution<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert(
            ServiceKey::named(name),
            Producer::Factory(boxed(factory)),
            Lifecycle::Transient,
        );
    }

    /// Self-binding: `T` is its own producer.
    pub fn bind_self<T: Injectable>(&mut self) {
        self.bind::<T, _>(T::construct);
    }

    /// Register a singleton binding for `T`: `factory` runs at most once.
    pub fn singleton<T, F>(&mut self, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolution<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert(
            ServiceKey::of::<T>(),
            Producer::Factory(boxed(factory)),
            Lifecycle::Singleton,
        );
    }

    /// Register a singleton binding under a string key.
    pub fn singleton_named<T, F>(&mut self, name: impl Into<Cow<'static, str>>, factory: F)
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolution<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
    {
        self.insert(
            ServiceKey::named(name),
            Producer::Factory(boxed(factory)),
            Lifecycle::Singleton,
        );
    }

    /// Singleton self-binding for an [`Injectable`] type.
    pub fn singleton_self<T: Injectable>(&mut self) {
        self.singleton::<T, _>(T::construct);
    }

    /// Register an already-built value for `T`.
    pub fn instance<T: Send + Sync + 'static>(&mut self, value: T) {
        self.instance_arc(Arc::new(value));
    }

    /// Register an already-shared value for `T`; resolutions return clones
    /// of this exact `Arc`.
    pub fn instance_arc<T: Send + Sync + 'static>(&mut self, value: Arc<T>) {
        let value: Instance = value;
        self.insert(
            ServiceKey::of::<T>(),
            Producer::Value(value),
            Lifecycle::Singleton,
        );
    }

    /// Register an already-built value under a string key.
    pub fn instance_named<T: Send + Sync + 'static>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        value: T,
    ) {
        let value: Instance = Arc::new(value);
        self.insert(
            ServiceKey::named(name),
            Producer::Value(value),
            Lifecycle::Singleton,
        );
    }

    /// Make `name` resolve to whatever `target` resolves to. The target's
    /// own lifecycle applies.
    pub fn alias(&mut self, name: impl Into<Cow<'static, str>>, target: ServiceKey) {
        self.insert(
            ServiceKey::named(name),
            Producer::Alias(target),
            Lifecycle::Transient,
        );
    }

    fn insert(&mut self, key: ServiceKey, producer: Producer, lifecycle: Lifecycle) {
        let binding = Binding {
            producer,
            lifecycle,
            instance: OnceCell::new(),
        };
        if self.bindings.insert(key.clone(), binding).is_some() {
            warn!(service = %key, lifecycle = ?lifecycle, "Replaced existing binding");
        } else {
            debug!(service = %key, lifecycle = ?lifecycle, "Binding registered");
            self.order.push(key);
        }
    }

    /// Whether a binding exists for `key`
    #[must_use]
    pub fn has(&self, key: &ServiceKey) -> bool {
        self.bindings.contains_key(key)
    }

    /// Whether a binding exists for the type `T`
    #[must_use]
    pub fn has_type<T: ?Sized + 'static>(&self) -> bool {
        self.has(&ServiceKey::of::<T>())
    }

    /// Lifecycle of the binding for `key`, if any
    #[must_use]
    pub fn lifecycle(&self, key: &ServiceKey) -> Option<Lifecycle> {
        self.bindings.get(key).map(|b| b.lifecycle)
    }

    /// Registered keys in registration order
    pub fn keys(&self) -> impl Iterator<Item = &ServiceKey> {
        self.order.iter()
    }

    /// Start a fresh resolution path
    #[must_use]
    pub fn resolution(&self) -> Resolution<'_> {
        Resolution {
            container: self,
            path: Vec::new(),
        }
    }

    /// Resolve `T` through its binding.
    pub fn get<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ResolveError> {
        self.resolution().get::<T>()
    }

    /// Resolve the binding registered under `name` as a `T`.
    pub fn get_named<T: Any + Send + Sync>(
        &self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>, ResolveError> {
        self.resolution().get_named::<T>(name)
    }

    /// Resolve `T` through its binding, or construct it directly when unbound.
    pub fn make<T: Injectable>(&self) -> Result<Arc<T>, ResolveError> {
        self.resolution().make::<T>()
    }

    /// Resolve a key to its type-erased instance.
    pub fn resolve(&self, key: &ServiceKey) -> Result<Instance, ResolveError> {
        self.resolution().resolve(key)
    }

    /// Argument view for invoking a callable with `named` arguments.
    #[must_use]
    pub fn arguments(&self, named: NamedArgs) -> Arguments<'_> {
        Arguments::new(self.resolution(), named)
    }

    /// Invoke `callable`, letting it pull each parameter from `named`, from
    /// the container, or from a default. See [`Arguments`] for the order.
    pub fn call<R, E, F>(&self, named: NamedArgs, callable: F) -> Result<R, E>
    where
        F: FnOnce(&mut Arguments<'_>) -> Result<R, E>,
    {
        let mut args = self.arguments(named);
        callable(&mut args)
    }

    /// Construct every singleton binding now, in registration order.
    ///
    /// Intended for start-up: any error here (missing dependency, cycle)
    /// should abort the process before it starts taking traffic.
    pub fn warm_up(&self) -> Result<usize, ResolveError> {
        let start = Instant::now();
        let mut constructed = 0usize;
        for key in &self.order {
            let Some(binding) = self.bindings.get(key) else {
                continue;
            };
            if binding.lifecycle != Lifecycle::Singleton
                || matches!(binding.producer, Producer::Value(_))
            {
                continue;
            }
            self.resolve(key)?;
            constructed += 1;
        }
        info!(
            singletons = constructed,
            duration_us = start.elapsed().as_micros() as u64,
            "Singleton warm-up complete"
        );
        Ok(constructed)
    }
}

/// One resolution path through the container.
///
/// Factories and [`Injectable::construct`] receive the path they are running
/// on, so nested lookups extend it and cycles are visible.
pub struct Resolution<'c> {
    container: &'c Container,
    path: Vec<ServiceKey>,
}

impl<'c> Resolution<'c> {
    /// The container this path resolves against
    #[must_use]
    pub fn container(&self) -> &'c Container {
        self.container
    }

    /// Number of services currently under construction on this path
    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// Resolve `T` through its binding.
    pub fn get<T: Any + Send + Sync>(&mut self) -> Result<Arc<T>, ResolveError> {
        let key = ServiceKey::of::<T>();
        let instance = self.resolve(&key)?;
        downcast::<T>(instance, &key)
    }

    /// Resolve the binding registered under `name` as a `T`.
    pub fn get_named<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
    ) -> Result<Arc<T>, ResolveError> {
        let key = ServiceKey::named(name);
        let instance = self.resolve(&key)?;
        downcast::<T>(instance, &key)
    }

    /// Resolve `T` through its binding, or construct it directly when unbound.
    ///
    /// Direct construction is never cached: an unbound type behaves like a
    /// transient self-binding.
    pub fn make<T: Injectable>(&mut self) -> Result<Arc<T>, ResolveError> {
        let key = ServiceKey::of::<T>();
        if self.container.has(&key) {
            return self.get::<T>();
        }
        self.enter(&key)?;
        let built = T::construct(self);
        self.leave();
        debug!(service = %key, "Constructed unbound service");
        built.map(Arc::new)
    }

    /// Resolve a key to its type-erased instance.
    pub fn resolve(&mut self, key: &ServiceKey) -> Result<Instance, ResolveError> {
        let container = self.container;
        let binding = container
            .bindings
            .get(key)
            .ok_or_else(|| ResolveError::UnresolvableDependency {
                key: key.to_string(),
            })?;

        if let Producer::Value(value) = &binding.producer {
            return Ok(Arc::clone(value));
        }

        match binding.lifecycle {
            Lifecycle::Transient => {
                self.enter(key)?;
                let result = self.run(&binding.producer);
                self.leave();
                result
            }
            Lifecycle::Singleton => {
                if let Some(existing) = binding.instance.get() {
                    return Ok(Arc::clone(existing));
                }
                self.enter(key)?;
                let result = self.build_singleton(key, binding);
                self.leave();
                result
            }
        }
    }

    fn build_singleton(
        &mut self,
        key: &ServiceKey,
        binding: &'c Binding,
    ) -> Result<Instance, ResolveError> {
        let claim = self
            .container
            .in_flight
            .claim(key, || binding.instance.get().is_some())?;
        if let Claim::Owned(_guard) = claim {
            let instance = self.run(&binding.producer)?;
            info!(service = %key, "Singleton constructed");
            return Ok(Arc::clone(binding.instance.get_or_init(|| instance)));
        }
        binding
            .instance
            .get()
            .map(Arc::clone)
            .ok_or_else(|| ResolveError::construction(key.to_string(), "singleton was not stored"))
    }

    fn run(&mut self, producer: &'c Producer) -> Result<Instance, ResolveError> {
        match producer {
            Producer::Factory(factory) => factory(self),
            Producer::Alias(target) => self.resolve(target),
            Producer::Value(value) => Ok(Arc::clone(value)),
        }
    }

    fn enter(&mut self, key: &ServiceKey) -> Result<(), ResolveError> {
        if self.path.contains(key) {
            let mut chain: Vec<String> = self
                .path
                .iter()
                .skip_while(|k| *k != key)
                .map(ToString::to_string)
                .collect();
            chain.push(key.to_string());
            warn!(chain = ?chain, "Cyclic dependency detected");
            return Err(ResolveError::CyclicDependency { chain });
        }
        if self.path.len() >= self.container.max_depth {
            return Err(ResolveError::DepthExceeded {
                depth: self.container.max_depth,
                key: key.to_string(),
            });
        }
        self.path.push(key.clone());
        Ok(())
    }

    fn leave(&mut self) {
        self.path.pop();
    }
}

fn boxed<T, F>(factory: F) -> Box<Factory>
where
    T: Send + Sync + 'static,
    F: Fn(&mut Resolution<'_>) -> Result<T, ResolveError> + Send + Sync + 'static,
{
    Box::new(move |r: &mut Resolution<'_>| factory(r).map(|value| Arc::new(value) as Instance))
}

pub(crate) fn downcast<T: Any + Send + Sync>(
    instance: Instance,
    key: &ServiceKey,
) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast::<T>()
        .map_err(|_| ResolveError::TypeMismatch {
            key: key.to_string(),
            expected: type_name::<T>(),
        })
}
