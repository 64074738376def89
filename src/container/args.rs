use std::any::{type_name, Any};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::core::{Container, Injectable, Instance, Resolution};
use super::error::ResolveError;
use super::key::ServiceKey;

/// Explicit arguments for [`Container::call`], keyed by parameter name.
#[derive(Clone, Default)]
pub struct NamedArgs {
    values: HashMap<Cow<'static, str>, Instance>,
}

impl fmt::Debug for NamedArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

impl NamedArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`NamedArgs::insert`]
    #[must_use]
    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<Cow<'static, str>>, value: T) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, name: impl Into<Cow<'static, str>>, value: T) {
        self.insert_arc(name, Arc::new(value));
    }

    pub fn insert_arc<T: Any + Send + Sync>(
        &mut self,
        name: impl Into<Cow<'static, str>>,
        value: Arc<T>,
    ) {
        let value: Instance = value;
        self.values.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.values.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Parameter source handed to a callable by [`Container::call`].
///
/// A callable asks for each of its parameters by name and declared type.
/// Resolution order is always: an exact-name entry in the [`NamedArgs`],
/// then (for service-typed parameters) a container lookup keyed by the type,
/// then the default the callable supplies. A parameter none of these
/// satisfy fails with [`ResolveError::UnresolvableParameter`].
pub struct Arguments<'c> {
    resolution: Resolution<'c>,
    named: NamedArgs,
}

impl<'c> Arguments<'c> {
    pub(crate) fn new(resolution: Resolution<'c>, named: NamedArgs) -> Self {
        Self { resolution, named }
    }

    #[must_use]
    pub fn named(&self) -> &NamedArgs {
        &self.named
    }

    #[must_use]
    pub fn container(&self) -> &'c Container {
        self.resolution.container()
    }

    /// Underlying resolution path, for callables that resolve by hand
    pub fn resolution(&mut self) -> &mut Resolution<'c> {
        &mut self.resolution
    }

    /// Plain value parameter without a default: named argument or failure.
    pub fn value<T: Any + Send + Sync + Clone>(&self, name: &str) -> Result<T, ResolveError> {
        self.named_value::<T>(name)?
            .ok_or_else(|| unresolvable::<T>(name))
    }

    /// Plain value parameter with a default.
    pub fn value_or<T: Any + Send + Sync + Clone>(
        &self,
        name: &str,
        default: T,
    ) -> Result<T, ResolveError> {
        Ok(self.named_value::<T>(name)?.unwrap_or(default))
    }

    /// Service parameter: named argument, else the container's binding for `T`.
    pub fn service<T: Any + Send + Sync>(&mut self, name: &str) -> Result<Arc<T>, ResolveError> {
        if let Some(value) = self.named_arc::<T>(name)? {
            return Ok(value);
        }
        if !self.container().has(&ServiceKey::of::<T>()) {
            return Err(unresolvable::<T>(name));
        }
        self.resolution.get::<T>()
    }

    /// Service parameter with a default used when `T` is neither passed nor bound.
    pub fn service_or<T, F>(&mut self, name: &str, default: F) -> Result<Arc<T>, ResolveError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        if let Some(value) = self.named_arc::<T>(name)? {
            return Ok(value);
        }
        if self.container().has(&ServiceKey::of::<T>()) {
            return self.resolution.get::<T>();
        }
        Ok(Arc::new(default()))
    }

    /// Service parameter of a constructible type: named argument, else the
    /// binding, else direct construction.
    pub fn autowire<T: Injectable>(&mut self, name: &str) -> Result<Arc<T>, ResolveError> {
        if let Some(value) = self.named_arc::<T>(name)? {
            return Ok(value);
        }
        self.resolution.make::<T>()
    }

    fn named_arc<T: Any + Send + Sync>(&self, name: &str) -> Result<Option<Arc<T>>, ResolveError> {
        match self.named.get(name) {
            None => Ok(None),
            Some(instance) => Arc::clone(instance)
                .downcast::<T>()
                .map(Some)
                .map_err(|_| ResolveError::TypeMismatch {
                    key: name.to_string(),
                    expected: type_name::<T>(),
                }),
        }
    }

    fn named_value<T: Any + Send + Sync + Clone>(
        &self,
        name: &str,
    ) -> Result<Option<T>, ResolveError> {
        Ok(self.named_arc::<T>(name)?.map(|v| T::clone(&v)))
    }
}

fn unresolvable<T>(name: &str) -> ResolveError {
    ResolveError::UnresolvableParameter {
        parameter: name.to_string(),
        expected: type_name::<T>(),
    }
}
