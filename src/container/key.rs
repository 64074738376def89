use std::any::{type_name, TypeId};
use std::borrow::Cow;
use std::fmt::{Display, Formatter};

/// Identifier a binding is registered and looked up under.
///
/// Type keys are derived from a Rust type and compare by [`TypeId`]; the
/// stored type name is only carried for diagnostics. Named keys are free-form
/// string aliases. Both kinds live in the same binding table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    /// Key derived from a concrete Rust type
    Type {
        /// Identity of the type
        id: TypeId,
        /// `std::any::type_name` of the type, for logs and error messages
        name: &'static str,
    },
    /// String alias (e.g. `"cache.default"`)
    Named(Cow<'static, str>),
}

impl ServiceKey {
    /// Key for the Rust type `T`
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceKey::Type {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    /// Key for a string alias
    #[must_use]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        ServiceKey::Named(name.into())
    }

    /// Human readable form used in logs and error chains
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            ServiceKey::Type { name, .. } => name,
            ServiceKey::Named(name) => name.as_ref(),
        }
    }
}

impl Display for ServiceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// How long a resolved instance lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// A fresh instance on every resolution
    Transient,
    /// Constructed at most once and shared for the lifetime of the container
    Singleton,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn type_keys_compare_by_type() {
        assert_eq!(ServiceKey::of::<Marker>(), ServiceKey::of::<Marker>());
        assert_ne!(ServiceKey::of::<Marker>(), ServiceKey::of::<String>());
    }

    #[test]
    fn named_keys_are_distinct_from_type_keys() {
        let named = ServiceKey::named("Marker");
        assert_ne!(named, ServiceKey::of::<Marker>());
        assert_eq!(named.label(), "Marker");
    }

    #[test]
    fn label_uses_type_name() {
        assert!(ServiceKey::of::<Marker>().to_string().ends_with("Marker"));
    }
}
