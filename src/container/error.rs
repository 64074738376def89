use thiserror::Error;

/// Failure to produce a service or a call argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No binding exists and the key is not directly constructible
    #[error("unresolvable dependency: no binding registered for `{key}`")]
    UnresolvableDependency {
        /// Label of the missing key
        key: String,
    },

    /// A callable parameter matched no named argument, binding or default
    #[error("unresolvable dependency: cannot resolve parameter `{parameter}` ({expected})")]
    UnresolvableParameter {
        /// Parameter name as requested by the callable
        parameter: String,
        /// Declared Rust type of the parameter
        expected: &'static str,
    },

    /// The stored instance is not of the requested type
    #[error("type mismatch for `{key}`: expected {expected}")]
    TypeMismatch {
        /// Label of the key or parameter
        key: String,
        /// Requested Rust type
        expected: &'static str,
    },

    /// A key was requested again while it was still being constructed
    #[error("cyclic dependency: {}", chain.join(" -> "))]
    CyclicDependency {
        /// Keys on the resolution path, ending with the repeated key
        chain: Vec<String>,
    },

    /// The resolution path grew past the configured depth limit
    #[error("resolution depth {depth} exceeded while resolving `{key}`")]
    DepthExceeded {
        /// Configured maximum depth
        depth: usize,
        /// Key that would have exceeded it
        key: String,
    },

    /// A factory or constructor reported its own failure
    #[error("failed to construct `{key}`: {message}")]
    Construction {
        /// Label of the key being built
        key: String,
        /// Factory supplied description
        message: String,
    },
}

impl ResolveError {
    /// Convenience for factories that fail for reasons of their own
    pub fn construction(key: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::Construction {
            key: key.into(),
            message: message.into(),
        }
    }
}
