//! # Container Module
//!
//! Dependency resolution for handlers, controllers and middleware.
//!
//! ## Overview
//!
//! The container maps a [`ServiceKey`] (a Rust type or a string alias) to a
//! producer and a [`Lifecycle`]:
//!
//! - **Transient** bindings run their producer on every resolution
//! - **Singleton** bindings run it at most once, even under concurrent first
//!   access, and hand out clones of the same `Arc` afterwards
//!
//! Types that implement [`Injectable`] can be built without any binding at
//! all; their `construct` function requests its own dependencies, which is
//! how autowiring works without runtime reflection.
//!
//! ## Cycles
//!
//! Every lookup runs on a [`Resolution`] path. Asking for a key that is
//! already being constructed on the same path fails with
//! [`ResolveError::CyclicDependency`] and the full chain, e.g.
//! `Ping -> Pong -> Ping`.
//!
//! Singletons under construction are also tracked across the whole
//! container. A factory that re-enters its own key through
//! [`Resolution::container`], or a thread that would wait on a singleton
//! whose builder is itself waiting on this thread, gets the same error
//! instead of blocking. Call [`Container::warm_up`] during start-up to
//! surface cycles and missing bindings before serving requests.
//!
//! ## Example
//!
//! ```rust
//! use switchyard::container::{Container, NamedArgs};
//!
//! struct Config {
//!     greeting: &'static str,
//! }
//!
//! let mut container = Container::new();
//! container.singleton::<Config, _>(|_| Ok(Config { greeting: "hi" }));
//!
//! let reply = container
//!     .call(NamedArgs::new().with("name", "Ann".to_string()), |args| {
//!         let config = args.service::<Config>("config")?;
//!         let name = args.value::<String>("name")?;
//!         Ok::<_, switchyard::container::ResolveError>(format!("{} {}", config.greeting, name))
//!     })
//!     .unwrap();
//! assert_eq!(reply, "hi Ann");
//! ```

mod args;
mod core;
mod error;
mod inflight;
mod key;

pub use self::args::{Arguments, NamedArgs};
pub use self::core::{Container, Injectable, Instance, Resolution, DEFAULT_MAX_DEPTH};
pub use self::error::ResolveError;
pub use self::key::{Lifecycle, ServiceKey};
