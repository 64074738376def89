//! Application root context.
//!
//! [`App`] owns everything a process needs to dispatch requests and is built
//! exactly once at start-up. Nothing in the crate reaches for a global
//! instance: components get what they need from the `App` (or from the
//! [`Dispatcher`] it builds) explicitly.

use std::sync::Arc;
use std::time::Instant;
use tracing::info;

use crate::container::{Container, ResolveError};
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::router::Router;
use crate::runtime_config::AppConfig;

/// A bundle of related registrations.
///
/// Providers keep start-up code modular: each one binds its services and,
/// optionally, its routes.
pub trait ServiceProvider {
    /// Bind services into the container
    fn register(&self, container: &mut Container);

    /// Register routes; most providers have none
    fn routes(&self, _router: &mut Router) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// Root context: configuration, container and route table under
/// construction.
#[derive(Debug)]
pub struct App {
    config: Arc<AppConfig>,
    container: Container,
    router: Router,
}

impl App {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let container = Container::new().with_max_depth(config.max_resolution_depth);
        Self {
            config: Arc::new(config),
            container,
            router: Router::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    /// Apply a provider's bindings and routes.
    pub fn register<P: ServiceProvider>(&mut self, provider: &P) -> Result<&mut Self, DispatchError> {
        provider.register(&mut self.container);
        provider.routes(&mut self.router)?;
        Ok(self)
    }

    /// Freeze the route table and container and produce the dispatcher.
    ///
    /// The configuration and the router are bound as instances so handlers
    /// and services can inject them. The container cannot hold itself; code
    /// that needs it reaches it through `Resolution::container` or
    /// `ctx.args.container()`. With `eager_singletons` enabled every
    /// singleton is constructed here; a missing dependency or a cycle fails
    /// the build instead of the first request that needs it.
    pub fn build(self) -> Result<Dispatcher, ResolveError> {
        let Self {
            config,
            mut container,
            router,
        } = self;
        let router = Arc::new(router);
        container.instance_arc(Arc::clone(&config));
        container.instance_arc(Arc::clone(&router));

        let singletons = if config.eager_singletons {
            container.warm_up()?
        } else {
            0
        };

        info!(
            routes_count = router.len(),
            bindings_count = container.keys().count(),
            singletons_constructed = singletons,
            debug = config.debug,
            "Application built"
        );
        Ok(Dispatcher::new(Arc::new(container), router).with_debug(config.debug))
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

/// Build an app, timing the whole start-up sequence.
pub fn bootstrap<F>(config: AppConfig, setup: F) -> anyhow::Result<Dispatcher>
where
    F: FnOnce(&mut App) -> anyhow::Result<()>,
{
    let start = Instant::now();
    let mut app = App::new(config);
    setup(&mut app)?;
    let dispatcher = app.build()?;
    info!(
        duration_us = start.elapsed().as_micros() as u64,
        "Bootstrap complete"
    );
    Ok(dispatcher)
}
