//! Demo application served by the CLI.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::app::{bootstrap, ServiceProvider};
use crate::container::{Container, Injectable, Resolution, ResolveError};
use crate::dispatcher::{Controller, DispatchError, Dispatcher, Handler, HandlerContext, Reply};
use crate::middleware::{
    register_named, ApiToken, AuthMiddleware, CorsMiddleware, MetricsMiddleware, MiddlewareRef,
    TracingMiddleware,
};
use crate::router::{GroupAttributes, Router};
use crate::runtime_config::AppConfig;
use crate::server::HttpError;

/// Token accepted on the `/api` group
pub const DEMO_TOKEN: &str = "demo-token";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: u64,
    pub name: String,
}

/// In-memory user table, bound as a singleton.
#[derive(Debug)]
pub struct UserDirectory {
    users: Vec<User>,
}

impl UserDirectory {
    #[must_use]
    pub fn all(&self) -> &[User] {
        &self.users
    }

    #[must_use]
    pub fn find(&self, id: u64) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }
}

impl Injectable for UserDirectory {
    fn construct(_: &mut Resolution<'_>) -> Result<Self, ResolveError> {
        let users = ["Ada", "Grace", "Barbara"]
            .iter()
            .zip(1u64..)
            .map(|(name, id)| User {
                id,
                name: (*name).to_string(),
            })
            .collect();
        Ok(Self { users })
    }
}

/// `index` and `show` actions over the [`UserDirectory`].
pub struct UserController {
    directory: Arc<UserDirectory>,
}

impl Injectable for UserController {
    fn construct(resolution: &mut Resolution<'_>) -> Result<Self, ResolveError> {
        Ok(Self {
            directory: resolution.get::<UserDirectory>()?,
        })
    }
}

impl Controller for UserController {
    fn actions() -> &'static [&'static str] {
        &["index", "show"]
    }

    fn dispatch(&self, action: &str, ctx: &mut HandlerContext<'_>) -> Result<Reply, DispatchError> {
        match action {
            "index" => Ok(Reply::json(self.directory.all())?),
            "show" => {
                let id = ctx
                    .param("id")
                    .and_then(|raw| raw.parse::<u64>().ok())
                    .ok_or_else(|| HttpError::bad_request("id must be a positive integer"))?;
                let user = self
                    .directory
                    .find(id)
                    .ok_or_else(|| HttpError::not_found(format!("User {id} not found")))?;
                Ok(Reply::json(user)?)
            }
            other => Err(DispatchError::InvalidHandlerShape {
                handler: format!("UserController@{other}"),
                reason: "unknown action".to_string(),
            }),
        }
    }
}

/// Services and routes of the demo application.
///
/// Every route runs behind tracing, metrics and CORS; `/api/*` additionally
/// requires `Authorization: Bearer demo-token`.
#[derive(Debug, Default)]
pub struct DemoProvider {
    metrics: Arc<MetricsMiddleware>,
}

impl DemoProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<MetricsMiddleware> {
        &self.metrics
    }
}

impl ServiceProvider for DemoProvider {
    fn register(&self, container: &mut Container) {
        container.instance(ApiToken(DEMO_TOKEN.to_string()));
        container.instance_arc(Arc::clone(&self.metrics));
        container.singleton_self::<UserDirectory>();
        container.singleton_self::<CorsMiddleware>();
        register_named(container, "auth", AuthMiddleware::new(DEMO_TOKEN));
    }

    fn routes(&self, router: &mut Router) -> Result<(), DispatchError> {
        router.middleware([
            MiddlewareRef::instance(TracingMiddleware),
            MiddlewareRef::shared(Arc::clone(&self.metrics)),
            MiddlewareRef::service::<CorsMiddleware>(),
        ]);

        router
            .get(
                "/",
                Handler::func(|_| {
                    Ok(json!({
                        "service": "switchyard",
                        "version": env!("CARGO_PKG_VERSION"),
                    }))
                }),
            )?
            .name("home");

        router
            .get(
                "/greet/{name}",
                Handler::func(|ctx| {
                    let name: String = ctx.args.value("name")?;
                    let greeting = ctx.args.value_or("greeting", "Hello".to_string())?;
                    Ok(json!({ "greeting": format!("{greeting}, {name}!") }))
                }),
            )?
            .name("greet");

        router
            .map(
                &["GET", "POST"],
                "/echo",
                Handler::func(|ctx| Ok(ctx.request.body.clone().unwrap_or(Value::Null))),
            )?
            .name("echo");

        router
            .get(
                "/metrics",
                Handler::func(|ctx| {
                    let metrics = ctx.args.service::<MetricsMiddleware>("metrics")?;
                    Ok(json!({
                        "requests": metrics.request_count(),
                        "client_errors": metrics.client_errors(),
                        "server_errors": metrics.server_errors(),
                        "average_latency_us": metrics.average_latency().as_micros() as u64,
                    }))
                }),
            )?
            .name("metrics");

        router.get(
            "/fail",
            Handler::func(|_| -> Result<Reply, DispatchError> {
                Err(anyhow::anyhow!("upstream store unavailable").into())
            }),
        )?;

        let index = Handler::controller::<UserController>("index")?;
        let show = Handler::controller::<UserController>("show")?;
        router.group(
            GroupAttributes::new()
                .prefix("/api")
                .middleware([MiddlewareRef::named("auth")]),
            |api| {
                api.get("/users", index)?.name("users.index");
                api.get("/users/{id:\\d+}", show)?.name("users.show");
                Ok(())
            },
        )?;
        Ok(())
    }
}

/// Build the demo application's dispatcher.
pub fn demo_app(config: AppConfig) -> anyhow::Result<Dispatcher> {
    bootstrap(config, |app| {
        app.register(&DemoProvider::new())?;
        Ok(())
    })
}
