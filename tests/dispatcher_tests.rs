use http::Method;
use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use switchyard::container::{Container, Injectable, Resolution, ResolveError};
use switchyard::dispatcher::{
    Controller, DispatchError, Dispatcher, Handler, HandlerContext, Next, Reply,
};
use switchyard::middleware::{Middleware, MiddlewareRef};
use switchyard::router::Router;
use switchyard::server::{CancellationFlag, HttpError, Request, Response};

mod common;
use common::tracing_util::TestTracing;

fn dispatcher(container: Container, router: Router) -> Dispatcher {
    Dispatcher::new(Arc::new(container), Arc::new(router))
}

fn get(dispatcher: &Dispatcher, path: &str) -> Response {
    dispatcher.dispatch(Request::new(Method::GET, path))
}

type Log = Arc<Mutex<Vec<String>>>;

/// Records itself before and after the rest of the chain.
struct Recorder {
    label: &'static str,
    log: Log,
}

impl Middleware for Recorder {
    fn process(
        &self,
        req: &mut Request,
        res: &mut Response,
        next: Next<'_>,
    ) -> Result<(), DispatchError> {
        self.log.lock().unwrap().push(format!("{}:before", self.label));
        let result = next.run(req, res);
        self.log.lock().unwrap().push(format!("{}:after", self.label));
        result
    }
}

/// Answers 403 without continuing.
struct Gate {
    log: Log,
}

impl Middleware for Gate {
    fn process(
        &self,
        _req: &mut Request,
        res: &mut Response,
        _next: Next<'_>,
    ) -> Result<(), DispatchError> {
        self.log.lock().unwrap().push("gate".to_string());
        res.set_status(403).json(&json!({ "error": "Forbidden" }))?;
        Ok(())
    }
}

fn recording_handler(log: &Log) -> Handler {
    let log = Arc::clone(log);
    Handler::func(move |_| {
        log.lock().unwrap().push("handler".to_string());
        Ok("done")
    })
}

#[test]
fn test_greet_end_to_end() {
    let mut router = Router::new();
    router
        .get(
            "/greet/{name}",
            Handler::func(|ctx| {
                let name: String = ctx.args.value("name")?;
                Ok(json!({ "hello": name }))
            }),
        )
        .unwrap();
    let d = dispatcher(Container::new(), router);

    let res = get(&d, "/greet/Ann");
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_json(), Some(json!({ "hello": "Ann" })));
    assert_eq!(
        res.header("Content-Type"),
        Some("application/json; charset=utf-8")
    );
}

#[test]
fn test_unmatched_route_is_structured_404() {
    let d = dispatcher(Container::new(), Router::new());
    let res = d.dispatch(Request::new(Method::DELETE, "/nope?x=1"));
    assert_eq!(res.status(), 404);
    assert_eq!(
        res.body_json(),
        Some(json!({ "error": "Not Found", "message": "Route not found: DELETE /nope" }))
    );
}

#[test]
fn test_middleware_runs_in_order_around_handler() {
    let log: Log = Arc::default();
    let mut router = Router::new();
    router
        .get("/ok", recording_handler(&log))
        .unwrap()
        .middleware([
            MiddlewareRef::instance(Recorder {
                label: "a",
                log: Arc::clone(&log),
            }),
            MiddlewareRef::instance(Recorder {
                label: "b",
                log: Arc::clone(&log),
            }),
        ]);
    let d = dispatcher(Container::new(), router);

    let res = get(&d, "/ok");
    assert_eq!(res.status(), 200);
    assert_eq!(res.body_str(), "done");
    assert_eq!(
        *log.lock().unwrap(),
        ["a:before", "b:before", "handler", "b:after", "a:after"]
    );
}

#[test]
fn test_short_circuit_stops_chain_and_handler() {
    let logs = TestTracing::init();
    let log: Log = Arc::default();
    let mut router = Router::new();
    router
        .get("/guarded", recording_handler(&log))
        .unwrap()
        .middleware([
            MiddlewareRef::instance(Gate {
                log: Arc::clone(&log),
            }),
            MiddlewareRef::instance(Recorder {
                label: "never",
                log: Arc::clone(&log),
            }),
        ]);
    let d = dispatcher(Container::new(), router);

    let res = get(&d, "/guarded");
    assert_eq!(res.status(), 403);
    assert_eq!(res.body_json(), Some(json!({ "error": "Forbidden" })));
    assert_eq!(*log.lock().unwrap(), ["gate"]);
    assert_eq!(logs.events("Middleware short-circuited request").len(), 1);
}

fn failing_router() -> Router {
    let mut router = Router::new();
    router
        .get(
            "/fail",
            Handler::func(|_| -> Result<Reply, DispatchError> {
                Err(anyhow::anyhow!("db connection reset").into())
            }),
        )
        .unwrap();
    router
        .get(
            "/panic",
            Handler::func(|_| -> Result<Reply, DispatchError> { panic!("handler exploded") }),
        )
        .unwrap();
    router
}

#[test]
fn test_internal_error_hides_message_without_debug() {
    let d = dispatcher(Container::new(), failing_router());
    let res = get(&d, "/fail");
    assert_eq!(res.status(), 500);
    assert_eq!(
        res.body_json(),
        Some(json!({ "error": "Internal Server Error" }))
    );
}

#[test]
fn test_internal_error_shows_message_in_debug() {
    let d = dispatcher(Container::new(), failing_router()).with_debug(true);
    let res = get(&d, "/fail");
    assert_eq!(res.status(), 500);
    assert_eq!(res.body_json(), Some(json!({ "error": "db connection reset" })));
}

#[test]
fn test_panicking_handler_becomes_500() {
    let logs = TestTracing::init();
    let quiet = dispatcher(Container::new(), failing_router());
    let res = get(&quiet, "/panic");
    assert_eq!(res.status(), 500);
    assert_eq!(
        res.body_json(),
        Some(json!({ "error": "Internal Server Error" }))
    );
    assert_eq!(logs.events("Handler panicked").len(), 1);

    let verbose = quiet.clone().with_debug(true);
    let res = get(&verbose, "/panic");
    assert_eq!(res.body_json(), Some(json!({ "error": "handler exploded" })));
}

#[test]
fn test_http_error_keeps_status_and_headers() {
    let mut router = Router::new();
    router
        .get(
            "/teapot",
            Handler::func(|_| -> Result<Reply, DispatchError> {
                Err(HttpError::too_many_requests("slow down")
                    .with_header("retry-after", "30")
                    .into())
            }),
        )
        .unwrap();
    let d = dispatcher(Container::new(), router);

    let res = get(&d, "/teapot");
    assert_eq!(res.status(), 429);
    assert_eq!(res.header("Retry-After"), Some("30"));
    assert_eq!(
        res.body_json(),
        Some(json!({ "error": "Too Many Requests", "message": "slow down" }))
    );
}

struct Inventory {
    items: Vec<&'static str>,
}

static CONTROLLERS_BUILT: AtomicUsize = AtomicUsize::new(0);

struct InventoryController {
    inventory: Arc<Inventory>,
}

impl Injectable for InventoryController {
    fn construct(r: &mut Resolution<'_>) -> Result<Self, ResolveError> {
        CONTROLLERS_BUILT.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            inventory: r.get::<Inventory>()?,
        })
    }
}

impl Controller for InventoryController {
    fn actions() -> &'static [&'static str] {
        &["list", "item"]
    }

    fn dispatch(&self, action: &str, ctx: &mut HandlerContext<'_>) -> Result<Reply, DispatchError> {
        match action {
            "list" => Ok(Reply::json(&self.inventory.items)?),
            _ => {
                let index: usize = ctx
                    .param("index")
                    .and_then(|i| i.parse().ok())
                    .ok_or_else(|| HttpError::bad_request("index must be a number"))?;
                let item = self
                    .inventory
                    .items
                    .get(index)
                    .ok_or_else(|| HttpError::not_found("no such item"))?;
                Ok(Reply::text(*item))
            }
        }
    }
}

#[test]
fn test_controller_actions_resolve_through_container() {
    let mut container = Container::new();
    container.instance(Inventory {
        items: vec!["bolt", "nut"],
    });
    container.singleton_self::<InventoryController>();
    let mut router = Router::new();
    router
        .get(
            "/items",
            Handler::controller::<InventoryController>("list").unwrap(),
        )
        .unwrap();
    router
        .get(
            "/items/{index}",
            Handler::controller::<InventoryController>("item").unwrap(),
        )
        .unwrap();
    let d = dispatcher(container, router);

    assert_eq!(get(&d, "/items").body_json(), Some(json!(["bolt", "nut"])));
    assert_eq!(get(&d, "/items/1").body_str(), "nut");
    assert_eq!(get(&d, "/items/7").status(), 404);
    assert_eq!(get(&d, "/items/x").status(), 400);
    assert_eq!(CONTROLLERS_BUILT.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_controller_action_rejected_at_registration() {
    let err = Handler::controller::<InventoryController>("delete").unwrap_err();
    assert!(matches!(err, DispatchError::InvalidHandlerShape { .. }));
    assert!(err.is_configuration());
}

#[test]
fn test_missing_handler_dependency_is_500() {
    let mut router = Router::new();
    router
        .get(
            "/inventory",
            Handler::func(|ctx| {
                let inventory = ctx.args.service::<Inventory>("inventory")?;
                Ok(inventory.items.len())
            }),
        )
        .unwrap();
    let d = dispatcher(Container::new(), router).with_debug(true);

    let res = get(&d, "/inventory");
    assert_eq!(res.status(), 500);
    let body = res.body_json().unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("cannot resolve parameter `inventory`"));
}

#[test]
fn test_named_middleware_must_honor_contract() {
    let mut container = Container::new();
    container.instance_named("audit", 42u32);
    let mut router = Router::new();
    router
        .get("/audited", Handler::func(|_| Ok(())))
        .unwrap()
        .middleware([MiddlewareRef::named("audit")]);
    let d = dispatcher(container, router).with_debug(true);

    let res = get(&d, "/audited");
    assert_eq!(res.status(), 500);
    assert_eq!(
        res.body_json(),
        Some(json!({ "error": "'audit' does not implement the middleware contract" }))
    );
}

#[test]
fn test_cancelled_request_skips_remaining_stages() {
    let log: Log = Arc::default();
    let mut router = Router::new();
    router
        .get("/slow", recording_handler(&log))
        .unwrap()
        .middleware([MiddlewareRef::instance(Recorder {
            label: "a",
            log: Arc::clone(&log),
        })]);
    let d = dispatcher(Container::new(), router);

    let flag = CancellationFlag::new();
    flag.cancel();
    let res = d.dispatch(Request::new(Method::GET, "/slow").with_cancellation(flag));
    assert!(log.lock().unwrap().is_empty());
    assert!(!res.is_sent());
}

#[test]
fn test_reply_normalization() {
    let mut router = Router::new();
    router.get("/number", Handler::func(|_| Ok(42i64))).unwrap();
    router.get("/nothing", Handler::func(|_| Ok(()))).unwrap();
    router
        .get("/list", Handler::func(|_| Ok(json!([1, 2]))))
        .unwrap();
    router
        .get(
            "/manual",
            Handler::func(|ctx| {
                ctx.response.set_status(201).write("written by hand");
                Ok("ignored")
            }),
        )
        .unwrap();
    let d = dispatcher(Container::new(), router);

    assert_eq!(get(&d, "/number").body_str(), "42");
    let nothing = get(&d, "/nothing");
    assert_eq!(nothing.status(), 200);
    assert!(nothing.body().is_empty());
    assert_eq!(get(&d, "/list").body_str(), "[1,2]");
    let manual = get(&d, "/manual");
    assert_eq!(manual.status(), 201);
    assert_eq!(manual.body_str(), "written by hand");
}

#[test]
fn test_request_id_header_is_adopted() {
    let seen = Arc::new(Mutex::new(String::new()));
    let sink = Arc::clone(&seen);
    let mut router = Router::new();
    router
        .get(
            "/id",
            Handler::func(move |ctx| {
                *sink.lock().unwrap() = ctx.request.request_id.to_string();
                Ok(())
            }),
        )
        .unwrap();
    let d = dispatcher(Container::new(), router);

    let id = "01ARZ3NDEKTSV4RRFFQ69G5FAV";
    let res = d.dispatch(Request::new(Method::GET, "/id").with_header("X-Request-Id", id));
    assert_eq!(res.status(), 200);
    assert_eq!(*seen.lock().unwrap(), id);
}

#[test]
fn test_dispatcher_shared_across_threads() {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    let mut router = Router::new();
    router
        .get(
            "/echo/{n}",
            Handler::func(move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(ctx.param("n").unwrap_or_default().to_string())
            }),
        )
        .unwrap();
    let d = dispatcher(Container::new(), router);
    let all_ok = Arc::new(AtomicBool::new(true));

    thread::scope(|s| {
        for i in 0..8 {
            let d = d.clone();
            let all_ok = Arc::clone(&all_ok);
            s.spawn(move || {
                let res = get(&d, &format!("/echo/{i}"));
                if res.status() != 200 || res.body_str() != i.to_string() {
                    all_ok.store(false, Ordering::SeqCst);
                }
            });
        }
    });

    assert!(all_ok.load(Ordering::SeqCst));
    assert_eq!(hits.load(Ordering::SeqCst), 8);
}
