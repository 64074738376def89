use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use std::hint::black_box;
use std::sync::Arc;

use switchyard::container::Container;
use switchyard::dispatcher::{Dispatcher, Handler, Reply};
use switchyard::middleware::{MetricsMiddleware, MiddlewareRef};
use switchyard::router::{GroupAttributes, Router};
use switchyard::server::Request;

fn noop() -> Handler {
    Handler::func(|_| Ok(Reply::Empty))
}

fn zoo_router() -> Router {
    let mut router = Router::new();
    router.get("/", noop()).unwrap();
    router.get("/zoo/health", noop()).unwrap();
    router.get("/zoo/animals", noop()).unwrap();
    router.post("/zoo/animals", noop()).unwrap();
    router.map(&["GET", "PUT", "PATCH", "DELETE"], "/zoo/animals/{id}", noop()).unwrap();
    router.get("/zoo/animals/{id}/toys/{toy_id}", noop()).unwrap();
    router
        .get("/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}", noop())
        .unwrap();
    router
        .group(GroupAttributes::new().prefix("/inventory/{warehouse_id}"), |inv| {
            inv.post("/feeds/{feed_id}/items/{item_id}/batches/{batch_id:\\d+}", noop())?;
            Ok(())
        })
        .unwrap();
    router.get("/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}", noop()).unwrap();
    router
}

fn bench_route_match(c: &mut Criterion) {
    let router = zoo_router();
    let test_paths = [
        (Method::GET, "/zoo/health"),
        (Method::GET, "/zoo/animals/123"),
        (Method::GET, "/zoo/animals/123/toys/456"),
        (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
        (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
    ];
    c.bench_function("route_match", |b| {
        b.iter(|| {
            for (method, path) in test_paths.iter() {
                let matched = router.match_route(method, path);
                black_box(&matched);
            }
        })
    });
    c.bench_function("route_miss", |b| {
        b.iter(|| black_box(router.match_route(&Method::GET, "/not/registered/anywhere")))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let mut router = zoo_router();
    router
        .get("/metered/{id}", Handler::func(|ctx| Ok(ctx.param("id").unwrap_or_default().to_string())))
        .unwrap()
        .middleware([MiddlewareRef::shared(Arc::new(MetricsMiddleware::new()))]);
    let dispatcher = Dispatcher::new(Arc::new(Container::new()), Arc::new(router));

    c.bench_function("dispatch_with_middleware", |b| {
        b.iter(|| {
            let res = dispatcher.dispatch(Request::new(Method::GET, "/metered/42"));
            black_box(res.status())
        })
    });
}

criterion_group!(benches, bench_route_match, bench_dispatch);
criterion_main!(benches);
