use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use routectx::context::FORM_URLENCODED;
use routectx::router::{HttpMethod, RouteRegistrar, Router};
use routectx::server::RawRequest;
use routectx::{Dispatcher, RequestContext, Status};

fn noop(_: &mut RequestContext) {}

fn zoo_router() -> Router {
    let mut builder = Router::builder();
    builder.get("/", noop).unwrap();
    builder
        .group_route("/zoo", |zoo| {
            zoo.get("/animals", noop)?;
            zoo.post("/animals", noop)?;
            zoo.group_route("/animals/{id}", |animal| {
                animal.get("", noop)?;
                animal.put("", noop)?;
                animal.patch("", noop)?;
                animal.delete("", noop)?;
                animal.get("/toys/{toy_id}", noop)?;
                Ok(())
            })?;
            zoo.get(
                "/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
                noop,
            )?;
            Ok(())
        })
        .unwrap();
    builder
        .post(
            "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
            noop,
        )
        .unwrap();
    builder
        .get("/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}", noop)
        .unwrap();
    builder
        .post("/user/profile/{profileID}", |ctx| {
            let params = ctx.query_params().cloned();
            ctx.output_json(&Status::ok(), &params);
        })
        .unwrap();
    builder.build()
}

fn bench_match_route(c: &mut Criterion) {
    let router = zoo_router();
    let cases = [
        (HttpMethod::Get, "/"),
        (HttpMethod::Get, "/zoo/animals"),
        (HttpMethod::Delete, "/zoo/animals/42"),
        (HttpMethod::Get, "/zoo/animals/42/toys/7"),
        (HttpMethod::Get, "/zoo/birds/animals/1/habitats/2/sections/3"),
        (HttpMethod::Get, "/complex/1/2/3/4/5/6/7/8/9"),
        (HttpMethod::Get, "/does/not/exist"),
    ];

    c.bench_function("match_route", |b| {
        b.iter(|| {
            for (method, path) in &cases {
                black_box(router.match_route(*method, black_box(path)));
            }
        })
    });
}

fn bench_dispatch_form(c: &mut Criterion) {
    let dispatcher = Dispatcher::new(zoo_router());
    let raw = RawRequest::new("POST", "/user/profile/2?page=1")
        .with_header("Content-Type", FORM_URLENCODED)
        .with_body("userID=1&profileID=2");

    c.bench_function("dispatch_urlencoded", |b| {
        b.iter(|| black_box(dispatcher.serve(raw.clone())))
    });
}

criterion_group!(benches, bench_match_route, bench_dispatch_form);
criterion_main!(benches);
