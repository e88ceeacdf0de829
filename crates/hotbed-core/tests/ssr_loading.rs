//! Server-side module loading through the public server API.

mod common;

use common::{LineEvaluator, LinePipeline, ROOT, builder, project, runtime};
use hotbed_core::ssr::Exports;
use hotbed_core::{Error, FileEvent, ForeignModule, StaticHost};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn dependencies_are_evaluated_before_importers() {
    let (server, _) = project(&[
        ("/src/page.ts", "reexport title from \"./data\"\nexport own = true"),
        ("/src/data.ts", "export title = \"hello\""),
    ]);

    let page = server.ssr_load_module("/src/page.ts").await.unwrap();

    assert_eq!(page.get("title"), Some(&json!("hello")));
    assert_eq!(page.get("own"), Some(&json!(true)));
    assert!(server.graph().ssr_module("/src/data.ts").is_some());
}

#[tokio::test]
async fn loaded_modules_are_reused() {
    let files = runtime(&[("/src/a.ts", "export a = 1")]);
    let evaluator = LineEvaluator::default();
    let server = builder(files.clone(), LinePipeline::new(files))
        .evaluator(evaluator.clone())
        .build()
        .unwrap();

    let first = server.ssr_load_module("/src/a.ts").await.unwrap();
    let second = server.ssr_load_module("/src/a.ts").await.unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(evaluator.evaluations(), 1);
}

#[tokio::test]
async fn export_all_skips_default() {
    let (server, _) = project(&[
        ("/src/index.ts", "export * from \"./lib\""),
        ("/src/lib.ts", "export default = 1\nexport named = 2"),
    ]);

    let index = server.ssr_load_module("/src/index.ts").await.unwrap();

    assert_eq!(index.get("named"), Some(&json!(2)));
    assert!(index.get("default").is_none());
}

#[tokio::test]
async fn circular_import_yields_placeholder() {
    let (server, _) = project(&[
        ("/src/a.ts", "reexport x from \"./b\"\nexport a = 1"),
        ("/src/b.ts", "reexport a from \"./a\"\nexport x = 2"),
    ]);

    let a = server.ssr_load_module("/src/a.ts").await.unwrap();

    assert_eq!(a.get("x"), Some(&json!(2)));
    assert_eq!(a.get("a"), Some(&json!(1)));
    // `b` saw the empty stand-in for `a`.
    let b = server.graph().ssr_module("/src/b.ts").unwrap();
    assert_eq!(b.get("a"), Some(&json!(null)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_loads_of_a_cycle_do_not_deadlock() {
    let files = runtime(&[
        ("/src/a.ts", "reexport x from \"./b\"\nexport a = 1"),
        ("/src/b.ts", "reexport a from \"./a\"\nexport x = 2"),
    ]);
    let pipeline = LinePipeline::new(files.clone()).with_delay(Duration::from_millis(20));
    let server = Arc::new(
        builder(files, pipeline)
            .evaluator(LineEvaluator::default())
            .build()
            .unwrap(),
    );

    let load = |url: &'static str| {
        let server = Arc::clone(&server);
        tokio::spawn(async move { server.ssr_load_module(url).await })
    };
    let (a, b) = (load("/src/a.ts"), load("/src/b.ts"));

    let both = tokio::time::timeout(Duration::from_secs(5), async {
        (a.await.unwrap(), b.await.unwrap())
    })
    .await
    .expect("loads finished");

    assert!(both.0.is_ok());
    assert!(both.1.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_loads_share_one_evaluation() {
    let files = runtime(&[
        ("/src/page.ts", "reexport v from \"./dep\""),
        ("/src/dep.ts", "export v = 3"),
    ]);
    let evaluator = LineEvaluator::default();
    let pipeline = LinePipeline::new(files.clone()).with_delay(Duration::from_millis(30));
    let server = Arc::new(
        builder(files, pipeline)
            .evaluator(evaluator.clone())
            .build()
            .unwrap(),
    );

    let mut handles = Vec::new();
    for _ in 0..6 {
        let server = Arc::clone(&server);
        handles.push(tokio::spawn(async move {
            server.ssr_load_module("/src/page.ts").await
        }));
    }
    for handle in handles {
        let page = handle.await.unwrap().unwrap();
        assert_eq!(page.get("v"), Some(&json!(3)));
    }

    assert_eq!(evaluator.evaluations(), 2);
}

#[tokio::test]
async fn evaluation_errors_are_reported_and_not_cached() {
    let files = runtime(&[("/src/bad.ts", "export ok = 1\nthrow boom")]);
    let server = builder(files.clone(), LinePipeline::new(files.clone()))
        .evaluator(LineEvaluator::default())
        .build()
        .unwrap();

    let err = server.ssr_load_module("/src/bad.ts").await.unwrap_err();
    match &err {
        Error::Evaluation { url, message, stack } => {
            assert_eq!(url, "/src/bad.ts");
            assert_eq!(message, "boom");
            assert!(stack.contains("at render (/src/bad.ts:2:1)"));
        }
        other => panic!("expected evaluation error, got {other:?}"),
    }
    assert!(server.graph().ssr_module("/src/bad.ts").is_none());

    files.insert(format!("{ROOT}/src/bad.ts"), "export ok = 1");
    server.handle_file_event(&FileEvent::changed(format!("{ROOT}/src/bad.ts")));

    let fixed = server.ssr_load_module("/src/bad.ts").await.unwrap();
    assert_eq!(fixed.get("ok"), Some(&json!(1)));
}

#[tokio::test]
async fn bare_imports_come_from_the_host() {
    let files = runtime(&[("/src/page.ts", "reexport default from \"lib\"")]);
    let mut namespace = Exports::new();
    namespace.insert("answer".to_string(), json!(42));
    let host = StaticHost::new().with_module(ForeignModule::new("lib", namespace, false));

    let server = builder(files.clone(), LinePipeline::new(files))
        .evaluator(LineEvaluator::default())
        .host(host)
        .build()
        .unwrap();

    let page = server.ssr_load_module("/src/page.ts").await.unwrap();
    assert_eq!(page.get("default"), Some(&json!({"answer": 42})));
    // Foreign modules never enter the graph.
    assert!(server.graph().imported_modules("/src/page.ts").is_empty());
}

#[tokio::test]
async fn dynamic_import_resolves_relative_to_the_module() {
    let (server, _) = project(&[
        ("/src/pages/home.ts", "dynamic widget from \"../lazy\""),
        ("/src/lazy.ts", "export default = \"loaded\""),
    ]);

    let home = server.ssr_load_module("/src/pages/home.ts").await.unwrap();

    assert_eq!(home.get("widget"), Some(&json!("loaded")));
    assert!(server.graph().ssr_module("/src/lazy.ts").is_some());
}

#[tokio::test]
async fn missing_module_is_not_found() {
    let (server, _) = project(&[]);
    let err = server.ssr_load_module("/src/nope.ts").await.unwrap_err();
    assert!(err.is_not_found());
}
