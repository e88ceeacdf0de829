//! File changes turned into client instructions.

mod common;

use common::{ROOT, project};
use hotbed_core::url::style_id;
use hotbed_core::{FileEvent, ModuleServer, UpdateDecision, UpdatePayload};

fn changed(path: &str) -> FileEvent {
    FileEvent::changed(format!("{ROOT}{path}"))
}

async fn load_all(server: &ModuleServer, urls: &[&str]) {
    for url in urls {
        server.transform_request(url).await.unwrap();
    }
}

#[tokio::test]
async fn stylesheet_change_is_a_style_update() {
    let (server, _) = project(&[
        ("/src/entry.ts", "import \"./util\""),
        ("/src/util.ts", "import \"./leaf.css?import\""),
        ("/src/leaf.css", "body { color: red }"),
    ]);
    load_all(&server, &["/src/entry.ts", "/src/util.ts", "/src/leaf.css?import"]).await;

    let decision = server.handle_file_event(&changed("/src/leaf.css"));

    let UpdateDecision::Updates(updates) = decision else {
        panic!("expected updates, got {decision:?}");
    };
    assert_eq!(updates.len(), 1);
    let stamp = match &updates[0] {
        UpdatePayload::StyleUpdate { url, id, timestamp } => {
            assert_eq!(url, "/src/leaf.css?import");
            assert_eq!(id, &style_id("/src/leaf.css"));
            assert!(*timestamp > 0);
            *timestamp
        }
        other => panic!("expected style-update, got {other:?}"),
    };

    // Importers are re-transformed so their imports carry the new timestamp.
    let graph = server.graph();
    assert!(!graph.node("/src/leaf.css?import").unwrap().has_transform);
    let util = graph.node("/src/util.ts").unwrap();
    assert!(!util.has_transform);
    assert_eq!(util.last_hmr_timestamp, stamp);
    assert_eq!(graph.last_hmr_timestamp("/src/entry.ts"), stamp);
}

#[tokio::test]
async fn change_reaching_an_entry_reloads() {
    let (server, _) = project(&[
        ("/src/entry.ts", "import \"./util\""),
        ("/src/util.ts", "export x = 1"),
    ]);
    load_all(&server, &["/src/entry.ts", "/src/util.ts"]).await;

    let decision = server.handle_file_event(&changed("/src/util.ts"));

    assert_eq!(
        decision,
        UpdateDecision::FullReload {
            path: "/src/util.ts".to_string()
        }
    );
}

#[tokio::test]
async fn self_accepting_importer_takes_the_update() {
    let (server, _) = project(&[
        ("/src/main.ts", "import \"./app.tsx\""),
        ("/src/app.tsx", "import \"./util\"\nimport.meta.hot.accept()"),
        ("/src/util.ts", "export x = 1"),
    ]);
    load_all(&server, &["/src/main.ts", "/src/app.tsx", "/src/util.ts"]).await;

    let decision = server.handle_file_event(&changed("/src/util.ts"));

    let UpdateDecision::Updates(updates) = decision else {
        panic!("expected updates, got {decision:?}");
    };
    assert!(matches!(
        &updates[..],
        [UpdatePayload::Update { url, accepted_path, .. }]
            if url == "/src/app.tsx" && accepted_path == "/src/util.ts"
    ));
}

#[tokio::test]
async fn updates_are_sorted_and_deduplicated() {
    // Both accepting modules import the shared one, and `b` also reaches it
    // through `c`.
    let (server, _) = project(&[
        ("/src/main.ts", "import \"./b\"\nimport \"./a\""),
        ("/src/b.ts", "import \"./shared\"\nimport \"./c\"\nimport.meta.hot.accept()"),
        ("/src/a.ts", "import \"./shared\"\nimport.meta.hot.accept()"),
        ("/src/c.ts", "import \"./shared\""),
        ("/src/shared.ts", "export s = 1"),
    ]);
    load_all(
        &server,
        &["/src/main.ts", "/src/b.ts", "/src/a.ts", "/src/c.ts", "/src/shared.ts"],
    )
    .await;

    let decision = server.handle_file_event(&changed("/src/shared.ts"));

    let UpdateDecision::Updates(updates) = decision else {
        panic!("expected updates, got {decision:?}");
    };
    let boundaries: Vec<&str> = updates
        .iter()
        .map(|u| match u {
            UpdatePayload::Update { url, .. } => url.as_str(),
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(boundaries, vec!["/src/a.ts", "/src/b.ts"]);
}

#[tokio::test]
async fn import_cycle_without_boundary_terminates() {
    let (server, _) = project(&[
        ("/src/a.ts", "import \"./b\""),
        ("/src/b.ts", "import \"./a\""),
    ]);
    load_all(&server, &["/src/a.ts", "/src/b.ts"]).await;

    let decision = server.handle_file_event(&changed("/src/a.ts"));

    assert!(matches!(decision, UpdateDecision::FullReload { .. }));
}

#[tokio::test]
async fn unused_file_changes_nothing() {
    let (server, _) = project(&[("/src/a.ts", "")]);
    server.transform_request("/src/a.ts").await.unwrap();

    let decision = server.handle_file_event(&changed("/src/unrelated.ts"));

    assert_eq!(decision, UpdateDecision::Unused);
    assert!(server.graph().node("/src/a.ts").unwrap().has_transform);
}

#[tokio::test]
async fn connected_clients_receive_the_decision() {
    let (server, _) = project(&[
        ("/src/app.tsx", "import.meta.hot.accept()"),
    ]);
    server.transform_request("/src/app.tsx").await.unwrap();
    let (_, mut rx) = server.connect_client();

    server.handle_file_event(&changed("/src/app.tsx"));

    assert_eq!(rx.recv().await.unwrap(), r#"{"type":"connected"}"#);
    let update: UpdatePayload = serde_json::from_str(&rx.recv().await.unwrap()).unwrap();
    assert!(matches!(
        update,
        UpdatePayload::Update { ref url, ref accepted_path, .. }
            if url == "/src/app.tsx" && accepted_path == "/src/app.tsx"
    ));
}

#[tokio::test]
async fn change_drops_server_modules_of_importers() {
    let (server, _) = project(&[
        ("/src/page.ts", "reexport x from \"./data\""),
        ("/src/data.ts", "export x = 1"),
    ]);
    server.ssr_load_module("/src/page.ts").await.unwrap();
    assert!(server.graph().node("/src/page.ts").unwrap().has_ssr_module);

    server.handle_file_event(&changed("/src/data.ts"));

    let page = server.graph().node("/src/page.ts").unwrap();
    assert!(!page.has_ssr_module);
    // The importer's own transform is still valid.
    assert!(page.has_ssr_transform);
}
