//! Backing store round trips through the service.

mod common;

use common::start_server;
use live_config::config::{BackingStoreKind, ServiceConfig};
use serde_json::json;

fn json_file_config(path: &std::path::Path) -> ServiceConfig {
    let mut config = ServiceConfig::default();
    config.backing_store.kind = BackingStoreKind::JsonFile;
    config.backing_store.path = Some(path.to_str().unwrap().to_string());
    config
}

#[tokio::test]
async fn test_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("config_db.json");

    {
        let server = start_server(json_file_config(&db_path)).await;
        let client = server.client();
        client
            .set_config("", json!({"general": {"node_id": "persisted"}}), false)
            .await
            .unwrap();
        client.store_config_in_db("", &["general"]).await.unwrap();
    }

    let mut config = json_file_config(&db_path);
    config.backing_store.load_on_start = true;
    let server = start_server(config).await;

    let general = server.client().get_config("", &["general"]).await.unwrap();
    assert_eq!(general["general"]["node_id"], "persisted");
}

#[tokio::test]
async fn test_commit_does_not_write_store() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("config_db.json");

    let server = start_server(json_file_config(&db_path)).await;
    server
        .client()
        .set_config("", json!({"general": {"node_id": "live-only"}}), false)
        .await
        .unwrap();
    assert!(!db_path.exists());

    let loaded = server.service.persistence().load::<&str>("example.org", &[]).await.unwrap();
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn test_reload_from_backing_store() {
    let dir = tempfile::tempdir().unwrap();
    let server = start_server(json_file_config(&dir.path().join("db.json"))).await;
    let client = server.client();

    client
        .set_config("", json!({"listen": {"http": "127.0.0.1:7000"}}), false)
        .await
        .unwrap();
    client.store_config_in_db("", &[]).await.unwrap();
    client
        .set_config("", json!({"listen": {"http": "127.0.0.1:7001"}}), false)
        .await
        .unwrap();

    // empty path with a backing store: reload what was stored
    client.reload_config("", "listen", "", false).await.unwrap();
    let listen = client.get_config("", &["listen"]).await.unwrap();
    assert_eq!(listen["listen"]["http"], "127.0.0.1:7000");
}

#[tokio::test]
async fn test_unpopulated_tenant_reads_backing_store() {
    let server = start_server({
        let mut config = ServiceConfig::default();
        config.backing_store.kind = BackingStoreKind::Memory;
        config
    })
    .await;
    let client = server.client();

    let values = server.service.store().get::<&str>("example.org", &[]).unwrap();
    server
        .service
        .persistence()
        .store::<&str>("other.org", &[], &values)
        .await
        .unwrap();

    let all = client.get_config("other.org", &[]).await.unwrap();
    assert_eq!(all.len(), 4);
    assert!(!server.service.store().is_populated("other.org"));
}
