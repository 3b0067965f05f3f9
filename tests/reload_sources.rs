//! Reload from files, directories and HTTP sources.

mod common;

use common::{start_server, start_source_server};
use live_config::config::ServiceConfig;
use live_config::reload::ReloadState;
use live_config_client::ClientError;

#[tokio::test]
async fn test_startup_loads_config_path() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("general.json"),
        r#"{"general": {"node_id": "from-disk", "default_timezone": "UTC"}}"#,
    )
    .unwrap();

    let mut config = ServiceConfig::default();
    config.sections.config_path = Some(dir.path().to_str().unwrap().to_string());
    let server = start_server(config).await;

    let general = server.client().get_config("", &["general"]).await.unwrap();
    assert_eq!(general["general"]["node_id"], "from-disk");
    assert_eq!(general["general"]["default_timezone"], "UTC");
}

#[tokio::test]
async fn test_directory_reload_in_lexical_order() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("a.json"),
        r#"{"attributes": {"enabled": true, "indexed_selects": false}}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("b.json"), r#"{"attributes": {"enabled": false}}"#).unwrap();

    let server = start_server(ServiceConfig::default()).await;
    let client = server.client();
    client
        .reload_config("", "attributes", dir.path().to_str().unwrap(), false)
        .await
        .unwrap();

    let attrs = client.get_config("", &["attributes"]).await.unwrap();
    assert_eq!(attrs["attributes"]["enabled"], false);
    assert_eq!(attrs["attributes"]["indexed_selects"], false);
    assert_eq!(
        server.service.reloader().state(),
        ReloadState::Swapped {
            sections: vec!["attributes".into()]
        }
    );
}

#[tokio::test]
async fn test_dry_run_reload_leaves_store() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cfg.json");
    std::fs::write(&file, r#"{"listen": {"http": "0.0.0.0:1"}}"#).unwrap();

    let server = start_server(ServiceConfig::default()).await;
    let client = server.client();
    let before = client.get_config("", &["listen"]).await.unwrap();

    client
        .reload_config("", "listen", file.to_str().unwrap(), true)
        .await
        .unwrap();
    assert_eq!(client.get_config("", &["listen"]).await.unwrap(), before);
}

#[tokio::test]
async fn test_reload_missing_definition() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("cfg.json");
    std::fs::write(&file, r#"{"listen": {}}"#).unwrap();

    let server = start_server(ServiceConfig::default()).await;
    let err = server
        .client()
        .reload_config("", "resources", file.to_str().unwrap(), false)
        .await
        .unwrap_err();
    match err {
        ClientError::Rpc(e) => {
            assert_eq!(e.kind, "validation");
            assert!(e.message.contains("resources"));
        }
        other => panic!("unexpected error {}", other),
    }
}

#[tokio::test]
async fn test_reload_from_url() {
    let source = start_source_server(200, r#"{"resources": {"enabled": true, "store_interval_secs": -1}}"#.into()).await;

    let server = start_server(ServiceConfig::default()).await;
    let client = server.client();
    client
        .reload_config("", "resources", &format!("{}/resources.json", source), false)
        .await
        .unwrap();

    let res = client.get_config("", &["resources"]).await.unwrap();
    assert_eq!(res["resources"]["enabled"], true);
    assert_eq!(res["resources"]["store_interval_secs"], -1);
}

#[tokio::test]
async fn test_reload_from_failing_url() {
    let source = start_source_server(404, String::new()).await;
    let url = format!("{}/missing.json", source);

    let server = start_server(ServiceConfig::default()).await;
    let err = server.client().reload_config("", "*all", &url, false).await.unwrap_err();
    match err {
        ClientError::Rpc(e) => assert_eq!(e.message, format!("path:\"{}\" is not reachable", url)),
        other => panic!("unexpected error {}", other),
    }
}
