//! Concurrent callers against one service.

mod common;

use std::sync::Arc;

use common::start_server;
use live_config::config::ServiceConfig;
use live_config::section::builtin::{GeneralSection, ListenSection};
use serde_json::json;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disjoint_commits_both_land() {
    let server = start_server(ServiceConfig::default()).await;
    let a = server.client();
    let b = server.client();

    tokio::join!(
        async {
            for i in 0..20 {
                a.set_config("", json!({"general": {"node_id": format!("g{}", i)}}), false)
                    .await
                    .unwrap();
            }
        },
        async {
            for i in 0..20 {
                b.set_config("", json!({"listen": {"http": format!("127.0.0.1:{}", 3000 + i)}}), false)
                    .await
                    .unwrap();
            }
        }
    );

    let store = server.service.store();
    assert_eq!(store.get_typed::<GeneralSection>("example.org").unwrap().node_id, "g19");
    assert_eq!(
        store.get_typed::<ListenSection>("example.org").unwrap().http,
        "127.0.0.1:3019"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reads_never_see_half_a_commit() {
    let server = start_server(ServiceConfig::default()).await;
    let service = Arc::clone(&server.service);

    let writer = {
        let client = server.client();
        tokio::spawn(async move {
            for i in 0..50 {
                let tag = format!("v{}", i);
                client
                    .set_config(
                        "",
                        json!({"general": {"node_id": tag}, "listen": {"rpc_json": "", "http": "", "http_tls": "", "rpc_json_tls": ""}}),
                        false,
                    )
                    .await
                    .unwrap();
                client
                    .set_config(
                        "",
                        json!({"general": {"node_id": ""}, "listen": {"rpc_json": "127.0.0.1:2012"}}),
                        false,
                    )
                    .await
                    .unwrap();
            }
        })
    };

    let reader = tokio::spawn(async move {
        for _ in 0..500 {
            let snap = service.store().get("example.org", &["general", "listen"]).unwrap();
            let general = live_config::section::downcast::<GeneralSection>(snap["general"].clone()).unwrap();
            let listen = live_config::section::downcast::<ListenSection>(snap["listen"].clone()).unwrap();
            // node_id and rpc_json flip in the same commit
            assert_eq!(general.node_id.is_empty(), !listen.rpc_json.is_empty());
            tokio::task::yield_now().await;
        }
    });

    writer.await.unwrap();
    reader.await.unwrap();
}
