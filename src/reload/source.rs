//! Reload sources: a file, a directory of `*.json` files, or an HTTP URL.
//!
//! Every source resolves to one JSON object of the form
//! `{ "<section>": { fields… }, … }`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};
use url::Url;

use crate::error::{ConfigError, ConfigResult};
use crate::planner::relaxed;

/// Where a reload path points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    File(PathBuf),
    Directory(PathBuf),
    Url(Url),
}

fn unreachable(path: &str) -> ConfigError {
    ConfigError::PathNotReachable(path.to_string())
}

/// Classify `path` without reading any content.
pub async fn classify(path: &str) -> ConfigResult<SourceKind> {
    if path.trim().is_empty() {
        return Err(unreachable(path));
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Url::parse(path).map(SourceKind::Url).map_err(|_| unreachable(path));
    }

    let meta = tokio::fs::metadata(path).await.map_err(|_| unreachable(path))?;
    if meta.is_dir() {
        Ok(SourceKind::Directory(PathBuf::from(path)))
    } else {
        Ok(SourceKind::File(PathBuf::from(path)))
    }
}

/// Read `path` into a single document.
pub async fn fetch(path: &str, http_timeout: Duration) -> ConfigResult<Map<String, Value>> {
    match classify(path).await? {
        SourceKind::File(file) => {
            let text = tokio::fs::read_to_string(&file).await.map_err(|_| unreachable(path))?;
            parse_document(&text, path)
        }
        SourceKind::Directory(dir) => {
            let files = tokio::task::spawn_blocking(move || collect_json_files(&dir))
                .await
                .map_err(|e| ConfigError::Backend(e.to_string()))?
                .map_err(|_| unreachable(path))?;

            let mut doc = Map::new();
            for file in files {
                let text = tokio::fs::read_to_string(&file).await.map_err(|_| unreachable(path))?;
                let part = parse_document(&text, &file.display().to_string())?;
                merge_documents(&mut doc, part);
            }
            Ok(doc)
        }
        SourceKind::Url(url) => {
            let client = reqwest::Client::builder()
                .timeout(http_timeout)
                .build()
                .map_err(|e| ConfigError::Backend(e.to_string()))?;
            let response = client.get(url).send().await.map_err(|_| unreachable(path))?;
            if !response.status().is_success() {
                tracing::warn!(path = %path, status = %response.status(), "Reload source returned an error status");
                return Err(unreachable(path));
            }
            let text = response.text().await.map_err(|_| unreachable(path))?;
            parse_document(&text, path)
        }
    }
}

fn parse_document(text: &str, origin: &str) -> ConfigResult<Map<String, Value>> {
    let normalized = relaxed::normalize_with_env(text)?;
    match serde_json::from_str(&normalized) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ConfigError::MalformedPayload(format!("{}: top level must be a map", origin))),
        Err(e) => Err(ConfigError::MalformedPayload(format!("{}: {}", origin, e))),
    }
}

/// Every `*.json` file under `dir`, recursively, in lexical path order.
/// Hidden files and directories are skipped.
fn collect_json_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with('.') {
                continue;
            }
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|ext| ext == "json") {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Overlay `from` onto `into`; maps merge recursively, anything else is replaced.
fn merge_documents(into: &mut Map<String, Value>, from: Map<String, Value>) {
    for (key, value) in from {
        match value {
            Value::Object(incoming) => {
                if let Some(Value::Object(existing)) = into.get_mut(&key) {
                    merge_documents(existing, incoming);
                } else {
                    into.insert(key, Value::Object(incoming));
                }
            }
            other => {
                into.insert(key, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_empty_path_not_reachable() {
        let err = fetch("", TIMEOUT).await.unwrap_err();
        assert_eq!(err.to_string(), "path:\"\" is not reachable");
    }

    #[tokio::test]
    async fn test_missing_file_not_reachable() {
        let err = fetch("/definitely/not/here.json", TIMEOUT).await.unwrap_err();
        assert_eq!(err, ConfigError::PathNotReachable("/definitely/not/here.json".into()));
    }

    #[tokio::test]
    async fn test_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.json");
        std::fs::write(&file, r#"{"general": {"node_id": "n1",},}"#).unwrap();

        let doc = fetch(file.to_str().unwrap(), TIMEOUT).await.unwrap();
        assert_eq!(doc["general"]["node_id"], "n1");
    }

    #[tokio::test]
    async fn test_directory_lexical_overlay() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("10-base.json"),
            r#"{"general": {"node_id": "base", "reconnects": 3}}"#,
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("20-extra")).unwrap();
        std::fs::write(
            dir.path().join("20-extra").join("a.json"),
            r#"{"general": {"node_id": "override"}, "listen": {"http": ""}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join(".hidden.json"), r#"{"general": {"node_id": "hidden"}}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let doc = fetch(dir.path().to_str().unwrap(), TIMEOUT).await.unwrap();
        assert_eq!(doc["general"], json!({"node_id": "override", "reconnects": 3}));
        assert_eq!(doc["listen"]["http"], "");
    }

    #[tokio::test]
    async fn test_non_map_document() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("cfg.json");
        std::fs::write(&file, "[1, 2]").unwrap();
        assert!(matches!(
            fetch(file.to_str().unwrap(), TIMEOUT).await.unwrap_err(),
            ConfigError::MalformedPayload(_)
        ));
    }

    #[tokio::test]
    async fn test_classify_url() {
        assert!(matches!(
            classify("http://127.0.0.1:1/cfg.json").await.unwrap(),
            SourceKind::Url(_)
        ));
        assert_eq!(
            fetch("http://127.0.0.1:1/cfg.json", TIMEOUT).await.unwrap_err(),
            ConfigError::PathNotReachable("http://127.0.0.1:1/cfg.json".into())
        );
    }
}
