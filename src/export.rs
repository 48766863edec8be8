use crate::error::Result;
use crate::model::SearchState;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub fn export_file_name(epoch_ms: u128) -> String {
    format!("search_{epoch_ms}.json")
}

/// Writes the body of the last successful response, as received, as pretty
/// JSON into `dir`. Returns `Ok(None)` without touching the filesystem when
/// nothing has been captured yet.
pub fn export_last_response(state: &SearchState, dir: &Path) -> Result<Option<PathBuf>> {
    let Some(captured) = state.last_response.as_ref() else {
        return Ok(None);
    };
    let epoch_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default();
    let path = dir.join(export_file_name(epoch_ms));
    {
        let mut writer = BufWriter::new(File::create(&path)?);
        serde_json::to_writer_pretty(&mut writer, &captured.body)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
    }
    info!(path = %path.display(), results = captured.response.results.len(), "exported search response");
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CapturedSearch;
    use serde_json::{Value, json};

    #[test]
    fn nothing_captured_means_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let exported = export_last_response(&SearchState::default(), dir.path()).unwrap();
        assert!(exported.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    fn state_with(body: Value) -> SearchState {
        SearchState {
            last_query: "pond".to_string(),
            last_response: Some(CapturedSearch::from_body(body).unwrap()),
            ..SearchState::default()
        }
    }

    #[test]
    fn export_writes_pretty_response_with_timestamped_name() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(json!({
            "total": 1,
            "elapsed_ms": 42.0,
            "results": [{"title": "Walden", "authors": ["Thoreau"], "book_id": 205}],
            "query": "pond"
        }));
        let path = export_last_response(&state, dir.path()).unwrap().unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("search_") && name.ends_with(".json"));
        assert!(name["search_".len()..name.len() - ".json".len()]
            .chars()
            .all(|c| c.is_ascii_digit()));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\n  \"total\": 1"));
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written["query"], "pond");
        assert_eq!(written["results"][0]["book_id"], 205);
    }

    #[test]
    fn export_reproduces_the_body_exactly() {
        let dir = tempfile::tempdir().unwrap();
        let body = json!({
            "total": 42,
            "elapsed_ms": 250,
            "results": [{
                "title": "A",
                "authors": [],
                "doc_len_tokens": 100,
                "rank_features": {},
                "snippet": null
            }],
            "next": null
        });
        let state = state_with(body.clone());
        let path = export_last_response(&state, dir.path()).unwrap().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"elapsed_ms\": 250,"));
        assert!(text.contains("\"doc_len_tokens\": 100,"));
        let written: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(written, body);
    }
}
