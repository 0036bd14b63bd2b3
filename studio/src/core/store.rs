//! JSON document store.
//!
//! Every pipeline artifact lives in one pretty-printed JSON file that is
//! read and written wholesale. Reads never fail: a missing, empty or
//! malformed document yields the caller's default.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document not found")]
    Missing,

    #[error("document is empty")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    RawNews,
    DailyTopics,
    HistoryTopics,
    ScriptLibrary,
    StyleLibrary,
    FactoryState,
}

impl Document {
    pub fn file_name(self) -> &'static str {
        match self {
            Document::RawNews => "raw_news.json",
            Document::DailyTopics => "daily_topics.json",
            Document::HistoryTopics => "history_topics.json",
            Document::ScriptLibrary => "editor_output.json",
            Document::StyleLibrary => "blogger_styles.json",
            Document::FactoryState => "video_factory_state.json",
        }
    }
}

#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn path(&self, doc: Document) -> PathBuf {
        self.data_dir.join(doc.file_name())
    }

    pub fn load<T: DeserializeOwned>(&self, doc: Document, default: T) -> T {
        load_json(&self.path(doc), default)
    }

    /// Overwrites the whole document. Last write wins.
    pub fn save<T: Serialize>(&self, doc: Document, value: &T) -> Result<(), StoreError> {
        fs::create_dir_all(&self.data_dir)?;
        save_json(&self.path(doc), value)
    }
}

pub fn try_load<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    if !path.exists() {
        return Err(StoreError::Missing);
    }
    let content = fs::read_to_string(path)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(StoreError::Empty);
    }
    Ok(serde_json::from_str(content)?)
}

pub fn load_json<T: DeserializeOwned>(path: &Path, default: T) -> T {
    match try_load(path) {
        Ok(value) => value,
        Err(e @ (StoreError::Missing | StoreError::Empty)) => {
            log::debug!("{} {}, using default", path.display(), e);
            default
        }
        Err(e) => {
            log::warn!("Unreadable document {}: {}. Using default.", path.display(), e);
            default
        }
    }
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    fs::write(path, buf)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{HistoryArchive, NewsItem};

    #[test]
    fn missing_document_returns_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let items: Vec<NewsItem> = load_json(&dir.path().join("nope.json"), Vec::new());
        assert!(items.is_empty());
    }

    #[test]
    fn blank_document_returns_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blank.json");
        fs::write(&path, "  \n\t ").expect("write");
        let history: HistoryArchive = load_json(&path, HistoryArchive::new());
        assert!(history.is_empty());
        assert!(matches!(try_load::<HistoryArchive>(&path), Err(StoreError::Empty)));
    }

    #[test]
    fn malformed_document_returns_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"title\": ").expect("write");
        let items: Vec<NewsItem> = load_json(&path, Vec::new());
        assert!(items.is_empty());
        assert!(matches!(try_load::<Vec<NewsItem>>(&path), Err(StoreError::Parse(_))));
    }

    #[test]
    fn wrong_shape_returns_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("object.json");
        fs::write(&path, "{\"a\": 1}").expect("write");
        let items: Vec<NewsItem> = load_json(&path, Vec::new());
        assert!(items.is_empty());
    }

    #[test]
    fn save_writes_readable_utf8_with_four_space_indent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path().join("data"));
        let items = vec![NewsItem {
            title: "央行降准".into(),
            source: "国际新闻".into(),
            ..Default::default()
        }];
        store.save(Document::RawNews, &items).expect("save");

        let raw = fs::read_to_string(store.path(Document::RawNews)).expect("read");
        assert!(raw.contains("央行降准"));
        assert!(!raw.contains("\\u"));
        assert!(raw.contains("\n    {"));

        let loaded: Vec<NewsItem> = store.load(Document::RawNews, Vec::new());
        assert_eq!(loaded, items);
    }

    #[test]
    fn save_overwrites_whole_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = JsonStore::new(dir.path());
        store.save(Document::DailyTopics, &vec![1, 2, 3]).expect("first save");
        store.save(Document::DailyTopics, &vec![4]).expect("second save");
        let loaded: Vec<u32> = store.load(Document::DailyTopics, Vec::new());
        assert_eq!(loaded, vec![4]);
    }
}
