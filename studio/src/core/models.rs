use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Date-keyed topic snapshots, `YYYY-MM-DD` -> topics of that day.
pub type HistoryArchive = BTreeMap<String, Vec<Topic>>;
pub type ScriptLibrary = Vec<ScriptRecord>;
pub type StyleLibrary = BTreeMap<String, StyleGene>;
/// Session id -> synced script.
pub type FactoryState = BTreeMap<String, FactoryEntry>;

/// Raw item produced by ingestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub source: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub url: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub ctime: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    #[serde(default, deserialize_with = "string_or_null")]
    pub topic: String,
    #[serde(default, deserialize_with = "lenient_heat")]
    pub heat: u64,
    #[serde(default)]
    pub news_items: Vec<TopicNewsItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicNewsItem {
    #[serde(default, deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub url: String,
}

// Stored documents are edited by hand and by older builds, so every field
// of a persisted record tolerates being absent or null.
const UNKNOWN_TIME: &str = "未知时间";
const UNTITLED: &str = "未命名";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptRecord {
    #[serde(default)]
    pub id: u64,
    #[serde(default, deserialize_with = "string_or_null")]
    pub topic: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub subtopic: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub style: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub content: String,
    #[serde(default = "unknown_time", deserialize_with = "string_or_null")]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleGene {
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub sop_template: String,
    #[serde(default = "unknown_time", deserialize_with = "string_or_null")]
    pub created_at: String,
}

/// One line of voice-over plus the picture that goes with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub id: usize,
    #[serde(default, deserialize_with = "string_or_null")]
    pub content: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub image_suggestion: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub audio_path: Option<String>,
}

impl Scene {
    pub fn new(id: usize, content: String, image_suggestion: String) -> Self {
        Self {
            id,
            content,
            image_suggestion,
            image_url: None,
            audio_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactoryEntry {
    #[serde(default = "untitled", deserialize_with = "string_or_null")]
    pub title: String,
    #[serde(default)]
    pub scenes: Vec<Scene>,
    #[serde(default, deserialize_with = "string_or_null")]
    pub original_script: String,
    #[serde(default = "unknown_time", deserialize_with = "string_or_null")]
    pub created_at: String,
}

/// Local wall-clock time in the format every document uses.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn today() -> String {
    chrono::Local::now().format("%Y-%m-%d").to_string()
}

fn unknown_time() -> String {
    UNKNOWN_TIME.to_string()
}

fn untitled() -> String {
    UNTITLED.to_string()
}

fn string_or_null<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

// Models write heat as 98500, "98500" or 9.85e4 depending on mood
fn lenient_heat<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let heat = match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f.max(0.0) as u64).unwrap_or(0),
        _ => 0,
    };
    Ok(heat)
}
