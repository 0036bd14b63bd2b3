use anyhow::Result;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use crate::core::llm::{ChatRequest, LlmClient};
use crate::core::models::{HistoryArchive, NewsItem, Topic};
use crate::core::store::{Document, JsonStore};

/// Only the head of the raw feed goes into the prompt to save tokens.
pub const MAX_PROMPT_ITEMS: usize = 50;

static JSON_ARRAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*\]").expect("array pattern"));

pub fn build_cluster_prompt(news_items: &[NewsItem]) -> String {
    let news_summary = news_items
        .iter()
        .take(MAX_PROMPT_ITEMS)
        .map(|item| format!("- {} ({})", item.title, item.source))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "你是一个资深的财经短视频编导。请根据以下最新的新闻资讯，聚类出 8-10 个最适合做短视频的选题大方向。\
        请确保至少一半的选题与金融、股市、宏观经济等财经领域强相关。\n\n\
        要求：\n\
        1. 每个大方向要有一个核心主题（Topic）。\n\
        2. 每个大方向下要包含 3-4 个具体的子选题/视频标题。\n\
        3. 为每个大方向预估一个热力值（10000-99999）。\n\
        4. 严格按照以下 JSON 格式输出：\n\
        [\n  {{\"topic\": \"大方向名称\", \"heat\": 98500, \"news_items\": [{{\"title\": \"子选题1\", \"url\": \"原文链接\"}}]}}\n]\n\n\
        新闻资讯：\n{}",
        news_summary
    )
}

/// Pull a topic list out of a model reply.
///
/// Accepts a bare array, an array surrounded by prose or code fences, an
/// object with a `topics` array, or an object holding any array. Anything
/// else gives an empty list.
pub fn parse_topics(content: &str) -> Vec<Topic> {
    let candidate = JSON_ARRAY
        .find(content)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .or_else(|| serde_json::from_str::<Value>(content.trim()).ok());

    let list = match candidate {
        Some(Value::Array(list)) => list,
        Some(Value::Object(mut map)) => match map.remove("topics") {
            Some(Value::Array(list)) => list,
            _ => map
                .into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(list) => Some(list),
                    _ => None,
                })
                .unwrap_or_default(),
        },
        _ => {
            log::warn!("No topic JSON found in model reply");
            Vec::new()
        }
    };

    list.into_iter()
        .filter_map(|v| serde_json::from_value::<Topic>(v).ok())
        .collect()
}

/// Topics worth showing: named, and not the literal `none` some models emit.
pub fn visible_topics(topics: Vec<Topic>) -> Vec<Topic> {
    topics
        .into_iter()
        .filter(|t| {
            let name = t.topic.trim();
            !name.is_empty() && !name.eq_ignore_ascii_case("none")
        })
        .collect()
}

pub async fn cluster_topics(llm: &LlmClient, news_items: &[NewsItem]) -> Vec<Topic> {
    if news_items.is_empty() {
        return Vec::new();
    }

    let prompt = build_cluster_prompt(news_items);
    let request = ChatRequest {
        model: Some(llm.config().cluster_model()),
        prompt: &prompt,
        ..Default::default()
    };

    match llm.complete(request).await {
        Ok(content) => parse_topics(&content),
        Err(e) => {
            log::error!("Error clustering topics: {}", e);
            Vec::new()
        }
    }
}

/// Replace today's topics and set the dated history entry.
pub fn archive_topics(store: &JsonStore, topics: &[Topic], date: &str) -> Result<()> {
    store.save(Document::DailyTopics, &topics)?;

    let mut history: HistoryArchive = store.load(Document::HistoryTopics, HistoryArchive::new());
    history.insert(date.to_string(), topics.to_vec());
    store.save(Document::HistoryTopics, &history)?;
    Ok(())
}

pub async fn run_clustering(store: &JsonStore, llm: &LlmClient, date: &str) -> Result<usize> {
    let news_items: Vec<NewsItem> = store.load(Document::RawNews, Vec::new());
    if news_items.is_empty() {
        log::warn!("Raw news data not found.");
        return Ok(0);
    }

    let topics = cluster_topics(llm, &news_items).await;
    if topics.is_empty() {
        log::warn!("No topics generated.");
        return Ok(0);
    }

    archive_topics(store, &topics, date)?;
    log::info!("Successfully clustered {} topics.", topics.len());
    Ok(topics.len())
}
