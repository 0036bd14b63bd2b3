use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::Client;
use serde_json::Value;
use std::sync::LazyLock;
use std::time::Duration;

use crate::core::config::{FeedSource, NewsConfig};
use crate::core::models::{timestamp, NewsItem};
use crate::core::store::{Document, JsonStore};

const TIANAPI_BASE: &str = "https://apis.tianapi.com";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("space pattern"));

/// Which TianAPI list an item came from; decides how its fields map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotList {
    World,
    NetworkHot,
    ToutiaoHot,
}

impl HotList {
    pub const ALL: [HotList; 3] = [HotList::World, HotList::NetworkHot, HotList::ToutiaoHot];

    pub fn endpoint(self) -> &'static str {
        match self {
            HotList::World => "world",
            HotList::NetworkHot => "networkhot",
            HotList::ToutiaoHot => "toutiaohot",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            HotList::World => "国际新闻",
            HotList::NetworkHot => "全网热搜",
            HotList::ToutiaoHot => "今日头条",
        }
    }

    pub fn to_item(self, raw: &Value, fetched_at: &str) -> NewsItem {
        let text = |key: &str| raw[key].as_str().unwrap_or_default().to_string();
        let word_or_title = || {
            raw["word"]
                .as_str()
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| text("title"))
        };

        match self {
            HotList::World => NewsItem {
                title: text("title"),
                description: text("description"),
                source: self.source().to_string(),
                url: text("url"),
                ctime: text("ctime"),
            },
            HotList::NetworkHot => NewsItem {
                title: word_or_title(),
                description: text("digest"),
                source: self.source().to_string(),
                url: text("url"),
                ctime: fetched_at.to_string(),
            },
            HotList::ToutiaoHot => NewsItem {
                title: word_or_title(),
                description: String::new(),
                source: self.source().to_string(),
                url: text("url"),
                ctime: fetched_at.to_string(),
            },
        }
    }
}

pub struct NewsFetcher {
    client: Client,
    config: NewsConfig,
}

impl NewsFetcher {
    pub fn new(config: NewsConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
                .build()
                .unwrap_or_else(|_| Client::new()),
            config,
        }
    }

    /// Pull every configured source. A failing source contributes nothing.
    pub async fn fetch_all(&self) -> Vec<NewsItem> {
        let mut all_news = Vec::new();
        let fetched_at = timestamp();

        match &self.config.tianapi_key {
            Some(key) => {
                for list in HotList::ALL {
                    match self.fetch_tianapi(key, list.endpoint()).await {
                        Ok(raw) => {
                            log::info!("Fetched {} items from {}", raw.len(), list.endpoint());
                            all_news.extend(raw.iter().map(|r| list.to_item(r, &fetched_at)));
                        }
                        Err(e) => log::warn!("Error fetching {}: {}", list.endpoint(), e),
                    }
                }
            }
            None => log::warn!("No TianAPI key configured, skipping hot lists"),
        }

        for feed in &self.config.feeds {
            match self.fetch_feed(feed).await {
                Ok(items) => all_news.extend(items),
                Err(e) => log::warn!("Failed to fetch feed {}: {}", feed.url, e),
            }
        }

        all_news
    }

    async fn fetch_tianapi(&self, key: &str, endpoint: &str) -> Result<Vec<Value>> {
        let url = format!("{}/{}/index", TIANAPI_BASE, endpoint);
        let res = self.client.get(&url).query(&[("key", key)]).send().await?;
        let json: Value = res.json().await?;
        parse_tianapi_list(&json)
    }

    async fn fetch_feed(&self, feed: &FeedSource) -> Result<Vec<NewsItem>> {
        let content = self.client.get(&feed.url).send().await?.bytes().await?;
        let cursor = std::io::Cursor::new(content);
        let parsed = feed_rs::parser::parse(cursor)?;

        let items = parsed
            .entries
            .into_iter()
            .map(|entry| {
                let title = entry.title.map(|t| t.content).unwrap_or_default();
                let url = entry.links.first().map(|l| l.href.clone()).unwrap_or_default();

                // Try summary first, then content body
                let description = entry
                    .summary
                    .map(|s| s.content)
                    .or_else(|| entry.content.and_then(|c| c.body))
                    .unwrap_or_default();

                let ctime = entry
                    .published
                    .map(|d| d.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(timestamp);

                NewsItem {
                    title,
                    description: clean_text(&description, 500),
                    source: feed.name.clone(),
                    url,
                    ctime,
                }
            })
            .filter(|i| !i.url.is_empty())
            .collect();

        Ok(items)
    }
}

/// `result.list` of a TianAPI response, only when `code` is 200.
pub fn parse_tianapi_list(json: &Value) -> Result<Vec<Value>> {
    let code = json["code"].as_i64().unwrap_or_default();
    if code != 200 {
        let msg = json["msg"].as_str().unwrap_or("unknown error");
        return Err(anyhow!("TianAPI returned code {}: {}", code, msg));
    }
    Ok(json["result"]["list"].as_array().cloned().unwrap_or_default())
}

/// Strip HTML, collapse whitespace, truncate to `max_chars` characters.
pub fn clean_text(input: &str, max_chars: usize) -> String {
    let no_html = HTML_TAG.replace_all(input, " ");
    let clean = WHITESPACE.replace_all(&no_html, " ");
    let clean = clean.trim();

    if clean.chars().count() > max_chars {
        let mut s: String = clean.chars().take(max_chars).collect();
        s.push_str("...");
        s
    } else {
        clean.to_string()
    }
}

/// Fetch everything and overwrite the raw news document.
pub async fn run_fetch(store: &JsonStore, fetcher: &NewsFetcher) -> Result<usize> {
    let all_news = fetcher.fetch_all().await;
    store.save(Document::RawNews, &all_news)?;
    log::info!("Successfully fetched {} news items.", all_news.len());
    Ok(all_news.len())
}
