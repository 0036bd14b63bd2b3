use anyhow::{anyhow, bail, Result};
use std::path::PathBuf;

use crate::core::cluster;
use crate::core::config::Config;
use crate::core::factory::VideoFactory;
use crate::core::llm::LlmClient;
use crate::core::media::{self, ImageClient};
use crate::core::models::{
    today, HistoryArchive, ScriptLibrary, ScriptRecord, StyleGene, StyleLibrary, Topic,
};
use crate::core::news::{self, NewsFetcher};
use crate::core::script::{self, ScriptRequest};
use crate::core::session::SessionContext;
use crate::core::store::{Document, JsonStore};
use crate::core::style;

/// Which title a synced script gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleChoice {
    /// Index into the titles extracted from the title matrix.
    Extracted(usize),
    Subtopic,
}

/// All pipeline stages behind one handle. Handlers that act on the
/// operator's current selection take the session explicitly.
pub struct Studio {
    config: Config,
    store: JsonStore,
    llm: LlmClient,
    images: ImageClient,
    fetcher: NewsFetcher,
    factory: VideoFactory,
}

impl Studio {
    pub fn new(config: Config) -> Self {
        let store = JsonStore::new(&config.store.data_dir);
        Self {
            llm: LlmClient::new(config.llm.clone()),
            images: ImageClient::new(&config.llm, config.image.clone()),
            fetcher: NewsFetcher::new(config.news.clone()),
            factory: VideoFactory::new(store.clone()),
            store,
            config,
        }
    }

    pub fn store(&self) -> &JsonStore {
        &self.store
    }

    pub fn factory(&self) -> &VideoFactory {
        &self.factory
    }

    pub async fn fetch_news(&self) -> Result<usize> {
        news::run_fetch(&self.store, &self.fetcher).await
    }

    pub async fn cluster(&self) -> Result<usize> {
        cluster::run_clustering(&self.store, &self.llm, &today()).await
    }

    pub fn topics(&self) -> Vec<Topic> {
        cluster::visible_topics(self.store.load(Document::DailyTopics, Vec::new()))
    }

    pub fn history(&self) -> HistoryArchive {
        self.store.load(Document::HistoryTopics, HistoryArchive::new())
    }

    pub fn styles(&self) -> StyleLibrary {
        self.store.load(Document::StyleLibrary, StyleLibrary::new())
    }

    pub fn library(&self) -> ScriptLibrary {
        self.store.load(Document::ScriptLibrary, ScriptLibrary::new())
    }

    pub async fn clone_style(&self, name: &str, samples: &[String], sop_template: &str) -> Result<StyleGene> {
        style::clone_style(&self.store, &self.llm, name, samples, sop_template).await
    }

    /// Generate a script for a topic, store it, and make it the session's
    /// current script. Without a subtopic the topic's first one is used.
    pub async fn generate_script(
        &self,
        session: &mut SessionContext,
        topic_name: &str,
        subtopic: Option<&str>,
        style_name: &str,
    ) -> Result<ScriptRecord> {
        let topics = self.topics();
        let topic = topics
            .iter()
            .find(|t| t.topic == topic_name)
            .ok_or_else(|| anyhow!("Topic '{}' is not on today's board", topic_name))?;

        let subtopic = match subtopic {
            Some(s) => s.to_string(),
            None => topic
                .news_items
                .first()
                .map(|n| n.title.clone())
                .unwrap_or_default(),
        };

        let (style_description, sop_template) = style::resolve_style(&self.styles(), style_name);
        let request = ScriptRequest {
            topic: &topic.topic,
            subtopic: &subtopic,
            style_name,
            style_description: &style_description,
            sop_template: &sop_template,
            materials: &topic.news_items,
        };

        log::info!("Generating script for [{}] {}", topic.topic, subtopic);
        let content = script::generate_script(&self.llm, &request).await;
        let record = script::append_to_library(&self.store, &topic.topic, &subtopic, style_name, &content)?;
        session.load_script(record.clone());
        Ok(record)
    }

    /// Put a stored script into the session, like loading it into the editor.
    pub fn load_script(&self, session: &mut SessionContext, script_id: u64) -> Result<ScriptRecord> {
        let record = self
            .library()
            .into_iter()
            .find(|r| r.id == script_id)
            .ok_or_else(|| anyhow!("No script #{} in the library", script_id))?;
        session.load_script(record.clone());
        Ok(record)
    }

    /// Segment the session's script into a new factory entry and select it.
    pub fn sync_to_factory(&self, session: &mut SessionContext, choice: TitleChoice) -> Result<String> {
        let record = session
            .generated
            .clone()
            .ok_or_else(|| anyhow!("No script loaded in this session"))?;

        let title = match choice {
            TitleChoice::Subtopic => record.subtopic.clone(),
            TitleChoice::Extracted(idx) => {
                let titles = script::extract_titles(&record.content);
                if titles.is_empty() {
                    log::warn!("No title matrix found in script #{}, using its subtopic", record.id);
                    record.subtopic.clone()
                } else {
                    titles.get(idx).cloned().ok_or_else(|| {
                        anyhow!("Title {} out of range, script has {} titles", idx + 1, titles.len())
                    })?
                }
            }
        };

        let session_id = self.factory.sync_script(&title, &record.content)?;
        session.selected_title = Some(title);
        session.current_factory_id = Some(session_id.clone());
        Ok(session_id)
    }

    pub async fn generate_scene_image(&self, session_id: &str, scene_id: usize) -> Result<String> {
        let entry = self
            .factory
            .entry(session_id)
            .ok_or_else(|| anyhow!("No factory entry {}", session_id))?;
        let Some(scene) = entry.scenes.iter().find(|s| s.id == scene_id) else {
            bail!("Entry {} has no scene {}", session_id, scene_id);
        };

        let url = self.images.generate(&scene.image_suggestion).await;
        self.factory.attach_image(session_id, scene_id, &url)?;
        Ok(url)
    }

    pub fn generate_scene_audio(&self, session_id: &str, scene_id: usize) -> Result<PathBuf> {
        let entry = self
            .factory
            .entry(session_id)
            .ok_or_else(|| anyhow!("No factory entry {}", session_id))?;
        let Some(scene) = entry.scenes.iter().find(|s| s.id == scene_id) else {
            bail!("Entry {} has no scene {}", session_id, scene_id);
        };

        let path = media::audio_placeholder(&PathBuf::from(&self.config.store.media_dir), &scene.content);
        self.factory.attach_audio(session_id, scene_id, &path.to_string_lossy())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::parse_config;
    use crate::core::models::TopicNewsItem;

    fn studio(dir: &tempfile::TempDir) -> Studio {
        let mut config = parse_config(
            r#"
[llm]
api_url = "http://127.0.0.1:9/v1"
model = "test"
timeout_secs = 1
"#,
        )
        .expect("config");
        config.store.data_dir = dir.path().to_string_lossy().to_string();
        config.store.media_dir = dir.path().join("media").to_string_lossy().to_string();
        Studio::new(config)
    }

    fn stored_script(studio: &Studio, content: &str) -> ScriptRecord {
        script::append_to_library(studio.store(), "宏观", "降息落地", "专业分析风", content).expect("append")
    }

    const SCRIPT: &str = "### 标题矩阵\n深度追问风: [长标题] 降息之后 [短标题] 降息\n### 正文\n开场白(配图建议：股市大跌图)\n第二段没有标注";

    #[test]
    fn sync_uses_extracted_title_and_selects_entry() {
        let dir = tempfile::tempdir().expect("tempdir");
        let studio = studio(&dir);
        let record = stored_script(&studio, SCRIPT);

        let mut session = SessionContext::new();
        studio.load_script(&mut session, record.id).expect("load");
        let id = studio.sync_to_factory(&mut session, TitleChoice::Extracted(0)).expect("sync");

        assert_eq!(session.current_factory_id.as_deref(), Some(id.as_str()));
        let entry = studio.factory().entry(&id).expect("entry");
        assert_eq!(entry.title, "深度追问风: [长标题] 降息之后 [短标题] 降息");
        assert_eq!(entry.scenes.len(), 2);
        assert_eq!(entry.original_script, SCRIPT);
    }

    #[test]
    fn sync_without_titles_falls_back_to_subtopic() {
        let dir = tempfile::tempdir().expect("tempdir");
        let studio = studio(&dir);
        let record = stored_script(&studio, "### 正文\n只有正文");

        let mut session = SessionContext::new();
        studio.load_script(&mut session, record.id).expect("load");
        let id = studio.sync_to_factory(&mut session, TitleChoice::Extracted(0)).expect("sync");
        assert_eq!(studio.factory().entry(&id).expect("entry").title, "降息落地");
    }

    #[test]
    fn sync_rejects_out_of_range_title_and_empty_session() {
        let dir = tempfile::tempdir().expect("tempdir");
        let studio = studio(&dir);
        let mut session = SessionContext::new();
        assert!(studio.sync_to_factory(&mut session, TitleChoice::Subtopic).is_err());

        let record = stored_script(&studio, SCRIPT);
        studio.load_script(&mut session, record.id).expect("load");
        assert!(studio.sync_to_factory(&mut session, TitleChoice::Extracted(7)).is_err());
        assert!(studio.factory().entries().is_empty());
    }

    #[test]
    fn audio_paths_are_attached() {
        let dir = tempfile::tempdir().expect("tempdir");
        let studio = studio(&dir);
        let id = studio.factory().sync_script("t", SCRIPT).expect("sync");

        let path = studio.generate_scene_audio(&id, 2).expect("audio");
        let entry = studio.factory().entry(&id).expect("entry");
        let expected = path.to_string_lossy().to_string();
        assert_eq!(entry.scenes[1].audio_path.as_deref(), Some(expected.as_str()));
        assert!(studio.generate_scene_audio(&id, 9).is_err());
    }

    #[test]
    fn topics_board_hides_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let studio = studio(&dir);
        let topics = vec![
            Topic { topic: "none".into(), ..Default::default() },
            Topic {
                topic: "黄金".into(),
                heat: 91000,
                news_items: vec![TopicNewsItem { title: "金价新高".into(), url: String::new() }],
            },
        ];
        studio.store().save(Document::DailyTopics, &topics).expect("save");
        let board = studio.topics();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].topic, "黄金");
    }

    #[tokio::test]
    async fn unreachable_model_still_stores_a_script() {
        let dir = tempfile::tempdir().expect("tempdir");
        let studio = studio(&dir);
        let topics = vec![Topic {
            topic: "黄金".into(),
            heat: 91000,
            news_items: vec![TopicNewsItem { title: "金价新高".into(), url: String::new() }],
        }];
        studio.store().save(Document::DailyTopics, &topics).expect("save");

        let mut session = SessionContext::new();
        let record = studio
            .generate_script(&mut session, "黄金", None, "专业分析风")
            .await
            .expect("generate");
        assert!(record.content.starts_with("文稿生成失败"));
        assert_eq!(record.subtopic, "金价新高");
        assert_eq!(studio.library().len(), 1);
        assert_eq!(session.generated_script(), Some(record.content.as_str()));
    }
}
