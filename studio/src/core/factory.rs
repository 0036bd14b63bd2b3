use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};

use crate::core::models::{timestamp, FactoryEntry, FactoryState, Scene};
use crate::core::segment::segment;
use crate::core::store::{Document, JsonStore};

/// Synced scripts waiting for media, keyed by a time-derived session id.
#[derive(Debug, Clone)]
pub struct VideoFactory {
    store: JsonStore,
}

impl VideoFactory {
    pub fn new(store: JsonStore) -> Self {
        Self { store }
    }

    pub fn entries(&self) -> FactoryState {
        self.store.load(Document::FactoryState, FactoryState::new())
    }

    pub fn entry(&self, session_id: &str) -> Option<FactoryEntry> {
        self.entries().remove(session_id)
    }

    /// Store a new entry and return its id. Every call creates a new entry,
    /// even for a script that was synced before.
    pub fn sync(&self, title: &str, scenes: Vec<Scene>, original_script: &str) -> Result<String> {
        let mut state = self.entries();
        let session_id = next_session_id(&state, Utc::now());
        let scene_count = scenes.len();

        state.insert(
            session_id.clone(),
            FactoryEntry {
                title: title.to_string(),
                scenes,
                original_script: original_script.to_string(),
                created_at: timestamp(),
            },
        );
        self.store.save(Document::FactoryState, &state)?;

        log::info!("Synced '{}' to factory as {} ({} scenes)", title, session_id, scene_count);
        Ok(session_id)
    }

    pub fn sync_script(&self, title: &str, script: &str) -> Result<String> {
        self.sync(title, segment(script), script)
    }

    pub fn attach_image(&self, session_id: &str, scene_id: usize, url: &str) -> Result<()> {
        self.update_scene(session_id, scene_id, |scene| {
            scene.image_url = Some(url.to_string());
        })
    }

    pub fn attach_audio(&self, session_id: &str, scene_id: usize, path: &str) -> Result<()> {
        self.update_scene(session_id, scene_id, |scene| {
            scene.audio_path = Some(path.to_string());
        })
    }

    fn update_scene<F>(&self, session_id: &str, scene_id: usize, apply: F) -> Result<()>
    where
        F: FnOnce(&mut Scene),
    {
        let mut state = self.entries();
        let entry = state
            .get_mut(session_id)
            .ok_or_else(|| anyhow!("No factory entry {}", session_id))?;
        let scene = entry
            .scenes
            .iter_mut()
            .find(|s| s.id == scene_id)
            .ok_or_else(|| anyhow!("Entry {} has no scene {}", session_id, scene_id))?;
        apply(scene);
        self.store.save(Document::FactoryState, &state)?;
        Ok(())
    }
}

/// `<unix seconds>.<microseconds>`, bumped until it is not already taken.
pub fn next_session_id(existing: &FactoryState, now: DateTime<Utc>) -> String {
    let mut micros = now.timestamp_micros();
    loop {
        let id = format!("{}.{:06}", micros.div_euclid(1_000_000), micros.rem_euclid(1_000_000));
        if !existing.contains_key(&id) {
            return id;
        }
        micros += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn factory() -> (tempfile::TempDir, VideoFactory) {
        let dir = tempfile::tempdir().expect("tempdir");
        let factory = VideoFactory::new(JsonStore::new(dir.path()));
        (dir, factory)
    }

    #[test]
    fn session_id_format() {
        let now = Utc.timestamp_opt(1_760_000_000, 42_000).single().expect("time");
        assert_eq!(next_session_id(&FactoryState::new(), now), "1760000000.000042");
    }

    #[test]
    fn session_id_skips_taken_ids() {
        let now = Utc.timestamp_opt(1_760_000_000, 999_999_000).single().expect("time");
        let mut state = FactoryState::new();
        state.insert(
            "1760000000.999999".into(),
            FactoryEntry {
                title: String::new(),
                scenes: Vec::new(),
                original_script: String::new(),
                created_at: String::new(),
            },
        );
        assert_eq!(next_session_id(&state, now), "1760000001.000000");
    }

    #[test]
    fn identical_syncs_create_two_entries() {
        let (_dir, factory) = factory();
        let script = "### 正文\n开场白(配图建议：股市大跌图)\n第二段";
        let first = factory.sync_script("降息来了", script).expect("first sync");
        let second = factory.sync_script("降息来了", script).expect("second sync");

        assert_ne!(first, second);
        let state = factory.entries();
        assert_eq!(state.len(), 2);
        assert_eq!(state[&first].scenes, state[&second].scenes);
        assert_eq!(state[&first].original_script, script);
        assert_eq!(state[&first].scenes.len(), 2);
    }

    #[test]
    fn attached_media_is_persisted() {
        let (_dir, factory) = factory();
        let id = factory.sync_script("标题", "一\n二").expect("sync");
        factory.attach_image(&id, 2, "https://img/2.png").expect("image");
        factory.attach_audio(&id, 1, "temp_video/audio_1.mp3").expect("audio");

        let entry = factory.entry(&id).expect("entry");
        assert_eq!(entry.scenes[1].image_url.as_deref(), Some("https://img/2.png"));
        assert_eq!(entry.scenes[0].audio_path.as_deref(), Some("temp_video/audio_1.mp3"));
        assert!(entry.scenes[0].image_url.is_none());
    }

    #[test]
    fn sync_keeps_entries_with_missing_fields() {
        let (_dir, factory) = factory();
        std::fs::write(
            factory.store.path(Document::FactoryState),
            r#"{"1700000000.1": {"title": "旧", "scenes": [], "original_script": "x"}}"#,
        )
        .expect("seed state");

        let id = factory.sync_script("新", "一").expect("sync");
        let state = factory.entries();
        assert_eq!(state.len(), 2);
        assert_eq!(state["1700000000.1"].title, "旧");
        assert_eq!(state["1700000000.1"].created_at, "未知时间");
        assert_eq!(state[&id].title, "新");
    }

    #[test]
    fn attaching_to_unknown_scene_fails() {
        let (_dir, factory) = factory();
        let id = factory.sync_script("标题", "一").expect("sync");
        assert!(factory.attach_image(&id, 5, "u").is_err());
        assert!(factory.attach_image("0.000000", 1, "u").is_err());
    }
}
