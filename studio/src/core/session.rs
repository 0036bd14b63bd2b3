use std::collections::HashSet;

use crate::core::models::{Scene, ScriptRecord};

/// Selection state of one interactive session.
///
/// Nothing here is persisted: scene deletions in particular only hide a
/// scene for the rest of the session and never touch the stored entry.
#[derive(Debug, Default, Clone)]
pub struct SessionContext {
    pub generated: Option<ScriptRecord>,
    pub selected_title: Option<String>,
    pub current_factory_id: Option<String>,
    scene_deletions: HashSet<(String, usize)>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a script the one the next sync works on.
    pub fn load_script(&mut self, record: ScriptRecord) {
        self.generated = Some(record);
        self.selected_title = None;
    }

    pub fn generated_script(&self) -> Option<&str> {
        self.generated.as_ref().map(|r| r.content.as_str())
    }

    pub fn delete_scene(&mut self, session_id: &str, scene_id: usize) {
        self.scene_deletions.insert((session_id.to_string(), scene_id));
    }

    pub fn is_deleted(&self, session_id: &str, scene_id: usize) -> bool {
        self.scene_deletions.contains(&(session_id.to_string(), scene_id))
    }

    pub fn visible_scenes<'a>(&self, session_id: &str, scenes: &'a [Scene]) -> Vec<&'a Scene> {
        scenes
            .iter()
            .filter(|s| !self.is_deleted(session_id, s.id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::segment::segment;

    #[test]
    fn deletions_are_scoped_to_their_entry() {
        let scenes = segment("一\n二\n三");
        let mut session = SessionContext::new();
        session.delete_scene("100.000001", 2);

        let visible: Vec<usize> = session
            .visible_scenes("100.000001", &scenes)
            .iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(visible, vec![1, 3]);
        assert_eq!(session.visible_scenes("200.000001", &scenes).len(), 3);
        // the scene list itself is untouched
        assert_eq!(scenes.len(), 3);
    }

    #[test]
    fn loading_a_script_resets_title() {
        let mut session = SessionContext::new();
        session.selected_title = Some("旧标题".into());
        session.load_script(ScriptRecord {
            id: 1,
            topic: "宏观".into(),
            subtopic: "降息".into(),
            style: "专业分析风".into(),
            content: "### 正文\n内容".into(),
            created_at: "2026-10-19 09:00:00".into(),
        });
        assert!(session.selected_title.is_none());
        assert_eq!(session.generated_script(), Some("### 正文\n内容"));
    }
}
