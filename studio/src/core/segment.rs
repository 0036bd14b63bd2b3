//! Script to scene segmentation.
//!
//! A generated script is Markdown: an optional title matrix, a body
//! heading, then the voice-over text. Each non-empty body line becomes one
//! scene. Inline `(配图建议：...)` markers carry the picture for that line.
//!
//! Structure is found in two independent scans: first the optional title
//! matrix region is cut out, then the body is taken after the last body
//! heading. Either scan missing its marker leaves the text as it was.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

use crate::core::models::Scene;

pub const FALLBACK_PREFIX: &str = "财经视频场景：";
pub const FALLBACK_CHARS: usize = 30;

static TITLE_MATRIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)(### 标题矩阵.*?)(#+ 正文|#+ 脚本正文)").expect("title matrix pattern")
});

static BODY_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)#+ 正文|#+ 脚本正文").expect("body heading pattern"));

static IMAGE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(配图建议[：:](.*?)\)").expect("image marker pattern"));

/// Split a script into ordered scenes. Never fails; malformed structure is
/// treated as absent.
pub fn segment(script_text: &str) -> Vec<Scene> {
    log::debug!("Segmenting script of {} chars", script_text.chars().count());

    let trimmed = strip_title_matrix(script_text);
    let body = isolate_body(&trimmed);

    let mut scenes = Vec::new();
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let (content, suggestion) = extract_annotation(line);
        if content.is_empty() {
            continue;
        }
        let image_suggestion = suggestion
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| fallback_suggestion(&content));
        scenes.push(Scene::new(scenes.len() + 1, content, image_suggestion));
    }

    log::debug!("Segmented into {} scenes", scenes.len());
    scenes
}

/// Cut `### 标题矩阵` up to (not including) the body heading that ends it.
pub fn strip_title_matrix(text: &str) -> Cow<'_, str> {
    match TITLE_MATRIX.captures(text).and_then(|caps| caps.get(1)) {
        Some(region) => {
            log::debug!("Removed title matrix ({} bytes)", region.len());
            Cow::Owned(format!("{}{}", &text[..region.start()], &text[region.end()..]))
        }
        None => Cow::Borrowed(text),
    }
}

/// Everything after the last body heading, or the whole text without one.
pub fn isolate_body(text: &str) -> &str {
    BODY_HEADING.split(text).last().unwrap_or(text)
}

/// Returns the line without any image markers and the first marker's text.
pub fn extract_annotation(line: &str) -> (String, Option<String>) {
    let suggestion = IMAGE_MARKER
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string());

    match suggestion {
        Some(suggestion) => {
            let content = IMAGE_MARKER.replace_all(line, "").trim().to_string();
            (content, Some(suggestion))
        }
        None => (line.to_string(), None),
    }
}

pub fn fallback_suggestion(content: &str) -> String {
    let head: String = content.chars().take(FALLBACK_CHARS).collect();
    format!("{}{}", FALLBACK_PREFIX, head)
}
