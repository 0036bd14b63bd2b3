use anyhow::Result;
use regex::Regex;
use std::sync::LazyLock;

use crate::core::llm::{ChatRequest, LlmClient};
use crate::core::models::{timestamp, ScriptLibrary, ScriptRecord, TopicNewsItem};
use crate::core::store::{Document, JsonStore};

const TITLE_MATRIX_HEADING: &str = "### 标题矩阵";
const EDITOR_SYSTEM: &str = "你是一个擅长长视频创作的财经视频编导。";

static LIST_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\*\-\d\.\s]+").expect("prefix pattern"));
static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r".*标题.*[:：].+").expect("title pattern"));

/// Everything the script prompt is assembled from.
#[derive(Debug, Clone)]
pub struct ScriptRequest<'a> {
    pub topic: &'a str,
    pub subtopic: &'a str,
    pub style_name: &'a str,
    pub style_description: &'a str,
    pub sop_template: &'a str,
    pub materials: &'a [TopicNewsItem],
}

pub fn build_script_prompt(req: &ScriptRequest<'_>) -> String {
    let mut news_context = String::new();
    for (idx, news) in req.materials.iter().enumerate() {
        news_context.push_str(&format!("素材{}: {}\n内容摘要: 暂无摘要\n\n", idx + 1, news.title));
    }

    let sop_instruction = if req.sop_template.trim().is_empty() {
        String::new()
    } else {
        format!("\n### 强制 SOP 结构约束\n请严格按照以下结构进行创作：\n{}", req.sop_template)
    };

    format!(
        "你是一位拥有百万粉丝的资深财经/科技短视频博主。请直接切入主题，基于以下素材，\
        创作一份时长为 3-5 分钟（约 1500-2500 字）的深度视频脚本。严禁任何形式的开场寒暄。\n\n\
        ### 核心选题\n\
        - 大方向：{topic}\n\
        - 具体子选题：{subtopic}\n\
        - 创作风格：{style}\n\
        - 风格基因描述：{desc}\n\
        {sop}\n\n\
        ### 背景素材\n{news}\n\
        ### 创作要求\n\
        1. **标题矩阵**：以“### 标题矩阵”开头，包含深度追问风、全球视野风、利益相关风、情绪共鸣风、犀利吐槽风五种风格，\
        格式严格为：风格名: [长标题] xxx [短标题] xxx\n\
        2. **正文**：以“### 正文”开头，黄金 3 秒开场，多维深度拆解，口语化表达；\
        需要配图的段落在句末用 (配图建议：画面描述) 标注。\n\
        3. **标准化结尾**：必须包含【本视频文稿特点】模块，总结创作逻辑、情绪钩子、核心价值点。\n\
        4. **绝对禁令**：严禁低俗、套路化的开场白，严禁 AI 痕迹明显的套话。\n\n\
        请直接输出 Markdown 格式，确保字数充足，逻辑严密。",
        topic = req.topic,
        subtopic = req.subtopic,
        style = req.style_name,
        desc = req.style_description,
        sop = sop_instruction,
        news = news_context,
    )
}

/// Generate a script. A failed call still yields a document whose text
/// explains the failure, so it can be stored like any other.
pub async fn generate_script(llm: &LlmClient, req: &ScriptRequest<'_>) -> String {
    let prompt = build_script_prompt(req);
    let request = ChatRequest {
        model: Some(llm.config().script_model()),
        system: Some(EDITOR_SYSTEM),
        prompt: &prompt,
        temperature: Some(0.7),
    };

    match llm.complete(request).await {
        Ok(script) => script,
        Err(e) => {
            log::error!("Script generation failed: {}", e);
            format!("文稿生成失败: {}", e)
        }
    }
}

// Known limitation: ids would repeat if records were ever deleted.
pub fn next_script_id(library: &ScriptLibrary) -> u64 {
    library.len() as u64 + 1
}

pub fn append_to_library(
    store: &JsonStore,
    topic: &str,
    subtopic: &str,
    style: &str,
    content: &str,
) -> Result<ScriptRecord> {
    let mut library: ScriptLibrary = store.load(Document::ScriptLibrary, ScriptLibrary::new());
    let record = ScriptRecord {
        id: next_script_id(&library),
        topic: topic.to_string(),
        subtopic: subtopic.to_string(),
        style: style.to_string(),
        content: content.to_string(),
        created_at: timestamp(),
    };
    library.push(record.clone());
    store.save(Document::ScriptLibrary, &library)?;
    log::info!("Stored script #{} for '{}'", record.id, subtopic);
    Ok(record)
}

/// Case-insensitive keyword search, newest first. An empty query lists all.
pub fn search_library<'a>(library: &'a [ScriptRecord], query: &str) -> Vec<&'a ScriptRecord> {
    let query = query.trim().to_lowercase();
    library
        .iter()
        .rev()
        .filter(|r| {
            query.is_empty()
                || [&r.topic, &r.subtopic, &r.style, &r.content, &r.created_at]
                    .iter()
                    .any(|field| field.to_lowercase().contains(&query))
        })
        .collect()
}

/// Candidate video titles from the script's title matrix.
pub fn extract_titles(script: &str) -> Vec<String> {
    let mut titles = Vec::new();

    if let Some((_, after)) = script.split_once(TITLE_MATRIX_HEADING) {
        let section = after.split("###").next().unwrap_or_default();
        for line in section.lines().map(str::trim).filter(|l| !l.is_empty()) {
            if ["标题", "风", "：", ":"].iter().any(|k| line.contains(k)) {
                let clean = LIST_PREFIX.replace(line, "");
                let clean = clean.trim();
                if !clean.is_empty() {
                    titles.push(clean.to_string());
                }
            }
        }
    }

    if titles.is_empty() {
        titles = TITLE_LINE
            .find_iter(script)
            .map(|m| m.as_str().trim().to_string())
            .collect();
    }

    titles
}
