use anyhow::{bail, Result};
use std::path::Path;

use crate::core::llm::{ChatRequest, LlmClient};
use crate::core::models::{timestamp, StyleGene, StyleLibrary};
use crate::core::store::{Document, JsonStore};

/// Offered before any trained style.
pub const BUILTIN_STYLES: [&str; 3] = ["专业分析风", "快节奏口播风", "幽默吐槽风"];
pub const DEFAULT_STYLE_DESCRIPTION: &str = "口语化、深度分析";

const ANALYST_SYSTEM: &str = "你是一个专业的自媒体风格分析师。";

pub fn build_style_prompt(samples: &[String]) -> String {
    let mut samples_text = String::new();
    for (i, sample) in samples.iter().enumerate() {
        if !sample.trim().is_empty() {
            samples_text.push_str(&format!("--- 样本 {} ---\n{}\n\n", i + 1, sample));
        }
    }

    format!(
        "你是一位顶级的自媒体内容分析专家。请深度分析以下多份样本文稿，并提取该博主的“核心风格基因”。\n\n\
        【样本文稿集】：\n{}\n\
        请通过交叉比对，提取出该博主最本质的共性特征（总字数 300 字以内）：\n\
        1. 核心语感（如：激进、专业、亲和、毒舌等）\n\
        2. 常用句式（如：爱用反问、多用短句、喜欢列举数据等）\n\
        3. 叙事逻辑（如：先抑后扬、剥洋葱式拆解、故事驱动等）\n\
        4. 标志性口头禅或固定开场/结尾方式\n\n\
        【负面约束】\n\
        明确禁止提取和鼓励任何低俗、套路化的口癖（如：老铁、扒拉、干货等）。\n\n\
        请直接输出风格描述，确保描述精准且具有可操作性。",
        samples_text
    )
}

/// Cross-analyse samples into one style description. On failure the
/// description explains the failure instead.
pub async fn analyze_styles(llm: &LlmClient, samples: &[String]) -> String {
    let prompt = build_style_prompt(samples);
    let request = ChatRequest {
        model: Some(llm.config().style_model()),
        system: Some(ANALYST_SYSTEM),
        prompt: &prompt,
        temperature: Some(0.3),
    };

    match llm.complete(request).await {
        Ok(description) => description,
        Err(e) => {
            log::error!("Style analysis failed: {}", e);
            format!("风格分析失败: {}", e)
        }
    }
}

/// Store a gene under `name`, replacing any previous one.
pub fn save_style(store: &JsonStore, name: &str, description: &str, sop_template: &str) -> Result<StyleGene> {
    let mut styles: StyleLibrary = store.load(Document::StyleLibrary, StyleLibrary::new());
    let gene = StyleGene {
        description: description.to_string(),
        sop_template: sop_template.to_string(),
        created_at: timestamp(),
    };
    if styles.insert(name.to_string(), gene.clone()).is_some() {
        log::info!("Replaced existing style '{}'", name);
    }
    store.save(Document::StyleLibrary, &styles)?;
    Ok(gene)
}

pub async fn clone_style(
    store: &JsonStore,
    llm: &LlmClient,
    name: &str,
    samples: &[String],
    sop_template: &str,
) -> Result<StyleGene> {
    let name = name.trim();
    if name.is_empty() || samples.iter().all(|s| s.trim().is_empty()) {
        bail!("A style name and at least one sample are required");
    }

    log::info!("Analysing {} samples for style '{}'", samples.len(), name);
    let description = analyze_styles(llm, samples).await;
    save_style(store, name, &description, sop_template)
}

/// Built-in styles first, then trained ones.
pub fn style_names(styles: &StyleLibrary) -> Vec<String> {
    BUILTIN_STYLES
        .iter()
        .map(|s| s.to_string())
        .chain(styles.keys().filter(|k| !BUILTIN_STYLES.contains(&k.as_str())).cloned())
        .collect()
}

/// Description and SOP template to generate with. Unknown styles fall back
/// to a generic description and no template.
pub fn resolve_style(styles: &StyleLibrary, name: &str) -> (String, String) {
    match styles.get(name) {
        Some(gene) => (gene.description.clone(), gene.sop_template.clone()),
        None => (DEFAULT_STYLE_DESCRIPTION.to_string(), String::new()),
    }
}

/// Read sample files as UTF-8 text, skipping the unreadable ones.
pub fn read_samples<P: AsRef<Path>>(paths: &[P]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|p| match std::fs::read_to_string(p.as_ref()) {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("Cannot read sample {}: {}", p.as_ref().display(), e);
                None
            }
        })
        .collect()
}
