use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use studio::core::config::{ensure_config, load_config};
use studio::core::segment::segment;
use studio::core::session::SessionContext;
use studio::core::studio::{Studio, TitleChoice};
use studio::core::{script, style};

#[derive(Parser, Debug)]
#[command(name = "studio")]
#[command(about = "Finance video studio: trending topics, scripts and scene breakdowns", long_about = None)]
struct Cli {
    /// Config file, created with defaults when missing
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch hot lists and feeds into the raw news document
    Fetch,
    /// Cluster raw news into today's topics
    Cluster,
    /// Fetch, then cluster
    Refresh,
    /// Show today's topic board
    Topics,
    /// Show archived topics by date
    History,
    /// Style lab
    #[command(subcommand)]
    Style(StyleCommand),
    /// Generate a script for one of today's topics
    Generate {
        #[arg(long)]
        topic: String,
        #[arg(long)]
        subtopic: Option<String>,
        #[arg(long, default_value = "专业分析风")]
        style: String,
        /// Sync the new script to the video factory right away
        #[arg(long)]
        sync: bool,
    },
    /// Search the script library
    Library {
        #[arg(default_value = "")]
        query: String,
    },
    /// List candidate video titles of a stored script
    Titles { script_id: u64 },
    /// Print the scenes of a script file as JSON
    Segment { file: PathBuf },
    /// Sync a stored script to the video factory
    Sync {
        script_id: u64,
        /// 1-based title from the title matrix
        #[arg(long, conflicts_with = "subtopic_title")]
        title: Option<usize>,
        /// Use the script's subtopic as title
        #[arg(long)]
        subtopic_title: bool,
    },
    /// Video factory entries
    #[command(subcommand)]
    Factory(FactoryCommand),
    /// Generate the picture for one scene
    Image { session_id: String, scene_id: usize },
    /// Assign the voice-over path for one scene
    Audio { session_id: String, scene_id: usize },
}

#[derive(Subcommand, Debug)]
enum StyleCommand {
    /// Clone a writing style from sample files
    Analyze {
        name: String,
        #[arg(required = true)]
        samples: Vec<PathBuf>,
        /// Structure template the style should enforce
        #[arg(long)]
        sop: Option<PathBuf>,
    },
    /// List available styles
    List,
}

#[derive(Subcommand, Debug)]
enum FactoryCommand {
    List,
    Show {
        session_id: String,
        /// Hide scenes for this view only
        #[arg(long)]
        hide: Vec<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    ensure_config(&cli.config)?;
    let config = load_config(&cli.config)?;
    let studio = Studio::new(config);
    let mut session = SessionContext::new();

    match cli.command {
        Command::Fetch => {
            let count = studio.fetch_news().await?;
            println!("Fetched {} news items.", count);
        }
        Command::Cluster => {
            let count = studio.cluster().await?;
            println!("Clustered {} topics.", count);
        }
        Command::Refresh => {
            studio.fetch_news().await?;
            let count = studio.cluster().await?;
            println!("Clustered {} topics.", count);
        }
        Command::Topics => {
            let topics = studio.topics();
            if topics.is_empty() {
                println!("No topics yet, run `refresh` first.");
            }
            for (i, topic) in topics.iter().enumerate() {
                println!("{}. {}  🔥{}", i + 1, topic.topic, topic.heat);
                for item in topic.news_items.iter().take(4) {
                    println!("   - {}", item.title);
                }
            }
        }
        Command::History => {
            for (date, topics) in studio.history().iter().rev() {
                println!("📅 {}", date);
                for topic in studio::core::cluster::visible_topics(topics.clone()) {
                    println!("   - {} (🔥 {})", topic.topic, topic.heat);
                }
            }
        }
        Command::Style(StyleCommand::Analyze { name, samples, sop }) => {
            let texts = style::read_samples(&samples);
            let sop_template = match sop {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read SOP template {}", path.display()))?,
                None => String::new(),
            };
            let gene = studio.clone_style(&name, &texts, &sop_template).await?;
            println!("Style '{}' saved.\n{}", name, gene.description);
        }
        Command::Style(StyleCommand::List) => {
            for name in style::style_names(&studio.styles()) {
                println!("{}", name);
            }
        }
        Command::Generate { topic, subtopic, style, sync } => {
            let record = studio
                .generate_script(&mut session, &topic, subtopic.as_deref(), &style)
                .await?;
            println!("Script #{} stored.\n\n{}", record.id, record.content);
            if sync {
                let id = studio.sync_to_factory(&mut session, TitleChoice::Extracted(0))?;
                println!("\nSynced to factory as {}", id);
            }
        }
        Command::Library { query } => {
            let library = studio.library();
            let hits = script::search_library(&library, &query);
            if hits.is_empty() {
                println!("No scripts found.");
            }
            for record in hits {
                println!("#{} [{}] {} / {} ({})", record.id, record.created_at, record.topic, record.subtopic, record.style);
            }
        }
        Command::Titles { script_id } => {
            let record = studio.load_script(&mut session, script_id)?;
            for (i, title) in script::extract_titles(&record.content).iter().enumerate() {
                println!("{}. {}", i + 1, title);
            }
        }
        Command::Segment { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read script {}", file.display()))?;
            println!("{}", serde_json::to_string_pretty(&segment(&text))?);
        }
        Command::Sync { script_id, title, subtopic_title } => {
            studio.load_script(&mut session, script_id)?;
            let choice = match (title, subtopic_title) {
                (_, true) => TitleChoice::Subtopic,
                (Some(n), false) => TitleChoice::Extracted(n.saturating_sub(1)),
                (None, false) => TitleChoice::Extracted(0),
            };
            let id = studio.sync_to_factory(&mut session, choice)?;
            println!(
                "Synced '{}' as {}",
                session.selected_title.as_deref().unwrap_or_default(),
                id
            );
        }
        Command::Factory(FactoryCommand::List) => {
            for (id, entry) in studio.factory().entries() {
                println!("{}  {} ({}, {} scenes)", id, entry.title, entry.created_at, entry.scenes.len());
            }
        }
        Command::Factory(FactoryCommand::Show { session_id, hide }) => {
            let entry = studio
                .factory()
                .entry(&session_id)
                .with_context(|| format!("No factory entry {}", session_id))?;
            for scene_id in hide {
                session.delete_scene(&session_id, scene_id);
            }
            println!("当前视频标题：{}", entry.title);
            for scene in session.visible_scenes(&session_id, &entry.scenes) {
                println!("\n场景 {}\n配音文案：{}\n视觉描述：{}", scene.id, scene.content, scene.image_suggestion);
                if let Some(url) = &scene.image_url {
                    println!("配图：{}", url);
                }
                if let Some(path) = &scene.audio_path {
                    println!("配音：{}", path);
                }
            }
        }
        Command::Image { session_id, scene_id } => {
            let url = studio.generate_scene_image(&session_id, scene_id).await?;
            println!("{}", url);
        }
        Command::Audio { session_id, scene_id } => {
            let path = studio.generate_scene_audio(&session_id, scene_id)?;
            println!("{}", path.display());
        }
    }

    Ok(())
}
