use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use chrono::Utc;
use tracing::{error, info};

use crate::catalogue::{Category, CategoryGroup};
use crate::llm::media::load_image_file;
use crate::llm::EncodedImage;
use crate::state::{ImageSlot, Session, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateArgs {
    pub category: Category,
    pub model_path: PathBuf,
    pub item_path: PathBuf,
    pub output_dir: Option<PathBuf>,
}

pub fn generate_usage() -> &'static str {
    "Usage: tryon-studio generate --category <category> --model <path> --item <path> [--out <dir>]"
}

pub fn parse_category(value: &str) -> Result<Category> {
    Category::from_key(value).ok_or_else(|| {
        let keys = Category::ALL
            .iter()
            .map(|category| category.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        anyhow!("Unknown category '{value}'. Expected one of: {keys}")
    })
}

/// Parses the arguments following `generate`.
pub fn parse_generate_args(args: &[String]) -> Result<GenerateArgs> {
    let mut category = None;
    let mut model_path = None;
    let mut item_path = None;
    let mut output_dir = None;

    let mut index = 0;
    while index < args.len() {
        let flag = args[index].as_str();
        match flag {
            "--category" | "--model" | "--item" | "--out" => {
                index += 1;
                let value = args
                    .get(index)
                    .ok_or_else(|| anyhow!("Missing value for {flag}"))?;
                match flag {
                    "--category" => category = Some(parse_category(value)?),
                    "--model" => model_path = Some(PathBuf::from(value)),
                    "--item" => item_path = Some(PathBuf::from(value)),
                    _ => output_dir = Some(PathBuf::from(value)),
                }
            }
            "--help" | "-h" => {
                return Err(anyhow!(generate_usage()));
            }
            other => {
                return Err(anyhow!(
                    "Unknown generate argument: {other}\n{}",
                    generate_usage()
                ));
            }
        }
        index += 1;
    }

    Ok(GenerateArgs {
        category: category.ok_or_else(|| anyhow!("--category is required"))?,
        model_path: model_path.ok_or_else(|| anyhow!("--model is required"))?,
        item_path: item_path.ok_or_else(|| anyhow!("--item is required"))?,
        output_dir,
    })
}

pub fn categories_text() -> String {
    let mut text = String::new();
    for group in [CategoryGroup::Apparel, CategoryGroup::Accessories] {
        text.push_str(&format!("{}:\n", group.as_str()));
        for category in Category::ALL
            .into_iter()
            .filter(|category| category.group() == group)
        {
            let profile = category.profile();
            text.push_str(&format!(
                "  {:<12} {} (item: {})\n",
                category.as_str(),
                profile.title,
                profile.item_label
            ));
        }
    }
    text
}

pub fn output_stem(category: Category) -> String {
    format!(
        "tryon-{}-{}",
        category.as_str(),
        Utc::now().format("%Y%m%d-%H%M%S")
    )
}

pub async fn save_result(image: &EncodedImage, dir: &Path, category: Category) -> Result<PathBuf> {
    let path = image
        .save_to(dir, &output_stem(category))
        .await
        .map_err(|err| anyhow!("Failed to write result to {}: {err}", dir.display()))?;
    info!(path = %path.display(), bytes = image.len(), "Saved composite image");
    Ok(path)
}

/// Loads a file into a session slot, reporting rejections on the status line.
pub async fn upload_file(session: &Session, slot: ImageSlot, path: &Path) -> Result<()> {
    let candidate = load_image_file(path).await;
    session.upload(slot, candidate)?;
    Ok(())
}

/// One-shot run of the session commands: select, upload both, generate, save.
pub async fn generate_handler(
    session: &Session,
    args: GenerateArgs,
    default_out: &Path,
) -> Result<PathBuf> {
    session.select_category(args.category)?;
    upload_file(session, ImageSlot::Model, &args.model_path).await?;
    upload_file(session, ImageSlot::Item, &args.item_path).await?;

    let profile = args.category.profile();
    println!("{}", profile.title);
    println!("{}", status_report(&session.with_state(snapshot)));

    let result = match session.request_generation().await {
        Ok(result) => result,
        Err(err) => {
            error!(category = %args.category, "Generation failed: {err}");
            return Err(anyhow!(err.user_message()));
        }
    };

    let dir = args.output_dir.as_deref().unwrap_or(default_out);
    let path = save_result(&result.image, dir, args.category).await?;
    println!("{}", session.with_state(|state| state.status().message()));
    Ok(path)
}

#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub category: Category,
    pub model: Option<String>,
    pub item: Option<String>,
    pub phase: String,
    pub generate_label: &'static str,
    pub can_generate: bool,
    pub status: String,
    pub has_result: bool,
}

pub fn snapshot(state: &SessionState) -> SessionSnapshot {
    let describe = |slot: ImageSlot| {
        state
            .image(slot)
            .map(|image| format!("{} ({} bytes)", image.content_type(), image.len()))
    };
    SessionSnapshot {
        category: state.active_category(),
        model: describe(ImageSlot::Model),
        item: describe(ImageSlot::Item),
        phase: format!("{:?}", state.phase()).to_lowercase(),
        generate_label: state.generate_label(),
        can_generate: state.can_generate(),
        status: state.status().message(),
        has_result: state.result().is_some(),
    }
}

fn bool_label(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}

pub fn status_report(snapshot: &SessionSnapshot) -> String {
    let profile = snapshot.category.profile();
    let mut report = String::new();
    report.push_str(&format!(
        "category: {} ({})\n",
        snapshot.category,
        snapshot.category.group().as_str()
    ));
    report.push_str(&format!(
        "model: {}\n",
        snapshot.model.as_deref().unwrap_or("-")
    ));
    report.push_str(&format!(
        "{}: {}\n",
        profile.item_label.to_lowercase(),
        snapshot.item.as_deref().unwrap_or("-")
    ));
    report.push_str(&format!("phase: {}\n", snapshot.phase));
    report.push_str(&format!(
        "action: {} (enabled: {})\n",
        snapshot.generate_label,
        bool_label(snapshot.can_generate)
    ));
    report.push_str(&format!("result: {}", bool_label(snapshot.has_result)));
    if !snapshot.status.is_empty() {
        report.push_str(&format!("\nstatus: {}", snapshot.status));
    }
    report
}
