use std::path::{Path, PathBuf};

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::catalogue::Category;
use crate::handlers::commands::{
    categories_text, parse_category, save_result, snapshot, status_report, upload_file,
};
use crate::state::{ImageSlot, Session, SessionState};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Category(Category),
    Upload(ImageSlot, PathBuf),
    Remove(ImageSlot),
    Generate,
    Save(Option<PathBuf>),
    DataUrl,
    Status,
    Categories,
    Help,
    Quit,
}

const SESSION_HELP: &str = "\
Commands:
  category <name>     switch category (clears both images)
  model <path>        upload the model photo
  item <path>         upload the item photo
  remove model|item   clear one image
  generate            run the try-on in the background
  save [dir]          write the last result to disk
  url                 print the last result as a data URL
  status              show the session state
  categories          list categories
  help                show this help
  quit                leave the session";

fn parse_slot(value: &str) -> Result<ImageSlot, String> {
    match value.trim().to_lowercase().as_str() {
        "model" => Ok(ImageSlot::Model),
        "item" => Ok(ImageSlot::Item),
        other => Err(format!("Expected 'model' or 'item', got '{other}'")),
    }
}

/// Parses one REPL line. Blank lines yield `None`.
pub fn parse_repl_line(line: &str) -> Result<Option<ReplCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let require = |what: &str| {
        if rest.is_empty() {
            Err(format!("'{verb}' needs {what}"))
        } else {
            Ok(rest)
        }
    };

    let command = match verb.to_lowercase().as_str() {
        "category" | "cat" => {
            let value = require("a category name")?;
            ReplCommand::Category(parse_category(value).map_err(|err| err.to_string())?)
        }
        "model" => ReplCommand::Upload(ImageSlot::Model, PathBuf::from(require("a file path")?)),
        "item" => ReplCommand::Upload(ImageSlot::Item, PathBuf::from(require("a file path")?)),
        "remove" | "rm" => ReplCommand::Remove(parse_slot(require("'model' or 'item'")?)?),
        "generate" | "gen" => ReplCommand::Generate,
        "save" => ReplCommand::Save((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "url" => ReplCommand::DataUrl,
        "status" => ReplCommand::Status,
        "categories" => ReplCommand::Categories,
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(format!("Unknown command '{other}'. Type 'help'.")),
    };
    Ok(Some(command))
}

/// Runs the generation in the background so the prompt stays responsive.
/// The session's busy guard rejects a second `generate` while this one runs.
fn spawn_generation(session: &Session) {
    let session = session.clone();
    tokio::spawn(async move {
        match session.request_generation().await {
            Ok(result) => println!(
                "{} ({}, {} bytes). Use 'save' to write it.",
                session.with_state(|state| state.status().message()),
                result.image.content_type(),
                result.image.len()
            ),
            Err(err) => {
                if err.is_generation_failure() {
                    error!("Generation failed: {err}");
                }
                println!("{}", err.user_message());
            }
        }
    });
}

fn result_data_url(state: &SessionState) -> Option<String> {
    state.result().map(|image| image.to_data_url())
}

async fn dispatch(session: &Session, command: ReplCommand, output_dir: &Path) -> bool {
    match command {
        ReplCommand::Category(category) => match session.select_category(category) {
            Ok(()) => {
                let profile = category.profile();
                println!("{}\n{}", profile.title, profile.description);
            }
            Err(err) => println!("{}", err.user_message()),
        },
        ReplCommand::Upload(slot, path) => match upload_file(session, slot, &path).await {
            Ok(()) => println!("{} image set from {}", slot.as_str(), path.display()),
            Err(err) => println!("{err}"),
        },
        ReplCommand::Remove(slot) => match session.set_image(slot, None) {
            Ok(()) => println!("{} image removed", slot.as_str()),
            Err(err) => println!("{}", err.user_message()),
        },
        ReplCommand::Generate => spawn_generation(session),
        ReplCommand::Save(dir) => {
            let current = session.with_state(|state| {
                state
                    .result()
                    .cloned()
                    .map(|image| (image, state.active_category()))
            });
            match current {
                Some((image, category)) => {
                    let dir = dir.unwrap_or_else(|| output_dir.to_path_buf());
                    match save_result(&image, &dir, category).await {
                        Ok(path) => println!("saved {}", path.display()),
                        Err(err) => {
                            error!("Save failed: {err:#}");
                            println!("{err}");
                        }
                    }
                }
                None => println!("No result to save yet."),
            }
        }
        ReplCommand::DataUrl => match session.with_state(result_data_url) {
            Some(url) => println!("{url}"),
            None => println!("No result to show yet."),
        },
        ReplCommand::Status => println!("{}", status_report(&session.with_state(snapshot))),
        ReplCommand::Categories => print!("{}", categories_text()),
        ReplCommand::Help => println!("{SESSION_HELP}"),
        ReplCommand::Quit => return false,
    }
    true
}

/// Line-oriented driver for a [`Session`] on stdin.
pub async fn run_session_repl(session: Session, output_dir: PathBuf) -> Result<()> {
    info!("Starting interactive try-on session");
    let category = session.with_state(|state| state.active_category());
    println!("{}\n{SESSION_HELP}", category.profile().title);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_repl_line(&line) {
            Ok(Some(command)) => {
                if !dispatch(&session, command, &output_dir).await {
                    break;
                }
            }
            Ok(None) => {}
            Err(message) => println!("{message}"),
        }
    }

    if session.with_state(|state| state.is_busy()) {
        println!("Leaving while a generation is still running; its result is discarded.");
    }
    Ok(())
}
