use std::error::Error;
use std::sync::Arc;

use anyhow::anyhow;
use dotenvy::dotenv;
use tracing::{error, info};

mod catalogue;
mod config;
mod error;
mod handlers;
mod llm;
mod orchestrator;
mod state;
mod utils;

use catalogue::Category;
use config::CONFIG;
use handlers::commands::{
    categories_text, generate_handler, parse_category, parse_generate_args, GenerateArgs,
};
use handlers::session::run_session_repl;
use llm::gemini::GeminiSettings;
use llm::GeminiClient;
use orchestrator::Orchestrator;
use state::Session;
use utils::logging::init_logging;

type MainResult = Result<(), Box<dyn Error + Send + Sync>>;

#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Categories,
    Help,
    Run(RunMode),
}

#[derive(Debug, PartialEq, Eq)]
enum RunMode {
    Generate(GenerateArgs),
    Session(Category),
}

fn usage() -> &'static str {
    "Usage:
  tryon-studio categories
  tryon-studio generate --category <category> --model <path> --item <path> [--out <dir>]
  tryon-studio session [--category <category>]"
}

fn parse_invocation(args: &[String]) -> anyhow::Result<Invocation> {
    let rest = args.get(2..).unwrap_or_default();
    match args.get(1).map(|value| value.as_str()) {
        Some("categories") => Ok(Invocation::Categories),
        Some("generate") => {
            let args = parse_generate_args(rest)?;
            Ok(Invocation::Run(RunMode::Generate(args)))
        }
        Some("session") => {
            let category = match rest {
                [] => Category::default(),
                [flag, value] if flag == "--category" => parse_category(value)?,
                _ => return Err(anyhow!("Unknown session arguments\n{}", usage())),
            };
            Ok(Invocation::Run(RunMode::Session(category)))
        }
        None | Some("help") | Some("--help") | Some("-h") => Ok(Invocation::Help),
        Some(other) => Err(anyhow!("Unknown command: {other}\n{}", usage())),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> MainResult {
    dotenv().ok();
    let _guards = init_logging();

    let args: Vec<String> = std::env::args().collect();
    let mode = match parse_invocation(&args)? {
        Invocation::Categories => {
            print!("{}", categories_text());
            return Ok(());
        }
        Invocation::Help => {
            println!("{}", usage());
            return Ok(());
        }
        Invocation::Run(mode) => mode,
    };

    if CONFIG.gemini_api_key.trim().is_empty() {
        return Err("GEMINI_API_KEY (or API_KEY) is required to generate images".into());
    }

    let client = GeminiClient::new(GeminiSettings::from_config(&CONFIG));
    info!(
        analysis_model = client.analysis_model(),
        image_model = client.image_model(),
        "Starting tryon-studio"
    );
    let orchestrator = Orchestrator::new(Arc::new(client));

    match mode {
        RunMode::Generate(args) => {
            let session = Session::new(orchestrator, args.category);
            match generate_handler(&session, args, &CONFIG.output_dir).await {
                Ok(path) => println!("Saved {}", path.display()),
                Err(err) => {
                    error!("generate failed: {err:#}");
                    return Err(err.into());
                }
            }
        }
        RunMode::Session(category) => {
            let session = Session::new(orchestrator, category);
            run_session_repl(session, CONFIG.output_dir.clone()).await?;
        }
    }

    Ok(())
}
