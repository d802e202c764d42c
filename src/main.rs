//! Abdo AI - Gemini chat and image generation in the terminal

use std::sync::Arc;

use abdo_ai::attachments::AttachmentSource;
use abdo_ai::cli;
use abdo_ai::config::Settings;
use abdo_ai::conversation::Mode;
use abdo_ai::gemini::GeminiClient;
use abdo_ai::turn::ChatController;
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Abdo AI - chat, code and image generation with Gemini ✨
#[derive(Parser, Debug)]
#[command(name = "abdo")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// Mode to start in (chat, code, image)
    #[arg(long)]
    mode: Option<Mode>,

    /// Execute a single prompt and exit
    #[arg(short, long)]
    prompt: Option<String>,

    /// Attach a file (image or text) to the first prompt
    #[arg(short, long, value_name = "FILE")]
    attach: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Chat model to use
    #[arg(short, long)]
    model: Option<String>,

    /// Image model to use
    #[arg(long)]
    image_model: Option<String>,

    /// Enable debug logging (equivalent to RUST_LOG=debug)
    #[arg(short = 'd', long)]
    debug: bool,

    /// Enable verbose logging (equivalent to RUST_LOG=trace)
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let default_filter = if args.verbose {
            "trace"
        } else if args.debug {
            "debug"
        } else {
            "warn"
        };

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();

        if args.debug || args.verbose {
            tracing::info!("Debug logging enabled");
        }

        let settings = load_settings(&args);
        let client = GeminiClient::new(settings.usable_api_key()).with_base_url(&settings.base_url);
        let controller = ChatController::new(Arc::new(client), &settings);

        let attachment = match &args.attach {
            Some(path) => {
                let path = shellexpand::tilde(path);
                Some(
                    AttachmentSource::from_path(path.to_string())
                        .with_context(|| format!("Cannot attach {}", path))?,
                )
            }
            None => None,
        };

        if let Some(prompt) = &args.prompt {
            cli::run_single_prompt(controller, prompt, attachment).await?;
        } else {
            cli::run_interactive(controller, attachment).await?;
        }

        Ok(())
    })
}

/// Settings file, then environment, then flags.
fn load_settings(args: &Args) -> Settings {
    let mut settings = Settings::load_default().unwrap_or_else(|e| {
        tracing::warn!("Ignoring settings file: {}", e);
        let mut settings = Settings::default();
        settings.apply_env(|key| std::env::var(key).ok());
        settings
    });

    if let Some(key) = &args.api_key {
        settings.api_key = Some(key.clone());
    }
    if let Some(model) = &args.model {
        settings.model = model.clone();
    }
    if let Some(model) = &args.image_model {
        settings.image_model = model.clone();
    }
    if let Some(mode) = args.mode {
        settings.default_mode = mode;
    }
    settings
}
