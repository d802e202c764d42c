//! CLI runner for interactive and single-prompt modes.

use crate::attachments::AttachmentSource;
use crate::cli::repl::Repl;
use crate::turn::ChatController;

/// Run a single prompt and exit. Fails if the turn failed.
pub async fn run_single_prompt(
    controller: ChatController,
    prompt: &str,
    attachment: Option<AttachmentSource>,
) -> anyhow::Result<()> {
    let mut repl = Repl::new(controller).with_attachment(attachment);

    repl.handle_prompt(prompt).await?;

    if let Some(error) = repl.controller().snapshot().error.clone() {
        anyhow::bail!(error);
    }
    Ok(())
}

/// Run in interactive mode.
pub async fn run_interactive(
    controller: ChatController,
    attachment: Option<AttachmentSource>,
) -> anyhow::Result<()> {
    print_banner();

    let mut repl = Repl::new(controller).with_attachment(attachment);
    repl.run().await?;

    Ok(())
}

/// Print the welcome banner.
pub fn print_banner() {
    println!();
    println!("  \x1b[1;35m╔═╗╔╗ ╔╦╗╔═╗\x1b[0m");
    println!("  \x1b[1;35m╠═╣╠╩╗ ║║║ ║\x1b[0m");
    println!(
        "  \x1b[1;35m╩ ╩╚═╝═╩╝╚═╝\x1b[0m  \x1b[2mv{}\x1b[0m",
        get_version()
    );
    println!();
    println!("  \x1b[2m✨ Gemini chat and image generation\x1b[0m");
    println!("  \x1b[2mType \x1b[0m\x1b[1;36m/help\x1b[0m\x1b[2m for commands, or start chatting!\x1b[0m");
    println!();
}

/// Get the application version string.
pub fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Generate the banner text lines without ANSI codes (for testing).
pub fn banner_text_lines() -> Vec<&'static str> {
    vec![
        "╔═╗╔╗ ╔╦╗╔═╗",
        "╠═╣╠╩╗ ║║║ ║",
        "╩ ╩╚═╝═╩╝╚═╝",
        "Gemini chat and image generation",
        "/help",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::config::Settings;
    use crate::conversation::{GeneratedImage, Mode};
    use crate::gemini::types::GenerateContentRequest;
    use crate::gemini::{BackendError, FragmentStream, GenerativeBackend};

    struct FailingBackend;

    #[async_trait]
    impl GenerativeBackend for FailingBackend {
        async fn stream_generate(
            &self,
            _model: &str,
            _request: GenerateContentRequest,
        ) -> Result<FragmentStream, BackendError> {
            Err(BackendError::MissingApiKey)
        }

        async fn generate_image(
            &self,
            _model: &str,
            _prompt: &str,
        ) -> Result<GeneratedImage, BackendError> {
            Err(BackendError::NoImage)
        }
    }

    fn controller(mode: Mode) -> ChatController {
        let settings = Settings {
            default_mode: mode,
            ..Default::default()
        };
        ChatController::new(Arc::new(FailingBackend), &settings)
    }

    #[test]
    fn test_get_version_format() {
        let version = get_version();
        let parts: Vec<&str> = version.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor: {}", version);
        for part in &parts[..2] {
            assert!(part.parse::<u32>().is_ok(), "Version part should be numeric: {}", part);
        }
    }

    #[test]
    fn test_banner_text_contains_help_hint() {
        let lines = banner_text_lines();
        assert!(lines.iter().any(|l| l.contains("/help")));
        assert!(lines.iter().any(|l| l.contains("Gemini")));
    }

    #[test]
    fn test_banner_no_ansi_codes() {
        for line in banner_text_lines() {
            assert!(!line.contains('\x1b'), "Banner line has ANSI codes: {:?}", line);
        }
    }

    #[test]
    fn test_print_banner_no_panic() {
        print_banner();
    }

    #[tokio::test]
    async fn test_single_prompt_reports_turn_failure() {
        let err = run_single_prompt(controller(Mode::Chat), "hello", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key not set"));
    }

    #[tokio::test]
    async fn test_single_prompt_reports_image_failure() {
        let err = run_single_prompt(controller(Mode::Image), "a red fox", None)
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("Failed to generate image"));
    }

    #[tokio::test]
    async fn test_blank_single_prompt_is_a_no_op() {
        run_single_prompt(controller(Mode::Chat), "   ", None).await.unwrap();
    }
}
