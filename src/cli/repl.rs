//! Interactive REPL.

use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reedline::Signal;
use tokio::sync::{oneshot, watch};
use tracing::debug;

use super::commands::{cmd_version, show_help, Command};
use super::completion_reedline::{
    create_reedline, pick_mode, try_complete_input, with_history, AbdoCompleter, AbdoPrompt,
};
use super::renderer::{Level, TerminalRenderer};
use super::spinner::{Spinner, SpinnerHandle};
use super::stream_view::StreamView;
use crate::attachments::{encode_attachment, format_size, AttachmentSource};
use crate::config::XdgDirs;
use crate::conversation::{Mode, Snapshot};
use crate::turn::{ChatController, ImageOutcome, TurnOutcome};

pub struct Repl {
    controller: ChatController,
    renderer: Arc<TerminalRenderer>,
    spinner: Spinner,
    /// Sent with the next chat prompt
    attachment: Option<AttachmentSource>,
}

impl Repl {
    pub fn new(controller: ChatController) -> Self {
        Self {
            controller,
            renderer: Arc::new(TerminalRenderer::new()),
            spinner: Spinner::new(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: Option<AttachmentSource>) -> Self {
        self.attachment = attachment;
        self
    }

    pub fn controller(&self) -> &ChatController {
        &self.controller
    }

    pub async fn run(&mut self) -> anyhow::Result<()> {
        let dirs = XdgDirs::new();
        let mut line_editor = create_reedline(AbdoCompleter::new());
        match dirs.ensure_dirs() {
            Ok(()) => line_editor = with_history(line_editor, dirs.history_file()),
            Err(e) => debug!("Could not create state dir: {}", e),
        }

        self.render_greeting()?;

        loop {
            let prompt = AbdoPrompt::new(self.controller.mode(), self.active_model())
                .with_attachment(self.attachment.as_ref().map(|a| a.file_name.as_str()));

            match line_editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }

                    let line = match try_complete_input(line, self.controller.mode()) {
                        Some(l) => l,
                        None => continue,
                    };

                    match self.handle_input(&line).await {
                        Ok(true) => {
                            println!("👋 Bye!");
                            break;
                        }
                        Ok(false) => {}
                        Err(e) => {
                            self.renderer.render_error(&mut stdout(), &e.to_string())?;
                        }
                    }
                }
                Ok(Signal::CtrlC) => {
                    println!("^C");
                    continue;
                }
                Ok(Signal::CtrlD) => {
                    println!("👋 Bye!");
                    break;
                }
                Err(err) => {
                    self.renderer
                        .render_error(&mut stdout(), &format!("Readline error: {}", err))?;
                    break;
                }
            }
        }

        Ok(())
    }

    fn active_model(&self) -> &str {
        match self.controller.mode() {
            Mode::Image => self.controller.image_model(),
            _ => self.controller.chat_model(),
        }
    }

    /// Print the seeded greeting of the current log.
    fn render_greeting(&self) -> io::Result<()> {
        if let Some(message) = self.controller.snapshot().last() {
            self.renderer.render_message(&mut stdout(), message)?;
        }
        println!();
        Ok(())
    }

    /// Returns true when the REPL should exit.
    async fn handle_input(&mut self, input: &str) -> anyhow::Result<bool> {
        if input.starts_with('/') {
            return self.handle_command(input).await;
        }
        self.handle_prompt(input).await?;
        Ok(false)
    }

    async fn handle_command(&mut self, input: &str) -> anyhow::Result<bool> {
        let command = match Command::parse(input) {
            Ok(command) => command,
            Err(message) => {
                self.renderer.render_text(&mut stdout(), Level::Warning, &message)?;
                return Ok(false);
            }
        };

        match command {
            Command::Help => show_help(),
            Command::Exit => return Ok(true),
            Command::Clear => print!("\x1b[2J\x1b[1;1H"),
            Command::Version => cmd_version(),
            Command::New => {
                self.controller.clear();
                println!("🆕 Started new conversation");
                self.render_greeting()?;
            }
            Command::Mode(None) => {
                if let Some(mode) = pick_mode(self.controller.mode()) {
                    self.switch_mode(mode)?;
                }
            }
            Command::Mode(Some(mode)) => self.switch_mode(mode)?,
            Command::Attach(path) => self.cmd_attach(&path).await?,
            Command::Detach => match self.attachment.take() {
                Some(a) => println!("Removed attachment {}", a.file_name),
                None => println!("No attachment"),
            },
            Command::Images => self.cmd_images()?,
            Command::Save { index, path } => self.cmd_save(index, &path)?,
        }
        Ok(false)
    }

    fn switch_mode(&mut self, mode: Mode) -> io::Result<()> {
        if !self.controller.switch_mode(mode) {
            println!("Already in {} mode", mode.display_name());
            return Ok(());
        }
        self.renderer.render_text(
            &mut stdout(),
            Level::Success,
            &format!("Switched to {} mode", mode.display_name()),
        )?;
        self.render_greeting()
    }

    async fn cmd_attach(&mut self, path: &str) -> io::Result<()> {
        let path = PathBuf::from(shellexpand::tilde(path).into_owned());
        let checked = match AttachmentSource::from_path(&path) {
            Ok(source) => encode_attachment(&source).await.map(|_| source),
            Err(e) => Err(e),
        };

        match checked {
            Ok(source) => {
                self.renderer.render_text(
                    &mut stdout(),
                    Level::Success,
                    &format!("Attached {} ({})", source.file_name, format_size(&source.size)),
                )?;
                if self.controller.mode() == Mode::Image {
                    self.renderer.render_text(
                        &mut stdout(),
                        Level::Warning,
                        "Attachments are only sent in chat and code modes",
                    )?;
                }
                self.attachment = Some(source);
            }
            Err(e) => self.renderer.render_error(&mut stdout(), &e.to_string())?,
        }
        Ok(())
    }

    fn cmd_images(&self) -> io::Result<()> {
        let gallery = self.controller.gallery();
        if gallery.is_empty() {
            println!("No images yet. Switch to /image and describe one.");
            return Ok(());
        }
        println!("\n🖼  \x1b[1mGenerated Images:\x1b[0m\n");
        for (i, image) in gallery.images().iter().enumerate() {
            self.renderer.render_image(&mut stdout(), i + 1, image)?;
        }
        println!();
        Ok(())
    }

    fn cmd_save(&self, index: usize, path: &str) -> anyhow::Result<()> {
        let gallery = self.controller.gallery();
        let image = gallery
            .images()
            .get(index - 1)
            .with_context(|| format!("No image #{} (gallery has {})", index, gallery.len()))?;

        let bytes = STANDARD
            .decode(&image.data)
            .context("Image payload is not valid base64")?;
        let path = PathBuf::from(shellexpand::tilde(path).into_owned());
        std::fs::write(&path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;

        self.renderer.render_text(
            &mut stdout(),
            Level::Success,
            &format!("Saved image #{} to {}", index, path.display()),
        )?;
        Ok(())
    }

    /// Send a prompt in the current mode and render the result.
    ///
    /// Failures are rendered here and stay in the conversation state's
    /// `error` field.
    pub async fn handle_prompt(&mut self, prompt: &str) -> anyhow::Result<()> {
        if self.controller.mode() == Mode::Image {
            return self.handle_image_prompt(prompt).await;
        }

        let base_len = self.controller.snapshot().len();
        let spinner = self.spinner.start("Thinking...");
        let (done_tx, done_rx) = oneshot::channel();
        let render = tokio::spawn(render_stream(
            self.controller.subscribe(),
            base_len,
            Arc::clone(&self.renderer),
            spinner,
            done_rx,
        ));

        let outcome = self
            .controller
            .submit(prompt, self.attachment.as_ref())
            .await;
        let _ = done_tx.send(());
        render.await.context("Render task panicked")??;

        match outcome {
            TurnOutcome::Ignored => debug!("Prompt ignored"),
            TurnOutcome::Completed => self.attachment = None,
            TurnOutcome::Failed(message) => {
                self.attachment = None;
                self.renderer.render_error(&mut stdout(), &message)?;
                show_error_hints(&message);
            }
        }
        Ok(())
    }

    async fn handle_image_prompt(&mut self, prompt: &str) -> anyhow::Result<()> {
        let spinner = self.spinner.start("Generating image...");
        let outcome = self.controller.generate_image(prompt).await;
        spinner.stop().await;

        match outcome {
            ImageOutcome::Ignored => debug!("Image prompt ignored"),
            ImageOutcome::Generated => {
                if let Some(image) = self.controller.gallery().latest() {
                    self.renderer.render_image(&mut stdout(), 1, image)?;
                }
                println!("\x1b[2mSave it with /save <path>\x1b[0m");
            }
            ImageOutcome::Failed(message) => {
                self.renderer.render_error(&mut stdout(), &message)?;
                show_error_hints(&message);
            }
        }
        Ok(())
    }
}

/// Follow the store while a turn runs, rendering the in-flight message as
/// markdown block by block. The spinner runs until the first block shows up.
async fn render_stream(
    mut rx: watch::Receiver<Snapshot>,
    base_len: usize,
    renderer: Arc<TerminalRenderer>,
    spinner: SpinnerHandle,
    mut done: oneshot::Receiver<()>,
) -> io::Result<()> {
    let mut view = StreamView::new(base_len);
    let mut spinner = Some(spinner);

    loop {
        let finished = tokio::select! {
            changed = rx.changed() => changed.is_err(),
            _ = &mut done => true,
        };

        let snapshot = rx.borrow_and_update().clone();
        if let Some(user) = view.user_echo(&snapshot) {
            if let Some(handle) = spinner.take() {
                handle.stop().await;
            }
            renderer.render_message(&mut stdout(), user)?;
            spinner = Some(Spinner::new().start("Thinking..."));
        }

        let ready = view.advance(&snapshot);
        if !ready.is_empty() {
            if let Some(handle) = spinner.take() {
                handle.stop().await;
            }
            for block in &ready {
                renderer.render_markdown(&mut stdout(), block)?;
            }
        }

        if finished {
            break;
        }
    }

    if let Some(handle) = spinner.take() {
        handle.stop().await;
    }
    if let Some(tail) = view.finish() {
        renderer.render_markdown(&mut stdout(), &tail)?;
    }
    stdout().flush()
}

fn show_error_hints(error: &str) {
    if error.contains("API key") {
        println!("\x1b[2mHint: Set GEMINI_API_KEY or pass --api-key\x1b[0m");
    } else if error.contains("404") || error.contains("model") {
        println!("\x1b[2mHint: Check the model name with --model / --image-model\x1b[0m");
    }
}
