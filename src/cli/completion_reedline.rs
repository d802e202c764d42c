//! Reedline completion with Tab-triggered menu.
//!
//! Type "/" then Tab to see commands. Menu filters as you type.

use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, Emacs, FileBackedHistory, Highlighter, KeyCode, KeyModifiers,
    MenuBuilder, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    Reedline, ReedlineEvent, ReedlineMenu, Span, StyledText, Suggestion,
};
use std::borrow::Cow;
use std::path::PathBuf;

use crate::conversation::Mode;

/// All slash commands with descriptions
pub const COMMANDS: &[(&str, &str)] = &[
    ("/?", "Show help"),
    ("/attach", "Attach a file to the next prompt"),
    ("/chat", "Switch to chat mode"),
    ("/clear", "Clear screen"),
    ("/cls", "Clear screen"),
    ("/code", "Switch to code mode"),
    ("/detach", "Drop the pending attachment"),
    ("/exit", "Exit"),
    ("/h", "Show help"),
    ("/help", "Show help"),
    ("/image", "Switch to image mode"),
    ("/images", "List generated images"),
    ("/mode", "Select mode"),
    ("/new", "New conversation"),
    ("/q", "Exit"),
    ("/quit", "Exit"),
    ("/save", "Save a generated image"),
    ("/v", "Version info"),
    ("/version", "Version info"),
];

/// Number of history entries kept on disk.
pub const HISTORY_SIZE: usize = 500;

/// Completer for slash commands and their arguments
#[derive(Clone, Default)]
pub struct AbdoCompleter;

impl AbdoCompleter {
    pub fn new() -> Self {
        Self
    }
}

fn suggestion(value: &str, description: Option<&str>, span: Span, append_whitespace: bool) -> Suggestion {
    Suggestion {
        value: value.to_string(),
        description: description.map(str::to_string),
        extra: None,
        span,
        append_whitespace,
        style: None,
    }
}

impl Completer for AbdoCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if pos > line.len() {
            return Vec::new();
        }

        let input = &line[..pos];

        if input.is_empty() || !input.starts_with('/') {
            return Vec::new();
        }

        // Command completion (no space yet)
        if !input.contains(' ') {
            let prefix = input.to_lowercase();
            return COMMANDS
                .iter()
                .filter(|(cmd, _)| cmd.starts_with(&prefix))
                .take(10)
                .map(|(cmd, desc)| suggestion(cmd, Some(desc), Span::new(0, pos), true))
                .collect();
        }

        // Mode completion: /mode xxx
        if let Some(rest) = input.strip_prefix("/mode ") {
            let prefix = rest.trim_start().to_lowercase();
            let start = pos - rest.trim_start().len();
            return Mode::all()
                .iter()
                .filter(|m| m.as_str().starts_with(&prefix))
                .map(|m| suggestion(m.as_str(), Some(m.display_name()), Span::new(start, pos), false))
                .collect();
        }

        Vec::new()
    }
}

/// Prompt showing the current mode, model and pending attachment
pub struct AbdoPrompt {
    pub mode: Mode,
    pub model_name: String,
    pub attachment: Option<String>,
}

impl AbdoPrompt {
    pub fn new(mode: Mode, model: &str) -> Self {
        Self {
            mode,
            model_name: model.to_string(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, file_name: Option<&str>) -> Self {
        self.attachment = file_name.map(str::to_string);
        self
    }
}

impl Prompt for AbdoPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let attachment = match &self.attachment {
            Some(name) => format!(" \x1b[35m[📎 {}]\x1b[0m", name),
            None => String::new(),
        };
        Cow::Owned(format!(
            "\x1b[1;33m{}\x1b[0m \x1b[2m[{}]\x1b[0m{}",
            self.mode.display_name(),
            self.model_name,
            attachment
        ))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed(" › ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(&self, hs: PromptHistorySearch) -> Cow<'_, str> {
        let prefix = match hs.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!("({}search: {}) ", prefix, hs.term))
    }
}

/// Command highlighter
#[derive(Clone)]
pub struct AbdoHighlighter;

impl Highlighter for AbdoHighlighter {
    fn highlight(&self, line: &str, _cursor: usize) -> StyledText {
        let mut styled = StyledText::new();

        if line.starts_with('/') {
            let cmd_end = line.find(' ').unwrap_or(line.len());
            let cmd = &line[..cmd_end];

            if is_complete_command(cmd) {
                styled.push((Style::new().fg(Color::Cyan).bold(), cmd.to_string()));
            } else {
                styled.push((Style::new().fg(Color::Yellow), cmd.to_string()));
            }

            if cmd_end < line.len() {
                styled.push((Style::default(), line[cmd_end..].to_string()));
            }
        } else {
            styled.push((Style::default(), line.to_string()));
        }

        styled
    }
}

/// Create reedline with Tab-triggered completion menu
pub fn create_reedline(completer: AbdoCompleter) -> Reedline {
    let completion_menu = Box::new(
        ColumnarMenu::default()
            .with_name("completion_menu")
            .with_columns(1)
            .with_column_padding(2)
            .with_text_style(Style::new().fg(Color::Default))
            .with_selected_text_style(Style::new().fg(Color::Black).on(Color::Cyan))
            .with_description_text_style(Style::new().fg(Color::DarkGray)),
    );

    let mut keybindings = reedline::default_emacs_keybindings();

    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::UntilFound(vec![
            ReedlineEvent::Menu("completion_menu".to_string()),
            ReedlineEvent::MenuNext,
        ]),
    );

    keybindings.add_binding(
        KeyModifiers::SHIFT,
        KeyCode::BackTab,
        ReedlineEvent::MenuPrevious,
    );

    Reedline::create()
        .with_completer(Box::new(completer))
        .with_menu(ReedlineMenu::EngineCompleter(completion_menu))
        .with_quick_completions(true)
        .with_partial_completions(true)
        .with_highlighter(Box::new(AbdoHighlighter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)))
}

/// Attach a file-backed history, if the file can be opened.
pub fn with_history(line_editor: Reedline, path: PathBuf) -> Reedline {
    match FileBackedHistory::with_file(HISTORY_SIZE, path) {
        Ok(history) => line_editor.with_history(Box::new(history)),
        Err(e) => {
            tracing::debug!("History unavailable: {}", e);
            line_editor
        }
    }
}

// ============================================================================
// Dialoguer-based pickers
// ============================================================================

/// Show command picker using dialoguer FuzzySelect
pub fn pick_command(prefix: &str) -> Option<String> {
    use dialoguer::{theme::ColorfulTheme, FuzzySelect};

    let filtered: Vec<(&str, &str)> = COMMANDS
        .iter()
        .filter(|(cmd, _)| prefix.is_empty() || cmd.contains(&prefix.to_lowercase()))
        .copied()
        .collect();

    if filtered.is_empty() {
        return None;
    }

    let items: Vec<String> = filtered
        .iter()
        .map(|(cmd, desc)| format!("{:<15} {}", cmd, desc))
        .collect();

    FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Command")
        .items(&items)
        .default(0)
        .max_length(8)
        .interact_opt()
        .ok()
        .flatten()
        .map(|idx| filtered[idx].0.to_string())
}

/// Show mode picker, starting on the current mode
pub fn pick_mode(current: Mode) -> Option<Mode> {
    use dialoguer::{theme::ColorfulTheme, FuzzySelect};

    let modes = Mode::all();
    let items: Vec<&str> = modes.iter().map(|m| m.display_name()).collect();
    let default = modes.iter().position(|m| *m == current).unwrap_or(0);

    FuzzySelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Mode")
        .items(&items)
        .default(default)
        .interact_opt()
        .ok()
        .flatten()
        .map(|idx| modes[idx])
}

/// Check if a command is complete (exact match)
pub fn is_complete_command(input: &str) -> bool {
    COMMANDS.iter().any(|(cmd, _)| *cmd == input)
}

/// Try to complete partial input. Returns None if user cancelled picker.
pub fn try_complete_input(input: &str, current_mode: Mode) -> Option<String> {
    let trimmed = input.trim();

    if !trimmed.starts_with('/') {
        return Some(trimmed.to_string());
    }

    if trimmed == "/" {
        return pick_command("");
    }

    if trimmed == "/mode" {
        return pick_mode(current_mode).map(|m| format!("/mode {}", m));
    }

    // Unknown partial command with a unique completion
    let cmd = trimmed.split_whitespace().next().unwrap_or(trimmed);
    if !is_complete_command(cmd) {
        let matches: Vec<&str> = COMMANDS
            .iter()
            .map(|(c, _)| *c)
            .filter(|c| c.starts_with(cmd))
            .collect();
        if matches.len() == 1 {
            return Some(trimmed.replacen(cmd, matches[0], 1));
        }
    }

    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(suggestions: Vec<Suggestion>) -> Vec<String> {
        suggestions.into_iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_completes_commands_by_prefix() {
        let mut completer = AbdoCompleter::new();
        let got = values(completer.complete("/im", 3));
        assert_eq!(got, vec!["/image", "/images"]);
    }

    #[test]
    fn test_plain_text_has_no_completions() {
        let mut completer = AbdoCompleter::new();
        assert!(completer.complete("hello", 5).is_empty());
        assert!(completer.complete("", 0).is_empty());
    }

    #[test]
    fn test_completes_mode_argument() {
        let mut completer = AbdoCompleter::new();
        let got = completer.complete("/mode c", 7);
        assert_eq!(
            got.iter().map(|s| s.value.as_str()).collect::<Vec<_>>(),
            vec!["chat", "code"]
        );
        assert_eq!(got[0].span, Span::new(6, 7));

        let all = values(completer.complete("/mode ", 6));
        assert_eq!(all, vec!["chat", "code", "image"]);
    }

    #[test]
    fn test_cursor_past_end_is_ignored() {
        let mut completer = AbdoCompleter::new();
        assert!(completer.complete("/h", 10).is_empty());
    }

    #[test]
    fn test_is_complete_command() {
        assert!(is_complete_command("/help"));
        assert!(is_complete_command("/save"));
        assert!(!is_complete_command("/hel"));
        assert!(!is_complete_command("/model"));
    }

    #[test]
    fn test_every_listed_command_parses() {
        use crate::cli::commands::Command;

        for (cmd, _) in COMMANDS {
            let line = match *cmd {
                "/attach" => "/attach notes.txt".to_string(),
                "/save" => "/save fox.png".to_string(),
                other => other.to_string(),
            };
            assert!(Command::parse(&line).is_ok(), "{} is listed but not accepted", cmd);
        }
        for alias in ["/cls", "/?", "/q", "/v", "/h"] {
            assert!(is_complete_command(alias), "{} should be highlighted as known", alias);
        }
    }

    #[test]
    fn test_try_complete_input() {
        assert_eq!(try_complete_input("  hi there ", Mode::Chat).as_deref(), Some("hi there"));
        assert_eq!(try_complete_input("/det", Mode::Chat).as_deref(), Some("/detach"));
        assert_eq!(
            try_complete_input("/att notes.txt", Mode::Chat).as_deref(),
            Some("/attach notes.txt")
        );
        // Ambiguous prefixes are left for the command parser
        assert_eq!(try_complete_input("/c", Mode::Chat).as_deref(), Some("/c"));
        assert_eq!(try_complete_input("/mode code", Mode::Chat).as_deref(), Some("/mode code"));
    }

    #[test]
    fn test_prompt_shows_mode_model_and_attachment() {
        let prompt = AbdoPrompt::new(Mode::Code, "gemini-2.5-flash").with_attachment(Some("a.rs"));
        let left = prompt.render_prompt_left();
        assert!(left.contains("Code"));
        assert!(left.contains("gemini-2.5-flash"));
        assert!(left.contains("📎 a.rs"));

        let bare = AbdoPrompt::new(Mode::Chat, "m");
        assert!(!bare.render_prompt_left().contains("📎"));
    }

    #[test]
    fn test_highlighter_marks_known_commands() {
        let styled = AbdoHighlighter.highlight("/attach file.txt", 0);
        assert_eq!(styled.buffer.len(), 2);
        assert_eq!(styled.buffer[0].0, Style::new().fg(Color::Cyan).bold());
        assert_eq!(styled.buffer[1].1, " file.txt");

        let unknown = AbdoHighlighter.highlight("/nope", 0);
        assert_eq!(unknown.buffer[0].0, Style::new().fg(Color::Yellow));
    }
}
