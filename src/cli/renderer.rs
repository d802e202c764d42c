//! Terminal renderer for conversation messages with markdown support.

use std::io::{self, Write};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use crossterm::{
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    ExecutableCommand,
};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::{as_24_bit_terminal_escaped, LinesWithEndings};

use crate::attachments::format_size;
use crate::conversation::{GeneratedImage, Message, Part, Role};

/// Severity of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// Render style configuration.
#[derive(Debug, Clone)]
pub struct RenderStyle {
    pub info_color: Color,
    pub success_color: Color,
    pub warning_color: Color,
    pub error_color: Color,
    pub user_color: Color,
    pub heading_color: Color,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            info_color: Color::White,
            success_color: Color::Green,
            warning_color: Color::Yellow,
            error_color: Color::Red,
            user_color: Color::Blue,
            heading_color: Color::Cyan,
        }
    }
}

/// Terminal renderer.
pub struct TerminalRenderer {
    style: RenderStyle,
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
    /// Columns used for horizontal rules
    width: usize,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::with_style(RenderStyle::default())
    }

    pub fn with_style(style: RenderStyle) -> Self {
        let width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);

        Self {
            style,
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
            width: width.min(80),
        }
    }

    /// Print a status line.
    pub fn render_text<W: Write>(&self, out: &mut W, level: Level, text: &str) -> io::Result<()> {
        let (color, prefix) = match level {
            Level::Info => (self.style.info_color, ""),
            Level::Success => (self.style.success_color, "✓ "),
            Level::Warning => (self.style.warning_color, "⚠ "),
            Level::Error => (self.style.error_color, "✗ "),
        };

        out.execute(SetForegroundColor(color))?
            .execute(Print(prefix))?
            .execute(Print(text))?
            .execute(Print("\n"))?
            .execute(ResetColor)?;
        Ok(())
    }

    /// Print a conversation error the way the status bar shows it.
    pub fn render_error<W: Write>(&self, out: &mut W, error: &str) -> io::Result<()> {
        self.render_text(out, Level::Error, &format!("Error: {}", error))
    }

    /// Render a whole message.
    pub fn render_message<W: Write>(&self, out: &mut W, message: &Message) -> io::Result<()> {
        if message.role == Role::User {
            out.execute(SetForegroundColor(self.style.user_color))?
                .execute(SetAttribute(Attribute::Bold))?
                .execute(Print("You: "))?
                .execute(SetAttribute(Attribute::Reset))?
                .execute(ResetColor)?;
        }

        for part in &message.parts {
            match part {
                Part::Text(text) if message.role == Role::Model => self.render_markdown(out, text)?,
                Part::Text(text) => {
                    out.execute(Print(text))?.execute(Print("\n"))?;
                }
                Part::InlineData { mime_type, data } => {
                    let size = (data.len() as u64 / 4) * 3;
                    out.execute(SetForegroundColor(Color::DarkGrey))?
                        .execute(Print(format!("[{} · {}]\n", mime_type, format_size(&size))))?
                        .execute(ResetColor)?;
                }
                Part::FileName(name) => {
                    out.execute(SetForegroundColor(Color::DarkGrey))?
                        .execute(Print(format!("📎 {}\n", name)))?
                        .execute(ResetColor)?;
                }
            }
        }
        Ok(())
    }

    /// One gallery entry: index, prompt, format and pixel size.
    pub fn render_image<W: Write>(
        &self,
        out: &mut W,
        index: usize,
        image: &GeneratedImage,
    ) -> io::Result<()> {
        let details = match image_dimensions(image) {
            Some((w, h)) => format!("{}x{} {}", w, h, image.mime_type),
            None => image.mime_type.clone(),
        };
        out.execute(SetForegroundColor(Color::Yellow))?
            .execute(Print(format!("{:>3}. ", index)))?
            .execute(ResetColor)?
            .execute(Print(&image.prompt))?
            .execute(SetForegroundColor(Color::DarkGrey))?
            .execute(Print(format!("  [{}]\n", details)))?
            .execute(ResetColor)?;
        Ok(())
    }

    /// Render markdown content.
    pub fn render_markdown<W: Write>(&self, out: &mut W, content: &str) -> io::Result<()> {
        let mut in_code_block = false;
        let mut code_lang = String::new();
        let mut code_buffer = String::new();

        for line in content.lines() {
            if let Some(rest) = line.strip_prefix("```") {
                if in_code_block {
                    self.render_code_block(out, &code_lang, &code_buffer)?;
                    code_buffer.clear();
                    code_lang.clear();
                    in_code_block = false;
                } else {
                    in_code_block = true;
                    code_lang = rest.trim().to_string();
                }
            } else if in_code_block {
                code_buffer.push_str(line);
                code_buffer.push('\n');
            } else {
                self.render_markdown_line(out, line)?;
            }
        }

        // Unclosed code block
        if in_code_block && !code_buffer.is_empty() {
            self.render_code_block(out, &code_lang, &code_buffer)?;
        }
        out.flush()
    }

    fn render_markdown_line<W: Write>(&self, out: &mut W, line: &str) -> io::Result<()> {
        for prefix in ["### ", "## ", "# "] {
            if let Some(rest) = line.strip_prefix(prefix) {
                out.execute(SetForegroundColor(self.style.heading_color))?
                    .execute(SetAttribute(Attribute::Bold))?
                    .execute(Print(rest))?
                    .execute(SetAttribute(Attribute::Reset))?
                    .execute(ResetColor)?
                    .execute(Print("\n"))?;
                return Ok(());
            }
        }

        if let Some(rest) = line.strip_prefix("- ").or_else(|| line.strip_prefix("* ")) {
            out.execute(SetForegroundColor(Color::Yellow))?
                .execute(Print("• "))?
                .execute(ResetColor)?;
            self.render_inline_markdown(out, rest)?;
            out.execute(Print("\n"))?;
            return Ok(());
        }

        let digits: String = line.chars().take_while(|c| c.is_ascii_digit()).collect();
        if !digits.is_empty() {
            if let Some(rest) = line[digits.len()..].strip_prefix(". ") {
                out.execute(SetForegroundColor(Color::Yellow))?
                    .execute(Print(format!("{}. ", digits)))?
                    .execute(ResetColor)?;
                self.render_inline_markdown(out, rest)?;
                out.execute(Print("\n"))?;
                return Ok(());
            }
        }

        if let Some(rest) = line.strip_prefix("> ") {
            out.execute(SetForegroundColor(Color::DarkGrey))?
                .execute(Print("│ "))?
                .execute(ResetColor)?;
            self.render_inline_markdown(out, rest)?;
            out.execute(Print("\n"))?;
            return Ok(());
        }

        if line == "---" || line == "***" || line == "___" {
            out.execute(SetForegroundColor(Color::DarkGrey))?
                .execute(Print("─".repeat(self.width)))?
                .execute(ResetColor)?
                .execute(Print("\n"))?;
            return Ok(());
        }

        self.render_inline_markdown(out, line)?;
        out.execute(Print("\n"))?;
        Ok(())
    }

    /// Inline markdown: bold, italic, code and links.
    fn render_inline_markdown<W: Write>(&self, out: &mut W, text: &str) -> io::Result<()> {
        let chars: Vec<char> = text.chars().collect();
        let mut buffer = String::new();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            match c {
                '`' => {
                    flush(out, &mut buffer)?;
                    let end = position_from(&chars, i + 1, '`').unwrap_or(chars.len());
                    let code: String = chars[i + 1..end].iter().collect();
                    out.execute(SetForegroundColor(Color::Magenta))?
                        .execute(Print(&code))?
                        .execute(ResetColor)?;
                    i = end + 1;
                }
                '*' | '_' => {
                    let width = if chars.get(i + 1) == Some(&c) { 2 } else { 1 };
                    let Some(end) = emphasis_end(&chars, i, width) else {
                        buffer.extend(&chars[i..i + width]);
                        i += width;
                        continue;
                    };
                    flush(out, &mut buffer)?;
                    let inner: String = chars[i + width..end].iter().collect();
                    let attribute = if width == 2 {
                        Attribute::Bold
                    } else {
                        Attribute::Italic
                    };
                    out.execute(SetAttribute(attribute))?
                        .execute(Print(&inner))?
                        .execute(SetAttribute(Attribute::Reset))?;
                    i = end + width;
                }
                '[' => {
                    let link = position_from(&chars, i + 1, ']')
                        .filter(|&close| chars.get(close + 1) == Some(&'('));
                    let Some(close) = link else {
                        buffer.push('[');
                        i += 1;
                        continue;
                    };
                    let end = position_from(&chars, close + 2, ')').unwrap_or(chars.len());
                    let link_text: String = chars[i + 1..close].iter().collect();
                    flush(out, &mut buffer)?;
                    out.execute(SetForegroundColor(Color::Blue))?
                        .execute(SetAttribute(Attribute::Underlined))?
                        .execute(Print(&link_text))?
                        .execute(SetAttribute(Attribute::Reset))?
                        .execute(ResetColor)?;
                    i = end + 1;
                }
                _ => {
                    buffer.push(c);
                    i += 1;
                }
            }
        }
        flush(out, &mut buffer)
    }

    /// Render a fenced code block with syntax highlighting.
    fn render_code_block<W: Write>(&self, out: &mut W, lang: &str, code: &str) -> io::Result<()> {
        let syntax = self
            .syntax_set
            .find_syntax_by_token(lang)
            .or_else(|| self.syntax_set.find_syntax_by_extension(lang))
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());

        let label = if lang.is_empty() { "code" } else { lang };
        out.execute(SetForegroundColor(Color::DarkGrey))?
            .execute(Print(format!("┌── {}\n", label)))?
            .execute(ResetColor)?;

        let theme = self.theme_set.themes.get("base16-ocean.dark");
        let mut highlighter = theme.map(|theme| HighlightLines::new(syntax, theme));

        for line in LinesWithEndings::from(code) {
            out.execute(SetForegroundColor(Color::DarkGrey))?
                .execute(Print("│ "))?
                .execute(ResetColor)?;

            let highlighted = highlighter
                .as_mut()
                .and_then(|h| h.highlight_line(line, &self.syntax_set).ok())
                .map(|ranges| as_24_bit_terminal_escaped(&ranges[..], false));
            match highlighted {
                Some(escaped) => write!(out, "{}", escaped)?,
                None => write!(out, "{}", line)?,
            }
        }

        out.execute(ResetColor)?
            .execute(SetForegroundColor(Color::DarkGrey))?
            .execute(Print("└──\n"))?
            .execute(ResetColor)?;
        Ok(())
    }
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn flush<W: Write>(out: &mut W, buffer: &mut String) -> io::Result<()> {
    if !buffer.is_empty() {
        out.execute(Print(buffer.as_str()))?;
        buffer.clear();
    }
    Ok(())
}

fn position_from(chars: &[char], from: usize, target: char) -> Option<usize> {
    chars
        .get(from..)?
        .iter()
        .position(|&c| c == target)
        .map(|p| p + from)
}

/// Index of the delimiter run closing the emphasis opened at `start`.
///
/// The opener must touch a word. Underscores only count at word
/// boundaries, so `snake_case` is left alone.
fn emphasis_end(chars: &[char], start: usize, width: usize) -> Option<usize> {
    let marker = chars[start];
    let is_word = |c: Option<&char>| c.is_some_and(|c| c.is_alphanumeric());

    if chars.get(start + width).map_or(true, |c| c.is_whitespace()) {
        return None;
    }
    if marker == '_' && is_word(start.checked_sub(1).and_then(|p| chars.get(p))) {
        return None;
    }

    let mut j = start + width + 1;
    while j + width <= chars.len() {
        let closes = chars[j..j + width].iter().all(|&c| c == marker)
            && !chars[j - 1].is_whitespace()
            && (marker == '*' || !is_word(chars.get(j + width)));
        if closes {
            return Some(j);
        }
        j += 1;
    }
    None
}

/// Pixel size of a generated image, if its payload decodes.
pub fn image_dimensions(image: &GeneratedImage) -> Option<(u32, u32)> {
    let bytes = STANDARD.decode(&image.data).ok()?;
    let decoded = image::load_from_memory(&bytes).ok()?;
    Some((decoded.width(), decoded.height()))
}
