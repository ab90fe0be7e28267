//! Terminal rendering of assistant responses.
//!
//! Rendering runs in two phases. The raw response is first cleaned up and
//! sliced into [`ContentBlock`]s so that fenced code is never touched by the
//! Markdown rewrites; each block is then rendered on its own. The whole
//! operation is pure and infallible: anything the formatter does not recognise
//! is passed through as plain text.

use crate::formatter_config::{FormatterConfig, Preset};
use crate::layout::{self, visible_width};
use crate::patterns::{
    BLOCK_QUOTE, BOLD, EXCESS_NEWLINES, FENCED_BLOCK, HEADING, INLINE_CODE, ITALIC, LINK,
    LIST_ITEM, STRAY_STRUCTURED_TAG, STRUCTURED_BLOCK, TABLE_ROW,
};
use owo_colors::{OwoColorize, Style};
use regex::Captures;

const TITLE: &str = "AI Assistant Response";

/// A slice of the response: prose or the body of a fenced code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Text { content: String },
    Code { content: String, language: String },
}

/// Removes every `<structured_commands>` payload and any unpaired tag.
pub fn strip_structured_commands(text: &str) -> String {
    let stripped = STRUCTURED_BLOCK.replace_all(text, "");
    STRAY_STRUCTURED_TAG.replace_all(&stripped, "").into_owned()
}

/// Converts CRLF to LF, collapses three or more line feeds to two and trims
/// the result. Applying it twice is the same as applying it once.
pub fn normalize_whitespace(text: &str) -> String {
    let unix = text.replace("\r\n", "\n");
    EXCESS_NEWLINES
        .replace_all(&unix, "\n\n")
        .trim()
        .to_string()
}

/// Splits text into prose and fenced code blocks, in source order.
///
/// A fence that is never closed is left in the surrounding prose.
pub fn slice_blocks(text: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for caps in FENCED_BLOCK.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        push_text_block(&mut blocks, &text[cursor..whole.start()]);
        blocks.push(ContentBlock::Code {
            content: caps.get(2).map_or("", |m| m.as_str()).to_string(),
            language: caps.get(1).map_or("", |m| m.as_str()).to_string(),
        });
        cursor = whole.end();
    }
    push_text_block(&mut blocks, &text[cursor..]);

    blocks
}

fn push_text_block(blocks: &mut Vec<ContentBlock>, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    blocks.push(ContentBlock::Text {
        content: text.trim_matches('\n').to_string(),
    });
}

fn heading_style(level: usize) -> Style {
    match level {
        1 => Style::new().yellow().bold().underline(),
        2 => Style::new().yellow().bold(),
        _ => Style::new().yellow(),
    }
}

fn quote_style() -> Style {
    Style::new().blue().italic()
}

fn code_style() -> Style {
    Style::new().cyan()
}

fn comment_style() -> Style {
    Style::new().bright_black()
}

/// Renders assistant responses for the terminal according to a
/// [`FormatterConfig`].
///
/// # Example
///
/// ```
/// use how::formatter::ResponseFormatter;
/// use how::formatter_config::Preset;
///
/// let formatter = ResponseFormatter::with_preset(Preset::Default);
/// let output = formatter.format("## Disk usage\nRun `df -h`.");
/// assert!(output.contains("# == DISK USAGE"));
/// ```
#[derive(Debug, Clone)]
pub struct ResponseFormatter {
    config: FormatterConfig,
}

impl Default for ResponseFormatter {
    fn default() -> Self {
        Self::new(FormatterConfig::default())
    }
}

impl ResponseFormatter {
    pub fn new(config: FormatterConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    pub fn with_preset(preset: Preset) -> Self {
        Self::new(preset.config())
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }

    /// Formats `raw` into a string ready to be written to stdout.
    pub fn format(&self, raw: &str) -> String {
        let mut text = strip_structured_commands(raw);
        if !self.config.use_colors {
            text.retain(|c| c != '\x1b');
        }
        let text = normalize_whitespace(&text);
        let blocks = slice_blocks(&text);

        let mut out = Vec::new();
        if self.config.use_boxes {
            self.render_header(&mut out);
        }

        let last = blocks.len().saturating_sub(1);
        for (index, block) in blocks.iter().enumerate() {
            match block {
                ContentBlock::Text { content } => {
                    self.render_text(content, &mut out);
                    if index < last {
                        self.push_blank(&mut out);
                    }
                }
                ContentBlock::Code { content, language } => {
                    self.render_code(content, language, &mut out);
                }
            }
        }

        let mut rendered = String::with_capacity(out.iter().map(|l| l.len() + 1).sum());
        for line in out {
            rendered.push_str(&line);
            rendered.push('\n');
        }
        rendered
    }

    /// Adds an inter-block blank line unless compact or one is already there.
    fn push_blank(&self, out: &mut Vec<String>) {
        if !self.config.compact_mode && out.last().is_some_and(|line| !line.is_empty()) {
            out.push(String::new());
        }
    }

    fn render_header(&self, out: &mut Vec<String>) {
        let prefix = &self.config.comment_prefix;
        let border_len = self
            .config
            .line_width
            .saturating_sub(prefix.chars().count());

        let (border_char, title) = if self.config.use_colors {
            ("═", TITLE.to_string())
        } else {
            ("=", TITLE.to_uppercase())
        };
        let border = border_char.repeat(border_len);
        let padding = " ".repeat(border_len.saturating_sub(title.chars().count()) / 2);

        if self.config.use_colors {
            let border = border.cyan().to_string();
            out.push(format!("{}{}", prefix, border));
            out.push(format!("{}{}{}", prefix, padding, title.bold().cyan()));
            out.push(format!("{}{}", prefix, border));
        } else {
            out.push(format!("{}{}", prefix, border));
            out.push(format!("{}{}{}", prefix, padding, title));
            out.push(format!("{}{}", prefix, border));
        }
        out.push(String::new());
    }

    fn render_text(&self, content: &str, out: &mut Vec<String>) {
        let lines: Vec<&str> = content.split('\n').map(str::trim_end).collect();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if line.is_empty() {
                if !self.config.compact_mode {
                    out.push(String::new());
                }
                i += 1;
                continue;
            }

            if self.config.render_tables && TABLE_ROW.is_match(line.trim()) {
                let start = i;
                while i < lines.len() {
                    let row = lines[i].trim();
                    if row.is_empty() || !TABLE_ROW.is_match(row) {
                        break;
                    }
                    i += 1;
                }
                out.extend(layout::render_table(
                    &lines[start..i],
                    &self.config.comment_prefix,
                    self.config.use_colors,
                ));
                if !self.config.compact_mode {
                    out.push(String::new());
                }
                continue;
            }

            let rendered = self.render_line(line);
            self.emit(&rendered, out);
            i += 1;
        }
    }

    /// Applies the first matching line rule: heading, quote, list item, or
    /// plain inline rewriting.
    fn render_line(&self, line: &str) -> String {
        if self.config.parse_markdown {
            if let Some(caps) = HEADING.captures(line) {
                return self.render_heading(caps[1].len(), &caps[2]);
            }
        }

        if self.config.highlight_quotes {
            if let Some(caps) = BLOCK_QUOTE.captures(line) {
                return self.render_quote(&caps[1]);
            }
        }

        if self.config.use_bullets {
            if let Some(caps) = LIST_ITEM.captures(line) {
                return self.render_list_item(&caps[1], &caps[2], &caps[3]);
            }
        }

        self.render_inline(line)
    }

    fn render_heading(&self, level: usize, text: &str) -> String {
        let text = text.trim_end_matches('#').trim();
        if self.config.use_colors {
            text.style(heading_style(level)).to_string()
        } else {
            format!("{} {}", "=".repeat(4 - level), text.to_uppercase())
        }
    }

    fn render_quote(&self, text: &str) -> String {
        let indent = " ".repeat(self.config.indent_size);
        let body = self.render_inline(text);
        if self.config.use_colors {
            format!("{}{}", indent, format!("│ {}", body).style(quote_style()))
        } else {
            format!("{}> {}", indent, body)
        }
    }

    fn render_list_item(&self, leading: &str, marker: &str, text: &str) -> String {
        let bullet = if marker.ends_with('.') { marker } else { "•" };
        let bullet = if self.config.use_colors {
            bullet.cyan().to_string()
        } else {
            bullet.to_string()
        };
        format!(
            "{}{}{} {}",
            " ".repeat(self.config.indent_size),
            leading,
            bullet,
            self.render_inline(text)
        )
    }

    /// Links, then bold, then italic; inline code last. No nesting.
    fn render_inline(&self, text: &str) -> String {
        let colors = self.config.use_colors;
        let mut line = text.to_string();

        if self.config.parse_markdown {
            line = LINK
                .replace_all(&line, |caps: &Captures| {
                    if colors {
                        format!("{} ({})", (&caps[1]).blue().underline(), (&caps[2]).bright_black())
                    } else {
                        format!("{} ({})", &caps[1], &caps[2])
                    }
                })
                .into_owned();
            line = BOLD
                .replace_all(&line, |caps: &Captures| {
                    if colors {
                        (&caps[1]).bold().to_string()
                    } else {
                        caps[1].to_uppercase()
                    }
                })
                .into_owned();
            line = ITALIC
                .replace_all(&line, |caps: &Captures| {
                    if colors {
                        (&caps[1]).italic().to_string()
                    } else {
                        format!("_{}_", &caps[1])
                    }
                })
                .into_owned();
        }

        if self.config.highlight_code && colors {
            line = INLINE_CODE
                .replace_all(&line, |caps: &Captures| (&caps[0]).style(code_style()).to_string())
                .into_owned();
        }

        line
    }

    /// Prefixes a rendered line and wraps it when it overflows.
    fn emit(&self, content: &str, out: &mut Vec<String>) {
        let prefix = &self.config.comment_prefix;
        let line = format!("{}{}", prefix, content);

        if self.config.wrap_long_lines && visible_width(&line) > self.config.line_width {
            out.extend(layout::wrap(
                content,
                prefix,
                self.config.indent_size,
                self.config.line_width,
            ));
        } else {
            out.push(line);
        }
    }

    fn render_code(&self, content: &str, language: &str, out: &mut Vec<String>) {
        let prefix = &self.config.comment_prefix;
        let colors = self.config.use_colors;
        let indent = " ".repeat(self.config.indent_size);

        let lines: Vec<&str> = content.split('\n').collect();
        let start = lines
            .iter()
            .position(|l| !l.trim().is_empty())
            .unwrap_or(lines.len());
        let end = lines
            .iter()
            .rposition(|l| !l.trim().is_empty())
            .map_or(start, |i| i + 1);
        let body = &lines[start..end.max(start)];

        let fence = |text: String| {
            if colors {
                format!("{}{}", prefix, text.style(comment_style()))
            } else {
                format!("{}{}", prefix, text)
            }
        };

        if !language.is_empty() {
            out.push(fence(format!("```{}", language)));
        }

        for (index, line) in body.iter().enumerate() {
            let line = line.trim_end();
            let number = if self.config.show_line_numbers {
                let number = format!("{:3}: ", index + 1);
                if colors {
                    number.style(comment_style()).to_string()
                } else {
                    number
                }
            } else {
                String::new()
            };

            if line.is_empty() {
                out.push(format!("{}{}{}", prefix, indent, number).trim_end().to_string());
            } else if self.config.highlight_code && colors {
                out.push(format!("{}{}{}{}", prefix, indent, number, line.style(code_style())));
            } else {
                out.push(format!("{}{}{}{}", prefix, indent, number, line));
            }
        }

        if !language.is_empty() {
            out.push(fence("```".to_string()));
        }

        if !self.config.compact_mode {
            out.push(String::new());
        }
    }
}
