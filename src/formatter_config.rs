//! Rendering policy for [`ResponseFormatter`](crate::formatter::ResponseFormatter).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_COMMENT_PREFIX: &str = "# ";
pub const DEFAULT_LINE_WIDTH: usize = 80;
pub const DEFAULT_INDENT_SIZE: usize = 2;

/// Flat record of rendering options.
///
/// `comment_prefix` is emitted verbatim before every line, so the output can be
/// pasted into a shell script as comments. An empty prefix is honoured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatterConfig {
    pub use_colors: bool,
    pub highlight_code: bool,
    pub highlight_quotes: bool,
    pub parse_markdown: bool,
    pub comment_prefix: String,
    pub line_width: usize,
    pub indent_size: usize,
    pub use_boxes: bool,
    pub use_bullets: bool,
    pub wrap_long_lines: bool,
    pub render_tables: bool,
    pub show_line_numbers: bool,
    pub compact_mode: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Preset::Default.config()
    }
}

impl FormatterConfig {
    /// Replaces out-of-range values with their defaults.
    pub fn sanitized(mut self) -> Self {
        if self.line_width == 0 {
            self.line_width = DEFAULT_LINE_WIDTH;
        }
        if self.indent_size == 0 {
            self.indent_size = DEFAULT_INDENT_SIZE;
        }
        self
    }

    /// Turns off every option that would emit ANSI escapes.
    pub fn without_colors(mut self) -> Self {
        self.use_colors = false;
        self
    }
}

/// Named [`FormatterConfig`] presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Default,
    Colored,
    Compact,
}

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Default, Preset::Colored, Preset::Compact];

    pub fn config(self) -> FormatterConfig {
        match self {
            Preset::Default => FormatterConfig {
                use_colors: false,
                highlight_code: false,
                highlight_quotes: true,
                parse_markdown: true,
                comment_prefix: DEFAULT_COMMENT_PREFIX.to_string(),
                line_width: DEFAULT_LINE_WIDTH,
                indent_size: DEFAULT_INDENT_SIZE,
                use_boxes: false,
                use_bullets: true,
                wrap_long_lines: true,
                render_tables: true,
                show_line_numbers: false,
                compact_mode: false,
            },
            Preset::Colored => FormatterConfig {
                use_colors: true,
                highlight_code: true,
                highlight_quotes: true,
                use_boxes: true,
                ..Preset::Default.config()
            },
            Preset::Compact => FormatterConfig {
                use_colors: true,
                highlight_code: true,
                comment_prefix: String::new(),
                line_width: 120,
                wrap_long_lines: false,
                compact_mode: true,
                ..Preset::Default.config()
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Preset::Default => "default",
            Preset::Colored => "colored",
            Preset::Compact => "compact",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "default" | "plain" => Ok(Preset::Default),
            "colored" | "coloured" | "color" => Ok(Preset::Colored),
            "compact" => Ok(Preset::Compact),
            other => Err(anyhow::anyhow!(
                "Unknown preset '{}'. Expected one of: default, colored, compact",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_preset_is_plain() {
        let config = FormatterConfig::default();
        assert!(!config.use_colors);
        assert_eq!(config.comment_prefix, "# ");
        assert_eq!(config.line_width, 80);
        assert_eq!(config.indent_size, 2);
        assert!(!config.use_boxes);
    }

    #[test]
    fn test_colored_preset_boxes_and_highlights() {
        let config = Preset::Colored.config();
        assert!(config.use_colors);
        assert!(config.use_boxes);
        assert!(config.highlight_code);
        assert!(config.highlight_quotes);
    }

    #[test]
    fn test_compact_preset() {
        let config = Preset::Compact.config();
        assert!(config.use_colors);
        assert_eq!(config.comment_prefix, "");
        assert_eq!(config.line_width, 120);
        assert!(!config.wrap_long_lines);
        assert!(config.compact_mode);
    }

    #[test]
    fn test_sanitized_replaces_zero_width_and_indent() {
        let config = FormatterConfig {
            line_width: 0,
            comment_prefix: String::new(),
            indent_size: 0,
            ..FormatterConfig::default()
        }
        .sanitized();
        assert_eq!(config.line_width, 80);
        assert_eq!(config.comment_prefix, "");
        assert_eq!(config.indent_size, 2);
    }

    #[test]
    fn test_preset_from_str() {
        assert_eq!("Colored".parse::<Preset>().unwrap(), Preset::Colored);
        assert_eq!("compact".parse::<Preset>().unwrap(), Preset::Compact);
        assert!("fancy".parse::<Preset>().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: FormatterConfig = toml::from_str("line_width = 100\nuse_colors = true").unwrap();
        assert_eq!(config.line_width, 100);
        assert!(config.use_colors);
        assert_eq!(config.comment_prefix, "# ");
    }
}
