//! Line-level layout helpers: visible width, word wrapping and pipe tables.

use crate::patterns::ANSI_SGR;
use owo_colors::OwoColorize;

/// Number of characters a terminal shows for `text`, ignoring SGR escapes.
pub fn visible_width(text: &str) -> usize {
    if text.contains('\x1b') {
        ANSI_SGR.replace_all(text, "").chars().count()
    } else {
        text.chars().count()
    }
}

/// Word-wraps `content` to `width` columns.
///
/// The first line starts with `prefix` followed by the content's own leading
/// whitespace; continuation lines add `indent_size` spaces on top of that. A
/// word wider than the remaining budget is never split; it gets a line of its
/// own instead.
pub fn wrap(content: &str, prefix: &str, indent_size: usize, width: usize) -> Vec<String> {
    let leading: String = content.chars().take_while(|c| c.is_whitespace()).collect();
    let continuation = format!("{}{}{}", prefix, leading, " ".repeat(indent_size));
    let continuation_width = visible_width(&continuation);

    let mut lines = Vec::new();
    let mut current = format!("{}{}", prefix, leading);
    let mut current_width = visible_width(&current);
    let mut line_has_words = false;

    for word in content.split_whitespace() {
        let word_width = visible_width(word);

        if !line_has_words {
            current.push_str(word);
            current_width += word_width;
            line_has_words = true;
        } else if current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
        } else {
            lines.push(std::mem::take(&mut current));
            current = format!("{}{}", continuation, word);
            current_width = continuation_width + word_width;
        }
    }

    if line_has_words {
        lines.push(current);
    } else {
        lines.push(current.trim_end().to_string());
    }
    lines
}

/// Splits one `| a | b |` row into trimmed cells.
pub fn parse_table_row(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|cell| cell.trim().to_string()).collect()
}

/// A row such as `| --- | :-: |` that only decorates the header.
pub fn is_separator_row(cells: &[String]) -> bool {
    !cells.is_empty()
        && cells.iter().all(|cell| {
            !cell.is_empty() && cell.chars().all(|c| c == '-' || c == ':')
        })
        && cells.iter().any(|cell| cell.contains('-'))
}

/// Renders consecutive pipe-table lines as a box-drawn table.
///
/// Separator rows are dropped from the data; a decorative separator is always
/// drawn after the first (header) row. Ragged rows are padded with empty
/// cells. Returns no lines when nothing but separators was given.
pub fn render_table(lines: &[&str], prefix: &str, use_colors: bool) -> Vec<String> {
    let rows: Vec<Vec<String>> = lines
        .iter()
        .map(|line| parse_table_row(line))
        .filter(|cells| !is_separator_row(cells))
        .collect();

    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    if rows.is_empty() || columns == 0 {
        return Vec::new();
    }

    let mut widths = vec![0; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(visible_width(cell));
        }
    }

    let mut output = Vec::with_capacity(rows.len() + 1);
    for (row_index, row) in rows.iter().enumerate() {
        let cells: Vec<String> = (0..columns)
            .map(|i| {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                let padding = " ".repeat(widths[i] - visible_width(cell));
                if use_colors && row_index == 0 {
                    format!("{}{}", cell.bold(), padding)
                } else {
                    format!("{}{}", cell, padding)
                }
            })
            .collect();
        output.push(format!("{}│ {} │", prefix, cells.join(" │ ")));

        if row_index == 0 {
            let segments: Vec<String> = widths.iter().map(|w| "─".repeat(w + 2)).collect();
            output.push(format!("{}├{}┤", prefix, segments.join("┼")));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_width_ignores_escapes() {
        assert_eq!(visible_width("plain"), 5);
        assert_eq!(visible_width("\x1b[1mbold\x1b[0m"), 4);
        assert_eq!(visible_width("•"), 1);
    }

    #[test]
    fn test_wrap_respects_width_and_continuation_indent() {
        let text = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod tempor";
        let lines = wrap(text, "# ", 2, 30);

        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("# lorem"));
        for line in &lines {
            assert!(line.chars().count() <= 30, "too long: {:?}", line);
        }
        for line in &lines[1..] {
            assert!(line.starts_with("#   "));
            assert!(!line.starts_with("#    "));
        }
    }

    #[test]
    fn test_wrap_keeps_long_word_whole() {
        let long = "x".repeat(50);
        let lines = wrap(&format!("short {} tail", long), "# ", 2, 20);
        assert_eq!(lines, vec!["# short".to_string(), format!("#   {}", long), "#   tail".to_string()]);
    }

    #[test]
    fn test_wrap_preserves_leading_indent() {
        let lines = wrap("    • alpha beta gamma delta", "", 2, 16);
        assert_eq!(lines[0], "    • alpha beta");
        assert!(lines[1].starts_with("      "));
    }

    #[test]
    fn test_separator_detection() {
        assert!(is_separator_row(&parse_table_row("| --- | :-: |")));
        assert!(is_separator_row(&parse_table_row("|-|--|")));
        assert!(!is_separator_row(&parse_table_row("| - | x |")));
        assert!(!is_separator_row(&parse_table_row("| : | : |")));
    }

    #[test]
    fn test_render_table_pads_and_separates() {
        let rows = ["| A | BB |", "| - | -- |", "| 1 | 22 |", "| 333 | 4 |"];
        let output = render_table(&rows, "# ", false);

        assert_eq!(
            output,
            vec![
                "# │ A   │ BB │",
                "# ├─────┼────┤",
                "# │ 1   │ 22 │",
                "# │ 333 │ 4  │",
            ]
        );
    }

    #[test]
    fn test_render_table_pads_ragged_rows() {
        let output = render_table(&["| a | b | c |", "| d |"], "", false);
        assert_eq!(output[2], "│ d │   │   │");
    }

    #[test]
    fn test_render_table_only_separators_is_empty() {
        assert!(render_table(&["| --- |"], "# ", false).is_empty());
    }
}
