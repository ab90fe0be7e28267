//! Plain listings printed around the rendered response: the extracted command
//! summary, the history listing and the provider table.
//!
//! Every function writes to an injected writer so the output can be checked
//! in tests.

use crate::commands::{Command, ExtractedCommands};
use crate::config::Config;
use crate::history::HistoryEntry;
use anyhow::Result;
use owo_colors::{OwoColorize, Style};
use std::io::Write;

const QUESTION_PREVIEW: usize = 60;

fn paint(text: &str, style: Style, use_colors: bool) -> String {
    if use_colors {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn write_command<W: Write>(command: &Command, indent: &str, use_colors: bool, output: &mut W) -> Result<()> {
    let marker = if command.safe { " " } else { "⚠" };
    writeln!(
        output,
        "{}{} {} {}",
        indent,
        marker,
        paint("$", Style::new().bright_black(), use_colors),
        paint(&command.command, Style::new().cyan(), use_colors)
    )?;
    if !command.description.is_empty() {
        writeln!(
            output,
            "{}    {}",
            indent,
            paint(&command.description, Style::new().bright_black(), use_colors)
        )?;
    }
    Ok(())
}

/// Writes the command summary shown after a response.
///
/// Nothing is written when the response contained no commands.
pub fn write_commands<W: Write>(extracted: &ExtractedCommands, use_colors: bool, output: &mut W) -> Result<()> {
    if !extracted.has_commands() {
        return Ok(());
    }

    if !extracted.commands.is_empty() {
        writeln!(output, "{}", paint("Commands:", Style::new().bold(), use_colors))?;
        for command in &extracted.commands {
            write_command(command, "  ", use_colors, output)?;
        }
    }

    for workflow in &extracted.workflows {
        writeln!(
            output,
            "{}",
            paint(&format!("Workflow: {}", workflow.name), Style::new().bold(), use_colors)
        )?;
        if !workflow.description.is_empty() {
            writeln!(output, "  {}", workflow.description)?;
        }
        for step in &workflow.steps {
            write_command(step, "  ", use_colors, output)?;
        }
    }

    if extracted
        .commands
        .iter()
        .chain(extracted.workflows.iter().flat_map(|w| w.steps.iter()))
        .any(|c| !c.safe)
    {
        writeln!(output, "⚠ marks commands that modify or delete data. Review before running.")?;
    }
    Ok(())
}

fn preview(question: &str) -> String {
    let single_line = question.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= QUESTION_PREVIEW {
        return single_line;
    }
    let cut: String = single_line.chars().take(QUESTION_PREVIEW - 3).collect();
    format!("{}...", cut)
}

/// Writes a numbered list of entries, newest first, numbered from 1.
pub fn write_history<W: Write>(entries: &[HistoryEntry], output: &mut W) -> Result<()> {
    if entries.is_empty() {
        writeln!(output, "No history yet.")?;
        return Ok(());
    }
    for (i, entry) in entries.iter().enumerate() {
        writeln!(
            output,
            "{:>3}. [{}] ({}) {}",
            i + 1,
            entry.formatted_time(),
            entry.provider,
            preview(&entry.question)
        )?;
    }
    Ok(())
}

/// Writes configured providers with the current one marked by `*`.
pub fn write_providers<W: Write>(config: &Config, output: &mut W) -> Result<()> {
    if config.providers.is_empty() {
        writeln!(output, "No providers configured. Run `how setup` to add one.")?;
        return Ok(());
    }

    let current = config.active_provider(None).ok().map(|(name, _)| name);
    for (name, provider) in &config.providers {
        let marker = if current.as_deref() == Some(name.as_str()) { "*" } else { " " };
        let model = provider.model.as_deref().unwrap_or("default model");
        let mut line = format!("{} {} ({}, {})", marker, name, provider.kind, model);
        if let Some(base_url) = &provider.base_url {
            line.push_str(&format!(" at {}", base_url));
        }
        if provider.api_key.is_none() && provider.base_url.is_none() {
            line.push_str(" [no API key]");
        }
        writeln!(output, "{}", line)?;
    }
    Ok(())
}
