//! Pulls a typed command list out of an assistant response.
//!
//! The assistant is asked to embed a `<structured_commands>` JSON payload. When
//! that payload is present and decodes, it wins. Otherwise the extractor falls
//! back to scanning fenced shell code blocks line by line.

use crate::commands::{classify, Command, CommandCategory, ExtractedCommands, Workflow};
use crate::patterns::{FENCED_BLOCK, STRUCTURED_BLOCK};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

/// Fence languages whose bodies are treated as shell commands.
const SHELL_LANGUAGES: &[&str] = &["bash", "shell", "sh", ""];

/// Prompt sigils stripped from the start of a command line, tried in order.
const PROMPT_PREFIXES: &[&str] = &["$ ", "# ", "> "];

#[derive(Debug, Deserialize)]
struct RawExtracted {
    #[serde(default)]
    commands: Vec<RawCommand>,
    #[serde(default)]
    workflows: Vec<RawWorkflow>,
}

#[derive(Debug, Deserialize)]
struct RawCommand {
    command: String,
    #[serde(default)]
    description: String,
    order: Option<i64>,
    safe: Option<bool>,
    /// Kept loose so an unknown or mistyped category never sinks the payload.
    category: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawWorkflow {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    steps: Vec<RawCommand>,
}

/// Stateless extractor; see [`CommandExtractor::extract`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CommandExtractor;

impl CommandExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Extracts commands and workflows from `raw`. Never fails: malformed
    /// payloads degrade to the fenced-block scan, and that to an empty result.
    pub fn extract(&self, raw: &str) -> ExtractedCommands {
        let text = raw.replace("\r\n", "\n");

        if let Some(structured) = Self::from_structured_block(&text) {
            debug!(
                "Using structured commands block ({} commands, {} workflows)",
                structured.commands.len(),
                structured.workflows.len()
            );
            return structured;
        }

        let commands = Self::from_fenced_blocks(&text);
        debug!("Extracted {} commands from fenced blocks", commands.len());
        ExtractedCommands {
            commands,
            workflows: Vec::new(),
        }
    }

    fn from_structured_block(text: &str) -> Option<ExtractedCommands> {
        let caps = STRUCTURED_BLOCK.captures(text)?;
        let body = caps.get(1)?.as_str().trim();

        match serde_json::from_str::<RawExtracted>(body) {
            Ok(raw) => Some(ExtractedCommands {
                commands: Self::normalize_commands(raw.commands),
                workflows: raw
                    .workflows
                    .into_iter()
                    .map(|w| Workflow {
                        name: w.name,
                        description: w.description,
                        steps: Self::normalize_commands(w.steps),
                    })
                    .collect(),
            }),
            Err(e) => {
                warn!("Ignoring malformed structured commands block: {}", e);
                None
            }
        }
    }

    /// Fills defaults for fields the payload omitted. A missing or non-positive
    /// `order` becomes the 1-based array position; missing `safe` is `false`;
    /// an unknown `category` is `general`.
    fn normalize_commands(raw: Vec<RawCommand>) -> Vec<Command> {
        raw.into_iter()
            .enumerate()
            .filter_map(|(index, c)| {
                let command = strip_prompt(c.command.trim()).trim().to_string();
                if command.is_empty() {
                    return None;
                }
                Some(Command {
                    command,
                    description: c.description,
                    order: c
                        .order
                        .and_then(|o| u32::try_from(o).ok())
                        .filter(|&o| o >= 1)
                        .unwrap_or(index as u32 + 1),
                    safe: c.safe.unwrap_or(false),
                    category: c
                        .category
                        .as_ref()
                        .and_then(Value::as_str)
                        .and_then(CommandCategory::from_name)
                        .unwrap_or_default(),
                })
            })
            .collect()
    }

    fn from_fenced_blocks(text: &str) -> Vec<Command> {
        let mut commands = Vec::new();
        let mut order = 1;

        for caps in FENCED_BLOCK.captures_iter(text) {
            let language = caps.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase();
            if !SHELL_LANGUAGES.contains(&language.as_str()) {
                continue;
            }
            let body = caps.get(2).map_or("", |m| m.as_str());

            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                let line = strip_prompt(line).trim();
                if line.is_empty() {
                    continue;
                }
                let (safe, category) = classify(line);
                commands.push(Command {
                    command: line.to_string(),
                    description: String::new(),
                    order,
                    safe,
                    category,
                });
                order += 1;
            }
        }

        commands
    }
}

/// Removes leading prompt sigils until none is left.
fn strip_prompt(mut line: &str) -> &str {
    while let Some(rest) = PROMPT_PREFIXES
        .iter()
        .find_map(|prefix| line.strip_prefix(prefix))
    {
        line = rest.trim_start();
    }
    line
}
