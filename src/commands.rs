//! Typed command lists pulled out of assistant responses.
//!
//! A response yields zero or more standalone [`Command`]s plus zero or more
//! named [`Workflow`]s. Each command carries a coarse [`CommandCategory`] and a
//! `safe` flag derived from its first token.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse classification of a shell command by its first token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandCategory {
    File,
    Network,
    System,
    Git,
    Package,
    Build,
    #[default]
    General,
}

impl CommandCategory {
    /// Maps the first token of a command line to its category.
    ///
    /// Unknown tokens map to [`CommandCategory::General`].
    pub fn from_token(token: &str) -> Self {
        match token {
            "ls" | "cat" | "grep" | "find" => Self::File,
            "curl" | "wget" | "ping" => Self::Network,
            "ps" | "top" | "df" | "free" => Self::System,
            "git" => Self::Git,
            "npm" | "pip" => Self::Package,
            "go" => Self::Build,
            _ => Self::General,
        }
    }

    /// Parses a category name as written on the wire, ignoring case.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "network" => Some(Self::Network),
            "system" => Some(Self::System),
            "git" => Some(Self::Git),
            "package" => Some(Self::Package),
            "build" => Some(Self::Build),
            "general" => Some(Self::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Network => "network",
            Self::System => "system",
            Self::Git => "git",
            Self::Package => "package",
            Self::Build => "build",
            Self::General => "general",
        }
    }
}

impl fmt::Display for CommandCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns true when the first token is one of the known destructive programs.
pub fn is_unsafe_token(token: &str) -> bool {
    matches!(
        token,
        "rm" | "sudo" | "chmod" | "mv" | "dd" | "mkfs" | "fdisk"
    )
}

/// First whitespace-delimited token of a command line, or `""`.
pub fn first_token(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or("")
}

/// Safety and category for a command line, in that order.
pub fn classify(command: &str) -> (bool, CommandCategory) {
    let token = first_token(command);
    (!is_unsafe_token(token), CommandCategory::from_token(token))
}

/// A single suggested shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub command: String,
    #[serde(default)]
    pub description: String,
    pub order: u32,
    #[serde(default)]
    pub safe: bool,
    #[serde(default)]
    pub category: CommandCategory,
}

impl Command {
    /// Builds a command with safety and category derived from its text.
    pub fn classified(command: &str, description: &str, order: u32) -> Self {
        let (safe, category) = classify(command);
        Self {
            command: command.to_string(),
            description: description.to_string(),
            order,
            safe,
            category,
        }
    }
}

/// A named, ordered sequence of commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<Command>,
}

/// Everything extracted from one response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedCommands {
    #[serde(default)]
    pub commands: Vec<Command>,
    #[serde(default)]
    pub workflows: Vec<Workflow>,
}

impl ExtractedCommands {
    /// Standalone commands plus every workflow step.
    pub fn total_count(&self) -> usize {
        self.commands.len() + self.workflows.iter().map(|w| w.steps.len()).sum::<usize>()
    }

    pub fn has_commands(&self) -> bool {
        self.total_count() > 0
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_compact_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
