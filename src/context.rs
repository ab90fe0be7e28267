//! Snapshot of the user's working environment sent along with a question.
//!
//! Gathering is best effort: anything that cannot be read is logged and left
//! out, so a missing history file or a non-git directory never fails a request.

use crate::config::ContextConfig;
use anyhow::Result;
use dirs::home_dir;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, warn};

/// Trait for running system processes.
///
/// This abstraction enables testing without spawning real processes.
pub trait ProcessRunner: Send + Sync {
    /// Executes a command in `cwd` and returns its output.
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<Output>;

    /// Checks if a program exists in PATH.
    fn program_exists(&self, program: &str) -> bool;
}

/// Default process runner using std::process::Command.
pub struct SystemProcessRunner;

impl ProcessRunner for SystemProcessRunner {
    fn run(&self, program: &str, args: &[&str], cwd: &Path) -> Result<Output> {
        Ok(Command::new(program).args(args).current_dir(cwd).output()?)
    }

    fn program_exists(&self, program: &str) -> bool {
        which::which(program).is_ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    pub branch: String,
    pub changed_files: usize,
}

/// What the assistant gets to know about where the user is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContextBundle {
    pub cwd: String,
    pub os: String,
    pub shell: Option<String>,
    pub recent_commands: Vec<String>,
    pub files: Vec<String>,
    pub git: Option<GitInfo>,
}

impl ContextBundle {
    /// Renders the bundle as a plain-text section for the prompt.
    pub fn to_prompt_section(&self) -> String {
        let mut section = String::new();
        let _ = writeln!(section, "Operating system: {}", self.os);
        if let Some(shell) = &self.shell {
            let _ = writeln!(section, "Shell: {}", shell);
        }
        let _ = writeln!(section, "Working directory: {}", self.cwd);

        if let Some(git) = &self.git {
            let _ = writeln!(
                section,
                "Git branch: {} ({} changed files)",
                git.branch, git.changed_files
            );
        }

        if !self.files.is_empty() {
            let _ = writeln!(section, "Files in directory: {}", self.files.join(", "));
        }

        if !self.recent_commands.is_empty() {
            let _ = writeln!(section, "Recent shell commands:");
            for command in &self.recent_commands {
                let _ = writeln!(section, "  {}", command);
            }
        }

        section
    }
}

/// Collects a [`ContextBundle`] according to a [`ContextConfig`].
pub struct ContextGatherer<R: ProcessRunner = SystemProcessRunner> {
    config: ContextConfig,
    runner: R,
}

impl ContextGatherer<SystemProcessRunner> {
    pub fn new(config: ContextConfig) -> Self {
        Self::with_runner(config, SystemProcessRunner)
    }
}

impl<R: ProcessRunner> ContextGatherer<R> {
    pub fn with_runner(config: ContextConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// Gathers context for the current process environment.
    pub fn gather(&self) -> ContextBundle {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let shell = std::env::var("SHELL").ok();
        let history_file = std::env::var("HISTFILE")
            .ok()
            .map(PathBuf::from)
            .or_else(|| default_history_file(shell.as_deref()));
        self.gather_from(&cwd, shell.as_deref(), history_file.as_deref())
    }

    /// Gathers context for an explicit directory, shell and history file.
    pub fn gather_from(
        &self,
        cwd: &Path,
        shell: Option<&str>,
        history_file: Option<&Path>,
    ) -> ContextBundle {
        let mut bundle = ContextBundle {
            cwd: cwd.display().to_string(),
            os: std::env::consts::OS.to_string(),
            shell: shell.map(shell_name),
            ..ContextBundle::default()
        };

        if self.config.include_history {
            if let Some(path) = history_file {
                bundle.recent_commands = match read_recent_commands(path, self.config.history_limit) {
                    Ok(commands) => commands,
                    Err(e) => {
                        debug!("Skipping shell history {}: {}", path.display(), e);
                        Vec::new()
                    }
                };
            }
        }

        if self.config.include_files {
            bundle.files = match list_files(cwd, self.config.max_files) {
                Ok(files) => files,
                Err(e) => {
                    warn!("Could not list {}: {}", cwd.display(), e);
                    Vec::new()
                }
            };
        }

        if self.config.include_git {
            bundle.git = self.git_info(cwd);
        }

        bundle
    }

    fn git_info(&self, cwd: &Path) -> Option<GitInfo> {
        if !self.runner.program_exists("git") {
            debug!("git not found in PATH");
            return None;
        }

        let branch = self
            .runner
            .run("git", &["rev-parse", "--abbrev-ref", "HEAD"], cwd)
            .ok()
            .filter(|o| o.status.success())?;
        let branch = String::from_utf8_lossy(&branch.stdout).trim().to_string();

        let changed_files = self
            .runner
            .run("git", &["status", "--porcelain"], cwd)
            .ok()
            .filter(|o| o.status.success())
            .map(|o| {
                String::from_utf8_lossy(&o.stdout)
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .count()
            })
            .unwrap_or(0);

        Some(GitInfo {
            branch,
            changed_files,
        })
    }
}

fn shell_name(shell: &str) -> String {
    Path::new(shell)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| shell.to_string())
}

/// History file conventionally used by `shell`.
pub fn default_history_file(shell: Option<&str>) -> Option<PathBuf> {
    let home = home_dir()?;
    let name = shell.map(shell_name).unwrap_or_default();
    let path = match name.as_str() {
        "zsh" => home.join(".zsh_history"),
        "fish" => home.join(".local/share/fish/fish_history"),
        _ => home.join(".bash_history"),
    };
    Some(path)
}

/// Parses one history line in bash, zsh extended or fish format.
fn parse_history_line(line: &str) -> Option<&str> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("when:") {
        return None;
    }
    // zsh extended history: ": 1700000000:0;command"
    if let Some(rest) = line.strip_prefix(": ") {
        return rest.split_once(';').map(|(_, cmd)| cmd.trim()).filter(|c| !c.is_empty());
    }
    if let Some(cmd) = line.strip_prefix("- cmd: ") {
        return Some(cmd.trim());
    }
    Some(line)
}

/// Last `limit` commands from a shell history file, oldest first.
///
/// Consecutive duplicates and invocations of `how` itself are skipped.
pub fn read_recent_commands(path: &Path, limit: usize) -> Result<Vec<String>> {
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let mut commands: Vec<String> = Vec::new();
    for command in content.lines().filter_map(parse_history_line) {
        if command == "how" || command.starts_with("how ") {
            continue;
        }
        if commands.last().is_some_and(|last| last == command) {
            continue;
        }
        commands.push(command.to_string());
    }

    let start = commands.len().saturating_sub(limit);
    Ok(commands.split_off(start))
}

/// Up to `max` visible entries of `dir`, sorted, directories suffixed `/`.
pub fn list_files(dir: &Path, max: usize) -> Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            names.push(format!("{}/", name));
        } else {
            names.push(name);
        }
    }
    names.sort();
    names.truncate(max);
    Ok(names)
}
