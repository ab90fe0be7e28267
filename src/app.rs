//! Ties the pieces together for one invocation: gather context, ask the
//! provider, render the answer and log it.

use crate::command_extractor::CommandExtractor;
use crate::commands::ExtractedCommands;
use crate::config::Config;
use crate::context::{ContextBundle, ContextGatherer};
use crate::display;
use crate::formatter::ResponseFormatter;
use crate::formatter_config::Preset;
use crate::history::ConversationLog;
use crate::llm_provider::{create_provider, LlmProvider, PromptRequest};
use crate::prompt::{build_system_prompt, build_user_prompt};
use anyhow::{anyhow, Result};
use owo_colors::OwoColorize;
use std::io::{self, Write};
use tracing::{debug, info, warn};

/// Per-invocation switches from the command line.
#[derive(Debug, Clone, Default)]
pub struct AskOptions {
    pub preset: Option<Preset>,
    pub provider: Option<String>,
    pub no_context: bool,
    /// Forces streaming on; otherwise `display.stream` decides.
    pub stream: bool,
    pub json: bool,
    /// Whether the output terminal accepts colours.
    pub colors_allowed: bool,
}

/// What an answered question produced.
#[derive(Debug, Clone)]
pub struct Answer {
    pub provider: String,
    pub raw: String,
    pub rendered: String,
    pub commands: ExtractedCommands,
}

pub struct App {
    config: Config,
    history: Option<ConversationLog>,
}

impl App {
    /// Creates the app with the default conversation log, if enabled.
    pub fn new(config: Config) -> Result<Self> {
        let history = if config.history.enabled {
            Some(ConversationLog::new(
                ConversationLog::default_path()?,
                config.history.max_entries,
            ))
        } else {
            None
        };
        Ok(Self::with_history(config, history))
    }

    pub fn with_history(config: Config, history: Option<ConversationLog>) -> Self {
        Self { config, history }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn formatter(&self, options: &AskOptions) -> ResponseFormatter {
        let mut config = self.config.display.formatter_config(options.preset);
        if !options.colors_allowed {
            config = config.without_colors();
        }
        ResponseFormatter::new(config)
    }

    /// Answers `question` using the configured provider on stdout/stderr.
    pub async fn ask(&self, question: &str, options: &AskOptions) -> Result<()> {
        let provider = create_provider(&self.config, options.provider.as_deref())?;
        let context = if options.no_context {
            None
        } else {
            Some(ContextGatherer::new(self.config.context.clone()).gather())
        };

        let mut stdout = io::stdout();
        let mut stderr = io::stderr();
        self.ask_with_io(
            provider.as_ref(),
            question,
            context.as_ref(),
            options,
            &mut stdout,
            &mut stderr,
        )
        .await?;
        Ok(())
    }

    /// Answers `question` with an explicit provider and output streams.
    ///
    /// The rendered answer (or JSON with `options.json`) goes to `output`.
    /// Streamed text goes to `progress` as it arrives.
    pub async fn ask_with_io<W, E>(
        &self,
        provider: &dyn LlmProvider,
        question: &str,
        context: Option<&ContextBundle>,
        options: &AskOptions,
        output: &mut W,
        progress: &mut E,
    ) -> Result<Answer>
    where
        W: Write,
        E: Write + Send,
    {
        let question = question.trim();
        if question.is_empty() {
            return Err(anyhow!("No question provided. Use 'how --help' for usage information."));
        }

        let request = PromptRequest {
            system: build_system_prompt(),
            user: build_user_prompt(question, context),
        };
        info!("Asking {}: {}", provider.name(), question);

        let raw = if options.stream || self.config.display.stream {
            let raw = provider
                .complete_streaming(&request, &mut |delta: &str| {
                    let _ = write!(progress, "{}", delta);
                    let _ = progress.flush();
                })
                .await?;
            writeln!(progress)?;
            raw
        } else {
            provider.complete(&request).await?
        };
        debug!("Received {} bytes from {}", raw.len(), provider.name());

        let formatter = self.formatter(options);
        let rendered = formatter.format(&raw);
        let commands = CommandExtractor::new().extract(&raw);

        if options.json {
            writeln!(output, "{}", commands.to_pretty_json()?)?;
        } else {
            write!(output, "{}", rendered)?;
            if !rendered.ends_with('\n') {
                writeln!(output)?;
            }
            if commands.has_commands() {
                writeln!(output)?;
                display::write_commands(&commands, formatter.config().use_colors, output)?;
            }
        }

        if let Some(history) = &self.history {
            if let Err(e) = history.append(provider.name(), question, &raw) {
                warn!("Could not record history: {}", e);
            }
        }

        Ok(Answer {
            provider: provider.name().to_string(),
            raw,
            rendered,
            commands,
        })
    }

    fn history(&self) -> Result<&ConversationLog> {
        self.history
            .as_ref()
            .ok_or_else(|| anyhow!("History is disabled in the config file"))
    }

    /// Lists the `limit` most recent questions.
    pub fn list_history<W: Write>(&self, limit: usize, output: &mut W) -> Result<()> {
        let entries = self.history()?.recent(limit)?;
        display::write_history(&entries, output)
    }

    /// Re-renders history entry `index` (1 is the newest).
    pub fn show_history_entry<W: Write>(
        &self,
        index: usize,
        options: &AskOptions,
        output: &mut W,
    ) -> Result<()> {
        let entry = self.history()?.get(index)?;
        let formatter = self.formatter(options);
        let use_colors = formatter.config().use_colors;

        let heading = format!("[{}] ({}) {}", entry.formatted_time(), entry.provider, entry.question);
        if use_colors {
            writeln!(output, "{}", heading.bold())?;
        } else {
            writeln!(output, "{}", heading)?;
        }
        write!(output, "{}", formatter.format(&entry.response))?;

        let commands = CommandExtractor::new().extract(&entry.response);
        if commands.has_commands() {
            writeln!(output)?;
            display::write_commands(&commands, use_colors, output)?;
        }
        Ok(())
    }

    pub fn clear_history<W: Write>(&self, output: &mut W) -> Result<()> {
        self.history()?.clear()?;
        writeln!(output, "History cleared.")?;
        Ok(())
    }

    pub fn list_providers<W: Write>(&self, output: &mut W) -> Result<()> {
        display::write_providers(&self.config, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_provider::MockProvider;
    use std::path::Path;

    fn app_in(dir: &Path) -> App {
        let log = ConversationLog::new(dir.join("history.jsonl"), 10);
        App::with_history(Config::default(), Some(log))
    }

    async fn ask(app: &App, question: &str, options: &AskOptions) -> (Answer, String, String) {
        let mut output = Vec::new();
        let mut progress = Vec::new();
        let answer = app
            .ask_with_io(&MockProvider::new(), question, None, options, &mut output, &mut progress)
            .await
            .unwrap();
        (
            answer,
            String::from_utf8(output).unwrap(),
            String::from_utf8(progress).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_answer_is_rendered_with_command_summary() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());

        let (answer, output, progress) = ask(&app, "what is using port 8080", &AskOptions::default()).await;

        assert_eq!(answer.provider, "mock");
        assert_eq!(answer.commands.commands.len(), 2);
        assert!(output.contains("# == FINDING PROCESSES ON A PORT\n"));
        assert!(output.contains("Commands:\n"));
        assert!(output.contains("$ lsof -i :8080"));
        assert!(!output.contains("structured_commands"));
        assert!(!output.contains('\x1b'));
        assert!(progress.is_empty());
    }

    #[tokio::test]
    async fn test_json_output() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        let options = AskOptions {
            json: true,
            ..AskOptions::default()
        };

        let (answer, output, _) = ask(&app, "check disk space", &options).await;
        let parsed: ExtractedCommands = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed, answer.commands);
        assert_eq!(parsed.commands[0].command, "df -h");
    }

    #[tokio::test]
    async fn test_streaming_echoes_progress() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        let options = AskOptions {
            stream: true,
            ..AskOptions::default()
        };

        let (answer, _, progress) = ask(&app, "show git branch", &options).await;
        assert_eq!(progress, format!("{}\n", answer.raw));
    }

    #[tokio::test]
    async fn test_answers_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let app = app_in(dir.path());
        ask(&app, "check disk space", &AskOptions::default()).await;

        let mut listing = Vec::new();
        app.list_history(5, &mut listing).unwrap();
        let listing = String::from_utf8(listing).unwrap();
        assert!(listing.contains("(mock) check disk space"));

        let mut shown = Vec::new();
        app.show_history_entry(1, &AskOptions::default(), &mut shown).unwrap();
        let shown = String::from_utf8(shown).unwrap();
        assert!(shown.contains("== CHECKING DISK USAGE"));
        assert!(shown.contains("$ du -sh *"));

        let mut cleared = Vec::new();
        app.clear_history(&mut cleared).unwrap();
        let mut after_clear = Vec::new();
        assert!(app.show_history_entry(1, &AskOptions::default(), &mut after_clear).is_err());
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected() {
        let app = App::with_history(Config::default(), None);
        let mut output = Vec::new();
        let mut progress = Vec::new();
        let result = app
            .ask_with_io(&MockProvider::new(), "   ", None, &AskOptions::default(), &mut output, &mut progress)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_history_disabled() {
        let app = App::with_history(Config::default(), None);
        let mut output = Vec::new();
        assert!(app.list_history(5, &mut output).is_err());
    }

    #[test]
    fn test_colors_follow_terminal() {
        let mut config = Config::default();
        config.display.preset = Preset::Colored;
        let app = App::with_history(config, None);

        let allowed = AskOptions {
            colors_allowed: true,
            ..AskOptions::default()
        };
        assert!(app.formatter(&allowed).config().use_colors);
        assert!(!app.formatter(&AskOptions::default()).config().use_colors);
    }
}
