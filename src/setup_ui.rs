//! Interactive setup wizard.
//!
//! Asks which provider to use, its credentials and model, and the display
//! preset, then returns the updated configuration for the caller to save.

use crate::config::{Config, ProviderConfig, ProviderKind};
use crate::formatter_config::Preset;
use anyhow::{anyhow, Result};
use std::io::{self, BufRead, Write};
use tracing::info;

const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
const OLLAMA_DEFAULT_MODEL: &str = "llama3";

/// Provider choices offered by the wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Choice {
    Anthropic,
    OpenAi,
    Ollama,
}

impl Choice {
    fn name(self) -> &'static str {
        match self {
            Choice::Anthropic => "anthropic",
            Choice::OpenAi => "openai",
            Choice::Ollama => "ollama",
        }
    }
}

pub struct SetupWizard;

impl SetupWizard {
    pub fn new() -> Self {
        Self
    }

    /// Runs the wizard on stdin/stdout.
    pub fn run(&self, existing: Config) -> Result<Config> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let mut output = io::stdout();
        self.run_with_io(existing, &mut input, &mut output)
    }

    /// Runs the wizard against custom I/O streams.
    ///
    /// # Errors
    ///
    /// Returns an error if I/O fails or the input ends before the wizard
    /// is complete.
    pub fn run_with_io<R: BufRead, W: Write>(
        &self,
        mut config: Config,
        input: &mut R,
        output: &mut W,
    ) -> Result<Config> {
        writeln!(output, "how setup")?;
        writeln!(output, "{}", "=".repeat(40))?;
        writeln!(output)?;
        writeln!(output, "Which provider do you want to use?")?;
        writeln!(output, "  1. Anthropic (Claude)")?;
        writeln!(output, "  2. OpenAI")?;
        writeln!(output, "  3. Ollama (local, no API key)")?;

        let choice = loop {
            match prompt(input, output, "\nChoose an option (1/2/3): ")?.as_str() {
                "1" => break Choice::Anthropic,
                "2" => break Choice::OpenAi,
                "3" => break Choice::Ollama,
                _ => writeln!(output, "Invalid choice. Please enter 1, 2, or 3.")?,
            }
        };

        let mut provider = match choice {
            Choice::Anthropic => ProviderConfig::new(ProviderKind::Anthropic),
            Choice::OpenAi => ProviderConfig::new(ProviderKind::OpenAi),
            Choice::Ollama => {
                let mut provider = ProviderConfig::new(ProviderKind::OpenAi);
                provider.base_url = Some(OLLAMA_BASE_URL.to_string());
                provider
            }
        };

        if choice != Choice::Ollama {
            let existing_key = config
                .providers
                .get(choice.name())
                .and_then(|p| p.api_key.clone());
            provider.api_key = loop {
                let hint = if existing_key.is_some() { " (Enter to keep current)" } else { "" };
                let key = prompt(input, output, &format!("API key{}: ", hint))?;
                if !key.is_empty() {
                    break Some(key);
                }
                if existing_key.is_some() {
                    break existing_key;
                }
                writeln!(output, "An API key is required for {}.", choice.name())?;
            };
        }

        let model = prompt(input, output, "Model (Enter for the default): ")?;
        provider.model = if !model.is_empty() {
            Some(model)
        } else if choice == Choice::Ollama {
            Some(OLLAMA_DEFAULT_MODEL.to_string())
        } else {
            None
        };

        let names: Vec<&str> = Preset::ALL.iter().map(|p| p.as_str()).collect();
        config.display.preset = loop {
            let answer = prompt(
                input,
                output,
                &format!("Display preset [{}] (current: {}): ", names.join("/"), config.display.preset),
            )?;
            if answer.is_empty() {
                break config.display.preset;
            }
            match answer.parse::<Preset>() {
                Ok(preset) => break preset,
                Err(e) => writeln!(output, "{}", e)?,
            }
        };

        config.providers.insert(choice.name().to_string(), provider);
        config.current_provider = Some(choice.name().to_string());
        info!("Setup configured provider '{}'", choice.name());

        writeln!(output)?;
        writeln!(output, "✅ Provider '{}' is now the current provider.", choice.name())?;
        Ok(config)
    }
}

impl Default for SetupWizard {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `message` and reads one trimmed line of input.
fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, message: &str) -> Result<String> {
    write!(output, "{}", message)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(anyhow!("Setup cancelled: input ended"));
    }
    Ok(line.trim().to_string())
}
