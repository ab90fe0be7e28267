//! how - ask an LLM how to do something in your shell.
//!
//! The library turns a raw assistant answer into something pleasant to read
//! in a terminal and pulls the runnable commands out of it. Around that core
//! sit the pieces the `how` binary needs to get an answer in the first place:
//!
//! - **Rendering** of Markdown-ish answers with presets for plain, coloured
//!   and compact output
//! - **Command extraction** from a `<structured_commands>` JSON block, with a
//!   fallback to fenced shell code
//! - **Providers** for Anthropic, OpenAI-compatible servers and an offline mock
//! - **Context** about the shell, directory and git state sent with a question
//! - **History** of past questions in a JSON-lines log
//!
//! # Architecture
//!
//! - [`formatter`] - Response renderer ([`formatter::ResponseFormatter`])
//! - [`formatter_config`] - Formatter options and presets
//! - [`layout`] - Word wrapping and table drawing
//! - [`patterns`] - Compiled regular expressions shared by the renderer and extractor
//! - [`command_extractor`] - Pulls commands and workflows out of a response
//! - [`commands`] - Command, workflow and category types
//! - [`config`] - Configuration file and environment overrides
//! - [`http_client`] - HTTP client abstraction
//! - [`llm_provider`] - Provider implementations
//! - [`prompt`] - System and user prompt construction
//! - [`context`] - Shell context gathering
//! - [`history`] - Conversation log
//! - [`app`] - One question from prompt to printed answer
//! - [`display`] - Command, history and provider listings
//! - [`setup_ui`] - Interactive setup wizard
//! - [`installer`] - Self-install onto the PATH
//!
//! # Example
//!
//! ```
//! use how::command_extractor::CommandExtractor;
//! use how::formatter::ResponseFormatter;
//! use how::formatter_config::Preset;
//!
//! let raw = "Free space:\n\n```bash\ndf -h\n```\n";
//! let rendered = ResponseFormatter::with_preset(Preset::Default).format(raw);
//! assert!(rendered.contains("df -h"));
//!
//! let extracted = CommandExtractor::new().extract(raw);
//! assert_eq!(extracted.commands[0].command, "df -h");
//! ```

pub mod app;
pub mod command_extractor;
pub mod commands;
pub mod config;
pub mod context;
pub mod display;
pub mod formatter;
pub mod formatter_config;
pub mod history;
pub mod http_client;
pub mod installer;
pub mod layout;
pub mod llm_provider;
pub mod patterns;
pub mod prompt;
pub mod setup_ui;
