use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use how::app::{App, AskOptions};
use how::config::Config;
use how::formatter_config::Preset;
use how::installer;
use how::setup_ui::SetupWizard;
use is_terminal::IsTerminal;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("how")
        .about("Ask how to do something in your shell")
        .long_about(
            "how sends your question, along with a little context about your shell, \
             to an LLM and prints a readable answer followed by the commands it suggests",
        )
        .args_conflicts_with_subcommands(true)
        .arg(Arg::new("question")
            .help("What you want to do, in plain words")
            .num_args(1..))
        .arg(Arg::new("preset")
            .long("preset")
            .short('p')
            .help("Display preset: default, colored or compact")
            .value_name("PRESET")
            .value_parser(value_parser!(Preset)))
        .arg(Arg::new("provider")
            .long("provider")
            .help("Provider to use instead of the current one")
            .value_name("NAME"))
        .arg(Arg::new("no-context")
            .long("no-context")
            .help("Do not send shell history, files or git status")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("stream")
            .long("stream")
            .help("Show the answer as it arrives")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("json")
            .long("json")
            .help("Print only the extracted commands as JSON")
            .action(ArgAction::SetTrue))
        .arg(Arg::new("config")
            .long("config")
            .help("Show configuration information")
            .action(ArgAction::SetTrue))
        .subcommand(Command::new("setup").about("Configure a provider interactively"))
        .subcommand(Command::new("history")
            .about("List, show or clear past questions")
            .arg(Arg::new("limit")
                .long("limit")
                .short('n')
                .help("Number of entries to list")
                .value_name("N")
                .default_value("10")
                .value_parser(value_parser!(usize)))
            .arg(Arg::new("show")
                .long("show")
                .help("Re-render entry N (1 is the newest)")
                .value_name("N")
                .value_parser(value_parser!(usize)))
            .arg(Arg::new("clear")
                .long("clear")
                .help("Delete the history")
                .action(ArgAction::SetTrue)
                .conflicts_with("show")))
        .subcommand(Command::new("providers")
            .about("List configured providers or switch the current one")
            .arg(Arg::new("use")
                .long("use")
                .help("Make NAME the current provider")
                .value_name("NAME")))
        .subcommand(Command::new("install")
            .about("Copy this binary into a directory on your PATH")
            .arg(Arg::new("dir")
                .long("dir")
                .help("Target directory (default ~/.local/bin)")
                .value_name("DIR")
                .value_parser(value_parser!(PathBuf))))
}

fn colors_allowed() -> bool {
    io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

fn ask_options(matches: &ArgMatches) -> AskOptions {
    AskOptions {
        preset: matches.get_one::<Preset>("preset").copied(),
        provider: matches.get_one::<String>("provider").cloned(),
        no_context: matches.get_flag("no-context"),
        stream: matches.get_flag("stream"),
        json: matches.get_flag("json"),
        colors_allowed: colors_allowed(),
    }
}

/// The config as stored on disk, without environment overrides, for commands
/// that save it back.
fn stored_config() -> anyhow::Result<Config> {
    Config::load_from(&Config::get_config_path()?)
}

async fn run() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    if matches.get_flag("config") {
        return Config::show_config_info();
    }

    match matches.subcommand() {
        Some(("setup", _)) => {
            let config = SetupWizard::new().run(stored_config()?)?;
            config.save()?;
            println!("Configuration saved to {}", Config::get_config_path()?.display());
            return Ok(());
        }
        Some(("install", sub)) => {
            let report = installer::install(sub.get_one::<PathBuf>("dir").map(PathBuf::as_path))?;
            println!("✅ Installed to {}", report.target.display());
            if !report.on_path {
                let dir = report.target.parent().map(|d| d.display().to_string()).unwrap_or_default();
                eprintln!("⚠ {} is not on your PATH. Add it with:", dir);
                eprintln!("  export PATH=\"{}:$PATH\"", dir);
            }
            return Ok(());
        }
        Some(("providers", sub)) => {
            if let Some(name) = sub.get_one::<String>("use") {
                let mut config = stored_config()?;
                config.set_current_provider(name)?;
                config.save()?;
                println!("✅ Current provider is now '{}'", name);
                return Ok(());
            }
            return App::new(Config::load()?)?.list_providers(&mut io::stdout());
        }
        Some(("history", sub)) => {
            let app = App::new(Config::load()?)?;
            let mut stdout = io::stdout();
            if sub.get_flag("clear") {
                return app.clear_history(&mut stdout);
            }
            if let Some(index) = sub.get_one::<usize>("show") {
                return app.show_history_entry(*index, &ask_options(&matches), &mut stdout);
            }
            let limit = sub.get_one::<usize>("limit").copied().unwrap_or(10);
            return app.list_history(limit, &mut stdout);
        }
        _ => {}
    }

    let question: Vec<String> = matches
        .get_many::<String>("question")
        .unwrap_or_default()
        .map(|s| s.to_string())
        .collect();

    if question.is_empty() {
        eprintln!("No question provided. Use 'how --help' for usage information.");
        return Ok(());
    }

    let question = question.join(" ");
    info!("Processing question: {}", question);

    let app = App::new(Config::load()?)?;
    app.ask(&question, &ask_options(&matches)).await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
