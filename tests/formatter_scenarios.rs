use how::command_extractor::CommandExtractor;
use how::commands::{first_token, is_unsafe_token, Command, CommandCategory, ExtractedCommands};
use how::formatter::{normalize_whitespace, ResponseFormatter};
use how::formatter_config::{FormatterConfig, Preset};

const SAMPLE: &str = "# Disk usage\n\
Use **df** to see free space and `du` for *directories*.\n\
\n\
> Run as root to see every mount.\n\
\n\
- first item\n  - nested item\n1. numbered\n\
\n\
| Tool | Purpose |\n| --- | --- |\n| df | free space |\n\
\n\
```bash\n$ df -h\ndu -sh *\n```\n\
See [the manual](https://example.com/du) for more.\n\
<structured_commands>{\"commands\":[{\"command\":\"df -h\",\"order\":1,\"safe\":true}]}</structured_commands>\n";

fn all_plain_configs() -> Vec<FormatterConfig> {
    Preset::ALL
        .iter()
        .map(|p| p.config().without_colors())
        .collect()
}

#[test]
fn test_structured_commands_are_stripped() {
    let input = "Hello\n<structured_commands>\n{\"commands\":[]}\n</structured_commands>\nWorld";
    let output = ResponseFormatter::with_preset(Preset::Default).format(input);

    assert!(output.contains("Hello"));
    assert!(output.contains("World"));
    assert!(!output.contains("structured_commands"));
    assert!(!output.contains('{'));
}

#[test]
fn test_structured_commands_never_leak_in_any_preset() {
    for preset in Preset::ALL {
        let output = ResponseFormatter::with_preset(preset).format(SAMPLE);
        assert!(!output.contains("structured_commands"), "preset {}", preset);
    }
}

#[test]
fn test_fenced_code_with_line_numbers() {
    let config = FormatterConfig {
        show_line_numbers: true,
        comment_prefix: "# ".to_string(),
        indent_size: 2,
        use_colors: false,
        ..Preset::Default.config()
    };
    let output = ResponseFormatter::new(config).format("```go\nfunc main() {}\n```");

    let open = output.find("# ```go").unwrap();
    let body = output.find("#     1: func main() {}").unwrap();
    let close = output.rfind("# ```\n").unwrap();
    assert!(open < body && body < close);
}

#[test]
fn test_table_layout() {
    let output = ResponseFormatter::with_preset(Preset::Default).format("| A | BB |\n| - | -- |\n| 1 | 22 |");
    let lines: Vec<&str> = output.lines().collect();

    assert_eq!(lines[0], "# │ A │ BB │");
    assert!(lines[1].starts_with("# ├") && lines[1].contains('┼') && lines[1].ends_with('┤'));
    assert_eq!(lines[2], "# │ 1 │ 22 │");
    assert!(output.ends_with("\n\n"));
}

#[test]
fn test_word_wrap_respects_prefix_budget() {
    let config = FormatterConfig {
        line_width: 40,
        comment_prefix: "# ".to_string(),
        wrap_long_lines: true,
        ..Preset::Default.config()
    };
    let paragraph = "abcdefghi ".repeat(20);
    assert_eq!(paragraph.len(), 200);

    let output = ResponseFormatter::new(config).format(&paragraph);
    let lines: Vec<&str> = output.lines().collect();

    assert!(lines.len() > 1);
    assert!(lines.iter().all(|l| l.chars().count() <= 40));
    assert!(lines[0].starts_with("# abcdefghi"));
    assert!(lines[1..].iter().all(|l| l.starts_with("#   ")));
}

#[test]
fn test_boundary_lengths_fit_the_line() {
    let text: String = "abcd ".repeat(40);
    let config = Preset::Default.config();
    let width = config.line_width;
    let formatter = ResponseFormatter::new(config);

    for len in [0, 1, width, width + 1] {
        let input: String = text.chars().take(len).collect();
        let output = formatter.format(&input);
        for line in output.lines() {
            assert!(line.chars().count() <= width, "len {}: {:?}", len, line);
        }
    }
}

#[test]
fn test_long_word_is_never_split() {
    let word = "x".repeat(120);
    let output = ResponseFormatter::with_preset(Preset::Default).format(&format!("short {}", word));
    assert!(output.lines().any(|l| l.ends_with(&word)));
}

#[test]
fn test_no_escape_bytes_without_colors() {
    for config in all_plain_configs() {
        let input = format!("{}\x1b[1mbold\x1b[0m", SAMPLE);
        let output = ResponseFormatter::new(config).format(&input);
        assert!(!output.contains('\x1b'));
    }
}

#[test]
fn test_empty_prefix_emits_no_default_prefix() {
    let config = FormatterConfig {
        comment_prefix: String::new(),
        ..Preset::Default.config()
    };
    let output = ResponseFormatter::new(config).format(SAMPLE);

    assert!(!output.is_empty());
    assert!(output.lines().filter(|l| !l.is_empty()).all(|l| !l.starts_with("# ")));
}

#[test]
fn test_whitespace_normalisation_is_idempotent() {
    for input in [SAMPLE, "", "\r\n\r\n\r\nx\n\n\n\ny  \n", "a\n\n\n\n\n"] {
        let once = normalize_whitespace(input);
        assert_eq!(normalize_whitespace(&once), once);
    }
}

#[test]
fn test_fallback_extraction_scenario() {
    let extracted = CommandExtractor::new().extract("```bash\n$ ls -la\n# comment\n\nrm -rf /tmp/x\n```");

    assert_eq!(
        extracted.commands,
        vec![
            Command {
                command: "ls -la".to_string(),
                description: String::new(),
                order: 1,
                safe: true,
                category: CommandCategory::File,
            },
            Command {
                command: "rm -rf /tmp/x".to_string(),
                description: String::new(),
                order: 2,
                safe: false,
                category: CommandCategory::General,
            },
        ]
    );
    assert!(extracted.workflows.is_empty());
}

#[test]
fn test_structured_block_wins_over_fences() {
    let input = "Try this:\n```bash\nls\n```\n\
<structured_commands>{\"commands\":[{\"command\":\"pwd\",\"order\":1,\"safe\":true}]}</structured_commands>";
    let extracted = CommandExtractor::new().extract(input);

    assert_eq!(extracted.commands.len(), 1);
    assert_eq!(extracted.commands[0].command, "pwd");
}

#[test]
fn test_embedded_document_round_trips() {
    let document = ExtractedCommands {
        commands: vec![
            Command::classified("git status", "Show changes", 1),
            Command::classified("sudo apt update", "Refresh packages", 2),
            Command::classified("curl -I https://example.com", "Fetch headers", 3),
        ],
        workflows: vec![],
    };
    let json = document.to_compact_json().unwrap();
    let input = format!("Some prose first.\n\n<structured_commands>\n{}\n</structured_commands>\nTrailing text.", json);

    assert_eq!(CommandExtractor::new().extract(&input).commands, document.commands);
}

#[test]
fn test_extracted_commands_are_clean_ordered_and_classified() {
    let input = "```sh\n$ git pull\n> make build\n# just a comment\nsudo reboot\n\n   \nmv a b\n```\n\
text\n```\necho done\n```";
    let extracted = CommandExtractor::new().extract(input);

    assert_eq!(extracted.commands.len(), 5);
    for (i, command) in extracted.commands.iter().enumerate() {
        assert_eq!(command.order as usize, i + 1);
        assert!(!command.command.is_empty());
        for prefix in ["$ ", "# ", "> "] {
            assert!(!command.command.starts_with(prefix));
        }
        assert_eq!(command.safe, !is_unsafe_token(first_token(&command.command)));
    }
}
