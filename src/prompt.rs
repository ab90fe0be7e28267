use crate::context::ContextBundle;

/// Instructions sent as the system prompt on every request.
///
/// The response is expected as terse Markdown with the runnable commands
/// repeated in a `<structured_commands>` JSON payload, which the formatter
/// hides and the extractor reads.
pub fn build_system_prompt() -> String {
    r#"You are a command-line assistant. The user asks how to do something in their shell.

Answer in concise Markdown:
- Start with a one or two sentence explanation.
- Put every command the user could run in a fenced ```bash code block.
- Use headings, lists and tables only when they help.
- Warn explicitly before anything destructive.

After the Markdown, append the commands again as JSON inside a
<structured_commands> block, exactly in this format:

<structured_commands>
{
  "commands": [
    {"command": "ls -la", "description": "List all files", "order": 1, "safe": true}
  ],
  "workflows": [
    {"name": "Short name", "description": "What the steps achieve",
     "steps": [{"command": "...", "description": "...", "order": 1, "safe": true}]}
  ]
}
</structured_commands>

RULES:
- "safe" is false for anything that deletes, overwrites, needs sudo or changes permissions
- "order" starts at 1
- Use "workflows" only for multi-step procedures; otherwise leave it empty
- Never put explanations inside the JSON"#
        .to_string()
}

/// The user message: the question, followed by the environment if any.
pub fn build_user_prompt(question: &str, context: Option<&ContextBundle>) -> String {
    match context {
        Some(context) => format!(
            "{}\n\n<context>\n{}</context>",
            question.trim(),
            context.to_prompt_section()
        ),
        None => question.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_requests_structured_block() {
        let prompt = build_system_prompt();
        assert!(prompt.contains("<structured_commands>"));
        assert!(prompt.contains("</structured_commands>"));
        assert!(prompt.contains("\"safe\""));
    }

    #[test]
    fn test_user_prompt_without_context() {
        assert_eq!(build_user_prompt("  list ports \n", None), "list ports");
    }

    #[test]
    fn test_user_prompt_with_context() {
        let context = ContextBundle {
            cwd: "/srv/app".to_string(),
            os: "linux".to_string(),
            ..ContextBundle::default()
        };
        let prompt = build_user_prompt("list ports", Some(&context));
        assert!(prompt.starts_with("list ports\n\n<context>\n"));
        assert!(prompt.contains("Working directory: /srv/app"));
        assert!(prompt.ends_with("</context>"));
    }
}
