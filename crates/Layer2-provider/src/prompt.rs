//! Commit message prompt construction

use crate::r#trait::GenerateOptions;
use savepoint_foundation::MessageStyle;

/// Build the generation prompt for a truncated staged diff.
///
/// Custom-style instructions replace the structural rules entirely; every
/// other style gets the shared framing plus its own style rule.
pub fn build_prompt(diff: &str, options: &GenerateOptions) -> String {
    if options.style == MessageStyle::Custom {
        if let Some(instructions) = options
            .custom_instructions
            .as_deref()
            .filter(|s| !s.trim().is_empty())
        {
            return format!(
                "Generate a git commit message for the following staged changes.\n\n\
                 Instructions:\n{}\n\n\
                 Diff:\n```\n{}\n```\n\n\
                 Respond with only the commit message, nothing else.",
                instructions.trim(),
                diff
            );
        }
    }

    let mut rules = vec![format!("1. {}", style_rule(options))];
    rules.push(format!(
        "{}. Keep the message under {} characters",
        rules.len() + 1,
        options.length.max_chars()
    ));
    rules.push(format!(
        "{}. Respond with a single line - no body, no trailing period",
        rules.len() + 1
    ));
    rules.push(format!(
        "{}. Use imperative mood (\"add\" not \"added\")",
        rules.len() + 1
    ));
    if options.use_emojis && options.style != MessageStyle::Emoji {
        rules.push(format!(
            "{}. Prefix the message with one fitting emoji",
            rules.len() + 1
        ));
    }

    format!(
        "Generate a concise git commit message for the following staged changes.\n\n\
         Rules:\n{}\n\n\
         Diff:\n```\n{}\n```\n\n\
         Respond with only the commit message, nothing else.",
        rules.join("\n"),
        diff
    )
}

fn style_rule(options: &GenerateOptions) -> &'static str {
    match options.style {
        MessageStyle::Simple => "Write a plain, specific summary of the change",
        MessageStyle::Conventional => {
            "Use conventional commit format: type(scope): description. \
             Types: feat, fix, docs, style, refactor, perf, test, chore"
        }
        MessageStyle::Emoji => {
            "Start with a fitting gitmoji followed by a concise summary of the change"
        }
        // custom without instructions degrades to simple
        MessageStyle::Custom => "Write a plain, specific summary of the change",
    }
}
