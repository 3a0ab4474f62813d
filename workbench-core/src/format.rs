// workbench-core/src/format.rs

//! Turns captured command output into text for tool responses.

use crate::runner::CommandOutput;

/// Lines kept per stream when no other limit is configured.
pub const DEFAULT_MAX_LINES: usize = 300;

/// Labeled STDOUT/STDERR blocks, each trimmed to its last `max_lines` lines.
/// Empty streams are left out; two empty streams give an empty string.
pub fn format_output(result: &CommandOutput, max_lines: usize) -> String {
    [("STDOUT", result.stdout.as_str()), ("STDERR", result.stderr.as_str())]
        .into_iter()
        .filter_map(|(label, text)| format_stream(label, text, max_lines))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Exit-code sentence, followed by whatever the command printed.
pub fn format_failure(result: &CommandOutput, max_lines: usize) -> String {
    let headline = format!("Command failed with exit code {}.", result.status);
    let output = format_output(result, max_lines);
    if output.is_empty() {
        headline
    } else {
        format!("{}\n\n{}", headline, output)
    }
}

/// One step of a multi-step report: `[label]` then the output, or the failure
/// text if the step exited non-zero.
pub fn format_step(label: &str, result: &CommandOutput, max_lines: usize) -> String {
    let body = if result.success() {
        let output = format_output(result, max_lines);
        if output.is_empty() {
            "(no output)".to_string()
        } else {
            output
        }
    } else {
        format_failure(result, max_lines)
    };
    format!("[{}]\n{}", label, body)
}

fn format_stream(label: &str, text: &str, max_lines: usize) -> Option<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let trimmed = normalized.trim_end();
    if trimmed.is_empty() {
        return None;
    }

    let lines: Vec<&str> = trimmed.split('\n').collect();
    let body = if lines.len() > max_lines {
        let skipped = lines.len() - max_lines;
        format!("[trimmed {} lines]\n{}", skipped, lines[skipped..].join("\n"))
    } else {
        trimmed.to_string()
    };
    Some(format!("{}:\n{}", label, body))
}

/// Char-safe shortening for log lines; appends `...` when cut.
pub fn preview(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        None => input.to_string(),
        Some(_) if max_chars < 3 => input.chars().take(max_chars).collect(),
        Some(_) => {
            let kept: String = input.chars().take(max_chars - 3).collect();
            format!("{}...", kept)
        }
    }
}
