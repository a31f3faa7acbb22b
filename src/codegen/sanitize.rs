//! Normalization of raw model responses into plain source text.
//!
//! Models wrap code in prose and Markdown fences despite being told not to.
//! The sanitizer strips that wrapping without touching the code itself: it
//! never repairs quotes or commas, that is the validator's job to reject.

/// Clean a raw model response down to executable source text.
///
/// Steps, in order:
/// 1. If the response contains a fenced code block, keep only the first
///    block's contents.
/// 2. Drop introductory prose lines ("Here is the code:" and the like).
/// 3. Map smart quotes to their ASCII equivalents.
/// 4. Remove any common leading indentation.
/// 5. Trim leading blank lines and guarantee a trailing newline.
pub fn sanitize(raw: &str) -> String {
    let text = extract_fenced_block(raw).unwrap_or(raw);
    let text = ascii_quotes(text);

    let lines: Vec<&str> = text
        .lines()
        .skip_while(|line| is_prose_preamble(line))
        .collect();

    let indent = common_indent(&lines);
    let mut out = String::new();
    let mut seen_content = false;
    for line in &lines {
        let stripped = strip_indent(line, indent);
        if !seen_content && stripped.trim().is_empty() {
            continue;
        }
        seen_content = true;
        out.push_str(stripped);
        out.push('\n');
    }

    while out.ends_with("\n\n") {
        out.pop();
    }
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Contents of the first ```-fenced block, if the text has one.
fn extract_fenced_block(text: &str) -> Option<&str> {
    let open = text.find("```")?;
    let after_marker = &text[open + 3..];
    // Skip the info string ("python") up to the end of the fence line
    let body_start = after_marker.find('\n')? + 1;
    let body = &after_marker[body_start..];
    match body.find("```") {
        Some(close) => Some(&body[..close]),
        None => Some(body),
    }
}

fn is_prose_preamble(line: &str) -> bool {
    let lower = line.trim().to_lowercase();
    if lower.is_empty() {
        return false;
    }
    lower.contains("here is the code")
        || lower.contains("here's the code")
        || lower.contains("here is the program")
        || lower.ends_with("the following program:")
}

fn ascii_quotes(text: &str) -> String {
    text.replace(['\u{201c}', '\u{201d}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
}

fn common_indent(lines: &[&str]) -> usize {
    lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start_matches([' ', '\t']).len())
        .min()
        .unwrap_or(0)
}

fn strip_indent(line: &str, indent: usize) -> &str {
    let boundary = line
        .char_indices()
        .take(indent)
        .take_while(|(_, c)| *c == ' ' || *c == '\t')
        .count();
    &line[boundary..]
}
