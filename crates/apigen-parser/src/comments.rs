//! Documentation-comment collection.
//!
//! Comment blocks are read from raw source lines rather than the token
//! stream: the parser already knows the line an `API_*` tag sits on, and
//! walking lines upward is simpler than buffering trivia tokens.

/// Collect the documentation block preceding `tag_line` (1-based).
///
/// Walks back through blank lines, then collects the contiguous run of
/// `//`/`///` lines. Single-slash comments are normalized to `///`; a lone
/// summary line is wrapped in `<summary>`/`</summary>`.
pub fn collect_comment(lines: &[&str], tag_line: u32) -> Vec<String> {
    let mut index = tag_line as usize - 1; // 0-based index of the tag line
    let mut collected: Vec<String> = Vec::new();

    // Skip trailing blank lines between the comment and the tag.
    while index > 0 && lines[index - 1].trim().is_empty() {
        index -= 1;
    }

    while index > 0 {
        let line = lines[index - 1].trim();
        if !line.starts_with("//") {
            break;
        }
        collected.push(normalize(line));
        index -= 1;
    }
    collected.reverse();

    if collected.len() == 1 && !collected[0].contains("<summary>") {
        let body = collected.pop().unwrap();
        collected.push("/// <summary>".to_string());
        collected.push(body);
        collected.push("/// </summary>".to_string());
    }
    collected
}

/// Normalize a raw comment line to the `///` form.
fn normalize(line: &str) -> String {
    if line.starts_with("///") {
        line.to_string()
    } else {
        // "// text" -> "/// text"
        format!("/{line}")
    }
}
