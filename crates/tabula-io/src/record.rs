//! Framing-safe field codec for the dump format.
//!
//! One logical record per line; fields are separated by single spaces and
//! individually escaped so embedded separators, newlines, and backslashes
//! round-trip exactly. The empty field is written as `\e` so it stays
//! visible on the line.

/// Encode fields into one record line (without the trailing newline).
pub(crate) fn encode_fields(fields: &[&str]) -> String {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        push_escaped(&mut out, field);
    }
    out
}

fn push_escaped(out: &mut String, field: &str) {
    if field.is_empty() {
        out.push_str("\\e");
        return;
    }
    for c in field.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            ' ' => out.push_str("\\ "),
            _ => out.push(c),
        }
    }
}

/// Decode one record line into its fields. Returns a message on malformed
/// escapes; the caller attaches the line number.
pub(crate) fn decode_fields(line: &str) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            ' ' => {
                fields.push(std::mem::take(&mut current));
            }
            '\\' => match chars.next() {
                Some('\\') => current.push('\\'),
                Some('n') => current.push('\n'),
                Some('r') => current.push('\r'),
                Some('t') => current.push('\t'),
                Some(' ') => current.push(' '),
                Some('e') => {}
                Some(other) => return Err(format!("unknown escape \\{other}")),
                None => return Err("trailing backslash".to_string()),
            },
            _ => current.push(c),
        }
    }
    fields.push(current);
    Ok(fields)
}
