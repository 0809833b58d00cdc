//! File-name cleanup

/// Characters no supported filesystem accepts in a file name.
const INVALID: &[char] = &['\\', '/', '*', '?', '"', '<', '>', '|'];

/// Make `name` safe to use as a single path component.
///
/// Colons become ` -`, other reserved and control characters are dropped,
/// runs of whitespace collapse to one space and trailing dots are removed.
pub fn sanitize_file_name(name: &str) -> String {
    let mut cleaned = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            ':' => cleaned.push_str(" -"),
            c if INVALID.contains(&c) || c.is_control() => {}
            c => cleaned.push(c),
        }
    }

    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.trim_end_matches('.').trim_end().to_string()
}
