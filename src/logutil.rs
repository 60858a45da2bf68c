//! Helpers that keep log lines single-line and bounded.

/// Lowercase hex of the first `max` bytes, with a `..` marker when truncated.
pub fn hex_snippet(data: &[u8], max: usize) -> String {
    use std::fmt::Write;
    let shown = data.len().min(max);
    let mut out = String::with_capacity(shown * 2 + 2);
    for b in &data[..shown] {
        let _ = write!(&mut out, "{:02x}", b);
    }
    if data.len() > max {
        out.push_str("..");
    }
    out
}

/// Device-supplied text (firmware descriptor and the like) made safe for a
/// single log line. Printable ASCII passes through, everything else is
/// shown as an escape, and the result stops after `MAX_TEXT` characters.
pub fn escape_log(s: &str) -> String {
    const MAX_TEXT: usize = 120;
    let mut out = String::with_capacity(s.len().min(MAX_TEXT) + 2);
    for c in s.chars().take(MAX_TEXT) {
        match c {
            ' '..='~' if c != '\\' => out.push(c),
            c => out.extend(c.escape_default()),
        }
    }
    if s.chars().nth(MAX_TEXT).is_some() {
        out.push_str("..");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_snippet_truncates() {
        assert_eq!(hex_snippet(&[0x7B, 0x84, 0x0A], 8), "7b840a");
        assert_eq!(hex_snippet(&[1, 2, 3, 4], 2), "0102..");
        assert_eq!(hex_snippet(&[], 4), "");
    }

    #[test]
    fn escapes_control_chars() {
        assert_eq!(escape_log("MiniR4\r\n\u{0}"), "MiniR4\\r\\n\\u{0}");
        assert_eq!(escape_log("a\\b"), "a\\\\b");
        assert!(escape_log(&"x".repeat(200)).ends_with(".."));
    }
}
