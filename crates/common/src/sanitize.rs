//! Output sanitization for tool output
//!
//! Tool output is rendered by clients that may treat it as HTML, so angle
//! brackets are escaped and terminal colour codes are dropped.

use once_cell::sync::Lazy;
use regex::Regex;

static ANSI_ESCAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\x1b\[[0-9;?]*[ -/]*[@-~]").expect("valid ANSI regex"));

/// Neutralize markup and strip ANSI escape sequences.
pub fn sanitize_output(raw: &str) -> String {
    let plain = ANSI_ESCAPE.replace_all(raw, "");
    let mut out = String::with_capacity(plain.len());
    for c in plain.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
