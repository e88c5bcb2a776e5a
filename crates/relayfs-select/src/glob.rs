//! Path globs for path-match rules.
//!
//! `*` matches any run of characters including `/`, `?` a single character,
//! `[abc]`/`[!abc]` a character class. Everything else is literal.

use crate::error::{SelectError, SelectResult};
use regex::Regex;

/// A compiled path glob.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compile `pattern`.
    pub fn new(pattern: &str) -> SelectResult<Self> {
        let mut re = String::with_capacity(pattern.len() * 2 + 2);
        re.push('^');
        let mut chars = pattern.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '*' => re.push_str(".*"),
                '?' => re.push('.'),
                '[' => {
                    let mut class = String::new();
                    let mut closed = false;
                    if chars.peek() == Some(&'!') {
                        chars.next();
                        class.push('^');
                    }
                    for c in chars.by_ref() {
                        if c == ']' {
                            closed = true;
                            break;
                        }
                        if c == '\\' || c == '[' {
                            class.push('\\');
                        }
                        class.push(c);
                    }
                    if !closed {
                        return Err(SelectError::config(pattern, "unterminated character class"));
                    }
                    re.push('[');
                    re.push_str(&class);
                    re.push(']');
                }
                other => re.push_str(&regex::escape(&other.to_string())),
            }
        }
        re.push('$');

        let regex = Regex::new(&re)
            .map_err(|e| SelectError::config(pattern, format!("invalid glob: {}", e)))?;
        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Whether `path` matches.
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// The pattern as written.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}
