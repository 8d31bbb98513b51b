//! Redis-style glob patterns for key searches

use regex::Regex;

use crate::domain::DomainError;

const SPECIAL: [char; 5] = ['*', '?', '[', ']', '\\'];

/// Escapes glob metacharacters so `input` matches only itself
pub fn escape(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// Compiled glob pattern with the same semantics as Redis `KEYS`/`SCAN MATCH`
///
/// Supports `*`, `?`, `[abc]`, `[^a]`, `[a-z]` and backslash escapes.
#[derive(Debug, Clone)]
pub struct GlobPattern {
    source: String,
    regex: Regex,
}

impl GlobPattern {
    /// Compiles a glob pattern
    pub fn new(pattern: &str) -> Result<Self, DomainError> {
        let regex = Regex::new(&Self::to_regex(pattern)).map_err(|e| {
            DomainError::validation(format!("Invalid key pattern '{}': {}", pattern, e))
        })?;

        Ok(Self {
            source: pattern.to_string(),
            regex,
        })
    }

    /// Returns the original glob
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Returns true if `key` matches the whole pattern
    pub fn is_match(&self, key: &str) -> bool {
        self.regex.is_match(key)
    }

    fn to_regex(pattern: &str) -> String {
        let mut out = String::with_capacity(pattern.len() * 2 + 2);
        out.push('^');

        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '*' => out.push_str(".*"),
                '?' => out.push('.'),
                '\\' => match chars.next() {
                    Some(next) => out.push_str(&regex::escape(&next.to_string())),
                    None => out.push_str(&regex::escape("\\")),
                },
                '[' => {
                    let negated = chars.peek() == Some(&'^');
                    if negated {
                        chars.next();
                    }

                    // `class` is the regex body, `literal` the same text matched verbatim
                    let mut class = String::new();
                    let mut literal = String::from(if negated { "\\[\\^" } else { "\\[" });
                    let mut closed = false;

                    while let Some(inner) = chars.next() {
                        match inner {
                            ']' => {
                                closed = true;
                                break;
                            }
                            '\\' => {
                                if let Some(escaped) = chars.next() {
                                    let escaped = regex::escape(&escaped.to_string());
                                    class.push_str(&escaped);
                                    literal.push_str(&escaped);
                                }
                            }
                            '-' => {
                                class.push('-');
                                literal.push('-');
                            }
                            other => {
                                let escaped = regex::escape(&other.to_string());
                                class.push_str(&escaped);
                                literal.push_str(&escaped);
                            }
                        }
                    }

                    if closed && !class.is_empty() {
                        out.push('[');
                        if negated {
                            out.push('^');
                        }
                        out.push_str(&class);
                        out.push(']');
                    } else {
                        // Unterminated or empty class: Redis treats the bracket literally
                        out.push_str(&literal);
                        if closed {
                            out.push_str("\\]");
                        }
                    }
                }
                other => out.push_str(&regex::escape(&other.to_string())),
            }
        }

        out.push('$');
        out
    }
}
