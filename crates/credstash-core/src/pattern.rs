//! Shell-style name patterns
//!
//! `*` matches any run of characters (including `/`), `?` matches one character and
//! `[...]` is a character class. Everything else is literal: backslash is an ordinary
//! character and braces never form alternations.

use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobMatcher};

/// Compiled credential-name pattern
#[derive(Debug, Clone)]
pub struct NamePattern {
    pattern: String,
    /// `None` matches every name
    matcher: Option<GlobMatcher>,
}

impl NamePattern {
    /// Compile a pattern; malformed classes fail with `InvalidArgument`.
    pub fn new(pattern: &str) -> Result<Self> {
        let glob = GlobBuilder::new(&escape_braces(pattern))
            .literal_separator(false)
            .backslash_escape(false)
            .build()
            .map_err(|e| Error::invalid_argument(format!("invalid pattern '{}': {}", pattern, e)))?;

        Ok(Self {
            pattern: pattern.to_string(),
            matcher: Some(glob.compile_matcher()),
        })
    }

    /// Pattern matching every name
    pub fn any() -> Self {
        Self {
            pattern: "*".to_string(),
            matcher: None,
        }
    }

    pub fn is_match(&self, name: &str) -> bool {
        match &self.matcher {
            Some(matcher) => matcher.is_match(name),
            None => true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }
}

/// Wrap `{` and `}` outside character classes in single-character classes so the
/// glob engine reads them literally.
fn escape_braces(pattern: &str) -> String {
    let mut escaped = String::with_capacity(pattern.len());
    let mut in_class = false;
    // Members seen since the class opened; a leading `]` or negation is a member
    let mut class_len = 0;

    for c in pattern.chars() {
        if in_class {
            if c == ']' && class_len > 0 {
                in_class = false;
            } else if !(class_len == 0 && (c == '!' || c == '^')) {
                class_len += 1;
            }
            escaped.push(c);
            continue;
        }

        match c {
            '{' => escaped.push_str("[{]"),
            '}' => escaped.push_str("[}]"),
            '[' => {
                in_class = true;
                class_len = 0;
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }

    escaped
}
