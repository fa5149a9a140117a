//! devcontainer.json configuration parsing
//!
//! Only the fields burrow acts on are extracted. Everything else in the file
//! is ignored, including fields with unexpected types.

use crate::{ConfigError, Result};
use serde_json::Value;

/// Locations checked for a devcontainer.json, in order of preference
pub const DEVCONTAINER_PATHS: [&str; 2] = [".devcontainer/devcontainer.json", "devcontainer.json"];

/// The parts of a devcontainer.json that burrow uses
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevContainerConfig {
    /// Base image, trimmed and never empty
    pub image: Option<String>,
}

impl DevContainerConfig {
    /// Parse devcontainer.json content. `origin` is only used in errors.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let value = parse_jsonc(content).map_err(|source| ConfigError::JsonParseError {
            origin: origin.to_string(),
            source,
        })?;
        Ok(Self::from_value(&value))
    }

    fn from_value(value: &Value) -> Self {
        let image = value
            .get("image")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);
        Self { image }
    }
}

/// Parse JSON that may contain comments.
///
/// Strict JSON is tried first; comments are only stripped when that fails.
pub fn parse_jsonc(content: &str) -> std::result::Result<Value, serde_json::Error> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(_) => serde_json::from_str(&strip_json_comments(content)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Code,
    InString,
    StringEscape,
    LineComment,
    BlockComment,
}

/// Strip `//` and `/* */` comments that appear outside string literals.
///
/// Newlines ending a line comment are kept so line numbers in later parse
/// errors still match the input.
pub fn strip_json_comments(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut state = ScanState::Code;

    while let Some(c) = chars.next() {
        state = match state {
            ScanState::Code => match c {
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    ScanState::LineComment
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    ScanState::BlockComment
                }
                '"' => {
                    result.push(c);
                    ScanState::InString
                }
                _ => {
                    result.push(c);
                    ScanState::Code
                }
            },
            ScanState::InString => {
                result.push(c);
                match c {
                    '\\' => ScanState::StringEscape,
                    '"' => ScanState::Code,
                    _ => ScanState::InString,
                }
            }
            ScanState::StringEscape => {
                result.push(c);
                ScanState::InString
            }
            ScanState::LineComment => {
                if c == '\n' {
                    result.push(c);
                    ScanState::Code
                } else {
                    ScanState::LineComment
                }
            }
            ScanState::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    ScanState::Code
                } else {
                    ScanState::BlockComment
                }
            }
        };
    }

    result
}
