//! # Logfmt Decoder
//!
//! File: cli/src/common/compose/logfmt.rs
//!
//! ## Overview
//!
//! Compose occasionally forwards logrus output from the Docker CLI, e.g.
//! `time="2024-01-01T00:00:00Z" level=warning msg="The \"FOO\" variable is not set."`.
//! This module decodes one such line into ordered key/value pairs.
//!
//! Bare keys (`key` with no `=`) decode to an empty value. Quoted values accept
//! the escapes `\"`, `\\`, `\n`, `\r`, `\t` and `\uXXXX`.
//!
use indexmap::IndexMap;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LogfmtError {
    #[error("unterminated quoted value for key '{0}'")]
    Unterminated(String),
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(String),
    #[error("unexpected character '{0}' at position {1}")]
    Unexpected(char, usize),
}

/// Parses one logfmt line.
pub fn parse_line(line: &str) -> Result<IndexMap<String, String>, LogfmtError> {
    let mut result = IndexMap::new();
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }

        let key_start = i;
        while i < chars.len() && !chars[i].is_whitespace() && chars[i] != '=' {
            if chars[i] == '"' {
                return Err(LogfmtError::Unexpected('"', i));
            }
            i += 1;
        }
        let key: String = chars[key_start..i].iter().collect();

        if i >= chars.len() || chars[i].is_whitespace() {
            result.insert(key, String::new());
            continue;
        }

        // Skip '='.
        i += 1;
        if i < chars.len() && chars[i] == '"' {
            i += 1;
            let mut value = String::new();
            let mut closed = false;
            while i < chars.len() {
                match chars[i] {
                    '"' => {
                        closed = true;
                        i += 1;
                        break;
                    }
                    '\\' => {
                        i += 1;
                        let Some(&esc) = chars.get(i) else {
                            return Err(LogfmtError::Unterminated(key));
                        };
                        match esc {
                            '"' => value.push('"'),
                            '\\' => value.push('\\'),
                            'n' => value.push('\n'),
                            'r' => value.push('\r'),
                            't' => value.push('\t'),
                            'u' => {
                                let hex: String = chars.iter().skip(i + 1).take(4).collect();
                                let decoded = u32::from_str_radix(&hex, 16)
                                    .ok()
                                    .filter(|_| hex.len() == 4)
                                    .and_then(char::from_u32)
                                    .ok_or_else(|| LogfmtError::InvalidEscape(format!("u{hex}")))?;
                                value.push(decoded);
                                i += 4;
                            }
                            other => return Err(LogfmtError::InvalidEscape(other.to_string())),
                        }
                        i += 1;
                    }
                    c => {
                        value.push(c);
                        i += 1;
                    }
                }
            }
            if !closed {
                return Err(LogfmtError::Unterminated(key));
            }
            result.insert(key, value);
        } else {
            let value_start = i;
            while i < chars.len() && !chars[i].is_whitespace() {
                i += 1;
            }
            result.insert(key, chars[value_start..i].iter().collect());
        }
    }
    Ok(result)
}
