//! Properties format
//!
//! Parser for the Java `.properties` text format and the [`PropertyMap`] that
//! accumulates merged configuration. Comments start with `#` or `!`, keys end at
//! the first unescaped `=`, `:` or whitespace, and a trailing odd run of
//! backslashes joins the next physical line.

use crate::error::BootstrapError;
use std::collections::hash_map;
use std::collections::HashMap;

const WHITESPACE: [char; 3] = [' ', '\t', '\x0c'];

/// Nested `${...}` references deeper than this are left unresolved.
const MAX_SUBSTITUTION_DEPTH: usize = 8;

/// Merged configuration: string keys to string values, last write wins.
///
/// Variables are visible to `${...}` substitution only. They are not entries
/// and never show up in `get`, `len` or iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyMap {
    entries: HashMap<String, String>,
    variables: HashMap<String, String>,
}

impl PropertyMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `text` and overwrite its pairs into this map.
    ///
    /// Returns the number of pairs read. On a parse error the map is left
    /// untouched.
    pub fn load_str(&mut self, text: &str) -> Result<usize, BootstrapError> {
        let pairs = parse(text)?;
        let count = pairs.len();
        self.entries.extend(pairs);
        Ok(count)
    }

    /// Overwrite every key of `other` into this map. Returns how many keys
    /// were written.
    pub fn merge_from(&mut self, other: PropertyMap) -> usize {
        let count = other.entries.len();
        self.entries.extend(other.entries);
        self.variables.extend(other.variables);
        count
    }

    /// Define a substitution variable that takes precedence over the
    /// environment and over entries of the same name.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.entries.insert(key.into(), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keys starting with `prefix.`, yielded with the prefix and dot removed.
    pub fn with_prefix<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.iter().filter_map(move |(key, value)| {
            key.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
                .filter(|rest| !rest.is_empty())
                .map(|rest| (rest, value))
        })
    }

    /// Value of `key` with `${...}` references expanded.
    pub fn get_substituted(&self, key: &str) -> Option<String> {
        self.get(key).map(|value| self.substitute(value))
    }

    /// Expand `${name}` references in `value`.
    ///
    /// Names resolve against variables first, then the process environment,
    /// then this map's entries. Unknown names expand to the empty string; an
    /// unterminated `${` is kept verbatim.
    pub fn substitute(&self, value: &str) -> String {
        self.substitute_at_depth(value, 0)
    }

    fn substitute_at_depth(&self, value: &str, depth: usize) -> String {
        if depth >= MAX_SUBSTITUTION_DEPTH {
            return value.to_string();
        }

        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = &after[..end];
            let resolved = self
                .variable(name)
                .map(str::to_string)
                .or_else(|| std::env::var(name).ok())
                .or_else(|| self.get(name).map(str::to_string));
            if let Some(resolved) = resolved {
                out.push_str(&self.substitute_at_depth(&resolved, depth + 1));
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            variables: HashMap::new(),
        }
    }
}

impl IntoIterator for PropertyMap {
    type Item = (String, String);
    type IntoIter = hash_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Parse properties text into key/value pairs, in file order.
pub fn parse(text: &str) -> Result<Vec<(String, String)>, BootstrapError> {
    logical_lines(text)
        .into_iter()
        .map(|(line_no, line)| {
            let (key, value) = split_entry(&line);
            Ok((unescape(key, line_no)?, unescape(value, line_no)?))
        })
        .collect()
}

/// Join continuation lines and drop blanks and comments. Each logical line is
/// paired with the 1-based number of its first physical line.
fn logical_lines(text: &str) -> Vec<(usize, String)> {
    let mut out = Vec::new();
    let mut current: Option<(usize, String)> = None;

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim_start_matches(WHITESPACE);
        if current.is_none()
            && (trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!'))
        {
            continue;
        }

        let trailing = trimmed.chars().rev().take_while(|c| *c == '\\').count();
        let continues = trailing % 2 == 1;
        let body = if continues {
            &trimmed[..trimmed.len() - 1]
        } else {
            trimmed
        };

        let (line_no, mut buf) = current.take().unwrap_or_else(|| (idx + 1, String::new()));
        buf.push_str(body);
        if continues {
            current = Some((line_no, buf));
        } else {
            out.push((line_no, buf));
        }
    }

    if let Some(last) = current {
        out.push(last);
    }
    out
}

/// Split a logical line into its raw (still escaped) key and value.
fn split_entry(line: &str) -> (&str, &str) {
    let mut key_end = line.len();
    let mut value_start = line.len();
    let mut has_separator = false;
    let mut escaped = false;

    for (i, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => {
                key_end = i;
                value_start = i + 1;
                has_separator = true;
                break;
            }
            ' ' | '\t' | '\x0c' => {
                key_end = i;
                value_start = i + 1;
                break;
            }
            _ => {}
        }
    }

    let mut value = line[value_start..].trim_start_matches(WHITESPACE);
    if !has_separator {
        if let Some(stripped) = value.strip_prefix(['=', ':']) {
            value = stripped.trim_start_matches(WHITESPACE);
        }
    }
    (&line[..key_end], value)
}

fn unescape(raw: &str, line: usize) -> Result<String, BootstrapError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    let mut high_surrogate: Option<u16> = None;

    while let Some(c) = chars.next() {
        if c != '\\' {
            flush_surrogate(&mut out, &mut high_surrogate);
            out.push(c);
            continue;
        }

        match chars.next() {
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                if hex.len() != 4 || !hex.chars().all(|h| h.is_ascii_hexdigit()) {
                    return Err(BootstrapError::Parse {
                        line,
                        message: format!("malformed \\uxxxx encoding: \\u{}", hex),
                    });
                }
                let unit = u16::from_str_radix(&hex, 16).map_err(|e| BootstrapError::Parse {
                    line,
                    message: e.to_string(),
                })?;
                push_utf16_unit(&mut out, &mut high_surrogate, unit);
            }
            other => {
                flush_surrogate(&mut out, &mut high_surrogate);
                match other {
                    Some('t') => out.push('\t'),
                    Some('n') => out.push('\n'),
                    Some('r') => out.push('\r'),
                    Some('f') => out.push('\x0c'),
                    Some(c) => out.push(c),
                    // A lone trailing backslash is dropped.
                    None => {}
                }
            }
        }
    }

    flush_surrogate(&mut out, &mut high_surrogate);
    Ok(out)
}

fn push_utf16_unit(out: &mut String, high_surrogate: &mut Option<u16>, unit: u16) {
    match (high_surrogate.take(), unit) {
        (Some(high), 0xDC00..=0xDFFF) => {
            for decoded in char::decode_utf16([high, unit]) {
                out.push(decoded.unwrap_or(char::REPLACEMENT_CHARACTER));
            }
        }
        (pending, 0xD800..=0xDBFF) => {
            if pending.is_some() {
                out.push(char::REPLACEMENT_CHARACTER);
            }
            *high_surrogate = Some(unit);
        }
        (pending, _) => {
            if pending.is_some() {
                out.push(char::REPLACEMENT_CHARACTER);
            }
            out.push(char::from_u32(u32::from(unit)).unwrap_or(char::REPLACEMENT_CHARACTER));
        }
    }
}

fn flush_surrogate(out: &mut String, high_surrogate: &mut Option<u16>) {
    if high_surrogate.take().is_some() {
        out.push(char::REPLACEMENT_CHARACTER);
    }
}
