//! Debian control-file (deb822) parsing.
//!
//! Used for `var/lib/dpkg/status` and apt `*_Packages` index files. Only
//! the subset of the format those files use is supported: paragraphs
//! separated by blank lines, `Field: value` lines, and continuation lines
//! starting with whitespace.
//!
//! Relationship fields (`Depends`, `Pre-Depends`, `Recommends`) are parsed
//! down to names and architecture qualifiers. Version constraints and build
//! profiles are dropped: the dependency graph only needs to know *which*
//! package satisfies a clause, not *whether* a given version does.

#![allow(clippy::module_name_repetitions)]

use std::collections::BTreeSet;

use crate::package::{Alternative, ArchQualifier};

/// Errors produced while parsing a control file.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControlError {
    #[error("line {line}: expected `Field: value`, found {text:?}")]
    MissingColon { line: usize, text: String },

    #[error("line {line}: continuation line outside of a field")]
    OrphanContinuation { line: usize },
}

/// One control-file paragraph (stanza).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
    fields: Vec<(String, String)>,
}

impl Paragraph {
    /// Look up a field by name, case-insensitively.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(field))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn push(&mut self, name: &str, value: &str) {
        self.fields.push((name.to_string(), value.to_string()));
    }

    fn append_continuation(&mut self, text: &str) -> bool {
        let Some((_, value)) = self.fields.last_mut() else {
            return false;
        };
        value.push('\n');
        value.push_str(text);
        true
    }
}

/// Split `text` into paragraphs.
///
/// # Errors
///
/// Returns [`ControlError`] with the 1-based line number of the first
/// malformed line.
pub fn parse_paragraphs(text: &str) -> Result<Vec<Paragraph>, ControlError> {
    let mut paragraphs = Vec::new();
    let mut current = Paragraph::default();

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if line.starts_with(' ') || line.starts_with('\t') {
            if !current.append_continuation(line.trim()) {
                return Err(ControlError::OrphanContinuation { line: line_no });
            }
            continue;
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(ControlError::MissingColon {
                line: line_no,
                text: line.to_string(),
            });
        };
        current.push(name.trim(), value.trim());
    }

    if !current.is_empty() {
        paragraphs.push(current);
    }

    Ok(paragraphs)
}

/// Parse a relationship field into OR groups of alternatives.
///
/// `pkg (>= 1.0) [amd64] <!nocheck>, a:any | b` yields
/// `[[pkg], [a:any, b]]`. Alternatives whose architecture restriction
/// excludes `native_arch` are dropped, as is any group left empty.
#[must_use]
pub fn parse_relations(field: &str, native_arch: &str) -> Vec<Vec<Alternative>> {
    field
        .split(',')
        .map(|group| {
            group
                .split('|')
                .filter_map(|alt| parse_alternative(alt, native_arch))
                .collect::<Vec<_>>()
        })
        .filter(|group| !group.is_empty())
        .collect()
}

/// Parse a `Provides` field into its virtual names.
#[must_use]
pub fn parse_provides(field: &str) -> BTreeSet<String> {
    field
        .split(',')
        .filter_map(|entry| {
            let name = strip_delimited(entry, '(', ')');
            let name = name.split_whitespace().next()?;
            let name = name.split_once(':').map_or(name, |(n, _)| n);
            Some(name.to_string())
        })
        .collect()
}

fn parse_alternative(text: &str, native_arch: &str) -> Option<Alternative> {
    if let Some(restriction) = delimited(text, '[', ']') {
        if !arch_restriction_allows(restriction, native_arch) {
            return None;
        }
    }

    let text = strip_delimited(text, '(', ')');
    let text = strip_delimited(&text, '[', ']');
    let text = strip_delimited(&text, '<', '>');
    let token = text.split_whitespace().next()?;

    let (name, qualifier) = token.split_once(':').unwrap_or((token, ""));
    if name.is_empty() {
        return None;
    }

    Some(Alternative::new(name).with_arch(ArchQualifier::from(qualifier)))
}

/// `[amd64 i386]` allows only the listed architectures; `[!armhf]` allows
/// everything but the listed ones.
fn arch_restriction_allows(restriction: &str, native_arch: &str) -> bool {
    let arches: Vec<&str> = restriction.split_whitespace().collect();
    if arches.is_empty() {
        return true;
    }
    if arches.iter().all(|a| a.starts_with('!')) {
        !arches.iter().any(|a| &a[1..] == native_arch)
    } else {
        arches.iter().any(|a| *a == native_arch)
    }
}

fn delimited(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text[start..].find(close)? + start;
    Some(&text[start + open.len_utf8()..end])
}

/// Remove every `open … close` span from `text`.
fn strip_delimited(text: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(text.len());
    let mut depth = 0usize;
    for c in text.chars() {
        if c == open {
            depth += 1;
        } else if c == close && depth > 0 {
            depth -= 1;
        } else if depth == 0 {
            out.push(c);
        }
    }
    out
}
