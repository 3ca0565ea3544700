//! Error types for the bridge

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::callback::CallbackError;

/// Errors surfaced to the host framework's request handler
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No template registered under the requested name
    #[error("template not found: {name}")]
    TemplateNotFound {
        name: String,
        suggestions: Vec<String>,
    },

    /// Template name already taken and the registry rejects collisions
    #[error("duplicate template definition: {name}")]
    DuplicateTemplate { name: String },

    /// No live instance registered under the identifier
    #[error("instance not found: {id}")]
    InstanceNotFound {
        id: String,
        suggestions: Vec<String>,
    },

    /// The server shim never recorded a route for this endpoint
    #[error("endpoint '{endpoint}' not registered for instance '{instance}'")]
    EndpointNotFound { instance: String, endpoint: String },

    /// Dispatch target is absent from the callback map
    #[error("unknown callback target '{target}'")]
    UnknownCallbackTarget {
        target: String,
        suggestions: Vec<String>,
    },

    /// A registered input or state has no matching entry in the request
    #[error("missing argument {id}.{property} for callback '{target}'")]
    MissingArgument {
        target: String,
        id: String,
        property: String,
    },

    /// Layout body could not be decoded
    #[error("malformed layout at line {line}, column {column}: {message}")]
    MalformedLayout {
        message: String,
        line: usize,
        column: usize,
    },

    /// Layout requested before one was set
    #[error("no layout set for app '{app}'")]
    LayoutNotSet { app: String },

    /// Dispatch body is not a well-formed callback request
    #[error("malformed callback request: {0}")]
    MalformedRequest(#[source] serde_json::Error),

    /// The handler itself failed
    #[error("callback '{target}' failed: {source}")]
    Callback {
        target: String,
        #[source]
        source: CallbackError,
    },

    /// Re-encoding a layout tree failed
    #[error("failed to encode layout: {0}")]
    Encode(#[source] serde_json::Error),
}

impl BridgeError {
    /// Create a template-not-found error with suggestions drawn from the known names
    pub fn template_not_found<'a>(
        name: impl Into<String>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let name = name.into();
        let suggestions = find_similar(known, &name, 2);
        Self::TemplateNotFound { name, suggestions }
    }

    /// Create an instance-not-found error with suggestions drawn from the known identifiers
    pub fn instance_not_found<'a>(
        id: impl Into<String>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let id = id.into();
        let suggestions = find_similar(known, &id, 2);
        Self::InstanceNotFound { id, suggestions }
    }

    /// Create an unknown-target error with suggestions drawn from the registered targets
    pub fn unknown_target<'a>(
        target: impl Into<String>,
        known: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let target = target.into();
        let suggestions = find_similar(known, &target, 3);
        Self::UnknownCallbackTarget {
            target,
            suggestions,
        }
    }

    pub fn missing_argument(
        target: impl Into<String>,
        id: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self::MissingArgument {
            target: target.into(),
            id: id.into(),
            property: property.into(),
        }
    }

    /// Wrap a JSON decoding failure of a layout body
    pub fn malformed_layout(err: &serde_json::Error) -> Self {
        Self::MalformedLayout {
            message: err.to_string(),
            line: err.line(),
            column: err.column(),
        }
    }

    /// Get suggestions if available
    pub fn suggestions(&self) -> Option<&[String]> {
        match self {
            Self::TemplateNotFound { suggestions, .. } => Some(suggestions),
            Self::InstanceNotFound { suggestions, .. } => Some(suggestions),
            Self::UnknownCallbackTarget { suggestions, .. } => Some(suggestions),
            _ => None,
        }
    }

    /// Format the error with source context using ariadne
    ///
    /// Only layout decoding errors carry a position; every other variant
    /// falls back to its display string.
    pub fn format(&self, source: &str, filename: &str) -> String {
        let Self::MalformedLayout {
            message,
            line,
            column,
        } = self
        else {
            return self.to_string();
        };

        let offset = char_index(source, byte_offset(source, *line, *column));
        let end = (offset + 1).min(source.chars().count()).max(offset);
        let mut buf = Vec::new();
        let written = Report::build(ReportKind::Error, filename, offset)
            .with_message("malformed layout")
            .with_label(
                Label::new((filename, offset..end))
                    .with_message(message)
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);

        match written {
            Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Convert a 1-based line/column pair from the JSON decoder into a byte offset
fn byte_offset(source: &str, line: usize, column: usize) -> usize {
    let line_start: usize = source
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(source.len())
}

/// Char index of a byte offset, as ariadne spans count chars
fn char_index(source: &str, byte_offset: usize) -> usize {
    let mut offset = byte_offset.min(source.len());
    while !source.is_char_boundary(offset) {
        offset -= 1;
    }
    source[..offset].chars().count()
}

/// Compute Levenshtein edit distance between two strings
fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = if a_chars[i - 1] == b_chars[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Find up to three known names within a maximum edit distance, closest first
fn find_similar<'a>(
    known: impl IntoIterator<Item = &'a str>,
    target: &str,
    max_distance: usize,
) -> Vec<String> {
    let mut candidates: Vec<(&str, usize)> = known
        .into_iter()
        .filter_map(|name| {
            let dist = levenshtein_distance(name, target);
            (dist <= max_distance && dist > 0).then_some((name, dist))
        })
        .collect();

    candidates.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    candidates
        .into_iter()
        .map(|(name, _)| name.to_string())
        .take(3)
        .collect()
}
