//! Content-type heuristic for source text

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Url,
    Email,
    Phone,
    Text,
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Url => "URL",
            ContentKind::Email => "Email",
            ContentKind::Phone => "Phone",
            ContentKind::Text => "Text",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Checked in order; the first matching prefix wins.
pub const PREFIXES: &[(&str, ContentKind)] = &[
    ("http://", ContentKind::Url),
    ("https://", ContentKind::Url),
    ("mailto:", ContentKind::Email),
    ("tel:", ContentKind::Phone),
];

/// Classify text by its (ASCII case-insensitive) prefix, ignoring leading whitespace
pub fn classify(text: &str) -> ContentKind {
    let text = text.trim_start();
    PREFIXES
        .iter()
        .find(|(prefix, _)| {
            text.get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
        })
        .map(|(_, kind)| *kind)
        .unwrap_or(ContentKind::Text)
}
