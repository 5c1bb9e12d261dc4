use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Workspace-wide result alias.
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Distinguished language key for the source-of-truth label set.
pub const DEFAULT_LANGUAGE: &str = "default";

/// Labels of a single language, keyed by label id.
/// Iteration order is the first-seen order from the source document;
/// a repeated key keeps its original position and takes the last value.
pub type LanguageLabelSet = IndexMap<String, String>;

/// A legacy locallang document normalized to language code -> label set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedLocaleDocument {
    pub languages: IndexMap<String, LanguageLabelSet>,
}

impl ParsedLocaleDocument {
    /// Label set of the distinguished "default" language, if present.
    pub fn default_labels(&self) -> Option<&LanguageLabelSet> {
        self.languages.get(DEFAULT_LANGUAGE)
    }

    /// Total label count across all languages.
    pub fn label_count(&self) -> usize {
        self.languages.values().map(|labels| labels.len()).sum()
    }
}

/// One brace-style Fluid namespace declaration lifted from a template line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceDeclaration {
    pub alias: String,
    /// Backslash-separated view-helper class path as written in the source.
    pub class_path: String,
    /// Trimmed original line, kept for reporting.
    pub raw: String,
}

/// Outcome of rewriting one template. Exactly one variant per file per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum NamespaceConversion {
    /// Nothing to do: the file contains no brace-style declarations.
    NoLegacyNamespaces,
    /// Legacy declarations and a modern `<html` root tag are both present.
    /// The file is left untouched.
    Conflict {
        declarations: Vec<NamespaceDeclaration>,
    },
    /// Declarations were folded into a new root tag; `content` is the full
    /// replacement file body.
    Converted {
        declarations: Vec<NamespaceDeclaration>,
        content: String,
    },
}

#[derive(Debug, Error)]
pub enum T3Error {
    /// The locale document could not be parsed, or contains no languageKey.
    #[error("invalid locale document: {0}")]
    InvalidDocument(String),
    /// The document parsed but carries zero labels in total.
    #[error("no labels found in locale document")]
    NoLabelsFound,
    /// A `{namespace ...}` line without an `=` between alias and class path.
    #[error("malformed namespace declaration: {0}")]
    MalformedDeclaration(String),
    #[error("failed to write {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
