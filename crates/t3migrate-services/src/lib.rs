//! High-level orchestration layer over the parser, export and fluid crates.
//! Intentionally thin: exposes stable functions used by the CLI without it
//! importing the lower-level crates directly.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use t3migrate_core::{
    NamespaceConversion, ParsedLocaleDocument, Result, T3Error, DEFAULT_LANGUAGE,
};
use walkdir::WalkDir;

/// One XLIFF file to be written by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XlfOutput {
    pub language: String,
    pub labels: usize,
    pub path: PathBuf,
    pub content: String,
}

/// Everything needed to carry out one locale conversion. The plan is fully
/// built in memory; the caller performs (and reports) the writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XlfPlan {
    pub product_name: String,
    pub document: ParsedLocaleDocument,
    pub outputs: Vec<XlfOutput>,
}

/// Parse a legacy locale file and plan the per-language XLIFF fan-out.
///
/// Languages with zero labels stay visible in `document` (so callers can
/// report them) but get no output file. Fails with `NoLabelsFound` when the
/// whole document carries zero labels.
pub fn plan_xlf_conversion(xml_path: &Path) -> Result<XlfPlan> {
    let text = fs::read_to_string(xml_path)?;
    let document = t3migrate_parsers_xml::parse_locale_document(&text)?;

    if document.label_count() == 0 {
        return Err(T3Error::NoLabelsFound.into());
    }

    let product_name = product_name_from_path(xml_path);
    let mut outputs = Vec::new();
    for (language, labels) in &document.languages {
        if labels.is_empty() {
            continue;
        }
        let content = t3migrate_export_xlf::build_xlf(&document, language, &product_name)?;
        outputs.push(XlfOutput {
            language: language.clone(),
            labels: labels.len(),
            path: xlf_output_path(xml_path, language),
            content,
        });
    }

    Ok(XlfPlan {
        product_name,
        document,
        outputs,
    })
}

/// Derive the product name from the input path. Translation files
/// conventionally live under `.../<product>/ext/...`; the segment right
/// before the deepest `ext` marker wins. No marker means no product name
/// (the document builder then falls back to a fixed string).
pub fn product_name_from_path(path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    for i in (0..segments.len()).rev() {
        if segments[i] == "ext" {
            if i > 0 {
                return segments[i - 1].clone();
            }
            break;
        }
    }
    String::new()
}

/// Output path for one language: the default language reuses the input base
/// name with an `.xlf` extension, every other language prefixes its code.
pub fn xlf_output_path(xml_path: &Path, language: &str) -> PathBuf {
    let stem = xml_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = if language == DEFAULT_LANGUAGE {
        format!("{stem}.xlf")
    } else {
        format!("{language}.{stem}.xlf")
    };
    match xml_path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Expand a file-or-directory target into template candidates. A directory
/// is walked recursively for `*.html`; a plain file is taken as-is.
pub fn fluid_targets(target: &Path) -> Result<Vec<PathBuf>> {
    if target.is_file() {
        return Ok(vec![target.to_path_buf()]);
    }

    let mut targets = Vec::new();
    for entry in WalkDir::new(target).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() && path.extension().map(|e| e == "html").unwrap_or(false) {
            targets.push(path.to_path_buf());
        }
    }
    targets.sort();
    Ok(targets)
}

/// Rewrite one template in place. The replacement content is fully built in
/// memory before anything is written back; non-`Converted` outcomes leave
/// the file untouched.
pub fn rewrite_template_file(path: &Path) -> Result<NamespaceConversion> {
    let source = fs::read_to_string(path)?;
    let conversion = t3migrate_fluid::rewrite_template_source(&source)?;

    if let NamespaceConversion::Converted { content, .. } = &conversion {
        fs::write(path, content).map_err(|err| T3Error::FileWrite {
            path: path.to_path_buf(),
            source: err,
        })?;
    }

    Ok(conversion)
}
