use std::sync::OnceLock;

use regex::Regex;
use t3migrate_core::{NamespaceConversion, NamespaceDeclaration, Result, T3Error};

/// Fixed first attribute of every generated root tag.
pub const FLUID_VIEWHELPERS_NS: &str = "http://typo3.org/ns/TYPO3/CMS/Fluid/ViewHelpers";

/// Matches any brace-style namespace group on a line. Deliberately loose
/// about what follows the `namespace` keyword so that a declaration missing
/// its `=` still classifies as legacy and can be reported as malformed
/// instead of silently staying in the content.
fn namespace_line_re() -> &'static Regex {
    static NAMESPACE_LINE: OnceLock<Regex> = OnceLock::new();
    NAMESPACE_LINE.get_or_init(|| Regex::new(r"\{namespace\s+[^}]*\}").unwrap())
}

/// Result of the line scan over one template.
#[derive(Debug)]
pub struct ClassifiedLines<'a> {
    /// Trimmed declaration lines, in order of appearance.
    pub declarations: Vec<&'a str>,
    /// All remaining lines, original line endings preserved.
    pub content_lines: Vec<&'a str>,
    /// True if any non-blank content line starts with `<html` once trimmed.
    pub has_modern_tag: bool,
}

/// Separate legacy declaration lines from template content. Templates are
/// not guaranteed to be well-formed XML, so this is a plain line scan.
pub fn classify_lines(source: &str) -> ClassifiedLines<'_> {
    let mut declarations = Vec::new();
    let mut content_lines = Vec::new();

    for line in source.split_inclusive('\n') {
        if namespace_line_re().is_match(line) {
            declarations.push(line.trim());
        } else {
            content_lines.push(line);
        }
    }

    let has_modern_tag = content_lines.iter().any(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && trimmed.starts_with("<html")
    });

    ClassifiedLines {
        declarations,
        content_lines,
        has_modern_tag,
    }
}

/// Split a trimmed `{namespace alias=Vendor\Pkg\ViewHelpers}` line into its
/// alias and class path.
pub fn parse_declaration(raw: &str) -> Result<NamespaceDeclaration> {
    let raw = raw.trim();
    let inner = raw.trim_start_matches('{').trim_end_matches('}');
    let rest = inner
        .strip_prefix("namespace")
        .map(str::trim_start)
        .unwrap_or(inner);

    let Some((alias, class_path)) = rest.split_once('=') else {
        return Err(T3Error::MalformedDeclaration(raw.to_string()).into());
    };

    Ok(NamespaceDeclaration {
        alias: alias.trim().to_string(),
        class_path: class_path.trim().to_string(),
        raw: raw.to_string(),
    })
}

/// Synthesize the multi-line `<html ...>` opening tag for the given
/// declarations, in their order of appearance.
pub fn build_html_tag(declarations: &[NamespaceDeclaration]) -> String {
    let mut tag = format!("<html xmlns:f=\"{FLUID_VIEWHELPERS_NS}\"\n");
    for decl in declarations {
        let path = decl.class_path.replace('\\', "/");
        tag.push_str(&format!(
            "\t  xmlns:{}=\"http://typo3.org/ns/{}\"\n",
            decl.alias, path
        ));
    }
    tag.push_str("\t  data-namespace-typo3-fluid=\"true\">\n");
    tag
}

/// Rewrite one template source. Pure: the caller decides what to do with
/// the result. Running the rewrite on already-converted content yields
/// `NoLegacyNamespaces`, so a second pass never double-wraps.
pub fn rewrite_template_source(source: &str) -> Result<NamespaceConversion> {
    let classified = classify_lines(source);

    if classified.declarations.is_empty() {
        return Ok(NamespaceConversion::NoLegacyNamespaces);
    }

    let declarations = classified
        .declarations
        .iter()
        .map(|raw| parse_declaration(raw))
        .collect::<Result<Vec<_>>>()?;

    if classified.has_modern_tag {
        return Ok(NamespaceConversion::Conflict { declarations });
    }

    let mut content = build_html_tag(&declarations);
    for line in &classified.content_lines {
        content.push_str(line);
    }
    content.push_str("\n</html>");

    Ok(NamespaceConversion::Converted {
        declarations,
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_declarations_and_content() {
        let src = "{namespace f=TYPO3\\CMS\\Fluid\\ViewHelpers}\n{namespace vh=Acme\\Site\\ViewHelpers}\n<div>hi</div>\n";
        let classified = classify_lines(src);
        assert_eq!(classified.declarations.len(), 2);
        assert_eq!(classified.content_lines, ["<div>hi</div>\n"]);
        assert!(!classified.has_modern_tag);
    }

    #[test]
    fn detects_modern_tag_among_content_lines() {
        let src = "\n  <html data-namespace-typo3-fluid=\"true\">\n<div/>\n</html>\n";
        assert!(classify_lines(src).has_modern_tag);
    }

    #[test]
    fn parses_alias_and_class_path() {
        let decl = parse_declaration("{namespace vh=Acme\\Site\\ViewHelpers}").unwrap();
        assert_eq!(decl.alias, "vh");
        assert_eq!(decl.class_path, "Acme\\Site\\ViewHelpers");
        assert_eq!(decl.raw, "{namespace vh=Acme\\Site\\ViewHelpers}");
    }

    #[test]
    fn missing_equals_is_malformed() {
        let err = parse_declaration("{namespace broken}").unwrap_err();
        assert!(err.to_string().contains("malformed namespace declaration"));
    }

    #[test]
    fn tag_attributes_follow_declaration_order() {
        let decls = vec![
            parse_declaration("{namespace b=Acme\\B\\ViewHelpers}").unwrap(),
            parse_declaration("{namespace a=Acme\\A\\ViewHelpers}").unwrap(),
        ];
        let tag = build_html_tag(&decls);
        let b = tag.find("xmlns:b=").unwrap();
        let a = tag.find("xmlns:a=").unwrap();
        assert!(b < a);
        assert!(tag.contains("xmlns:b=\"http://typo3.org/ns/Acme/B/ViewHelpers\""));
        assert!(tag.ends_with("\t  data-namespace-typo3-fluid=\"true\">\n"));
    }

    #[test]
    fn converts_simple_template() {
        let src = "{namespace f=TYPO3\\CMS\\Fluid\\ViewHelpers}\n<div>hi</div>";
        let NamespaceConversion::Converted {
            declarations,
            content,
        } = rewrite_template_source(src).unwrap()
        else {
            panic!("expected conversion");
        };

        assert_eq!(declarations.len(), 1);
        assert!(content
            .starts_with("<html xmlns:f=\"http://typo3.org/ns/TYPO3/CMS/Fluid/ViewHelpers\""));
        assert!(content.contains("data-namespace-typo3-fluid=\"true\">"));
        let div = content.find("<div>hi</div>").unwrap();
        let close = content.rfind("</html>").unwrap();
        assert!(content.find("data-namespace-typo3-fluid").unwrap() < div);
        assert!(div < close);
    }

    #[test]
    fn no_declarations_is_a_noop() {
        let out = rewrite_template_source("<div>plain</div>\n").unwrap();
        assert!(matches!(out, NamespaceConversion::NoLegacyNamespaces));
    }

    #[test]
    fn both_styles_present_is_a_conflict() {
        let src = "{namespace vh=Acme\\Site\\ViewHelpers}\n<html>\n<div/>\n</html>\n";
        let out = rewrite_template_source(src).unwrap();
        assert!(matches!(out, NamespaceConversion::Conflict { .. }));
    }

    #[test]
    fn second_pass_never_double_wraps() {
        let src = "{namespace vh=Acme\\Site\\ViewHelpers}\n<div>hi</div>\n";
        let NamespaceConversion::Converted { content, .. } = rewrite_template_source(src).unwrap()
        else {
            panic!("expected conversion");
        };

        let again = rewrite_template_source(&content).unwrap();
        assert!(matches!(again, NamespaceConversion::NoLegacyNamespaces));
        assert_eq!(content.matches("<html").count(), 1);
    }

    #[test]
    fn malformed_declaration_fails_the_file() {
        let src = "{namespace nope}\n<div/>\n";
        assert!(rewrite_template_source(src).is_err());
    }
}
