use chrono::Local;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use t3migrate_core::{ParsedLocaleDocument, Result, T3Error, DEFAULT_LANGUAGE};

/// Product name used when none could be derived from the input path.
pub const FALLBACK_PRODUCT_NAME: &str = "t3migrate";

/// Timestamp format of the `data` attribute. The dashes in the time part
/// are a quirk of the original tool and part of the expected output.
const DATA_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S";

/// Serialize the XLIFF document for one language of `doc`.
///
/// For the "default" language every unit carries a `<source>` only. For any
/// other language the file header gains a `target-language` attribute and
/// each unit carries the default-language text as `<source>` (when the key
/// exists there) plus this language's text as `<target>`.
pub fn build_xlf(doc: &ParsedLocaleDocument, language: &str, product_name: &str) -> Result<String> {
    let timestamp = Local::now().format(DATA_TIMESTAMP_FORMAT).to_string();
    build_xlf_with_timestamp(doc, language, product_name, &timestamp)
}

/// Same as `build_xlf` with the generation timestamp injected.
pub fn build_xlf_with_timestamp(
    doc: &ParsedLocaleDocument,
    language: &str,
    product_name: &str,
    timestamp: &str,
) -> Result<String> {
    let labels = doc
        .languages
        .get(language)
        .ok_or_else(|| T3Error::InvalidDocument(format!("unknown language: {language}")))?;
    let is_translation = language != DEFAULT_LANGUAGE;
    let product_name = if product_name.is_empty() {
        FALLBACK_PRODUCT_NAME
    } else {
        product_name
    };

    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), Some("yes"))))?;

    let mut xliff = BytesStart::new("xliff");
    xliff.push_attribute(("version", "1.0"));
    xliff.push_attribute(("standalone", "yes"));
    writer.write_event(Event::Start(xliff))?;

    let mut file = BytesStart::new("file");
    file.push_attribute(("source-language", "en"));
    if is_translation {
        file.push_attribute(("target-language", language));
    }
    file.push_attribute(("datatype", "plaintext"));
    file.push_attribute(("original", "messages"));
    file.push_attribute(("data", timestamp));
    file.push_attribute(("product-name", product_name));
    writer.write_event(Event::Start(file))?;

    writer.write_event(Event::Empty(BytesStart::new("header")))?;
    writer.write_event(Event::Start(BytesStart::new("body")))?;

    let default_labels = doc.default_labels();
    for (key, value) in labels {
        let mut unit = BytesStart::new("trans-unit");
        unit.push_attribute(("id", key.as_str()));
        unit.push_attribute(("xml:space", "preserve"));
        writer.write_event(Event::Start(unit))?;

        if is_translation {
            if let Some(source) = default_labels.and_then(|d| d.get(key)) {
                write_text_element(&mut writer, "source", source)?;
            }
            write_text_element(&mut writer, "target", value)?;
        } else {
            write_text_element(&mut writer, "source", value)?;
        }

        writer.write_event(Event::End(BytesEnd::new("trans-unit")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("body")))?;
    writer.write_event(Event::End(BytesEnd::new("file")))?;
    writer.write_event(Event::End(BytesEnd::new("xliff")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use t3migrate_core::LanguageLabelSet;

    fn doc(languages: &[(&str, &[(&str, &str)])]) -> ParsedLocaleDocument {
        let mut doc = ParsedLocaleDocument::default();
        for (lang, labels) in languages {
            let mut set = LanguageLabelSet::new();
            for (k, v) in *labels {
                set.insert(k.to_string(), v.to_string());
            }
            doc.languages.insert(lang.to_string(), set);
        }
        doc
    }

    #[test]
    fn default_language_emits_source_only() {
        let d = doc(&[("default", &[("a", "x"), ("b", "y")])]);
        let xlf = build_xlf_with_timestamp(&d, "default", "my_ext", "2018-01-01T00-00-00").unwrap();

        assert!(xlf.starts_with(r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>"#));
        assert!(xlf.contains(r#"<xliff version="1.0" standalone="yes">"#));
        assert!(xlf.contains(r#"source-language="en""#));
        assert!(!xlf.contains("target-language"));
        assert!(xlf.contains(r#"datatype="plaintext""#));
        assert!(xlf.contains(r#"original="messages""#));
        assert!(xlf.contains(r#"data="2018-01-01T00-00-00""#));
        assert!(xlf.contains(r#"product-name="my_ext""#));
        assert!(xlf.contains("<header/>"));
        assert!(xlf.contains(r#"<trans-unit id="a" xml:space="preserve">"#));
        assert!(xlf.contains("<source>x</source>"));
        assert!(xlf.contains("<source>y</source>"));
        assert!(!xlf.contains("<target>"));
    }

    #[test]
    fn translation_pairs_source_and_target() {
        let d = doc(&[("default", &[("a", "x")]), ("de", &[("a", "y")])]);
        let xlf = build_xlf_with_timestamp(&d, "de", "my_ext", "2018-01-01T00-00-00").unwrap();

        assert!(xlf.contains(r#"target-language="de""#));
        assert!(xlf.contains("<source>x</source>"));
        assert!(xlf.contains("<target>y</target>"));
    }

    #[test]
    fn translation_without_default_counterpart_emits_target_only() {
        let d = doc(&[("default", &[("a", "x")]), ("de", &[("b", "z")])]);
        let xlf = build_xlf_with_timestamp(&d, "de", "my_ext", "2018-01-01T00-00-00").unwrap();

        assert!(!xlf.contains("<source>"));
        assert!(xlf.contains("<target>z</target>"));
    }

    #[test]
    fn unit_count_matches_label_count() {
        let d = doc(&[("default", &[("a", "1"), ("b", "2"), ("c", "3")])]);
        let xlf = build_xlf_with_timestamp(&d, "default", "p", "t").unwrap();
        assert_eq!(xlf.matches("<trans-unit").count(), 3);
    }

    #[test]
    fn label_text_is_escaped() {
        let d = doc(&[("default", &[("a", "x < y & \"z\"")])]);
        let xlf = build_xlf_with_timestamp(&d, "default", "p", "t").unwrap();
        assert!(xlf.contains("x &lt; y &amp; &quot;z&quot;"));
    }

    #[test]
    fn empty_product_name_falls_back() {
        let d = doc(&[("default", &[("a", "x")])]);
        let xlf = build_xlf_with_timestamp(&d, "default", "", "t").unwrap();
        assert!(xlf.contains(r#"product-name="t3migrate""#));
    }

    #[test]
    fn unknown_language_is_an_error() {
        let d = doc(&[("default", &[("a", "x")])]);
        assert!(build_xlf_with_timestamp(&d, "nl", "p", "t").is_err());
    }
}
