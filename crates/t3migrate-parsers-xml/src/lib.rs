use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use t3migrate_core::{LanguageLabelSet, ParsedLocaleDocument, Result, T3Error};

/// A label as it appears in the document, before a shape strategy decides
/// where its value lives.
#[derive(Debug, Clone)]
struct RawLabel {
    key: String,
    /// Direct text content of the label element.
    text: String,
    /// Text of a nested `<source>` child, if the document uses that shape.
    source_text: Option<String>,
}

/// How to pull the label value out of a `RawLabel`. The legacy format
/// drifted over the years: older files put the text straight into the label
/// element, newer ones wrap it in a `<source>` child.
trait LabelExtraction {
    fn extract(&self, label: &RawLabel) -> String;
}

struct FlatLabels;

impl LabelExtraction for FlatLabels {
    fn extract(&self, label: &RawLabel) -> String {
        label.text.clone()
    }
}

struct NestedSourceLabels;

impl LabelExtraction for NestedSourceLabels {
    fn extract(&self, label: &RawLabel) -> String {
        label
            .source_text
            .clone()
            .unwrap_or_else(|| label.text.clone())
    }
}

/// Pick the extraction strategy by probing the collected labels: any label
/// carrying a `<source>` child selects the nested shape for the whole file.
fn select_strategy(languages: &IndexMap<String, Vec<RawLabel>>) -> Box<dyn LabelExtraction> {
    let nested = languages
        .values()
        .flatten()
        .any(|label| label.source_text.is_some());
    if nested {
        Box::new(NestedSourceLabels)
    } else {
        Box::new(FlatLabels)
    }
}

fn index_attr(e: &BytesStart) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == b"index")
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.into_owned())
}

/// Parse a legacy locallang XML document into language -> label mappings.
///
/// Fails with `InvalidDocument` when the text is not well-formed XML or no
/// `languageKey` element is found. Languages with zero labels are retained
/// with an empty set so callers can report them.
pub fn parse_locale_document(xml: &str) -> Result<ParsedLocaleDocument> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut languages: IndexMap<String, Vec<RawLabel>> = IndexMap::new();

    let mut current_language: Option<String> = None;
    let mut current_label: Option<RawLabel> = None;
    let mut in_source = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"languageKey" => {
                    let lang = index_attr(&e).unwrap_or_default();
                    languages.entry(lang.clone()).or_default();
                    current_language = Some(lang);
                }
                b"label" if current_language.is_some() => {
                    current_label = Some(RawLabel {
                        key: index_attr(&e).unwrap_or_default(),
                        text: String::new(),
                        source_text: None,
                    });
                }
                b"source" if current_label.is_some() => {
                    if let Some(label) = current_label.as_mut() {
                        label.source_text.get_or_insert_with(String::new);
                    }
                    in_source = true;
                }
                _ => {}
            },
            Ok(Event::Empty(e)) => match e.name().as_ref() {
                b"languageKey" => {
                    languages
                        .entry(index_attr(&e).unwrap_or_default())
                        .or_default();
                }
                b"label" if current_language.is_some() => {
                    if let Some(lang) = current_language.as_ref() {
                        if let Some(labels) = languages.get_mut(lang) {
                            labels.push(RawLabel {
                                key: index_attr(&e).unwrap_or_default(),
                                text: String::new(),
                                source_text: None,
                            });
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"languageKey" => {
                    current_language = None;
                }
                b"label" => {
                    if let (Some(lang), Some(label)) =
                        (current_language.as_ref(), current_label.take())
                    {
                        if let Some(labels) = languages.get_mut(lang) {
                            labels.push(label);
                        }
                    }
                }
                b"source" => {
                    in_source = false;
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Some(label) = current_label.as_mut() {
                    let value = e
                        .unescape()
                        .map_err(|e| T3Error::InvalidDocument(format!("{e}")))?;
                    if in_source {
                        label
                            .source_text
                            .get_or_insert_with(String::new)
                            .push_str(&value);
                    } else {
                        label.text.push_str(&value);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(T3Error::InvalidDocument(format!("{e}")).into()),
            _ => {}
        }
        buf.clear();
    }

    if languages.is_empty() {
        return Err(T3Error::InvalidDocument("no languageKey elements found".into()).into());
    }

    let strategy = select_strategy(&languages);
    let mut document = ParsedLocaleDocument::default();
    for (lang, labels) in languages {
        let mut set = LanguageLabelSet::new();
        for label in &labels {
            set.insert(label.key.clone(), strategy.extract(label));
        }
        document.languages.insert(lang, set);
    }

    Ok(document)
}
