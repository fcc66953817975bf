//! The structural steps format.
//!
//! Steps are serialized in the shape of the `Microsoft.VSTS.TCM.Steps` field:
//!
//! ```xml
//! <steps id="0" last="2">
//!   <step id="1" type="ActionStep">
//!     <parameterizedString isformatted="true">action</parameterizedString>
//!     <parameterizedString isformatted="true">expected</parameterizedString>
//!   </step>
//!   ...
//! </steps>
//! ```
//!
//! The serialized form is compact (no whitespace between elements). Parsing
//! accepts whitespace between elements.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::{Step, Steps};

/// Which half of a step a problem was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// The action text.
    Action,
    /// The expected-result text.
    Expected,
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Action => f.write_str("action"),
            Self::Expected => f.write_str("expected result"),
        }
    }
}

/// A step sequence that cannot be serialized.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SerializationError {
    /// A step has an empty (or whitespace-only) text.
    #[error("step {step} has an empty {field}")]
    EmptyText {
        /// The 1-based step identifier.
        step: usize,
        /// The offending half of the step.
        field: Field,
    },

    /// A step contains a character that cannot appear in XML.
    #[error("step {step} {field} contains a character not allowed in XML: {character:?}")]
    InvalidCharacter {
        /// The 1-based step identifier.
        step: usize,
        /// The offending half of the step.
        field: Field,
        /// The offending character.
        character: char,
    },
}

/// Serialize a step sequence.
///
/// # Errors
///
/// Returns an error if any action or expected text is empty, or contains a
/// character that XML 1.0 cannot represent.
pub fn serialize(steps: &Steps) -> Result<String, SerializationError> {
    let mut out = format!(r#"<steps id="0" last="{}">"#, steps.len());

    for (id, step) in steps.numbered() {
        out.push_str(&format!(r#"<step id="{id}" type="ActionStep">"#));
        for (field, text) in [(Field::Action, &step.action), (Field::Expected, &step.expected)] {
            check(id, field, text)?;
            out.push_str(r#"<parameterizedString isformatted="true">"#);
            escape_into(&mut out, text);
            out.push_str("</parameterizedString>");
        }
        out.push_str("</step>");
    }

    out.push_str("</steps>");
    Ok(out)
}

fn check(step: usize, field: Field, text: &str) -> Result<(), SerializationError> {
    if text.trim().is_empty() {
        return Err(SerializationError::EmptyText { step, field });
    }
    if let Some(character) = text.chars().find(|&c| !is_xml_char(c)) {
        return Err(SerializationError::InvalidCharacter {
            step,
            field,
            character,
        });
    }
    Ok(())
}

/// The XML 1.0 `Char` production.
const fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
}

/// A steps payload that could not be parsed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    /// The payload is not wrapped in a `<steps>` element.
    #[error("missing <steps> root element")]
    MissingRoot,

    /// A `<step>` element does not have exactly two texts.
    #[error("step {0} does not have an action and an expected result")]
    MalformedStep(String),

    /// Step identifiers are not `1, 2, 3, ...`.
    #[error("step identifiers are not contiguous from 1: expected {expected}, found {found}")]
    NonContiguous {
        /// The identifier that should have come next.
        expected: usize,
        /// The identifier that was found.
        found: String,
    },

    /// The `last` attribute does not match the number of steps.
    #[error("'last' attribute is {last}, but there are {count} steps")]
    LastMismatch {
        /// The value of the `last` attribute.
        last: String,
        /// The number of steps found.
        count: usize,
    },

    /// The payload contains no steps.
    #[error("no steps found")]
    Empty,

    /// An entity reference is not recognised.
    #[error("unrecognised entity reference '&{0};'")]
    UnknownEntity(String),
}

static ROOT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*<steps\b([^>]*)>(.*)</steps>\s*$").expect("valid regex")
});
static LAST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\blast\s*=\s*"([^"]*)""#).expect("valid regex"));
static STEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<step\b[^>]*?\bid\s*=\s*"([^"]*)"[^>]*>(.*?)</step>"#).expect("valid regex")
});
static TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<parameterizedString\b[^>]*/>|<parameterizedString\b[^>]*>(.*?)</parameterizedString>")
        .expect("valid regex")
});
static ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([^;&\s]*);").expect("valid regex"));

/// Parse a steps payload back into a step sequence.
///
/// # Errors
///
/// Returns an error if the payload is not in the structural steps format, or
/// if its step identifiers are not contiguous from 1.
pub fn parse(payload: &str) -> Result<Steps, ParseError> {
    let root = ROOT.captures(payload).ok_or(ParseError::MissingRoot)?;
    let body = &root[2];

    let mut steps = Vec::new();
    for (index, step) in STEP.captures_iter(body).enumerate() {
        let expected = index + 1;
        let id = &step[1];
        if id.trim().parse::<usize>().ok() != Some(expected) {
            return Err(ParseError::NonContiguous {
                expected,
                found: id.to_string(),
            });
        }

        let texts = TEXT
            .captures_iter(&step[2])
            .map(|text| text.get(1).map_or_else(|| Ok(String::new()), |t| unescape(t.as_str())))
            .collect::<Result<Vec<_>, _>>()?;
        let [action, expected_result]: [String; 2] = texts
            .try_into()
            .map_err(|_| ParseError::MalformedStep(id.to_string()))?;
        steps.push(Step::new(action, expected_result));
    }

    if let Some(last) = LAST.captures(&root[1]) {
        let last = &last[1];
        if last.trim().parse::<usize>().ok() != Some(steps.len()) {
            return Err(ParseError::LastMismatch {
                last: last.to_string(),
                count: steps.len(),
            });
        }
    }

    Steps::from_vec(steps).ok_or(ParseError::Empty)
}

fn unescape(text: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = 0;
    for entity in ENTITY.captures_iter(text) {
        let (Some(whole), Some(name)) = (entity.get(0), entity.get(1)) else {
            continue;
        };
        out.push_str(&text[rest..whole.start()]);
        out.push(decode_entity(name.as_str())?);
        rest = whole.end();
    }
    out.push_str(&text[rest..]);
    Ok(out)
}

fn decode_entity(name: &str) -> Result<char, ParseError> {
    let unknown = || ParseError::UnknownEntity(name.to_string());
    match name {
        "amp" => Ok('&'),
        "lt" => Ok('<'),
        "gt" => Ok('>'),
        "quot" => Ok('"'),
        "apos" => Ok('\''),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()
            } else {
                name.strip_prefix('#').and_then(|dec| dec.parse().ok())
            };
            code.and_then(char::from_u32).ok_or_else(unknown)
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn steps(pairs: &[(&str, &str)]) -> Steps {
        Steps::from_vec(pairs.iter().map(|(a, e)| Step::new(*a, *e)).collect()).unwrap()
    }

    #[test]
    fn serialize_shape() {
        let xml = serialize(&steps(&[("Open", "Opened"), ("Close", "Closed")])).unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<steps id="0" last="2">"#,
                r#"<step id="1" type="ActionStep">"#,
                r#"<parameterizedString isformatted="true">Open</parameterizedString>"#,
                r#"<parameterizedString isformatted="true">Opened</parameterizedString>"#,
                "</step>",
                r#"<step id="2" type="ActionStep">"#,
                r#"<parameterizedString isformatted="true">Close</parameterizedString>"#,
                r#"<parameterizedString isformatted="true">Closed</parameterizedString>"#,
                "</step>",
                "</steps>",
            )
        );
    }

    #[test]
    fn special_characters_are_escaped_and_restored() {
        let original = steps(&[
            (r#"Enter "<script>" & 'quotes'"#, "Input is rejected > 0 times"),
            ("Close/Exit the application.", "No error dialogs are shown."),
        ]);
        let xml = serialize(&original).unwrap();
        assert!(xml.contains("&quot;&lt;script&gt;&quot; &amp; &apos;quotes&apos;"));
        assert_eq!(parse(&xml).unwrap(), original);
    }

    #[test]
    fn round_trip_preserves_whitespace_and_unicode() {
        let original = steps(&[("  Tab\there  ", "Line\nbreak"), ("Ünïcödé ✓", "日本語")]);
        assert_eq!(parse(&serialize(&original).unwrap()).unwrap(), original);
    }

    #[test_case("", "ok", Field::Action; "empty action")]
    #[test_case("ok", "  ", Field::Expected; "blank expected")]
    fn empty_text_is_rejected(action: &str, expected: &str, field: Field) {
        let error = serialize(&steps(&[(action, expected)])).unwrap_err();
        assert_eq!(error, SerializationError::EmptyText { step: 1, field });
    }

    #[test]
    fn control_characters_are_rejected() {
        let error = serialize(&steps(&[("ok", "ok"), ("bell\u{7}", "ok")])).unwrap_err();
        assert_eq!(
            error,
            SerializationError::InvalidCharacter {
                step: 2,
                field: Field::Action,
                character: '\u{7}',
            }
        );
    }

    #[test]
    fn parse_tolerates_whitespace_and_numeric_entities() {
        let xml = r#"
            <steps id="0" last="1">
              <step id="1" type="ActionStep">
                <parameterizedString isformatted="true">A &#38; B</parameterizedString>
                <parameterizedString isformatted="true">&#x3C;done&#x3e;</parameterizedString>
              </step>
            </steps>
        "#;
        assert_eq!(parse(xml).unwrap(), steps(&[("A & B", "<done>")]));
    }

    #[test_case("<step/>", &ParseError::MissingRoot; "no root")]
    #[test_case(r#"<steps id="0" last="0"></steps>"#, &ParseError::Empty; "empty")]
    #[test_case(
        r#"<steps id="0" last="1"><step id="2" type="ActionStep"><parameterizedString>a</parameterizedString><parameterizedString>b</parameterizedString></step></steps>"#,
        &ParseError::NonContiguous { expected: 1, found: "2".to_string() };
        "non contiguous"
    )]
    #[test_case(
        r#"<steps id="0" last="3"><step id="1" type="ActionStep"><parameterizedString>a</parameterizedString><parameterizedString>b</parameterizedString></step></steps>"#,
        &ParseError::LastMismatch { last: "3".to_string(), count: 1 };
        "last mismatch"
    )]
    #[test_case(
        r#"<steps id="0" last="1"><step id="1" type="ActionStep"><parameterizedString>a</parameterizedString></step></steps>"#,
        &ParseError::MalformedStep("1".to_string());
        "missing expected"
    )]
    #[test_case(
        r#"<steps id="0" last="1"><step id="1" type="ActionStep"><parameterizedString>&nbsp;</parameterizedString><parameterizedString>b</parameterizedString></step></steps>"#,
        &ParseError::UnknownEntity("nbsp".to_string());
        "unknown entity"
    )]
    fn parse_invalid(xml: &str, expected: &ParseError) {
        assert_eq!(&parse(xml).unwrap_err(), expected);
    }
}
