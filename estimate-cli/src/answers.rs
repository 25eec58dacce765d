//! Answers files: a flat table of wizard field names to values, read in
//! place of an interactive front end.
//!
//! | file value               | answer                     |
//! |--------------------------|----------------------------|
//! | string                   | `AnswerValue::Text`        |
//! | integer or float         | `AnswerValue::Number`      |
//! | boolean                  | `AnswerValue::Flag`        |
//! | array of strings         | `AnswerValue::Selection`   |
//!
//! `.toml` and `.json` are accepted. JSON may also use the tagged form the
//! engine serialises answers in (`{ "number": "120" }`).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use estimate_core::{AnswerValue, FormAnswers};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnswersError {
    #[error("failed to read answers from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("answers file {} must end in .toml or .json", .0.display())]
    UnknownFormat(PathBuf),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("'{field}': {kind} values are not supported")]
    Unsupported { field: String, kind: &'static str },

    #[error("'{field}': '{value}' is not a decimal number")]
    NotANumber { field: String, value: String },

    #[error("'{field}': list entries must be strings")]
    MixedList { field: String },
}

/// Reads an answers file, choosing the format by extension.
pub fn load_answers(path: &Path) -> Result<FormAnswers, AnswersError> {
    let contents = std::fs::read_to_string(path).map_err(|source| AnswersError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => from_toml_str(&contents),
        Some("json") => from_json_str(&contents),
        _ => Err(AnswersError::UnknownFormat(path.to_path_buf())),
    }
}

pub fn from_toml_str(contents: &str) -> Result<FormAnswers, AnswersError> {
    let table: toml::Table = toml::from_str(contents)?;
    table
        .into_iter()
        .map(|(field, value)| {
            let answer = toml_answer(&field, value)?;
            Ok::<_, AnswersError>((field, answer))
        })
        .collect()
}

fn toml_answer(
    field: &str,
    value: toml::Value,
) -> Result<AnswerValue, AnswersError> {
    match value {
        toml::Value::String(s) => Ok(AnswerValue::Text(s)),
        toml::Value::Integer(i) => Ok(AnswerValue::Number(Decimal::from(i))),
        toml::Value::Float(f) => parse_number(field, &f.to_string()),
        toml::Value::Boolean(b) => Ok(AnswerValue::Flag(b)),
        toml::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                toml::Value::String(s) => Ok(s),
                _ => Err(AnswersError::MixedList {
                    field: field.to_string(),
                }),
            })
            .collect::<Result<_, _>>()
            .map(AnswerValue::Selection),
        toml::Value::Datetime(_) => Err(unsupported(field, "date")),
        toml::Value::Table(_) => Err(unsupported(field, "table")),
    }
}

pub fn from_json_str(contents: &str) -> Result<FormAnswers, AnswersError> {
    let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(contents)?;
    object
        .into_iter()
        .map(|(field, value)| {
            let answer = json_answer(&field, value)?;
            Ok::<_, AnswersError>((field, answer))
        })
        .collect()
}

fn json_answer(
    field: &str,
    value: serde_json::Value,
) -> Result<AnswerValue, AnswersError> {
    use serde_json::Value;

    match value {
        Value::String(s) => Ok(AnswerValue::Text(s)),
        Value::Number(n) => parse_number(field, &n.to_string()),
        Value::Bool(b) => Ok(AnswerValue::Flag(b)),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(AnswersError::MixedList {
                    field: field.to_string(),
                }),
            })
            .collect::<Result<_, _>>()
            .map(AnswerValue::Selection),
        tagged @ Value::Object(_) => Ok(serde_json::from_value(tagged)?),
        Value::Null => Err(unsupported(field, "null")),
    }
}

fn parse_number(
    field: &str,
    text: &str,
) -> Result<AnswerValue, AnswersError> {
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map(AnswerValue::Number)
        .map_err(|_| AnswersError::NotANumber {
            field: field.to_string(),
            value: text.to_string(),
        })
}

fn unsupported(
    field: &str,
    kind: &'static str,
) -> AnswersError {
    AnswersError::Unsupported {
        field: field.to_string(),
        kind,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn toml_values_map_to_answers() {
        let answers = from_toml_str(
            r#"
            project_type = "renovation"
            floor_area = 120
            levels = 1.5
            options = ["pool", "alarm"]
            newsletter = true
            "#,
        )
        .expect("answers parse");

        assert_eq!(answers.text("project_type"), Some("renovation"));
        assert_eq!(answers.number("floor_area"), Some(dec!(120)));
        assert_eq!(answers.number("levels"), Some(dec!(1.5)));
        assert_eq!(answers.flag("newsletter"), Some(true));
        assert_eq!(
            answers.get("options"),
            Some(&AnswerValue::selection(["alarm", "pool"]))
        );
    }

    #[test]
    fn empty_toml_array_is_an_empty_selection() {
        let answers = from_toml_str("landscaping = []").expect("answers parse");

        assert_eq!(
            answers.get("landscaping"),
            Some(&AnswerValue::Selection(Default::default()))
        );
    }

    #[test]
    fn toml_table_is_rejected() {
        let result = from_toml_str("[facade]\narea = 3\n");

        assert!(matches!(
            result,
            Err(AnswersError::Unsupported { kind: "table", .. })
        ));
    }

    #[test]
    fn list_of_numbers_is_rejected() {
        let result = from_toml_str("options = [1, 2]");

        assert!(matches!(result, Err(AnswersError::MixedList { .. })));
    }

    #[test]
    fn json_plain_and_tagged_values_are_accepted() {
        let answers = from_json_str(
            r#"{
                "floor_area": 95.25,
                "levels": { "number": "2" },
                "roof_type": "tile",
                "options": ["garage"]
            }"#,
        )
        .expect("answers parse");

        assert_eq!(answers.number("floor_area"), Some(dec!(95.25)));
        assert_eq!(answers.number("levels"), Some(dec!(2)));
        assert_eq!(answers.text("roof_type"), Some("tile"));
        assert_eq!(
            answers.get("options"),
            Some(&AnswerValue::selection(["garage"]))
        );
    }

    #[test]
    fn json_null_is_rejected() {
        let result = from_json_str(r#"{ "contact_phone": null }"#);

        assert!(matches!(
            result,
            Err(AnswersError::Unsupported { kind: "null", .. })
        ));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("src")
            .join("lib.rs");

        assert!(matches!(
            load_answers(&path),
            Err(AnswersError::UnknownFormat(_))
        ));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        assert!(matches!(
            load_answers(Path::new("no/such/answers.toml")),
            Err(AnswersError::Read { .. })
        ));
    }
}
