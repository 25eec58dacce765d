use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single answer captured by the estimation wizard.
///
/// Serialised externally tagged (`{ "number": "120" }`) so that numeric and
/// textual answers survive a JSON or TOML round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerValue {
    Text(String),
    Number(Decimal),
    Flag(bool),
    Selection(BTreeSet<String>),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn number(value: impl Into<Decimal>) -> Self {
        Self::Number(value.into())
    }

    pub fn selection<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Selection(items.into_iter().map(Into::into).collect())
    }

    /// Short name of the variant, used in validation messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Number(_) => "number",
            Self::Flag(_) => "flag",
            Self::Selection(_) => "selection",
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_selection(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Selection(items) => Some(items),
            _ => None,
        }
    }

    /// Whitespace-only text and empty selections count as "not answered".
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Selection(items) => items.is_empty(),
            Self::Number(_) | Self::Flag(_) => false,
        }
    }
}

/// The cumulative answer set of one estimation session, keyed by field name.
///
/// Backed by a `BTreeMap` so iteration and serialisation order never depend
/// on insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormAnswers {
    values: BTreeMap<String, AnswerValue>,
}

impl FormAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `field`, returning the answer it replaced.
    pub fn set(
        &mut self,
        field: impl Into<String>,
        value: AnswerValue,
    ) -> Option<AnswerValue> {
        self.values.insert(field.into(), value)
    }

    pub fn remove(
        &mut self,
        field: &str,
    ) -> Option<AnswerValue> {
        self.values.remove(field)
    }

    pub fn get(
        &self,
        field: &str,
    ) -> Option<&AnswerValue> {
        self.values.get(field)
    }

    pub fn contains(
        &self,
        field: &str,
    ) -> bool {
        self.values.contains_key(field)
    }

    /// Text answer for `field`, trimmed. `None` when absent, blank or not text.
    pub fn text(
        &self,
        field: &str,
    ) -> Option<&str> {
        self.get(field)
            .and_then(AnswerValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn number(
        &self,
        field: &str,
    ) -> Option<Decimal> {
        self.get(field).and_then(AnswerValue::as_number)
    }

    pub fn flag(
        &self,
        field: &str,
    ) -> Option<bool> {
        self.get(field).and_then(AnswerValue::as_flag)
    }

    pub fn selection(
        &self,
        field: &str,
    ) -> Option<&BTreeSet<String>> {
        self.get(field).and_then(AnswerValue::as_selection)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, AnswerValue)> for FormAnswers {
    fn from_iter<T: IntoIterator<Item = (K, AnswerValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn set_returns_previous_value_on_overwrite() {
        let mut answers = FormAnswers::new();
        answers.set("client_type", AnswerValue::text("individual"));

        let previous = answers.set("client_type", AnswerValue::text("professional"));

        assert_eq!(previous, Some(AnswerValue::text("individual")));
        assert_eq!(answers.text("client_type"), Some("professional"));
    }

    #[test]
    fn text_ignores_blank_answers() {
        let answers: FormAnswers = [("contact_name", AnswerValue::text("   "))]
            .into_iter()
            .collect();

        assert_eq!(answers.text("contact_name"), None);
        assert!(answers.get("contact_name").is_some_and(AnswerValue::is_blank));
    }

    #[test]
    fn typed_accessors_reject_other_variants() {
        let answers: FormAnswers = [("floor_area", AnswerValue::text("120"))]
            .into_iter()
            .collect();

        assert_eq!(answers.number("floor_area"), None);
    }

    #[test]
    fn json_round_trip_preserves_numbers_exactly() {
        let answers: FormAnswers = [
            ("floor_area", AnswerValue::number(dec!(120.50))),
            ("options", AnswerValue::selection(["pool", "alarm"])),
        ]
        .into_iter()
        .collect();

        let json = serde_json::to_string(&answers).expect("serialise");
        let restored: FormAnswers = serde_json::from_str(&json).expect("deserialise");

        assert_eq!(restored, answers);
        assert_eq!(restored.number("floor_area"), Some(dec!(120.50)));
    }
}
