use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::error::ValidationError;
use crate::models::{AnswerValue, CostCategory};

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("e-mail pattern is a valid regex")
});

/// The accepted shape of one field's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text {
        max_len: usize,
    },
    Email,
    Number {
        min: Decimal,
        max: Decimal,
    },
    /// Exactly one of `options`. `priced_as` names the cost category the
    /// options are looked up in, if any.
    Choice {
        options: &'static [&'static str],
        priced_as: Option<CostCategory>,
    },
    /// Any subset of `options`.
    MultiChoice {
        options: &'static [&'static str],
        priced_as: Option<CostCategory>,
    },
    Flag,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldRule {
    pub fn required(
        name: &'static str,
        kind: FieldKind,
    ) -> Self {
        Self {
            name,
            kind,
            required: true,
        }
    }

    pub fn optional(
        name: &'static str,
        kind: FieldKind,
    ) -> Self {
        Self {
            name,
            kind,
            required: false,
        }
    }

    /// Checks one answer against this rule. `None` means the answer is fine.
    pub fn check(
        &self,
        value: Option<&AnswerValue>,
    ) -> Option<ValidationError> {
        let value = match value {
            Some(v) if !v.is_blank() => v,
            _ if self.required => return Some(ValidationError::required(self.name)),
            _ => return None,
        };

        let problem = match &self.kind {
            FieldKind::Text { max_len } => match value.as_text() {
                Some(text) if text.trim().chars().count() > *max_len => {
                    Some(format!("must be at most {max_len} characters"))
                }
                Some(_) => None,
                None => Some(self.wrong_kind("text", value)),
            },
            FieldKind::Email => match value.as_text() {
                Some(text) if EMAIL_PATTERN.is_match(text.trim()) => None,
                Some(_) => Some("must be a valid e-mail address".to_string()),
                None => Some(self.wrong_kind("text", value)),
            },
            FieldKind::Number { min, max } => match value.as_number() {
                Some(n) if n < *min => Some(format!("must be at least {min}")),
                Some(n) if n > *max => Some(format!("must be at most {max}")),
                Some(_) => None,
                None => Some(self.wrong_kind("number", value)),
            },
            FieldKind::Choice { options, .. } => match value.as_text() {
                Some(choice) if options.iter().any(|o| *o == choice.trim()) => None,
                Some(choice) => Some(format!("'{}' is not an allowed value", choice.trim())),
                None => Some(self.wrong_kind("text", value)),
            },
            FieldKind::MultiChoice { options, .. } => match value.as_selection() {
                Some(items) => items
                    .iter()
                    .find(|item| !options.iter().any(|o| *o == item.as_str()))
                    .map(|item| format!("'{item}' is not an allowed value")),
                None => Some(self.wrong_kind("selection", value)),
            },
            FieldKind::Flag => match value.as_flag() {
                Some(_) => None,
                None => Some(self.wrong_kind("flag", value)),
            },
        };

        problem.map(|message| ValidationError::new(self.name, message))
    }

    /// Options of a priced choice field, with the category they are priced in.
    pub fn priced_options(&self) -> Option<(CostCategory, &'static [&'static str])> {
        match &self.kind {
            FieldKind::Choice {
                options,
                priced_as: Some(category),
            }
            | FieldKind::MultiChoice {
                options,
                priced_as: Some(category),
            } => Some((*category, *options)),
            _ => None,
        }
    }

    fn wrong_kind(
        &self,
        expected: &str,
        value: &AnswerValue,
    ) -> String {
        format!("expected a {expected}, got a {}", value.kind_name())
    }
}
