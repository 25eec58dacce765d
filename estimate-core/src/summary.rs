//! Human-readable and JSON renderings of a finished estimate.
//!
//! Presentation only: every amount shown here was computed by the pricing
//! calculator. The only arithmetic is display rounding.

use std::fmt::Write;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::calculations::common::{round_half_up, round_to_unit};
use crate::models::{ContactDetails, PriceBreakdown};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryFormat {
    pub currency_symbol: String,
}

impl Default for SummaryFormat {
    fn default() -> Self {
        Self {
            currency_symbol: "€".to_string(),
        }
    }
}

impl SummaryFormat {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    /// `1234567.891` → `"1,234,567.89 €"`.
    pub fn amount(
        &self,
        value: Decimal,
    ) -> String {
        format!(
            "{} {}",
            group_thousands(&format!("{:.2}", round_half_up(value))),
            self.currency_symbol
        )
    }

    /// Whole-unit amount, for the grand total.
    pub fn whole_amount(
        &self,
        value: Decimal,
    ) -> String {
        format!(
            "{} {}",
            group_thousands(&format!("{:.0}", round_to_unit(value))),
            self.currency_symbol
        )
    }
}

/// Adds `,` separators to the integer part of a formatted number.
fn group_thousands(text: &str) -> String {
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}

/// Everything shown to the client once the estimate is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EstimateSummary<'a> {
    pub contact: Option<&'a ContactDetails>,
    pub breakdown: &'a PriceBreakdown,
}

impl<'a> EstimateSummary<'a> {
    pub fn new(breakdown: &'a PriceBreakdown) -> Self {
        Self {
            contact: None,
            breakdown,
        }
    }

    pub fn with_contact(
        mut self,
        contact: &'a ContactDetails,
    ) -> Self {
        self.contact = Some(contact);
        self
    }

    pub fn render_text(
        &self,
        format: &SummaryFormat,
    ) -> String {
        let breakdown = self.breakdown;
        let mut out = String::new();

        // Writing to a String cannot fail.
        let _ = writeln!(out, "Construction estimate (cost table {})", breakdown.cost_table_version);
        if let Some(contact) = self.contact {
            let _ = writeln!(out, "Prepared for {} <{}>", contact.name, contact.email);
        }

        for subtotal in &breakdown.subtotals {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "{:<40}{:>20}",
                subtotal.category.label(),
                format.amount(subtotal.amount)
            );
            for item in breakdown.line_items_in(subtotal.category) {
                let unit = item.unit.map_or("", |u| u.symbol());
                let _ = writeln!(
                    out,
                    "  {:<38}{:>20}",
                    format!(
                        "{} {} {} × {}",
                        item.selector,
                        round_half_up(item.quantity),
                        unit,
                        format.amount(item.unit_cost)
                    ),
                    format.amount(item.amount)
                );
            }
        }

        let _ = writeln!(out);
        let _ = writeln!(out, "{:<40}{:>20}", "Total", format.whole_amount(breakdown.total));

        if breakdown.has_warnings() {
            let _ = writeln!(out);
            let _ = writeln!(out, "Warnings:");
            for warning in &breakdown.warnings {
                let _ = writeln!(out, "  - {warning}");
            }
        }

        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
