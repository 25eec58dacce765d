mod answers;
mod auth;
mod breakdown;
mod cost_entry;
mod lead;

pub use answers::{AnswerValue, FormAnswers};
pub use auth::{AccessError, AuthContext, Role};
pub use breakdown::{CategorySubtotal, LineItem, PriceBreakdown, PricingWarning};
pub use cost_entry::{CostCategory, CostTableVersion, PricingUnit, UnitCostEntry};
pub use lead::{ContactDetails, Lead, NewLead};
