mod completeness;
mod export;
mod overview;
mod ranking;
pub mod views;

pub use completeness::completeness;
pub use export::{ReportKind, ReportTable};
pub use overview::overview;
pub use ranking::{supplier_scores, top_suppliers, weighted_total};
pub use views::AdminPanel;

use crate::scorecard::domain::{QuestionSet, StoredResponse};

/// Suppliers kept per category in the ranking.
pub const TOP_SUPPLIERS_PER_CATEGORY: usize = 3;

pub fn admin_panel(responses: &[StoredResponse], questions: &QuestionSet) -> AdminPanel {
    AdminPanel {
        overview: overview(responses, questions),
        ranking: top_suppliers(responses, questions, TOP_SUPPLIERS_PER_CATEGORY),
        completeness: completeness(responses, questions),
    }
}
