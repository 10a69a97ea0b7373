//! Supplier evaluation scorecards: weighted questionnaires answered per category,
//! stored in shared spreadsheets and aggregated for administrators.

pub mod config;
pub mod error;
pub mod scorecard;
pub mod telemetry;
