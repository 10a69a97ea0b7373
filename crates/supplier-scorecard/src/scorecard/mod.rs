//! Supplier evaluation scorecard: reference data, access control, response
//! storage, session flow, and administrator reporting.

pub mod access;
pub mod domain;
pub mod normalizer;
pub mod reference;
pub mod report;
pub mod router;
pub mod service;
pub mod session;
pub mod store;

#[cfg(test)]
mod tests;

pub use access::AccessControl;
pub use domain::{
    AccessGrant, Answers, EvaluationType, Question, QuestionSet, ResponseKey, ResponseRow,
    ScoreScale, StoredResponse, SupplierListing,
};
pub use reference::{ReferenceData, ReferenceLoader, ReferenceSources};
pub use report::{AdminPanel, ReportKind, ReportTable};
pub use router::scorecard_router;
pub use service::{
    EvaluationForm, EvaluationSubmission, FormStatus, ReportExport, ScorecardError,
    ScorecardService, ScorecardSettings, SubmissionReceipt, SubmissionStatus, SupplierEntry,
    UserSummary,
};
pub use session::{Screen, SessionError, SessionId, SessionView};
pub use store::{
    Cell, InMemoryTables, ResponseStore, StoreError, TableGateway, TableRows, UpsertOutcome,
};
