use std::sync::Arc;

use axum::http::StatusCode;
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::domain::{Answers, EvaluationType, Question, ResponseKey, ScoreScale};
use super::reference::{ReferenceData, ReferenceLoader, ReferenceSources};
use super::report::{self, AdminPanel, ReportKind};
use super::session::{Screen, SessionError, SessionId, SessionRegistry, SessionView};
use super::store::{ResponseStore, StoreError, TableGateway, UpsertOutcome};

/// Documents and credential the service works against.
#[derive(Debug, Clone, Default)]
pub struct ScorecardSettings {
    pub sources: ReferenceSources,
    pub responses_document: String,
    pub admin_password: Option<String>,
}

/// Facade composing reference data, access control, the response store, and
/// reporting behind per-session operations.
pub struct ScorecardService<G> {
    reference: ReferenceLoader<G>,
    responses: ResponseStore<G>,
    sessions: SessionRegistry,
    admin_password: Option<String>,
    clock: fn() -> NaiveDateTime,
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[derive(Debug, Clone, Serialize)]
pub struct SupplierEntry {
    pub name: String,
    /// Submitted during this session.
    pub handled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormQuestion {
    pub number: usize,
    pub text: String,
    pub weight_percent: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScaleLegend {
    pub value: f64,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormStatus {
    Open,
    AlreadySubmitted,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationForm {
    pub evaluation: EvaluationType,
    pub category: String,
    pub supplier: String,
    pub status: FormStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub questions: Vec<FormQuestion>,
    pub scale: Vec<f64>,
    pub default_score: f64,
    pub legend: Vec<ScaleLegend>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluationSubmission {
    #[serde(rename = "type")]
    pub evaluation: EvaluationType,
    pub category: String,
    pub supplier: String,
    #[serde(default)]
    pub answers: Answers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Recorded,
    AlreadySubmitted,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub status: SubmissionStatus,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<UpsertOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryAnswer {
    pub number: usize,
    pub question: String,
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummaryEntry {
    pub evaluation: EvaluationType,
    pub category: String,
    pub supplier: String,
    pub date: String,
    pub time: String,
    pub answers: Vec<SummaryAnswer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub email: String,
    pub entries: Vec<SummaryEntry>,
}

#[derive(Debug, Clone)]
pub struct ReportExport {
    pub kind: ReportKind,
    pub file_name: &'static str,
    pub bytes: Vec<u8>,
}

impl<G> ScorecardService<G>
where
    G: TableGateway + 'static,
{
    pub fn new(gateway: Arc<G>, settings: ScorecardSettings) -> Self {
        let ScorecardSettings {
            sources,
            responses_document,
            admin_password,
        } = settings;

        Self {
            reference: ReferenceLoader::new(gateway.clone(), sources),
            responses: ResponseStore::new(gateway, responses_document),
            sessions: SessionRegistry::default(),
            admin_password,
            clock: local_now,
        }
    }

    /// Replace the wall clock used to stamp submissions.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn open_session(&self) -> Result<SessionView, ScorecardError> {
        let id = self.sessions.open()?;
        self.session(id)
    }

    pub fn session(&self, id: SessionId) -> Result<SessionView, ScorecardError> {
        Ok(self.sessions.snapshot(id)?.view(id))
    }

    /// Start an evaluator session; refused when the e-mail holds no grant.
    pub fn login(&self, id: SessionId, email: &str) -> Result<SessionView, ScorecardError> {
        self.sessions.snapshot(id)?;
        let email = email.trim();
        let reference = Arc::new(self.reference.load()?);

        if reference.access.types_for(email).is_empty() {
            warn!(%email, "login refused: no access grants");
            return Err(ScorecardError::NoPermission {
                email: email.to_string(),
            });
        }

        self.sessions
            .update(id, |context| context.sign_in(email, reference))?;
        info!(%email, "evaluator logged in");
        self.session(id)
    }

    pub fn admin_login(&self, id: SessionId, password: &str) -> Result<SessionView, ScorecardError> {
        self.sessions.snapshot(id)?;
        let expected = self
            .admin_password
            .as_deref()
            .ok_or(ScorecardError::AdminDisabled)?;
        if password != expected {
            warn!("admin login refused: wrong password");
            return Err(ScorecardError::InvalidAdminPassword);
        }

        let reference = Arc::new(self.reference.load()?);
        self.sessions
            .update(id, |context| context.sign_in_admin(reference))?;
        info!("administrator logged in");
        self.session(id)
    }

    pub fn navigate(&self, id: SessionId, screen: Screen) -> Result<SessionView, ScorecardError> {
        let context = self.sessions.snapshot(id)?;
        let allowed = context.screen() != Screen::Final
            && match screen {
                Screen::Evaluate | Screen::Summary => !context.email().is_empty(),
                Screen::Admin => context.is_admin(),
                Screen::Login | Screen::Final => false,
            };
        if !allowed {
            return Err(ScorecardError::InvalidNavigation { requested: screen });
        }

        self.sessions.update(id, |context| context.go_to(screen))?;
        self.session(id)
    }

    /// Close the evaluation round; only logout is possible afterwards.
    pub fn finish(&self, id: SessionId) -> Result<SessionView, ScorecardError> {
        let context = self.sessions.snapshot(id)?;
        if context.email().is_empty() {
            return Err(ScorecardError::NotLoggedIn);
        }
        self.sessions.update(id, |context| context.go_to(Screen::Final))?;
        self.session(id)
    }

    /// End the session. The old id becomes unknown; the returned view carries
    /// a fresh anonymous session.
    pub fn logout(&self, id: SessionId) -> Result<SessionView, ScorecardError> {
        let fresh = self.sessions.replace(id)?;
        debug!(%id, %fresh, "session logged out");
        self.session(fresh)
    }

    /// Logged-in evaluator on the given screen, with the session's reference snapshot.
    fn evaluator(
        &self,
        id: SessionId,
        screen: Screen,
    ) -> Result<(String, Arc<ReferenceData>), ScorecardError> {
        let context = self.sessions.snapshot(id)?;
        let reference = match context.reference() {
            Some(reference) if !context.email().is_empty() => reference,
            _ => return Err(ScorecardError::NotLoggedIn),
        };
        if context.screen() != screen {
            return Err(ScorecardError::WrongScreen {
                expected: screen.label(),
                actual: context.screen().label(),
            });
        }
        Ok((context.email().to_string(), reference))
    }

    fn authorize(
        reference: &ReferenceData,
        email: &str,
        evaluation: EvaluationType,
        category: &str,
    ) -> Result<(), ScorecardError> {
        if reference.access.is_authorized(email, evaluation, category) {
            Ok(())
        } else {
            warn!(%email, %evaluation, %category, "access denied");
            Err(ScorecardError::AccessDenied {
                evaluation,
                category: category.to_string(),
            })
        }
    }

    fn listed_supplier(
        reference: &ReferenceData,
        category: &str,
        supplier: &str,
    ) -> Result<(), ScorecardError> {
        if reference
            .access
            .suppliers_for(category)
            .iter()
            .any(|listed| listed == supplier)
        {
            Ok(())
        } else {
            Err(ScorecardError::UnknownSupplier {
                category: category.to_string(),
                supplier: supplier.to_string(),
            })
        }
    }

    fn questions(
        reference: &ReferenceData,
        evaluation: EvaluationType,
    ) -> Result<Vec<Question>, ScorecardError> {
        let questions = reference.questions.for_type(evaluation);
        if questions.is_empty() {
            return Err(ScorecardError::NoQuestions(evaluation));
        }
        Ok(questions.to_vec())
    }

    pub fn evaluation_types(&self, id: SessionId) -> Result<Vec<EvaluationType>, ScorecardError> {
        let (email, reference) = self.evaluator(id, Screen::Evaluate)?;
        Ok(reference.access.types_for(&email))
    }

    pub fn categories(
        &self,
        id: SessionId,
        evaluation: EvaluationType,
    ) -> Result<Vec<String>, ScorecardError> {
        let (email, reference) = self.evaluator(id, Screen::Evaluate)?;
        Ok(reference.access.categories_for(&email, evaluation))
    }

    pub fn suppliers(
        &self,
        id: SessionId,
        evaluation: EvaluationType,
        category: &str,
    ) -> Result<Vec<SupplierEntry>, ScorecardError> {
        let (email, reference) = self.evaluator(id, Screen::Evaluate)?;
        Self::authorize(&reference, &email, evaluation, category)?;

        let context = self.sessions.snapshot(id)?;
        Ok(reference
            .access
            .suppliers_for(category)
            .into_iter()
            .map(|name| SupplierEntry {
                handled: context.is_handled(evaluation, &name),
                name,
            })
            .collect())
    }

    pub fn form(
        &self,
        id: SessionId,
        evaluation: EvaluationType,
        category: &str,
        supplier: &str,
    ) -> Result<EvaluationForm, ScorecardError> {
        let (email, reference) = self.evaluator(id, Screen::Evaluate)?;
        Self::authorize(&reference, &email, evaluation, category)?;
        Self::listed_supplier(&reference, category, supplier)?;
        let questions = Self::questions(&reference, evaluation)?;

        let key = ResponseKey::new(&email, category, supplier);
        let already_submitted = match self.responses.fetch(evaluation) {
            Ok(table) => table.contains(&key),
            Err(error) => {
                warn!(%evaluation, %error, "response table unreadable; assuming no prior answer");
                false
            }
        };

        let (status, questions) = if already_submitted {
            (FormStatus::AlreadySubmitted, Vec::new())
        } else {
            let numbered = questions
                .iter()
                .enumerate()
                .map(|(index, question)| FormQuestion {
                    number: index + 1,
                    text: question.text.clone(),
                    weight_percent: question.weight_percent(),
                })
                .collect();
            (FormStatus::Open, numbered)
        };

        Ok(EvaluationForm {
            evaluation,
            category: category.to_string(),
            supplier: supplier.to_string(),
            status,
            questions,
            scale: ScoreScale::VALUES.to_vec(),
            default_score: ScoreScale::DEFAULT,
            legend: ScoreScale::LEGEND
                .into_iter()
                .map(|(value, label)| ScaleLegend { value, label })
                .collect(),
        })
    }

    fn validate_answers(questions: &[Question], answers: &Answers) -> Result<(), ScorecardError> {
        for (question, score) in answers {
            if !questions.iter().any(|known| &known.text == question) {
                return Err(ScorecardError::UnknownQuestion(question.clone()));
            }
            if !ScoreScale::contains(*score) {
                return Err(ScorecardError::InvalidScore {
                    question: question.clone(),
                    score: *score,
                });
            }
        }
        Ok(())
    }

    /// Permission, questions, and scale are checked before anything is written.
    pub fn submit(
        &self,
        id: SessionId,
        submission: EvaluationSubmission,
    ) -> Result<SubmissionReceipt, ScorecardError> {
        let EvaluationSubmission {
            evaluation,
            category,
            supplier,
            answers,
        } = submission;

        let (email, reference) = self.evaluator(id, Screen::Evaluate)?;
        Self::authorize(&reference, &email, evaluation, &category)?;
        Self::listed_supplier(&reference, &category, &supplier)?;
        let questions = Self::questions(&reference, evaluation)?;
        Self::validate_answers(&questions, &answers)?;

        let key = ResponseKey::new(&email, &category, &supplier);
        if self.responses.fetch(evaluation)?.contains(&key) {
            info!(%email, %evaluation, %category, %supplier, "duplicate submission ignored");
            return Ok(SubmissionReceipt {
                status: SubmissionStatus::AlreadySubmitted,
                message: "this evaluation was already submitted; only one submission per user is allowed",
                outcome: None,
            });
        }

        let outcome = self
            .responses
            .upsert(evaluation, &key, &answers, &questions, (self.clock)())
            .inspect_err(|error| {
                warn!(%email, %evaluation, %category, %supplier, %error, "submission failed")
            })?;

        self.sessions
            .update(id, |context| context.mark_handled(evaluation, &supplier))?;
        info!(%email, %evaluation, %category, %supplier, ?outcome, "evaluation recorded");

        Ok(SubmissionReceipt {
            status: SubmissionStatus::Recorded,
            message: "evaluation recorded",
            outcome: Some(outcome),
        })
    }

    /// The evaluator's stored answers across every type they are granted.
    pub fn summary(&self, id: SessionId) -> Result<UserSummary, ScorecardError> {
        let (email, reference) = self.evaluator(id, Screen::Summary)?;

        let mut entries = Vec::new();
        for evaluation in reference.access.types_for(&email) {
            let questions = reference.questions.for_type(evaluation);
            if questions.is_empty() {
                continue;
            }
            let table = match self.responses.fetch(evaluation) {
                Ok(table) => table,
                Err(error) => {
                    warn!(%evaluation, %error, "response table unreadable; omitted from summary");
                    continue;
                }
            };

            entries.extend(table.rows_for_email(&email).map(|row| SummaryEntry {
                evaluation,
                category: row.category.clone(),
                supplier: row.supplier.clone(),
                date: row.date.clone(),
                time: row.time.clone(),
                answers: questions
                    .iter()
                    .enumerate()
                    .map(|(index, question)| SummaryAnswer {
                        number: index + 1,
                        question: question.text.clone(),
                        score: row.raw_score(&question.text),
                    })
                    .collect(),
            }));
        }

        Ok(UserSummary { email, entries })
    }

    fn admin_reference(&self, id: SessionId) -> Result<Arc<ReferenceData>, ScorecardError> {
        let context = self.sessions.snapshot(id)?;
        match context.reference() {
            Some(reference) if context.is_admin() => Ok(reference),
            _ => Err(ScorecardError::AdminRequired),
        }
    }

    pub fn admin_panel(&self, id: SessionId) -> Result<AdminPanel, ScorecardError> {
        let reference = self.admin_reference(id)?;
        Ok(self.panel(&reference))
    }

    pub fn export(&self, id: SessionId, kind: ReportKind) -> Result<ReportExport, ScorecardError> {
        let panel = self.admin_panel(id)?;
        let bytes = panel.table(kind).to_csv()?;
        info!(report = %kind, bytes = bytes.len(), "admin export generated");
        Ok(ReportExport {
            kind,
            file_name: kind.file_name(),
            bytes,
        })
    }

    /// Panel built from freshly loaded reference data, outside any session.
    pub fn operator_panel(&self) -> Result<AdminPanel, ScorecardError> {
        let reference = self.reference.load()?;
        Ok(self.panel(&reference))
    }

    fn panel(&self, reference: &ReferenceData) -> AdminPanel {
        let responses = self.responses.fetch_all();
        report::admin_panel(&responses, &reference.questions)
    }
}

/// Error raised by the scorecard service.
#[derive(Debug, thiserror::Error)]
pub enum ScorecardError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("log in with a registered e-mail first")]
    NotLoggedIn,
    #[error("administrator access required")]
    AdminRequired,
    #[error("administrator login is disabled")]
    AdminDisabled,
    #[error("incorrect administrator password")]
    InvalidAdminPassword,
    #[error("e-mail '{email}' has no registered permission")]
    NoPermission { email: String },
    #[error("access denied for {evaluation} evaluations in category '{category}'")]
    AccessDenied {
        evaluation: EvaluationType,
        category: String,
    },
    #[error("supplier '{supplier}' is not listed in category '{category}'")]
    UnknownSupplier { category: String, supplier: String },
    #[error("no questions configured for {0} evaluations")]
    NoQuestions(EvaluationType),
    #[error("'{0}' is not a question of this evaluation")]
    UnknownQuestion(String),
    #[error("score {score} for '{question}' is not on the permitted scale")]
    InvalidScore { question: String, score: f64 },
    #[error("screen {requested:?} cannot be opened from this session")]
    InvalidNavigation { requested: Screen },
    #[error("this action belongs to the '{expected}' screen, current screen is '{actual}'")]
    WrongScreen {
        expected: &'static str,
        actual: &'static str,
    },
    #[error("unknown report '{0}'")]
    UnknownReport(String),
    #[error("the spreadsheet service failed, please retry")]
    Store(#[from] StoreError),
    #[error("export failed: {0}")]
    Export(#[from] csv::Error),
    #[error("background task failed: {0}")]
    Worker(String),
}

impl ScorecardError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ScorecardError::Session(SessionError::Unavailable) | ScorecardError::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ScorecardError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ScorecardError::Session(_)
            | ScorecardError::NotLoggedIn
            | ScorecardError::InvalidAdminPassword => StatusCode::UNAUTHORIZED,
            ScorecardError::AdminRequired
            | ScorecardError::AdminDisabled
            | ScorecardError::NoPermission { .. }
            | ScorecardError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            ScorecardError::InvalidNavigation { .. } | ScorecardError::WrongScreen { .. } => {
                StatusCode::CONFLICT
            }
            ScorecardError::UnknownSupplier { .. } | ScorecardError::UnknownReport(_) => {
                StatusCode::NOT_FOUND
            }
            ScorecardError::NoQuestions(_)
            | ScorecardError::UnknownQuestion(_)
            | ScorecardError::InvalidScore { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ScorecardError::Store(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Technical detail for operators; only remote-store failures carry one.
    pub fn detail(&self) -> Option<String> {
        match self {
            ScorecardError::Store(source) => Some(source.to_string()),
            _ => None,
        }
    }
}
