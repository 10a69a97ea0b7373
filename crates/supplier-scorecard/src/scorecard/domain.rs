use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// One of the three fixed questionnaires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum EvaluationType {
    #[serde(rename = "Comercial")]
    Commercial,
    #[serde(rename = "Técnica")]
    Technical,
    #[serde(rename = "ESG")]
    Esg,
}

impl EvaluationType {
    pub const fn ordered() -> [Self; 3] {
        [Self::Commercial, Self::Technical, Self::Esg]
    }

    /// Name used in the questions table, access grants, and reports.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Commercial => "Comercial",
            Self::Technical => "Técnica",
            Self::Esg => "ESG",
        }
    }

    /// Worksheet holding the responses for this questionnaire.
    ///
    /// The ESG worksheet is named differently from its label; every read and
    /// write of response tables must go through this lookup.
    pub const fn table_name(self) -> &'static str {
        match self {
            Self::Commercial => "Comercial",
            Self::Technical => "Técnica",
            Self::Esg => "Esg",
        }
    }

    pub fn weight_column(self) -> String {
        format!("Peso_{}", self.label())
    }

    /// Case-insensitive match against the label.
    pub fn parse(raw: &str) -> Option<Self> {
        let wanted = raw.trim().to_lowercase();
        Self::ordered()
            .into_iter()
            .find(|kind| kind.label().to_lowercase() == wanted)
    }
}

impl fmt::Display for EvaluationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl TryFrom<String> for EvaluationType {
    type Error = UnknownEvaluationType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownEvaluationType(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown evaluation type '{0}'")]
pub struct UnknownEvaluationType(pub String);

/// A weighted question. The text doubles as its identifier and column header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    /// Fraction in (0, 1].
    pub weight: f64,
}

impl Question {
    pub fn new(text: impl Into<String>, weight: f64) -> Self {
        Self {
            text: text.into(),
            weight,
        }
    }

    pub fn weight_percent(&self) -> f64 {
        self.weight * 100.0
    }
}

/// Questions per evaluation type, in source order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuestionSet {
    by_type: BTreeMap<EvaluationType, Vec<Question>>,
}

impl QuestionSet {
    pub fn new(by_type: BTreeMap<EvaluationType, Vec<Question>>) -> Self {
        Self { by_type }
    }

    pub fn for_type(&self, evaluation: EvaluationType) -> &[Question] {
        self.by_type
            .get(&evaluation)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn insert(&mut self, evaluation: EvaluationType, questions: Vec<Question>) {
        self.by_type.insert(evaluation, questions);
    }
}

/// Grant allowing a user to evaluate suppliers of one category for one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessGrant {
    pub email: String,
    pub evaluation: EvaluationType,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupplierListing {
    pub category: String,
    pub supplier: String,
}

/// The nine answers a questionnaire slider may produce.
pub struct ScoreScale;

impl ScoreScale {
    pub const VALUES: [f64; 9] = [1.0, 1.25, 1.5, 1.75, 2.0, 2.25, 2.5, 2.75, 3.0];
    pub const DEFAULT: f64 = 2.0;
    pub const LEGEND: [(f64, &'static str); 3] = [(1.0, "Ruim"), (2.0, "Regular"), (3.0, "Bom")];

    pub fn contains(value: f64) -> bool {
        Self::VALUES
            .iter()
            .any(|permitted| (permitted - value).abs() < 1e-9)
    }
}

/// Answers keyed by question text.
pub type Answers = BTreeMap<String, f64>;

/// Identity of a stored response within one evaluation type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseKey {
    pub email: String,
    pub category: String,
    pub supplier: String,
}

impl ResponseKey {
    pub fn new(
        email: impl Into<String>,
        category: impl Into<String>,
        supplier: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            category: category.into(),
            supplier: supplier.into(),
        }
    }

    /// E-mail compares case-insensitively; category and supplier exactly.
    pub fn matches(&self, row: &ResponseRow) -> bool {
        row.email.trim().to_lowercase() == self.email.trim().to_lowercase()
            && row.category == self.category
            && row.supplier == self.supplier
    }
}

/// One stored questionnaire answer set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResponseRow {
    pub date: String,
    pub time: String,
    pub email: String,
    pub category: String,
    pub supplier: String,
    /// Raw answer per question; `None` when the cell is blank or unreadable.
    pub scores: BTreeMap<String, Option<f64>>,
    /// Weighted answer per question as stored at submission time.
    pub weighted: BTreeMap<String, Option<f64>>,
}

impl ResponseRow {
    pub fn raw_score(&self, question: &str) -> Option<f64> {
        self.scores.get(question).copied().flatten()
    }

    pub fn key(&self) -> ResponseKey {
        ResponseKey::new(&self.email, &self.category, &self.supplier)
    }
}

/// A response row tagged with the questionnaire it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredResponse {
    pub evaluation: EvaluationType,
    pub row: ResponseRow,
}
