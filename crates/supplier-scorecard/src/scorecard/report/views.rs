use serde::Serialize;

use crate::scorecard::domain::EvaluationType;

/// Per-type averages and the blended score of one supplier in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierScore {
    pub category: String,
    pub supplier: String,
    pub commercial: f64,
    pub technical: f64,
    pub esg: f64,
    pub final_score: f64,
}

impl SupplierScore {
    pub(crate) fn new(category: &str, supplier: &str) -> Self {
        Self {
            category: category.to_string(),
            supplier: supplier.to_string(),
            commercial: 0.0,
            technical: 0.0,
            esg: 0.0,
            final_score: 0.0,
        }
    }

    pub fn average_for(&self, evaluation: EvaluationType) -> f64 {
        match evaluation {
            EvaluationType::Commercial => self.commercial,
            EvaluationType::Technical => self.technical,
            EvaluationType::Esg => self.esg,
        }
    }

    pub(crate) fn set_average(&mut self, evaluation: EvaluationType, value: f64) {
        match evaluation {
            EvaluationType::Commercial => self.commercial = value,
            EvaluationType::Technical => self.technical = value,
            EvaluationType::Esg => self.esg = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryRanking {
    pub category: String,
    pub suppliers: Vec<SupplierScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessGroup {
    pub email: String,
    pub category: String,
    pub evaluation: EvaluationType,
    pub complete: usize,
    pub incomplete: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompleteResponse {
    pub email: String,
    pub category: String,
    pub supplier: String,
    pub evaluation: EvaluationType,
    pub answered: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompletenessReport {
    pub groups: Vec<CompletenessGroup>,
    pub incomplete: Vec<IncompleteResponse>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCount {
    pub evaluation: EvaluationType,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupplierActivity {
    pub supplier: String,
    pub evaluations: usize,
    pub mean_weighted_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionScore {
    pub question: String,
    pub raw: Option<f64>,
    pub weighted: Option<f64>,
}

/// One stored evaluation as listed in the admin panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationListing {
    pub evaluation: EvaluationType,
    pub date: String,
    pub time: String,
    pub email: String,
    pub category: String,
    pub supplier: String,
    pub scores: Vec<QuestionScore>,
    pub weighted_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminOverview {
    pub total_evaluations: usize,
    pub per_type: Vec<TypeCount>,
    pub per_supplier: Vec<SupplierActivity>,
    pub evaluations: Vec<EvaluationListing>,
}

/// Everything the admin panel shows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AdminPanel {
    pub overview: AdminOverview,
    pub ranking: Vec<CategoryRanking>,
    pub completeness: CompletenessReport,
}
