use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use super::access::AccessControl;
use super::domain::{AccessGrant, EvaluationType, Question, QuestionSet, SupplierListing};
use super::normalizer::normalize;
use super::store::{Cell, StoreError, TableGateway};

/// Where the reference tables live.
#[derive(Debug, Clone, Default)]
pub struct ReferenceSources {
    pub questions_document: String,
    pub questions_table: String,
    pub access_document: String,
    pub access_table: String,
    pub categories_table: String,
}

/// Questions and access tables captured at session start.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    pub questions: QuestionSet,
    pub access: AccessControl,
}

pub struct ReferenceLoader<G> {
    gateway: Arc<G>,
    sources: ReferenceSources,
}

impl<G> ReferenceLoader<G>
where
    G: TableGateway,
{
    pub fn new(gateway: Arc<G>, sources: ReferenceSources) -> Self {
        Self { gateway, sources }
    }

    fn rows(&self, document: &str, table: &str) -> Result<Vec<Vec<Cell>>, StoreError> {
        self.gateway
            .read_displayed_table(document, table)?
            .ok_or_else(|| StoreError::TableNotFound {
                table: table.to_string(),
            })
    }

    pub fn load_questions(&self) -> Result<QuestionSet, StoreError> {
        let rows = self.rows(
            &self.sources.questions_document,
            &self.sources.questions_table,
        )?;
        Ok(parse_questions(&rows))
    }

    pub fn load_access(&self) -> Result<Vec<AccessGrant>, StoreError> {
        let rows = self.rows(&self.sources.access_document, &self.sources.access_table)?;
        Ok(parse_access(&rows))
    }

    pub fn load_suppliers(&self) -> Result<Vec<SupplierListing>, StoreError> {
        let rows = self.rows(
            &self.sources.access_document,
            &self.sources.categories_table,
        )?;
        Ok(parse_suppliers(&rows))
    }

    pub fn load(&self) -> Result<ReferenceData, StoreError> {
        let questions = self.load_questions()?;
        let grants = self.load_access()?;
        let listings = self.load_suppliers()?;
        info!(
            grants = grants.len(),
            listings = listings.len(),
            "loaded scorecard reference data"
        );
        Ok(ReferenceData {
            questions,
            access: AccessControl::new(grants, listings),
        })
    }
}

fn header_index(header: &[Cell], name: &str) -> Option<usize> {
    header.iter().position(|cell| cell.as_text() == name)
}

fn cell_text(row: &[Cell], index: usize) -> String {
    row.get(index).map(Cell::as_text).unwrap_or_default()
}

/// Questions per type from the `{Type}` / `Peso_{Type}` column pairs.
pub fn parse_questions(rows: &[Vec<Cell>]) -> QuestionSet {
    let mut by_type = BTreeMap::new();
    let Some((header, body)) = rows.split_first() else {
        return QuestionSet::default();
    };

    for evaluation in EvaluationType::ordered() {
        let text_column = header_index(header, evaluation.label());
        let weight_column = header_index(header, &evaluation.weight_column());
        let (Some(text_column), Some(weight_column)) = (text_column, weight_column) else {
            warn!(%evaluation, "questions table lacks columns for evaluation type");
            by_type.insert(evaluation, Vec::new());
            continue;
        };

        let questions = body
            .iter()
            .filter_map(|row| {
                let text = cell_text(row, text_column);
                let weight = row
                    .get(weight_column)
                    .and_then(normalize)
                    .unwrap_or(0.0);
                let usable = !text.is_empty() && !text.eq_ignore_ascii_case("nan") && weight > 0.0;
                usable.then(|| Question::new(text, weight / 100.0))
            })
            .collect();
        by_type.insert(evaluation, questions);
    }

    QuestionSet::new(by_type)
}

/// Grants from the positional (e-mail, type, category) columns.
pub fn parse_access(rows: &[Vec<Cell>]) -> Vec<AccessGrant> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let email = cell_text(row, 0);
            let raw_type = cell_text(row, 1);
            let category = cell_text(row, 2);
            if email.is_empty() || category.is_empty() {
                return None;
            }
            match EvaluationType::parse(&raw_type) {
                Some(evaluation) => Some(AccessGrant {
                    email,
                    evaluation,
                    category,
                }),
                None => {
                    warn!(%email, evaluation = %raw_type, "skipping grant with unknown evaluation type");
                    None
                }
            }
        })
        .collect()
}

/// Listings from the positional (category, supplier) columns.
pub fn parse_suppliers(rows: &[Vec<Cell>]) -> Vec<SupplierListing> {
    rows.iter()
        .skip(1)
        .filter_map(|row| {
            let category = cell_text(row, 0);
            let supplier = cell_text(row, 1);
            (!category.is_empty() && !supplier.is_empty())
                .then_some(SupplierListing { category, supplier })
        })
        .collect()
}
