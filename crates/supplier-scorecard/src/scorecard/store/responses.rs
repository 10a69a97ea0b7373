use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::gateway::{Cell, StoreError, TableGateway, TableRows};
use crate::scorecard::domain::{
    Answers, EvaluationType, Question, ResponseKey, ResponseRow, StoredResponse,
};
use crate::scorecard::normalizer::normalize;

pub const IDENTITY_COLUMNS: [&str; 5] = ["Data", "Hora", "E-mail", "Categoria", "Fornecedor"];
pub const WEIGHTED_SUFFIX: &str = " (PONDERADA)";

const DATE_FORMAT: &str = "%d/%m/%Y";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Header for a response table holding the given questions.
pub fn column_set(questions: &[Question]) -> Vec<String> {
    IDENTITY_COLUMNS
        .iter()
        .map(|name| name.to_string())
        .chain(questions.iter().map(|question| question.text.clone()))
        .chain(
            questions
                .iter()
                .map(|question| format!("{}{}", question.text, WEIGHTED_SUFFIX)),
        )
        .collect()
}

/// Typed view of one response table. `rows[i]` lives on sheet row `i + 2`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseTable {
    pub header: Vec<String>,
    pub rows: Vec<ResponseRow>,
}

impl ResponseTable {
    pub fn from_rows(rows: TableRows) -> Self {
        let mut iter = rows.into_iter();
        let header: Vec<String> = match iter.next() {
            Some(header) => header.iter().map(Cell::as_text).collect(),
            None => return Self::default(),
        };

        let rows = iter.map(|cells| parse_row(&header, &cells)).collect();
        Self { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    pub fn contains(&self, key: &ResponseKey) -> bool {
        self.rows.iter().any(|row| key.matches(row))
    }

    pub fn positions(&self, key: &ResponseKey) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| key.matches(row))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn rows_for_email<'a>(&'a self, email: &'a str) -> impl Iterator<Item = &'a ResponseRow> {
        let wanted = email.trim().to_lowercase();
        self.rows
            .iter()
            .filter(move |row| row.email.trim().to_lowercase() == wanted)
    }
}

fn parse_row(header: &[String], cells: &[Cell]) -> ResponseRow {
    let mut row = ResponseRow::default();

    for (index, column) in header.iter().enumerate() {
        let cell = cells.get(index).unwrap_or(&Cell::Empty);
        match column.as_str() {
            "Data" => row.date = cell.as_text(),
            "Hora" => row.time = cell.as_text(),
            "E-mail" => row.email = cell.as_text(),
            "Categoria" => row.category = cell.as_text(),
            "Fornecedor" => row.supplier = cell.as_text(),
            "" => {}
            name => match name.strip_suffix(WEIGHTED_SUFFIX) {
                Some(question) => {
                    row.weighted.insert(question.to_string(), normalize(cell));
                }
                None => {
                    row.scores.insert(name.to_string(), normalize(cell));
                }
            },
        }
    }

    row
}

/// Build the row for a new submission; missing answers stay missing.
pub(crate) fn score_row(
    key: &ResponseKey,
    answers: &Answers,
    questions: &[Question],
    submitted_at: NaiveDateTime,
) -> ResponseRow {
    let mut scores = BTreeMap::new();
    let mut weighted = BTreeMap::new();
    for question in questions {
        let raw = answers.get(&question.text).copied();
        scores.insert(question.text.clone(), raw);
        weighted.insert(question.text.clone(), raw.map(|value| value * question.weight));
    }

    ResponseRow {
        date: submitted_at.format(DATE_FORMAT).to_string(),
        time: submitted_at.format(TIME_FORMAT).to_string(),
        email: key.email.clone(),
        category: key.category.clone(),
        supplier: key.supplier.clone(),
        scores,
        weighted,
    }
}

fn layout_row(header: &[String], row: &ResponseRow) -> Vec<Cell> {
    header
        .iter()
        .map(|column| match column.as_str() {
            "Data" => Cell::text(row.date.as_str()),
            "Hora" => Cell::text(row.time.as_str()),
            "E-mail" => Cell::text(row.email.as_str()),
            "Categoria" => Cell::text(row.category.as_str()),
            "Fornecedor" => Cell::text(row.supplier.as_str()),
            name => match name.strip_suffix(WEIGHTED_SUFFIX) {
                Some(question) => Cell::from(row.weighted.get(question).copied().flatten()),
                None => Cell::from(row.scores.get(name).copied().flatten()),
            },
        })
        .collect()
}

/// How an upsert reached the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Appended { row_number: usize },
    Replaced { row_number: usize },
}

/// Read/upsert layer over the per-type response tables of one document.
pub struct ResponseStore<G> {
    gateway: Arc<G>,
    document: String,
}

impl<G> ResponseStore<G>
where
    G: TableGateway,
{
    pub fn new(gateway: Arc<G>, document: impl Into<String>) -> Self {
        Self {
            gateway,
            document: document.into(),
        }
    }

    fn read(&self, evaluation: EvaluationType) -> Result<Option<ResponseTable>, StoreError> {
        let table = evaluation.table_name();
        let rows = self.gateway.read_table(&self.document, table)?;
        debug!(%evaluation, table, found = rows.is_some(), "read response table");
        Ok(rows.map(ResponseTable::from_rows))
    }

    /// Stored responses for one type; a missing table is empty.
    pub fn fetch(&self, evaluation: EvaluationType) -> Result<ResponseTable, StoreError> {
        Ok(self.read(evaluation)?.unwrap_or_default())
    }

    /// Every stored response in type order. Read failures count as no data.
    pub fn fetch_all(&self) -> Vec<StoredResponse> {
        let mut responses = Vec::new();
        for evaluation in EvaluationType::ordered() {
            match self.fetch(evaluation) {
                Ok(table) => responses.extend(
                    table
                        .rows
                        .into_iter()
                        .map(|row| StoredResponse { evaluation, row }),
                ),
                Err(error) => {
                    warn!(%evaluation, %error, "response table unreadable; reporting without it")
                }
            }
        }
        responses
    }

    /// Write one submission, replacing the row with the same key if present.
    ///
    /// Only the header row and the target row are ever written.
    pub fn upsert(
        &self,
        evaluation: EvaluationType,
        key: &ResponseKey,
        answers: &Answers,
        questions: &[Question],
        submitted_at: NaiveDateTime,
    ) -> Result<UpsertOutcome, StoreError> {
        let table_name = evaluation.table_name();
        let row = score_row(key, answers, questions, submitted_at);
        let columns = column_set(questions);

        let existing = match self.read(evaluation)? {
            None => {
                self.gateway
                    .create_table(&self.document, table_name, &columns)?;
                self.gateway.append_row(
                    &self.document,
                    table_name,
                    2,
                    &layout_row(&columns, &row),
                )?;
                info!(%evaluation, supplier = %key.supplier, "created response table");
                return Ok(UpsertOutcome::Created);
            }
            Some(table) => table,
        };

        let mut header = existing.header.clone();
        for column in &columns {
            if !header.contains(column) {
                header.push(column.clone());
            }
        }
        if header != existing.header {
            let header_cells: Vec<Cell> = header.iter().map(|name| Cell::text(name.as_str())).collect();
            self.gateway
                .update_row(&self.document, table_name, 1, &header_cells)?;
            debug!(%evaluation, columns = header.len(), "extended response header");
        }

        let cells = layout_row(&header, &row);
        let positions = existing.positions(key);
        match positions.first() {
            Some(&index) => {
                if positions.len() > 1 {
                    warn!(
                        %evaluation,
                        duplicates = positions.len(),
                        supplier = %key.supplier,
                        "several rows share one response key; replacing the first"
                    );
                }
                let row_number = index + 2;
                self.gateway
                    .update_row(&self.document, table_name, row_number, &cells)?;
                info!(%evaluation, row_number, supplier = %key.supplier, "replaced response row");
                Ok(UpsertOutcome::Replaced { row_number })
            }
            None => {
                let row_number = existing.rows.len() + 2;
                self.gateway
                    .append_row(&self.document, table_name, row_number, &cells)?;
                info!(%evaluation, row_number, supplier = %key.supplier, "appended response row");
                Ok(UpsertOutcome::Appended { row_number })
            }
        }
    }
}
