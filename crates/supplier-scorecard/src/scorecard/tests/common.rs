use std::collections::BTreeMap;
use std::sync::Arc;

use axum::response::Response;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;

use crate::scorecard::domain::{
    EvaluationType, Question, QuestionSet, ResponseRow, StoredResponse,
};
use crate::scorecard::reference::ReferenceSources;
use crate::scorecard::service::{ScorecardService, ScorecardSettings};
use crate::scorecard::session::{Screen, SessionId};
use crate::scorecard::store::{Cell, InMemoryTables, StoreError, TableGateway, TableRows};

pub(super) const QUESTIONS_DOC: &str = "questions-doc";
pub(super) const ACCESS_DOC: &str = "access-doc";
pub(super) const RESPONSES_DOC: &str = "responses-doc";
pub(super) const ADMIN_PASSWORD: &str = "painel-2024";

pub(super) const BUYER: &str = "buyer@example.com";
pub(super) const ENGINEER: &str = "engineer@example.com";

pub(super) fn text_row(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|value| Cell::text(*value)).collect()
}

pub(super) fn settings() -> ScorecardSettings {
    ScorecardSettings {
        sources: ReferenceSources {
            questions_document: QUESTIONS_DOC.to_string(),
            questions_table: "Perguntas".to_string(),
            access_document: ACCESS_DOC.to_string(),
            access_table: "Acessos".to_string(),
            categories_table: "Categorias".to_string(),
        },
        responses_document: RESPONSES_DOC.to_string(),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
    }
}

pub(super) fn question_rows() -> TableRows {
    vec![
        text_row(&[
            "Comercial",
            "Peso_Comercial",
            "Técnica",
            "Peso_Técnica",
            "ESG",
            "Peso_ESG",
        ]),
        text_row(&["Preço", "40%", "Qualidade", "60%", "Política ambiental", "100%"]),
        text_row(&["Prazo", "60%", "Suporte", "40%", "", ""]),
    ]
}

pub(super) fn access_rows() -> TableRows {
    vec![
        text_row(&["E-mail", "Tipo", "Categoria"]),
        text_row(&[BUYER, "Comercial", "Embalagens"]),
        text_row(&[BUYER, "Técnica", "Embalagens"]),
        text_row(&[ENGINEER, "Técnica", "Logística"]),
    ]
}

pub(super) fn category_rows() -> TableRows {
    vec![
        text_row(&["Categoria", "Fornecedor"]),
        text_row(&["Embalagens", "Acme"]),
        text_row(&["Embalagens", "Boxco"]),
        text_row(&["Logística", "Transvia"]),
    ]
}

pub(super) fn seeded_tables() -> InMemoryTables {
    InMemoryTables::new()
        .with_table(QUESTIONS_DOC, "Perguntas", question_rows())
        .with_table(ACCESS_DOC, "Acessos", access_rows())
        .with_table(ACCESS_DOC, "Categorias", category_rows())
}

pub(super) fn fixed_clock() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, 7)
        .and_then(|date| date.and_hms_opt(14, 5, 9))
        .expect("valid timestamp")
}

pub(super) fn service_with<G: TableGateway + 'static>(gateway: Arc<G>) -> ScorecardService<G> {
    ScorecardService::new(gateway, settings()).with_clock(fixed_clock)
}

pub(super) fn build_service() -> (ScorecardService<InMemoryTables>, Arc<InMemoryTables>) {
    let tables = Arc::new(seeded_tables());
    (service_with(tables.clone()), tables)
}

pub(super) fn evaluator_session<G: TableGateway + 'static>(
    service: &ScorecardService<G>,
    email: &str,
) -> SessionId {
    let id = service.open_session().expect("session opens").session_id;
    service.login(id, email).expect("login succeeds");
    id
}

pub(super) fn admin_session<G: TableGateway + 'static>(service: &ScorecardService<G>) -> SessionId {
    let id = service.open_session().expect("session opens").session_id;
    service
        .admin_login(id, ADMIN_PASSWORD)
        .expect("admin login succeeds");
    assert_eq!(
        service.session(id).expect("session exists").screen,
        Screen::Admin
    );
    id
}

pub(super) fn answers(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
    pairs
        .iter()
        .map(|(question, score)| (question.to_string(), *score))
        .collect()
}

pub(super) fn questions() -> QuestionSet {
    let mut set = QuestionSet::default();
    set.insert(
        EvaluationType::Commercial,
        vec![Question::new("Preço", 0.4), Question::new("Prazo", 0.6)],
    );
    set.insert(
        EvaluationType::Technical,
        vec![Question::new("Qualidade", 0.6), Question::new("Suporte", 0.4)],
    );
    set.insert(
        EvaluationType::Esg,
        vec![Question::new("Política ambiental", 1.0)],
    );
    set
}

pub(super) fn stored(
    evaluation: EvaluationType,
    email: &str,
    category: &str,
    supplier: &str,
    scores: &[(&str, Option<f64>)],
) -> StoredResponse {
    StoredResponse {
        evaluation,
        row: ResponseRow {
            date: "07/03/2024".to_string(),
            time: "14:05:09".to_string(),
            email: email.to_string(),
            category: category.to_string(),
            supplier: supplier.to_string(),
            scores: scores
                .iter()
                .map(|(question, score)| (question.to_string(), *score))
                .collect(),
            weighted: BTreeMap::new(),
        },
    }
}

/// Reads pass through; every write is refused.
#[derive(Default)]
pub(super) struct ReadOnlyTables {
    pub(super) inner: InMemoryTables,
}

impl TableGateway for ReadOnlyTables {
    fn read_table(&self, document: &str, table: &str) -> Result<Option<TableRows>, StoreError> {
        self.inner.read_table(document, table)
    }

    fn create_table(
        &self,
        _document: &str,
        _table: &str,
        _header: &[String],
    ) -> Result<(), StoreError> {
        Err(StoreError::Backend("quota exceeded".to_string()))
    }

    fn append_row(
        &self,
        _document: &str,
        _table: &str,
        _row_number: usize,
        _row: &[Cell],
    ) -> Result<(), StoreError> {
        Err(StoreError::Backend("quota exceeded".to_string()))
    }

    fn update_row(
        &self,
        _document: &str,
        _table: &str,
        _row_number: usize,
        _row: &[Cell],
    ) -> Result<(), StoreError> {
        Err(StoreError::Backend("quota exceeded".to_string()))
    }
}

/// Reference tables readable, response tables unreachable.
#[derive(Default)]
pub(super) struct UnreachableResponses {
    pub(super) inner: InMemoryTables,
}

impl TableGateway for UnreachableResponses {
    fn read_table(&self, document: &str, table: &str) -> Result<Option<TableRows>, StoreError> {
        if document == RESPONSES_DOC {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.inner.read_table(document, table)
    }

    fn create_table(&self, document: &str, table: &str, header: &[String]) -> Result<(), StoreError> {
        self.inner.create_table(document, table, header)
    }

    fn append_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        self.inner.append_row(document, table, row_number, row)
    }

    fn update_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        self.inner.update_row(document, table, row_number, row)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
