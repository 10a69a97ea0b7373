use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use supplier_scorecard::config::AppConfig;
use supplier_scorecard::error::AppError;
use supplier_scorecard::scorecard::store::{
    connect_service_account, Cell, GoogleSheetsClient, InMemoryTables, SheetsConnector,
    StoreError, TableGateway, TableRows,
};
use supplier_scorecard::scorecard::{ReportKind, ScorecardSettings};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Backend chosen at startup: live spreadsheets, or seeded in-process tables
/// when no credentials are configured.
pub(crate) enum ScorecardGateway {
    Sheets(GoogleSheetsClient<SheetsConnector>),
    Memory(InMemoryTables),
}

impl TableGateway for ScorecardGateway {
    fn read_table(&self, document: &str, table: &str) -> Result<Option<TableRows>, StoreError> {
        match self {
            Self::Sheets(client) => client.read_table(document, table),
            Self::Memory(tables) => tables.read_table(document, table),
        }
    }

    fn create_table(
        &self,
        document: &str,
        table: &str,
        header: &[String],
    ) -> Result<(), StoreError> {
        match self {
            Self::Sheets(client) => client.create_table(document, table, header),
            Self::Memory(tables) => tables.create_table(document, table, header),
        }
    }

    fn read_displayed_table(
        &self,
        document: &str,
        table: &str,
    ) -> Result<Option<TableRows>, StoreError> {
        match self {
            Self::Sheets(client) => client.read_displayed_table(document, table),
            Self::Memory(tables) => tables.read_displayed_table(document, table),
        }
    }

    fn append_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        match self {
            Self::Sheets(client) => client.append_row(document, table, row_number, row),
            Self::Memory(tables) => tables.append_row(document, table, row_number, row),
        }
    }

    fn update_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        match self {
            Self::Sheets(client) => client.update_row(document, table, row_number, row),
            Self::Memory(tables) => tables.update_row(document, table, row_number, row),
        }
    }
}

pub(crate) async fn connect_gateway(config: &AppConfig) -> Result<ScorecardGateway, AppError> {
    match &config.sheets.credentials_path {
        Some(path) => {
            let hub = connect_service_account(path).await?;
            info!(credentials = %path.display(), "connected to spreadsheet backend");
            Ok(ScorecardGateway::Sheets(
                GoogleSheetsClient::with_current_runtime(hub)?,
            ))
        }
        None => {
            warn!("no spreadsheet credentials configured; serving seeded in-memory tables");
            Ok(ScorecardGateway::Memory(demo_tables(
                &config.scorecard_settings(),
            )))
        }
    }
}

fn text_row(values: &[&str]) -> Vec<Cell> {
    values.iter().map(|value| Cell::text(*value)).collect()
}

/// Reference tables for local runs and the CLI demo.
pub(crate) fn demo_tables(settings: &ScorecardSettings) -> InMemoryTables {
    let sources = &settings.sources;
    InMemoryTables::new()
        .with_table(
            &sources.questions_document,
            &sources.questions_table,
            vec![
                text_row(&[
                    "Comercial",
                    "Peso_Comercial",
                    "Técnica",
                    "Peso_Técnica",
                    "ESG",
                    "Peso_ESG",
                ]),
                text_row(&[
                    "Competitividade de preço",
                    "40%",
                    "Qualidade do produto",
                    "50%",
                    "Gestão ambiental",
                    "40%",
                ]),
                text_row(&[
                    "Condições de pagamento",
                    "30%",
                    "Suporte técnico",
                    "30%",
                    "Práticas trabalhistas",
                    "35%",
                ]),
                text_row(&[
                    "Cumprimento de prazos",
                    "30%",
                    "Capacidade de inovação",
                    "20%",
                    "Governança",
                    "25%",
                ]),
            ],
        )
        .with_table(
            &sources.access_document,
            &sources.access_table,
            vec![
                text_row(&["E-mail", "Tipo", "Categoria"]),
                text_row(&["compras@example.com", "Comercial", "Embalagens"]),
                text_row(&["compras@example.com", "Comercial", "Logística"]),
                text_row(&["engenharia@example.com", "Técnica", "Embalagens"]),
                text_row(&["sustentabilidade@example.com", "ESG", "Embalagens"]),
                text_row(&["sustentabilidade@example.com", "ESG", "Logística"]),
            ],
        )
        .with_table(
            &sources.access_document,
            &sources.categories_table,
            vec![
                text_row(&["Categoria", "Fornecedor"]),
                text_row(&["Embalagens", "Acme Embalagens"]),
                text_row(&["Embalagens", "Boxco"]),
                text_row(&["Embalagens", "Papelaria Sul"]),
                text_row(&["Logística", "Transvia"]),
                text_row(&["Logística", "Rodonorte"]),
            ],
        )
}

pub(crate) fn parse_report_kind(raw: &str) -> Result<ReportKind, String> {
    ReportKind::parse(raw).ok_or_else(|| {
        let known: Vec<&str> = ReportKind::ordered()
            .into_iter()
            .map(ReportKind::slug)
            .collect();
        format!("unknown report '{raw}' (expected one of: {})", known.join(", "))
    })
}
