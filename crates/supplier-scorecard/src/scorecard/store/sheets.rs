use std::path::Path;

use google_sheets4::api::{
    AddSheetRequest, BatchUpdateSpreadsheetRequest, Request, Scope, SheetProperties, ValueRange,
};
use google_sheets4::{hyper_rustls, hyper_util, yup_oauth2, Sheets};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::debug;

use super::gateway::{Cell, StoreError, TableGateway, TableRows};

pub type SheetsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Build an authenticated Sheets hub from a service-account key file.
pub async fn connect_service_account(
    key_path: &Path,
) -> Result<Sheets<SheetsConnector>, StoreError> {
    let key = yup_oauth2::read_service_account_key(key_path)
        .await
        .map_err(|err| StoreError::Backend(format!("service account key: {err}")))?;
    let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
        .build()
        .await
        .map_err(|err| StoreError::Backend(format!("service account auth: {err}")))?;

    let connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .map_err(|err| StoreError::Runtime(err.to_string()))?
        .https_or_http()
        .enable_http1()
        .build();
    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(connector);

    Ok(Sheets::new(client, auth))
}

/// Synchronous wrapper around the generated google-sheets4 client.
///
/// Calls block on the runtime handle, so they must run off the async worker
/// threads (for example inside `spawn_blocking`).
pub struct GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    hub: Sheets<C>,
    runtime: Handle,
}

impl<C> GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Sheets<C>, runtime: Handle) -> Self {
        Self { hub, runtime }
    }

    pub fn with_current_runtime(hub: Sheets<C>) -> Result<Self, StoreError> {
        let runtime = Handle::try_current().map_err(|err| StoreError::Runtime(err.to_string()))?;
        Ok(Self::new(hub, runtime))
    }

    fn map_error<E: std::fmt::Display>(err: E) -> StoreError {
        StoreError::Backend(err.to_string())
    }

    fn table_exists(&self, document: &str, table: &str) -> Result<bool, StoreError> {
        let result = self.runtime.block_on(async {
            self.hub
                .spreadsheets()
                .get(document)
                .param("fields", "sheets.properties.title")
                .add_scope(Scope::Spreadsheet)
                .doit()
                .await
        });

        let (_, spreadsheet) = result.map_err(Self::map_error)?;
        Ok(spreadsheet
            .sheets
            .unwrap_or_default()
            .into_iter()
            .filter_map(|sheet| sheet.properties.and_then(|properties| properties.title))
            .any(|title| title == table))
    }

    fn read_values(
        &self,
        document: &str,
        table: &str,
        render: &str,
    ) -> Result<Option<TableRows>, StoreError> {
        if !self.table_exists(document, table)? {
            return Ok(None);
        }

        let range = quote_table(table);
        let result = self.runtime.block_on(async {
            self.hub
                .spreadsheets()
                .values_get(document, &range)
                .value_render_option(render)
                .add_scope(Scope::SpreadsheetReadonly)
                .doit()
                .await
        });

        let (_, values) = result.map_err(Self::map_error)?;
        let rows: TableRows = values
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_from_value).collect())
            .collect();
        debug!(table, render, rows = rows.len(), "read sheet values");
        Ok(Some(rows))
    }

    fn write_range(&self, document: &str, range: &str, row: &[Cell]) -> Result<(), StoreError> {
        let body = value_range(range, row);
        let result = self.runtime.block_on(async {
            self.hub
                .spreadsheets()
                .values_update(body, document, range)
                .value_input_option("RAW")
                .add_scope(Scope::Spreadsheet)
                .doit()
                .await
        });
        result.map(|_| ()).map_err(Self::map_error)
    }
}

impl<C> std::fmt::Debug for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsClient").finish_non_exhaustive()
    }
}

impl<C> TableGateway for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn read_table(&self, document: &str, table: &str) -> Result<Option<TableRows>, StoreError> {
        self.read_values(document, table, "UNFORMATTED_VALUE")
    }

    fn read_displayed_table(
        &self,
        document: &str,
        table: &str,
    ) -> Result<Option<TableRows>, StoreError> {
        self.read_values(document, table, "FORMATTED_VALUE")
    }

    fn create_table(
        &self,
        document: &str,
        table: &str,
        header: &[String],
    ) -> Result<(), StoreError> {
        let request = BatchUpdateSpreadsheetRequest {
            requests: Some(vec![Request {
                add_sheet: Some(AddSheetRequest {
                    properties: Some(SheetProperties {
                        title: Some(table.to_string()),
                        ..SheetProperties::default()
                    }),
                }),
                ..Request::default()
            }]),
            ..BatchUpdateSpreadsheetRequest::default()
        };

        let result = self.runtime.block_on(async {
            self.hub
                .spreadsheets()
                .batch_update(request, document)
                .add_scope(Scope::Spreadsheet)
                .doit()
                .await
        });
        result.map_err(Self::map_error)?;

        let header_cells: Vec<Cell> = header.iter().map(|name| Cell::text(name.as_str())).collect();
        self.write_range(document, &row_range(table, 1), &header_cells)
    }

    fn append_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        // Anchored at the expected row so blank rows inside the data cannot
        // pull the insert upwards.
        let range = row_range(table, row_number);
        let body = value_range(&range, row);
        let result = self.runtime.block_on(async {
            self.hub
                .spreadsheets()
                .values_append(body, document, &range)
                .value_input_option("RAW")
                .insert_data_option("INSERT_ROWS")
                .add_scope(Scope::Spreadsheet)
                .doit()
                .await
        });
        result.map(|_| ()).map_err(Self::map_error)
    }

    fn update_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        self.write_range(document, &row_range(table, row_number), row)
    }
}

/// A1 table reference; quotes inside the name are doubled.
fn quote_table(table: &str) -> String {
    format!("'{}'", table.replace('\'', "''"))
}

fn row_range(table: &str, row_number: usize) -> String {
    format!("{}!A{row_number}", quote_table(table))
}

fn value_range(range: &str, row: &[Cell]) -> ValueRange {
    ValueRange {
        range: Some(range.to_string()),
        major_dimension: Some("ROWS".to_string()),
        values: Some(vec![row.iter().map(value_from_cell).collect()]),
    }
}

fn cell_from_value(value: Value) -> Cell {
    match value {
        Value::Null => Cell::Empty,
        Value::Number(number) => number.as_f64().map(Cell::Number).unwrap_or(Cell::Empty),
        Value::String(text) if text.is_empty() => Cell::Empty,
        Value::String(text) => Cell::Text(text),
        Value::Bool(flag) => Cell::Text(flag.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

fn value_from_cell(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::String(String::new()),
        Cell::Text(text) => Value::String(text.clone()),
        Cell::Number(number) => serde_json::Number::from_f64(*number)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(String::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn quotes_table_names_for_a1_ranges() {
        assert_eq!(quote_table("Técnica"), "'Técnica'");
        assert_eq!(quote_table("Joe's"), "'Joe''s'");
        assert_eq!(row_range("Esg", 7), "'Esg'!A7");
    }

    #[test]
    fn converts_sheet_values_to_cells() {
        assert_eq!(cell_from_value(json!(2.5)), Cell::Number(2.5));
        assert_eq!(cell_from_value(json!("")), Cell::Empty);
        assert_eq!(cell_from_value(json!("Acme")), Cell::text("Acme"));
        assert_eq!(cell_from_value(Value::Null), Cell::Empty);
    }

    #[test]
    fn formatted_percent_weights_parse_as_fractions() {
        let rows = vec![
            vec![cell_from_value(json!("Comercial")), cell_from_value(json!("Peso_Comercial"))],
            vec![cell_from_value(json!("Preço")), cell_from_value(json!("25%"))],
        ];
        let questions = crate::scorecard::reference::parse_questions(&rows);
        assert_eq!(
            questions.for_type(crate::scorecard::domain::EvaluationType::Commercial),
            &[crate::scorecard::domain::Question::new("Preço", 0.25)]
        );
    }

    #[test]
    fn writes_numbers_as_numbers() {
        let range = value_range("'Esg'!A2", &[Cell::Number(1.5), Cell::text("x"), Cell::Empty]);
        assert_eq!(
            range.values,
            Some(vec![vec![json!(1.5), json!("x"), json!("")]])
        );
    }
}
