mod gateway;
mod memory;
mod responses;
mod sheets;

pub use gateway::{Cell, StoreError, TableGateway, TableRows};
pub use memory::InMemoryTables;
pub use responses::{
    column_set, ResponseStore, ResponseTable, UpsertOutcome, IDENTITY_COLUMNS, WEIGHTED_SUFFIX,
};
pub use sheets::{connect_service_account, GoogleSheetsClient, SheetsConnector};
