use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::gateway::{Cell, StoreError, TableGateway, TableRows};

type TableKey = (String, String);

/// Process-local table store used by the demo server and tests.
#[derive(Debug, Default)]
pub struct InMemoryTables {
    tables: Mutex<HashMap<TableKey, TableRows>>,
}

impl InMemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a table; replaces any existing table with the same name.
    pub fn with_table(self, document: &str, table: &str, rows: TableRows) -> Self {
        if let Ok(mut guard) = self.tables.lock() {
            guard.insert(key(document, table), rows);
        }
        self
    }

    /// Snapshot of a table's rows, header included.
    pub fn table(&self, document: &str, table: &str) -> Option<TableRows> {
        self.lock()
            .ok()
            .and_then(|guard| guard.get(&key(document, table)).cloned())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TableKey, TableRows>>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Runtime("table store mutex poisoned".to_string()))
    }
}

fn key(document: &str, table: &str) -> TableKey {
    (document.to_string(), table.to_string())
}

impl TableGateway for InMemoryTables {
    fn read_table(&self, document: &str, table: &str) -> Result<Option<TableRows>, StoreError> {
        Ok(self.lock()?.get(&key(document, table)).cloned())
    }

    fn create_table(
        &self,
        document: &str,
        table: &str,
        header: &[String],
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let table_key = key(document, table);
        if guard.contains_key(&table_key) {
            return Err(StoreError::TableExists {
                table: table.to_string(),
            });
        }
        let header_row = header.iter().map(|name| Cell::text(name.as_str())).collect();
        guard.insert(table_key, vec![header_row]);
        Ok(())
    }

    fn append_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        let mut guard = self.lock()?;
        let rows = guard
            .get_mut(&key(document, table))
            .ok_or_else(|| StoreError::TableNotFound {
                table: table.to_string(),
            })?;
        let before = row_number.saturating_sub(1);
        if rows.len() < before {
            rows.resize_with(before, Vec::new);
        }
        rows.push(row.to_vec());
        Ok(())
    }

    fn update_row(
        &self,
        document: &str,
        table: &str,
        row_number: usize,
        row: &[Cell],
    ) -> Result<(), StoreError> {
        if row_number == 0 {
            return Err(StoreError::Backend("row numbers start at 1".to_string()));
        }

        let mut guard = self.lock()?;
        let rows = guard
            .get_mut(&key(document, table))
            .ok_or_else(|| StoreError::TableNotFound {
                table: table.to_string(),
            })?;

        let index = row_number - 1;
        if rows.len() <= index {
            rows.resize_with(index + 1, Vec::new);
        }

        let target = &mut rows[index];
        if target.len() < row.len() {
            target.resize(row.len(), Cell::Empty);
        }
        for (slot, cell) in target.iter_mut().zip(row) {
            *slot = cell.clone();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_row_only_touches_the_addressed_range() {
        let store = InMemoryTables::new().with_table(
            "doc",
            "Comercial",
            vec![
                vec![Cell::text("A"), Cell::text("B"), Cell::text("C")],
                vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)],
                vec![Cell::Number(4.0), Cell::Number(5.0), Cell::Number(6.0)],
            ],
        );

        store
            .update_row("doc", "Comercial", 3, &[Cell::Number(9.0), Cell::Number(8.0)])
            .expect("update succeeds");

        let rows = store.table("doc", "Comercial").expect("table exists");
        assert_eq!(rows[1], vec![Cell::Number(1.0), Cell::Number(2.0), Cell::Number(3.0)]);
        assert_eq!(rows[2], vec![Cell::Number(9.0), Cell::Number(8.0), Cell::Number(6.0)]);
    }

    #[test]
    fn create_refuses_existing_tables() {
        let store = InMemoryTables::new();
        store
            .create_table("doc", "Esg", &["Data".to_string()])
            .expect("first create succeeds");
        assert!(matches!(
            store.create_table("doc", "Esg", &["Data".to_string()]),
            Err(StoreError::TableExists { .. })
        ));
    }

    #[test]
    fn append_requires_a_table() {
        let store = InMemoryTables::new();
        assert!(matches!(
            store.append_row("doc", "Esg", 2, &[Cell::Empty]),
            Err(StoreError::TableNotFound { .. })
        ));
    }

    #[test]
    fn append_lands_on_the_requested_row_or_after_the_end() {
        let store = InMemoryTables::new().with_table(
            "doc",
            "Esg",
            vec![vec![Cell::text("A")], vec![Cell::Number(1.0)]],
        );
        store
            .append_row("doc", "Esg", 4, &[Cell::Number(2.0)])
            .expect("append succeeds");
        store
            .append_row("doc", "Esg", 3, &[Cell::Number(3.0)])
            .expect("append succeeds");

        let rows = store.table("doc", "Esg").expect("table exists");
        assert_eq!(rows.len(), 5);
        assert!(rows[2].is_empty());
        assert_eq!(rows[3], vec![Cell::Number(2.0)]);
        assert_eq!(rows[4], vec![Cell::Number(3.0)]);
    }
}
