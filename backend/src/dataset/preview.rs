use serde_json::{Map, Value};
use shared::FilePreview;

use crate::dataset::models::Table;

pub const DEFAULT_PREVIEW_ROWS: usize = 5;

/// Bounded, JSON-safe view of a table: full shape, first `rows` rows as
/// ordered field maps. Null cells flatten to empty strings. An absent table
/// is a valid outcome and previews to `None`.
pub fn table_preview(table: Option<&Table>, rows: usize) -> Option<FilePreview> {
    let table = table?;

    let head = table
        .rows
        .iter()
        .take(rows)
        .map(|row| {
            let mut record = Map::new();
            for (column, cell) in table.columns.iter().zip(row) {
                let cell = match cell {
                    Value::Null => Value::String(String::new()),
                    other => other.clone(),
                };
                record.insert(column.clone(), cell);
            }
            record
        })
        .collect();

    Some(FilePreview {
        columns: table.columns.clone(),
        shape: table.shape(),
        head,
    })
}
