use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde_json::{Value, json};

use crate::dataset::provider::DatasetError;

/// Ordered columns plus rows of JSON cells. CSV cells load as strings; JSON
/// cells keep their native types.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// (row_count, column_count)
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.columns.len())
    }

    pub fn from_path(path: &Path) -> Result<Table, DatasetError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("csv") => Self::from_csv_path(path),
            Some("json") => Self::from_json_path(path),
            _ => Err(DatasetError::Table(format!(
                "not a loadable tabular file: {}",
                path.display()
            ))),
        }
    }

    fn from_csv_path(path: &Path) -> Result<Table, DatasetError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;
        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut table = Table::new(columns);
        for record in reader.records() {
            let record = record?;
            table
                .rows
                .push(record.iter().map(|field| Value::String(field.to_string())).collect());
        }
        Ok(table)
    }

    /// Expects a top-level array of objects; columns are ordered by first
    /// appearance, absent keys become null cells.
    fn from_json_path(path: &Path) -> Result<Table, DatasetError> {
        let reader = BufReader::new(File::open(path)?);
        let value: Value = serde_json::from_reader(reader)?;
        let records = value.as_array().ok_or_else(|| {
            DatasetError::Table(format!(
                "expected a top-level JSON array of records in {}",
                path.display()
            ))
        })?;

        let mut columns: Vec<String> = Vec::new();
        for record in records {
            if let Some(object) = record.as_object() {
                for key in object.keys() {
                    if !columns.iter().any(|column| column == key) {
                        columns.push(key.clone());
                    }
                }
            }
        }

        let mut table = Table::new(columns);
        for record in records {
            let row = table
                .columns
                .iter()
                .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }
}

/// One file met during a dataset scan.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    pub filename: String,
    pub extension: String,
    pub size_kb: f64,
    pub path: String,
}

impl FileRecord {
    /// Placeholder record for a dataset that materialized to an empty tree,
    /// so a listing is never empty.
    pub fn empty_marker() -> Self {
        Self {
            filename: "Empty Dataset or Directory".to_string(),
            extension: String::new(),
            size_kb: 0.0,
            path: String::new(),
        }
    }
}

/// Exactly one of these comes out of a resolution: a usable table, or an
/// informative listing of what the dataset contains.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetResolution {
    Table(Table),
    Listing(Vec<FileRecord>),
}

impl DatasetResolution {
    /// Uniform tabular view; listings become a Filename/Type/Size/Path table
    /// so previews work on either outcome.
    pub fn into_table(self) -> Table {
        match self {
            DatasetResolution::Table(table) => table,
            DatasetResolution::Listing(records) => {
                let mut table = Table::new(vec![
                    "Filename".to_string(),
                    "Type".to_string(),
                    "Size (KB)".to_string(),
                    "Path".to_string(),
                ]);
                for record in records {
                    table.rows.push(vec![
                        Value::String(record.filename),
                        Value::String(record.extension),
                        json!(record.size_kb),
                        Value::String(record.path),
                    ]);
                }
                table
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn csv_loads_headers_and_string_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metadata.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "patient_id,finding,age").unwrap();
        writeln!(file, "p001,COVID-19,54").unwrap();
        writeln!(file, "p002,Normal,31").unwrap();

        let table = Table::from_path(&path).unwrap();
        assert_eq!(table.columns, ["patient_id", "finding", "age"]);
        assert_eq!(table.shape(), (2, 3));
        assert_eq!(table.rows[0][1], Value::String("COVID-19".to_string()));
    }

    #[test]
    fn json_orders_columns_by_first_appearance_and_nulls_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.json");
        std::fs::write(
            &path,
            r#"[{"a": 1, "b": null}, {"b": 2, "c": "x"}]"#,
        )
        .unwrap();

        let table = Table::from_path(&path).unwrap();
        assert_eq!(table.columns, ["a", "b", "c"]);
        assert_eq!(table.rows[0], vec![json!(1), Value::Null, Value::Null]);
        assert_eq!(table.rows[1], vec![Value::Null, json!(2), json!("x")]);
    }

    #[test]
    fn non_tabular_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, b"png-ish").unwrap();
        assert!(matches!(
            Table::from_path(&path),
            Err(DatasetError::Table(_))
        ));
    }

    #[test]
    fn listing_converts_to_a_uniform_table() {
        let resolution = DatasetResolution::Listing(vec![FileRecord {
            filename: "xray1.png".to_string(),
            extension: ".png".to_string(),
            size_kb: 12.34,
            path: "images/xray1.png".to_string(),
        }]);

        let table = resolution.into_table();
        assert_eq!(table.columns, ["Filename", "Type", "Size (KB)", "Path"]);
        assert_eq!(table.rows[0][0], Value::String("xray1.png".to_string()));
        assert_eq!(table.rows[0][2], json!(12.34));
    }
}
