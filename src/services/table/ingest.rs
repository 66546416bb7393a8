use std::collections::HashSet;
use std::io::Cursor;

use calamine::{open_workbook_from_rs, Data, Reader, Xlsx, XlsxError};
use polars::prelude::{CsvReader, DataFrame, DataType, SerReader};
use serde::Serialize;

use super::types::{Cell, Column, Table};
use super::utils::header_name;
use crate::error::IngestError;

const XLSX_MAGIC: &[u8] = b"PK\x03\x04";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(XLSX_MAGIC) {
            SourceFormat::Xlsx
        } else {
            SourceFormat::Csv
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct IngestOptions {
    pub delimiter: u8,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// Parses an uploaded file into a [`Table`]. The first row is the header.
pub fn read_table(data: &[u8], options: &IngestOptions) -> Result<Table, IngestError> {
    if data.iter().all(u8::is_ascii_whitespace) {
        tracing::warn!("Upload is empty, producing a table without columns");
        return Ok(Table::empty());
    }

    let start = std::time::Instant::now();
    let table = match SourceFormat::sniff(data) {
        SourceFormat::Csv => read_csv(data, options.delimiter)?,
        SourceFormat::Xlsx => read_xlsx(data)?,
    };
    tracing::debug!(
        "Parsed {} rows x {} columns in {:?}",
        table.row_count(),
        table.column_count(),
        start.elapsed()
    );
    Ok(table)
}

fn read_csv(data: &[u8], delimiter: u8) -> Result<Table, IngestError> {
    // Every column is read as text; numeric typing happens in `Column::from_cells`.
    let df = CsvReader::new(Cursor::new(data))
        .has_header(false)
        .with_separator(delimiter)
        .infer_schema(Some(0))
        .finish()?;

    dataframe_to_table(&df)
}

fn dataframe_to_table(df: &DataFrame) -> Result<Table, IngestError> {
    let mut columns = Vec::with_capacity(df.width());
    let mut seen = HashSet::new();

    for (index, series) in df.get_columns().iter().enumerate() {
        let text = series.cast(&DataType::String)?;
        let mut cells = text.str()?.into_iter().map(|value| value.map(str::to_string));
        let header = cells.next().flatten().unwrap_or_default();
        columns.push(Column::from_cells(header_name(&header, index, &mut seen), cells.collect()));
    }

    Ok(Table::new(columns)?)
}

fn read_xlsx(data: &[u8]) -> Result<Table, IngestError> {
    let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(data)).map_err(|e: XlsxError| {
        tracing::error!("Failed to open workbook: {}", e);
        IngestError::Xlsx(e.to_string())
    })?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(IngestError::NoWorksheet)?;
    tracing::debug!("Reading worksheet {}", sheet_name);

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e: XlsxError| IngestError::Xlsx(e.to_string()))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::empty());
    };

    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); header.len()];
    for row in rows {
        for (idx, column) in cells.iter_mut().enumerate() {
            column.push(row.get(idx).and_then(data_to_cell));
        }
    }

    let mut seen = HashSet::new();
    let columns = header
        .iter()
        .zip(cells)
        .enumerate()
        .map(|(idx, (name, values))| {
            let name = data_to_cell(name).unwrap_or_default();
            Column::from_cells(header_name(&name, idx, &mut seen), values)
        })
        .collect();

    Ok(Table::new(columns)?)
}

fn data_to_cell(value: &Data) -> Cell {
    match value {
        Data::Empty | Data::Error(_) => None,
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::table::ColumnKind;

    const SURVEY_XLSX: &[u8] =
        include_bytes!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/survey.xlsx"));

    #[test]
    fn reads_csv_with_header_and_missing_values() {
        let csv = b"city,temp,notes\nOslo,3.5,\nLima,,warm\nOslo,-1,NA\n";
        let table = read_table(csv, &IngestOptions::default()).unwrap();

        assert_eq!(table.column_count(), 3);
        assert_eq!(table.row_count(), 3);

        let temp = table.column("temp").unwrap();
        assert_eq!(temp.kind(), ColumnKind::Numeric);
        assert_eq!(temp.as_numeric().unwrap(), &[Some(3.5), None, Some(-1.0)]);

        let notes = table.column("notes").unwrap();
        assert_eq!(notes.kind(), ColumnKind::Categorical);
        assert_eq!(notes.missing_count(), 2);
    }

    #[test]
    fn header_only_csv_has_zero_rows() {
        let table = read_table(b"a,b\n", &IngestOptions::default()).unwrap();
        assert_eq!(table.column_count(), 2);
        assert_eq!(table.row_count(), 0);
    }

    #[test]
    fn custom_delimiter() {
        let options = IngestOptions { delimiter: b';' };
        let table = read_table(b"x;y\n1;2\n3;4\n", &options).unwrap();
        assert_eq!(table.numeric_columns().count(), 2);
    }

    #[test]
    fn empty_upload_is_a_table_without_columns() {
        let table = read_table(b"  \n", &IngestOptions::default()).unwrap();
        assert_eq!(table.column_count(), 0);
    }

    #[test]
    fn repeated_csv_headers_are_renamed() {
        let table = read_table(b"a,a,,a\n1,2,3,x\n", &IngestOptions::default()).unwrap();
        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["a", "a.1", "Unnamed: 2", "a.2"]);
        assert_eq!(table.column("a.1").unwrap().as_numeric().unwrap(), &[Some(2.0)]);
        assert_eq!(table.column("a.2").unwrap().kind(), ColumnKind::Categorical);
    }

    #[test]
    fn reads_first_worksheet_of_xlsx() {
        let table = read_table(SURVEY_XLSX, &IngestOptions::default()).unwrap();

        let names: Vec<&str> = table.columns().iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["city", "temp", "temp.1"]);
        assert_eq!(table.row_count(), 3);

        let city = table.column("city").unwrap();
        assert_eq!(city.kind(), ColumnKind::Categorical);
        assert_eq!(
            city.as_categorical().unwrap(),
            &[Some("Oslo".to_string()), Some("Lima".to_string()), Some("Oslo".to_string())]
        );

        let temp = table.column("temp").unwrap();
        assert_eq!(temp.kind(), ColumnKind::Numeric);
        assert_eq!(temp.as_numeric().unwrap(), &[Some(3.5), None, Some(-1.0)]);

        let notes = table.column("temp.1").unwrap();
        assert_eq!(notes.kind(), ColumnKind::Categorical);
        assert_eq!(notes.missing_count(), 2);
    }

    #[test]
    fn corrupt_workbook_is_an_ingest_error() {
        let err = read_table(b"PK\x03\x04not a zip", &IngestOptions::default()).unwrap_err();
        assert!(matches!(err, IngestError::Xlsx(_)));
    }

    #[test]
    fn sniffs_zip_container_as_xlsx() {
        assert_eq!(SourceFormat::sniff(b"PK\x03\x04rest"), SourceFormat::Xlsx);
        assert_eq!(SourceFormat::sniff(b"a,b\n"), SourceFormat::Csv);
    }
}
