use std::fs::File;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Date32Array, Float32Array, Float64Array, Int32Array,
    Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use chrono::NaiveDate;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Record, Table, Value};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular dataset from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.parquet` – flat column schema (recommended)
/// * `.csv`     – header row, cell types sniffed
/// * `.tsv` / `.tab` – same, tab-delimited (archives serve ingested files as `.tab`)
/// * `.json`    – records-oriented array: `[{ "col": value, ... }, ...]`
pub fn load_file(path: &Path) -> Result<Table> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "parquet" | "pq" => load_parquet(path),
        "json" => load_json(path),
        "csv" => {
            let file = File::open(path).context("opening CSV")?;
            read_delimited(file, b',')
        }
        "tsv" | "tab" => {
            let file = File::open(path).context("opening TSV")?;
            read_delimited(file, b'\t')
        }
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// Delimited text (CSV / TSV)
// ---------------------------------------------------------------------------

/// Parse delimited text with a header row into a [`Table`].
///
/// Cell types are sniffed per cell: integer → float → boolean → ISO-8601
/// date → string.  An empty cell or a literal `NA` becomes [`Value::Null`].
///
/// Shared by the file loader and the archive download path (which hands the
/// response body in as bytes).
pub fn read_delimited<R: Read>(input: R, delimiter: u8) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(input);

    let headers: Vec<String> = reader
        .headers()
        .context("reading header row")?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("row {row_no}"))?;
        let mut record = Record::new();
        for (col_idx, cell) in row.iter().enumerate() {
            let Some(name) = headers.get(col_idx) else {
                continue;
            };
            record.insert(name.clone(), guess_value(cell));
        }
        records.push(record);
    }

    Ok(Table::from_records(records))
}

fn guess_value(s: &str) -> Value {
    if s.is_empty() || s == "NA" {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    if let Some(d) = parse_iso_date(s) {
        return Value::Date(d);
    }
    Value::Str(s.to_string())
}

/// Recognise ISO-8601 dates, including the date part of timestamp strings.
fn parse_iso_date(s: &str) -> Option<NaiveDate> {
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    // "2023-04-01T10:30:00" and "2023-04-01 10:30:00" keep their date part.
    if s.len() > 10 && (s.as_bytes()[10] == b'T' || s.as_bytes()[10] == b' ') {
        let prefix = s.get(..10)?;
        return NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok();
    }
    None
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "station": "Cedar Creek", "date": "2023-04-01", "concentration": 0.42 },
///   ...
/// ]
/// ```
fn load_json(path: &Path) -> Result<Table> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut records = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut record = Record::new();
        for (key, val) in obj {
            record.insert(key.clone(), json_to_value(val));
        }
        records.push(record);
    }

    Ok(Table::from_records(records))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => string_cell(s),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::Str(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::Str(other.to_string()),
    }
}

/// Typed formats keep their numeric/boolean types, but date columns are
/// routinely stored as ISO strings; sniff those so the time axis works.
fn string_cell(s: &str) -> Value {
    match parse_iso_date(s) {
        Some(d) => Value::Date(d),
        None => Value::Str(s.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with a flat column schema.
///
/// Supported column types: Utf8/LargeUtf8, Int32/Int64, Float32/Float64,
/// Boolean, Date32.  Anything else is skipped with a warning.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`).
fn load_parquet(path: &Path) -> Result<Table> {
    let file = File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;

    // Decide once which columns we can represent.
    let schema = builder.schema().clone();
    let mut columns: Vec<(usize, String)> = Vec::new();
    for (i, field) in schema.fields().iter().enumerate() {
        if supported_type(field.data_type()) {
            columns.push((i, field.name().clone()));
        } else {
            log::warn!(
                "Skipping column '{}' with unsupported type {:?}",
                field.name(),
                field.data_type()
            );
        }
    }
    if columns.is_empty() {
        bail!("Parquet file has no readable columns");
    }

    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let mut record = Record::new();
            for (col_idx, col_name) in &columns {
                record.insert(col_name.clone(), extract_value(batch.column(*col_idx), row));
            }
            records.push(record);
        }
    }

    Ok(Table::from_records(records))
}

fn supported_type(dt: &DataType) -> bool {
    matches!(
        dt,
        DataType::Utf8
            | DataType::LargeUtf8
            | DataType::Int32
            | DataType::Int64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
            | DataType::Date32
    )
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Value {
    if col.is_null(row) {
        return Value::Null;
    }
    match col.data_type() {
        DataType::Utf8 => {
            let arr = col.as_any().downcast_ref::<StringArray>().unwrap();
            string_cell(arr.value(row))
        }
        DataType::LargeUtf8 => {
            let arr = col.as_string::<i64>();
            string_cell(arr.value(row))
        }
        DataType::Int32 => {
            let arr = col.as_any().downcast_ref::<Int32Array>().unwrap();
            Value::Int(arr.value(row) as i64)
        }
        DataType::Int64 => {
            let arr = col.as_any().downcast_ref::<Int64Array>().unwrap();
            Value::Int(arr.value(row))
        }
        DataType::Float32 => {
            let arr = col.as_any().downcast_ref::<Float32Array>().unwrap();
            Value::Float(arr.value(row) as f64)
        }
        DataType::Float64 => {
            let arr = col.as_any().downcast_ref::<Float64Array>().unwrap();
            Value::Float(arr.value(row))
        }
        DataType::Boolean => {
            let arr = col.as_any().downcast_ref::<BooleanArray>().unwrap();
            Value::Bool(arr.value(row))
        }
        DataType::Date32 => {
            let arr = col.as_any().downcast_ref::<Date32Array>().unwrap();
            // Date32 counts days since the Unix epoch.
            let days = arr.value(row) as i64;
            match chrono::Duration::try_days(days)
                .and_then(|d| NaiveDate::default().checked_add_signed(d))
            {
                Some(date) => Value::Date(date),
                None => Value::Null,
            }
        }
        _ => Value::Str(format!("{:?}", col.data_type())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Date32Array, Float64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::ArrowWriter;

    use super::*;

    #[test]
    fn test_guess_value_sniffing() {
        assert_eq!(guess_value(""), Value::Null);
        assert_eq!(guess_value("NA"), Value::Null);
        assert_eq!(guess_value("12"), Value::Int(12));
        assert_eq!(guess_value("-3.5"), Value::Float(-3.5));
        assert_eq!(guess_value("true"), Value::Bool(true));
        assert_eq!(
            guess_value("2023-04-01"),
            Value::Date(NaiveDate::from_ymd_opt(2023, 4, 1).unwrap())
        );
        assert_eq!(guess_value("Cedar Creek"), Value::Str("Cedar Creek".into()));
    }

    #[test]
    fn test_parse_iso_date_timestamp_prefix() {
        let d = NaiveDate::from_ymd_opt(2023, 4, 1).unwrap();
        assert_eq!(parse_iso_date("2023-04-01T10:30:00"), Some(d));
        assert_eq!(parse_iso_date("2023-04-01 10:30:00"), Some(d));
        // US-style dates are ambiguous; left as strings.
        assert_eq!(parse_iso_date("04/01/2023"), None);
    }

    #[test]
    fn test_read_csv_from_bytes() {
        let csv = "station,date,concentration\nCedar Creek,2023-01-02,0.41\nMill Race,2023-01-02,NA\n";
        let table = read_delimited(csv.as_bytes(), b',').unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.records[0]["station"],
            Value::Str("Cedar Creek".into())
        );
        assert_eq!(
            table.records[0]["date"],
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 2).unwrap())
        );
        assert_eq!(table.records[1]["concentration"], Value::Null);
    }

    #[test]
    fn test_read_tsv_from_bytes() {
        let tsv = "site\tn\nA\t3\nB\t5\n";
        let table = read_delimited(tsv.as_bytes(), b'\t').unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[1]["n"], Value::Int(5));
    }

    #[test]
    fn test_ragged_row_is_an_error() {
        let csv = "a,b\n1,2\n3\n";
        assert!(read_delimited(csv.as_bytes(), b',').is_err());
    }

    #[test]
    fn test_load_json_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.json");
        std::fs::write(
            &path,
            r#"[
                {"station": "A", "date": "2023-02-01", "concentration": 1.25, "flagged": false},
                {"station": "B", "date": null, "concentration": 2, "flagged": true}
            ]"#,
        )
        .unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.records[0]["date"],
            Value::Date(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap())
        );
        assert_eq!(table.records[1]["date"], Value::Null);
        assert_eq!(table.records[1]["concentration"], Value::Int(2));
        assert_eq!(table.records[1]["flagged"], Value::Bool(true));
    }

    #[test]
    fn test_load_parquet_flat_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.parquet");

        let schema = Arc::new(Schema::new(vec![
            Field::new("station", DataType::Utf8, false),
            Field::new("concentration", DataType::Float64, true),
            Field::new("date", DataType::Date32, true),
        ]));
        // 19358 days after the epoch = 2023-01-01.
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["A", "B"])),
                Arc::new(Float64Array::from(vec![Some(0.5), None])),
                Arc::new(Date32Array::from(vec![Some(19358), None])),
            ],
        )
        .unwrap();

        let file = File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let table = load_file(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.records[0]["date"],
            Value::Date(NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
        );
        assert_eq!(table.records[1]["concentration"], Value::Null);
        assert_eq!(table.records[1]["date"], Value::Null);
    }

    #[test]
    fn test_unsupported_extension() {
        let err = load_file(Path::new("data.xlsx")).unwrap_err();
        assert!(err.to_string().contains("xlsx"));
    }
}
