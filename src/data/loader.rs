use std::path::Path;

use anyhow::{Context, Result, bail};
use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{DataType, Float32Type, Float64Type, Int32Type, Int64Type};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::model::{Dataset, Value};

/// Cell spellings read as missing in text formats (`pandas.read_csv` defaults
/// that show up in the penguin data).
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row, one observation per line
/// * `.json`    – `[{ "species": "Adelie", "bill_length_mm": 39.1, ... }, ...]`
/// * `.parquet` – flat scalar columns (strings, ints, floats, bools)
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dataset = match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
    .with_context(|| format!("loading {}", path.display()))?;

    log::info!(
        "Loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// CSV layout: header row with column names, then one row per observation.
/// Cell types are guessed per cell.
fn load_csv(path: &Path) -> Result<Dataset> {
    let reader = csv::Reader::from_path(path).context("opening CSV")?;
    read_csv(reader)
}

pub(crate) fn read_csv<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Dataset> {
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut records = Vec::new();

    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() != headers.len() {
            bail!(
                "CSV row {row_no}: expected {} fields, found {}",
                headers.len(),
                record.len()
            );
        }
        records.push(record.iter().map(guess_value_type).collect());
    }

    Ok(Dataset::from_records(headers, records))
}

fn guess_value_type(s: &str) -> Value {
    let s = s.trim();
    if MISSING_MARKERS.contains(&s) {
        return Value::Null;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return Value::Float(f);
    }
    if s == "true" || s == "false" {
        return Value::Bool(s == "true");
    }
    Value::String(s.to_string())
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Expected JSON schema (records-oriented, the default `df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "species": "Adelie", "bill_length_mm": 39.1, "body_mass_g": 3750 },
///   { "species": "Adelie", "bill_length_mm": null, "body_mass_g": null }
/// ]
/// ```
///
/// Columns are the union of keys over all records; a key absent from a
/// record reads as `Null`.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    parse_json(&text)
}

pub(crate) fn parse_json(text: &str) -> Result<Dataset> {
    let root: JsonValue = serde_json::from_str(text).context("parsing JSON")?;

    let records = root
        .as_array()
        .context("Expected top-level JSON array")?;

    let mut columns: Vec<String> = Vec::new();
    for (i, rec) in records.iter().enumerate() {
        let obj = rec
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;
        for key in obj.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows = records
        .iter()
        .filter_map(|rec| rec.as_object())
        .map(|obj| {
            columns
                .iter()
                .map(|col| obj.get(col).map(json_to_value).unwrap_or(Value::Null))
                .collect()
        })
        .collect();

    Ok(Dataset::from_records(columns, rows))
}

fn json_to_value(val: &JsonValue) -> Value {
    match val {
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else if let Some(f) = n.as_f64() {
                Value::Float(f)
            } else {
                Value::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Null => Value::Null,
        other => Value::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file of flat scalar columns.
///
/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`), and by the `generate_sample` binary.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let columns: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        for row in 0..batch.num_rows() {
            let values = batch
                .columns()
                .iter()
                .zip(&columns)
                .map(|(col, name)| {
                    extract_value(col, row).with_context(|| format!("Row {row}, column '{name}'"))
                })
                .collect::<Result<Vec<_>>>()?;
            records.push(values);
        }
    }

    Ok(Dataset::from_records(columns, records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_value(col: &ArrayRef, row: usize) -> Result<Value> {
    if col.is_null(row) {
        return Ok(Value::Null);
    }
    let value = match col.data_type() {
        DataType::Utf8 => Value::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => Value::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int32 => Value::Integer(col.as_primitive::<Int32Type>().value(row) as i64),
        DataType::Int64 => Value::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::Float32 => Value::Float(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => Value::Float(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => Value::Bool(col.as_boolean().value(row)),
        other => bail!("unsupported column type {other:?}"),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_guess_value_type() {
        assert_eq!(guess_value_type("42"), Value::Integer(42));
        assert_eq!(guess_value_type("39.1"), Value::Float(39.1));
        assert_eq!(guess_value_type("Adelie"), Value::String("Adelie".into()));
        assert_eq!(guess_value_type("true"), Value::Bool(true));
        assert_eq!(guess_value_type("NA"), Value::Null);
        assert_eq!(guess_value_type(""), Value::Null);
        assert_eq!(guess_value_type(" NaN "), Value::Null);
    }

    #[test]
    fn test_read_csv_with_missing_markers() {
        let text = "species,bill_length_mm,sex\nAdelie,39.1,male\nAdelie,NA,NA\n";
        let ds = read_csv(csv::Reader::from_reader(text.as_bytes())).unwrap();
        assert_eq!(ds.columns, vec!["species", "bill_length_mm", "sex"]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.rows[0].values[1], Value::Float(39.1));
        assert_eq!(ds.rows[1].values[1], Value::Null);
        assert_eq!(ds.rows[1].row_id, 1);
    }

    #[test]
    fn test_parse_json_union_of_keys() {
        let text = r#"[
            {"species": "Adelie", "body_mass_g": 3750},
            {"species": "Gentoo", "bill_length_mm": 46.1, "body_mass_g": null}
        ]"#;
        let ds = parse_json(text).unwrap();
        assert_eq!(ds.columns.len(), 3);
        let bill = ds.column_index("bill_length_mm").unwrap();
        let mass = ds.column_index("body_mass_g").unwrap();
        assert_eq!(ds.rows[0].values[bill], Value::Null);
        assert_eq!(ds.rows[0].values[mass], Value::Integer(3750));
        assert_eq!(ds.rows[1].values[mass], Value::Null);
        assert_eq!(ds.rows[1].values[bill], Value::Float(46.1));
    }

    #[test]
    fn test_parse_json_rejects_non_array() {
        assert!(parse_json(r#"{"species": "Adelie"}"#).is_err());
        assert!(parse_json(r#"[1, 2]"#).is_err());
    }

    #[test]
    fn test_load_parquet_scalar_columns() {
        use arrow::array::{Float64Array, Int32Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;
        use std::sync::Arc;

        let schema = Arc::new(Schema::new(vec![
            Field::new("species", DataType::Utf8, true),
            Field::new("bill_depth_mm", DataType::Float64, true),
            Field::new("flipper_length_mm", DataType::Int32, true),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec![Some("Gentoo"), Some("Adelie")])),
                Arc::new(Float64Array::from(vec![Some(13.2), None])),
                Arc::new(Int32Array::from(vec![Some(211), Some(186)])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("penguins.parquet");
        let mut writer = ArrowWriter::try_new(std::fs::File::create(&path).unwrap(), schema, None)
            .unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(&path).unwrap();
        assert_eq!(ds.columns, vec!["species", "bill_depth_mm", "flipper_length_mm"]);
        assert_eq!(ds.rows[0].values[0], Value::String("Gentoo".into()));
        assert_eq!(ds.rows[0].values[2], Value::Integer(211));
        assert_eq!(ds.rows[1].values[1], Value::Null);
        assert_eq!(ds.missing_count(), 1);
    }

    #[test]
    fn test_load_file_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let csv_path = dir.path().join("penguins.csv");
        let mut f = std::fs::File::create(&csv_path).unwrap();
        writeln!(f, "species,body_mass_g").unwrap();
        writeln!(f, "Chinstrap,3500").unwrap();
        drop(f);

        let ds = load_file(&csv_path).unwrap();
        assert_eq!(ds.len(), 1);

        let bad = dir.path().join("penguins.xlsx");
        std::fs::write(&bad, b"").unwrap();
        let err = load_file(&bad).unwrap_err();
        assert!(format!("{err:#}").contains("Unsupported file extension"));

        assert!(load_file(&dir.path().join("missing.csv")).is_err());
    }
}
