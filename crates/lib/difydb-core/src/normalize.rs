//! Row normalization for JSON output.

use difydb_store::{DbValue, NormalizedRow, Row};
use serde_json::Value;

/// Restricts each row to `columns`, in projection order, preserving row order.
///
/// Columns missing from a row are emitted as null.
#[must_use]
pub fn normalize_rows(rows: &[Row], columns: &[&str]) -> Vec<NormalizedRow> {
    rows.iter().map(|row| normalize_row(row, columns)).collect()
}

#[must_use]
pub fn normalize_row(row: &Row, columns: &[&str]) -> NormalizedRow {
    columns
        .iter()
        .map(|column| {
            let value = row.get(column).map_or(Value::Null, normalize_value);
            ((*column).to_string(), value)
        })
        .collect()
}

/// Objects and arrays pass through, null stays null, everything else is
/// rendered as a string.
#[must_use]
pub fn normalize_value(value: &DbValue) -> Value {
    match value {
        DbValue::Null | DbValue::Json(Value::Null) => Value::Null,
        DbValue::Json(structured @ (Value::Object(_) | Value::Array(_))) => structured.clone(),
        other => Value::String(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn projects_columns_in_order() {
        let row = Row::new()
            .with("b", "2")
            .with("a", "1")
            .with("ignored", "x");
        let normalized = normalize_row(&row, &["a", "b", "missing"]);

        assert_eq!(normalized.len(), 3);
        assert_eq!(
            normalized.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["a", "b", "missing"]
        );
        assert_eq!(normalized["missing"], Value::Null);
    }

    #[test]
    fn stringifies_scalars_and_passes_structures() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|date| date.and_hms_opt(10, 0, 5))
            .expect("valid timestamp");
        let row = Row::new()
            .with("id", Uuid::nil())
            .with("count", DbValue::Int(42))
            .with("created_at", ts)
            .with("config", DbValue::Json(json!({"api_key": "k"})))
            .with("list", DbValue::Json(json!([1, 2])))
            .with("quoted", DbValue::Json(json!("plain")))
            .with("empty", DbValue::Null);

        let normalized = normalize_row(
            &row,
            &["id", "count", "created_at", "config", "list", "quoted", "empty"],
        );

        assert_eq!(
            Value::Object(normalized),
            json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "count": "42",
                "created_at": "2024-03-09 10:00:05",
                "config": {"api_key": "k"},
                "list": [1, 2],
                "quoted": "plain",
                "empty": null
            })
        );
    }

    #[test]
    fn fractional_timestamps_keep_six_digits() {
        let ts = NaiveDate::from_ymd_opt(2024, 5, 1)
            .and_then(|date| date.and_hms_micro_opt(8, 30, 0, 120_000))
            .expect("valid timestamp");
        let row = Row::new()
            .with("naive", ts)
            .with("zoned", DbValue::TimestampTz(ts.and_utc()));

        let normalized = normalize_row(&row, &["naive", "zoned"]);

        assert_eq!(normalized["naive"], json!("2024-05-01 08:30:00.120000"));
        assert_eq!(normalized["zoned"], json!("2024-05-01 08:30:00.120000+00:00"));
    }

    #[test]
    fn preserves_row_order() {
        let rows = vec![
            Row::new().with("k", "first"),
            Row::new().with("k", "second"),
        ];
        let normalized = normalize_rows(&rows, &["k"]);
        assert_eq!(normalized[0]["k"], json!("first"));
        assert_eq!(normalized[1]["k"], json!("second"));
        assert!(normalize_rows(&[], &["k"]).is_empty());
    }
}
