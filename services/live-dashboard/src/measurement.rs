//! Measurement row type

use serde::{Deserialize, Serialize};

/// One row of the `measurements` table
///
/// `ts` is kept exactly as the backend delivered it. It is only used for
/// display; the view orders rows by observation, not by timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: i64,
    pub ts: String,
    pub value: f64,
    pub source: String,
}

impl Measurement {
    pub fn new(id: i64, ts: impl Into<String>, value: f64, source: impl Into<String>) -> Self {
        Self {
            id,
            ts: ts.into(),
            value,
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_postgrest_row() {
        let json = r#"{"id":7,"ts":"2026-10-16T08:30:00+00:00","value":42.125,"source":"sensor-a"}"#;
        let row: Measurement = serde_json::from_str(json).unwrap();
        assert_eq!(row.id, 7);
        assert_eq!(row.ts, "2026-10-16T08:30:00+00:00");
        assert_eq!(row.value, 42.125);
        assert_eq!(row.source, "sensor-a");
    }

    #[test]
    fn parse_row_with_extra_columns() {
        let json = r#"{"id":1,"ts":"t1","value":3.5,"source":"A","created_by":"import"}"#;
        let row: Measurement = serde_json::from_str(json).unwrap();
        assert_eq!(row, Measurement::new(1, "t1", 3.5, "A"));
    }

    #[test]
    fn parse_row_missing_value_fails() {
        let json = r#"{"id":1,"ts":"t1","source":"A"}"#;
        assert!(serde_json::from_str::<Measurement>(json).is_err());
    }
}
