//! Spreadsheet exports.
//!
//! CSV is comma-separated with RFC 4180 quoting. "XLS" is the tab-separated
//! text that spreadsheet programs open when served as `application/vnd.ms-excel`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Export buffer error: {0}")]
    Buffer(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Xls,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Xls => "application/vnd.ms-excel",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xls => "xls",
        }
    }

    fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Csv => b',',
            ExportFormat::Xls => b'\t',
        }
    }

    /// `<resource>-<yyyy-mm-dd>.<ext>`
    pub fn filename(self, resource: &str, date: NaiveDate) -> String {
        format!("{}-{}.{}", resource, date.format("%Y-%m-%d"), self.extension())
    }

    pub fn content_disposition(self, resource: &str, date: NaiveDate) -> String {
        format!("attachment; filename=\"{}\"", self.filename(resource, date))
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "xls" => Ok(ExportFormat::Xls),
            other => Err(format!("unknown export format '{}'", other)),
        }
    }
}

/// Resources an admin can export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportResource {
    Users,
    Orders,
    Products,
}

impl ExportResource {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportResource::Users => "users",
            ExportResource::Orders => "orders",
            ExportResource::Products => "products",
        }
    }
}

impl std::str::FromStr for ExportResource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(ExportResource::Users),
            "orders" => Ok(ExportResource::Orders),
            "products" => Ok(ExportResource::Products),
            other => Err(format!("unknown export resource '{}'", other)),
        }
    }
}

/// Encodes flat rows with a header taken from the first row's field names.
/// No rows produces an empty document.
pub fn encode<T: Serialize>(rows: &[T], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(format.delimiter())
        .has_headers(true)
        .from_writer(Vec::new());

    for row in rows {
        writer.serialize(row)?;
    }

    writer.into_inner().map_err(|e| ExportError::Buffer(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Row {
        name: &'static str,
        note: &'static str,
        quantity: i32,
    }

    fn rows() -> Vec<Row> {
        vec![
            Row {
                name: "Desk, oak",
                note: "says \"sturdy\"",
                quantity: 2,
            },
            Row {
                name: "Lamp",
                note: "",
                quantity: 1,
            },
        ]
    }

    #[test]
    fn csv_quotes_per_rfc_4180() {
        let bytes = encode(&rows(), ExportFormat::Csv).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "name,note,quantity\n\"Desk, oak\",\"says \"\"sturdy\"\"\",2\nLamp,,1\n");
    }

    #[test]
    fn xls_is_tab_separated() {
        let bytes = encode(&rows(), ExportFormat::Xls).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("name\tnote\tquantity"));
        assert_eq!(lines.next(), Some("Desk, oak\t\"says \"\"sturdy\"\"\"\t2"));
    }

    #[test]
    fn empty_export_is_empty() {
        let none: Vec<Row> = Vec::new();
        assert!(encode(&none, ExportFormat::Csv).unwrap().is_empty());
    }

    #[test]
    fn download_headers() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 19).unwrap();
        assert_eq!(ExportFormat::Xls.filename("orders", date), "orders-2024-10-19.xls");
        assert_eq!(
            ExportFormat::Csv.content_disposition("users", date),
            "attachment; filename=\"users-2024-10-19.csv\""
        );
        assert_eq!(ExportFormat::Xls.content_type(), "application/vnd.ms-excel");
    }

    #[test]
    fn parses_resources_and_formats() {
        assert_eq!("orders".parse::<ExportResource>().unwrap(), ExportResource::Orders);
        assert!("invoices".parse::<ExportResource>().is_err());
        assert_eq!("XLS".parse::<ExportFormat>().unwrap(), ExportFormat::Xls);
        let format: ExportFormat = serde_json::from_value(serde_json::json!("xls")).unwrap();
        assert_eq!(format, ExportFormat::Xls);
        assert_eq!(ExportFormat::default(), ExportFormat::Csv);
    }
}
