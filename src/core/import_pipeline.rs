//! Spreadsheet exports into the `sales` table.

use crate::adapters::sources::{SourceDocument, SourceFetcher, SourceLocation};
use crate::adapters::xlsx::{self, Cell, Sheet};
use crate::domain::model::{Record, SaleRecord, TransformResult};
use crate::domain::ports::{Pipeline, SalesRepository};
use crate::utils::error::Result;
use crate::utils::parse::{coerce_f64, date_from_cell};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Export headers and the canonical column each one feeds.
pub const COLUMN_MAP: [(&str, &str); 7] = [
    ("Data", "date"),
    ("Vendita", "sale"),
    ("Acquisto", "purchase_cost"),
    ("C. Market", "commission"),
    ("SKU/EAN", "sku"),
    ("Prodotto", "product_name"),
    ("Qta", "quantity"),
];

const ESSENTIAL: [&str; 2] = ["date", "sale"];

fn canonical_column(header: &str) -> Option<&'static str> {
    COLUMN_MAP
        .iter()
        .find(|(h, _)| h.eq_ignore_ascii_case(header.trim()))
        .map(|(_, c)| *c)
}

/// Rows of one sheet keyed by canonical column, or `None` when the sheet has
/// no date or sale column.
pub fn sheet_records(stem: &str, sheet: &Sheet) -> Option<Vec<Record>> {
    let header_at = sheet
        .rows
        .iter()
        .position(|row| row.iter().any(|c| !c.is_empty()))?;
    let columns: Vec<Option<&'static str>> = sheet.rows[header_at]
        .iter()
        .map(|c| canonical_column(&c.as_header()))
        .collect();

    if !ESSENTIAL
        .iter()
        .all(|e| columns.iter().any(|c| *c == Some(*e)))
    {
        tracing::debug!("Sheet '{}' of '{}' has no date/sale columns, skipping", sheet.name, stem);
        return None;
    }

    let records = sheet.rows[header_at + 1..]
        .iter()
        .filter(|row| row.iter().any(|c| !c.is_empty()))
        .map(|row| {
            let mut data: HashMap<String, Value> = HashMap::new();
            for (column, cell) in columns.iter().zip(row.iter()) {
                let Some(column) = column else { continue };
                // a later duplicate header only fills blanks
                let keep_existing = data.get(*column).is_some_and(|v| !v.is_null());
                if !keep_existing {
                    data.insert(column.to_string(), cell_value(cell));
                }
            }
            Record {
                source: stem.to_string(),
                sheet: sheet.name.clone(),
                data,
            }
        })
        .collect();
    Some(records)
}

fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Text(s) if s.trim().is_empty() => Value::Null,
        other => other.to_json(),
    }
}

/// SKUs and names as text; whole numbers (EAN codes) lose the `.0`.
fn text_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Typed sales row, or `None` when the date cannot be read.
pub fn clean_record(record: &Record) -> Option<SaleRecord> {
    let order_date = record.data.get("date").and_then(date_from_cell)?;
    let amount = |key: &str| record.data.get(key).and_then(coerce_f64).unwrap_or(0.0);
    let product_name = text_value(record.data.get("product_name"));

    Some(SaleRecord {
        order_date,
        marketplace: record.source.clone(),
        sheet: record.sheet.clone(),
        sku: text_value(record.data.get("sku")),
        product_name: (!product_name.is_empty()).then_some(product_name),
        quantity: record
            .data
            .get("quantity")
            .and_then(coerce_f64)
            .map(|q| q.round() as i64)
            .unwrap_or(1),
        sale: amount("sale"),
        purchase_cost: amount("purchase_cost"),
        commission: amount("commission"),
    })
}

pub fn workbook_records(document: &SourceDocument) -> Result<Vec<Record>> {
    let sheets = xlsx::read_workbook(&document.bytes)?;
    Ok(sheets
        .iter()
        .filter_map(|sheet| sheet_records(&document.stem, sheet))
        .flatten()
        .collect())
}

pub enum ImportInput {
    Locations(Vec<SourceLocation>),
    /// Already in memory, e.g. uploaded through the dashboard.
    Documents(Vec<SourceDocument>),
}

pub struct ImportPipeline<R: SalesRepository> {
    repository: R,
    fetcher: SourceFetcher,
    input: ImportInput,
}

impl<R: SalesRepository> ImportPipeline<R> {
    pub fn new(repository: R, input: ImportInput) -> Result<Self> {
        Ok(Self {
            repository,
            fetcher: SourceFetcher::new()?,
            input,
        })
    }

    async fn documents(&self) -> Vec<SourceDocument> {
        match &self.input {
            ImportInput::Documents(documents) => documents.clone(),
            ImportInput::Locations(locations) => {
                let mut documents = Vec::with_capacity(locations.len());
                for location in locations {
                    match self.fetcher.fetch(location).await {
                        Ok(document) => documents.push(document),
                        Err(e) => tracing::error!(
                            "❌ Could not read {}: {}",
                            location.display_name(),
                            e.user_friendly_message()
                        ),
                    }
                }
                documents
            }
        }
    }
}

#[async_trait]
impl<R: SalesRepository> Pipeline for ImportPipeline<R> {
    async fn extract(&self) -> Result<Vec<Record>> {
        let mut records = Vec::new();
        for document in self.documents().await {
            match workbook_records(&document) {
                Ok(rows) => {
                    tracing::debug!("{}: {} rows", document.stem, rows.len());
                    records.extend(rows);
                }
                Err(e) => tracing::error!("❌ Could not parse {}: {}", document.stem, e),
            }
        }
        Ok(records)
    }

    async fn transform(&self, data: Vec<Record>) -> Result<TransformResult> {
        let mut result = TransformResult::default();
        for record in &data {
            match clean_record(record) {
                Some(sale) => result.records.push(sale),
                None => result.skipped += 1,
            }
        }
        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<usize> {
        self.repository.insert_new(result.records).await
    }
}
