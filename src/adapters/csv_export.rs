use crate::domain::model::SaleRecord;
use crate::utils::error::{EtlError, Result};
use serde::Serialize;

pub const EXPORT_FILE_NAME: &str = "dati_filtrati.csv";

#[derive(Serialize)]
struct ExportRow<'a> {
    order_date: String,
    marketplace: &'a str,
    sheet: &'a str,
    sku: &'a str,
    product_name: &'a str,
    quantity: i64,
    sale: f64,
    purchase_cost: f64,
    commission: f64,
    margine_lordo: f64,
}

/// Filtered rows as UTF-8 CSV with a header line and a gross margin column.
pub fn sales_to_csv(rows: &[SaleRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(ExportRow {
            order_date: row.order_date.format("%Y-%m-%d").to_string(),
            marketplace: &row.marketplace,
            sheet: &row.sheet,
            sku: &row.sku,
            product_name: row.product_name.as_deref().unwrap_or(""),
            quantity: row.quantity,
            sale: row.sale,
            purchase_cost: row.purchase_cost,
            commission: row.commission,
            margine_lordo: row.gross_margin(),
        })?;
    }
    if rows.is_empty() {
        writer.write_record([
            "order_date",
            "marketplace",
            "sheet",
            "sku",
            "product_name",
            "quantity",
            "sale",
            "purchase_cost",
            "commission",
            "margine_lordo",
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}
