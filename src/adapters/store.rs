use crate::domain::model::{DateRange, SaleRecord, SalesFilter};
use crate::domain::ports::SalesRepository;
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::{params, params_from_iter, types::Value};
use std::collections::HashSet;
use std::path::Path;
use tokio_rusqlite::Connection;

const SELECT_COLUMNS: &str = "SELECT order_date, marketplace, sheet, sku, product_name, quantity, \
     sale, purchase_cost, commission FROM sales";

/// The single `sales` table shared by spreadsheet imports and API syncs.
#[derive(Clone)]
pub struct SqliteSalesStore {
    conn: Connection,
}

impl SqliteSalesStore {
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    pub async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS sales (
                    id INTEGER PRIMARY KEY,
                    order_date DATE NOT NULL,
                    marketplace TEXT NOT NULL,
                    sheet TEXT NOT NULL,
                    sku TEXT NOT NULL DEFAULT '',
                    product_name TEXT,
                    quantity INTEGER NOT NULL DEFAULT 1,
                    sale REAL NOT NULL DEFAULT 0,
                    purchase_cost REAL NOT NULL DEFAULT 0,
                    commission REAL NOT NULL DEFAULT 0,
                    UNIQUE(order_date, marketplace, sheet, sku)
                );
                CREATE INDEX IF NOT EXISTS idx_sales_date ON sales(order_date);",
            )?;
            Ok(())
        })
        .await?;
        Ok(Self { conn })
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<SaleRecord> {
    Ok(SaleRecord {
        order_date: row.get(0)?,
        marketplace: row.get(1)?,
        sheet: row.get(2)?,
        sku: row.get(3)?,
        product_name: row.get(4)?,
        quantity: row.get(5)?,
        sale: row.get(6)?,
        purchase_cost: row.get(7)?,
        commission: row.get(8)?,
    })
}

#[async_trait]
impl SalesRepository for SqliteSalesStore {
    async fn insert_new(&self, records: Vec<SaleRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        // first occurrence wins inside one batch
        let mut seen = HashSet::new();
        let unique: Vec<SaleRecord> = records
            .into_iter()
            .filter(|r| {
                seen.insert((
                    r.order_date,
                    r.marketplace.clone(),
                    r.sheet.clone(),
                    r.sku.clone(),
                ))
            })
            .collect();

        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO sales (
                            order_date, marketplace, sheet, sku, product_name,
                            quantity, sale, purchase_cost, commission
                        )
                        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    )?;
                    for r in &unique {
                        inserted += stmt.execute(params![
                            r.order_date,
                            r.marketplace,
                            r.sheet,
                            r.sku,
                            r.product_name,
                            r.quantity,
                            r.sale,
                            r.purchase_cost,
                            r.commission
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;

        tracing::debug!("Inserted {} new sales rows", inserted);
        Ok(inserted)
    }

    async fn load(&self, filter: &SalesFilter) -> Result<Vec<SaleRecord>> {
        let mut clauses = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(range) = filter.range {
            clauses.push("order_date BETWEEN ? AND ?".to_string());
            values.push(Value::Text(range.start.format("%Y-%m-%d").to_string()));
            values.push(Value::Text(range.end.format("%Y-%m-%d").to_string()));
        }
        if !filter.marketplaces.is_empty() {
            let placeholders = vec!["?"; filter.marketplaces.len()].join(", ");
            clauses.push(format!("marketplace IN ({})", placeholders));
            values.extend(filter.marketplaces.iter().cloned().map(Value::Text));
        }

        let mut sql = SELECT_COLUMNS.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY order_date, marketplace, sheet, sku");

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params_from_iter(values.iter()), row_to_record)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;
        Ok(rows)
    }

    async fn marketplaces(&self) -> Result<Vec<String>> {
        let names = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT DISTINCT marketplace FROM sales ORDER BY marketplace")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await?;
        Ok(names)
    }

    async fn date_bounds(&self) -> Result<Option<DateRange>> {
        let bounds = self
            .conn
            .call(|conn| {
                let bounds = conn.query_row(
                    "SELECT MIN(order_date), MAX(order_date) FROM sales",
                    [],
                    |row| {
                        Ok((
                            row.get::<_, Option<NaiveDate>>(0)?,
                            row.get::<_, Option<NaiveDate>>(1)?,
                        ))
                    },
                )?;
                Ok(bounds)
            })
            .await?;
        Ok(match bounds {
            (Some(min), Some(max)) => Some(DateRange::new(min, max)),
            _ => None,
        })
    }

    async fn count(&self) -> Result<usize> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM sales", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count.max(0) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn record(day: u32, marketplace: &str, sheet: &str, sku: &str, sale: f64) -> SaleRecord {
        SaleRecord {
            order_date: ymd(2024, 5, day),
            marketplace: marketplace.to_string(),
            sheet: sheet.to_string(),
            sku: sku.to_string(),
            product_name: Some(format!("Product {}", sku)),
            quantity: 1,
            sale,
            purchase_cost: sale / 2.0,
            commission: 1.0,
        }
    }

    #[tokio::test]
    async fn test_insert_new_skips_duplicates() {
        let store = SqliteSalesStore::open_in_memory().await.unwrap();

        let batch = vec![
            record(1, "Worten", "Maggio", "A", 10.0),
            record(1, "Worten", "Maggio", "A", 99.0), // same key, dropped
            record(1, "Worten", "Maggio", "B", 20.0),
        ];
        assert_eq!(store.insert_new(batch).await.unwrap(), 2);

        let again = vec![
            record(1, "Worten", "Maggio", "A", 10.0),
            record(2, "Worten", "Maggio", "A", 30.0),
        ];
        assert_eq!(store.insert_new(again).await.unwrap(), 1);
        assert_eq!(store.count().await.unwrap(), 3);

        let rows = store.load(&SalesFilter::default()).await.unwrap();
        let first = rows.iter().find(|r| r.sku == "A" && r.order_date == ymd(2024, 5, 1)).unwrap();
        assert_eq!(first.sale, 10.0);
        assert_eq!(first.product_name.as_deref(), Some("Product A"));
    }

    #[tokio::test]
    async fn test_insert_empty_batch() {
        let store = SqliteSalesStore::open_in_memory().await.unwrap();
        assert_eq!(store.insert_new(vec![]).await.unwrap(), 0);
        assert_eq!(store.date_bounds().await.unwrap(), None);
        assert!(store.marketplaces().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_with_filter() {
        let store = SqliteSalesStore::open_in_memory().await.unwrap();
        store
            .insert_new(vec![
                record(1, "Worten", "Maggio", "A", 10.0),
                record(5, "ePrice", "Maggio", "B", 20.0),
                record(9, "Leroy Merlin", "api:1", "C", 30.0),
            ])
            .await
            .unwrap();

        let filter = SalesFilter {
            marketplaces: vec!["Worten".to_string(), "ePrice".to_string()],
            range: Some(DateRange::new(ymd(2024, 5, 2), ymd(2024, 5, 31))),
        };
        let rows = store.load(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].marketplace, "ePrice");

        assert_eq!(
            store.marketplaces().await.unwrap(),
            vec!["Leroy Merlin", "Worten", "ePrice"]
        );
        assert_eq!(
            store.date_bounds().await.unwrap(),
            Some(DateRange::new(ymd(2024, 5, 1), ymd(2024, 5, 9)))
        );
    }

    #[tokio::test]
    async fn test_file_store_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marketplace.db");

        let store = SqliteSalesStore::open(&path).await.unwrap();
        store
            .insert_new(vec![record(1, "Worten", "Maggio", "A", 10.0)])
            .await
            .unwrap();
        drop(store);

        let reopened = SqliteSalesStore::open(&path).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 1);
    }
}
