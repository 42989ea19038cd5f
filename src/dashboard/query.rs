//! Dashboard filter state carried in the query string.

use super::error::AppError;
use crate::analytics::periods::QuickRange;
use crate::analytics::clamp_top_n;
use crate::domain::model::{DateRange, SalesFilter};
use chrono::NaiveDate;
use url::form_urlencoded;

/// Label of the "all marketplaces" choice for top products.
pub const ALL_MARKETPLACES: &str = "Tutti i marketplace";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardQuery {
    /// Repeated `marketplace` keys; empty selects every marketplace.
    pub marketplaces: Vec<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub range: Option<QuickRange>,
    pub top_marketplace: Option<String>,
    pub top_n: Option<usize>,
    pub notice: Option<String>,
}

fn parse_day(key: &str, value: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid {} date '{}', expected YYYY-MM-DD", key, value)))
}

impl DashboardQuery {
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        let mut query = Self::default();
        let Some(raw) = raw else { return Ok(query) };

        for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match &*key {
                "marketplace" => query.marketplaces.push(value.to_string()),
                "from" => query.from = Some(parse_day("from", value)?),
                "to" => query.to = Some(parse_day("to", value)?),
                "range" => query.range = Some(value.parse().map_err(AppError::BadRequest)?),
                "top_marketplace" if value != ALL_MARKETPLACES => {
                    query.top_marketplace = Some(value.to_string())
                }
                "top_n" => {
                    let n = value
                        .parse::<usize>()
                        .map_err(|_| AppError::BadRequest(format!("invalid top_n '{}'", value)))?;
                    query.top_n = Some(n);
                }
                "notice" => query.notice = Some(value.to_string()),
                _ => {}
            }
        }
        Ok(query)
    }

    /// Applies defaults: every marketplace, first stored day until today.
    pub fn resolve(
        &self,
        available: &[String],
        bounds: Option<DateRange>,
        today: NaiveDate,
        default_top_n: usize,
    ) -> ResolvedFilter {
        let selected: Vec<String> = if self.marketplaces.is_empty() {
            available.to_vec()
        } else {
            self.marketplaces
                .iter()
                .filter(|m| available.contains(*m))
                .cloned()
                .collect()
        };

        let range = match self.range {
            Some(quick) => quick.resolve(today),
            None => {
                let start = bounds.map(|b| b.start).unwrap_or(today);
                DateRange::new(self.from.unwrap_or(start), self.to.unwrap_or(today))
            }
        };

        let top_marketplace = self
            .top_marketplace
            .clone()
            .filter(|m| selected.contains(m));

        ResolvedFilter {
            filter: SalesFilter {
                marketplaces: selected.clone(),
                range: Some(range),
            },
            selected,
            range,
            quick: self.range,
            top_marketplace,
            top_n: clamp_top_n(self.top_n.unwrap_or(default_top_n)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFilter {
    pub filter: SalesFilter,
    pub selected: Vec<String>,
    pub range: DateRange,
    pub quick: Option<QuickRange>,
    pub top_marketplace: Option<String>,
    pub top_n: usize,
}

impl ResolvedFilter {
    /// Query string reproducing this filter, with a different quick range.
    pub fn href_with_range(&self, quick: QuickRange) -> String {
        let mut serializer = self.base_serializer();
        serializer.append_pair("range", quick.key());
        format!("/?{}", serializer.finish())
    }

    /// Query string with explicit dates, used by the CSV and JSON links.
    pub fn query_string(&self) -> String {
        let mut serializer = self.base_serializer();
        serializer.append_pair("from", &self.range.start.format("%Y-%m-%d").to_string());
        serializer.append_pair("to", &self.range.end.format("%Y-%m-%d").to_string());
        serializer.finish()
    }

    fn base_serializer(&self) -> form_urlencoded::Serializer<'static, String> {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for marketplace in &self.selected {
            serializer.append_pair("marketplace", marketplace);
        }
        if let Some(top) = &self.top_marketplace {
            serializer.append_pair("top_marketplace", top);
        }
        serializer.append_pair("top_n", &self.top_n.to_string());
        serializer
    }
}

/// `/?notice=...` for redirects after a form post.
pub fn notice_location(message: &str) -> String {
    let encoded: String = form_urlencoded::Serializer::new(String::new())
        .append_pair("notice", message)
        .finish();
    format!("/?{}", encoded)
}
