use super::chart;
use super::query::{ResolvedFilter, ALL_MARKETPLACES};
use crate::analytics::periods::QuickRange;
use crate::analytics::{Report, MAX_TOP_N, MIN_TOP_N};
use crate::utils::format::{eur, percent};
use askama::Template;
use serde::Serialize;

/// Everything `/` and `/api/dashboard` show for one request.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub available: Vec<String>,
    pub selected: Vec<String>,
    pub from: String,
    pub to: String,
    pub quick_range: Option<QuickRange>,
    pub top_marketplace: Option<String>,
    pub top_n: usize,
    /// Rows in the whole store.
    pub stored_rows: usize,
    pub report: Report,
    #[serde(skip)]
    pub resolved: ResolvedFilter,
}

pub struct Choice {
    pub value: String,
    pub label: String,
    pub checked: bool,
}

pub struct QuickLink {
    pub label: &'static str,
    pub href: String,
    pub active: bool,
}

pub struct Kpi {
    pub label: &'static str,
    pub value: String,
}

pub struct SummaryRow {
    pub marketplace: String,
    pub sales: String,
    pub purchase_cost: String,
    pub commission: String,
    pub gross_margin: String,
}

pub struct ProductRow {
    pub rank: usize,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub sales: String,
    pub purchase_cost: String,
    pub commission: String,
    pub margin: String,
}

pub struct LegendEntry {
    pub name: String,
    pub color: &'static str,
}

#[derive(Template)]
#[template(path = "dashboard.html")]
pub struct DashboardPage {
    pub notice: Option<String>,
    pub has_data: bool,
    pub has_rows: bool,
    pub marketplaces: Vec<Choice>,
    pub from: String,
    pub to: String,
    pub quick_links: Vec<QuickLink>,
    pub kpis: Vec<Kpi>,
    pub summary: Vec<SummaryRow>,
    pub chart_svg: String,
    pub legend: Vec<LegendEntry>,
    pub top_choices: Vec<Choice>,
    pub top_n: usize,
    pub min_top_n: usize,
    pub max_top_n: usize,
    pub products: Vec<ProductRow>,
    pub export_href: String,
    pub json_href: String,
    pub sync_marketplaces: Vec<&'static str>,
}

impl DashboardPage {
    pub fn new(data: &DashboardData, notice: Option<String>, sync_marketplaces: Vec<&'static str>) -> Self {
        let report = &data.report;
        let resolved = &data.resolved;

        let marketplaces = data
            .available
            .iter()
            .map(|m| Choice {
                value: m.clone(),
                label: m.clone(),
                checked: data.selected.contains(m),
            })
            .collect();

        let quick_links = QuickRange::ALL
            .into_iter()
            .map(|q| QuickLink {
                label: q.label(),
                href: resolved.href_with_range(q),
                active: data.quick_range == Some(q),
            })
            .collect();

        let kpis = vec![
            Kpi {
                label: "Fatturato",
                value: eur(report.kpis.revenue),
            },
            Kpi {
                label: "Costi (acq+comm)",
                value: eur(report.kpis.costs),
            },
            Kpi {
                label: "Margine Lordo",
                value: eur(report.kpis.gross_margin),
            },
            Kpi {
                label: "Margine %",
                value: percent(report.kpis.margin_percent),
            },
        ];

        let summary = report
            .summary
            .iter()
            .map(|s| SummaryRow {
                marketplace: s.marketplace.clone(),
                sales: eur(s.sales),
                purchase_cost: eur(s.purchase_cost),
                commission: eur(s.commission),
                gross_margin: eur(s.gross_margin),
            })
            .collect();

        let legend = report
            .trend
            .marketplaces
            .iter()
            .enumerate()
            .map(|(i, name)| LegendEntry {
                name: name.clone(),
                color: chart::series_color(i),
            })
            .collect();

        let mut top_choices = vec![Choice {
            value: ALL_MARKETPLACES.to_string(),
            label: ALL_MARKETPLACES.to_string(),
            checked: data.top_marketplace.is_none(),
        }];
        top_choices.extend(data.selected.iter().map(|m| Choice {
            value: m.clone(),
            label: m.clone(),
            checked: data.top_marketplace.as_deref() == Some(m.as_str()),
        }));

        let products = report
            .top_products
            .iter()
            .map(|p| ProductRow {
                rank: p.rank,
                sku: p.sku.clone(),
                product_name: p.product_name.clone(),
                quantity: p.quantity,
                sales: eur(p.sales),
                purchase_cost: eur(p.purchase_cost),
                commission: eur(p.commission),
                margin: eur(p.margin),
            })
            .collect();

        let query = resolved.query_string();
        Self {
            notice,
            has_data: data.stored_rows > 0,
            has_rows: report.rows > 0,
            marketplaces,
            from: data.from.clone(),
            to: data.to.clone(),
            quick_links,
            kpis,
            summary,
            chart_svg: chart::render_trend_svg(&report.trend),
            legend,
            top_choices,
            top_n: data.top_n,
            min_top_n: MIN_TOP_N,
            max_top_n: MAX_TOP_N,
            products,
            export_href: format!("/export.csv?{}", query),
            json_href: format!("/api/dashboard?{}", query),
            sync_marketplaces,
        }
    }
}
