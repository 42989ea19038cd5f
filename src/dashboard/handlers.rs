use super::error::AppError;
use super::query::{notice_location, DashboardQuery};
use super::state::AppState;
use super::view::{DashboardData, DashboardPage};
use crate::adapters::csv_export::{sales_to_csv, EXPORT_FILE_NAME};
use crate::adapters::sources::SourceDocument;
use crate::analytics::periods::QuickRange;
use crate::analytics::Report;
use crate::core::jobs;
use crate::core::RunSummary;
use crate::domain::model::{DateRange, SaleRecord};
use crate::domain::ports::SalesRepository;
use crate::utils::error::Result;
use askama::Template;
use axum::{
    extract::{Multipart, RawQuery, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
    Form, Json,
};
use chrono::{Duration, Local, NaiveDate};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn load_dashboard(
    state: &AppState,
    query: &DashboardQuery,
) -> std::result::Result<(DashboardData, Vec<SaleRecord>), AppError> {
    let available = state.store.marketplaces().await?;
    let bounds = state.store.date_bounds().await?;
    let stored_rows = state.store.count().await?;

    let resolved = query.resolve(&available, bounds, today(), state.config.server.default_top_n);
    // an explicit selection of unknown names matches nothing
    let rows = if resolved.selected.is_empty() {
        Vec::new()
    } else {
        state.store.load(&resolved.filter).await?
    };
    let report = Report::build(&rows, resolved.top_marketplace.as_deref(), resolved.top_n);

    let data = DashboardData {
        available,
        selected: resolved.selected.clone(),
        from: resolved.range.start.format("%Y-%m-%d").to_string(),
        to: resolved.range.end.format("%Y-%m-%d").to_string(),
        quick_range: resolved.quick,
        top_marketplace: resolved.top_marketplace.clone(),
        top_n: resolved.top_n,
        stored_rows,
        report,
        resolved,
    };
    Ok((data, rows))
}

pub async fn index(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> std::result::Result<Html<String>, AppError> {
    let query = DashboardQuery::parse(raw.as_deref())?;
    let (data, _) = load_dashboard(&state, &query).await?;
    let page = DashboardPage::new(&data, query.notice.clone(), state.config.configured_marketplaces());
    Ok(Html(page.render()?))
}

pub async fn dashboard_json(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> std::result::Result<Json<DashboardData>, AppError> {
    let query = DashboardQuery::parse(raw.as_deref())?;
    let (data, _) = load_dashboard(&state, &query).await?;
    Ok(Json(data))
}

pub async fn export_csv(
    State(state): State<AppState>,
    RawQuery(raw): RawQuery,
) -> std::result::Result<impl IntoResponse, AppError> {
    let query = DashboardQuery::parse(raw.as_deref())?;
    let (_, rows) = load_dashboard(&state, &query).await?;
    let body = sales_to_csv(&rows)?;
    tracing::debug!("Exporting {} rows as CSV", rows.len());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME),
            ),
        ],
        body,
    ))
}

/// Turns a pipeline outcome into a redirect carrying a notice.
fn outcome(result: Result<RunSummary>) -> Redirect {
    let message = match result {
        Ok(summary) => {
            let mut message = format!("Righe nuove: {}", summary.inserted);
            if summary.skipped > 0 {
                message.push_str(&format!(" (scartate: {})", summary.skipped));
            }
            message
        }
        Err(e) => {
            tracing::error!("❌ {} ({})", e, e.recovery_suggestion());
            format!("Errore: {}", e.user_friendly_message())
        }
    };
    Redirect::to(&notice_location(&message))
}

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> std::result::Result<Redirect, AppError> {
    let mut documents = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        if !file_name.to_ascii_lowercase().ends_with(".xlsx") {
            if !file_name.is_empty() {
                tracing::warn!("Ignoring upload {}: not an .xlsx file", file_name);
            }
            continue;
        }
        let stem = Path::new(&file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().trim().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        documents.push(SourceDocument {
            stem,
            bytes: bytes.to_vec(),
        });
    }

    if documents.is_empty() {
        return Ok(Redirect::to(&notice_location("Nessun file .xlsx caricato")));
    }
    Ok(outcome(jobs::import_documents(state.store.clone(), documents).await))
}

pub async fn refresh(State(state): State<AppState>) -> Redirect {
    outcome(jobs::refresh_sources(state.store.clone(), &state.config.import).await)
}

#[derive(Debug, Deserialize)]
pub struct SyncForm {
    pub marketplace: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub range: String,
}

impl SyncForm {
    /// Quick range first, then explicit days; both missing means the last 30 days.
    fn date_range(&self, today: NaiveDate) -> std::result::Result<DateRange, String> {
        if !self.range.trim().is_empty() {
            let quick: QuickRange = self.range.parse()?;
            return Ok(quick.resolve(today));
        }
        let day = |value: &str| -> std::result::Result<Option<NaiveDate>, String> {
            let value = value.trim();
            if value.is_empty() {
                return Ok(None);
            }
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .map(Some)
                .map_err(|_| format!("data non valida '{}', usa AAAA-MM-GG", value))
        };
        let to = day(&self.to)?.unwrap_or(today);
        let from = day(&self.from)?.unwrap_or(to - Duration::days(30));
        Ok(DateRange::new(from, to))
    }
}

/// Every outcome, a bad date included, comes back as a notice on the page.
pub async fn sync(State(state): State<AppState>, Form(form): Form<SyncForm>) -> Redirect {
    let range = match form.date_range(today()) {
        Ok(range) => range,
        Err(message) => {
            tracing::warn!("Sync of {} refused: {}", form.marketplace, message);
            return Redirect::to(&notice_location(&format!("Errore: {}", message)));
        }
    };
    outcome(jobs::sync_marketplace(state.store.clone(), &state.config, &form.marketplace, range).await)
}

pub async fn health(State(state): State<AppState>) -> std::result::Result<Json<Value>, AppError> {
    let rows = state.store.count().await?;
    Ok(Json(json!({ "status": "ok", "rows": rows })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn form(from: &str, to: &str, range: &str) -> SyncForm {
        SyncForm {
            marketplace: "Worten".to_string(),
            from: from.to_string(),
            to: to.to_string(),
            range: range.to_string(),
        }
    }

    #[test]
    fn test_sync_form_ranges() {
        let today = ymd(2024, 6, 15);
        assert_eq!(
            form("", "", "").date_range(today).unwrap(),
            DateRange::new(ymd(2024, 5, 16), today)
        );
        assert_eq!(
            form("2024-06-01", "2024-06-03", "").date_range(today).unwrap(),
            DateRange::new(ymd(2024, 6, 1), ymd(2024, 6, 3))
        );
        assert_eq!(
            form("2024-01-01", "", "today").date_range(today).unwrap(),
            DateRange::single(today)
        );
        assert!(form("yesterday", "", "").date_range(today).is_err());
        assert!(form("", "", "fortnight").date_range(today).is_err());
    }

    #[test]
    fn test_outcome_notice() {
        let ok = outcome(Ok(RunSummary {
            extracted: 4,
            transformed: 3,
            skipped: 1,
            inserted: 2,
        }));
        let location = ok.into_response();
        assert_eq!(
            location.headers()[header::LOCATION],
            "/?notice=Righe+nuove%3A+2+%28scartate%3A+1%29"
        );
    }
}
