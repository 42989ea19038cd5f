//! Config and argument checks; every failure is an `InvalidConfigValueError`.

use crate::utils::error::{EtlError, Result};
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::Path;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl Display, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// Marketplace endpoints and workbook links: absolute http(s) with a host.
pub fn validate_http_url(field: &str, raw: &str) -> Result<()> {
    let url = Url::parse(raw.trim()).map_err(|e| invalid(field, raw, format!("not a URL ({})", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(field, raw, format!("scheme {} is not http or https", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid(field, raw, "URL has no host"));
    }
    Ok(())
}

pub fn validate_path(field: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field, path, "path is empty"));
    }
    if path.contains('\0') {
        return Err(invalid(field, path.escape_default(), "path contains a NUL byte"));
    }
    Ok(())
}

pub fn validate_required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "value is required"));
    }
    Ok(())
}

pub fn validate_bounds<T: PartialOrd + Display>(field: &str, value: T, bounds: RangeInclusive<T>) -> Result<()> {
    if bounds.contains(&value) {
        return Ok(());
    }
    let reason = format!("expected between {} and {}", bounds.start(), bounds.end());
    Err(invalid(field, value, reason))
}

/// Local import arguments must all be workbooks, whatever the case of the extension.
pub fn validate_xlsx_files(field: &str, files: &[String]) -> Result<()> {
    match files.iter().find(|file| {
        !Path::new(file.as_str())
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
    }) {
        Some(file) => Err(invalid(field, file, "only .xlsx workbooks can be imported")),
        None => Ok(()),
    }
}
