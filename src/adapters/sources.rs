//! Where workbooks come from: local files, folders, link lists and URLs.

use crate::adapters::storage::LocalStorage;
use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    File(PathBuf),
    Url(String),
}

impl SourceLocation {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.starts_with("http://") || raw.starts_with("https://") {
            SourceLocation::Url(raw.to_string())
        } else {
            SourceLocation::File(PathBuf::from(raw))
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            SourceLocation::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            SourceLocation::Url(url) => url.clone(),
        }
    }
}

/// Workbook bytes plus the stem that becomes the marketplace name.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub stem: String,
    pub bytes: Vec<u8>,
}

fn is_workbook(path: &Path) -> bool {
    let is_xlsx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"));
    // Excel lock files look like "~$Worten.xlsx"
    let is_lock = path
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("~$"));
    is_xlsx && !is_lock
}

fn workbooks_in(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_workbook(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// One URL per line; blank lines and `#` comments are skipped.
pub fn parse_links(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// Expands folders and link files into an ordered, de-duplicated list.
pub fn collect_sources(
    paths: &[String],
    folder: Option<&str>,
    links_file: Option<&str>,
    links: &[String],
) -> Result<Vec<SourceLocation>> {
    let mut sources = Vec::new();

    for raw in paths {
        match SourceLocation::parse(raw) {
            SourceLocation::File(path) if path.is_dir() => {
                sources.extend(workbooks_in(&path)?.into_iter().map(SourceLocation::File))
            }
            location => sources.push(location),
        }
    }

    if let Some(folder) = folder {
        let dir = Path::new(folder);
        if dir.is_dir() {
            sources.extend(workbooks_in(dir)?.into_iter().map(SourceLocation::File));
        } else {
            tracing::warn!("Import folder {} does not exist, skipping", folder);
        }
    }

    if let Some(links_file) = links_file {
        if Path::new(links_file).exists() {
            let content = std::fs::read_to_string(links_file)?;
            sources.extend(parse_links(&content).iter().map(|l| SourceLocation::parse(l)));
        }
    }

    sources.extend(links.iter().map(|l| SourceLocation::parse(l)));

    let mut unique = Vec::with_capacity(sources.len());
    for source in sources {
        if !unique.contains(&source) {
            unique.push(source);
        }
    }
    Ok(unique)
}

/// Rewrites Google Drive share links to the direct download endpoint.
pub fn direct_download_url(url: &str) -> Result<String> {
    if !url.contains("drive.google.com") && !url.contains("docs.google.com") {
        return Ok(url.to_string());
    }
    let re = Regex::new(r"(?:/d/|[?&]id=)([A-Za-z0-9_-]{10,})").map_err(|e| EtlError::ConfigError {
        message: e.to_string(),
    })?;
    Ok(match re.captures(url) {
        Some(caps) => format!(
            "https://drive.google.com/uc?export=download&id={}",
            &caps[1]
        ),
        None => url.to_string(),
    })
}

fn stem_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// `attachment; filename="Worten.xlsx"` -> `Worten`.
pub fn stem_from_content_disposition(header: &str) -> Option<String> {
    let re = Regex::new(r#"filename="?([^";]+)"?"#).ok()?;
    re.captures(header).and_then(|caps| stem_of(caps[1].trim()))
}

pub fn stem_from_url(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    stem_of(last)
}

pub struct SourceFetcher<S: Storage = LocalStorage> {
    storage: S,
    client: Client,
}

impl SourceFetcher<LocalStorage> {
    pub fn new() -> Result<Self> {
        Self::with_storage(LocalStorage::default())
    }
}

impl<S: Storage> SourceFetcher<S> {
    pub fn with_storage(storage: S) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self { storage, client })
    }

    pub async fn fetch(&self, location: &SourceLocation) -> Result<SourceDocument> {
        match location {
            SourceLocation::File(path) => {
                let bytes = self.storage.read_file(&path.to_string_lossy()).await?;
                let stem = path
                    .file_name()
                    .and_then(|n| stem_of(&n.to_string_lossy()))
                    .unwrap_or_else(|| "import".to_string());
                Ok(SourceDocument { stem, bytes })
            }
            SourceLocation::Url(url) => self.fetch_url(url).await,
        }
    }

    async fn fetch_url(&self, url: &str) -> Result<SourceDocument> {
        let download_url = direct_download_url(url)?;
        tracing::debug!("Downloading workbook from: {}", download_url);

        let response = self.client.get(&download_url).send().await?;
        if !response.status().is_success() {
            return Err(EtlError::HttpStatusError {
                url: download_url,
                status: response.status().as_u16(),
            });
        }

        let stem = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(stem_from_content_disposition)
            .or_else(|| stem_from_url(url))
            .unwrap_or_else(|| "download".to_string());
        let bytes = response.bytes().await?.to_vec();

        tracing::debug!("Downloaded {} bytes as '{}'", bytes.len(), stem);
        Ok(SourceDocument { stem, bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_links() {
        let links = parse_links("\nhttps://a.example/x.xlsx\n  # comment\n\n https://b.example/y.xlsx \n");
        assert_eq!(links, vec!["https://a.example/x.xlsx", "https://b.example/y.xlsx"]);
    }

    #[test]
    fn test_direct_download_url() {
        assert_eq!(
            direct_download_url("https://drive.google.com/file/d/1AbCdEfGhIjKlMn/view?usp=sharing").unwrap(),
            "https://drive.google.com/uc?export=download&id=1AbCdEfGhIjKlMn"
        );
        assert_eq!(
            direct_download_url("https://drive.google.com/open?id=1AbCdEfGhIjKlMn").unwrap(),
            "https://drive.google.com/uc?export=download&id=1AbCdEfGhIjKlMn"
        );
        assert_eq!(
            direct_download_url("https://example.com/Worten.xlsx").unwrap(),
            "https://example.com/Worten.xlsx"
        );
    }

    #[test]
    fn test_stems() {
        assert_eq!(
            stem_from_content_disposition(r#"attachment; filename="Leroy Merlin.xlsx"; filename*=UTF-8''x"#),
            Some("Leroy Merlin".to_string())
        );
        assert_eq!(
            stem_from_content_disposition("attachment; filename=ePrice.xlsx"),
            Some("ePrice".to_string())
        );
        assert_eq!(stem_from_url("https://example.com/files/Worten.xlsx?x=1"), Some("Worten".to_string()));
        assert_eq!(stem_from_url("https://example.com/"), None);
    }

    #[test]
    fn test_collect_sources_expands_folder_and_links() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("b.xlsx"), b"x").unwrap();
        std::fs::write(dir.path().join("a.XLSX"), b"x").unwrap();
        std::fs::write(dir.path().join("~$a.xlsx"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        let links_path = dir.path().join("links.txt");
        std::fs::write(&links_path, "https://example.com/c.xlsx\n").unwrap();

        let sources = collect_sources(
            &["https://example.com/c.xlsx".to_string()],
            dir.path().to_str(),
            links_path.to_str(),
            &["https://example.com/d.xlsx".to_string()],
        )
        .unwrap();

        assert_eq!(
            sources,
            vec![
                SourceLocation::Url("https://example.com/c.xlsx".to_string()),
                SourceLocation::File(dir.path().join("a.XLSX")),
                SourceLocation::File(dir.path().join("b.xlsx")),
                SourceLocation::Url("https://example.com/d.xlsx".to_string()),
            ]
        );
    }

    #[test]
    fn test_collect_sources_missing_folder_and_links_file() {
        let sources = collect_sources(&[], Some("/no/such/folder"), Some("/no/such/links.txt"), &[]).unwrap();
        assert!(sources.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_url_uses_content_disposition() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/download");
                then.status(200)
                    .header("Content-Disposition", "attachment; filename=\"ePrice.xlsx\"")
                    .body("bytes");
            })
            .await;

        let fetcher = SourceFetcher::new().unwrap();
        let doc = fetcher
            .fetch(&SourceLocation::Url(server.url("/download")))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(doc.stem, "ePrice");
        assert_eq!(doc.bytes, b"bytes");
    }

    #[tokio::test]
    async fn test_fetch_url_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/Worten.xlsx");
                then.status(404);
            })
            .await;

        let fetcher = SourceFetcher::new().unwrap();
        let result = fetcher
            .fetch(&SourceLocation::Url(server.url("/Worten.xlsx")))
            .await;
        assert!(matches!(
            result,
            Err(EtlError::HttpStatusError { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_local_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Worten.xlsx");
        std::fs::write(&path, b"data").unwrap();

        let fetcher = SourceFetcher::new().unwrap();
        let doc = fetcher.fetch(&SourceLocation::File(path)).await.unwrap();
        assert_eq!(doc.stem, "Worten");
        assert_eq!(doc.bytes, b"data");
    }
}
