use crate::analytics::{DEFAULT_TOP_N, MAX_TOP_N, MIN_TOP_N};
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "marketplace.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub import: ImportConfig,
    pub marketplaces: MarketplacesConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "marketplace.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub default_top_n: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8501".to_string(),
            default_top_n: DEFAULT_TOP_N,
        }
    }
}

/// Where spreadsheet exports are picked up from on a refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Directory scanned for `.xlsx` files.
    pub folder: Option<String>,
    /// One URL per line; ignored when the file does not exist.
    pub links_file: Option<String>,
    pub links: Vec<String>,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            folder: None,
            links_file: Some("links.txt".to_string()),
            links: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketplacesConfig {
    pub worten: Option<MarketplaceCredentials>,
    pub leroy_merlin: Option<MarketplaceCredentials>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceCredentials {
    pub base_url: String,
    pub shop_id: String,
    pub api_key: String,
    pub page_size: Option<usize>,
    pub timeout_seconds: Option<u64>,
    pub max_pages: Option<usize>,
}

impl MarketplaceCredentials {
    pub fn page_size(&self) -> usize {
        self.page_size.unwrap_or(100)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds.unwrap_or(30)
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages.unwrap_or(1000)
    }

    fn validate_section(&self, section: &str) -> Result<()> {
        validation::validate_http_url(&format!("{}.base_url", section), &self.base_url)?;
        for (key, value) in [("shop_id", &self.shop_id), ("api_key", &self.api_key)] {
            let field = format!("{}.{}", section, key);
            validation::validate_required(&field, value)?;
            // left over from an unset ${VAR}
            if value.contains("${") {
                return Err(EtlError::MissingConfigError { field });
            }
        }
        validation::validate_bounds(&format!("{}.page_size", section), self.page_size(), 1..=usize::MAX)?;
        validation::validate_bounds(&format!("{}.max_pages", section), self.max_pages(), 1..=usize::MAX)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Order states that never count as sales.
    pub skip_statuses: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            skip_statuses: vec!["CANCELED".to_string(), "REFUSED".to_string()],
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// An explicit path must exist; the default file is optional.
    pub fn load(path: Option<&str>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(DEFAULT_CONFIG_FILE),
            None => {
                tracing::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(Self::default())
            }
        }
    }

    /// 替換環境變數 (例如 ${API_KEY})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| EtlError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn configured_marketplaces(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.marketplaces.worten.is_some() {
            names.push("Worten");
        }
        if self.marketplaces.leroy_merlin.is_some() {
            names.push("Leroy Merlin");
        }
        names
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_path("database.path", &self.database.path)?;
        validation::validate_required("server.bind", &self.server.bind)?;
        validation::validate_bounds("server.default_top_n", self.server.default_top_n, MIN_TOP_N..=MAX_TOP_N)?;

        if let Some(folder) = &self.import.folder {
            validation::validate_path("import.folder", folder)?;
        }
        for link in &self.import.links {
            validation::validate_http_url("import.links", link)?;
        }

        if let Some(worten) = &self.marketplaces.worten {
            worten.validate_section("marketplaces.worten")?;
        }
        if let Some(leroy) = &self.marketplaces.leroy_merlin {
            leroy.validate_section("marketplaces.leroy_merlin")?;
        }
        Ok(())
    }
}
