use crate::adapters::anthropic::{AnthropicSettings, DEFAULT_ENDPOINT, DEFAULT_MODEL};
use crate::adapters::abr::DEFAULT_BASE_URL;
use crate::adapters::browser::DEFAULT_CRASH_SIGNATURE;
use crate::adapters::sheets::DEFAULT_SHEETS_ENDPOINT;
use crate::core::consolidate::{Consolidator, DEFAULT_NOISE_TERMS, DEFAULT_SELF_REFERENTIAL_HOST};
use crate::core::orchestrator::RunSettings;
use crate::domain::sheet::RangeRef;
use crate::utils::error::{EnrichError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    #[serde(default)]
    pub run: RunConfig,
    pub sheet: SheetConfig,
    pub browser: BrowserConfig,
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_start_index")]
    pub start_index: usize,
    #[serde(default = "default_end_index")]
    pub end_index: usize,
    #[serde(default)]
    pub inspect_after_registry: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            start_index: default_start_index(),
            end_index: default_end_index(),
            inspect_after_registry: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SheetBackend {
    Csv,
    Google,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    pub backend: SheetBackend,
    /// CSV backend only.
    pub path: Option<String>,
    pub spreadsheet_id: Option<String>,
    pub access_token: Option<String>,
    pub endpoint: Option<String>,
    #[serde(default = "default_sheet_name")]
    pub sheet_name: String,
    #[serde(default = "default_names_range")]
    pub names_range: String,
    #[serde(default = "default_row_offset")]
    pub row_offset: u32,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub endpoint: String,
    #[serde(default = "default_browser_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_crash_signature")]
    pub crash_signature: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_extraction_endpoint")]
    pub endpoint: String,
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_url")]
    pub base_url: String,
    #[serde(default = "default_registry_timeout")]
    pub timeout_seconds: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: default_registry_url(),
            timeout_seconds: default_registry_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_self_referential_host")]
    pub self_referential_host: String,
    pub noise_terms: Option<Vec<String>>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            self_referential_host: default_self_referential_host(),
            noise_terms: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

fn default_start_index() -> usize {
    1
}
fn default_end_index() -> usize {
    141
}
fn default_sheet_name() -> String {
    "Sheet1".to_string()
}
fn default_names_range() -> String {
    "Sheet1!B2:B".to_string()
}
fn default_row_offset() -> u32 {
    2
}
fn default_browser_timeout() -> u64 {
    120
}
fn default_crash_signature() -> String {
    DEFAULT_CRASH_SIGNATURE.to_string()
}
fn default_extraction_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_max_tokens() -> u32 {
    1024
}
fn default_temperature() -> f32 {
    0.2
}
fn default_extraction_timeout() -> u64 {
    60
}
fn default_registry_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_registry_timeout() -> u64 {
    10
}
fn default_self_referential_host() -> String {
    DEFAULT_SELF_REFERENTIAL_HOST.to_string()
}

/// A `${VAR}` that survived substitution means the variable was never set.
fn reject_unresolved(field: &str, value: &str) -> Result<()> {
    if ENV_VAR_RE.is_match(value) {
        return Err(EnrichError::InvalidConfigValueError {
            field: field.to_string(),
            value: value.to_string(),
            reason: "Environment variable is not set".to_string(),
        });
    }
    Ok(())
}

impl EnrichConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EnrichError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| EnrichError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ANTHROPIC_API_KEY})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("browser.endpoint", &self.browser.endpoint)?;
        validation::validate_positive_number(
            "browser.timeout_seconds",
            self.browser.timeout_seconds as usize,
            1,
        )?;

        validation::validate_url("extraction.endpoint", &self.extraction.endpoint)?;
        validation::validate_non_empty_string("extraction.api_key", &self.extraction.api_key)?;
        reject_unresolved("extraction.api_key", &self.extraction.api_key)?;
        validation::validate_non_empty_string("extraction.model", &self.extraction.model)?;
        validation::validate_positive_number(
            "extraction.max_tokens",
            self.extraction.max_tokens as usize,
            1,
        )?;
        validation::validate_range("extraction.temperature", self.extraction.temperature, 0.0, 1.0)?;

        validation::validate_url("registry.base_url", &self.registry.base_url)?;

        match self.sheet.backend {
            SheetBackend::Csv => {
                let path = validation::validate_required_field("sheet.path", &self.sheet.path)?;
                validation::validate_path("sheet.path", path)?;
            }
            SheetBackend::Google => {
                let id = validation::validate_required_field(
                    "sheet.spreadsheet_id",
                    &self.sheet.spreadsheet_id,
                )?;
                validation::validate_non_empty_string("sheet.spreadsheet_id", id)?;
                reject_unresolved("sheet.spreadsheet_id", id)?;
                let token = validation::validate_required_field(
                    "sheet.access_token",
                    &self.sheet.access_token,
                )?;
                validation::validate_non_empty_string("sheet.access_token", token)?;
                reject_unresolved("sheet.access_token", token)?;
                validation::validate_url("sheet.endpoint", self.sheets_endpoint())?;
            }
        }
        validation::validate_non_empty_string("sheet.sheet_name", &self.sheet.sheet_name)?;
        validation::validate_positive_number("sheet.row_offset", self.sheet.row_offset as usize, 1)?;
        self.names_range()?;

        validation::validate_range(
            "run.start_index",
            self.run.start_index,
            0,
            self.run.end_index,
        )?;

        Ok(())
    }

    pub fn names_range(&self) -> Result<RangeRef> {
        RangeRef::parse(&self.sheet.names_range)
    }

    pub fn sheets_endpoint(&self) -> &str {
        self.sheet
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_SHEETS_ENDPOINT)
    }

    pub fn run_settings(&self) -> Result<RunSettings> {
        Ok(RunSettings {
            sheet_name: self.sheet.sheet_name.clone(),
            names_range: self.names_range()?,
            row_offset: self.sheet.row_offset,
            start_index: self.run.start_index,
            end_index: self.run.end_index,
            inspect_after_registry: self.run.inspect_after_registry,
        })
    }

    pub fn consolidator(&self) -> Consolidator {
        match &self.filter.noise_terms {
            Some(terms) => Consolidator::new(terms, &self.filter.self_referential_host),
            None => Consolidator::new(DEFAULT_NOISE_TERMS, &self.filter.self_referential_host),
        }
    }

    pub fn anthropic_settings(&self) -> AnthropicSettings {
        AnthropicSettings {
            endpoint: self.extraction.endpoint.clone(),
            api_key: self.extraction.api_key.clone(),
            model: self.extraction.model.clone(),
            max_tokens: self.extraction.max_tokens,
            temperature: self.extraction.temperature,
            timeout: Duration::from_secs(self.extraction.timeout_seconds),
        }
    }

    pub fn browser_timeout(&self) -> Duration {
        Duration::from_secs(self.browser.timeout_seconds)
    }

    pub fn registry_timeout(&self) -> Duration {
        Duration::from_secs(self.registry.timeout_seconds)
    }

    pub fn sheet_timeout(&self) -> Duration {
        Duration::from_secs(self.sheet.timeout_seconds.unwrap_or(30))
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for EnrichConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
