use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::time::{DateRange, DateRangeError};

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub target: Option<TargetConfig>,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// Default credential, used when a request does not carry its own.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "GithubConfig::default_api_base")]
    pub api_base: String,
    #[serde(default = "GithubConfig::default_page_size")]
    pub page_size: u32,
}

impl GithubConfig {
    fn default_user_agent() -> String {
        "devpulse".to_string()
    }

    fn default_api_base() -> String {
        "https://api.github.com/".to_string()
    }

    const fn default_page_size() -> u32 {
        100
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            token: None,
            user_agent: Self::default_user_agent(),
            api_base: Self::default_api_base(),
            page_size: Self::default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
}

impl TargetConfig {
    pub fn date_range(&self) -> Result<Option<DateRange>, DateRangeError> {
        DateRange::from_bounds(self.start_date.as_deref(), self.end_date.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default = "ExportConfig::default_dir")]
    pub dir: PathBuf,
    /// Also write every fetched record, resolved or not.
    #[serde(default)]
    pub all_records: bool,
}

impl ExportConfig {
    fn default_dir() -> PathBuf {
        PathBuf::from("data")
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: Self::default_dir(),
            all_records: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_bind")]
    pub bind: String,
}

impl ApiConfig {
    fn default_bind() -> String {
        "0.0.0.0:3000".to_string()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "ObservabilityConfig::default_metrics_path")]
    pub metrics_path: String,
}

impl ObservabilityConfig {
    fn default_metrics_path() -> String {
        "/metrics".to_string()
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_path: Self::default_metrics_path(),
        }
    }
}
