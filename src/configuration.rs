use std::path::PathBuf;

use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub registry: RegistrySettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub static_dir: Option<PathBuf>,
}

/// Where and how the upstream trademark registry is scraped.
#[derive(Deserialize, Clone, Debug)]
pub struct RegistrySettings {
    pub base_url: String,
    pub search_path: String,
    pub search_param: String,
    pub user_agent: String,
    #[serde(
        default = "default_detail_concurrency",
        deserialize_with = "deserialize_number_from_string"
    )]
    pub detail_concurrency: usize,
}

#[derive(Deserialize, Clone, Default, Debug)]
pub struct CacheSettings {
    /// Directory holding one JSON blob per searched name. In-memory when unset.
    pub dir: Option<PathBuf>,
}

fn default_detail_concurrency() -> usize {
    4
}

impl Default for RegistrySettings {
    fn default() -> Self {
        RegistrySettings {
            base_url: "https://www.trademarkelite.com".to_string(),
            search_path: "/trademark/trademark-search.aspx".to_string(),
            search_param: "sw".to_string(),
            user_agent: format!("markwatch/{}", env!("CARGO_PKG_VERSION")),
            detail_concurrency: default_detail_concurrency(),
        }
    }
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| config::ConfigError::Foreign(e.into()))?;
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let environment_filename = format!("{}.yaml", environment.as_str());

    let settings = config::Config::builder()
        .add_source(config::File::from(configuration_directory.join("base.yaml")))
        .add_source(
            config::File::from(configuration_directory.join(environment_filename)).required(false),
        )
        // APP_APPLICATION__PORT=5001 sets `Settings.application.port`
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
