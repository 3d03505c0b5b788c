use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::PathBuf;

use crate::error::Result;

const DEFAULT_EMBED_URL: &str = "https://app.fabric.microsoft.com/view?r=eyJrIjoiODA2YTQzYTItNGNkYS00NTg4LTg3YmItZjVjNGY1NmJkOGExIiwidCI6IjU1NGQ0NGVjLTkwMmYtNDM1OS1iZWNlLTg2Zjg5MzU4NDJhOSJ9";

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Storage {
    pub data_dir: PathBuf,
}

impl Storage {
    pub fn users_file(&self) -> PathBuf {
        self.data_dir.join("users.csv")
    }

    pub fn feedback_file(&self) -> PathBuf {
        self.data_dir.join("feedback.csv")
    }

    pub fn profile_pics_dir(&self) -> PathBuf {
        self.data_dir.join("profile_pics")
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Admin {
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAi {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Dashboard {
    pub embed_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Animations {
    pub home: String,
    pub signin: String,
    pub signup: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub storage: Storage,
    pub admin: Admin,
    pub openai: OpenAi,
    pub dashboard: Dashboard,
    pub animations: Animations,
}

impl Settings {
    /// Defaults, then `dashboard.toml` if present, then `DASHBOARD_*` variables
    /// (`DASHBOARD_OPENAI__API_KEY`, `DASHBOARD_STORAGE__DATA_DIR`, ...).
    pub fn new() -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(
                File::with_name("dashboard.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(
                Environment::with_prefix("DASHBOARD")
                    .prefix_separator("_")
                    .separator("__"),
            );

        let mut settings: Settings = builder.build()?.try_deserialize()?;
        if settings.openai.api_key.is_empty() {
            if let Ok(key) = std::env::var("OPENAI_API_KEY") {
                settings.openai.api_key = key;
            }
        }
        Ok(settings)
    }

    /// Built-in defaults only, rooted at `data_dir`. Used by tests.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut settings: Settings = Self::defaults()?.build()?.try_deserialize()?;
        settings.storage.data_dir = data_dir.into();
        Ok(settings)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("server.bind", "127.0.0.1:3000")?
            .set_default("storage.data_dir", "database")?
            .set_default("admin.email", "admin@example.com")?
            .set_default("openai.api_key", "")?
            .set_default("openai.base_url", "https://api.openai.com/v1")?
            .set_default("openai.model", "gpt-3.5-turbo")?
            .set_default("openai.timeout_secs", 60)?
            .set_default("dashboard.embed_url", DEFAULT_EMBED_URL)?
            .set_default(
                "animations.home",
                "https://assets2.lottiefiles.com/packages/lf20_jcikwtux.json",
            )?
            .set_default(
                "animations.signin",
                "https://assets2.lottiefiles.com/packages/lf20_touohxv0.json",
            )?
            .set_default(
                "animations.signup",
                "https://assets2.lottiefiles.com/packages/lf20_yr6zz3wv.json",
            )?)
    }
}
