use anyhow::Context;

pub const DEFAULT_CLASS_ID: &str = "class_1";
pub const DEFAULT_TEACHER_ID: &str = "teacher";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub max_connections: u32,
    /// Class that receives students created implicitly by imports and grade entry.
    pub default_class_id: String,
    pub teacher_id: String,
}

impl AppConfig {
    /// Reads `.env` when present, then the process environment.
    pub fn load() -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let max_connections = match lookup("GRADEBOOK_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .with_context(|| {
                    format!("GRADEBOOK_MAX_CONNECTIONS must be a positive integer, got {raw:?}")
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            max_connections,
            default_class_id: lookup("GRADEBOOK_DEFAULT_CLASS")
                .unwrap_or_else(|| DEFAULT_CLASS_ID.to_string()),
            teacher_id: lookup("GRADEBOOK_TEACHER_ID")
                .unwrap_or_else(|| DEFAULT_TEACHER_ID.to_string()),
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance (or pass --snapshot)")
    }
}
