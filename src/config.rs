#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    pub media_base_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "learnhub.db".to_string(),
            bind_address: "0.0.0.0:3002".to_string(),
            media_base_path: "/var/lib/learnhub/media".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: std::env::var("LEARNHUB_DATABASE_URL")
                .unwrap_or(defaults.database_url),
            bind_address: std::env::var("LEARNHUB_BIND_ADDRESS")
                .unwrap_or(defaults.bind_address),
            media_base_path: std::env::var("LEARNHUB_MEDIA_PATH")
                .unwrap_or(defaults.media_base_path),
        }
    }
}
