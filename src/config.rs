use crate::errors::{DeskError, DeskResult};
use crate::models::ModelKind;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub symbol: String,
    pub initial_spot: f64,
    pub risk_free_rate: f64,
    pub default_volatility: f64,
    pub pricing_model: ModelKind,
    pub commentary_api_key: Option<String>,
    pub commentary_base_url: String,
    pub commentary_model: String,
    /// Request commentary every N simulated days; 0 disables it.
    pub commentary_every_days: u32,
    pub server_port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbol: "NVDA".to_string(),
            initial_spot: 130.0,
            risk_free_rate: 0.045,
            default_volatility: 0.45,
            pricing_model: ModelKind::Polynomial,
            commentary_api_key: None,
            commentary_base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            commentary_model: "gemini-3-flash-preview".to_string(),
            commentary_every_days: 4,
            server_port: 3001,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> DeskResult<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let initial_spot = env_var_or("INITIAL_SPOT", "130.0")
            .parse::<f64>()
            .map_err(|e| DeskError::Config(format!("INITIAL_SPOT: {e}")))?;
        if !(initial_spot > 0.0 && initial_spot.is_finite()) {
            return Err(DeskError::Config(format!(
                "INITIAL_SPOT must be positive, got {initial_spot}"
            )));
        }

        let risk_free_rate = env_var_or("RISK_FREE_RATE", "0.045")
            .parse::<f64>()
            .map_err(|e| DeskError::Config(format!("RISK_FREE_RATE: {e}")))?;

        let default_volatility = env_var_or("DEFAULT_VOLATILITY", "0.45")
            .parse::<f64>()
            .map_err(|e| DeskError::Config(format!("DEFAULT_VOLATILITY: {e}")))?;
        if !(default_volatility > 0.0) {
            return Err(DeskError::Config(format!(
                "DEFAULT_VOLATILITY must be positive, got {default_volatility}"
            )));
        }

        let pricing_model = env_var_or("PRICING_MODEL", "polynomial").parse::<ModelKind>()?;

        let commentary_every_days = env_var_or("COMMENTARY_EVERY_DAYS", "4")
            .parse::<u32>()
            .map_err(|e| DeskError::Config(format!("COMMENTARY_EVERY_DAYS: {e}")))?;

        let server_port = env_var_or("SERVER_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| DeskError::Config(format!("SERVER_PORT: {e}")))?;

        Ok(Self {
            symbol: env_var_or("DESK_SYMBOL", &defaults.symbol),
            initial_spot,
            risk_free_rate,
            default_volatility,
            pricing_model,
            commentary_api_key: std::env::var("COMMENTARY_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            commentary_base_url: env_var_or("COMMENTARY_BASE_URL", &defaults.commentary_base_url),
            commentary_model: env_var_or("COMMENTARY_MODEL", &defaults.commentary_model),
            commentary_every_days,
            server_port,
        })
    }
}

fn env_var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
