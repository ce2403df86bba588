pub mod gemini;

use crate::config::AppConfig;
use crate::desk::Desk;
use crate::errors::DeskResult;
use futures_util::future::BoxFuture;
use smallvec::SmallVec;
use std::sync::Arc;

/// Shown whenever the commentary service fails or times out.
pub const FALLBACK_COMMENTARY: &str =
    "The market is reacting to current price volatility and time decay. Keep an eye on Theta as expiration nears.";

pub const WELCOME_COMMENTARY: &str =
    "Simulator online. Step the stock price up or down to see the Greeks evolve.";

pub const RESET_COMMENTARY: &str = "Simulation reset. Step the price to begin.";

/// Number of recent daily moves quoted to the commentator.
const RECENT_MOVES: usize = 5;

/// Market commentary source. Opaque text out; never consulted for pricing.
/// Returned futures must be 'static so they can be spawned off the desk task.
pub trait CommentaryProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn generate(&self, request: CommentaryRequest) -> BoxFuture<'static, DeskResult<String>>;
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CommentaryRequest {
    pub symbol: String,
    pub spot: f64,
    pub day: u32,
    /// Percent moves, oldest first.
    pub recent_moves: SmallVec<[f64; RECENT_MOVES]>,
}

impl CommentaryRequest {
    pub fn from_desk(symbol: &str, desk: &Desk) -> Self {
        Self {
            symbol: symbol.to_string(),
            spot: desk.sim().spot_price(),
            day: desk.sim().elapsed_days(),
            recent_moves: desk.sim().recent_moves(RECENT_MOVES).collect(),
        }
    }

    pub fn prompt(&self) -> String {
        let moves = self
            .recent_moves
            .iter()
            .map(|m| format!("{m:.1}%"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Act as a Wall Street quant trader.\n\
             Analyze the current state of our simulation for {symbol}.\n\
             - Current Price: ${spot:.2}\n\
             - Day in simulation: {day}\n\
             - Recent daily price movements: {moves}\n\n\
             Explain in 2-3 short sentences how these movements and the passage of time are affecting \
             the \"Greeks\" (specifically Delta and Theta) of the options.\n\
             Focus on how the passage of time is eating away extrinsic value.",
            symbol = self.symbol,
            spot = self.spot,
            day = self.day,
        )
    }
}

/// True when a step landed on a commentary day. `every == 0` disables commentary.
#[inline]
pub fn is_due(day: u32, every: u32) -> bool {
    every > 0 && day > 0 && day % every == 0
}

/// Always answers with the fallback text. Used when no service is configured.
pub struct StaticCommentary;

impl CommentaryProvider for StaticCommentary {
    fn name(&self) -> &'static str {
        "static"
    }

    fn generate(&self, _request: CommentaryRequest) -> BoxFuture<'static, DeskResult<String>> {
        Box::pin(async { Ok(FALLBACK_COMMENTARY.to_string()) })
    }
}

/// Generative client when an API key is configured, otherwise the static fallback.
pub fn build_provider(cfg: &AppConfig) -> Arc<dyn CommentaryProvider> {
    match &cfg.commentary_api_key {
        Some(key) => {
            tracing::info!(model = %cfg.commentary_model, "commentary service enabled");
            Arc::new(gemini::GenerativeCommentary::new(&cfg.commentary_base_url, &cfg.commentary_model, key))
        }
        None => {
            tracing::info!("no COMMENTARY_API_KEY, using static commentary");
            Arc::new(StaticCommentary)
        }
    }
}
