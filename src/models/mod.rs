pub mod black_scholes;
pub mod normal;

use crate::errors::DeskError;

/// All pricing models implement this trait.
/// quote() must be a pure function: deterministic output from inputs only.
/// Send + Sync required so a model can live inside the desk engine task.
pub trait PricingModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Value one contract. Total over spot > 0, strike > 0, sigma > 0. Never panics.
    fn quote(&self, params: &PricingParams) -> Quote;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Exercise value right now, whatever time remains.
    #[inline]
    pub fn intrinsic(self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl std::fmt::Display for OptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CALL"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

impl std::str::FromStr for OptionKind {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "CALL" | "C" => Ok(Self::Call),
            "PUT" | "P" => Ok(Self::Put),
            other => Err(DeskError::InvalidInput(format!("unknown option kind: {other}"))),
        }
    }
}

/// Model output for a single contract.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct Quote {
    pub price: f64,
    pub delta: f64,
    /// Per calendar day.
    pub theta: f64,
    pub intrinsic_value: f64,
    pub extrinsic_value: f64,
}

impl Quote {
    /// Terminal valuation: the contract is worth its exercise value and nothing else.
    #[inline]
    pub fn at_expiry(kind: OptionKind, spot: f64, strike: f64) -> Self {
        let intrinsic = kind.intrinsic(spot, strike);
        Self {
            price: intrinsic,
            delta: 0.0,
            theta: 0.0,
            intrinsic_value: intrinsic,
            extrinsic_value: 0.0,
        }
    }
}

// ── Precomputed pricing parameters (stack, no alloc) ──

#[derive(Debug, Clone, Copy)]
pub struct PricingParams {
    pub spot: f64,
    pub strike: f64,
    pub ttl_years: f64,
    pub rate: f64,
    pub sigma: f64,
    pub kind: OptionKind,
    // Precomputed
    pub ln_s_k: f64,
    pub sqrt_t: f64,
    pub sigma_sqrt_t: f64,
    pub discount: f64,
}

impl PricingParams {
    #[inline]
    pub fn new(spot: f64, strike: f64, ttl_years: f64, rate: f64, sigma: f64, kind: OptionKind) -> Self {
        let sqrt_t = ttl_years.max(0.0).sqrt();
        Self {
            spot,
            strike,
            ttl_years,
            rate,
            sigma,
            kind,
            ln_s_k: (spot / strike).ln(),
            sqrt_t,
            sigma_sqrt_t: sigma * sqrt_t,
            discount: (-rate * ttl_years).exp(),
        }
    }

    /// Days remaining converted with a 365-day year.
    #[inline]
    pub fn from_days(spot: f64, strike: f64, days: u32, rate: f64, sigma: f64, kind: OptionKind) -> Self {
        Self::new(spot, strike, f64::from(days) / DAYS_PER_YEAR, rate, sigma, kind)
    }
}

pub const DAYS_PER_YEAR: f64 = 365.0;

// ── Model selection ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Five-term rational CDF approximation (reference behaviour).
    Polynomial,
    /// Exact normal CDF via statrs.
    Exact,
}

impl std::str::FromStr for ModelKind {
    type Err = DeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "polynomial" | "bs" | "black-scholes" => Ok(Self::Polynomial),
            "exact" | "erf" => Ok(Self::Exact),
            other => Err(DeskError::Config(format!("unknown PRICING_MODEL: {other}"))),
        }
    }
}

pub fn build_model(kind: ModelKind) -> Box<dyn PricingModel> {
    match kind {
        ModelKind::Polynomial => Box::new(black_scholes::BlackScholes::new()),
        ModelKind::Exact => Box::new(black_scholes::ExactBlackScholes::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parsing() {
        assert_eq!("call".parse::<OptionKind>().unwrap(), OptionKind::Call);
        assert_eq!(" PUT ".parse::<OptionKind>().unwrap(), OptionKind::Put);
        assert!("straddle".parse::<OptionKind>().is_err());
    }

    #[test]
    fn test_kind_serializes_uppercase() {
        let json = serde_json::to_string(&OptionKind::Put).unwrap();
        assert_eq!(json, "\"PUT\"");
    }

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("polynomial".parse::<ModelKind>().unwrap(), ModelKind::Polynomial);
        assert_eq!("Exact".parse::<ModelKind>().unwrap(), ModelKind::Exact);
        assert!("heston".parse::<ModelKind>().is_err());
        assert_eq!(build_model(ModelKind::Exact).name(), "Black-Scholes (exact CDF)");
    }
}
