//! Portfolio revaluation. Everything here is a pure function of its inputs.

use crate::desk::clock::SimulationState;
use crate::desk::registry::Contract;
use crate::models::{OptionKind, PricingModel, PricingParams, Quote};

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Valuation {
    pub contract_id: String,
    #[serde(flatten)]
    pub quote: Quote,
}

/// Value every contract at the current spot and day, in registry order.
pub fn refresh(
    model: &dyn PricingModel,
    contracts: &[Contract],
    sim: &SimulationState,
    risk_free_rate: f64,
) -> Vec<Valuation> {
    contracts
        .iter()
        .map(|contract| {
            let params = PricingParams::from_days(
                sim.spot_price(),
                contract.strike,
                days_remaining(contract, sim.elapsed_days()),
                risk_free_rate,
                contract.volatility,
                contract.kind,
            );
            Valuation {
                contract_id: contract.id.clone(),
                quote: model.quote(&params),
            }
        })
        .collect()
}

#[inline]
pub fn days_remaining(contract: &Contract, elapsed_days: u32) -> u32 {
    contract.expiry_day.saturating_sub(elapsed_days)
}

// ── Position view for the display layer ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Moneyness {
    #[serde(rename = "Deep ITM")]
    DeepItm,
    #[serde(rename = "ITM")]
    Itm,
    #[serde(rename = "ATM")]
    Atm,
    #[serde(rename = "OTM")]
    Otm,
}

/// Within this % of spot counts as at-the-money
const ATM_BAND_PCT: f64 = 2.0;
/// Beyond this % in the money counts as deep
const DEEP_BAND_PCT: f64 = 15.0;

impl Moneyness {
    /// Bucket by strike distance from spot, as % of spot.
    pub fn classify(kind: OptionKind, strike: f64, spot: f64) -> Self {
        let diff = (strike - spot) / spot * 100.0;
        // Calls are in the money below spot, puts above
        let itm_distance = match kind {
            OptionKind::Call => -diff,
            OptionKind::Put => diff,
        };
        if itm_distance > DEEP_BAND_PCT {
            Self::DeepItm
        } else if itm_distance > ATM_BAND_PCT {
            Self::Itm
        } else if diff.abs() <= ATM_BAND_PCT {
            Self::Atm
        } else {
            Self::Otm
        }
    }
}

impl std::fmt::Display for Moneyness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DeepItm => write!(f, "Deep ITM"),
            Self::Itm => write!(f, "ITM"),
            Self::Atm => write!(f, "ATM"),
            Self::Otm => write!(f, "OTM"),
        }
    }
}

/// A contract row as a dashboard would render it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PositionView {
    pub contract: Contract,
    pub valuation: Valuation,
    pub moneyness: Moneyness,
    pub days_remaining: u32,
    pub expired: bool,
    pub pnl_pct: f64,
}

/// P/L against the inception price, in percent. Zero when there is no baseline.
#[inline]
pub fn pnl_pct(inception_price: f64, price: f64) -> f64 {
    if inception_price <= 0.0 {
        return 0.0;
    }
    (price - inception_price) / inception_price * 100.0
}

/// Pair contracts with their valuations. Both slices are in registry order.
pub fn positions(contracts: &[Contract], valuations: &[Valuation], sim: &SimulationState) -> Vec<PositionView> {
    contracts
        .iter()
        .zip(valuations)
        .map(|(contract, valuation)| {
            let remaining = days_remaining(contract, sim.elapsed_days());
            PositionView {
                contract: contract.clone(),
                valuation: valuation.clone(),
                moneyness: Moneyness::classify(contract.kind, contract.strike, sim.spot_price()),
                days_remaining: remaining,
                expired: remaining == 0,
                pnl_pct: pnl_pct(contract.inception_price, valuation.quote.price),
            }
        })
        .collect()
}
