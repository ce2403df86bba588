use crate::errors::{DeskError, DeskResult};
use crate::models::{OptionKind, PricingModel, PricingParams};

/// Floor applied to contract volatility so the model never sees sigma <= 0.
pub const MIN_VOLATILITY: f64 = 1e-4;

/// An option contract on the book. Terms are immutable once created.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Contract {
    pub id: String,
    pub strike: f64,
    pub kind: OptionKind,
    /// Absolute simulation day of expiry, not a duration.
    pub expiry_day: u32,
    pub volatility: f64,
    /// Model price when the contract was created. P/L baseline only.
    pub inception_price: f64,
}

/// Terms for a new contract, already validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContractTerms {
    pub strike: f64,
    pub days_to_expiry: u32,
    pub kind: OptionKind,
    pub volatility: f64,
}

/// Add request as it arrives from a form: numbers still as text.
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
pub struct AddContractForm {
    pub strike: String,
    pub days: String,
    pub kind: OptionKind,
    #[serde(default)]
    pub volatility: Option<f64>,
}

impl AddContractForm {
    /// Parse and validate. Nothing reaches the registry unless this succeeds.
    pub fn validate(&self, default_volatility: f64) -> DeskResult<ContractTerms> {
        let strike = self
            .strike
            .trim()
            .parse::<f64>()
            .map_err(|_| DeskError::InvalidInput(format!("strike is not a number: {:?}", self.strike)))?;
        if !strike.is_finite() || strike <= 0.0 {
            return Err(DeskError::InvalidInput(format!("strike must be positive, got {strike}")));
        }

        let days = self
            .days
            .trim()
            .parse::<i64>()
            .map_err(|_| DeskError::InvalidInput(format!("days is not an integer: {:?}", self.days)))?;
        if days <= 0 {
            return Err(DeskError::InvalidInput(format!("days must be positive, got {days}")));
        }
        let days_to_expiry = u32::try_from(days)
            .map_err(|_| DeskError::InvalidInput(format!("days out of range: {days}")))?;

        Ok(ContractTerms {
            strike,
            days_to_expiry,
            kind: self.kind,
            volatility: self.volatility.unwrap_or(default_volatility),
        })
    }
}

/// Active contracts in insertion order.
#[derive(Debug, Default)]
pub struct ContractRegistry {
    contracts: Vec<Contract>,
    risk_free_rate: f64,
}

impl ContractRegistry {
    pub fn new(risk_free_rate: f64) -> Self {
        Self {
            contracts: Vec::new(),
            risk_free_rate,
        }
    }

    /// Fresh registry holding the default book, inception-priced on day 0.
    pub fn with_default_book(model: &dyn PricingModel, risk_free_rate: f64, spot: f64) -> Self {
        let mut registry = Self::new(risk_free_rate);
        for seed in DEFAULT_BOOK {
            let terms = ContractTerms {
                strike: seed.strike,
                days_to_expiry: seed.days,
                kind: seed.kind,
                volatility: seed.volatility,
            };
            let contract = registry.price_new(model, seed.id.to_string(), terms, 0, spot);
            registry.contracts.push(contract);
        }
        registry
    }

    /// Create, price and insert a contract expiring `days_to_expiry` days after `current_day`.
    pub fn add(
        &mut self,
        model: &dyn PricingModel,
        terms: ContractTerms,
        current_day: u32,
        current_spot: f64,
    ) -> DeskResult<Contract> {
        if !terms.strike.is_finite() || terms.strike <= 0.0 {
            return Err(DeskError::InvalidInput(format!("strike must be positive, got {}", terms.strike)));
        }
        if !current_spot.is_finite() || current_spot <= 0.0 {
            return Err(DeskError::InvalidInput(format!("spot must be positive, got {current_spot}")));
        }
        current_day.checked_add(terms.days_to_expiry).ok_or_else(|| {
            DeskError::InvalidInput(format!("expiry overflows: day {current_day} + {}", terms.days_to_expiry))
        })?;

        let id = format!("custom-{}", uuid::Uuid::new_v4().simple());
        let contract = self.price_new(model, id, terms, current_day, current_spot);

        tracing::info!(
            id = %contract.id,
            strike = contract.strike,
            kind = %contract.kind,
            expiry_day = contract.expiry_day,
            inception_price = contract.inception_price,
            "contract added"
        );

        self.contracts.push(contract.clone());
        Ok(contract)
    }

    /// Drop a contract. Unknown ids are ignored.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.contracts.len();
        self.contracts.retain(|c| c.id != id);
        let removed = self.contracts.len() != before;
        if removed {
            tracing::info!(id, "contract removed");
        } else {
            tracing::debug!(id, "remove ignored, unknown contract");
        }
        removed
    }

    #[inline]
    pub fn list(&self) -> &[Contract] {
        &self.contracts
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contracts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty()
    }

    fn price_new(
        &self,
        model: &dyn PricingModel,
        id: String,
        terms: ContractTerms,
        current_day: u32,
        current_spot: f64,
    ) -> Contract {
        // f64::max also maps NaN to the floor
        let volatility = terms.volatility.max(MIN_VOLATILITY);
        let params = PricingParams::from_days(
            current_spot,
            terms.strike,
            terms.days_to_expiry,
            self.risk_free_rate,
            volatility,
            terms.kind,
        );
        Contract {
            id,
            strike: terms.strike,
            kind: terms.kind,
            expiry_day: current_day.saturating_add(terms.days_to_expiry),
            volatility,
            inception_price: model.quote(&params).price,
        }
    }
}

// ── Default book ──

struct SeedContract {
    id: &'static str,
    strike: f64,
    kind: OptionKind,
    days: u32,
    volatility: f64,
}

const DEFAULT_BOOK: [SeedContract; 12] = [
    // 1 week
    SeedContract { id: "c-atm-7", strike: 130.0, kind: OptionKind::Call, days: 7, volatility: 0.50 },
    SeedContract { id: "p-atm-7", strike: 130.0, kind: OptionKind::Put, days: 7, volatility: 0.50 },
    // 1 month
    SeedContract { id: "c-itm-30", strike: 110.0, kind: OptionKind::Call, days: 30, volatility: 0.45 },
    SeedContract { id: "c-atm-30", strike: 130.0, kind: OptionKind::Call, days: 30, volatility: 0.45 },
    SeedContract { id: "c-otm-30", strike: 150.0, kind: OptionKind::Call, days: 30, volatility: 0.45 },
    SeedContract { id: "p-itm-30", strike: 150.0, kind: OptionKind::Put, days: 30, volatility: 0.45 },
    SeedContract { id: "p-atm-30", strike: 130.0, kind: OptionKind::Put, days: 30, volatility: 0.45 },
    SeedContract { id: "p-otm-30", strike: 110.0, kind: OptionKind::Put, days: 30, volatility: 0.45 },
    // ~6 months
    SeedContract { id: "c-itm-180", strike: 100.0, kind: OptionKind::Call, days: 180, volatility: 0.38 },
    SeedContract { id: "c-atm-180", strike: 130.0, kind: OptionKind::Call, days: 180, volatility: 0.38 },
    SeedContract { id: "c-otm-180", strike: 160.0, kind: OptionKind::Call, days: 180, volatility: 0.38 },
    SeedContract { id: "p-atm-180", strike: 130.0, kind: OptionKind::Put, days: 180, volatility: 0.38 },
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::black_scholes::{price, BlackScholes};

    const R: f64 = 0.045;

    fn put_terms() -> ContractTerms {
        ContractTerms { strike: 150.0, days_to_expiry: 30, kind: OptionKind::Put, volatility: 0.45 }
    }

    #[test]
    fn test_expiry_anchored_to_creation_day() {
        let model = BlackScholes::new();
        let mut reg = ContractRegistry::new(R);
        let c = reg.add(&model, put_terms(), 10, 125.0).unwrap();
        assert_eq!(c.expiry_day, 40);

        let expected = price(125.0, 150.0, 30.0 / 365.0, R, 0.45, OptionKind::Put).price;
        assert_eq!(c.inception_price, expected);
    }

    #[test]
    fn test_insertion_order_and_unique_ids() {
        let model = BlackScholes::new();
        let mut reg = ContractRegistry::new(R);
        let a = reg.add(&model, put_terms(), 0, 130.0).unwrap();
        let b = reg.add(&model, put_terms(), 1, 131.0).unwrap();
        let c = reg.add(&model, put_terms(), 2, 132.0).unwrap();
        let ids: Vec<_> = reg.list().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![a.id.as_str(), b.id.as_str(), c.id.as_str()]);
        assert_ne!(a.id, b.id);
        assert_ne!(b.id, c.id);
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let model = BlackScholes::new();
        let mut reg = ContractRegistry::new(R);
        let a = reg.add(&model, put_terms(), 0, 130.0).unwrap();
        assert!(!reg.remove("nope"));
        assert_eq!(reg.len(), 1);
        assert!(reg.remove(&a.id));
        assert!(reg.is_empty());
        assert!(!reg.remove(&a.id));
    }

    #[test]
    fn test_volatility_floor() {
        let model = BlackScholes::new();
        let mut reg = ContractRegistry::new(R);
        let mut terms = put_terms();
        terms.volatility = 0.0;
        let c = reg.add(&model, terms, 0, 130.0).unwrap();
        assert_eq!(c.volatility, MIN_VOLATILITY);
        assert!(c.inception_price.is_finite());

        terms.volatility = f64::NAN;
        let c = reg.add(&model, terms, 0, 130.0).unwrap();
        assert_eq!(c.volatility, MIN_VOLATILITY);
    }

    #[test]
    fn test_rejects_bad_strike_and_spot() {
        let model = BlackScholes::new();
        let mut reg = ContractRegistry::new(R);
        let mut terms = put_terms();
        terms.strike = 0.0;
        assert!(reg.add(&model, terms, 0, 130.0).is_err());
        assert!(reg.add(&model, put_terms(), 0, -1.0).is_err());
        assert!(reg.is_empty());
    }

    #[test]
    fn test_default_book() {
        let model = BlackScholes::new();
        let reg = ContractRegistry::with_default_book(&model, R, 130.0);
        assert_eq!(reg.len(), 12);
        assert_eq!(reg.list()[0].id, "c-atm-7");
        assert_eq!(reg.list()[11].id, "p-atm-180");

        let atm = &reg.list()[0];
        assert_eq!(atm.expiry_day, 7);
        assert!((atm.inception_price - 3.6452).abs() < 1e-2);
        assert!(reg.list().iter().all(|c| c.inception_price > 0.0));
    }

    #[test]
    fn test_form_validation() {
        let form = AddContractForm {
            strike: "150".into(),
            days: " 30 ".into(),
            kind: OptionKind::Put,
            volatility: None,
        };
        let terms = form.validate(0.45).unwrap();
        assert_eq!(terms.strike, 150.0);
        assert_eq!(terms.days_to_expiry, 30);
        assert_eq!(terms.volatility, 0.45);

        for (strike, days) in [("abc", "30"), ("-5", "30"), ("0", "30"), ("150", "0"), ("150", "-3"), ("150", "x"), ("inf", "30")] {
            let bad = AddContractForm { strike: strike.into(), days: days.into(), ..form.clone() };
            assert!(
                matches!(bad.validate(0.45), Err(DeskError::InvalidInput(_))),
                "strike={strike} days={days} should be rejected"
            );
        }
    }
}
