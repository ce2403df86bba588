pub mod clock;
pub mod refresh;
pub mod registry;

use crate::config::AppConfig;
use crate::desk::clock::{PriceStep, SimulationState};
use crate::desk::refresh::{PositionView, Valuation};
use crate::desk::registry::{AddContractForm, Contract, ContractRegistry};
use crate::errors::DeskResult;
use crate::models::PricingModel;

/// One simulation instance: clock, book and the latest valuation set.
///
/// Every mutating method finishes with a full refresh before returning, so
/// anyone holding `&Desk` sees valuations that match the spot, day and book.
pub struct Desk {
    model: Box<dyn PricingModel>,
    risk_free_rate: f64,
    initial_spot: f64,
    default_volatility: f64,
    sim: SimulationState,
    registry: ContractRegistry,
    valuations: Vec<Valuation>,
    /// Bumped on every reset; lets late async results be recognised as stale.
    generation: u64,
}

impl Desk {
    pub fn new(config: &AppConfig, model: Box<dyn PricingModel>) -> DeskResult<Self> {
        let sim = SimulationState::new(config.initial_spot)?;
        let registry = ContractRegistry::with_default_book(model.as_ref(), config.risk_free_rate, config.initial_spot);
        let mut desk = Self {
            model,
            risk_free_rate: config.risk_free_rate,
            initial_spot: config.initial_spot,
            default_volatility: config.default_volatility,
            sim,
            registry,
            valuations: Vec::new(),
            generation: 0,
        };
        desk.revalue();
        tracing::info!(
            model = desk.model.name(),
            spot = desk.initial_spot,
            contracts = desk.registry.len(),
            "desk initialised"
        );
        Ok(desk)
    }

    /// Move spot by `percent_change` percent and let one day pass.
    pub fn step(&mut self, percent_change: f64) -> DeskResult<PriceStep> {
        let step = self.sim.step(percent_change)?.clone();
        self.revalue();
        Ok(step)
    }

    /// Validate a form request and add the contract, expiring relative to today.
    pub fn add_contract(&mut self, form: &AddContractForm) -> DeskResult<Contract> {
        let terms = form.validate(self.default_volatility)?;
        let contract = self.registry.add(
            self.model.as_ref(),
            terms,
            self.sim.elapsed_days(),
            self.sim.spot_price(),
        )?;
        self.revalue();
        Ok(contract)
    }

    pub fn remove_contract(&mut self, id: &str) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            self.revalue();
        }
        removed
    }

    /// Restart the clock at the configured spot and reseed the default book.
    ///
    /// Reseeding gives every contract an expiry relative to the new day 0;
    /// keeping the old book would leave absolute expiry days from the previous run.
    pub fn reset(&mut self) -> DeskResult<()> {
        self.sim.reset(self.initial_spot)?;
        self.registry =
            ContractRegistry::with_default_book(self.model.as_ref(), self.risk_free_rate, self.initial_spot);
        self.generation += 1;
        self.revalue();
        tracing::info!(generation = self.generation, "desk reset");
        Ok(())
    }

    #[inline]
    pub fn sim(&self) -> &SimulationState {
        &self.sim
    }

    #[inline]
    pub fn contracts(&self) -> &[Contract] {
        self.registry.list()
    }

    #[inline]
    pub fn valuations(&self) -> &[Valuation] {
        &self.valuations
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn model_name(&self) -> &'static str {
        self.model.name()
    }

    pub fn positions(&self) -> Vec<PositionView> {
        refresh::positions(self.registry.list(), &self.valuations, &self.sim)
    }

    /// Replace the valuation set wholesale.
    fn revalue(&mut self) {
        self.valuations = refresh::refresh(
            self.model.as_ref(),
            self.registry.list(),
            &self.sim,
            self.risk_free_rate,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{build_model, ModelKind, OptionKind};

    fn desk() -> Desk {
        let config = AppConfig::default();
        Desk::new(&config, build_model(ModelKind::Polynomial)).unwrap()
    }

    fn form(strike: &str, days: &str) -> AddContractForm {
        AddContractForm {
            strike: strike.into(),
            days: days.into(),
            kind: OptionKind::Put,
            volatility: None,
        }
    }

    #[test]
    fn test_step_revalues() {
        let mut desk = desk();
        let before = desk.valuations()[0].quote.price;
        let step = desk.step(5.0).unwrap();
        assert_eq!(step.day, 1);
        assert!((desk.sim().spot_price() - 136.5).abs() < 1e-9);
        assert!(desk.valuations()[0].quote.price > before);
        assert_eq!(desk.valuations().len(), desk.contracts().len());
    }

    #[test]
    fn test_rejected_step_changes_nothing() {
        let mut desk = desk();
        let before = desk.valuations().to_vec();
        assert!(desk.step(-100.0).is_err());
        assert_eq!(desk.sim().elapsed_days(), 0);
        assert_eq!(desk.valuations(), before.as_slice());
    }

    #[test]
    fn test_add_contract_mid_run() {
        let mut desk = desk();
        for _ in 0..10 {
            desk.step(0.0).unwrap();
        }
        let c = desk.add_contract(&form("150", "30")).unwrap();
        assert_eq!(c.expiry_day, 40);
        assert_eq!(c.volatility, 0.45);
        assert_eq!(desk.contracts().len(), 13);
        let last = desk.valuations().last().unwrap();
        assert_eq!(last.contract_id, c.id);
        assert_eq!(last.quote.price, c.inception_price);
    }

    #[test]
    fn test_invalid_form_never_reaches_registry() {
        let mut desk = desk();
        assert!(desk.add_contract(&form("abc", "30")).is_err());
        assert!(desk.add_contract(&form("150", "0")).is_err());
        assert_eq!(desk.contracts().len(), 12);
    }

    #[test]
    fn test_remove_drops_valuation_same_cycle() {
        let mut desk = desk();
        assert!(desk.remove_contract("p-atm-7"));
        assert!(desk.valuations().iter().all(|v| v.contract_id != "p-atm-7"));
        assert!(!desk.remove_contract("p-atm-7"));
        assert_eq!(desk.valuations().len(), 11);
    }

    #[test]
    fn test_reset_restores_day_zero_and_book() {
        let mut desk = desk();
        desk.step(5.0).unwrap();
        desk.step(5.0).unwrap();
        desk.remove_contract("c-atm-7");
        desk.add_contract(&form("150", "30")).unwrap();
        desk.reset().unwrap();
        assert_eq!(desk.sim().elapsed_days(), 0);
        assert_eq!(desk.sim().price_history().len(), 1);
        assert_eq!(desk.sim().spot_price(), 130.0);
        assert_eq!(desk.contracts().len(), 12);
        assert_eq!(desk.contracts()[0].id, "c-atm-7");
        assert_eq!(desk.contracts()[0].expiry_day, 7);
        assert_eq!(desk.generation(), 1);
    }
}
