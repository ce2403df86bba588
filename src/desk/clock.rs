use crate::errors::{DeskError, DeskResult};

/// One day on the simulated price path.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct PriceStep {
    pub day: u32,
    pub price: f64,
    pub percent_change: f64,
    /// Wall-clock date the step was taken. Display only.
    pub date: String,
}

/// Named moves offered to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepCommand {
    Up,
    Down,
    Hold,
    Rally,
    Selloff,
}

impl StepCommand {
    #[inline]
    pub fn percent_change(self) -> f64 {
        match self {
            Self::Up => 1.0,
            Self::Down => -1.0,
            Self::Hold => 0.0,
            Self::Rally => 5.0,
            Self::Selloff => -5.0,
        }
    }
}

/// Spot, day counter and the append-only price path.
///
/// Fields are private: the only mutations are `step` and `reset`, so the
/// day counter, spot and last history entry always agree.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SimulationState {
    spot_price: f64,
    elapsed_days: u32,
    price_history: Vec<PriceStep>,
}

impl SimulationState {
    pub fn new(initial_spot: f64) -> DeskResult<Self> {
        validate_spot(initial_spot)?;
        Ok(Self {
            spot_price: initial_spot,
            elapsed_days: 0,
            price_history: vec![PriceStep {
                day: 0,
                price: initial_spot,
                percent_change: 0.0,
                date: today(),
            }],
        })
    }

    /// Advance one day, moving spot by `percent_change` percent.
    /// A zero move lets a day pass with the price unchanged.
    pub fn step(&mut self, percent_change: f64) -> DeskResult<&PriceStep> {
        if !percent_change.is_finite() {
            return Err(DeskError::InvalidInput(format!("percent change must be finite, got {percent_change}")));
        }
        let next_spot = self.spot_price * (1.0 + percent_change / 100.0);
        validate_spot(next_spot)?;
        let next_day = self
            .elapsed_days
            .checked_add(1)
            .ok_or_else(|| DeskError::InvalidInput("day counter exhausted".into()))?;

        // All checks done; from here the three updates land together
        self.spot_price = next_spot;
        self.elapsed_days = next_day;
        self.price_history.push(PriceStep {
            day: next_day,
            price: next_spot,
            percent_change,
            date: today(),
        });

        tracing::debug!(day = next_day, spot = next_spot, percent_change, "stepped");
        Ok(self.latest())
    }

    /// Restart the path at day 0. Contracts are not touched here.
    pub fn reset(&mut self, initial_spot: f64) -> DeskResult<()> {
        *self = Self::new(initial_spot)?;
        Ok(())
    }

    #[inline]
    pub fn spot_price(&self) -> f64 {
        self.spot_price
    }

    #[inline]
    pub fn elapsed_days(&self) -> u32 {
        self.elapsed_days
    }

    #[inline]
    pub fn price_history(&self) -> &[PriceStep] {
        &self.price_history
    }

    #[inline]
    pub fn latest(&self) -> &PriceStep {
        // History is never empty: constructed with the day-0 record
        &self.price_history[self.price_history.len() - 1]
    }

    /// Percent moves of the last `n` history records, oldest first.
    pub fn recent_moves(&self, n: usize) -> impl Iterator<Item = f64> + '_ {
        let start = self.price_history.len().saturating_sub(n);
        self.price_history[start..].iter().map(|s| s.percent_change)
    }
}

fn validate_spot(spot: f64) -> DeskResult<()> {
    if spot.is_finite() && spot > 0.0 {
        Ok(())
    } else {
        Err(DeskError::InvalidInput(format!("spot must stay positive, got {spot}")))
    }
}

fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_rallies() {
        let mut sim = SimulationState::new(100.0).unwrap();
        for _ in 0..3 {
            sim.step(5.0).unwrap();
        }
        assert!((sim.spot_price() - 115.7625).abs() < 1e-9);
        assert_eq!(sim.elapsed_days(), 3);
        assert_eq!(sim.price_history().len(), 4);
        let days: Vec<u32> = sim.price_history().iter().map(|s| s.day).collect();
        assert_eq!(days, vec![0, 1, 2, 3]);
        assert_eq!(sim.latest().percent_change, 5.0);
    }

    #[test]
    fn test_hold_advances_time_only() {
        let mut sim = SimulationState::new(130.0).unwrap();
        let step = sim.step(StepCommand::Hold.percent_change()).unwrap().clone();
        assert_eq!(step.day, 1);
        assert_eq!(step.price, 130.0);
        assert_eq!(sim.spot_price(), 130.0);
    }

    #[test]
    fn test_history_is_append_only() {
        let mut sim = SimulationState::new(130.0).unwrap();
        sim.step(1.0).unwrap();
        let first_two = sim.price_history().to_vec();
        sim.step(-1.0).unwrap();
        sim.step(5.0).unwrap();
        assert_eq!(&sim.price_history()[..2], first_two.as_slice());
        assert_eq!(sim.price_history()[0].percent_change, 0.0);
        assert_eq!(sim.price_history()[0].price, 130.0);
    }

    #[test]
    fn test_rejected_step_leaves_state_untouched() {
        let mut sim = SimulationState::new(130.0).unwrap();
        sim.step(2.0).unwrap();
        for bad in [-100.0, -150.0, f64::NAN, f64::INFINITY] {
            assert!(sim.step(bad).is_err());
        }
        assert_eq!(sim.elapsed_days(), 1);
        assert_eq!(sim.price_history().len(), 2);
        assert!((sim.spot_price() - 132.6).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut sim = SimulationState::new(130.0).unwrap();
        sim.step(5.0).unwrap();
        sim.step(-5.0).unwrap();
        sim.reset(90.0).unwrap();
        assert_eq!(sim.elapsed_days(), 0);
        assert_eq!(sim.spot_price(), 90.0);
        assert_eq!(sim.price_history().len(), 1);
        assert_eq!(sim.price_history()[0].day, 0);
        assert!(sim.reset(0.0).is_err());
        assert_eq!(sim.spot_price(), 90.0);
    }

    #[test]
    fn test_recent_moves() {
        let mut sim = SimulationState::new(130.0).unwrap();
        assert_eq!(sim.recent_moves(5).collect::<Vec<_>>(), vec![0.0]);
        for pct in [1.0, -1.0, 5.0, 0.0, -5.0, 1.0] {
            sim.step(pct).unwrap();
        }
        assert_eq!(sim.recent_moves(5).collect::<Vec<_>>(), vec![-1.0, 5.0, 0.0, -5.0, 1.0]);
    }

    #[test]
    fn test_command_parsing() {
        let cmd: StepCommand = serde_json::from_str("\"selloff\"").unwrap();
        assert_eq!(cmd.percent_change(), -5.0);
    }
}
