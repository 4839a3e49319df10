pub mod diag_gaussian;
pub mod squashed_diag_gaussian;

use candle_core::{Result, Tensor};
use diag_gaussian::DiagGaussianDistribution;
use enum_dispatch::enum_dispatch;
use squashed_diag_gaussian::SquashedDiagGaussianDistribution;

#[enum_dispatch]
pub trait Distribution {
    /// Draws an action for a single flattened observation.
    fn get_action(&self, observation: &Tensor) -> Result<Tensor>;

    /// Reparameterized batch sample together with its log probabilities.
    fn sample_with_log_prob(&self, states: &Tensor) -> Result<(Tensor, Tensor)>;

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor>;

    fn entropy(&self) -> Result<Tensor>;

    fn std(&self) -> Result<f32>;

    fn observation_size(&self) -> usize;

    fn action_size(&self) -> usize;

    /// Switches stochastic sampling off or back on, returning the previous
    /// mode so callers can restore it.
    fn set_deterministic(&self, deterministic: bool) -> bool;
}

#[enum_dispatch(Distribution)]
pub enum DistributionKind {
    DiagGaussian(DiagGaussianDistribution),
    SquashedDiagGaussian(SquashedDiagGaussianDistribution),
}

/// Scoped deterministic mode: sampling is switched off on construction and
/// the previous mode comes back on every exit path, early returns and
/// panics included.
pub struct DeterministicGuard<'a, D: Distribution> {
    distribution: &'a D,
    prev: bool,
}

impl<'a, D: Distribution> DeterministicGuard<'a, D> {
    pub fn new(distribution: &'a D) -> Self {
        let prev = distribution.set_deterministic(true);
        Self { distribution, prev }
    }
}

impl<D: Distribution> Drop for DeterministicGuard<'_, D> {
    fn drop(&mut self) {
        self.distribution.set_deterministic(self.prev);
    }
}
