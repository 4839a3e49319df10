use super::Distribution;
use crate::utils::mlp::{Mlp, build_mlp};
use candle_core::{Result, Tensor};
use candle_nn::{Module, VarBuilder};
use std::cell::Cell;
use std::f32;

// Keeps atanh and the squash correction away from the asymptotes.
const SQUASH_EPS: f32 = 1e-6;

/// Diagonal gaussian squashed through tanh, the usual soft actor-critic
/// policy head. Deterministic mode takes tanh of the mean.
#[derive(Debug, Clone)]
pub struct SquashedDiagGaussianDistribution {
    observation_size: usize,
    action_size: usize,
    mu_net: Mlp,
    log_std: Tensor,
    deterministic: Cell<bool>,
}

impl SquashedDiagGaussianDistribution {
    pub fn build(
        observation_size: usize,
        action_size: usize,
        hidden_layers: &[usize],
        vb: &VarBuilder,
        prefix: &str,
    ) -> Result<Self> {
        let layers = [hidden_layers, &[action_size]].concat();
        let mu_net = build_mlp(observation_size, &layers, vb, prefix)?;
        let log_std = vb.get(action_size, "log_std")?;
        Ok(Self {
            observation_size,
            action_size,
            mu_net,
            log_std,
            deterministic: Cell::new(false),
        })
    }

    fn gaussian_log_probs(&self, mu: &Tensor, samples: &Tensor) -> Result<Tensor> {
        let std = self.log_std.exp()?.broadcast_as(mu.shape())?;
        let var = std.sqr()?;
        let log_sqrt_2pi = f32::ln(f32::sqrt(2f32 * f32::consts::PI));
        let log_sqrt_2pi = Tensor::full(log_sqrt_2pi, mu.shape(), mu.device())?;
        let log_probs = ((((samples - mu)?.sqr()? / (2. * var)?)?.neg()?
            - self.log_std.broadcast_as(mu.shape())?)?
            - log_sqrt_2pi)?;
        log_probs.sum(1)
    }

    // log det of the tanh jacobian, summed over the action dimension
    fn squash_correction(&self, actions: &Tensor) -> Result<Tensor> {
        actions
            .sqr()?
            .affine(-1., 1. + SQUASH_EPS as f64)?
            .log()?
            .sum(1)
    }
}

fn atanh(actions: &Tensor) -> Result<Tensor> {
    let clamped = actions.clamp(-1. + SQUASH_EPS, 1. - SQUASH_EPS)?;
    let num = clamped.affine(1., 1.)?;
    let den = clamped.affine(-1., 1.)?;
    num.div(&den)?.log()? * 0.5
}

impl Distribution for SquashedDiagGaussianDistribution {
    fn get_action(&self, observation: &Tensor) -> Result<Tensor> {
        assert!(
            observation.rank() == 1,
            "Observation should be a flattened tensor"
        );
        let mu = self.mu_net.forward(&observation.unsqueeze(0)?)?;
        let pre_squash = if self.deterministic.get() {
            mu
        } else {
            let std = self.log_std.exp()?.unsqueeze(0)?;
            let noise = Tensor::randn(0f32, 1., self.log_std.shape(), self.log_std.device())?;
            (mu + std.mul(&noise.unsqueeze(0)?)?)?
        };
        Ok(pre_squash.tanh()?.squeeze(0)?.detach())
    }

    fn sample_with_log_prob(&self, states: &Tensor) -> Result<(Tensor, Tensor)> {
        let mu = self.mu_net.forward(states)?;
        let pre_squash = if self.deterministic.get() {
            mu.clone()
        } else {
            let std = self.log_std.exp()?.broadcast_as(mu.shape())?;
            let noise = Tensor::randn(0f32, 1., mu.shape(), mu.device())?;
            (&mu + std.mul(&noise)?)?
        };
        let actions = pre_squash.tanh()?;
        let log_probs =
            (self.gaussian_log_probs(&mu, &pre_squash)? - self.squash_correction(&actions)?)?;
        Ok((actions, log_probs))
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let mu = self.mu_net.forward(states)?;
        let pre_squash = atanh(actions)?;
        self.gaussian_log_probs(&mu, &pre_squash)? - self.squash_correction(actions)?
    }

    fn entropy(&self) -> Result<Tensor> {
        // entropy of the base gaussian, the squashed density has no closed form
        let log_2pi_plus_1_div_2 = Tensor::full(
            0.5 * ((2. * f32::consts::PI).ln() + 1.),
            self.log_std.shape(),
            self.log_std.device(),
        )?;
        log_2pi_plus_1_div_2.add(&self.log_std)?.sum_all()
    }

    fn std(&self) -> Result<f32> {
        self.log_std.exp()?.mean_all()?.to_scalar::<f32>()
    }

    fn observation_size(&self) -> usize {
        self.observation_size
    }

    fn action_size(&self) -> usize {
        self.action_size
    }

    fn set_deterministic(&self, deterministic: bool) -> bool {
        self.deterministic.replace(deterministic)
    }
}
