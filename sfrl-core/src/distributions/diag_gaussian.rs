use super::Distribution;
use crate::utils::mlp::{Mlp, build_mlp};
use candle_core::{Result, Tensor};
use candle_nn::{Module, VarBuilder};
use std::cell::Cell;
use std::f32;

#[derive(Debug, Clone)]
pub struct DiagGaussianDistribution {
    observation_size: usize,
    action_size: usize,
    mu_net: Mlp,
    log_std: Tensor,
    deterministic: Cell<bool>,
}

impl DiagGaussianDistribution {
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
}

impl Distribution for DiagGaussianDistribution {
    fn get_action(&self, observation: &Tensor) -> Result<Tensor> {
        assert!(
            observation.rank() == 1,
            "Observation should be a flattened tensor"
        );
        let mu = self.mu_net.forward(&observation.unsqueeze(0)?)?;
        if self.deterministic.get() {
            return Ok(mu.squeeze(0)?.detach());
        }
        let std = self.log_std.exp()?.unsqueeze(0)?;
        let noise = Tensor::randn(0f32, 1., self.log_std.shape(), self.log_std.device())?;
        let action = (mu + std.mul(&noise.unsqueeze(0)?)?)?.squeeze(0)?.detach();
        Ok(action)
    }

    fn sample_with_log_prob(&self, states: &Tensor) -> Result<(Tensor, Tensor)> {
        let mu = self.mu_net.forward(states)?;
        let samples = if self.deterministic.get() {
            mu.clone()
        } else {
            let std = self.log_std.exp()?.broadcast_as(mu.shape())?;
            let noise = Tensor::randn(0f32, 1., mu.shape(), mu.device())?;
            (&mu + std.mul(&noise)?)?
        };
        let log_probs = self.gaussian_log_probs(&mu, &samples)?;
        Ok((samples, log_probs))
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let mu = self.mu_net.forward(states)?;
        self.gaussian_log_probs(&mu, actions)
    }

    fn entropy(&self) -> Result<Tensor> {
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
