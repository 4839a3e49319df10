use crate::utils::mlp::{Mlp, build_mlp};
use candle_core::{Result, Tensor};
use candle_nn::{Module, VarBuilder};

/// State value approximator, observation in, scalar out.
#[derive(Debug, Clone)]
pub struct VFunction {
    net: Mlp,
}

impl VFunction {
    pub fn build(
        observation_size: usize,
        hidden_layers: &[usize],
        vb: &VarBuilder,
        prefix: &str,
    ) -> Result<Self> {
        let layers = [hidden_layers, &[1]].concat();
        Ok(Self {
            net: build_mlp(observation_size, &layers, vb, prefix)?,
        })
    }

    pub fn values(&self, observations: &Tensor) -> Result<Tensor> {
        self.net.forward(observations)?.squeeze(1)
    }
}

/// Action value approximator over concatenated observation and action.
#[derive(Debug, Clone)]
pub struct QFunction {
    net: Mlp,
}

impl QFunction {
    pub fn build(
        observation_size: usize,
        action_size: usize,
        hidden_layers: &[usize],
        vb: &VarBuilder,
        prefix: &str,
    ) -> Result<Self> {
        let layers = [hidden_layers, &[1]].concat();
        Ok(Self {
            net: build_mlp(observation_size + action_size, &layers, vb, prefix)?,
        })
    }

    pub fn values(&self, observations: &Tensor, actions: &Tensor) -> Result<Tensor> {
        let inputs = Tensor::cat(&[observations, actions], 1)?;
        self.net.forward(&inputs)?.squeeze(1)
    }
}
