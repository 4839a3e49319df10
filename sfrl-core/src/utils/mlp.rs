use candle_core::{Result, Tensor};
use candle_nn::{Activation, Linear, Module, VarBuilder, linear};
use either::Either;

#[derive(Debug, Clone, Default)]
pub struct Mlp {
    layers: Vec<Either<Linear, Activation>>,
}

impl Module for Mlp {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = match layer {
                Either::Left(linear) => linear.forward(&xs)?,
                Either::Right(activation) => activation.forward(&xs)?,
            };
        }
        Ok(xs)
    }
}

pub fn build_mlp(input_dim: usize, layers: &[usize], vb: &VarBuilder, prefix: &str) -> Result<Mlp> {
    let mut last_dim = input_dim;
    let mut nn = Mlp::default();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}{layer_idx}");
        nn.layers
            .push(Either::Left(linear(last_dim, *layer_size, vb.pp(layer_pp))?));
        if layer_idx != num_layers - 1 {
            nn.layers.push(Either::Right(Activation::Relu));
        }
        last_dim = *layer_size;
    }
    Ok(nn)
}
