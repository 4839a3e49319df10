pub mod mlp;
pub mod optimizer;

use candle_core::{Device, Result, Tensor};

pub fn one_hot(num_classes: usize, index: usize, device: &Device) -> Result<Tensor> {
    debug_assert!(index < num_classes);
    let mut encoding = vec![0f32; num_classes];
    encoding[index] = 1.0;
    Tensor::from_vec(encoding, num_classes, device)
}
