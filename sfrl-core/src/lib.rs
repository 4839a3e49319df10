pub mod agents;
pub mod buffers;
pub mod distributions;
pub mod env;
pub mod error;
pub mod off_policy_algorithm;
pub mod rng;
pub mod sampler;
pub mod skills;
pub mod snapshot;
pub mod tensors;
pub mod utils;
pub mod value_functions;

use crate::error::FinetuneError;

pub trait Algorithm {
    fn train(&mut self) -> Result<(), FinetuneError>;
}
