use crate::buffers::replay_pool::TransitionBatch;
use crate::distributions::Distribution;
use candle_core::Result;

pub trait Agent {
    type Dist: Distribution;

    /// Retrieves the distribution actions are drawn from
    fn distribution(&self) -> &Self::Dist;

    /// Runs one gradient update on a sampled batch of transitions
    fn train_step(&mut self, batch: &TransitionBatch) -> Result<()>;
}
