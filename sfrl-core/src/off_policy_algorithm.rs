use crate::{
    Algorithm,
    agents::Agent,
    buffers::{
        replay_pool::{ReplayPool, Transition},
        trajectory::Trajectory,
    },
    distributions::{DeterministicGuard, Distribution},
    env::{Env, SnapShot},
    error::FinetuneError,
    rng, sampler,
};
use candle_core::Tensor;

#[derive(Debug, Clone, Copy)]
pub struct OffPolicyConfig {
    pub min_pool_size: usize,
    pub epoch_length: usize,
    pub n_epochs: usize,
    pub max_path_length: usize,
    pub batch_size: usize,
    pub n_train_repeat: usize,
    pub eval_n_episodes: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct EpochSummary {
    pub epoch: usize,
    pub mean_return: f32,
}

pub trait OffPolicyAlgorithmHooks {
    fn init_hook(&mut self) -> bool;

    fn post_epoch_hook(&mut self, summary: &EpochSummary) -> bool;

    fn shutdown_hook(&mut self) -> Result<(), FinetuneError>;
}

#[derive(Debug, Default)]
pub struct DefaultOffPolicyAlgorithmHooks;

impl OffPolicyAlgorithmHooks for DefaultOffPolicyAlgorithmHooks {
    fn init_hook(&mut self) -> bool {
        false
    }

    fn post_epoch_hook(&mut self, summary: &EpochSummary) -> bool {
        log::info!(
            "epoch: {:<4} mean return: {:.2}",
            summary.epoch,
            summary.mean_return
        );
        false
    }

    fn shutdown_hook(&mut self) -> Result<(), FinetuneError> {
        Ok(())
    }
}

/// The off policy training loop: one environment, one agent, one replay
/// pool, all owned exclusively for the duration of the run. Transitions
/// enter the pool in environment time order; gradient updates start once
/// occupancy reaches `min_pool_size`.
pub struct OffPolicyAlgorithm<E: Env, A: Agent, H: OffPolicyAlgorithmHooks> {
    pub env: E,
    pub agent: A,
    pub pool: ReplayPool,
    pub hooks: H,
    pub config: OffPolicyConfig,
    state: Option<Tensor>,
    path_length: usize,
}

impl<E: Env, A: Agent, H: OffPolicyAlgorithmHooks> OffPolicyAlgorithm<E, A, H> {
    pub fn new(env: E, agent: A, pool: ReplayPool, hooks: H, config: OffPolicyConfig) -> Self {
        Self {
            env,
            agent,
            pool,
            hooks,
            config,
            state: None,
            path_length: 0,
        }
    }

    /// Lazy per epoch summary stream. Finite, pulled one record at a time,
    /// restartable only by rebuilding the algorithm.
    pub fn epochs(&mut self) -> Epochs<'_, E, A, H> {
        Epochs {
            algorithm: self,
            epoch: 0,
        }
    }

    fn environment_step(&mut self) -> Result<(), FinetuneError> {
        let state = match self.state.take() {
            Some(state) => state,
            None => {
                self.path_length = 0;
                self.env
                    .reset(rng::next_seed())
                    .map_err(FinetuneError::EnvExecution)?
            }
        };
        let action = self.agent.distribution().get_action(&state)?;
        let SnapShot {
            state: next_state,
            reward,
            terminated,
            truncated,
        } = self
            .env
            .step(&action)
            .map_err(FinetuneError::EnvExecution)?;
        self.path_length += 1;
        let done = terminated || truncated || self.path_length >= self.config.max_path_length;
        self.pool.add(Transition {
            observation: state,
            action,
            reward,
            next_observation: next_state.clone(),
            terminated,
        });
        self.state = if done { None } else { Some(next_state) };
        Ok(())
    }

    fn train_steps(&mut self) -> Result<(), FinetuneError> {
        if self.pool.len() < self.config.min_pool_size {
            return Ok(());
        }
        for _ in 0..self.config.n_train_repeat {
            let batch = self.pool.sample(self.config.batch_size)?;
            self.agent.train_step(&batch)?;
        }
        Ok(())
    }

    fn evaluate(&mut self) -> Result<f32, FinetuneError> {
        let distribution = self.agent.distribution();
        let _guard = DeterministicGuard::new(distribution);
        let paths = sampler::rollouts(
            distribution,
            &mut self.env,
            self.config.max_path_length,
            self.config.eval_n_episodes,
        )
        .map_err(FinetuneError::EnvExecution)?;
        let mean_return =
            paths.iter().map(Trajectory::total_reward).sum::<f32>() / paths.len() as f32;
        // evaluation consumed the env, the training episode restarts fresh
        self.state = None;
        Ok(mean_return)
    }

    fn run_epoch(&mut self, epoch: usize) -> Result<EpochSummary, FinetuneError> {
        for _ in 0..self.config.epoch_length {
            self.environment_step()?;
            self.train_steps()?;
        }
        let mean_return = self.evaluate()?;
        Ok(EpochSummary { epoch, mean_return })
    }
}

impl<E: Env, A: Agent, H: OffPolicyAlgorithmHooks> Algorithm for OffPolicyAlgorithm<E, A, H> {
    fn train(&mut self) -> Result<(), FinetuneError> {
        if self.hooks.init_hook() {
            return Ok(());
        }
        for epoch in 0..self.config.n_epochs {
            let summary = self.run_epoch(epoch)?;
            if self.hooks.post_epoch_hook(&summary) {
                break;
            }
        }
        self.hooks.shutdown_hook()
    }
}

pub struct Epochs<'a, E: Env, A: Agent, H: OffPolicyAlgorithmHooks> {
    algorithm: &'a mut OffPolicyAlgorithm<E, A, H>,
    epoch: usize,
}

impl<E: Env, A: Agent, H: OffPolicyAlgorithmHooks> Iterator for Epochs<'_, E, A, H> {
    type Item = Result<EpochSummary, FinetuneError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.epoch >= self.algorithm.config.n_epochs {
            return None;
        }
        match self.algorithm.run_epoch(self.epoch) {
            Ok(summary) => {
                self.epoch += 1;
                Some(Ok(summary))
            }
            Err(err) => {
                // a failed epoch ends the stream
                self.epoch = self.algorithm.config.n_epochs;
                Some(Err(err))
            }
        }
    }
}
