use candle_core::{DType, Device, Result, Tensor};
use sfrl_core::Algorithm;
use sfrl_core::agents::Agent;
use sfrl_core::buffers::replay_pool::{ReplayPool, TransitionBatch};
use sfrl_core::distributions::Distribution;
use sfrl_core::env::{Env, EnvironmentDescription, SnapShot, Space};
use sfrl_core::error::FinetuneError;
use sfrl_core::off_policy_algorithm::{
    EpochSummary, OffPolicyAlgorithm, OffPolicyAlgorithmHooks, OffPolicyConfig,
};
use std::cell::Cell;

struct ConstPolicy {
    observation_size: usize,
    action_size: usize,
    deterministic: Cell<bool>,
    device: Device,
}

impl ConstPolicy {
    fn new(observation_size: usize, action_size: usize) -> Self {
        Self {
            observation_size,
            action_size,
            deterministic: Cell::new(false),
            device: Device::Cpu,
        }
    }
}

impl Distribution for ConstPolicy {
    fn get_action(&self, _observation: &Tensor) -> Result<Tensor> {
        Tensor::zeros(self.action_size, DType::F32, &self.device)
    }

    fn sample_with_log_prob(&self, states: &Tensor) -> Result<(Tensor, Tensor)> {
        let (batch, _) = states.dims2()?;
        Ok((
            Tensor::zeros((batch, self.action_size), DType::F32, &self.device)?,
            Tensor::zeros(batch, DType::F32, &self.device)?,
        ))
    }

    fn log_probs(&self, states: &Tensor, _actions: &Tensor) -> Result<Tensor> {
        let (batch, _) = states.dims2()?;
        Tensor::zeros(batch, DType::F32, &self.device)
    }

    fn entropy(&self) -> Result<Tensor> {
        Tensor::zeros(1, DType::F32, &self.device)
    }

    fn std(&self) -> Result<f32> {
        Ok(0.)
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

struct CountingAgent {
    policy: ConstPolicy,
    train_calls: usize,
}

impl Agent for CountingAgent {
    type Dist = ConstPolicy;

    fn distribution(&self) -> &Self::Dist {
        &self.policy
    }

    fn train_step(&mut self, batch: &TransitionBatch) -> Result<()> {
        assert_eq!(batch.observations.dims()[0], batch.actions.dims()[0]);
        self.train_calls += 1;
        Ok(())
    }
}

/// Never terminates on its own, pays one unit of reward per step.
struct UnitRewardEnv {
    observation_size: usize,
    device: Device,
}

impl Env for UnitRewardEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        Tensor::zeros(self.observation_size, DType::F32, &self.device)
    }

    fn step(&mut self, _action: &Tensor) -> Result<SnapShot> {
        Ok(SnapShot {
            state: Tensor::zeros(self.observation_size, DType::F32, &self.device)?,
            reward: 1.,
            terminated: false,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continuous_from_dims(vec![self.observation_size]),
            Space::continuous_from_dims(vec![2]),
        )
    }
}

struct CountingHooks {
    epochs_seen: Vec<usize>,
}

impl OffPolicyAlgorithmHooks for CountingHooks {
    fn init_hook(&mut self) -> bool {
        false
    }

    fn post_epoch_hook(&mut self, summary: &EpochSummary) -> bool {
        self.epochs_seen.push(summary.epoch);
        false
    }

    fn shutdown_hook(&mut self) -> std::result::Result<(), FinetuneError> {
        Ok(())
    }
}

fn algorithm(
    config: OffPolicyConfig,
) -> OffPolicyAlgorithm<UnitRewardEnv, CountingAgent, CountingHooks> {
    let env = UnitRewardEnv {
        observation_size: 3,
        device: Device::Cpu,
    };
    let agent = CountingAgent {
        policy: ConstPolicy::new(3, 2),
        train_calls: 0,
    };
    let pool = ReplayPool::new(3, 2, 64);
    let hooks = CountingHooks {
        epochs_seen: Vec::new(),
    };
    OffPolicyAlgorithm::new(env, agent, pool, hooks, config)
}

#[test]
fn training_waits_for_the_minimum_pool_size() {
    let config = OffPolicyConfig {
        min_pool_size: 10,
        epoch_length: 5,
        n_epochs: 3,
        max_path_length: 4,
        batch_size: 2,
        n_train_repeat: 1,
        eval_n_episodes: 1,
    };
    let mut algorithm = algorithm(config);
    let summaries: Vec<_> = algorithm
        .epochs()
        .collect::<std::result::Result<Vec<_>, FinetuneError>>()
        .unwrap();
    assert_eq!(summaries.len(), 3);
    // pool sizes 1..5 in the first epoch stay under the gate, the update
    // count only starts moving once occupancy hits 10
    assert_eq!(algorithm.agent.train_calls, 6);
    assert_eq!(algorithm.pool.len(), 15);
}

#[test]
fn epochs_stream_is_finite_and_ascending() {
    let config = OffPolicyConfig {
        min_pool_size: 1,
        epoch_length: 2,
        n_epochs: 4,
        max_path_length: 3,
        batch_size: 2,
        n_train_repeat: 2,
        eval_n_episodes: 2,
    };
    let mut algorithm = algorithm(config);
    let summaries: Vec<_> = algorithm
        .epochs()
        .collect::<std::result::Result<Vec<_>, FinetuneError>>()
        .unwrap();
    let epochs: Vec<usize> = summaries.iter().map(|s| s.epoch).collect();
    assert_eq!(epochs, vec![0, 1, 2, 3]);
    // every step past the gate triggers n_train_repeat updates
    assert_eq!(algorithm.agent.train_calls, 2 * 2 * 4);
    // deterministic evaluation episodes run the full path length
    assert!(summaries.iter().all(|s| s.mean_return == 3.));
}

#[test]
fn train_drains_the_same_epochs_through_hooks() {
    let config = OffPolicyConfig {
        min_pool_size: 1,
        epoch_length: 2,
        n_epochs: 3,
        max_path_length: 2,
        batch_size: 1,
        n_train_repeat: 1,
        eval_n_episodes: 1,
    };
    let mut algorithm = algorithm(config);
    algorithm.train().unwrap();
    assert_eq!(algorithm.hooks.epochs_seen, vec![0, 1, 2]);
}
