use candle_core::{Device, Result, Tensor};
use sfrl_core::distributions::{DeterministicGuard, Distribution};
use sfrl_core::env::{Env, EnvironmentDescription, FixedSkillEnv, SnapShot, Space};
use sfrl_core::error::FinetuneError;
use sfrl_core::skills::{derive_num_skills, evaluate_skills, select_best_skill};
use std::cell::Cell;

/// Echoes the one hot skill tail of its observation back as the action.
struct SkillEchoPolicy {
    observation_size: usize,
    num_skills: usize,
    deterministic: Cell<bool>,
}

impl SkillEchoPolicy {
    fn new(observation_size: usize, num_skills: usize) -> Self {
        Self {
            observation_size,
            num_skills,
            deterministic: Cell::new(false),
        }
    }
}

impl Distribution for SkillEchoPolicy {
    fn get_action(&self, observation: &Tensor) -> Result<Tensor> {
        let values: Vec<f32> = observation.to_vec1()?;
        let skill_tail = values[self.observation_size - self.num_skills..].to_vec();
        Tensor::from_vec(skill_tail, self.num_skills, observation.device())
    }

    fn sample_with_log_prob(&self, _states: &Tensor) -> Result<(Tensor, Tensor)> {
        unimplemented!()
    }

    fn log_probs(&self, _states: &Tensor, _actions: &Tensor) -> Result<Tensor> {
        unimplemented!()
    }

    fn entropy(&self) -> Result<Tensor> {
        unimplemented!()
    }

    fn std(&self) -> Result<f32> {
        Ok(1.)
    }

    fn observation_size(&self) -> usize {
        self.observation_size
    }

    fn action_size(&self) -> usize {
        self.num_skills
    }

    fn set_deterministic(&self, deterministic: bool) -> bool {
        self.deterministic.replace(deterministic)
    }
}

/// One step episodes paying out a fixed reward per argmax of the action.
struct RewardTableEnv {
    observation_size: usize,
    rewards: Vec<f32>,
    steps: usize,
    device: Device,
}

impl RewardTableEnv {
    fn new(observation_size: usize, rewards: Vec<f32>) -> Self {
        Self {
            observation_size,
            rewards,
            steps: 0,
            device: Device::Cpu,
        }
    }

    fn observation(&self) -> Result<Tensor> {
        Tensor::zeros(self.observation_size, candle_core::DType::F32, &self.device)
    }
}

impl Env for RewardTableEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.steps = 0;
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let values: Vec<f32> = action.to_vec1()?;
        let choice = values
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(i, _)| i)
            .unwrap();
        self.steps += 1;
        Ok(SnapShot {
            state: self.observation()?,
            reward: self.rewards[choice],
            terminated: self.steps >= 1,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continuous_from_dims(vec![self.observation_size]),
            Space::continuous_from_dims(vec![self.rewards.len()]),
        )
    }
}

struct FailingEnv;

impl Env for FailingEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        Err(candle_core::Error::Msg("simulator went away".into()))
    }

    fn step(&mut self, _action: &Tensor) -> Result<SnapShot> {
        Err(candle_core::Error::Msg("simulator went away".into()))
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continuous_from_dims(vec![1]),
            Space::continuous_from_dims(vec![1]),
        )
    }
}

#[test]
fn num_skills_is_the_observation_gap() {
    assert_eq!(derive_num_skills(8, 4).unwrap(), 4);
    assert!(matches!(
        derive_num_skills(4, 4),
        Err(FinetuneError::Config(_))
    ));
    assert!(matches!(
        derive_num_skills(3, 4),
        Err(FinetuneError::Config(_))
    ));
}

#[test]
fn evaluator_scores_every_skill_and_selector_takes_first_max() {
    let device = Device::Cpu;
    let policy = SkillEchoPolicy::new(8, 4);
    let mut env = RewardTableEnv::new(4, vec![1., 5., 5., 2.]);
    let num_skills = derive_num_skills(
        policy.observation_size(),
        env.env_description().observation_size(),
    )
    .unwrap();
    assert_eq!(num_skills, 4);
    let returns = evaluate_skills(&policy, &mut env, num_skills, 10, &device).unwrap();
    assert_eq!(returns, vec![1., 5., 5., 2.]);
    assert_eq!(select_best_skill(&returns).unwrap(), 1);
}

#[test]
fn selector_rejects_an_empty_table() {
    assert!(matches!(
        select_best_skill(&[]),
        Err(FinetuneError::Config(_))
    ));
}

#[test]
fn selector_is_a_stable_arg_max() {
    assert_eq!(select_best_skill(&[3., 3., 3.]).unwrap(), 0);
    assert_eq!(select_best_skill(&[0., 2., 2.]).unwrap(), 1);
    assert_eq!(select_best_skill(&[-1.]).unwrap(), 0);
}

#[test]
fn deterministic_guard_restores_mode() {
    let policy = SkillEchoPolicy::new(8, 4);
    assert!(!policy.deterministic.get());
    {
        let _guard = DeterministicGuard::new(&policy);
        assert!(policy.deterministic.get());
    }
    assert!(!policy.deterministic.get());
}

#[test]
fn deterministic_mode_comes_back_after_a_failed_evaluation() {
    let device = Device::Cpu;
    let policy = SkillEchoPolicy::new(8, 4);
    let mut env = FailingEnv;
    let result = evaluate_skills(&policy, &mut env, 4, 10, &device);
    assert!(matches!(result, Err(FinetuneError::EnvExecution(_))));
    assert!(!policy.deterministic.get());
}

#[test]
fn fixed_skill_env_pins_one_encoding_for_its_lifetime() {
    let device = Device::Cpu;
    let base = RewardTableEnv::new(4, vec![0., 0., 0., 0.]);
    let mut env = FixedSkillEnv::new(base, 4, 2, &device).unwrap();
    assert_eq!(env.skill(), 2);
    assert_eq!(env.env_description().observation_size(), 8);

    let first: Vec<f32> = env.reset(17).unwrap().to_vec1().unwrap();
    assert_eq!(&first[4..], &[0., 0., 1., 0.]);

    let action = Tensor::from_vec(vec![1f32, 0., 0., 0.], 4, &device).unwrap();
    let snapshot = env.step(&action).unwrap();
    let stepped: Vec<f32> = snapshot.state.to_vec1().unwrap();
    assert_eq!(&stepped[4..], &[0., 0., 1., 0.]);

    let again: Vec<f32> = env.reset(17).unwrap().to_vec1().unwrap();
    assert_eq!(first, again);
}

#[test]
fn fixed_skill_env_passes_rewards_and_termination_through() {
    let device = Device::Cpu;
    let base = RewardTableEnv::new(4, vec![1., 5., 5., 2.]);
    let mut env = FixedSkillEnv::new(base, 4, 0, &device).unwrap();
    env.reset(0).unwrap();
    let action = Tensor::from_vec(vec![0f32, 1., 0., 0.], 4, &device).unwrap();
    let snapshot = env.step(&action).unwrap();
    assert_eq!(snapshot.reward, 5.);
    assert!(snapshot.terminated);
}
