use crate::buffers::trajectory::Trajectory;
use crate::distributions::{DeterministicGuard, Distribution};
use crate::env::Env;
use crate::error::FinetuneError;
use crate::sampler::rollouts;
use crate::utils::one_hot;
use candle_core::{Device, Result, Tensor};

pub const EVAL_PATHS_PER_SKILL: usize = 2;

/// A read only view of a skill conditioned policy with the latent pinned to
/// one skill: observations get the one hot encoding appended before they
/// reach the wrapped policy.
pub struct FixedSkillPolicy<'a, D: Distribution> {
    policy: &'a D,
    num_skills: usize,
    encoding: Tensor,
}

impl<'a, D: Distribution> FixedSkillPolicy<'a, D> {
    pub fn new(policy: &'a D, num_skills: usize, skill: usize, device: &Device) -> Result<Self> {
        Ok(Self {
            policy,
            num_skills,
            encoding: one_hot(num_skills, skill, device)?,
        })
    }

    fn augment(&self, observation: &Tensor) -> Result<Tensor> {
        Tensor::cat(&[observation, &self.encoding], 0)
    }

    fn augment_batch(&self, states: &Tensor) -> Result<Tensor> {
        let (batch, _) = states.dims2()?;
        let encoding = self.encoding.unsqueeze(0)?.expand((batch, self.num_skills))?;
        Tensor::cat(&[states, &encoding], 1)
    }
}

impl<D: Distribution> Distribution for FixedSkillPolicy<'_, D> {
    fn get_action(&self, observation: &Tensor) -> Result<Tensor> {
        self.policy.get_action(&self.augment(observation)?)
    }

    fn sample_with_log_prob(&self, states: &Tensor) -> Result<(Tensor, Tensor)> {
        self.policy.sample_with_log_prob(&self.augment_batch(states)?)
    }

    fn log_probs(&self, states: &Tensor, actions: &Tensor) -> Result<Tensor> {
        self.policy.log_probs(&self.augment_batch(states)?, actions)
    }

    fn entropy(&self) -> Result<Tensor> {
        self.policy.entropy()
    }

    fn std(&self) -> Result<f32> {
        self.policy.std()
    }

    fn observation_size(&self) -> usize {
        self.policy.observation_size() - self.num_skills
    }

    fn action_size(&self) -> usize {
        self.policy.action_size()
    }

    fn set_deterministic(&self, deterministic: bool) -> bool {
        self.policy.set_deterministic(deterministic)
    }
}

/// The latent skill count is whatever part of the policy input the plain
/// environment observation does not account for. A non positive difference
/// means the policy was not trained over this environment.
pub fn derive_num_skills(
    policy_observation_size: usize,
    env_observation_size: usize,
) -> std::result::Result<usize, FinetuneError> {
    if policy_observation_size <= env_observation_size {
        return Err(FinetuneError::Config(format!(
            "policy expects {policy_observation_size} observation dims but the environment \
             provides {env_observation_size}, no skill dims remain"
        )));
    }
    Ok(policy_observation_size - env_observation_size)
}

/// Scores every skill with a couple of deterministic rollouts and returns
/// the mean episodic return per skill, index ascending.
pub fn evaluate_skills<D: Distribution, E: Env>(
    policy: &D,
    env: &mut E,
    num_skills: usize,
    max_path_length: usize,
    device: &Device,
) -> std::result::Result<Vec<f32>, FinetuneError> {
    let _guard = DeterministicGuard::new(policy);
    let mut returns = Vec::with_capacity(num_skills);
    for skill in 0..num_skills {
        let fixed = FixedSkillPolicy::new(policy, num_skills, skill, device)?;
        let paths = rollouts(&fixed, env, max_path_length, EVAL_PATHS_PER_SKILL)
            .map_err(FinetuneError::EnvExecution)?;
        let mean_return =
            paths.iter().map(Trajectory::total_reward).sum::<f32>() / paths.len() as f32;
        log::info!("reward for skill {skill} = {mean_return:.3}");
        returns.push(mean_return);
    }
    Ok(returns)
}

/// Stable arg max over the return table: ties go to the smallest index.
pub fn select_best_skill(returns: &[f32]) -> std::result::Result<usize, FinetuneError> {
    if returns.is_empty() {
        return Err(FinetuneError::Config(
            "cannot select a skill from an empty return table".into(),
        ));
    }
    let mut best = 0;
    for (skill, mean_return) in returns.iter().enumerate().skip(1) {
        if *mean_return > returns[best] {
            best = skill;
        }
    }
    Ok(best)
}
