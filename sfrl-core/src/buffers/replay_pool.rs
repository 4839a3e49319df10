use crate::error::FinetuneError;
use crate::rng;
use candle_core::Tensor;
use rand::Rng;

#[derive(Debug, Clone)]
pub struct Transition {
    pub observation: Tensor,
    pub action: Tensor,
    pub reward: f32,
    pub next_observation: Tensor,
    pub terminated: bool,
}

/// A batch of transitions stacked into rank 2 tensors, ready for one
/// gradient update. `not_dones` is 1.0 where the episode kept going.
#[derive(Debug)]
pub struct TransitionBatch {
    pub observations: Tensor,
    pub actions: Tensor,
    pub rewards: Tensor,
    pub next_observations: Tensor,
    pub not_dones: Tensor,
}

/// Bounded ring of transitions. Once occupancy hits `max_size` the oldest
/// entry gets overwritten; sampling is uniform with replacement.
#[derive(Debug)]
pub struct ReplayPool {
    observation_size: usize,
    action_size: usize,
    observations: Vec<Tensor>,
    actions: Vec<Tensor>,
    rewards: Vec<f32>,
    next_observations: Vec<Tensor>,
    terminated: Vec<bool>,
    max_size: usize,
    ptr: usize,
}

impl ReplayPool {
    pub fn new(observation_size: usize, action_size: usize, max_size: usize) -> Self {
        assert!(max_size > 0, "replay pool needs a positive capacity");
        Self {
            observation_size,
            action_size,
            observations: Vec::new(),
            actions: Vec::new(),
            rewards: Vec::new(),
            next_observations: Vec::new(),
            terminated: Vec::new(),
            max_size,
            ptr: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn add(&mut self, transition: Transition) {
        debug_assert_eq!(transition.observation.elem_count(), self.observation_size);
        debug_assert_eq!(transition.action.elem_count(), self.action_size);
        let Transition {
            observation,
            action,
            reward,
            next_observation,
            terminated,
        } = transition;
        if self.len() < self.max_size {
            self.observations.push(observation);
            self.actions.push(action);
            self.rewards.push(reward);
            self.next_observations.push(next_observation);
            self.terminated.push(terminated);
        } else {
            self.observations[self.ptr] = observation;
            self.actions[self.ptr] = action;
            self.rewards[self.ptr] = reward;
            self.next_observations[self.ptr] = next_observation;
            self.terminated[self.ptr] = terminated;
        }
        self.ptr = (self.ptr + 1) % self.max_size;
    }

    pub fn sample(&self, batch_size: usize) -> Result<TransitionBatch, FinetuneError> {
        if self.is_empty() {
            return Err(FinetuneError::InsufficientData);
        }
        let len = self.len();
        let indices: Vec<usize> =
            rng::with_rng(|rng| (0..batch_size).map(|_| rng.random_range(0..len)).collect());
        let device = self.observations[0].device();
        let observations: Vec<Tensor> = indices
            .iter()
            .map(|i| self.observations[*i].clone())
            .collect();
        let actions: Vec<Tensor> = indices.iter().map(|i| self.actions[*i].clone()).collect();
        let next_observations: Vec<Tensor> = indices
            .iter()
            .map(|i| self.next_observations[*i].clone())
            .collect();
        let rewards: Vec<f32> = indices.iter().map(|i| self.rewards[*i]).collect();
        let not_dones: Vec<f32> = indices
            .iter()
            .map(|i| if self.terminated[*i] { 0f32 } else { 1f32 })
            .collect();
        Ok(TransitionBatch {
            observations: Tensor::stack(&observations, 0)?,
            actions: Tensor::stack(&actions, 0)?,
            rewards: Tensor::from_vec(rewards, batch_size, device)?,
            next_observations: Tensor::stack(&next_observations, 0)?,
            not_dones: Tensor::from_vec(not_dones, batch_size, device)?,
        })
    }
}
