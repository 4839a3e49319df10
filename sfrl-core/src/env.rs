use crate::utils::one_hot;
use candle_core::{Device, Result, Tensor};

#[derive(Debug, Clone)]
pub enum Space {
    Discrete(usize),
    Continuous {
        min: Option<Vec<f32>>,
        max: Option<Vec<f32>>,
        size: usize,
    },
}

impl Space {
    pub fn continuous_from_dims(dims: Vec<usize>) -> Self {
        Self::Continuous {
            min: None,
            max: None,
            size: dims.iter().product(),
        }
    }

    pub fn size(&self) -> usize {
        match &self {
            Self::Discrete(size) => *size,
            Self::Continuous { size, .. } => *size,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnvironmentDescription {
    pub observation_space: Space,
    pub action_space: Space,
}

impl EnvironmentDescription {
    pub fn new(observation_space: Space, action_space: Space) -> Self {
        Self {
            observation_space,
            action_space,
        }
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }
}

#[derive(Debug)]
pub struct SnapShot {
    pub state: Tensor,
    pub reward: f32,
    pub terminated: bool,
    pub truncated: bool,
}

pub trait Env {
    fn reset(&mut self, seed: u64) -> Result<Tensor>;
    fn step(&mut self, action: &Tensor) -> Result<SnapShot>;
    fn env_description(&self) -> EnvironmentDescription;
}

/// An environment view that pins one skill for its whole lifetime: every
/// observation leaving the base environment gets the same one hot skill
/// encoding appended, actions and rewards pass through untouched.
pub struct FixedSkillEnv<E: Env> {
    env: E,
    num_skills: usize,
    skill: usize,
    encoding: Tensor,
}

impl<E: Env> FixedSkillEnv<E> {
    pub fn new(env: E, num_skills: usize, skill: usize, device: &Device) -> Result<Self> {
        Ok(Self {
            encoding: one_hot(num_skills, skill, device)?,
            env,
            num_skills,
            skill,
        })
    }

    pub fn skill(&self) -> usize {
        self.skill
    }

    pub fn num_skills(&self) -> usize {
        self.num_skills
    }

    fn augment(&self, observation: &Tensor) -> Result<Tensor> {
        Tensor::cat(&[observation, &self.encoding], 0)
    }
}

impl<E: Env> Env for FixedSkillEnv<E> {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        let state = self.env.reset(seed)?;
        self.augment(&state)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let snapshot = self.env.step(action)?;
        Ok(SnapShot {
            state: self.augment(&snapshot.state)?,
            ..snapshot
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        let base = self.env.env_description();
        let observation_space = Space::Continuous {
            min: None,
            max: None,
            size: base.observation_size() + self.num_skills,
        };
        EnvironmentDescription::new(observation_space, base.action_space)
    }
}
