use candle_core::{Device, Result, Tensor};
use sfrl_core::env::{Env, EnvironmentDescription, SnapShot, Space};

/// Tiny deterministic environment for exercising the pipeline without a
/// simulator: the state is a point pushed along a line by the first action
/// component, which also doubles as the reward.
pub struct LineEnv {
    observation_size: usize,
    action_size: usize,
    state: Vec<f32>,
    device: Device,
}

impl LineEnv {
    pub fn new(observation_size: usize, action_size: usize, device: &Device) -> Self {
        Self {
            observation_size,
            action_size,
            state: vec![0.; observation_size],
            device: device.clone(),
        }
    }

    fn observation(&self) -> Result<Tensor> {
        Tensor::from_vec(self.state.clone(), self.observation_size, &self.device)
    }
}

impl Env for LineEnv {
    fn reset(&mut self, _seed: u64) -> Result<Tensor> {
        self.state = vec![0.; self.observation_size];
        self.observation()
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let action: Vec<f32> = action.to_vec1()?;
        let push = action[0].clamp(-1., 1.);
        for x in self.state.iter_mut() {
            *x = (*x + push).clamp(-5., 5.);
        }
        Ok(SnapShot {
            state: self.observation()?,
            reward: push,
            terminated: false,
            truncated: false,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::continuous_from_dims(vec![self.observation_size]),
            Space::Continuous {
                min: Some(vec![-1.; self.action_size]),
                max: Some(vec![1.; self.action_size]),
                size: self.action_size,
            },
        )
    }
}
