use candle_core::{Device, Error, Result, Tensor};
use pyo3::{
    PyObject, PyResult, Python,
    types::{PyAnyMethods, PyDict},
};
use sfrl_core::env::{Env, EnvironmentDescription, SnapShot, Space};

pub struct GymEnv {
    env: PyObject,
    action_space: Space,
    observation_space: Space,
    device: Device,
}

impl GymEnv {
    pub fn new(name: &str, render_mode: Option<String>, device: &Device) -> Result<GymEnv> {
        Python::with_gil(|py| {
            let gym = py.import("gymnasium")?;
            let kwargs = PyDict::new(py);
            if let Some(render_mode) = render_mode {
                kwargs.set_item("render_mode", render_mode)?;
            }
            let make = gym.getattr("make")?;
            let env = make.call((name,), Some(&kwargs))?;
            let gym_spaces = py.import("gymnasium.spaces")?;
            let action_space = env.getattr("action_space")?;
            let action_space = if action_space.is_instance(&gym_spaces.getattr("Discrete")?)? {
                let val = action_space.getattr("n")?.extract()?;
                Space::Discrete(val)
            } else if action_space.is_instance(&gym_spaces.getattr("Box")?)? {
                let low: Vec<f32> = action_space.getattr("low")?.extract()?;
                let high: Vec<f32> = action_space.getattr("high")?.extract()?;
                let size = low.len();
                Space::Continuous {
                    min: Some(low),
                    max: Some(high),
                    size,
                }
            } else {
                todo!("Other action spaces are not yet supported");
            };
            let observation_space = env.getattr("observation_space")?;
            let observation_space: Vec<usize> = observation_space.getattr("shape")?.extract()?;
            let observation_space = Space::continuous_from_dims(observation_space);
            PyResult::Ok(GymEnv {
                env: env.into(),
                action_space,
                observation_space,
                device: device.clone(),
            })
        })
        .map_err(Error::wrap)
    }

    pub fn observation_size(&self) -> usize {
        self.observation_space.size()
    }

    pub fn action_size(&self) -> usize {
        self.action_space.size()
    }
}

impl Env for GymEnv {
    fn reset(&mut self, seed: u64) -> Result<Tensor> {
        let state: Vec<f32> = Python::with_gil(|py| {
            let kwargs = PyDict::new(py);
            kwargs.set_item("seed", seed)?;
            let state = self.env.call_method(py, "reset", (), Some(&kwargs))?;
            state.bind(py).get_item(0)?.extract()
        })
        .map_err(Error::wrap)?;
        let size = state.len();
        Tensor::from_vec(state, size, &self.device)
    }

    fn step(&mut self, action: &Tensor) -> Result<SnapShot> {
        let action: Vec<f32> = action.to_vec1()?;
        let (state, reward, terminated, truncated): (Vec<f32>, f32, bool, bool) =
            Python::with_gil(|py| {
                let step = match &self.action_space {
                    Space::Continuous {
                        min: Some(min),
                        max: Some(max),
                        ..
                    } => {
                        let clipped: Vec<f32> = action
                            .iter()
                            .zip(min.iter().zip(max.iter()))
                            .map(|(a, (lo, hi))| a.clamp(*lo, *hi))
                            .collect();
                        self.env.call_method(py, "step", (clipped,), None)?
                    }
                    Space::Discrete(..) => {
                        let action = action
                            .iter()
                            .enumerate()
                            .max_by(|(_, a), (_, b)| a.total_cmp(b))
                            .map(|(i, _)| i)
                            .unwrap_or_default();
                        self.env.call_method(py, "step", (action,), None)?
                    }
                    _ => self.env.call_method(py, "step", (action.clone(),), None)?,
                };
                let step = step.bind(py);
                let state: Vec<f32> = step.get_item(0)?.extract()?;
                let reward: f32 = step.get_item(1)?.extract()?;
                let terminated: bool = step.get_item(2)?.extract()?;
                let truncated: bool = step.get_item(3)?.extract()?;
                PyResult::Ok((state, reward, terminated, truncated))
            })
            .map_err(Error::wrap)?;
        let size = state.len();
        Ok(SnapShot {
            state: Tensor::from_vec(state, size, &self.device)?,
            reward,
            terminated,
            truncated,
        })
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription {
            observation_space: self.observation_space.clone(),
            action_space: self.action_space.clone(),
        }
    }
}
