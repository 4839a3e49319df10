use candle_core::{Device, Result};
use sfrl_core::env::Env;
use sfrl_gym::GymEnv;

pub trait EnvBuilderTrait: Send + 'static {
    type Env: Env;

    fn build_env(&self, device: &Device) -> Result<Self::Env>;
}

impl EnvBuilderTrait for String {
    type Env = GymEnv;

    fn build_env(&self, device: &Device) -> Result<Self::Env> {
        GymEnv::new(self, None, device)
    }
}

impl<E: Env, F: Send + 'static> EnvBuilderTrait for F
where
    F: Fn(&Device) -> Result<E>,
{
    type Env = E;

    fn build_env(&self, device: &Device) -> Result<Self::Env> {
        (self)(device)
    }
}
