use crate::buffers::trajectory::Trajectory;
use crate::distributions::Distribution;
use crate::env::{Env, SnapShot};
use crate::rng;
use candle_core::Result;

/// Runs a single episode, capped at `max_path_length` steps or earlier
/// natural termination. Environment errors propagate, there are no retries.
pub fn run_rollout<D: Distribution, E: Env>(
    distribution: &D,
    env: &mut E,
    max_path_length: usize,
) -> Result<Trajectory> {
    let mut trajectory = Trajectory::default();
    let mut state = env.reset(rng::next_seed())?;
    for _ in 0..max_path_length {
        let action = distribution.get_action(&state)?;
        let SnapShot {
            state: next_state,
            reward,
            terminated,
            truncated,
        } = env.step(&action)?;
        let done = terminated || truncated;
        trajectory.push_step(state, action, reward, done);
        state = next_state;
        if done {
            break;
        }
    }
    Ok(trajectory)
}

pub fn rollouts<D: Distribution, E: Env>(
    distribution: &D,
    env: &mut E,
    max_path_length: usize,
    n_paths: usize,
) -> Result<Vec<Trajectory>> {
    (0..n_paths)
        .map(|_| run_rollout(distribution, env, max_path_length))
        .collect()
}
