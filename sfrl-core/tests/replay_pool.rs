use candle_core::{Device, Tensor};
use sfrl_core::buffers::replay_pool::{ReplayPool, Transition};
use sfrl_core::error::FinetuneError;

fn transition(tag: f32, device: &Device) -> Transition {
    Transition {
        observation: Tensor::from_vec(vec![tag, 0.], 2, device).unwrap(),
        action: Tensor::from_vec(vec![tag], 1, device).unwrap(),
        reward: tag,
        next_observation: Tensor::from_vec(vec![tag, 1.], 2, device).unwrap(),
        terminated: false,
    }
}

#[test]
fn occupancy_tracks_insertions_up_to_capacity() {
    let device = Device::Cpu;
    let mut pool = ReplayPool::new(2, 1, 3);
    assert_eq!(pool.len(), 0);
    assert!(pool.is_empty());
    for (i, tag) in [1., 2., 3., 4., 5.].into_iter().enumerate() {
        pool.add(transition(tag, &device));
        assert_eq!(pool.len(), (i + 1).min(3));
    }
    assert_eq!(pool.max_size(), 3);
}

#[test]
fn ring_overwrite_keeps_most_recent() {
    let device = Device::Cpu;
    let mut pool = ReplayPool::new(2, 1, 3);
    for tag in [1., 2., 3., 4.] {
        pool.add(transition(tag, &device));
    }
    assert_eq!(pool.len(), 3);
    // a large sample with replacement touches every slot
    let batch = pool.sample(256).unwrap();
    let rewards: Vec<f32> = batch.rewards.to_vec1().unwrap();
    assert!(rewards.iter().all(|r| [2., 3., 4.].contains(r)));
    for survivor in [2., 3., 4.] {
        assert!(rewards.contains(&survivor));
    }
    assert!(!rewards.contains(&1.));
}

#[test]
fn sample_returns_requested_batch_size() {
    let device = Device::Cpu;
    let mut pool = ReplayPool::new(2, 1, 8);
    pool.add(transition(7., &device));
    let batch = pool.sample(5).unwrap();
    let rewards: Vec<f32> = batch.rewards.to_vec1().unwrap();
    assert_eq!(rewards, vec![7.; 5]);
    assert_eq!(batch.observations.dims(), &[5, 2]);
    assert_eq!(batch.actions.dims(), &[5, 1]);
    let not_dones: Vec<f32> = batch.not_dones.to_vec1().unwrap();
    assert_eq!(not_dones, vec![1.; 5]);
}

#[test]
fn terminated_transitions_zero_the_continuation_mask() {
    let device = Device::Cpu;
    let mut pool = ReplayPool::new(2, 1, 8);
    let mut done = transition(1., &device);
    done.terminated = true;
    pool.add(done);
    let batch = pool.sample(3).unwrap();
    let not_dones: Vec<f32> = batch.not_dones.to_vec1().unwrap();
    assert_eq!(not_dones, vec![0.; 3]);
}

#[test]
fn sampling_empty_pool_fails() {
    let pool = ReplayPool::new(2, 1, 3);
    assert!(matches!(
        pool.sample(1),
        Err(FinetuneError::InsufficientData)
    ));
}
