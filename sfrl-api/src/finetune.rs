use crate::builders::env::EnvBuilderTrait;
use crate::builders::value_function::ValueFunctionBuilder;
use crate::variant::Variant;
use candle_core::Device;
use sfrl_agents::sac::{Sac, SacConfig};
use sfrl_core::{
    buffers::replay_pool::ReplayPool,
    distributions::Distribution,
    env::{Env, FixedSkillEnv},
    off_policy_algorithm::{DefaultOffPolicyAlgorithmHooks, OffPolicyAlgorithm, OffPolicyConfig},
    rng, skills,
    snapshot::Snapshot,
};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    SkillSelection,
    EnvironmentSetup,
    ValueFunctionSetup,
    Training,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "Init",
            Self::SkillSelection => "SkillSelection",
            Self::EnvironmentSetup => "EnvironmentSetup",
            Self::ValueFunctionSetup => "ValueFunctionSetup",
            Self::Training => "Training",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct RunError {
    pub stage: Stage,
    #[source]
    pub source: anyhow::Error,
}

fn staged<E: Into<anyhow::Error>>(stage: Stage) -> impl FnOnce(E) -> RunError {
    move |err| RunError {
        stage,
        source: err.into(),
    }
}

/// Runs one variant end to end: load the snapshot, find the best skill,
/// freeze it into the environment, then finetune with soft actor-critic.
/// Nothing is allocated for training before skill selection succeeds, and
/// any failure aborts only this variant.
pub fn run_finetune<EB: EnvBuilderTrait>(
    variant: &Variant,
    device: &Device,
    env_builder: EB,
) -> Result<(), RunError> {
    rng::set_global_seed(variant.seed);

    let snapshot = Snapshot::load(&variant.snapshot_filename).map_err(staged(Stage::Init))?;
    let (policy, policy_varmap) = snapshot.build_policy(device).map_err(staged(Stage::Init))?;
    let mut env = env_builder.build_env(device).map_err(staged(Stage::Init))?;

    log::info!("finding best skill to finetune");
    let env_description = env.env_description();
    let num_skills = skills::derive_num_skills(
        policy.observation_size(),
        env_description.observation_size(),
    )
    .map_err(staged(Stage::SkillSelection))?;
    let returns = skills::evaluate_skills(
        &policy,
        &mut env,
        num_skills,
        variant.max_path_length,
        device,
    )
    .map_err(staged(Stage::SkillSelection))?;
    let best_skill = skills::select_best_skill(&returns).map_err(staged(Stage::SkillSelection))?;
    log::info!(
        "best skill found: z = {best_skill}, reward = {:.3}",
        returns[best_skill]
    );

    let env =
        FixedSkillEnv::new(env, num_skills, best_skill, device).map_err(staged(Stage::EnvironmentSetup))?;
    let fixed_description = env.env_description();
    let pool = ReplayPool::new(
        fixed_description.observation_size(),
        fixed_description.action_size(),
        variant.max_pool_size,
    );

    let (qf, qf_varmap, vf, vf_varmap, target_vf, target_vf_varmap) =
        if variant.use_pretrained_values {
            let (qf, qf_varmap) = snapshot
                .build_qf(device)
                .map_err(staged(Stage::ValueFunctionSetup))?;
            let (vf, vf_varmap) = snapshot
                .build_vf(device)
                .map_err(staged(Stage::ValueFunctionSetup))?;
            let (target_vf, target_vf_varmap) = snapshot
                .build_vf(device)
                .map_err(staged(Stage::ValueFunctionSetup))?;
            (qf, qf_varmap, vf, vf_varmap, target_vf, target_vf_varmap)
        } else {
            // fresh heads under their own scopes, away from the pretraining
            // parameter names
            let observation_size = fixed_description.observation_size();
            let action_size = fixed_description.action_size();
            let qf_builder = ValueFunctionBuilder::new(variant.layer_size, "qf-finetune");
            let vf_builder = ValueFunctionBuilder::new(variant.layer_size, "vf-finetune");
            let (qf, qf_varmap) = qf_builder
                .build_qf(observation_size, action_size, device)
                .map_err(staged(Stage::ValueFunctionSetup))?;
            let (vf, vf_varmap) = vf_builder
                .build_vf(observation_size, device)
                .map_err(staged(Stage::ValueFunctionSetup))?;
            let (target_vf, target_vf_varmap) = vf_builder
                .build_vf(observation_size, device)
                .map_err(staged(Stage::ValueFunctionSetup))?;
            (qf, qf_varmap, vf, vf_varmap, target_vf, target_vf_varmap)
        };

    log::info!("finetuning best skill for {} epochs", variant.n_epochs);
    let sac_config = SacConfig {
        lr: variant.lr,
        discount: variant.discount,
        tau: variant.tau,
        target_entropy: variant.target_entropy,
        max_grad_norm: None,
    };
    let agent = Sac::new(
        policy,
        policy_varmap,
        qf,
        qf_varmap,
        vf,
        vf_varmap,
        target_vf,
        target_vf_varmap,
        device,
        sac_config,
    )
    .map_err(staged(Stage::Training))?;
    let config = OffPolicyConfig {
        min_pool_size: variant.max_path_length,
        epoch_length: variant.epoch_length,
        n_epochs: variant.n_epochs,
        max_path_length: variant.max_path_length,
        batch_size: variant.batch_size,
        n_train_repeat: variant.n_train_repeat,
        eval_n_episodes: 1,
    };
    let mut algorithm =
        OffPolicyAlgorithm::new(env, agent, pool, DefaultOffPolicyAlgorithmHooks, config);
    for summary in algorithm.epochs() {
        let summary = summary.map_err(staged(Stage::Training))?;
        log::info!(
            "epoch: {:<4} mean return: {:.2}",
            summary.epoch,
            summary.mean_return
        );
    }
    Ok(())
}
