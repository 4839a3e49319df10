use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use sfrl_core::{
    agents::Agent,
    buffers::replay_pool::TransitionBatch,
    distributions::{Distribution, DistributionKind},
    tensors::{Logp, PolicyLoss, QValueLoss, TemperatureLoss, ValueLoss},
    utils::optimizer::OptimizerWithMaxGrad,
    value_functions::{QFunction, VFunction},
};
use std::ops::Deref;

#[derive(Debug, Clone, Copy)]
pub struct SacConfig {
    pub lr: f64,
    pub discount: f32,
    pub tau: f64,
    pub target_entropy: f32,
    pub max_grad_norm: Option<f32>,
}

impl Default for SacConfig {
    fn default() -> Self {
        Self {
            lr: 3e-4,
            discount: 0.99,
            tau: 0.01,
            target_entropy: -1.,
            max_grad_norm: None,
        }
    }
}

pub struct SacLosses {
    pub qf_loss: QValueLoss,
    pub vf_loss: ValueLoss,
    pub policy_loss: PolicyLoss,
    pub temperature_loss: TemperatureLoss,
}

/// Soft actor-critic over a replay pool: squashed gaussian policy, one q
/// function, a state value function with a polyak averaged target copy and
/// a learned temperature pulled toward `target_entropy`.
pub struct Sac {
    pub distribution: DistributionKind,
    pub qf: QFunction,
    pub vf: VFunction,
    pub target_vf: VFunction,
    target_vf_varmap: VarMap,
    log_alpha: Tensor,
    policy_optimizer: OptimizerWithMaxGrad,
    qf_optimizer: OptimizerWithMaxGrad,
    vf_optimizer: OptimizerWithMaxGrad,
    alpha_optimizer: OptimizerWithMaxGrad,
    config: SacConfig,
}

impl Sac {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        distribution: DistributionKind,
        policy_varmap: VarMap,
        qf: QFunction,
        qf_varmap: VarMap,
        vf: VFunction,
        vf_varmap: VarMap,
        target_vf: VFunction,
        target_vf_varmap: VarMap,
        device: &Device,
        config: SacConfig,
    ) -> Result<Self> {
        let alpha_varmap = VarMap::new();
        let alpha_vb = VarBuilder::from_varmap(&alpha_varmap, DType::F32, device);
        let log_alpha = alpha_vb.get(1, "log_alpha")?;

        let optimizer_params = ParamsAdamW {
            lr: config.lr,
            weight_decay: 0.,
            ..Default::default()
        };
        let policy_optimizer = AdamW::new(policy_varmap.all_vars(), optimizer_params.clone())?;
        let qf_optimizer = AdamW::new(qf_varmap.all_vars(), optimizer_params.clone())?;
        let vf_optimizer = AdamW::new(vf_varmap.all_vars(), optimizer_params.clone())?;
        let alpha_optimizer = AdamW::new(alpha_varmap.all_vars(), optimizer_params)?;

        // the target net starts as an exact copy of the value function
        interpolate_varmap(&vf_varmap, &target_vf_varmap, 1.)?;

        Ok(Self {
            distribution,
            qf,
            vf,
            target_vf,
            target_vf_varmap,
            log_alpha,
            policy_optimizer: OptimizerWithMaxGrad::new(
                policy_optimizer,
                config.max_grad_norm,
                policy_varmap,
            ),
            qf_optimizer: OptimizerWithMaxGrad::new(qf_optimizer, config.max_grad_norm, qf_varmap),
            vf_optimizer: OptimizerWithMaxGrad::new(vf_optimizer, config.max_grad_norm, vf_varmap),
            alpha_optimizer: OptimizerWithMaxGrad::new(
                alpha_optimizer,
                config.max_grad_norm,
                alpha_varmap,
            ),
            config,
        })
    }

    pub fn alpha(&self) -> Result<f32> {
        self.log_alpha.exp()?.squeeze(0)?.to_scalar::<f32>()
    }

    fn losses(&self, batch: &TransitionBatch) -> Result<SacLosses> {
        let (new_actions, logp) = self.distribution.sample_with_log_prob(&batch.observations)?;
        let logp = Logp(logp);
        let alpha = self.log_alpha.exp()?;

        // one step bootstrap through the target value net
        let v_next = self.target_vf.values(&batch.next_observations)?;
        let q_target = (&batch.rewards
            + (v_next.mul(&batch.not_dones)? * self.config.discount as f64)?)?
        .detach();
        let q_pred = self.qf.values(&batch.observations, &batch.actions)?;
        let qf_loss = QValueLoss((q_pred - q_target)?.sqr()?.mean_all()?);

        // soft value of freshly sampled actions
        let q_new = self.qf.values(&batch.observations, &new_actions)?;
        let v_target = (&q_new - logp.broadcast_mul(&alpha)?)?.detach();
        let v_pred = self.vf.values(&batch.observations)?;
        let vf_loss = ValueLoss((v_pred - v_target)?.sqr()?.mean_all()?);

        let policy_loss =
            PolicyLoss((logp.broadcast_mul(&alpha.detach())? - q_new)?.mean_all()?);

        // temperature follows the entropy gap
        let entropy_gap = logp
            .affine(1., self.config.target_entropy as f64)?
            .detach();
        let temperature_loss = TemperatureLoss(
            self.log_alpha
                .broadcast_mul(&entropy_gap)?
                .neg()?
                .mean_all()?,
        );

        Ok(SacLosses {
            qf_loss,
            vf_loss,
            policy_loss,
            temperature_loss,
        })
    }
}

impl Agent for Sac {
    type Dist = DistributionKind;

    fn distribution(&self) -> &Self::Dist {
        &self.distribution
    }

    fn train_step(&mut self, batch: &TransitionBatch) -> Result<()> {
        let losses = self.losses(batch)?;
        self.qf_optimizer.backward_step(losses.qf_loss.deref())?;
        self.vf_optimizer.backward_step(losses.vf_loss.deref())?;
        self.policy_optimizer.backward_step(losses.policy_loss.deref())?;
        self.alpha_optimizer.backward_step(losses.temperature_loss.deref())?;
        interpolate_varmap(
            &self.vf_optimizer.varmap,
            &self.target_vf_varmap,
            self.config.tau,
        )?;
        Ok(())
    }
}

// dst <- tau * src + (1 - tau) * dst, matched by variable name
fn interpolate_varmap(src: &VarMap, dst: &VarMap, tau: f64) -> Result<()> {
    let src_data = src.data().lock().unwrap();
    let dst_data = dst.data().lock().unwrap();
    for (name, dst_var) in dst_data.iter() {
        let src_var = src_data.get(name).ok_or_else(|| {
            candle_core::Error::Msg(format!("target network has no source variable {name}"))
        })?;
        let mixed = ((src_var.as_tensor() * tau)? + (dst_var.as_tensor() * (1. - tau))?)?;
        dst_var.set(&mixed)?;
    }
    Ok(())
}
