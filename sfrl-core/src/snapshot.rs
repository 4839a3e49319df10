use crate::distributions::{
    DistributionKind, diag_gaussian::DiagGaussianDistribution,
    squashed_diag_gaussian::SquashedDiagGaussianDistribution,
};
use crate::value_functions::{QFunction, VFunction};
use anyhow::{Context, Result};
use bincode::{Decode, Encode};
use candle_core::{DType, Device, Tensor, safetensors::BufferedSafetensors};
use candle_nn::{VarBuilder, VarMap};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum PolicyHead {
    DiagGaussian,
    SquashedDiagGaussian,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct PolicySpec {
    pub head: PolicyHead,
    pub observation_size: usize,
    pub action_size: usize,
    pub hidden_layers: Vec<usize>,
    pub scope: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct ValueSpec {
    pub hidden_layers: Vec<usize>,
    pub scope: String,
}

#[derive(Debug, Clone, Encode, Decode)]
pub struct SnapshotSpec {
    pub env_name: String,
    pub policy: PolicySpec,
    pub qf: ValueSpec,
    pub vf: ValueSpec,
}

/// A persisted policy / q function / v function bundle plus the name of the
/// environment it was trained on. The spec part describes network shapes so
/// every component can be rebuilt into a fresh `VarMap` and then filled with
/// the stored weights, which keeps the rebuilt parameters trainable.
pub struct Snapshot {
    pub spec: SnapshotSpec,
    tensors: BufferedSafetensors,
}

impl Snapshot {
    pub fn save(
        path: &Path,
        spec: &SnapshotSpec,
        policy: &VarMap,
        qf: &VarMap,
        vf: &VarMap,
    ) -> Result<()> {
        let mut named: Vec<(String, Tensor)> = Vec::new();
        collect_vars(&mut named, "policy", policy);
        collect_vars(&mut named, "qf", qf);
        collect_vars(&mut named, "vf", vf);
        let blob = safetensors::serialize(
            named.iter().map(|(name, tensor)| (name.as_str(), tensor)),
            None,
        )?;
        let payload = (spec.clone(), blob);
        let bytes = bincode::encode_to_vec(&payload, bincode::config::standard())?;
        std::fs::write(path, bytes)
            .with_context(|| format!("failed to write snapshot {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read(path)
            .with_context(|| format!("failed to read snapshot {}", path.display()))?;
        let ((spec, blob), _): ((SnapshotSpec, Vec<u8>), usize) =
            bincode::decode_from_slice(&raw, bincode::config::standard())
                .with_context(|| format!("malformed snapshot {}", path.display()))?;
        let tensors = BufferedSafetensors::new(blob)?;
        Ok(Self { spec, tensors })
    }

    pub fn build_policy(&self, device: &Device) -> Result<(DistributionKind, VarMap)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let spec = &self.spec.policy;
        let policy = match spec.head {
            PolicyHead::DiagGaussian => DistributionKind::DiagGaussian(
                DiagGaussianDistribution::build(
                    spec.observation_size,
                    spec.action_size,
                    &spec.hidden_layers,
                    &vb,
                    &spec.scope,
                )?,
            ),
            PolicyHead::SquashedDiagGaussian => DistributionKind::SquashedDiagGaussian(
                SquashedDiagGaussianDistribution::build(
                    spec.observation_size,
                    spec.action_size,
                    &spec.hidden_layers,
                    &vb,
                    &spec.scope,
                )?,
            ),
        };
        self.fill_varmap(&varmap, "policy", device)?;
        Ok((policy, varmap))
    }

    pub fn build_qf(&self, device: &Device) -> Result<(QFunction, VarMap)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let qf = QFunction::build(
            self.spec.policy.observation_size,
            self.spec.policy.action_size,
            &self.spec.qf.hidden_layers,
            &vb,
            &self.spec.qf.scope,
        )?;
        self.fill_varmap(&varmap, "qf", device)?;
        Ok((qf, varmap))
    }

    pub fn build_vf(&self, device: &Device) -> Result<(VFunction, VarMap)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let vf = VFunction::build(
            self.spec.policy.observation_size,
            &self.spec.vf.hidden_layers,
            &vb,
            &self.spec.vf.scope,
        )?;
        self.fill_varmap(&varmap, "vf", device)?;
        Ok((vf, varmap))
    }

    fn fill_varmap(&self, varmap: &VarMap, prefix: &str, device: &Device) -> Result<()> {
        let data = varmap.data().lock().unwrap();
        for (name, var) in data.iter() {
            let stored = self
                .tensors
                .load(&format!("{prefix}/{name}"), device)
                .with_context(|| format!("snapshot is missing tensor {prefix}/{name}"))?;
            var.set(&stored)?;
        }
        Ok(())
    }
}

fn collect_vars(named: &mut Vec<(String, Tensor)>, prefix: &str, varmap: &VarMap) {
    let data = varmap.data().lock().unwrap();
    for (name, var) in data.iter() {
        named.push((format!("{prefix}/{name}"), var.as_tensor().clone()));
    }
}
