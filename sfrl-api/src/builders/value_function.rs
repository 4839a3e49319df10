use candle_core::{DType, Device, Result};
use candle_nn::{VarBuilder, VarMap};
use sfrl_core::value_functions::{QFunction, VFunction};

/// Builds value heads, each in its own fresh varmap so optimizers and
/// target copies stay per component. The scope becomes the variable name
/// prefix, which is what keeps finetune heads from colliding with
/// pretrained ones.
pub struct ValueFunctionBuilder {
    pub hidden_layers: Vec<usize>,
    pub scope: String,
}

impl ValueFunctionBuilder {
    pub fn new(layer_size: usize, scope: &str) -> Self {
        Self {
            hidden_layers: vec![layer_size, layer_size],
            scope: scope.into(),
        }
    }

    pub fn build_vf(&self, observation_size: usize, device: &Device) -> Result<(VFunction, VarMap)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let vf = VFunction::build(observation_size, &self.hidden_layers, &vb, &self.scope)?;
        Ok((vf, varmap))
    }

    pub fn build_qf(
        &self,
        observation_size: usize,
        action_size: usize,
        device: &Device,
    ) -> Result<(QFunction, VarMap)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let qf = QFunction::build(
            observation_size,
            action_size,
            &self.hidden_layers,
            &vb,
            &self.scope,
        )?;
        Ok((qf, varmap))
    }
}
