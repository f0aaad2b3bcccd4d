//! ConvNeXt build procedure using the runtime's built-in implementation

use crate::architecture::Architecture;
use crate::error::Result;
use crate::output::{ClassifierOutput, ImageClassifier};
use crate::registry::NUM_CLASSES;
use crate::weights::{LoadPolicy, WeightSource};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Func, Module};
use candle_transformers::models::convnext;
use tracing::info;

/// ConvNeXt with a 100-class head
pub struct ConvNextClassifier {
    model: Func<'static>,
}

impl ImageClassifier for ConvNextClassifier {
    fn architecture(&self) -> Architecture {
        Architecture::ConvNext
    }

    fn forward(&self, images: &Tensor) -> Result<ClassifierOutput> {
        let logits = self.model.forward(images)?;
        Ok(ClassifierOutput { logits })
    }
}

pub(crate) fn build(
    source: &dyn WeightSource,
    dtype: DType,
    device: &Device,
) -> Result<Box<dyn ImageClassifier>> {
    let spec = Architecture::ConvNext.checkpoint();
    info!("building convnext (ConvNeXt-Base) from {}", spec.repo_id);
    // 1000-class pretraining head conflicts with the target width;
    // mismatched tensors are reinitialized.
    let vb = source.var_builder(spec, LoadPolicy::IgnoreMismatched, dtype, device)?;
    let model = convnext::convnext(&convnext::Config::base(), NUM_CLASSES, vb)?;
    Ok(Box::new(ConvNextClassifier { model }))
}
