//! Swin build procedure using the in-crate shifted-window transformer

use crate::architecture::Architecture;
use crate::architectures::swin::{Config, Swin};
use crate::error::Result;
use crate::output::{ClassifierOutput, ImageClassifier};
use crate::registry::NUM_CLASSES;
use crate::weights::{LoadPolicy, WeightSource};
use candle_core::{DType, Device, Tensor};
use tracing::info;

/// Shifted-window transformer with a 100-class head
pub struct SwinClassifier {
    model: Swin,
}

impl ImageClassifier for SwinClassifier {
    fn architecture(&self) -> Architecture {
        Architecture::Swin
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
    let spec = Architecture::Swin.checkpoint();
    info!("building swin (Swin-Base/4/7) from {}", spec.repo_id);
    // The checkpoint carries a 21k-class head that conflicts with the target
    // width; mismatched tensors are reinitialized.
    let vb = source.var_builder(spec, LoadPolicy::IgnoreMismatched, dtype, device)?;
    let model = Swin::new(&Config::swin_base_patch4_window7_224(), NUM_CLASSES, vb)?;
    Ok(Box::new(SwinClassifier { model }))
}
