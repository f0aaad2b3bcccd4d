//! ViT build procedure using the runtime's built-in vision transformer

use crate::architecture::Architecture;
use crate::error::Result;
use crate::output::{ClassifierOutput, ImageClassifier};
use crate::registry::NUM_CLASSES;
use crate::weights::{LoadPolicy, WeightSource};
use candle_core::{DType, Device, Tensor};
use candle_transformers::models::vit;
use tracing::info;

/// Vision transformer with a 100-class head
pub struct ViTClassifier {
    model: vit::Model,
}

impl ImageClassifier for ViTClassifier {
    fn architecture(&self) -> Architecture {
        Architecture::ViT
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
    let spec = Architecture::ViT.checkpoint();
    info!("building vit (ViT-Base/16) from {}", spec.repo_id);
    // The ImageNet-21k backbone ships no classification head, so the head is
    // the only tensor allowed to be freshly initialized.
    let vb = source.var_builder(spec, LoadPolicy::IgnoreMissing, dtype, device)?;
    let model = vit::Model::new(&vit::Config::vit_base_patch16_224(), NUM_CLASSES, vb)?;
    Ok(Box::new(ViTClassifier { model }))
}
