//! EfficientNet build procedure using the runtime's built-in implementation

use crate::architecture::Architecture;
use crate::error::Result;
use crate::output::{ImageClassifier, LogitsAdapter};
use crate::registry::NUM_CLASSES;
use crate::weights::{LoadPolicy, WeightSource};
use candle_core::{DType, Device};
use candle_transformers::models::efficientnet::{EfficientNet, MBConvConfig};
use tracing::info;

/// The final linear layer inside the classification block; the backbone
/// loads strictly.
const HEAD_PREFIXES: &[&str] = &["classifier"];

pub(crate) fn build(
    source: &dyn WeightSource,
    dtype: DType,
    device: &Device,
) -> Result<Box<dyn ImageClassifier>> {
    let spec = Architecture::EfficientNet.checkpoint();
    info!(
        "building efficientnet (EfficientNet-B0) from {}; replacing {}-class head",
        spec.repo_id, spec.original_classes
    );
    let vb = source.var_builder(spec, LoadPolicy::ReinitHead(HEAD_PREFIXES), dtype, device)?;
    let model = EfficientNet::new(vb, MBConvConfig::b0(), NUM_CLASSES)?;
    // Native forward returns a raw logits tensor; lift into the labeled
    // output record.
    Ok(Box::new(LogitsAdapter::new(
        model,
        Architecture::EfficientNet,
    )))
}
