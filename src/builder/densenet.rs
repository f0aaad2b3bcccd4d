//! DenseNet build procedure using the in-crate implementation

use crate::architecture::Architecture;
use crate::architectures::densenet::{Config, DenseNet};
use crate::error::Result;
use crate::output::{ImageClassifier, LogitsAdapter};
use crate::registry::NUM_CLASSES;
use crate::weights::{LoadPolicy, WeightSource};
use candle_core::{DType, Device};
use tracing::info;

/// The classifier linear layer; everything outside it loads strictly.
const HEAD_PREFIXES: &[&str] = &["classifier"];

pub(crate) fn build(
    source: &dyn WeightSource,
    dtype: DType,
    device: &Device,
) -> Result<Box<dyn ImageClassifier>> {
    let spec = Architecture::DenseNet.checkpoint();
    let config = Config::densenet121();
    info!(
        "building densenet (DenseNet-121) from {}; replacing {}-class head with {} -> {}",
        spec.repo_id,
        spec.original_classes,
        config.num_features(),
        NUM_CLASSES
    );
    let vb = source.var_builder(spec, LoadPolicy::ReinitHead(HEAD_PREFIXES), dtype, device)?;
    let model = DenseNet::new(&config, NUM_CLASSES, vb)?;
    // Native forward returns a raw logits tensor; lift into the labeled
    // output record.
    Ok(Box::new(LogitsAdapter::new(model, Architecture::DenseNet)))
}
