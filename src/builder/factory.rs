//! Model factory dispatching names to build procedures

use crate::architecture::Architecture;
use crate::error::Result;
use crate::output::ImageClassifier;
use crate::weights::{HubWeightSource, WeightSource};
use candle_core::{DType, Device};
use tracing::debug;

/// Factory for ready-to-fine-tune classifiers.
///
/// Owns the weight source, target device and dtype; each `build` call
/// constructs an independent model instance and hands it over entirely.
pub struct ModelFactory {
    source: Box<dyn WeightSource>,
    device: Device,
    dtype: DType,
}

impl ModelFactory {
    /// Create a factory over the given weight source, on CUDA when
    /// available, in f32.
    pub fn new(source: impl WeightSource + 'static) -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        Self {
            source: Box::new(source),
            device,
            dtype: DType::F32,
        }
    }

    /// Create a factory fetching pretrained weights through the hub cache
    pub fn from_hub() -> Self {
        Self::new(HubWeightSource::new())
    }

    /// Override the target device
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Override the parameter dtype
    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    /// Target device models are built on
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Build a classifier from a case-insensitive model name.
    ///
    /// Unknown names fail here, before any weight fetch.
    pub fn build(&self, name: &str) -> Result<Box<dyn ImageClassifier>> {
        let arch = Architecture::parse(name)?;
        self.build_architecture(arch)
    }

    /// Build a classifier for a known architecture
    pub fn build_architecture(&self, arch: Architecture) -> Result<Box<dyn ImageClassifier>> {
        debug!("dispatching build for {arch}");
        let source = self.source.as_ref();
        match arch {
            Architecture::ViT => super::vit::build(source, self.dtype, &self.device),
            Architecture::Swin => super::swin::build(source, self.dtype, &self.device),
            Architecture::ConvNext => super::convnext::build(source, self.dtype, &self.device),
            Architecture::DenseNet => super::densenet::build(source, self.dtype, &self.device),
            Architecture::EfficientNet => {
                super::efficientnet::build(source, self.dtype, &self.device)
            }
        }
    }
}

/// Build a classifier from a case-insensitive model name, fetching
/// pretrained weights through the hub cache.
///
/// The sole one-shot entry point: returns a fully formed classifier or
/// fails, with nothing constructed and no weights fetched on an unknown
/// name.
pub fn build_model(name: &str) -> Result<Box<dyn ImageClassifier>> {
    let arch = Architecture::parse(name)?;
    ModelFactory::from_hub().build_architecture(arch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;
    use crate::weights::ZeroWeightSource;

    #[test]
    fn unknown_name_fails_before_any_construction() {
        let err = build_model("resnet").err().unwrap();
        match err {
            ModelError::UnknownModel { name } => assert_eq!(name, "resnet"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn factory_rejects_unknown_names_with_original_case() {
        let factory = ModelFactory::new(ZeroWeightSource).with_device(Device::Cpu);
        let err = factory.build("AlexNet").err().unwrap();
        assert_eq!(err.to_string(), "unknown model name: AlexNet");
    }
}
