//! Uniform classifier output contract
//!
//! Three of the supported backbones produce the labeled output record
//! natively; the convolutional wrapper paths (DenseNet, EfficientNet) return
//! a raw logits tensor and are lifted into the same contract by
//! [`LogitsAdapter`].

use crate::architecture::Architecture;
use crate::error::Result;
use candle_core::Tensor;
use candle_nn::Module;

/// Labeled output record of a classification forward pass
#[derive(Debug, Clone)]
pub struct ClassifierOutput {
    /// Raw pre-softmax class scores, shape `(batch, num_classes)`
    pub logits: Tensor,
}

/// A ready-to-use image classifier.
///
/// `images` is a `(batch, channels, height, width)` tensor already
/// preprocessed with the statistics from the architecture's
/// [`CheckpointSpec`](crate::registry::CheckpointSpec).
pub trait ImageClassifier {
    /// Architecture this classifier was built from
    fn architecture(&self) -> Architecture;

    /// Run the forward pass
    fn forward(&self, images: &Tensor) -> Result<ClassifierOutput>;
}

/// Adapter lifting a raw-tensor module into the [`ClassifierOutput`] record.
///
/// Pure relabeling: the wrapped module's output tensor becomes the `logits`
/// field untouched, and any failure of the wrapped forward pass propagates
/// unchanged.
pub struct LogitsAdapter<M> {
    inner: M,
    architecture: Architecture,
}

impl<M: Module> LogitsAdapter<M> {
    /// Wrap a module whose forward pass returns the logits tensor directly
    pub fn new(inner: M, architecture: Architecture) -> Self {
        Self {
            inner,
            architecture,
        }
    }

    /// Access the wrapped module
    pub fn inner(&self) -> &M {
        &self.inner
    }
}

impl<M: Module> ImageClassifier for LogitsAdapter<M> {
    fn architecture(&self) -> Architecture {
        self.architecture
    }

    fn forward(&self, images: &Tensor) -> Result<ClassifierOutput> {
        let logits = self.inner.forward(images)?;
        Ok(ClassifierOutput { logits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{Device, Tensor};
    use candle_nn::{Linear, Module};

    fn toy_linear() -> Linear {
        let w = Tensor::randn(0f32, 1f32, (5, 8), &Device::Cpu).unwrap();
        let b = Tensor::randn(0f32, 1f32, (5,), &Device::Cpu).unwrap();
        Linear::new(w, Some(b))
    }

    #[test]
    fn adapter_is_a_pure_relabeling() {
        let module = toy_linear();
        let xs = Tensor::randn(0f32, 1f32, (3, 8), &Device::Cpu).unwrap();
        let raw = module.forward(&xs).unwrap();

        let adapter = LogitsAdapter::new(module, Architecture::DenseNet);
        let out = adapter.forward(&xs).unwrap();

        assert_eq!(out.logits.dims(), raw.dims());
        assert_eq!(
            out.logits.to_vec2::<f32>().unwrap(),
            raw.to_vec2::<f32>().unwrap()
        );
    }

    #[test]
    fn adapter_reports_the_wrapped_architecture() {
        let adapter = LogitsAdapter::new(toy_linear(), Architecture::EfficientNet);
        assert_eq!(adapter.architecture(), Architecture::EfficientNet);
    }

    #[test]
    fn adapter_propagates_forward_failures() {
        let adapter = LogitsAdapter::new(toy_linear(), Architecture::DenseNet);
        // Mismatched inner dimension must surface the runtime error as-is.
        let bad = Tensor::randn(0f32, 1f32, (3, 4), &Device::Cpu).unwrap();
        assert!(adapter.forward(&bad).is_err());
    }
}
