//! vision-zoo
//!
//! Pretrained vision backbones with a replaceable 100-class classification
//! head. Five architecture families are supported — ViT, Swin, ConvNeXt,
//! DenseNet and EfficientNet — and every built model is returned behind one
//! [`ImageClassifier`] contract whose forward pass yields a
//! [`ClassifierOutput`] record with a `logits` field of shape
//! `(batch, 100)`.
//!
//! ```no_run
//! use vision_zoo::{build_model, ImageClassifier};
//!
//! # fn run(images: &candle_core::Tensor) -> vision_zoo::Result<()> {
//! let model = build_model("ViT")?;
//! let output = model.forward(images)?;
//! assert_eq!(output.logits.dim(1)?, vision_zoo::NUM_CLASSES);
//! # Ok(())
//! # }
//! ```
//!
//! Weight retrieval is an injected capability: [`ModelFactory`] accepts any
//! [`WeightSource`], and [`ZeroWeightSource`] builds every architecture
//! offline.

pub mod architecture;
pub mod architectures;
pub mod builder;
pub mod error;
pub mod output;
pub mod registry;
pub mod weights;

pub use architecture::Architecture;
pub use builder::{build_model, ModelFactory};
pub use error::{ModelError, Result};
pub use output::{ClassifierOutput, ImageClassifier, LogitsAdapter};
pub use registry::{CheckpointSpec, NUM_CLASSES};
pub use weights::{HubWeightSource, LoadPolicy, WeightSource, ZeroWeightSource};
