//! Per-architecture build procedures and the dispatching factory

mod convnext;
mod densenet;
mod efficientnet;
mod factory;
mod swin;
mod vit;

pub use convnext::ConvNextClassifier;
pub use factory::{build_model, ModelFactory};
pub use swin::SwinClassifier;
pub use vit::ViTClassifier;
