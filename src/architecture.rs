//! Supported model architectures

use crate::error::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Architecture enumeration
///
/// Every supported backbone family has a variant here; the factory dispatches
/// on this enum so an unsupported family cannot slip past a `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Architecture {
    /// Vision transformer (ViT-Base, patch 16)
    ViT,
    /// Shifted-window transformer (Swin-Base, patch 4, window 7)
    Swin,
    /// Convolutional hierarchy (ConvNeXt-Base)
    ConvNext,
    /// Densely-connected convolutional network (DenseNet-121)
    DenseNet,
    /// Compound-scaled convolutional network (EfficientNet-B0)
    EfficientNet,
}

impl Architecture {
    /// All supported architectures, in registry order
    pub const ALL: [Architecture; 5] = [
        Architecture::ViT,
        Architecture::Swin,
        Architecture::ConvNext,
        Architecture::DenseNet,
        Architecture::EfficientNet,
    ];

    /// Canonical lowercase identifier
    pub fn name(&self) -> &'static str {
        match self {
            Architecture::ViT => "vit",
            Architecture::Swin => "swin",
            Architecture::ConvNext => "convnext",
            Architecture::DenseNet => "densenet",
            Architecture::EfficientNet => "efficientnet",
        }
    }

    /// Parse a model name, case-insensitively.
    ///
    /// The error keeps the name exactly as the caller wrote it.
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "vit" => Ok(Architecture::ViT),
            "swin" => Ok(Architecture::Swin),
            "convnext" => Ok(Architecture::ConvNext),
            "densenet" => Ok(Architecture::DenseNet),
            "efficientnet" => Ok(Architecture::EfficientNet),
            _ => Err(ModelError::unknown_model(name)),
        }
    }

    /// Whether the underlying module returns a raw logits tensor that needs
    /// the [`LogitsAdapter`](crate::output::LogitsAdapter) to expose the
    /// labeled output record.
    pub fn needs_logits_adapter(&self) -> bool {
        matches!(self, Architecture::DenseNet | Architecture::EfficientNet)
    }
}

impl FromStr for Architecture {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        Architecture::parse(s)
    }
}

impl std::fmt::Display for Architecture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Architecture::parse("ViT").unwrap(), Architecture::ViT);
        assert_eq!(Architecture::parse("SWIN").unwrap(), Architecture::Swin);
        assert_eq!(
            Architecture::parse("ConvNext").unwrap(),
            Architecture::ConvNext
        );
        assert_eq!(
            Architecture::parse("densenet").unwrap(),
            Architecture::DenseNet
        );
        assert_eq!(
            Architecture::parse("EfficientNet").unwrap(),
            Architecture::EfficientNet
        );
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = Architecture::parse("resnet").unwrap_err();
        match err {
            ModelError::UnknownModel { name } => assert_eq!(name, "resnet"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn error_preserves_original_case() {
        let err = Architecture::parse("ResNet-50").unwrap_err();
        assert_eq!(err.to_string(), "unknown model name: ResNet-50");
    }

    #[test]
    fn display_roundtrips_through_parse() {
        for arch in Architecture::ALL {
            assert_eq!(Architecture::parse(&arch.to_string()).unwrap(), arch);
        }
    }

    #[test]
    fn adapter_applies_to_the_convolutional_wrapper_paths() {
        assert!(!Architecture::ViT.needs_logits_adapter());
        assert!(!Architecture::Swin.needs_logits_adapter());
        assert!(!Architecture::ConvNext.needs_logits_adapter());
        assert!(Architecture::DenseNet.needs_logits_adapter());
        assert!(Architecture::EfficientNet.needs_logits_adapter());
    }
}
