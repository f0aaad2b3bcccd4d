//! Pretrained checkpoint registry
//!
//! Static metadata for the checkpoint each architecture fine-tunes from:
//! where the weights live on the hub, how many classes the checkpoint was
//! trained on, and the preprocessing statistics matching the pretraining.

use crate::architecture::Architecture;

/// Number of target classes every built classifier ends with.
pub const NUM_CLASSES: usize = 100;

/// Metadata for one pretrained checkpoint
#[derive(Debug, Clone, PartialEq)]
pub struct CheckpointSpec {
    /// Hub repository id (e.g. "google/vit-base-patch16-224-in21k")
    pub repo_id: &'static str,
    /// Weight file inside the repository
    pub filename: &'static str,
    /// Class count of the pretraining head (0 if the checkpoint ships none)
    pub original_classes: usize,
    /// Native input resolution (square)
    pub input_size: usize,
    /// Channel means used during pretraining
    pub mean: [f32; 3],
    /// Channel standard deviations used during pretraining
    pub std: [f32; 3],
    /// Model-name prefix the checkpoint keys are stored without.
    ///
    /// Backbone-only exports drop the wrapping model's prefix from their
    /// tensor names; lookups strip it from requested names to line up.
    pub strip_request_prefix: Option<&'static str>,
}

const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

static VIT_BASE_IN21K: CheckpointSpec = CheckpointSpec {
    repo_id: "google/vit-base-patch16-224-in21k",
    filename: "model.safetensors",
    // ImageNet-21k backbone released without a classification head.
    original_classes: 0,
    input_size: 224,
    mean: [0.5, 0.5, 0.5],
    std: [0.5, 0.5, 0.5],
    strip_request_prefix: Some("vit."),
};

static SWIN_BASE_IN22K: CheckpointSpec = CheckpointSpec {
    repo_id: "microsoft/swin-base-patch4-window7-224-in22k",
    filename: "model.safetensors",
    original_classes: 21841,
    input_size: 224,
    mean: IMAGENET_MEAN,
    std: IMAGENET_STD,
    strip_request_prefix: None,
};

static CONVNEXT_BASE_IN1K: CheckpointSpec = CheckpointSpec {
    repo_id: "timm/convnext_base.fb_in1k",
    filename: "model.safetensors",
    original_classes: 1000,
    input_size: 224,
    mean: IMAGENET_MEAN,
    std: IMAGENET_STD,
    strip_request_prefix: None,
};

static DENSENET121_IN1K: CheckpointSpec = CheckpointSpec {
    repo_id: "theunnecessarythings/vision_models",
    filename: "densenet121.safetensors",
    original_classes: 1000,
    input_size: 224,
    mean: IMAGENET_MEAN,
    std: IMAGENET_STD,
    strip_request_prefix: None,
};

static EFFICIENTNET_B0_IN1K: CheckpointSpec = CheckpointSpec {
    repo_id: "theunnecessarythings/vision_models",
    filename: "efficientnet_b0.safetensors",
    original_classes: 1000,
    input_size: 224,
    mean: IMAGENET_MEAN,
    std: IMAGENET_STD,
    strip_request_prefix: None,
};

impl Architecture {
    /// Pretrained checkpoint this architecture is built from
    pub fn checkpoint(&self) -> &'static CheckpointSpec {
        match self {
            Architecture::ViT => &VIT_BASE_IN21K,
            Architecture::Swin => &SWIN_BASE_IN22K,
            Architecture::ConvNext => &CONVNEXT_BASE_IN1K,
            Architecture::DenseNet => &DENSENET121_IN1K,
            Architecture::EfficientNet => &EFFICIENTNET_B0_IN1K,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_architecture_has_a_checkpoint() {
        for arch in Architecture::ALL {
            let spec = arch.checkpoint();
            assert!(!spec.repo_id.is_empty());
            assert!(spec.filename.ends_with(".safetensors"));
            assert_eq!(spec.input_size, 224);
        }
    }

    #[test]
    fn vit_backbone_ships_without_a_head() {
        assert_eq!(Architecture::ViT.checkpoint().original_classes, 0);
    }

    #[test]
    fn wrapper_paths_use_imagenet_1k_checkpoints() {
        assert_eq!(Architecture::DenseNet.checkpoint().original_classes, 1000);
        assert_eq!(
            Architecture::EfficientNet.checkpoint().original_classes,
            1000
        );
    }
}
