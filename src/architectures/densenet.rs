//! DenseNet
//!
//! Densely-connected convolutional network, torchvision layout and tensor
//! naming. Every dense layer concatenates its output onto the running
//! feature map; transitions halve both channels and resolution.

use candle_core::{Result, Tensor, D};
use candle_nn::{
    batch_norm, conv2d_no_bias, linear, BatchNorm, Conv2d, Conv2dConfig, Linear, Module, ModuleT,
    VarBuilder,
};

const BN_EPS: f64 = 1e-5;

/// DenseNet configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Channels added by every dense layer
    pub growth_rate: usize,
    /// Dense layers per block
    pub block_layers: [usize; 4],
    /// Channels produced by the stem convolution
    pub num_init_features: usize,
    /// Bottleneck width multiplier (1x1 conv outputs `bn_size * growth_rate`)
    pub bn_size: usize,
}

impl Config {
    /// DenseNet-121
    pub fn densenet121() -> Self {
        Self {
            growth_rate: 32,
            block_layers: [6, 12, 24, 16],
            num_init_features: 64,
            bn_size: 4,
        }
    }

    /// Feature width entering the classifier, derived from the block layout
    /// rather than hardcoded.
    pub fn num_features(&self) -> usize {
        let mut features = self.num_init_features;
        for (i, layers) in self.block_layers.iter().enumerate() {
            features += layers * self.growth_rate;
            if i + 1 != self.block_layers.len() {
                features /= 2;
            }
        }
        features
    }
}

#[derive(Debug)]
struct DenseLayer {
    norm1: BatchNorm,
    conv1: Conv2d,
    norm2: BatchNorm,
    conv2: Conv2d,
}

impl DenseLayer {
    fn new(in_features: usize, growth_rate: usize, bn_size: usize, vb: VarBuilder) -> Result<Self> {
        let inter = bn_size * growth_rate;
        let norm1 = batch_norm(in_features, BN_EPS, vb.pp("norm1"))?;
        let conv1 = conv2d_no_bias(
            in_features,
            inter,
            1,
            Conv2dConfig::default(),
            vb.pp("conv1"),
        )?;
        let norm2 = batch_norm(inter, BN_EPS, vb.pp("norm2"))?;
        let conv2 = conv2d_no_bias(
            inter,
            growth_rate,
            3,
            Conv2dConfig {
                padding: 1,
                ..Default::default()
            },
            vb.pp("conv2"),
        )?;
        Ok(Self {
            norm1,
            conv1,
            norm2,
            conv2,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = self.norm1.forward_t(xs, false)?.relu()?;
        let ys = self.conv1.forward(&ys)?;
        let ys = self.norm2.forward_t(&ys, false)?.relu()?;
        self.conv2.forward(&ys)
    }
}

#[derive(Debug)]
struct Transition {
    norm: BatchNorm,
    conv: Conv2d,
}

impl Transition {
    fn new(in_features: usize, out_features: usize, vb: VarBuilder) -> Result<Self> {
        let norm = batch_norm(in_features, BN_EPS, vb.pp("norm"))?;
        let conv = conv2d_no_bias(
            in_features,
            out_features,
            1,
            Conv2dConfig::default(),
            vb.pp("conv"),
        )?;
        Ok(Self { norm, conv })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = self.norm.forward_t(xs, false)?.relu()?;
        self.conv.forward(&ys)?.avg_pool2d(2)
    }
}

/// DenseNet classifier
#[derive(Debug)]
pub struct DenseNet {
    conv0: Conv2d,
    norm0: BatchNorm,
    blocks: Vec<Vec<DenseLayer>>,
    transitions: Vec<Transition>,
    norm5: BatchNorm,
    classifier: Linear,
}

impl DenseNet {
    pub fn new(cfg: &Config, num_classes: usize, vb: VarBuilder) -> Result<Self> {
        let fvb = vb.pp("features");
        let conv0 = conv2d_no_bias(
            3,
            cfg.num_init_features,
            7,
            Conv2dConfig {
                stride: 2,
                padding: 3,
                ..Default::default()
            },
            fvb.pp("conv0"),
        )?;
        let norm0 = batch_norm(cfg.num_init_features, BN_EPS, fvb.pp("norm0"))?;

        let mut blocks = Vec::with_capacity(cfg.block_layers.len());
        let mut transitions = Vec::new();
        let mut features = cfg.num_init_features;
        for (b, &num_layers) in cfg.block_layers.iter().enumerate() {
            let bvb = fvb.pp(format!("denseblock{}", b + 1));
            let mut layers = Vec::with_capacity(num_layers);
            for l in 0..num_layers {
                layers.push(DenseLayer::new(
                    features + l * cfg.growth_rate,
                    cfg.growth_rate,
                    cfg.bn_size,
                    bvb.pp(format!("denselayer{}", l + 1)),
                )?);
            }
            blocks.push(layers);
            features += num_layers * cfg.growth_rate;
            if b + 1 != cfg.block_layers.len() {
                transitions.push(Transition::new(
                    features,
                    features / 2,
                    fvb.pp(format!("transition{}", b + 1)),
                )?);
                features /= 2;
            }
        }

        let norm5 = batch_norm(features, BN_EPS, fvb.pp("norm5"))?;
        let classifier = linear(features, num_classes, vb.pp("classifier"))?;
        Ok(Self {
            conv0,
            norm0,
            blocks,
            transitions,
            norm5,
            classifier,
        })
    }
}

impl Module for DenseNet {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = self.conv0.forward(xs)?;
        let ys = self.norm0.forward_t(&ys, false)?.relu()?;
        // 3x3 stride-2 max pool with padding 1
        let ys = ys.pad_with_zeros(2, 1, 1)?.pad_with_zeros(3, 1, 1)?;
        let mut ys = ys.max_pool2d_with_stride(3, 2)?;
        for (b, block) in self.blocks.iter().enumerate() {
            for layer in block {
                let new = layer.forward(&ys)?;
                ys = Tensor::cat(&[&ys, &new], 1)?;
            }
            if let Some(transition) = self.transitions.get(b) {
                ys = transition.forward(&ys)?;
            }
        }
        let ys = self.norm5.forward_t(&ys, false)?.relu()?;
        let ys = ys.mean(D::Minus1)?.mean(D::Minus1)?;
        self.classifier.forward(&ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_core::{DType, Device};

    #[test]
    fn densenet121_feature_width() {
        assert_eq!(Config::densenet121().num_features(), 1024);
    }

    #[test]
    fn tiny_densenet_forward_shape() {
        let cfg = Config {
            growth_rate: 2,
            block_layers: [1, 1, 1, 1],
            num_init_features: 4,
            bn_size: 2,
        };
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);
        let model = DenseNet::new(&cfg, 10, vb).unwrap();
        let xs = Tensor::zeros((2, 3, 32, 32), DType::F32, &Device::Cpu).unwrap();
        let ys = model.forward(&xs).unwrap();
        assert_eq!(ys.dims(), &[2, 10]);
    }

    #[test]
    fn classifier_width_follows_config() {
        let cfg = Config {
            growth_rate: 2,
            block_layers: [1, 1, 1, 1],
            num_init_features: 4,
            bn_size: 2,
        };
        // 4 +2 -> /2 = 3, +2 -> /2 = 2, +2 -> /2 = 2, +2 = 4
        assert_eq!(cfg.num_features(), 4);
    }
}
