//! Weight sources and checkpoint load policies
//!
//! The factory never talks to the network directly: it receives a
//! [`WeightSource`] and asks it for a `VarBuilder` over the checkpoint
//! tensors. [`HubWeightSource`] downloads safetensors through the hub cache;
//! [`ZeroWeightSource`] materializes all-zero tensors so construction can be
//! exercised offline.

use crate::error::{ModelError, Result};
use crate::registry::CheckpointSpec;
use candle_core::{DType, Device, Shape, Tensor};
use candle_nn::var_builder::SimpleBackend;
use candle_nn::VarBuilder;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info};

/// How checkpoint tensors map onto the model being built.
///
/// The pretraining heads never match a 100-class task, and each architecture
/// family resolves that differently; the policy keeps those behaviors apart
/// instead of silently accepting drift everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Every requested tensor must exist with the exact shape.
    Strict,
    /// Missing tensors are freshly initialized; present tensors must match.
    IgnoreMissing,
    /// Missing or shape-mismatched tensors are freshly initialized.
    IgnoreMismatched,
    /// Tensors under any of these name prefixes are always freshly
    /// initialized; everything else is strict.
    ReinitHead(&'static [&'static str]),
}

/// Provider of checkpoint tensors for model construction
pub trait WeightSource {
    /// Materialize a `VarBuilder` over the checkpoint named by `spec`,
    /// applying `policy` to every tensor lookup.
    fn var_builder(
        &self,
        spec: &CheckpointSpec,
        policy: LoadPolicy,
        dtype: DType,
        device: &Device,
    ) -> Result<VarBuilder<'static>>;
}

/// Weight source backed by the HuggingFace hub download cache
#[derive(Debug, Default, Clone)]
pub struct HubWeightSource {
    cache_dir: Option<PathBuf>,
    token: Option<String>,
}

impl HubWeightSource {
    /// Create a source using the default hub cache location
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the hub cache directory
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Authenticate hub requests with a token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Download (or reuse from cache) the checkpoint file
    fn fetch(&self, spec: &CheckpointSpec) -> Result<PathBuf> {
        let mut builder = hf_hub::api::sync::ApiBuilder::new();
        if let Some(dir) = &self.cache_dir {
            builder = builder.with_cache_dir(dir.clone());
        }
        if self.token.is_some() {
            builder = builder.with_token(self.token.clone());
        }
        let api = builder
            .build()
            .map_err(|e| ModelError::weights(format!("failed to create hub client: {e}")))?;
        let repo = api.model(spec.repo_id.to_string());
        repo.get(spec.filename).map_err(|e| {
            ModelError::weights(format!(
                "failed to fetch {}/{}: {e}",
                spec.repo_id, spec.filename
            ))
        })
    }
}

impl WeightSource for HubWeightSource {
    fn var_builder(
        &self,
        spec: &CheckpointSpec,
        policy: LoadPolicy,
        dtype: DType,
        device: &Device,
    ) -> Result<VarBuilder<'static>> {
        info!("📦 loading {} from {}", spec.filename, spec.repo_id);
        let path = self.fetch(spec)?;
        let tensors = candle_core::safetensors::load(&path, device)?;
        debug!("checkpoint holds {} tensors", tensors.len());
        let backend = CheckpointBackend::new(tensors, policy, spec.strip_request_prefix);
        Ok(VarBuilder::from_backend(
            Box::new(backend),
            dtype,
            device.clone(),
        ))
    }
}

/// Weight source returning all-zero tensors, for offline construction
#[derive(Debug, Default, Clone)]
pub struct ZeroWeightSource;

impl WeightSource for ZeroWeightSource {
    fn var_builder(
        &self,
        _spec: &CheckpointSpec,
        _policy: LoadPolicy,
        dtype: DType,
        device: &Device,
    ) -> Result<VarBuilder<'static>> {
        Ok(VarBuilder::zeros(dtype, device))
    }
}

const HEAD_INIT_STD: f32 = 0.02;

/// Fresh initialization for tensors not taken from the checkpoint:
/// truncated-normal weights, zero biases.
fn fresh_tensor(s: &Shape, dtype: DType, dev: &Device) -> candle_core::Result<Tensor> {
    if s.rank() <= 1 {
        Tensor::zeros(s, dtype, dev)
    } else {
        Tensor::randn(0f32, HEAD_INIT_STD, s, dev)?.to_dtype(dtype)
    }
}

/// VarBuilder backend serving checkpoint tensors under a [`LoadPolicy`]
struct CheckpointBackend {
    tensors: HashMap<String, Tensor>,
    policy: LoadPolicy,
    strip_prefix: Option<&'static str>,
}

impl CheckpointBackend {
    fn new(
        tensors: HashMap<String, Tensor>,
        policy: LoadPolicy,
        strip_prefix: Option<&'static str>,
    ) -> Self {
        Self {
            tensors,
            policy,
            strip_prefix,
        }
    }

    /// Checkpoint key for a requested tensor name
    fn key<'a>(&self, name: &'a str) -> &'a str {
        match self.strip_prefix {
            Some(prefix) => name.strip_prefix(prefix).unwrap_or(name),
            None => name,
        }
    }
}

impl SimpleBackend for CheckpointBackend {
    fn get(
        &self,
        s: Shape,
        name: &str,
        _h: candle_nn::Init,
        dtype: DType,
        dev: &Device,
    ) -> candle_core::Result<Tensor> {
        if let LoadPolicy::ReinitHead(prefixes) = self.policy {
            if prefixes.iter().any(|p| name.starts_with(p)) {
                debug!("reinitializing head tensor {name} as {s:?}");
                return fresh_tensor(&s, dtype, dev);
            }
        }
        match self.tensors.get(self.key(name)) {
            Some(t) if t.shape() == &s => t.to_device(dev)?.to_dtype(dtype),
            Some(t) => {
                if self.policy == LoadPolicy::IgnoreMismatched {
                    debug!(
                        "shape mismatch for {name}: checkpoint {:?}, model {s:?}; reinitializing",
                        t.shape()
                    );
                    fresh_tensor(&s, dtype, dev)
                } else {
                    candle_core::bail!(
                        "shape mismatch for {name}: checkpoint {:?}, model {s:?}",
                        t.shape()
                    )
                }
            }
            None => match self.policy {
                LoadPolicy::IgnoreMissing | LoadPolicy::IgnoreMismatched => {
                    debug!("tensor {name} missing from checkpoint; reinitializing");
                    fresh_tensor(&s, dtype, dev)
                }
                _ => Err(candle_core::Error::CannotFindTensor {
                    path: name.to_string(),
                }
                .bt()),
            },
        }
    }

    fn get_unchecked(&self, name: &str, dtype: DType, dev: &Device) -> candle_core::Result<Tensor> {
        match self.tensors.get(self.key(name)) {
            Some(t) => t.to_device(dev)?.to_dtype(dtype),
            None => Err(candle_core::Error::CannotFindTensor {
                path: name.to_string(),
            }
            .bt()),
        }
    }

    fn contains_tensor(&self, name: &str) -> bool {
        self.tensors.contains_key(self.key(name)) || !matches!(self.policy, LoadPolicy::Strict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend_vb(tensors: Vec<(&str, Tensor)>, policy: LoadPolicy) -> VarBuilder<'static> {
        let map: HashMap<String, Tensor> = tensors
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        VarBuilder::from_backend(
            Box::new(CheckpointBackend::new(map, policy, None)),
            DType::F32,
            Device::Cpu,
        )
    }

    fn ones(shape: (usize, usize)) -> Tensor {
        Tensor::ones(shape, DType::F32, &Device::Cpu).unwrap()
    }

    #[test]
    fn strict_serves_exact_matches() {
        let vb = backend_vb(vec![("w", ones((4, 4)))], LoadPolicy::Strict);
        let t = vb.get((4, 4), "w").unwrap();
        assert_eq!(t.to_vec2::<f32>().unwrap()[0][0], 1.0);
    }

    #[test]
    fn strict_rejects_missing_and_mismatched() {
        let vb = backend_vb(vec![("w", ones((4, 4)))], LoadPolicy::Strict);
        assert!(vb.get((2, 2), "w").is_err());
        assert!(vb.get((4, 4), "absent").is_err());
    }

    #[test]
    fn ignore_missing_reinitializes_only_absent_tensors() {
        let vb = backend_vb(vec![("w", ones((4, 4)))], LoadPolicy::IgnoreMissing);
        let fresh = vb.get((100, 16), "classifier.weight").unwrap();
        assert_eq!(fresh.dims(), &[100, 16]);
        // Present but mismatched still fails.
        assert!(vb.get((2, 2), "w").is_err());
    }

    #[test]
    fn ignore_mismatched_reinitializes_on_shape_conflict() {
        let vb = backend_vb(
            vec![("head.fc.weight", ones((1000, 16)))],
            LoadPolicy::IgnoreMismatched,
        );
        let fresh = vb.get((100, 16), "head.fc.weight").unwrap();
        assert_eq!(fresh.dims(), &[100, 16]);
    }

    #[test]
    fn reinit_head_is_strict_outside_the_head() {
        let vb = backend_vb(
            vec![("classifier.weight", ones((1000, 16)))],
            LoadPolicy::ReinitHead(&["classifier"]),
        );
        // Head tensors are replaced even when the checkpoint has them.
        let head = vb.get((100, 16), "classifier.weight").unwrap();
        assert_eq!(head.dims(), &[100, 16]);
        // Backbone tensors must still exist.
        assert!(vb.get((8, 8), "features.conv0.weight").is_err());
    }

    #[test]
    fn request_prefix_is_stripped_for_backbone_exports() {
        let map: HashMap<String, Tensor> =
            [("embeddings.cls_token".to_string(), ones((1, 768)))].into();
        let vb = VarBuilder::from_backend(
            Box::new(CheckpointBackend::new(
                map,
                LoadPolicy::IgnoreMissing,
                Some("vit."),
            )),
            DType::F32,
            Device::Cpu,
        );
        // The model requests with the wrapping prefix; the export stores
        // without it.
        let t = vb.get((1, 768), "vit.embeddings.cls_token").unwrap();
        assert_eq!(t.to_vec2::<f32>().unwrap()[0][0], 1.0);
        // The head lives outside the stripped prefix and is simply missing.
        let head = vb.get((100, 768), "classifier.weight").unwrap();
        assert_eq!(head.dims(), &[100, 768]);
    }

    #[test]
    fn fresh_biases_are_zero() {
        let vb = backend_vb(vec![], LoadPolicy::IgnoreMissing);
        let bias = vb.get(100, "classifier.bias").unwrap();
        assert_eq!(bias.to_vec1::<f32>().unwrap(), vec![0.0; 100]);
    }

    #[test]
    fn zero_source_serves_any_tensor() {
        let spec = crate::architecture::Architecture::ViT.checkpoint();
        let vb = ZeroWeightSource
            .var_builder(spec, LoadPolicy::Strict, DType::F32, &Device::Cpu)
            .unwrap();
        let t = vb.get((3, 3), "anything.weight").unwrap();
        assert_eq!(t.dims(), &[3, 3]);
    }
}
