//! Swin transformer (v1)
//!
//! Shifted-window attention classifier, HuggingFace tensor naming. Attention
//! runs inside non-overlapping windows; every second block shifts the window
//! grid by half a window and masks cross-boundary pairs; patch merging halves
//! the resolution and doubles the channel width between stages.
//!
//! Input resolution must be divisible by `patch_size * window_size` at every
//! stage (the 224px configuration is); partial-window padding is not
//! implemented.

use candle_core::{Device, Result, Tensor, D};
use candle_nn::{
    conv2d, layer_norm, linear, linear_no_bias, Conv2d, Conv2dConfig, LayerNorm, Linear, Module,
    VarBuilder,
};

/// Swin configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub image_size: usize,
    pub patch_size: usize,
    pub num_channels: usize,
    pub embed_dim: usize,
    pub depths: Vec<usize>,
    pub num_heads: Vec<usize>,
    pub window_size: usize,
    pub mlp_ratio: usize,
    pub qkv_bias: bool,
    pub layer_norm_eps: f64,
}

impl Config {
    /// Swin-Base, patch 4, window 7, 224px
    pub fn swin_base_patch4_window7_224() -> Self {
        Self {
            image_size: 224,
            patch_size: 4,
            num_channels: 3,
            embed_dim: 128,
            depths: vec![2, 2, 18, 2],
            num_heads: vec![4, 8, 16, 32],
            window_size: 7,
            mlp_ratio: 4,
            qkv_bias: true,
            layer_norm_eps: 1e-5,
        }
    }

    /// Channel width after the final stage
    pub fn num_features(&self) -> usize {
        self.embed_dim << (self.depths.len() - 1)
    }
}

/// Cyclic shift toward higher indices along `dim`
fn roll(xs: &Tensor, shift: usize, dim: usize) -> Result<Tensor> {
    let len = xs.dim(dim)?;
    let shift = shift % len;
    if shift == 0 {
        return Ok(xs.clone());
    }
    let tail = xs.narrow(dim, len - shift, shift)?;
    let head = xs.narrow(dim, 0, len - shift)?;
    Tensor::cat(&[&tail, &head], dim)
}

/// Pairwise relative-position lookup indices for a `window x window` grid
fn relative_position_index(window: usize, device: &Device) -> Result<Tensor> {
    let n = window * window;
    let span = 2 * window as i64 - 1;
    let mut idx = Vec::with_capacity(n * n);
    for i in 0..n {
        let (ih, iw) = ((i / window) as i64, (i % window) as i64);
        for j in 0..n {
            let (jh, jw) = ((j / window) as i64, (j % window) as i64);
            let dh = ih - jh + window as i64 - 1;
            let dw = iw - jw + window as i64 - 1;
            idx.push((dh * span + dw) as u32);
        }
    }
    Tensor::from_vec(idx, n * n, device)
}

/// Attention mask for shifted windows: token pairs that came from different
/// regions of the unshifted map attend with a large negative bias.
fn shift_attention_mask(
    resolution: usize,
    window: usize,
    shift: usize,
    device: &Device,
) -> Result<Tensor> {
    let r = resolution;
    let mut region = vec![0i32; r * r];
    let bounds = [0, r - window, r - shift, r];
    let mut id = 0i32;
    for hi in 0..3 {
        for wi in 0..3 {
            for h in bounds[hi]..bounds[hi + 1] {
                for w in bounds[wi]..bounds[wi + 1] {
                    region[h * r + w] = id;
                }
            }
            id += 1;
        }
    }

    let grid = r / window;
    let n = window * window;
    let mut mask = vec![0f32; grid * grid * n * n];
    let mut window_ids = vec![0i32; n];
    for wh in 0..grid {
        for ww in 0..grid {
            let widx = wh * grid + ww;
            for a in 0..window {
                for b in 0..window {
                    window_ids[a * window + b] = region[(wh * window + a) * r + ww * window + b];
                }
            }
            for i in 0..n {
                for j in 0..n {
                    if window_ids[i] != window_ids[j] {
                        mask[(widx * n + i) * n + j] = -100.0;
                    }
                }
            }
        }
    }
    Tensor::from_vec(mask, (grid * grid, n, n), device)
}

#[derive(Debug)]
struct PatchEmbed {
    proj: Conv2d,
    norm: LayerNorm,
}

impl PatchEmbed {
    fn new(cfg: &Config, vb: VarBuilder) -> Result<Self> {
        let proj = conv2d(
            cfg.num_channels,
            cfg.embed_dim,
            cfg.patch_size,
            Conv2dConfig {
                stride: cfg.patch_size,
                ..Default::default()
            },
            vb.pp("patch_embeddings.projection"),
        )?;
        let norm = layer_norm(cfg.embed_dim, cfg.layer_norm_eps, vb.pp("norm"))?;
        Ok(Self { proj, norm })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let ys = self.proj.forward(xs)?;
        let ys = ys.flatten_from(2)?.transpose(1, 2)?.contiguous()?;
        self.norm.forward(&ys)
    }
}

#[derive(Debug)]
struct WindowAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    proj: Linear,
    relative_bias: Tensor,
    num_heads: usize,
    scale: f64,
}

impl WindowAttention {
    fn new(
        dim: usize,
        num_heads: usize,
        window: usize,
        qkv_bias: bool,
        vb: VarBuilder,
    ) -> Result<Self> {
        let avb = vb.pp("attention.self");
        let (query, key, value) = if qkv_bias {
            (
                linear(dim, dim, avb.pp("query"))?,
                linear(dim, dim, avb.pp("key"))?,
                linear(dim, dim, avb.pp("value"))?,
            )
        } else {
            (
                linear_no_bias(dim, dim, avb.pp("query"))?,
                linear_no_bias(dim, dim, avb.pp("key"))?,
                linear_no_bias(dim, dim, avb.pp("value"))?,
            )
        };
        let span = 2 * window - 1;
        let table = avb.get((span * span, num_heads), "relative_position_bias_table")?;
        let n = window * window;
        let index = relative_position_index(window, avb.device())?;
        // (n*n, heads) -> (heads, n, n)
        let relative_bias = table
            .index_select(&index, 0)?
            .reshape((n, n, num_heads))?
            .transpose(1, 2)?
            .transpose(0, 1)?
            .contiguous()?
            .unsqueeze(0)?;
        let proj = linear(dim, dim, vb.pp("attention.output.dense"))?;
        let head_dim = dim / num_heads;
        Ok(Self {
            query,
            key,
            value,
            proj,
            relative_bias,
            num_heads,
            scale: (head_dim as f64).powf(-0.5),
        })
    }

    /// `xs` is `(batch * windows, window^2, dim)`; the optional mask is
    /// `(windows, window^2, window^2)`.
    fn forward(&self, xs: &Tensor, mask: Option<&Tensor>) -> Result<Tensor> {
        let (bw, n, c) = xs.dims3()?;
        let h = self.num_heads;
        let d = c / h;
        let q = self
            .query
            .forward(xs)?
            .reshape((bw, n, h, d))?
            .transpose(1, 2)?
            .contiguous()?;
        let k = self
            .key
            .forward(xs)?
            .reshape((bw, n, h, d))?
            .transpose(1, 2)?
            .contiguous()?;
        let v = self
            .value
            .forward(xs)?
            .reshape((bw, n, h, d))?
            .transpose(1, 2)?
            .contiguous()?;

        let attn = (q.matmul(&k.transpose(2, 3)?.contiguous()?)? * self.scale)?;
        let attn = attn.broadcast_add(&self.relative_bias)?;
        let attn = match mask {
            Some(mask) => {
                let windows = mask.dim(0)?;
                let mask = mask.unsqueeze(1)?.unsqueeze(0)?;
                attn.reshape((bw / windows, windows, h, n, n))?
                    .broadcast_add(&mask)?
                    .reshape((bw, h, n, n))?
            }
            None => attn,
        };
        let attn = candle_nn::ops::softmax(&attn, D::Minus1)?;
        let out = attn
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((bw, n, c))?;
        self.proj.forward(&out)
    }
}

#[derive(Debug)]
struct SwinBlock {
    norm1: LayerNorm,
    attn: WindowAttention,
    norm2: LayerNorm,
    fc1: Linear,
    fc2: Linear,
    resolution: usize,
    window: usize,
    shift: usize,
    attn_mask: Option<Tensor>,
}

impl SwinBlock {
    #[allow(clippy::too_many_arguments)]
    fn new(
        dim: usize,
        resolution: usize,
        num_heads: usize,
        window_size: usize,
        shifted: bool,
        cfg: &Config,
        vb: VarBuilder,
    ) -> Result<Self> {
        let window = window_size.min(resolution);
        let shift = if shifted && resolution > window {
            window / 2
        } else {
            0
        };
        let norm1 = layer_norm(dim, cfg.layer_norm_eps, vb.pp("layernorm_before"))?;
        let attn = WindowAttention::new(dim, num_heads, window, cfg.qkv_bias, vb.clone())?;
        let norm2 = layer_norm(dim, cfg.layer_norm_eps, vb.pp("layernorm_after"))?;
        let hidden = dim * cfg.mlp_ratio;
        let fc1 = linear(dim, hidden, vb.pp("intermediate.dense"))?;
        let fc2 = linear(hidden, dim, vb.pp("output.dense"))?;
        let attn_mask = if shift > 0 {
            Some(shift_attention_mask(
                resolution,
                window,
                shift,
                vb.device(),
            )?)
        } else {
            None
        };
        Ok(Self {
            norm1,
            attn,
            norm2,
            fc1,
            fc2,
            resolution,
            window,
            shift,
            attn_mask,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (b, l, c) = xs.dims3()?;
        let r = self.resolution;
        let w = self.window;
        let grid = r / w;

        let x = self.norm1.forward(xs)?.reshape((b, r, r, c))?;
        let x = if self.shift > 0 {
            let x = roll(&x, r - self.shift, 1)?;
            roll(&x, r - self.shift, 2)?
        } else {
            x
        };
        // partition into windows
        let x = x
            .reshape((b, grid, w, grid, w, c))?
            .transpose(2, 3)?
            .contiguous()?
            .reshape((b * grid * grid, w * w, c))?;
        let x = self.attn.forward(&x, self.attn_mask.as_ref())?;
        // merge windows back
        let x = x
            .reshape((b, grid, grid, w, w, c))?
            .transpose(2, 3)?
            .contiguous()?
            .reshape((b, r, r, c))?;
        let x = if self.shift > 0 {
            let x = roll(&x, self.shift, 1)?;
            roll(&x, self.shift, 2)?
        } else {
            x
        };
        let x = (xs + x.reshape((b, l, c))?)?;

        let y = self.norm2.forward(&x)?;
        let y = self.fc1.forward(&y)?.gelu_erf()?;
        let y = self.fc2.forward(&y)?;
        x + y
    }
}

#[derive(Debug)]
struct PatchMerging {
    norm: LayerNorm,
    reduction: Linear,
    resolution: usize,
}

impl PatchMerging {
    fn new(dim: usize, resolution: usize, eps: f64, vb: VarBuilder) -> Result<Self> {
        let norm = layer_norm(4 * dim, eps, vb.pp("norm"))?;
        let reduction = linear_no_bias(4 * dim, 2 * dim, vb.pp("reduction"))?;
        Ok(Self {
            norm,
            reduction,
            resolution,
        })
    }

    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (b, _l, c) = xs.dims3()?;
        let r = self.resolution;
        let half = r / 2;
        let x = xs.reshape((b, half, 2, half, 2, c))?;
        let quadrant = |row: usize, col: usize| -> Result<Tensor> {
            x.narrow(2, row, 1)?
                .narrow(4, col, 1)?
                .contiguous()?
                .reshape((b, half * half, c))
        };
        let x = Tensor::cat(
            &[
                &quadrant(0, 0)?,
                &quadrant(1, 0)?,
                &quadrant(0, 1)?,
                &quadrant(1, 1)?,
            ],
            D::Minus1,
        )?;
        let x = self.norm.forward(&x)?;
        self.reduction.forward(&x)
    }
}

#[derive(Debug)]
struct Stage {
    blocks: Vec<SwinBlock>,
    downsample: Option<PatchMerging>,
}

/// Swin classifier
#[derive(Debug)]
pub struct Swin {
    patch_embed: PatchEmbed,
    stages: Vec<Stage>,
    norm: LayerNorm,
    head: Linear,
}

impl Swin {
    pub fn new(cfg: &Config, num_classes: usize, vb: VarBuilder) -> Result<Self> {
        let svb = vb.pp("swin");
        let patch_embed = PatchEmbed::new(cfg, svb.pp("embeddings"))?;
        let grid = cfg.image_size / cfg.patch_size;

        let mut stages = Vec::with_capacity(cfg.depths.len());
        for (i, &depth) in cfg.depths.iter().enumerate() {
            let dim = cfg.embed_dim << i;
            let resolution = grid >> i;
            let lvb = svb.pp(format!("encoder.layers.{i}"));
            let mut blocks = Vec::with_capacity(depth);
            for j in 0..depth {
                blocks.push(SwinBlock::new(
                    dim,
                    resolution,
                    cfg.num_heads[i],
                    cfg.window_size,
                    j % 2 == 1,
                    cfg,
                    lvb.pp(format!("blocks.{j}")),
                )?);
            }
            let downsample = if i + 1 != cfg.depths.len() {
                Some(PatchMerging::new(
                    dim,
                    resolution,
                    cfg.layer_norm_eps,
                    lvb.pp("downsample"),
                )?)
            } else {
                None
            };
            stages.push(Stage { blocks, downsample });
        }

        let norm = layer_norm(cfg.num_features(), cfg.layer_norm_eps, svb.pp("layernorm"))?;
        let head = linear(cfg.num_features(), num_classes, vb.pp("classifier"))?;
        Ok(Self {
            patch_embed,
            stages,
            norm,
            head,
        })
    }

    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut x = self.patch_embed.forward(xs)?;
        for stage in &self.stages {
            for block in &stage.blocks {
                x = block.forward(&x)?;
            }
            if let Some(downsample) = &stage.downsample {
                x = downsample.forward(&x)?;
            }
        }
        let x = self.norm.forward(&x)?;
        let x = x.mean(1)?;
        self.head.forward(&x)
    }
}
