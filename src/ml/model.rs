use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        loss::CrossEntropyLossConfig,
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

/// Channel widths of the three convolution stages.
pub const STAGE_CHANNELS: [usize; 3] = [32, 64, 128];

/// Width of the two hidden fully-connected layers.
pub const HIDDEN: [usize; 2] = [256, 128];

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally; do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct ShapeCnnConfig {
    pub num_classes: usize,
    #[config(default = 56)]
    pub image_size: usize,
    #[config(default = 0.25)]
    pub conv_dropout: f64,
    #[config(default = 0.5)]
    pub fc_dropout: f64,
}

impl ShapeCnnConfig {
    /// Spatial side length after the three 2x2 pools (56 → 7).
    pub fn feature_side(&self) -> usize {
        self.image_size / 8
    }

    /// Flattened feature width entering the first linear layer.
    pub fn flat_features(&self) -> usize {
        STAGE_CHANNELS[2] * self.feature_side() * self.feature_side()
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> ShapeCnn<B> {
        let [c1, c2, c3] = STAGE_CHANNELS;
        let [h1, h2]     = HIDDEN;

        ShapeCnn {
            stage1: self.build_stage(1, c1, device),
            stage2: self.build_stage(c1, c2, device),
            stage3: self.build_stage(c2, c3, device),
            fc1:    LinearConfig::new(self.flat_features(), h1).init(device),
            fc2:    LinearConfig::new(h1, h2).init(device),
            fc3:    LinearConfig::new(h2, self.num_classes).init(device),
            dropout:    DropoutConfig::new(self.fc_dropout).init(),
            activation: Relu::new(),
        }
    }

    fn build_stage<B: Backend>(&self, c_in: usize, c_out: usize, device: &B::Device) -> ConvStage<B> {
        ConvStage {
            conv: Conv2dConfig::new([c_in, c_out], [3, 3])
                .with_padding(PaddingConfig2d::Explicit(1, 1))
                .init(device),
            norm:       BatchNormConfig::new(c_out).init(device),
            pool:       MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dropout:    DropoutConfig::new(self.conv_dropout).init(),
            activation: Relu::new(),
        }
    }
}

/// Conv 3x3 (pad 1) → BatchNorm → ReLU → MaxPool 2x2 → Dropout.
/// Halves the spatial size.
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    pub conv:       Conv2d<B>,
    pub norm:       BatchNorm<B>,
    pub pool:       MaxPool2d,
    pub dropout:    Dropout,
    pub activation: Relu,
}

impl<B: Backend> ConvStage<B> {
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.norm.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool.forward(x);
        self.dropout.forward(x)
    }
}

/// Shape classifier for single-channel 56x56 drawings.
///
/// # Architecture
/// - 3 x ConvStage: 1→32→64→128 channels, 56→28→14→7 pixels
/// - Flatten: 128 * 7 * 7 = 6272
/// - FC 6272→256 + ReLU + Dropout(0.5)
/// - FC 256→128 + ReLU + Dropout(0.5)
/// - FC 128→num_classes
///
/// Dropout and BatchNorm use batch statistics only on an autodiff
/// backend; `model.valid()` gives the inference-mode network.
#[derive(Module, Debug)]
pub struct ShapeCnn<B: Backend> {
    pub stage1:     ConvStage<B>,
    pub stage2:     ConvStage<B>,
    pub stage3:     ConvStage<B>,
    pub fc1:        Linear<B>,
    pub fc2:        Linear<B>,
    pub fc3:        Linear<B>,
    pub dropout:    Dropout,
    pub activation: Relu,
}

impl<B: Backend> ShapeCnn<B> {
    /// images: [batch, 1, 56, 56] → scores: [batch, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.stage1.forward(images);
        let x = self.stage2.forward(x);
        let x = self.stage3.forward(x);

        let [batch_size, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        let x = self.dropout.forward(self.activation.forward(self.fc1.forward(x)));
        let x = self.dropout.forward(self.activation.forward(self.fc2.forward(x)));
        self.fc3.forward(x)
    }

    /// Forward pass plus mean cross-entropy against `targets`.
    pub fn forward_loss(
        &self,
        images:  Tensor<B, 4>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let scores = self.forward(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&scores.device())
            .forward(scores.clone(), targets);
        (loss, scores)
    }

    pub fn stages(&self) -> [&ConvStage<B>; 3] {
        [&self.stage1, &self.stage2, &self.stage3]
    }
}

/// Number of argmax predictions in `scores` that equal `targets`.
pub fn count_correct<B: Backend>(scores: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1], flatten to [batch]
    let predicted = scores.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}
