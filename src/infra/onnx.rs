// ============================================================
// Layer 6 — ONNX Exporter
// ============================================================
// Serialises a trained ShapeCnn as an ONNX (opset 11) graph for
// browser / onnxruntime inference.
//
// Graph layout (dropout is an identity at inference, so absent):
//
//   input [batch_size, 1, 56, 56]
//     ├─ Conv → BatchNormalization → Relu → MaxPool   (stage1)
//     ├─ Conv → BatchNormalization → Relu → MaxPool   (stage2)
//     ├─ Conv → BatchNormalization → Relu → MaxPool   (stage3)
//     ├─ Flatten(axis = 1)
//     ├─ Gemm → Relu → Gemm → Relu → Gemm
//   output [batch_size, num_classes]
//
// The batch axis is the symbolic dimension "batch_size".
// Burn stores Linear weights as [in, out], which is Gemm's B
// operand as-is (transB = 0).
//
// ONNX field numbers used below:
//   ModelProto   ir_version=1 producer_name=2 producer_version=3
//                graph=7 opset_import=8
//   GraphProto   node=1 name=2 initializer=5 input=11 output=12
//   NodeProto    input=1 output=2 name=3 op_type=4 attribute=5
//   Attribute    name=1 f=2 i=3 ints=8 type=20
//   TensorProto  dims=1 data_type=2 name=8 raw_data=9
//   ValueInfo    name=1 type=2 → tensor_type=1 → elem_type=1 shape=2
//   Dimension    dim_value=1 dim_param=2
//
// Reference: https://onnx.ai/onnx/repo-docs/IR.html

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    nn::Linear,
    prelude::*,
    tensor::Distribution,
};
use thiserror::Error;

use crate::domain::traits::ArtifactSink;
use crate::infra::protobuf::{DecodeError, PbDecoder, PbEncoder, WIRE_FIXED32, WIRE_LEN, WIRE_VARINT};
use crate::ml::model::{ConvStage, ShapeCnn};

pub const DEFAULT_FILE_NAME: &str = "shape_efficient_56x56.onnx";
pub const OPSET_VERSION: i64 = 11;
pub const IR_VERSION: i64 = 6;
pub const INPUT_NAME: &str = "input";
pub const OUTPUT_NAME: &str = "output";
pub const BATCH_AXIS: &str = "batch_size";

const PRODUCER_NAME: &str = env!("CARGO_PKG_NAME");
const PRODUCER_VERSION: &str = env!("CARGO_PKG_VERSION");

const ELEM_FLOAT: u64 = 1;

const ATTR_FLOAT: u64 = 1;
const ATTR_INT: u64 = 2;
const ATTR_INTS: u64 = 7;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("example input has shape {actual:?}, expected {expected:?}")]
    ExampleShape { expected: [usize; 4], actual: [usize; 4] },

    #[error("model produced {actual:?} for the example input, expected [1, {classes}]")]
    OutputShape { actual: [usize; 2], classes: usize },

    #[error("layer '{layer}' cannot be expressed in ONNX: {reason}")]
    UnsupportedLayer { layer: String, reason: String },

    #[error("cannot read parameter '{name}': {reason}")]
    Parameter { name: String, reason: String },

    #[error("malformed ONNX data: {0}")]
    Decode(#[from] DecodeError),

    #[error("cannot write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ─── Graph building ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Attribute {
    Int(i64),
    Float(f32),
    Ints(Vec<i64>),
}

struct Node {
    op_type:    &'static str,
    name:       String,
    inputs:     Vec<String>,
    output:     String,
    attributes: Vec<(&'static str, Attribute)>,
}

struct Initializer {
    name:   String,
    dims:   Vec<usize>,
    values: Vec<f32>,
}

/// Appends nodes in execution order, threading the previous
/// node's output into the next one.
struct GraphBuilder {
    nodes:        Vec<Node>,
    initializers: Vec<Initializer>,
    current:      String,
    channels:     usize,
}

impl GraphBuilder {
    fn new() -> Self {
        Self {
            nodes:        Vec::new(),
            initializers: Vec::new(),
            current:      INPUT_NAME.to_string(),
            channels:     1,
        }
    }

    fn push(
        &mut self,
        op_type:    &'static str,
        name:       String,
        params:     Vec<String>,
        attributes: Vec<(&'static str, Attribute)>,
    ) {
        let mut inputs = vec![self.current.clone()];
        inputs.extend(params);
        self.current = name.clone();
        self.nodes.push(Node { op_type, output: name.clone(), name, inputs, attributes });
    }

    fn initializer<Bk: Backend, const D: usize>(
        &mut self,
        name:   String,
        tensor: Tensor<Bk, D>,
    ) -> Result<String, ExportError> {
        let dims   = tensor.dims().to_vec();
        let values = tensor
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| ExportError::Parameter { name: name.clone(), reason: format!("{e:?}") })?;
        self.initializers.push(Initializer { name: name.clone(), dims, values });
        Ok(name)
    }

    fn conv_stage<Bk: Backend>(&mut self, prefix: &str, stage: &ConvStage<Bk>) -> Result<(), ExportError> {
        let weight = stage.conv.weight.val();
        let [c_out, c_in, kh, kw] = weight.dims();

        if c_in != self.channels {
            return Err(ExportError::UnsupportedLayer {
                layer:  format!("{prefix}.conv"),
                reason: format!("grouped convolution ({} input channels, weight expects {c_in})", self.channels),
            });
        }
        if kh % 2 == 0 || kw % 2 == 0 {
            return Err(ExportError::UnsupportedLayer {
                layer:  format!("{prefix}.conv"),
                reason: format!("even kernel {kh}x{kw} has no size-preserving padding"),
            });
        }

        // Conv: stride 1, padding k/2
        let mut params = vec![self.initializer(format!("{prefix}.conv.weight"), weight)?];
        if let Some(bias) = &stage.conv.bias {
            params.push(self.initializer(format!("{prefix}.conv.bias"), bias.val())?);
        }
        let (ph, pw) = ((kh / 2) as i64, (kw / 2) as i64);
        self.push("Conv", format!("{prefix}.conv"), params, vec![
            ("kernel_shape", Attribute::Ints(vec![kh as i64, kw as i64])),
            ("pads",         Attribute::Ints(vec![ph, pw, ph, pw])),
            ("strides",      Attribute::Ints(vec![1, 1])),
            ("dilations",    Attribute::Ints(vec![1, 1])),
            ("group",        Attribute::Int(1)),
        ]);

        // BatchNormalization with the running statistics
        let norm   = &stage.norm;
        let params = vec![
            self.initializer(format!("{prefix}.norm.gamma"), norm.gamma.val())?,
            self.initializer(format!("{prefix}.norm.beta"), norm.beta.val())?,
            self.initializer(format!("{prefix}.norm.running_mean"), norm.running_mean.value())?,
            self.initializer(format!("{prefix}.norm.running_var"), norm.running_var.value())?,
        ];
        // ONNX momentum weights the old statistic, Burn's the new one
        self.push("BatchNormalization", format!("{prefix}.norm"), params, vec![
            ("epsilon",  Attribute::Float(norm.epsilon as f32)),
            ("momentum", Attribute::Float((1.0 - norm.momentum) as f32)),
        ]);

        self.push("Relu", format!("{prefix}.relu"), Vec::new(), Vec::new());
        self.push("MaxPool", format!("{prefix}.pool"), Vec::new(), vec![
            ("kernel_shape", Attribute::Ints(vec![2, 2])),
            ("strides",      Attribute::Ints(vec![2, 2])),
        ]);

        self.channels = c_out;
        Ok(())
    }

    fn gemm<Bk: Backend>(&mut self, prefix: &str, linear: &Linear<Bk>, output: Option<&str>) -> Result<(), ExportError> {
        let mut params = vec![self.initializer(format!("{prefix}.weight"), linear.weight.val())?];
        if let Some(bias) = &linear.bias {
            params.push(self.initializer(format!("{prefix}.bias"), bias.val())?);
        }
        let name = output.map(str::to_string).unwrap_or_else(|| prefix.to_string());
        self.push("Gemm", name, params, vec![
            ("alpha",  Attribute::Float(1.0)),
            ("beta",   Attribute::Float(1.0)),
            ("transB", Attribute::Int(0)),
        ]);
        Ok(())
    }

    fn relu(&mut self, name: &str) {
        self.push("Relu", name.to_string(), Vec::new(), Vec::new());
    }

    fn flatten(&mut self) {
        self.push("Flatten", "flatten".to_string(), Vec::new(), vec![("axis", Attribute::Int(1))]);
    }
}

/// Lower a ShapeCnn into a GraphBuilder. Fails before anything
/// is executed if a layer has no ONNX counterpart.
fn build_graph<B: Backend>(model: &ShapeCnn<B>) -> Result<GraphBuilder, ExportError> {
    let mut graph = GraphBuilder::new();

    for (i, stage) in model.stages().into_iter().enumerate() {
        graph.conv_stage(&format!("stage{}", i + 1), stage)?;
    }
    graph.flatten();

    graph.gemm("fc1", &model.fc1, None)?;
    graph.relu("fc1.relu");
    graph.gemm("fc2", &model.fc2, None)?;
    graph.relu("fc2.relu");
    graph.gemm("fc3", &model.fc3, Some(OUTPUT_NAME))?;

    Ok(graph)
}

// ─── Encoding ─────────────────────────────────────────────────────────────────

fn encode_attribute(name: &str, value: &Attribute) -> PbEncoder {
    let mut enc = PbEncoder::new();
    enc.write_string_field(1, name);
    match value {
        Attribute::Float(f) => {
            enc.write_float_field(2, *f);
            enc.write_varint_field(20, ATTR_FLOAT);
        }
        Attribute::Int(i) => {
            enc.write_int64_field(3, *i);
            enc.write_varint_field(20, ATTR_INT);
        }
        Attribute::Ints(ints) => {
            for &i in ints {
                enc.write_int64_field(8, i);
            }
            enc.write_varint_field(20, ATTR_INTS);
        }
    }
    enc
}

fn encode_node(node: &Node) -> PbEncoder {
    let mut enc = PbEncoder::new();
    for input in &node.inputs {
        enc.write_string_field(1, input);
    }
    enc.write_string_field(2, &node.output);
    enc.write_string_field(3, &node.name);
    enc.write_string_field(4, node.op_type);
    for (name, value) in &node.attributes {
        enc.write_message_field(5, &encode_attribute(name, value));
    }
    enc
}

fn encode_initializer(init: &Initializer) -> PbEncoder {
    let mut enc = PbEncoder::new();
    for &d in &init.dims {
        enc.write_int64_field(1, d as i64);
    }
    enc.write_varint_field(2, ELEM_FLOAT);
    enc.write_string_field(8, &init.name);
    let raw: Vec<u8> = init.values.iter().flat_map(|v| v.to_le_bytes()).collect();
    enc.write_bytes_field(9, &raw);
    enc
}

fn encode_value_info(name: &str, dims: &[Dim]) -> PbEncoder {
    let mut shape = PbEncoder::new();
    for d in dims {
        let mut dim = PbEncoder::new();
        match d {
            Dim::Fixed(v)    => dim.write_int64_field(1, *v),
            Dim::Symbolic(s) => dim.write_string_field(2, s),
        }
        shape.write_message_field(1, &dim);
    }

    let mut tensor_type = PbEncoder::new();
    tensor_type.write_varint_field(1, ELEM_FLOAT);
    tensor_type.write_message_field(2, &shape);

    let mut type_proto = PbEncoder::new();
    type_proto.write_message_field(1, &tensor_type);

    let mut vi = PbEncoder::new();
    vi.write_string_field(1, name);
    vi.write_message_field(2, &type_proto);
    vi
}

fn encode_model(graph: &GraphBuilder, image_size: usize, num_classes: usize) -> Vec<u8> {
    let batch = || Dim::Symbolic(BATCH_AXIS.to_string());
    let side  = image_size as i64;

    let mut g = PbEncoder::new();
    for node in &graph.nodes {
        g.write_message_field(1, &encode_node(node));
    }
    g.write_string_field(2, "shape_cnn");
    for init in &graph.initializers {
        g.write_message_field(5, &encode_initializer(init));
    }
    g.write_message_field(11, &encode_value_info(
        INPUT_NAME,
        &[batch(), Dim::Fixed(1), Dim::Fixed(side), Dim::Fixed(side)],
    ));
    g.write_message_field(12, &encode_value_info(
        OUTPUT_NAME,
        &[batch(), Dim::Fixed(num_classes as i64)],
    ));

    let mut opset = PbEncoder::new();
    opset.write_string_field(1, "");
    opset.write_int64_field(2, OPSET_VERSION);

    let mut model = PbEncoder::new();
    model.write_int64_field(1, IR_VERSION);
    model.write_string_field(2, PRODUCER_NAME);
    model.write_string_field(3, PRODUCER_VERSION);
    model.write_message_field(7, &g);
    model.write_message_field(8, &opset);
    model.into_bytes()
}

// ─── Inspection ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dim {
    Fixed(i64),
    Symbolic(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueSummary {
    pub name: String,
    pub dims: Vec<Dim>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerSummary {
    pub name: String,
    pub dims: Vec<i64>,
    pub byte_len: usize,
}

/// What a decoded ONNX file declares: interface, ops and weights.
#[derive(Debug, Clone, Default)]
pub struct OnnxSummary {
    pub ir_version:   i64,
    pub opset:        i64,
    pub producer:     String,
    pub ops:          Vec<String>,
    pub inputs:       Vec<ValueSummary>,
    pub outputs:      Vec<ValueSummary>,
    pub initializers: Vec<InitializerSummary>,
}

impl OnnxSummary {
    pub fn input(&self, name: &str) -> Option<&ValueSummary> {
        self.inputs.iter().find(|v| v.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&ValueSummary> {
        self.outputs.iter().find(|v| v.name == name)
    }
}

/// Decode an ONNX ModelProto.
pub fn inspect(bytes: &[u8]) -> Result<OnnxSummary, DecodeError> {
    let mut summary = OnnxSummary::default();
    let mut dec     = PbDecoder::new(bytes);

    while !dec.is_empty() {
        match dec.read_tag()? {
            (1, WIRE_VARINT) => summary.ir_version = dec.read_varint()? as i64,
            (2, WIRE_LEN)    => summary.producer = dec.read_string()?,
            (7, WIRE_LEN)    => inspect_graph(dec.read_bytes()?, &mut summary)?,
            (8, WIRE_LEN)    => {
                let mut op = PbDecoder::new(dec.read_bytes()?);
                while !op.is_empty() {
                    match op.read_tag()? {
                        (2, WIRE_VARINT) => summary.opset = op.read_varint()? as i64,
                        (_, wt)          => op.skip_field(wt)?,
                    }
                }
            }
            (_, wt) => dec.skip_field(wt)?,
        }
    }
    Ok(summary)
}

/// Read and decode an ONNX file.
pub fn inspect_file(path: &Path) -> Result<OnnxSummary, ExportError> {
    let bytes = fs::read(path).map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;
    Ok(inspect(&bytes)?)
}

fn inspect_graph(bytes: &[u8], summary: &mut OnnxSummary) -> Result<(), DecodeError> {
    let mut dec = PbDecoder::new(bytes);
    while !dec.is_empty() {
        match dec.read_tag()? {
            (1, WIRE_LEN)  => summary.ops.push(node_op_type(dec.read_bytes()?)?),
            (5, WIRE_LEN)  => summary.initializers.push(inspect_initializer(dec.read_bytes()?)?),
            (11, WIRE_LEN) => summary.inputs.push(inspect_value_info(dec.read_bytes()?)?),
            (12, WIRE_LEN) => summary.outputs.push(inspect_value_info(dec.read_bytes()?)?),
            (_, wt)        => dec.skip_field(wt)?,
        }
    }
    Ok(())
}

fn node_op_type(bytes: &[u8]) -> Result<String, DecodeError> {
    let mut dec     = PbDecoder::new(bytes);
    let mut op_type = String::new();
    while !dec.is_empty() {
        match dec.read_tag()? {
            (4, WIRE_LEN) => op_type = dec.read_string()?,
            (5, WIRE_LEN) => inspect_attribute(dec.read_bytes()?)?,
            (_, wt)       => dec.skip_field(wt)?,
        }
    }
    Ok(op_type)
}

/// Attributes are only walked for well-formedness.
fn inspect_attribute(bytes: &[u8]) -> Result<(), DecodeError> {
    let mut dec = PbDecoder::new(bytes);
    while !dec.is_empty() {
        match dec.read_tag()? {
            (2, WIRE_FIXED32) => { dec.read_float()?; }
            (_, wt)           => dec.skip_field(wt)?,
        }
    }
    Ok(())
}

fn inspect_initializer(bytes: &[u8]) -> Result<InitializerSummary, DecodeError> {
    let mut dec  = PbDecoder::new(bytes);
    let mut init = InitializerSummary { name: String::new(), dims: Vec::new(), byte_len: 0 };
    while !dec.is_empty() {
        match dec.read_tag()? {
            (1, WIRE_VARINT) => init.dims.push(dec.read_varint()? as i64),
            (8, WIRE_LEN)    => init.name = dec.read_string()?,
            (9, WIRE_LEN)    => init.byte_len = dec.read_bytes()?.len(),
            (_, wt)          => dec.skip_field(wt)?,
        }
    }
    Ok(init)
}

fn inspect_value_info(bytes: &[u8]) -> Result<ValueSummary, DecodeError> {
    let mut dec   = PbDecoder::new(bytes);
    let mut value = ValueSummary { name: String::new(), dims: Vec::new() };
    while !dec.is_empty() {
        match dec.read_tag()? {
            (1, WIRE_LEN) => value.name = dec.read_string()?,
            // type → tensor_type → shape → dim*
            (2, WIRE_LEN) => {
                let tensor_type = nested_field(dec.read_bytes()?, 1)?;
                if let Some(shape) = nested_field_opt(tensor_type, 2)? {
                    let mut s = PbDecoder::new(shape);
                    while !s.is_empty() {
                        match s.read_tag()? {
                            (1, WIRE_LEN) => value.dims.push(inspect_dim(s.read_bytes()?)?),
                            (_, wt)       => s.skip_field(wt)?,
                        }
                    }
                }
            }
            (_, wt) => dec.skip_field(wt)?,
        }
    }
    Ok(value)
}

fn inspect_dim(bytes: &[u8]) -> Result<Dim, DecodeError> {
    let mut dec = PbDecoder::new(bytes);
    let mut dim = Dim::Fixed(0);
    while !dec.is_empty() {
        match dec.read_tag()? {
            (1, WIRE_VARINT) => dim = Dim::Fixed(dec.read_varint()? as i64),
            (2, WIRE_LEN)    => dim = Dim::Symbolic(dec.read_string()?),
            (_, wt)          => dec.skip_field(wt)?,
        }
    }
    Ok(dim)
}

fn nested_field(bytes: &[u8], field: u32) -> Result<&[u8], DecodeError> {
    Ok(nested_field_opt(bytes, field)?.unwrap_or(&[]))
}

fn nested_field_opt(bytes: &[u8], field: u32) -> Result<Option<&[u8]>, DecodeError> {
    let mut dec = PbDecoder::new(bytes);
    while !dec.is_empty() {
        match dec.read_tag()? {
            (f, WIRE_LEN) if f == field => return Ok(Some(dec.read_bytes()?)),
            (_, wt)                     => dec.skip_field(wt)?,
        }
    }
    Ok(None)
}

// ─── Exporter ─────────────────────────────────────────────────────────────────

/// Writes `{dir}/{file_name}` from an inference-mode model.
#[derive(Debug, Clone)]
pub struct OnnxExporter {
    image_size: usize,
    file_name:  String,
}

impl OnnxExporter {
    pub fn new(image_size: usize) -> Self {
        Self { image_size, file_name: DEFAULT_FILE_NAME.to_string() }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Trace-check `model` with `example` and write the graph to `path`.
    ///
    /// `example` must be `[1, 1, image_size, image_size]` and the
    /// forward pass must yield `[1, num_classes]`. Nothing is written
    /// unless both hold. The file appears atomically: it is written
    /// next to `path` and renamed into place.
    pub fn export_to<B: Backend>(
        &self,
        model:   &ShapeCnn<B>,
        example: Tensor<B, 4>,
        path:    &Path,
    ) -> Result<OnnxSummary, ExportError> {
        let side     = self.image_size;
        let expected = [1, 1, side, side];
        let actual   = example.dims();
        if actual != expected {
            return Err(ExportError::ExampleShape { expected, actual });
        }

        let graph = build_graph(model)?;

        let classes = model.fc3.weight.val().dims()[1];
        let out     = model.forward(example).dims();
        if out != [1, classes] {
            return Err(ExportError::OutputShape { actual: out, classes });
        }

        let bytes = encode_model(&graph, side, classes);

        let tmp = path.with_extension("onnx.part");
        fs::write(&tmp, &bytes).map_err(|source| ExportError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, path).map_err(|source| ExportError::Io { path: path.to_path_buf(), source })?;

        let summary = inspect(&bytes)?;
        tracing::info!(
            "Exported ONNX model to '{}' ({} nodes, {} initializers, {} bytes)",
            path.display(),
            summary.ops.len(),
            summary.initializers.len(),
            bytes.len(),
        );
        Ok(summary)
    }
}

impl<B: Backend> ArtifactSink<ShapeCnn<B>> for OnnxExporter {
    fn export(&self, model: &ShapeCnn<B>, dir: &Path) -> anyhow::Result<PathBuf> {
        fs::create_dir_all(dir).map_err(|source| ExportError::Io { path: dir.to_path_buf(), source })?;

        let device  = model.fc3.weight.val().device();
        let side    = self.image_size;
        let example = Tensor::<B, 4>::random([1, 1, side, side], Distribution::Default, &device);

        let path = dir.join(&self.file_name);
        self.export_to(model, example, &path)?;
        Ok(path)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::ShapeCnnConfig;
    use burn::backend::NdArray;
    use burn::nn::conv::Conv2dConfig;

    type TestBackend = NdArray;

    fn model() -> ShapeCnn<TestBackend> {
        ShapeCnnConfig::new(6).init(&Default::default())
    }

    #[test]
    fn test_export_declares_dynamic_batch_interface() {
        let dir  = tempfile::tempdir().unwrap();
        let path = ArtifactSink::export(&OnnxExporter::new(56), &model(), dir.path()).unwrap();

        assert_eq!(path, dir.path().join(DEFAULT_FILE_NAME));
        let summary = inspect_file(&path).unwrap();

        assert_eq!(summary.opset, OPSET_VERSION);
        assert_eq!(summary.ir_version, IR_VERSION);

        let batch = Dim::Symbolic(BATCH_AXIS.to_string());
        let input = summary.input(INPUT_NAME).unwrap();
        assert_eq!(input.dims, vec![batch.clone(), Dim::Fixed(1), Dim::Fixed(56), Dim::Fixed(56)]);
        let output = summary.output(OUTPUT_NAME).unwrap();
        assert_eq!(output.dims, vec![batch, Dim::Fixed(6)]);
    }

    #[test]
    fn test_graph_follows_layer_order_without_dropout() {
        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("m.onnx");
        let example = Tensor::<TestBackend, 4>::zeros([1, 1, 56, 56], &Default::default());
        let summary = OnnxExporter::new(56).export_to(&model(), example, &path).unwrap();

        let stage = ["Conv", "BatchNormalization", "Relu", "MaxPool"];
        let mut expected: Vec<&str> = stage.iter().cycle().take(12).copied().collect();
        expected.extend(["Flatten", "Gemm", "Relu", "Gemm", "Relu", "Gemm"]);
        assert_eq!(summary.ops, expected);

        // conv w+b and four BatchNorm tensors per stage, w+b per Gemm
        assert_eq!(summary.initializers.len(), 3 * 6 + 3 * 2);

        let fc1 = summary.initializers.iter().find(|i| i.name == "fc1.weight").unwrap();
        assert_eq!(fc1.dims, vec![6272, 256]);
        assert_eq!(fc1.byte_len, 6272 * 256 * 4);

        let conv = summary.initializers.iter().find(|i| i.name == "stage2.conv.weight").unwrap();
        assert_eq!(conv.dims, vec![64, 32, 3, 3]);
        assert!(!dir.path().join("m.onnx.part").exists());
    }

    #[test]
    fn test_wrong_example_shape_writes_nothing() {
        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("m.onnx");
        let example = Tensor::<TestBackend, 4>::zeros([1, 1, 28, 28], &Default::default());

        let err = OnnxExporter::new(56).export_to(&model(), example, &path).unwrap_err();
        assert!(matches!(err, ExportError::ExampleShape { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_even_kernel_is_unsupported() {
        let device    = Default::default();
        let mut model = model();
        model.stage1.conv = Conv2dConfig::new([1, 32], [2, 2]).init(&device);

        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("m.onnx");
        let example = Tensor::<TestBackend, 4>::zeros([1, 1, 56, 56], &device);

        let err = OnnxExporter::new(56).export_to(&model, example, &path).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedLayer { .. }));
        assert!(!path.exists());
    }

    /// Run an exported file on `[n, 1, side, side]` pixels.
    fn run_exported(path: &Path, pixels: Vec<f32>, n: usize, side: usize) -> (Vec<usize>, Vec<f32>) {
        use tract_onnx::prelude::*;

        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .unwrap()
            .with_input_fact(0, f32::fact([n, 1, side, side]).into())
            .unwrap()
            .into_optimized()
            .unwrap()
            .into_runnable()
            .unwrap();

        let input: Tensor = tract_ndarray::Array4::from_shape_vec((n, 1, side, side), pixels)
            .unwrap()
            .into();
        let outputs = plan.run(tvec!(input.into())).unwrap();
        let scores  = outputs[0].to_array_view::<f32>().unwrap();
        (scores.shape().to_vec(), scores.iter().copied().collect())
    }

    #[test]
    fn test_exported_graph_matches_burn_forward() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let model  = model();
        let path   = ArtifactSink::export(&OnnxExporter::new(56), &model, dir.path()).unwrap();

        let pixels: Vec<f32> = (0..3 * 56 * 56).map(|i| (i % 97) as f32 / 97.0).collect();
        let (shape, onnx_scores) = run_exported(&path, pixels.clone(), 3, 56);
        assert_eq!(shape, vec![3, 6]);

        let input = Tensor::<TestBackend, 4>::from_data(
            burn::tensor::TensorData::new(pixels, [3, 1, 56, 56]),
            &device,
        );
        let burn_scores = model.forward(input).into_data().to_vec::<f32>().unwrap();

        for (a, b) in onnx_scores.iter().zip(&burn_scores) {
            assert!((a - b).abs() < 1e-4, "onnx {a} vs burn {b}");
        }
    }

    #[test]
    fn test_inspect_rejects_truncated_file() {
        let dir     = tempfile::tempdir().unwrap();
        let path    = dir.path().join("m.onnx");
        let example = Tensor::<TestBackend, 4>::zeros([1, 1, 56, 56], &Default::default());
        OnnxExporter::new(56).export_to(&model(), example, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert!(inspect(&bytes[..bytes.len() / 2]).is_err());
    }
}
