#![allow(dead_code)]

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use mvclass_core::{
    prelude::{ClassTable, Dims, Inferer, ModelKind},
    tract_core::prelude::tract_ndarray::{ArrayD, Axis, IxDyn},
};
use mvclass_runtime::{Device, ModelRuntime};
use std::{io::Cursor, sync::Mutex};

pub const CLASSES: [&str; 10] = [
    "coupling", "elbow", "tee", "cross", "union", "cap", "plug", "nipple", "bushing", "valve",
];

/// Scores the first three classes by the mean of the matching color
/// channel; the rest get a small fixed bias so rankings are total.
pub struct TestInferer {
    pub kind: ModelKind,
    pub classes: usize,
    pub seen: Mutex<Vec<Vec<usize>>>,
    inputs: Vec<(String, Dims)>,
    outputs: Vec<(String, Dims)>,
}

impl TestInferer {
    pub fn new(kind: ModelKind, classes: usize) -> Self {
        let rank = if kind.is_multiview() { 5 } else { 4 };
        Self {
            kind,
            classes,
            seen: Mutex::new(vec![]),
            inputs: vec![("input".to_owned(), vec![None; rank])],
            outputs: vec![("logits".to_owned(), vec![Some(1), Some(classes)])],
        }
    }

    pub fn seen_shapes(&self) -> Vec<Vec<usize>> {
        self.seen.lock().unwrap().clone()
    }
}

impl Inferer for TestInferer {
    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn forward(&self, input: ArrayD<f32>) -> anyhow::Result<ArrayD<f32>> {
        let expected_rank = if self.kind.is_multiview() { 5 } else { 4 };
        anyhow::ensure!(
            input.ndim() == expected_rank,
            "expected rank {} got {:?}",
            expected_rank,
            input.shape()
        );
        self.seen.lock().unwrap().push(input.shape().to_vec());

        let channel_axis = Axis(input.ndim() - 3);
        let logits: Vec<f32> = (0..self.classes)
            .map(|class| {
                let bias = class as f32 * 0.1;
                if class < 3 {
                    let mean = input.index_axis(channel_axis, class).mean().unwrap_or(0.0);
                    bias + mean * 2.0
                } else {
                    bias
                }
            })
            .collect();

        Ok(ArrayD::from_shape_vec(IxDyn(&[1, self.classes]), logits)?)
    }

    fn input_shapes(&self) -> &[(String, Dims)] {
        &self.inputs
    }

    fn output_shapes(&self) -> &[(String, Dims)] {
        &self.outputs
    }
}

pub fn class_table(count: usize) -> ClassTable {
    ClassTable::new(CLASSES[..count].iter().map(|c| c.to_string()).collect()).expect("valid table")
}

pub fn runtime(kind: ModelKind) -> ModelRuntime {
    ModelRuntime::from_parts(TestInferer::new(kind, 10), class_table(10), Device::Cpu)
        .expect("a runtime")
}

/// A solid-color PNG.
pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb(color));
    let mut bytes = Cursor::new(vec![]);
    DynamicImage::ImageRgb8(image)
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("encode png");
    bytes.into_inner()
}

pub const RED: [u8; 3] = [255, 0, 0];
pub const GREEN: [u8; 3] = [0, 255, 0];
pub const BLUE: [u8; 3] = [0, 0, 255];

/// A weight-free three-class NNEF classifier over two views.
pub const MULTI_VIEW_GRAPH: &str = r#"version 1.0;

graph network(input) -> (output)
{
  input = external<scalar>(shape = [1, 2, 3, 224, 224]);
  pooled = mean_reduce(input, axes = [1, 3, 4]);
  output = reshape(pooled, shape = [1, 3]);
}
"#;

/// [`MULTI_VIEW_GRAPH`] with a symbolic view axis, so every view count
/// compiles its own plan.
pub const VARIABLE_VIEW_GRAPH: &str = r#"version 1.0;

extension tract_symbol V;

graph network(input) -> (output)
{
  input = external<scalar>(shape = [1, V, 3, 224, 224]);
  pooled = mean_reduce(input, axes = [1, 3, 4]);
  output = reshape(pooled, shape = [1, 3]);
}
"#;

pub fn nnef_tar(graph: &str) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(graph.len() as u64);
    header.set_mode(0o644);
    builder
        .append_data(&mut header, "graph.nnef", graph.as_bytes())
        .expect("append graph");

    builder.into_inner().expect("finish archive")
}

/// Lets a test keep a handle on the inferer after the runtime takes it.
pub struct Shared(pub std::sync::Arc<TestInferer>);

impl Inferer for Shared {
    fn kind(&self) -> ModelKind {
        self.0.kind()
    }

    fn forward(&self, input: ArrayD<f32>) -> anyhow::Result<ArrayD<f32>> {
        self.0.forward(input)
    }

    fn input_shapes(&self) -> &[(String, Dims)] {
        self.0.input_shapes()
    }

    fn output_shapes(&self) -> &[(String, Dims)] {
        self.0.output_shapes()
    }
}
