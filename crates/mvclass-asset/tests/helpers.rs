#![allow(dead_code)]

/// A weight-free classifier over three "classes": the logits are the
/// per-channel means of the input.
pub const SINGLE_VIEW_GRAPH: &str = r#"version 1.0;

graph network(input) -> (output)
{
  input = external<scalar>(shape = [1, 3, 224, 224]);
  pooled = mean_reduce(input, axes = [2, 3]);
  output = reshape(pooled, shape = [1, 3]);
}
"#;

/// Same as [`SINGLE_VIEW_GRAPH`] over two stacked views.
pub const MULTI_VIEW_GRAPH: &str = r#"version 1.0;

graph network(input) -> (output)
{
  input = external<scalar>(shape = [1, 2, 3, 224, 224]);
  pooled = mean_reduce(input, axes = [1, 3, 4]);
  output = reshape(pooled, shape = [1, 3]);
}
"#;

/// Pack a `graph.nnef` document into an in-memory NNEF archive.
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

pub fn class_table() -> mvclass_core::prelude::ClassTable {
    mvclass_core::prelude::ClassTable::new(vec!["coupling".into(), "elbow".into(), "tee".into()])
        .expect("valid table")
}
