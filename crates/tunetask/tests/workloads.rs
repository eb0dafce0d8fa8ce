use std::collections::HashMap;

use tunetask::graph::{Conv2dSpec, DenseSpec, GraphBuilder};
use tunetask::{extract_from_graph, DType, OpKind, Shape, Target, Task, Workload};

fn data_shapes(shape: Shape) -> HashMap<String, Shape> {
    let mut shapes = HashMap::new();
    shapes.insert("data".to_string(), shape);
    shapes
}

#[test]
fn duplicate_workloads_collapse_to_one_task() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let conv1 = g
        .conv2d("conv1", data, Conv2dSpec::new(64, [3, 3], [1, 1], [1, 1]))
        .unwrap();
    let conv2 = g
        .conv2d("conv2", conv1, Conv2dSpec::new(64, [3, 3], [1, 1], [1, 1]))
        .unwrap();
    let graph = g.finish([conv2]);

    let tasks = extract_from_graph(
        &graph,
        Target::Llvm,
        &data_shapes(Shape::new([1, 64, 56, 56])),
        DType::F32,
        &[OpKind::Conv2d],
    )
    .unwrap();
    assert_eq!(tasks.len(), 1);
}

#[test]
fn distinct_strides_remain_distinct_tasks() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let conv1 = g
        .conv2d("conv1", data, Conv2dSpec::new(64, [3, 3], [1, 1], [1, 1]))
        .unwrap();
    let conv2 = g
        .conv2d("conv2", conv1, Conv2dSpec::new(64, [3, 3], [2, 2], [1, 1]))
        .unwrap();
    let graph = g.finish([conv2]);

    let tasks = extract_from_graph(
        &graph,
        Target::Llvm,
        &data_shapes(Shape::new([1, 64, 56, 56])),
        DType::F32,
        &[OpKind::Conv2d],
    )
    .unwrap();
    assert_eq!(tasks.len(), 2);
    assert_ne!(tasks[0].workload, tasks[1].workload);
    assert_ne!(tasks[0].fingerprint(), tasks[1].fingerprint());
}

#[test]
fn tasks_appear_in_first_seen_graph_order() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let conv = g
        .conv2d("conv", data, Conv2dSpec::new(8, [3, 3], [1, 1], [1, 1]))
        .unwrap();
    let flat = g.flatten("flatten", conv);
    let fc = g.dense("fc", flat, DenseSpec::new(10)).unwrap();
    let graph = g.finish([fc]);

    // Filter order must not affect task order.
    let tasks = extract_from_graph(
        &graph,
        Target::Llvm,
        &data_shapes(Shape::new([1, 3, 8, 8])),
        DType::F32,
        &[OpKind::Dense, OpKind::Conv2d],
    )
    .unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].kind, OpKind::Conv2d);
    assert_eq!(tasks[1].kind, OpKind::Dense);
}

#[test]
fn workload_carries_inferred_operand_specs() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let flat = g.flatten("flatten", data);
    let fc = g.dense("fc", flat, DenseSpec::new(10)).unwrap();
    let graph = g.finish([fc]);

    let tasks = extract_from_graph(
        &graph,
        Target::Llvm,
        &data_shapes(Shape::new([2, 32])),
        DType::F32,
        &[OpKind::Dense],
    )
    .unwrap();
    assert_eq!(tasks.len(), 1);
    match &tasks[0].workload {
        Workload::Dense {
            data,
            weight,
            out_dtype,
        } => {
            assert_eq!(data.dims(), &[2, 32]);
            assert_eq!(weight.dims(), &[10, 32]);
            assert_eq!(*out_dtype, DType::F32);
        }
        other => panic!("expected a dense workload, got {other:?}"),
    }
}

#[test]
fn equal_workloads_share_a_fingerprint() {
    let build = || {
        let mut g = GraphBuilder::new();
        let data = g.input("data").unwrap();
        let conv = g
            .conv2d("conv", data, Conv2dSpec::new(16, [3, 3], [1, 1], [1, 1]))
            .unwrap();
        g.finish([conv])
    };

    let extract = |graph: &tunetask::Graph| -> Vec<Task> {
        extract_from_graph(
            graph,
            Target::Llvm,
            &data_shapes(Shape::new([1, 8, 16, 16])),
            DType::F32,
            &[OpKind::Conv2d],
        )
        .unwrap()
    };

    let first = extract(&build());
    let second = extract(&build());
    assert_eq!(first[0].workload, second[0].workload);
    assert_eq!(first[0].fingerprint(), second[0].fingerprint());
    assert_eq!(
        first[0].workload.fingerprint(),
        second[0].workload.fingerprint()
    );
}

#[test]
fn task_records_serialize_as_json() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let fc = g.dense("fc", data, DenseSpec::new(4)).unwrap();
    let graph = g.finish([fc]);

    let tasks = extract_from_graph(
        &graph,
        Target::Llvm,
        &data_shapes(Shape::new([1, 8])),
        DType::F32,
        &[OpKind::Dense],
    )
    .unwrap();

    let json = serde_json::to_value(&tasks[0]).unwrap();
    assert_eq!(json["kind"], "Dense");
    assert_eq!(json["target"], "Llvm");
    assert!(json["workload"]["Dense"]["weight"].is_object());

    let described = tasks[0].describe();
    assert!(described.starts_with("dense@llvm"), "{described}");
}

#[test]
fn target_and_dtype_parse_their_wire_names() {
    assert_eq!(Target::parse("llvm").unwrap(), Target::Llvm);
    assert_eq!("cuda".parse::<Target>().unwrap(), Target::Cuda);
    assert!(Target::parse("opencl").is_err());
    assert_eq!(Target::Llvm.to_string(), "llvm");

    assert_eq!(DType::parse("float32").unwrap(), DType::F32);
    assert_eq!(DType::F32.as_str(), "float32");
    assert!(DType::parse("float64").is_err());
    assert_eq!(DType::F16.size_in_bytes(), 2);
}
