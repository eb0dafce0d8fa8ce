use std::collections::HashMap;

use tunetask::graph::{
    Conv2dSpec, Conv2dTransposeSpec, DenseSpec, GraphBuilder, Layout, Pool2dSpec,
};
use tunetask::infer::infer_shapes;
use tunetask::{DType, Shape};

fn data_shapes(shape: Shape) -> HashMap<String, Shape> {
    let mut shapes = HashMap::new();
    shapes.insert("data".to_string(), shape);
    shapes
}

#[test]
fn conv2d_output_and_weight_shapes() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .conv2d("conv0", data, Conv2dSpec::new(64, [7, 7], [2, 2], [3, 3]))
        .unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 3, 224, 224])), DType::F32).unwrap();
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 64, 112, 112]);

    let weight = graph.input_named("conv0_weight").unwrap().value;
    assert_eq!(inferred.spec(weight).unwrap().dims(), &[64, 3, 7, 7]);
}

#[test]
fn strided_conv_rounds_down() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .conv2d("conv1", data, Conv2dSpec::new(64, [3, 3], [2, 2], [0, 0]))
        .unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 3, 224, 224])), DType::F32).unwrap();
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 64, 111, 111]);
}

#[test]
fn nhwc_convolution_places_channels_last() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .conv2d(
            "conv0",
            data,
            Conv2dSpec::new(64, [7, 7], [2, 2], [3, 3]).with_layout(Layout::Nhwc),
        )
        .unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 224, 224, 3])), DType::F32).unwrap();
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 112, 112, 64]);
}

#[test]
fn grouped_conv_requires_divisible_input_channels() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .conv2d(
            "depthwise",
            data,
            Conv2dSpec::new(32, [3, 3], [1, 1], [1, 1]).with_groups(32),
        )
        .unwrap();
    let graph = g.finish([out]);

    let err = infer_shapes(&graph, &data_shapes(Shape::new([1, 3, 32, 32])), DType::F32)
        .expect_err("3 input channels cannot split into 32 groups");
    assert!(
        err.to_string().contains("divisible by groups"),
        "unexpected error: {err}"
    );
}

#[test]
fn depthwise_conv_weight_has_unit_input_channels() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .conv2d(
            "depthwise",
            data,
            Conv2dSpec::new(32, [3, 3], [1, 1], [1, 1]).with_groups(32),
        )
        .unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 32, 112, 112])), DType::F32).unwrap();
    let weight = graph.input_named("depthwise_weight").unwrap().value;
    assert_eq!(inferred.spec(weight).unwrap().dims(), &[32, 1, 3, 3]);
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 32, 112, 112]);
}

#[test]
fn conv_window_larger_than_padded_input_is_rejected() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .conv2d("conv0", data, Conv2dSpec::new(8, [7, 7], [1, 1], [0, 0]))
        .unwrap();
    let graph = g.finish([out]);

    let err = infer_shapes(&graph, &data_shapes(Shape::new([1, 3, 4, 4])), DType::F32)
        .expect_err("7x7 window cannot cover a 4x4 input");
    assert!(
        err.to_string().contains("exceeds padded input"),
        "unexpected error: {err}"
    );
}

#[test]
fn transposed_conv_doubles_spatial_extent() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .conv2d_transpose(
            "deconv",
            data,
            Conv2dTransposeSpec::new(512, [4, 4], [2, 2], [1, 1]),
        )
        .unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 1024, 4, 4])), DType::F32).unwrap();
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 512, 8, 8]);

    let weight = graph.input_named("deconv_weight").unwrap().value;
    assert_eq!(inferred.spec(weight).unwrap().dims(), &[1024, 512, 4, 4]);
}

#[test]
fn pooling_and_global_pooling_shapes() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let pooled = g
        .max_pool2d("pool0", data, Pool2dSpec::new([3, 3], [2, 2], [1, 1]))
        .unwrap();
    let global = g.global_avg_pool2d("pool1", pooled, Layout::Nchw);
    let graph = g.finish([global]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 64, 112, 112])), DType::F32).unwrap();
    assert_eq!(inferred.spec(pooled).unwrap().dims(), &[1, 64, 56, 56]);
    assert_eq!(inferred.spec(global).unwrap().dims(), &[1, 64, 1, 1]);
}

#[test]
fn dense_binds_weight_and_bias_shapes() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let flat = g.flatten("flatten", data);
    let out = g.dense("fc", flat, DenseSpec::new(1000)).unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 512, 1, 1])), DType::F32).unwrap();
    assert_eq!(inferred.spec(flat).unwrap().dims(), &[1, 512]);
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 1000]);

    let weight = graph.input_named("fc_weight").unwrap().value;
    let bias = graph.input_named("fc_bias").unwrap().value;
    assert_eq!(inferred.spec(weight).unwrap().dims(), &[1000, 512]);
    assert_eq!(inferred.spec(bias).unwrap().dims(), &[1000]);
}

#[test]
fn batch_norm_binds_channel_vectors() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g
        .batch_norm("bn0", data, Default::default())
        .unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 64, 56, 56])), DType::F32).unwrap();
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 64, 56, 56]);
    for suffix in ["gamma", "beta", "moving_mean", "moving_var"] {
        let value = graph.input_named(&format!("bn0_{suffix}")).unwrap().value;
        assert_eq!(inferred.spec(value).unwrap().dims(), &[64]);
    }
}

#[test]
fn reshape_infers_wildcard_dimension() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g.reshape("reshape", data, vec![-1, 1024, 4, 4]).unwrap();
    let graph = g.finish([out]);

    let inferred =
        infer_shapes(&graph, &data_shapes(Shape::new([1, 16384])), DType::F32).unwrap();
    assert_eq!(inferred.spec(out).unwrap().dims(), &[1, 1024, 4, 4]);
}

#[test]
fn missing_input_shape_is_reported() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g.relu("relu", data);
    let graph = g.finish([out]);

    let err = infer_shapes(&graph, &HashMap::new(), DType::F32)
        .expect_err("data shape was not provided");
    assert!(
        err.to_string().contains("no shape provided"),
        "unexpected error: {err}"
    );
}

#[test]
fn shape_for_unknown_input_is_rejected() {
    let mut g = GraphBuilder::new();
    let data = g.input("data").unwrap();
    let out = g.relu("relu", data);
    let graph = g.finish([out]);

    let mut shapes = data_shapes(Shape::new([1, 3, 224, 224]));
    shapes.insert("weights".to_string(), Shape::new([1]));
    let err = infer_shapes(&graph, &shapes, DType::F32)
        .expect_err("extra shape entry should be rejected");
    assert!(
        err.to_string().contains("unknown graph input"),
        "unexpected error: {err}"
    );
}
