use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

use tunetask::infer::infer_shapes;
use tunetask::model::{get_network, network_names, resnet, squeezenet, vgg};
use tunetask::{DType, Shape};

fn output_dims(net: &tunetask::model::NetworkWorkload) -> Vec<usize> {
    let mut shapes = HashMap::new();
    shapes.insert("data".to_string(), net.input_shape.clone());
    let inferred = infer_shapes(&net.graph, &shapes, DType::F32).unwrap();
    let out = net.graph.outputs()[0];
    inferred.spec(out).unwrap().dims().to_vec()
}

#[test]
fn registry_lists_the_reference_networks() {
    assert_eq!(
        network_names(),
        vec![
            "resnet-18",
            "mobilenet",
            "squeezenet v1.1",
            "vgg-16",
            "dcgan"
        ]
    );
}

#[test]
fn classifiers_produce_1000_class_logits() {
    for name in ["resnet-18", "mobilenet", "squeezenet v1.1", "vgg-16"] {
        let net = get_network(name, 1).unwrap();
        assert_eq!(net.input_shape, Shape::new([1, 3, 224, 224]), "{name}");
        assert_eq!(
            net.output_shape.as_ref().expect("classifier output"),
            &Shape::new([1, 1000]),
            "{name}"
        );
        assert_eq!(output_dims(&net), vec![1, 1000], "{name}");
    }
}

#[test]
fn dcgan_generator_has_no_classifier_output() {
    let net = get_network("dcgan", 1).unwrap();
    assert_eq!(net.input_shape, Shape::new([1, 100]));
    assert!(net.output_shape.is_none());
    assert_eq!(output_dims(&net), vec![1, 3, 64, 64]);
}

#[test]
fn batch_size_flows_through_the_descriptor() {
    let net = get_network("mobilenet", 4).unwrap();
    assert_eq!(net.input_shape, Shape::new([4, 3, 224, 224]));
    assert_eq!(output_dims(&net), vec![4, 1000]);
}

#[test]
fn resnet_parameter_specs_are_bound() {
    let net = get_network("resnet-18", 1).unwrap();
    assert!(!net.params.is_empty());
    assert_eq!(
        net.params.get("conv0_weight").unwrap().dims(),
        &[64, 3, 7, 7]
    );
    assert_eq!(
        net.params.get("fc1_weight").unwrap().dims(),
        &[1000, 512]
    );
    assert_eq!(net.params.get("fc1_bias").unwrap().dims(), &[1000]);
}

#[test]
fn resnet34_is_deeper_than_resnet18() {
    let shallow = resnet::get_workload(18, 1).unwrap();
    let deep = resnet::get_workload(34, 1).unwrap();
    assert!(deep.graph.num_nodes() > shallow.graph.num_nodes());
    assert!(deep.params.num_elements() > shallow.params.num_elements());
}

#[test]
fn unsupported_variants_are_rejected() {
    assert!(resnet::get_workload(50, 1).is_err());
    assert!(vgg::get_workload(12, 1).is_err());
    let err = squeezenet::get_workload(1, "2.0").expect_err("unknown version");
    assert!(
        err.to_string().contains("unsupported squeezenet version"),
        "unexpected error: {err}"
    );
}

#[test]
fn squeezenet_versions_differ_in_stem() {
    let v10 = squeezenet::get_workload(1, "1.0").unwrap();
    let v11 = squeezenet::get_workload(1, "1.1").unwrap();
    assert_eq!(v10.params.get("conv1_weight").unwrap().dims(), &[96, 3, 7, 7]);
    assert_eq!(v11.params.get("conv1_weight").unwrap().dims(), &[64, 3, 3, 3]);
}

#[test]
fn parameter_initialization_matches_specs() {
    let net = get_network("squeezenet v1.1", 1).unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let values = net.params.initialize(0.02, &mut rng);
    assert_eq!(values.len(), net.params.len());

    let total: usize = values.values().map(|tensor| tensor.len()).sum();
    assert_eq!(total, net.params.num_elements());

    let conv1 = &values["conv1_weight"];
    conv1
        .shape()
        .assert_same(&net.params.get("conv1_weight").unwrap().shape);
    assert!(conv1.data().iter().any(|&v| v != 0.0));
}
