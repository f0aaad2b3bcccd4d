//! End-to-end factory tests against an offline weight source

use candle_core::{DType, Device, Tensor};
use vision_zoo::{
    Architecture, ImageClassifier, ModelError, ModelFactory, ZeroWeightSource, NUM_CLASSES,
};

fn offline_factory() -> ModelFactory {
    ModelFactory::new(ZeroWeightSource).with_device(Device::Cpu)
}

fn image_batch(n: usize, size: usize) -> Tensor {
    Tensor::zeros((n, 3, size, size), DType::F32, &Device::Cpu).unwrap()
}

fn build_and_classify(name: &str, batch: usize) {
    let factory = offline_factory();
    let model = factory.build(name).unwrap();
    let arch = Architecture::parse(name).unwrap();
    assert_eq!(model.architecture(), arch);

    let images = image_batch(batch, arch.checkpoint().input_size);
    let out = model.forward(&images).unwrap();
    assert_eq!(out.logits.dims(), &[batch, NUM_CLASSES]);
}

#[test]
fn vit_builds_and_classifies() {
    build_and_classify("vit", 1);
}

#[test]
fn swin_builds_and_classifies() {
    build_and_classify("swin", 1);
}

#[test]
fn convnext_builds_and_classifies() {
    build_and_classify("convnext", 1);
}

#[test]
fn densenet_builds_and_classifies() {
    build_and_classify("densenet", 2);
}

#[test]
fn efficientnet_builds_and_classifies() {
    build_and_classify("efficientnet", 2);
}

#[test]
fn names_are_case_insensitive() {
    // Odd casing must reach the same build procedure.
    build_and_classify("DenseNet", 1);
}

#[test]
fn unknown_names_fail_fast_with_the_typed_name() {
    let factory = offline_factory();
    match factory.build("resnet").err().unwrap() {
        ModelError::UnknownModel { name } => assert_eq!(name, "resnet"),
        other => panic!("unexpected error: {other}"),
    }
    // The top-level entry point rejects before creating any hub client.
    assert!(vision_zoo::build_model("mobilenet").is_err());
}

#[test]
fn builds_are_independent_instances() {
    let factory = offline_factory();
    let a = factory.build("efficientnet").unwrap();
    let b = factory.build("efficientnet").unwrap();
    let images = image_batch(1, Architecture::EfficientNet.checkpoint().input_size);
    let out_a = a.forward(&images).unwrap();
    let out_b = b.forward(&images).unwrap();
    assert_eq!(out_a.logits.dims(), out_b.logits.dims());
}
