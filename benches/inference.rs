//! Inference benchmark: sequence → prior estimate and full tier decision.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use cyberguard::classifier::TierClassifier;
use cyberguard::config::ClassifierConfig;
use cyberguard::features::TokenHasher;
use cyberguard::model::{OnnxDetector, PriorModel, PrototypePrior};
use cyberguard::normalize::extract;
use std::path::Path;

fn bench_prototype_prior(c: &mut Criterion) {
    let prior = PrototypePrior::default();
    let seq = extract("multiple login failed attempts from unknown host");

    c.bench_function("prototype_prior_estimate", |b| {
        b.iter(|| prior.estimate(black_box(&seq)))
    });
}

fn bench_onnx_fallback_by_dim(c: &mut Criterion) {
    let seq = extract("login admin export database delete");

    let mut g = c.benchmark_group("onnx_no_model_by_dim");
    for d in [16, 32, 64, 128] {
        let detector = OnnxDetector::load(Path::new("nonexistent.onnx"), d).unwrap();
        let fv = TokenHasher::new(d).vectorize(&seq);
        g.bench_function(format!("dim_{}", d).as_str(), |b| {
            b.iter(|| detector.predict(black_box(&fv)))
        });
    }
    g.finish();
}

fn bench_classify(c: &mut Criterion) {
    let classifier =
        TierClassifier::new(Box::new(PrototypePrior::default()), ClassifierConfig::default());
    let seq = extract("sudo root privilege escalation attempt denied");

    c.bench_function("classify_sequence", |b| {
        b.iter(|| classifier.classify(black_box(&seq)))
    });
}

criterion_group!(benches, bench_prototype_prior, bench_onnx_fallback_by_dim, bench_classify);
criterion_main!(benches);
