use docqa_core::traits::{Embedder, Reranker};
use docqa_embed::{get_default_embedder, FakeEmbedder, FakeReranker, ModelServices, DEFAULT_DIM};
use std::path::Path;

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[test]
fn fake_embedder_shapes_and_determinism() {
    // Force fake embedder to avoid loading large model
    std::env::set_var("APP_USE_FAKE_EMBEDDINGS", "1");

    let embedder = get_default_embedder(Path::new("does-not-exist")).expect("embedder");
    let texts = vec!["hello world".to_string(), "hello world".to_string()];
    let embs = embedder.embed_batch(&texts).expect("embed_batch");
    let v1 = &embs[0];
    let v2 = &embs[1];

    assert_eq!(v1.len(), DEFAULT_DIM);
    assert_eq!(embedder.dim(), DEFAULT_DIM);

    let norm: f32 = v1.iter().map(|x| x * x).sum::<f32>().sqrt();
    assert!((norm - 1.0).abs() <= 1e-3, "vector is L2-normalized (norm={norm})");

    for (a, b) in v1.iter().zip(v2.iter()) {
        assert!((a - b).abs() <= 1e-6);
    }
}

#[test]
fn fake_embedder_prefers_shared_tokens() {
    let e = FakeEmbedder::new(DEFAULT_DIM);
    let q = e.embed_text("pump pressure");
    let near = e.embed_text("check pump pressure daily");
    let far = e.embed_text("holiday leave request form");
    assert!(cosine(&q, &near) > cosine(&q, &far));
}

#[test]
fn fake_reranker_scores_term_overlap() {
    let r = FakeReranker;
    let scores = r
        .score("Pump pressure?", &["the pump pressure gauge", "pump only", "nothing relevant"])
        .unwrap();
    assert_eq!(scores, vec![1.0, 0.5, 0.0]);
    assert_eq!(r.score("", &["a", "b"]).unwrap(), vec![0.0, 0.0]);
}

#[test]
fn fake_services_report_ids() {
    let services = ModelServices::fake();
    assert_eq!(services.embedder.model_id(), "fake-hash-384");
    assert_eq!(services.reranker.model_id(), "fake-overlap");
    services.shutdown();
}
