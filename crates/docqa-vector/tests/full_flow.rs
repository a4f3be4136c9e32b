use docqa_core::traits::Embedder;
use docqa_embed::FakeEmbedder;
use docqa_vector::{VectorIndexWriter, VectorSearcher, DEFAULT_TABLE};
use tempfile::TempDir;

fn corpus() -> Vec<String> {
    vec![
        "pump pressure check".to_string(),
        "quarterly budget review".to_string(),
        "safety valve inspection".to_string(),
        "pump pressure".to_string(),
    ]
}

#[tokio::test]
async fn vector_full_flow() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("vectors");
    let embedder = FakeEmbedder::new(64);
    let texts = corpus();

    let writer = VectorIndexWriter::create(&db_path, DEFAULT_TABLE).await.expect("writer");
    let rows = writer.write(&embedder, &texts).await.expect("write");
    assert_eq!(rows, texts.len());

    let searcher = VectorSearcher::open(&db_path, DEFAULT_TABLE).await.expect("searcher");
    assert_eq!(searcher.len(), texts.len());

    let hits = searcher.search(&embedder, "pump pressure", 4).await.expect("search");
    assert_eq!(hits.len(), 4);
    // Identical text is the nearest neighbour with cosine ~1.
    assert_eq!(hits[0].position, 3);
    assert!((hits[0].score - 1.0).abs() < 1e-4, "score={}", hits[0].score);
    for pair in hits.windows(2) {
        assert!(pair[0].score >= pair[1].score);
    }
    assert!(hits.iter().all(|h| h.position < texts.len()));

    let top2 = searcher.search(&embedder, "pump pressure", 2).await.expect("search");
    assert_eq!(top2.len(), 2);
    assert!(searcher.search(&embedder, "pump", 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn vector_empty_index_returns_empty() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("vectors");
    let embedder = FakeEmbedder::new(16);

    let writer = VectorIndexWriter::create(&db_path, DEFAULT_TABLE).await.expect("writer");
    assert_eq!(writer.write(&embedder, &[]).await.expect("write"), 0);

    let searcher = VectorSearcher::open(&db_path, DEFAULT_TABLE).await.expect("searcher");
    assert!(searcher.is_empty());
    assert!(searcher.search(&embedder, "anything", 5).await.unwrap().is_empty());
}

#[tokio::test]
async fn vector_writer_spans_multiple_batches() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("vectors");
    let embedder = FakeEmbedder::new(32);
    let texts: Vec<String> = (0..75).map(|i| format!("chunk number {i} token{i}")).collect();

    let writer = VectorIndexWriter::create(&db_path, DEFAULT_TABLE).await.unwrap();
    writer.write(&embedder, &texts).await.unwrap();

    let searcher = VectorSearcher::open(&db_path, DEFAULT_TABLE).await.unwrap();
    assert_eq!(searcher.len(), 75);
    let q = embedder.embed_batch(&[texts[60].clone()]).unwrap().remove(0);
    let hits = searcher.search_vec(&q, 1).await.unwrap();
    assert_eq!(hits[0].position, 60);
}
