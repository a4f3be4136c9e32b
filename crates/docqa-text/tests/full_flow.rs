use docqa_text::{Bm25Indexer, Bm25Searcher};
use tempfile::TempDir;

fn corpus() -> Vec<String> {
	vec![
		"alpha beta gamma delta".to_string(),
		"delta epsilon alpha beta".to_string(),
		"beta zeta eta theta".to_string(),
		"Zeta uppercase only".to_string(),
	]
}

fn build(dir: &std::path::Path, texts: &[String]) -> Bm25Searcher {
	let count = Bm25Indexer::create(dir).expect("indexer").index_texts(texts).expect("index");
	assert_eq!(count, texts.len());
	Bm25Searcher::open(dir).expect("searcher")
}

#[test]
fn bm25_ranks_matching_chunk_first() {
	let tmp = TempDir::new().unwrap();
	let searcher = build(tmp.path(), &corpus());
	assert_eq!(searcher.num_docs(), 4);

	let hits = searcher.search("zeta", 10).expect("search");
	let positions: Vec<usize> = hits.iter().map(|h| h.position).collect();
	// Case is preserved: "Zeta" is a different token.
	assert_eq!(positions, vec![2]);
	assert!(hits[0].score > 0.0);
}

#[test]
fn bm25_scores_are_non_increasing_and_positions_valid() {
	let tmp = TempDir::new().unwrap();
	let texts = corpus();
	let searcher = build(tmp.path(), &texts);

	let hits = searcher.search("alpha beta delta", 10).expect("search");
	assert_eq!(hits.len(), 3);
	for pair in hits.windows(2) {
		assert!(pair[0].score >= pair[1].score);
	}
	assert!(hits.iter().all(|h| h.position < texts.len()));

	let top1 = searcher.search("alpha beta delta", 1).expect("search");
	assert_eq!(top1.len(), 1);
	assert_eq!(top1[0].position, hits[0].position);
}

#[test]
fn bm25_rarer_term_scores_higher() {
	let tmp = TempDir::new().unwrap();
	let searcher = build(tmp.path(), &corpus());
	// "beta" is in three chunks, "epsilon" only in one.
	let hits = searcher.search("beta epsilon", 10).expect("search");
	assert_eq!(hits[0].position, 1);
}

#[test]
fn bm25_empty_inputs_return_nothing() {
	let tmp = TempDir::new().unwrap();
	let searcher = build(tmp.path(), &corpus());
	assert!(searcher.search("", 5).unwrap().is_empty());
	assert!(searcher.search("   ", 5).unwrap().is_empty());
	assert!(searcher.search("alpha", 0).unwrap().is_empty());
	assert!(searcher.search("nonexistent", 5).unwrap().is_empty());

	let empty_dir = TempDir::new().unwrap();
	let empty = build(empty_dir.path(), &Vec::<String>::new());
	assert_eq!(empty.num_docs(), 0);
	assert!(empty.search("alpha", 5).unwrap().is_empty());
}

#[test]
fn bm25_reopen_gives_identical_results() {
	let tmp = TempDir::new().unwrap();
	let first = build(tmp.path(), &corpus()).search("beta theta", 10).unwrap();
	let reopened = Bm25Searcher::open(tmp.path()).unwrap().search("beta theta", 10).unwrap();
	assert_eq!(first, reopened);
}
