use std::cell::Cell;

use super::fakes::{EmbedCall, FakeEmbedder, FakeVectorStore, RecordedQuery};
use crate::config::{Config, VectorTarget};
use crate::errors::PipelineError;
use crate::pipeline::query::{classify_query, QueryEngine, QueryKind};
use crate::pipeline::{generate_embeddings, run_query};
use crate::staging::StagingDir;
use crate::vector_store::QueryMatch;

fn target() -> VectorTarget {
    VectorTarget {
        bucket: "images-bucket".to_string(),
        index: "images-index".to_string(),
    }
}

fn ranked_matches() -> Vec<QueryMatch> {
    (1..=8)
        .map(|i| QueryMatch {
            key: format!("image_{i:02}"),
            distance: Some(i as f32 * 0.1),
            file_name: Some(format!("image_{i:02}.jpg")),
        })
        .collect()
}

fn embed_dir_with(records: &[(&str, &str)]) -> (tempfile::TempDir, StagingDir) {
    let root = tempfile::tempdir().unwrap();
    let dir = StagingDir::new(root.path().join("images-embed"));
    dir.ensure().unwrap();
    for (name, body) in records {
        dir.write(name, body.as_bytes()).unwrap();
    }
    (root, dir)
}

#[test]
fn test_image_query_reuses_stored_embedding() {
    let (_root, embeds) = embed_dir_with(&[(
        "image_01-embed.json",
        r#"{"fileName": "image_01.jpg", "embedding": [0.5, 0.25], "dim": 2}"#,
    )]);
    let embedder = FakeEmbedder::returning(&[9.0]);
    let store = FakeVectorStore::returning(ranked_matches());
    let engine = QueryEngine::new(&embedder, &store, embeds, target());

    let query = classify_query("image_01-embed.json").unwrap();
    let matches = engine.search(&query).unwrap();

    assert_eq!(embedder.call_count(), 0);
    assert_eq!(
        *store.queries.borrow(),
        vec![RecordedQuery {
            bucket: "images-bucket".to_string(),
            index: "images-index".to_string(),
            top_k: 5,
            vector: vec![0.5, 0.25],
        }]
    );

    assert_eq!(matches.len(), 5);
    assert_eq!(matches[0].key, "image_01");
    assert!(matches
        .windows(2)
        .all(|pair| pair[0].distance <= pair[1].distance));
}

#[test]
fn test_text_query_embeds_once() {
    let (_root, embeds) = embed_dir_with(&[]);
    let embedder = FakeEmbedder::returning(&[0.1, 0.2, 0.3]);
    let store = FakeVectorStore::returning(ranked_matches());
    let engine = QueryEngine::new(&embedder, &store, embeds, target());

    let query = classify_query("うさぎ").unwrap();
    assert_eq!(query, QueryKind::Text("うさぎ".to_string()));
    engine.search(&query).unwrap();

    assert_eq!(*embedder.calls.borrow(), vec![EmbedCall::Text("うさぎ".to_string())]);
    let queries = store.queries.borrow();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].vector, vec![0.1, 0.2, 0.3]);
}

#[test]
fn test_text_query_bad_response() {
    let (_root, embeds) = embed_dir_with(&[]);
    let embedder = FakeEmbedder::with_raw(br#"{"embeddings": [[1.0]]}"#.to_vec());
    let store = FakeVectorStore::returning(ranked_matches());
    let engine = QueryEngine::new(&embedder, &store, embeds, target());

    let err = engine.search(&QueryKind::Text("cat".to_string())).unwrap_err();
    assert!(matches!(err, PipelineError::Embedding(_)));
    assert!(store.queries.borrow().is_empty());
}

#[test]
fn test_image_query_missing_record() {
    let (_root, embeds) = embed_dir_with(&[]);
    let embedder = FakeEmbedder::returning(&[1.0]);
    let store = FakeVectorStore::returning(ranked_matches());
    let engine = QueryEngine::new(&embedder, &store, embeds, target());

    let err = engine
        .search(&classify_query("image_09-embed.json").unwrap())
        .unwrap_err();
    match err {
        PipelineError::EmbeddingNotFound(path) => assert!(path.ends_with("image_09-embed.json")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(embedder.call_count(), 0);
    assert!(store.queries.borrow().is_empty());
}

#[test]
fn test_image_query_invalid_record() {
    let (_root, embeds) = embed_dir_with(&[(
        "image_02-embed.json",
        r#"{"fileName": "image_02.jpg", "embedding": {"0": 1.0}}"#,
    )]);
    let embedder = FakeEmbedder::returning(&[1.0]);
    let store = FakeVectorStore::returning(ranked_matches());
    let engine = QueryEngine::new(&embedder, &store, embeds, target());

    let err = engine
        .search(&classify_query("image_02-embed.json").unwrap())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidEmbedding { ref file } if file == "image_02-embed.json"));
}

#[test]
fn test_image_query_stays_in_staging_dir() {
    let (_root, embeds) = embed_dir_with(&[]);
    let embedder = FakeEmbedder::returning(&[1.0]);
    let store = FakeVectorStore::returning(ranked_matches());
    let engine = QueryEngine::new(&embedder, &store, embeds, target());

    let query = classify_query("image_01-/../../secret.json").unwrap();
    assert!(matches!(query, QueryKind::Image { .. }));
    assert!(matches!(
        engine.search(&query),
        Err(PipelineError::InvalidQuery(_))
    ));
}

#[test]
fn test_custom_top_k() {
    let (_root, embeds) = embed_dir_with(&[]);
    let embedder = FakeEmbedder::returning(&[1.0]);
    let store = FakeVectorStore::returning(ranked_matches());

    let engine = QueryEngine::new(&embedder, &store, embeds.clone(), target())
        .with_top_k(3)
        .unwrap();
    let matches = engine.search(&QueryKind::Text("dog".to_string())).unwrap();
    assert_eq!(matches.len(), 3);
    assert_eq!(store.queries.borrow()[0].top_k, 3);

    assert!(matches!(
        QueryEngine::new(&embedder, &store, embeds, target()).with_top_k(0),
        Err(PipelineError::InvalidQuery(_))
    ));
}

/// Stage 1 output feeds an image query directly.
#[test]
fn test_generated_record_is_queryable() {
    let root = tempfile::tempdir().unwrap();
    let images = StagingDir::new(root.path().join("images"));
    let embeds = StagingDir::new(root.path().join("images-embed"));
    images.ensure().unwrap();
    std::fs::write(images.path("image_01.jpg"), b"jpeg").unwrap();

    let embedder = FakeEmbedder::returning(&[0.75, 0.125]);
    generate_embeddings(&embedder, &images, &embeds).unwrap();

    let store = FakeVectorStore::returning(ranked_matches());
    let engine = QueryEngine::new(&embedder, &store, embeds, target());
    engine
        .search(&classify_query("image_01-embed.json").unwrap())
        .unwrap();

    // only the Stage 1 image call, nothing for the query
    assert_eq!(embedder.call_count(), 1);
    assert_eq!(store.queries.borrow()[0].vector, vec![0.75, 0.125]);
}

fn config_with(pairs: &'static [(&'static str, &'static str)]) -> Config {
    Config::from_lookup(|key| {
        pairs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.to_string())
    })
}

#[test]
fn test_missing_bucket_fails_before_connecting() {
    let (_root, embeds) = embed_dir_with(&[(
        "image_01-embed.json",
        r#"{"fileName": "image_01.jpg", "embedding": [0.5], "dim": 1}"#,
    )]);
    let embedder = FakeEmbedder::returning(&[1.0]);
    let store = FakeVectorStore::returning(ranked_matches());
    let connected = Cell::new(false);

    let config = config_with(&[("VECTOR_INDEX_NAME", "images-index")]);
    let err = run_query(&config, "うさぎ", None, 5, embeds, || {
        connected.set(true);
        Ok((&embedder, &store))
    })
    .unwrap_err();

    match err {
        PipelineError::MissingConfiguration(missing) => {
            assert_eq!(missing, vec!["VECTOR_BUCKET_NAME"]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!connected.get());
    assert_eq!(embedder.call_count(), 0);
    assert!(store.queries.borrow().is_empty());
}

#[test]
fn test_bad_query_input_fails_before_connecting() {
    let config = config_with(&[
        ("VECTOR_BUCKET_NAME", "images-bucket"),
        ("VECTOR_INDEX_NAME", "images-index"),
    ]);

    for (query, kind, top_k) in [("  ", None, 5), ("cat", Some("vector"), 5), ("cat", None, 0)] {
        let (_root, embeds) = embed_dir_with(&[]);
        let embedder = FakeEmbedder::returning(&[1.0]);
        let store = FakeVectorStore::returning(ranked_matches());
        let connected = Cell::new(false);

        let err = run_query(&config, query, kind, top_k, embeds, || {
            connected.set(true);
            Ok((&embedder, &store))
        })
        .unwrap_err();

        assert!(
            matches!(
                err,
                PipelineError::InvalidQuery(_) | PipelineError::UnknownQueryType(_)
            ),
            "{err:?}"
        );
        assert!(!connected.get());
        assert_eq!(embedder.call_count(), 0);
        assert!(store.queries.borrow().is_empty());
    }
}

#[test]
fn test_run_query_image_and_text() {
    let config = config_with(&[
        ("VECTOR_BUCKET_NAME", "images-bucket"),
        ("VECTOR_INDEX_NAME", "images-index"),
    ]);
    let (_root, embeds) = embed_dir_with(&[(
        "image_01-embed.json",
        r#"{"fileName": "image_01.jpg", "embedding": [0.5, 0.25], "dim": 2}"#,
    )]);
    let embedder = FakeEmbedder::returning(&[0.1, 0.2]);
    let store = FakeVectorStore::returning(ranked_matches());

    let matches = run_query(&config, "image_01-embed.json", None, 5, embeds.clone(), || {
        Ok((&embedder, &store))
    })
    .unwrap();
    assert_eq!(matches.len(), 5);
    assert_eq!(embedder.call_count(), 0);

    // forcing text embeds the file name itself
    run_query(&config, "image_01-embed.json", Some("text"), 2, embeds, || {
        Ok((&embedder, &store))
    })
    .unwrap();
    assert_eq!(
        *embedder.calls.borrow(),
        vec![EmbedCall::Text("image_01-embed.json".to_string())]
    );

    let queries = store.queries.borrow();
    assert_eq!(queries.len(), 2);
    assert_eq!(queries[0].vector, vec![0.5, 0.25]);
    assert_eq!(queries[0].bucket, "images-bucket");
    assert_eq!(queries[1].top_k, 2);
    assert_eq!(queries[1].vector, vec![0.1, 0.2]);
}
