//! Wire protocol behavior against a live server on a loopback port.

use std::net::SocketAddr;
use std::sync::Arc;

use concept_graph_core::types::{AssociationType, ConceptId};
use concept_graph_core::Config;
use concept_graph_graph::KnowledgeEngine;
use concept_graph_server::{Client, ErrorKind, Request, Response, Server};
use tempfile::TempDir;

const MAX_FRAME: usize = 1024;

async fn start() -> (SocketAddr, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().display().to_string();
    config.index.dimension = 2;
    config.server.port = 0;
    config.server.max_frame_bytes = MAX_FRAME;

    let engine = Arc::new(KnowledgeEngine::open(config.clone()).unwrap());
    let server = Server::bind(config.server, engine).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    (addr, dir)
}

fn learn(content: &str, embedding: Option<Vec<f32>>) -> Request {
    Request::LearnConcept {
        concept_id: None,
        content: content.into(),
        embedding,
        strength: 1.0,
        confidence: 0.9,
    }
}

fn assert_protocol_error(response: &Response) {
    assert!(
        matches!(
            response,
            Response::Error {
                kind: ErrorKind::Protocol,
                ..
            }
        ),
        "expected protocol error, got {response:?}"
    );
}

#[tokio::test]
async fn test_health_check() {
    let (addr, _dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();
    match client.call(&Request::HealthCheck).await.unwrap() {
        Response::HealthCheckOk { healthy, status, .. } => {
            assert!(healthy);
            assert_eq!(status, "ok");
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[tokio::test]
async fn test_learn_query_and_neighbors() {
    let (addr, _dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();

    let fire = ConceptId::from_content("fire");
    let smoke = ConceptId::from_content("smoke");
    assert_eq!(
        client.call(&learn("fire", None)).await.unwrap(),
        Response::LearnConceptOk {
            sequence: 1,
            concept_id: fire
        }
    );
    client.call(&learn("smoke", None)).await.unwrap();
    assert_eq!(
        client
            .call(&Request::LearnAssociation {
                source_id: fire,
                target_id: smoke,
                assoc_type: AssociationType::Causal,
                confidence: 0.7,
            })
            .await
            .unwrap(),
        Response::LearnAssociationOk { sequence: 3 }
    );

    match client
        .call(&Request::QueryConcept { concept_id: fire })
        .await
        .unwrap()
    {
        Response::QueryConceptOk {
            found,
            content,
            confidence,
            ..
        } => {
            assert!(found);
            assert_eq!(content, "fire");
            assert!((confidence - 0.9).abs() < 1e-6);
        }
        other => panic!("unexpected response {other:?}"),
    }

    assert_eq!(
        client
            .call(&Request::GetNeighbors { concept_id: fire })
            .await
            .unwrap(),
        Response::GetNeighborsOk {
            neighbor_ids: vec![smoke]
        }
    );

    match client
        .call(&Request::FindPath {
            start_id: fire,
            end_id: smoke,
            max_depth: Some(2),
        })
        .await
        .unwrap()
    {
        Response::FindPathOk {
            found,
            path,
            confidence,
        } => {
            assert!(found);
            assert_eq!(path, vec![fire, smoke]);
            assert!((confidence - 0.7).abs() < 1e-6);
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[tokio::test]
async fn test_query_missing_concept_is_not_found_in_band() {
    let (addr, _dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();
    let missing = ConceptId::from_content("never learned");

    match client
        .call(&Request::QueryConcept {
            concept_id: missing,
        })
        .await
        .unwrap()
    {
        Response::QueryConceptOk {
            found, concept_id, ..
        } => {
            assert!(!found);
            assert_eq!(concept_id, missing);
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[tokio::test]
async fn test_oversized_frame_keeps_connection() {
    let (addr, _dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();

    let response = client.send_raw_frame(&vec![0u8; MAX_FRAME * 4]).await.unwrap();
    assert_protocol_error(&response);

    assert!(matches!(
        client.call(&Request::HealthCheck).await.unwrap(),
        Response::HealthCheckOk { healthy: true, .. }
    ));
}

#[tokio::test]
async fn test_unknown_tag_and_garbage_keep_connection() {
    let (addr, _dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();

    assert_protocol_error(&client.send_raw_frame(&200u32.to_le_bytes()).await.unwrap());
    assert_protocol_error(&client.send_raw_frame(&[1, 2]).await.unwrap());
    assert_protocol_error(&client.send_raw_frame(&[]).await.unwrap());

    assert!(matches!(
        client.call(&Request::GetStats).await.unwrap(),
        Response::StatsOk { concepts: 0, .. }
    ));
}

#[tokio::test]
async fn test_validation_errors_are_reported() {
    let (addr, _dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();

    let bad = [
        learn("", None),
        learn("wrong dimension", Some(vec![1.0, 2.0, 3.0])),
        Request::LearnConcept {
            concept_id: Some(ConceptId::from_content("other")),
            content: "mismatch".into(),
            embedding: None,
            strength: 1.0,
            confidence: 0.5,
        },
        Request::LearnAssociation {
            source_id: ConceptId::from_content("a"),
            target_id: ConceptId::from_content("b"),
            assoc_type: AssociationType::Semantic,
            confidence: 0.5,
        },
        Request::LearnText {
            text: " ".into(),
            confidence: 0.5,
        },
    ];
    for request in &bad {
        let response = client.call(request).await.unwrap();
        assert!(
            matches!(
                response,
                Response::Error {
                    kind: ErrorKind::Validation,
                    ..
                }
            ),
            "{request:?} gave {response:?}"
        );
    }

    match client.call(&Request::GetStats).await.unwrap() {
        Response::StatsOk {
            concepts,
            written,
            dropped,
            ..
        } => {
            assert_eq!(concepts, 0);
            assert_eq!(written, 0);
            assert_eq!(dropped, bad.len() as u64);
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[tokio::test]
async fn test_vector_search_orders_results() {
    let (addr, _dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();
    client.call(&learn("east", Some(vec![1.0, 0.0]))).await.unwrap();
    client.call(&learn("north", Some(vec![0.0, 1.0]))).await.unwrap();

    match client
        .call(&Request::VectorSearch {
            query_vector: vec![0.9, 0.1],
            k: 10,
            ef_search: None,
        })
        .await
        .unwrap()
    {
        Response::VectorSearchOk { results } => {
            assert_eq!(results.len(), 2);
            assert_eq!(results[0].0, ConceptId::from_content("east"));
            assert!(results[0].1 >= results[1].1);
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[tokio::test]
async fn test_learn_text_then_reason_then_flush() {
    let (addr, dir) = start().await;
    let mut client = Client::connect(addr).await.unwrap();

    match client
        .call(&Request::LearnText {
            text: "Heat melts ice. Ice cools water.".into(),
            confidence: 0.8,
        })
        .await
        .unwrap()
    {
        Response::LearnTextOk { concepts, .. } => assert_eq!(concepts, 5),
        other => panic!("unexpected response {other:?}"),
    }

    let reason = Request::Reason {
        query: "heat water".into(),
        query_vector: None,
        max_depth: None,
        num_paths: Some(1),
    };
    match client.call(&reason).await.unwrap() {
        Response::ReasonOk { paths, cached, .. } => {
            assert_eq!(paths.len(), 1);
            assert!(!cached);
        }
        other => panic!("unexpected response {other:?}"),
    }
    assert!(matches!(
        client.call(&reason).await.unwrap(),
        Response::ReasonOk { cached: true, .. }
    ));

    assert_eq!(client.call(&Request::Flush).await.unwrap(), Response::FlushOk);
    assert!(dir.path().join(concept_graph_storage::SNAPSHOT_FILE).exists());
}

#[tokio::test]
async fn test_concurrent_clients() {
    let (addr, _dir) = start().await;
    let tasks: Vec<_> = (0..8)
        .map(|i| {
            tokio::spawn(async move {
                let mut client = Client::connect(addr).await.unwrap();
                client
                    .call(&learn(&format!("fact {i}"), None))
                    .await
                    .unwrap()
            })
        })
        .collect();
    for task in tasks {
        assert!(matches!(task.await.unwrap(), Response::LearnConceptOk { .. }));
    }

    let mut client = Client::connect(addr).await.unwrap();
    assert!(matches!(
        client.call(&Request::GetStats).await.unwrap(),
        Response::StatsOk { concepts: 8, .. }
    ));
}
