//! Request dispatch onto the knowledge engine.

use std::sync::Arc;
use std::time::Instant;

use concept_graph_graph::{GraphError, KnowledgeEngine};
use tracing::{debug, error, warn};

use crate::protocol::{ErrorKind, Request, Response};

/// Engine handle shared by every connection.
pub struct Handlers {
    engine: Arc<KnowledgeEngine>,
    started: Instant,
}

impl Handlers {
    pub fn new(engine: Arc<KnowledgeEngine>) -> Self {
        Self {
            engine,
            started: Instant::now(),
        }
    }

    pub fn engine(&self) -> &Arc<KnowledgeEngine> {
        &self.engine
    }

    /// Run `request` on the blocking pool. Engine calls take locks and may
    /// fsync, so they never run on the async workers.
    pub async fn handle(self: Arc<Self>, request: Request) -> Response {
        let name = request.name();
        match tokio::task::spawn_blocking(move || self.dispatch(request)).await {
            Ok(response) => response,
            Err(e) => {
                error!(request = name, error = %e, "Request handler panicked");
                Response::error(ErrorKind::Storage, format!("{name} handler failed: {e}"))
            }
        }
    }

    /// Execute one request synchronously.
    pub fn dispatch(&self, request: Request) -> Response {
        let name = request.name();
        let response = match self.execute(request) {
            Ok(response) => response,
            Err(e) => {
                let kind = if e.is_validation() {
                    ErrorKind::Validation
                } else {
                    ErrorKind::Storage
                };
                if kind == ErrorKind::Storage {
                    error!(request = name, error = %e, "Request failed");
                } else {
                    warn!(request = name, error = %e, "Request rejected");
                }
                Response::error(kind, e.to_string())
            }
        };
        debug!(request = name, error = response.is_error(), "Handled request");
        response
    }

    fn execute(&self, request: Request) -> Result<Response, GraphError> {
        let engine = &self.engine;
        let response = match request {
            Request::LearnConcept {
                concept_id,
                content,
                embedding,
                strength,
                confidence,
            } => {
                let receipt = engine.learn_concept_with_id(
                    concept_id,
                    &content,
                    embedding.as_deref(),
                    strength,
                    confidence,
                )?;
                Response::LearnConceptOk {
                    sequence: receipt.sequence,
                    concept_id: receipt.id,
                }
            }

            Request::LearnAssociation {
                source_id,
                target_id,
                assoc_type,
                confidence,
            } => Response::LearnAssociationOk {
                sequence: engine.learn_association(source_id, target_id, assoc_type, confidence)?,
            },

            Request::QueryConcept { concept_id } => match engine.query_concept(&concept_id) {
                Some(concept) => Response::QueryConceptOk {
                    found: true,
                    concept_id,
                    content: concept.content,
                    strength: concept.strength,
                    confidence: concept.confidence,
                },
                None => Response::QueryConceptOk {
                    found: false,
                    concept_id,
                    content: String::new(),
                    strength: 0.0,
                    confidence: 0.0,
                },
            },

            Request::GetNeighbors { concept_id } => Response::GetNeighborsOk {
                neighbor_ids: engine.get_neighbors(&concept_id),
            },

            Request::FindPath {
                start_id,
                end_id,
                max_depth,
            } => match engine.find_path(start_id, end_id, max_depth.map(|d| d as usize))? {
                Some(path) => Response::FindPathOk {
                    found: true,
                    confidence: path.confidence,
                    path: path.nodes,
                },
                None => Response::FindPathOk {
                    found: false,
                    path: Vec::new(),
                    confidence: 0.0,
                },
            },

            Request::VectorSearch {
                query_vector,
                k,
                ef_search,
            } => Response::VectorSearchOk {
                results: engine.vector_search(
                    &query_vector,
                    k as usize,
                    ef_search.map(|ef| ef as usize),
                )?,
            },

            Request::GetStats => {
                let stats = engine.stats().store;
                Response::StatsOk {
                    concepts: stats.concepts,
                    edges: stats.edges,
                    written: stats.written,
                    dropped: stats.dropped,
                    pending: stats.pending,
                    reconciliations: stats.reconciliations,
                    uptime_seconds: stats.uptime.as_secs(),
                }
            }

            Request::Flush => {
                engine.flush()?;
                Response::FlushOk
            }

            Request::HealthCheck => Response::HealthCheckOk {
                healthy: true,
                status: "ok".to_string(),
                uptime_seconds: self.started.elapsed().as_secs(),
            },

            Request::Reason {
                query,
                query_vector,
                max_depth,
                num_paths,
            } => {
                let result = engine.reason(
                    &query,
                    query_vector.as_deref(),
                    max_depth.map(|d| d as usize),
                    num_paths.map(|n| n as usize),
                )?;
                Response::ReasonOk {
                    seeds: result.seeds,
                    paths: result.paths,
                    confidence: result.confidence,
                    cached: result.cached,
                }
            }

            Request::LearnText { text, confidence } => {
                let outcome = engine.learn_text(&text, confidence)?;
                Response::LearnTextOk {
                    concepts: outcome.concepts,
                    associations: outcome.associations,
                }
            }
        };
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use concept_graph_core::types::ConceptId;
    use concept_graph_core::Config;

    use super::*;

    fn handlers(dir: &std::path::Path) -> Handlers {
        let mut config = Config::default();
        config.storage.data_dir = dir.display().to_string();
        config.index.dimension = 2;
        Handlers::new(Arc::new(KnowledgeEngine::open(config).unwrap()))
    }

    fn learn(content: &str) -> Request {
        Request::LearnConcept {
            concept_id: None,
            content: content.into(),
            embedding: None,
            strength: 1.0,
            confidence: 0.9,
        }
    }

    #[test]
    fn test_mismatched_id_rejected_before_write() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(dir.path());
        let response = handlers.dispatch(Request::LearnConcept {
            concept_id: Some(ConceptId::from_content("something else")),
            content: "gravity bends light".into(),
            embedding: None,
            strength: 1.0,
            confidence: 0.9,
        });
        assert!(matches!(
            response,
            Response::Error {
                kind: ErrorKind::Validation,
                ..
            }
        ));
        let stats = handlers.engine().stats().store;
        assert_eq!(stats.written, 0);
        assert_eq!(stats.dropped, 1);
    }

    #[test]
    fn test_rejected_writes_show_in_stats() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(dir.path());
        handlers.dispatch(Request::LearnConcept {
            concept_id: Some(ConceptId::from_content("something else")),
            content: "gravity bends light".into(),
            embedding: None,
            strength: 1.0,
            confidence: 0.9,
        });
        let response = handlers.dispatch(Request::LearnText {
            text: "  \n ".into(),
            confidence: 0.5,
        });
        assert!(matches!(
            response,
            Response::Error {
                kind: ErrorKind::Validation,
                ..
            }
        ));

        match handlers.dispatch(Request::GetStats) {
            Response::StatsOk {
                written, dropped, ..
            } => {
                assert_eq!(written, 0);
                assert_eq!(dropped, 2);
            }
            other => panic!("unexpected response {other:?}"),
        }
    }

    #[test]
    fn test_matching_id_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(dir.path());
        let id = ConceptId::from_content("gravity bends light");
        let response = handlers.dispatch(Request::LearnConcept {
            concept_id: Some(id),
            content: "gravity bends light".into(),
            embedding: None,
            strength: 1.0,
            confidence: 0.9,
        });
        assert_eq!(
            response,
            Response::LearnConceptOk {
                sequence: 1,
                concept_id: id
            }
        );
    }

    #[test]
    fn test_find_path_reports_absence_in_band() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(dir.path());
        handlers.dispatch(learn("alpha"));
        let response = handlers.dispatch(Request::FindPath {
            start_id: ConceptId::from_content("alpha"),
            end_id: ConceptId::from_content("omega"),
            max_depth: None,
        });
        assert_eq!(
            response,
            Response::FindPathOk {
                found: false,
                path: Vec::new(),
                confidence: 0.0
            }
        );
    }

    #[test]
    fn test_excessive_depth_is_validation() {
        let dir = tempfile::tempdir().unwrap();
        let handlers = handlers(dir.path());
        let response = handlers.dispatch(Request::FindPath {
            start_id: ConceptId::from_content("alpha"),
            end_id: ConceptId::from_content("omega"),
            max_depth: Some(1_000),
        });
        assert!(matches!(
            response,
            Response::Error {
                kind: ErrorKind::Validation,
                ..
            }
        ));
    }
}
