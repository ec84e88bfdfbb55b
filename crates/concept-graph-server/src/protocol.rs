//! Wire protocol types and framing.

use std::io;

use concept_graph_core::types::{AssociationType, ConceptId};
use concept_graph_graph::Path;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload a [`crate::Client`] accepts by default (16 MiB).
pub const DEFAULT_MAX_FRAME_BYTES: usize = 16 * 1024 * 1024;

/// Client request. The variant order is the wire tag and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Request {
    LearnConcept {
        /// Optional client-computed id; must equal the content-derived id.
        concept_id: Option<ConceptId>,
        content: String,
        embedding: Option<Vec<f32>>,
        strength: f32,
        confidence: f32,
    },
    LearnAssociation {
        source_id: ConceptId,
        target_id: ConceptId,
        assoc_type: AssociationType,
        confidence: f32,
    },
    QueryConcept {
        concept_id: ConceptId,
    },
    GetNeighbors {
        concept_id: ConceptId,
    },
    FindPath {
        start_id: ConceptId,
        end_id: ConceptId,
        /// Server default when absent.
        max_depth: Option<u32>,
    },
    VectorSearch {
        query_vector: Vec<f32>,
        k: u32,
        ef_search: Option<u32>,
    },
    GetStats,
    Flush,
    HealthCheck,
    Reason {
        query: String,
        query_vector: Option<Vec<f32>>,
        max_depth: Option<u32>,
        num_paths: Option<u32>,
    },
    LearnText {
        text: String,
        confidence: f32,
    },
}

impl Request {
    /// Variant name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Request::LearnConcept { .. } => "LearnConcept",
            Request::LearnAssociation { .. } => "LearnAssociation",
            Request::QueryConcept { .. } => "QueryConcept",
            Request::GetNeighbors { .. } => "GetNeighbors",
            Request::FindPath { .. } => "FindPath",
            Request::VectorSearch { .. } => "VectorSearch",
            Request::GetStats => "GetStats",
            Request::Flush => "Flush",
            Request::HealthCheck => "HealthCheck",
            Request::Reason { .. } => "Reason",
            Request::LearnText { .. } => "LearnText",
        }
    }
}

/// Error category reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Request input was rejected; nothing was written.
    Validation,
    /// Reserved. Lookups report absence in-band (`found = false`, empty
    /// lists) rather than with this kind.
    NotFound,
    /// The store failed to read or write.
    Storage,
    /// The frame or payload could not be understood.
    Protocol,
}

/// Server response. The variant order is the wire tag and must stay stable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Response {
    LearnConceptOk {
        sequence: u64,
        concept_id: ConceptId,
    },
    LearnAssociationOk {
        sequence: u64,
    },
    QueryConceptOk {
        found: bool,
        concept_id: ConceptId,
        content: String,
        strength: f32,
        confidence: f32,
    },
    GetNeighborsOk {
        neighbor_ids: Vec<ConceptId>,
    },
    FindPathOk {
        found: bool,
        path: Vec<ConceptId>,
        confidence: f32,
    },
    VectorSearchOk {
        results: Vec<(ConceptId, f32)>,
    },
    StatsOk {
        concepts: u64,
        edges: u64,
        written: u64,
        dropped: u64,
        pending: u64,
        reconciliations: u64,
        uptime_seconds: u64,
    },
    FlushOk,
    HealthCheckOk {
        healthy: bool,
        status: String,
        uptime_seconds: u64,
    },
    ReasonOk {
        seeds: Vec<ConceptId>,
        paths: Vec<Path>,
        confidence: f32,
        cached: bool,
    },
    LearnTextOk {
        concepts: u64,
        associations: u64,
    },
    Error {
        kind: ErrorKind,
        message: String,
    },
}

impl Response {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Response::Error {
            kind,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Response::Error { .. })
    }
}

/// Framing and codec errors.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The length prefix exceeds the configured maximum. The payload was
    /// read and discarded.
    #[error("Frame of {len} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Failed to decode payload: {0}")]
    Decode(String),

    #[error("Failed to encode payload: {0}")]
    Encode(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl ProtocolError {
    /// True when the connection can keep serving frames.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProtocolError::Io(_))
    }
}

pub fn encode_request(request: &Request) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(request).map_err(|e| ProtocolError::Encode(e.to_string()))
}

pub fn decode_request(payload: &[u8]) -> Result<Request, ProtocolError> {
    bincode::deserialize(payload).map_err(|e| ProtocolError::Decode(e.to_string()))
}

pub fn encode_response(response: &Response) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(response).map_err(|e| ProtocolError::Encode(e.to_string()))
}

pub fn decode_response(payload: &[u8]) -> Result<Response, ProtocolError> {
    bincode::deserialize(payload).map_err(|e| ProtocolError::Decode(e.to_string()))
}

/// Read one frame.
///
/// # Returns
/// * `Ok(Some(payload))` - a complete frame
/// * `Ok(None)` - the peer closed the connection before a new frame
/// * `Err(FrameTooLarge)` - the announced payload was drained and dropped
/// * `Err(Io)` - the connection failed, including EOF inside a frame
pub async fn read_frame<R>(
    reader: &mut R,
    max_frame_bytes: usize,
) -> Result<Option<Vec<u8>>, ProtocolError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; 4];
    match reader.read_exact(&mut prefix).await {
        Ok(_) => {}
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_be_bytes(prefix) as usize;
    if len > max_frame_bytes {
        let mut discarded = (&mut *reader).take(len as u64);
        let drained = tokio::io::copy(&mut discarded, &mut tokio::io::sink()).await?;
        if drained < len as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed inside an oversized frame",
            )
            .into());
        }
        return Err(ProtocolError::FrameTooLarge {
            len,
            max: max_frame_bytes,
        });
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(Some(payload))
}

/// Write one frame and flush it.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
{
    let len = u32::try_from(payload.len()).map_err(|_| {
        ProtocolError::Encode(format!("payload of {} bytes does not fit a frame", payload.len()))
    })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut bytes = (payload.len() as u32).to_be_bytes().to_vec();
        bytes.extend_from_slice(payload);
        bytes
    }

    #[test]
    fn test_request_roundtrip() {
        let request = Request::LearnConcept {
            concept_id: Some(ConceptId::from_content("fire is hot")),
            content: "fire is hot".into(),
            embedding: Some(vec![0.5, -0.25]),
            strength: 1.0,
            confidence: 0.8,
        };
        let bytes = encode_request(&request).unwrap();
        assert_eq!(decode_request(&bytes).unwrap(), request);
    }

    #[test]
    fn test_variant_tags_are_positional() {
        // bincode writes the variant index as a little-endian u32.
        assert_eq!(encode_request(&Request::GetStats).unwrap(), 6u32.to_le_bytes());
        assert_eq!(encode_request(&Request::HealthCheck).unwrap(), 8u32.to_le_bytes());
        assert_eq!(encode_response(&Response::FlushOk).unwrap(), 7u32.to_le_bytes());
    }

    #[test]
    fn test_unknown_tag_is_decode_error() {
        let err = decode_request(&99u32.to_le_bytes()).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_truncated_payload_is_decode_error() {
        let bytes = encode_request(&Request::QueryConcept {
            concept_id: ConceptId::from_content("x"),
        })
        .unwrap();
        let err = decode_request(&bytes[..bytes.len() - 3]).unwrap_err();
        assert!(matches!(err, ProtocolError::Decode(_)));
    }

    #[tokio::test]
    async fn test_frame_roundtrip() {
        let mut wire = Vec::new();
        write_frame(&mut wire, b"hello").await.unwrap();
        assert_eq!(wire, framed(b"hello"));

        let mut reader = wire.as_slice();
        assert_eq!(read_frame(&mut reader, 16).await.unwrap().unwrap(), b"hello");
        assert!(read_frame(&mut reader, 16).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_drained() {
        let mut wire = framed(&[7u8; 64]);
        wire.extend(framed(b"next"));

        let mut reader = wire.as_slice();
        let err = read_frame(&mut reader, 32).await.unwrap_err();
        assert!(matches!(err, ProtocolError::FrameTooLarge { len: 64, max: 32 }));
        assert_eq!(read_frame(&mut reader, 32).await.unwrap().unwrap(), b"next");
    }

    #[tokio::test]
    async fn test_eof_inside_frame_is_io_error() {
        let wire = framed(b"complete payload");
        let mut reader = &wire[..wire.len() - 4];
        let err = read_frame(&mut reader, 1024).await.unwrap_err();
        assert!(!err.is_recoverable());
    }
}
