//! Async client for the wire protocol.

use tokio::io::{BufReader, BufWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};

use crate::protocol::{
    decode_response, encode_request, read_frame, write_frame, ProtocolError, Request, Response,
    DEFAULT_MAX_FRAME_BYTES,
};

/// One connection to a server. Requests are sent one at a time.
///
/// # Example
///
/// ```no_run
/// use concept_graph_server::{Client, Request};
///
/// # async fn run() -> Result<(), concept_graph_server::ProtocolError> {
/// let mut client = Client::connect("127.0.0.1:7420").await?;
/// let response = client.call(&Request::HealthCheck).await?;
/// println!("{response:?}");
/// # Ok(())
/// # }
/// ```
pub struct Client {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
    max_frame_bytes: usize,
}

impl Client {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        let (reader, writer) = stream.into_split();
        Ok(Self {
            reader: BufReader::new(reader),
            writer: BufWriter::new(writer),
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        })
    }

    /// Builder: largest response payload accepted.
    #[must_use]
    pub fn with_max_frame_bytes(mut self, max_frame_bytes: usize) -> Self {
        self.max_frame_bytes = max_frame_bytes;
        self
    }

    /// Send a request and wait for its response.
    pub async fn call(&mut self, request: &Request) -> Result<Response, ProtocolError> {
        let payload = encode_request(request)?;
        self.send_raw_frame(&payload).await
    }

    /// Send an arbitrary payload as one frame and wait for the response.
    /// Useful for exercising the server's handling of malformed input.
    pub async fn send_raw_frame(&mut self, payload: &[u8]) -> Result<Response, ProtocolError> {
        write_frame(&mut self.writer, payload).await?;
        match read_frame(&mut self.reader, self.max_frame_bytes).await? {
            Some(frame) => decode_response(&frame),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )
            .into()),
        }
    }
}
