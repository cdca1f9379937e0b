// src/transport/tcp.rs

use crate::error::WampError;
use crate::protocol::rawsocket::{FrameKind, RawFrame, RawSocketCodec, RawSocketHandshake, HANDSHAKE_LENGTH};
use crate::session::options::RawSocketOptions;
use crate::transport::Transport;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::codec::{FramedRead, FramedWrite};

type FrameReader = FramedRead<OwnedReadHalf, RawSocketCodec>;
type FrameWriter = FramedWrite<OwnedWriteHalf, RawSocketCodec>;

/// WAMP RawSocket over TCP.
///
/// The read and write halves sit behind separate locks so that the listener
/// can park in `receive()` while other tasks keep sending.
#[derive(Debug)]
pub struct RawSocketTransport {
  endpoint: String,
  address: String,
  options: RawSocketOptions,
  serializer: u8,
  reader: TokioMutex<Option<FrameReader>>,
  writer: TokioMutex<Option<FrameWriter>>,
}

impl RawSocketTransport {
  pub fn new(endpoint: String, address: String, options: RawSocketOptions, serializer: u8) -> Self {
    Self {
      endpoint,
      address,
      options,
      serializer,
      reader: TokioMutex::new(None),
      writer: TokioMutex::new(None),
    }
  }

  fn configure_stream(&self, stream: &TcpStream) -> Result<(), WampError> {
    stream.set_nodelay(self.options.tcp_nodelay)?;
    if let Some(idle) = self.options.tcp_keepalive {
      SockRef::from(stream).set_tcp_keepalive(&TcpKeepalive::new().with_time(idle))?;
    }
    Ok(())
  }

  async fn handshake(&self, stream: &mut TcpStream) -> Result<RawSocketHandshake, WampError> {
    let ours = RawSocketHandshake::new(self.options.max_length_exponent, self.serializer);
    stream.write_all(&ours.encode()).await?;
    let mut reply = [0u8; HANDSHAKE_LENGTH];
    stream
      .read_exact(&mut reply)
      .await
      .map_err(|e| WampError::from_io_endpoint(e, &self.endpoint))?;
    let theirs = RawSocketHandshake::decode_reply(&reply, self.serializer)?;
    tracing::debug!(
      uri = %self.endpoint,
      router_max_len = theirs.max_message_len(),
      "RawSocket handshake complete"
    );
    Ok(theirs)
  }

  async fn send_frame(&self, frame: RawFrame) -> Result<(), WampError> {
    let mut writer_guard = self.writer.lock().await;
    let writer = writer_guard.as_mut().ok_or(WampError::ConnectionClosed)?;
    writer.send(frame).await
  }
}

#[async_trait]
impl Transport for RawSocketTransport {
  fn url(&self) -> &str {
    &self.endpoint
  }

  async fn connect(&self) -> Result<(), WampError> {
    if self.writer.lock().await.is_some() {
      return Err(WampError::InvalidState("transport already connected"));
    }

    let connect_timeout = self.options.connect_timeout;
    let mut stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(&self.address)).await {
      Ok(Ok(stream)) => stream,
      Ok(Err(e)) => return Err(WampError::from_io_endpoint(e, &self.endpoint)),
      Err(_) => return Err(WampError::Timeout(connect_timeout)),
    };
    self.configure_stream(&stream)?;
    let ours = RawSocketHandshake::new(self.options.max_length_exponent, self.serializer);
    let theirs = self.handshake(&mut stream).await?;

    let (read_half, write_half) = stream.into_split();
    let reader = FramedRead::new(
      read_half,
      RawSocketCodec::new(ours.max_message_len(), theirs.max_message_len()),
    );
    let writer = FramedWrite::new(
      write_half,
      RawSocketCodec::new(ours.max_message_len(), theirs.max_message_len()),
    );
    *self.reader.lock().await = Some(reader);
    *self.writer.lock().await = Some(writer);
    tracing::info!(uri = %self.endpoint, "RawSocket transport connected");
    Ok(())
  }

  async fn send(&self, frame: Bytes) -> Result<(), WampError> {
    self.send_frame(RawFrame::message(frame)).await
  }

  async fn receive(&self) -> Result<Option<Bytes>, WampError> {
    let mut reader_guard = self.reader.lock().await;
    let reader = reader_guard.as_mut().ok_or(WampError::ConnectionClosed)?;
    loop {
      match reader.next().await {
        Some(Ok(RawFrame {
          kind: FrameKind::Message,
          payload,
        })) => return Ok(Some(payload)),
        Some(Ok(RawFrame {
          kind: FrameKind::Ping,
          payload,
        })) => {
          tracing::trace!(uri = %self.endpoint, "RawSocket PING, answering PONG");
          self
            .send_frame(RawFrame {
              kind: FrameKind::Pong,
              payload,
            })
            .await?;
        }
        Some(Ok(RawFrame {
          kind: FrameKind::Pong, ..
        })) => {
          tracing::trace!(uri = %self.endpoint, "RawSocket PONG ignored");
        }
        Some(Err(e)) => return Err(e),
        None => return Ok(None),
      }
    }
  }

  async fn disconnect(&self) -> Result<(), WampError> {
    let writer = self.writer.lock().await.take();
    let result = match writer {
      Some(writer) => {
        let mut write_half = writer.into_inner();
        write_half.shutdown().await.map_err(WampError::from)
      }
      None => Ok(()),
    };
    self.reader.lock().await.take();
    tracing::debug!(uri = %self.endpoint, "RawSocket transport disconnected");
    result
  }
}
