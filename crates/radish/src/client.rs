//! One request at a time over a byte stream.

use std::io::IoSlice;

use bytes::BytesMut;
use resp::AnyReply;
use resp::ByteExpr;
use resp::Charset;
use resp::CodecCache;
use resp::EncodeError;
use resp::ReplyParser;
use resp::RespError;
use resp::RespParseResult;
use resp::RespValue;
use resp::ServerError;
use resp::StringFactory;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::config::ClientConfig;
use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum ClientError {
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),

	#[error("Failed to encode command: {0}")]
	Encode(#[from] EncodeError),

	#[error("Protocol error: {0}")]
	Protocol(#[from] RespError),

	#[error("Configuration error: {0}")]
	Config(#[from] ConfigError),

	#[error("Connection closed by server")]
	ConnectionClosed,

	#[error("Empty command")]
	EmptyCommand,
}

pub type Reply = Result<RespValue<String>, ServerError>;

pub struct Client<S> {
	stream: S,
	parser: ReplyParser<AnyReply, StringFactory>,
	codecs: CodecCache,
	buffer: BytesMut,
	charset: Charset,
	read_buffer_size: usize,
	compact: bool,
}

impl Client<TcpStream> {
	pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
		let addr = config.addr();
		let stream = TcpStream::connect(&addr).await?;
		stream.set_nodelay(true)?;
		log::info!("connected to {}", addr);
		Self::new(stream, config)
	}
}

impl<S> Client<S>
where
	S: AsyncRead + AsyncWrite + Unpin,
{
	pub fn new(stream: S, config: &ClientConfig) -> Result<Self, ClientError> {
		let charset = config.charset()?;
		Ok(Self {
			stream,
			parser: resp::any_reply(StringFactory::with_max_len(config.max_bulk_len)),
			codecs: CodecCache::new(),
			buffer: BytesMut::with_capacity(config.read_buffer_size),
			charset,
			read_buffer_size: config.read_buffer_size,
			compact: config.compact,
		})
	}

	/// Send `words` as one command and wait for its reply.
	///
	/// A `-` reply from the server is returned as `Ok(Err(..))`; protocol
	/// corruption and transport failures leave the connection unusable.
	pub async fn execute<W: AsRef<str>>(&mut self, words: &[W]) -> Result<Reply, ClientError> {
		if words.is_empty() {
			return Err(ClientError::EmptyCommand);
		}
		self.send(words).await?;
		self.read_reply().await
	}

	async fn send<W: AsRef<str>>(&mut self, words: &[W]) -> Result<(), ClientError> {
		let mut request = resp::command_from_words(self.charset, words.iter().map(AsRef::<str>::as_ref))?;
		if self.compact {
			request = request.compact();
		}
		log::debug!(
			"sending {} argument(s), {} bytes in {} span(s)",
			request.arg_count(),
			request.len(),
			request.span_count()
		);

		self.write_spans(&request).await?;
		self.stream.flush().await?;
		Ok(())
	}

	/// Vectored write of every span of `request`, resuming after partial
	/// writes.
	async fn write_spans(&mut self, request: &ByteExpr<'_>) -> std::io::Result<()> {
		let mut slices = request.io_slices();
		let mut pending: &mut [IoSlice<'_>] = &mut slices;
		while !pending.is_empty() {
			let n = self.stream.write_vectored(pending).await?;
			if n == 0 {
				return Err(std::io::ErrorKind::WriteZero.into());
			}
			IoSlice::advance_slices(&mut pending, n);
		}
		Ok(())
	}

	async fn read_reply(&mut self) -> Result<Reply, ClientError> {
		loop {
			let decoder = self.codecs.decoder(self.charset);
			match self.parser.next_reply(&mut self.buffer, decoder) {
				RespParseResult::Complete(reply) => return Ok(reply),
				RespParseResult::Incomplete => {}
				RespParseResult::Error(e) => {
					log::error!("dropping connection: {}", e);
					return Err(e.into());
				}
			}

			self.buffer.reserve(self.read_buffer_size);
			let n = (&mut self.stream)
				.take(self.read_buffer_size as u64)
				.read_buf(&mut self.buffer)
				.await?;
			if n == 0 {
				return Err(ClientError::ConnectionClosed);
			}
			log::trace!("read {} bytes", n);
		}
	}
}

#[cfg(test)]
mod tests {
	use tokio::io::DuplexStream;

	use super::*;

	fn config() -> ClientConfig {
		ClientConfig {
			read_buffer_size: 3,
			..ClientConfig::default()
		}
	}

	/// Reads one request from `server` and answers with `reply`.
	async fn serve_once(server: &mut DuplexStream, expected: &[u8], reply: &[u8]) {
		let mut request = vec![0; expected.len()];
		server.read_exact(&mut request).await.unwrap();
		assert_eq!(request, expected);
		server.write_all(reply).await.unwrap();
	}

	#[tokio::test]
	async fn test_execute_round_trip() {
		let (stream, mut server) = tokio::io::duplex(64);
		let mut client = Client::new(stream, &config()).unwrap();

		let server_task = tokio::spawn(async move {
			serve_once(&mut server, b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n$2\r\nv1\r\n", b"+OK\r\n").await;
			serve_once(&mut server, b"*2\r\n$3\r\nGET\r\n$1\r\nk\r\n", b"$2\r\nv1\r\n").await;
			serve_once(&mut server, b"*1\r\n$3\r\nFOO\r\n", b"-ERR unknown\r\n").await;
		});

		let reply = client.execute(&["SET", "k", "v1"]).await.unwrap();
		assert_eq!(reply, Ok(RespValue::simple_string("OK")));
		let reply = client.execute(&["GET", "k"]).await.unwrap();
		assert_eq!(reply, Ok(RespValue::BulkString("v1".to_string())));
		let reply = client.execute(&["FOO"]).await.unwrap();
		assert_eq!(reply, Err(ServerError("ERR unknown".to_string())));

		server_task.await.unwrap();
	}

	#[tokio::test]
	async fn test_reply_in_configured_charset() {
		let (stream, mut server) = tokio::io::duplex(64);
		let config = ClientConfig {
			charset: "latin1".into(),
			..config()
		};
		let mut client = Client::new(stream, &config).unwrap();

		let server_task = tokio::spawn(async move {
			serve_once(&mut server, b"*2\r\n$4\r\nECHO\r\n$2\r\n\xE9t\r\n", b"$2\r\n\xE9t\r\n").await;
		});

		let reply = client.execute(&["ECHO", "ét"]).await.unwrap();
		assert_eq!(reply, Ok(RespValue::BulkString("ét".to_string())));
		server_task.await.unwrap();
	}

	#[tokio::test]
	async fn test_corrupt_reply_is_fatal() {
		let (stream, mut server) = tokio::io::duplex(64);
		let mut client = Client::new(stream, &config()).unwrap();

		let server_task = tokio::spawn(async move {
			serve_once(&mut server, b"*1\r\n$4\r\nPING\r\n", b"?what\r\n").await;
		});

		let result = client.execute(&["PING"]).await;
		assert!(matches!(result, Err(ClientError::Protocol(_))));
		server_task.await.unwrap();
	}

	#[tokio::test]
	async fn test_connection_closed_mid_reply() {
		let (stream, mut server) = tokio::io::duplex(64);
		let mut client = Client::new(stream, &config()).unwrap();

		let server_task = tokio::spawn(async move {
			serve_once(&mut server, b"*1\r\n$4\r\nPING\r\n", b"+PO").await;
			drop(server);
		});

		let result = client.execute(&["PING"]).await;
		assert!(matches!(result, Err(ClientError::ConnectionClosed)));
		server_task.await.unwrap();
	}

	#[tokio::test]
	async fn test_large_argument_is_written_whole() {
		// Bigger than both the compaction limit and the pipe, so the
		// vectored write has to resume after partial writes.
		let value = "v".repeat(resp::COMPACT_SPAN_LIMIT * 4);
		let mut expected = format!("*3\r\n$3\r\nSET\r\n$1\r\nk\r\n${}\r\n", value.len()).into_bytes();
		expected.extend_from_slice(value.as_bytes());
		expected.extend_from_slice(b"\r\n");

		for compact in [true, false] {
			let (stream, mut server) = tokio::io::duplex(32);
			let config = ClientConfig {
				compact,
				..config()
			};
			let mut client = Client::new(stream, &config).unwrap();

			let request = expected.clone();
			let server_task = tokio::spawn(async move {
				serve_once(&mut server, &request, b"+OK\r\n").await;
			});

			let reply = client.execute(&["SET", "k", value.as_str()]).await.unwrap();
			assert_eq!(reply, Ok(RespValue::simple_string("OK")));
			server_task.await.unwrap();
		}
	}

	#[tokio::test]
	async fn test_empty_command() {
		let (stream, _server) = tokio::io::duplex(64);
		let mut client = Client::new(stream, &config()).unwrap();
		let words: [&str; 0] = [];
		assert!(matches!(
			client.execute(&words).await,
			Err(ClientError::EmptyCommand)
		));
	}
}
