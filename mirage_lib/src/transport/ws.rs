/**********************************************************************

Copyright (C) 2022 by the mirage authors

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.

**********************************************************************/

use crate::prelude::*;
use async_tungstenite::{
	tokio::{accept_hdr_async, client_async, TokioAdapter},
	tungstenite::{
		error::Error as WsError,
		handshake::server::{Callback, ErrorResponse, Request, Response},
		protocol::Message,
	},
	WebSocketStream,
};
use bytes::Bytes;
use futures::{ready, Sink as ItemSink, Stream as ItemStream};
use std::{
	io,
	task::{Context, Poll},
};
use tokio::io::ReadBuf;

pub type MessageStream<IO> = WebSocketStream<TokioAdapter<IO>>;
pub type WsStream<IO> = StreamWrapper<MessageStream<IO>>;

const MAX_REQUEST_HEAD: usize = 2048;

#[must_use]
pub fn make_url(hostname: &str, path: &str) -> String {
	format!("wss://{}{}", hostname, path)
}

#[must_use]
pub fn make_origin(hostname: &str) -> String {
	format!("https://{}", hostname)
}

/// Perform a client upgrade over `stream` with
/// `wss://hostname{path}` and `Origin: https://hostname`.
///
/// # Errors
///
/// Returns an [`io::Error`] on IO failure or a non-101 response.
pub async fn connect<IO>(stream: IO, hostname: &str, path: &str) -> io::Result<WsStream<IO>>
where
	IO: 'static + AsyncRead + AsyncWrite + Unpin,
{
	let request = http::Request::builder()
		.uri(make_url(hostname, path))
		.header("Origin", make_origin(hostname))
		.body(())
		.map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
	trace!("websocket request: {:?}", request);
	let (stream, response) = client_async(request, stream).await.map_err(to_io_err)?;
	if response.status() != http::StatusCode::SWITCHING_PROTOCOLS {
		return Err(io::Error::new(
			io::ErrorKind::Other,
			format!(
				"websocket upgrade rejected with status {}",
				response.status()
			),
		));
	}
	debug!("websocket connection established");
	Ok(StreamWrapper::new(stream))
}

/// Serve the upgrade on an inbound stream whose request head has already
/// been peeked (and rewound) by the caller.
///
/// # Errors
///
/// Returns an [`io::Error`] if the handshake fails.
pub async fn accept<IO>(stream: IO, path: &str) -> io::Result<WsStream<IO>>
where
	IO: AsyncRead + AsyncWrite + Unpin,
{
	let stream = accept_hdr_async(stream, CheckPath { path }).await.map_err(
		|e| match e {
			WsError::Io(e) => e,
			_ => io::Error::new(io::ErrorKind::Other, e),
		},
	)?;
	Ok(StreamWrapper::new(stream))
}

struct CheckPath<'a> {
	path: &'a str,
}

impl Callback for CheckPath<'_> {
	fn on_request(self, request: &Request, response: Response) -> Result<Response, ErrorResponse> {
		if !self.path.is_empty() && request.uri().path() != self.path {
			debug!(
				"websocket path mismatch, '{}' expected, '{}' received",
				self.path,
				request.uri().path(),
			);
			let response = http::response::Builder::new()
				.status(404)
				.body(None)
				.expect("cannot construct HTTP response");
			return Err(response);
		}
		Ok(response)
	}
}

/// Result of sniffing the first request off an inbound stream.
pub struct RequestHead {
	pub path: String,
	pub upgrade: Option<String>,
}

impl RequestHead {
	/// True when this request is a WebSocket upgrade for `path`.
	#[must_use]
	pub fn is_upgrade_to(&self, path: &str) -> bool {
		let upgrading = self
			.upgrade
			.as_deref()
			.map_or(false, |v| v.eq_ignore_ascii_case("websocket"));
		upgrading && self.path == path
	}
}

/// Read an HTTP request head off `stream` and parse its path and
/// `Upgrade` header. The caller is expected to run this over a
/// rewindable stream so the consumed bytes can be replayed.
///
/// Returns `None` when the bytes do not look like an HTTP request at all
/// or the head never terminates within the sniff window.
///
/// # Errors
///
/// Returns an [`io::Error`] on IO failure, including EOF mid-head.
pub async fn sniff_request<IO>(stream: &mut IO) -> io::Result<Option<RequestHead>>
where
	IO: AsyncRead + Unpin,
{
	let mut head = Vec::with_capacity(512);
	let mut chunk = [0_u8; 512];
	loop {
		let n = stream.read(&mut chunk).await?;
		if n == 0 {
			return Err(io::ErrorKind::UnexpectedEof.into());
		}
		head.extend_from_slice(&chunk[..n]);
		if find_pat(&head, CRLF_2).is_some() {
			break;
		}
		if head.len() > MAX_REQUEST_HEAD {
			debug!("request head too long ({} bytes), not http", head.len());
			return Ok(None);
		}
	}

	let mut headers = [httparse::EMPTY_HEADER; 64];
	let mut request = httparse::Request::new(&mut headers);
	match request.parse(&head) {
		Ok(httparse::Status::Complete(_)) => {}
		Ok(httparse::Status::Partial) | Err(_) => {
			debug!("not a valid http request");
			return Ok(None);
		}
	}
	let path = request.path.unwrap_or_default().to_owned();
	let upgrade = request
		.headers
		.iter()
		.find(|h| h.name.eq_ignore_ascii_case("upgrade"))
		.and_then(|h| std::str::from_utf8(h.value).ok())
		.map(str::to_owned);
	Ok(Some(RequestHead { path, upgrade }))
}

fn find_pat(src: &[u8], pat: &[u8]) -> Option<usize> {
	if src.len() < pat.len() {
		return None;
	}
	src.windows(pat.len()).position(|window| window == pat)
}

// ----------------------------------------------------
//                    StreamWrapper
// ----------------------------------------------------

/// Presents a message stream as a plain byte stream. Each write becomes
/// one binary message; what a read does not consume of an incoming
/// message is kept in `leftover` for the next read.
#[derive(Debug)]
pub struct StreamWrapper<S>
where
	S: ItemStream<Item = Result<Message, WsError>> + ItemSink<Message, Error = WsError> + Unpin,
{
	inner: S,
	leftover: Bytes,
}

impl<S> StreamWrapper<S>
where
	S: ItemStream<Item = Result<Message, WsError>> + ItemSink<Message, Error = WsError> + Unpin,
{
	fn new(inner: S) -> Self {
		Self {
			inner,
			leftover: Bytes::new(),
		}
	}

	fn inner_pin(&mut self) -> Pin<&mut S> {
		Pin::new(&mut self.inner)
	}
}

impl<S> AsyncRead for StreamWrapper<S>
where
	S: ItemStream<Item = Result<Message, WsError>> + ItemSink<Message, Error = WsError> + Unpin,
{
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		dst: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		let me = self.get_mut();
		loop {
			if !me.leftover.is_empty() {
				let len = std::cmp::min(me.leftover.len(), dst.remaining());
				dst.put_slice(&me.leftover[..len]);
				me.leftover.advance(len);
				return Poll::Ready(Ok(()));
			}
			let message = match ready!(me.inner_pin().poll_next(cx)) {
				Some(message) => message.map_err(to_io_err)?,
				// EOF reached.
				None => return Poll::Ready(Ok(())),
			};
			me.leftover = match message {
				Message::Binary(data) => data.into(),
				Message::Text(data) => data.into_bytes().into(),
				Message::Close(_) => return Poll::Ready(Ok(())),
				// Control frames are handled by tungstenite; go read
				// the next message.
				_ => continue,
			};
		}
	}
}

impl<S> AsyncWrite for StreamWrapper<S>
where
	S: ItemStream<Item = Result<Message, WsError>> + ItemSink<Message, Error = WsError> + Unpin,
{
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<Result<usize, io::Error>> {
		let me = self.get_mut();
		ready!(me.inner_pin().poll_ready(cx)).map_err(to_io_err)?;
		me.inner_pin()
			.start_send(Message::Binary(buf.to_vec()))
			.map_err(to_io_err)?;
		Poll::Ready(Ok(buf.len()))
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		ready!(self.get_mut().inner_pin().poll_flush(cx)).map_err(to_io_err)?;
		Poll::Ready(Ok(()))
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		match ready!(self.get_mut().inner_pin().poll_close(cx)) {
			// The peer may have torn the socket down already;
			// a failed close handshake is still a shutdown.
			Ok(()) | Err(WsError::ConnectionClosed | WsError::AlreadyClosed) => {
				Poll::Ready(Ok(()))
			}
			Err(err) => Poll::Ready(Err(to_io_err(err))),
		}
	}
}

#[inline]
fn to_io_err(err: WsError) -> io::Error {
	if let WsError::Io(err) = err {
		return err;
	}
	io::Error::new(io::ErrorKind::Other, err)
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::{duplex, AsyncWriteExt};

	#[test]
	fn test_client_server_upgrade_and_stream() {
		let task = async {
			let (a, b) = duplex(8 * 1024);
			let client = connect(a, "example.com", "/tunnel");
			let server = accept(b, "/tunnel");
			let (client, server) = futures::future::join(client, server).await;
			let mut client = client.unwrap();
			let mut server = server.unwrap();

			client.write_all(b"ping over ws").await.unwrap();
			client.flush().await.unwrap();
			let mut buf = [0_u8; 12];
			server.read_exact(&mut buf).await.unwrap();
			assert_eq!(&buf, b"ping over ws");

			server.write_all(b"pong").await.unwrap();
			server.flush().await.unwrap();
			let mut buf = [0_u8; 4];
			client.read_exact(&mut buf).await.unwrap();
			assert_eq!(&buf, b"pong");
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_partial_reads_keep_leftover() {
		let task = async {
			let (a, b) = duplex(8 * 1024);
			let client = connect(a, "example.com", "/tunnel");
			let server = accept(b, "/tunnel");
			let (client, server) = futures::future::join(client, server).await;
			let mut client = client.unwrap();
			let mut server = server.unwrap();

			// One message, consumed in two reads.
			client.write_all(b"0123456789").await.unwrap();
			client.flush().await.unwrap();
			let mut first = [0_u8; 4];
			server.read_exact(&mut first).await.unwrap();
			assert_eq!(&first, b"0123");
			let mut rest = [0_u8; 6];
			server.read_exact(&mut rest).await.unwrap();
			assert_eq!(&rest, b"456789");
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_sniff_request() {
		let task = async {
			let (mut a, mut b) = duplex(4096);
			a.write_all(
				b"GET /tunnel HTTP/1.1\r\nHost: example.com\r\n\
				Upgrade: WebSocket\r\nConnection: Upgrade\r\n\r\n",
			)
			.await
			.unwrap();
			let head = sniff_request(&mut b).await.unwrap().unwrap();
			assert!(head.is_upgrade_to("/tunnel"));
			assert!(!head.is_upgrade_to("/other"));
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_sniff_rejects_non_http() {
		let task = async {
			let (mut a, mut b) = duplex(4096);
			let mut junk = vec![0xfe_u8; 300];
			junk.extend_from_slice(b"\r\n\r\n");
			a.write_all(&junk).await.unwrap();
			let head = sniff_request(&mut b).await.unwrap();
			assert!(head.is_none());
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_sniff_plain_http_is_not_upgrade() {
		let task = async {
			let (mut a, mut b) = duplex(4096);
			a.write_all(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n")
				.await
				.unwrap();
			let head = sniff_request(&mut b).await.unwrap().unwrap();
			assert!(!head.is_upgrade_to("/tunnel"));
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}
}
