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

// HTTP proxy intake: CONNECT plus the plain absolute-URI form.

use crate::{prelude::*, protocol::Request};
use std::io;

const MAX_REQUEST_HEAD: usize = 8 * 1024;
const MAX_HEADERS_NUM: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("IO error ({0})")]
	Io(#[from] io::Error),
	#[error("bad request ({0})")]
	BadRequest(BoxStdErr),
	#[error("request head too long")]
	HeaderTooLong,
}

/// The parsed intake. `head` is what must be forwarded to the target
/// first (rebuilt origin-form request plus any body bytes already
/// read); empty for CONNECT, where a 200 is sent back instead.
pub struct Handshake<IO> {
	pub stream: IO,
	pub request: Request,
	pub head: Vec<u8>,
}

/// Run the proxy-side handshake.
///
/// # Errors
///
/// Returns an [`Error`] on IO failure or an unparsable request. A 400
/// is written back for malformed requests.
pub async fn handshake<IO>(mut stream: IO) -> Result<Handshake<IO>, Error>
where
	IO: AsyncRead + AsyncWrite + Unpin,
{
	let (head, leftover) = read_head(&mut stream).await?;

	let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS_NUM];
	let mut parsed = httparse::Request::new(&mut headers);
	let ok = matches!(parsed.parse(&head), Ok(httparse::Status::Complete(_)));
	if !ok {
		return bad_request(&mut stream, "unparsable request head").await;
	}
	let method = parsed.method.unwrap_or_default().to_owned();
	let path = parsed.path.unwrap_or_default().to_owned();

	if method.eq_ignore_ascii_case("CONNECT") {
		let addr = match Address::parse_str(&path, Some(443)) {
			Ok(addr) => addr,
			Err(e) => return bad_request(&mut stream, e).await,
		};
		stream
			.write_all(b"HTTP/1.1 200 Connection established\r\n\r\n")
			.await?;
		return Ok(Handshake {
			stream,
			request: Request::connect(addr),
			head: Vec::new(),
		});
	}

	// Plain proxy request: absolute URI like http://host[:port]/path.
	let (addr, origin_form) = match split_absolute_uri(&path) {
		Some(v) => v,
		None => return bad_request(&mut stream, format!("uri '{}' is not absolute", path)).await,
	};
	let addr = match Address::parse_str(&addr, Some(80)) {
		Ok(addr) => addr,
		Err(e) => return bad_request(&mut stream, e).await,
	};

	// Rebuild the request in origin form, dropping proxy headers.
	let mut out = Vec::with_capacity(head.len());
	out.put_slice(method.as_bytes());
	out.put_u8(b' ');
	out.put_slice(origin_form.as_bytes());
	out.put_slice(b" HTTP/1.1");
	out.put_slice(CRLF);
	for header in parsed.headers.iter() {
		let name = header.name;
		if name.eq_ignore_ascii_case("proxy-connection")
			|| name.eq_ignore_ascii_case("proxy-authorization")
		{
			continue;
		}
		out.put_slice(name.as_bytes());
		out.put_slice(b": ");
		out.put_slice(header.value);
		out.put_slice(CRLF);
	}
	out.put_slice(b"Connection: close");
	out.put_slice(CRLF);
	out.put_slice(CRLF);
	out.extend_from_slice(&leftover);

	Ok(Handshake {
		stream,
		request: Request::connect(addr),
		head: out,
	})
}

async fn read_head<IO>(stream: &mut IO) -> Result<(Vec<u8>, Vec<u8>), Error>
where
	IO: AsyncRead + Unpin,
{
	let mut data = Vec::with_capacity(1024);
	let mut chunk = [0_u8; 1024];
	loop {
		let n = stream.read(&mut chunk).await?;
		if n == 0 {
			return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
		}
		data.extend_from_slice(&chunk[..n]);
		if let Some(pos) = find_pat(&data, CRLF_2) {
			let leftover = data.split_off(pos + CRLF_2.len());
			return Ok((data, leftover));
		}
		if data.len() > MAX_REQUEST_HEAD {
			return Err(Error::HeaderTooLong);
		}
	}
}

async fn bad_request<T, IO>(stream: &mut IO, e: impl Into<BoxStdErr>) -> Result<T, Error>
where
	IO: AsyncWrite + Unpin,
{
	stream
		.write_all(b"HTTP/1.1 400 Bad Request\r\nConnection: close\r\n\r\n")
		.await?;
	stream.shutdown().await?;
	Err(Error::BadRequest(e.into()))
}

/// `http://host[:port]/path?q` -> (`host[:port]`, `/path?q`)
fn split_absolute_uri(uri: &str) -> Option<(String, String)> {
	let rest = uri.strip_prefix("http://")?;
	let (authority, path) = match rest.find('/') {
		Some(pos) => (&rest[..pos], &rest[pos..]),
		None => (rest, "/"),
	};
	if authority.is_empty() {
		return None;
	}
	Some((authority.to_owned(), path.to_owned()))
}

fn find_pat(src: &[u8], pat: &[u8]) -> Option<usize> {
	if src.len() < pat.len() {
		return None;
	}
	src.windows(pat.len()).position(|window| window == pat)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::protocol::Command;
	use tokio::io::duplex;

	#[test]
	fn test_connect() {
		let task = async {
			let (mut client, server) = duplex(4096);
			client
				.write_all(b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n")
				.await
				.unwrap();
			let hs = handshake(server).await.unwrap();
			assert_eq!(hs.request.cmd, Command::Connect);
			assert_eq!(hs.request.addr, "example.com:443".parse().unwrap());
			assert!(hs.head.is_empty());

			let mut reply = [0_u8; 39];
			client.read_exact(&mut reply).await.unwrap();
			assert!(reply.starts_with(b"HTTP/1.1 200"));
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_plain_request_is_rewritten() {
		let task = async {
			let (mut client, server) = duplex(4096);
			client
				.write_all(
					b"GET http://example.com/index.html HTTP/1.1\r\n\
					Host: example.com\r\n\
					Proxy-Connection: keep-alive\r\n\r\nbody",
				)
				.await
				.unwrap();
			let hs = handshake(server).await.unwrap();
			assert_eq!(hs.request.addr, "example.com:80".parse().unwrap());

			let head = String::from_utf8(hs.head).unwrap();
			assert!(head.starts_with("GET /index.html HTTP/1.1\r\n"));
			assert!(head.contains("Host: example.com\r\n"));
			assert!(!head.contains("Proxy-Connection"));
			assert!(head.ends_with("\r\n\r\nbody"));
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_bad_request_gets_400() {
		let task = async {
			let (mut client, server) = duplex(4096);
			client
				.write_all(b"GET /no-absolute-uri HTTP/1.1\r\nHost: x\r\n\r\n")
				.await
				.unwrap();
			assert!(handshake(server).await.is_err());
			let mut reply = [0_u8; 12];
			client.read_exact(&mut reply).await.unwrap();
			assert!(reply.starts_with(b"HTTP/1.1 400"));
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_split_absolute_uri() {
		assert_eq!(
			split_absolute_uri("http://example.com/a?b=c"),
			Some(("example.com".into(), "/a?b=c".into()))
		);
		assert_eq!(
			split_absolute_uri("http://example.com:8080"),
			Some(("example.com:8080".into(), "/".into()))
		);
		assert_eq!(split_absolute_uri("/relative"), None);
	}
}
