/*!
Implementation of the trojan wire protocol,
see more at <https://trojan-gfw.github.io/trojan/protocol.html>

This framing carries no security of its own.
DO NOT use it without a security layer over an untrusted network.

Request format:
```not_rust
+-----------------------+---------+-----+---------+---------+----------+
| hex(SHA224(password)) |  CRLF   | CMD | Address |  CRLF   | Payload  |
+-----------------------+---------+-----+---------+---------+----------+
|          56           | X'0D0A' |  1  | Various | X'0D0A' | Variable |
+-----------------------+---------+-----+---------+---------+----------+
```

where `Address` is a SOCKS5 address
(<https://tools.ietf.org/html/rfc1928#section-5>).
*/

pub mod udp;

use crate::{
	auth::{Account, Authenticator, Key, KEY_LEN},
	prelude::*,
	protocol::{Command, Request},
};
use futures::ready;
use std::{
	io,
	task::{Context, Poll},
};

pub const PROTOCOL_NAME: &str = "trojan";

/// Header size for a given request: hash, two CRLF, command and address.
#[must_use]
pub fn request_len(req: &Request) -> usize {
	KEY_LEN + CRLF.len() + 1 + req.addr.serialized_len_atyp() + CRLF.len()
}

/// Serialize the authenticated request header into `buf`.
pub fn write_request(buf: &mut impl BufMut, key: &Key, req: &Request) {
	buf.put_slice(key);
	buf.put_slice(CRLF);
	buf.put_u8(req.cmd.into());
	req.addr.write_to(buf);
	buf.put_slice(CRLF);
}

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
	#[error("IO error ({0})")]
	Io(#[from] io::Error),
	/// Anything that must be indistinguishable from a non-client:
	/// unknown hash, bad CRLF, bad command, bad address.
	#[error("invalid request ({0})")]
	Rejected(BoxStdErr),
}

/// Read and authenticate a request header off `stream`.
///
/// The caller is expected to run this over a rewindable stream: on
/// [`RequestError::Rejected`] every consumed byte is still recorded there
/// so the connection can be replayed to a decoy.
///
/// # Errors
///
/// [`RequestError::Io`] on transport failure, [`RequestError::Rejected`]
/// on any byte-level mismatch or failed authentication.
pub async fn read_request<IO>(
	stream: &mut IO,
	auth: &Authenticator,
) -> Result<(Request, Arc<Account>), RequestError>
where
	IO: AsyncRead + Unpin,
{
	let mut key = [0_u8; KEY_LEN];
	stream.read_exact(&mut key).await?;
	let account = auth
		.authenticate(&key)
		.ok_or_else(|| RequestError::Rejected("unknown credential hash".into()))?;

	read_crlf(stream).await?;

	let cmd = stream.read_u8().await?;
	let cmd = Command::try_from(cmd)
		.map_err(|_| RequestError::Rejected(format!("unknown command {:#04x}", cmd).into()))?;

	let addr = Address::read_from(stream)
		.await
		.map_err(|e| RequestError::Rejected(e.into()))?;

	read_crlf(stream).await?;

	Ok((Request::new(cmd, addr), account))
}

async fn read_crlf<IO: AsyncRead + Unpin>(stream: &mut IO) -> Result<(), RequestError> {
	let mut crlf = [0_u8; 2];
	stream.read_exact(&mut crlf).await?;
	if crlf != CRLF {
		return Err(RequestError::Rejected(
			format!("expected CRLF, got {:?}", crlf).into(),
		));
	}
	Ok(())
}

// ----------------------------------------------------
//                  HeaderWriteHalf
// ----------------------------------------------------

/// A write half that holds the request header back until the first
/// application write, so header and payload leave in one segment.
pub struct HeaderWriteHalf<W> {
	inner: W,
	pending: Vec<u8>,
	pos: usize,
	claimed: usize,
	coalesced: bool,
	done: bool,
}

impl<W: AsyncWrite + Unpin> HeaderWriteHalf<W> {
	#[must_use]
	pub fn new(inner: W, header: Vec<u8>) -> Self {
		Self {
			inner,
			pending: header,
			pos: 0,
			claimed: 0,
			coalesced: false,
			done: false,
		}
	}

	fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		while self.pos < self.pending.len() {
			let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.pending[self.pos..]))?;
			if n == 0 {
				return Err(io::ErrorKind::WriteZero.into()).into();
			}
			self.pos += n;
		}
		self.pending = Vec::new();
		self.pos = 0;
		self.done = true;
		Ok(()).into()
	}
}

impl<W: AsyncWrite + Unpin> AsyncWrite for HeaderWriteHalf<W> {
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		src: &[u8],
	) -> Poll<Result<usize, io::Error>> {
		let me = self.get_mut();
		if me.done {
			return Pin::new(&mut me.inner).poll_write(cx, src);
		}
		if !me.coalesced {
			me.pending.extend_from_slice(src);
			me.claimed = src.len();
			me.coalesced = true;
		}
		ready!(me.poll_drain(cx))?;
		Ok(me.claimed).into()
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		let me = self.get_mut();
		if !me.done {
			ready!(me.poll_drain(cx))?;
		}
		Pin::new(&mut me.inner).poll_flush(cx)
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		let me = self.get_mut();
		if !me.done {
			ready!(me.poll_drain(cx))?;
		}
		Pin::new(&mut me.inner).poll_shutdown(cx)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::password_to_key;
	use std::io::Cursor;

	fn make_auth() -> Authenticator {
		Authenticator::new(std::iter::once("password")).unwrap()
	}

	#[test]
	fn test_request_roundtrip() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let auth = make_auth();
			let req = Request::connect("example.com:443".parse().unwrap());

			let mut buf = Vec::new();
			write_request(&mut buf, &password_to_key(b"password"), &req);
			assert_eq!(buf.len(), request_len(&req));
			buf.extend_from_slice(b"payload right behind");

			let mut cur = Cursor::new(buf);
			let (parsed, _account) = read_request(&mut cur, &auth).await.unwrap();
			assert_eq!(parsed, req);

			// Nothing beyond the header may be consumed.
			let mut rest = Vec::new();
			cur.read_to_end(&mut rest).await.unwrap();
			assert_eq!(rest, b"payload right behind");
		});
	}

	#[test]
	fn test_request_layout() {
		let req = Request::connect("example.com:443".parse().unwrap());
		let key = password_to_key(b"hello");
		let mut buf = Vec::new();
		write_request(&mut buf, &key, &req);

		assert_eq!(&buf[..56], &key);
		assert_eq!(&buf[56..58], b"\r\n");
		assert_eq!(buf[58], 0x01);
		assert_eq!(buf[59], 0x03);
		assert_eq!(buf[60], 0x0b);
		assert_eq!(&buf[61..72], b"example.com");
		assert_eq!(&buf[72..74], &[0x01, 0xbb]);
		assert_eq!(&buf[74..], b"\r\n");
	}

	#[test]
	fn test_rejects_unknown_hash() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let auth = make_auth();
			let req = Request::connect("example.com:443".parse().unwrap());
			let mut buf = Vec::new();
			write_request(&mut buf, &password_to_key(b"not the password"), &req);
			let err = read_request(&mut Cursor::new(buf), &auth).await.unwrap_err();
			assert!(matches!(err, RequestError::Rejected(_)));
		});
	}

	#[test]
	fn test_rejects_bad_crlf() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let auth = make_auth();
			let mut buf = Vec::new();
			buf.extend_from_slice(&password_to_key(b"password"));
			buf.extend_from_slice(b"XX");
			buf.push(0x01);
			let err = read_request(&mut Cursor::new(buf), &auth).await.unwrap_err();
			assert!(matches!(err, RequestError::Rejected(_)));
		});
	}

	#[test]
	fn test_rejects_unknown_command() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let auth = make_auth();
			let mut buf = Vec::new();
			buf.extend_from_slice(&password_to_key(b"password"));
			buf.extend_from_slice(CRLF);
			buf.push(0x09);
			buf.extend_from_slice(&[0x01, 127, 0, 0, 1, 0, 80]);
			buf.extend_from_slice(CRLF);
			let err = read_request(&mut Cursor::new(buf), &auth).await.unwrap_err();
			assert!(matches!(err, RequestError::Rejected(_)));
		});
	}

	#[test]
	fn test_header_write_half_coalesces() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let out = Cursor::new(Vec::<u8>::new());
			let mut w = HeaderWriteHalf::new(out, b"HEADER".to_vec());
			w.write_all(b"payload").await.unwrap();
			w.write_all(b" more").await.unwrap();
			let written = w.inner.into_inner();
			assert_eq!(written, b"HEADERpayload more");
		});
	}

	#[test]
	fn test_header_write_half_flush_without_payload() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let out = Cursor::new(Vec::<u8>::new());
			let mut w = HeaderWriteHalf::new(out, b"HEADER".to_vec());
			w.flush().await.unwrap();
			let written = w.inner.into_inner();
			assert_eq!(written, b"HEADER");
		});
	}
}
