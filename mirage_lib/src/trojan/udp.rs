use crate::{
	prelude::*,
	protocol::{RecvPacket, SendPacket},
};
use std::io;

/// Largest payload a single tunnel packet may carry; anything bigger is
/// a protocol violation and fatal to the session.
pub const MAX_PACKET_SIZE: usize = 8 * 1024;

// Each datagram inside an ASSOCIATE stream has the following format:
//
// +---------+--------+---------+----------+
// | Address | Length |  CRLF   | Payload  |
// +---------+--------+---------+----------+
// | Various | u16 BE | X'0D0A' | Variable |
// +---------+--------+---------+----------+

pub struct PacketReadHalf<R> {
	inner: R,
}

impl<R> PacketReadHalf<R> {
	#[must_use]
	pub fn new(inner: R) -> Self {
		Self { inner }
	}
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> RecvPacket for PacketReadHalf<R> {
	async fn recv_pkt(&mut self, buf: &mut [u8]) -> io::Result<(usize, Address)> {
		let addr = Address::read_from(&mut self.inner)
			.await
			.map_err(crate::protocol::ReadError::into_io_err)?;
		let len = usize::from(self.inner.read_u16().await?);
		let mut crlf = [0_u8; 2];
		self.inner.read_exact(&mut crlf).await?;
		if crlf != CRLF {
			return Err(io::Error::new(
				io::ErrorKind::InvalidData,
				format!("expected CRLF after length, got {:?}", crlf),
			));
		}
		if len > MAX_PACKET_SIZE {
			return Err(io::Error::new(
				io::ErrorKind::InvalidData,
				format!("packet of {} bytes exceeds limit", len),
			));
		}
		if len > buf.len() {
			return Err(io::Error::new(
				io::ErrorKind::InvalidData,
				format!(
					"recv buffer too small ({} bytes) for packet of {} bytes",
					buf.len(),
					len
				),
			));
		}
		self.inner.read_exact(&mut buf[..len]).await?;
		Ok((len, addr))
	}
}

pub struct PacketWriteHalf<W> {
	inner: W,
	buf: Vec<u8>,
}

impl<W> PacketWriteHalf<W> {
	#[must_use]
	pub fn new(inner: W) -> Self {
		Self {
			inner,
			buf: Vec::with_capacity(4 * 1024),
		}
	}
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> SendPacket for PacketWriteHalf<W> {
	async fn send_pkt(&mut self, payload: &[u8], addr: &Address) -> io::Result<usize> {
		if payload.len() > MAX_PACKET_SIZE {
			return Err(io::Error::new(
				io::ErrorKind::InvalidInput,
				format!("payload of {} bytes exceeds packet limit", payload.len()),
			));
		}
		// Checked above, the cast cannot truncate.
		#[allow(clippy::cast_possible_truncation)]
		let len = payload.len() as u16;

		let buf = &mut self.buf;
		buf.clear();
		addr.write_to(buf);
		buf.put_u16(len);
		buf.put_slice(CRLF);
		buf.put_slice(payload);
		self.inner.write_all(buf).await?;
		self.inner.flush().await?;
		Ok(payload.len())
	}

	async fn shutdown_pkt(&mut self) -> io::Result<()> {
		self.inner.shutdown().await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn test_packet_roundtrip() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let addr: Address = "echo.test:5000".parse().unwrap();
			let payload = vec![0x42_u8; 1400];

			let mut w = PacketWriteHalf::new(Cursor::new(Vec::new()));
			w.send_pkt(&payload, &addr).await.unwrap();
			w.send_pkt(b"second", &addr).await.unwrap();
			let wire = w.inner.into_inner();

			let mut r = PacketReadHalf::new(Cursor::new(wire));
			let mut buf = [0_u8; MAX_PACKET_SIZE];
			let (n, src) = r.recv_pkt(&mut buf).await.unwrap();
			assert_eq!(n, 1400);
			assert_eq!(&buf[..n], payload.as_slice());
			assert_eq!(src, addr);

			let (n, _) = r.recv_pkt(&mut buf).await.unwrap();
			assert_eq!(&buf[..n], b"second");

			// No residue.
			let mut rest = Vec::new();
			r.inner.read_to_end(&mut rest).await.unwrap();
			assert!(rest.is_empty());
		});
	}

	#[test]
	fn test_oversized_packet_is_fatal() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let addr: Address = "127.0.0.1:53".parse().unwrap();

			let mut w = PacketWriteHalf::new(Cursor::new(Vec::new()));
			let too_big = vec![0_u8; MAX_PACKET_SIZE + 1];
			assert!(w.send_pkt(&too_big, &addr).await.is_err());

			// A length field beyond the limit kills the read side too.
			let mut wire = Vec::new();
			addr.write_to(&mut wire);
			wire.put_u16(u16::MAX);
			wire.extend_from_slice(CRLF);
			wire.extend_from_slice(&[0_u8; 64]);
			let mut r = PacketReadHalf::new(Cursor::new(wire));
			let mut buf = [0_u8; MAX_PACKET_SIZE];
			assert!(r.recv_pkt(&mut buf).await.is_err());
		});
	}

	#[test]
	fn test_bad_crlf_is_fatal() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			let addr: Address = "127.0.0.1:53".parse().unwrap();
			let mut wire = Vec::new();
			addr.write_to(&mut wire);
			wire.put_u16(4);
			wire.extend_from_slice(b"XY");
			wire.extend_from_slice(b"data");
			let mut r = PacketReadHalf::new(Cursor::new(wire));
			let mut buf = [0_u8; MAX_PACKET_SIZE];
			assert!(r.recv_pkt(&mut buf).await.is_err());
		});
	}
}
