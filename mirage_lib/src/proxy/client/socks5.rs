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

// SOCKS5 intake, CONNECT and UDP ASSOCIATE only.
// See more at <https://datatracker.ietf.org/doc/html/rfc1928>.

use crate::{
	prelude::*,
	protocol::{AddrType, Command, RecvPacket, Request, SendPacket},
	trojan::udp::MAX_PACKET_SIZE,
};
use std::{io, sync::Mutex};
use tokio::net::UdpSocket;

pub const VER5: u8 = 5;
const VAL_NO_AUTH: u8 = 0;
const AUTH_FAILED: u8 = 0xff;

const CMD_CONNECT: u8 = 1;
const CMD_UDP: u8 = 3;

const REPLY_SUCCEEDED: u8 = 0;
const REPLY_COMMAND_NOT_SUPPORTED: u8 = 7;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("IO error ({0})")]
	Io(#[from] io::Error),
	#[error("unsupported socks version {0}")]
	WrongVersion(u8),
	#[error("no acceptable authentication method")]
	NoAcceptableMethod,
	#[error("unsupported command {0}")]
	UnsupportedCommand(u8),
	#[error("invalid address ({0})")]
	Address(#[from] crate::protocol::ReadError),
}

/// What the SOCKS5 handshake yielded. For `Connect` the reply has
/// already been written and the stream is ready for payload; for
/// `Associate` the bound UDP socket is wrapped as a packet session and
/// the TCP stream must be held open for the session's lifetime.
#[derive(Debug)]
pub enum Handshake<IO> {
	Connect {
		stream: IO,
		request: Request,
	},
	Associate {
		control: IO,
		session: UdpSession,
		request: Request,
	},
}

/// Run the handshake. `local_ip` is where the UDP socket for
/// ASSOCIATE is bound.
///
/// # Errors
///
/// Returns an [`Error`] on IO failure or protocol violation.
pub async fn handshake<IO>(mut stream: IO, local_ip: IpAddr) -> Result<Handshake<IO>, Error>
where
	IO: AsyncRead + AsyncWrite + Unpin,
{
	// Method negotiation.
	let ver = stream.read_u8().await?;
	if ver != VER5 {
		return Err(Error::WrongVersion(ver));
	}
	let n_methods = stream.read_u8().await?;
	let mut methods = [0_u8; 255];
	let methods = &mut methods[..n_methods as usize];
	stream.read_exact(methods).await?;
	if !methods.contains(&VAL_NO_AUTH) {
		stream.write_all(&[VER5, AUTH_FAILED]).await?;
		return Err(Error::NoAcceptableMethod);
	}
	stream.write_all(&[VER5, VAL_NO_AUTH]).await?;

	// Request.
	let ver = stream.read_u8().await?;
	if ver != VER5 {
		return Err(Error::WrongVersion(ver));
	}
	let cmd = stream.read_u8().await?;
	let _rsv = stream.read_u8().await?;
	let addr = Address::read_from(&mut stream).await?;

	match cmd {
		CMD_CONNECT => {
			write_reply(&mut stream, REPLY_SUCCEEDED, &unspecified_addr()).await?;
			Ok(Handshake::Connect {
				stream,
				request: Request::new(Command::Connect, addr),
			})
		}
		CMD_UDP => {
			let socket = UdpSocket::bind(SocketAddr::new(local_ip, 0)).await?;
			let bound = socket.local_addr()?;
			debug!("socks5 udp associate bound on {}", bound);
			write_reply(&mut stream, REPLY_SUCCEEDED, &bound.into()).await?;
			Ok(Handshake::Associate {
				control: stream,
				session: UdpSession::new(socket),
				request: Request::new(Command::Associate, addr),
			})
		}
		cmd => {
			write_reply(&mut stream, REPLY_COMMAND_NOT_SUPPORTED, &unspecified_addr()).await?;
			Err(Error::UnsupportedCommand(cmd))
		}
	}
}

fn unspecified_addr() -> Address {
	SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0).into()
}

async fn write_reply<W: AsyncWrite + Unpin>(
	w: &mut W,
	code: u8,
	bind_addr: &Address,
) -> io::Result<()> {
	let mut buf = Vec::with_capacity(4 + bind_addr.serialized_len_atyp());
	buf.put_u8(VER5);
	buf.put_u8(code);
	buf.put_u8(0);
	bind_addr.write_to(&mut buf);
	w.write_all(&buf).await
}

// ----------------------------------------------------
//              UDP ASSOCIATE session
// ----------------------------------------------------

// Each SOCKS5 UDP datagram:
//
// +-----+------+------+----------+----------+----------+
// | RSV | FRAG | ATYP | DST.ADDR | DST.PORT |   DATA   |
// +-----+------+------+----------+----------+----------+
// |  2  |  1   |  1   | Variable |    2     | Variable |
// +-----+------+------+----------+----------+----------+

/// The datagram side of an ASSOCIATE. The client's UDP source address
/// is learned from its first packet; replies go back there.
#[derive(Debug)]
pub struct UdpSession {
	socket: Arc<UdpSocket>,
	client: Arc<Mutex<Option<SocketAddr>>>,
}

impl UdpSession {
	fn new(socket: UdpSocket) -> Self {
		Self {
			socket: Arc::new(socket),
			client: Arc::new(Mutex::new(None)),
		}
	}

	#[must_use]
	pub fn split(self) -> (UdpReadHalf, UdpWriteHalf) {
		(
			UdpReadHalf {
				socket: self.socket.clone(),
				client: self.client.clone(),
			},
			UdpWriteHalf {
				socket: self.socket,
				client: self.client,
			},
		)
	}
}

pub struct UdpReadHalf {
	socket: Arc<UdpSocket>,
	client: Arc<Mutex<Option<SocketAddr>>>,
}

pub struct UdpWriteHalf {
	socket: Arc<UdpSocket>,
	client: Arc<Mutex<Option<SocketAddr>>>,
}

fn lock_client(client: &Mutex<Option<SocketAddr>>) -> std::sync::MutexGuard<'_, Option<SocketAddr>> {
	match client.lock() {
		Ok(guard) => guard,
		Err(poisoned) => poisoned.into_inner(),
	}
}

#[async_trait]
impl RecvPacket for UdpReadHalf {
	async fn recv_pkt(&mut self, buf: &mut [u8]) -> io::Result<(usize, Address)> {
		let mut datagram = [0_u8; MAX_PACKET_SIZE + 512];
		loop {
			let (n, src) = self.socket.recv_from(&mut datagram).await?;
			match parse_datagram(&datagram[..n]) {
				Ok((dst, payload)) => {
					if payload.len() > buf.len() {
						warn!("socks5 udp payload of {} bytes dropped", payload.len());
						continue;
					}
					*lock_client(&self.client) = Some(src);
					buf[..payload.len()].copy_from_slice(payload);
					return Ok((payload.len(), dst));
				}
				Err(e) => {
					debug!("bad socks5 udp datagram from {} ({})", src, e);
				}
			}
		}
	}
}

#[async_trait]
impl SendPacket for UdpWriteHalf {
	async fn send_pkt(&mut self, payload: &[u8], addr: &Address) -> io::Result<usize> {
		let client = *lock_client(&self.client);
		let client = match client {
			Some(client) => client,
			None => {
				// No client packet seen yet, nowhere to send.
				debug!("dropping {} reply bytes, no socks5 udp client yet", payload.len());
				return Ok(payload.len());
			}
		};
		let mut buf = Vec::with_capacity(payload.len() + 32);
		buf.put_slice(&[0, 0, 0]);
		addr.write_to(&mut buf);
		buf.put_slice(payload);
		self.socket.send_to(&buf, client).await?;
		Ok(payload.len())
	}
}

fn parse_datagram(data: &[u8]) -> Result<(Address, &[u8]), BoxStdErr> {
	if data.len() < 4 {
		return Err("datagram too short".into());
	}
	if data[2] != 0 {
		return Err("fragmented datagrams are not supported".into());
	}
	let mut cursor = std::io::Cursor::new(&data[3..]);
	let addr = read_addr_sync(&mut cursor)?;
	let consumed = usize::try_from(cursor.position()).unwrap_or(usize::MAX);
	Ok((addr, &data[3 + consumed..]))
}

// The datagram is fully buffered, so a tiny sync reader avoids
// dragging the async reader into a hot path.
fn read_addr_sync(cursor: &mut std::io::Cursor<&[u8]>) -> Result<Address, BoxStdErr> {
	use std::io::Read;
	let mut byte = [0_u8; 1];
	std::io::Read::read_exact(cursor, &mut byte)?;
	let atyp = AddrType::try_from(byte[0]).map_err(|_| format!("bad atyp {}", byte[0]))?;
	let dest = match atyp {
		AddrType::Ipv4 => {
			let mut b = [0_u8; 4];
			std::io::Read::read_exact(cursor, &mut b)?;
			Destination::new_ip(Ipv4Addr::from(b))
		}
		AddrType::Ipv6 => {
			let mut b = [0_u8; 16];
			std::io::Read::read_exact(cursor, &mut b)?;
			Destination::new_ip(Ipv6Addr::from(b))
		}
		AddrType::Name => {
			std::io::Read::read_exact(cursor, &mut byte)?;
			let mut name = vec![0_u8; byte[0] as usize];
			std::io::Read::read_exact(cursor, &mut name)?;
			Destination::new_domain(std::str::from_utf8(&name)?)?
		}
	};
	let mut port = [0_u8; 2];
	std::io::Read::read_exact(cursor, &mut port)?;
	Ok(Address::new(dest, u16::from_be_bytes(port)))
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::duplex;

	#[test]
	fn test_connect_handshake() {
		let task = async {
			let (mut client, server) = duplex(1024);
			// greeting: ver 5, one method, no-auth
			client.write_all(&[5, 1, 0]).await.unwrap();
			// request: CONNECT example.com:443
			let mut req = vec![5_u8, 1, 0];
			let addr: Address = "example.com:443".parse().unwrap();
			addr.write_to(&mut req);
			client.write_all(&req).await.unwrap();

			let hs = handshake(server, "127.0.0.1".parse().unwrap())
				.await
				.unwrap();
			match hs {
				Handshake::Connect { request, .. } => {
					assert_eq!(request.cmd, Command::Connect);
					assert_eq!(request.addr, addr);
				}
				Handshake::Associate { .. } => panic!("wrong handshake type"),
			}

			// method choice + success reply
			let mut reply = [0_u8; 2 + 10];
			client.read_exact(&mut reply).await.unwrap();
			assert_eq!(&reply[..2], &[5, 0]);
			assert_eq!(&reply[2..6], &[5, 0, 0, 1]);
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_rejects_bind_command() {
		let task = async {
			let (mut client, server) = duplex(1024);
			client.write_all(&[5, 1, 0]).await.unwrap();
			let mut req = vec![5_u8, 2, 0];
			Address::from_str("127.0.0.1:80").unwrap().write_to(&mut req);
			client.write_all(&req).await.unwrap();

			let err = handshake(server, "127.0.0.1".parse().unwrap())
				.await
				.unwrap_err();
			assert!(matches!(err, Error::UnsupportedCommand(2)));
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_datagram_parse() {
		let addr: Address = "8.8.8.8:53".parse().unwrap();
		let mut datagram = vec![0_u8, 0, 0];
		addr.write_to(&mut datagram);
		datagram.extend_from_slice(b"dns query");
		let (parsed, payload) = parse_datagram(&datagram).unwrap();
		assert_eq!(parsed, addr);
		assert_eq!(payload, b"dns query");

		// Fragmented datagrams are rejected.
		datagram[2] = 1;
		assert!(parse_datagram(&datagram).is_err());
	}
}
