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

use crate::{
	auth::{Account, Authenticator},
	prelude::*,
	protocol::{BytesStream, Command, PacketStream, RecvPacket, Request, SendPacket},
	relay::{self, Counter, Relay},
	shadow::{Scapegoat, ShadowManager},
	transport::{self, stack, RewindStream},
	trojan::{self, udp as trojan_udp},
};
use std::io;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio_util::sync::CancellationToken;

// Rewind window for the request header phase.
const HEADER_BUFFER_SIZE: usize = 1024;

/// Anything that wants the multiplexed streams. The carrier is opaque
/// to this crate; without a handler installed, mux channels are closed.
pub trait MuxAcceptor: Send + Sync {
	fn handle(&self, stream: BytesStream);
}

pub struct Server {
	pub listen: SocketAddr,
	pub stack: stack::Inbound,
	pub auth: Authenticator,
	pub remote_addr: Address,
	pub buffer_size: usize,
	pub cancel: CancellationToken,
	pub mux: Option<Arc<dyn MuxAcceptor>>,
}

impl Server {
	/// Accept and serve until cancelled.
	///
	/// # Errors
	///
	/// Startup failures only: binding the listener, or resolving the
	/// decoy address.
	pub async fn run(self: Arc<Self>) -> Result<(), BoxStdErr> {
		let listener = TcpListener::bind(self.listen).await?;
		let decoy_addr = self.remote_addr.resolve().await?;
		info!(
			"server listening on {}, decoy upstream {}",
			self.listen, self.remote_addr
		);

		let (shadow, shadow_worker) =
			ShadowManager::new(self.buffer_size, self.cancel.clone());
		tokio::spawn(shadow_worker);

		let server = self.clone();
		super::serve_listener(listener, self.cancel.clone(), move |stream, peer| {
			let server = server.clone();
			let shadow = shadow.clone();
			async move {
				if let Err(e) = server.handle_conn(stream, peer, decoy_addr, &shadow).await {
					debug!("session from {} ended with error ({})", peer, e);
				}
			}
		})
		.await
	}

	async fn handle_conn(
		&self,
		stream: TcpStream,
		peer: SocketAddr,
		decoy_addr: SocketAddr,
		shadow: &ShadowManager,
	) -> Result<(), BoxStdErr> {
		let accepted = self.stack.accept(stream, peer, decoy_addr, shadow).await?;
		let accepted = match accepted {
			Some(accepted) => accepted,
			// Already diverted.
			None => return Ok(()),
		};

		// Header phase, with its own rewind window so a garbage header
		// can be replayed to the decoy byte-for-byte.
		let hdr = RewindStream::new(accepted.stream);
		hdr.start_buffering(HEADER_BUFFER_SIZE);
		let header = {
			let mut reader = hdr.clone();
			transport::with_deadline(async {
				trojan::read_request(&mut reader, &self.auth)
					.await
					.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
			})
			.await
		};
		let (request, account) = match header {
			Ok(v) => v,
			Err(e) => {
				hdr.rewind();
				hdr.stop_buffering();
				shadow.submit(Scapegoat {
					conn: Box::new(hdr),
					decoy: accepted.decoy,
					info: format!("invalid request from {} ({})", peer, e),
				});
				return Ok(());
			}
		};
		hdr.stop_buffering();

		let conn_id = format!("{:#06x}", rand::thread_rng().next_u64() & 0xffff);
		info!("[{}] request '{}' from {}", conn_id, request, peer);

		match request.cmd {
			Command::Connect => self.dispatch_connect(&conn_id, &request, hdr, &account).await,
			Command::Associate => self.dispatch_associate(&conn_id, hdr).await,
			Command::Mux => {
				if let Some(mux) = &self.mux {
					let (r, w) = tokio::io::split(hdr);
					mux.handle(BytesStream::new(Box::new(r), Box::new(w)));
					Ok(())
				} else {
					Err("mux requested but no mux acceptor is installed".into())
				}
			}
		}
	}

	async fn dispatch_connect(
		&self,
		conn_id: &str,
		request: &Request,
		stream: RewindStream<crate::protocol::BoxStream>,
		account: &Arc<Account>,
	) -> Result<(), BoxStdErr> {
		let target = request.addr.resolve().await?;
		let outbound = TcpStream::connect(target).await.map_err(|e| {
			warn!("[{}] cannot reach target {} ({})", conn_id, request.addr, e);
			e
		})?;
		outbound.set_nodelay(true)?;

		let recv = Counter::new(0);
		let send = Counter::new(0);
		let (ir, iw) = tokio::io::split(stream);
		let (or, ow) = outbound.into_split();
		let mut relay = Relay::new(conn_id, self.cancel.clone());
		relay
			.set_buffer_size(self.buffer_size)
			.set_recv(recv.clone())
			.set_send(send.clone());
		let result = relay.relay_stream(ir, iw, or, ow).await;

		account.add_sent(send.get());
		account.add_recv(recv.get());
		info!(
			"[{}] closed, {} bytes up, {} bytes down",
			conn_id,
			send.get(),
			recv.get()
		);
		result?;
		Ok(())
	}

	async fn dispatch_associate(
		&self,
		conn_id: &str,
		stream: RewindStream<crate::protocol::BoxStream>,
	) -> Result<(), BoxStdErr> {
		let socket = Arc::new(UdpSocket::bind("0.0.0.0:0").await?);
		debug!(
			"[{}] udp associate relaying via {}",
			conn_id,
			socket.local_addr()?
		);

		let (r, w) = tokio::io::split(stream);
		let inbound = PacketStream {
			read_half: Box::new(trojan_udp::PacketReadHalf::new(r)),
			write_half: Box::new(trojan_udp::PacketWriteHalf::new(w)),
		};
		let outbound = PacketStream {
			read_half: Box::new(UdpSocketRead {
				socket: socket.clone(),
			}),
			write_half: Box::new(UdpSocketWrite { socket }),
		};
		relay::relay_packets(conn_id, inbound, outbound, self.cancel.child_token()).await;
		Ok(())
	}
}

// ----------------------------------------------------
//            Target-facing datagram session
// ----------------------------------------------------

struct UdpSocketRead {
	socket: Arc<UdpSocket>,
}

#[async_trait]
impl RecvPacket for UdpSocketRead {
	async fn recv_pkt(&mut self, buf: &mut [u8]) -> io::Result<(usize, Address)> {
		let (n, src) = self.socket.recv_from(buf).await?;
		Ok((n, src.into()))
	}
}

struct UdpSocketWrite {
	socket: Arc<UdpSocket>,
}

#[async_trait]
impl SendPacket for UdpSocketWrite {
	async fn send_pkt(&mut self, payload: &[u8], addr: &Address) -> io::Result<usize> {
		// Domain destinations are resolved per packet; failures only
		// cost the one datagram.
		let target = addr.resolve().await?;
		self.socket.send_to(payload, target).await
	}
}
