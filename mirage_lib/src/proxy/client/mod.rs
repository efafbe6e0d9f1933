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

pub mod forward;
pub mod http;
pub mod nat;
pub mod socks5;

use crate::{
	auth::Key,
	prelude::*,
	protocol::{
		BoxRead, BoxWrite, BytesStream, Command, CompositeStream, PacketStream, Request,
	},
	relay::Relay,
	router::{GeoRouter, Policy},
	transport::{stack, RewindStream},
	trojan::{self, udp as trojan_udp, HeaderWriteHalf},
};
use std::io;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Opens tunnel (or direct) connections for inbound requests and keeps
/// the pieces every inbound needs: the transport stack, the credential
/// and the routing engine.
pub struct AppManager {
	outbound: stack::Outbound,
	key: Key,
	server_addr: Address,
	router: Option<GeoRouter>,
	pub buffer_size: usize,
}

impl AppManager {
	#[must_use]
	pub fn new(
		outbound: stack::Outbound,
		key: Key,
		server_addr: Address,
		router: Option<GeoRouter>,
		buffer_size: usize,
	) -> Self {
		Self {
			outbound,
			key,
			server_addr,
			router,
			buffer_size,
		}
	}

	/// Decide what to do with a destination. Without a router
	/// everything is proxied; an undecidable destination is proxied
	/// rather than leaked directly.
	pub async fn route(&self, addr: &Address) -> Policy {
		match &self.router {
			None => Policy::Proxy,
			Some(router) => match router.route(addr).await {
				Policy::Unknown => Policy::Proxy,
				policy => policy,
			},
		}
	}

	/// Open a tunnel channel carrying `req`, with the request header
	/// coalesced into the first payload write.
	///
	/// # Errors
	///
	/// Returns an [`io::Error`] if dialing or any transport layer fails.
	pub async fn open_tunnel(&self, req: &Request) -> io::Result<BytesStream> {
		debug!(
			"opening tunnel to '{}' for request '{}'",
			self.server_addr, req
		);
		let server = self.server_addr.resolve().await?;
		let tcp = TcpStream::connect(server).await?;
		tcp.set_nodelay(true)?;
		let stream = self.outbound.connect(tcp, &self.server_addr).await?;

		let mut header = Vec::with_capacity(trojan::request_len(req));
		trojan::write_request(&mut header, &self.key, req);

		let (r, w) = tokio::io::split(stream);
		let w = HeaderWriteHalf::new(w, header);
		Ok(CompositeStream::new(
			Box::new(r) as BoxRead,
			Box::new(w) as BoxWrite,
		))
	}

	/// Open the stream a CONNECT request should use, honoring routing.
	///
	/// # Errors
	///
	/// Returns [`io::ErrorKind::ConnectionRefused`] for blocked
	/// destinations, or the underlying dial error.
	pub async fn open_stream(&self, req: &Request) -> io::Result<BytesStream> {
		match self.route(&req.addr).await {
			Policy::Block => {
				info!("request '{}' blocked by routing rules", req);
				Err(io::Error::new(
					io::ErrorKind::ConnectionRefused,
					"blocked by routing rules",
				))
			}
			Policy::Bypass => {
				debug!("request '{}' bypasses the tunnel", req);
				let target = req.addr.resolve().await?;
				let tcp = TcpStream::connect(target).await?;
				tcp.set_nodelay(true)?;
				Ok(BytesStream::from(tcp))
			}
			Policy::Proxy | Policy::Unknown => self.open_tunnel(req).await,
		}
	}

	/// Open a tunnel packet session for an ASSOCIATE request.
	///
	/// # Errors
	///
	/// Same as [`Self::open_tunnel`].
	pub async fn open_packet_session(&self, req: &Request) -> io::Result<PacketStream> {
		debug_assert_eq!(req.cmd, Command::Associate);
		let stream = self.open_tunnel(req).await?;
		let (r, w) = (stream.r, stream.w);
		Ok(PacketStream {
			read_half: Box::new(trojan_udp::PacketReadHalf::new(r)),
			write_half: Box::new(trojan_udp::PacketWriteHalf::new(w)),
		})
	}
}

/// The mixed SOCKS5/HTTP client inbound. The protocol is chosen by
/// peeking the first byte: SOCKS5 starts with 0x05, anything else is
/// treated as HTTP.
pub struct Client {
	pub listen: SocketAddr,
	pub app: Arc<AppManager>,
	pub cancel: CancellationToken,
}

impl Client {
	/// Accept and serve until cancelled.
	///
	/// # Errors
	///
	/// Only a failure to bind the listener is returned; per-connection
	/// errors are logged.
	pub async fn run(&self) -> Result<(), BoxStdErr> {
		let listener = TcpListener::bind(self.listen).await?;
		info!("client inbound (socks5/http) listening on {}", self.listen);
		let local_ip = self.listen.ip();
		super::serve_listener(listener, self.cancel.clone(), |stream, peer| {
			let app = self.app.clone();
			let cancel = self.cancel.clone();
			async move {
				if let Err(e) = handle_conn(app, stream, peer, local_ip, cancel).await {
					debug!("client session from {} ended with error ({})", peer, e);
				}
			}
		})
		.await
	}
}

async fn handle_conn(
	app: Arc<AppManager>,
	stream: TcpStream,
	peer: SocketAddr,
	local_ip: IpAddr,
	cancel: CancellationToken,
) -> Result<(), BoxStdErr> {
	let conn_id = format!("{:#06x}", rand::thread_rng().next_u64() & 0xffff);

	// Peek one byte to tell SOCKS5 from HTTP.
	let stream = RewindStream::new(stream);
	stream.start_buffering(1);
	let first = {
		let mut reader = stream.clone();
		reader.read_u8().await?
	};
	stream.rewind();
	stream.stop_buffering();

	if first == socks5::VER5 {
		match socks5::handshake(stream, local_ip).await? {
			socks5::Handshake::Connect {
				stream,
				request,
			} => {
				info!("[{}] socks5 {} from {}", conn_id, request, peer);
				let out = app.open_stream(&request).await?;
				relay_streams(&app, &conn_id, stream, out, Vec::new(), cancel).await
			}
			socks5::Handshake::Associate {
				control,
				session,
				request,
			} => {
				info!("[{}] socks5 udp associate from {}", conn_id, peer);
				let tunnel = app.open_packet_session(&request).await?;
				let (udp_r, udp_w) = session.split();
				let inbound = PacketStream {
					read_half: Box::new(udp_r),
					write_half: Box::new(udp_w),
				};
				// The association lives exactly as long as the control
				// connection.
				let session_cancel = cancel.child_token();
				let relay_task =
					crate::relay::relay_packets(&conn_id, inbound, tunnel, session_cancel.clone());
				let control_task = watch_control(control);
				futures::pin_mut!(relay_task);
				futures::pin_mut!(control_task);
				futures::future::select(relay_task, control_task).await;
				session_cancel.cancel();
				Ok(())
			}
		}
	} else {
		let hs = http::handshake(stream).await?;
		info!("[{}] http {} from {}", conn_id, hs.request, peer);
		let out = app.open_stream(&hs.request).await?;
		relay_streams(&app, &conn_id, hs.stream, out, hs.head, cancel).await
	}
}

async fn watch_control<IO: AsyncRead + Unpin>(mut control: IO) {
	let mut buf = [0_u8; 256];
	loop {
		match control.read(&mut buf).await {
			Ok(0) | Err(_) => return,
			Ok(_) => {}
		}
	}
}

async fn relay_streams<IO>(
	app: &AppManager,
	conn_id: &str,
	inbound: IO,
	mut outbound: BytesStream,
	head: Vec<u8>,
	cancel: CancellationToken,
) -> Result<(), BoxStdErr>
where
	IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
	if !head.is_empty() {
		outbound.write_all(&head).await?;
	}
	let (ir, iw) = tokio::io::split(inbound);
	let (or, ow) = (outbound.r, outbound.w);
	let mut relay = Relay::new(conn_id, cancel);
	relay.set_buffer_size(app.buffer_size);
	relay.relay_stream(ir, iw, or, ow).await?;
	Ok(())
}
