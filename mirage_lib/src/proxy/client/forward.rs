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

// Port forwarder: every local TCP connection and UDP peer is tunneled
// to one fixed target through the trojan channel.

use super::AppManager;
use crate::{
	prelude::*,
	protocol::{Command, RecvPacket, Request, SendPacket},
	relay::Relay,
	trojan::udp::MAX_PACKET_SIZE,
};
use std::{collections::HashMap, time::Duration};
use tokio::{
	net::{TcpListener, UdpSocket},
	sync::mpsc,
};
use tokio_util::sync::CancellationToken;

const UDP_SESSION_IDLE: Duration = Duration::from_secs(60);
const UDP_SESSION_QUEUE: usize = 64;

pub struct Forward {
	pub listen: SocketAddr,
	pub target: Address,
	pub app: Arc<AppManager>,
	pub cancel: CancellationToken,
}

impl Forward {
	/// Serve TCP and UDP forwarding until cancelled.
	///
	/// # Errors
	///
	/// Only startup bind failures are returned.
	pub async fn run(&self) -> Result<(), BoxStdErr> {
		let tcp_task = self.run_tcp();
		let udp_task = self.run_udp();
		futures::try_join!(tcp_task, udp_task)?;
		Ok(())
	}

	async fn run_tcp(&self) -> Result<(), BoxStdErr> {
		let listener = TcpListener::bind(self.listen).await?;
		info!(
			"forward inbound listening on {}, target {}",
			self.listen, self.target
		);
		super::super::serve_listener(listener, self.cancel.clone(), |stream, peer| {
			let app = self.app.clone();
			let cancel = self.cancel.clone();
			let target = self.target.clone();
			async move {
				let request = Request::connect(target);
				let conn_id = format!("{:#06x}", rand::thread_rng().next_u64() & 0xffff);
				debug!("[{}] forward conn from {} to {}", conn_id, peer, request.addr);
				let outbound = match app.open_tunnel(&request).await {
					Ok(out) => out,
					Err(e) => {
						error!("[{}] cannot open tunnel ({})", conn_id, e);
						return;
					}
				};
				let (ir, iw) = tokio::io::split(stream);
				let mut relay = Relay::new(&conn_id, cancel);
				relay.set_buffer_size(app.buffer_size);
				if let Err(e) = relay.relay_stream(ir, iw, outbound.r, outbound.w).await {
					debug!("[{}] forward session ended with error ({})", conn_id, e);
				}
			}
		})
		.await
	}

	async fn run_udp(&self) -> Result<(), BoxStdErr> {
		let socket = Arc::new(UdpSocket::bind(self.listen).await?);
		info!("forward udp listening on {}", self.listen);

		// One tunnel session per local peer, torn down when idle.
		let mut sessions: HashMap<SocketAddr, mpsc::Sender<Vec<u8>>> = HashMap::new();
		let (dead_tx, mut dead_rx) = mpsc::channel::<SocketAddr>(UDP_SESSION_QUEUE);

		let mut buf = vec![0_u8; MAX_PACKET_SIZE];
		loop {
			tokio::select! {
				() = self.cancel.cancelled() => return Ok(()),
				Some(peer) = dead_rx.recv() => {
					sessions.remove(&peer);
				}
				res = socket.recv_from(&mut buf) => {
					let (n, peer) = match res {
						Ok(v) => v,
						Err(e) => {
							warn!("forward udp recv error ({})", e);
							tokio::time::sleep(Duration::from_secs(1)).await;
							continue;
						}
					};
					let payload = buf[..n].to_vec();
					let tx = match sessions.get(&peer) {
						Some(tx) => tx.clone(),
						None => {
							let tx = spawn_session(
								self.app.clone(),
								self.target.clone(),
								socket.clone(),
								peer,
								dead_tx.clone(),
								self.cancel.clone(),
							);
							sessions.insert(peer, tx.clone());
							tx
						}
					};
					if tx.try_send(payload).is_err() {
						debug!("forward udp queue full, dropping packet from {}", peer);
					}
				}
			}
		}
	}
}

fn spawn_session(
	app: Arc<AppManager>,
	target: Address,
	socket: Arc<UdpSocket>,
	peer: SocketAddr,
	dead_tx: mpsc::Sender<SocketAddr>,
	cancel: CancellationToken,
) -> mpsc::Sender<Vec<u8>> {
	let (tx, mut rx) = mpsc::channel::<Vec<u8>>(UDP_SESSION_QUEUE);
	tokio::spawn(async move {
		debug!("forward udp session for {} starting", peer);
		let request = Request::new(Command::Associate, target.clone());
		let tunnel = match app.open_packet_session(&request).await {
			Ok(t) => t,
			Err(e) => {
				error!("cannot open udp tunnel for {} ({})", peer, e);
				dead_tx.send(peer).await.ok();
				return;
			}
		};
		let mut write_half = tunnel.write_half;
		let mut read_half = tunnel.read_half;

		let uplink = async {
			loop {
				let data = match tokio::time::timeout(UDP_SESSION_IDLE, rx.recv()).await {
					Ok(Some(data)) => data,
					// Idle or the intake is gone.
					Ok(None) | Err(_) => return,
				};
				if let Err(e) = write_half.send_pkt(&data, &target).await {
					debug!("forward udp uplink for {} ended ({})", peer, e);
					return;
				}
			}
		};
		let downlink = async {
			let mut buf = vec![0_u8; MAX_PACKET_SIZE];
			loop {
				match read_half.recv_pkt(&mut buf).await {
					Ok((n, _src)) => {
						if let Err(e) = socket.send_to(&buf[..n], peer).await {
							debug!("forward udp reply to {} failed ({})", peer, e);
							return;
						}
					}
					Err(e) => {
						debug!("forward udp downlink for {} ended ({})", peer, e);
						return;
					}
				}
			}
		};
		futures::pin_mut!(uplink);
		futures::pin_mut!(downlink);
		let both = futures::future::select(uplink, downlink);
		tokio::select! {
			_ = both => {}
			() = cancel.cancelled() => {}
		}
		debug!("forward udp session for {} closed", peer);
		dead_tx.send(peer).await.ok();
	});
	tx
}
