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

/*!
The scapegoat diverter.

A connection that fails TLS, the WebSocket upgrade, the obfuscation
layer or the tunnel header is not answered; it is paired with a freshly
dialed decoy upstream and spliced byte-for-byte, so an active probe sees
whatever a plausible non-proxy origin would have said. The offending
connection arrives here wrapped in a rewound stream, so the decoy sees
exactly the bytes the probe already sent.
*/

use crate::{prelude::*, protocol::BoxStream, relay::Relay, transport::ws};
use std::fmt;
use tokio::{net::TcpStream, sync::mpsc};
use tokio_util::sync::CancellationToken;

const CHANNEL_SIZE: usize = 64;

/// Where to dial the decoy.
pub enum Decoy {
	/// Plain TCP to the configured remote address. Used for bare-TLS
	/// level failures, where the recorded bytes are raw client bytes.
	Direct(SocketAddr),
	/// A fresh WebSocket client connection to our own URL and origin.
	/// Used for failures inside the WebSocket payload.
	WebSocket {
		addr: SocketAddr,
		hostname: String,
		path: String,
	},
}

impl fmt::Display for Decoy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Decoy::Direct(addr) => write!(f, "tcp {}", addr),
			Decoy::WebSocket {
				addr,
				hostname,
				path,
			} => write!(f, "ws {} ({}{})", addr, hostname, path),
		}
	}
}

pub struct Scapegoat {
	pub conn: BoxStream,
	pub decoy: Decoy,
	/// Diagnostic only. Never written to any socket.
	pub info: String,
}

/// Hands failed connections to a background worker over a bounded
/// channel. Owned records live until both peers close.
#[derive(Clone)]
pub struct ShadowManager {
	tx: mpsc::Sender<Scapegoat>,
}

impl ShadowManager {
	#[must_use]
	pub fn new(
		buffer_size: usize,
		cancel: CancellationToken,
	) -> (Self, impl std::future::Future<Output = ()> + Send) {
		let (tx, rx) = mpsc::channel::<Scapegoat>(CHANNEL_SIZE);
		let worker = run_worker(rx, buffer_size, cancel);
		(Self { tx }, worker)
	}

	/// Queue a failed connection for diversion. If the worker is
	/// saturated the connection is simply dropped; it gets no reply
	/// either way.
	pub fn submit(&self, goat: Scapegoat) {
		debug!("diverting connection to {} ({})", goat.decoy, goat.info);
		if let Err(e) = self.tx.try_send(goat) {
			warn!("scapegoat worker saturated, dropping connection ({})", e);
		}
	}
}

async fn run_worker(
	mut rx: mpsc::Receiver<Scapegoat>,
	buffer_size: usize,
	cancel: CancellationToken,
) {
	loop {
		let goat = tokio::select! {
			goat = rx.recv() => match goat {
				Some(goat) => goat,
				None => return,
			},
			() = cancel.cancelled() => return,
		};
		let cancel = cancel.clone();
		tokio::spawn(async move {
			if let Err(e) = divert(goat, buffer_size, cancel).await {
				debug!("scapegoat session ended ({})", e);
			}
		});
	}
}

async fn divert(goat: Scapegoat, buffer_size: usize, cancel: CancellationToken) -> Result<(), BoxStdErr> {
	let shadow: BoxStream = match &goat.decoy {
		Decoy::Direct(addr) => Box::new(TcpStream::connect(*addr).await?),
		Decoy::WebSocket {
			addr,
			hostname,
			path,
		} => {
			let stream = TcpStream::connect(*addr).await?;
			Box::new(ws::connect(stream, hostname, path).await?)
		}
	};

	let (or, ow) = tokio::io::split(shadow);
	let (ir, iw) = tokio::io::split(goat.conn);
	let mut relay = Relay::new("shadow", cancel);
	relay.set_buffer_size(buffer_size);
	relay.relay_stream(ir, iw, or, ow).await?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::transport::RewindStream;
	use std::time::Duration;
	use tokio::{
		io::{duplex, AsyncReadExt, AsyncWriteExt},
		net::TcpListener,
	};

	#[test]
	fn test_decoy_sees_replayed_bytes() {
		let task = async {
			let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
			let decoy_addr = listener.local_addr().unwrap();

			// 200 bytes of garbage, then more after the diversion.
			let first: Vec<u8> = (0_u16..200).map(|v| (v % 251) as u8).collect();

			let (mut probe, server_side) = duplex(4 * 1024);
			probe.write_all(&first).await.unwrap();

			// Server peeks at the bytes the way a header decoder would,
			// fails, rewinds and hands the stream over.
			let stream = RewindStream::new(server_side);
			stream.start_buffering(512);
			{
				let mut peek = [0_u8; 56];
				let mut stream = stream.clone();
				stream.read_exact(&mut peek).await.unwrap();
			}
			stream.rewind();
			stream.stop_buffering();

			let cancel = CancellationToken::new();
			let (manager, worker) = ShadowManager::new(4 * 1024, cancel.clone());
			tokio::spawn(worker);
			manager.submit(Scapegoat {
				conn: Box::new(stream),
				decoy: Decoy::Direct(decoy_addr),
				info: "test probe".into(),
			});

			let (mut decoy_conn, _) = listener.accept().await.unwrap();
			let mut seen = vec![0_u8; 200];
			decoy_conn.read_exact(&mut seen).await.unwrap();
			assert_eq!(seen, first);

			// Later bytes flow through unchanged as well.
			probe.write_all(b"more probe bytes").await.unwrap();
			let mut more = [0_u8; 16];
			decoy_conn.read_exact(&mut more).await.unwrap();
			assert_eq!(&more, b"more probe bytes");

			// And the decoy's answer reaches the probe.
			decoy_conn.write_all(b"404 not here").await.unwrap();
			let mut reply = [0_u8; 12];
			probe.read_exact(&mut reply).await.unwrap();
			assert_eq!(&reply, b"404 not here");

			cancel.cancel();
		};
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async {
			tokio::time::timeout(Duration::from_secs(10), task)
				.await
				.unwrap();
		});
	}
}
