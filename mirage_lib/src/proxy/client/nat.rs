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

// Transparent intake for TPROXY-redirected traffic. With the listener
// socket set up for interception (IP_TRANSPARENT and the firewall
// rules, which are deployment concerns), the accepted socket's local
// address IS the original destination.

use super::AppManager;
use crate::{prelude::*, protocol::Request, relay::Relay};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

pub struct Nat {
	pub listen: SocketAddr,
	pub app: Arc<AppManager>,
	pub cancel: CancellationToken,
}

impl Nat {
	/// Accept and serve until cancelled.
	///
	/// # Errors
	///
	/// Only a failure to bind the listener is returned.
	pub async fn run(&self) -> Result<(), BoxStdErr> {
		let listener = TcpListener::bind(self.listen).await?;
		info!("nat inbound listening on {}", self.listen);
		super::super::serve_listener(listener, self.cancel.clone(), |stream, peer| {
			let app = self.app.clone();
			let cancel = self.cancel.clone();
			async move {
				if let Err(e) = handle_conn(app, stream, peer, cancel).await {
					debug!("nat session from {} ended with error ({})", peer, e);
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
	cancel: CancellationToken,
) -> Result<(), BoxStdErr> {
	let dst = stream.local_addr()?;
	let request = Request::connect(dst.into());
	info!("nat conn from {} tunneling to {}", peer, request.addr);

	let outbound = app.open_stream(&request).await?;
	let conn_id = format!("{:#06x}", rand::thread_rng().next_u64() & 0xffff);
	let (ir, iw) = tokio::io::split(stream);
	let mut relay = Relay::new(&conn_id, cancel);
	relay.set_buffer_size(app.buffer_size);
	relay.relay_stream(ir, iw, outbound.r, outbound.w).await?;
	Ok(())
}
