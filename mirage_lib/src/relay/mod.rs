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

mod copier;

use crate::{
	prelude::*,
	protocol::{PacketStream, RecvPacket, SendPacket},
	trojan::udp::MAX_PACKET_SIZE,
};
use copier::StreamCopier;
use futures::{
	future::{self, Either},
	Future, FutureExt,
};
use std::{
	io,
	sync::atomic::{AtomicBool, AtomicU64, Ordering},
	time::Duration,
};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_BUFFER_SIZE: usize = 32 * 1024;
/// How long the surviving direction may keep draining after the other
/// one finished.
const GRACE_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) const STOPPED: bool = true;

/// Shared byte counter, updated from the copy loops.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicU64>);

impl Counter {
	#[must_use]
	pub fn new(value: u64) -> Self {
		Self(Arc::new(AtomicU64::new(value)))
	}

	#[inline]
	pub fn add(&self, n: u64) {
		self.0.fetch_add(n, Ordering::Relaxed);
	}

	#[inline]
	#[must_use]
	pub fn get(&self) -> u64 {
		self.0.load(Ordering::Relaxed)
	}
}

#[derive(Clone, Default)]
pub(crate) struct Switch(Arc<AtomicBool>);

impl Switch {
	#[inline]
	pub fn set(&self, value: bool) {
		self.0.store(value, Ordering::Relaxed);
	}

	#[inline]
	pub fn get(&self) -> bool {
		self.0.load(Ordering::Relaxed)
	}
}

pub struct Relay<'a> {
	pub conn_id: &'a str,
	pub recv: Option<Counter>,
	pub send: Option<Counter>,
	pub buffer_size: usize,
	pub cancel: CancellationToken,
}

impl<'a> Relay<'a> {
	#[inline]
	#[must_use]
	pub fn new(conn_id: &'a str, cancel: CancellationToken) -> Self {
		Self {
			conn_id,
			recv: None,
			send: None,
			buffer_size: DEFAULT_BUFFER_SIZE,
			cancel,
		}
	}

	#[inline]
	pub fn set_recv(&mut self, recv: Counter) -> &mut Self {
		self.recv = Some(recv);
		self
	}

	#[inline]
	pub fn set_send(&mut self, send: Counter) -> &mut Self {
		self.send = Some(send);
		self
	}

	#[inline]
	pub fn set_buffer_size(&mut self, size: usize) -> &mut Self {
		self.buffer_size = size;
		self
	}

	/// Copy both directions until one side finishes, give the other a
	/// bounded grace period, then stop. Cancellation of the token ends
	/// the relay cleanly.
	///
	/// # Errors
	///
	/// Returns the first meaningful IO error; EOF and errors after the
	/// other side already stopped are not errors.
	pub async fn relay_stream<IR, IW, OR, OW>(
		&self,
		ir: IR,
		iw: IW,
		or: OR,
		ow: OW,
	) -> io::Result<()>
	where
		IR: AsyncRead + Unpin + Send + 'static,
		OR: AsyncRead + Unpin + Send + 'static,
		IW: AsyncWrite + Unpin + Send + 'static,
		OW: AsyncWrite + Unpin + Send + 'static,
	{
		let send_tag = Arc::<str>::from(format!("[{} send]", self.conn_id));
		let recv_tag = Arc::<str>::from(format!("[{} recv]", self.conn_id));

		let recv = self.recv.clone().unwrap_or_default();
		let send = self.send.clone().unwrap_or_default();

		let is_stopped = Switch::default();

		// Inbound <--- Outbound
		let recv_task = StreamCopier {
			r: or,
			w: iw,
			count: recv,
			tag: recv_tag.clone(),
			is_reading_stopped: is_stopped.clone(),
			buffer_size: self.buffer_size,
		}
		.run();
		// Inbound ---> Outbound
		let send_task = StreamCopier {
			r: ir,
			w: ow,
			count: send,
			tag: send_tag.clone(),
			is_reading_stopped: is_stopped.clone(),
			buffer_size: self.buffer_size,
		}
		.run();

		let relay_task = async move {
			futures::pin_mut!(recv_task);
			futures::pin_mut!(send_task);
			match future::select(recv_task, send_task).await {
				Either::Left((recv_res, send_task)) => {
					trace!("{} task finished", recv_tag);
					finish_other_task(recv_res, &send_tag, send_task).await
				}
				Either::Right((send_res, recv_task)) => {
					trace!("{} task finished", send_tag);
					finish_other_task(send_res, &recv_tag, recv_task).await
				}
			}
		};
		futures::pin_mut!(relay_task);

		let cancelled = self.cancel.cancelled().fuse();
		futures::pin_mut!(cancelled);

		match future::select(relay_task, cancelled).await {
			Either::Left((res, _)) => res,
			Either::Right(((), _)) => {
				debug!("[{}] relay cancelled", self.conn_id);
				Ok(())
			}
		}
	}
}

async fn finish_other_task<F>(
	curr_res: io::Result<()>,
	tag: &str,
	task: Pin<&mut F>,
) -> io::Result<()>
where
	F: Future<Output = io::Result<()>>,
{
	// The current task is already done, so its error only matters for
	// the log.
	if let Err(err) = curr_res {
		debug!("{} task error ({})", tag, err);
	}
	// Give the other direction a bounded amount of time to drain.
	let res = match timeout(GRACE_TIMEOUT, task).await {
		Ok(res) => res,
		Err(_) => {
			debug!(
				"{} did not finish within the {} ms grace period, aborting",
				tag,
				GRACE_TIMEOUT.as_millis(),
			);
			return Ok(());
		}
	};
	if let Err(err) = res {
		debug!(
			"{} task error ({}), ignored since the connection is closed",
			tag, err
		);
	}
	Ok(())
}

/// Pump packets between two datagram sessions until one of them fails
/// or the token is cancelled.
pub async fn relay_packets(
	conn_id: &str,
	inbound: PacketStream,
	outbound: PacketStream,
	cancel: CancellationToken,
) {
	let up_task = pump(inbound.read_half, outbound.write_half);
	let down_task = pump(outbound.read_half, inbound.write_half);
	futures::pin_mut!(up_task);
	futures::pin_mut!(down_task);

	let both = future::select(up_task, down_task);
	futures::pin_mut!(both);

	let cancelled = cancel.cancelled().fuse();
	futures::pin_mut!(cancelled);

	match future::select(both, cancelled).await {
		Either::Left((Either::Left((res, _)), _)) => {
			log_packet_result(conn_id, "uplink", &res);
		}
		Either::Left((Either::Right((res, _)), _)) => {
			log_packet_result(conn_id, "downlink", &res);
		}
		Either::Right(((), _)) => {
			debug!("[{}] packet relay cancelled", conn_id);
		}
	}
}

async fn pump(
	mut src: Box<dyn RecvPacket>,
	mut dst: Box<dyn SendPacket>,
) -> io::Result<()> {
	let mut buf = vec![0_u8; MAX_PACKET_SIZE];
	loop {
		let (len, addr) = src.recv_pkt(&mut buf).await?;
		trace!("packet of {} bytes for {}", len, addr);
		dst.send_pkt(&buf[..len], &addr).await?;
	}
}

fn log_packet_result(conn_id: &str, dir: &str, res: &io::Result<()>) {
	if let Err(e) = res {
		debug!("[{}] packet relay {} ended ({})", conn_id, dir, e);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	#[test]
	fn test_relay_stream() {
		// in_data  -> out_result
		// out_data -> in_result
		let mut in_data = vec![0_u8; 64];
		for (i, b) in in_data.iter_mut().enumerate() {
			*b = i as u8;
		}
		let mut out_data = vec![0_u8; 128];
		for (i, b) in out_data.iter_mut().enumerate() {
			*b = (i + 64) as u8;
		}

		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async move {
			let in_reader = Cursor::new(in_data.clone());
			let in_writer = Cursor::new(Vec::new());
			let out_reader = Cursor::new(out_data.clone());
			let out_writer = Cursor::new(Vec::new());

			let recv = Counter::new(0);
			let send = Counter::new(0);

			Relay::new("test", CancellationToken::new())
				.set_recv(recv.clone())
				.set_send(send.clone())
				.relay_stream(in_reader, in_writer, out_reader, out_writer)
				.await
				.unwrap();

			assert_eq!(send.get(), in_data.len() as u64);
			assert_eq!(recv.get(), out_data.len() as u64);
		});
	}

	#[test]
	fn test_relay_cancellation() {
		let rt = tokio::runtime::Runtime::new().unwrap();
		rt.block_on(async move {
			// Two idle duplex pairs: without cancellation this would sit
			// forever.
			let (in_side, _in_keep) = tokio::io::duplex(64);
			let (out_side, _out_keep) = tokio::io::duplex(64);
			let (ir, iw) = tokio::io::split(in_side);
			let (or, ow) = tokio::io::split(out_side);

			let cancel = CancellationToken::new();
			let relay_cancel = cancel.clone();
			let handle = tokio::spawn(async move {
				Relay::new("test", relay_cancel)
					.relay_stream(ir, iw, or, ow)
					.await
			});
			tokio::time::sleep(Duration::from_millis(50)).await;
			cancel.cancel();
			let res = tokio::time::timeout(Duration::from_secs(2), handle)
				.await
				.expect("relay must return after cancellation")
				.unwrap();
			assert!(res.is_ok());
		});
	}
}
