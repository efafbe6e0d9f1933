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

use crate::prelude::*;
use futures::ready;
use std::{
	io,
	sync::Mutex,
	task::{Context, Poll},
};
use tokio::io::ReadBuf;

/// A byte stream that can record what was read and play it back once.
///
/// While buffering is on, every read from the underlying stream is also
/// appended to an internal buffer (up to the configured size). [`rewind`]
/// flips the stream so the next reads drain the buffer first, then resume
/// from the underlying source. [`stop_buffering`] freezes the buffer: reads
/// no longer grow it, but a pending rewind stays replayable.
///
/// The wrapper is cloneable; clones share the same underlying stream and
/// buffer. This is what lets a handshake layer consume the stream by value
/// while the accept path keeps a handle for diverting the connection when
/// that handshake fails.
///
/// Writes pass through untouched.
///
/// [`rewind`]: RewindStream::rewind
/// [`stop_buffering`]: RewindStream::stop_buffering
pub struct RewindStream<T> {
	inner: Arc<Mutex<Inner<T>>>,
}

impl<T> Clone for RewindStream<T> {
	fn clone(&self) -> Self {
		Self {
			inner: self.inner.clone(),
		}
	}
}

struct Inner<T> {
	io: T,
	limit: usize,
	buffer: Vec<u8>,
	replay_pos: Option<usize>,
}

impl<T> RewindStream<T> {
	#[must_use]
	pub fn new(io: T) -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				io,
				limit: 0,
				buffer: Vec::new(),
				replay_pos: None,
			})),
		}
	}

	/// Start recording reads, keeping at most `limit` bytes.
	pub fn start_buffering(&self, limit: usize) {
		let mut me = self.lock();
		me.limit = limit;
		let additional = limit.saturating_sub(me.buffer.len());
		me.buffer.reserve(additional);
	}

	/// Freeze the buffer. A rewind that has not been drained yet
	/// remains replayable; otherwise the recording is released.
	pub fn stop_buffering(&self) {
		let mut me = self.lock();
		me.limit = 0;
		if me.replay_pos.is_none() {
			me.buffer = Vec::new();
		}
	}

	/// Replay everything recorded since buffering started.
	///
	/// The buffer is drained exactly once by whoever reads next;
	/// rewinding again after the drain is a no-op.
	pub fn rewind(&self) {
		let mut me = self.lock();
		if !me.buffer.is_empty() {
			me.replay_pos = Some(0);
		}
	}

	#[cfg(test)]
	fn buffered_len(&self) -> usize {
		self.lock().buffer.len()
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
		// The lock is only held across a single poll; a poisoned lock
		// means a panic mid-poll and the connection is dead anyway.
		match self.inner.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}
}

impl<T> AsyncRead for RewindStream<T>
where
	T: AsyncRead + Unpin,
{
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		dst: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		let me = self.get_mut();
		let mut me = me.lock();
		if let Some(pos) = me.replay_pos {
			let remaining = me.buffer.len() - pos;
			if remaining > 0 {
				let len = std::cmp::min(remaining, dst.remaining());
				dst.put_slice(&me.buffer[pos..pos + len]);
				if pos + len == me.buffer.len() {
					me.replay_pos = None;
					if me.limit == 0 {
						me.buffer = Vec::new();
					}
				} else {
					me.replay_pos = Some(pos + len);
				}
				return Ok(()).into();
			}
			me.replay_pos = None;
		}

		let before = dst.filled().len();
		ready!(Pin::new(&mut me.io).poll_read(cx, dst))?;
		if me.limit > me.buffer.len() {
			let data = &dst.filled()[before..];
			let record = std::cmp::min(me.limit - me.buffer.len(), data.len());
			me.buffer.extend_from_slice(&data[..record]);
		}
		Ok(()).into()
	}
}

impl<T> AsyncWrite for RewindStream<T>
where
	T: AsyncWrite + Unpin,
{
	#[inline]
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<Result<usize, io::Error>> {
		let me = self.get_mut();
		let mut me = me.lock();
		Pin::new(&mut me.io).poll_write(cx, buf)
	}

	#[inline]
	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		let me = self.get_mut();
		let mut me = me.lock();
		Pin::new(&mut me.io).poll_flush(cx)
	}

	#[inline]
	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		let me = self.get_mut();
		let mut me = me.lock();
		Pin::new(&mut me.io).poll_shutdown(cx)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

	#[test]
	fn test_rewind_replays_recorded_bytes() {
		let task = async {
			let (mut a, b) = duplex(1024);
			let stream = RewindStream::new(b);
			a.write_all(b"hello world, extra bytes").await.unwrap();

			stream.start_buffering(512);
			let mut head = [0_u8; 11];
			let mut stream2 = stream.clone();
			stream2.read_exact(&mut head).await.unwrap();
			assert_eq!(&head, b"hello world");

			stream.rewind();
			stream.stop_buffering();

			let mut all = [0_u8; 24];
			let mut stream = stream;
			stream.read_exact(&mut all).await.unwrap();
			assert_eq!(&all, b"hello world, extra bytes");
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_second_rewind_after_drain_is_noop() {
		let task = async {
			let (mut a, b) = duplex(1024);
			let mut stream = RewindStream::new(b);
			a.write_all(b"0123456789").await.unwrap();

			stream.start_buffering(512);
			let mut buf = [0_u8; 4];
			stream.read_exact(&mut buf).await.unwrap();
			stream.rewind();
			stream.stop_buffering();
			stream.read_exact(&mut buf).await.unwrap();
			assert_eq!(&buf, b"0123");

			// Buffer has been drained and released.
			stream.rewind();
			let mut rest = [0_u8; 6];
			stream.read_exact(&mut rest).await.unwrap();
			assert_eq!(&rest, b"456789");
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_buffer_capacity_is_bounded() {
		let task = async {
			let (mut a, b) = duplex(1024);
			let mut stream = RewindStream::new(b);
			a.write_all(&[7_u8; 64]).await.unwrap();

			stream.start_buffering(16);
			let mut buf = [0_u8; 64];
			stream.read_exact(&mut buf).await.unwrap();
			assert_eq!(stream.buffered_len(), 16);
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_stop_buffering_without_rewind_releases() {
		let task = async {
			let (mut a, b) = duplex(1024);
			let mut stream = RewindStream::new(b);
			a.write_all(b"abcdef").await.unwrap();

			stream.start_buffering(512);
			let mut buf = [0_u8; 6];
			stream.read_exact(&mut buf).await.unwrap();
			assert_eq!(stream.buffered_len(), 6);
			stream.stop_buffering();
			assert_eq!(stream.buffered_len(), 0);
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_writes_pass_through() {
		let task = async {
			let (mut a, b) = duplex(1024);
			let mut stream = RewindStream::new(b);
			stream.start_buffering(512);
			stream.write_all(b"untouched").await.unwrap();
			let mut buf = [0_u8; 9];
			a.read_exact(&mut buf).await.unwrap();
			assert_eq!(&buf, b"untouched");
			assert_eq!(stream.buffered_len(), 0);
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}
}
