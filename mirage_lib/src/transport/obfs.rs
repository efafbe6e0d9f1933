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
AES-128-CTR obfuscation layer.

This layer exists only to strip wire-visible patterns from WebSocket
payloads. It provides NO authentication and NO integrity; a decode
failure is a connection failure.

The dialing side generates a random 16-byte IV and sends it in the clear
as the very first bytes. Both directions on both sides are keyed with
that single IV, so construction is symmetric apart from who generates it.
*/

use crate::auth::OBFS_KEY_LEN;
use crate::prelude::*;
use aes::cipher::{KeyIvInit, StreamCipher};
use futures::ready;
use std::{
	io,
	task::{Context, Poll},
};
use tokio::io::ReadBuf;

pub const IV_LEN: usize = 16;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

pub type ObfsKey = [u8; OBFS_KEY_LEN];

/// Generate the IV for an outbound connection and write it to `io`.
///
/// # Errors
///
/// Returns any IO error from the underlying stream.
pub async fn write_iv<T: AsyncWrite + Unpin>(io: &mut T) -> io::Result<[u8; IV_LEN]> {
	let mut iv = [0_u8; IV_LEN];
	rand::thread_rng().fill_bytes(&mut iv);
	io.write_all(&iv).await?;
	io.flush().await?;
	trace!("obfs iv sent");
	Ok(iv)
}

/// Read the peer's IV off an inbound connection.
///
/// # Errors
///
/// Returns any IO error from the underlying stream, including a short read.
pub async fn read_iv<T: AsyncRead + Unpin>(io: &mut T) -> io::Result<[u8; IV_LEN]> {
	let mut iv = [0_u8; IV_LEN];
	io.read_exact(&mut iv).await?;
	trace!("obfs iv received");
	Ok(iv)
}

/// The CTR codec installed over a stream once the IV is known.
pub struct ObfsStream<T> {
	io: T,
	dec: Aes128Ctr,
	enc: Aes128Ctr,
	// Already-encrypted bytes waiting to be written out. `claimed` is how
	// many plaintext bytes the pending data stands for.
	pending: Vec<u8>,
	pending_pos: usize,
	claimed: usize,
}

impl<T> ObfsStream<T>
where
	T: AsyncRead + AsyncWrite + Unpin,
{
	#[must_use]
	pub fn new(io: T, key: &ObfsKey, iv: &[u8; IV_LEN]) -> Self {
		Self {
			io,
			dec: Aes128Ctr::new(key.into(), iv.into()),
			enc: Aes128Ctr::new(key.into(), iv.into()),
			pending: Vec::new(),
			pending_pos: 0,
			claimed: 0,
		}
	}

	fn poll_flush_pending(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		while self.pending_pos < self.pending.len() {
			let n = ready!(Pin::new(&mut self.io).poll_write(cx, &self.pending[self.pending_pos..]))?;
			if n == 0 {
				return Err(io::ErrorKind::WriteZero.into()).into();
			}
			self.pending_pos += n;
		}
		self.pending.clear();
		self.pending_pos = 0;
		Ok(()).into()
	}
}

impl<T> AsyncRead for ObfsStream<T>
where
	T: AsyncRead + AsyncWrite + Unpin,
{
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		dst: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		let me = self.get_mut();
		let before = dst.filled().len();
		ready!(Pin::new(&mut me.io).poll_read(cx, dst))?;
		me.dec.apply_keystream(&mut dst.filled_mut()[before..]);
		Ok(()).into()
	}
}

impl<T> AsyncWrite for ObfsStream<T>
where
	T: AsyncRead + AsyncWrite + Unpin,
{
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<Result<usize, io::Error>> {
		let me = self.get_mut();
		if me.pending.is_empty() {
			me.pending.extend_from_slice(buf);
			me.enc.apply_keystream(&mut me.pending);
			me.claimed = buf.len();
		}
		ready!(me.poll_flush_pending(cx))?;
		Ok(me.claimed).into()
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		let me = self.get_mut();
		ready!(me.poll_flush_pending(cx))?;
		Pin::new(&mut me.io).poll_flush(cx)
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		let me = self.get_mut();
		ready!(me.poll_flush_pending(cx))?;
		Pin::new(&mut me.io).poll_shutdown(cx)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::auth::obfs_key;
	use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt};

	#[test]
	fn test_codec_is_symmetric() {
		let task = async {
			let key = obfs_key(b"obf");
			let (a, b) = duplex(4096);

			let (mut a, mut b) = {
				let mut a = a;
				let iv = write_iv(&mut a).await.unwrap();
				let a = ObfsStream::new(a, &key, &iv);

				let mut b = b;
				let iv = read_iv(&mut b).await.unwrap();
				let b = ObfsStream::new(b, &key, &iv);
				(a, b)
			};

			a.write_all(b"request body").await.unwrap();
			let mut buf = [0_u8; 12];
			b.read_exact(&mut buf).await.unwrap();
			assert_eq!(&buf, b"request body");

			b.write_all(b"reply").await.unwrap();
			let mut buf = [0_u8; 5];
			a.read_exact(&mut buf).await.unwrap();
			assert_eq!(&buf, b"reply");
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_wire_is_not_plaintext() {
		let task = async {
			let key = obfs_key(b"obf");
			let (a, mut b) = duplex(4096);

			let mut a = a;
			let iv = write_iv(&mut a).await.unwrap();
			let mut a = ObfsStream::new(a, &key, &iv);
			a.write_all(b"very secret bytes").await.unwrap();

			let mut raw = [0_u8; IV_LEN + 17];
			b.read_exact(&mut raw).await.unwrap();
			assert_eq!(&raw[..IV_LEN], &iv[..]);
			assert_ne!(&raw[IV_LEN..], b"very secret bytes");
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}

	#[test]
	fn test_wrong_key_garbles() {
		let task = async {
			let (a, b) = duplex(4096);

			let mut a = a;
			let iv = write_iv(&mut a).await.unwrap();
			let mut a = ObfsStream::new(a, &obfs_key(b"right"), &iv);
			a.write_all(b"payload").await.unwrap();

			let mut b = b;
			let iv = read_iv(&mut b).await.unwrap();
			let mut b = ObfsStream::new(b, &obfs_key(b"wrong"), &iv);
			let mut buf = [0_u8; 7];
			b.read_exact(&mut buf).await.unwrap();
			assert_ne!(&buf, b"payload");
		};
		tokio::runtime::Runtime::new().unwrap().block_on(task);
	}
}
