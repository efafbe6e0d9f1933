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

pub mod addr;

pub use addr::{AddrType, Address, Destination, DomainName, ReadError};

use crate::prelude::*;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::{
	fmt::{self, Display, Formatter},
	io,
	task::{Context, Poll},
};
use tokio::io::ReadBuf;

pub trait AsyncReadWrite: AsyncRead + AsyncWrite + Send + Sync + Unpin {}
impl<T> AsyncReadWrite for T where T: AsyncRead + AsyncWrite + Send + Sync + Unpin {}

pub type BoxRead = Box<dyn AsyncRead + Send + Sync + Unpin>;
pub type BoxWrite = Box<dyn AsyncWrite + Send + Sync + Unpin>;
pub type BoxStream = Box<dyn AsyncReadWrite>;

/// Commands understood on the tunnel channel.
///
/// `Mux` streams are carried opaquely and handed to an external
/// multiplexer if one is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
	Connect = 0x01,
	Associate = 0x03,
	Mux = 0x7f,
}

impl Display for Command {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			Command::Connect => f.write_str("CONNECT"),
			Command::Associate => f.write_str("ASSOCIATE"),
			Command::Mux => f.write_str("MUX"),
		}
	}
}

/// What an inbound session wants done: a command and a destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
	pub cmd: Command,
	pub addr: Address,
}

impl Request {
	#[inline]
	#[must_use]
	pub fn new(cmd: Command, addr: Address) -> Self {
		Self { cmd, addr }
	}

	#[inline]
	#[must_use]
	pub fn connect(addr: Address) -> Self {
		Self::new(Command::Connect, addr)
	}
}

impl Display for Request {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		write!(f, "{} {}", self.cmd, self.addr)
	}
}

/// A read half and a write half glued back into one stream.
pub struct CompositeStream<R, W> {
	pub r: R,
	pub w: W,
}

impl<R, W> CompositeStream<R, W>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	#[inline]
	pub fn new(r: R, w: W) -> Self {
		Self { r, w }
	}
}

pub type BytesStream = CompositeStream<BoxRead, BoxWrite>;

impl<R, W> AsyncRead for CompositeStream<R, W>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	#[inline]
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		Pin::new(&mut self.get_mut().r).poll_read(cx, buf)
	}
}

impl<R, W> AsyncWrite for CompositeStream<R, W>
where
	R: AsyncRead + Unpin,
	W: AsyncWrite + Unpin,
{
	#[inline]
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<Result<usize, io::Error>> {
		Pin::new(&mut self.get_mut().w).poll_write(cx, buf)
	}

	#[inline]
	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		Pin::new(&mut self.get_mut().w).poll_flush(cx)
	}

	#[inline]
	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
		Pin::new(&mut self.get_mut().w).poll_shutdown(cx)
	}
}

impl From<tokio::net::TcpStream> for BytesStream {
	fn from(val: tokio::net::TcpStream) -> Self {
		let (rh, wh) = val.into_split();
		CompositeStream::new(Box::new(rh), Box::new(wh))
	}
}

// ----------------------------------------------------
//                 Packet sessions
// ----------------------------------------------------

/// Receiving end of a datagram session. Each packet carries the address
/// it came from (or is destined to, depending on direction).
#[async_trait]
pub trait RecvPacket: Send {
	async fn recv_pkt(&mut self, buf: &mut [u8]) -> io::Result<(usize, Address)>;
}

/// Sending end of a datagram session.
#[async_trait]
pub trait SendPacket: Send {
	async fn send_pkt(&mut self, payload: &[u8], addr: &Address) -> io::Result<usize>;

	async fn shutdown_pkt(&mut self) -> io::Result<()> {
		Ok(())
	}
}

#[async_trait]
impl<T: RecvPacket + ?Sized> RecvPacket for Box<T> {
	async fn recv_pkt(&mut self, buf: &mut [u8]) -> io::Result<(usize, Address)> {
		self.as_mut().recv_pkt(buf).await
	}
}

#[async_trait]
impl<T: SendPacket + ?Sized> SendPacket for Box<T> {
	async fn send_pkt(&mut self, payload: &[u8], addr: &Address) -> io::Result<usize> {
		self.as_mut().send_pkt(payload, addr).await
	}

	async fn shutdown_pkt(&mut self) -> io::Result<()> {
		self.as_mut().shutdown_pkt().await
	}
}

/// A full datagram session split into its two halves.
pub struct PacketStream {
	pub read_half: Box<dyn RecvPacket>,
	pub write_half: Box<dyn SendPacket>,
}
