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
Layer composition.

Outbound order, innermost last:
raw TCP -> TLS -> [WebSocket -> [obfuscation -> [TLS]]]

The inbound side is the mirror, with each layer gated on the previous
one completing. Every inbound layer that reads from the peer runs under
a randomized deadline, and every failure hands the connection, rewound
to the earliest peeked byte, to the scapegoat diverter.
*/

use super::{
	obfs::{self, ObfsStream},
	rewind::RewindStream,
	tls, with_deadline, ws,
};
use crate::{
	auth::obfs_key,
	prelude::*,
	protocol::BoxStream,
	shadow::{Decoy, Scapegoat, ShadowManager},
};
use std::io;

// Rewind windows for the sniffing phases. The HTTP window must cover
// everything `ws::sniff_request` may consume, or the replayed request
// head would be truncated.
const RAW_BUFFER_SIZE: usize = 2048;
const HTTP_BUFFER_SIZE: usize = 4096;
const WS_BUFFER_SIZE: usize = 512;

// ----------------------------------------------------
//                    Outbound
// ----------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct WsSettingsBuilder {
	pub hostname: String,
	pub path: String,
	/// Enables the obfuscation layer when non-empty.
	pub obfs_password: String,
	pub double_tls: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OutboundBuilder {
	pub tls: tls::ConnectorBuilder,
	pub ws: Option<WsSettingsBuilder>,
}

impl OutboundBuilder {
	/// Build the outbound stack.
	///
	/// # Errors
	///
	/// Returns a [`tls::ConfigError`] if the TLS settings are invalid.
	pub fn build(self) -> Result<Outbound, tls::ConfigError> {
		let inner_tls = self.tls.clone();
		let ws = self
			.ws
			.map(|ws| -> Result<WsOutbound, tls::ConfigError> {
				let double_tls = if ws.double_tls {
					Some(inner_tls.build()?)
				} else {
					None
				};
				Ok(WsOutbound {
					hostname: ws.hostname,
					path: ws.path,
					obfs: if ws.obfs_password.is_empty() {
						None
					} else {
						Some(obfs_key(ws.obfs_password.as_bytes()))
					},
					double_tls,
				})
			})
			.transpose()?;
		Ok(Outbound {
			tls: self.tls.build()?,
			ws,
		})
	}
}

struct WsOutbound {
	hostname: String,
	path: String,
	obfs: Option<obfs::ObfsKey>,
	double_tls: Option<tls::Connector>,
}

pub struct Outbound {
	tls: tls::Connector,
	ws: Option<WsOutbound>,
}

impl Outbound {
	/// Run the full client-side layering over a connected stream.
	///
	/// # Errors
	///
	/// Any layer failing to hand-shake fails the connection.
	pub async fn connect<IO>(&self, stream: IO, server_addr: &Address) -> io::Result<BoxStream>
	where
		IO: 'static + AsyncRead + AsyncWrite + Unpin + Send + Sync,
	{
		let stream = self.tls.connect(stream, server_addr).await?;
		let ws_settings = match &self.ws {
			None => return Ok(Box::new(stream)),
			Some(ws_settings) => ws_settings,
		};

		debug!("establishing websocket transport to '{}'", server_addr);
		let stream = ws::connect(stream, &ws_settings.hostname, &ws_settings.path).await?;

		let stream: BoxStream = if let Some(key) = &ws_settings.obfs {
			trace!("ws obfs enabled");
			let mut stream = stream;
			let iv = obfs::write_iv(&mut stream).await?;
			Box::new(ObfsStream::new(stream, key, &iv))
		} else {
			Box::new(stream)
		};

		let stream = match &ws_settings.double_tls {
			None => return Ok(stream),
			Some(inner) => {
				trace!("ws double tls enabled");
				inner.connect(stream, server_addr).await?
			}
		};
		Ok(Box::new(stream))
	}
}

// ----------------------------------------------------
//                    Inbound
// ----------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InboundBuilder {
	pub cert_file: String,
	pub key_file: String,
	pub alpns: Vec<String>,
	pub ws: Option<WsSettingsBuilder>,
}

impl InboundBuilder {
	/// Build the inbound stack.
	///
	/// # Errors
	///
	/// Returns a [`tls::ConfigError`] if certificate or key cannot be
	/// loaded.
	pub fn build(self) -> Result<Inbound, tls::ConfigError> {
		let InboundBuilder {
			cert_file,
			key_file,
			alpns,
			ws,
		} = self;
		let ws = ws
			.map(|ws| -> Result<WsInbound, tls::ConfigError> {
				let double_tls = if ws.double_tls {
					Some(tls::Acceptor::new(
						&cert_file,
						&key_file,
						alpns.iter().map(String::as_bytes),
					)?)
				} else {
					None
				};
				Ok(WsInbound {
					hostname: ws.hostname,
					path: ws.path,
					obfs: if ws.obfs_password.is_empty() {
						None
					} else {
						Some(obfs_key(ws.obfs_password.as_bytes()))
					},
					double_tls,
				})
			})
			.transpose()?;
		Ok(Inbound {
			tls: tls::Acceptor::new(&cert_file, &key_file, alpns.iter().map(String::as_bytes))?,
			ws,
		})
	}
}

struct WsInbound {
	hostname: String,
	path: String,
	obfs: Option<obfs::ObfsKey>,
	double_tls: Option<tls::Acceptor>,
}

pub struct Inbound {
	tls: tls::Acceptor,
	ws: Option<WsInbound>,
}

/// A connection that survived every transport layer. `decoy` is what a
/// later framing failure on this channel should be diverted to.
pub struct AcceptedConn {
	pub stream: BoxStream,
	pub decoy: Decoy,
}

impl Inbound {
	/// Accept one connection through the configured layers.
	///
	/// Returns `Ok(None)` when the connection failed a layer and has
	/// been handed to the diverter; the caller is done with it either
	/// way.
	///
	/// # Errors
	///
	/// Returns an error only for failures that cannot be diverted
	/// (e.g. the WebSocket reply could not be written).
	pub async fn accept<IO>(
		&self,
		stream: IO,
		peer: SocketAddr,
		remote_addr: SocketAddr,
		shadow: &ShadowManager,
	) -> Result<Option<AcceptedConn>, BoxStdErr>
	where
		IO: 'static + AsyncRead + AsyncWrite + Unpin + Send + Sync,
	{
		// The raw bytes are recorded first, so a failed TLS handshake
		// can be replayed to the decoy unchanged.
		let raw = RewindStream::new(stream);
		raw.start_buffering(RAW_BUFFER_SIZE);

		let tls_stream = match with_deadline(self.tls.accept(raw.clone())).await {
			Ok(s) => s,
			Err(e) => {
				raw.rewind();
				raw.stop_buffering();
				shadow.submit(Scapegoat {
					conn: Box::new(raw),
					decoy: Decoy::Direct(remote_addr),
					info: format!("invalid tls handshake from {} ({})", peer, e),
				});
				return Ok(None);
			}
		};
		raw.stop_buffering();

		let ws_settings = match &self.ws {
			None => {
				return Ok(Some(AcceptedConn {
					stream: Box::new(tls_stream),
					decoy: Decoy::Direct(remote_addr),
				}))
			}
			Some(ws_settings) => ws_settings,
		};

		// Peek the first request off the decrypted stream. Anything that
		// is not our upgrade goes to the decoy as plain HTTP.
		let peeked = RewindStream::new(tls_stream);
		peeked.start_buffering(HTTP_BUFFER_SIZE);
		let head = {
			let mut reader = peeked.clone();
			with_deadline(ws::sniff_request(&mut reader)).await
		};
		let is_upgrade = match &head {
			Ok(Some(head)) => head.is_upgrade_to(&ws_settings.path),
			Ok(None) | Err(_) => false,
		};
		if !is_upgrade {
			peeked.rewind();
			peeked.stop_buffering();
			shadow.submit(Scapegoat {
				conn: Box::new(peeked),
				decoy: Decoy::Direct(remote_addr),
				info: format!("invalid websocket request from {}", peer),
			});
			return Ok(None);
		}

		// Serve the actual upgrade off the replayed request.
		peeked.rewind();
		let ws_stream =
			with_deadline(ws::accept(peeked.clone(), &ws_settings.path)).await?;
		peeked.stop_buffering();

		let ws_decoy = || Decoy::WebSocket {
			addr: remote_addr,
			hostname: ws_settings.hostname.clone(),
			path: ws_settings.path.clone(),
		};

		// From here on the recorded bytes are WebSocket payload, so the
		// decoy is a fresh WebSocket to our own origin.
		let payload = RewindStream::new(ws_stream);
		payload.start_buffering(WS_BUFFER_SIZE);

		let stream: BoxStream = if let Some(key) = &ws_settings.obfs {
			let iv = {
				let mut reader = payload.clone();
				with_deadline(obfs::read_iv(&mut reader)).await
			};
			let iv = match iv {
				Ok(iv) => iv,
				Err(e) => {
					payload.rewind();
					payload.stop_buffering();
					shadow.submit(Scapegoat {
						conn: Box::new(payload),
						decoy: ws_decoy(),
						info: format!("{} did not send a valid obfs iv ({})", peer, e),
					});
					return Ok(None);
				}
			};
			Box::new(ObfsStream::new(payload.clone(), key, &iv))
		} else {
			Box::new(payload.clone())
		};

		let stream: BoxStream = match &ws_settings.double_tls {
			None => stream,
			Some(inner) => match with_deadline(inner.accept(stream)).await {
				Ok(s) => Box::new(s),
				Err(e) => {
					payload.rewind();
					payload.stop_buffering();
					shadow.submit(Scapegoat {
						conn: Box::new(payload),
						decoy: ws_decoy(),
						info: format!("invalid double tls handshake from {} ({})", peer, e),
					});
					return Ok(None);
				}
			},
		};
		payload.stop_buffering();

		Ok(Some(AcceptedConn {
			stream,
			decoy: ws_decoy(),
		}))
	}
}
