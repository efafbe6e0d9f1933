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

pub mod client;
pub mod server;

pub use crate::config::RunType;
pub use server::MuxAcceptor;

use crate::{
	auth::{password_to_key, Authenticator},
	config::{Config, RouterConfig},
	prelude::*,
	router::{GeoData, GeoRouter, Policy, RuleSet},
	transport::{stack, tls},
};
use client::{forward::Forward, nat::Nat, AppManager, Client};
use server::Server;
use std::{future::Future, time::Duration};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// One running proxy instance. Dropping it does not stop the tasks;
/// call [`close`](Proxy::close) (or cancel the token) for that.
pub struct Proxy {
	cancel: CancellationToken,
	kind: Kind,
}

enum Kind {
	Client(Client),
	Nat(Nat),
	Forward(Forward),
	Server(Arc<Server>),
}

impl Proxy {
	/// Build a proxy instance from a validated configuration.
	///
	/// # Errors
	///
	/// Configuration errors are unrecoverable and returned here, before
	/// anything is bound.
	pub fn new(config: &Config) -> Result<Self, BoxStdErr> {
		config.validate()?;
		let cancel = CancellationToken::new();
		let listen = config.local_address()?;

		let kind = match config.run_type {
			RunType::Server => {
				let auth = Authenticator::new(config.password.iter().map(String::as_str))?;
				let stack = build_inbound(config).build()?;
				Kind::Server(Arc::new(Server {
					listen,
					stack,
					auth,
					remote_addr: config.remote_address()?,
					buffer_size: config.buffer_size,
					cancel: cancel.clone(),
					mux: None,
				}))
			}
			RunType::Client => Kind::Client(Client {
				listen,
				app: Arc::new(build_app_manager(config)?),
				cancel: cancel.clone(),
			}),
			RunType::Nat => Kind::Nat(Nat {
				listen,
				app: Arc::new(build_app_manager(config)?),
				cancel: cancel.clone(),
			}),
			RunType::Forward => Kind::Forward(Forward {
				listen,
				target: config.target_address()?,
				app: Arc::new(build_app_manager(config)?),
				cancel: cancel.clone(),
			}),
		};
		Ok(Self { cancel, kind })
	}

	/// Install the opaque mux stream consumer. Only meaningful for a
	/// server instance.
	pub fn set_mux_acceptor(&mut self, acceptor: Arc<dyn MuxAcceptor>) {
		if let Kind::Server(server) = &mut self.kind {
			if let Some(server) = Arc::get_mut(server) {
				server.mux = Some(acceptor);
			}
		}
	}

	/// A token cancelled when [`close`](Proxy::close) is called.
	#[must_use]
	pub fn cancellation(&self) -> CancellationToken {
		self.cancel.clone()
	}

	/// Run until cancelled or a fatal startup error.
	///
	/// # Errors
	///
	/// Only listener creation (and equivalent startup) errors reach the
	/// caller; everything per-connection is handled locally.
	pub async fn run(&self) -> Result<(), BoxStdErr> {
		match &self.kind {
			Kind::Client(client) => client.run().await,
			Kind::Nat(nat) => nat.run().await,
			Kind::Forward(forward) => forward.run().await,
			Kind::Server(server) => server.clone().run().await,
		}
	}

	/// Begin a clean shutdown: accept loops exit, relay tasks return,
	/// scapegoat workers drain.
	pub fn close(&self) {
		info!("shutting down");
		self.cancel.cancel();
	}
}

fn build_app_manager(config: &Config) -> Result<AppManager, BoxStdErr> {
	let key = password_to_key(
		config
			.password
			.first()
			.ok_or("missing password")?
			.as_bytes(),
	);
	let outbound = build_outbound(config).build()?;
	let router = build_router(&config.router)?;
	Ok(AppManager::new(
		outbound,
		key,
		config.remote_address()?,
		router,
		config.buffer_size,
	))
}

fn build_ws(config: &Config) -> Option<stack::WsSettingsBuilder> {
	if !config.websocket.enabled {
		return None;
	}
	Some(stack::WsSettingsBuilder {
		hostname: config.websocket_hostname(),
		path: config.websocket.path.clone(),
		obfs_password: config.websocket.obfuscation_password.clone(),
		double_tls: config.websocket.double_tls,
	})
}

fn build_outbound(config: &Config) -> stack::OutboundBuilder {
	let sni = if config.ssl.sni.is_empty() {
		// Fall back to the remote host when it is a domain.
		match config.remote_addr.parse::<IpAddr>() {
			Ok(_) => String::new(),
			Err(_) => config.remote_addr.clone(),
		}
	} else {
		config.ssl.sni.clone()
	};
	stack::OutboundBuilder {
		tls: tls::ConnectorBuilder {
			sni,
			verify: config.ssl.verify,
			verify_hostname: config.ssl.verify_hostname,
			alpns: config.ssl.alpn.clone(),
			cipher: config.ssl.cipher.clone(),
			session_ticket: config.ssl.session_ticket,
			// On the client side `ssl.cert` is the trusted CA file.
			ca_file: if config.ssl.cert.is_empty() {
				None
			} else {
				Some(config.ssl.cert.clone())
			},
		},
		ws: build_ws(config),
	}
}

fn build_inbound(config: &Config) -> stack::InboundBuilder {
	stack::InboundBuilder {
		cert_file: config.ssl.cert.clone(),
		key_file: config.ssl.key.clone(),
		alpns: config.ssl.alpn.clone(),
		ws: build_ws(config),
	}
}

fn build_router(conf: &RouterConfig) -> Result<Option<GeoRouter>, BoxStdErr> {
	if !conf.enabled {
		return Ok(None);
	}
	let mut geo = GeoData::new(conf.geoip.clone(), conf.geosite.clone());
	let mut sets = Vec::new();
	// Fixed evaluation order: bypass, then block, then proxy.
	for (tags, policy) in [
		(&conf.bypass, Policy::Bypass),
		(&conf.block, Policy::Block),
		(&conf.proxy, Policy::Proxy),
	] {
		let mut set = RuleSet::new(policy);
		for tag in tags {
			geo.append_tag(tag, &mut set)?;
		}
		if !set.is_empty() {
			sets.push(set);
		}
	}
	info!("router enabled with {} rule sets", sets.len());
	Ok(Some(GeoRouter::new(
		sets,
		conf.default_policy,
		conf.domain_strategy,
	)))
}

/// The shared accept loop: transient accept errors back off for a
/// second, every connection gets its own task whose lifetime is bounded
/// by the cancellation token.
pub(crate) async fn serve_listener<F, Fut>(
	listener: TcpListener,
	cancel: CancellationToken,
	handler: F,
) -> Result<(), BoxStdErr>
where
	F: Fn(TcpStream, SocketAddr) -> Fut,
	Fut: Future<Output = ()> + Send + 'static,
{
	loop {
		let accepted = tokio::select! {
			() = cancel.cancelled() => return Ok(()),
			res = listener.accept() => res,
		};
		match accepted {
			Ok((stream, peer)) => {
				trace!("accepted connection from {}", peer);
				let task = handler(stream, peer);
				let cancel = cancel.clone();
				tokio::spawn(async move {
					tokio::select! {
						_ = task => {}
						() = cancel.cancelled() => {}
					}
				});
			}
			Err(e) => {
				warn!("accept error ({}), retrying", e);
				tokio::select! {
					() = cancel.cancelled() => return Ok(()),
					() = tokio::time::sleep(Duration::from_secs(1)) => {}
				}
			}
		}
	}
}
