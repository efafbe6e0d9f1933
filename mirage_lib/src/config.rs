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

use crate::{
	prelude::*,
	router::{Policy, Strategy},
};
use serde::Deserialize;

fn default_true() -> bool {
	true
}

const fn default_buffer_size() -> usize {
	crate::relay::DEFAULT_BUFFER_SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
	Client,
	Server,
	Nat,
	Forward,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SslConfig {
	#[serde(default)]
	pub cert: String,
	#[serde(default)]
	pub key: String,
	#[serde(default)]
	pub sni: String,
	#[serde(default = "default_true")]
	pub verify: bool,
	#[serde(default = "default_true")]
	pub verify_hostname: bool,
	#[serde(default)]
	pub session_ticket: bool,
	#[serde(default)]
	pub cipher: String,
	#[serde(default)]
	pub alpn: Vec<String>,
}

impl Default for SslConfig {
	fn default() -> Self {
		Self {
			cert: String::new(),
			key: String::new(),
			sni: String::new(),
			verify: true,
			verify_hostname: true,
			session_ticket: false,
			cipher: String::new(),
			alpn: Vec::new(),
		}
	}
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebsocketConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub path: String,
	#[serde(default)]
	pub hostname: String,
	#[serde(default)]
	pub obfuscation_password: String,
	#[serde(default)]
	pub double_tls: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouterConfig {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default)]
	pub bypass: Vec<String>,
	#[serde(default)]
	pub proxy: Vec<String>,
	#[serde(default)]
	pub block: Vec<String>,
	#[serde(default)]
	pub domain_strategy: Strategy,
	#[serde(default)]
	pub default_policy: Policy,
	#[serde(default)]
	pub geoip: String,
	#[serde(default)]
	pub geosite: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub run_type: RunType,
	pub local_addr: String,
	pub local_port: u16,
	#[serde(default)]
	pub remote_addr: String,
	#[serde(default)]
	pub remote_port: u16,
	/// Fixed destination for `forward` mode.
	#[serde(default)]
	pub target_addr: String,
	#[serde(default)]
	pub target_port: u16,
	#[serde(default)]
	pub password: Vec<String>,
	/// Relay copy buffer in bytes.
	#[serde(default = "default_buffer_size")]
	pub buffer_size: usize,
	#[serde(default)]
	pub ssl: SslConfig,
	#[serde(default)]
	pub websocket: WebsocketConfig,
	#[serde(default)]
	pub router: RouterConfig,
}

impl Config {
	/// Local accept endpoint.
	///
	/// # Errors
	///
	/// Returns an error if `local_addr` is not an IP address.
	pub fn local_address(&self) -> Result<SocketAddr, BoxStdErr> {
		let ip: IpAddr = self
			.local_addr
			.parse()
			.map_err(|e| format!("invalid local_addr '{}' ({})", self.local_addr, e))?;
		Ok(SocketAddr::new(ip, self.local_port))
	}

	/// Remote endpoint: the server for a client, the decoy for a server.
	///
	/// # Errors
	///
	/// Returns an error if `remote_addr` is not an IP or domain name.
	pub fn remote_address(&self) -> Result<Address, BoxStdErr> {
		let dest: Destination = self
			.remote_addr
			.parse()
			.map_err(|e| format!("invalid remote_addr '{}' ({})", self.remote_addr, e))?;
		Ok(Address::new(dest, self.remote_port))
	}

	/// Fixed target for `forward` mode.
	///
	/// # Errors
	///
	/// Returns an error if `target_addr` is not an IP or domain name.
	pub fn target_address(&self) -> Result<Address, BoxStdErr> {
		let dest: Destination = self
			.target_addr
			.parse()
			.map_err(|e| format!("invalid target_addr '{}' ({})", self.target_addr, e))?;
		Ok(Address::new(dest, self.target_port))
	}

	/// The hostname used for the WebSocket URL and origin.
	#[must_use]
	pub fn websocket_hostname(&self) -> String {
		if !self.websocket.hostname.is_empty() {
			return self.websocket.hostname.clone();
		}
		if !self.ssl.sni.is_empty() {
			return self.ssl.sni.clone();
		}
		self.remote_addr.clone()
	}

	/// Sanity checks shared by all run types; the per-run-type builders
	/// do their own on top.
	///
	/// # Errors
	///
	/// Returns a description of the first violated constraint.
	pub fn validate(&self) -> Result<(), BoxStdErr> {
		match self.run_type {
			RunType::Server => {
				if self.password.is_empty() {
					return Err("server requires at least one password".into());
				}
				if self.ssl.cert.is_empty() || self.ssl.key.is_empty() {
					return Err("server requires ssl.cert and ssl.key".into());
				}
				if self.remote_addr.is_empty() {
					return Err("server requires remote_addr as the decoy upstream".into());
				}
			}
			RunType::Client | RunType::Nat => {
				if self.password.is_empty() {
					return Err("client requires at least one password".into());
				}
				if self.remote_addr.is_empty() {
					return Err("client requires remote_addr".into());
				}
			}
			RunType::Forward => {
				if self.password.is_empty() {
					return Err("forward requires at least one password".into());
				}
				if self.remote_addr.is_empty() {
					return Err("forward requires remote_addr".into());
				}
				if self.target_addr.is_empty() {
					return Err("forward requires target_addr".into());
				}
			}
		}
		if self.websocket.enabled && self.websocket_hostname().is_empty() {
			return Err("websocket requires a hostname (websocket.hostname or ssl.sni)".into());
		}
		if self.websocket.double_tls && !self.websocket.enabled {
			return Err("double_tls requires websocket.enabled".into());
		}
		if !self.websocket.enabled && !self.websocket.obfuscation_password.is_empty() {
			return Err("obfuscation requires websocket.enabled".into());
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_client_config() {
		let conf: Config = serde_json::from_str(
			r#"{
				"run_type": "client",
				"local_addr": "127.0.0.1",
				"local_port": 1080,
				"remote_addr": "example.com",
				"remote_port": 443,
				"password": ["hello"],
				"ssl": {
					"sni": "example.com",
					"verify": true
				},
				"websocket": {
					"enabled": true,
					"path": "/tunnel",
					"hostname": "example.com",
					"obfuscation_password": "obf",
					"double_tls": true
				},
				"router": {
					"enabled": true,
					"bypass": ["cn", "private"],
					"proxy": ["*"],
					"domain_strategy": "ip_if_non_match",
					"default_policy": "proxy",
					"geoip": "geoip.dat",
					"geosite": "geosite.dat"
				}
			}"#,
		)
		.unwrap();

		assert!(matches!(conf.run_type, RunType::Client));
		assert_eq!(
			conf.local_address().unwrap(),
			"127.0.0.1:1080".parse::<SocketAddr>().unwrap()
		);
		assert_eq!(
			conf.remote_address().unwrap(),
			"example.com:443".parse().unwrap()
		);
		assert_eq!(conf.buffer_size, crate::relay::DEFAULT_BUFFER_SIZE);
		assert!(conf.websocket.double_tls);
		assert_eq!(conf.router.domain_strategy, Strategy::IpIfNonMatch);
		assert_eq!(conf.router.default_policy, Policy::Proxy);
		conf.validate().unwrap();
	}

	#[test]
	fn test_validate_rejects_bad_combinations() {
		let base = r#"{
			"run_type": "client",
			"local_addr": "127.0.0.1",
			"local_port": 1080,
			"remote_addr": "example.com",
			"remote_port": 443,
			"password": ["hello"]
		}"#;
		let conf: Config = serde_json::from_str(base).unwrap();
		conf.validate().unwrap();

		let mut no_password = conf.clone();
		no_password.password.clear();
		assert!(no_password.validate().is_err());

		let mut obfs_without_ws = conf.clone();
		obfs_without_ws.websocket.obfuscation_password = "x".into();
		assert!(obfs_without_ws.validate().is_err());

		let mut server = conf;
		server.run_type = RunType::Server;
		assert!(server.validate().is_err(), "server without cert/key");
	}

	#[test]
	fn test_websocket_hostname_fallback() {
		let conf: Config = serde_json::from_str(
			r#"{
				"run_type": "client",
				"local_addr": "127.0.0.1",
				"local_port": 1080,
				"remote_addr": "203.0.113.7",
				"remote_port": 443,
				"password": ["hello"],
				"ssl": { "sni": "camouflage.example" },
				"websocket": { "enabled": true, "path": "/ws" }
			}"#,
		)
		.unwrap();
		assert_eq!(conf.websocket_hostname(), "camouflage.example");
	}
}
