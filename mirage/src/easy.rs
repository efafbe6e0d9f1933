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

// Easy mode: synthesize a whole config from a handful of flags,
// no config file needed.

use crate::BoxStdErr;
use log::{info, warn};
use mirage_lib::Config;

pub struct EasyOptions {
	pub server: bool,
	pub client: bool,
	pub password: String,
	pub local: Option<String>,
	pub remote: Option<String>,
	pub cert: String,
	pub key: String,
}

impl EasyOptions {
	#[must_use]
	pub fn is_active(&self) -> bool {
		self.server || self.client
	}

	/// Produce the config the flags describe.
	///
	/// # Errors
	///
	/// Returns an error for contradictory or incomplete flags.
	pub fn make_config(&self) -> Result<Config, BoxStdErr> {
		if self.server && self.client {
			return Err("--server and --client are mutually exclusive".into());
		}
		if self.password.is_empty() {
			return Err("empty password is not allowed".into());
		}
		info!("easy mode enabled, the config file will NOT be used");

		let json = if self.client {
			let local = self.local.clone().unwrap_or_else(|| {
				warn!("client local addr is unspecified, using 127.0.0.1:1080");
				"127.0.0.1:1080".to_string()
			});
			let remote = self
				.remote
				.as_deref()
				.ok_or("client requires --remote")?;
			let (local_host, local_port) = split_host_port(&local)?;
			let (remote_host, remote_port) = split_host_port(remote)?;
			format!(
				r#"{{
    "run_type": "client",
    "local_addr": "{}",
    "local_port": {},
    "remote_addr": "{}",
    "remote_port": {},
    "password": [
        "{}"
    ]
}}"#,
				local_host, local_port, remote_host, remote_port, self.password
			)
		} else {
			let local = self.local.clone().unwrap_or_else(|| {
				warn!("server local addr is unspecified, using 0.0.0.0:443");
				"0.0.0.0:443".to_string()
			});
			let remote = self.remote.clone().unwrap_or_else(|| {
				warn!("server remote addr is unspecified, using 127.0.0.1:80");
				"127.0.0.1:80".to_string()
			});
			let (local_host, local_port) = split_host_port(&local)?;
			let (remote_host, remote_port) = split_host_port(&remote)?;
			format!(
				r#"{{
    "run_type": "server",
    "local_addr": "{}",
    "local_port": {},
    "remote_addr": "{}",
    "remote_port": {},
    "password": [
        "{}"
    ],
    "ssl": {{
        "verify_hostname": false,
        "cert": "{}",
        "key": "{}"
    }}
}}"#,
				local_host, local_port, remote_host, remote_port, self.password, self.cert,
				self.key
			)
		};

		info!("generated json config:");
		info!("{}", json);
		let config: Config = serde_json::from_str(&json)?;
		Ok(config)
	}
}

fn split_host_port(s: &str) -> Result<(String, u16), BoxStdErr> {
	let (host, port) = s
		.rsplit_once(':')
		.ok_or_else(|| format!("invalid addr format '{}'", s))?;
	if host.is_empty() {
		return Err(format!("invalid addr format '{}'", s).into());
	}
	let port: u16 = port
		.parse()
		.map_err(|e| format!("invalid port in '{}' ({})", s, e))?;
	Ok((host.trim_matches(|c| c == '[' || c == ']').to_string(), port))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_client_easy_config() {
		let opts = EasyOptions {
			server: false,
			client: true,
			password: "hunter2".into(),
			local: None,
			remote: Some("203.0.113.7:443".into()),
			cert: String::new(),
			key: String::new(),
		};
		let config = opts.make_config().unwrap();
		assert_eq!(config.password, vec!["hunter2".to_string()]);
		assert_eq!(config.local_port, 1080);
		assert_eq!(config.remote_port, 443);
		config.validate().unwrap();
	}

	#[test]
	fn test_flags_are_checked() {
		let both = EasyOptions {
			server: true,
			client: true,
			password: "x".into(),
			local: None,
			remote: None,
			cert: String::new(),
			key: String::new(),
		};
		assert!(both.make_config().is_err());

		let empty_password = EasyOptions {
			server: true,
			client: false,
			password: String::new(),
			local: None,
			remote: None,
			cert: String::new(),
			key: String::new(),
		};
		assert!(empty_password.make_config().is_err());
	}

	#[test]
	fn test_split_host_port() {
		assert_eq!(
			split_host_port("127.0.0.1:443").unwrap(),
			("127.0.0.1".to_string(), 443)
		);
		assert!(split_host_port("no-port").is_err());
		assert!(split_host_port(":443").is_err());
	}
}
