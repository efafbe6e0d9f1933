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

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::default_trait_access)]

mod easy;
mod logging;

use logging::{Log, LogOutput};
use mirage_lib::{Config, Proxy};
use std::{io, str::FromStr, sync::Arc};
use structopt::StructOpt;
use tokio::runtime::Runtime;

type BoxStdErr = Box<dyn std::error::Error + Send + Sync>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy)]
enum ConfigFormat {
	Json,
	Toml,
}

impl Default for ConfigFormat {
	fn default() -> Self {
		ConfigFormat::Json
	}
}

impl FromStr for ConfigFormat {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("json") {
			Ok(ConfigFormat::Json)
		} else if s.eq_ignore_ascii_case("toml") {
			Ok(ConfigFormat::Toml)
		} else {
			Err(format!("unknown config format '{}'", s))
		}
	}
}

#[derive(StructOpt)]
#[structopt(name = "mirage")]
pub struct AppOptions {
	/// Read config from file.
	#[structopt(short, long, name = "CONF_PATH")]
	config: Option<String>,

	/// Set the format of the config file. Can be 'json' (default) or 'toml'.
	#[structopt(short, long, name = "CONF_FORMAT")]
	format: Option<ConfigFormat>,

	/// Set the log level. Must be one of ["trace", "debug", "info", "warn" (default), "error"]
	#[structopt(long, name = "LOG_LEVEL")]
	log: Option<log::LevelFilter>,

	/// Set the output for log. Can be a file path, '@stdout', '@stderr' or '@none'.
	#[structopt(long, name = "LOG_FILE")]
	log_out: Option<String>,

	/// Print version.
	#[structopt(long)]
	version: bool,

	/// Easy mode: run a server with no config file.
	#[structopt(long)]
	server: bool,

	/// Easy mode: run a client with no config file.
	#[structopt(long)]
	client: bool,

	/// Easy mode: password for authentication.
	#[structopt(long, default_value = "")]
	password: String,

	/// Easy mode: local address, e.g. 127.0.0.1:1080.
	#[structopt(long, name = "LOCAL_ADDR")]
	local: Option<String>,

	/// Easy mode: remote address, e.g. 127.0.0.1:443.
	#[structopt(long, name = "REMOTE_ADDR")]
	remote: Option<String>,

	/// Easy mode: certificate of the server.
	#[structopt(long, default_value = "server.crt")]
	cert: String,

	/// Easy mode: key of the server.
	#[structopt(long, default_value = "server.key")]
	key: String,
}

#[derive(Debug, thiserror::Error)]
enum Error {
	#[error("[IO error] {0}")]
	Io(#[from] io::Error),
	#[error("[input] {0}")]
	Input(BoxStdErr),
	#[error("[config] {0}")]
	Config(BoxStdErr),
	#[error("[runtime] {0}")]
	Runtime(BoxStdErr),
}

impl Error {
	#[inline]
	fn input(s: impl Into<BoxStdErr>) -> Self {
		Self::Input(s.into())
	}

	#[inline]
	fn config(s: impl Into<BoxStdErr>) -> Self {
		Self::Config(s.into())
	}
}

fn load_config(options: &AppOptions) -> Result<Config, Error> {
	let easy = easy::EasyOptions {
		server: options.server,
		client: options.client,
		password: options.password.clone(),
		local: options.local.clone(),
		remote: options.remote.clone(),
		cert: options.cert.clone(),
		key: options.key.clone(),
	};
	if easy.is_active() {
		return easy.make_config().map_err(Error::input);
	}

	let path = options
		.config
		.as_deref()
		.ok_or_else(|| Error::input("missing --config (or --server/--client for easy mode)"))?;
	let format = options.format.unwrap_or_else(|| {
		let mut format = ConfigFormat::default();
		if std::path::Path::new(path)
			.extension()
			.map_or(false, |ext| ext.eq_ignore_ascii_case("toml"))
		{
			format = ConfigFormat::Toml;
		}
		format
	});
	let conf_str = std::fs::read_to_string(path).map_err(Error::config)?;
	match format {
		ConfigFormat::Json => serde_json::from_str(&conf_str).map_err(Error::config),
		ConfigFormat::Toml => toml::from_str(&conf_str).map_err(Error::config),
	}
}

fn serve(options: &AppOptions) -> Result<(), Error> {
	let log = Log {
		level: options.log.unwrap_or(log::LevelFilter::Warn),
		output: options
			.log_out
			.as_deref()
			.map_or(Some(LogOutput::Stdout), LogOutput::parse),
	};
	log.init_logger().map_err(Error::Config)?;

	let config = load_config(options)?;
	let proxy = Arc::new(Proxy::new(&config).map_err(Error::Config)?);

	let rt = Runtime::new()?;
	rt.block_on(async {
		let closer = proxy.clone();
		tokio::spawn(async move {
			if tokio::signal::ctrl_c().await.is_ok() {
				closer.close();
			}
		});
		proxy.run().await.map_err(Error::Runtime)
	})
}

fn main() -> Result<(), BoxStdErr> {
	let options = AppOptions::from_args();
	if options.version {
		println!("mirage {}", VERSION);
		return Ok(());
	}
	serve(&options)?;
	Ok(())
}
