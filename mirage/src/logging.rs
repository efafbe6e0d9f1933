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

use crate::BoxStdErr;
use fern::colors::{Color, ColoredLevelConfig};
use log::LevelFilter;

/// Where log lines go.
pub enum LogOutput {
	Stdout,
	Stderr,
	File(String),
}

impl LogOutput {
	/// Map a command line value to an output. `@none` disables logging
	/// entirely; an empty string means stdout; anything not starting
	/// with `@` is a file path.
	#[must_use]
	pub fn parse(value: &str) -> Option<Self> {
		match value {
			"@none" => None,
			"" | "@stdout" => Some(LogOutput::Stdout),
			"@stderr" => Some(LogOutput::Stderr),
			path => Some(LogOutput::File(path.to_string())),
		}
	}
}

pub struct Log {
	pub level: LevelFilter,
	pub output: Option<LogOutput>,
}

impl Log {
	/// Install the global logger.
	///
	/// # Errors
	///
	/// Returns an error if the log file cannot be opened, or if a
	/// logger has already been installed.
	pub fn init_logger(&self) -> Result<(), BoxStdErr> {
		let output = match &self.output {
			Some(output) => output,
			None => return Ok(()),
		};
		let base = fern::Dispatch::new().level(self.level);
		// Level colors only make sense on a terminal; files get the
		// plain level name.
		let base = if let LogOutput::File(_) = output {
			base.format(|out, message, record| {
				out.finish(format_args!(
					"[{} {} {}] {}",
					timestamp(),
					record.level(),
					record.target(),
					message
				));
			})
		} else {
			let colors = ColoredLevelConfig::new()
				.info(Color::Blue)
				.trace(Color::Magenta);
			base.format(move |out, message, record| {
				out.finish(format_args!(
					"[{} {} {}] {}",
					timestamp(),
					colors.color(record.level()),
					record.target(),
					message
				));
			})
		};
		match output {
			LogOutput::Stdout => base.chain(std::io::stdout()),
			LogOutput::Stderr => base.chain(std::io::stderr()),
			LogOutput::File(path) => base.chain(fern::log_file(path)?),
		}
		.apply()?;
		Ok(())
	}
}

fn timestamp() -> String {
	let now = time::OffsetDateTime::now_utc();
	format!(
		"{:04}-{:02}-{:02}T{:02}:{:02}:{:02}Z",
		now.year(),
		u8::from(now.month()),
		now.day(),
		now.hour(),
		now.minute(),
		now.second()
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_output() {
		assert!(LogOutput::parse("@none").is_none());
		assert!(matches!(LogOutput::parse(""), Some(LogOutput::Stdout)));
		assert!(matches!(
			LogOutput::parse("@stdout"),
			Some(LogOutput::Stdout)
		));
		assert!(matches!(
			LogOutput::parse("@stderr"),
			Some(LogOutput::Stderr)
		));
		assert!(matches!(
			LogOutput::parse("proxy.log"),
			Some(LogOutput::File(_))
		));
	}

	#[test]
	fn test_timestamp_shape() {
		let ts = timestamp();
		assert_eq!(ts.len(), 20);
		assert!(ts.ends_with('Z'));
		assert_eq!(ts.as_bytes()[4], b'-');
		assert_eq!(ts.as_bytes()[10], b'T');
	}
}
