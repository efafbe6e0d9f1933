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

use super::{Counter, Switch, STOPPED};
use crate::prelude::*;
use std::io;

/// Copy bytes from `r` to `w`.
pub(super) struct StreamCopier<R, W>
where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	pub r: R,
	pub w: W,
	pub count: Counter,
	pub tag: Arc<str>,
	pub is_reading_stopped: Switch,
	pub buffer_size: usize,
}

impl<R, W> StreamCopier<R, W>
where
	R: AsyncRead + Unpin + Send + 'static,
	W: AsyncWrite + Unpin + Send + 'static,
{
	pub async fn run(mut self) -> io::Result<()> {
		let mut buffer = vec![0_u8; self.buffer_size];
		loop {
			let n = self.r.read(&mut buffer).await?;

			if n == 0 {
				debug!("{} read half reached EOF, shutting down write half", self.tag);
				self.is_reading_stopped.set(STOPPED);
				if let Err(err) = self.w.shutdown().await {
					debug!("{} error when shutting down write half ({})", self.tag, err);
					return Err(err);
				}
				return Ok(());
			}

			let data = &buffer[..n];
			let mut pos: usize = 0;
			while pos < data.len() {
				let n = match self.w.write(&data[pos..]).await {
					Ok(n) => n,
					Err(err) => {
						if self.is_reading_stopped.get() == STOPPED {
							debug!(
								"{} write error ({}) ignored, the other direction is done",
								self.tag, err
							);
							return Ok(());
						}
						debug!("{} write error ({})", self.tag, err);
						return Err(err);
					}
				};
				if n == 0 {
					return Err(io::ErrorKind::WriteZero.into());
				}
				pos += n;
				self.count.add(n as u64);
			}
			self.w.flush().await?;
		}
	}
}
