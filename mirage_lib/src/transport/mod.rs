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

pub mod obfs;
pub mod rewind;
pub mod stack;
pub mod tls;
pub mod ws;

pub use rewind::RewindStream;
pub use stack::{Inbound, InboundBuilder, Outbound, OutboundBuilder};

use rand::Rng;
use std::{future::Future, io, time::Duration};

const HANDSHAKE_TIMEOUT_LO: Duration = Duration::from_secs(4);
const HANDSHAKE_TIMEOUT_HI: Duration = Duration::from_secs(8);

/// Per-connection handshake deadline, drawn uniformly so the timeout
/// itself carries no fingerprint.
#[must_use]
pub fn handshake_deadline() -> Duration {
	rand::thread_rng().gen_range(HANDSHAKE_TIMEOUT_LO..HANDSHAKE_TIMEOUT_HI)
}

/// Bound a handshake step that reads from the peer by a randomized deadline.
///
/// # Errors
///
/// Returns [`io::ErrorKind::TimedOut`] when the deadline passes, or the
/// inner error.
pub async fn with_deadline<T, F>(fut: F) -> io::Result<T>
where
	F: Future<Output = io::Result<T>>,
{
	match tokio::time::timeout(handshake_deadline(), fut).await {
		Ok(res) => res,
		Err(_) => Err(io::Error::new(
			io::ErrorKind::TimedOut,
			"handshake deadline exceeded",
		)),
	}
}
