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

use crate::prelude::*;
use sha2::{Digest, Sha224};
use std::{
	collections::HashMap,
	sync::atomic::{AtomicBool, AtomicU64, Ordering},
};

/// Lowercase hex of SHA-224 over the password bytes.
pub const KEY_LEN: usize = 56;

pub type Key = [u8; KEY_LEN];

/// Key length for the obfuscation cipher (AES-128).
pub const OBFS_KEY_LEN: usize = 16;

pub fn password_to_key(password: &[u8]) -> Key {
	const TABLE: [u8; 16] = [
		b'0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'8', b'9', b'a', b'b', b'c', b'd', b'e',
		b'f',
	];

	let hash: [u8; 28] = Sha224::digest(password).into();
	let mut result = [0_u8; KEY_LEN];

	for (&b, out) in hash.iter().zip(result.chunks_mut(2)) {
		let high = b >> 4;
		let low = b & 0x0f;
		out[0] = TABLE[high as usize];
		out[1] = TABLE[low as usize];
	}

	result
}

/// SHA-224 of the obfuscation password, truncated to the AES-128 key size.
#[must_use]
pub fn obfs_key(password: &[u8]) -> [u8; OBFS_KEY_LEN] {
	let hash: [u8; 28] = Sha224::digest(password).into();
	let mut key = [0_u8; OBFS_KEY_LEN];
	key.copy_from_slice(&hash[..OBFS_KEY_LEN]);
	key
}

/// Per-account state. Counters are updated by the relay engine;
/// mutation is serialized through the atomics.
#[derive(Default, Debug)]
pub struct Account {
	sent: AtomicU64,
	recv: AtomicU64,
	enabled: AtomicBool,
}

impl Account {
	#[must_use]
	fn new() -> Self {
		Self {
			sent: AtomicU64::new(0),
			recv: AtomicU64::new(0),
			enabled: AtomicBool::new(true),
		}
	}

	#[inline]
	pub fn add_sent(&self, n: u64) {
		self.sent.fetch_add(n, Ordering::Relaxed);
	}

	#[inline]
	pub fn add_recv(&self, n: u64) {
		self.recv.fetch_add(n, Ordering::Relaxed);
	}

	#[inline]
	#[must_use]
	pub fn sent(&self) -> u64 {
		self.sent.load(Ordering::Relaxed)
	}

	#[inline]
	#[must_use]
	pub fn recv(&self) -> u64 {
		self.recv.load(Ordering::Relaxed)
	}

	#[inline]
	#[must_use]
	pub fn is_enabled(&self) -> bool {
		self.enabled.load(Ordering::Relaxed)
	}

	#[inline]
	pub fn set_enabled(&self, value: bool) {
		self.enabled.store(value, Ordering::Relaxed);
	}
}

/// Read-mostly mapping from credential hash to account state.
///
/// Created once per proxy instance; persistence of the counters
/// is up to the caller.
pub struct Authenticator {
	accounts: HashMap<Key, Arc<Account>>,
}

impl Authenticator {
	/// Build from a list of plaintext passwords.
	///
	/// # Errors
	///
	/// Returns an error if `passwords` is empty or contains an empty string.
	pub fn new<'a>(passwords: impl IntoIterator<Item = &'a str>) -> Result<Self, BoxStdErr> {
		let mut accounts = HashMap::new();
		for p in passwords {
			if p.is_empty() {
				return Err("cannot have empty password".into());
			}
			accounts.insert(password_to_key(p.as_bytes()), Arc::new(Account::new()));
		}
		if accounts.is_empty() {
			return Err("must have at least one password".into());
		}
		Ok(Self { accounts })
	}

	/// Look up a credential hash. Disabled accounts are rejected
	/// the same way as unknown ones.
	#[must_use]
	pub fn authenticate(&self, key: &Key) -> Option<Arc<Account>> {
		self.accounts
			.get(key)
			.filter(|acc| acc.is_enabled())
			.cloned()
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.accounts.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.accounts.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_key_shape() {
		let key = password_to_key(b"hello");
		assert_eq!(key.len(), KEY_LEN);
		assert!(key
			.iter()
			.all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(b)));
		// Deterministic, and sensitive to the password.
		assert_eq!(key, password_to_key(b"hello"));
		assert_ne!(key, password_to_key(b"hellp"));
	}

	#[test]
	fn test_obfs_key_is_hash_prefix() {
		// The obfuscation key must be the raw digest prefix,
		// not a prefix of the hex form.
		let raw: [u8; 28] = Sha224::digest(b"obf").into();
		assert_eq!(obfs_key(b"obf"), raw[..OBFS_KEY_LEN]);
	}

	#[test]
	fn test_authenticate() {
		let auth = Authenticator::new(["alpha", "beta"].iter().copied()).unwrap();
		assert_eq!(auth.len(), 2);

		let key = password_to_key(b"alpha");
		let account = auth.authenticate(&key).expect("known password");
		account.add_sent(100);
		assert_eq!(account.sent(), 100);

		let bad = password_to_key(b"gamma");
		assert!(auth.authenticate(&bad).is_none());

		account.set_enabled(false);
		assert!(auth.authenticate(&key).is_none());
		account.set_enabled(true);
		assert!(auth.authenticate(&key).is_some());
	}

	#[test]
	fn test_rejects_bad_password_lists() {
		assert!(Authenticator::new(std::iter::empty()).is_err());
		assert!(Authenticator::new(["ok", ""].iter().copied()).is_err());
	}
}
