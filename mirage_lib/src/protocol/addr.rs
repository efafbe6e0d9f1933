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
use num_enum::{IntoPrimitive, TryFromPrimitive};
use smol_str::SmolStr;
use std::{
	fmt::{self, Display},
	io, string,
};

const EMPTY_STRING: &str = "empty string";

// SOCKS5 address type, shared by the tunnel wire format.
// See more at <https://tools.ietf.org/html/rfc1928#section-5>
#[derive(Debug, Clone, Copy, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum AddrType {
	Ipv4 = 1_u8,
	Name = 3_u8,
	Ipv6 = 4_u8,
}

impl AddrType {
	#[inline]
	#[must_use]
	pub const fn val(self) -> u8 {
		self as u8
	}
}

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
	#[error("string is not utf8 ({0})")]
	StringNotUtf8(string::FromUtf8Error),
	#[error("str is not utf8 ({0})")]
	StrNotUtf8(std::str::Utf8Error),
	#[error("unknown address type {0}")]
	UnknownAddressType(u8),
	#[error("invalid domain ({0})")]
	InvalidDomain(BoxStdErr),
	#[error("invalid port ({0})")]
	InvalidPort(BoxStdErr),
	#[error("invalid address ({0})")]
	InvalidAddress(BoxStdErr),
	#[error("IO error ({0})")]
	Io(#[from] io::Error),
}

impl ReadError {
	#[must_use]
	pub fn into_io_err(self) -> io::Error {
		if let Self::Io(e) = self {
			e
		} else {
			io::Error::new(io::ErrorKind::InvalidData, self)
		}
	}
}

// -------------------------------------------------------
//                      DomainName
// -------------------------------------------------------

/// A domain name that is guaranteed to be non-empty,
/// at most 255 bytes long and made of visible ASCII.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainName(SmolStr);

impl DomainName {
	#[inline]
	#[must_use]
	pub fn as_str(&self) -> &str {
		self.0.as_str()
	}

	#[inline]
	#[must_use]
	pub fn as_bytes(&self) -> &[u8] {
		self.0.as_bytes()
	}

	#[inline]
	#[must_use]
	#[allow(clippy::cast_possible_truncation)]
	pub fn len(&self) -> u8 {
		// Length is checked on construction.
		self.0.len() as u8
	}

	#[inline]
	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl FromStr for DomainName {
	type Err = ReadError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Err(ReadError::InvalidDomain(EMPTY_STRING.into()));
		}
		if s.len() > 255 {
			return Err(ReadError::InvalidDomain(
				format!("domain too long ({} bytes)", s.len()).into(),
			));
		}
		if !s
			.bytes()
			.all(|b| b.is_ascii_graphic() && b != b'/' && b != b'?' && b != b'#')
		{
			return Err(ReadError::InvalidDomain(
				format!("domain '{}' contains invalid characters", s).into(),
			));
		}
		Ok(Self(s.into()))
	}
}

impl Display for DomainName {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		self.0.fmt(f)
	}
}

// -------------------------------------------------------
//                      Destination
// -------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Destination {
	Name(DomainName),
	Ip(IpAddr),
}

impl Destination {
	#[inline]
	#[must_use]
	pub fn new_ip(ip: impl Into<IpAddr>) -> Self {
		Self::Ip(ip.into())
	}

	/// Create a new `Destination` from [`str`].
	///
	/// # Errors
	///
	/// Return a [`ReadError`] if `value` is not a valid domain name.
	#[inline]
	pub fn new_domain(value: impl AsRef<str>) -> Result<Self, ReadError> {
		DomainName::from_str(value.as_ref()).map(Destination::Name)
	}

	#[inline]
	#[must_use]
	pub fn atyp(&self) -> AddrType {
		match self {
			Destination::Name(_) => AddrType::Name,
			Destination::Ip(IpAddr::V4(_)) => AddrType::Ipv4,
			Destination::Ip(IpAddr::V6(_)) => AddrType::Ipv6,
		}
	}

	/// Creates a [`Destination`] from address type `atyp` and byte stream `r`.
	///
	/// The format for each address type:
	/// - [`AddrType::Ipv4`]: | 4 bytes |
	/// - [`AddrType::Ipv6`]: | 16 bytes |
	/// - [`AddrType::Name`]: | n, 1 byte | n bytes |
	///
	/// # Errors
	///
	/// [`ReadError`] will be returned if error occurred.
	pub async fn read_from_atyp(
		r: &mut (impl AsyncRead + Unpin),
		atyp: AddrType,
	) -> Result<Self, ReadError> {
		Ok(match atyp {
			AddrType::Ipv4 => Ipv4Addr::from(r.read_u32().await?).into(),
			AddrType::Ipv6 => Ipv6Addr::from(r.read_u128().await?).into(),
			AddrType::Name => {
				let len = r.read_u8().await?;
				if len == 0 {
					return Err(ReadError::InvalidDomain(EMPTY_STRING.into()));
				}
				// Domain length is a u8, which will never be larger than 256.
				let mut buffer = [0_u8; 256];
				let buffer = &mut buffer[..len as usize];
				r.read_exact(buffer).await?;
				let name = std::str::from_utf8(buffer).map_err(ReadError::StrNotUtf8)?;
				DomainName::from_str(name)?.into()
			}
		})
	}

	pub fn write_to_no_atyp(&self, buf: &mut impl BufMut) {
		match self {
			Destination::Name(name) => {
				buf.put_u8(name.len());
				buf.put_slice(name.as_bytes());
			}
			Destination::Ip(ip) => match ip {
				IpAddr::V4(ipv4) => {
					buf.put_slice(&ipv4.octets()[..]);
				}
				IpAddr::V6(ipv6) => {
					buf.put_slice(&ipv6.octets()[..]);
				}
			},
		}
	}

	/// Get the minimal length of buffer needed to store the serialized data,
	/// ATYP included.
	#[inline]
	#[must_use]
	pub fn serialized_len_atyp(&self) -> usize {
		1 + match self {
			Destination::Ip(ip) => match ip {
				IpAddr::V4(_) => 4,
				IpAddr::V6(_) => 16,
			},
			Destination::Name(name) => 1 + name.len() as usize,
		}
	}
}

impl FromStr for Destination {
	type Err = ReadError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Err(ReadError::InvalidDomain(EMPTY_STRING.into()));
		}
		if let Ok(ip) = IpAddr::from_str(s) {
			return Ok(Self::Ip(ip));
		}
		DomainName::from_str(s).map(Self::Name)
	}
}

impl From<DomainName> for Destination {
	#[inline]
	fn from(domain: DomainName) -> Self {
		Self::Name(domain)
	}
}

impl From<Ipv4Addr> for Destination {
	#[inline]
	fn from(ip: Ipv4Addr) -> Self {
		Self::Ip(ip.into())
	}
}

impl From<Ipv6Addr> for Destination {
	#[inline]
	fn from(ip: Ipv6Addr) -> Self {
		Self::Ip(ip.into())
	}
}

impl From<IpAddr> for Destination {
	#[inline]
	fn from(ip: IpAddr) -> Self {
		Self::Ip(ip)
	}
}

impl Display for Destination {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Ip(ip) => ip.fmt(f),
			Self::Name(name) => name.fmt(f),
		}
	}
}

// -------------------------------------------------------
//                        Address
// -------------------------------------------------------

/// A destination plus a port, serialized as
///
/// ```not_rust
/// +------+----------------+----------------+
/// | ATYP |  Destination   |     Port       |
/// +------+----------------+----------------+
/// | u8   | various bytes  | u16 big endian |
/// +------+----------------+----------------+
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
	pub dest: Destination,
	pub port: u16,
}

impl Address {
	#[inline]
	#[must_use]
	pub fn new(dest: Destination, port: u16) -> Self {
		Self { dest, port }
	}

	/// Creates an [`Address`] from byte stream `r`.
	///
	/// 1 byte is read to determine the address type,
	/// then a [`Destination`], then 2 bytes of port.
	///
	/// # Errors
	///
	/// If there is any error, a [`ReadError`] will be returned.
	pub async fn read_from<R>(r: &mut R) -> Result<Self, ReadError>
	where
		R: AsyncRead + Unpin,
	{
		let atyp_num = r.read_u8().await?;
		let atyp =
			AddrType::try_from(atyp_num).map_err(|_| ReadError::UnknownAddressType(atyp_num))?;
		let dest = Destination::read_from_atyp(r, atyp).await?;
		let port = r.read_u16().await?;
		Ok(Self::new(dest, port))
	}

	/// Return the number of bytes it will take to store the serialized address.
	#[inline]
	#[must_use]
	pub fn serialized_len_atyp(&self) -> usize {
		self.dest.serialized_len_atyp() + 2
	}

	/// Write the address into `buf` in SOCKS5 address format.
	#[inline]
	pub fn write_to<B: BufMut>(&self, buf: &mut B) {
		buf.put_u8(self.dest.atyp().val());
		self.dest.write_to_no_atyp(buf);
		buf.put_u16(self.port);
	}

	/// Parse a string like `domain:port`, `ip:port` or (when `default_port`
	/// is given) just `domain`.
	///
	/// # Errors
	///
	/// Returns a [`ReadError`] if the string is invalid, or if
	/// `default_port` is [`None`] and there is no port in `s`.
	pub fn parse_str(s: &str, default_port: Option<u16>) -> Result<Self, ReadError> {
		if let Ok(addr) = s.parse::<SocketAddr>() {
			return Ok(addr.into());
		}
		if s.is_empty() {
			return Err(ReadError::InvalidAddress(EMPTY_STRING.into()));
		}
		let mut parts = s.split_terminator(':');

		let dest = {
			let host_str = parts
				.next()
				.ok_or_else(|| ReadError::InvalidAddress("missing domain/IP".into()))?;
			Destination::from_str(host_str)?
		};

		let port = if let Some(port_str) = parts.next() {
			if port_str.is_empty() {
				return Err(ReadError::InvalidPort(EMPTY_STRING.into()));
			}
			port_str
				.parse::<u16>()
				.map_err(|err| ReadError::InvalidPort(err.into()))?
		} else {
			default_port.ok_or_else(|| ReadError::InvalidAddress("missing port".into()))?
		};

		Ok(Self { dest, port })
	}

	/// Resolve to one or more socket addresses without touching the wire
	/// format. A domain destination goes through the system resolver.
	///
	/// # Errors
	///
	/// Returns an [`io::Error`] if resolution fails or yields nothing.
	pub async fn resolve(&self) -> io::Result<SocketAddr> {
		match &self.dest {
			Destination::Ip(ip) => Ok(SocketAddr::new(*ip, self.port)),
			Destination::Name(name) => {
				tokio::net::lookup_host((name.as_str(), self.port))
					.await?
					.next()
					.ok_or_else(|| {
						io::Error::new(
							io::ErrorKind::NotFound,
							format!("domain '{}' resolved to nothing", name),
						)
					})
			}
		}
	}
}

impl FromStr for Address {
	type Err = ReadError;
	#[inline]
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse_str(s, None)
	}
}

impl From<SocketAddr> for Address {
	#[inline]
	fn from(addr: SocketAddr) -> Self {
		Self::new(addr.ip().into(), addr.port())
	}
}

impl Display for Address {
	#[inline]
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if let Destination::Ip(IpAddr::V6(ip)) = &self.dest {
			write!(f, "[{}]:{}", ip, self.port)
		} else {
			write!(f, "{}:{}", self.dest, self.port)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn roundtrip(addr: &Address) {
		let mut buf = Vec::new();
		addr.write_to(&mut buf);
		assert_eq!(buf.len(), addr.serialized_len_atyp());
		let rt = tokio::runtime::Runtime::new().unwrap();
		let result = rt
			.block_on(Address::read_from(&mut buf.as_slice()))
			.unwrap();
		assert_eq!(&result, addr);
	}

	#[test]
	fn test_address_roundtrip() {
		roundtrip(&Address::new(Ipv4Addr::new(127, 0, 0, 1).into(), 1080));
		roundtrip(&Address::new(
			Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1).into(),
			443,
		));
		roundtrip(&Address::new(
			Destination::new_domain("example.com").unwrap(),
			65535,
		));
	}

	#[test]
	fn test_wire_layout() {
		let addr = Address::new(Destination::new_domain("example.com").unwrap(), 443);
		let mut buf = Vec::new();
		addr.write_to(&mut buf);
		let mut expected = vec![0x03_u8, 0x0b];
		expected.extend_from_slice(b"example.com");
		expected.extend_from_slice(&[0x01, 0xbb]);
		assert_eq!(buf, expected);
	}

	#[test]
	fn test_parse_str() {
		assert_eq!(
			Address::parse_str("127.0.0.1:80", None).unwrap(),
			Address::new(Ipv4Addr::new(127, 0, 0, 1).into(), 80)
		);
		assert_eq!(
			Address::parse_str("example.com:443", None).unwrap(),
			Address::new(Destination::new_domain("example.com").unwrap(), 443)
		);
		assert_eq!(
			Address::parse_str("example.com", Some(443)).unwrap(),
			Address::new(Destination::new_domain("example.com").unwrap(), 443)
		);
		assert!(Address::parse_str("example.com", None).is_err());
		assert!(Address::parse_str("", Some(1)).is_err());
		assert!(Address::parse_str("example.com:badport", None).is_err());
	}

	#[test]
	fn test_read_rejects_unknown_atyp() {
		let buf = [0x02_u8, 0, 0, 0, 0, 0, 80];
		let rt = tokio::runtime::Runtime::new().unwrap();
		let err = rt
			.block_on(Address::read_from(&mut buf.as_ref()))
			.unwrap_err();
		assert!(matches!(err, ReadError::UnknownAddressType(2)));
	}

	#[test]
	fn test_domain_name_limits() {
		assert!(DomainName::from_str("").is_err());
		assert!(DomainName::from_str("with space.com").is_err());
		let long = "a".repeat(256);
		assert!(DomainName::from_str(&long).is_err());
		assert!(DomainName::from_str("example.com").is_ok());
	}
}
