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
use std::{
	fmt::{self, Display, Formatter},
	net::AddrParseError,
	num::ParseIntError,
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
	#[error("cidr '{0}' is invalid")]
	Format(String),
	#[error("ip in cidr '{0}' is invalid ({1})")]
	Ip(String, AddrParseError),
	#[error("len in cidr '{0}' is invalid ({1})")]
	Length(String, ParseIntError),
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct Cidr4 {
	pub ip: Ipv4Addr,
	pub mask: u32,
}

impl Cidr4 {
	#[must_use]
	pub const fn from_ip(ip: Ipv4Addr, length: u8) -> Self {
		debug_assert!(length <= 32);
		let mask = if length == 0 {
			0
		} else {
			(!0_u32) << (32 - length)
		};
		Cidr4 { ip, mask }
	}

	#[must_use]
	pub fn new(ip: impl Into<Ipv4Addr>, length: u8) -> Self {
		Self::from_ip(ip.into(), length)
	}

	#[must_use]
	pub fn contains(&self, ip: Ipv4Addr) -> bool {
		u32::from(ip) & self.mask == u32::from(self.ip) & self.mask
	}
}

impl Display for Cidr4 {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.ip, self.mask.count_ones())
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct Cidr6 {
	pub ip: Ipv6Addr,
	pub mask: u128,
}

impl Cidr6 {
	#[must_use]
	pub const fn from_ip(ip: Ipv6Addr, length: u8) -> Self {
		debug_assert!(length <= 128);
		let mask = if length == 0 {
			0
		} else {
			(!0_u128) << (128 - length)
		};
		Cidr6 { ip, mask }
	}

	pub fn new(ip: impl Into<Ipv6Addr>, length: u8) -> Self {
		Self::from_ip(ip.into(), length)
	}

	#[must_use]
	pub fn contains(&self, ip: &Ipv6Addr) -> bool {
		u128::from(*ip) & self.mask == u128::from(self.ip) & self.mask
	}
}

impl Display for Cidr6 {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.ip, self.mask.count_ones())
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
#[allow(clippy::module_name_repetitions)]
pub enum Cidr {
	V4(Cidr4),
	V6(Cidr6),
}

impl Display for Cidr {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::V4(cidr) => cidr.fmt(f),
			Self::V6(cidr) => cidr.fmt(f),
		}
	}
}

impl Cidr {
	/// Returns true if the ip address is contained in the network.
	/// An IPv4 rule never matches an IPv6 address and vice versa.
	#[must_use]
	pub fn match_ip(&self, ip: &IpAddr) -> bool {
		match self {
			Self::V4(cidr) => match ip {
				IpAddr::V4(ip) => cidr.contains(*ip),
				IpAddr::V6(_) => false,
			},
			Self::V6(cidr) => match ip {
				IpAddr::V6(ip) => cidr.contains(ip),
				IpAddr::V4(_) => false,
			},
		}
	}

	#[inline]
	#[must_use]
	pub fn from_ip(ip: IpAddr, len: u8) -> Self {
		match ip {
			IpAddr::V4(ip) => Cidr::from_ipv4(ip, len),
			IpAddr::V6(ip) => Cidr::from_ipv6(ip, len),
		}
	}

	#[inline]
	#[must_use]
	pub fn from_ipv4(ip: Ipv4Addr, len: u8) -> Self {
		Cidr::V4(Cidr4::from_ip(ip, len))
	}

	#[inline]
	#[must_use]
	pub fn from_ipv6(ip: Ipv6Addr, len: u8) -> Self {
		Cidr::V6(Cidr6::from_ip(ip, len))
	}

	/// Private networks plus local loop, the usual bypass set.
	///
	/// Read more at <https://en.wikipedia.org/wiki/Reserved_IP_addresses>
	#[must_use]
	pub fn private_networks() -> [Self; 7] {
		[
			Cidr4::new([127, 0, 0, 0], 8).into(),
			Cidr4::new([10, 0, 0, 0], 8).into(),
			Cidr4::new([100, 64, 0, 0], 10).into(),
			Cidr4::new([172, 16, 0, 0], 12).into(),
			Cidr4::new([192, 168, 0, 0], 16).into(),
			Cidr6::new([0, 0, 0, 0, 0, 0, 0, 1], 128).into(),
			Cidr6::new([0xfe80, 0, 0, 0, 0, 0, 0, 0], 10).into(),
		]
	}
}

impl FromStr for Cidr {
	type Err = ParseError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let sep_pos = s
			.find('/')
			.ok_or_else(|| ParseError::Format(s.to_owned()))?;
		let (ip_str, len_str) = s.split_at(sep_pos);
		if len_str.len() <= 1 {
			return Err(ParseError::Format(s.to_owned()));
		}
		let len_str = &len_str[1..];
		let ip = IpAddr::from_str(ip_str).map_err(|err| ParseError::Ip(s.to_owned(), err))?;
		let length = u8::from_str(len_str).map_err(|err| ParseError::Length(s.to_owned(), err))?;
		let max = match ip {
			IpAddr::V4(_) => 32,
			IpAddr::V6(_) => 128,
		};
		if length > max {
			return Err(ParseError::Format(s.to_owned()));
		}
		Ok(Self::from_ip(ip, length))
	}
}

impl From<Cidr4> for Cidr {
	fn from(cidr: Cidr4) -> Self {
		Self::V4(cidr)
	}
}

impl From<Cidr6> for Cidr {
	fn from(cidr: Cidr6) -> Self {
		Self::V6(cidr)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_cidr() {
		let data = "192.168.0.2/24";
		let cidr = Cidr::from_str(data).unwrap();
		match &cidr {
			Cidr::V4(cidr) => {
				assert_eq!(cidr.ip, Ipv4Addr::from_str("192.168.0.2").unwrap());
				assert_eq!(cidr.mask, 0xffff_ff00);
			}
			Cidr::V6(_) => {
				panic!("{} is not ipv4 cidr!", data);
			}
		}
		assert!(!cidr.match_ip(&IpAddr::from_str("192.168.1.0").unwrap()));
		assert!(cidr.match_ip(&IpAddr::from_str("192.168.0.0").unwrap()));
		assert!(cidr.match_ip(&IpAddr::from_str("192.168.0.55").unwrap()));
	}

	#[test]
	fn test_cidr4() {
		let ip = Ipv4Addr::from_str("127.0.0.1").unwrap();
		let cidr = Cidr4::from_ip(ip, 16);
		assert_eq!(cidr.mask, 0xffff_0000);
		assert!(cidr.contains(ip));
		assert!(!cidr.contains(Ipv4Addr::new(1, 1, 1, 1)));
		assert!(cidr.contains(Ipv4Addr::from_str("127.0.1.0").unwrap()));
	}

	#[test]
	fn test_cidr6() {
		let ip = Ipv6Addr::from_str("2001:0db8:0123:4567:89ab:1234:1234:5678").unwrap();
		let cidr = Cidr6::from_ip(ip, 96);
		assert_eq!(cidr.mask, (!0_u128) << 32);
		assert!(cidr.contains(&ip));
		assert!(cidr.contains(&Ipv6Addr::from_str("2001:0db8:0123:4567:89ab:1234:1234::").unwrap()));
		assert!(!cidr.contains(&Ipv6Addr::from_str("2001:0db8:0123::").unwrap()));
	}

	#[test]
	fn test_families_do_not_cross_match() {
		let v4 = Cidr::from_str("0.0.0.0/0").unwrap();
		assert!(v4.match_ip(&IpAddr::from_str("8.8.8.8").unwrap()));
		assert!(!v4.match_ip(&IpAddr::from_str("::1").unwrap()));

		let v6 = Cidr::from_str("::/0").unwrap();
		assert!(v6.match_ip(&IpAddr::from_str("::1").unwrap()));
		assert!(!v6.match_ip(&IpAddr::from_str("8.8.8.8").unwrap()));
	}
}
