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

use super::{protos::rules as proto, Cidr, DomainRule, RuleSet};
use crate::prelude::*;
use regex::Regex;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("cannot open file '{file_path}' ({err})")]
	FileIo {
		file_path: String,
		err: std::io::Error,
	},
	#[error("protobuf error ({0})")]
	Protobuf(protobuf::error::ProtobufError),
	#[error("regex error ({0})")]
	Regex(regex::Error),
	#[error("invalid rule ({0})")]
	InvalidRule(Cow<'static, str>),
}

/// Lazily loaded geo blobs. Each file is read and decoded at most once
/// no matter how many tags are pulled from it.
#[derive(Default)]
pub struct GeoData {
	geoip_path: String,
	geosite_path: String,
	ips: Option<proto::GeoIPList>,
	sites: Option<proto::GeoSiteList>,
}

impl GeoData {
	#[must_use]
	pub fn new(geoip_path: impl Into<String>, geosite_path: impl Into<String>) -> Self {
		Self {
			geoip_path: geoip_path.into(),
			geosite_path: geosite_path.into(),
			ips: None,
			sites: None,
		}
	}

	/// Append every rule carried by country tag `tag` (both CIDR and
	/// domain entries) onto `set`. `"*"` takes every entry. A tag found
	/// in neither blob is a warning, not an error.
	///
	/// # Errors
	///
	/// Returns an [`Error`] when a blob cannot be read or decoded, or
	/// contains an invalid rule.
	pub fn append_tag(&mut self, tag: &str, set: &mut RuleSet) -> Result<(), Error> {
		let mut found = false;

		let geo_ips = load_protobuf::<proto::GeoIPList>(&mut self.ips, &self.geoip_path)?;
		if let Some(geo_ips) = geo_ips {
			for entry in geo_ips
				.entry
				.iter()
				.filter(|e| tag == "*" || e.country_code.eq_ignore_ascii_case(tag))
			{
				found = true;
				for cidr in &entry.cidr {
					set.cidrs.push(decode_cidr(cidr)?);
				}
			}
		}

		let geo_sites = load_protobuf::<proto::GeoSiteList>(&mut self.sites, &self.geosite_path)?;
		if let Some(geo_sites) = geo_sites {
			for entry in geo_sites
				.entry
				.iter()
				.filter(|e| tag == "*" || e.country_code.eq_ignore_ascii_case(tag))
			{
				found = true;
				for domain in &entry.domain {
					set.domains.push(decode_domain(domain)?);
				}
			}
		}

		if found {
			info!("geo tag '{}' loaded", tag);
		} else {
			warn!("geo tag '{}' not found", tag);
		}
		Ok(())
	}
}

fn load_protobuf<'a, T>(data: &'a mut Option<T>, file_path: &str) -> Result<Option<&'a T>, Error>
where
	T: protobuf::Message,
{
	if file_path.is_empty() {
		return Ok(None);
	}
	if data.is_none() {
		let mut file = std::fs::File::open(file_path).map_err(|err| Error::FileIo {
			file_path: file_path.into(),
			err,
		})?;
		let parsed = T::parse_from_reader(&mut file).map_err(Error::Protobuf)?;
		*data = Some(parsed);
	}
	Ok(data.as_ref())
}

fn decode_domain(domain: &proto::Domain) -> Result<DomainRule, Error> {
	Ok(match domain.field_type {
		proto::Domain_Type::Plain => DomainRule::Keyword(domain.value.as_str().into()),
		proto::Domain_Type::Regex => {
			DomainRule::Regex(Regex::new(&domain.value).map_err(Error::Regex)?)
		}
		proto::Domain_Type::Domain => {
			let val = idna::domain_to_ascii_strict(&domain.value)
				.map_err(|e| Error::InvalidRule(e.to_string().into()))?;
			DomainRule::Suffix(val.into())
		}
		proto::Domain_Type::Full => {
			let val = idna::domain_to_ascii_strict(&domain.value)
				.map_err(|e| Error::InvalidRule(e.to_string().into()))?;
			DomainRule::Full(val.into())
		}
	})
}

fn decode_cidr(proto_cidr: &proto::CIDR) -> Result<Cidr, Error> {
	let ip_slice = proto_cidr.ip.as_slice();
	let prefix = u8::try_from(proto_cidr.prefix)
		.map_err(|_| Error::InvalidRule(format!("prefix {} too large", proto_cidr.prefix).into()))?;

	if let Ok(ip) = <[u8; 4]>::try_from(ip_slice) {
		if prefix > 32 {
			return Err(Error::InvalidRule(
				format!("IPv4 prefix must be within [0, 32], not {}", prefix).into(),
			));
		}
		Ok(Cidr::from_ipv4(ip.into(), prefix))
	} else if let Ok(ip) = <[u8; 16]>::try_from(ip_slice) {
		if prefix > 128 {
			return Err(Error::InvalidRule(
				format!("IPv6 prefix must be within [0, 128], not {}", prefix).into(),
			));
		}
		Ok(Cidr::from_ipv6(ip.into(), prefix))
	} else {
		Err(Error::InvalidRule(
			format!(
				"IP can only be either 4 or 16 bytes, not {} bytes",
				ip_slice.len()
			)
			.into(),
		))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::router::Policy;
	use protobuf::Message;

	fn sample_blobs() -> (Vec<u8>, Vec<u8>) {
		let mut geoip = proto::GeoIPList::new();
		{
			let mut entry = proto::GeoIP::new();
			entry.country_code = "CN".into();
			let mut cidr = proto::CIDR::new();
			cidr.ip = vec![101, 6, 0, 0];
			cidr.prefix = 15;
			entry.cidr.push(cidr);
			geoip.entry.push(entry);
		}
		let mut geosite = proto::GeoSiteList::new();
		{
			let mut entry = proto::GeoSite::new();
			entry.country_code = "CN".into();
			let mut domain = proto::Domain::new();
			domain.field_type = proto::Domain_Type::Domain;
			domain.value = "example.cn".into();
			entry.domain.push(domain);

			let mut keyword = proto::Domain::new();
			keyword.field_type = proto::Domain_Type::Plain;
			keyword.value = "baidu".into();
			entry.domain.push(keyword);
			geosite.entry.push(entry);
		}
		(
			geoip.write_to_bytes().unwrap(),
			geosite.write_to_bytes().unwrap(),
		)
	}

	#[test]
	fn test_load_tagged_rules() {
		let (geoip, geosite) = sample_blobs();
		let dir = std::env::temp_dir();
		let ip_path = dir.join("mirage_test_geoip.dat");
		let site_path = dir.join("mirage_test_geosite.dat");
		std::fs::write(&ip_path, &geoip).unwrap();
		std::fs::write(&site_path, &geosite).unwrap();

		let mut data = GeoData::new(
			ip_path.to_str().unwrap(),
			site_path.to_str().unwrap(),
		);
		let mut set = RuleSet::new(Policy::Bypass);
		// Tags match case-insensitively.
		data.append_tag("cn", &mut set).unwrap();
		assert_eq!(set.cidrs.len(), 1);
		assert_eq!(set.domains.len(), 2);
		assert!(set.match_ip(&"101.7.0.1".parse().unwrap()));
		assert!(!set.match_ip(&"101.8.0.1".parse().unwrap()));
		assert!(set.match_domain("www.example.cn"));
		assert!(set.match_domain("www.baidu.com"));

		// Unknown tags only warn.
		let mut empty = RuleSet::new(Policy::Proxy);
		data.append_tag("zz", &mut empty).unwrap();
		assert!(empty.is_empty());

		std::fs::remove_file(ip_path).ok();
		std::fs::remove_file(site_path).ok();
	}
}
