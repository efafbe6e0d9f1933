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

use super::{Cidr, Policy};
use crate::prelude::*;
use regex::Regex;
use smol_str::SmolStr;

#[derive(Debug)]
pub enum DomainRule {
	/// `fulldomain == rule`.
	Full(SmolStr),
	/// `fulldomain` ends with `rule`, label-aligned: the character just
	/// before the matched suffix must be `.` (or the match covers the
	/// whole name).
	Suffix(SmolStr),
	/// `rule` appears anywhere as a substring.
	Keyword(SmolStr),
	Regex(Regex),
}

impl DomainRule {
	#[must_use]
	pub fn matches(&self, fulldomain: &str) -> bool {
		match self {
			DomainRule::Full(rule) => fulldomain == rule.as_str(),
			DomainRule::Suffix(rule) => {
				if fulldomain == rule.as_str() {
					return true;
				}
				if let Some(prefix) = fulldomain
					.strip_suffix(rule.as_str()) {
					return prefix.ends_with('.');
				}
				false
			}
			DomainRule::Keyword(rule) => fulldomain.contains(rule.as_str()),
			DomainRule::Regex(rule) => rule.is_match(fulldomain),
		}
	}
}

/// One policy's worth of rules. Immutable once the router is built.
pub struct RuleSet {
	pub policy: Policy,
	pub domains: Vec<DomainRule>,
	pub cidrs: Vec<Cidr>,
}

impl RuleSet {
	#[must_use]
	pub fn new(policy: Policy) -> Self {
		Self {
			policy,
			domains: Vec::new(),
			cidrs: Vec::new(),
		}
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.domains.is_empty() && self.cidrs.is_empty()
	}

	#[must_use]
	pub fn match_ip(&self, ip: &IpAddr) -> bool {
		self.cidrs.iter().any(|cidr| cidr.match_ip(ip))
	}

	#[must_use]
	pub fn match_domain(&self, fulldomain: &str) -> bool {
		// Ignore a trailing dot.
		let fulldomain = fulldomain.strip_suffix('.').unwrap_or(fulldomain);
		for rule in &self.domains {
			if rule.matches(fulldomain) {
				trace!("domain {} hit rule {:?}", fulldomain, rule);
				return true;
			}
		}
		false
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_suffix_is_label_aligned() {
		let rule = DomainRule::Suffix("example.com".into());
		assert!(rule.matches("example.com"));
		assert!(rule.matches("www.example.com"));
		assert!(rule.matches("a.b.example.com"));
		// Suffix without a label boundary must not match.
		assert!(!rule.matches("notexample.com"));
		assert!(!rule.matches("xexample.com"));
	}

	#[test]
	fn test_full() {
		let rule = DomainRule::Full("example.com".into());
		assert!(rule.matches("example.com"));
		assert!(!rule.matches("www.example.com"));
		assert!(!rule.matches("example.com.cn"));
	}

	#[test]
	fn test_keyword() {
		let rule = DomainRule::Keyword("google".into());
		assert!(rule.matches("www.google.com"));
		assert!(rule.matches("googlevideo.com"));
		assert!(!rule.matches("example.com"));
	}

	#[test]
	fn test_regex() {
		let rule = DomainRule::Regex(Regex::new(r"^ads?\d*\.").unwrap());
		assert!(rule.matches("ad1.example.com"));
		assert!(rule.matches("ads.example.com"));
		assert!(!rule.matches("bad.example.com"));
	}

	#[test]
	fn test_rule_set() {
		let mut set = RuleSet::new(Policy::Bypass);
		assert!(set.is_empty());
		set.domains.push(DomainRule::Suffix("cn".into()));
		set.cidrs.push("10.0.0.0/8".parse().unwrap());

		assert!(set.match_domain("www.example.cn"));
		assert!(set.match_domain("www.example.cn."));
		assert!(!set.match_domain("www.example.com"));
		assert!(set.match_ip(&"10.1.2.3".parse().unwrap()));
		assert!(!set.match_ip(&"8.8.8.8".parse().unwrap()));
	}
}
