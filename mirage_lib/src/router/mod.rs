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

pub mod cidr;
pub use cidr::{Cidr, Cidr4, Cidr6};

mod rule;
pub use rule::{DomainRule, RuleSet};

mod geodata;
pub use geodata::{Error as GeoError, GeoData};

#[allow(clippy::semicolon_if_nothing_returned)]
mod protos;

use crate::prelude::*;
use serde::Deserialize;

/// The routing outcome for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Policy {
	Proxy,
	Bypass,
	Block,
	Unknown,
}

impl Default for Policy {
	fn default() -> Self {
		Policy::Proxy
	}
}

/// How a domain-typed request interacts with IP rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
	AsIs,
	IpIfNonMatch,
	IpOnDemand,
}

impl Default for Strategy {
	fn default() -> Self {
		Strategy::AsIs
	}
}

/// Rule sets in evaluation order (bypass, then block, then proxy), each
/// carrying its own policy, with a default for the all-miss case.
///
/// Rule sets are immutable after load, so matching needs no locking.
pub struct GeoRouter {
	sets: Vec<RuleSet>,
	default_policy: Policy,
	strategy: Strategy,
}

impl GeoRouter {
	#[must_use]
	pub fn new(sets: Vec<RuleSet>, default_policy: Policy, strategy: Strategy) -> Self {
		Self {
			sets,
			default_policy,
			strategy,
		}
	}

	fn match_ip(&self, ip: &IpAddr) -> Option<Policy> {
		self.sets
			.iter()
			.find(|set| set.match_ip(ip))
			.map(|set| set.policy)
	}

	fn match_domain(&self, name: &str) -> Option<Policy> {
		self.sets
			.iter()
			.find(|set| set.match_domain(name))
			.map(|set| set.policy)
	}

	/// Decide the policy for one destination.
	///
	/// An IP-typed destination never does DNS. A domain-typed one
	/// resolves at most once, and only when the strategy requires it.
	/// A destination that should have been resolved but could not be
	/// yields [`Policy::Unknown`].
	pub async fn route(&self, addr: &Address) -> Policy {
		match &addr.dest {
			Destination::Ip(ip) => self.match_ip(ip).unwrap_or(self.default_policy),
			Destination::Name(name) => {
				if self.strategy == Strategy::IpOnDemand {
					return self.route_by_resolving(addr).await;
				}
				if let Some(policy) = self.match_domain(name.as_str()) {
					return policy;
				}
				if self.strategy == Strategy::IpIfNonMatch {
					return self.route_by_resolving(addr).await;
				}
				self.default_policy
			}
		}
	}

	async fn route_by_resolving(&self, addr: &Address) -> Policy {
		match addr.resolve().await {
			Ok(resolved) => self
				.match_ip(&resolved.ip())
				.unwrap_or(self.default_policy),
			Err(e) => {
				warn!("cannot resolve '{}' for routing ({})", addr, e);
				Policy::Unknown
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rule::DomainRule;

	fn test_router(strategy: Strategy) -> GeoRouter {
		let mut bypass = RuleSet::new(Policy::Bypass);
		bypass.domains.push(DomainRule::Suffix("cn".into()));
		bypass.cidrs.push("101.6.0.0/15".parse().unwrap());

		let mut block = RuleSet::new(Policy::Block);
		block.domains.push(DomainRule::Keyword("tracker".into()));

		let mut proxy = RuleSet::new(Policy::Proxy);
		proxy.domains.push(DomainRule::Suffix("com".into()));

		GeoRouter::new(vec![bypass, block, proxy], Policy::Proxy, strategy)
	}

	fn route(router: &GeoRouter, addr: &str) -> Policy {
		let addr: Address = addr.parse().unwrap();
		tokio::runtime::Runtime::new()
			.unwrap()
			.block_on(router.route(&addr))
	}

	#[test]
	fn test_domain_rules_in_order() {
		let router = test_router(Strategy::AsIs);
		assert_eq!(route(&router, "www.example.cn:80"), Policy::Bypass);
		assert_eq!(route(&router, "tracker.example.com:80"), Policy::Block);
		assert_eq!(route(&router, "www.example.com:80"), Policy::Proxy);
		assert_eq!(route(&router, "www.example.org:80"), Policy::Proxy);
	}

	#[test]
	fn test_ip_rules() {
		let router = test_router(Strategy::AsIs);
		assert_eq!(route(&router, "101.6.6.6:80"), Policy::Bypass);
		assert_eq!(route(&router, "8.8.8.8:53"), Policy::Proxy);
	}

	#[test]
	fn test_deterministic() {
		let router = test_router(Strategy::AsIs);
		let first = route(&router, "tracker.example.cn:80");
		for _ in 0..8 {
			assert_eq!(route(&router, "tracker.example.cn:80"), first);
		}
		// And bypass wins over block for this name, by evaluation order.
		assert_eq!(first, Policy::Bypass);
	}
}
