//! Family-aware route comparison, prefix filtering and default attributes
//!
//! Labeled and VPN families frame the routed prefix with transport bytes
//! (a label, or a label plus a route distinguisher). Comparison strips the
//! framing first: labels never participate, and a route distinguisher
//! mismatch makes two VPN prefixes incomparable no matter what the prefix
//! bits say.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::capability::Safi;
use crate::path::PathAttributes;
use crate::route::{AddressFamilyKey, Nlri, Route};

const fn is_vpn(safi: Safi) -> bool {
    matches!(safi, Safi::Vpn | Safi::VpnMulticast)
}

/// Family-aware NLRI equality
#[must_use]
pub fn nlri_equals(family: AddressFamilyKey, a: &Nlri, b: &Nlri) -> bool {
    if is_vpn(family.safi) && a.rd() != b.rd() {
        return false;
    }
    a.prefix().matches(b.prefix())
}

/// Family-aware containment: does `a` strictly cover `b`?
#[must_use]
pub fn nlri_is_prefix_of(family: AddressFamilyKey, a: &Nlri, b: &Nlri) -> bool {
    if is_vpn(family.safi) && a.rd() != b.rd() {
        return false;
    }
    a.prefix().is_prefix_of(b.prefix())
}

/// A prefix-list filter for one address family
///
/// A route is filtered when any list entry equals it or covers it.
#[derive(Clone, Debug, PartialEq)]
pub struct PrefixFilter {
    family: AddressFamilyKey,
    prefixes: Vec<Nlri>,
}

impl PrefixFilter {
    #[must_use]
    pub fn new(family: AddressFamilyKey, prefixes: Vec<Nlri>) -> Self {
        Self { family, prefixes }
    }

    /// Check if the route is caught by this filter
    #[must_use]
    pub fn matches(&self, route: &Route) -> bool {
        self.family == route.family
            && self.prefixes.iter().any(|entry| {
                nlri_equals(self.family, entry, &route.nlri)
                    || nlri_is_prefix_of(self.family, entry, &route.nlri)
            })
    }
}

/// An ordered set of prefix filters, matched first-hit
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterChain(pub Vec<PrefixFilter>);

impl FilterChain {
    /// Check if any filter in the chain catches the route
    #[must_use]
    pub fn matches(&self, route: &Route) -> bool {
        self.0.iter().any(|filter| filter.matches(route))
    }
}

/// Backfills missing path attributes when a route crosses between bases
///
/// Holds at most one default per attribute kind. Attributes already on the
/// route always win; the input route is never touched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DefaultPathAttributesInjector {
    defaults: PathAttributes,
}

impl DefaultPathAttributesInjector {
    #[must_use]
    pub fn new(defaults: PathAttributes) -> Self {
        Self {
            defaults: defaults.deduped(),
        }
    }

    /// A copy of the route with a default added for every missing kind
    #[must_use]
    pub fn inject(&self, route: &Route) -> Route {
        let mut injected = route.clone();
        for attribute in self.defaults.iter() {
            if !injected.path_attributes.contains_kind(attribute.type_code()) {
                injected.path_attributes.0.push(attribute.clone());
            }
        }
        injected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cidr::Cidr4;
    use crate::path::{Data, NextHop, Origin, Value};
    use crate::rd::RouteDistinguisher;
    use crate::route::{Label, MplsNlri, VpnNlri};
    use std::net::{IpAddr, Ipv4Addr};

    fn vpn_nlri(admin: u16, number: u32, cidr: &str, len: u8) -> Nlri {
        Nlri::Vpn(VpnNlri {
            label: Label::new(16, true),
            rd: RouteDistinguisher::As2 { admin, number },
            prefix: Cidr4::new(cidr.parse().unwrap(), len).into(),
        })
    }

    fn plain_route(cidr: &str, len: u8) -> Route {
        Route::new(
            AddressFamilyKey::IPV4_UNICAST,
            Cidr4::new(cidr.parse().unwrap(), len).into(),
            PathAttributes::default(),
            NextHop::Address(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        )
    }

    #[test]
    fn test_vpn_rd_mismatch_is_never_equal() {
        let a = vpn_nlri(65000, 1, "192.0.2.0", 24);
        let b = vpn_nlri(65000, 2, "192.0.2.0", 24);
        assert!(!nlri_equals(AddressFamilyKey::IPV4_VPN, &a, &b));
        assert!(!nlri_is_prefix_of(AddressFamilyKey::IPV4_VPN, &a, &b));
        let same = vpn_nlri(65000, 1, "192.0.2.0", 24);
        assert!(nlri_equals(AddressFamilyKey::IPV4_VPN, &a, &same));
    }

    #[test]
    fn test_label_does_not_participate() {
        let a = Nlri::Mpls(MplsNlri {
            label: Label::new(16, true),
            prefix: Cidr4::new("10.0.0.0".parse().unwrap(), 8).into(),
        });
        let b = Nlri::Mpls(MplsNlri {
            label: Label::new(17, false),
            prefix: Cidr4::new("10.0.0.0".parse().unwrap(), 8).into(),
        });
        assert!(nlri_equals(AddressFamilyKey::IPV4_MPLS_UNICAST, &a, &b));
    }

    #[test]
    fn test_prefix_filter_catches_covered_routes() {
        let filter = PrefixFilter::new(
            AddressFamilyKey::IPV4_UNICAST,
            vec![Cidr4::new("10.0.0.0".parse().unwrap(), 8).into()],
        );
        assert!(filter.matches(&plain_route("10.0.0.0", 8)));
        assert!(filter.matches(&plain_route("10.1.0.0", 16)));
        assert!(!filter.matches(&plain_route("11.0.0.0", 8)));
        // A covering route is not caught by a more specific entry
        let narrow = PrefixFilter::new(
            AddressFamilyKey::IPV4_UNICAST,
            vec![Cidr4::new("10.1.0.0".parse().unwrap(), 16).into()],
        );
        assert!(!narrow.matches(&plain_route("10.0.0.0", 8)));
    }

    #[test]
    fn test_filter_chain_any_match() {
        let chain = FilterChain(vec![
            PrefixFilter::new(
                AddressFamilyKey::IPV4_UNICAST,
                vec![Cidr4::new("192.0.2.0".parse().unwrap(), 24).into()],
            ),
            PrefixFilter::new(
                AddressFamilyKey::IPV4_UNICAST,
                vec![Cidr4::new("10.0.0.0".parse().unwrap(), 8).into()],
            ),
        ]);
        assert!(chain.matches(&plain_route("10.2.3.0", 24)));
        assert!(!chain.matches(&plain_route("172.16.0.0", 12)));
        assert!(!FilterChain::default().matches(&plain_route("10.0.0.0", 8)));
    }

    #[test]
    fn test_injector_only_fills_missing_kinds() {
        let defaults = PathAttributes(vec![
            Value::new(Data::Origin(Origin::Incomplete)),
            Value::new(Data::LocalPref(200)),
        ]);
        let injector = DefaultPathAttributesInjector::new(defaults);
        let mut route = plain_route("10.0.0.0", 8);
        route
            .path_attributes
            .0
            .push(Value::new(Data::Origin(Origin::Igp)));
        let injected = injector.inject(&route);
        // The existing ORIGIN survives, LOCAL_PREF is backfilled
        assert_eq!(
            injected.path_attributes.find(1).unwrap().data,
            Data::Origin(Origin::Igp)
        );
        assert_eq!(
            injected.path_attributes.find(5).unwrap().data,
            Data::LocalPref(200)
        );
        // The input route is untouched
        assert!(!route.path_attributes.contains_kind(5));
    }
}
