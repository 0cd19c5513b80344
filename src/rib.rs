//! Routing information base
//!
//! One [`RoutingTree`] per (side, address family) keeps every known route
//! in a longest-prefix-match tree: each node's prefix strictly contains all
//! of its descendants, and no two siblings are comparable. The tree never
//! fails on well-formed routes; malformed reachability is the codec's
//! problem and has been rejected long before it gets here.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::filter::{nlri_equals, nlri_is_prefix_of};
use crate::route::{AddressFamilyKey, Nlri, Route};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Which direction of a peering a base describes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RibSide {
    Local,
    Remote,
}

struct TreeNode {
    route: Route,
    children: Vec<TreeNode>,
}

/// A longest-prefix-match tree of routes for one address family
pub struct RoutingTree {
    family: AddressFamilyKey,
    roots: Vec<TreeNode>,
}

impl RoutingTree {
    #[must_use]
    pub const fn new(family: AddressFamilyKey) -> Self {
        Self {
            family,
            roots: Vec::new(),
        }
    }

    #[must_use]
    pub const fn family(&self) -> AddressFamilyKey {
        self.family
    }

    /// Add a route, reparenting any now-covered siblings under it.
    ///
    /// An exact prefix match replaces that node's route in place.
    /// Returns whether a new node was created.
    pub fn add_route(&mut self, route: Route) -> bool {
        insert_under(&mut self.roots, self.family, route)
    }

    /// Remove the route with exactly this prefix, promoting its children to
    /// its former position. Unknown prefixes are a no-op returning `None`.
    pub fn withdraw_route(&mut self, nlri: &Nlri) -> Option<Route> {
        withdraw_under(&mut self.roots, self.family, nlri)
    }

    /// Longest-prefix-match lookup: the most specific route covering the
    /// queried prefix
    #[must_use]
    pub fn lookup(&self, nlri: &Nlri) -> Option<&Route> {
        lookup_under(&self.roots, self.family, nlri)
    }

    /// Pre-order traversal over every route in the tree
    pub fn visit<F: FnMut(&Route)>(&self, visitor: &mut F) {
        visit_under(&self.roots, visitor);
    }

    /// Number of routes in the tree
    #[must_use]
    pub fn size(&self) -> usize {
        fn count(children: &[TreeNode]) -> usize {
            children.iter().map(|c| 1 + count(&c.children)).sum()
        }
        count(&self.roots)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

fn insert_under(children: &mut Vec<TreeNode>, family: AddressFamilyKey, route: Route) -> bool {
    for child in children.iter_mut() {
        if nlri_equals(family, &child.route.nlri, &route.nlri) {
            // Same prefix: this is an update of the attributes, not a new node
            child.route = route;
            return false;
        }
        if nlri_is_prefix_of(family, &child.route.nlri, &route.nlri) {
            return insert_under(&mut child.children, family, route);
        }
    }
    // No covering node at this level: the route becomes a new sibling and
    // adopts every sibling it covers
    let mut node = TreeNode {
        route,
        children: Vec::new(),
    };
    let mut i = 0;
    while i < children.len() {
        if nlri_is_prefix_of(family, &node.route.nlri, &children[i].route.nlri) {
            node.children.push(children.remove(i));
        } else {
            i += 1;
        }
    }
    children.push(node);
    true
}

fn withdraw_under(
    children: &mut Vec<TreeNode>,
    family: AddressFamilyKey,
    nlri: &Nlri,
) -> Option<Route> {
    for i in 0..children.len() {
        if nlri_equals(family, &children[i].route.nlri, nlri) {
            let removed = children.remove(i);
            // Splice the orphans back in at this level
            children.extend(removed.children);
            return Some(removed.route);
        }
        if nlri_is_prefix_of(family, &children[i].route.nlri, nlri) {
            return withdraw_under(&mut children[i].children, family, nlri);
        }
    }
    None
}

fn lookup_under<'a>(
    children: &'a [TreeNode],
    family: AddressFamilyKey,
    nlri: &Nlri,
) -> Option<&'a Route> {
    for child in children {
        if nlri_equals(family, &child.route.nlri, nlri) {
            return Some(&child.route);
        }
        if nlri_is_prefix_of(family, &child.route.nlri, nlri) {
            // Fall back to this covering node if nothing deeper matches
            return lookup_under(&child.children, family, nlri).or(Some(&child.route));
        }
    }
    None
}

fn visit_under<F: FnMut(&Route)>(children: &[TreeNode], visitor: &mut F) {
    for child in children {
        visitor(&child.route);
        visit_under(&child.children, visitor);
    }
}

/// A route change handed to registered listeners
#[derive(Clone, Debug, PartialEq)]
pub struct RouteEvent {
    pub side: RibSide,
    pub family: AddressFamilyKey,
    pub route: Route,
}

/// Observer of route changes on one base
///
/// Callbacks run on the caller's thread inside the base's critical section:
/// they must not block and must not call back into the same base.
pub trait RoutingListener: Send {
    fn route_added(&self, event: &RouteEvent);
    fn route_withdrawn(&self, event: &RouteEvent);
}

/// Handle for removing a registered listener
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ListenerId(usize);

/// One side of one address family's routing base
///
/// The tree and the listener list each sit behind their own mutex; all
/// structural changes and the notification fan-out form a single critical
/// section per base. Independent bases never contend with each other.
pub struct RoutingInformationBase {
    side: RibSide,
    tree: Mutex<RoutingTree>,
    listeners: Mutex<Vec<Option<Box<dyn RoutingListener>>>>,
}

impl RoutingInformationBase {
    #[must_use]
    pub fn new(side: RibSide, family: AddressFamilyKey) -> Self {
        Self {
            side,
            tree: Mutex::new(RoutingTree::new(family)),
            listeners: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub const fn side(&self) -> RibSide {
        self.side
    }

    /// Add or update a route and notify listeners
    pub fn add_route(&self, route: Route) {
        let mut tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        let event = RouteEvent {
            side: self.side,
            family: tree.family(),
            route: route.clone(),
        };
        tree.add_route(route);
        let listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        for listener in listeners.iter().flatten() {
            listener.route_added(&event);
        }
    }

    /// Withdraw a route and notify listeners. Withdrawing a prefix this
    /// base never learned is not an error: consistency across
    /// redistribution hops cannot be assumed, so it is only logged.
    pub fn withdraw_route(&self, nlri: &Nlri) -> bool {
        let mut tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        let family = tree.family();
        match tree.withdraw_route(nlri) {
            Some(route) => {
                let event = RouteEvent {
                    side: self.side,
                    family,
                    route,
                };
                let listeners = self
                    .listeners
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner);
                for listener in listeners.iter().flatten() {
                    listener.route_withdrawn(&event);
                }
                true
            }
            None => {
                log::debug!("Withdraw for unknown prefix in {family}, ignoring");
                false
            }
        }
    }

    /// Longest-prefix-match lookup
    #[must_use]
    pub fn lookup(&self, nlri: &Nlri) -> Option<Route> {
        let tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        tree.lookup(nlri).cloned()
    }

    /// Run the visitor over every route, pre-order
    pub fn visit_routing_nodes<F: FnMut(&Route)>(&self, mut visitor: F) {
        let tree = self.tree.lock().unwrap_or_else(PoisonError::into_inner);
        tree.visit(&mut visitor);
    }

    /// Number of routes in the base
    #[must_use]
    pub fn size(&self) -> usize {
        self.tree
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .size()
    }

    /// Register a listener and return the handle for removing it
    pub fn add_routing_listener(&self, listener: Box<dyn RoutingListener>) -> ListenerId {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        listeners.push(Some(listener));
        ListenerId(listeners.len() - 1)
    }

    /// Drop a previously registered listener
    pub fn remove_routing_listener(&self, id: ListenerId) {
        let mut listeners = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = listeners.get_mut(id.0) {
            *slot = None;
        }
    }
}

/// All routing bases belonging to one peer, keyed by side and family
#[derive(Default)]
pub struct PeerRoutingInformationBase {
    bases: HashMap<(RibSide, AddressFamilyKey), RoutingInformationBase>,
}

impl PeerRoutingInformationBase {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the base for a (side, family) scope if it does not exist yet
    pub fn allocate(
        &mut self,
        side: RibSide,
        family: AddressFamilyKey,
    ) -> &RoutingInformationBase {
        self.bases
            .entry((side, family))
            .or_insert_with(|| RoutingInformationBase::new(side, family))
    }

    /// Look up an allocated base
    #[must_use]
    pub fn routing_base(
        &self,
        side: RibSide,
        family: AddressFamilyKey,
    ) -> Option<&RoutingInformationBase> {
        self.bases.get(&(side, family))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cidr::Cidr4;
    use crate::path::{NextHop, PathAttributes};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn route(cidr: &str, len: u8) -> Route {
        Route::new(
            AddressFamilyKey::IPV4_UNICAST,
            Cidr4::new(cidr.parse().unwrap(), len).into(),
            PathAttributes::default(),
            NextHop::Address(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
        )
    }

    #[test]
    fn test_insert_nests_more_specific() {
        let mut tree = RoutingTree::new(AddressFamilyKey::IPV4_UNICAST);
        assert!(tree.add_route(route("10.0.0.0", 8)));
        assert!(tree.add_route(route("10.1.0.0", 16)));
        assert_eq!(tree.size(), 2);
        // Pre-order puts the /8 first with the /16 below it
        let mut seen = Vec::new();
        tree.visit(&mut |r: &Route| seen.push(r.nlri.prefix().prefix_len));
        assert_eq!(seen, vec![8, 16]);
    }

    #[test]
    fn test_insert_reparents_covered_siblings() {
        let mut tree = RoutingTree::new(AddressFamilyKey::IPV4_UNICAST);
        tree.add_route(route("10.1.0.0", 16));
        tree.add_route(route("10.2.0.0", 16));
        tree.add_route(route("192.0.2.0", 24));
        // The /8 adopts both /16s but not the unrelated /24
        assert!(tree.add_route(route("10.0.0.0", 8)));
        assert_eq!(tree.size(), 4);
        let mut seen = Vec::new();
        tree.visit(&mut |r: &Route| seen.push(r.nlri.prefix().prefix_len));
        assert_eq!(seen, vec![24, 8, 16, 16]);
    }

    #[test]
    fn test_exact_insert_replaces_in_place() {
        let mut tree = RoutingTree::new(AddressFamilyKey::IPV4_UNICAST);
        tree.add_route(route("10.0.0.0", 8));
        let created = tree.add_route(route("10.0.0.0", 8));
        assert!(!created);
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn test_withdraw_promotes_children() {
        let mut tree = RoutingTree::new(AddressFamilyKey::IPV4_UNICAST);
        tree.add_route(route("10.0.0.0", 8));
        tree.add_route(route("10.1.0.0", 16));
        tree.add_route(route("10.1.2.0", 24));
        let removed = tree.withdraw_route(&route("10.0.0.0", 8).nlri);
        assert!(removed.is_some());
        assert_eq!(tree.size(), 2);
        // The /16 took its parent's place and kept the /24 below it
        let mut seen = Vec::new();
        tree.visit(&mut |r: &Route| seen.push(r.nlri.prefix().prefix_len));
        assert_eq!(seen, vec![16, 24]);
    }

    #[test]
    fn test_withdraw_unknown_is_noop() {
        let mut tree = RoutingTree::new(AddressFamilyKey::IPV4_UNICAST);
        tree.add_route(route("10.0.0.0", 8));
        assert!(tree.withdraw_route(&route("172.16.0.0", 12).nlri).is_none());
        assert_eq!(tree.size(), 1);
    }

    #[test]
    fn test_lookup_most_specific() {
        let mut tree = RoutingTree::new(AddressFamilyKey::IPV4_UNICAST);
        tree.add_route(route("10.0.0.0", 8));
        tree.add_route(route("10.1.0.0", 16));
        let hit = tree.lookup(&route("10.1.2.3", 32).nlri).unwrap();
        assert_eq!(hit.nlri.prefix().prefix_len, 16);
        let hit = tree.lookup(&route("10.2.0.1", 32).nlri).unwrap();
        assert_eq!(hit.nlri.prefix().prefix_len, 8);
        assert!(tree.lookup(&route("172.16.0.0", 12).nlri).is_none());
    }

    struct CountingListener {
        added: Arc<AtomicUsize>,
        withdrawn: Arc<AtomicUsize>,
    }

    impl RoutingListener for CountingListener {
        fn route_added(&self, _event: &RouteEvent) {
            self.added.fetch_add(1, Ordering::SeqCst);
        }

        fn route_withdrawn(&self, _event: &RouteEvent) {
            self.withdrawn.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_base_notifies_listeners() {
        let base = RoutingInformationBase::new(RibSide::Local, AddressFamilyKey::IPV4_UNICAST);
        let added = Arc::new(AtomicUsize::new(0));
        let withdrawn = Arc::new(AtomicUsize::new(0));
        let id = base.add_routing_listener(Box::new(CountingListener {
            added: added.clone(),
            withdrawn: withdrawn.clone(),
        }));
        base.add_route(route("10.0.0.0", 8));
        // A replacement still counts as an add
        base.add_route(route("10.0.0.0", 8));
        assert_eq!(added.load(Ordering::SeqCst), 2);
        assert!(base.withdraw_route(&route("10.0.0.0", 8).nlri));
        // A no-op withdraw fires nothing
        assert!(!base.withdraw_route(&route("10.0.0.0", 8).nlri));
        assert_eq!(withdrawn.load(Ordering::SeqCst), 1);
        base.remove_routing_listener(id);
        base.add_route(route("10.0.0.0", 8));
        assert_eq!(added.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_peer_rib_allocates_per_scope() {
        let mut peer = PeerRoutingInformationBase::new();
        peer.allocate(RibSide::Local, AddressFamilyKey::IPV4_UNICAST)
            .add_route(route("10.0.0.0", 8));
        assert!(peer
            .routing_base(RibSide::Local, AddressFamilyKey::IPV4_UNICAST)
            .is_some());
        assert!(peer
            .routing_base(RibSide::Remote, AddressFamilyKey::IPV4_UNICAST)
            .is_none());
        assert_eq!(
            peer.routing_base(RibSide::Local, AddressFamilyKey::IPV4_UNICAST)
                .unwrap()
                .size(),
            1
        );
    }
}
