//! BGP reachability information
//!
//! The wire forms here correspond to BGP's NLRI fields: a plain prefix for
//! classic unicast families, and the label-stacked variants used by the
//! MPLS and VPN subsequent address families. Which form a byte sequence
//! takes is not self-describing, so decoding is driven by the address
//! family of the surrounding context (`Update` NLRI, MP_REACH_NLRI, etc).

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::capability::{Afi, Safi};
use crate::cidr::{Cidr, Cidr4, Cidr6};
use crate::endec::Component;
use crate::path::{NextHop, PathAttributes};
use crate::rd::RouteDistinguisher;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use std::ops::Deref;

/// Compute the number of prefix octets from the prefix length
fn n_prefix_octets(prefix_len: u8) -> usize {
    #[allow(clippy::verbose_bit_mask)]
    let result = if prefix_len & 0x07 == 0 {
        prefix_len >> 3
    } else {
        (prefix_len >> 3) + 1
    };
    usize::from(result)
}

/// Compare the first `bits` bits of two prefix byte arrays
fn bits_eq(a: &[u8], b: &[u8], bits: u8) -> bool {
    let full = usize::from(bits / 8);
    let rem = bits % 8;
    if a.len() < full || b.len() < full {
        return false;
    }
    if a[..full] != b[..full] {
        return false;
    }
    if rem == 0 {
        return true;
    }
    if a.len() == full || b.len() == full {
        return false;
    }
    let mask = 0xffu8 << (8 - rem);
    (a[full] & mask) == (b[full] & mask)
}

/// A prefix in BGP's compact representation: a bit count and the minimum
/// number of octets holding that many bits
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Prefix {
    pub prefix_len: u8,
    pub prefix: Bytes,
}

impl Prefix {
    #[must_use]
    pub const fn new(prefix_len: u8, prefix: Bytes) -> Self {
        Self { prefix_len, prefix }
    }

    /// A copy trimmed to the minimum octet count with host bits cleared
    #[must_use]
    pub fn normalized(&self) -> Self {
        let n = n_prefix_octets(self.prefix_len);
        let mut octets = vec![0u8; n];
        let have = self.prefix.len().min(n);
        octets[..have].copy_from_slice(&self.prefix[..have]);
        let rem = self.prefix_len % 8;
        if rem != 0 && n > 0 {
            octets[n - 1] &= 0xff << (8 - rem);
        }
        Self {
            prefix_len: self.prefix_len,
            prefix: Bytes::from(octets),
        }
    }

    /// Bit-exact equality, ignoring bits beyond the prefix length
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.prefix_len == other.prefix_len
            && bits_eq(&self.prefix, &other.prefix, self.prefix_len)
    }

    /// Check if this prefix strictly contains the other one
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        self.prefix_len < other.prefix_len
            && bits_eq(&self.prefix, &other.prefix, self.prefix_len)
    }
}

impl Component for Prefix {
    fn from_bytes(src: &mut Bytes) -> Result<Self, crate::Error> {
        let prefix_len = src.get_u8();
        let n = n_prefix_octets(prefix_len);
        if src.remaining() < n {
            return Err(crate::Error::InternalLength(
                "prefix",
                std::cmp::Ordering::Less,
            ));
        }
        let prefix = src.split_to(n);
        Ok(Self { prefix_len, prefix }.normalized())
    }

    fn to_bytes(self, dst: &mut BytesMut) -> usize {
        let normalized = self.normalized();
        dst.put_u8(normalized.prefix_len);
        dst.put_slice(&normalized.prefix);
        1 + normalized.prefix.len()
    }

    fn encoded_len(&self) -> usize {
        1 + n_prefix_octets(self.prefix_len)
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x?}/{}", &self.prefix[..], self.prefix_len)
    }
}

/// MPLS label field: 20-bit label, 3-bit traffic class and the stack flag
/// packed into three octets
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Label {
    pub label: u32,
    pub tc: u8,
    pub bos: bool,
}

impl Label {
    /// Encoded size of one label entry
    pub const LENGTH: usize = 3;

    #[must_use]
    pub const fn new(label: u32, bos: bool) -> Self {
        Self { label, tc: 0, bos }
    }

    #[must_use]
    pub fn from_wire(octets: [u8; 3]) -> Self {
        let field =
            u32::from(octets[0]) << 16 | u32::from(octets[1]) << 8 | u32::from(octets[2]);
        Self {
            label: field >> 4,
            tc: ((field >> 1) & 0x7) as u8,
            // The stack flag is read inverted relative to the RFC 3107
            // bottom-of-stack bit; kept as-is for peer compatibility, see
            // DESIGN.md
            bos: field & 0x1 == 0,
        }
    }

    #[must_use]
    pub fn to_wire(self) -> [u8; 3] {
        let field = (self.label << 4) | (u32::from(self.tc) << 1) | u32::from(!self.bos);
        [(field >> 16) as u8, (field >> 8) as u8, field as u8]
    }
}

/// A labeled prefix (RFC 3107)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MplsNlri {
    pub label: Label,
    pub prefix: Prefix,
}

impl MplsNlri {
    fn parse(src: &mut Bytes) -> Result<Self, crate::Error> {
        let total_len = src.get_u8();
        let total_octets = n_prefix_octets(total_len);
        if total_octets < Label::LENGTH || src.remaining() < total_octets {
            return Err(crate::Error::InternalLength(
                "labeled NLRI",
                std::cmp::Ordering::Less,
            ));
        }
        let mut body = src.split_to(total_octets);
        let mut wire = [0; 3];
        body.copy_to_slice(&mut wire);
        let label = Label::from_wire(wire);
        let prefix_len = u8::try_from((total_octets - Label::LENGTH) * 8)
            .expect("labeled prefix length overflow");
        let prefix = Prefix {
            prefix_len,
            prefix: body,
        }
        .normalized();
        Ok(Self { label, prefix })
    }

    fn write(self, dst: &mut BytesMut) -> usize {
        let prefix = self.prefix.normalized();
        let total_len = 8 * Label::LENGTH as u8 + prefix.prefix_len;
        dst.put_u8(total_len);
        dst.put_slice(&self.label.to_wire());
        dst.put_slice(&prefix.prefix);
        1 + Label::LENGTH + prefix.prefix.len()
    }
}

/// A labeled VPN prefix qualified by a route distinguisher (RFC 4364)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct VpnNlri {
    pub label: Label,
    pub rd: RouteDistinguisher,
    pub prefix: Prefix,
}

impl VpnNlri {
    /// Label plus route distinguisher octets in front of the prefix bits
    const HEADER_LENGTH: usize = Label::LENGTH + crate::rd::RD_LENGTH;

    fn parse(src: &mut Bytes) -> Result<Self, crate::Error> {
        let total_len = src.get_u8();
        let total_octets = n_prefix_octets(total_len);
        if total_octets < Self::HEADER_LENGTH || src.remaining() < total_octets {
            return Err(crate::Error::InternalLength(
                "VPN NLRI",
                std::cmp::Ordering::Less,
            ));
        }
        let mut body = src.split_to(total_octets);
        let mut wire = [0; 3];
        body.copy_to_slice(&mut wire);
        let label = Label::from_wire(wire);
        let rd_type = body.get_u16();
        let mut rd_value = body.split_to(6);
        let rd = RouteDistinguisher::from_parts(rd_type, &mut rd_value)?;
        let prefix_len = u8::try_from((total_octets - Self::HEADER_LENGTH) * 8)
            .expect("VPN prefix length overflow");
        let prefix = Prefix {
            prefix_len,
            prefix: body,
        }
        .normalized();
        Ok(Self { label, rd, prefix })
    }

    fn write(self, dst: &mut BytesMut) -> usize {
        let prefix = self.prefix.normalized();
        let total_len = 8 * Self::HEADER_LENGTH as u8 + prefix.prefix_len;
        dst.put_u8(total_len);
        dst.put_slice(&self.label.to_wire());
        self.rd.to_bytes(dst);
        dst.put_slice(&prefix.prefix);
        1 + Self::HEADER_LENGTH + prefix.prefix.len()
    }
}

/// One NLRI entry in any of its wire forms
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Nlri {
    Plain(Prefix),
    Mpls(MplsNlri),
    Vpn(VpnNlri),
}

impl Nlri {
    /// The routed prefix with any label or route distinguisher framing
    /// stripped
    #[must_use]
    pub const fn prefix(&self) -> &Prefix {
        match self {
            Self::Plain(prefix) => prefix,
            Self::Mpls(mpls) => &mpls.prefix,
            Self::Vpn(vpn) => &vpn.prefix,
        }
    }

    #[must_use]
    pub const fn rd(&self) -> Option<RouteDistinguisher> {
        match self {
            Self::Vpn(vpn) => Some(vpn.rd),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(&self) -> Option<Label> {
        match self {
            Self::Mpls(mpls) => Some(mpls.label),
            Self::Vpn(vpn) => Some(vpn.label),
            Self::Plain(_) => None,
        }
    }

    fn parse(src: &mut Bytes, safi: Safi) -> Result<Self, crate::Error> {
        Ok(match safi {
            Safi::MplsLabel => Self::Mpls(MplsNlri::parse(src)?),
            Safi::Vpn | Safi::VpnMulticast => Self::Vpn(VpnNlri::parse(src)?),
            _ => Self::Plain(Prefix::from_bytes(src)?),
        })
    }

    fn write(self, dst: &mut BytesMut) -> usize {
        match self {
            Self::Plain(prefix) => prefix.to_bytes(dst),
            Self::Mpls(mpls) => mpls.write(dst),
            Self::Vpn(vpn) => vpn.write(dst),
        }
    }

    #[must_use]
    pub fn encoded_len(&self) -> usize {
        match self {
            Self::Plain(prefix) => prefix.encoded_len(),
            Self::Mpls(mpls) => 1 + Label::LENGTH + n_prefix_octets(mpls.prefix.prefix_len),
            Self::Vpn(vpn) => 1 + VpnNlri::HEADER_LENGTH + n_prefix_octets(vpn.prefix.prefix_len),
        }
    }
}

/// BGP routes
///
/// Corresponding to a compact list of NLRI entries without a length field.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Routes(pub Vec<Nlri>);

impl Component for Routes {
    fn from_bytes(src: &mut Bytes) -> Result<Self, crate::Error> {
        Self::from_bytes_family(src, AddressFamilyKey::IPV4_UNICAST)
    }

    fn to_bytes(self, dst: &mut BytesMut) -> usize {
        let mut len = 0;
        for route in self.0 {
            len += route.write(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        Self::slice_encoded_len(&self.0)
    }
}

impl Deref for Routes {
    type Target = Vec<Nlri>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Routes {
    /// Decode a list of NLRI entries in the wire form of the given family
    pub fn from_bytes_family(
        src: &mut Bytes,
        family: AddressFamilyKey,
    ) -> Result<Self, crate::Error> {
        let mut routes = Vec::new();
        while src.has_remaining() {
            routes.push(Nlri::parse(src, family.safi)?);
        }
        Ok(Self(routes))
    }

    /// Find the encoded size of a slice of routes
    fn slice_encoded_len(routes: &[Nlri]) -> usize {
        routes.iter().map(Nlri::encoded_len).sum()
    }

    /// Find a set of split points for the given routes, such that each
    /// set of routes encodes to a size less than or equal to `allowed_size`.
    ///
    /// If no split is required, the result will be `vec![len]`.
    /// However, if the routes are too large to encode in the allowed size,
    /// the result will be an empty vector.
    pub fn split_routes_to_allowed_size_each(&self, allowed_size: usize) -> Vec<usize> {
        // The algorithm is to exponentially decrease the number of routes
        // to keep in each iteration to fit one set. For the next set, the
        // number of routes to keep is inherited from the previous set.
        // If later routes are shorter than the previous set, the algorithm
        // produces a suboptimal result.
        let len = self.len();
        let mut split_points = Vec::new();
        let mut start = 0;
        let mut to_keep_each = len;
        while start < self.len() {
            let mut end = len.min(start + to_keep_each);
            let mut encoded_len = Self::slice_encoded_len(&self[start..end]);
            while encoded_len > allowed_size {
                to_keep_each /= 2;
                if to_keep_each == 0 {
                    return Vec::new();
                }
                end = len.min(start + to_keep_each);
                encoded_len = Self::slice_encoded_len(&self[start..end]);
            }
            split_points.push(end);
            start += to_keep_each;
        }
        split_points
    }

    /// Similar to `split_routes_to_allowed_size_each`, but returns the
    /// left boundary of each split instead of the right boundary and
    /// reverses the order of the split points. This is useful for
    /// calling `Vec::split_off` without having to offset the split points.
    pub fn split_routes_to_allowed_size_rev(&self, allowed_size: usize) -> Vec<usize> {
        let mut split_points = self.split_routes_to_allowed_size_each(allowed_size);
        // Remove tail and add 0 and reverse in place
        split_points.pop();
        split_points.reverse();
        split_points.push(0);
        split_points
    }
}

impl<I, T> From<I> for Routes
where
    I: IntoIterator<Item = T>,
    T: Into<Nlri>,
{
    fn from(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl From<Cidr4> for Prefix {
    fn from(cidr: Cidr4) -> Self {
        let prefix_len = cidr.prefix_len;
        let n = n_prefix_octets(prefix_len);
        let prefix = Bytes::copy_from_slice(&cidr.addr.octets()[..n]);
        Self { prefix_len, prefix }.normalized()
    }
}

impl From<Cidr6> for Prefix {
    fn from(cidr: Cidr6) -> Self {
        let prefix_len = cidr.prefix_len;
        let n = n_prefix_octets(prefix_len);
        let prefix = Bytes::copy_from_slice(&cidr.addr.octets()[..n]);
        Self { prefix_len, prefix }.normalized()
    }
}

impl From<Cidr> for Prefix {
    fn from(cidr: Cidr) -> Self {
        match cidr {
            Cidr::V4(cidr) => cidr.into(),
            Cidr::V6(cidr) => cidr.into(),
        }
    }
}

impl From<Prefix> for Nlri {
    fn from(prefix: Prefix) -> Self {
        Self::Plain(prefix)
    }
}

impl From<Cidr4> for Nlri {
    fn from(cidr: Cidr4) -> Self {
        Self::Plain(cidr.into())
    }
}

impl From<Cidr6> for Nlri {
    fn from(cidr: Cidr6) -> Self {
        Self::Plain(cidr.into())
    }
}

impl From<Cidr> for Nlri {
    fn from(cidr: Cidr) -> Self {
        Self::Plain(cidr.into())
    }
}

/// Address family of a route or a routing base
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct AddressFamilyKey {
    pub afi: Afi,
    pub safi: Safi,
}

impl AddressFamilyKey {
    pub const IPV4_UNICAST: Self = Self::new(Afi::Ipv4, Safi::Unicast);
    pub const IPV6_UNICAST: Self = Self::new(Afi::Ipv6, Safi::Unicast);
    pub const IPV4_MPLS_UNICAST: Self = Self::new(Afi::Ipv4, Safi::MplsLabel);
    pub const IPV6_MPLS_UNICAST: Self = Self::new(Afi::Ipv6, Safi::MplsLabel);
    pub const IPV4_VPN: Self = Self::new(Afi::Ipv4, Safi::Vpn);
    pub const IPV6_VPN: Self = Self::new(Afi::Ipv6, Safi::Vpn);

    #[must_use]
    pub const fn new(afi: Afi, safi: Safi) -> Self {
        Self { afi, safi }
    }
}

impl fmt::Display for AddressFamilyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}/{:?}", self.afi, self.safi)
    }
}

/// A single route: reachability plus the path attributes it travels with
#[derive(Clone, Debug, PartialEq)]
pub struct Route {
    pub family: AddressFamilyKey,
    pub nlri: Nlri,
    pub path_attributes: PathAttributes,
    pub next_hop: NextHop,
}

impl Route {
    /// Create a new route. Duplicate attribute kinds keep the first
    /// occurrence so the attribute set stays unique per kind.
    #[must_use]
    pub fn new(
        family: AddressFamilyKey,
        nlri: Nlri,
        path_attributes: PathAttributes,
        next_hop: NextHop,
    ) -> Self {
        Self {
            family,
            nlri,
            path_attributes: path_attributes.deduped(),
            next_hop,
        }
    }
}
