//! BGP path attributes (RFC 4271 Section 4.3)

// SPDX-License-Identifier: AGPL-3.0-or-later

use super::{
    capability::{Afi, Safi},
    endec::Component,
    route::{AddressFamilyKey, Routes},
};
use bytes::{Buf, BufMut, Bytes};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use std::{
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
    ops::Deref,
};

/// BGP path attributes
///
/// The list is ordered and unique per attribute kind; [`replace`] and
/// [`deduped`] keep it that way.
///
/// [`replace`]: PathAttributes::replace
/// [`deduped`]: PathAttributes::deduped
#[derive(Clone, Debug, Default, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub struct PathAttributes(pub Vec<Value>);

impl Component for PathAttributes {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let mut attributes = Vec::new();
        while src.has_remaining() {
            attributes.push(Value::from_bytes(src)?);
        }
        Ok(Self(attributes))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        for attribute in self.0 {
            len += attribute.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(Value::encoded_len).sum()
    }
}

impl Deref for PathAttributes {
    type Target = Vec<Value>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PathAttributes {
    /// Look up an attribute by its type code
    #[must_use]
    pub fn find(&self, type_code: u8) -> Option<&Value> {
        self.0.iter().find(|v| v.type_code() == type_code)
    }

    /// Check if an attribute of the given kind is present
    #[must_use]
    pub fn contains_kind(&self, type_code: u8) -> bool {
        self.find(type_code).is_some()
    }

    /// Replace the attribute of the same kind in place, or append it
    pub fn replace(&mut self, value: Value) {
        match self.0.iter_mut().find(|v| v.type_code() == value.type_code()) {
            Some(slot) => *slot = value,
            None => self.0.push(value),
        }
    }

    /// Drop all but the first occurrence of each attribute kind
    #[must_use]
    pub fn deduped(self) -> Self {
        let mut seen = Vec::with_capacity(self.0.len());
        let mut out = Vec::with_capacity(self.0.len());
        for value in self.0 {
            let code = value.type_code();
            if !seen.contains(&code) {
                seen.push(code);
                out.push(value);
            }
        }
        Self(out)
    }
}

/// Attribute category per RFC 4271 Section 5
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Category {
    WellKnownMandatory,
    WellKnownDiscretionary,
    OptionalTransitive,
    OptionalNonTransitive,
}

/// BGP path attribute
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub flags: Flags,
    pub data: Data,
}

impl Value {
    /// Create an attribute with the flag bits its category dictates.
    ///
    /// The extended-length bit is set when the value cannot fit a one-octet
    /// length. Only the partial bit may change afterwards.
    #[must_use]
    pub fn new(data: Data) -> Self {
        let mut flags = Flags::from_category(data.category());
        if data.value_len() > usize::from(u8::MAX) {
            flags.0 |= Flags::EXTENDED_LENGTH_BIT;
        }
        Self { flags, data }
    }

    /// Mark a transitive optional attribute as having crossed a router that
    /// did not recognize it. No-op for any other category.
    pub fn set_partial(&mut self) {
        if self.flags.is_optional() && self.flags.is_transitive() {
            self.flags.0 |= Flags::PARTIAL_BIT;
        }
    }

    /// The wire type code of this attribute
    #[must_use]
    pub fn type_code(&self) -> u8 {
        u8::from(&self.data)
    }

    /// The category encoded by the flag bits, with mandatory-ness taken
    /// from the attribute kind
    #[must_use]
    pub fn category(&self) -> Category {
        if !self.flags.is_optional() {
            match self.data.category() {
                Category::WellKnownMandatory => Category::WellKnownMandatory,
                _ => Category::WellKnownDiscretionary,
            }
        } else if self.flags.is_transitive() {
            Category::OptionalTransitive
        } else {
            Category::OptionalNonTransitive
        }
    }
}

impl Component for Value {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let flags = Flags(src.get_u8());
        let type_ = src.get_u8();
        let len = if flags.is_extended_length() {
            src.get_u16() as usize
        } else {
            src.get_u8() as usize
        };
        let mut src = src.split_to(len);
        // Kept aside so errors can carry the whole offending value
        let raw = src.clone();
        let data = match Type::from_u8(type_) {
            Some(Type::Origin) => {
                if src.remaining() != 1 {
                    return Err(super::Error::AttributeLength("ORIGIN", raw));
                }
                Data::Origin(Origin::from_bytes(&mut src)?)
            }
            Some(Type::AsPath) => Data::AsPath(AsPath::from_bytes(&mut src)?),
            Some(Type::NextHop) => {
                if src.remaining() != 4 {
                    return Err(super::Error::NextHop(raw));
                }
                Data::NextHop(Ipv4Addr::from_bytes(&mut src)?)
            }
            Some(Type::MultiExitDisc) => {
                if src.remaining() != 4 {
                    return Err(super::Error::AttributeLength("MULTI_EXIT_DISC", raw));
                }
                Data::MultiExitDisc(src.get_u32())
            }
            Some(Type::LocalPref) => {
                if src.remaining() != 4 {
                    return Err(super::Error::AttributeLength("LOCAL_PREF", raw));
                }
                Data::LocalPref(src.get_u32())
            }
            Some(Type::AtomicAggregate) => {
                if src.has_remaining() {
                    return Err(super::Error::AttributeLength("ATOMIC_AGGREGATE", raw));
                }
                Data::AtomicAggregate
            }
            Some(Type::Aggregator) => {
                if !matches!(src.remaining(), 6 | 8) {
                    return Err(super::Error::AttributeLength("AGGREGATOR", raw));
                }
                Data::Aggregator(Aggregator::from_bytes(&mut src)?)
            }
            Some(Type::Community) => {
                if src.remaining() % 4 != 0 {
                    return Err(super::Error::AttributeLength("COMMUNITY", raw));
                }
                Data::Communities(Communities::from_bytes(&mut src)?)
            }
            Some(Type::OriginatorId) => {
                if src.remaining() != 4 {
                    return Err(super::Error::AttributeLength("ORIGINATOR_ID", raw));
                }
                Data::OriginatorId(Ipv4Addr::from_bytes(&mut src)?)
            }
            Some(Type::ClusterList) => {
                if src.remaining() % 4 != 0 {
                    return Err(super::Error::AttributeLength("CLUSTER_LIST", raw));
                }
                Data::ClusterList(ClusterList::from_bytes(&mut src)?)
            }
            Some(Type::MpReachNlri) => Data::MpReachNlri(MpReachNlri::from_bytes(&mut src)?),
            Some(Type::MpUnreachNlri) => Data::MpUnreachNlri(MpUnreachNlri::from_bytes(&mut src)?),
            Some(Type::ExtendedCommunities) => {
                if src.remaining() % 8 != 0 {
                    return Err(super::Error::AttributeLength("EXTENDED_COMMUNITIES", raw));
                }
                Data::ExtendedCommunities(ExtendedCommunities::from_bytes(&mut src)?)
            }
            Some(Type::As4Path) => Data::As4Path(AsPath::from_bytes(&mut src)?),
            Some(Type::As4Aggregator) => {
                if src.remaining() != 8 {
                    return Err(super::Error::AttributeLength("AS4_AGGREGATOR", raw));
                }
                Data::As4Aggregator(Aggregator::from_bytes(&mut src)?)
            }
            _ => Data::Unsupported(type_, src.copy_to_bytes(src.remaining())),
        };
        Ok(Self { flags, data })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u8(self.flags.0); // Flags
        len += 1;
        dst.put_u8(u8::from(&self.data)); // Type
        len += 1;
        let len_pos = dst.len();
        let two_byte_len = if self.flags.is_extended_length() {
            dst.put_u16(0); // Placeholder for the length
            len += 2;
            true
        } else {
            dst.put_u8(0); // Placeholder for the length
            len += 1;
            false
        };
        let data_len = match self.data {
            Data::Origin(origin) => origin.to_bytes(dst),
            Data::AsPath(as_path) | Data::As4Path(as_path) => as_path.to_bytes(dst),
            Data::NextHop(next_hop) => next_hop.to_bytes(dst),
            Data::MultiExitDisc(med) => med.to_bytes(dst),
            Data::LocalPref(local_pref) => local_pref.to_bytes(dst),
            Data::AtomicAggregate => 0,
            Data::Aggregator(agg) | Data::As4Aggregator(agg) => agg.to_bytes(dst),
            Data::Communities(communities) => communities.to_bytes(dst),
            Data::OriginatorId(id) => id.to_bytes(dst),
            Data::ClusterList(clusters) => clusters.to_bytes(dst),
            Data::MpReachNlri(mp_reach_nlri) => mp_reach_nlri.to_bytes(dst),
            Data::MpUnreachNlri(mp_unreach_nlri) => mp_unreach_nlri.to_bytes(dst),
            Data::ExtendedCommunities(communities) => communities.to_bytes(dst),
            Data::Unsupported(_, data) => {
                let len = data.len();
                dst.put_slice(&data);
                len
            }
        };
        if two_byte_len {
            dst[len_pos..len_pos + 2].copy_from_slice(
                &(u16::try_from(data_len)
                    .expect("Path attribute length overflow")
                    .to_be_bytes()),
            );
        } else {
            dst[len_pos] = u8::try_from(data_len).expect("Path attribute length overflow");
        }
        len + data_len
    }

    fn encoded_len(&self) -> usize {
        1 + 1
            + if self.flags.is_extended_length() {
                2
            } else {
                1
            }
            + self.data.value_len()
    }
}

/// BGP path attribute flags
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Flags(pub u8);

impl Flags {
    const OPTIONAL_BIT: u8 = 0x80;
    const TRANSITIVE_BIT: u8 = 0x40;
    const PARTIAL_BIT: u8 = 0x20;
    const EXTENDED_LENGTH_BIT: u8 = 0x10;

    /// The flag byte a category dictates
    #[must_use]
    pub const fn from_category(category: Category) -> Self {
        match category {
            Category::WellKnownMandatory | Category::WellKnownDiscretionary => {
                Self(Self::TRANSITIVE_BIT)
            }
            Category::OptionalTransitive => Self(Self::OPTIONAL_BIT | Self::TRANSITIVE_BIT),
            Category::OptionalNonTransitive => Self(Self::OPTIONAL_BIT),
        }
    }

    /// Check if the attribute is optional
    #[must_use]
    pub const fn is_optional(self) -> bool {
        self.0 & Self::OPTIONAL_BIT != 0
    }

    /// Check if the attribute is transitive
    #[must_use]
    pub const fn is_transitive(self) -> bool {
        self.0 & Self::TRANSITIVE_BIT != 0
    }

    /// Check if the attribute is partial
    #[must_use]
    pub const fn is_partial(self) -> bool {
        self.0 & Self::PARTIAL_BIT != 0
    }

    /// Check if the attribute is extended length
    #[must_use]
    pub const fn is_extended_length(self) -> bool {
        self.0 & Self::EXTENDED_LENGTH_BIT != 0
    }
}

/// BGP path attribute data
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum Data {
    Origin(Origin),
    AsPath(AsPath),
    /// BGP next hop (RFC 4271 Section 5.1.3)
    NextHop(Ipv4Addr),
    MultiExitDisc(u32),
    LocalPref(u32),
    AtomicAggregate,
    Aggregator(Aggregator),
    Communities(Communities),        // RFC 1997
    OriginatorId(Ipv4Addr),          // RFC 4456
    ClusterList(ClusterList),        // RFC 4456
    MpReachNlri(MpReachNlri),        // RFC 4760
    MpUnreachNlri(MpUnreachNlri),    // RFC 4760
    ExtendedCommunities(ExtendedCommunities), // RFC 4360
    As4Path(AsPath),                 // RFC 4893/6793
    As4Aggregator(Aggregator),       // RFC 4893/6793
    Unsupported(u8, Bytes),
}

impl Data {
    /// The category the attribute kind belongs to
    #[must_use]
    pub const fn category(&self) -> Category {
        match self {
            Self::Origin(_) | Self::AsPath(_) | Self::NextHop(_) => Category::WellKnownMandatory,
            Self::LocalPref(_) | Self::AtomicAggregate => Category::WellKnownDiscretionary,
            Self::Aggregator(_)
            | Self::Communities(_)
            | Self::ExtendedCommunities(_)
            | Self::As4Path(_)
            | Self::As4Aggregator(_)
            | Self::Unsupported(..) => Category::OptionalTransitive,
            Self::MultiExitDisc(_)
            | Self::OriginatorId(_)
            | Self::ClusterList(_)
            | Self::MpReachNlri(_)
            | Self::MpUnreachNlri(_) => Category::OptionalNonTransitive,
        }
    }

    /// Encoded size of the value field alone
    fn value_len(&self) -> usize {
        match self {
            Self::Origin(origin) => origin.encoded_len(),
            Self::AsPath(as_path) | Self::As4Path(as_path) => as_path.encoded_len(),
            Self::NextHop(next_hop) => next_hop.encoded_len(),
            Self::MultiExitDisc(_) | Self::LocalPref(_) | Self::OriginatorId(_) => 4,
            Self::AtomicAggregate => 0,
            Self::Aggregator(agg) | Self::As4Aggregator(agg) => agg.encoded_len(),
            Self::Communities(communities) => communities.encoded_len(),
            Self::ClusterList(clusters) => clusters.encoded_len(),
            Self::MpReachNlri(mp_reach_nlri) => mp_reach_nlri.encoded_len(),
            Self::MpUnreachNlri(mp_unreach_nlri) => mp_unreach_nlri.encoded_len(),
            Self::ExtendedCommunities(communities) => communities.encoded_len(),
            Self::Unsupported(_, data) => data.len(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum Type {
    Origin = 1,
    AsPath = 2,
    NextHop = 3,
    MultiExitDisc = 4,
    LocalPref = 5,
    AtomicAggregate = 6,
    Aggregator = 7,
    Community = 8,
    OriginatorId = 9,
    ClusterList = 10,
    MpReachNlri = 14,
    MpUnreachNlri = 15,
    ExtendedCommunities = 16,
    As4Path = 17,
    As4Aggregator = 18,
}

impl From<&Data> for u8 {
    fn from(data: &Data) -> u8 {
        match data {
            Data::Origin(_) => Type::Origin as u8,
            Data::AsPath(_) => Type::AsPath as u8,
            Data::NextHop(_) => Type::NextHop as u8,
            Data::MultiExitDisc(_) => Type::MultiExitDisc as u8,
            Data::LocalPref(_) => Type::LocalPref as u8,
            Data::AtomicAggregate => Type::AtomicAggregate as u8,
            Data::Aggregator(_) => Type::Aggregator as u8,
            Data::Communities(_) => Type::Community as u8,
            Data::OriginatorId(_) => Type::OriginatorId as u8,
            Data::ClusterList(_) => Type::ClusterList as u8,
            Data::MpReachNlri(_) => Type::MpReachNlri as u8,
            Data::MpUnreachNlri(_) => Type::MpUnreachNlri as u8,
            Data::ExtendedCommunities(_) => Type::ExtendedCommunities as u8,
            Data::As4Path(_) => Type::As4Path as u8,
            Data::As4Aggregator(_) => Type::As4Aggregator as u8,
            Data::Unsupported(type_, _) => *type_,
        }
    }
}

/// BGP origin
#[derive(Copy, Clone, Debug, PartialEq, Primitive)]
#[repr(u8)]
pub enum Origin {
    Igp = 0,
    Egp = 1,
    Incomplete = 2,
}

impl Component for Origin {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let value = src.get_u8();
        Self::from_u8(value).ok_or(super::Error::Origin(value))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        dst.put_u8(self as u8);
        self.encoded_len()
    }

    fn encoded_len(&self) -> usize {
        1
    }
}

/// BGP AS path
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AsPath(pub Vec<AsSegment>);

impl Component for AsPath {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let mut segments = Vec::new();
        while src.has_remaining() {
            segments.push(AsSegment::from_bytes(src)?);
        }
        Ok(Self(segments))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        for segment in self.0 {
            len += segment.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.iter().map(AsSegment::encoded_len).sum()
    }
}

impl Deref for AsPath {
    type Target = Vec<AsSegment>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// BGP AS path segment (RFC 4271 Section 5.1.2, RFC 6793 Section 4)
#[derive(Clone, Debug, PartialEq)]
pub struct AsSegment {
    pub type_: AsSegmentType,
    pub asns: Vec<u32>,
    /// Extra member to indicate that this structure was created from a 4-byte AS path
    /// or that it should be encoded as a 4-byte AS path
    pub as4: bool,
}

/// BGP AS path segment type
#[derive(Copy, Clone, Debug, PartialEq, Primitive)]
#[repr(u8)]
pub enum AsSegmentType {
    AsSet = 1,
    AsSequence = 2,
    ConfedSequence = 3,
    ConfedSet = 4,
}

impl Component for AsSegment {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let type_ = src.get_u8();
        let len = src.get_u8() as usize;
        let remaining_len = src.remaining();
        // RFC 6793 Section 4 updates the AS path segment length to 2 or 4 bytes (when both peers support 4-byte ASNs)
        let per_asn_len = remaining_len / len;
        let mut asns = Vec::with_capacity(len);
        let as4 = if per_asn_len == 2 {
            for _ in 0..len {
                asns.push(u32::from(src.get_u16()));
            }
            false
        } else if per_asn_len == 4 {
            for _ in 0..len {
                asns.push(src.get_u32());
            }
            true
        } else {
            return Err(super::Error::InternalLength(
                "AS segment",
                std::cmp::Ordering::Equal,
            ));
        };
        Ok(Self {
            type_: AsSegmentType::from_u8(type_).ok_or(super::Error::InternalType(
                "AS segment type",
                u16::from(type_),
            ))?,
            asns,
            as4,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let encoded_len = self.encoded_len();
        dst.put_u8(self.type_ as u8);
        let asns_len = self.asns.len();
        dst.put_u8(u8::try_from(asns_len).expect("AS segment length overflow"));
        for asn in self.asns {
            if self.as4 {
                dst.put_u32(asn);
            } else {
                dst.put_u16(u16::try_from(asn).expect("4-byte ASN in 2-byte AS path"));
            }
        }
        encoded_len
    }

    fn encoded_len(&self) -> usize {
        2 + self.asns.len() * if self.as4 { 4 } else { 2 }
    }
}

/// BGP aggregator (RFC 4271 Section 5.1.7, RFC 6793 Section 4)
#[derive(Copy, Clone, PartialEq, Debug)]
pub struct Aggregator {
    pub asn: u32,
    pub ip: Ipv4Addr,
    /// Whether the ASN travels as four octets
    pub as4: bool,
}

impl Component for Aggregator {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let as4 = match src.remaining() {
            6 => false,
            8 => true,
            _ => {
                return Err(super::Error::InternalLength(
                    "aggregator",
                    std::cmp::Ordering::Equal,
                ))
            }
        };
        let asn = if as4 {
            src.get_u32()
        } else {
            u32::from(src.get_u16())
        };
        let ip = Ipv4Addr::from_bytes(src)?;
        Ok(Self { asn, ip, as4 })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        if self.as4 {
            dst.put_u32(self.asn);
        } else {
            dst.put_u16(u16::try_from(self.asn).expect("4-byte ASN in 2-byte aggregator"));
        }
        self.ip.to_bytes(dst) + if self.as4 { 4 } else { 2 }
    }

    fn encoded_len(&self) -> usize {
        4 + if self.as4 { 4 } else { 2 }
    }
}

/// A standard community value (RFC 1997)
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Community(pub u32);

impl Community {
    pub const NO_EXPORT: Self = Self(0xFFFF_FF01);
    pub const NO_ADVERTISE: Self = Self(0xFFFF_FF02);
    pub const NO_EXPORT_SUBCONFED: Self = Self(0xFFFF_FF03);

    /// The ASN half of the community
    #[must_use]
    pub const fn asn(self) -> u16 {
        (self.0 >> 16) as u16
    }

    /// The operator-assigned half of the community
    #[must_use]
    pub const fn value(self) -> u16 {
        self.0 as u16
    }
}

impl fmt::Debug for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Community({self})")
    }
}

impl fmt::Display for Community {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.asn(), self.value())
    }
}

/// COMMUNITY attribute value: zero or more community values
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Communities(pub Vec<Community>);

impl Component for Communities {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let mut communities = Vec::with_capacity(src.remaining() / 4);
        while src.has_remaining() {
            communities.push(Community(src.get_u32()));
        }
        Ok(Self(communities))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let len = self.encoded_len();
        for community in self.0 {
            dst.put_u32(community.0);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.len() * 4
    }
}

impl Deref for Communities {
    type Target = Vec<Community>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// An extended community value kept in its eight-octet wire form (RFC 4360)
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedCommunity(pub [u8; 8]);

impl ExtendedCommunity {
    /// The high-order type octet
    #[must_use]
    pub const fn type_(self) -> u8 {
        self.0[0]
    }

    /// Transitive across ASes when bit 1 of the type octet is clear
    #[must_use]
    pub const fn is_transitive(self) -> bool {
        self.0[0] & 0x40 == 0
    }
}

impl fmt::Debug for ExtendedCommunity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExtendedCommunity({:02x?})", self.0)
    }
}

/// EXTENDED_COMMUNITIES attribute value
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExtendedCommunities(pub Vec<ExtendedCommunity>);

impl Component for ExtendedCommunities {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let mut communities = Vec::with_capacity(src.remaining() / 8);
        while src.has_remaining() {
            let mut value = [0; 8];
            src.copy_to_slice(&mut value);
            communities.push(ExtendedCommunity(value));
        }
        Ok(Self(communities))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let len = self.encoded_len();
        for community in self.0 {
            dst.put_slice(&community.0);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.len() * 8
    }
}

/// CLUSTER_LIST attribute value (RFC 4456)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterList(pub Vec<Ipv4Addr>);

impl Component for ClusterList {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let mut clusters = Vec::with_capacity(src.remaining() / 4);
        while src.has_remaining() {
            clusters.push(Ipv4Addr::from_bytes(src)?);
        }
        Ok(Self(clusters))
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let len = self.encoded_len();
        for cluster in self.0 {
            cluster.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        self.0.len() * 4
    }
}

/// BGP MP_REACH_NLRI (RFC 4760 Section 7)
#[derive(Clone, Debug, PartialEq)]
pub struct MpReachNlri {
    pub afi: Afi,
    pub safi: Safi,
    pub next_hop: NextHop,
    pub nlri: Routes,
}

impl Component for MpReachNlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let afi = src.get_u16();
        let afi = Afi::from_u16(afi)
            .ok_or(super::Error::InternalType("MP_REACH_NLRI AFI", afi))?;
        let safi = src.get_u8();
        let safi = Safi::from_u16(u16::from(safi)).ok_or(super::Error::InternalType(
            "MP_REACH_NLRI SAFI",
            u16::from(safi),
        ))?;
        let nh_len = src.get_u8() as usize;
        let mut nh_src = src.split_to(nh_len);
        let next_hop = NextHop::from_bytes(&mut nh_src)?;
        let _ = src.get_u8(); // Reserved
        let nlri = Routes::from_bytes_family(src, AddressFamilyKey::new(afi, safi))?;
        Ok(Self {
            afi,
            safi,
            next_hop,
            nlri,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u16(self.afi as u16);
        len += 2;
        dst.put_u8(u8::try_from(self.safi as u16).expect("MP_REACH_NLRI SAFI out of range"));
        len += 1;
        dst.put_u8(
            u8::try_from(self.next_hop.encoded_len())
                .expect("MP_REACH_NLRI next hop length overflow"),
        );
        len += 1;
        len += self.next_hop.to_bytes(dst);
        dst.put_u8(0); // Reserved
        len += 1;
        len += self.nlri.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        2 + 1 + 1 + self.next_hop.encoded_len() + 1 + self.nlri.encoded_len()
    }
}

/// Next hop of a route or an MP_REACH_NLRI attribute
///
/// VPN-qualified next hops (a route distinguisher in front of the address)
/// and any other shape this library does not interpret travel as `Binary`.
#[derive(Clone, Debug, PartialEq)]
pub enum NextHop {
    Address(IpAddr),
    V6AndLinkLocal(Ipv6Addr, Ipv6Addr),
    Binary(Bytes),
}

impl Component for NextHop {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        match src.remaining() {
            4 | 16 => Ok(Self::Address(IpAddr::from_bytes(src)?)),
            32 => {
                let v6local = Ipv6Addr::from_bytes(src)?;
                let v6ll = Ipv6Addr::from_bytes(src)?;
                Ok(Self::V6AndLinkLocal(v6local, v6ll))
            }
            _ => Ok(Self::Binary(src.copy_to_bytes(src.remaining()))),
        }
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        match self {
            Self::Address(ip) => ip.to_bytes(dst),
            Self::V6AndLinkLocal(v6local, v6ll) => v6local.to_bytes(dst) + v6ll.to_bytes(dst),
            Self::Binary(data) => {
                let len = data.len();
                dst.put_slice(&data);
                len
            }
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            Self::Address(IpAddr::V4(_)) => 4,
            Self::Address(IpAddr::V6(_)) => 16,
            Self::V6AndLinkLocal(_, _) => 32,
            Self::Binary(data) => data.len(),
        }
    }
}

impl From<IpAddr> for NextHop {
    fn from(ip: IpAddr) -> Self {
        Self::Address(ip)
    }
}

/// BGP MP_UNREACH_NLRI (RFC 4760 Section 7)
#[derive(Clone, Debug, PartialEq)]
pub struct MpUnreachNlri {
    pub afi: Afi,
    pub safi: Safi,
    pub withdrawn_routes: Routes,
}

impl Component for MpUnreachNlri {
    fn from_bytes(src: &mut Bytes) -> Result<Self, super::Error> {
        let afi = src.get_u16();
        let afi = Afi::from_u16(afi)
            .ok_or(super::Error::InternalType("MP_UNREACH_NLRI AFI", afi))?;
        let safi = src.get_u8();
        let safi = Safi::from_u16(u16::from(safi)).ok_or(super::Error::InternalType(
            "MP_UNREACH_NLRI SAFI",
            u16::from(safi),
        ))?;
        let withdrawn_routes = Routes::from_bytes_family(src, AddressFamilyKey::new(afi, safi))?;
        Ok(Self {
            afi,
            safi,
            withdrawn_routes,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u16(self.afi as u16);
        len += 2;
        dst.put_u8(u8::try_from(self.safi as u16).expect("MP_UNREACH_NLRI SAFI out of range"));
        len += 1;
        len += self.withdrawn_routes.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        3 + self.withdrawn_routes.encoded_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::hex_to_bytes;

    #[test]
    fn test_origin() {
        let mut src = hex_to_bytes("40 01 01 00");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::Origin(Origin::Igp),
            }
        );
        assert_eq!(pa.category(), Category::WellKnownMandatory);
    }

    #[test]
    fn test_bad_origin_value() {
        let mut src = hex_to_bytes("40 01 01 09");
        let err = Value::from_bytes(&mut src).unwrap_err();
        assert!(matches!(err, crate::Error::Origin(9)));
    }

    #[test]
    fn test_as2_aspath() {
        let mut src = hex_to_bytes("40 0204 0201 fd7d");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::AsPath(AsPath(vec![AsSegment {
                    type_: AsSegmentType::AsSequence,
                    asns: vec![0xfd7d],
                    as4: false
                }])),
            }
        );
    }

    #[test]
    fn test_as4_aspath() {
        let mut src = hex_to_bytes("40 02 0e 0203 fcde39d1 fcde3880 fcde3122");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::AsPath(AsPath(vec![AsSegment {
                    type_: AsSegmentType::AsSequence,
                    asns: vec![0xfcde39d1, 0xfcde3880, 0xfcde3122],
                    as4: true
                }])),
            }
        );
    }

    #[test]
    fn test_next_hop_attr() {
        let mut src = hex_to_bytes("40 03 04 7f000001");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa,
            Value {
                flags: Flags(0x40),
                data: Data::NextHop(Ipv4Addr::new(127, 0, 0, 1)),
            }
        );
    }

    #[test]
    fn test_bad_next_hop_carries_raw_bytes() {
        let mut src = hex_to_bytes("40 03 03 7f0000");
        let err = Value::from_bytes(&mut src).unwrap_err();
        let crate::Error::NextHop(raw) = err else {
            panic!("unexpected error: {err:?}");
        };
        assert_eq!(raw, hex_to_bytes("7f0000"));
    }

    #[test]
    fn test_communities() {
        let mut src = hex_to_bytes("c0 08 0c fbff0004 fbff0018 ffffff01");
        let pa = Value::from_bytes(&mut src).unwrap();
        let Data::Communities(communities) = &pa.data else {
            panic!("unexpected attribute");
        };
        assert_eq!(communities.len(), 3);
        assert_eq!(communities[0].asn(), 0xfbff);
        assert_eq!(communities[0].value(), 4);
        assert_eq!(communities[2], Community::NO_EXPORT);
        assert_eq!(pa.category(), Category::OptionalTransitive);
    }

    #[test]
    fn test_cluster_list_and_originator() {
        let mut src = hex_to_bytes("80 0a 08 0a000001 0a000002");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa.data,
            Data::ClusterList(ClusterList(vec![
                Ipv4Addr::new(10, 0, 0, 1),
                Ipv4Addr::new(10, 0, 0, 2)
            ]))
        );
        let mut src = hex_to_bytes("80 09 04 0a0000ff");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(pa.data, Data::OriginatorId(Ipv4Addr::new(10, 0, 0, 255)));
    }

    #[test]
    fn test_as4_aggregator() {
        let mut src = hex_to_bytes("c0 12 08 fcde3880 0a000001");
        let pa = Value::from_bytes(&mut src).unwrap();
        assert_eq!(
            pa.data,
            Data::As4Aggregator(Aggregator {
                asn: 0xfcde3880,
                ip: Ipv4Addr::new(10, 0, 0, 1),
                as4: true
            })
        );
    }

    #[test]
    fn test_category_determines_flags() {
        let pa = Value::new(Data::Origin(Origin::Igp));
        assert!(!pa.flags.is_optional());
        assert!(pa.flags.is_transitive());
        let pa = Value::new(Data::MultiExitDisc(100));
        assert!(pa.flags.is_optional());
        assert!(!pa.flags.is_transitive());
        let mut pa = Value::new(Data::Communities(Communities(vec![Community::NO_EXPORT])));
        assert!(pa.flags.is_optional());
        assert!(pa.flags.is_transitive());
        assert!(!pa.flags.is_partial());
        pa.set_partial();
        assert!(pa.flags.is_partial());
        // Partial never applies to a well-known attribute
        let mut pa = Value::new(Data::Origin(Origin::Igp));
        pa.set_partial();
        assert!(!pa.flags.is_partial());
    }

    #[test]
    fn test_attribute_roundtrip_remaining_kinds() {
        use crate::cidr::Cidr6;
        let all = vec![
            Data::MultiExitDisc(100),
            Data::AtomicAggregate,
            Data::Aggregator(Aggregator {
                asn: 64893,
                ip: Ipv4Addr::new(172, 23, 6, 165),
                as4: false,
            }),
            Data::ExtendedCommunities(ExtendedCommunities(vec![ExtendedCommunity([
                0x00, 0x02, 0xfd, 0x7d, 0x00, 0x00, 0x00, 0x64,
            ])])),
            Data::ClusterList(ClusterList(vec![Ipv4Addr::new(10, 0, 0, 1)])),
            Data::MpUnreachNlri(MpUnreachNlri {
                afi: Afi::Ipv6,
                safi: Safi::Unicast,
                withdrawn_routes: Routes(vec![Cidr6::new(
                    "fdc7:3c9d::".parse().unwrap(),
                    32,
                )
                .into()]),
            }),
            Data::As4Aggregator(Aggregator {
                asn: 4_242_420_893,
                ip: Ipv4Addr::new(172, 23, 6, 165),
                as4: true,
            }),
        ];
        for data in all {
            let value = Value::new(data);
            let mut dst = bytes::BytesMut::new();
            value.clone().to_bytes(&mut dst);
            let mut encoded = dst.freeze();
            assert_eq!(Value::from_bytes(&mut encoded).unwrap(), value);
        }
    }

    #[test]
    fn test_unsupported_roundtrip() {
        let data = hex_to_bytes("e0 20 18 fcde3880 00000064 00000035 fcde3880 00000065 0000040c");
        let pa = Value::from_bytes(&mut data.clone()).unwrap();
        assert!(matches!(pa.data, Data::Unsupported(0x20, _)));
        let mut dst = bytes::BytesMut::new();
        pa.to_bytes(&mut dst);
        assert_eq!(dst.freeze(), data);
    }
}
