//! ROUTE-REFRESH message and outbound route filters (RFC 2918, RFC 5291)
//!
//! A bare refresh asks the peer to resend one family. The optional filter
//! block piggybacks the requester's outbound route filter entries so the
//! peer can prune what it resends.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::capability::{Afi, Safi};
use crate::endec::Component;
use crate::route::Prefix;
use bytes::{Buf, BufMut, Bytes};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;

/// BGP route refresh message
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRefresh {
    pub afi: Afi,
    pub safi: Safi,
    pub orf: Option<OrfBlock>,
}

impl RouteRefresh {
    /// Create a plain refresh request for one family
    #[must_use]
    pub const fn new(afi: Afi, safi: Safi) -> Self {
        Self {
            afi,
            safi,
            orf: None,
        }
    }
}

impl Component for RouteRefresh {
    fn from_bytes(src: &mut Bytes) -> Result<Self, crate::Error> {
        let afi = src.get_u16();
        let afi = Afi::from_u16(afi).ok_or(crate::Error::InternalType("RouteRefresh AFI", afi))?;
        let _ = src.get_u8(); // Reserved
        let safi = u16::from(src.get_u8());
        let safi =
            Safi::from_u16(safi).ok_or(crate::Error::InternalType("RouteRefresh SAFI", safi))?;
        let orf = if src.has_remaining() {
            Some(OrfBlock::from_bytes(src)?)
        } else {
            None
        };
        Ok(Self { afi, safi, orf })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u16(self.afi as u16);
        dst.put_u8(0); // Reserved
        dst.put_u8(u8::try_from(self.safi as u16).expect("RouteRefresh SAFI out of range"));
        len += 4;
        if let Some(orf) = self.orf {
            len += orf.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        4 + self.orf.as_ref().map_or(0, Component::encoded_len)
    }
}

/// The outbound route filter block of a refresh request
#[derive(Clone, Debug, PartialEq)]
pub struct OrfBlock {
    pub when_to_refresh: WhenToRefresh,
    pub filters: Vec<OrfEntries>,
}

/// Whether the peer should re-advertise immediately or wait for the
/// complete filter set
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum WhenToRefresh {
    Immediate = 1,
    Defer = 2,
}

impl Component for OrfBlock {
    fn from_bytes(src: &mut Bytes) -> Result<Self, crate::Error> {
        let when = src.get_u8();
        let when_to_refresh = WhenToRefresh::from_u8(when)
            .ok_or(crate::Error::InternalType("when-to-refresh", u16::from(when)))?;
        let mut filters = Vec::new();
        while src.has_remaining() {
            filters.push(OrfEntries::from_bytes(src)?);
        }
        Ok(Self {
            when_to_refresh,
            filters,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u8(self.when_to_refresh as u8);
        len += 1;
        for filter in self.filters {
            len += filter.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        1 + self.filters.iter().map(Component::encoded_len).sum::<usize>()
    }
}

/// Outbound route filter types
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[non_exhaustive]
#[repr(u8)]
pub enum OrfType {
    AddressPrefix = 64,
}

/// One ORF type's worth of entries inside a refresh request
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum OrfEntries {
    AddressPrefix(Vec<AddressPrefixOrfEntry>),
    Unknown(u8, Bytes),
}

impl Component for OrfEntries {
    fn from_bytes(src: &mut Bytes) -> Result<Self, crate::Error> {
        let type_ = src.get_u8();
        let len = src.get_u16() as usize;
        if src.remaining() < len {
            return Err(crate::Error::InternalLength(
                "ORF entries",
                std::cmp::Ordering::Less,
            ));
        }
        let mut entries_buf = src.split_to(len);
        match OrfType::from_u8(type_) {
            Some(OrfType::AddressPrefix) => {
                let mut entries = Vec::new();
                while entries_buf.has_remaining() {
                    entries.push(AddressPrefixOrfEntry::from_bytes(&mut entries_buf)?);
                }
                Ok(Self::AddressPrefix(entries))
            }
            None => Ok(Self::Unknown(
                type_,
                entries_buf.copy_to_bytes(entries_buf.remaining()),
            )),
        }
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let type_pos = dst.len();
        dst.put_u8(0); // Placeholder for type
        let len_pos = dst.len();
        dst.put_u16(0); // Placeholder for length
        let entries_len = match self {
            Self::AddressPrefix(entries) => {
                dst[type_pos] = OrfType::AddressPrefix as u8;
                let mut len = 0;
                for entry in entries {
                    len += entry.to_bytes(dst);
                }
                len
            }
            Self::Unknown(type_, data) => {
                dst[type_pos] = type_;
                dst.put_slice(&data);
                data.len()
            }
        };
        dst[len_pos..len_pos + 2].copy_from_slice(
            &(u16::try_from(entries_len)
                .expect("ORF entries length overflow")
                .to_be_bytes()),
        );
        3 + entries_len
    }

    fn encoded_len(&self) -> usize {
        3 + match self {
            Self::AddressPrefix(entries) => {
                entries.iter().map(Component::encoded_len).sum::<usize>()
            }
            Self::Unknown(_, data) => data.len(),
        }
    }
}

/// Entry action, packed into the top two bits of the entry header
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum OrfAction {
    Add = 0,
    Remove = 1,
    RemoveAll = 2,
}

/// Entry match policy, packed into bit five of the entry header
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum OrfMatch {
    Permit = 0,
    Deny = 1,
}

/// One address-prefix ORF entry (RFC 5292)
///
/// `RemoveAll` entries are header-only, so the body is optional.
#[derive(Clone, Debug, PartialEq)]
pub struct AddressPrefixOrfEntry {
    pub action: OrfAction,
    pub match_type: OrfMatch,
    pub entry: Option<AddressPrefixOrf>,
}

/// The body of an add or remove address-prefix entry
#[derive(Clone, Debug, PartialEq)]
pub struct AddressPrefixOrf {
    pub sequence: u32,
    pub min_length: u8,
    pub max_length: u8,
    pub prefix: Prefix,
}

impl Component for AddressPrefixOrfEntry {
    fn from_bytes(src: &mut Bytes) -> Result<Self, crate::Error> {
        let header = src.get_u8();
        let action = (header >> 6) & 0x3;
        let action = OrfAction::from_u8(action)
            .ok_or(crate::Error::InternalType("ORF action", u16::from(action)))?;
        let match_type = OrfMatch::from_u8((header >> 5) & 0x1)
            .expect("one bit is always a valid match type");
        let entry = if action == OrfAction::RemoveAll {
            None
        } else {
            let sequence = src.get_u32();
            let min_length = src.get_u8();
            let max_length = src.get_u8();
            let prefix = Prefix::from_bytes(src)?;
            Some(AddressPrefixOrf {
                sequence,
                min_length,
                max_length,
                prefix,
            })
        };
        Ok(Self {
            action,
            match_type,
            entry,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        dst.put_u8((self.action as u8) << 6 | (self.match_type as u8) << 5);
        len += 1;
        if let Some(entry) = self.entry {
            dst.put_u32(entry.sequence);
            dst.put_u8(entry.min_length);
            dst.put_u8(entry.max_length);
            len += 6 + entry.prefix.to_bytes(dst);
        }
        len
    }

    fn encoded_len(&self) -> usize {
        1 + self
            .entry
            .as_ref()
            .map_or(0, |entry| 6 + entry.prefix.encoded_len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cidr::Cidr4;
    use crate::tests::hex_to_bytes;
    use bytes::BytesMut;

    #[test]
    fn test_plain_refresh_roundtrip() {
        let mut src = hex_to_bytes("0001 00 01");
        let refresh = RouteRefresh::from_bytes(&mut src).unwrap();
        assert_eq!(refresh, RouteRefresh::new(Afi::Ipv4, Safi::Unicast));
        let mut dst = BytesMut::new();
        assert_eq!(refresh.to_bytes(&mut dst), 4);
        assert_eq!(dst.freeze(), hex_to_bytes("0001 00 01"));
    }

    #[test]
    fn test_orf_entry_roundtrip() {
        let refresh = RouteRefresh {
            afi: Afi::Ipv4,
            safi: Safi::Unicast,
            orf: Some(OrfBlock {
                when_to_refresh: WhenToRefresh::Defer,
                filters: vec![OrfEntries::AddressPrefix(vec![AddressPrefixOrfEntry {
                    action: OrfAction::Add,
                    match_type: OrfMatch::Deny,
                    entry: Some(AddressPrefixOrf {
                        sequence: 10,
                        min_length: 24,
                        max_length: 32,
                        prefix: Cidr4::new("192.0.2.0".parse().unwrap(), 24).into(),
                    }),
                }])],
            }),
        };
        let mut dst = BytesMut::new();
        let written = refresh.clone().to_bytes(&mut dst);
        assert_eq!(written, refresh.encoded_len());
        let mut encoded = dst.freeze();
        assert_eq!(
            encoded,
            hex_to_bytes("0001 00 01 02 40 000b 20 0000000a 18 20 18 c00002")
        );
        let decoded = RouteRefresh::from_bytes(&mut encoded).unwrap();
        assert_eq!(decoded, refresh);
    }

    #[test]
    fn test_remove_all_entry_is_header_only() {
        let mut src = hex_to_bytes("80");
        let entry = AddressPrefixOrfEntry::from_bytes(&mut src).unwrap();
        assert_eq!(entry.action, OrfAction::RemoveAll);
        assert_eq!(entry.match_type, OrfMatch::Permit);
        assert!(entry.entry.is_none());
        assert_eq!(entry.encoded_len(), 1);
    }
}
