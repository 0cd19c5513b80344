//! Route distinguisher codec (RFC 4364 Section 4.2)
//!
//! An RD is always eight octets on the wire: a two-octet type field
//! followed by a six-octet value whose split into administrator and
//! assigned-number subfields depends on the type.

// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::check_remaining_len;
use crate::endec::Component;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use std::fmt;
use std::net::Ipv4Addr;

/// Encoded size of a route distinguisher
pub const RD_LENGTH: usize = 8;

/// Route distinguisher type field values
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u16)]
pub enum Type {
    As2 = 0,
    Ipv4 = 1,
    As4 = 2,
}

/// BGP/MPLS VPN route distinguisher
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteDistinguisher {
    /// Two-octet ASN administrator, four-octet assigned number
    As2 { admin: u16, number: u32 },
    /// IPv4 address administrator, two-octet assigned number
    Ipv4 { admin: Ipv4Addr, number: u16 },
    /// Four-octet ASN administrator, two-octet assigned number
    As4 { admin: u32, number: u16 },
    /// Unassigned type, value kept verbatim
    Unknown { type_: u16, value: [u8; 6] },
}

impl RouteDistinguisher {
    /// The wire value of the type field
    #[must_use]
    pub const fn type_code(&self) -> u16 {
        match self {
            Self::As2 { .. } => Type::As2 as u16,
            Self::Ipv4 { .. } => Type::Ipv4 as u16,
            Self::As4 { .. } => Type::As4 as u16,
            Self::Unknown { type_, .. } => *type_,
        }
    }

    /// Decode the six value octets following an already-read type field
    pub fn from_parts(type_: u16, src: &mut Bytes) -> Result<Self, crate::Error> {
        check_remaining_len!(src, 6, "route distinguisher");
        Ok(match Type::from_u16(type_) {
            Some(Type::As2) => Self::As2 {
                admin: src.get_u16(),
                number: src.get_u32(),
            },
            Some(Type::Ipv4) => Self::Ipv4 {
                admin: Ipv4Addr::from(src.get_u32()),
                number: src.get_u16(),
            },
            Some(Type::As4) => Self::As4 {
                admin: src.get_u32(),
                number: src.get_u16(),
            },
            None => {
                let mut value = [0; 6];
                src.copy_to_slice(&mut value);
                Self::Unknown { type_, value }
            }
        })
    }

    /// Encode only the six value octets
    pub fn value_to_bytes(self, dst: &mut BytesMut) -> usize {
        match self {
            Self::As2 { admin, number } => {
                dst.put_u16(admin);
                dst.put_u32(number);
            }
            Self::Ipv4 { admin, number } => {
                dst.put_u32(admin.into());
                dst.put_u16(number);
            }
            Self::As4 { admin, number } => {
                dst.put_u32(admin);
                dst.put_u16(number);
            }
            Self::Unknown { value, .. } => dst.put_slice(&value),
        }
        6
    }
}

impl Component for RouteDistinguisher {
    fn from_bytes(src: &mut Bytes) -> Result<Self, crate::Error> {
        if src.remaining() < RD_LENGTH {
            return Err(crate::Error::InternalLength(
                "route distinguisher",
                std::cmp::Ordering::Less,
            ));
        }
        let type_ = src.get_u16();
        let mut value = src.split_to(6);
        Self::from_parts(type_, &mut value)
    }

    fn to_bytes(self, dst: &mut BytesMut) -> usize {
        dst.put_u16(self.type_code());
        2 + self.value_to_bytes(dst)
    }

    fn encoded_len(&self) -> usize {
        RD_LENGTH
    }
}

impl fmt::Display for RouteDistinguisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::As2 { admin, number } => write!(f, "{admin}:{number}"),
            Self::Ipv4 { admin, number } => write!(f, "{admin}:{number}"),
            Self::As4 { admin, number } => write!(f, "{admin}:{number}"),
            Self::Unknown { type_, value } => write!(f, "raw:{type_}:{value:02x?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::hex_to_bytes;

    #[test]
    fn test_as2_value_decode() {
        let mut src = hex_to_bytes("0004 00000001");
        let rd = RouteDistinguisher::from_parts(Type::As2 as u16, &mut src).unwrap();
        assert_eq!(
            rd,
            RouteDistinguisher::As2 {
                admin: 4,
                number: 1
            }
        );
    }

    #[test]
    fn test_as4_value_encode() {
        let rd = RouteDistinguisher::As4 {
            admin: 65535,
            number: 1,
        };
        let mut dst = BytesMut::new();
        assert_eq!(rd.value_to_bytes(&mut dst), 6);
        assert_eq!(dst.freeze(), hex_to_bytes("0000ffff 0001"));
    }

    #[test]
    fn test_roundtrip_all_types() {
        let rds = [
            RouteDistinguisher::As2 {
                admin: 65000,
                number: 7,
            },
            RouteDistinguisher::Ipv4 {
                admin: Ipv4Addr::new(192, 0, 2, 1),
                number: 42,
            },
            RouteDistinguisher::As4 {
                admin: 4_242_420_893,
                number: 9,
            },
            RouteDistinguisher::Unknown {
                type_: 17,
                value: [1, 2, 3, 4, 5, 6],
            },
        ];
        for rd in rds {
            let mut dst = BytesMut::new();
            assert_eq!(rd.to_bytes(&mut dst), RD_LENGTH);
            let mut src = dst.freeze();
            assert_eq!(RouteDistinguisher::from_bytes(&mut src).unwrap(), rd);
        }
    }

    #[test]
    fn test_display() {
        let rd = RouteDistinguisher::Ipv4 {
            admin: Ipv4Addr::new(10, 0, 0, 1),
            number: 3,
        };
        assert_eq!(rd.to_string(), "10.0.0.1:3");
    }
}
