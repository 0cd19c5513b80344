//! mpbgp -- a multiprotocol BGP-4 codec and routing information base
//!
//! Structs here intend to represent the data instead of the on-wire format.
//! The wire side is a [`Component`](endec::Component) per protocol element
//! plus a framer ([`Codec`]) that turns a TCP byte stream into [`Message`]s;
//! the routing side is a per-family longest-prefix-match tree ([`rib`]) with
//! the comparison, filtering and default-attribute plumbing ([`filter`])
//! needed to move routes between bases.

// SPDX-License-Identifier: AGPL-3.0-or-later

pub mod capability;
pub mod cidr;
mod endec;
pub mod filter;
pub mod path;
pub mod rd;
pub mod refresh;
pub mod rib;
pub mod route;
mod update_builder;

#[cfg(feature = "tokio-endec")]
pub use endec::BgpCodec as Codec;
pub use update_builder::UpdateBuilder;

use bytes::{Buf, BufMut, Bytes};
use capability::{Afi, Capabilities, OptionalParameters, Safi};
use endec::Component;
use enum_primitive_derive::Primitive;
use num_traits::FromPrimitive;
use path::PathAttributes;
use refresh::RouteRefresh;
use route::Routes;
use std::net::Ipv4Addr;

/// Supported BGP version
pub const BGP_VERSION: u8 = 4;

/// ASN for AS4
pub const AS_TRANS: u16 = 23456;

/// BGP marker
pub const MARKER: [u8; 16] = [
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
];

/// Smallest valid message length (marker, length, and type with no body)
pub const MIN_MESSAGE_LENGTH: u16 = 19;

/// Largest valid message length
pub const MAX_MESSAGE_LENGTH: u16 = 4096;

/// Check if the remaining buffer length is enough for the expected length
#[macro_export]
macro_rules! check_remaining_len {
    ($src:expr, $len:expr, $name:expr) => {
        let cmp = $src.remaining().cmp(&$len);
        if cmp != std::cmp::Ordering::Equal {
            return Err($crate::Error::InternalLength($name, cmp));
        }
    };
}

/// BGP packet errors
///
/// Decode errors that must be answered with a NOTIFICATION carry the raw
/// offending bytes, so the NOTIFICATION payload can be rebuilt from the
/// error value alone (see [`Error::to_notification`]).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid or missing marker")]
    Marker,
    #[error("message length {0} outside the valid range")]
    Length(u16),
    #[error("invalid message type {0}")]
    MessageType(u8),
    #[error("unsupported BGP version {0}")]
    Version(u8),
    #[error("BGP identifier {0} is not a unicast address")]
    BgpIdentifier(Ipv4Addr),
    #[error("unsupported optional parameter {0}")]
    OptionalParameter(u8, Bytes),
    #[error("malformed {0} capability value")]
    CapabilityLength(&'static str, Bytes),
    #[error("malformed {0} attribute value")]
    AttributeLength(&'static str, Bytes),
    #[error("invalid origin {0}")]
    Origin(u8),
    #[error("invalid next hop attribute")]
    NextHop(Bytes),
    #[error("invalid internal length at {0} ({1:?})")]
    InternalLength(&'static str, std::cmp::Ordering),
    #[error("invalid {0} type of {1}")]
    InternalType(&'static str, u16),
    #[error("requires MP-BGP capability")]
    NoMpBgp,
    #[error("attempting to update NLRI without next hop")]
    NoNextHop,
}

impl Error {
    /// Map a decode error to the NOTIFICATION that answers it.
    ///
    /// Framing and OPEN/UPDATE errors have a defined error code, subcode and
    /// data payload; errors that never cross the wire (I/O, builder misuse,
    /// internal consistency) map to `None`.
    #[must_use]
    pub fn to_notification(&self) -> Option<Notification> {
        match self {
            Self::Marker => Some(Notification::new(
                NotificationErrorCode::MessageHeaderError,
                MessageHeaderErrorSubcode::ConnectionNotSynchronized as u8,
                Bytes::new(),
            )),
            Self::Length(len) => Some(Notification::bad_message_length(*len)),
            Self::MessageType(type_) => Some(Notification::bad_message_type(*type_)),
            Self::Version(_) => Some(Notification::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::UnsupportedVersionNumber as u8,
                // Data is the largest version this speaker supports
                Bytes::copy_from_slice(&u16::from(BGP_VERSION).to_be_bytes()),
            )),
            Self::BgpIdentifier(_) => Some(Notification::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::BadBgpIdentifier as u8,
                Bytes::new(),
            )),
            Self::OptionalParameter(_, raw) => Some(Notification::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::UnsupportedOptionalParameter as u8,
                raw.clone(),
            )),
            Self::CapabilityLength(_, raw) => Some(Notification::new(
                NotificationErrorCode::OpenMessageError,
                OpenMessageErrorSubcode::UnsupportedCapability as u8,
                raw.clone(),
            )),
            Self::AttributeLength(_, raw) => Some(Notification::new(
                NotificationErrorCode::UpdateMessageError,
                UpdateMessageErrorSubcode::AttributeLengthError as u8,
                raw.clone(),
            )),
            Self::Origin(value) => Some(Notification::new(
                NotificationErrorCode::UpdateMessageError,
                UpdateMessageErrorSubcode::InvalidOriginAttribute as u8,
                Bytes::copy_from_slice(&[*value]),
            )),
            Self::NextHop(raw) => Some(Notification::new(
                NotificationErrorCode::UpdateMessageError,
                UpdateMessageErrorSubcode::InvalidNextHopAttribute as u8,
                raw.clone(),
            )),
            _ => None,
        }
    }
}

/// BGP message
#[derive(Clone, Debug, PartialEq)]
pub enum Message {
    Open(Open),
    Update(Update),
    Notification(Notification),
    Keepalive,
    RouteRefresh(RouteRefresh),
}

/// BGP open message
#[derive(Clone, Debug, PartialEq)]
pub struct Open {
    pub version: u8,
    pub asn: u16,
    pub hold_time: u16,
    pub bgp_id: Ipv4Addr,
    pub opt_params: OptionalParameters,
}

impl Component for Open {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let version = src.get_u8();
        if version != BGP_VERSION {
            return Err(Error::Version(version));
        }
        let asn = src.get_u16();
        let hold_time = src.get_u16();
        let bgp_id = Ipv4Addr::from(src.get_u32());
        // Identifiers inside 224.0.0.0/3 cannot name a speaker
        if u32::from(bgp_id) >> 29 == 0b111 {
            return Err(Error::BgpIdentifier(bgp_id));
        }
        let opt_params = OptionalParameters::from_bytes(src)?;
        Ok(Self {
            version,
            asn,
            hold_time,
            bgp_id,
            opt_params,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        len += self.version.to_bytes(dst);
        len += self.asn.to_bytes(dst);
        len += self.hold_time.to_bytes(dst);
        len += self.bgp_id.to_bytes(dst);
        len += self.opt_params.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        1 + 2 + 2 + 4 + self.opt_params.encoded_len()
    }
}

impl Open {
    /// Create a new BGP open message
    #[must_use]
    pub fn new_easy(asn: u32, hold_time: u16, bgp_id: Ipv4Addr, capabilities: Capabilities) -> Self {
        let oldbgp_asn = u16::try_from(asn).unwrap_or(AS_TRANS);
        Self {
            version: BGP_VERSION,
            asn: oldbgp_asn,
            hold_time,
            bgp_id,
            opt_params: vec![capability::OptionalParameterValue::Capabilities(
                capabilities,
            )]
            .into(),
        }
    }
}

/// BGP update message
///
/// The top-level withdrawn and NLRI fields only ever carry IPv4 unicast
/// prefixes; every other family travels in MP_REACH_NLRI/MP_UNREACH_NLRI
/// path attributes.
#[derive(Clone, Debug, PartialEq)]
pub struct Update {
    pub withdrawn_routes: Routes,
    pub path_attributes: PathAttributes,
    pub nlri: Routes,
}

impl Component for Update {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let withdrawn_len = src.get_u16() as usize;
        let mut wdr_buf = src.split_to(withdrawn_len);
        let withdrawn_routes = Routes::from_bytes(&mut wdr_buf)?;
        let tpa_len = src.get_u16() as usize;
        let mut tpa_buf = src.split_to(tpa_len);
        let path_attributes = PathAttributes::from_bytes(&mut tpa_buf)?;
        let nlri = Routes::from_bytes(src)?;
        Ok(Self {
            withdrawn_routes,
            path_attributes,
            nlri,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        let mut len = 0;
        let wdr_len_pos = dst.len();
        len += 0u16.to_bytes(dst); // Placeholder for withdrawn routes length
        let wdr_len = self.withdrawn_routes.to_bytes(dst);
        len += wdr_len;
        dst[wdr_len_pos..wdr_len_pos + 2].copy_from_slice(
            &(u16::try_from(wdr_len)
                .expect("Withdrawn routes length overflow")
                .to_be_bytes()),
        );
        let tpa_len_pos = dst.len();
        len += 0u16.to_bytes(dst); // Placeholder for total path attributes length
        let tpa_len = self.path_attributes.to_bytes(dst);
        len += tpa_len;
        dst[tpa_len_pos..tpa_len_pos + 2].copy_from_slice(
            &(u16::try_from(tpa_len)
                .expect("Total path attributes length overflow")
                .to_be_bytes()),
        );
        len += self.nlri.to_bytes(dst);
        len
    }

    fn encoded_len(&self) -> usize {
        2 + self.withdrawn_routes.encoded_len()
            + 2
            + self.path_attributes.encoded_len()
            + self.nlri.encoded_len()
    }
}

/// BGP notification message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub error_code: NotificationErrorCode,
    pub error_subcode: u8,
    pub data: Bytes,
}

impl Component for Notification {
    fn from_bytes(src: &mut Bytes) -> Result<Self, Error> {
        let error_code = src.get_u8();
        let error_subcode = src.get_u8();
        let data = src.copy_to_bytes(src.remaining());
        Ok(Self {
            error_code: NotificationErrorCode::from_u8(error_code)
                .ok_or(Error::InternalType("error_code", u16::from(error_code)))?,
            error_subcode,
            data,
        })
    }

    fn to_bytes(self, dst: &mut bytes::BytesMut) -> usize {
        (self.error_code as u8).to_bytes(dst);
        self.error_subcode.to_bytes(dst);
        dst.put_slice(&self.data);
        self.encoded_len()
    }

    fn encoded_len(&self) -> usize {
        2 + self.data.len()
    }
}

impl Notification {
    /// Create a new BGP notification message
    #[must_use]
    pub fn new(error_code: NotificationErrorCode, error_subcode: u8, data: Bytes) -> Self {
        Self {
            error_code,
            error_subcode,
            data,
        }
    }

    /// Message header error carrying the offending length
    #[must_use]
    pub fn bad_message_length(length: u16) -> Self {
        Self::new(
            NotificationErrorCode::MessageHeaderError,
            MessageHeaderErrorSubcode::BadMessageLength as u8,
            Bytes::copy_from_slice(&length.to_be_bytes()),
        )
    }

    /// Message header error carrying the offending type octet
    #[must_use]
    pub fn bad_message_type(type_: u8) -> Self {
        Self::new(
            NotificationErrorCode::MessageHeaderError,
            MessageHeaderErrorSubcode::BadMessageType as u8,
            Bytes::copy_from_slice(&[type_]),
        )
    }

    /// Cease notification carrying the family and the prefix upper bound
    #[must_use]
    pub fn maximum_prefixes_reached(afi: Afi, safi: Safi, upper_bound: u32) -> Self {
        let mut data = bytes::BytesMut::with_capacity(7);
        data.put_u16(afi as u16);
        data.put_u8(safi as u8);
        data.put_u32(upper_bound);
        Self::new(
            NotificationErrorCode::Cease,
            CeaseSubcode::MaximumNumberOfPrefixesReached as u8,
            data.freeze(),
        )
    }
}

/// Notification error codes
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum NotificationErrorCode {
    MessageHeaderError = 1,
    OpenMessageError = 2,
    UpdateMessageError = 3,
    HoldTimerExpired = 4,
    FiniteStateMachineError = 5,
    Cease = 6,
}

/// Notification error subcodes for MessageHeaderError
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum MessageHeaderErrorSubcode {
    ConnectionNotSynchronized = 1,
    BadMessageLength = 2,
    BadMessageType = 3,
}

/// Notification error subcodes for OpenMessageError
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum OpenMessageErrorSubcode {
    UnsupportedVersionNumber = 1,
    BadPeerAs = 2,
    BadBgpIdentifier = 3,
    UnsupportedOptionalParameter = 4,
    UnacceptableHoldTime = 6,
    UnsupportedCapability = 7,
}

/// Notification error subcodes for UpdateMessageError
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum UpdateMessageErrorSubcode {
    MalformedAttributeList = 1,
    UnrecognizedWellKnownAttribute = 2,
    MissingWellKnownAttribute = 3,
    AttributeFlagsError = 4,
    AttributeLengthError = 5,
    InvalidOriginAttribute = 6,
    AsRoutingLoop = 7,
    InvalidNextHopAttribute = 8,
    OptionalAttributeError = 9,
    InvalidNetworkField = 10,
    MalformedAsPath = 11,
}

/// Notification error subcodes for Cease
#[derive(Copy, Clone, Debug, PartialEq, Eq, Primitive)]
#[repr(u8)]
pub enum CeaseSubcode {
    MaximumNumberOfPrefixesReached = 1,
    AdministrativeShutdown = 2,
    PeerDeconfigured = 3,
    AdministrativeReset = 4,
    ConnectionRejected = 5,
    OtherConfigurationChange = 6,
    ConnectionCollisionResolution = 7,
    OutOfResources = 8,
}
