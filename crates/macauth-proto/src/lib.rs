//! RADIUS wire codec for MAC-based VLAN assignment
//!
//! Implements the subset of RFC 2865 and RFC 2868 a MAC-auth
//! authorization server needs: packet and attribute encoding, the
//! access request/accept/reject codes, VLAN tunnel attributes, and
//! the Response Authenticator construction.
//!
//! # Example
//!
//! ```rust
//! use macauth_proto::{Attribute, AttributeType, Code, Packet};
//! use macauth_proto::authenticator::request_authenticator;
//!
//! // An Access-Request as a MAC-auth NAS would send it
//! let mut packet = Packet::new(Code::AccessRequest, 1, request_authenticator());
//! packet.add_attribute(
//!     Attribute::string(AttributeType::UserName.as_u8(), "AABBCCDDEEFF").unwrap()
//! );
//! let bytes = packet.encode().unwrap();
//! ```

pub mod attribute;
pub mod authenticator;
pub mod code;
pub mod packet;

pub use attribute::{Attribute, AttributeType, TUNNEL_MEDIUM_IEEE_802, TUNNEL_TYPE_VLAN};
pub use authenticator::{request_authenticator, response_authenticator, verify_response_authenticator};
pub use code::Code;
pub use packet::{Packet, PacketError};
