//! Request/Response Authenticator computation (RFC 2865 Section 3)
//!
//! MAC-auth carries no password material, so only the authenticator
//! MD5 construction is needed: the request authenticator is random,
//! the response authenticator binds the reply to the request and the
//! per-client shared secret.

use crate::packet::Packet;
use rand::Rng;

/// Generate a random Request Authenticator (16 bytes)
pub fn request_authenticator() -> [u8; 16] {
    let mut rng = rand::rng();
    let mut authenticator = [0u8; 16];
    rng.fill(&mut authenticator);
    authenticator
}

/// Calculate Response Authenticator per RFC 2865 Section 3
///
/// Response Authenticator = MD5(Code + ID + Length + Request Authenticator
/// + Attributes + Secret), used for Access-Accept and Access-Reject.
pub fn response_authenticator(
    packet: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> [u8; 16] {
    let mut data = Vec::with_capacity(packet.length() + secret.len());

    data.push(packet.code.as_u8());
    data.push(packet.identifier);

    let length = packet.length();
    data.push((length >> 8) as u8);
    data.push((length & 0xff) as u8);

    data.extend_from_slice(request_authenticator);

    for attr in &packet.attributes {
        // Attributes were validated at construction; encoding only
        // fails on oversized values which `Attribute::new` rejects.
        if let Ok(encoded) = attr.encode() {
            data.extend_from_slice(&encoded);
        }
    }

    data.extend_from_slice(secret);

    let digest = md5::compute(&data);
    let mut authenticator = [0u8; 16];
    authenticator.copy_from_slice(&digest.0);
    authenticator
}

/// Verify a reply's Response Authenticator against the originating
/// request's authenticator and the shared secret
pub fn verify_response_authenticator(
    response: &Packet,
    request_authenticator: &[u8; 16],
    secret: &[u8],
) -> bool {
    let calculated = response_authenticator(response, request_authenticator, secret);
    response.authenticator == calculated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::Code;

    #[test]
    fn test_request_authenticator_is_random() {
        let auth1 = request_authenticator();
        let auth2 = request_authenticator();
        assert_ne!(auth1, auth2);
    }

    #[test]
    fn test_response_authenticator_roundtrip() {
        let secret = b"sharedsecret";
        let request_auth = [1u8; 16];
        let mut packet = Packet::new(Code::AccessAccept, 42, [0u8; 16]);

        packet.authenticator = response_authenticator(&packet, &request_auth, secret);
        assert!(verify_response_authenticator(&packet, &request_auth, secret));
    }

    #[test]
    fn test_response_authenticator_wrong_secret() {
        let request_auth = [1u8; 16];
        let mut packet = Packet::new(Code::AccessReject, 7, [0u8; 16]);

        packet.authenticator = response_authenticator(&packet, &request_auth, b"secret-a");
        assert!(!verify_response_authenticator(
            &packet,
            &request_auth,
            b"secret-b"
        ));
    }
}
