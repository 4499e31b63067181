//! VLAN decision logic
//!
//! A MAC is either registered with a VLAN, registered with the denied
//! sentinel VLAN, or unknown. Unknown devices are not rejected: they
//! land on the fallback VLAN so a freshly racked or misconfigured
//! device still gets segregated connectivity. The decision itself is a
//! pure function; the store backend runs it inside the transaction
//! that also writes the audit row.

use macauth_proto::{
    Attribute, AttributeType, Code, PacketError, TUNNEL_MEDIUM_IEEE_802, TUNNEL_TYPE_VLAN,
};

/// VLAN policy parameters carved out of the configuration
#[derive(Debug, Clone)]
pub struct VlanPolicy {
    /// VLAN assigned to MACs absent from the registry
    pub default_vlan: String,
    /// Sentinel VLAN id whose presence means outright rejection
    pub denied_vlan: String,
}

/// Outcome of a single authorization decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// MAC registered with a usable VLAN
    Accept { vlan: String },
    /// MAC not registered; placed on the fallback VLAN
    AcceptFallback { vlan: String },
    /// MAC registered with the denied sentinel
    Reject { denied_vlan: String },
}

impl Decision {
    /// Evaluate the registry lookup result against the policy
    pub fn evaluate(lookup: Option<String>, policy: &VlanPolicy) -> Self {
        match lookup {
            Some(vlan) if vlan == policy.denied_vlan => Decision::Reject { denied_vlan: vlan },
            Some(vlan) => Decision::Accept { vlan },
            None => Decision::AcceptFallback {
                vlan: policy.default_vlan.clone(),
            },
        }
    }

    /// RADIUS reply code for this decision
    pub fn code(&self) -> Code {
        match self {
            Decision::Accept { .. } | Decision::AcceptFallback { .. } => Code::AccessAccept,
            Decision::Reject { .. } => Code::AccessReject,
        }
    }

    /// Value recorded in the audit table's `reply` column
    ///
    /// `Accept-Fallback` distinguishes unregistered devices from
    /// registered ones in the reporting views even though both are
    /// Access-Accept on the wire.
    pub fn reply_label(&self) -> &'static str {
        match self {
            Decision::Accept { .. } => "Access-Accept",
            Decision::AcceptFallback { .. } => "Accept-Fallback",
            Decision::Reject { .. } => "Access-Reject",
        }
    }

    /// Human-readable explanation recorded in the audit table
    pub fn result_text(&self) -> String {
        match self {
            Decision::Accept { vlan } => format!("Assigned to VLAN {vlan}"),
            Decision::AcceptFallback { vlan } => format!("Assigned to fallback VLAN {vlan}"),
            Decision::Reject { denied_vlan } => format!("Denied due to VLAN {denied_vlan}"),
        }
    }

    /// Tunnel attributes for the reply packet (RFC 3580 Section 3.31)
    ///
    /// Accept paths carry the VLAN triple; rejects carry nothing.
    pub fn reply_attributes(&self) -> Result<Vec<Attribute>, PacketError> {
        let vlan = match self {
            Decision::Accept { vlan } | Decision::AcceptFallback { vlan } => vlan,
            Decision::Reject { .. } => return Ok(Vec::new()),
        };

        Ok(vec![
            Attribute::tagged_integer(AttributeType::TunnelType.as_u8(), 0, TUNNEL_TYPE_VLAN)?,
            Attribute::tagged_integer(
                AttributeType::TunnelMediumType.as_u8(),
                0,
                TUNNEL_MEDIUM_IEEE_802,
            )?,
            Attribute::string(AttributeType::TunnelPrivateGroupId.as_u8(), vlan.clone())?,
        ])
    }
}

/// Normalize a presented MAC address to its canonical form
///
/// Canonical form is uppercase hex with no separators, applied before
/// every registry lookup and audit write. Senders are inconsistent
/// about separators (`aa:bb:..`, `AA-BB-..`, Cisco `aabb.ccdd.eeff`),
/// so all three styles collapse to the same key.
pub fn normalize_mac(presented: &str) -> String {
    presented
        .trim()
        .chars()
        .filter(|c| !matches!(c, ':' | '-' | '.'))
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
