//! UDP protocol listener
//!
//! One socket, one receive loop; each datagram is handled in a
//! spawned task. Concurrency is bounded downstream by the store pool,
//! so a slow store can never block the socket. Anything that fails
//! before a decision is reached is dropped silently: the NAS
//! retransmits the same identifier and content, so silence is a
//! recoverable outcome rather than an error to surface on the wire.

use crate::clients::TrustResolver;
use crate::engine::{normalize_mac, VlanPolicy};
use crate::store::{AuthzBackend, StoreError};
use macauth_proto::{response_authenticator, Attribute, AttributeType, Code, Packet, PacketError};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, error, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),
    #[error("Untrusted client: {0}")]
    UntrustedClient(std::net::IpAddr),
    #[error("Unsupported packet code: {0:?}")]
    UnsupportedCode(Code),
    #[error("Missing or unreadable User-Name attribute")]
    MissingUserName,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Process-wide dependencies handed to every request handler
///
/// Built once at startup; lifetime is process start to shutdown.
pub struct ServerContext {
    pub resolver: TrustResolver,
    pub backend: Arc<dyn AuthzBackend>,
    pub policy: VlanPolicy,
}

/// The RADIUS listener
pub struct RadiusServer {
    context: Arc<ServerContext>,
    socket: Arc<UdpSocket>,
}

impl RadiusServer {
    /// Bind the listening socket
    ///
    /// Bind failure is fatal; everything after this point keeps the
    /// listener alive.
    pub async fn bind(bind_addr: SocketAddr, context: ServerContext) -> Result<Self, ServerError> {
        let socket = UdpSocket::bind(bind_addr).await?;
        info!("RADIUS listener bound on {}", bind_addr);

        Ok(RadiusServer {
            context: Arc::new(context),
            socket: Arc::new(socket),
        })
    }

    /// Local socket address (tests bind port 0)
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.socket.local_addr().map_err(ServerError::from)
    }

    /// Receive loop; runs until the process exits
    pub async fn run(&self) -> Result<(), ServerError> {
        let mut buf = vec![0u8; Packet::MAX_PACKET_SIZE];

        loop {
            let (len, addr) = self.socket.recv_from(&mut buf).await?;
            let data = buf[..len].to_vec();

            let context = Arc::clone(&self.context);
            let socket = Arc::clone(&self.socket);

            tokio::spawn(async move {
                match Self::handle_request(data, addr, context, socket).await {
                    Ok(()) => {}
                    // Store failures are operational errors; everything
                    // else is a protocol-level drop.
                    Err(ServerError::Store(e)) => {
                        error!(client_ip = %addr.ip(), error = %e, "Request aborted, store failure");
                    }
                    Err(e) => {
                        warn!(client_ip = %addr.ip(), error = %e, "Dropped request");
                    }
                }
            });
        }
    }

    /// Handle one datagram: trust check, decode, decide, reply.
    ///
    /// Every error path before the decision produces no reply and no
    /// audit row.
    async fn handle_request(
        data: Vec<u8>,
        addr: SocketAddr,
        context: Arc<ServerContext>,
        socket: Arc<UdpSocket>,
    ) -> Result<(), ServerError> {
        let secret = context
            .resolver
            .resolve(addr.ip())
            .await
            .ok_or(ServerError::UntrustedClient(addr.ip()))?;

        let request = Packet::decode(&data)?;

        if request.code != Code::AccessRequest {
            return Err(ServerError::UnsupportedCode(request.code));
        }

        let presented = request
            .find_attribute(AttributeType::UserName.as_u8())
            .and_then(|attr| attr.as_string().ok())
            .ok_or(ServerError::MissingUserName)?;
        let mac = normalize_mac(&presented);
        if mac.is_empty() {
            return Err(ServerError::MissingUserName);
        }

        debug!(
            client_ip = %addr.ip(),
            request_id = request.identifier,
            mac = %mac,
            "Access-Request received"
        );

        let decision = context.backend.authorize(&mac, &context.policy).await?;

        info!(
            client_ip = %addr.ip(),
            request_id = request.identifier,
            mac = %mac,
            reply = decision.reply_label(),
            result = %decision.result_text(),
            "Decision"
        );

        let mut reply = Packet::new(decision.code(), request.identifier, [0u8; 16]);
        for attr in decision.reply_attributes()? {
            reply.add_attribute(attr);
        }
        Self::copy_proxy_state(&request, &mut reply);
        reply.authenticator = response_authenticator(&reply, &request.authenticator, &secret);

        socket.send_to(&reply.encode()?, addr).await?;

        debug!(
            client_ip = %addr.ip(),
            request_id = reply.identifier,
            reply = ?reply.code,
            "Reply sent"
        );

        Ok(())
    }

    /// Echo Proxy-State attributes back unmodified (RFC 2865 Section 5.33)
    fn copy_proxy_state(request: &Packet, reply: &mut Packet) {
        for attr in &request.attributes {
            if attr.attr_type == AttributeType::ProxyState.as_u8() {
                reply.add_attribute(Attribute {
                    attr_type: attr.attr_type,
                    value: attr.value.clone(),
                });
            }
        }
    }
}
