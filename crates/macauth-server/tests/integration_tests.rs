//! End-to-end tests over a real UDP socket
//!
//! A server is started against the in-memory backend, then driven
//! with the same datagrams a MAC-auth NAS would send. Silence (no
//! reply before the timeout) is itself an asserted outcome, since
//! untrusted and failing requests must produce neither a reply nor an
//! audit row.

use macauth_proto::{
    request_authenticator, verify_response_authenticator, Attribute, AttributeType, Code, Packet,
    TUNNEL_MEDIUM_IEEE_802, TUNNEL_TYPE_VLAN,
};
use macauth_server::config::{ClientSpec, Config};
use macauth_server::{MemoryBackend, RadiusServer, ServerContext, TrustResolver};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

const SECRET: &[u8] = b"testing123";

fn test_config(allowed_clients: Vec<ClientSpec>) -> Config {
    Config {
        db_host: "db".to_string(),
        db_port: 3306,
        db_user: "radiususer".to_string(),
        db_password: "radiuspass".to_string(),
        db_name: "radius".to_string(),
        db_pool_size: 5,
        db_connect_timeout: 10,
        db_startup_timeout: 60,
        db_acquire_retries: 3,
        radius_port: 1812,
        secret: "testing123".to_string(),
        allowed_clients,
        allow_local_subnet: false,
        default_vlan: "505".to_string(),
        denied_vlan: "999".to_string(),
        health_port: 8080,
        log_level: "info".to_string(),
    }
}

fn loopback_trusted() -> Vec<ClientSpec> {
    vec![ClientSpec::Exact {
        addr: "127.0.0.1".parse().unwrap(),
        secret: "testing123".to_string(),
    }]
}

/// Start a server on an OS-assigned port; returns its address and the
/// shared backend for registry/audit assertions.
async fn start_server(allowed_clients: Vec<ClientSpec>) -> (SocketAddr, Arc<MemoryBackend>) {
    let config = test_config(allowed_clients);
    let backend = Arc::new(MemoryBackend::new());

    let authz: Arc<dyn macauth_server::AuthzBackend> = backend.clone();
    let context = ServerContext {
        resolver: TrustResolver::from_config(&config),
        backend: authz,
        policy: config.policy(),
    };

    let server = RadiusServer::bind("127.0.0.1:0".parse().unwrap(), context)
        .await
        .expect("bind server");
    let addr = server.local_addr().expect("local addr");

    tokio::spawn(async move {
        let _ = server.run().await;
    });

    (addr, backend)
}

fn access_request(mac: &str, identifier: u8) -> ([u8; 16], Packet) {
    let req_auth = request_authenticator();
    let mut packet = Packet::new(Code::AccessRequest, identifier, req_auth);
    packet.add_attribute(
        Attribute::string(AttributeType::UserName.as_u8(), mac).expect("User-Name attribute"),
    );
    (req_auth, packet)
}

async fn send_and_receive(packet: &Packet, server: SocketAddr) -> Option<Packet> {
    let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind client");
    socket
        .send_to(&packet.encode().expect("encode"), server)
        .await
        .expect("send");

    let mut buf = [0u8; 4096];
    match timeout(Duration::from_millis(500), socket.recv_from(&mut buf)).await {
        Ok(Ok((len, _))) => Some(Packet::decode(&buf[..len]).expect("decode reply")),
        _ => None,
    }
}

fn tunnel_group_id(reply: &Packet) -> Option<String> {
    reply
        .find_attribute(AttributeType::TunnelPrivateGroupId.as_u8())
        .and_then(|attr| attr.as_string().ok())
}

#[tokio::test]
async fn test_registered_mac_gets_its_vlan() {
    let (addr, backend) = start_server(loopback_trusted()).await;
    backend.register("AABBCCDDEEFF", "30");

    let (req_auth, request) = access_request("AABBCCDDEEFF", 7);
    let reply = send_and_receive(&request, addr).await.expect("a reply");

    assert_eq!(reply.code, Code::AccessAccept);
    assert_eq!(reply.identifier, 7);
    assert!(verify_response_authenticator(&reply, &req_auth, SECRET));

    assert_eq!(tunnel_group_id(&reply).as_deref(), Some("30"));
    let tunnel_type = reply
        .find_attribute(AttributeType::TunnelType.as_u8())
        .unwrap()
        .as_tagged_integer()
        .unwrap();
    assert_eq!(tunnel_type, (0, TUNNEL_TYPE_VLAN));
    let tunnel_medium = reply
        .find_attribute(AttributeType::TunnelMediumType.as_u8())
        .unwrap()
        .as_tagged_integer()
        .unwrap();
    assert_eq!(tunnel_medium, (0, TUNNEL_MEDIUM_IEEE_802));

    let rows = backend.audit_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].mac_address, "AABBCCDDEEFF");
    assert_eq!(rows[0].reply, "Access-Accept");
    assert_eq!(rows[0].result, "Assigned to VLAN 30");
}

#[tokio::test]
async fn test_denied_vlan_is_rejected() {
    let (addr, backend) = start_server(loopback_trusted()).await;
    backend.register("112233445566", "999");

    let (req_auth, request) = access_request("112233445566", 9);
    let reply = send_and_receive(&request, addr).await.expect("a reply");

    assert_eq!(reply.code, Code::AccessReject);
    assert!(verify_response_authenticator(&reply, &req_auth, SECRET));
    assert!(tunnel_group_id(&reply).is_none());
    assert!(reply
        .find_attribute(AttributeType::TunnelType.as_u8())
        .is_none());

    let rows = backend.audit_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reply, "Access-Reject");
    assert_eq!(rows[0].result, "Denied due to VLAN 999");
}

#[tokio::test]
async fn test_unknown_mac_lands_on_fallback_vlan() {
    let (addr, backend) = start_server(loopback_trusted()).await;

    let (req_auth, request) = access_request("FFEEDDCCBBAA", 3);
    let reply = send_and_receive(&request, addr).await.expect("a reply");

    assert_eq!(reply.code, Code::AccessAccept);
    assert!(verify_response_authenticator(&reply, &req_auth, SECRET));
    assert_eq!(tunnel_group_id(&reply).as_deref(), Some("505"));

    let rows = backend.audit_rows();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].reply, "Accept-Fallback");
    assert_eq!(rows[0].result, "Assigned to fallback VLAN 505");
}

#[tokio::test]
async fn test_mac_separators_are_normalized() {
    let (addr, backend) = start_server(loopback_trusted()).await;
    backend.register("AABBCCDDEEFF", "30");

    let (_, request) = access_request("aa:bb:cc:dd:ee:ff", 1);
    let reply = send_and_receive(&request, addr).await.expect("a reply");
    assert_eq!(reply.code, Code::AccessAccept);
    assert_eq!(tunnel_group_id(&reply).as_deref(), Some("30"));

    // Audit records the canonical form
    assert_eq!(backend.audit_rows()[0].mac_address, "AABBCCDDEEFF");
}

#[tokio::test]
async fn test_untrusted_source_gets_silence_and_no_audit_row() {
    // Resolver trusts nobody: no entries, local-subnet trust off
    let (addr, backend) = start_server(Vec::new()).await;
    backend.register("AABBCCDDEEFF", "30");

    let (_, request) = access_request("AABBCCDDEEFF", 5);
    assert!(send_and_receive(&request, addr).await.is_none());
    assert!(backend.audit_rows().is_empty());

    // Repeating the attempt is an idempotent no-op
    assert!(send_and_receive(&request, addr).await.is_none());
    assert!(backend.audit_rows().is_empty());
}

#[tokio::test]
async fn test_non_access_request_is_ignored() {
    let (addr, backend) = start_server(loopback_trusted()).await;

    let mut packet = Packet::new(Code::AccessAccept, 1, request_authenticator());
    packet.add_attribute(
        Attribute::string(AttributeType::UserName.as_u8(), "AABBCCDDEEFF").unwrap(),
    );
    assert!(send_and_receive(&packet, addr).await.is_none());
    assert!(backend.audit_rows().is_empty());
}

#[tokio::test]
async fn test_missing_user_name_is_dropped() {
    let (addr, backend) = start_server(loopback_trusted()).await;

    let packet = Packet::new(Code::AccessRequest, 2, request_authenticator());
    assert!(send_and_receive(&packet, addr).await.is_none());
    assert!(backend.audit_rows().is_empty());
}

#[tokio::test]
async fn test_malformed_datagram_is_dropped() {
    let (addr, backend) = start_server(loopback_trusted()).await;

    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    socket.send_to(&[0xff; 10], addr).await.unwrap();

    let mut buf = [0u8; 64];
    let got = timeout(Duration::from_millis(500), socket.recv_from(&mut buf)).await;
    assert!(got.is_err());
    assert!(backend.audit_rows().is_empty());
}

#[tokio::test]
async fn test_store_outage_drops_request_and_recovers() {
    let (addr, backend) = start_server(loopback_trusted()).await;
    backend.register("AABBCCDDEEFF", "30");

    backend.set_unavailable(true);
    let (_, request) = access_request("AABBCCDDEEFF", 11);
    assert!(send_and_receive(&request, addr).await.is_none());
    assert!(backend.audit_rows().is_empty());

    // The listener stays up; requests succeed once the store recovers
    backend.set_unavailable(false);
    let (_, request) = access_request("AABBCCDDEEFF", 12);
    let reply = send_and_receive(&request, addr).await.expect("a reply");
    assert_eq!(reply.code, Code::AccessAccept);
    assert_eq!(backend.audit_rows().len(), 1);
}

#[tokio::test]
async fn test_proxy_state_is_echoed() {
    let (addr, _backend) = start_server(loopback_trusted()).await;

    let (_, mut request) = access_request("FFEEDDCCBBAA", 4);
    request.add_attribute(
        Attribute::new(AttributeType::ProxyState.as_u8(), vec![0xde, 0xad]).unwrap(),
    );

    let reply = send_and_receive(&request, addr).await.expect("a reply");
    let echoed = reply
        .find_attribute(AttributeType::ProxyState.as_u8())
        .expect("Proxy-State echoed");
    assert_eq!(echoed.value, vec![0xde, 0xad]);
}

#[tokio::test]
async fn test_concurrent_requests_each_get_one_audit_row() {
    let (addr, backend) = start_server(loopback_trusted()).await;
    backend.register("AABBCCDDEEFF", "30");

    let mut handles = Vec::new();
    for id in 0..8u8 {
        let (_, request) = access_request("AABBCCDDEEFF", id);
        handles.push(tokio::spawn(
            async move { send_and_receive(&request, addr).await },
        ));
    }

    for handle in handles {
        let reply = handle.await.unwrap().expect("a reply");
        assert_eq!(reply.code, Code::AccessAccept);
    }
    assert_eq!(backend.audit_rows().len(), 8);
}
