//! End-to-end tests for packet encryption between DHT identities.

use tox_dht::{
    crypto::{CryptoBackend, CryptoError, DefaultBackend, KeyPair, Nonce, PublicKey, SecretKey, SharedKey},
    dht::{
        DhtError, EncryptedPacket, GetNodesPacket, Identity, Node, Packet, PacketType,
        PingRequestPacket, PingResponsePacket, SendNodesPacket, WirePacket,
    },
};
use std::cell::Cell;

/// Default backend that counts how often key agreement runs.
#[derive(Default)]
struct CountingBackend {
    inner: DefaultBackend,
    precomputes: Cell<usize>,
}

impl CountingBackend {
    fn precomputes(&self) -> usize {
        self.precomputes.get()
    }
}

impl CryptoBackend for CountingBackend {
    fn generate_keypair(&self) -> Result<KeyPair, CryptoError> {
        self.inner.generate_keypair()
    }

    fn precompute(&self, public_key: &PublicKey, secret_key: &SecretKey) -> SharedKey {
        self.precomputes.set(self.precomputes.get() + 1);
        self.inner.precompute(public_key, secret_key)
    }

    fn encrypt(&self, plaintext: &[u8], shared_key: &SharedKey) -> Result<(Vec<u8>, Nonce), CryptoError> {
        self.inner.encrypt(plaintext, shared_key)
    }

    fn decrypt(&self, ciphertext: &[u8], shared_key: &SharedKey, nonce: &Nonce) -> Result<Vec<u8>, CryptoError> {
        self.inner.decrypt(ciphertext, shared_key, nonce)
    }

    fn generate_ping_id(&self) -> u64 {
        self.inner.generate_ping_id()
    }
}

fn counting_identity(cache_size: usize) -> Identity<CountingBackend> {
    Identity::generate(CountingBackend::default(), cache_size).expect("Failed to create identity")
}

/// Sends `packet` from `sender` to `receiver` through the wire encoding.
fn transmit(sender: &mut Identity, receiver: &mut Identity, packet: Packet) -> Result<Packet, DhtError> {
    let receiver_key = *receiver.public_key();
    let envelope = sender.encrypt_packet(packet, &receiver_key)?;
    let datagram = envelope.marshal();

    let received = EncryptedPacket::unmarshal(&datagram)?;
    receiver.decrypt_packet(&received)
}

/// 测试两个身份之间所有包类型的加解密
#[test]
fn test_encrypt_decrypt_all_kinds() {
    let mut alice = Identity::new().expect("Failed to create alice");
    let mut bob = Identity::new().expect("Failed to create bob");

    let node = Node::from_addr("198.51.100.7:33445".parse().unwrap(), false, *alice.public_key());
    let packets: Vec<Packet> = vec![
        GetNodesPacket { public_key: *bob.public_key(), ping_id: 1 }.into(),
        SendNodesPacket { nodes: vec![node], ping_id: 2 }.into(),
        PingRequestPacket { ping_id: 3 }.into(),
        PingResponsePacket { ping_id: 4 }.into(),
    ];

    for packet in packets {
        let received = transmit(&mut alice, &mut bob, packet.clone()).expect("Failed to transmit packet");
        assert_eq!(received, packet);
    }
}

/// 同一个公钥预计算两次结果相同，且底层原语只调用一次
#[test]
fn test_precompute_is_cached() {
    let mut identity = counting_identity(16);
    let peer = DefaultBackend.generate_keypair().unwrap();

    let first = identity.precompute_key(&peer.public);
    let second = identity.precompute_key(&PublicKey(peer.public.0));

    assert_eq!(first.as_bytes(), second.as_bytes());
    assert_eq!(identity.backend().precomputes(), 1);
    assert_eq!(identity.cached_keys(), 1);

    // 加密同样走缓存
    identity.encrypt_packet(PingRequestPacket { ping_id: 1 }, &peer.public).unwrap();
    assert_eq!(identity.backend().precomputes(), 1);
}

#[test]
fn test_precompute_without_cache() {
    let mut identity = counting_identity(0);
    let peer = DefaultBackend.generate_keypair().unwrap();

    let first = identity.precompute_key(&peer.public);
    let second = identity.precompute_key(&peer.public);

    assert_eq!(first, second);
    assert_eq!(identity.backend().precomputes(), 2);
}

/// 测试 LRU 淘汰最久未使用的共享密钥
#[test]
fn test_shared_key_cache_evicts_least_recently_used() {
    let mut identity = counting_identity(2);
    let k1 = PublicKey([1u8; 32]);
    let k2 = PublicKey([2u8; 32]);
    let k3 = PublicKey([3u8; 32]);

    identity.precompute_key(&k1);
    identity.precompute_key(&k2);
    identity.precompute_key(&k1);
    assert_eq!(identity.backend().precomputes(), 2);

    // k2 是最久未使用的，会被淘汰
    identity.precompute_key(&k3);
    assert_eq!(identity.backend().precomputes(), 3);
    assert_eq!(identity.cached_keys(), 2);

    identity.precompute_key(&k1);
    assert_eq!(identity.backend().precomputes(), 3);

    identity.precompute_key(&k2);
    assert_eq!(identity.backend().precomputes(), 4);
}

#[test]
fn test_tampered_payload_is_crypto_failure() {
    let mut alice = Identity::new().unwrap();
    let mut bob = Identity::new().unwrap();

    let mut envelope = alice
        .encrypt_packet(PingRequestPacket { ping_id: 9 }, bob.public_key())
        .unwrap();
    let last = envelope.payload.len() - 1;
    envelope.payload[last] ^= 0x80;

    assert_eq!(bob.decrypt_packet(&envelope), Err(DhtError::CryptoFailure));
}

#[test]
fn test_wrong_recipient_is_crypto_failure() {
    let mut alice = Identity::new().unwrap();
    let bob = Identity::new().unwrap();
    let mut eve = Identity::new().unwrap();

    let envelope = alice
        .encrypt_packet(GetNodesPacket { public_key: *eve.public_key(), ping_id: 1 }, bob.public_key())
        .unwrap();

    assert_eq!(eve.decrypt_packet(&envelope), Err(DhtError::CryptoFailure));
}

/// 未知类型在任何加密操作之前就被拒绝
#[test]
fn test_unknown_packet_type() {
    let mut alice = Identity::new().unwrap();
    let mut bob = counting_identity(16);

    let mut envelope = alice
        .encrypt_packet(PingRequestPacket { ping_id: 1 }, bob.public_key())
        .unwrap();
    envelope.tag = 3;

    assert_eq!(bob.decrypt_packet(&envelope), Err(DhtError::UnknownPacketType(3)));
    assert_eq!(bob.backend().precomputes(), 0);
}

#[test]
fn test_malformed_plaintext() {
    let mut alice = Identity::new().unwrap();
    let mut bob = Identity::new().unwrap();
    let bob_key = *bob.public_key();

    let (payload, nonce) = alice.encrypt_blob(&[1, 2, 3], &bob_key).unwrap();
    let envelope = EncryptedPacket {
        tag: PacketType::GetNodes as u8,
        sender_public_key: *alice.public_key(),
        nonce,
        payload,
    };

    assert!(matches!(bob.decrypt_packet(&envelope), Err(DhtError::MalformedPacket(_))));
}

/// 把请求重新标记为响应发送，应当被识别为协议违规
#[test]
fn test_request_relabelled_as_response() {
    let mut alice = Identity::new().unwrap();
    let mut bob = Identity::new().unwrap();
    let bob_key = *bob.public_key();

    let mut envelope = alice
        .encrypt_packet(PingRequestPacket { ping_id: 5 }, &bob_key)
        .unwrap();
    envelope.tag = PacketType::PingResponse as u8;

    assert!(matches!(bob.decrypt_packet(&envelope), Err(DhtError::ProtocolViolation(_))));
}

#[test]
fn test_encrypt_rejects_oversized_send_nodes() {
    let mut alice = Identity::new().unwrap();
    let peer = *Identity::new().unwrap().public_key();

    let nodes = (0..5u8)
        .map(|i| Node::from_addr(format!("10.0.0.{}:33445", i).parse().unwrap(), false, PublicKey([i; 32])))
        .collect();
    let packet = SendNodesPacket { nodes, ping_id: 1 };

    assert!(matches!(
        alice.encrypt_packet(packet, &peer),
        Err(DhtError::ProtocolViolation(_))
    ));
}

#[test]
fn test_blob_roundtrip() {
    let mut alice = Identity::new().unwrap();
    let mut bob = Identity::new().unwrap();
    let alice_key = *alice.public_key();
    let bob_key = *bob.public_key();

    let message = b"relay handshake payload";
    let (ciphertext, nonce) = alice.encrypt_blob(message, &bob_key).unwrap();
    let plaintext = bob.decrypt_blob(&ciphertext, &alice_key, &nonce).unwrap();
    assert_eq!(plaintext, message);

    let wrong_nonce = Nonce([0u8; 24]);
    assert_eq!(
        bob.decrypt_blob(&ciphertext, &alice_key, &wrong_nonce),
        Err(DhtError::CryptoFailure)
    );
}

#[test]
fn test_encrypted_payload_hides_plaintext() {
    let mut alice = Identity::new().unwrap();
    let bob = Identity::new().unwrap();

    let packet = GetNodesPacket { public_key: PublicKey([0x5a; 32]), ping_id: 77 };
    let plaintext = packet.marshal().unwrap();
    let envelope = alice.encrypt_packet(packet, bob.public_key()).unwrap();

    assert_ne!(envelope.payload, plaintext);
    assert!(envelope.payload.len() > plaintext.len(), "Payload should carry an authentication tag");
}
