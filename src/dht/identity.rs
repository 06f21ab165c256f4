use crate::crypto::{CryptoBackend, DefaultBackend, KeyPair, Nonce, PublicKey, SharedKey};
use crate::dht::packets::{EncryptedPacket, Packet, PacketType};
use crate::dht::DhtError;
use crate::utils::DhtConfig;
use log::{debug, trace};
use lru::LruCache;
use std::convert::TryFrom;
use std::num::NonZeroUsize;

/// 默认缓存共享密钥的节点数量
pub const DEFAULT_SHARED_KEY_CACHE_SIZE: usize = 256;

/// DHT 身份：长期密钥对以及与其他节点通信所用的加密能力
///
/// 身份内部不做同步。所有修改操作都需要 `&mut self`，多个任务共享同一个
/// 身份时，调用方需要自行加锁，或者让所有数据包经由唯一的持有者处理。
pub struct Identity<B: CryptoBackend = DefaultBackend> {
    keypair: KeyPair,
    backend: B,
    /// 共享密钥缓存，None 表示禁用缓存
    shared_keys: Option<LruCache<PublicKey, SharedKey>>,
}

impl Identity<DefaultBackend> {
    /// 使用新生成的密钥对创建身份
    pub fn new() -> Result<Self, DhtError> {
        Self::generate(DefaultBackend, DEFAULT_SHARED_KEY_CACHE_SIZE)
    }

    /// 按配置中的缓存大小创建身份
    pub fn from_config(config: &DhtConfig) -> Result<Self, DhtError> {
        Self::generate(DefaultBackend, config.shared_key_cache_size)
    }
}

impl<B: CryptoBackend> Identity<B> {
    /// 使用已有的密钥对创建身份
    ///
    /// `cache_size` 为 0 时禁用共享密钥缓存。
    pub fn with_backend(backend: B, keypair: KeyPair, cache_size: usize) -> Self {
        Self {
            keypair,
            backend,
            shared_keys: NonZeroUsize::new(cache_size).map(LruCache::new),
        }
    }

    /// 使用 `backend` 生成的密钥对创建身份
    pub fn generate(backend: B, cache_size: usize) -> Result<Self, DhtError> {
        let keypair = backend.generate_keypair()?;
        Ok(Self::with_backend(backend, keypair, cache_size))
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.keypair.public
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// 当前缓存的共享密钥数量
    pub fn cached_keys(&self) -> usize {
        self.shared_keys.as_ref().map_or(0, |cache| cache.len())
    }

    /// 返回与 `public_key` 的共享密钥，未命中缓存时计算并缓存
    pub fn precompute_key(&mut self, public_key: &PublicKey) -> SharedKey {
        let cache = match self.shared_keys.as_mut() {
            Some(cache) => cache,
            None => return self.backend.precompute(public_key, &self.keypair.secret),
        };

        if let Some(shared_key) = cache.get(public_key) {
            return *shared_key;
        }

        trace!("Shared key cache miss for {:?}", public_key);
        let shared_key = self.backend.precompute(public_key, &self.keypair.secret);
        if let Some((evicted, _)) = cache.push(*public_key, shared_key) {
            trace!("Evicted shared key for {:?}", evicted);
        }

        shared_key
    }

    /// 为 `public_key` 加密数据包并封装成信封
    pub fn encrypt_packet<P>(
        &mut self,
        packet: P,
        public_key: &PublicKey,
    ) -> Result<EncryptedPacket, DhtError>
    where
        P: Into<Packet>,
    {
        let packet = packet.into();
        let plaintext = packet.marshal()?;
        let (payload, nonce) = self.encrypt_blob(&plaintext, public_key)?;

        Ok(EncryptedPacket {
            tag: packet.packet_type() as u8,
            sender_public_key: self.keypair.public,
            nonce,
            payload,
        })
    }

    /// 验证并解码从网络收到的信封
    pub fn decrypt_packet(&mut self, envelope: &EncryptedPacket) -> Result<Packet, DhtError> {
        // 先确定包类型，再做任何加密操作
        let packet_type = PacketType::try_from(envelope.tag).map_err(|e| {
            debug!(
                "Dropping packet with unknown type {} from {:?}",
                envelope.tag, envelope.sender_public_key
            );
            e
        })?;

        let plaintext = self
            .decrypt_blob(&envelope.payload, &envelope.sender_public_key, &envelope.nonce)
            .map_err(|e| {
                debug!(
                    "Failed to open {} packet from {:?}",
                    packet_type, envelope.sender_public_key
                );
                e
            })?;

        Packet::unmarshal(packet_type, &plaintext).map_err(|e| {
            debug!(
                "Rejected {} packet from {:?}: {}",
                packet_type, envelope.sender_public_key, e
            );
            e
        })
    }

    /// 为 `public_key` 加密原始字节，不带 DHT 包格式
    pub fn encrypt_blob(
        &mut self,
        plaintext: &[u8],
        public_key: &PublicKey,
    ) -> Result<(Vec<u8>, Nonce), DhtError> {
        let shared_key = self.precompute_key(public_key);
        let sealed = self.backend.encrypt(plaintext, &shared_key)?;
        Ok(sealed)
    }

    /// 解密来自 `public_key` 的原始字节
    pub fn decrypt_blob(
        &mut self,
        ciphertext: &[u8],
        public_key: &PublicKey,
        nonce: &Nonce,
    ) -> Result<Vec<u8>, DhtError> {
        let shared_key = self.precompute_key(public_key);
        let plaintext = self.backend.decrypt(ciphertext, &shared_key, nonce)?;
        Ok(plaintext)
    }
}
