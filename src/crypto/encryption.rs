use crate::crypto::{KeyPair, Nonce, PublicKey, SecretKey, SharedKey, NONCE_SIZE, SHARED_KEY_SIZE};
use chacha20poly1305::aead::{Aead, NewAead};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::Rng;
use thiserror::Error;
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Key generation failed: {0}")]
    KeyGenerationFailed(String),

    #[error("Encryption failed")]
    EncryptionFailed,

    #[error("Decryption failed")]
    DecryptionFailed,
}

/// The public-key primitives the DHT layer consumes.
///
/// Everything above this trait treats the primitives as opaque: identities
/// only ever ask for a keypair, a shared key, a sealed or opened payload and
/// a random ping id. Tests substitute instrumented implementations.
pub trait CryptoBackend {
    /// Generates a fresh long-term keypair
    fn generate_keypair(&self) -> Result<KeyPair, CryptoError>;

    /// Derives the symmetric key shared with `public_key`
    fn precompute(&self, public_key: &PublicKey, secret_key: &SecretKey) -> SharedKey;

    /// Seals `plaintext` under `shared_key` with a freshly generated nonce
    fn encrypt(
        &self,
        plaintext: &[u8],
        shared_key: &SharedKey,
    ) -> Result<(Vec<u8>, Nonce), CryptoError>;

    /// Opens `ciphertext`; fails without saying whether the key or the data was wrong
    fn decrypt(
        &self,
        ciphertext: &[u8],
        shared_key: &SharedKey,
        nonce: &Nonce,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Generates a random 64-bit ping id
    fn generate_ping_id(&self) -> u64;
}

/// X25519 key agreement with XChaCha20-Poly1305 sealing.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBackend;

impl CryptoBackend for DefaultBackend {
    fn generate_keypair(&self) -> Result<KeyPair, CryptoError> {
        // 生成随机字节作为私钥
        let mut seed = [0u8; 32];
        rand::thread_rng()
            .try_fill(&mut seed)
            .map_err(|e| CryptoError::KeyGenerationFailed(e.to_string()))?;

        let secret = StaticSecret::from(seed);
        let public = X25519PublicKey::from(&secret);

        Ok(KeyPair {
            public: PublicKey(*public.as_bytes()),
            secret: SecretKey::from_bytes(secret.to_bytes()),
        })
    }

    fn precompute(&self, public_key: &PublicKey, secret_key: &SecretKey) -> SharedKey {
        let secret = StaticSecret::from(*secret_key.as_bytes());
        let remote = X25519PublicKey::from(*public_key.as_bytes());

        // 执行ECDH密钥协商
        let shared_secret = secret.diffie_hellman(&remote);

        derive_shared_key(shared_secret.as_bytes())
    }

    fn encrypt(
        &self,
        plaintext: &[u8],
        shared_key: &SharedKey,
    ) -> Result<(Vec<u8>, Nonce), CryptoError> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill(&mut nonce);

        let cipher = XChaCha20Poly1305::new(Key::from_slice(shared_key.as_bytes()));
        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|_| CryptoError::EncryptionFailed)?;

        Ok((ciphertext, Nonce(nonce)))
    }

    fn decrypt(
        &self,
        ciphertext: &[u8],
        shared_key: &SharedKey,
        nonce: &Nonce,
    ) -> Result<Vec<u8>, CryptoError> {
        let cipher = XChaCha20Poly1305::new(Key::from_slice(shared_key.as_bytes()));
        cipher
            .decrypt(XNonce::from_slice(nonce.as_bytes()), ciphertext)
            .map_err(|_| CryptoError::DecryptionFailed)
    }

    fn generate_ping_id(&self) -> u64 {
        rand::thread_rng().gen()
    }
}

/// Extracts a uniformly distributed key from the raw X25519 output.
fn derive_shared_key(dh_output: &[u8]) -> SharedKey {
    let salt = ring::hmac::Key::new(ring::hmac::HMAC_SHA256, b"ToxDhtSharedKey");
    let tag = ring::hmac::sign(&salt, dh_output);

    let mut key = [0u8; SHARED_KEY_SIZE];
    key.copy_from_slice(&tag.as_ref()[..SHARED_KEY_SIZE]);
    SharedKey(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precompute_is_symmetric() {
        let backend = DefaultBackend;
        let alice = backend.generate_keypair().unwrap();
        let bob = backend.generate_keypair().unwrap();

        let alice_shared = backend.precompute(&bob.public, &alice.secret);
        let bob_shared = backend.precompute(&alice.public, &bob.secret);

        assert_eq!(alice_shared, bob_shared);
    }

    #[test]
    fn test_encrypt_decrypt() {
        let backend = DefaultBackend;
        let alice = backend.generate_keypair().unwrap();
        let bob = backend.generate_keypair().unwrap();
        let shared = backend.precompute(&bob.public, &alice.secret);

        let plaintext = b"Hello, Bob! This is a secret message.";
        let (ciphertext, nonce) = backend.encrypt(plaintext, &shared).unwrap();
        assert_ne!(&ciphertext[..plaintext.len()], &plaintext[..]);

        let decrypted = backend.decrypt(&ciphertext, &shared, &nonce).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn test_nonces_are_fresh() {
        let backend = DefaultBackend;
        let shared = SharedKey([3u8; SHARED_KEY_SIZE]);

        let (_, first) = backend.encrypt(b"payload", &shared).unwrap();
        let (_, second) = backend.encrypt(b"payload", &shared).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_decrypt_rejects_tampering() {
        let backend = DefaultBackend;
        let shared = SharedKey([5u8; SHARED_KEY_SIZE]);
        let (mut ciphertext, nonce) = backend.encrypt(b"payload", &shared).unwrap();

        ciphertext[0] ^= 0x01;
        assert!(matches!(
            backend.decrypt(&ciphertext, &shared, &nonce),
            Err(CryptoError::DecryptionFailed)
        ));

        // 错误的密钥也应该失败
        ciphertext[0] ^= 0x01;
        let wrong = SharedKey([6u8; SHARED_KEY_SIZE]);
        assert!(matches!(
            backend.decrypt(&ciphertext, &wrong, &nonce),
            Err(CryptoError::DecryptionFailed)
        ));
    }
}
