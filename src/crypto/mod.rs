mod keys;
mod encryption;

pub use keys::{
    KeyError, KeyPair, Nonce, PublicKey, SecretKey, SharedKey, NONCE_SIZE, PUBLIC_KEY_SIZE,
    SECRET_KEY_SIZE, SHARED_KEY_SIZE,
};
pub use encryption::{CryptoBackend, CryptoError, DefaultBackend};

/*
 * Cryptography module for ToxDHT
 *
 * This module defines the key material exchanged on the DHT and the
 * capability the DHT layer consumes to use it:
 * - Fixed-size public, secret and shared keys and nonces
 * - The CryptoBackend trait (keypairs, key agreement, sealing, ping ids)
 * - A default X25519 / XChaCha20-Poly1305 backend
 */
