//! ToxDHT - the peer discovery core of an encrypted overlay network.
//!
//! Nodes are identified by 32-byte public keys and talk over
//! authenticated-encrypted UDP packets. This crate contains the parts of the
//! DHT that every packet touches: the wire codec, the identity that seals and
//! opens packets, the XOR distance metric, and the set of outstanding pings.
//! Sockets and routing tables are left to the caller.

pub mod crypto;
pub mod dht;
pub mod utils;
