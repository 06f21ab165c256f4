mod error;
mod packets;
mod identity;
mod distance;
pub mod ping;

pub use error::DhtError;
pub use packets::{
    EncryptedPacket, GetNodesPacket, Node, NodeType, Packet, PacketType, PingRequestPacket,
    PingResponsePacket, SendNodesPacket, WirePacket, MAX_SEND_NODES,
};
pub use identity::{Identity, DEFAULT_SHARED_KEY_CACHE_SIZE};
pub use distance::{closest, distance};
pub use ping::{Ping, PingError, PingSet};

/*
 * Distributed Hash Table (DHT) core for ToxDHT
 *
 * Nodes find each other by public key. This module provides the pieces
 * every DHT packet passes through:
 *
 * 1. Wire codec - the envelope, node records and the four packet kinds
 * 2. Identity - per-peer shared keys and packet encryption/decryption
 * 3. Distance - the Kademlia XOR metric used to rank peers
 * 4. Ping set - outstanding challenges with lazy expiry
 *
 * Sockets, routing tables and persistence live outside this module.
 */
