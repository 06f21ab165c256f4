use crate::crypto::{Nonce, PublicKey, NONCE_SIZE, PUBLIC_KEY_SIZE};
use crate::dht::DhtError;
use bytes::{Buf, BufMut};
use std::convert::TryFrom;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// 单个 SendNodes 响应最多携带的节点数
pub const MAX_SEND_NODES: usize = 4;

const PING_ID_SIZE: usize = 8;
const PORT_SIZE: usize = 2;

/// DHT 包类型标签，即信封的第一个字节
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PacketType {
    PingRequest = 0,
    PingResponse = 1,
    GetNodes = 2,
    SendNodes = 4,
}

impl PacketType {
    fn name(self) -> &'static str {
        match self {
            PacketType::PingRequest => "PING_REQUEST",
            PacketType::PingResponse => "PING_RESPONSE",
            PacketType::GetNodes => "GET_NODES",
            PacketType::SendNodes => "SEND_NODES",
        }
    }

    /// 格式化原始标签字节，包括未知类型
    pub fn describe(tag: u8) -> String {
        match PacketType::try_from(tag) {
            Ok(packet_type) => packet_type.to_string(),
            Err(_) => format!("UNKNOWN({})", tag),
        }
    }
}

impl TryFrom<u8> for PacketType {
    type Error = DhtError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(PacketType::PingRequest),
            1 => Ok(PacketType::PingResponse),
            2 => Ok(PacketType::GetNodes),
            4 => Ok(PacketType::SendNodes),
            _ => Err(DhtError::UnknownPacketType(value)),
        }
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), *self as u8)
    }
}

/// 节点记录的地址族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NodeType {
    UdpIp4 = 2,
    UdpIp6 = 10,
    TcpIp4 = 130,
    TcpIp6 = 138,
}

impl NodeType {
    pub fn is_ipv4(self) -> bool {
        matches!(self, NodeType::UdpIp4 | NodeType::TcpIp4)
    }

    pub fn is_tcp(self) -> bool {
        matches!(self, NodeType::TcpIp4 | NodeType::TcpIp6)
    }

    /// 该地址族的 IP 地址字段长度
    pub fn ip_len(self) -> usize {
        if self.is_ipv4() {
            4
        } else {
            16
        }
    }

    /// 套接字接口使用的网络名称
    pub fn net(self) -> &'static str {
        match self {
            NodeType::UdpIp4 => "udp4",
            NodeType::UdpIp6 => "udp6",
            NodeType::TcpIp4 => "tcp4",
            NodeType::TcpIp6 => "tcp6",
        }
    }
}

impl TryFrom<u8> for NodeType {
    type Error = DhtError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(NodeType::UdpIp4),
            10 => Ok(NodeType::UdpIp6),
            130 => Ok(NodeType::TcpIp4),
            138 => Ok(NodeType::TcpIp6),
            _ => Err(DhtError::ProtocolViolation(format!("unknown address family: {}", value))),
        }
    }
}

/// 四种加密 DHT 包的公共接口
pub trait WirePacket: Sized {
    const PACKET_TYPE: PacketType;

    fn type_tag(&self) -> PacketType {
        Self::PACKET_TYPE
    }

    fn marshal(&self) -> Result<Vec<u8>, DhtError>;

    /// 解码完整的明文，多余字节视为错误
    fn unmarshal(data: &[u8]) -> Result<Self, DhtError>;
}

fn ensure_remaining(buf: &[u8], len: usize, field: &str) -> Result<(), DhtError> {
    if buf.remaining() < len {
        return Err(DhtError::MalformedPacket(format!(
            "{}: need {} bytes, have {}",
            field,
            len,
            buf.remaining()
        )));
    }
    Ok(())
}

fn ensure_consumed(buf: &[u8], what: &str) -> Result<(), DhtError> {
    if buf.has_remaining() {
        return Err(DhtError::MalformedPacket(format!(
            "{}: {} unexpected extra bytes",
            what,
            buf.remaining()
        )));
    }
    Ok(())
}

fn read_u8(buf: &mut &[u8], field: &str) -> Result<u8, DhtError> {
    ensure_remaining(buf, 1, field)?;
    Ok(buf.get_u8())
}

fn read_u16(buf: &mut &[u8], field: &str) -> Result<u16, DhtError> {
    ensure_remaining(buf, PORT_SIZE, field)?;
    Ok(buf.get_u16())
}

fn read_u64(buf: &mut &[u8], field: &str) -> Result<u64, DhtError> {
    ensure_remaining(buf, PING_ID_SIZE, field)?;
    Ok(buf.get_u64())
}

fn read_public_key(buf: &mut &[u8], field: &str) -> Result<PublicKey, DhtError> {
    ensure_remaining(buf, PUBLIC_KEY_SIZE, field)?;
    let mut key = [0u8; PUBLIC_KEY_SIZE];
    buf.copy_to_slice(&mut key);
    Ok(PublicKey(key))
}

/// SendNodes 响应中携带的节点记录
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Node {
    pub node_type: NodeType,
    pub ip: IpAddr,
    pub port: u16,
    pub public_key: PublicKey,
}

impl Node {
    /// 创建节点记录，地址与地址族不一致时拒绝
    pub fn new(
        node_type: NodeType,
        ip: IpAddr,
        port: u16,
        public_key: PublicKey,
    ) -> Result<Self, DhtError> {
        let node = Self {
            node_type,
            ip,
            port,
            public_key,
        };
        node.check_family()?;
        Ok(node)
    }

    /// 根据套接字地址创建节点记录，地址族由地址决定
    pub fn from_addr(addr: SocketAddr, tcp: bool, public_key: PublicKey) -> Self {
        let node_type = match (addr.is_ipv4(), tcp) {
            (true, false) => NodeType::UdpIp4,
            (false, false) => NodeType::UdpIp6,
            (true, true) => NodeType::TcpIp4,
            (false, true) => NodeType::TcpIp6,
        };

        Self {
            node_type,
            ip: addr.ip(),
            port: addr.port(),
            public_key,
        }
    }

    pub fn type_tag(&self) -> NodeType {
        self.node_type
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }

    /// 该记录编码后的长度
    pub fn encoded_len(&self) -> usize {
        1 + self.node_type.ip_len() + PORT_SIZE + PUBLIC_KEY_SIZE
    }

    pub fn marshal(&self) -> Result<Vec<u8>, DhtError> {
        let mut buf = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut buf)?;
        Ok(buf)
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, DhtError> {
        let mut buf = data;
        let node = Self::read_from(&mut buf)?;
        ensure_consumed(buf, "node")?;
        Ok(node)
    }

    fn check_family(&self) -> Result<(), DhtError> {
        if self.ip.is_ipv4() != self.node_type.is_ipv4() {
            return Err(DhtError::ProtocolViolation(format!(
                "address {} does not match address family {}",
                self.ip,
                self.node_type.net()
            )));
        }
        Ok(())
    }

    fn write_to(&self, buf: &mut Vec<u8>) -> Result<(), DhtError> {
        self.check_family()?;

        buf.put_u8(self.node_type as u8);
        match self.ip {
            IpAddr::V4(ip) => buf.put_slice(&ip.octets()),
            IpAddr::V6(ip) => buf.put_slice(&ip.octets()),
        }
        buf.put_u16(self.port);
        buf.put_slice(self.public_key.as_bytes());
        Ok(())
    }

    fn read_from(buf: &mut &[u8]) -> Result<Self, DhtError> {
        let node_type = NodeType::try_from(read_u8(buf, "node address family")?)?;

        ensure_remaining(buf, node_type.ip_len(), "node ip")?;
        let ip = if node_type.is_ipv4() {
            let mut octets = [0u8; 4];
            buf.copy_to_slice(&mut octets);
            IpAddr::V4(Ipv4Addr::from(octets))
        } else {
            let mut octets = [0u8; 16];
            buf.copy_to_slice(&mut octets);
            IpAddr::V6(Ipv6Addr::from(octets))
        };

        let port = read_u16(buf, "node port")?;
        let public_key = read_public_key(buf, "node public key")?;

        Ok(Self {
            node_type,
            ip,
            port,
            public_key,
        })
    }
}

/// 向节点查询离 `public_key` 最近的已知节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetNodesPacket {
    pub public_key: PublicKey,
    pub ping_id: u64,
}

impl WirePacket for GetNodesPacket {
    const PACKET_TYPE: PacketType = PacketType::GetNodes;

    fn marshal(&self) -> Result<Vec<u8>, DhtError> {
        let mut buf = Vec::with_capacity(PUBLIC_KEY_SIZE + PING_ID_SIZE);
        buf.put_slice(self.public_key.as_bytes());
        buf.put_u64(self.ping_id);
        Ok(buf)
    }

    fn unmarshal(data: &[u8]) -> Result<Self, DhtError> {
        let mut buf = data;
        let public_key = read_public_key(&mut buf, "get nodes target")?;
        let ping_id = read_u64(&mut buf, "get nodes ping id")?;
        ensure_consumed(buf, "get nodes")?;

        Ok(Self { public_key, ping_id })
    }
}

/// GetNodes 的响应，最多携带四个节点记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendNodesPacket {
    pub nodes: Vec<Node>,
    pub ping_id: u64,
}

impl WirePacket for SendNodesPacket {
    const PACKET_TYPE: PacketType = PacketType::SendNodes;

    fn marshal(&self) -> Result<Vec<u8>, DhtError> {
        if self.nodes.len() > MAX_SEND_NODES {
            return Err(DhtError::ProtocolViolation(format!(
                "too many nodes: {}, the max is {}",
                self.nodes.len(),
                MAX_SEND_NODES
            )));
        }

        let nodes_len: usize = self.nodes.iter().map(Node::encoded_len).sum();
        let mut buf = Vec::with_capacity(1 + nodes_len + PING_ID_SIZE);
        buf.put_u8(self.nodes.len() as u8);
        for node in &self.nodes {
            node.write_to(&mut buf)?;
        }
        buf.put_u64(self.ping_id);
        Ok(buf)
    }

    fn unmarshal(data: &[u8]) -> Result<Self, DhtError> {
        let mut buf = data;
        let count = read_u8(&mut buf, "send nodes count")? as usize;
        if count > MAX_SEND_NODES {
            return Err(DhtError::ProtocolViolation(format!(
                "too many nodes: {}, the max is {}",
                count, MAX_SEND_NODES
            )));
        }

        let mut nodes = Vec::with_capacity(count);
        for _ in 0..count {
            nodes.push(Node::read_from(&mut buf)?);
        }

        let ping_id = read_u64(&mut buf, "send nodes ping id")?;
        ensure_consumed(buf, "send nodes")?;

        Ok(Self { nodes, ping_id })
    }
}

fn marshal_ping(tag: PacketType, ping_id: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(1 + PING_ID_SIZE);
    buf.put_u8(tag as u8);
    buf.put_u64(ping_id);
    buf
}

fn unmarshal_ping(tag: PacketType, data: &[u8]) -> Result<u64, DhtError> {
    let mut buf = data;
    let self_tag = read_u8(&mut buf, "ping type")?;
    let ping_id = read_u64(&mut buf, "ping id")?;
    ensure_consumed(buf, "ping")?;

    // 内部类型字节必须与外层类型一致，防止请求被当作响应重放
    if self_tag != tag as u8 {
        return Err(DhtError::ProtocolViolation(format!(
            "incorrect ping type {} inside {}",
            PacketType::describe(self_tag),
            tag
        )));
    }

    Ok(ping_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingRequestPacket {
    pub ping_id: u64,
}

impl WirePacket for PingRequestPacket {
    const PACKET_TYPE: PacketType = PacketType::PingRequest;

    fn marshal(&self) -> Result<Vec<u8>, DhtError> {
        Ok(marshal_ping(Self::PACKET_TYPE, self.ping_id))
    }

    fn unmarshal(data: &[u8]) -> Result<Self, DhtError> {
        let ping_id = unmarshal_ping(Self::PACKET_TYPE, data)?;
        Ok(Self { ping_id })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PingResponsePacket {
    pub ping_id: u64,
}

impl WirePacket for PingResponsePacket {
    const PACKET_TYPE: PacketType = PacketType::PingResponse;

    fn marshal(&self) -> Result<Vec<u8>, DhtError> {
        Ok(marshal_ping(Self::PACKET_TYPE, self.ping_id))
    }

    fn unmarshal(data: &[u8]) -> Result<Self, DhtError> {
        let ping_id = unmarshal_ping(Self::PACKET_TYPE, data)?;
        Ok(Self { ping_id })
    }
}

/// 解密后的任意类型 DHT 包
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    GetNodes(GetNodesPacket),
    SendNodes(SendNodesPacket),
    PingRequest(PingRequestPacket),
    PingResponse(PingResponsePacket),
}

impl Packet {
    pub fn packet_type(&self) -> PacketType {
        match self {
            Packet::GetNodes(p) => p.type_tag(),
            Packet::SendNodes(p) => p.type_tag(),
            Packet::PingRequest(p) => p.type_tag(),
            Packet::PingResponse(p) => p.type_tag(),
        }
    }

    /// 每种 DHT 包都携带的挑战 id
    pub fn ping_id(&self) -> u64 {
        match self {
            Packet::GetNodes(p) => p.ping_id,
            Packet::SendNodes(p) => p.ping_id,
            Packet::PingRequest(p) => p.ping_id,
            Packet::PingResponse(p) => p.ping_id,
        }
    }

    pub fn marshal(&self) -> Result<Vec<u8>, DhtError> {
        match self {
            Packet::GetNodes(p) => p.marshal(),
            Packet::SendNodes(p) => p.marshal(),
            Packet::PingRequest(p) => p.marshal(),
            Packet::PingResponse(p) => p.marshal(),
        }
    }

    /// 按 `packet_type` 选择的类型解码明文
    pub fn unmarshal(packet_type: PacketType, data: &[u8]) -> Result<Self, DhtError> {
        Ok(match packet_type {
            PacketType::GetNodes => Packet::GetNodes(GetNodesPacket::unmarshal(data)?),
            PacketType::SendNodes => Packet::SendNodes(SendNodesPacket::unmarshal(data)?),
            PacketType::PingRequest => Packet::PingRequest(PingRequestPacket::unmarshal(data)?),
            PacketType::PingResponse => Packet::PingResponse(PingResponsePacket::unmarshal(data)?),
        })
    }
}

impl From<GetNodesPacket> for Packet {
    fn from(packet: GetNodesPacket) -> Self {
        Packet::GetNodes(packet)
    }
}

impl From<SendNodesPacket> for Packet {
    fn from(packet: SendNodesPacket) -> Self {
        Packet::SendNodes(packet)
    }
}

impl From<PingRequestPacket> for Packet {
    fn from(packet: PingRequestPacket) -> Self {
        Packet::PingRequest(packet)
    }
}

impl From<PingResponsePacket> for Packet {
    fn from(packet: PingResponsePacket) -> Self {
        Packet::PingResponse(packet)
    }
}

/// 每个 DHT 数据报的外层信封
///
/// 标签保留为原始字节，未知类型的信封仍可解析，之后由解密它的身份拒绝。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPacket {
    pub tag: u8,
    pub sender_public_key: PublicKey,
    pub nonce: Nonce,
    pub payload: Vec<u8>,
}

impl EncryptedPacket {
    /// 密文之前固定部分的长度
    pub const HEADER_SIZE: usize = 1 + PUBLIC_KEY_SIZE + NONCE_SIZE;

    pub fn packet_type(&self) -> Result<PacketType, DhtError> {
        PacketType::try_from(self.tag)
    }

    pub fn marshal(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::HEADER_SIZE + self.payload.len());
        buf.put_u8(self.tag);
        buf.put_slice(self.sender_public_key.as_bytes());
        buf.put_slice(self.nonce.as_bytes());
        buf.put_slice(&self.payload);
        buf
    }

    pub fn unmarshal(data: &[u8]) -> Result<Self, DhtError> {
        let mut buf = data;
        let tag = read_u8(&mut buf, "packet type")?;
        let sender_public_key = read_public_key(&mut buf, "sender public key")?;

        ensure_remaining(buf, NONCE_SIZE, "nonce")?;
        let mut nonce = [0u8; NONCE_SIZE];
        buf.copy_to_slice(&mut nonce);

        // 剩余部分全部是密文，没有长度前缀
        Ok(Self {
            tag,
            sender_public_key,
            nonce: Nonce(nonce),
            payload: buf.to_vec(),
        })
    }
}
