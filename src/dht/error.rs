use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DhtError {
    /// 输入过短、带有多余字节或内部长度错误
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Unknown packet type: {0}")]
    UnknownPacketType(u8),

    /// 认证或解密失败，不携带任何细节
    #[error("Crypto failure")]
    CryptoFailure,

    /// 格式正确但违反协议规则
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),
}

impl From<crate::crypto::CryptoError> for DhtError {
    fn from(_: crate::crypto::CryptoError) -> Self {
        DhtError::CryptoFailure
    }
}
