use crate::crypto::PublicKey;
use std::time::{Duration, Instant};

/// 已发出、等待响应的 ping 挑战
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ping {
    public_key: PublicKey,
    id: u64,
    created: Instant,
}

impl Ping {
    pub(crate) fn new(public_key: PublicKey, id: u64, created: Instant) -> Self {
        Self {
            public_key,
            id,
            created,
        }
    }

    /// 接收挑战的节点公钥
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn created(&self) -> Instant {
        self.created
    }

    /// 创建后经过的时间是否严格超过 `timeout`
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        now.saturating_duration_since(self.created) > timeout
    }
}
