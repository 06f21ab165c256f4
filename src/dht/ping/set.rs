use crate::crypto::{CryptoBackend, DefaultBackend, PublicKey};
use crate::dht::ping::{Clock, Ping, SystemClock};
use crate::utils::DhtConfig;
use log::trace;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};
use thiserror::Error;

/// 默认的 ping 有效时间
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

/// 两次收缩索引之间的最小间隔
pub const REALLOC_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PingError {
    #[error("Ping id already in set: {0}")]
    DuplicatePingId(u64),

    /// 过期的 ping 也返回此错误，不单独区分
    #[error("Ping id not in set: {0}")]
    PingNotFound(u64),
}

/// ping id 的来源
pub trait PingIdSource {
    fn next_ping_id(&mut self) -> u64;
}

impl<F: FnMut() -> u64> PingIdSource for F {
    fn next_ping_id(&mut self) -> u64 {
        self()
    }
}

impl PingIdSource for DefaultBackend {
    fn next_ping_id(&mut self) -> u64 {
        self.generate_ping_id()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PingKey {
    public_key: PublicKey,
    id: u64,
}

impl PingKey {
    fn of(ping: &Ping) -> Self {
        Self {
            public_key: *ping.public_key(),
            id: ping.id(),
        }
    }
}

/// 等待响应的 ping 集合
///
/// 以 `(公钥, id)` 为键建立查找索引，同时按创建顺序保存槽位。所有 ping 的
/// 超时时间相同，因此创建顺序也就是过期顺序。每次 `add` 和 `pop` 开始时
/// 惰性清理过期条目。
///
/// `pop` 只清空对应槽位，空槽位位于队首时立即丢弃，其余的等清理扫描到时
/// 再丢弃，所以添加、取出和清理都是均摊 O(1)。
pub struct PingSet<C: Clock = SystemClock, G: PingIdSource = DefaultBackend> {
    /// 查找索引：键 -> 插入序号
    index: HashMap<PingKey, u64>,
    /// 按创建时间排序的槽位，已取出的 ping 留下 None
    order: VecDeque<Option<Ping>>,
    /// 队首槽位的插入序号
    head_seq: u64,
    timeout: Duration,
    clock: C,
    ids: G,
    last_realloc: Instant,
}

impl PingSet<SystemClock, DefaultBackend> {
    pub fn new(timeout: Duration) -> Self {
        Self::with_sources(timeout, SystemClock, DefaultBackend)
    }

    pub fn from_config(config: &DhtConfig) -> Self {
        Self::new(config.ping_timeout())
    }
}

impl Default for PingSet<SystemClock, DefaultBackend> {
    fn default() -> Self {
        Self::new(DEFAULT_PING_TIMEOUT)
    }
}

impl<C: Clock, G: PingIdSource> PingSet<C, G> {
    /// 使用指定的时钟和 id 来源创建集合
    pub fn with_sources(timeout: Duration, clock: C, ids: G) -> Self {
        let last_realloc = clock.now();
        Self {
            index: HashMap::new(),
            order: VecDeque::new(),
            head_seq: 0,
            timeout,
            clock,
            ids,
            last_realloc,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// 有效 ping 的数量
    pub fn size(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// 查找索引底层存储的容量
    pub fn capacity(&self) -> usize {
        self.index.capacity()
    }

    /// 为 `public_key` 创建新的 ping 并开始跟踪
    pub fn add(&mut self, public_key: PublicKey) -> Result<Ping, PingError> {
        self.clear_expired();

        let id = self.ids.next_ping_id();
        let key = PingKey { public_key, id };
        if self.index.contains_key(&key) {
            return Err(PingError::DuplicatePingId(id));
        }

        let ping = Ping::new(public_key, id, self.clock.now());
        let seq = self.head_seq + self.order.len() as u64;

        self.index.insert(key, seq);
        self.order.push_back(Some(ping.clone()));
        Ok(ping)
    }

    /// 取出并返回与 `public_key` 和 `id` 匹配的 ping
    ///
    /// 从未创建、已被取出或已过期的 ping 都返回同样的 `PingNotFound`。
    pub fn pop(&mut self, public_key: &PublicKey, id: u64) -> Result<Ping, PingError> {
        self.clear_expired();

        let key = PingKey {
            public_key: *public_key,
            id,
        };
        let seq = self.index.remove(&key).ok_or(PingError::PingNotFound(id))?;

        let ping = self
            .order
            .get_mut((seq - self.head_seq) as usize)
            .and_then(Option::take);
        self.drop_empty_head();

        ping.ok_or(PingError::PingNotFound(id))
    }

    /// 清理所有过期的 ping，并定期收缩查找索引
    pub fn clear_expired(&mut self) {
        let now = self.clock.now();

        let mut expired = 0;
        loop {
            match self.order.front() {
                Some(None) => {}
                Some(Some(ping)) if ping.is_expired(now, self.timeout) => {
                    self.index.remove(&PingKey::of(ping));
                    expired += 1;
                }
                _ => break,
            }
            self.order.pop_front();
            self.head_seq += 1;
        }

        if expired > 0 {
            trace!("Swept {} expired pings, {} remaining", expired, self.index.len());
        }

        // 定期收缩，避免内存占用停留在历史峰值
        if now.saturating_duration_since(self.last_realloc) >= REALLOC_INTERVAL {
            self.index.shrink_to_fit();
            self.order.shrink_to_fit();
            self.last_realloc = now;
        }
    }

    fn drop_empty_head(&mut self) {
        while let Some(None) = self.order.front() {
            self.order.pop_front();
            self.head_seq += 1;
        }
    }
}
