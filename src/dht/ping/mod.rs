mod clock;
mod record;
mod set;

pub use clock::{Clock, ManualClock, SystemClock};
pub use record::Ping;
pub use set::{PingError, PingIdSource, PingSet, DEFAULT_PING_TIMEOUT, REALLOC_INTERVAL};
