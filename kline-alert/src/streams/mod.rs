/// Stream wrappers used by the kline subscription.
pub mod timeout;

pub use timeout::{DEFAULT_READ_TIMEOUT, TimeoutStream};
