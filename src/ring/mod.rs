pub mod buffer;
pub mod layout;

pub use buffer::{ReadGuard, RingBuffer};
pub use layout::{ControlHeader, RingHeader};
