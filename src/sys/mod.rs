pub mod futex;
pub mod shared_memory;

pub use shared_memory::{alloc_shared, free_shared, HEADER_SIZE};
