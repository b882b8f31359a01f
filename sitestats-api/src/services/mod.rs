//! Service Layer
//!
//! Request-scoped logic between the statistics cache and the page handler.

mod most_read;

pub use most_read::*;
