//! Functions and structs that wrap platform functionality such as reading
//! content files from disk and measuring elapsed frame time.
mod fileio;
mod time;

pub use fileio::*;
pub use time::*;
