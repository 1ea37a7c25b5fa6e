//! a simulated UNIX filesystem living in one in-memory partition
pub mod cli_interface;
mod fs;
pub mod fsinfo;
pub mod mkfs;
pub mod utils;
pub use fs::*;
