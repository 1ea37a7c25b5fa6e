//! helpers shared by the filesystem engine and the admin CLI
pub mod digest;
pub mod fs_size_calculator;
pub mod time_util;
pub mod traits;
