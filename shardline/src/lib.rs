#![warn(missing_debug_implementations)]
#![deny(clippy::dbg_macro)]
#![deny(clippy::map_unwrap_or)]
#![deny(clippy::semicolon_if_nothing_returned)]
#![forbid(unsafe_code)]

pub mod blocking;
pub mod connection;
pub mod error;
pub mod keyspace;
pub mod prelude;
pub mod result_set;
pub mod session;
pub mod sharding;
pub mod statement;
mod utils;

pub use crate::prelude::*;
