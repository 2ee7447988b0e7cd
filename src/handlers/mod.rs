//! Generated table handlers.

pub mod restful;
pub use restful::*;
