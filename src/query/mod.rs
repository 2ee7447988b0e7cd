//! Request-to-query translation: filters, pagination, ordering.

mod filter;
mod page;
pub use filter::*;
pub use page::*;
