pub mod caller;
pub mod feed;

pub use caller::{Caller, Identity};
pub use feed::PriceFeed;
