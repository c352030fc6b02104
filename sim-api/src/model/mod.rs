pub mod account;
pub mod command;
pub mod money;
pub mod order;
pub mod price;
pub mod reply;
pub mod trade;

pub use account::*;
pub use command::*;
pub use money::*;
pub use order::*;
pub use price::*;
pub use reply::*;
pub use trade::*;
