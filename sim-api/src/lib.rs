pub mod error;
pub mod model;
pub mod traits;

pub use error::{SimError, SimResult};
pub use model::account::Account;
pub use model::command::{AdminCommand, BuyAmount, Command, SellAmount};
pub use model::money::{Cents, Sats, SATOSHI};
pub use model::order::{Order, OrderSide, OrderStatus};
pub use model::price::{PriceSnapshot, SeriesStats};
pub use model::reply::{BalanceReport, LeaderboardRow, RankBy, Reply};
pub use model::trade::{TradeKind, TradeRecord};
pub use traits::caller::{Caller, Identity};
pub use traits::feed::PriceFeed;
