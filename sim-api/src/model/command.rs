use super::money::{parse_btc, parse_usd, Cents, Sats, SATOSHI};
use crate::error::SimError;
use serde::{Deserialize, Serialize};

/// Market buy sizing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuyAmount {
    /// Spend the whole available cash balance.
    All,
    Cash(Cents),
}

/// Market sell sizing. A value below 1 is a BTC quantity, a value of
/// 1 or more is a USD amount to liquidate at the live price. The rule
/// is applied at parse time so handlers only ever see integer minor
/// units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SellAmount {
    /// Sell the whole available holding.
    All,
    Asset(Sats),
    Cash(Cents),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminCommand {
    ResetUser { account_id: i64 },
    GiveCash { account_id: i64, amount: Cents },
    GiveBtc { account_id: i64, amount: Sats },
    SetPrice { price: Cents },
    RevertPrice,
}

/// The closed command surface the core consumes. The transport layer
/// parses text into this enum; dispatch is an exhaustive match, so an
/// unknown command can only be rejected here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Buy(BuyAmount),
    Sell(SellAmount),
    Balance,
    Stats,
    History,
    BuyOrder { spend: Cents, limit_price: Cents },
    SellOrder { qty: Sats, limit_price: Cents },
    CancelOrder { order_id: i64 },
    MyOrders,
    Admin(AdminCommand),
    Help,
}

impl Command {
    /// Parse one chat line (with or without the `!` prefix) into a
    /// command.
    pub fn parse(line: &str) -> Result<Command, SimError> {
        let line = line.trim().trim_start_matches('!');
        let mut parts = line.split_whitespace();
        let cmd = parts
            .next()
            .ok_or_else(|| SimError::UnknownCommand(String::new()))?
            .to_ascii_lowercase();
        let args: Vec<&str> = parts.collect();

        match cmd.as_str() {
            "buy" => Ok(Command::Buy(parse_buy_amount(args.first().copied())?)),
            "sell" => Ok(Command::Sell(parse_sell_amount(args.first().copied())?)),
            "balance" => Ok(Command::Balance),
            "stats" => Ok(Command::Stats),
            "history" => Ok(Command::History),
            "buyorder" => {
                let (spend, limit_price) = parse_order_args(&args, parse_usd, "USD amount")?;
                Ok(Command::BuyOrder { spend, limit_price })
            }
            "sellorder" => {
                let (qty, limit_price) = parse_order_args(&args, parse_btc, "BTC amount")?;
                Ok(Command::SellOrder { qty, limit_price })
            }
            "cancelorder" => {
                let id = args
                    .first()
                    .and_then(|s| s.parse::<i64>().ok())
                    .filter(|id| *id > 0)
                    .ok_or_else(|| SimError::InvalidAmount("order id must be a positive integer".into()))?;
                Ok(Command::CancelOrder { order_id: id })
            }
            "myorders" => Ok(Command::MyOrders),
            "admin" => parse_admin(&args).map(Command::Admin),
            "help" => Ok(Command::Help),
            other => Err(SimError::UnknownCommand(other.to_string())),
        }
    }
}

fn parse_buy_amount(arg: Option<&str>) -> Result<BuyAmount, SimError> {
    match arg {
        None | Some("all") => Ok(BuyAmount::All),
        Some(s) => {
            let cents =
                parse_usd(s).ok_or_else(|| SimError::InvalidAmount(format!("bad amount: {s}")))?;
            Ok(BuyAmount::Cash(cents))
        }
    }
}

fn parse_sell_amount(arg: Option<&str>) -> Result<SellAmount, SimError> {
    match arg {
        None | Some("all") => Ok(SellAmount::All),
        Some(s) => {
            let sats =
                parse_btc(s).ok_or_else(|| SimError::InvalidAmount(format!("bad amount: {s}")))?;
            if sats < SATOSHI {
                Ok(SellAmount::Asset(sats))
            } else {
                // 1 or more: a USD value to liquidate at the live price.
                let cents = parse_usd(s)
                    .ok_or_else(|| SimError::InvalidAmount(format!("bad amount: {s}")))?;
                Ok(SellAmount::Cash(cents))
            }
        }
    }
}

fn parse_order_args(
    args: &[&str],
    parse_amount: fn(&str) -> Option<i64>,
    what: &str,
) -> Result<(i64, Cents), SimError> {
    let amount = args
        .first()
        .and_then(|s| parse_amount(s))
        .ok_or_else(|| SimError::InvalidAmount(format!("bad {what}")))?;
    let limit = args
        .get(1)
        .and_then(|s| parse_usd(s))
        .ok_or_else(|| SimError::InvalidAmount("bad limit price".into()))?;
    if amount <= 0 {
        return Err(SimError::InvalidAmount(format!(
            "{what} rounds to zero minor units"
        )));
    }
    if limit <= 0 {
        return Err(SimError::InvalidAmount(
            "limit price rounds to zero cents".into(),
        ));
    }
    Ok((amount, limit))
}

fn parse_admin(args: &[&str]) -> Result<AdminCommand, SimError> {
    let sub = args
        .first()
        .map(|s| s.to_ascii_lowercase())
        .ok_or_else(|| SimError::UnknownCommand("admin".into()))?;
    let target = |idx: usize| -> Result<i64, SimError> {
        args.get(idx)
            .and_then(|s| s.trim_matches(|c| c == '<' || c == '@' || c == '!' || c == '>').parse::<i64>().ok())
            .ok_or_else(|| SimError::InvalidAmount("bad account id".into()))
    };
    match sub.as_str() {
        "resetuser" => Ok(AdminCommand::ResetUser {
            account_id: target(1)?,
        }),
        "givecash" => {
            let amount = args
                .get(2)
                .and_then(|s| parse_usd(s))
                .filter(|c| *c > 0)
                .ok_or_else(|| SimError::InvalidAmount("bad cash amount".into()))?;
            Ok(AdminCommand::GiveCash {
                account_id: target(1)?,
                amount,
            })
        }
        "givebtc" => {
            let amount = args
                .get(2)
                .and_then(|s| parse_btc(s))
                .filter(|q| *q > 0)
                .ok_or_else(|| SimError::InvalidAmount("bad BTC amount".into()))?;
            Ok(AdminCommand::GiveBtc {
                account_id: target(1)?,
                amount,
            })
        }
        "setprice" => {
            let price = args
                .get(1)
                .and_then(|s| parse_usd(s))
                .filter(|p| *p > 0)
                .ok_or_else(|| SimError::InvalidAmount("bad price".into()))?;
            Ok(AdminCommand::SetPrice { price })
        }
        "revertprice" => Ok(AdminCommand::RevertPrice),
        other => Err(SimError::UnknownCommand(format!("admin {other}"))),
    }
}
