//! # Split Ledger
//!
//! A shared-expense ledger engine: members of a group record expenses,
//! the engine works out who owes whom, and suggests a short list of
//! payments that settles every debt.
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: 2 decimal places via `rust_decimal`
//! - **Exact reconciliation**: split amounts always sum to the expense total
//! - **Derived balances**: net balances are recomputed from full history
//! - **Deterministic output**: settlement plans do not depend on input order
//!
//! ## Example
//!
//! ```
//! use split_ledger::{BalanceEngine, MemberId, SettlementPlanner};
//! use split_ledger::{Expense, GroupId, Money, RawSplitEntry, SplitNormalizer, SplitType};
//!
//! let members: Vec<MemberId> = ["a", "b", "c"].into_iter().map(MemberId::from).collect();
//! let raw: Vec<RawSplitEntry> = members.iter().cloned().map(RawSplitEntry::member).collect();
//! let total = Money::from_cents(9000);
//!
//! let entries = SplitNormalizer.normalize(total, SplitType::Equal, &raw).unwrap();
//! let expense = Expense {
//!     id: 1,
//!     group: GroupId::from("trip"),
//!     payer: MemberId::from("a"),
//!     total,
//!     split_type: SplitType::Equal,
//!     entries,
//! };
//!
//! let balances = BalanceEngine.compute_net_balances(&members, &[expense], &[]).unwrap();
//! let plan = SettlementPlanner.plan(balances.values()).unwrap();
//! assert_eq!(plan.len(), 2);
//! assert_eq!(plan[0].amount.to_string(), "30.00");
//! ```

pub mod balance;
pub mod decimal;
pub mod error;
pub mod ledger;
pub mod model;
pub mod record;
pub mod settlement;
pub mod split;
pub mod summary;

pub use balance::{BalanceEngine, Balances};
pub use decimal::{Money, Percent};
pub use error::{ErrorKind, LedgerError, Result};
pub use ledger::{Group, Ledger};
pub use model::{
    BalanceStatus, Expense, GroupId, MemberId, NetBalance, PlanEntry, RawSplitEntry, Settlement,
    SplitEntry, SplitType,
};
pub use record::{LedgerCommand, LedgerRecord};
pub use settlement::SettlementPlanner;
pub use split::SplitNormalizer;
