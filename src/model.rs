//! Ledger records consumed and produced by the engine.
//!
//! Expenses and settlements are immutable history; net balances and plan
//! entries are derived on demand and never stored.

use crate::decimal::{Money, Percent};
use crate::error::LedgerError;
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

/// Opaque member identifier, unique within a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        MemberId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        MemberId(id.to_string())
    }
}

impl From<String> for MemberId {
    fn from(id: String) -> Self {
        MemberId(id)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Group identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(String);

impl GroupId {
    pub fn new(id: impl Into<String>) -> Self {
        GroupId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GroupId {
    fn from(id: &str) -> Self {
        GroupId(id.to_string())
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an expense total is divided among its split members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitType {
    /// Everyone owes the same share; the last entry absorbs the remainder.
    Equal,
    /// Caller supplies every owed amount; they must add up to the total.
    Exact,
    /// Caller supplies percents adding up to 100.
    Percentage,
}

impl FromStr for SplitType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "equal" => Ok(SplitType::Equal),
            "exact" => Ok(SplitType::Exact),
            "percentage" => Ok(SplitType::Percentage),
            other => Err(LedgerError::validation(format!(
                "unsupported split type '{}' (only equal/exact/percentage)",
                other
            ))),
        }
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SplitType::Equal => "equal",
            SplitType::Exact => "exact",
            SplitType::Percentage => "percentage",
        };
        f.write_str(name)
    }
}

/// A split entry as requested by the caller, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSplitEntry {
    pub member: MemberId,

    /// Required for exact splits.
    pub amount: Option<Money>,

    /// Required for percentage splits.
    pub percent: Option<Percent>,
}

impl RawSplitEntry {
    /// An entry carrying only a member, as used by equal splits.
    pub fn member(member: impl Into<MemberId>) -> Self {
        RawSplitEntry {
            member: member.into(),
            amount: None,
            percent: None,
        }
    }

    pub fn with_amount(member: impl Into<MemberId>, amount: Money) -> Self {
        RawSplitEntry {
            member: member.into(),
            amount: Some(amount),
            percent: None,
        }
    }

    pub fn with_percent(member: impl Into<MemberId>, percent: Percent) -> Self {
        RawSplitEntry {
            member: member.into(),
            amount: None,
            percent: Some(percent),
        }
    }
}

/// A reconciled split entry: what one member owes for one expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitEntry {
    pub member: MemberId,

    /// Owed amount, never negative.
    pub owed: Money,

    /// Only present for percentage splits.
    pub percent: Option<Percent>,
}

/// A recorded expense with its normalized split.
///
/// # Invariants
///
/// - `total > 0`
/// - `entries` sum to `total` exactly and contain no duplicate members
/// - the payer need not appear in `entries`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expense {
    pub id: u32,
    pub group: GroupId,
    pub payer: MemberId,
    pub total: Money,
    pub split_type: SplitType,
    pub entries: Vec<SplitEntry>,
}

/// A recorded payment from one member to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub id: u32,
    pub group: GroupId,
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
    pub at: DateTime<Utc>,
}

/// Whether a member is owed money, owes money, or is even.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceStatus {
    Owes,
    GetsBack,
    Settled,
}

impl fmt::Display for BalanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BalanceStatus::Owes => "owes",
            BalanceStatus::GetsBack => "gets back",
            BalanceStatus::Settled => "settled",
        };
        f.write_str(label)
    }
}

/// A member's signed net position. Positive means the member is owed money.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetBalance {
    pub member: MemberId,
    pub net: Money,
}

impl NetBalance {
    pub fn new(member: impl Into<MemberId>, net: Money) -> Self {
        NetBalance {
            member: member.into(),
            net,
        }
    }

    pub fn status(&self) -> BalanceStatus {
        if self.net.is_positive() {
            BalanceStatus::GetsBack
        } else if self.net.is_negative() {
            BalanceStatus::Owes
        } else {
            BalanceStatus::Settled
        }
    }

    /// What this member still has to pay back; zero for creditors.
    pub fn outstanding_debt(&self) -> Money {
        if self.net.is_negative() {
            self.net.abs()
        } else {
            Money::ZERO
        }
    }
}

/// One instruction of a suggested settlement plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: Money,
}
