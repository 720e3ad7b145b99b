//! Ledger input records for CSV parsing.

use crate::decimal::{Money, Percent};
use crate::error::{LedgerError, Result};
use crate::model::{GroupId, MemberId, RawSplitEntry, SplitType};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::str::FromStr;

/// Raw ledger row as read from CSV.
///
/// Every column except `type` and `group` is optional since each record
/// type only uses a subset of them.
#[derive(Debug, Default, Deserialize)]
pub struct LedgerRecord {
    /// Record type: member, expense, settlement, cached_total
    #[serde(rename = "type")]
    pub record_type: String,

    pub group: String,

    /// Expense or settlement id, unique within the group
    #[serde(default)]
    pub id: Option<u32>,

    /// Member being declared, expense payer, or settlement payer
    #[serde(default)]
    pub member: Option<String>,

    /// Settlement receiver
    #[serde(default)]
    pub counterparty: Option<String>,

    #[serde(default)]
    pub amount: Option<String>,

    /// Split type for expenses
    #[serde(default)]
    pub split: Option<String>,

    /// `;`-separated split entries, `name` or `name:value`
    #[serde(default)]
    pub entries: Option<String>,

    /// RFC 3339 settlement timestamp
    #[serde(default)]
    pub at: Option<String>,
}

/// A parsed ledger command ready to be applied.
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    /// Declare a member, creating the group on first use.
    Member { group: GroupId, member: MemberId },

    /// Record an expense; the split is normalized when applied.
    Expense {
        group: GroupId,
        id: u32,
        payer: MemberId,
        total: Money,
        split_type: SplitType,
        entries: Vec<RawSplitEntry>,
    },

    /// Record a payment between two members.
    Settlement {
        group: GroupId,
        id: u32,
        from: MemberId,
        to: MemberId,
        amount: Money,
        at: Option<DateTime<Utc>>,
    },

    /// A running total reported by an external store, checked for drift.
    CachedTotal { group: GroupId, total: Money },
}

impl LedgerRecord {
    /// Parses the raw CSV record into a typed command.
    pub fn parse(&self) -> Result<LedgerCommand> {
        let group = required(Some(&self.group), "group").map(GroupId::new)?;

        match self.record_type.trim().to_lowercase().as_str() {
            "member" => Ok(LedgerCommand::Member {
                group,
                member: self.member()?,
            }),
            "expense" => {
                let split_type = SplitType::from_str(required(self.split.as_ref(), "split")?)?;
                Ok(LedgerCommand::Expense {
                    group,
                    id: self.id()?,
                    payer: self.member()?,
                    total: self.amount()?,
                    split_type,
                    entries: parse_entries(self.entries.as_deref().unwrap_or(""), split_type)?,
                })
            }
            "settlement" => Ok(LedgerCommand::Settlement {
                group,
                id: self.id()?,
                from: self.member()?,
                to: required(self.counterparty.as_ref(), "counterparty").map(MemberId::new)?,
                amount: self.amount()?,
                at: self.at()?,
            }),
            "cached_total" => Ok(LedgerCommand::CachedTotal {
                group,
                total: self.amount()?,
            }),
            other => Err(LedgerError::validation(format!(
                "unknown record type '{}'",
                other
            ))),
        }
    }

    fn id(&self) -> Result<u32> {
        self.id
            .ok_or_else(|| LedgerError::validation("id is required"))
    }

    fn member(&self) -> Result<MemberId> {
        required(self.member.as_ref(), "member").map(MemberId::new)
    }

    fn amount(&self) -> Result<Money> {
        let raw = required(self.amount.as_ref(), "amount")?;
        parse_money(raw)
    }

    fn at(&self) -> Result<Option<DateTime<Utc>>> {
        match self.at.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|at| Some(at.with_timezone(&Utc)))
                .map_err(|e| LedgerError::validation(format!("invalid timestamp '{}': {}", raw, e))),
            None => Ok(None),
        }
    }
}

fn required<'a>(value: Option<&'a String>, field: &str) -> Result<&'a str> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| LedgerError::validation(format!("{} is required", field)))
}

fn parse_money(raw: &str) -> Result<Money> {
    Money::from_str(raw)
        .map_err(|e| LedgerError::validation(format!("invalid amount '{}': {}", raw, e)))
}

/// Parses `a;b;c` or `a:40;b:60` into raw split entries.
///
/// Values are read as amounts for exact splits and as percents for
/// percentage splits; equal splits ignore them.
pub fn parse_entries(raw: &str, split_type: SplitType) -> Result<Vec<RawSplitEntry>> {
    raw.split(';')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            let (name, value) = match part.split_once(':') {
                Some((name, value)) => (name.trim(), Some(value.trim())),
                None => (part, None),
            };
            if name.is_empty() {
                return Err(LedgerError::validation(format!(
                    "split entry '{}' has no member",
                    part
                )));
            }

            let mut entry = RawSplitEntry::member(name);
            match (split_type, value) {
                (SplitType::Exact, Some(v)) => entry.amount = Some(parse_money(v)?),
                (SplitType::Percentage, Some(v)) => {
                    let percent = Percent::from_str(v).map_err(|e| {
                        LedgerError::validation(format!("invalid percent '{}': {}", v, e))
                    })?;
                    entry.percent = Some(percent);
                }
                _ => {}
            }
            Ok(entry)
        })
        .collect()
}
