//! In-memory group ledger.
//!
//! This is the layer around the pure engine: it owns each group's member
//! set and append-only history, validates new expenses and settlements
//! against the balances computed from that history, and renders reports.
//! All mutation goes through `&mut self`, so read-validate-append for a
//! group is a single exclusive step.

use crate::balance::BalanceEngine;
use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use crate::model::{
    Expense, GroupId, MemberId, NetBalance, PlanEntry, RawSplitEntry, Settlement, SplitType,
};
use crate::record::{LedgerCommand, LedgerRecord};
use crate::settlement::SettlementPlanner;
use crate::split::SplitNormalizer;
use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, Trim};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// A group's declared members and its full history.
#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,

    /// Members in declaration order.
    pub members: Vec<MemberId>,

    pub expenses: Vec<Expense>,

    pub settlements: Vec<Settlement>,

    /// Running total reported by an external store. Never used for
    /// balances, only checked for drift.
    pub cached_total: Option<Money>,
}

impl Group {
    pub fn new(id: GroupId) -> Self {
        Group {
            id,
            members: Vec::new(),
            expenses: Vec::new(),
            settlements: Vec::new(),
            cached_total: None,
        }
    }

    pub fn is_member(&self, member: &MemberId) -> bool {
        self.members.contains(member)
    }

    fn require_member(&self, member: &MemberId, role: &str) -> Result<()> {
        if self.is_member(member) {
            Ok(())
        } else {
            Err(LedgerError::validation(format!(
                "{} '{}' is not a member of group '{}'",
                role, member, self.id
            )))
        }
    }

    fn has_expense(&self, id: u32) -> bool {
        self.expenses.iter().any(|e| e.id == id)
    }

    fn has_settlement(&self, id: u32) -> bool {
        self.settlements.iter().any(|s| s.id == id)
    }

    /// Recomputes balances and the total spent so that a history whose
    /// amounts no longer fit in a decimal is caught at append time.
    fn check_history(&self, engine: BalanceEngine) -> Result<()> {
        engine.compute_net_balances(&self.members, &self.expenses, &self.settlements)?;
        engine.total_spent(&self.expenses)?;
        Ok(())
    }
}

/// The ledger: groups indexed by id.
///
/// # Output Ordering
///
/// Groups are reported in ascending id order and members in declaration
/// order, so every report is reproducible.
pub struct Ledger {
    groups: BTreeMap<GroupId, Group>,

    normalizer: SplitNormalizer,
    engine: BalanceEngine,
    planner: SettlementPlanner,

    /// Fail on the first rejected row or cached-total drift instead of
    /// logging and continuing.
    strict: bool,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Ledger {
            groups: BTreeMap::new(),
            normalizer: SplitNormalizer,
            engine: BalanceEngine,
            planner: SettlementPlanner,
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn group(&self, id: &GroupId) -> Result<&Group> {
        self.groups
            .get(id)
            .ok_or_else(|| LedgerError::NotFound(format!("group '{}'", id)))
    }

    fn group_mut(&mut self, id: &GroupId) -> Result<&mut Group> {
        self.groups
            .get_mut(id)
            .ok_or_else(|| LedgerError::NotFound(format!("group '{}'", id)))
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    /// Declares a member, creating the group if it does not exist yet.
    pub fn add_member(&mut self, group: GroupId, member: MemberId) -> Result<()> {
        let entry = self
            .groups
            .entry(group.clone())
            .or_insert_with(|| Group::new(group));

        if entry.is_member(&member) {
            return Err(LedgerError::validation(format!(
                "member '{}' already belongs to group '{}'",
                member, entry.id
            )));
        }

        debug!("Added member {} to group {}", member, entry.id);
        entry.members.push(member);
        Ok(())
    }

    /// Normalizes and records a new expense.
    ///
    /// An expense that would push a balance or the group total out of the
    /// decimal range is rejected with `Validation` and not recorded.
    pub fn add_expense(
        &mut self,
        group: &GroupId,
        id: u32,
        payer: MemberId,
        total: Money,
        split_type: SplitType,
        raw: &[RawSplitEntry],
    ) -> Result<&Expense> {
        let normalizer = self.normalizer;
        let engine = self.engine;
        let group = self.group_mut(group)?;

        if group.has_expense(id) {
            return Err(LedgerError::validation(format!(
                "duplicate expense id {} in group '{}'",
                id, group.id
            )));
        }
        group.require_member(&payer, "payer")?;
        for entry in raw {
            group.require_member(&entry.member, "split member")?;
        }

        let entries = normalizer.normalize(total, split_type, raw)?;

        group.expenses.push(Expense {
            id,
            group: group.id.clone(),
            payer,
            total,
            split_type,
            entries,
        });
        if let Err(e) = group.check_history(engine) {
            group.expenses.pop();
            return Err(e);
        }

        let expense = group
            .expenses
            .last()
            .ok_or_else(|| LedgerError::consistency("recorded expense is missing"))?;
        debug!(
            "Recorded expense {} of {} paid by {} in group {}",
            expense.id, expense.total, expense.payer, group.id
        );
        Ok(expense)
    }

    /// Records a settlement after checking it against current balances.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown group
    /// - `Validation` for a non-positive amount, a self-payment, a
    ///   non-member, or a duplicate id
    /// - `ExceedsDebt` if `amount` is larger than what `from` owes
    pub fn record_settlement(
        &mut self,
        group: &GroupId,
        id: u32,
        from: MemberId,
        to: MemberId,
        amount: Money,
        at: DateTime<Utc>,
    ) -> Result<&Settlement> {
        let engine = self.engine;
        let group = self.group_mut(group)?;

        if group.has_settlement(id) {
            return Err(LedgerError::validation(format!(
                "duplicate settlement id {} in group '{}'",
                id, group.id
            )));
        }
        if from == to {
            return Err(LedgerError::validation("from and to cannot be the same member"));
        }
        if !amount.is_positive() {
            return Err(LedgerError::validation(format!(
                "settlement amount must be greater than 0, got {}",
                amount
            )));
        }
        group.require_member(&from, "from")?;
        group.require_member(&to, "to")?;

        let balances =
            engine.compute_net_balances(&group.members, &group.expenses, &group.settlements)?;
        let outstanding = engine.outstanding_debt(&balances, &from)?;
        if amount > outstanding {
            return Err(LedgerError::ExceedsDebt {
                member: from,
                requested: amount,
                outstanding,
            });
        }

        debug!(
            "Recorded settlement {} of {} from {} to {} in group {}",
            id, amount, from, to, group.id
        );
        group.settlements.push(Settlement {
            id,
            group: group.id.clone(),
            from,
            to,
            amount,
            at,
        });
        group
            .settlements
            .last()
            .ok_or_else(|| LedgerError::consistency("recorded settlement is missing"))
    }

    /// Stores the running total reported by an external store.
    pub fn set_cached_total(&mut self, group: &GroupId, total: Money) -> Result<()> {
        self.group_mut(group)?.cached_total = Some(total);
        Ok(())
    }

    /// Net balances of a group, in member declaration order.
    pub fn balances(&self, group: &GroupId) -> Result<Vec<NetBalance>> {
        let group = self.group(group)?;
        let mut by_member =
            self.engine
                .compute_net_balances(&group.members, &group.expenses, &group.settlements)?;

        group
            .members
            .iter()
            .map(|m| {
                by_member.remove(m).ok_or_else(|| {
                    LedgerError::consistency(format!("no balance computed for '{}'", m))
                })
            })
            .collect()
    }

    /// Suggested payments that settle a group.
    pub fn plan(&self, group: &GroupId) -> Result<Vec<PlanEntry>> {
        let balances = self.balances(group)?;
        self.planner.plan(&balances)
    }

    /// Settlements of a group, newest first.
    pub fn settlement_log(&self, group: &GroupId) -> Result<Vec<&Settlement>> {
        let mut log: Vec<&Settlement> = self.group(group)?.settlements.iter().collect();
        log.sort_by(|a, b| b.at.cmp(&a.at).then_with(|| b.id.cmp(&a.id)));
        Ok(log)
    }

    /// Checks every group's cached running total against its history.
    ///
    /// Drift is logged at warn level, or returned as an error in strict mode.
    pub fn audit_cached_totals(&self) -> Result<()> {
        for group in self.groups.values() {
            let Some(cached) = group.cached_total else {
                continue;
            };
            match self.engine.verify_cached_total(cached, &group.expenses) {
                Ok(_) => debug!("Cached total of group {} matches history", group.id),
                Err(e) if self.strict => return Err(e),
                Err(e) => warn!("Group {}: {}", group.id, e),
            }
        }
        Ok(())
    }

    pub(crate) fn engine(&self) -> BalanceEngine {
        self.engine
    }

    pub(crate) fn planner(&self) -> SettlementPlanner {
        self.planner
    }

    /// Applies one parsed command.
    pub fn apply(&mut self, command: LedgerCommand) -> Result<()> {
        match command {
            LedgerCommand::Member { group, member } => self.add_member(group, member),
            LedgerCommand::Expense {
                group,
                id,
                payer,
                total,
                split_type,
                entries,
            } => self
                .add_expense(&group, id, payer, total, split_type, &entries)
                .map(|_| ()),
            LedgerCommand::Settlement {
                group,
                id,
                from,
                to,
                amount,
                at,
            } => self
                .record_settlement(&group, id, from, to, amount, at.unwrap_or_else(Utc::now))
                .map(|_| ()),
            LedgerCommand::CachedTotal { group, total } => self.set_cached_total(&group, total),
        }
    }

    /// Reads ledger records from CSV and applies them in order.
    ///
    /// Rejected rows are logged at warn level and skipped, unless the
    /// ledger is strict, in which case the first rejection is returned.
    /// Returns the number of rejected rows.
    pub fn process_csv<R: Read>(&mut self, reader: R) -> Result<usize> {
        let mut csv_reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(reader);

        let mut rejected = 0;
        for (row_idx, result) in csv_reader.deserialize::<LedgerRecord>().enumerate() {
            let row = row_idx + 2; // 1-indexed, accounting for header row

            let outcome = result
                .map_err(LedgerError::from)
                .and_then(|record| record.parse())
                .and_then(|command| self.apply(command));

            if let Err(e) = outcome {
                if self.strict {
                    return Err(LedgerError::Row {
                        row,
                        source: Box::new(e),
                    });
                }
                warn!("Row {}: {}", row, e);
                rejected += 1;
            }
        }

        info!(
            "Loaded {} groups, {} rows rejected",
            self.groups.len(),
            rejected
        );
        Ok(rejected)
    }

    /// Writes every group's balances to CSV.
    pub fn write_balances<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["group", "member", "net", "status"])?;

        for group in self.groups.values() {
            for balance in self.balances(&group.id)? {
                csv_writer.write_record([
                    group.id.to_string(),
                    balance.member.to_string(),
                    balance.net.to_string(),
                    balance.status().to_string(),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes every group's settlement plan to CSV.
    pub fn write_plan<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["group", "from", "to", "amount"])?;

        for group in self.groups.values() {
            for entry in self.plan(&group.id)? {
                csv_writer.write_record([
                    group.id.to_string(),
                    entry.from.to_string(),
                    entry.to.to_string(),
                    entry.amount.to_string(),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }

    /// Writes every group's settlement log to CSV, newest first.
    pub fn write_settlements<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["group", "id", "from", "to", "amount", "at"])?;

        for group in self.groups.values() {
            for settlement in self.settlement_log(&group.id)? {
                csv_writer.write_record([
                    group.id.to_string(),
                    settlement.id.to_string(),
                    settlement.from.to_string(),
                    settlement.to.to_string(),
                    settlement.amount.to_string(),
                    settlement.at.to_rfc3339(),
                ])?;
            }
        }

        csv_writer.flush()?;
        Ok(())
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
