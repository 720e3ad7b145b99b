//! Per-member summaries built on top of recomputed balances.

use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use crate::ledger::{Group, Ledger};
use crate::model::{GroupId, MemberId, Settlement};
use csv::WriterBuilder;
use std::io::Write;

/// Number of settlements listed in a dashboard.
pub const RECENT_SETTLEMENTS: usize = 5;

/// One group as seen by one of its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub group: GroupId,
    pub members: usize,
    pub expenses: usize,
    pub settlements: usize,
    pub total_spent: Money,
    /// Length of the current settlement plan.
    pub suggestions: usize,
    /// The member's own net balance.
    pub net: Money,
}

/// Totals across every group a member belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub member: MemberId,
    pub groups: usize,
    pub expenses: usize,
    pub settlements: usize,
    pub you_owe: Money,
    pub you_get_back: Money,
    /// Latest settlements across those groups, newest first.
    pub recent: Vec<Settlement>,
}

/// Summarizes `group` for `member`.
///
/// # Errors
///
/// `NotFound` if the group does not exist or `member` is not in it.
pub fn group_summary(ledger: &Ledger, group: &GroupId, member: &MemberId) -> Result<GroupSummary> {
    let group = ledger.group(group)?;
    if !group.is_member(member) {
        return Err(LedgerError::NotFound(format!(
            "member '{}' in group '{}'",
            member, group.id
        )));
    }
    summarize(ledger, group, member)
}

fn summarize(ledger: &Ledger, group: &Group, member: &MemberId) -> Result<GroupSummary> {
    let engine = ledger.engine();
    let balances =
        engine.compute_net_balances(&group.members, &group.expenses, &group.settlements)?;
    let plan = ledger.planner().plan(balances.values())?;

    let net = balances.get(member).map(|b| b.net).unwrap_or(Money::ZERO);

    Ok(GroupSummary {
        group: group.id.clone(),
        members: group.members.len(),
        expenses: group.expenses.len(),
        settlements: group.settlements.len(),
        total_spent: engine.total_spent(&group.expenses)?,
        suggestions: plan.len(),
        net,
    })
}

/// Summaries of every group `member` belongs to, in group id order.
pub fn member_groups(ledger: &Ledger, member: &MemberId) -> Result<Vec<GroupSummary>> {
    ledger
        .groups()
        .filter(|g| g.is_member(member))
        .map(|g| summarize(ledger, g, member))
        .collect()
}

/// Builds the cross-group dashboard for `member`.
///
/// A member who belongs to no group gets an all-zero dashboard.
pub fn dashboard(ledger: &Ledger, member: &MemberId) -> Result<Dashboard> {
    let summaries = member_groups(ledger, member)?;

    let you_owe = Money::checked_sum(
        summaries
            .iter()
            .filter(|s| s.net.is_negative())
            .map(|s| s.net.abs()),
    )
    .ok_or_else(|| LedgerError::overflow(format!("debt of '{}'", member)))?;
    let you_get_back = Money::checked_sum(
        summaries
            .iter()
            .filter(|s| s.net.is_positive())
            .map(|s| s.net),
    )
    .ok_or_else(|| LedgerError::overflow(format!("credit of '{}'", member)))?;

    let mut recent: Vec<Settlement> = ledger
        .groups()
        .filter(|g| g.is_member(member))
        .flat_map(|g| g.settlements.iter().cloned())
        .collect();
    recent.sort_by(|a, b| {
        b.at.cmp(&a.at)
            .then_with(|| a.group.cmp(&b.group))
            .then_with(|| b.id.cmp(&a.id))
    });
    recent.truncate(RECENT_SETTLEMENTS);

    Ok(Dashboard {
        member: member.clone(),
        groups: summaries.len(),
        expenses: summaries.iter().map(|s| s.expenses).sum(),
        settlements: summaries.iter().map(|s| s.settlements).sum(),
        you_owe,
        you_get_back,
        recent,
    })
}

/// Writes the per-group summaries of `member` to CSV.
pub fn write_summary<W: Write>(ledger: &Ledger, member: &MemberId, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "group",
        "members",
        "expenses",
        "settlements",
        "total_spent",
        "suggestions",
        "net",
    ])?;

    for summary in member_groups(ledger, member)? {
        csv_writer.write_record([
            summary.group.to_string(),
            summary.members.to_string(),
            summary.expenses.to_string(),
            summary.settlements.to_string(),
            summary.total_spent.to_string(),
            summary.suggestions.to_string(),
            summary.net.to_string(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Writes the dashboard of `member` to CSV: one totals row, then the
/// recent settlements under their own header.
pub fn write_dashboard<W: Write>(ledger: &Ledger, member: &MemberId, writer: W) -> Result<()> {
    let dashboard = dashboard(ledger, member)?;

    let mut csv_writer = WriterBuilder::new().flexible(true).from_writer(writer);
    csv_writer.write_record([
        "member",
        "groups",
        "expenses",
        "settlements",
        "you_owe",
        "you_get_back",
    ])?;
    csv_writer.write_record([
        dashboard.member.to_string(),
        dashboard.groups.to_string(),
        dashboard.expenses.to_string(),
        dashboard.settlements.to_string(),
        dashboard.you_owe.to_string(),
        dashboard.you_get_back.to_string(),
    ])?;

    csv_writer.write_record(["group", "id", "from", "to", "amount", "at"])?;
    for settlement in &dashboard.recent {
        csv_writer.write_record([
            settlement.group.to_string(),
            settlement.id.to_string(),
            settlement.from.to_string(),
            settlement.to.to_string(),
            settlement.amount.to_string(),
            settlement.at.to_rfc3339(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
