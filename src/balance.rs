//! Net balance aggregation.
//!
//! Balances are always recomputed from the complete expense and settlement
//! history. Nothing here reads a stored running total; a cached total can
//! only be checked against the history, never used in its place.

use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use crate::model::{Expense, MemberId, NetBalance, Settlement};
use log::debug;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

/// Net balances keyed by member, in member id order.
pub type Balances = BTreeMap<MemberId, NetBalance>;

/// Stateless balance engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct BalanceEngine;

impl BalanceEngine {
    /// Computes every declared member's signed net balance.
    ///
    /// The payer of an expense is credited with its total and every split
    /// member is debited with their owed amount. A settlement credits its
    /// payer and debits its receiver. Values are accumulated unrounded and
    /// rounded to the cent once at the end, so the result does not depend
    /// on the order of `expenses` or `settlements`.
    ///
    /// # Errors
    ///
    /// - `Consistency` if any expense or settlement references a member that
    ///   is not in `members`
    /// - `Validation` if a running balance leaves the decimal range
    pub fn compute_net_balances<'a, M>(
        &self,
        members: M,
        expenses: &[Expense],
        settlements: &[Settlement],
    ) -> Result<Balances>
    where
        M: IntoIterator<Item = &'a MemberId>,
    {
        let mut running: BTreeMap<&MemberId, Decimal> =
            members.into_iter().map(|m| (m, Decimal::ZERO)).collect();

        for expense in expenses {
            credit(&mut running, &expense.payer, expense.total.value(), || {
                format!("payer of expense {}", expense.id)
            })?;
            for entry in &expense.entries {
                credit(&mut running, &entry.member, -entry.owed.value(), || {
                    format!("split member of expense {}", expense.id)
                })?;
            }
        }

        for settlement in settlements {
            credit(&mut running, &settlement.from, settlement.amount.value(), || {
                format!("payer of settlement {}", settlement.id)
            })?;
            credit(&mut running, &settlement.to, -settlement.amount.value(), || {
                format!("receiver of settlement {}", settlement.id)
            })?;
        }

        let balances: Balances = running
            .into_iter()
            .map(|(member, net)| {
                let balance = NetBalance::new(member.clone(), Money::new(net));
                (member.clone(), balance)
            })
            .collect();

        debug!(
            "Computed balances for {} members from {} expenses and {} settlements",
            balances.len(),
            expenses.len(),
            settlements.len()
        );

        Ok(balances)
    }

    /// What `member` currently owes, or zero if they are not a debtor.
    ///
    /// # Errors
    ///
    /// `Consistency` if `member` has no balance entry.
    pub fn outstanding_debt(&self, balances: &Balances, member: &MemberId) -> Result<Money> {
        balances
            .get(member)
            .map(NetBalance::outstanding_debt)
            .ok_or_else(|| {
                LedgerError::consistency(format!("member '{}' is not part of the group", member))
            })
    }

    /// Sum of all expense totals, recomputed from history.
    ///
    /// # Errors
    ///
    /// `Validation` if the sum leaves the decimal range.
    pub fn total_spent(&self, expenses: &[Expense]) -> Result<Money> {
        Money::checked_sum(expenses.iter().map(|e| e.total))
            .ok_or_else(|| LedgerError::overflow("total spent"))
    }

    /// Checks a cached running total against the recomputed expense total.
    ///
    /// Returns the recomputed total on success.
    ///
    /// # Errors
    ///
    /// `Consistency` when the cached value has drifted.
    pub fn verify_cached_total(&self, cached: Money, expenses: &[Expense]) -> Result<Money> {
        let actual = self.total_spent(expenses)?;
        if cached != actual {
            return Err(LedgerError::consistency(format!(
                "cached group total {} drifted from recomputed total {}",
                cached, actual
            )));
        }
        Ok(actual)
    }
}

fn credit<F>(
    running: &mut BTreeMap<&MemberId, Decimal>,
    member: &MemberId,
    amount: Decimal,
    role: F,
) -> Result<()>
where
    F: FnOnce() -> String,
{
    let Some(net) = running.get_mut(member) else {
        return Err(LedgerError::consistency(format!(
            "member '{}' ({}) is not part of the group",
            member,
            role()
        )));
    };

    *net = net
        .checked_add(amount)
        .ok_or_else(|| LedgerError::overflow(format!("balance of '{}' ({})", member, role())))?;
    Ok(())
}
