//! Settlement planning.
//!
//! Matches debtors against creditors with a greedy two-pointer walk over
//! both sides sorted by descending amount (ties by member id ascending).
//! The output only depends on the balance values, never on the order in
//! which balances were supplied.

use crate::decimal::Money;
use crate::error::{LedgerError, Result};
use crate::model::{MemberId, NetBalance, PlanEntry};
use log::debug;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Stateless settlement planner.
#[derive(Debug, Clone, Copy, Default)]
pub struct SettlementPlanner;

/// One side of the matching, with the amount still to be paid or received.
#[derive(Debug)]
struct Party {
    member: MemberId,
    remaining: Money,
}

impl SettlementPlanner {
    /// Produces payments that bring every balance to zero.
    ///
    /// This is a greedy heuristic: it usually yields few transactions, but
    /// is not guaranteed to find the global minimum.
    ///
    /// # Errors
    ///
    /// - `Consistency` if the balances do not sum to zero or a member
    ///   appears more than once
    /// - `Validation` if the balances are too large to add up
    pub fn plan<'a, I>(&self, balances: I) -> Result<Vec<PlanEntry>>
    where
        I: IntoIterator<Item = &'a NetBalance>,
    {
        let mut seen = HashSet::new();
        let mut creditors = Vec::new();
        let mut debtors = Vec::new();
        let mut sum = Money::ZERO;

        for balance in balances {
            if !seen.insert(&balance.member) {
                return Err(LedgerError::consistency(format!(
                    "member '{}' has more than one balance",
                    balance.member
                )));
            }
            sum = sum
                .checked_add(balance.net)
                .ok_or_else(|| LedgerError::overflow("sum of balances"))?;

            let party = Party {
                member: balance.member.clone(),
                remaining: balance.net.abs(),
            };
            if balance.net.is_positive() {
                creditors.push(party);
            } else if balance.net.is_negative() {
                debtors.push(party);
            }
        }

        if !sum.is_zero() {
            return Err(LedgerError::consistency(format!(
                "balances must sum to zero, got {}",
                sum
            )));
        }

        creditors.sort_by(by_amount_then_member);
        debtors.sort_by(by_amount_then_member);

        let plan = match_parties(debtors, creditors);
        debug!("Planned {} settlement transactions", plan.len());
        Ok(plan)
    }
}

/// Descending amount, then ascending member id.
fn by_amount_then_member(a: &Party, b: &Party) -> Ordering {
    b.remaining
        .cmp(&a.remaining)
        .then_with(|| a.member.cmp(&b.member))
}

fn match_parties(mut debtors: Vec<Party>, mut creditors: Vec<Party>) -> Vec<PlanEntry> {
    let mut plan = Vec::with_capacity(debtors.len().max(creditors.len()));
    let (mut i, mut j) = (0, 0);

    while i < debtors.len() && j < creditors.len() {
        let amount = debtors[i].remaining.min(creditors[j].remaining);

        plan.push(PlanEntry {
            from: debtors[i].member.clone(),
            to: creditors[j].member.clone(),
            amount,
        });

        debtors[i].remaining -= amount;
        creditors[j].remaining -= amount;

        if debtors[i].remaining.is_zero() {
            i += 1;
        }
        if creditors[j].remaining.is_zero() {
            j += 1;
        }
    }

    plan
}
