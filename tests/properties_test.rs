//! Property tests for split reconciliation, balance aggregation and planning.

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use split_ledger::{
    BalanceEngine, Expense, GroupId, LedgerError, MemberId, Money, NetBalance, Percent,
    RawSplitEntry, Settlement, SettlementPlanner, SplitNormalizer, SplitType,
};
use std::collections::BTreeMap;

fn member(idx: usize) -> MemberId {
    MemberId::new(format!("m{}", idx))
}

fn members(count: usize) -> Vec<MemberId> {
    (0..count).map(member).collect()
}

/// Builds reconciled expenses: (payer index, total in cents, split member mask).
fn expenses(member_count: usize, rows: &[(usize, i64, usize)]) -> Vec<Expense> {
    rows
        .iter()
        .enumerate()
        .map(|(idx, &(payer, cents, mask))| {
            let mut raw: Vec<RawSplitEntry> = (0..member_count)
                .filter(|m| mask & (1 << m) != 0)
                .map(|m| RawSplitEntry::member(member(m)))
                .collect();
            if raw.is_empty() {
                raw.push(RawSplitEntry::member(member(0)));
            }
            let total = Money::from_cents(cents);
            let entries = SplitNormalizer
                .normalize(total, SplitType::Equal, &raw)
                .unwrap();
            Expense {
                id: idx as u32,
                group: GroupId::from("g"),
                payer: member(payer % member_count),
                total,
                split_type: SplitType::Equal,
                entries,
            }
        })
        .collect()
}

fn settlements(member_count: usize, rows: &[(usize, usize, i64)]) -> Vec<Settlement> {
    rows
        .iter()
        .enumerate()
        .map(|(idx, &(from, to, cents))| Settlement {
            id: 1000 + idx as u32,
            group: GroupId::from("g"),
            from: member(from % member_count),
            to: member(to % member_count),
            amount: Money::from_cents(cents),
            at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        })
        .collect()
}

proptest! {
    #[test]
    fn equal_split_reconciles(cents in 1i64..=10_000_000, n in 1usize..=12) {
        let raw: Vec<RawSplitEntry> = (0..n).map(|i| RawSplitEntry::member(member(i))).collect();
        let total = Money::from_cents(cents);

        match SplitNormalizer.normalize(total, SplitType::Equal, &raw) {
            Ok(entries) => {
                let sum: Money = entries.iter().map(|e| e.owed).sum();
                prop_assert_eq!(sum, total);
                prop_assert!(entries.iter().all(|e| !e.owed.is_negative()));

                let first = entries[0].owed;
                prop_assert!(entries[..n - 1].iter().all(|e| e.owed == first));
                for (entry, raw) in entries.iter().zip(&raw) {
                    prop_assert_eq!(&entry.member, &raw.member);
                }
            }
            Err(e) => prop_assert!(matches!(e, LedgerError::Validation(_))),
        }
    }

    #[test]
    fn equal_split_spread_is_one_cent_up_to_three_members(
        cents in 1i64..=10_000_000,
        n in 1usize..=3,
    ) {
        let raw: Vec<RawSplitEntry> = (0..n).map(|i| RawSplitEntry::member(member(i))).collect();
        let entries = SplitNormalizer
            .normalize(Money::from_cents(cents), SplitType::Equal, &raw)
            .unwrap();

        let max = entries.iter().map(|e| e.owed).max().unwrap();
        let min = entries.iter().map(|e| e.owed).min().unwrap();
        prop_assert!(max - min <= Money::from_cents(1));
    }

    #[test]
    fn percentage_split_reconciles(
        cents in 100_000i64..=10_000_000,
        weights in prop::collection::vec(1i64..=500, 1..=8),
    ) {
        // Turn weights into basis points that add up to exactly 100.00%.
        let weight_total: i64 = weights.iter().sum();
        let mut basis: Vec<i64> = weights.iter().map(|w| (w * 10_000 / weight_total).max(1)).collect();
        let assigned: i64 = basis.iter().sum();
        let last = basis.len() - 1;
        basis[last] += 10_000 - assigned;
        prop_assume!(basis[last] > 0);

        let raw: Vec<RawSplitEntry> = basis
            .iter()
            .enumerate()
            .map(|(i, bp)| {
                let percent = Percent::new(rust_decimal::Decimal::new(*bp, 2));
                RawSplitEntry::with_percent(member(i), percent)
            })
            .collect();
        let total = Money::from_cents(cents);

        let entries = SplitNormalizer.normalize(total, SplitType::Percentage, &raw).unwrap();
        let sum: Money = entries.iter().map(|e| e.owed).sum();
        prop_assert_eq!(sum, total);
    }

    #[test]
    fn exact_split_mismatch_is_imbalance(a in 0i64..=100_000, b in 0i64..=100_000, off in 1i64..=100) {
        let raw = vec![
            RawSplitEntry::with_amount(member(0), Money::from_cents(a)),
            RawSplitEntry::with_amount(member(1), Money::from_cents(b)),
        ];
        let total = Money::from_cents(a + b + off);

        let err = SplitNormalizer.normalize(total, SplitType::Exact, &raw).unwrap_err();
        prop_assert!(matches!(err, LedgerError::Imbalance(_)));
    }

    #[test]
    fn balances_sum_to_zero_and_ignore_order(
        member_count in 1usize..=6,
        expense_rows in prop::collection::vec((0usize..6, 100i64..=100_000, 1usize..64), 0..=20),
        settlement_rows in prop::collection::vec((0usize..6, 0usize..6, 1i64..=10_000), 0..=10),
        rotate in 0usize..=20,
    ) {
        let members = members(member_count);
        let mut expenses = expenses(member_count, &expense_rows);
        let mut settlements = settlements(member_count, &settlement_rows);

        let forward = BalanceEngine
            .compute_net_balances(&members, &expenses, &settlements)
            .unwrap();
        let total: Money = forward.values().map(|b| b.net).sum();
        prop_assert!(total.is_zero());

        if !expenses.is_empty() {
            let shift = rotate % expenses.len();
            expenses.rotate_left(shift);
        }
        settlements.reverse();
        let shuffled = BalanceEngine
            .compute_net_balances(members.iter().rev(), &expenses, &settlements)
            .unwrap();
        prop_assert_eq!(forward, shuffled);
    }

    #[test]
    fn plan_settles_everyone(
        member_count in 2usize..=8,
        expense_rows in prop::collection::vec((0usize..8, 100i64..=100_000, 1usize..256), 1..=25),
    ) {
        let members = members(member_count);
        let expenses = expenses(member_count, &expense_rows);
        let balances = BalanceEngine.compute_net_balances(&members, &expenses, &[]).unwrap();

        let plan = SettlementPlanner.plan(balances.values()).unwrap();

        let mut paid: BTreeMap<MemberId, Money> = BTreeMap::new();
        let mut nets: BTreeMap<MemberId, Money> =
            balances.iter().map(|(m, b)| (m.clone(), b.net)).collect();
        for entry in &plan {
            prop_assert!(entry.amount.is_positive());
            prop_assert_ne!(&entry.from, &entry.to);
            *paid.entry(entry.from.clone()).or_default() += entry.amount;
            *nets.get_mut(&entry.from).unwrap() += entry.amount;
            *nets.get_mut(&entry.to).unwrap() -= entry.amount;
        }

        prop_assert!(nets.values().all(Money::is_zero));
        for balance in balances.values().filter(|b| b.net.is_negative()) {
            prop_assert_eq!(paid.get(&balance.member).copied(), Some(balance.net.abs()));
        }
        prop_assert!(plan.len() < member_count);
    }

    #[test]
    fn plan_is_independent_of_balance_order(
        member_count in 2usize..=8,
        expense_rows in prop::collection::vec((0usize..8, 100i64..=100_000, 1usize..256), 1..=25),
        rotate in 0usize..8,
    ) {
        let members = members(member_count);
        let expenses = expenses(member_count, &expense_rows);
        let balances = BalanceEngine.compute_net_balances(&members, &expenses, &[]).unwrap();

        let mut ordered: Vec<NetBalance> = balances.values().cloned().collect();
        let expected = SettlementPlanner.plan(&ordered).unwrap();

        ordered.rotate_left(rotate % member_count);
        ordered.reverse();
        prop_assert_eq!(SettlementPlanner.plan(&ordered).unwrap(), expected);
    }
}
