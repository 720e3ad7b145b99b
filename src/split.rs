//! Split normalization.
//!
//! Turns a raw split request into owed amounts that reconcile with the
//! expense total to the cent. Output order always equals input order and
//! any rounding remainder lands on the last entry.

use crate::decimal::{Money, Percent};
use crate::error::{LedgerError, Result};
use crate::model::{RawSplitEntry, SplitEntry, SplitType};
use log::debug;
use std::collections::HashSet;

/// Stateless split normalizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SplitNormalizer;

impl SplitNormalizer {
    /// Normalizes `raw` into reconciled split entries.
    ///
    /// # Errors
    ///
    /// - `Validation` for an empty or duplicated entry list, a non-positive
    ///   total, or a missing/out-of-range per-entry input
    /// - `Imbalance` when exact amounts do not add up to `total` or
    ///   percentages do not add up to 100
    pub fn normalize(
        &self,
        total: Money,
        split_type: SplitType,
        raw: &[RawSplitEntry],
    ) -> Result<Vec<SplitEntry>> {
        validate_request(total, raw)?;

        let entries = match split_type {
            SplitType::Equal => split_equal(total, raw)?,
            SplitType::Exact => split_exact(total, raw)?,
            SplitType::Percentage => split_percentage(total, raw)?,
        };

        debug!(
            "Normalized {} split of {} across {} members",
            split_type,
            total,
            entries.len()
        );
        Ok(entries)
    }
}

fn validate_request(total: Money, raw: &[RawSplitEntry]) -> Result<()> {
    if raw.is_empty() {
        return Err(LedgerError::validation("split entries must be non-empty"));
    }

    if !total.is_positive() {
        return Err(LedgerError::validation(format!(
            "total amount must be greater than 0, got {}",
            total
        )));
    }

    let mut seen = HashSet::with_capacity(raw.len());
    for entry in raw {
        if !seen.insert(&entry.member) {
            return Err(LedgerError::validation(format!(
                "duplicate member '{}' in split entries",
                entry.member
            )));
        }
    }

    Ok(())
}

fn split_equal(total: Money, raw: &[RawSplitEntry]) -> Result<Vec<SplitEntry>> {
    let per_head = total
        .per_head(raw.len())
        .ok_or_else(|| LedgerError::validation("split entries must be non-empty"))?;

    let mut entries: Vec<SplitEntry> = raw
        .iter()
        .map(|r| SplitEntry {
            member: r.member.clone(),
            owed: per_head,
            percent: None,
        })
        .collect();

    absorb_remainder(&mut entries, total)?;
    Ok(entries)
}

fn split_exact(total: Money, raw: &[RawSplitEntry]) -> Result<Vec<SplitEntry>> {
    let entries = raw
        .iter()
        .map(|r| {
            let amount = r.amount.ok_or_else(|| {
                LedgerError::validation(format!(
                    "amount is required for '{}' in an exact split",
                    r.member
                ))
            })?;
            if amount.is_negative() {
                return Err(LedgerError::validation(format!(
                    "split amount for '{}' must be >= 0",
                    r.member
                )));
            }
            Ok(SplitEntry {
                member: r.member.clone(),
                owed: amount,
                percent: None,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let sum = Money::checked_sum(entries.iter().map(|e| e.owed))
        .ok_or_else(|| LedgerError::overflow("sum of exact split amounts"))?;
    if sum != total {
        return Err(LedgerError::imbalance(format!(
            "exact split sum must match total amount ({} != {})",
            sum, total
        )));
    }

    Ok(entries)
}

fn split_percentage(total: Money, raw: &[RawSplitEntry]) -> Result<Vec<SplitEntry>> {
    let percents = raw
        .iter()
        .map(|r| {
            let percent = r.percent.ok_or_else(|| {
                LedgerError::validation(format!(
                    "percent is required for '{}' in a percentage split",
                    r.member
                ))
            })?;
            if !percent.is_positive() {
                return Err(LedgerError::validation(format!(
                    "percent for '{}' must be > 0",
                    r.member
                )));
            }
            Ok(percent)
        })
        .collect::<Result<Vec<Percent>>>()?;

    let percent_total = Percent::checked_sum(percents.iter().copied())
        .ok_or_else(|| LedgerError::overflow("sum of split percentages"))?;
    if percent_total != Percent::WHOLE {
        return Err(LedgerError::imbalance(format!(
            "total percentage must be 100, got {}",
            percent_total
        )));
    }

    let mut entries = raw
        .iter()
        .zip(percents)
        .map(|(r, percent)| {
            let owed = total.share_of(percent).ok_or_else(|| {
                LedgerError::overflow(format!("share of '{}'", r.member))
            })?;
            Ok(SplitEntry {
                member: r.member.clone(),
                owed,
                percent: Some(percent),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    absorb_remainder(&mut entries, total)?;
    Ok(entries)
}

/// Sets the last entry to `total - sum(previous)`.
///
/// Operates on the owned, freshly built entry list by index so the
/// remainder position is always the last input position.
fn absorb_remainder(entries: &mut [SplitEntry], total: Money) -> Result<()> {
    let Some(last) = entries.len().checked_sub(1) else {
        return Ok(());
    };

    let remainder = Money::checked_sum(entries[..last].iter().map(|e| e.owed))
        .and_then(|preceding| total.checked_sub(preceding))
        .ok_or_else(|| LedgerError::overflow("split remainder"))?;
    if remainder.is_negative() {
        return Err(LedgerError::validation(format!(
            "total {} is too small to split across {} members",
            total,
            entries.len()
        )));
    }

    entries[last].owed = remainder;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn money(s: &str) -> Money {
        Money::from_str(s).unwrap()
    }

    fn pct(s: &str) -> Percent {
        Percent::from_str(s).unwrap()
    }

    fn owed(entries: &[SplitEntry]) -> Vec<String> {
        entries.iter().map(|e| e.owed.to_string()).collect()
    }

    fn members(names: &[&str]) -> Vec<RawSplitEntry> {
        names.iter().map(|n| RawSplitEntry::member(*n)).collect()
    }

    #[test]
    fn test_equal_split_last_absorbs_remainder() {
        let entries = SplitNormalizer
            .normalize(money("100"), SplitType::Equal, &members(&["a", "b", "c"]))
            .unwrap();

        assert_eq!(owed(&entries), vec!["33.33", "33.33", "33.34"]);
        let members: Vec<&str> = entries.iter().map(|e| e.member.as_str()).collect();
        assert_eq!(members, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_equal_split_remainder_follows_input_order() {
        let entries = SplitNormalizer
            .normalize(money("100"), SplitType::Equal, &members(&["c", "a", "b"]))
            .unwrap();

        assert_eq!(entries[2].member.as_str(), "b");
        assert_eq!(entries[2].owed.to_string(), "33.34");
    }

    #[test]
    fn test_equal_split_rounding_up_is_absorbed_downwards() {
        let entries = SplitNormalizer
            .normalize(money("0.05"), SplitType::Equal, &members(&["a", "b"]))
            .unwrap();

        assert_eq!(owed(&entries), vec!["0.03", "0.02"]);
    }

    #[test]
    fn test_equal_split_single_member_owes_everything() {
        let entries = SplitNormalizer
            .normalize(money("12.34"), SplitType::Equal, &members(&["a"]))
            .unwrap();

        assert_eq!(owed(&entries), vec!["12.34"]);
    }

    #[test]
    fn test_equal_split_too_small_total_is_rejected() {
        let names = ["a", "b", "c", "d", "e", "f", "g", "h", "i", "j"];
        let err = SplitNormalizer
            .normalize(money("0.05"), SplitType::Equal, &members(&names))
            .unwrap_err();

        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_exact_split_accepts_matching_sum() {
        let raw = vec![
            RawSplitEntry::with_amount("a", money("10.10")),
            RawSplitEntry::with_amount("b", money("0")),
            RawSplitEntry::with_amount("c", money("19.90")),
        ];

        let entries = SplitNormalizer
            .normalize(money("30"), SplitType::Exact, &raw)
            .unwrap();

        assert_eq!(owed(&entries), vec!["10.10", "0.00", "19.90"]);
    }

    #[test]
    fn test_exact_split_mismatch_is_imbalance() {
        let raw = vec![
            RawSplitEntry::with_amount("a", money("10")),
            RawSplitEntry::with_amount("b", money("19.99")),
        ];

        let err = SplitNormalizer
            .normalize(money("30"), SplitType::Exact, &raw)
            .unwrap_err();

        assert!(matches!(err, LedgerError::Imbalance(_)));
        assert!(err
            .to_string()
            .contains("exact split sum must match total amount"));
    }

    #[test]
    fn test_exact_split_requires_amounts() {
        let raw = vec![
            RawSplitEntry::with_amount("a", money("10")),
            RawSplitEntry::member("b"),
        ];

        let err = SplitNormalizer
            .normalize(money("10"), SplitType::Exact, &raw)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_exact_split_rejects_negative_amount() {
        let raw = vec![
            RawSplitEntry::with_amount("a", money("15")),
            RawSplitEntry::with_amount("b", money("-5")),
        ];

        let err = SplitNormalizer
            .normalize(money("10"), SplitType::Exact, &raw)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_percentage_split() {
        let raw = vec![
            RawSplitEntry::with_percent("a", pct("40")),
            RawSplitEntry::with_percent("b", pct("30")),
            RawSplitEntry::with_percent("c", pct("30")),
        ];

        let entries = SplitNormalizer
            .normalize(money("90"), SplitType::Percentage, &raw)
            .unwrap();

        assert_eq!(owed(&entries), vec!["36.00", "27.00", "27.00"]);
        assert_eq!(entries[0].percent, Some(pct("40")));
    }

    #[test]
    fn test_percentage_split_absorbs_rounding() {
        let raw = vec![
            RawSplitEntry::with_percent("a", pct("33.33")),
            RawSplitEntry::with_percent("b", pct("33.33")),
            RawSplitEntry::with_percent("c", pct("33.34")),
        ];

        let entries = SplitNormalizer
            .normalize(money("10"), SplitType::Percentage, &raw)
            .unwrap();

        assert_eq!(owed(&entries), vec!["3.33", "3.33", "3.34"]);
    }

    #[test]
    fn test_percentage_not_summing_to_hundred_is_imbalance() {
        let raw = vec![
            RawSplitEntry::with_percent("a", pct("50")),
            RawSplitEntry::with_percent("b", pct("49.99")),
        ];

        let err = SplitNormalizer
            .normalize(money("10"), SplitType::Percentage, &raw)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Imbalance(_)));
    }

    #[test]
    fn test_percentage_must_be_positive() {
        let raw = vec![
            RawSplitEntry::with_percent("a", pct("100")),
            RawSplitEntry::with_percent("b", pct("0")),
        ];

        let err = SplitNormalizer
            .normalize(money("10"), SplitType::Percentage, &raw)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_exact_split_overflowing_sum_is_rejected() {
        let raw = vec![
            RawSplitEntry::with_amount("a", money("40000000000000000000000000000")),
            RawSplitEntry::with_amount("b", money("40000000000000000000000000000")),
        ];

        let err = SplitNormalizer
            .normalize(money("40000000000000000000000000000"), SplitType::Exact, &raw)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_percentage_split_overflowing_percents_is_rejected() {
        let raw = vec![
            RawSplitEntry::with_percent("a", pct("50000000000000000000000000000")),
            RawSplitEntry::with_percent("b", pct("50000000000000000000000000000")),
        ];

        let err = SplitNormalizer
            .normalize(money("10"), SplitType::Percentage, &raw)
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_rejects_empty_entries() {
        let err = SplitNormalizer
            .normalize(money("10"), SplitType::Equal, &[])
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
    }

    #[test]
    fn test_rejects_non_positive_total() {
        for total in ["0", "-5"] {
            let err = SplitNormalizer
                .normalize(money(total), SplitType::Equal, &members(&["a"]))
                .unwrap_err();
            assert!(matches!(err, LedgerError::Validation(_)));
        }
    }

    #[test]
    fn test_rejects_duplicate_members() {
        let err = SplitNormalizer
            .normalize(money("10"), SplitType::Equal, &members(&["a", "b", "a"]))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate member 'a'"));
    }
}
