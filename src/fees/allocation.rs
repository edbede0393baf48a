use serde::{Deserialize, Serialize};

use crate::config::ComplianceConfig;
use crate::decimal::Money;
use crate::errors::{FinanceError, Result};
use crate::fees::{FeeItem, PaymentAllocation};
use crate::types::{CategoryId, FeeType};

/// allocation mode; a manual edit is sticky for the rest of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationMode {
    Automatic,
    Manual,
}

/// one category line inside an allocation draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DraftLine {
    category_id: CategoryId,
    category_name: String,
    fee_type: FeeType,
    balance: Money,
    allocated: Money,
    is_mandatory: bool,
}

/// in-progress distribution of one payment across fee categories.
///
/// Owned by a single editing session. Automatic mode re-runs whenever the
/// payment amount changes; the first manual edit disables it permanently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationDraft {
    lines: Vec<DraftLine>,
    payment_amount: Money,
    mode: AllocationMode,
    tolerance: Money,
}

impl AllocationDraft {
    /// build a draft from the items still carrying a balance
    pub fn new<'a, I>(open_items: I, config: &ComplianceConfig) -> Self
    where
        I: IntoIterator<Item = &'a FeeItem>,
    {
        let lines = open_items
            .into_iter()
            .filter(|i| i.balance.is_positive())
            .map(|i| DraftLine {
                category_id: i.category_id,
                category_name: i.category_name.clone(),
                fee_type: i.fee_type,
                balance: i.balance,
                allocated: Money::ZERO,
                is_mandatory: i.is_mandatory,
            })
            .collect();
        Self {
            lines,
            payment_amount: Money::ZERO,
            mode: AllocationMode::Automatic,
            tolerance: config.allocation_tolerance,
        }
    }

    pub fn mode(&self) -> AllocationMode {
        self.mode
    }

    pub fn payment_amount(&self) -> Money {
        self.payment_amount
    }

    /// total outstanding balance across the draft's categories
    pub fn total_outstanding(&self) -> Money {
        Money::sum(self.lines.iter().map(|l| l.balance))
    }

    /// sum of current allocations
    pub fn allocated_total(&self) -> Money {
        Money::sum(self.lines.iter().map(|l| l.allocated))
    }

    /// portion of the payment amount not yet allocated
    pub fn unallocated(&self) -> Money {
        self.payment_amount - self.allocated_total()
    }

    /// current allocation for a category
    pub fn allocated_for(&self, category_id: CategoryId) -> Option<Money> {
        self.lines
            .iter()
            .find(|l| l.category_id == category_id)
            .map(|l| l.allocated)
    }

    /// set the payment amount; re-runs auto-allocation while in automatic mode.
    ///
    /// An amount above the total outstanding balance is rejected outright, the
    /// draft is left untouched.
    pub fn set_payment_amount(&mut self, amount: Money) -> Result<()> {
        if amount.is_negative() {
            return Err(FinanceError::InvalidPaymentAmount { amount });
        }
        let outstanding = self.total_outstanding();
        if amount > outstanding {
            return Err(FinanceError::Overpayment {
                outstanding,
                requested: amount,
            });
        }
        self.payment_amount = amount;
        if self.mode == AllocationMode::Automatic {
            self.auto_allocate();
        }
        Ok(())
    }

    /// distribute the payment amount by priority: mandatory categories first,
    /// larger balances first within the same mandatory-ness, original order as
    /// the tie-break
    fn auto_allocate(&mut self) {
        for line in &mut self.lines {
            line.allocated = Money::ZERO;
        }

        let mut order: Vec<usize> = (0..self.lines.len()).collect();
        // sort_by is stable, so equal keys keep their original order
        order.sort_by(|&a, &b| {
            let (la, lb) = (&self.lines[a], &self.lines[b]);
            lb.is_mandatory
                .cmp(&la.is_mandatory)
                .then(lb.balance.cmp(&la.balance))
        });

        let mut remaining = self.payment_amount;
        for idx in order {
            if remaining.is_zero() {
                break;
            }
            let line = &mut self.lines[idx];
            let take = remaining.min(line.balance);
            line.allocated = take;
            remaining -= take;
        }
    }

    /// set an explicit amount for one category, clamped to [0, balance].
    /// Other lines are untouched and automatic mode is disabled for the
    /// remainder of the session.
    pub fn set_manual(&mut self, category_id: CategoryId, amount: Money) -> Result<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.category_id == category_id)
            .ok_or(FinanceError::InvalidPaymentAmount { amount })?;
        line.allocated = amount.clamp(Money::ZERO, line.balance);
        self.mode = AllocationMode::Manual;
        Ok(())
    }

    /// set one category's allocation to its full balance; the rest are not
    /// redistributed
    pub fn set_max(&mut self, category_id: CategoryId) -> Result<()> {
        let balance = self
            .lines
            .iter()
            .find(|l| l.category_id == category_id)
            .map(|l| l.balance)
            .ok_or(FinanceError::InvalidPaymentAmount { amount: Money::ZERO })?;
        self.set_manual(category_id, balance)
    }

    /// zero every category and disable automatic mode
    pub fn clear(&mut self) {
        for line in &mut self.lines {
            line.allocated = Money::ZERO;
        }
        self.mode = AllocationMode::Manual;
    }

    /// check the commit invariants and produce the allocation list.
    ///
    /// Allocations must sum to the payment amount within the tolerance, every
    /// line must stay within its category balance, and excess over the
    /// outstanding balance is an error, never truncated.
    pub fn finish(&self) -> Result<Vec<PaymentAllocation>> {
        if !self.payment_amount.is_positive() {
            return Err(FinanceError::InvalidPaymentAmount {
                amount: self.payment_amount,
            });
        }
        let outstanding = self.total_outstanding();
        if self.payment_amount > outstanding {
            return Err(FinanceError::Overpayment {
                outstanding,
                requested: self.payment_amount,
            });
        }
        for line in &self.lines {
            if line.allocated > line.balance {
                return Err(FinanceError::AllocationExceedsBalance {
                    category: line.category_name.clone(),
                    balance: line.balance,
                    allocated: line.allocated,
                });
            }
        }
        let allocated = self.allocated_total();
        if !allocated.approx_eq(self.payment_amount, self.tolerance) {
            return Err(FinanceError::AllocationMismatch {
                payment: self.payment_amount,
                allocated,
            });
        }
        Ok(self
            .lines
            .iter()
            .filter(|l| l.allocated.is_positive())
            .map(|l| PaymentAllocation {
                category_id: l.category_id,
                category_name: l.category_name.clone(),
                fee_type: l.fee_type,
                amount: l.allocated,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn item(name: &str, balance: i64, mandatory: bool) -> FeeItem {
        FeeItem::unpaid(
            Uuid::new_v4(),
            name,
            FeeType::Other,
            Money::from_major(balance),
            mandatory,
        )
        .unwrap()
    }

    #[test]
    fn test_auto_allocation_sums_to_amount() {
        let items = vec![
            item("Tuition", 50_000, true),
            item("Books", 8_000, false),
            item("Sports", 3_000, false),
        ];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(55_000)).unwrap();

        let allocations = draft.finish().unwrap();
        let total = Money::sum(allocations.iter().map(|a| a.amount));
        assert_eq!(total, Money::from_major(55_000));
    }

    #[test]
    fn test_mandatory_items_take_priority() {
        let mandatory = item("Tuition", 5_000, true);
        let discretionary = item("Feeding", 10_000, false);
        let mandatory_id = mandatory.category_id;
        let discretionary_id = discretionary.category_id;

        let items = vec![discretionary, mandatory];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(3_000)).unwrap();

        // full 3,000 lands on the mandatory item despite its smaller balance
        assert_eq!(draft.allocated_for(mandatory_id), Some(Money::from_major(3_000)));
        assert_eq!(draft.allocated_for(discretionary_id), Some(Money::ZERO));
    }

    #[test]
    fn test_larger_balance_first_within_same_priority() {
        let small = item("Library", 2_000, false);
        let large = item("Transport", 9_000, false);
        let large_id = large.category_id;

        let items = vec![small, large];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(4_000)).unwrap();

        assert_eq!(draft.allocated_for(large_id), Some(Money::from_major(4_000)));
    }

    #[test]
    fn test_stable_tie_break_keeps_original_order() {
        let first = item("Pta", 5_000, false);
        let second = item("Computer", 5_000, false);
        let first_id = first.category_id;
        let second_id = second.category_id;

        let items = vec![first, second];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(5_000)).unwrap();

        assert_eq!(draft.allocated_for(first_id), Some(Money::from_major(5_000)));
        assert_eq!(draft.allocated_for(second_id), Some(Money::ZERO));
    }

    #[test]
    fn test_overpayment_rejected_not_truncated() {
        let items = vec![item("Tuition", 10_000, true)];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());

        let err = draft.set_payment_amount(Money::from_major(12_000)).unwrap_err();
        assert!(matches!(err, FinanceError::Overpayment { .. }));
        // draft untouched
        assert_eq!(draft.payment_amount(), Money::ZERO);
        assert_eq!(draft.allocated_total(), Money::ZERO);
    }

    #[test]
    fn test_manual_edit_is_clamped_and_sticky() {
        let tuition = item("Tuition", 5_000, true);
        let books = item("Books", 8_000, false);
        let tuition_id = tuition.category_id;
        let books_id = books.category_id;

        let items = vec![tuition, books];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(6_000)).unwrap();

        // manual edit above the balance clamps to the balance
        draft.set_manual(books_id, Money::from_major(9_500)).unwrap();
        assert_eq!(draft.allocated_for(books_id), Some(Money::from_major(8_000)));
        assert_eq!(draft.mode(), AllocationMode::Manual);

        // the tuition line kept its auto allocation
        let before = draft.allocated_for(tuition_id).unwrap();

        // changing the amount no longer re-runs auto-allocation
        draft.set_payment_amount(Money::from_major(10_000)).unwrap();
        assert_eq!(draft.allocated_for(tuition_id), Some(before));
        assert_eq!(draft.allocated_for(books_id), Some(Money::from_major(8_000)));
    }

    #[test]
    fn test_max_does_not_redistribute() {
        let tuition = item("Tuition", 5_000, true);
        let books = item("Books", 8_000, false);
        let tuition_id = tuition.category_id;
        let books_id = books.category_id;

        let items = vec![tuition, books];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(6_000)).unwrap();
        let tuition_before = draft.allocated_for(tuition_id).unwrap();

        draft.set_max(books_id).unwrap();
        assert_eq!(draft.allocated_for(books_id), Some(Money::from_major(8_000)));
        assert_eq!(draft.allocated_for(tuition_id), Some(tuition_before));
    }

    #[test]
    fn test_clear_zeroes_everything_and_disables_auto() {
        let items = vec![item("Tuition", 5_000, true), item("Books", 8_000, false)];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(6_000)).unwrap();

        draft.clear();
        assert_eq!(draft.allocated_total(), Money::ZERO);
        assert_eq!(draft.mode(), AllocationMode::Manual);

        // amount changes no longer trigger auto-allocation
        draft.set_payment_amount(Money::from_major(4_000)).unwrap();
        assert_eq!(draft.allocated_total(), Money::ZERO);
    }

    #[test]
    fn test_finish_rejects_mismatched_manual_allocation() {
        let tuition = item("Tuition", 5_000, true);
        let tuition_id = tuition.category_id;
        let items = vec![tuition];
        let mut draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        draft.set_payment_amount(Money::from_major(5_000)).unwrap();
        draft.set_manual(tuition_id, Money::from_major(2_000)).unwrap();

        let err = draft.finish().unwrap_err();
        assert!(matches!(err, FinanceError::AllocationMismatch { .. }));
    }

    #[test]
    fn test_zero_balance_categories_excluded() {
        let paid = FeeItem::new(
            Uuid::new_v4(),
            "Uniform",
            FeeType::Uniform,
            Money::from_major(3_000),
            Money::from_major(3_000),
            false,
        )
        .unwrap();
        let open = item("Tuition", 5_000, true);

        let items = vec![paid.clone(), open];
        let draft = AllocationDraft::new(items.iter(), &ComplianceConfig::standard());
        assert_eq!(draft.allocated_for(paid.category_id), None);
        assert_eq!(draft.total_outstanding(), Money::from_major(5_000));
    }
}
