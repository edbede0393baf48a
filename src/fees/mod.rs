pub mod allocation;
pub mod balance;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ComplianceConfig;
use crate::decimal::Money;
use crate::errors::{FinanceError, Result, Violation};
use crate::types::{
    AssignmentId, CategoryId, FeeStatus, FeeType, PaymentMethod, PaymentStatus, StudentId,
};

pub use allocation::{AllocationDraft, AllocationMode};
pub use balance::{category_balances, outstanding_balance, quick_amounts};

/// maximum allocation lines a single payment may carry
pub const MAX_ALLOCATIONS: usize = 20;

/// one fee obligation within an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeItem {
    pub category_id: CategoryId,
    pub category_name: String,
    pub fee_type: FeeType,
    pub amount: Money,
    pub amount_paid: Money,
    pub balance: Money,
    pub is_mandatory: bool,
}

impl FeeItem {
    /// create an item, enforcing the balance invariants at construction
    pub fn new(
        category_id: CategoryId,
        category_name: impl Into<String>,
        fee_type: FeeType,
        amount: Money,
        amount_paid: Money,
        is_mandatory: bool,
    ) -> Result<Self> {
        let category_name = category_name.into();
        let mut violations = Vec::new();
        if category_name.trim().is_empty() {
            violations.push(Violation::new("category_name", "is required"));
        }
        if amount.is_negative() {
            violations.push(Violation::new("amount", "cannot be negative"));
        }
        if amount_paid.is_negative() {
            violations.push(Violation::new("amount_paid", "cannot be negative"));
        }
        let balance = amount - amount_paid;
        if balance.is_negative() {
            violations.push(Violation::new("balance", "cannot be negative"));
        }
        if !violations.is_empty() {
            return Err(FinanceError::validation(violations));
        }
        Ok(Self {
            category_id,
            category_name,
            fee_type,
            amount,
            amount_paid,
            balance,
            is_mandatory,
        })
    }

    /// unpaid item shorthand
    pub fn unpaid(
        category_id: CategoryId,
        category_name: impl Into<String>,
        fee_type: FeeType,
        amount: Money,
        is_mandatory: bool,
    ) -> Result<Self> {
        Self::new(category_id, category_name, fee_type, amount, Money::ZERO, is_mandatory)
    }

    pub fn has_balance(&self) -> bool {
        self.balance.is_positive()
    }
}

/// the set of fee obligations assigned to one student
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeAssignment {
    pub id: AssignmentId,
    pub student_id: StudentId,
    pub items: Vec<FeeItem>,
    pub total_amount: Money,
    pub amount_paid: Money,
    pub balance: Money,
    pub status: FeeStatus,
}

impl FeeAssignment {
    /// create an assignment; totals are derived from the items
    pub fn new(student_id: StudentId, items: Vec<FeeItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(FinanceError::validation(vec![Violation::new(
                "items",
                "cannot be empty",
            )]));
        }
        let total_amount = Money::sum(items.iter().map(|i| i.amount));
        let amount_paid = Money::sum(items.iter().map(|i| i.amount_paid));
        let balance = total_amount - amount_paid;
        Ok(Self {
            id: Uuid::new_v4(),
            student_id,
            status: Self::derive_status(amount_paid, balance),
            items,
            total_amount,
            amount_paid,
            balance,
        })
    }

    fn derive_status(amount_paid: Money, balance: Money) -> FeeStatus {
        if balance.is_negative() {
            FeeStatus::Overpaid
        } else if balance.is_zero() {
            FeeStatus::Paid
        } else if amount_paid.is_positive() {
            FeeStatus::Partial
        } else {
            FeeStatus::Unpaid
        }
    }

    /// apply committed allocations, decrementing item and assignment balances
    pub fn apply_allocations(&mut self, allocations: &[PaymentAllocation]) -> Result<()> {
        for alloc in allocations {
            let item = self
                .items
                .iter_mut()
                .find(|i| i.category_id == alloc.category_id)
                .ok_or_else(|| {
                    FinanceError::validation(vec![Violation::new(
                        "category_id",
                        format!("unknown category '{}'", alloc.category_name),
                    )])
                })?;
            if alloc.amount > item.balance {
                return Err(FinanceError::AllocationExceedsBalance {
                    category: item.category_name.clone(),
                    balance: item.balance,
                    allocated: alloc.amount,
                });
            }
            item.amount_paid += alloc.amount;
            item.balance -= alloc.amount;
        }
        self.amount_paid = Money::sum(self.items.iter().map(|i| i.amount_paid));
        self.balance = self.total_amount - self.amount_paid;
        self.status = Self::derive_status(self.amount_paid, self.balance);
        Ok(())
    }

    /// items still carrying a positive balance
    pub fn open_items(&self) -> impl Iterator<Item = &FeeItem> {
        self.items.iter().filter(|i| i.has_balance())
    }
}

/// the portion of one payment attributed to one fee category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllocation {
    pub category_id: CategoryId,
    pub category_name: String,
    pub fee_type: FeeType,
    pub amount: Money,
}

/// a fee payment record with its allocation breakdown.
///
/// The financial content is immutable once created; only `status` moves,
/// through the guarded pending -> confirmed -> refunded machine. A payment
/// stuck at pending after a commit attempt is unreconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub student_id: StudentId,
    pub fee_assignment_id: AssignmentId,
    pub reference: String,
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub allocations: Vec<PaymentAllocation>,
    pub status: PaymentStatus,
}

impl Payment {
    /// assemble a payment record; allocations must sum to the amount
    /// within the configured tolerance
    pub fn new(
        student_id: StudentId,
        fee_assignment_id: AssignmentId,
        amount: Money,
        method: PaymentMethod,
        payment_date: NaiveDate,
        allocations: Vec<PaymentAllocation>,
        config: &ComplianceConfig,
    ) -> Result<Self> {
        if !amount.is_positive() {
            return Err(FinanceError::InvalidPaymentAmount { amount });
        }
        if allocations.is_empty() {
            return Err(FinanceError::validation(vec![Violation::new(
                "allocations",
                "payment must have at least one allocation",
            )]));
        }
        if allocations.len() > MAX_ALLOCATIONS {
            return Err(FinanceError::validation(vec![Violation::new(
                "allocations",
                format!("payment cannot have more than {} allocations", MAX_ALLOCATIONS),
            )]));
        }
        let allocated = Money::sum(allocations.iter().map(|a| a.amount));
        if !allocated.approx_eq(amount, config.allocation_tolerance) {
            return Err(FinanceError::AllocationMismatch {
                payment: amount,
                allocated,
            });
        }
        for alloc in &allocations {
            if !alloc.amount.is_positive() {
                return Err(FinanceError::validation(vec![Violation::new(
                    "allocations",
                    format!("allocation for '{}' must be positive", alloc.category_name),
                )]));
            }
        }
        Ok(Self {
            student_id,
            fee_assignment_id,
            reference: new_payment_reference(payment_date),
            amount,
            method,
            payment_date,
            allocations,
            status: PaymentStatus::Pending,
        })
    }

    /// move pending -> confirmed, once the balances reflect the allocations
    pub fn confirm(&mut self) -> Result<()> {
        self.transition_to(PaymentStatus::Confirmed)
    }

    /// abandon a payment that never reached the balances
    pub fn cancel(&mut self) -> Result<()> {
        self.transition_to(PaymentStatus::Cancelled)
    }

    /// move confirmed -> refunded
    pub fn refund(&mut self) -> Result<()> {
        self.transition_to(PaymentStatus::Refunded)
    }

    fn transition_to(&mut self, next: PaymentStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(FinanceError::InvalidPaymentTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// generate a payment reference, format PAY-YYYY-XXXXXXXX
pub fn new_payment_reference(payment_date: NaiveDate) -> String {
    use chrono::Datelike;
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(8)
        .collect::<String>()
        .to_uppercase();
    format!("PAY-{:04}-{}", payment_date.year(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuition(amount: i64) -> FeeItem {
        FeeItem::unpaid(
            Uuid::new_v4(),
            "Tuition",
            FeeType::Tuition,
            Money::from_major(amount),
            true,
        )
        .unwrap()
    }

    #[test]
    fn test_fee_item_rejects_negative_balance() {
        let err = FeeItem::new(
            Uuid::new_v4(),
            "Books",
            FeeType::Books,
            Money::from_major(1_000),
            Money::from_major(1_500),
            false,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_assignment_totals_and_status() {
        let items = vec![tuition(50_000), tuition(10_000)];
        let assignment = FeeAssignment::new(Uuid::new_v4(), items).unwrap();
        assert_eq!(assignment.total_amount, Money::from_major(60_000));
        assert_eq!(assignment.balance, Money::from_major(60_000));
        assert_eq!(assignment.status, FeeStatus::Unpaid);
    }

    #[test]
    fn test_apply_allocations_updates_status() {
        let item = tuition(50_000);
        let category_id = item.category_id;
        let mut assignment = FeeAssignment::new(Uuid::new_v4(), vec![item]).unwrap();

        let partial = PaymentAllocation {
            category_id,
            category_name: "Tuition".to_string(),
            fee_type: FeeType::Tuition,
            amount: Money::from_major(20_000),
        };
        assignment.apply_allocations(&[partial]).unwrap();
        assert_eq!(assignment.balance, Money::from_major(30_000));
        assert_eq!(assignment.status, FeeStatus::Partial);

        let rest = PaymentAllocation {
            category_id,
            category_name: "Tuition".to_string(),
            fee_type: FeeType::Tuition,
            amount: Money::from_major(30_000),
        };
        assignment.apply_allocations(&[rest]).unwrap();
        assert_eq!(assignment.balance, Money::ZERO);
        assert_eq!(assignment.status, FeeStatus::Paid);
    }

    #[test]
    fn test_apply_allocation_over_balance_rejected() {
        let item = tuition(5_000);
        let category_id = item.category_id;
        let mut assignment = FeeAssignment::new(Uuid::new_v4(), vec![item]).unwrap();

        let too_much = PaymentAllocation {
            category_id,
            category_name: "Tuition".to_string(),
            fee_type: FeeType::Tuition,
            amount: Money::from_major(6_000),
        };
        let err = assignment.apply_allocations(&[too_much]).unwrap_err();
        assert!(matches!(err, FinanceError::AllocationExceedsBalance { .. }));
    }

    #[test]
    fn test_payment_requires_matching_sum() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 12).unwrap();
        let alloc = PaymentAllocation {
            category_id: Uuid::new_v4(),
            category_name: "Tuition".to_string(),
            fee_type: FeeType::Tuition,
            amount: Money::from_major(20_000),
        };
        let err = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(25_000),
            PaymentMethod::Cash,
            date,
            vec![alloc],
            &ComplianceConfig::standard(),
        )
        .unwrap_err();
        assert!(matches!(err, FinanceError::AllocationMismatch { .. }));
    }

    #[test]
    fn test_payment_status_machine() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 12).unwrap();
        let alloc = PaymentAllocation {
            category_id: Uuid::new_v4(),
            category_name: "Tuition".to_string(),
            fee_type: FeeType::Tuition,
            amount: Money::from_major(20_000),
        };
        let mut payment = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(20_000),
            PaymentMethod::Cash,
            date,
            vec![alloc],
            &ComplianceConfig::standard(),
        )
        .unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        payment.confirm().unwrap();
        payment.refund().unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);

        // a confirmed payment cannot be cancelled, only refunded
        let mut other = payment.clone();
        other.status = PaymentStatus::Confirmed;
        assert!(matches!(
            other.cancel(),
            Err(FinanceError::InvalidPaymentTransition { .. })
        ));
    }

    #[test]
    fn test_payment_reference_format() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let reference = new_payment_reference(date);
        assert!(reference.starts_with("PAY-2024-"));
        assert_eq!(reference.len(), 17);
        assert!(reference[9..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_payment_serde_round_trip() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 12).unwrap();
        let alloc = PaymentAllocation {
            category_id: Uuid::new_v4(),
            category_name: "Tuition".to_string(),
            fee_type: FeeType::Tuition,
            amount: Money::from_major(20_000),
        };
        let payment = Payment::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Money::from_major(20_000),
            PaymentMethod::BankTransfer,
            date,
            vec![alloc],
            &ComplianceConfig::standard(),
        )
        .unwrap();

        let json = serde_json::to_string(&payment).unwrap();
        let back: Payment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, payment);
    }
}
