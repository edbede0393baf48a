use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{FinanceError, Result};

/// unique identifier for a student
pub type StudentId = Uuid;

/// unique identifier for a staff member
pub type StaffId = Uuid;

/// unique identifier for a fee assignment
pub type AssignmentId = Uuid;

/// unique identifier for a fee category
pub type CategoryId = Uuid;

/// unique identifier for a staff loan
pub type LoanId = Uuid;

/// unique identifier for a bonus or penalty
pub type ItemId = Uuid;

/// payment methods accepted for fee payments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Cheque,
    Pos,
    Online,
}

impl PaymentMethod {
    /// methods a salary can be disbursed through
    pub fn valid_for_payroll(&self) -> bool {
        matches!(
            self,
            PaymentMethod::Cash | PaymentMethod::BankTransfer | PaymentMethod::Cheque
        )
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::Pos => "pos",
            PaymentMethod::Online => "online",
        };
        write!(f, "{}", s)
    }
}

/// payroll period, one calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    month: u32,
    year: i32,
}

impl PayPeriod {
    pub const MIN_YEAR: i32 = 2020;
    pub const MAX_YEAR: i32 = 2050;

    /// create a period, rejecting out-of-range month/year
    pub fn new(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(FinanceError::InvalidPeriod { month, year });
        }
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(FinanceError::InvalidPeriod { month, year });
        }
        Ok(Self { month, year })
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    /// the period immediately after this one
    pub fn next(&self) -> Result<Self> {
        if self.month == 12 {
            Self::new(1, self.year + 1)
        } else {
            Self::new(self.month + 1, self.year)
        }
    }
}

impl fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// fee category types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    Tuition,
    Uniform,
    Feeding,
    Transport,
    Books,
    Sports,
    Development,
    Examination,
    Pta,
    Computer,
    Library,
    Laboratory,
    Lesson,
    Other,
}

/// settlement status of a fee assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeStatus {
    /// nothing paid yet
    Unpaid,
    /// some categories partially settled
    Partial,
    /// balance fully cleared
    Paid,
    /// payments exceed the assigned total
    Overpaid,
}

/// lifecycle of a fee payment record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Refunded,
}

impl PaymentStatus {
    /// allowed transitions: pending -> confirmed | cancelled, confirmed -> refunded
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        matches!(
            (self, next),
            (PaymentStatus::Pending, PaymentStatus::Confirmed)
                | (PaymentStatus::Pending, PaymentStatus::Cancelled)
                | (PaymentStatus::Confirmed, PaymentStatus::Refunded)
        )
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Confirmed => "confirmed",
            PaymentStatus::Cancelled => "cancelled",
            PaymentStatus::Refunded => "refunded",
        };
        write!(f, "{}", s)
    }
}

/// lifecycle of a salary payment: pending -> approved -> paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalaryStatus {
    Pending,
    Approved,
    Paid,
}

impl SalaryStatus {
    /// no transition skips a state, none reverses
    pub fn can_transition_to(&self, next: SalaryStatus) -> bool {
        matches!(
            (self, next),
            (SalaryStatus::Pending, SalaryStatus::Approved)
                | (SalaryStatus::Approved, SalaryStatus::Paid)
        )
    }
}

impl fmt::Display for SalaryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SalaryStatus::Pending => "pending",
            SalaryStatus::Approved => "approved",
            SalaryStatus::Paid => "paid",
        };
        write!(f, "{}", s)
    }
}

/// status of a bonus or penalty; transitions are one-directional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Paid,
    Cancelled,
}

impl ItemStatus {
    /// pending -> paid or pending -> cancelled only
    pub fn can_transition_to(&self, next: ItemStatus) -> bool {
        matches!(
            (self, next),
            (ItemStatus::Pending, ItemStatus::Paid) | (ItemStatus::Pending, ItemStatus::Cancelled)
        )
    }
}

/// where a payroll line item came from; manual lines survive re-resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "source", content = "id")]
pub enum Provenance {
    /// recurring allowance from the staff record
    Standing,
    /// installment generated from an active loan
    Loan(LoanId),
    /// pending bonus for the period
    Bonus(ItemId),
    /// pending penalty for the period
    Penalty(ItemId),
    /// statutory deduction from the injected calculator
    Statutory,
    /// typed in by the user; never regenerated
    Manual,
}

impl Provenance {
    /// auto-generated lines are replaced wholesale on re-resolution
    pub fn is_auto(&self) -> bool {
        !matches!(self, Provenance::Manual)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pay_period_bounds() {
        assert!(PayPeriod::new(1, 2024).is_ok());
        assert!(PayPeriod::new(12, 2050).is_ok());
        assert!(PayPeriod::new(0, 2024).is_err());
        assert!(PayPeriod::new(13, 2024).is_err());
        assert!(PayPeriod::new(6, 2019).is_err());
        assert!(PayPeriod::new(6, 2051).is_err());
    }

    #[test]
    fn test_pay_period_next_rolls_year() {
        let dec = PayPeriod::new(12, 2024).unwrap();
        let jan = dec.next().unwrap();
        assert_eq!(jan.month(), 1);
        assert_eq!(jan.year(), 2025);
    }

    #[test]
    fn test_salary_status_machine() {
        assert!(SalaryStatus::Pending.can_transition_to(SalaryStatus::Approved));
        assert!(SalaryStatus::Approved.can_transition_to(SalaryStatus::Paid));

        // no skips, no reversals
        assert!(!SalaryStatus::Pending.can_transition_to(SalaryStatus::Paid));
        assert!(!SalaryStatus::Paid.can_transition_to(SalaryStatus::Approved));
        assert!(!SalaryStatus::Paid.can_transition_to(SalaryStatus::Pending));
        assert!(!SalaryStatus::Approved.can_transition_to(SalaryStatus::Pending));
    }

    #[test]
    fn test_item_status_one_directional() {
        assert!(ItemStatus::Pending.can_transition_to(ItemStatus::Paid));
        assert!(ItemStatus::Pending.can_transition_to(ItemStatus::Cancelled));
        assert!(!ItemStatus::Paid.can_transition_to(ItemStatus::Pending));
        assert!(!ItemStatus::Cancelled.can_transition_to(ItemStatus::Paid));
    }
}
