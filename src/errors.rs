use std::fmt;
use thiserror::Error;

use crate::decimal::Money;
use crate::types::{PaymentStatus, SalaryStatus, StaffId};

/// one field-level validation failure, reported alongside its siblings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Error, Debug)]
pub enum FinanceError {
    #[error("validation failed: {}", join_violations(.violations))]
    Validation {
        violations: Vec<Violation>,
    },

    #[error("payment exceeds outstanding balance: outstanding {outstanding}, requested {requested}")]
    Overpayment {
        outstanding: Money,
        requested: Money,
    },

    #[error("allocations do not sum to payment amount: payment {payment}, allocated {allocated}")]
    AllocationMismatch {
        payment: Money,
        allocated: Money,
    },

    #[error("allocation exceeds category balance: category {category}, balance {balance}, allocated {allocated}")]
    AllocationExceedsBalance {
        category: String,
        balance: Money,
        allocated: Money,
    },

    #[error("invalid payment amount: {amount}")]
    InvalidPaymentAmount {
        amount: Money,
    },

    #[error("invalid payroll period: month {month}, year {year}")]
    InvalidPeriod {
        month: u32,
        year: i32,
    },

    #[error("cash payment above ceiling: net pay {net_pay}, ceiling {ceiling}")]
    CashCeilingExceeded {
        net_pay: Money,
        ceiling: Money,
    },

    #[error("bank transfer required: net pay {net_pay} exceeds {threshold}")]
    BankTransferRequired {
        net_pay: Money,
        threshold: Money,
    },

    #[error("net pay is negative: {net_pay}")]
    NegativeNetPay {
        net_pay: Money,
    },

    #[error("net pay implausibly large: {net_pay}, cap {cap}")]
    ImplausibleNetPay {
        net_pay: Money,
        cap: Money,
    },

    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: SalaryStatus,
        to: SalaryStatus,
    },

    #[error("invalid payment status transition: {from} -> {to}")]
    InvalidPaymentTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },

    #[error("salary already exists for staff {staff_id}, period {month:02}/{year}")]
    DuplicatePeriod {
        staff_id: StaffId,
        month: u32,
        year: i32,
    },

    #[error("payment {reference} persisted but balance update failed: {message}")]
    PartialCommit {
        reference: String,
        message: String,
    },

    #[error("upstream store error: {message}")]
    Upstream {
        message: String,
    },
}

impl FinanceError {
    /// build a validation error from collected field violations
    pub fn validation(violations: Vec<Violation>) -> Self {
        FinanceError::Validation { violations }
    }

    /// true when the caller can correct the input and retry
    pub fn is_caller_correctable(&self) -> bool {
        matches!(
            self,
            FinanceError::Validation { .. }
                | FinanceError::Overpayment { .. }
                | FinanceError::AllocationMismatch { .. }
                | FinanceError::AllocationExceedsBalance { .. }
                | FinanceError::InvalidPaymentAmount { .. }
                | FinanceError::InvalidPeriod { .. }
                | FinanceError::CashCeilingExceeded { .. }
                | FinanceError::BankTransferRequired { .. }
        )
    }

    /// partial commits need operator reconciliation, not a blind retry
    pub fn needs_reconciliation(&self) -> bool {
        matches!(self, FinanceError::PartialCommit { .. })
    }
}

pub type Result<T> = std::result::Result<T, FinanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_lists_fields() {
        let err = FinanceError::validation(vec![
            Violation::new("staff_id", "is required"),
            Violation::new("month", "must be between 1 and 12"),
        ]);
        let msg = err.to_string();
        assert!(msg.contains("staff_id: is required"));
        assert!(msg.contains("month: must be between 1 and 12"));
    }

    #[test]
    fn test_error_classification() {
        let overpay = FinanceError::Overpayment {
            outstanding: Money::from_major(1_000),
            requested: Money::from_major(2_000),
        };
        assert!(overpay.is_caller_correctable());

        let partial = FinanceError::PartialCommit {
            reference: "PAY-2024-ABCD1234".to_string(),
            message: "balance write rejected".to_string(),
        };
        assert!(!partial.is_caller_correctable());
        assert!(partial.needs_reconciliation());
    }
}
