pub mod engine;
pub mod resolver;
pub mod statutory;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{FinanceError, Result};
use crate::types::{PayPeriod, PaymentMethod, Provenance, SalaryStatus, StaffId};

pub use engine::{PayrollEngine, SalaryDraft};
pub use resolver::{resolve_financial_items, ResolvedItems, StaffBonus, StaffLoan, StaffPenalty};
pub use statutory::{BandedSchedule, StatutoryCalculator, StatutoryDeductions, TaxBand};

/// one allowance line on a salary payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAllowance {
    pub name: String,
    pub amount: Money,
    pub provenance: Provenance,
}

impl PaymentAllowance {
    pub fn new(name: impl Into<String>, amount: Money, provenance: Provenance) -> Self {
        Self {
            name: name.into(),
            amount,
            provenance,
        }
    }

    pub fn manual(name: impl Into<String>, amount: Money) -> Self {
        Self::new(name, amount, Provenance::Manual)
    }
}

/// one deduction line on a salary payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentDeduction {
    pub name: String,
    pub amount: Money,
    pub is_statutory: bool,
    pub provenance: Provenance,
}

impl PaymentDeduction {
    pub fn new(name: impl Into<String>, amount: Money, provenance: Provenance) -> Self {
        Self {
            name: name.into(),
            amount,
            is_statutory: matches!(provenance, Provenance::Statutory),
            provenance,
        }
    }

    pub fn manual(name: impl Into<String>, amount: Money) -> Self {
        Self::new(name, amount, Provenance::Manual)
    }
}

/// a staff member's salary payment for one period.
///
/// Computed by the payroll engine; totals always satisfy
/// `total_gross = basic_salary + Σallowances`,
/// `total_deductions = Σdeductions`, `net_pay = total_gross - total_deductions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryPayment {
    pub staff_id: StaffId,
    pub period: PayPeriod,
    pub reference: String,
    pub basic_salary: Money,
    pub allowances: Vec<PaymentAllowance>,
    pub deductions: Vec<PaymentDeduction>,
    pub total_gross: Money,
    pub total_deductions: Money,
    pub net_pay: Money,
    pub status: SalaryStatus,
    pub payment_method: PaymentMethod,
    pub payment_date: NaiveDate,
}

impl SalaryPayment {
    /// move pending -> approved
    pub fn approve(&mut self) -> Result<()> {
        self.transition_to(SalaryStatus::Approved)
    }

    /// move approved -> paid
    pub fn mark_as_paid(&mut self) -> Result<()> {
        self.transition_to(SalaryStatus::Paid)
    }

    fn transition_to(&mut self, next: SalaryStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(FinanceError::InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}

/// generate a salary reference, format SAL-YYYY-MM-XXXXXX
pub fn new_salary_reference(period: PayPeriod) -> String {
    let suffix: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(6)
        .collect::<String>()
        .to_uppercase();
    format!("SAL-{:04}-{:02}-{}", period.year(), period.month(), suffix)
}
