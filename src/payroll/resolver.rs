use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{FinanceError, Result, Violation};
use crate::events::{Event, EventStore};
use crate::payroll::{PaymentAllowance, PaymentDeduction};
use crate::store::FinanceStore;
use crate::types::{ItemId, ItemStatus, LoanId, PayPeriod, Provenance, StaffId};
use uuid::Uuid;

/// a staff loan repaid through monthly payroll installments.
///
/// Remaining balance is tracked by the persistence collaborator as
/// principal minus installments already applied; the loan closes implicitly
/// when it reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffLoan {
    pub id: LoanId,
    pub staff_id: StaffId,
    pub purpose: String,
    pub principal: Money,
    pub monthly_installment: Money,
}

impl StaffLoan {
    pub fn new(
        staff_id: StaffId,
        purpose: impl Into<String>,
        principal: Money,
        monthly_installment: Money,
    ) -> Result<Self> {
        let purpose = purpose.into();
        let mut violations = Vec::new();
        if purpose.trim().is_empty() {
            violations.push(Violation::new("purpose", "is required"));
        }
        if !principal.is_positive() {
            violations.push(Violation::new("principal", "must be greater than zero"));
        }
        if !monthly_installment.is_positive() {
            violations.push(Violation::new(
                "monthly_installment",
                "must be greater than zero",
            ));
        }
        if !violations.is_empty() {
            return Err(FinanceError::validation(violations));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            staff_id,
            purpose,
            principal,
            monthly_installment,
        })
    }

    /// installment due this period, capped at the remaining balance
    pub fn installment_due(&self, remaining_balance: Money) -> Money {
        self.monthly_installment.min(remaining_balance.max(Money::ZERO))
    }
}

/// a one-off bonus for a specific period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffBonus {
    pub id: ItemId,
    pub staff_id: StaffId,
    pub amount: Money,
    pub reason: String,
    pub period: PayPeriod,
    pub status: ItemStatus,
}

/// a one-off penalty for a specific period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaffPenalty {
    pub id: ItemId,
    pub staff_id: StaffId,
    pub amount: Money,
    pub reason: String,
    pub period: PayPeriod,
    pub status: ItemStatus,
}

/// allowance and deduction lines produced by resolution
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolvedItems {
    pub allowances: Vec<PaymentAllowance>,
    pub deductions: Vec<PaymentDeduction>,
}

/// resolve a staff member's financial items for one period into payroll lines.
///
/// Resolution is idempotent and replacing: auto-generated lines (standing
/// allowances, loan installments, bonuses, penalties, statutory deductions)
/// are regenerated from scratch on every run, so a loan installment can never
/// be applied twice. Lines carried in `previous` with manual provenance are
/// preserved untouched.
pub fn resolve_financial_items(
    store: &dyn FinanceStore,
    staff_id: StaffId,
    period: PayPeriod,
    standing_allowances: &[(String, Money)],
    previous: Option<&ResolvedItems>,
    time: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<ResolvedItems> {
    let mut allowances = Vec::new();
    let mut deductions = Vec::new();

    for (name, amount) in standing_allowances {
        allowances.push(PaymentAllowance::new(name.clone(), *amount, Provenance::Standing));
    }

    let mut loan_lines = 0;
    for loan in store.list_active_loans(staff_id)? {
        let remaining = store.remaining_balance(loan.id)?;
        let installment = loan.installment_due(remaining);
        if !installment.is_positive() {
            // remaining balance hit zero, the loan is implicitly closed
            continue;
        }
        deductions.push(PaymentDeduction::new(
            loan.purpose.clone(),
            installment,
            Provenance::Loan(loan.id),
        ));
        loan_lines += 1;
        events.emit(Event::LoanInstallmentResolved {
            staff_id,
            purpose: loan.purpose,
            installment,
            remaining_after: remaining - installment,
            timestamp: time.now(),
        });
    }

    let bonuses = store.list_pending_bonuses(staff_id, period)?;
    let bonus_lines = bonuses.len();
    for bonus in bonuses {
        allowances.push(PaymentAllowance::new(
            bonus.reason,
            bonus.amount,
            Provenance::Bonus(bonus.id),
        ));
    }

    let penalties = store.list_pending_penalties(staff_id, period)?;
    let penalty_lines = penalties.len();
    for penalty in penalties {
        deductions.push(PaymentDeduction::new(
            penalty.reason,
            penalty.amount,
            Provenance::Penalty(penalty.id),
        ));
    }

    // manual lines survive re-resolution; auto lines were just regenerated
    if let Some(previous) = previous {
        allowances.extend(
            previous
                .allowances
                .iter()
                .filter(|a| !a.provenance.is_auto())
                .cloned(),
        );
        deductions.extend(
            previous
                .deductions
                .iter()
                .filter(|d| !d.provenance.is_auto())
                .cloned(),
        );
    }

    events.emit(Event::FinancialItemsResolved {
        staff_id,
        period,
        loan_lines,
        bonus_lines,
        penalty_lines,
        timestamp: time.now(),
    });

    Ok(ResolvedItems {
        allowances,
        deductions,
    })
}
