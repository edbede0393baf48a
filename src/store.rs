use std::collections::HashMap;

use hourglass_rs::SafeTimeProvider;

use crate::decimal::Money;
use crate::errors::{FinanceError, Result};
use crate::events::{Event, EventStore};
use crate::fees::{FeeAssignment, Payment};
use crate::payroll::{SalaryPayment, StaffBonus, StaffLoan, StaffPenalty};
use crate::types::{ItemStatus, LoanId, PayPeriod, PaymentStatus, SalaryStatus, StaffId, StudentId};

/// abstract persistence collaborator.
///
/// The computation core never talks to storage directly; UI event handlers
/// hand it an implementation of this trait. `create_salary_payment` is a
/// compare-and-commit operation: the store enforces the one-payment-per
/// staff/period invariant at write time and the engine's `has_existing_payment`
/// pre-check is only an early hint.
pub trait FinanceStore {
    fn list_fee_assignments(&self, student_id: StudentId) -> Result<Vec<FeeAssignment>>;
    fn list_active_loans(&self, staff_id: StaffId) -> Result<Vec<StaffLoan>>;
    fn remaining_balance(&self, loan_id: LoanId) -> Result<Money>;
    fn list_pending_bonuses(&self, staff_id: StaffId, period: PayPeriod) -> Result<Vec<StaffBonus>>;
    fn list_pending_penalties(&self, staff_id: StaffId, period: PayPeriod)
        -> Result<Vec<StaffPenalty>>;
    fn has_existing_payment(&self, staff_id: StaffId, period: PayPeriod) -> Result<bool>;

    fn insert_payment(&mut self, payment: &Payment) -> Result<()>;
    fn update_fee_assignment(&mut self, assignment: &FeeAssignment) -> Result<()>;
    fn update_payment_status(&mut self, reference: &str, status: PaymentStatus) -> Result<()>;
    /// conditional write; fails with `DuplicatePeriod` if a payment already
    /// exists for the staff member and period
    fn create_salary_payment(&mut self, salary: &SalaryPayment) -> Result<()>;
    fn update_salary_status(&mut self, reference: &str, status: SalaryStatus) -> Result<()>;
    /// mark the period's pending bonuses and penalties as paid once the
    /// salary that consumed them is disbursed
    fn settle_financial_items(&mut self, staff_id: StaffId, period: PayPeriod) -> Result<()>;
}

/// persist a payment, decrement the matching fee balances, confirm the payment.
///
/// These are separate writes. If anything fails after the payment was
/// persisted the result is a `PartialCommit` error carrying the payment
/// reference and the record stays pending: the operator must reconcile, a
/// blind retry could double-deduct.
pub fn record_payment(
    store: &mut dyn FinanceStore,
    assignment: &mut FeeAssignment,
    payment: &mut Payment,
    time: &SafeTimeProvider,
    events: &mut EventStore,
) -> Result<()> {
    store.insert_payment(payment)?;
    events.emit(Event::PaymentRecorded {
        student_id: payment.student_id,
        assignment_id: payment.fee_assignment_id,
        reference: payment.reference.clone(),
        amount: payment.amount,
        method: payment.method,
        payment_date: payment.payment_date,
        timestamp: time.now(),
    });

    let mut updated = assignment.clone();
    let second_write = updated
        .apply_allocations(&payment.allocations)
        .and_then(|_| store.update_fee_assignment(&updated))
        .and_then(|_| store.update_payment_status(&payment.reference, PaymentStatus::Confirmed));

    match second_write {
        Ok(()) => {
            payment.confirm()?;
            events.emit(Event::BalancesDecremented {
                assignment_id: updated.id,
                amount: payment.amount,
                new_balance: updated.balance,
                timestamp: time.now(),
            });
            *assignment = updated;
            Ok(())
        }
        Err(cause) => {
            events.emit(Event::PartialCommitDetected {
                reference: payment.reference.clone(),
                amount: payment.amount,
                message: cause.to_string(),
                timestamp: time.now(),
            });
            Err(FinanceError::PartialCommit {
                reference: payment.reference.clone(),
                message: cause.to_string(),
            })
        }
    }
}

/// in-memory store for tests and examples
#[derive(Debug, Default)]
pub struct InMemoryStore {
    assignments: HashMap<StudentId, Vec<FeeAssignment>>,
    payments: Vec<Payment>,
    loans: HashMap<StaffId, Vec<StaffLoan>>,
    loan_balances: HashMap<LoanId, Money>,
    bonuses: Vec<StaffBonus>,
    penalties: Vec<StaffPenalty>,
    salaries: Vec<SalaryPayment>,
    fail_assignment_updates: bool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_assignment(&mut self, assignment: FeeAssignment) {
        self.assignments
            .entry(assignment.student_id)
            .or_default()
            .push(assignment);
    }

    pub fn add_loan(&mut self, loan: StaffLoan, remaining_balance: Money) {
        self.loan_balances.insert(loan.id, remaining_balance);
        self.loans.entry(loan.staff_id).or_default().push(loan);
    }

    pub fn add_bonus(
        &mut self,
        staff_id: StaffId,
        period: PayPeriod,
        amount: Money,
        reason: impl Into<String>,
    ) {
        self.bonuses.push(StaffBonus {
            id: uuid::Uuid::new_v4(),
            staff_id,
            amount,
            reason: reason.into(),
            period,
            status: ItemStatus::Pending,
        });
    }

    pub fn add_penalty(
        &mut self,
        staff_id: StaffId,
        period: PayPeriod,
        amount: Money,
        reason: impl Into<String>,
    ) {
        self.penalties.push(StaffPenalty {
            id: uuid::Uuid::new_v4(),
            staff_id,
            amount,
            reason: reason.into(),
            period,
            status: ItemStatus::Pending,
        });
    }

    /// make every fee assignment update fail, to exercise the partial-commit path
    pub fn fail_assignment_updates(&mut self, fail: bool) {
        self.fail_assignment_updates = fail;
    }

    pub fn payments(&self) -> &[Payment] {
        &self.payments
    }

    pub fn salaries(&self) -> &[SalaryPayment] {
        &self.salaries
    }
}

impl FinanceStore for InMemoryStore {
    fn list_fee_assignments(&self, student_id: StudentId) -> Result<Vec<FeeAssignment>> {
        Ok(self.assignments.get(&student_id).cloned().unwrap_or_default())
    }

    fn list_active_loans(&self, staff_id: StaffId) -> Result<Vec<StaffLoan>> {
        Ok(self.loans.get(&staff_id).cloned().unwrap_or_default())
    }

    fn remaining_balance(&self, loan_id: LoanId) -> Result<Money> {
        self.loan_balances
            .get(&loan_id)
            .copied()
            .ok_or_else(|| FinanceError::Upstream {
                message: format!("unknown loan {}", loan_id),
            })
    }

    fn list_pending_bonuses(&self, staff_id: StaffId, period: PayPeriod) -> Result<Vec<StaffBonus>> {
        Ok(self
            .bonuses
            .iter()
            .filter(|b| {
                b.staff_id == staff_id && b.period == period && b.status == ItemStatus::Pending
            })
            .cloned()
            .collect())
    }

    fn list_pending_penalties(
        &self,
        staff_id: StaffId,
        period: PayPeriod,
    ) -> Result<Vec<StaffPenalty>> {
        Ok(self
            .penalties
            .iter()
            .filter(|p| {
                p.staff_id == staff_id && p.period == period && p.status == ItemStatus::Pending
            })
            .cloned()
            .collect())
    }

    fn has_existing_payment(&self, staff_id: StaffId, period: PayPeriod) -> Result<bool> {
        Ok(self
            .salaries
            .iter()
            .any(|s| s.staff_id == staff_id && s.period == period))
    }

    fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        self.payments.push(payment.clone());
        Ok(())
    }

    fn update_fee_assignment(&mut self, assignment: &FeeAssignment) -> Result<()> {
        if self.fail_assignment_updates {
            return Err(FinanceError::Upstream {
                message: "assignment write rejected".to_string(),
            });
        }
        let slot = self
            .assignments
            .get_mut(&assignment.student_id)
            .and_then(|list| list.iter_mut().find(|a| a.id == assignment.id))
            .ok_or_else(|| FinanceError::Upstream {
                message: format!("unknown assignment {}", assignment.id),
            })?;
        *slot = assignment.clone();
        Ok(())
    }

    fn update_payment_status(&mut self, reference: &str, status: PaymentStatus) -> Result<()> {
        let payment = self
            .payments
            .iter_mut()
            .find(|p| p.reference == reference)
            .ok_or_else(|| FinanceError::Upstream {
                message: format!("unknown payment reference {}", reference),
            })?;
        if !payment.status.can_transition_to(status) {
            return Err(FinanceError::InvalidPaymentTransition {
                from: payment.status,
                to: status,
            });
        }
        payment.status = status;
        Ok(())
    }

    fn create_salary_payment(&mut self, salary: &SalaryPayment) -> Result<()> {
        // uniqueness enforced at write time, not by the caller's pre-check
        if self
            .salaries
            .iter()
            .any(|s| s.staff_id == salary.staff_id && s.period == salary.period)
        {
            return Err(FinanceError::DuplicatePeriod {
                staff_id: salary.staff_id,
                month: salary.period.month(),
                year: salary.period.year(),
            });
        }
        self.salaries.push(salary.clone());
        Ok(())
    }

    fn update_salary_status(&mut self, reference: &str, status: SalaryStatus) -> Result<()> {
        let salary = self
            .salaries
            .iter_mut()
            .find(|s| s.reference == reference)
            .ok_or_else(|| FinanceError::Upstream {
                message: format!("unknown salary reference {}", reference),
            })?;
        if !salary.status.can_transition_to(status) {
            return Err(FinanceError::InvalidTransition {
                from: salary.status,
                to: status,
            });
        }
        salary.status = status;
        Ok(())
    }

    fn settle_financial_items(&mut self, staff_id: StaffId, period: PayPeriod) -> Result<()> {
        for bonus in self
            .bonuses
            .iter_mut()
            .filter(|b| b.staff_id == staff_id && b.period == period)
        {
            if bonus.status.can_transition_to(ItemStatus::Paid) {
                bonus.status = ItemStatus::Paid;
            }
        }
        for penalty in self
            .penalties
            .iter_mut()
            .filter(|p| p.staff_id == staff_id && p.period == period)
        {
            if penalty.status.can_transition_to(ItemStatus::Paid) {
                penalty.status = ItemStatus::Paid;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ComplianceConfig;
    use crate::fees::{FeeItem, PaymentAllocation};
    use crate::types::{FeeType, PaymentMethod};
    use chrono::{NaiveDate, Utc};
    use hourglass_rs::TimeSource;
    use uuid::Uuid;

    fn setup() -> (InMemoryStore, FeeAssignment, Payment) {
        let student_id = Uuid::new_v4();
        let item = FeeItem::unpaid(
            Uuid::new_v4(),
            "Tuition",
            FeeType::Tuition,
            Money::from_major(50_000),
            true,
        )
        .unwrap();
        let category_id = item.category_id;
        let assignment = FeeAssignment::new(student_id, vec![item]).unwrap();

        let payment = Payment::new(
            student_id,
            assignment.id,
            Money::from_major(20_000),
            PaymentMethod::BankTransfer,
            NaiveDate::from_ymd_opt(2024, 9, 12).unwrap(),
            vec![PaymentAllocation {
                category_id,
                category_name: "Tuition".to_string(),
                fee_type: FeeType::Tuition,
                amount: Money::from_major(20_000),
            }],
            &ComplianceConfig::standard(),
        )
        .unwrap();

        let mut store = InMemoryStore::new();
        store.add_assignment(assignment.clone());
        (store, assignment, payment)
    }

    #[test]
    fn test_record_payment_decrements_balances() {
        let (mut store, mut assignment, mut payment) = setup();
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        record_payment(&mut store, &mut assignment, &mut payment, &time, &mut events).unwrap();

        assert_eq!(assignment.balance, Money::from_major(30_000));
        assert_eq!(store.payments().len(), 1);
        // the committed payment is confirmed, in memory and in the store
        assert_eq!(payment.status, PaymentStatus::Confirmed);
        assert_eq!(store.payments()[0].status, PaymentStatus::Confirmed);
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::BalancesDecremented { .. })));
    }

    #[test]
    fn test_partial_commit_surfaced_not_swallowed() {
        let (mut store, mut assignment, mut payment) = setup();
        store.fail_assignment_updates(true);
        let time = SafeTimeProvider::new(TimeSource::Test(Utc::now()));
        let mut events = EventStore::new();

        let err = record_payment(&mut store, &mut assignment, &mut payment, &time, &mut events)
            .unwrap_err();

        match err {
            FinanceError::PartialCommit { reference, .. } => {
                assert_eq!(reference, payment.reference);
            }
            other => panic!("expected PartialCommit, got {other:?}"),
        }
        // the payment was persisted but stays pending, the balances were not touched
        assert_eq!(store.payments().len(), 1);
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(store.payments()[0].status, PaymentStatus::Pending);
        assert_eq!(assignment.balance, Money::from_major(50_000));
        assert!(events
            .events()
            .iter()
            .any(|e| matches!(e, Event::PartialCommitDetected { .. })));
    }

    #[test]
    fn test_duplicate_salary_rejected_at_write_time() {
        use crate::payroll::new_salary_reference;
        use crate::types::SalaryStatus;

        let staff_id = Uuid::new_v4();
        let period = PayPeriod::new(4, 2024).unwrap();
        let salary = SalaryPayment {
            staff_id,
            period,
            reference: new_salary_reference(period),
            basic_salary: Money::from_major(200_000),
            allowances: vec![],
            deductions: vec![],
            total_gross: Money::from_major(200_000),
            total_deductions: Money::ZERO,
            net_pay: Money::from_major(200_000),
            status: SalaryStatus::Pending,
            payment_method: PaymentMethod::BankTransfer,
            payment_date: NaiveDate::from_ymd_opt(2024, 4, 28).unwrap(),
        };

        let mut store = InMemoryStore::new();
        store.create_salary_payment(&salary).unwrap();

        let mut second = salary.clone();
        second.reference = new_salary_reference(period);
        let err = store.create_salary_payment(&second).unwrap_err();
        assert!(matches!(err, FinanceError::DuplicatePeriod { .. }));
    }
}
