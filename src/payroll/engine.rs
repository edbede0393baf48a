use chrono::{Duration, NaiveDate};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::config::ComplianceConfig;
use crate::decimal::Money;
use crate::errors::{FinanceError, Result, Violation};
use crate::events::{Event, EventStore};
use crate::payroll::{
    new_salary_reference, PaymentAllowance, PaymentDeduction, SalaryPayment, StatutoryCalculator,
};
use crate::store::FinanceStore;
use crate::types::{PayPeriod, PaymentMethod, Provenance, SalaryStatus, StaffId};

/// editable salary draft for one staff member and period.
///
/// Allowance and deduction lines usually come from the financial item
/// resolver; the engine injects statutory deductions itself, so any statutory
/// lines already present are replaced rather than doubled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryDraft {
    pub staff_id: StaffId,
    pub period: PayPeriod,
    pub basic_salary: Money,
    pub allowances: Vec<PaymentAllowance>,
    pub deductions: Vec<PaymentDeduction>,
    pub payment_method: PaymentMethod,
    pub payment_date: NaiveDate,
}

/// payroll computation engine with compliance thresholds
#[derive(Debug, Clone)]
pub struct PayrollEngine {
    config: ComplianceConfig,
}

impl PayrollEngine {
    pub fn new(config: ComplianceConfig) -> Self {
        Self { config }
    }

    pub fn standard() -> Self {
        Self::new(ComplianceConfig::standard())
    }

    /// compute totals and assemble a pending salary payment.
    ///
    /// Gross is settled first so statutory deductions can be derived from it,
    /// then every validation rule runs before anything is returned.
    pub fn build(
        &self,
        draft: &SalaryDraft,
        statutory: &dyn StatutoryCalculator,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<SalaryPayment> {
        let total_gross = draft.basic_salary + Money::sum(draft.allowances.iter().map(|a| a.amount));

        let mut deductions: Vec<PaymentDeduction> = draft
            .deductions
            .iter()
            .filter(|d| d.provenance != Provenance::Statutory)
            .cloned()
            .collect();
        let computed = statutory.compute(total_gross);
        for (name, amount) in [
            ("PAYE", computed.paye),
            ("Pension", computed.pension_employee),
            ("NHF", computed.nhf),
            ("NHIS", computed.nhis),
        ] {
            if amount.is_positive() {
                deductions.push(PaymentDeduction::new(name, amount, Provenance::Statutory));
            }
        }

        let total_deductions = Money::sum(deductions.iter().map(|d| d.amount));
        let net_pay = total_gross - total_deductions;

        self.validate(draft, &deductions, net_pay, time)?;

        events.emit(Event::SalaryComputed {
            staff_id: draft.staff_id,
            period: draft.period,
            total_gross,
            total_deductions,
            net_pay,
            timestamp: time.now(),
        });

        Ok(SalaryPayment {
            staff_id: draft.staff_id,
            period: draft.period,
            reference: new_salary_reference(draft.period),
            basic_salary: draft.basic_salary,
            allowances: draft.allowances.clone(),
            deductions,
            total_gross,
            total_deductions,
            net_pay,
            status: SalaryStatus::Pending,
            payment_method: draft.payment_method,
            payment_date: draft.payment_date,
        })
    }

    /// build and persist a salary payment.
    ///
    /// The `has_existing_payment` pre-check is an early hint only; the store's
    /// conditional write is what actually enforces period uniqueness.
    pub fn create(
        &self,
        store: &mut dyn FinanceStore,
        draft: &SalaryDraft,
        statutory: &dyn StatutoryCalculator,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<SalaryPayment> {
        if store.has_existing_payment(draft.staff_id, draft.period)? {
            return Err(FinanceError::DuplicatePeriod {
                staff_id: draft.staff_id,
                month: draft.period.month(),
                year: draft.period.year(),
            });
        }
        let salary = self.build(draft, statutory, time, events)?;
        store.create_salary_payment(&salary)?;
        events.emit(Event::SalaryCreated {
            staff_id: salary.staff_id,
            period: salary.period,
            reference: salary.reference.clone(),
            net_pay: salary.net_pay,
            timestamp: time.now(),
        });
        Ok(salary)
    }

    /// move a pending payment to approved, in memory and in the store
    pub fn approve(
        &self,
        store: &mut dyn FinanceStore,
        salary: &mut SalaryPayment,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        self.transition(store, salary, SalaryStatus::Approved, time, events)
    }

    /// move an approved payment to paid and settle the bonuses and penalties
    /// it consumed, so they never resolve into a later period
    pub fn mark_as_paid(
        &self,
        store: &mut dyn FinanceStore,
        salary: &mut SalaryPayment,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        self.transition(store, salary, SalaryStatus::Paid, time, events)?;
        store.settle_financial_items(salary.staff_id, salary.period)
    }

    fn transition(
        &self,
        store: &mut dyn FinanceStore,
        salary: &mut SalaryPayment,
        next: SalaryStatus,
        time: &SafeTimeProvider,
        events: &mut EventStore,
    ) -> Result<()> {
        let old_status = salary.status;
        if !old_status.can_transition_to(next) {
            return Err(FinanceError::InvalidTransition {
                from: old_status,
                to: next,
            });
        }
        store.update_salary_status(&salary.reference, next)?;
        salary.status = next;
        events.emit(Event::SalaryStatusChanged {
            staff_id: salary.staff_id,
            reference: salary.reference.clone(),
            old_status,
            new_status: next,
            timestamp: time.now(),
        });
        Ok(())
    }

    /// every rule must pass before a payment is created or updated;
    /// field problems are collected and reported together
    fn validate(
        &self,
        draft: &SalaryDraft,
        deductions: &[PaymentDeduction],
        net_pay: Money,
        time: &SafeTimeProvider,
    ) -> Result<()> {
        let mut violations = Vec::new();

        if draft.staff_id.is_nil() {
            violations.push(Violation::new("staff_id", "is required"));
        }
        if !draft.basic_salary.is_positive() {
            violations.push(Violation::new("basic_salary", "must be greater than zero"));
        }
        if !draft.payment_method.valid_for_payroll() {
            violations.push(Violation::new(
                "payment_method",
                "must be cash, bank_transfer, or cheque",
            ));
        }

        let today = time.now().date_naive();
        if draft.payment_date > today + Duration::days(self.config.max_future_days) {
            violations.push(Violation::new(
                "payment_date",
                format!(
                    "cannot be more than {} days in the future",
                    self.config.max_future_days
                ),
            ));
        }

        let mut allowance_names = HashSet::new();
        for allowance in &draft.allowances {
            if allowance.name.trim().is_empty() {
                violations.push(Violation::new("allowances", "every allowance needs a name"));
            } else if !allowance_names.insert(allowance.name.clone()) {
                violations.push(Violation::new(
                    "allowances",
                    format!("duplicate allowance name '{}'", allowance.name),
                ));
            }
            if !allowance.amount.is_positive() {
                violations.push(Violation::new(
                    "allowances",
                    format!("allowance '{}' must have a positive amount", allowance.name),
                ));
            }
        }

        let mut deduction_names = HashSet::new();
        for deduction in deductions {
            if deduction.name.trim().is_empty() {
                violations.push(Violation::new("deductions", "every deduction needs a name"));
            } else if !deduction_names.insert(deduction.name.clone()) {
                violations.push(Violation::new(
                    "deductions",
                    format!("duplicate deduction name '{}'", deduction.name),
                ));
            }
            if !deduction.amount.is_positive() {
                violations.push(Violation::new(
                    "deductions",
                    format!("deduction '{}' must have a positive amount", deduction.name),
                ));
            }
        }

        if !violations.is_empty() {
            return Err(FinanceError::validation(violations));
        }

        if net_pay.is_negative() {
            return Err(FinanceError::NegativeNetPay { net_pay });
        }
        if net_pay > self.config.net_pay_cap {
            return Err(FinanceError::ImplausibleNetPay {
                net_pay,
                cap: self.config.net_pay_cap,
            });
        }
        if draft.payment_method == PaymentMethod::Cash && net_pay > self.config.cash_ceiling {
            return Err(FinanceError::CashCeilingExceeded {
                net_pay,
                ceiling: self.config.cash_ceiling,
            });
        }
        if net_pay > self.config.bank_transfer_threshold
            && draft.payment_method != PaymentMethod::BankTransfer
        {
            return Err(FinanceError::BankTransferRequired {
                net_pay,
                threshold: self.config.bank_transfer_threshold,
            });
        }

        Ok(())
    }
}
