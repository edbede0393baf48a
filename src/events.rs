use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{AssignmentId, PayPeriod, PaymentMethod, SalaryStatus, StaffId, StudentId};

/// all events emitted by the computation core
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // fee payment events
    PaymentRecorded {
        student_id: StudentId,
        assignment_id: AssignmentId,
        reference: String,
        amount: Money,
        method: PaymentMethod,
        payment_date: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    BalancesDecremented {
        assignment_id: AssignmentId,
        amount: Money,
        new_balance: Money,
        timestamp: DateTime<Utc>,
    },
    PartialCommitDetected {
        reference: String,
        amount: Money,
        message: String,
        timestamp: DateTime<Utc>,
    },

    // payroll events
    FinancialItemsResolved {
        staff_id: StaffId,
        period: PayPeriod,
        loan_lines: usize,
        bonus_lines: usize,
        penalty_lines: usize,
        timestamp: DateTime<Utc>,
    },
    /// an installment line was resolved for a draft; nothing is applied to
    /// the loan balance until the salary that carries it is committed
    LoanInstallmentResolved {
        staff_id: StaffId,
        purpose: String,
        installment: Money,
        remaining_after: Money,
        timestamp: DateTime<Utc>,
    },
    SalaryComputed {
        staff_id: StaffId,
        period: PayPeriod,
        total_gross: Money,
        total_deductions: Money,
        net_pay: Money,
        timestamp: DateTime<Utc>,
    },
    SalaryCreated {
        staff_id: StaffId,
        period: PayPeriod,
        reference: String,
        net_pay: Money,
        timestamp: DateTime<Utc>,
    },
    SalaryStatusChanged {
        staff_id: StaffId,
        reference: String,
        old_status: SalaryStatus,
        new_status: SalaryStatus,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
