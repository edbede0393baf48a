pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod fees;
pub mod payroll;
pub mod store;
pub mod types;

// re-export key types
pub use decimal::{Money, Rate};
pub use errors::{FinanceError, Result, Violation};
pub use events::{Event, EventStore};
pub use config::{ComplianceConfig, QuickAmountConfig};
pub use fees::{
    category_balances, new_payment_reference, outstanding_balance, quick_amounts, AllocationDraft,
    AllocationMode, FeeAssignment, FeeItem, Payment, PaymentAllocation,
};
pub use payroll::{
    new_salary_reference, resolve_financial_items, BandedSchedule, PaymentAllowance,
    PaymentDeduction, PayrollEngine, ResolvedItems, SalaryDraft, SalaryPayment, StaffBonus,
    StaffLoan, StaffPenalty, StatutoryCalculator, StatutoryDeductions, TaxBand,
};
pub use store::{record_payment, FinanceStore, InMemoryStore};
pub use types::{
    AssignmentId, CategoryId, FeeStatus, FeeType, ItemId, ItemStatus, LoanId, PayPeriod,
    PaymentMethod, PaymentStatus, Provenance, SalaryStatus, StaffId, StudentId,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
