use serde::{Deserialize, Serialize};

use crate::decimal::Money;

/// compliance thresholds for payment and payroll commits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceConfig {
    /// cash payouts above this must use a traceable method
    pub cash_ceiling: Money,
    /// net pay above this must go through bank transfer
    pub bank_transfer_threshold: Money,
    /// net pay above this is rejected as implausible
    pub net_pay_cap: Money,
    /// tolerance when comparing allocation sums to the payment amount
    pub allocation_tolerance: Money,
    /// payment dates may not sit further ahead than this
    pub max_future_days: i64,
}

impl ComplianceConfig {
    /// standard school thresholds
    pub fn standard() -> Self {
        Self {
            cash_ceiling: Money::from_major(100_000),
            bank_transfer_threshold: Money::from_major(500_000),
            net_pay_cap: Money::from_major(15_000_000),
            allocation_tolerance: Money::KOBO,
            max_future_days: 30,
        }
    }
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// fixed shortcut amounts offered next to the payment amount field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickAmountConfig {
    pub increments: Vec<Money>,
}

impl Default for QuickAmountConfig {
    fn default() -> Self {
        Self {
            increments: vec![
                Money::from_major(5_000),
                Money::from_major(10_000),
                Money::from_major(20_000),
                Money::from_major(50_000),
            ],
        }
    }
}
