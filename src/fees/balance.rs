use rust_decimal_macros::dec;

use crate::config::QuickAmountConfig;
use crate::decimal::Money;
use crate::fees::FeeAssignment;

/// total outstanding balance across every item with a positive balance
pub fn outstanding_balance(assignments: &[FeeAssignment]) -> Money {
    Money::sum(
        assignments
            .iter()
            .flat_map(|a| a.items.iter())
            .filter(|i| i.balance.is_positive())
            .map(|i| i.balance),
    )
}

/// per-category outstanding balances, in assignment order
pub fn category_balances(assignments: &[FeeAssignment]) -> Vec<(String, Money)> {
    assignments
        .iter()
        .flat_map(|a| a.items.iter())
        .filter(|i| i.balance.is_positive())
        .map(|i| (i.category_name.clone(), i.balance))
        .collect()
}

/// shortcut amounts for the payment form: full balance, half, fixed increments
pub fn quick_amounts(assignments: &[FeeAssignment], config: &QuickAmountConfig) -> Vec<Money> {
    let total = outstanding_balance(assignments);
    if total.is_zero() {
        return Vec::new();
    }
    let mut amounts = vec![total, total / dec!(2)];
    for increment in &config.increments {
        if *increment < total && !amounts.contains(increment) {
            amounts.push(*increment);
        }
    }
    amounts
}
