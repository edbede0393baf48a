use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{FinanceError, Result, Violation};

/// statutory withholdings computed from one month's gross income.
///
/// Employer pension is informational; it is excluded from
/// `total_employee_deductions` and never reduces net pay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct StatutoryDeductions {
    pub nhf: Money,
    pub pension_employee: Money,
    pub pension_employer: Money,
    pub nhis: Money,
    pub paye: Money,
    pub total_employee_deductions: Money,
}

/// injected strategy mapping gross income to statutory withholdings.
///
/// Implementations must be deterministic, side-effect-free, monotonic in
/// gross income, and never return negative amounts. The jurisdiction's
/// bracket table is data supplied by the caller, not part of this core.
pub trait StatutoryCalculator {
    fn compute(&self, gross: Money) -> StatutoryDeductions;

    fn monthly_paye(&self, gross: Money) -> Money {
        self.compute(gross).paye
    }
}

/// one progressive tax band over monthly taxable income
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaxBand {
    /// upper edge of the band; `None` marks the open-ended top band
    pub up_to: Option<Money>,
    pub rate: Rate,
}

/// banded statutory schedule parameterised entirely by jurisdiction data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandedSchedule {
    bands: Vec<TaxBand>,
    relief_flat: Money,
    relief_rate: Rate,
    nhf_rate: Rate,
    pension_employee_rate: Rate,
    pension_employer_rate: Rate,
    nhis_rate: Rate,
}

impl BandedSchedule {
    /// validate and build a schedule from jurisdiction data
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bands: Vec<TaxBand>,
        relief_flat: Money,
        relief_rate: Rate,
        nhf_rate: Rate,
        pension_employee_rate: Rate,
        pension_employer_rate: Rate,
        nhis_rate: Rate,
    ) -> Result<Self> {
        let mut violations = Vec::new();
        if bands.is_empty() {
            violations.push(Violation::new("bands", "at least one band is required"));
        }
        if bands.last().is_some_and(|b| b.up_to.is_some()) {
            violations.push(Violation::new("bands", "last band must be open-ended"));
        }
        let mut prev_edge = Money::ZERO;
        for (i, band) in bands.iter().enumerate() {
            if band.rate.as_decimal() < Decimal::ZERO || band.rate.as_decimal() >= Decimal::ONE {
                violations.push(Violation::new(
                    format!("bands[{}].rate", i),
                    "must be within [0, 1)",
                ));
            }
            if let Some(edge) = band.up_to {
                if edge <= prev_edge {
                    violations.push(Violation::new(
                        format!("bands[{}].up_to", i),
                        "band edges must be strictly ascending",
                    ));
                }
                prev_edge = edge;
            } else if i + 1 != bands.len() {
                violations.push(Violation::new(
                    format!("bands[{}].up_to", i),
                    "only the last band may be open-ended",
                ));
            }
        }
        for (field, rate) in [
            ("relief_rate", relief_rate),
            ("nhf_rate", nhf_rate),
            ("pension_employee_rate", pension_employee_rate),
            ("pension_employer_rate", pension_employer_rate),
            ("nhis_rate", nhis_rate),
        ] {
            if rate.as_decimal() < Decimal::ZERO || rate.as_decimal() >= Decimal::ONE {
                violations.push(Violation::new(field, "must be within [0, 1)"));
            }
        }
        if relief_flat.is_negative() {
            violations.push(Violation::new("relief_flat", "cannot be negative"));
        }
        if !violations.is_empty() {
            return Err(FinanceError::validation(violations));
        }
        Ok(Self {
            bands,
            relief_flat,
            relief_rate,
            nhf_rate,
            pension_employee_rate,
            pension_employer_rate,
            nhis_rate,
        })
    }

    /// progressive tax over monthly taxable income
    fn progressive(&self, taxable: Money) -> Money {
        let mut tax = Money::ZERO;
        let mut lower = Money::ZERO;
        for band in &self.bands {
            let upper = band.up_to.unwrap_or(taxable.max(lower));
            if taxable <= lower {
                break;
            }
            let slice = taxable.min(upper) - lower;
            if slice.is_positive() {
                tax += band.rate.of(slice);
            }
            lower = upper;
        }
        tax
    }
}

impl StatutoryCalculator for BandedSchedule {
    fn compute(&self, gross: Money) -> StatutoryDeductions {
        let gross = gross.max(Money::ZERO);
        let nhf = self.nhf_rate.of(gross);
        let pension_employee = self.pension_employee_rate.of(gross);
        let pension_employer = self.pension_employer_rate.of(gross);
        let nhis = self.nhis_rate.of(gross);

        // pension and nhf are deducted before tax
        let relief = self.relief_flat + self.relief_rate.of(gross);
        let taxable = (gross - relief - pension_employee - nhf).max(Money::ZERO);
        let paye = self.progressive(taxable);

        StatutoryDeductions {
            nhf,
            pension_employee,
            pension_employer,
            nhis,
            paye,
            total_employee_deductions: nhf + pension_employee + nhis + paye,
        }
    }
}
