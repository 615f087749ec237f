use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::{Money, Rate};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Immutable input snapshot for one pro forma run.
///
/// Every rate in here is already a decimal (0.05 = 5%). Percent-as-typed UI
/// values are converted exactly once, by [`crate::proforma::normalize`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub property: PropertyInfo,
    #[serde(default)]
    pub purchase: PurchaseCosts,
    #[serde(default)]
    pub financing: Financing,
    pub income: IncomeTerms,
    #[serde(default)]
    pub expenses: OperatingExpenses,
    #[serde(default)]
    pub projection: ProjectionParams,
}

/// Identity and valuation of the property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyInfo {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    /// Fair market value; zero means unset
    #[serde(default)]
    pub fair_market_value: Money,
    /// Offer (contract) price
    pub offer_price: Money,
    #[serde(default)]
    pub number_of_units: u32,
    /// Annual property appreciation rate
    #[serde(default)]
    pub annual_appreciation: Rate,
}

/// One-time acquisition costs added to the offer price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PurchaseCosts {
    pub repairs: Money,
    pub repairs_contingency: Money,
    pub lender_fee: Money,
    pub broker_fee: Money,
    pub environmentals: Money,
    pub inspections: Money,
    pub appraisals: Money,
    /// Site visit, title insurance, assignment fee and the like
    pub misc: Money,
    pub transfer_tax: Money,
    pub legal: Money,
    pub other_closing_costs: Money,
}

/// Fixed-rate mortgage terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MortgageTerms {
    pub principal: Money,
    /// Annual interest rate
    pub annual_rate: Rate,
    /// Loan term in years, interest-only period included
    pub amortization_years: u32,
    /// Leading years of interest-only payments
    #[serde(default)]
    pub interest_only_years: u32,
}

impl Default for MortgageTerms {
    fn default() -> Self {
        MortgageTerms {
            principal: Decimal::ZERO,
            annual_rate: Decimal::ZERO,
            amortization_years: 30,
            interest_only_years: 0,
        }
    }
}

/// Debt used to fund the purchase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Financing {
    pub first_mortgage: MortgageTerms,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub second_mortgage: Option<MortgageTerms>,
    /// Servicing and other financing fees, per month
    pub other_monthly_financing_costs: Money,
}

/// Annual income and vacancy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncomeTerms {
    /// Total annual rent across all units
    pub gross_rents: Money,
    #[serde(default)]
    pub parking: Money,
    #[serde(default)]
    pub storage: Money,
    #[serde(default)]
    pub laundry_vending: Money,
    #[serde(default)]
    pub other_income: Money,
    /// Vacancy and collection loss as a fraction of total income
    #[serde(default)]
    pub vacancy_rate: Rate,
}

/// Base that the management fee rate is applied to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagementBase {
    /// Effective gross income
    #[default]
    #[serde(rename = "EGI")]
    Egi,
    /// Gross scheduled rents, before vacancy
    #[serde(rename = "GROSS", alias = "GROSS_RENTS")]
    GrossRents,
}

/// Annual operating expenses: fixed dollar lines plus rate-based lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatingExpenses {
    pub property_taxes: Money,
    pub insurance: Money,
    pub electricity: Money,
    pub gas: Money,
    pub water_sewer: Money,
    pub cable: Money,
    pub lawn_snow_maintenance: Money,
    pub caretaking: Money,
    pub advertising: Money,
    pub association_fees: Money,
    pub pest_control: Money,
    pub security: Money,
    pub trash_removal: Money,
    pub miscellaneous: Money,
    pub common_area_maintenance: Money,
    pub capital_improvements: Money,
    pub accounting: Money,
    pub legal: Money,
    pub bad_debts: Money,
    pub evictions: Money,
    pub other: Money,
    /// Management fee as a fraction of `management_base`
    pub management_rate: Rate,
    pub management_base: ManagementBase,
    /// Repairs and maintenance as a fraction of gross rents
    pub repairs_rate: Rate,
}

/// Hold period and growth assumptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionParams {
    pub hold_years: u32,
    pub rent_growth: Rate,
    pub expense_growth: Rate,
    /// Selling costs as a fraction of the sale price
    pub exit_cost_rate: Rate,
}

impl Default for ProjectionParams {
    fn default() -> Self {
        ProjectionParams {
            hold_years: 10,
            rent_growth: dec!(0.03),
            expense_growth: dec!(0.03),
            exit_cost_rate: dec!(0.06),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

impl PurchaseCosts {
    /// Sum of every one-time cost line.
    pub fn total(&self) -> Money {
        self.lines().iter().map(|(_, amount)| *amount).sum()
    }

    fn lines(&self) -> [(&'static str, Money); 11] {
        [
            ("purchase.repairs", self.repairs),
            ("purchase.repairs_contingency", self.repairs_contingency),
            ("purchase.lender_fee", self.lender_fee),
            ("purchase.broker_fee", self.broker_fee),
            ("purchase.environmentals", self.environmentals),
            ("purchase.inspections", self.inspections),
            ("purchase.appraisals", self.appraisals),
            ("purchase.misc", self.misc),
            ("purchase.transfer_tax", self.transfer_tax),
            ("purchase.legal", self.legal),
            ("purchase.other_closing_costs", self.other_closing_costs),
        ]
    }
}

impl IncomeTerms {
    /// Non-rent income: parking, storage, laundry/vending and other.
    pub fn ancillary(&self) -> Money {
        self.parking + self.storage + self.laundry_vending + self.other_income
    }

    /// Gross rents plus ancillary income, before vacancy.
    pub fn total(&self) -> Money {
        self.gross_rents + self.ancillary()
    }
}

impl OperatingExpenses {
    /// Sum of the fixed dollar expense lines.
    pub fn fixed_total(&self) -> Money {
        self.lines().iter().map(|(_, amount)| *amount).sum()
    }

    fn lines(&self) -> [(&'static str, Money); 21] {
        [
            ("expenses.property_taxes", self.property_taxes),
            ("expenses.insurance", self.insurance),
            ("expenses.electricity", self.electricity),
            ("expenses.gas", self.gas),
            ("expenses.water_sewer", self.water_sewer),
            ("expenses.cable", self.cable),
            ("expenses.lawn_snow_maintenance", self.lawn_snow_maintenance),
            ("expenses.caretaking", self.caretaking),
            ("expenses.advertising", self.advertising),
            ("expenses.association_fees", self.association_fees),
            ("expenses.pest_control", self.pest_control),
            ("expenses.security", self.security),
            ("expenses.trash_removal", self.trash_removal),
            ("expenses.miscellaneous", self.miscellaneous),
            ("expenses.common_area_maintenance", self.common_area_maintenance),
            ("expenses.capital_improvements", self.capital_improvements),
            ("expenses.accounting", self.accounting),
            ("expenses.legal", self.legal),
            ("expenses.bad_debts", self.bad_debts),
            ("expenses.evictions", self.evictions),
            ("expenses.other", self.other),
        ]
    }
}

impl Financing {
    /// Second mortgage terms, ignoring an entry with no principal.
    pub fn active_second(&self) -> Option<&MortgageTerms> {
        self.second_mortgage
            .as_ref()
            .filter(|m| m.principal > Decimal::ZERO)
    }

    pub fn total_principal(&self) -> Money {
        self.first_mortgage.principal + self.active_second().map_or(Decimal::ZERO, |m| m.principal)
    }
}

impl AnalysisRequest {
    /// Every dollar input that must be non-negative, with its field path.
    pub(crate) fn money_fields(&self) -> Vec<(&'static str, Money)> {
        let mut fields = vec![
            ("property.offer_price", self.property.offer_price),
            ("property.fair_market_value", self.property.fair_market_value),
            ("income.gross_rents", self.income.gross_rents),
            ("income.parking", self.income.parking),
            ("income.storage", self.income.storage),
            ("income.laundry_vending", self.income.laundry_vending),
            ("income.other_income", self.income.other_income),
            (
                "financing.first_mortgage.principal",
                self.financing.first_mortgage.principal,
            ),
            (
                "financing.other_monthly_financing_costs",
                self.financing.other_monthly_financing_costs,
            ),
        ];
        if let Some(second) = &self.financing.second_mortgage {
            fields.push(("financing.second_mortgage.principal", second.principal));
        }
        fields.extend(self.purchase.lines());
        fields.extend(self.expenses.lines());
        fields
    }

    /// Every rate input, with its field path. All must lie in [0, 1].
    pub(crate) fn rate_fields(&self) -> Vec<(&'static str, Rate)> {
        let mut fields = vec![
            ("income.vacancy_rate", self.income.vacancy_rate),
            ("expenses.management_rate", self.expenses.management_rate),
            ("expenses.repairs_rate", self.expenses.repairs_rate),
            ("property.annual_appreciation", self.property.annual_appreciation),
            ("projection.rent_growth", self.projection.rent_growth),
            ("projection.expense_growth", self.projection.expense_growth),
            ("projection.exit_cost_rate", self.projection.exit_cost_rate),
            (
                "financing.first_mortgage.annual_rate",
                self.financing.first_mortgage.annual_rate,
            ),
        ];
        if let Some(second) = &self.financing.second_mortgage {
            fields.push(("financing.second_mortgage.annual_rate", second.annual_rate));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_management_base_aliases() {
        let egi: ManagementBase = serde_json::from_str("\"EGI\"").unwrap();
        let gross: ManagementBase = serde_json::from_str("\"GROSS\"").unwrap();
        let legacy: ManagementBase = serde_json::from_str("\"GROSS_RENTS\"").unwrap();
        assert_eq!(egi, ManagementBase::Egi);
        assert_eq!(gross, ManagementBase::GrossRents);
        assert_eq!(legacy, ManagementBase::GrossRents);
    }

    #[test]
    fn test_minimal_request_uses_defaults() {
        let json = r#"{
            "property": {"address": "1 Main St", "city": "Springfield", "state": "IL",
                         "zip": "62701", "offer_price": "300000"},
            "income": {"gross_rents": "24000"}
        }"#;
        let req: AnalysisRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.projection.hold_years, 10);
        assert_eq!(req.financing.first_mortgage.amortization_years, 30);
        assert_eq!(req.expenses.management_base, ManagementBase::Egi);
        assert_eq!(req.purchase.total(), Decimal::ZERO);
        assert!(req.financing.second_mortgage.is_none());
    }

    #[test]
    fn test_second_mortgage_without_principal_is_inactive() {
        let financing = Financing {
            second_mortgage: Some(MortgageTerms::default()),
            ..Default::default()
        };
        assert!(financing.active_second().is_none());
        assert_eq!(financing.total_principal(), Decimal::ZERO);
    }

    #[test]
    fn test_income_total() {
        let income = IncomeTerms {
            gross_rents: dec!(120000),
            parking: dec!(6000),
            storage: dec!(2400),
            laundry_vending: Decimal::ZERO,
            other_income: dec!(600),
            vacancy_rate: dec!(0.05),
        };
        assert_eq!(income.ancillary(), dec!(9000));
        assert_eq!(income.total(), dec!(129000));
    }
}
