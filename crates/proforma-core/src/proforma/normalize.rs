use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProformaError;
use crate::proforma::request::*;
use crate::types::{Money, Percent, Rate};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Raw form values
// ---------------------------------------------------------------------------

/// One raw form input: either left blank or holding a value.
///
/// Deserializes from the value itself, or from `null`, an absent key or an
/// empty/whitespace string for [`FormField::Blank`]. A string that `T`
/// rejects is retried as a JSON number, so `"30"` fills a whole-number
/// field the same way `30` does. Serializes `Blank` back to `""`.
#[derive(Debug, Clone, PartialEq)]
pub enum FormField<T> {
    Blank,
    Value(T),
}

impl<T> Default for FormField<T> {
    fn default() -> Self {
        FormField::Blank
    }
}

impl<T> FormField<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            FormField::Blank => None,
            FormField::Value(v) => Some(v),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, FormField::Blank)
    }
}

impl<T> From<T> for FormField<T> {
    fn from(value: T) -> Self {
        FormField::Value(value)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for FormField<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        match raw {
            None | Some(serde_json::Value::Null) => Ok(FormField::Blank),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => Ok(FormField::Blank),
            Some(serde_json::Value::String(s)) => match T::deserialize(serde_json::Value::String(s.clone())) {
                Ok(v) => Ok(FormField::Value(v)),
                Err(e) => match serde_json::from_str::<serde_json::Number>(s.trim()) {
                    Ok(n) => T::deserialize(serde_json::Value::Number(n))
                        .map(FormField::Value)
                        .map_err(D::Error::custom),
                    Err(_) => Err(D::Error::custom(e)),
                },
            },
            Some(v) => T::deserialize(v).map(FormField::Value).map_err(D::Error::custom),
        }
    }
}

impl<T: Serialize> Serialize for FormField<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FormField::Blank => serializer.serialize_str(""),
            FormField::Value(v) => v.serialize(serializer),
        }
    }
}

/// Property intake form exactly as the UI submits it.
///
/// Dollar amounts are annual unless the name says monthly. Percent fields
/// are whole numbers (`5` = 5%). Integer fields are signed so that a
/// negative entry can be reported rather than rejected by the parser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropertyForm {
    // Property
    pub address: FormField<String>,
    pub city: FormField<String>,
    pub state: FormField<String>,
    pub zip_code: FormField<String>,
    pub fair_market_value: FormField<Money>,
    pub number_of_units: FormField<i64>,
    pub annual_appreciation_rate: FormField<Percent>,
    pub vacancy_rate: FormField<Percent>,

    // Purchase
    pub offer_price: FormField<Money>,
    pub repairs: FormField<Money>,
    pub repairs_contingency: FormField<Money>,
    pub lenders_fee: FormField<Money>,
    pub broker_fee: FormField<Money>,
    pub environmentals: FormField<Money>,
    pub inspections_or_engineer_report: FormField<Money>,
    pub appraisals: FormField<Money>,
    pub misc: FormField<Money>,
    pub transfer_tax: FormField<Money>,
    pub legal: FormField<Money>,
    pub other_closing_costs: FormField<Money>,

    // Financing
    pub first_mtg_principle_borrowed: FormField<Money>,
    pub first_mtg_interest_rate: FormField<Percent>,
    pub first_mtg_amortization_period: FormField<i64>,
    pub first_mtg_interest_only_years: FormField<i64>,
    pub second_mtg_principal: FormField<Money>,
    pub second_mtg_interest_rate: FormField<Percent>,
    pub second_mtg_amortization_period: FormField<i64>,
    pub other_monthly_financing_cost: FormField<Money>,

    // Income
    pub gross_rents: FormField<Money>,
    pub parking: FormField<Money>,
    pub storage: FormField<Money>,
    pub laundry_vending: FormField<Money>,
    pub other_income: FormField<Money>,

    // Operating expenses
    pub property_taxes: FormField<Money>,
    pub insurance: FormField<Money>,
    pub electricity: FormField<Money>,
    pub gas: FormField<Money>,
    pub water_sewer: FormField<Money>,
    pub cable: FormField<Money>,
    pub lawn_snow_maintenance: FormField<Money>,
    pub caretaking: FormField<Money>,
    pub advertising: FormField<Money>,
    pub association_fees: FormField<Money>,
    pub pest_control: FormField<Money>,
    pub security: FormField<Money>,
    pub trash_removal: FormField<Money>,
    pub miscellaneous: FormField<Money>,
    pub common_area_maintenance: FormField<Money>,
    pub capital_improvements: FormField<Money>,
    pub accounting: FormField<Money>,
    pub legal_expense: FormField<Money>,
    pub bad_debts: FormField<Money>,
    pub evictions: FormField<Money>,
    pub other_expense: FormField<Money>,
    pub management_rate: FormField<Percent>,
    pub management_base: FormField<ManagementBase>,
    pub repairs_expense_percent: FormField<Percent>,

    // Projection
    pub hold_years: FormField<i64>,
    pub rent_growth_rate: FormField<Percent>,
    pub expense_growth_rate: FormField<Percent>,
    pub exit_cost_rate: FormField<Percent>,
}

// ---------------------------------------------------------------------------
// Defaults and provenance
// ---------------------------------------------------------------------------

/// Values used for optional form fields left blank. Rates are decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormDefaults {
    pub vacancy_rate: Rate,
    pub management_rate: Rate,
    pub management_base: ManagementBase,
    pub repairs_rate: Rate,
    pub annual_appreciation: Rate,
    pub rent_growth: Rate,
    pub expense_growth: Rate,
    pub exit_cost_rate: Rate,
    pub first_amortization_years: u32,
    pub second_amortization_years: u32,
    pub hold_years: u32,
    pub number_of_units: u32,
}

impl Default for FormDefaults {
    fn default() -> Self {
        FormDefaults {
            vacancy_rate: dec!(0.05),
            management_rate: dec!(0.10),
            management_base: ManagementBase::Egi,
            repairs_rate: Decimal::ZERO,
            annual_appreciation: dec!(0.03),
            rent_growth: dec!(0.03),
            expense_growth: dec!(0.03),
            exit_cost_rate: dec!(0.06),
            first_amortization_years: 30,
            second_amortization_years: 20,
            hold_years: 10,
            number_of_units: 1,
        }
    }
}

/// Where a resolved optional value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Entered,
    Defaulted,
}

/// A normalized request plus, per optional form field, whether the user
/// entered it or a default filled it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedForm {
    pub request: AnalysisRequest,
    pub provenance: BTreeMap<String, Provenance>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Turn a raw form into an [`AnalysisRequest`].
///
/// Every missing required field is reported together as
/// [`ProformaError::Validation`]. Only once all are present is a negative
/// whole-number field reported, as [`ProformaError::InvalidInput`].
pub fn normalize_form(form: &PropertyForm, defaults: &FormDefaults) -> ProformaResult<NormalizedForm> {
    let mut r = Resolver::default();

    let property = PropertyInfo {
        address: r.required_text("address", &form.address),
        city: r.required_text("city", &form.city),
        state: r.required_text("state", &form.state),
        zip: r.required_text("zipCode", &form.zip_code),
        fair_market_value: r.money("fairMarketValue", &form.fair_market_value),
        offer_price: r.required_money("offerPrice", &form.offer_price),
        number_of_units: r.count("numberOfUnits", &form.number_of_units, defaults.number_of_units),
        annual_appreciation: r.rate(
            "annualAppreciationRate",
            &form.annual_appreciation_rate,
            defaults.annual_appreciation,
        ),
    };

    let purchase = PurchaseCosts {
        repairs: r.money("repairs", &form.repairs),
        repairs_contingency: r.money("repairsContingency", &form.repairs_contingency),
        lender_fee: r.money("lendersFee", &form.lenders_fee),
        broker_fee: r.money("brokerFee", &form.broker_fee),
        environmentals: r.money("environmentals", &form.environmentals),
        inspections: r.money("inspectionsOrEngineerReport", &form.inspections_or_engineer_report),
        appraisals: r.money("appraisals", &form.appraisals),
        misc: r.money("misc", &form.misc),
        transfer_tax: r.money("transferTax", &form.transfer_tax),
        legal: r.money("legal", &form.legal),
        other_closing_costs: r.money("otherClosingCosts", &form.other_closing_costs),
    };

    let first_mortgage = MortgageTerms {
        principal: r.money("firstMtgPrincipleBorrowed", &form.first_mtg_principle_borrowed),
        annual_rate: r.rate("firstMtgInterestRate", &form.first_mtg_interest_rate, Decimal::ZERO),
        amortization_years: r.count(
            "firstMtgAmortizationPeriod",
            &form.first_mtg_amortization_period,
            defaults.first_amortization_years,
        ),
        interest_only_years: r.count("firstMtgInterestOnlyYears", &form.first_mtg_interest_only_years, 0),
    };

    // A second mortgage exists only if its principal was entered
    let second_mortgage = match form.second_mtg_principal.value() {
        Some(_) => Some(MortgageTerms {
            principal: r.money("secondMtgPrincipal", &form.second_mtg_principal),
            annual_rate: r.rate("secondMtgInterestRate", &form.second_mtg_interest_rate, Decimal::ZERO),
            amortization_years: r.count(
                "secondMtgAmortizationPeriod",
                &form.second_mtg_amortization_period,
                defaults.second_amortization_years,
            ),
            interest_only_years: 0,
        }),
        None => None,
    };

    let financing = Financing {
        first_mortgage,
        second_mortgage,
        other_monthly_financing_costs: r.money("otherMonthlyFinancingCost", &form.other_monthly_financing_cost),
    };

    let income = IncomeTerms {
        gross_rents: r.required_money("grossRents", &form.gross_rents),
        parking: r.money("parking", &form.parking),
        storage: r.money("storage", &form.storage),
        laundry_vending: r.money("laundryVending", &form.laundry_vending),
        other_income: r.money("otherIncome", &form.other_income),
        vacancy_rate: r.rate("vacancyRate", &form.vacancy_rate, defaults.vacancy_rate),
    };

    let expenses = OperatingExpenses {
        property_taxes: r.money("propertyTaxes", &form.property_taxes),
        insurance: r.money("insurance", &form.insurance),
        electricity: r.money("electricity", &form.electricity),
        gas: r.money("gas", &form.gas),
        water_sewer: r.money("waterSewer", &form.water_sewer),
        cable: r.money("cable", &form.cable),
        lawn_snow_maintenance: r.money("lawnSnowMaintenance", &form.lawn_snow_maintenance),
        caretaking: r.money("caretaking", &form.caretaking),
        advertising: r.money("advertising", &form.advertising),
        association_fees: r.money("associationFees", &form.association_fees),
        pest_control: r.money("pestControl", &form.pest_control),
        security: r.money("security", &form.security),
        trash_removal: r.money("trashRemoval", &form.trash_removal),
        miscellaneous: r.money("miscellaneous", &form.miscellaneous),
        common_area_maintenance: r.money("commonAreaMaintenance", &form.common_area_maintenance),
        capital_improvements: r.money("capitalImprovements", &form.capital_improvements),
        accounting: r.money("accounting", &form.accounting),
        legal: r.money("legalExpense", &form.legal_expense),
        bad_debts: r.money("badDebts", &form.bad_debts),
        evictions: r.money("evictions", &form.evictions),
        other: r.money("otherExpense", &form.other_expense),
        management_rate: r.rate("managementRate", &form.management_rate, defaults.management_rate),
        management_base: r.resolve("managementBase", &form.management_base, defaults.management_base),
        repairs_rate: r.rate("repairsExpensePercent", &form.repairs_expense_percent, defaults.repairs_rate),
    };

    let projection = ProjectionParams {
        hold_years: r.count("holdYears", &form.hold_years, defaults.hold_years),
        rent_growth: r.rate("rentGrowthRate", &form.rent_growth_rate, defaults.rent_growth),
        expense_growth: r.rate("expenseGrowthRate", &form.expense_growth_rate, defaults.expense_growth),
        exit_cost_rate: r.rate("exitCostRate", &form.exit_cost_rate, defaults.exit_cost_rate),
    };

    let provenance = r.finish()?;

    Ok(NormalizedForm {
        request: AnalysisRequest {
            property,
            purchase,
            financing,
            income,
            expenses,
            projection,
        },
        provenance,
    })
}

/// Collects provenance, missing required fields and bad whole numbers
/// while the request is assembled.
#[derive(Default)]
struct Resolver {
    provenance: BTreeMap<String, Provenance>,
    missing: Vec<String>,
    negative: Vec<&'static str>,
}

impl Resolver {
    fn resolve<T: Clone>(&mut self, name: &str, field: &FormField<T>, default: T) -> T {
        let (value, source) = match field {
            FormField::Value(v) => (v.clone(), Provenance::Entered),
            FormField::Blank => (default, Provenance::Defaulted),
        };
        self.provenance.insert(name.to_string(), source);
        value
    }

    fn money(&mut self, name: &str, field: &FormField<Money>) -> Money {
        self.resolve(name, field, Decimal::ZERO)
    }

    /// The one place a form percentage becomes a decimal rate.
    fn rate(&mut self, name: &str, field: &FormField<Percent>, default: Rate) -> Rate {
        match field {
            FormField::Value(p) => {
                self.provenance.insert(name.to_string(), Provenance::Entered);
                p.to_rate()
            }
            FormField::Blank => {
                self.provenance.insert(name.to_string(), Provenance::Defaulted);
                default
            }
        }
    }

    fn count(&mut self, name: &'static str, field: &FormField<i64>, default: u32) -> u32 {
        let raw = self.resolve(name, field, i64::from(default));
        match u32::try_from(raw) {
            Ok(n) => n,
            Err(_) => {
                self.negative.push(name);
                0
            }
        }
    }

    fn required_text(&mut self, name: &str, field: &FormField<String>) -> String {
        match field {
            FormField::Value(s) if !s.trim().is_empty() => s.trim().to_string(),
            _ => {
                self.missing.push(name.to_string());
                String::new()
            }
        }
    }

    fn required_money(&mut self, name: &str, field: &FormField<Money>) -> Money {
        match field {
            FormField::Value(v) => *v,
            FormField::Blank => {
                self.missing.push(name.to_string());
                Decimal::ZERO
            }
        }
    }

    fn finish(self) -> ProformaResult<BTreeMap<String, Provenance>> {
        if !self.missing.is_empty() {
            return Err(ProformaError::Validation {
                missing: self.missing,
            });
        }
        if let Some(name) = self.negative.first() {
            return Err(ProformaError::invalid(
                name,
                "Must be a whole number between 0 and 4294967295",
            ));
        }
        Ok(self.provenance)
    }
}
