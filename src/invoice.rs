//! Invoice document model – parties, line items and the derived totals.
//!
//! All money is held as [`Decimal`]. Totals are computed on demand from the
//! line items and never stored, so they always agree with the items.
//! Construction rejects items and invoices whose totals do not fit in a
//! [`Decimal`], so the derived totals never overflow.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Fixed tax rate applied to every invoice (18 % GST).
pub const TAX_RATE: Decimal = dec!(0.18);

/// Number of fractional digits money is rounded to.
pub const MONEY_SCALE: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelError {
    #[error("unit price of '{description}' is negative: {price}")]
    NegativeUnitPrice { description: String, price: Decimal },

    #[error("line total of '{description}' overflows: {quantity} x {price}")]
    LineTotalOverflow {
        description: String,
        quantity: u32,
        price: Decimal,
    },

    #[error("invoice totals overflow")]
    TotalsOverflow,
}

/// Round to two decimal places, halves away from zero.
pub fn round_half_up(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Issuer or recipient block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Party {
    pub name: String,
    pub address: String,
    pub email: String,
}

impl Party {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            email: email.into(),
        }
    }
}

/// A single billed line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "LineItemRecord", into = "LineItemRecord")]
pub struct LineItem {
    description: String,
    quantity: u32,
    unit_price: Decimal,
}

impl LineItem {
    pub fn new(
        description: impl Into<String>,
        quantity: u32,
        unit_price: Decimal,
    ) -> Result<Self, ModelError> {
        let description = description.into();
        if unit_price.is_sign_negative() && !unit_price.is_zero() {
            return Err(ModelError::NegativeUnitPrice {
                description,
                price: unit_price,
            });
        }
        if unit_price.checked_mul(Decimal::from(quantity)).is_none() {
            return Err(ModelError::LineTotalOverflow {
                description,
                quantity,
                price: unit_price,
            });
        }
        Ok(Self {
            description,
            quantity,
            unit_price,
        })
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// `quantity × unit_price`, exact.
    pub fn total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An invoice as loaded for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "InvoiceRecord", into = "InvoiceRecord")]
pub struct Invoice {
    number: String,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    issuer: Party,
    recipient: Party,
    items: Vec<LineItem>,
    notes: Option<String>,
}

impl Invoice {
    pub fn new(
        number: impl Into<String>,
        issue_date: NaiveDate,
        due_date: NaiveDate,
        issuer: Party,
        recipient: Party,
        items: Vec<LineItem>,
        notes: Option<String>,
    ) -> Result<Self, ModelError> {
        checked_totals(&items).ok_or(ModelError::TotalsOverflow)?;
        Ok(Self {
            number: number.into(),
            issue_date,
            due_date,
            issuer,
            recipient,
            items,
            notes,
        })
    }

    /// Parse an invoice from the flat JSON data-file schema.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn issue_date(&self) -> NaiveDate {
        self.issue_date
    }

    pub fn due_date(&self) -> NaiveDate {
        self.due_date
    }

    pub fn issuer(&self) -> &Party {
        &self.issuer
    }

    pub fn recipient(&self) -> &Party {
        &self.recipient
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    /// Sum of all line totals.
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::total).sum()
    }

    /// Tax on the subtotal, rounded to cents.
    pub fn tax(&self) -> Decimal {
        round_half_up(self.subtotal() * TAX_RATE)
    }

    /// `subtotal + tax`, rounded again to cents.
    pub fn grand_total(&self) -> Decimal {
        round_half_up(self.subtotal() + self.tax())
    }

    /// Built-in demo invoice used when no data file is given.
    pub fn sample() -> Self {
        let item = |description: &str, quantity: u32, unit_price: Decimal| LineItem {
            description: description.to_string(),
            quantity,
            unit_price,
        };
        Self {
            number: "INV-2026-0042".to_string(),
            issue_date: NaiveDate::from_ymd_opt(2026, 2, 24).unwrap_or_default(),
            due_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap_or_default(),
            issuer: Party::new(
                "GodownOS Technologies",
                "12B Industrial Estate, Andheri East, Mumbai – 400 093, India",
                "billing@godownos.io",
            ),
            recipient: Party::new(
                "Rajesh Warehouse Solutions Pvt. Ltd.",
                "Plot 47, MIDC Bhosari, Pune – 411 026, Maharashtra",
                "accounts@rajeshwh.com",
            ),
            items: vec![
                item("Pallet Storage – Zone A (per pallet/month)", 20, dec!(850.00)),
                item("Cold-Chain Storage – Zone C (per sqft/month)", 5, dec!(1200.00)),
                item("Inward Handling & Labelling Service", 3, dec!(2500.00)),
                item("GodownOS SaaS Licence – Business Plan", 1, dec!(4999.00)),
            ],
            notes: Some(
                "Payment is due within 15 days. Transfer to HDFC Bank A/C 012345678912, \
                 IFSC: HDFC0001234. Thank you for choosing GodownOS."
                    .to_string(),
            ),
        }
    }
}

/// `(subtotal, tax, grand_total)` with every step checked, `None` on overflow.
fn checked_totals(items: &[LineItem]) -> Option<(Decimal, Decimal, Decimal)> {
    let subtotal = items.iter().try_fold(Decimal::ZERO, |acc, item| {
        item.unit_price
            .checked_mul(Decimal::from(item.quantity))
            .and_then(|total| acc.checked_add(total))
    })?;
    let tax = round_half_up(subtotal.checked_mul(TAX_RATE)?);
    let grand = round_half_up(subtotal.checked_add(tax)?);
    Some((subtotal, tax, grand))
}

// ---------------------------------------------------------------------------
// Wire records – the flat camelCase data-file schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct LineItemRecord {
    description: String,
    quantity: u32,
    unit_price: Decimal,
}

impl TryFrom<LineItemRecord> for LineItem {
    type Error = ModelError;

    fn try_from(r: LineItemRecord) -> Result<Self, Self::Error> {
        LineItem::new(r.description, r.quantity, r.unit_price)
    }
}

impl From<LineItem> for LineItemRecord {
    fn from(item: LineItem) -> Self {
        Self {
            description: item.description,
            quantity: item.quantity,
            unit_price: item.unit_price,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct InvoiceRecord {
    invoice_number: String,
    invoice_date: NaiveDate,
    due_date: NaiveDate,
    company_name: String,
    company_address: String,
    company_email: String,
    customer_name: String,
    customer_email: String,
    customer_address: String,
    #[serde(default)]
    items: Vec<LineItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
}

impl TryFrom<InvoiceRecord> for Invoice {
    type Error = ModelError;

    fn try_from(r: InvoiceRecord) -> Result<Self, Self::Error> {
        Invoice::new(
            r.invoice_number,
            r.invoice_date,
            r.due_date,
            Party::new(r.company_name, r.company_address, r.company_email),
            Party::new(r.customer_name, r.customer_address, r.customer_email),
            r.items,
            r.notes,
        )
    }
}

impl From<Invoice> for InvoiceRecord {
    fn from(inv: Invoice) -> Self {
        Self {
            invoice_number: inv.number,
            invoice_date: inv.issue_date,
            due_date: inv.due_date,
            company_name: inv.issuer.name,
            company_address: inv.issuer.address,
            company_email: inv.issuer.email,
            customer_name: inv.recipient.name,
            customer_email: inv.recipient.email,
            customer_address: inv.recipient.address,
            items: inv.items,
            notes: inv.notes,
        }
    }
}
