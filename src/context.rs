//! Rendering context – the invoice as the template sees it.
//!
//! The invoice is bound under a single key, [`CONTEXT_KEY`], together with
//! the derived totals so templates never re-derive money values.

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::invoice::{Invoice, LineItem, MONEY_SCALE, TAX_RATE};

/// Name the invoice is bound to inside the template.
pub const CONTEXT_KEY: &str = "invoice";

/// Engine-neutral bag of template variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderContext {
    vars: Map<String, Value>,
}

impl RenderContext {
    /// Bind `invoice` under [`CONTEXT_KEY`]; totals are computed here.
    pub fn bind(invoice: &Invoice) -> Result<Self, serde_json::Error> {
        let mut vars = Map::new();
        vars.insert(
            CONTEXT_KEY.to_string(),
            serde_json::to_value(InvoiceView::from(invoice))?,
        );
        Ok(Self { vars })
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// The whole context as a JSON object.
    pub fn to_value(&self) -> Value {
        Value::Object(self.vars.clone())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InvoiceView {
    invoice_number: String,
    invoice_date: String,
    due_date: String,
    company_name: String,
    company_address: String,
    company_email: String,
    customer_name: String,
    customer_email: String,
    customer_address: String,
    items: Vec<ItemView>,
    notes: Option<String>,
    subtotal: String,
    tax: String,
    tax_rate: String,
    grand_total: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemView {
    description: String,
    quantity: u32,
    unit_price: String,
    total: String,
}

impl From<&Invoice> for InvoiceView {
    fn from(inv: &Invoice) -> Self {
        Self {
            invoice_number: inv.number().to_string(),
            invoice_date: inv.issue_date().to_string(),
            due_date: inv.due_date().to_string(),
            company_name: inv.issuer().name.clone(),
            company_address: inv.issuer().address.clone(),
            company_email: inv.issuer().email.clone(),
            customer_name: inv.recipient().name.clone(),
            customer_email: inv.recipient().email.clone(),
            customer_address: inv.recipient().address.clone(),
            items: inv.items().iter().map(ItemView::from).collect(),
            notes: inv.notes().map(str::to_string),
            subtotal: money(inv.subtotal()),
            tax: money(inv.tax()),
            tax_rate: format!("{}%", (TAX_RATE * Decimal::ONE_HUNDRED).normalize()),
            grand_total: money(inv.grand_total()),
        }
    }
}

impl From<&LineItem> for ItemView {
    fn from(item: &LineItem) -> Self {
        Self {
            description: item.description().to_string(),
            quantity: item.quantity(),
            unit_price: money(item.unit_price()),
            total: money(item.total()),
        }
    }
}

/// Decimal string with at least two fractional digits. Only pads; values
/// with more digits are shown exactly.
pub fn money(value: Decimal) -> String {
    let mut padded = value;
    if padded.scale() < MONEY_SCALE {
        padded.rescale(MONEY_SCALE);
    }
    padded.to_string()
}
