//! Wire-format parsing for payment report responses.
//!
//! The remote service is an untrusted boundary: a response either yields a
//! complete [`RecordPayload`] or nothing at all. Responses sometimes carry
//! detailed quantitative records and sometimes only budget-plan totals, so
//! the parser decides the payload variant here and downstream consumers
//! pattern-match on it.

use crate::{AcsPayment, BudgetSummary, RecordPayload};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Budget plan label identifying community health agent transfers.
const ACS_BUDGET_PLAN: &str = "Agentes Comunitários de Saúde";

/// Top-level payment report body.
#[derive(Debug, Deserialize)]
pub struct PaymentResponse {
    #[serde(default, rename = "pagamentos")]
    payments: Vec<PaymentEntry>,
    #[serde(default, rename = "resumosPlanosOrcamentarios")]
    budget_summaries: Vec<BudgetEntry>,
}

/// One entry of the payments section. Only entries carrying the agent
/// ceiling field describe community health agents.
#[derive(Debug, Deserialize)]
struct PaymentEntry {
    #[serde(rename = "qtTetoAcs")]
    ceiling: Option<u32>,
    #[serde(default, rename = "qtAcsDiretoCredenciado")]
    direct_credentialed: u32,
    #[serde(default, rename = "qtAcsIndiretoCredenciado")]
    indirect_credentialed: u32,
    #[serde(default, rename = "qtAcsDiretoPgto")]
    direct_paid: u32,
    #[serde(default, rename = "qtAcsIndiretoPgto")]
    indirect_paid: u32,
    #[serde(default, rename = "vlTotalAcsDireto")]
    direct_amount: Decimal,
    #[serde(default, rename = "vlTotalAcsIndireto")]
    indirect_amount: Decimal,
}

/// One entry of the budget summaries section.
#[derive(Debug, Deserialize)]
struct BudgetEntry {
    #[serde(default, rename = "dsPlanoOrcamentario")]
    plan: String,
    #[serde(default, rename = "vlEfetivoRepasse")]
    transfer_amount: Decimal,
}

/// Extract the ACS payload from a parsed response body.
///
/// Preference order follows the data quality: a detailed payments entry
/// wins; otherwise budget-plan totals are accepted as a fallback. `None`
/// means the response carried no ACS content at all, which the client
/// classifies as a malformed response.
pub fn extract_payload(response: &PaymentResponse) -> Option<RecordPayload> {
    for entry in &response.payments {
        if let Some(ceiling) = entry.ceiling {
            return Some(RecordPayload::Detailed(AcsPayment {
                ceiling,
                direct_credentialed: entry.direct_credentialed,
                indirect_credentialed: entry.indirect_credentialed,
                direct_paid: entry.direct_paid,
                indirect_paid: entry.indirect_paid,
                direct_amount: entry.direct_amount,
                indirect_amount: entry.indirect_amount,
            }));
        }
    }

    for entry in &response.budget_summaries {
        if entry.plan == ACS_BUDGET_PLAN {
            return Some(RecordPayload::BudgetOnly(BudgetSummary {
                plan: entry.plan.clone(),
                transfer_amount: entry.transfer_amount,
            }));
        }
    }

    None
}
