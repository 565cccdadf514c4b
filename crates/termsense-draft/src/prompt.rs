//! Prompt construction for the two draft kinds.

use crate::drafter::{DraftKind, DraftRequest};

/// System and user prompt pair for one request.
pub struct PromptPair {
    pub system: String,
    pub user: String,
}

pub fn build(request: &DraftRequest) -> PromptPair {
    match request.kind {
        DraftKind::RootCause => build_root_cause(request),
        DraftKind::MerchantEmail => build_merchant_email(request),
    }
}

fn build_root_cause(request: &DraftRequest) -> PromptPair {
    let alert = &request.alert;
    let snap = &alert.source;
    PromptPair {
        system: "You are a Senior Technical Consultant at a global payments company. \
                 Your task is to provide an initial, rapid assessment of a terminal \
                 anomaly based on provided metrics. Be precise and avoid generic advice."
            .to_string(),
        user: format!(
            "Analyze this anomaly data for a payment terminal: \
             Issue Type: {severity}. Merchant: {merchant}. Terminal ID: {terminal}. \
             Transactions: {transactions}. Errors: {errors}. Error Rate: {rate}%. \
             Connectivity: {connectivity}. \
             Provide a concise, highly probable Root Cause Analysis (RCA) and list \
             the top 3 immediate next steps for the Technical Consultant. \
             Format the output with clear headings.",
            severity = alert.severity,
            merchant = alert.merchant_name,
            terminal = alert.terminal_id,
            transactions = snap.transactions,
            errors = snap.errors,
            rate = snap.error_rate,
            connectivity = snap.connectivity,
        ),
    }
}

fn build_merchant_email(request: &DraftRequest) -> PromptPair {
    let alert = &request.alert;
    let snap = &alert.source;
    PromptPair {
        system: "You are a customer communications specialist for a payments company. \
                 Draft proactive alerts that are clear, professional, and focus on \
                 immediate action steps for the merchant to minimize business impact."
            .to_string(),
        user: format!(
            "Draft a professional, empathetic, and urgent email to the merchant, \
             {merchant}, regarding the following detected issue: \
             Terminal ID: {terminal}. Issue: {message}. \
             Key data: Transactions={transactions}, Errors={errors}, \
             Connectivity={connectivity}. \
             The email should inform them we detected the problem, apologize for \
             potential disruption, and ask them to perform one simple action \
             (e.g., reboot the terminal or check the WiFi router) while we assign \
             a technical consultant. Keep it concise and under 150 words.",
            merchant = alert.merchant_name,
            terminal = alert.terminal_id,
            message = alert.message,
            transactions = snap.transactions,
            errors = snap.errors,
            connectivity = snap.connectivity,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use termsense_common::types::{
        Alert, Connectivity, Severity, TerminalSnapshot, TerminalStatus,
    };

    fn request(kind: DraftKind) -> DraftRequest {
        DraftRequest {
            kind,
            alert: Alert {
                severity: Severity::Warning,
                terminal_id: "T1004".to_string(),
                merchant_name: "Merchant A5".to_string(),
                message: "Abnormally high error rate (28.57%) detected. Exceeds limit of 15%."
                    .to_string(),
                source: TerminalSnapshot {
                    id: "T1004".to_string(),
                    merchant_name: "Merchant A5".to_string(),
                    transactions: 350,
                    errors: 100,
                    error_rate: 28.57,
                    connectivity: Connectivity::Online,
                    status: TerminalStatus::HighErrors,
                    last_update: Utc::now(),
                },
            },
        }
    }

    #[test]
    fn root_cause_prompt_carries_all_metrics() {
        let p = build(&request(DraftKind::RootCause));
        assert!(p.system.contains("Senior Technical Consultant"));
        assert!(p.user.contains("Issue Type: warning"));
        assert!(p.user.contains("Terminal ID: T1004"));
        assert!(p.user.contains("Transactions: 350"));
        assert!(p.user.contains("Errors: 100"));
        assert!(p.user.contains("Error Rate: 28.57%"));
        assert!(p.user.contains("Connectivity: Online"));
        assert!(p.user.contains("top 3 immediate next steps"));
    }

    #[test]
    fn merchant_email_prompt_carries_issue_and_word_limit() {
        let p = build(&request(DraftKind::MerchantEmail));
        assert!(p.system.contains("customer communications specialist"));
        assert!(p.user.contains("Merchant A5"));
        assert!(p.user.contains("Issue: Abnormally high error rate"));
        assert!(p.user.contains("Transactions=350"));
        assert!(p.user.contains("under 150 words"));
    }
}
