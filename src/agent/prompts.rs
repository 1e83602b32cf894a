//! Prompt text and offline fallback answers for each analyzer.

use crate::models::{Category, Features};

/// Output contract shared by every analyzer prompt.
const RESPONSE_FORMAT: &str = r#"REQUIRED OUTPUT:
1) SCORE (0..1) alone on the first line, with three decimal places. 0 is safe, 1 is the highest possible risk.
2) Then a short explanation (at most 4 sentences) naming the main red flags.
Use ONLY the evidence provided. Do not fabricate data."#;

const PHISHING_SYSTEM: &str = r#"You are a risk analyst specialized in PHISHING for crypto users.
OBJECTIVE: estimate the phishing risk in a message or transaction.
RED FLAGS: look-alike domains (typosquatting), shortened URLs, fake or inconsistent HTTPS, misuse of brand,
suspicious urgency, requests for seed phrases or private keys, young DNS, absence of official profiles,
links leading to unknown wallets, requests for personal information."#;

const TRANSACTION_SYSTEM: &str = r#"You are an on-chain risk analyst focused on TRANSACTIONS and the contracts they touch.
OBJECTIVE: estimate the risk of the current transaction.
SCOPE: transaction type, granted permissions (unlimited approve, permit, delegate, upgrade/proxy),
counterparties (mixers, sanctioned or flagged addresses), anomalous patterns (bursts, young wallets,
repeated small amounts, concentrated fan-in/out).
Do NOT weigh structural token risk such as locked liquidity or holder distribution.
If the behavior is normal, assign a low score."#;

const RUGPULL_SYSTEM: &str = r#"You are a token analyst focused on RUGPULL risk.
OBJECTIVE: estimate the rugpull risk of a token.
RED FLAGS: liquidity unlocked or close to unlock, high tax rate, active mint authority, ownership not renounced,
supply concentrated in few wallets, low liquidity, deployer history of pulls, recent permission changes,
trading disabled, honeypot signals.
You will receive features and a preliminary heuristic (0..1). Consider both."#;

/// System prompt for a category, including the response format.
pub fn system_prompt(category: Category) -> String {
    let role = match category {
        Category::Phishing => PHISHING_SYSTEM,
        Category::Transaction => TRANSACTION_SYSTEM,
        Category::Rugpull => RUGPULL_SYSTEM,
    };
    format!("{}\n\n{}", role, RESPONSE_FORMAT)
}

pub fn phishing_prompt(query: &str, snippets: &str) -> String {
    format!(
        "Analyze possible phishing related to: {}.\nEvidence:\n{}\nAssess the risk.",
        query, snippets
    )
}

pub fn transaction_prompt(features: &Features) -> String {
    format!(
        "Analyze the on-chain behavior. Data: {}\nProvide a risk SCORE and a short justification.",
        features
    )
}

pub fn rugpull_prompt(features: &Features, heuristic: f64) -> String {
    format!(
        "Analyze the rugpull risk. Features: {}\nPreliminary heuristic: {:.3}\nProvide the final SCORE and a short justification.",
        features, heuristic
    )
}

/// Canned response used when no model answer is available.
pub fn fallback_response(category: Category) -> &'static str {
    match category {
        Category::Phishing => "0.2\nSite appears legitimate and uses valid SSL.",
        Category::Transaction => "0.7\nTransactions concentrated in few wallets.",
        Category::Rugpull => "0.9\nLiquidity unlocks soon; elevated risk.",
    }
}
