//! Statement extraction: PDF text via `pdftotext`, then an OpenAI-compatible
//! chat completion turns the text into candidate transactions.

use std::path::Path;
use std::process::Command;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MoniError, Result};
use crate::models::Transaction;
use crate::settings::Settings;

/// Anything that can turn a statement file into candidate transactions.
///
/// Categories on the returned rows are proposals and may name categories
/// that do not exist; callers must not assume otherwise.
pub trait StatementExtractor: Send + Sync {
    fn extract(&self, file_path: &Path, known_categories: &[String]) -> Result<Vec<Transaction>>;
}

pub struct LlmExtractor {
    http_client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    pdftotext: String,
}

impl LlmExtractor {
    pub fn new(base_url: &str, model: &str, api_key: Option<String>, pdftotext: &str) -> Self {
        Self {
            http_client: reqwest::blocking::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            pdftotext: pdftotext.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            &settings.llm.base_url,
            &settings.llm.model,
            settings.llm.resolved_api_key(),
            &settings.pdftotext,
        )
    }

    fn pdf_to_text(&self, file_path: &Path) -> Result<String> {
        let output = Command::new(&self.pdftotext)
            .arg("-layout")
            .arg("-nopgbrk")
            .arg(file_path)
            .arg("-")
            .output()
            .map_err(|e| MoniError::ExtractionFailed(format!("failed to run {}: {e}", self.pdftotext)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MoniError::ExtractionFailed(format!(
                "{} failed (exit {}): {}",
                self.pdftotext,
                output.status.code().unwrap_or(-1),
                stderr.trim(),
            )));
        }

        let text = String::from_utf8_lossy(&output.stdout).to_string();
        if text.trim().is_empty() {
            return Err(MoniError::ExtractionFailed(
                "PDF has no extractable text".to_string(),
            ));
        }
        Ok(text)
    }

    fn chat_completion(&self, prompt: &str, document: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: document.to_string(),
                },
            ],
            temperature: 0.0,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.bearer_auth(api_key);
        }

        let response = req_builder
            .send()
            .map_err(|e| MoniError::ExtractionFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(MoniError::ExtractionFailed(format!("API error {status}: {body}")));
        }

        let chat_response: ChatCompletionResponse = response
            .json()
            .map_err(|e| MoniError::ExtractionFailed(e.to_string()))?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| MoniError::ExtractionFailed("No response from API".into()))
    }
}

impl StatementExtractor for LlmExtractor {
    fn extract(&self, file_path: &Path, known_categories: &[String]) -> Result<Vec<Transaction>> {
        let text = self.pdf_to_text(file_path)?;
        debug!(bytes = text.len(), file = %file_path.display(), "Extracted statement text");

        let prompt = build_prompt(known_categories);
        let content = self.chat_completion(&prompt, &text)?;
        let transactions = parse_transactions(&content)?;
        info!(count = transactions.len(), model = %self.model, "Parsed transactions from statement");
        Ok(transactions)
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

pub fn build_prompt(known_categories: &[String]) -> String {
    format!(
        r#"You are a financial data extraction specialist. Analyze the provided financial document and extract transaction data following these rules:

DOCUMENT TYPES:
- Payslip: Extract ONLY the net salary (final take-home pay)
- Bank/Credit statements: Extract all transactions

EXTRACTION RULES:
1. Amount signs:
   - Negative (-) for: expenses, purchases, withdrawals, fees, charges
   - Positive (+) for: income, salary, deposits, refunds, interest earned, cashback
2. Skip these transactions entirely:
   - Credit card payments from bank accounts
   - Credit card settlement transactions
   - Balance transfers between own accounts
   - Duplicate entries
3. Category: Match to the provided list. If uncertain or no clear match, use empty string ""
4. Date: Convert all dates to YYYY-MM-DD format. If year is ambiguous, infer from context
5. Description: Use the merchant/payee name or transaction description as-is

AVAILABLE CATEGORIES:
{}

OUTPUT FORMAT:
Return a valid JSON array of transactions. Each transaction must follow this exact structure:
{{
  "description": "string - merchant or transaction description",
  "category": "string - from available categories or empty",
  "amount": float - negative for expenses, positive for income,
  "date": "string - YYYY-MM-DD format"
}}

Return ONLY the JSON array with no additional text or markdown formatting.

DOCUMENT TEXT:
"#,
        known_categories.join(", ")
    )
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("invalid fence regex"))
}

/// Decode the model's reply into transactions. Tolerates a markdown code
/// fence and chatter around the outermost JSON array.
pub fn parse_transactions(content: &str) -> Result<Vec<Transaction>> {
    let trimmed = content.trim();
    let unfenced = fence_re()
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    let json_str = match (unfenced.find('['), unfenced.rfind(']')) {
        (Some(s), Some(e)) if s < e => &unfenced[s..=e],
        _ => {
            return Err(MoniError::ExtractionFailed(format!(
                "No JSON array in response: {}",
                crate::fmt::truncate(unfenced, 200)
            )))
        }
    };

    serde_json::from_str(json_str).map_err(|e| {
        MoniError::ExtractionFailed(format!(
            "Invalid JSON: {e} | Raw: {}",
            crate::fmt::truncate(json_str, 200)
        ))
    })
}
