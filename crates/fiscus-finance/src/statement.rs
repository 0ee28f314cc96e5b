//! Bank statement extraction.
//!
//! The model is asked to OCR the document into a strict JSON array of
//! transactions; any shape mismatch fails closed to per-bank regex
//! extraction over the raw text. Extracted rows are then categorized.

use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use fiscus_core::{
    error::FiscusError,
    prompt::Prompt,
    traits::Responder,
    types::{Transaction, TransactionKind},
};
use regex::Regex;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::LazyLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::categorize::Categorizer;
use crate::llm_json::strip_code_fences;

/// Known statement layouts, in detection order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BankFormat {
    Chase,
    BankOfAmerica,
    WellsFargo,
    GenericCsv,
}

impl BankFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Chase => "Chase",
            Self::BankOfAmerica => "Bank of America",
            Self::WellsFargo => "Wells Fargo",
            Self::GenericCsv => "Generic CSV",
        }
    }

    /// All supported formats, in detection order.
    pub const ALL: [BankFormat; 4] = [
        Self::Chase,
        Self::BankOfAmerica,
        Self::WellsFargo,
        Self::GenericCsv,
    ];
}

/// Result of importing one statement file.
#[derive(Debug)]
pub struct StatementImport {
    pub transactions: Vec<Transaction>,
    pub bank_name: String,
    pub format: String,
    pub confidence: f64,
}

/// A transaction row before dating and categorization.
#[derive(Debug, Clone, Deserialize, PartialEq)]
struct ParsedRow {
    date: String,
    description: String,
    amount: f64,
    #[serde(rename = "type")]
    kind: ModelKind,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
enum ModelKind {
    Income,
    Expense,
}

impl From<ModelKind> for TransactionKind {
    fn from(k: ModelKind) -> Self {
        match k {
            ModelKind::Income => TransactionKind::Income,
            ModelKind::Expense => TransactionKind::Expense,
        }
    }
}

static CHASE_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)chase|jpmorgan").unwrap());
static BOFA_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)bank of america|boa").unwrap());
static WELLS_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)wells fargo").unwrap());
static CSV_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date.*description.*amount").unwrap());

/// Line with a full date: `MM/DD/YYYY  DESC  -$1,234.56`.
static FULL_DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}/\d{1,2}/\d{2,4})\s+(.+?)\s+(-?\$?[\d,]+\.\d{2})").unwrap()
});

/// Line with a short date: `MM/DD  DESC  -$1,234.56`.
static SHORT_DATE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}/\d{1,2})\s+(.+?)\s+(-?\$?[\d,]+\.\d{2})").unwrap()
});

/// `Bank: <name>` line the OCR prompt asks the model to emit.
static BANK_LINE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)Bank:\s*(.+)").unwrap());

/// Detect the statement layout; unknown text is treated as CSV.
pub fn detect_format(text: &str) -> BankFormat {
    if CHASE_MARKER.is_match(text) {
        BankFormat::Chase
    } else if BOFA_MARKER.is_match(text) {
        BankFormat::BankOfAmerica
    } else if WELLS_MARKER.is_match(text) {
        BankFormat::WellsFargo
    } else if CSV_MARKER.is_match(text) {
        BankFormat::GenericCsv
    } else {
        BankFormat::GenericCsv
    }
}

fn parse_amount(raw: &str) -> Option<(f64, TransactionKind)> {
    let cleaned: String = raw.chars().filter(|c| *c != '$' && *c != ',').collect();
    let value: f64 = cleaned.parse().ok()?;
    let kind = if value < 0.0 {
        TransactionKind::Expense
    } else {
        TransactionKind::Income
    };
    Some((value.abs(), kind))
}

fn extract_lines(text: &str, pattern: &Regex, append_year: bool) -> Vec<ParsedRow> {
    let current_year = Utc::now().year();
    text.lines()
        .filter_map(|line| {
            let caps = pattern.captures(line)?;
            let (amount, kind) = parse_amount(&caps[3])?;
            let date = if append_year {
                format!("{}/{current_year}", &caps[1])
            } else {
                caps[1].to_string()
            };
            Some(ParsedRow {
                date,
                description: caps[2].trim().to_string(),
                amount,
                kind: match kind {
                    TransactionKind::Income => ModelKind::Income,
                    TransactionKind::Expense => ModelKind::Expense,
                },
            })
        })
        .collect()
}

fn extract_csv(text: &str) -> Vec<ParsedRow> {
    text.lines()
        .skip(1)
        .filter_map(|line| {
            let parts: Vec<&str> = line.split([',', '\t']).collect();
            if parts.len() < 3 {
                return None;
            }
            let date = parts[0].trim();
            let description = parts[1].trim();
            let (amount, kind) = parse_amount(parts[2].trim())?;
            if date.is_empty() || description.is_empty() {
                return None;
            }
            Some(ParsedRow {
                date: date.to_string(),
                description: description.to_string(),
                amount,
                kind: match kind {
                    TransactionKind::Income => ModelKind::Income,
                    TransactionKind::Expense => ModelKind::Expense,
                },
            })
        })
        .collect()
}

/// Run the per-format regex extractor over raw statement text.
fn extract_with_format(text: &str, format: BankFormat) -> Vec<ParsedRow> {
    match format {
        BankFormat::Chase | BankFormat::WellsFargo => {
            extract_lines(text, &FULL_DATE_LINE, false)
        }
        BankFormat::BankOfAmerica => extract_lines(text, &SHORT_DATE_LINE, true),
        BankFormat::GenericCsv => extract_csv(text),
    }
}

/// Parse a statement date. Accepts `MM/DD/YYYY`, `MM/DD/YY`,
/// `YYYY-MM-DD`, and `MM/DD` (completed with the current year).
/// Unparseable dates resolve to now.
fn parse_date(raw: &str) -> DateTime<Utc> {
    let raw = raw.trim();

    let date = NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%y"))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .or_else(|_| {
            NaiveDate::parse_from_str(&format!("{raw}/{}", Utc::now().year()), "%m/%d/%Y")
        });

    match date.ok().and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(dt) => Utc.from_utc_datetime(&dt),
        None => Utc::now(),
    }
}

const OCR_SYSTEM_PROMPT: &str = "You are a bank statement OCR expert. Extract all transaction data from this document.\n\n\
For each transaction, extract:\n\
- Date (format: MM/DD/YYYY)\n\
- Description (merchant/payee name)\n\
- Amount (positive number)\n\
- Type (income or expense)\n\n\
Return JSON array in this format:\n\
[\n  {\n    \"date\": \"01/15/2024\",\n    \"description\": \"Grocery Store\",\n    \"amount\": 125.50,\n    \"type\": \"expense\"\n  }\n]\n\n\
If you can identify the bank name, include it as the first line before the JSON array.\n\
Example:\nBank: Chase\n[...]";

/// How much of the base64 payload is sent to the model.
const BASE64_PREVIEW_LEN: usize = 1000;

/// Statement reader: AI extraction with regex fallback, then
/// categorization of every row.
pub struct StatementReader {
    responder: Arc<dyn Responder>,
    categorizer: Categorizer,
}

impl StatementReader {
    pub fn new(responder: Arc<dyn Responder>) -> Self {
        Self {
            categorizer: Categorizer::new(responder.clone()),
            responder,
        }
    }

    /// Import a statement file. `content` is the raw file bytes;
    /// supported mime types are PDF, images, and text/CSV.
    pub async fn import(
        &self,
        content: &[u8],
        mime_type: &str,
    ) -> Result<StatementImport, FiscusError> {
        if mime_type != "application/pdf"
            && !mime_type.starts_with("image/")
            && !mime_type.starts_with("text/")
        {
            return Err(FiscusError::Statement(format!(
                "unsupported file type: {mime_type}"
            )));
        }

        let extracted = self.extract_text(content, mime_type).await?;

        let mut bank_name = "Unknown Bank".to_string();
        let mut text = extracted.clone();
        if let Some(caps) = BANK_LINE.captures(&extracted) {
            bank_name = caps[1].trim().to_string();
            text = text.replacen(&caps[0], "", 1);
        }

        // Strict JSON parse of the model output; regex fallback on any
        // shape mismatch.
        let format = detect_format(&text);
        let rows = match serde_json::from_str::<Vec<ParsedRow>>(strip_code_fences(&text)) {
            Ok(rows) => rows,
            Err(_) => {
                warn!("statement: model output not a JSON array, using {} regex", format.name());
                if bank_name == "Unknown Bank" {
                    bank_name = format.name().to_string();
                }
                extract_with_format(&text, format)
            }
        };

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: TransactionKind = row.kind.into();
            let category = self
                .categorizer
                .categorize(&row.description, row.amount, kind)
                .await;
            transactions.push(Transaction {
                id: Uuid::new_v4(),
                date: parse_date(&row.date),
                description: row.description,
                amount: row.amount,
                kind,
                category: category.category,
                category_confidence: Some(category.confidence),
                subcategory: category.subcategory,
                bank_name: Some(bank_name.clone()),
            });
        }

        let confidence = if transactions.is_empty() { 0.3 } else { 0.85 };
        info!(
            "statement: imported {} transactions from {bank_name}",
            transactions.len()
        );

        Ok(StatementImport {
            transactions,
            bank_name,
            format: format.name().to_string(),
            confidence,
        })
    }

    /// Ask the model to OCR the document. Text files skip the model
    /// and are parsed directly.
    async fn extract_text(&self, content: &[u8], mime_type: &str) -> Result<String, FiscusError> {
        if mime_type.starts_with("text/") {
            return String::from_utf8(content.to_vec())
                .map_err(|e| FiscusError::Statement(format!("statement not utf-8: {e}")));
        }

        use base64::Engine as _;
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let preview: String = encoded.chars().take(BASE64_PREVIEW_LEN).collect();

        let prompt = Prompt::new(format!(
            "Extract transactions from this bank statement ({mime_type}, base64): {preview}..."
        ))
        .with_system(OCR_SYSTEM_PROMPT);

        let reply = self
            .responder
            .generate(&prompt)
            .await
            .map_err(|e| FiscusError::Statement(format!("OCR failed: {e}")))?;
        Ok(reply.text)
    }
}
