//! Token usage ledger and cost estimation
//!
//! Append-only JSONL ledger of per-call token usage plus a static
//! pricing table. Everything here is deterministic: pricing lookup,
//! micro-dollar rounding, daily aggregation. No judge calls.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A single token usage event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// ISO 8601 UTC timestamp, e.g. "2026-02-04T14:30:00Z".
    pub timestamp: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    /// Command that generated this usage, e.g. "judge" or "route".
    pub command: String,
    #[serde(default)]
    pub pr: Option<u64>,
    #[serde(default)]
    pub issue: Option<u64>,
    #[serde(default)]
    pub session_id: Option<String>,
}

impl UsageRecord {
    /// Record stamped with the current UTC time.
    pub fn new(model: &str, input_tokens: u64, output_tokens: u64, command: &str) -> Self {
        Self {
            timestamp: Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            model: model.to_string(),
            input_tokens,
            output_tokens,
            command: command.to_string(),
            pr: None,
            issue: None,
            session_id: None,
        }
    }

    pub fn with_pr(mut self, pr: u64) -> Self {
        self.pr = Some(pr);
        self
    }

    pub fn with_issue(mut self, issue: u64) -> Self {
        self.issue = Some(issue);
        self
    }

    pub fn with_session(mut self, session_id: &str) -> Self {
        self.session_id = Some(session_id.to_string());
        self
    }
}

/// Price per million tokens in USD.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

/// Fallback pricing for models missing from the table (mid-tier rates).
pub const DEFAULT_PRICING: ModelPricing = ModelPricing { input: 3.00, output: 15.00 };

pub const MODEL_PRICING: &[(&str, ModelPricing)] = &[
    // Anthropic
    ("claude-opus-4-20250514", ModelPricing { input: 15.00, output: 75.00 }),
    ("claude-opus-4-5-20251101", ModelPricing { input: 15.00, output: 75.00 }),
    ("claude-sonnet-4-20250514", ModelPricing { input: 3.00, output: 15.00 }),
    ("claude-haiku-3-5-20241022", ModelPricing { input: 0.80, output: 4.00 }),
    // OpenAI
    ("gpt-4o", ModelPricing { input: 2.50, output: 10.00 }),
    ("gpt-4o-mini", ModelPricing { input: 0.15, output: 0.60 }),
    // Google
    ("gemini-2.0-flash", ModelPricing { input: 0.10, output: 0.40 }),
    ("gemini-2.5-pro", ModelPricing { input: 1.25, output: 10.00 }),
];

/// Pricing for a model, falling back to [`DEFAULT_PRICING`].
pub fn pricing_for(model: &str) -> ModelPricing {
    MODEL_PRICING
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, pricing)| *pricing)
        .unwrap_or(DEFAULT_PRICING)
}

/// Estimated cost in USD for one usage event, rounded to micro-dollars.
pub fn estimate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
    let pricing = pricing_for(model);
    let input_cost = input_tokens as f64 / 1_000_000.0 * pricing.input;
    let output_cost = output_tokens as f64 / 1_000_000.0 * pricing.output;
    round6(input_cost + output_cost)
}

pub fn estimate_record_cost(record: &UsageRecord) -> f64 {
    estimate_cost(&record.model, record.input_tokens, record.output_tokens)
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Filters for reading the ledger. Every supplied filter must match.
#[derive(Debug, Clone, Default)]
pub struct UsageFilter {
    pub pr: Option<u64>,
    pub issue: Option<u64>,
    /// Inclusive lower timestamp bound; a date-only value covers the whole day.
    pub since: Option<String>,
    /// Inclusive upper timestamp bound; a date-only value covers the whole day.
    pub until: Option<String>,
    pub command: Option<String>,
}

/// Append-only JSONL store for usage records.
///
/// Default location is `~/.tribunal/usage.jsonl`, overridable with the
/// `TRIBUNAL_USAGE_FILE` environment variable.
#[derive(Debug, Clone)]
pub struct UsageStore {
    path: PathBuf,
}

impl UsageStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the default location, honoring `TRIBUNAL_USAGE_FILE`.
    pub fn default_location() -> Result<Self> {
        if let Ok(path) = std::env::var("TRIBUNAL_USAGE_FILE") {
            return Ok(Self::new(path));
        }
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(Self::new(home.join(".tribunal").join("usage.jsonl")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a JSON line, creating parent directories.
    pub fn append(&self, record: &UsageRecord) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating ledger directory {:?}", parent))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening ledger {:?}", self.path))?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        Ok(())
    }

    /// Read every record. A missing file is an empty ledger, not an error.
    pub fn read_all(&self) -> Result<Vec<UsageRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path).with_context(|| format!("opening ledger {:?}", self.path))?;
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            records.push(serde_json::from_str(line)?);
        }
        Ok(records)
    }

    /// Read records matching all supplied filters.
    pub fn read_filtered(&self, filter: &UsageFilter) -> Result<Vec<UsageRecord>> {
        let mut records = self.read_all()?;

        if let Some(pr) = filter.pr {
            records.retain(|r| r.pr == Some(pr));
        }
        if let Some(issue) = filter.issue {
            records.retain(|r| r.issue == Some(issue));
        }
        if let Some(since) = &filter.since {
            let cutoff = expand_day_start(since);
            records.retain(|r| r.timestamp >= cutoff);
        }
        if let Some(until) = &filter.until {
            let cutoff = expand_day_end(until);
            records.retain(|r| r.timestamp <= cutoff);
        }
        if let Some(command) = &filter.command {
            records.retain(|r| &r.command == command);
        }

        Ok(records)
    }
}

fn expand_day_start(value: &str) -> String {
    if value.len() == 10 {
        format!("{}T00:00:00Z", value)
    } else {
        value.to_string()
    }
}

fn expand_day_end(value: &str) -> String {
    if value.len() == 10 {
        format!("{}T23:59:59Z", value)
    } else {
        value.to_string()
    }
}

/// Aggregated usage for one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySummary {
    /// Date in YYYY-MM-DD form.
    pub date: String,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub estimated_cost_usd: f64,
    pub record_count: usize,
    /// Unique models used that day, sorted.
    pub models: Vec<String>,
    /// Unique commands invoked that day, sorted.
    pub commands: Vec<String>,
}

/// Aggregate records into per-day summaries, oldest day first.
pub fn summarize_by_day(records: &[UsageRecord]) -> Vec<DailySummary> {
    let mut by_day: BTreeMap<String, Vec<&UsageRecord>> = BTreeMap::new();
    for record in records {
        let day: String = record.timestamp.chars().take(10).collect();
        by_day.entry(day).or_default().push(record);
    }

    by_day
        .into_iter()
        .map(|(date, day_records)| {
            let total_cost: f64 = day_records.iter().map(|r| estimate_record_cost(r)).sum();

            let mut models: Vec<String> = day_records.iter().map(|r| r.model.clone()).collect();
            models.sort();
            models.dedup();
            let mut commands: Vec<String> = day_records.iter().map(|r| r.command.clone()).collect();
            commands.sort();
            commands.dedup();

            DailySummary {
                date,
                total_input_tokens: day_records.iter().map(|r| r.input_tokens).sum(),
                total_output_tokens: day_records.iter().map(|r| r.output_tokens).sum(),
                estimated_cost_usd: round6(total_cost),
                record_count: day_records.len(),
                models,
                commands,
            }
        })
        .collect()
}
