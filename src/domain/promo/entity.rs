//! Promo code batch entity

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;
use crate::domain::storage::{StorageEntity, StorageKey};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BatchId(String);

impl BatchId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::invalid_id("Batch ID cannot be empty"));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for BatchId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    FixedAmount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::FixedAmount => "fixed_amount",
        }
    }
}

fn default_code_length() -> usize {
    8
}

/// A pool of promo codes sharing one discount
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromoCodeBatch {
    id: BatchId,
    name: String,
    discount_type: DiscountType,
    discount_value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min_order_value: Option<f64>,
    #[serde(default)]
    prefix: String,
    #[serde(default = "default_code_length")]
    code_length: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_codes: Option<u64>,
    #[serde(default)]
    issued_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

impl PromoCodeBatch {
    pub fn new(
        id: BatchId,
        name: impl Into<String>,
        discount_type: DiscountType,
        discount_value: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            discount_type,
            discount_value,
            min_order_value: None,
            prefix: String::new(),
            code_length: default_code_length(),
            max_codes: None,
            issued_codes: Vec::new(),
            expires_at: None,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_min_order_value(mut self, value: f64) -> Self {
        self.min_order_value = Some(value);
        self
    }

    pub fn with_max_codes(mut self, max: u64) -> Self {
        self.max_codes = Some(max);
        self
    }

    pub fn with_code_length(mut self, length: usize) -> Self {
        self.code_length = length;
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn id(&self) -> &BatchId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn discount_type(&self) -> DiscountType {
        self.discount_type
    }

    pub fn discount_value(&self) -> f64 {
        self.discount_value
    }

    pub fn min_order_value(&self) -> Option<f64> {
        self.min_order_value
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn code_length(&self) -> usize {
        self.code_length
    }

    pub fn issued_codes(&self) -> &[String] {
        &self.issued_codes
    }

    pub fn issued_count(&self) -> u64 {
        self.issued_codes.len() as u64
    }

    pub fn is_issued(&self, code: &str) -> bool {
        self.issued_codes.iter().any(|c| c.eq_ignore_ascii_case(code))
    }

    /// Why no further code can be issued, if that is the case
    pub fn exhaustion_reason(&self, now: DateTime<Utc>) -> Option<String> {
        if self.expires_at.is_some_and(|at| at <= now) {
            return Some(format!("batch '{}' has expired", self.id));
        }
        if self.max_codes.is_some_and(|max| self.issued_count() >= max) {
            return Some(format!("batch '{}' has no codes left", self.id));
        }
        None
    }

    /// Next code of the sequential scheme: prefix plus zero-padded counter
    pub fn next_sequential_code(&self) -> String {
        format!(
            "{}{:0width$}",
            self.prefix,
            self.issued_count() + 1,
            width = self.code_length
        )
    }

    pub fn record_issued(&mut self, code: impl Into<String>) {
        self.issued_codes.push(code.into());
    }
}

impl StorageEntity for PromoCodeBatch {
    type Key = BatchId;

    fn key(&self) -> &Self::Key {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn batch() -> PromoCodeBatch {
        PromoCodeBatch::new(
            BatchId::new("summer").unwrap(),
            "Summer Sale",
            DiscountType::Percentage,
            15.0,
        )
        .with_prefix("SUM-")
        .with_code_length(4)
    }

    #[test]
    fn test_sequential_codes() {
        let mut batch = batch();
        assert_eq!(batch.next_sequential_code(), "SUM-0001");
        batch.record_issued("SUM-0001");
        assert_eq!(batch.next_sequential_code(), "SUM-0002");
        assert!(batch.is_issued("sum-0001"));
    }

    #[test]
    fn test_exhaustion() {
        let now = Utc::now();
        let mut batch = batch().with_max_codes(1);
        assert!(batch.exhaustion_reason(now).is_none());

        batch.record_issued("SUM-0001");
        assert!(batch.exhaustion_reason(now).unwrap().contains("no codes left"));

        let expired = self::batch().with_expiry(now - Duration::minutes(1));
        assert!(expired.exhaustion_reason(now).unwrap().contains("expired"));
    }

    #[test]
    fn test_empty_batch_id_rejected() {
        assert!(BatchId::new("  ").is_err());
    }
}
