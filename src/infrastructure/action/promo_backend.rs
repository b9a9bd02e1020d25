//! Promo code allocation against stored batches

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::action::{ActionError, PromoAllocation, PromoCodeBackend, PromoCodeRequest};
use crate::domain::promo::{BatchId, PromoCodeBatch};
use crate::domain::storage::Storage;
use crate::domain::workflow::CodeType;
use crate::domain::DomainError;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const MAX_RANDOM_ATTEMPTS: usize = 16;

/// Issues codes out of [`PromoCodeBatch`]es kept in a [`Storage`].
///
/// Allocation is a read-modify-write of the batch, so it is serialized
/// behind a mutex; concurrent executions never receive the same random or
/// sequential code.
pub struct StoragePromoCodeBackend {
    batches: Arc<dyn Storage<PromoCodeBatch>>,
    allocation_lock: Mutex<()>,
}

impl std::fmt::Debug for StoragePromoCodeBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoragePromoCodeBackend").finish_non_exhaustive()
    }
}

impl StoragePromoCodeBackend {
    pub fn new(batches: Arc<dyn Storage<PromoCodeBatch>>) -> Self {
        Self {
            batches,
            allocation_lock: Mutex::new(()),
        }
    }

    fn random_code(batch: &PromoCodeBatch) -> Result<String, ActionError> {
        let mut rng = rand::thread_rng();

        for _ in 0..MAX_RANDOM_ATTEMPTS {
            let suffix: String = (0..batch.code_length())
                .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
                .collect();
            let code = format!("{}{}", batch.prefix(), suffix);

            if !batch.is_issued(&code) {
                return Ok(code);
            }
        }

        Err(ActionError::external(
            "promo_code",
            format!("could not find an unused code in batch '{}'", batch.id()),
        ))
    }
}

fn store_error(error: DomainError) -> ActionError {
    ActionError::external("promo_code", error.to_string())
}

#[async_trait]
impl PromoCodeBackend for StoragePromoCodeBackend {
    async fn allocate(&self, request: &PromoCodeRequest) -> Result<PromoAllocation, ActionError> {
        let batch_id =
            BatchId::new(&request.batch_id).map_err(|e| ActionError::validation(e.to_string()))?;

        let _guard = self.allocation_lock.lock().await;

        let mut batch = self
            .batches
            .get(&batch_id)
            .await
            .map_err(store_error)?
            .ok_or_else(|| {
                ActionError::validation(format!("promo code batch '{}' does not exist", batch_id))
            })?;

        if let Some(reason) = batch.exhaustion_reason(Utc::now()) {
            return Err(ActionError::external("promo_code", reason));
        }

        // A specific code is shared by every recipient and never consumes the batch
        let (code, consumes_batch) = match request.code_type {
            CodeType::Random => (Self::random_code(&batch)?, true),
            CodeType::Sequential => (batch.next_sequential_code(), true),
            CodeType::Specific => {
                let code = request
                    .specific_code
                    .clone()
                    .ok_or_else(|| ActionError::validation("specificCode is required"))?;
                (code, false)
            }
        };

        let batch = if consumes_batch {
            batch.record_issued(code.clone());
            self.batches.update(batch).await.map_err(store_error)?
        } else {
            batch
        };

        debug!(batch_id = %batch_id, code = %code, "Allocated promo code");

        Ok(PromoAllocation {
            code,
            batch_id: batch.id().to_string(),
            batch_name: batch.name().to_string(),
            discount_type: batch.discount_type().as_str().to_string(),
            discount_value: batch.discount_value(),
            min_order_value: batch.min_order_value(),
        })
    }
}
