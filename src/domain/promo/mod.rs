//! Promo code batches

mod entity;

pub use entity::{BatchId, DiscountType, PromoCodeBatch};
