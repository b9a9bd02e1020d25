//! Action domain - executor contract, resolved inputs and provider ports

mod error;
mod executor;
mod gateway;
mod input;

pub use error::ActionError;
pub use executor::{ActionExecutor, ActionKind};
pub use gateway::{
    MessageGateway, MessageReceipt, PromoAllocation, PromoCodeBackend, PushDelivery, PushGateway,
};
pub use input::{ActionInput, MessageRequest, PromoCodeRequest, PushRequest, PushTargetRequest};

#[cfg(test)]
pub use executor::MockActionExecutor;
#[cfg(test)]
pub use gateway::{MockMessageGateway, MockPromoCodeBackend, MockPushGateway};
