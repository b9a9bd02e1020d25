//! Domain layer - Core business logic and entities

pub mod action;
pub mod error;
pub mod event;
pub mod execution;
pub mod promo;
pub mod storage;
pub mod workflow;

pub use action::{
    ActionError, ActionExecutor, ActionInput, ActionKind, MessageGateway, MessageReceipt,
    PromoAllocation, PromoCodeBackend, PushDelivery, PushGateway,
};
pub use error::DomainError;
pub use event::UserEvent;
pub use execution::{
    ExecutionId, ExecutionMetrics, ExecutionOutcome, ExecutionStatus, ExecutionStore, NewStep,
    StepPatch, StepStatus, StepType, WorkflowExecution, WorkflowStep,
};
pub use promo::{BatchId, DiscountType, PromoCodeBatch};
pub use storage::{Storage, StorageEntity, StorageKey};
pub use workflow::{
    ActionNode, ConditionEvaluator, DataResolver, Edge, ExecutionContext, NodeKind, Predicate,
    TriggerSpec, Workflow, WorkflowError, WorkflowGraph, WorkflowId,
};
