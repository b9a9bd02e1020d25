//! Workflow domain - definitions, data resolution and branching

mod condition;
mod context;
mod entity;
mod error;
mod graph;
mod node_types;
mod predicate;
mod resolver;
mod trigger;

pub use condition::{BranchEvaluation, ConditionEvaluator, ConditionOutcome};
pub use context::{EVENT_VARIABLE, ExecutionContext, ExecutionHistory};
pub use entity::{ActionNode, Edge, Workflow, WorkflowId, validate_workflow_id};
pub use error::WorkflowError;
pub use graph::{NodeIndex, WorkflowGraph};
pub use node_types::{
    CodeType, ConditionBranch, ConditionNode, MessageNode, MessageProvider, NodeKind,
    PromoCodeNode, PushNotificationNode, PushTarget,
};
pub use predicate::{ConditionOperator, Predicate, PredicateError, is_truthy};
pub use resolver::{DataResolver, DataSource, get_nested_field, value_to_string};
pub use trigger::{EventFilter, TriggerSpec};
