//! Condition evaluation for branching nodes

use serde::{Deserialize, Serialize};

use super::node_types::ConditionNode;
use super::predicate::{Predicate, PredicateError};
use super::resolver::DataResolver;

/// Result of evaluating one branch predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchEvaluation {
    pub label: String,
    pub predicate: String,
    pub matched: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a condition node; recorded as the step output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionOutcome {
    /// Label of the edge to follow
    pub selected_branch: String,

    /// Index of the matching branch, `None` when the else branch was taken
    pub matched_index: Option<usize>,

    pub evaluations: Vec<BranchEvaluation>,
}

impl ConditionOutcome {
    pub fn is_else(&self) -> bool {
        self.matched_index.is_none()
    }

    /// Errors raised by predicates that were treated as false
    pub fn errors(&self) -> Vec<&str> {
        self.evaluations
            .iter()
            .filter_map(|e| e.error.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone)]
struct CompiledBranch {
    label: String,
    source: String,
    predicate: Result<Predicate, PredicateError>,
}

/// A condition node with its predicates compiled once.
///
/// Branches are tried in declared order and the first truthy one wins. A
/// predicate that fails to compile or evaluate counts as false for that
/// branch only.
#[derive(Debug, Clone)]
pub struct ConditionEvaluator {
    branches: Vec<CompiledBranch>,
    else_label: String,
}

impl ConditionEvaluator {
    pub fn compile(node: &ConditionNode) -> Self {
        let branches = node
            .branches
            .iter()
            .map(|branch| CompiledBranch {
                label: branch.label.clone(),
                source: branch.predicate.clone(),
                predicate: Predicate::compile(&branch.predicate),
            })
            .collect();

        Self {
            branches,
            else_label: node.else_label.clone(),
        }
    }

    /// Compilation errors, as `(label, error)` pairs
    pub fn compile_errors(&self) -> Vec<(&str, &PredicateError)> {
        self.branches
            .iter()
            .filter_map(|b| b.predicate.as_ref().err().map(|e| (b.label.as_str(), e)))
            .collect()
    }

    pub fn evaluate(&self, resolver: &DataResolver<'_>) -> ConditionOutcome {
        let mut evaluations = Vec::with_capacity(self.branches.len());
        let mut matched_index = None;

        for (index, branch) in self.branches.iter().enumerate() {
            let result = branch
                .predicate
                .as_ref()
                .map_err(Clone::clone)
                .and_then(|predicate| predicate.evaluate(resolver));

            let (matched, error) = match result {
                Ok(matched) => (matched, None),
                Err(e) => (false, Some(e.to_string())),
            };

            evaluations.push(BranchEvaluation {
                label: branch.label.clone(),
                predicate: branch.source.clone(),
                matched,
                error,
            });

            if matched {
                matched_index = Some(index);
                break;
            }
        }

        let selected_branch = matched_index
            .map(|i| self.branches[i].label.clone())
            .unwrap_or_else(|| self.else_label.clone());

        ConditionOutcome {
            selected_branch,
            matched_index,
            evaluations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::context::ExecutionContext;
    use crate::domain::workflow::node_types::ConditionBranch;
    use serde_json::json;

    fn high_value_node() -> ConditionNode {
        ConditionNode::new(vec![ConditionBranch::new("event.value > 100", "if")])
    }

    fn run(node: &ConditionNode, event: serde_json::Value) -> ConditionOutcome {
        let ctx = ExecutionContext::new(event);
        let resolver = DataResolver::new(&ctx);
        ConditionEvaluator::compile(node).evaluate(&resolver)
    }

    #[test]
    fn test_if_branch_selected_for_high_value() {
        let outcome = run(&high_value_node(), json!({"value": 150}));

        assert_eq!(outcome.selected_branch, "if");
        assert_eq!(outcome.matched_index, Some(0));
        assert!(!outcome.is_else());
    }

    #[test]
    fn test_else_branch_selected_for_low_value() {
        let outcome = run(&high_value_node(), json!({"value": 50}));

        assert_eq!(outcome.selected_branch, "else");
        assert!(outcome.is_else());
        assert_eq!(outcome.evaluations.len(), 1);
        assert!(!outcome.evaluations[0].matched);
    }

    #[test]
    fn test_first_matching_branch_wins() {
        let node = ConditionNode::new(vec![
            ConditionBranch::new("event.value > 10", "small"),
            ConditionBranch::new("event.value > 100", "large"),
        ]);
        let outcome = run(&node, json!({"value": 150}));

        assert_eq!(outcome.selected_branch, "small");
        // later branches are not evaluated once one matched
        assert_eq!(outcome.evaluations.len(), 1);
    }

    #[test]
    fn test_failing_predicate_counts_as_false() {
        let node = ConditionNode::new(vec![
            ConditionBranch::new("event.missing > 100", "broken"),
            ConditionBranch::new("event.value ==", "unparseable"),
            ConditionBranch::new("event.value == 5", "five"),
        ])
        .with_else_label("fallback");
        let outcome = run(&node, json!({"value": 5}));

        assert_eq!(outcome.selected_branch, "five");
        assert_eq!(outcome.errors().len(), 2);
        assert!(outcome.evaluations[0].error.as_deref().unwrap().contains("Evaluation error"));
        assert!(outcome.evaluations[1].error.as_deref().unwrap().contains("Parse error"));
    }

    #[test]
    fn test_custom_else_label() {
        let node = high_value_node().with_else_label("low");
        let outcome = run(&node, json!({}));

        assert_eq!(outcome.selected_branch, "low");
        assert_eq!(outcome.errors().len(), 1);
    }

    #[test]
    fn test_compile_errors_reported() {
        let node = ConditionNode::new(vec![
            ConditionBranch::new("event.value > 1", "ok"),
            ConditionBranch::new("user.age > 1", "bad"),
        ]);
        let evaluator = ConditionEvaluator::compile(&node);
        let errors = evaluator.compile_errors();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, "bad");
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = run(&high_value_node(), json!({"value": 150}));
        let value = serde_json::to_value(&outcome).unwrap();

        assert_eq!(value["selectedBranch"], json!("if"));
        assert_eq!(value["matchedIndex"], json!(0));
    }
}
