//! Trigger matching over the stored workflow definitions

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::domain::workflow::{Workflow, WorkflowError};
use crate::domain::Storage;

/// Selects the active workflows an event should start
#[derive(Debug, Clone)]
pub struct TriggerMatcher {
    workflows: Arc<dyn Storage<Workflow>>,
}

impl TriggerMatcher {
    pub fn new(workflows: Arc<dyn Storage<Workflow>>) -> Self {
        Self { workflows }
    }

    /// Active workflows whose trigger accepts `event`, in storage order.
    ///
    /// Workflows without a trigger node never match. No match is not an
    /// error.
    pub async fn find_matching(&self, event: &Value) -> Result<Vec<Workflow>, WorkflowError> {
        let workflows = self.workflows.list().await?;
        let total = workflows.len();

        let matched: Vec<Workflow> = workflows
            .into_iter()
            .filter(|wf| wf.is_active())
            .filter(|wf| wf.trigger_node().is_some())
            .filter(|wf| wf.trigger().matches(event))
            .collect();

        debug!(
            candidates = total,
            matched = matched.len(),
            "Matched event against workflow triggers"
        );

        Ok(matched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{ActionNode, EventFilter, TriggerSpec, WorkflowId};
    use crate::infrastructure::storage::InMemoryStorage;
    use serde_json::json;

    fn workflow(id: &str, trigger: TriggerSpec) -> Workflow {
        Workflow::new(WorkflowId::new(id).unwrap(), id, trigger)
            .with_node(ActionNode::trigger("start"))
    }

    fn matcher(workflows: Vec<Workflow>) -> TriggerMatcher {
        TriggerMatcher::new(Arc::new(InMemoryStorage::with_entities(workflows)))
    }

    fn ids(workflows: &[Workflow]) -> Vec<&str> {
        workflows.iter().map(|wf| wf.id().as_str()).collect()
    }

    #[tokio::test]
    async fn test_matches_by_category_and_filters() {
        let matcher = matcher(vec![
            workflow("any-cart", TriggerSpec::new("ecommerce")),
            workflow(
                "shoes-only",
                TriggerSpec::new("ecommerce")
                    .with_filter(EventFilter::equals("itemCategory", json!("shoes"))),
            ),
            workflow("nav", TriggerSpec::new("navigation")),
        ]);

        let event = json!({"name": "add_to_cart", "category": "ecommerce", "itemCategory": "bags"});
        let matched = matcher.find_matching(&event).await.unwrap();

        assert_eq!(ids(&matched), vec!["any-cart"]);
    }

    #[tokio::test]
    async fn test_inactive_and_triggerless_workflows_skipped() {
        let triggerless = Workflow::new(
            WorkflowId::new("no-trigger").unwrap(),
            "No trigger",
            TriggerSpec::new("ecommerce"),
        );
        let matcher = matcher(vec![
            workflow("paused", TriggerSpec::new("ecommerce")).with_active(false),
            triggerless,
            workflow("live", TriggerSpec::new("ecommerce")),
        ]);

        let event = json!({"name": "purchase", "category": "ecommerce"});
        let matched = matcher.find_matching(&event).await.unwrap();

        assert_eq!(ids(&matched), vec!["live"]);
    }

    #[tokio::test]
    async fn test_no_match_is_empty() {
        let matcher = matcher(vec![workflow("nav", TriggerSpec::new("navigation"))]);

        let event = json!({"name": "purchase", "category": "ecommerce"});
        assert!(matcher.find_matching(&event).await.unwrap().is_empty());
    }
}
