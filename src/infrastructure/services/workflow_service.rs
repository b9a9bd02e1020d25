//! Workflow service - CRUD and graph validation for workflow definitions

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::storage::{Storage, require};
use crate::domain::workflow::{
    ActionNode, ConditionEvaluator, Edge, NodeKind, TriggerSpec, Workflow, WorkflowError,
    WorkflowGraph, WorkflowId,
};
use crate::domain::DomainError;

/// Request to create a new workflow
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowRequest {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub nodes: Vec<ActionNode>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub organization_id: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_active() -> bool {
    true
}

impl CreateWorkflowRequest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, trigger: TriggerSpec) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            trigger,
            nodes: Vec::new(),
            edges: Vec::new(),
            is_active: true,
            organization_id: None,
            owner_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_node(mut self, node: ActionNode) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = active;
        self
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }
}

/// Request to update an existing workflow.
///
/// Replacing `nodes` or `edges` replaces the whole graph; the side that was
/// not given is kept.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub trigger: Option<TriggerSpec>,
    #[serde(default)]
    pub nodes: Option<Vec<ActionNode>>,
    #[serde(default)]
    pub edges: Option<Vec<Edge>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateWorkflowRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_trigger(mut self, trigger: TriggerSpec) -> Self {
        self.trigger = Some(trigger);
        self
    }

    pub fn with_graph(mut self, nodes: Vec<ActionNode>, edges: Vec<Edge>) -> Self {
        self.nodes = Some(nodes);
        self.edges = Some(edges);
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.is_active = Some(active);
        self
    }
}

/// Non-fatal findings about a valid workflow graph
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Check a workflow graph.
///
/// Structural problems are errors. Cycles and nodes the trigger cannot
/// reach are tolerated at run time and come back as warnings.
pub fn validate_definition(workflow: &Workflow) -> Result<ValidationReport, WorkflowError> {
    let nodes = workflow.nodes();

    let mut ids = HashSet::new();
    for node in nodes {
        if node.id().trim().is_empty() {
            return Err(WorkflowError::validation("Node id cannot be empty"));
        }
        if !ids.insert(node.id()) {
            return Err(WorkflowError::validation(format!(
                "Duplicate node id: '{}'",
                node.id()
            )));
        }
    }

    match nodes.iter().filter(|n| n.is_trigger()).count() {
        0 => return Err(WorkflowError::missing_trigger(workflow.id().as_str())),
        1 => {}
        n => {
            return Err(WorkflowError::validation(format!(
                "Workflow must have exactly one trigger node, found {}",
                n
            )));
        }
    }

    for edge in workflow.edges() {
        for endpoint in [&edge.source, &edge.target] {
            if !ids.contains(endpoint.as_str()) {
                return Err(WorkflowError::validation(format!(
                    "Edge {} -> {} references unknown node '{}'",
                    edge.source, edge.target, endpoint
                )));
            }
        }
    }

    let mut warnings = Vec::new();
    for node in nodes {
        let outgoing: Vec<&Edge> = workflow
            .edges()
            .iter()
            .filter(|e| e.source == node.id())
            .collect();

        match node.kind() {
            NodeKind::Condition(condition) => {
                if condition.branches.is_empty() {
                    return Err(WorkflowError::validation(format!(
                        "Condition node '{}' needs at least one branch",
                        node.id()
                    )));
                }

                let mut labels = HashSet::new();
                for branch in &condition.branches {
                    if !labels.insert(branch.label.as_str()) || branch.label == condition.else_label
                    {
                        return Err(WorkflowError::validation(format!(
                            "Condition node '{}' has duplicate branch label '{}'",
                            node.id(),
                            branch.label
                        )));
                    }
                }

                if let Some((label, error)) = ConditionEvaluator::compile(condition)
                    .compile_errors()
                    .first()
                {
                    return Err(WorkflowError::invalid_predicate(
                        node.id(),
                        format!("branch '{}': {}", label, error),
                    ));
                }

                labels.insert(condition.else_label.as_str());
                for edge in outgoing {
                    match edge.branch_label.as_deref() {
                        Some(label) if labels.contains(label) => {}
                        Some(label) => warnings.push(format!(
                            "Edge {} -> {} carries unknown branch label '{}'",
                            edge.source, edge.target, label
                        )),
                        None => warnings.push(format!(
                            "Edge {} -> {} leaves a condition without a branch label and is never followed",
                            edge.source, edge.target
                        )),
                    }
                }
            }
            _ if outgoing.len() > 1 => {
                return Err(WorkflowError::validation(format!(
                    "Node '{}' has {} outgoing edges; only condition nodes may branch",
                    node.id(),
                    outgoing.len()
                )));
            }
            _ => {}
        }
    }

    let graph = WorkflowGraph::new(workflow);
    if graph.has_cycle() {
        warnings.push("Graph contains a cycle; traversal stops at the first revisited node".into());
    }
    for index in graph.unreachable() {
        warnings.push(format!(
            "Node '{}' is not reachable from the trigger and runs after the connected sequence",
            graph.node(index).id()
        ));
    }

    Ok(ValidationReport { warnings })
}

/// Workflow service for CRUD operations
pub struct WorkflowService {
    storage: Arc<dyn Storage<Workflow>>,
}

impl std::fmt::Debug for WorkflowService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowService").finish()
    }
}

impl WorkflowService {
    pub fn new(storage: Arc<dyn Storage<Workflow>>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<dyn Storage<Workflow>> {
        &self.storage
    }

    pub async fn get(&self, id: &str) -> Result<Option<Workflow>, DomainError> {
        let workflow_id = self.parse_id(id)?;
        self.storage.get(&workflow_id).await
    }

    pub async fn list(&self) -> Result<Vec<Workflow>, DomainError> {
        self.storage.list().await
    }

    pub async fn list_active(&self) -> Result<Vec<Workflow>, DomainError> {
        let workflows = self.storage.list().await?;
        Ok(workflows.into_iter().filter(|w| w.is_active()).collect())
    }

    /// Create a workflow after validating its graph
    pub async fn create(&self, request: CreateWorkflowRequest) -> Result<Workflow, DomainError> {
        let workflow_id = self.parse_id(&request.id)?;

        if self.storage.exists(&workflow_id).await? {
            return Err(DomainError::conflict(format!(
                "Workflow '{}' already exists",
                request.id
            )));
        }

        let mut workflow = Workflow::new(workflow_id, request.name, request.trigger)
            .with_active(request.is_active);
        workflow.set_description(request.description);
        workflow.set_graph(request.nodes, request.edges);
        if let Some(organization_id) = request.organization_id {
            workflow = workflow.with_organization(organization_id);
        }
        if let Some(owner_id) = request.owner_id {
            workflow = workflow.with_owner(owner_id);
        }

        self.check(&workflow)?;
        let workflow = self.storage.create(workflow).await?;
        info!(workflow_id = %workflow.id(), "Workflow created");
        Ok(workflow)
    }

    pub async fn update(
        &self,
        id: &str,
        request: UpdateWorkflowRequest,
    ) -> Result<Workflow, DomainError> {
        let workflow_id = self.parse_id(id)?;

        let mut workflow =
            require::<Workflow, _>(self.storage.as_ref(), &workflow_id, "Workflow").await?;

        if let Some(name) = request.name {
            workflow.set_name(name);
        }

        if let Some(description) = request.description {
            workflow.set_description(description);
        }

        if let Some(trigger) = request.trigger {
            workflow.set_trigger(trigger);
        }

        if request.nodes.is_some() || request.edges.is_some() {
            let nodes = request.nodes.unwrap_or_else(|| workflow.nodes().to_vec());
            let edges = request.edges.unwrap_or_else(|| workflow.edges().to_vec());
            workflow.set_graph(nodes, edges);
            self.check(&workflow)?;
        }

        if let Some(active) = request.is_active {
            workflow.set_active(active);
        }

        self.storage.update(workflow).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, DomainError> {
        let workflow_id = self.parse_id(id)?;
        self.storage.delete(&workflow_id).await
    }

    pub async fn exists(&self, id: &str) -> Result<bool, DomainError> {
        let workflow_id = self.parse_id(id)?;
        self.storage.exists(&workflow_id).await
    }

    pub async fn activate(&self, id: &str) -> Result<Workflow, DomainError> {
        self.update(id, UpdateWorkflowRequest::new().with_active(true))
            .await
    }

    pub async fn deactivate(&self, id: &str) -> Result<Workflow, DomainError> {
        self.update(id, UpdateWorkflowRequest::new().with_active(false))
            .await
    }

    /// Validate a stored workflow
    pub async fn validate(&self, id: &str) -> Result<ValidationReport, DomainError> {
        let workflow_id = self.parse_id(id)?;
        let workflow =
            require::<Workflow, _>(self.storage.as_ref(), &workflow_id, "Workflow").await?;
        Ok(validate_definition(&workflow)?)
    }

    fn check(&self, workflow: &Workflow) -> Result<(), DomainError> {
        let report = validate_definition(workflow)?;
        for warning in &report.warnings {
            warn!(workflow_id = %workflow.id(), "{}", warning);
        }
        Ok(())
    }

    fn parse_id(&self, id: &str) -> Result<WorkflowId, DomainError> {
        WorkflowId::new(id).map_err(|e| DomainError::validation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::workflow::{ConditionBranch, ConditionNode, PromoCodeNode};
    use crate::infrastructure::storage::InMemoryStorage;

    fn create_service() -> WorkflowService {
        WorkflowService::new(Arc::new(InMemoryStorage::<Workflow>::new()))
    }

    fn promo(id: &str) -> ActionNode {
        ActionNode::new(id, NodeKind::PromoCode(PromoCodeNode::new("summer")))
    }

    fn condition(id: &str, predicate: &str) -> ActionNode {
        ActionNode::new(
            id,
            NodeKind::Condition(ConditionNode::new(vec![ConditionBranch::new(
                predicate, "if",
            )])),
        )
    }

    fn create_request(id: &str) -> CreateWorkflowRequest {
        CreateWorkflowRequest::new(id, "Cart follow-up", TriggerSpec::new("ecommerce"))
            .with_node(ActionNode::trigger("t"))
            .with_node(promo("a"))
            .with_edge(Edge::new("t", "a"))
    }

    fn definition(nodes: Vec<ActionNode>, edges: Vec<Edge>) -> Workflow {
        let mut workflow = Workflow::new(
            WorkflowId::new("validate-me").unwrap(),
            "Validate me",
            TriggerSpec::new("ecommerce"),
        );
        workflow.set_graph(nodes, edges);
        workflow
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let service = create_service();

        let created = service.create(create_request("cart-followup")).await.unwrap();
        assert_eq!(created.id().as_str(), "cart-followup");
        assert_eq!(created.nodes().len(), 2);

        let fetched = service.get("cart-followup").await.unwrap().unwrap();
        assert_eq!(fetched.name(), "Cart follow-up");
    }

    #[tokio::test]
    async fn test_create_duplicate_fails() {
        let service = create_service();
        service.create(create_request("cart-followup")).await.unwrap();

        let err = service.create(create_request("cart-followup")).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict { .. }));
    }

    #[tokio::test]
    async fn test_create_rejects_invalid_graph() {
        let service = create_service();
        let request = CreateWorkflowRequest::new("bad", "Bad", TriggerSpec::new("ecommerce"))
            .with_node(promo("a"));

        let err = service.create(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
        assert!(!service.exists("bad").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_graph_bumps_version() {
        let service = create_service();
        let created = service.create(create_request("cart-followup")).await.unwrap();

        let updated = service
            .update(
                "cart-followup",
                UpdateWorkflowRequest::new()
                    .with_name("Renamed")
                    .with_graph(
                        vec![ActionNode::trigger("t"), promo("a"), promo("b")],
                        vec![Edge::new("t", "a"), Edge::new("a", "b")],
                    ),
            )
            .await
            .unwrap();

        assert_eq!(updated.name(), "Renamed");
        assert_eq!(updated.nodes().len(), 3);
        assert!(updated.version() > created.version());
    }

    #[tokio::test]
    async fn test_deactivate_and_list_active() {
        let service = create_service();
        service.create(create_request("one")).await.unwrap();
        service.create(create_request("two")).await.unwrap();

        service.deactivate("one").await.unwrap();

        let active = service.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id().as_str(), "two");
    }

    #[tokio::test]
    async fn test_update_missing_workflow() {
        let service = create_service();
        let err = service
            .update("missing", UpdateWorkflowRequest::new().with_name("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let service = create_service();
        service.create(create_request("cart-followup")).await.unwrap();

        assert!(service.delete("cart-followup").await.unwrap());
        assert!(!service.delete("cart-followup").await.unwrap());
    }

    #[test]
    fn test_validate_clean_graph() {
        let wf = definition(
            vec![ActionNode::trigger("t"), promo("a")],
            vec![Edge::new("t", "a")],
        );
        assert!(validate_definition(&wf).unwrap().is_clean());
    }

    #[test]
    fn test_validate_rejects_duplicate_ids_and_triggers() {
        let wf = definition(vec![ActionNode::trigger("t"), promo("t")], vec![]);
        assert!(validate_definition(&wf).is_err());

        let wf = definition(vec![ActionNode::trigger("t1"), ActionNode::trigger("t2")], vec![]);
        let err = validate_definition(&wf).unwrap_err();
        assert!(err.to_string().contains("exactly one trigger"));
    }

    #[test]
    fn test_validate_rejects_unknown_edge_endpoint() {
        let wf = definition(vec![ActionNode::trigger("t")], vec![Edge::new("t", "ghost")]);
        let err = validate_definition(&wf).unwrap_err();
        assert!(err.to_string().contains("ghost"));
    }

    #[test]
    fn test_validate_rejects_fan_out_from_action() {
        let wf = definition(
            vec![ActionNode::trigger("t"), promo("a"), promo("b"), promo("c")],
            vec![Edge::new("t", "a"), Edge::new("a", "b"), Edge::new("a", "c")],
        );
        assert!(validate_definition(&wf).is_err());
    }

    #[test]
    fn test_validate_rejects_bad_predicate() {
        let wf = definition(
            vec![ActionNode::trigger("t"), condition("c", "event.value >")],
            vec![Edge::new("t", "c")],
        );
        let err = validate_definition(&wf).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidPredicate { .. }));
    }

    #[test]
    fn test_validate_warns_on_cycle_and_unreachable() {
        let wf = definition(
            vec![
                ActionNode::trigger("t"),
                promo("a"),
                promo("b"),
                promo("orphan"),
            ],
            vec![Edge::new("t", "a"), Edge::new("a", "b"), Edge::new("b", "a")],
        );
        let report = validate_definition(&wf).unwrap();

        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].contains("cycle"));
        assert!(report.warnings[1].contains("orphan"));
    }

    #[test]
    fn test_validate_warns_on_unlabelled_condition_edge() {
        let wf = definition(
            vec![
                ActionNode::trigger("t"),
                condition("c", "event.value > 1"),
                promo("a"),
            ],
            vec![Edge::new("t", "c"), Edge::new("c", "a")],
        );
        let report = validate_definition(&wf).unwrap();

        assert!(report.warnings.iter().any(|w| w.contains("without a branch label")));
    }
}
