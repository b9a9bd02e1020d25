//! Live execution events

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::domain::execution::{ExecutionId, ExecutionStatus, StepStatus, StepType};
use crate::domain::workflow::WorkflowId;

/// Events buffered per subscriber before it starts lagging
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExecutionEvent {
    ExecutionStarted {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
    },
    StepStarted {
        execution_id: ExecutionId,
        step_order: u32,
        step_type: StepType,
        node_id: Option<String>,
    },
    StepFinished {
        execution_id: ExecutionId,
        step_order: u32,
        status: StepStatus,
        duration_ms: Option<u64>,
    },
    ExecutionFinished {
        execution_id: ExecutionId,
        workflow_id: WorkflowId,
        status: ExecutionStatus,
    },
}

impl ExecutionEvent {
    pub fn execution_id(&self) -> &ExecutionId {
        match self {
            Self::ExecutionStarted { execution_id, .. }
            | Self::StepStarted { execution_id, .. }
            | Self::StepFinished { execution_id, .. }
            | Self::ExecutionFinished { execution_id, .. } => execution_id,
        }
    }
}

/// Broadcasts [`ExecutionEvent`]s to live subscribers.
///
/// Created stopped; `start` opens the channel and `shutdown` closes it,
/// ending every subscription. Publishing while stopped, or with nobody
/// listening, does nothing. Slow subscribers lag and lose events; the
/// publisher never waits on them.
#[derive(Debug)]
pub struct ExecutionEventHub {
    capacity: usize,
    sender: RwLock<Option<broadcast::Sender<ExecutionEvent>>>,
}

impl Default for ExecutionEventHub {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl ExecutionEventHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sender: RwLock::new(None),
        }
    }

    /// A hub that is already started
    pub fn started(capacity: usize) -> Self {
        let hub = Self::new(capacity);
        hub.start();
        hub
    }

    pub fn start(&self) {
        if let Ok(mut sender) = self.sender.write() {
            if sender.is_none() {
                let (tx, _) = broadcast::channel(self.capacity);
                *sender = Some(tx);
                info!(capacity = self.capacity, "Execution event hub started");
            }
        }
    }

    pub fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.write() {
            if sender.take().is_some() {
                info!("Execution event hub stopped");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().map(|s| s.is_some()).unwrap_or(false)
    }

    /// `None` while the hub is stopped
    pub fn subscribe(&self) -> Option<broadcast::Receiver<ExecutionEvent>> {
        self.sender
            .read()
            .ok()
            .and_then(|s| s.as_ref().map(broadcast::Sender::subscribe))
    }

    pub fn publish(&self, event: ExecutionEvent) {
        let Ok(sender) = self.sender.read() else {
            return;
        };
        if let Some(tx) = sender.as_ref() {
            // no receivers is not an error
            if tx.send(event).is_err() {
                debug!("Execution event dropped, no subscribers");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    fn started_event() -> ExecutionEvent {
        ExecutionEvent::ExecutionStarted {
            execution_id: ExecutionId::new(),
            workflow_id: WorkflowId::new("welcome").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let hub = ExecutionEventHub::started(8);
        let mut rx = hub.subscribe().unwrap();

        let event = started_event();
        hub.publish(event.clone());

        assert_eq!(rx.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_stopped_hub_is_a_noop() {
        let hub = ExecutionEventHub::new(8);
        assert!(!hub.is_running());
        assert!(hub.subscribe().is_none());

        hub.publish(started_event());
    }

    #[tokio::test]
    async fn test_shutdown_closes_subscriptions() {
        let hub = ExecutionEventHub::started(8);
        let mut rx = hub.subscribe().unwrap();

        hub.shutdown();
        hub.publish(started_event());

        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
        assert!(!hub.is_running());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_loses_events() {
        let hub = ExecutionEventHub::started(2);
        let mut rx = hub.subscribe().unwrap();

        for _ in 0..5 {
            hub.publish(started_event());
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(_))));
    }

    #[test]
    fn test_event_serialization() {
        let value = serde_json::to_value(started_event()).unwrap();

        assert_eq!(value["type"], "execution_started");
        assert_eq!(value["workflow_id"], "welcome");
    }
}
