use crate::actor::{Addr, spawn_supervised};
use crate::error::StatusError;
use crate::messages::PlannerMsg;
use crate::model::{Goal, Status};
use crate::planner::Planner;
use crate::services::Services;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, oneshot};
use uuid::Uuid;

/// Entry point of the engine: starts one planner tree per goal and routes
/// status queries to it by request id.
#[derive(Clone)]
pub struct Orchestrator {
    services: Services,
    requests: Arc<RwLock<HashMap<Uuid, Addr<PlannerMsg>>>>,
}

impl Orchestrator {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            requests: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Starts working on `goal` and returns its request id without waiting.
    pub async fn submit(&self, goal: impl Into<String>) -> Uuid {
        let request_id = Uuid::new_v4();
        let goal = Goal {
            request_id,
            goal: goal.into(),
        };
        let services = self.services.clone();
        let remembered = goal.clone();
        let planner = spawn_supervised(
            move || Planner::new(request_id, services.clone()).with_goal(remembered.clone()),
            self.services.config.planner_restart,
        );
        tracing::info!(request_id = %request_id, goal = %goal.goal, "goal submitted");
        if let Err(error) = planner.send(PlannerMsg::NewGoal(goal)) {
            tracing::error!(request_id = %request_id, error = %error, "planner did not start");
        }
        self.requests.write().await.insert(request_id, planner);
        request_id
    }

    pub async fn query_status(&self, request_id: Uuid) -> Result<Status, StatusError> {
        let planner = self
            .requests
            .read()
            .await
            .get(&request_id)
            .cloned()
            .ok_or(StatusError::NotFound(request_id))?;

        let (reply, response) = oneshot::channel();
        if planner.send(PlannerMsg::GetStatus(reply)).is_err() {
            self.forget(request_id).await;
            return Err(StatusError::Unavailable(request_id));
        }
        match tokio::time::timeout(self.services.config.status_timeout, response).await {
            Ok(Ok(Ok(status))) => Ok(status),
            Ok(Ok(Err(error))) => Err(StatusError::Planner(error.to_string())),
            Ok(Err(_)) => {
                self.forget(request_id).await;
                Err(StatusError::Unavailable(request_id))
            }
            Err(_) => {
                tracing::warn!(request_id = %request_id, "status query timed out");
                self.forget(request_id).await;
                Err(StatusError::Timeout(request_id))
            }
        }
    }

    pub async fn contains(&self, request_id: Uuid) -> bool {
        self.requests.read().await.contains_key(&request_id)
    }

    async fn forget(&self, request_id: Uuid) {
        if self.requests.write().await.remove(&request_id).is_some() {
            tracing::info!(request_id = %request_id, "request removed");
        }
    }
}
