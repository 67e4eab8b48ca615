use crate::actor::{Actor, Addr, Context};
use crate::messages::{SearchMsg, SearchResult, SupervisorMsg};
use crate::model::AgentState;
use eyre::Result;

/// Answers a search request straight away. No search backend is wired in yet,
/// so the result only echoes the query.
pub struct SearchWorker {
    parent: Addr<SupervisorMsg>,
    state: AgentState,
}

impl SearchWorker {
    pub fn new(parent: Addr<SupervisorMsg>) -> Self {
        Self {
            parent,
            state: AgentState::Init,
        }
    }
}

impl Actor for SearchWorker {
    type Message = SearchMsg;
    const NAME: &'static str = "search";

    async fn handle(&mut self, ctx: &mut Context<Self>, msg: SearchMsg) -> Result<()> {
        let SearchMsg::Search(search) = msg;
        tracing::info!(query = %search.query, "search received");
        let result = SearchResult {
            result: format!("no results available for {:?}", search.query),
        };
        self.state = AgentState::Finished;
        if let Err(error) = self.parent.send(SupervisorMsg::SearchResult(result)) {
            tracing::warn!(error = %error, "supervisor is gone");
        }
        tracing::debug!(state = %self.state, "search worker done");
        ctx.stop();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{channel, spawn};
    use crate::messages::NewSearch;

    #[tokio::test]
    async fn reports_once_and_stops() {
        let (parent, mut mailbox) = channel();
        let worker = spawn(SearchWorker::new(parent));
        worker
            .send(SearchMsg::Search(NewSearch {
                query: "rust actors".to_string(),
                expected_outcome: "links".to_string(),
                limitations: String::new(),
            }))
            .unwrap();
        let Some(SupervisorMsg::SearchResult(result)) = mailbox.recv().await else {
            panic!("expected a search result");
        };
        assert!(result.result.contains("rust actors"));
        assert!(mailbox.recv().await.is_none());
        worker.closed().await;
    }

    #[tokio::test]
    async fn finishes_after_reporting() {
        let (parent, _inbox) = channel();
        let (addr, _mailbox) = channel();
        let mut ctx = Context::<SearchWorker>::new(addr);
        let mut worker = SearchWorker::new(parent);
        assert_eq!(worker.state, AgentState::Init);
        worker
            .handle(
                &mut ctx,
                SearchMsg::Search(NewSearch {
                    query: "tokio".to_string(),
                    expected_outcome: String::new(),
                    limitations: String::new(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(worker.state, AgentState::Finished);
    }
}
