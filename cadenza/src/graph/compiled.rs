//! Compiled state graph: immutable, supports invoke and stream.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. Holds
//! nodes and edge order; when a checkpointer is set and `config.thread_id`
//! is provided, state is saved on interrupt and after the run so a paused
//! thread can be resumed with `config.resume_from_node_id`.

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use crate::error::WorkflowError;
use crate::memory::{Checkpoint, Checkpointer, RunnableConfig};

use super::state_graph::END;
use super::{Next, Node, RunContext, StreamEvent};

/// Compiled graph: immutable structure, supports invoke and stream.
#[derive(Clone)]
pub struct CompiledStateGraph<S> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// First node to run (from START), unless the config resumes elsewhere.
    pub(super) first_node_id: String,
    /// Linear order of nodes, used for `Next::Continue`.
    pub(super) edge_order: Vec<String>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
}

impl<S> CompiledStateGraph<S>
where
    S: Clone + Send + Sync + Debug + 'static,
{
    /// Shared run loop used by invoke() and stream(): steps through nodes
    /// until completion or interrupt.
    async fn run_loop(
        &self,
        state: &mut S,
        config: &RunnableConfig,
        current_id: &mut String,
        run_ctx: &RunContext<S>,
    ) -> Result<(), WorkflowError> {
        debug!(first = %current_id, thread = ?config.thread_id, "graph run start");
        loop {
            let node = self
                .nodes
                .get(current_id.as_str())
                .ok_or_else(|| {
                    WorkflowError::ExecutionFailed(format!("unknown node: {current_id}"))
                })?
                .clone();

            debug!(node = %current_id, "node start");
            let result = node.run_with_context(state.clone(), run_ctx).await;

            let (new_state, next) = match result {
                Ok(output) => output,
                Err(WorkflowError::Interrupted(interrupt)) => {
                    // Save a checkpoint so the thread can be resumed, then
                    // surface the interrupt to the stream and the caller.
                    self.save_checkpoint(state, config).await;
                    if let Some(tx) = &run_ctx.stream_tx {
                        let _ = tx
                            .send(StreamEvent::Interrupted(interrupt.0.clone()))
                            .await;
                    }
                    debug!(node = %current_id, "graph interrupted");
                    return Err(WorkflowError::Interrupted(interrupt));
                }
                Err(e) => {
                    debug!(node = %current_id, error = %e, "node failed");
                    return Err(e);
                }
            };

            *state = new_state;
            debug!(node = %current_id, next = ?next, "node complete");

            if let Some(tx) = &run_ctx.stream_tx {
                let _ = tx
                    .send(StreamEvent::Updates {
                        node_id: current_id.clone(),
                        state: state.clone(),
                    })
                    .await;
            }

            let next_id: Option<String> = match next {
                Next::End => None,
                Next::Node(id) => Some(id),
                Next::Continue => {
                    let pos = self.edge_order.iter().position(|x| x == current_id);
                    pos.and_then(|p| self.edge_order.get(p + 1)).cloned()
                }
            };

            match next_id {
                None => {
                    self.save_checkpoint(state, config).await;
                    debug!("graph run complete");
                    return Ok(());
                }
                Some(id) if id == END => {
                    self.save_checkpoint(state, config).await;
                    debug!("graph run complete");
                    return Ok(());
                }
                Some(id) => *current_id = id,
            }
        }
    }

    async fn save_checkpoint(&self, state: &S, config: &RunnableConfig) {
        if let (Some(cp), Some(_)) = (&self.checkpointer, &config.thread_id) {
            let checkpoint = Checkpoint::from_state(state.clone());
            if let Err(e) = cp.put(config, &checkpoint).await {
                tracing::warn!(error = %e, "checkpoint save failed");
            }
        }
    }

    fn start_node(&self, config: &RunnableConfig) -> String {
        config
            .resume_from_node_id
            .as_ref()
            .filter(|id| self.nodes.contains_key(id.as_str()))
            .cloned()
            .unwrap_or_else(|| self.first_node_id.clone())
    }

    /// Runs the graph with the given state; returns the final state.
    ///
    /// `config.resume_from_node_id` re-enters a paused thread mid-graph
    /// (no node before the resume point runs again).
    pub async fn invoke(
        &self,
        state: S,
        config: Option<RunnableConfig>,
    ) -> Result<S, WorkflowError> {
        if self.nodes.is_empty() || !self.nodes.contains_key(&self.first_node_id) {
            return Err(WorkflowError::ExecutionFailed("empty graph".into()));
        }
        let config = config.unwrap_or_default();
        let run_ctx = RunContext::new(config.clone());
        let mut state = state;
        let mut current_id = self.start_node(&config);
        self.run_loop(&mut state, &config, &mut current_id, &run_ctx)
            .await?;
        Ok(state)
    }

    /// Streams graph execution, emitting `Updates` per node, live
    /// `Progress` events from nodes, and `Interrupted` when the run pauses.
    pub fn stream(
        &self,
        state: S,
        config: Option<RunnableConfig>,
    ) -> ReceiverStream<StreamEvent<S>> {
        let (tx, rx) = mpsc::channel(128);
        let graph = self.clone();
        let config = config.unwrap_or_default();

        tokio::spawn(async move {
            if graph.nodes.is_empty() || !graph.nodes.contains_key(&graph.first_node_id) {
                return;
            }
            let mut run_ctx = RunContext::new(config.clone());
            run_ctx.stream_tx = Some(tx);
            let mut state = state;
            let mut current_id = graph.start_node(&config);
            let _ = graph
                .run_loop(&mut state, &config, &mut current_id, &run_ctx)
                .await;
        });

        ReceiverStream::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio_stream::StreamExt;

    use crate::graph::{GraphInterrupt, Interrupt, StateGraph, START};
    use crate::memory::MemorySaver;

    #[derive(Clone)]
    struct AddNode {
        id: &'static str,
        delta: i32,
    }

    #[async_trait]
    impl Node<i32> for AddNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, state: i32) -> Result<(i32, Next), WorkflowError> {
            Ok((state + self.delta, Next::Continue))
        }
    }

    /// Jumps from "first" to "third", skipping "second".
    #[derive(Clone)]
    struct JumpNode {
        id: &'static str,
    }

    #[async_trait]
    impl Node<i32> for JumpNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, state: i32) -> Result<(i32, Next), WorkflowError> {
            Ok((state + 1, Next::Node("third".to_string())))
        }
    }

    struct InterruptingNode {
        id: &'static str,
    }

    #[async_trait]
    impl Node<i32> for InterruptingNode {
        fn id(&self) -> &str {
            self.id
        }
        async fn run(&self, _state: i32) -> Result<(i32, Next), WorkflowError> {
            Err(WorkflowError::Interrupted(GraphInterrupt(Interrupt::new(
                serde_json::json!({"action": "review"}),
            ))))
        }
    }

    fn two_step_graph() -> CompiledStateGraph<i32> {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("first", Arc::new(AddNode { id: "first", delta: 1 }));
        graph.add_node(
            "second",
            Arc::new(AddNode {
                id: "second",
                delta: 2,
            }),
        );
        graph.add_edge(START, "first");
        graph.add_edge("first", "second");
        graph.add_edge("second", END);
        graph.compile().expect("graph compiles")
    }

    /// **Scenario**: Linear invoke runs both nodes in order.
    #[tokio::test]
    async fn invoke_linear_chain() {
        let graph = two_step_graph();
        assert_eq!(graph.invoke(0, None).await.unwrap(), 3);
    }

    /// **Scenario**: Next::Node(id) jumps over intermediate nodes.
    #[tokio::test]
    async fn invoke_jump_skips_nodes() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("first", Arc::new(JumpNode { id: "first" }));
        graph.add_node(
            "second",
            Arc::new(AddNode {
                id: "second",
                delta: 10,
            }),
        );
        graph.add_node(
            "third",
            Arc::new(AddNode {
                id: "third",
                delta: 100,
            }),
        );
        graph.add_edge(START, "first");
        graph.add_edge("first", "second");
        graph.add_edge("second", "third");
        graph.add_edge("third", END);
        let compiled = graph.compile().expect("graph compiles");
        // first: 0+1=1 then jump; third: 1+100=101 (second skipped).
        assert_eq!(compiled.invoke(0, None).await.unwrap(), 101);
    }

    /// **Scenario**: Interrupt saves a checkpoint for the thread and the
    /// invoke returns Interrupted.
    #[tokio::test]
    async fn interrupt_saves_checkpoint() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("add", Arc::new(AddNode { id: "add", delta: 5 }));
        graph.add_node("pause", Arc::new(InterruptingNode { id: "pause" }));
        graph.add_edge(START, "add");
        graph.add_edge("add", "pause");
        graph.add_edge("pause", END);
        let saver = Arc::new(MemorySaver::<i32>::new());
        let compiled = graph
            .compile_with_checkpointer(saver.clone())
            .expect("graph compiles");
        let config = RunnableConfig {
            thread_id: Some("t1".into()),
            ..Default::default()
        };
        let result = compiled.invoke(0, Some(config.clone())).await;
        assert!(matches!(result, Err(WorkflowError::Interrupted(_))));
        let cp = saver.get_tuple(&config).await.unwrap();
        assert_eq!(cp.expect("checkpoint saved").state, 5);
    }

    /// **Scenario**: resume_from_node_id re-enters the graph mid-chain.
    #[tokio::test]
    async fn resume_from_node_skips_prefix() {
        let graph = two_step_graph();
        let config = RunnableConfig {
            thread_id: None,
            resume_from_node_id: Some("second".into()),
        };
        // Only "second" (+2) runs.
        assert_eq!(graph.invoke(0, Some(config)).await.unwrap(), 2);
    }

    /// **Scenario**: stream emits one Updates per node and ends.
    #[tokio::test]
    async fn stream_emits_updates_in_order() {
        let graph = two_step_graph();
        let events: Vec<_> = graph.stream(0, None).collect().await;
        let ids: Vec<_> = events
            .iter()
            .map(|e| match e {
                StreamEvent::Updates { node_id, .. } => node_id.clone(),
                other => panic!("unexpected event {:?}", other),
            })
            .collect();
        assert_eq!(ids, vec!["first".to_string(), "second".to_string()]);
    }

    /// **Scenario**: stream surfaces Interrupted as its last event.
    #[tokio::test]
    async fn stream_surfaces_interrupt() {
        let mut graph = StateGraph::<i32>::new();
        graph.add_node("pause", Arc::new(InterruptingNode { id: "pause" }));
        graph.add_edge(START, "pause");
        graph.add_edge("pause", END);
        let compiled = graph.compile().expect("graph compiles");
        let events: Vec<_> = compiled.stream(0, None).collect().await;
        assert!(matches!(
            events.last(),
            Some(StreamEvent::Interrupted(_))
        ));
    }

    /// **Scenario**: Empty graph invoke fails with "empty graph".
    #[tokio::test]
    async fn invoke_empty_graph_fails() {
        let graph = CompiledStateGraph::<i32> {
            nodes: HashMap::new(),
            first_node_id: String::new(),
            edge_order: vec![],
            checkpointer: None,
        };
        match graph.invoke(0, None).await {
            Err(WorkflowError::ExecutionFailed(msg)) => {
                assert!(msg.contains("empty graph"), "{}", msg)
            }
            other => panic!("expected ExecutionFailed, got {:?}", other.is_ok()),
        }
    }
}
