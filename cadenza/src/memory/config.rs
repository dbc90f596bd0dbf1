//! Invoke config: thread id and resume point.

/// Config for a single graph run. Identifies the checkpoint thread and,
/// when resuming a paused thread, the node to re-enter at.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    /// Checkpoint key for this run. `plan_id` while a plan is alive,
    /// `session_id` for pre-plan turns. Required when using a checkpointer.
    pub thread_id: Option<String>,
    /// When set, the graph starts from this node instead of the first.
    /// Used when resuming after a plan-review interrupt: load checkpoint
    /// state, apply the approval/edit, re-enter at `review_plan`.
    pub resume_from_node_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Default config has no thread and no resume point.
    #[test]
    fn default_is_empty() {
        let c = RunnableConfig::default();
        assert!(c.thread_id.is_none());
        assert!(c.resume_from_node_id.is_none());
    }
}
