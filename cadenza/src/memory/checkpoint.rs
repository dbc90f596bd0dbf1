//! Checkpoint: one saved state snapshot.

use std::time::SystemTime;

use uuid::Uuid;

/// One checkpoint: state snapshot plus id and timestamp.
///
/// **Interaction**: Produced by the graph run loop on interrupt and at run
/// end; consumed by `Checkpointer::put` and returned by `get_tuple`.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    /// Unique checkpoint id.
    pub id: String,
    /// Milliseconds since epoch when the checkpoint was taken.
    pub ts: String,
    /// The workflow state at the time of the checkpoint.
    pub state: S,
}

impl<S> Checkpoint<S> {
    /// Creates a checkpoint from the current state.
    pub fn from_state(state: S) -> Self {
        let ts = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis().to_string())
            .unwrap_or_else(|_| "0".to_string());
        Self {
            id: Uuid::new_v4().to_string(),
            ts,
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Checkpoints get unique ids and a numeric timestamp.
    #[test]
    fn checkpoints_have_unique_ids() {
        let a: Checkpoint<i32> = Checkpoint::from_state(1);
        let b: Checkpoint<i32> = Checkpoint::from_state(2);
        assert_ne!(a.id, b.id);
        assert!(a.ts.parse::<u128>().is_ok());
    }
}
