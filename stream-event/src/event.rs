//! Wire shape for one stream event: type + payload.
//!
//! Serialized with `type` as the tag so SSE consumers can route on the
//! event name without inspecting the payload.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::result::{FinalResult, StepProgress};

/// One event in a chat turn's stream.
///
/// **Interaction**: Produced by the workflow engine, consumed by the SSE
/// front door (`serve`) which uses [`AgentEvent::event_name`] as the SSE
/// event field and the serialized payload as the data field.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Emitted once at stream start.
    Connected {
        session_id: String,
        model: String,
    },
    /// A background title refresh was kicked off for this session.
    TitleUpdateTriggered {
        session_id: String,
    },
    /// The workflow paused for plan approval. The stream stays open; the
    /// caller answers with `APPROVE_PLAN:<plan_id>` or
    /// `EDIT_PLAN:<plan_id>:<json>` in a follow-up request.
    PlanReview {
        plan: Value,
        plan_id: String,
        message: String,
        session_id: String,
    },
    /// Per-step execution progress.
    Progress {
        node: String,
        progress: StepProgress,
    },
    /// Aggregated final result for the turn.
    ///
    /// Nested under `result` because [`FinalResult`] carries its own
    /// `type` field (`tool_response`/`text_response`); SSE consumers get
    /// the bare result via [`AgentEvent::data_payload`].
    Result { result: FinalResult },
    /// Terminal marker.
    Done {
        message: String,
    },
    Error {
        error: String,
        message: String,
    },
}

impl AgentEvent {
    /// SSE event name for this variant.
    pub fn event_name(&self) -> &'static str {
        match self {
            AgentEvent::Connected { .. } => "connected",
            AgentEvent::TitleUpdateTriggered { .. } => "title_update_triggered",
            AgentEvent::PlanReview { .. } => "plan_review",
            AgentEvent::Progress { .. } => "progress",
            AgentEvent::Result { .. } => "result",
            AgentEvent::Done { .. } => "done",
            AgentEvent::Error { .. } => "error",
        }
    }

    /// Serializes this event to a JSON object (type + payload).
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// The SSE `data` payload: the event name routes, so `result` carries
    /// the bare [`FinalResult`] and everything else the tagged object.
    pub fn data_payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            AgentEvent::Result { result } => serde_json::to_value(result),
            other => serde_json::to_value(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Each variant serializes with a snake_case `type` tag
    /// matching its SSE event name.
    #[test]
    fn event_type_tag_matches_event_name() {
        let events = vec![
            AgentEvent::Connected {
                session_id: "s1".into(),
                model: "m".into(),
            },
            AgentEvent::TitleUpdateTriggered {
                session_id: "s1".into(),
            },
            AgentEvent::Done {
                message: "Workflow completed".into(),
            },
            AgentEvent::Error {
                error: "boom".into(),
                message: "An error occurred during processing".into(),
            },
        ];
        for ev in events {
            let v = ev.to_value().unwrap();
            assert_eq!(v["type"], ev.event_name());
        }
    }

    /// **Scenario**: plan_review payload carries plan, plan_id, message and
    /// session_id at the top level.
    #[test]
    fn plan_review_payload_fields() {
        let ev = AgentEvent::PlanReview {
            plan: serde_json::json!({"steps": []}),
            plan_id: "plan_1700000000_deadbeef".into(),
            message: "Please review the execution plan.".into(),
            session_id: "s1".into(),
        };
        let v = ev.to_value().unwrap();
        assert_eq!(v["type"], "plan_review");
        assert_eq!(v["plan_id"], "plan_1700000000_deadbeef");
        assert!(v["plan"]["steps"].is_array());
        assert_eq!(v["session_id"], "s1");
    }

    /// **Scenario**: The result event's SSE data is the bare final
    /// result (its own `type` discriminates the response kind), while the
    /// tagged form nests it under `result`.
    #[test]
    fn result_payload_shapes() {
        let ev = AgentEvent::Result {
            result: crate::FinalResult::text("all done"),
        };
        assert_eq!(ev.event_name(), "result");

        let data = ev.data_payload().unwrap();
        assert_eq!(data["type"], "text_response");
        assert_eq!(data["message"], "all done");

        let tagged = ev.to_value().unwrap();
        assert_eq!(tagged["type"], "result");
        assert_eq!(tagged["result"]["type"], "text_response");

        let back: AgentEvent = serde_json::from_value(tagged).unwrap();
        assert!(matches!(back, AgentEvent::Result { .. }));
    }

    /// **Scenario**: AgentEvent round-trips through serde.
    #[test]
    fn event_roundtrip() {
        let ev = AgentEvent::Connected {
            session_id: "abc".into(),
            model: "openai/gpt-4o-mini".into(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: AgentEvent = serde_json::from_str(&json).unwrap();
        match back {
            AgentEvent::Connected { session_id, model } => {
                assert_eq!(session_id, "abc");
                assert_eq!(model, "openai/gpt-4o-mini");
            }
            other => panic!("variant mismatch: {:?}", other),
        }
    }
}
