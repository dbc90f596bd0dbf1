//! End-to-end workflow scenarios over scripted LLM and CRM.

mod common;

use cadenza::llm::purpose;
use cadenza::{AgentEvent, ChatOutcome, CrmError, ResponseKind, StepStatus, ToolCall};
use common::*;
use serde_json::json;

/// **Scenario**: Zero tool calls — the turn goes agent → respond with a
/// text response, no plan, no plan_review event.
#[tokio::test]
async fn text_turn_has_no_plan() {
    let (agent, llm, _crm) = build_agent();
    llm.script(purpose::AGENT, ChatOutcome::text("Hello! How can I help?"));

    let events = collect(&agent, "hi there", "s-text").await;

    assert!(matches!(events.first(), Some(AgentEvent::Connected { .. })));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, AgentEvent::PlanReview { .. })),
        "no plan review for a pure text turn"
    );
    let result = final_result(&events);
    assert_eq!(result.kind, ResponseKind::TextResponse);
    assert_eq!(result.message, "Hello! How can I help?");
    assert!(has_done(&events));
}

/// **Scenario A**: Parallel multi-search. Two independent tool calls
/// yield one parallel plan with two dependency-free steps; both steps
/// report running→completed and the final data carries both counts.
#[tokio::test]
async fn parallel_multi_search() {
    let (agent, llm, crm) = build_agent();
    llm.script(
        purpose::AGENT,
        ChatOutcome::with_tool_calls(
            "",
            vec![
                ToolCall::new(
                    "c0",
                    "search_companies",
                    json!({"industry": ["Hospitals and Health Care"], "hqState": ["Texas"]}),
                ),
                ToolCall::new(
                    "c1",
                    "search_leads",
                    json!({"designation": ["VP Marketing"], "industry": ["Financial Services"]}),
                ),
            ],
        ),
    );
    llm.script_json(
        purpose::ANALYZE_DEPENDENCIES,
        json!({
            "execution_type": "parallel",
            "confidence": 0.95,
            "reasoning": "two independent searches",
            "dependencies": {}
        }),
    );
    crm.script(
        "search_companies",
        Ok(json!({"companies": [{"id": "7", "name": "Medix"}, {"id": "8", "name": "Carewell"}]})),
    );
    crm.script(
        "search_contacts",
        Ok(json!({"contacts": [{"id": "11", "name": "Asha", "company_name": "FinServe"}]})),
    );

    let session = "s-parallel";
    let review = collect(
        &agent,
        "Find healthcare companies in Texas and marketing VPs in fintech",
        session,
    )
    .await;
    let (plan, plan_id) = plan_review(&review);
    assert_eq!(plan["execution_type"], "parallel");
    let steps = plan["steps"].as_array().unwrap();
    assert_eq!(steps.len(), 2);
    for step in steps {
        assert!(step["depends_on"].as_array().unwrap().is_empty());
    }
    assert!(!has_done(&review), "stream pauses at review, no done yet");

    let events = collect(&agent, &format!("APPROVE_PLAN:{plan_id}"), session).await;
    let statuses = progress_statuses(&events);
    let running = statuses
        .iter()
        .filter(|(_, s)| *s == StepStatus::Running)
        .count();
    let completed = statuses
        .iter()
        .filter(|(_, s)| *s == StepStatus::Completed)
        .count();
    assert_eq!(running, 2);
    assert_eq!(completed, 2);

    let result = final_result(&events);
    assert_eq!(result.kind, ResponseKind::ToolResponse);
    assert_eq!(result.execution_type.as_deref(), Some("parallel"));
    assert_eq!(result.data["companies_found"], 2);
    assert_eq!(result.data["contacts_found"], 1);
    assert_eq!(result.tool_outputs.len(), 2);
    assert!(has_done(&events));
}

/// **Scenario B**: Full campaign workflow. Four tool calls run as
/// sequential waves; the cadence template equals the generated email and
/// the enrolled recipients equal the searched contact ids.
#[tokio::test]
async fn full_campaign_workflow() {
    let (agent, llm, crm) = build_agent();
    llm.script(
        purpose::AGENT,
        ChatOutcome::with_tool_calls(
            "",
            vec![
                ToolCall::new(
                    "c0",
                    "search_leads",
                    json!({"designation": ["CTO"], "industry": ["Financial Services"]}),
                ),
                ToolCall::new("c1", "generate_email", json!({"tone": "professional"})),
                ToolCall::new(
                    "c2",
                    "create_cadence",
                    json!({"name": "Fintech AI", "start_date": "2026-08-03", "start_time": "10:00"}),
                ),
                ToolCall::new("c3", "add_contacts_to_cadence", json!({})),
            ],
        ),
    );
    llm.script_json(
        purpose::ANALYZE_DEPENDENCIES,
        json!({
            "execution_type": "sequential",
            "confidence": 0.95,
            "reasoning": "cadence needs search results and email; enrollment needs the cadence",
            "dependencies": {"step_2": ["step_0", "step_1"], "step_3": ["step_2"]}
        }),
    );
    llm.script_json(
        purpose::GENERATE_EMAIL,
        json!({"subject": "Quick intro", "body": "Hi [first_name], short note."}),
    );
    crm.script(
        "search_contacts",
        Ok(json!({"contacts": [
            {"id": "11", "name": "Asha", "designation": "CTO", "company_name": "FinServe"},
            {"id": "12", "name": "Vik", "designation": "CTO", "company_name": "PayCo"}
        ]})),
    );
    crm.script("create_cadence", Ok(json!({"_id": {"$oid": "cad-1"}})));
    crm.script("create_cadence_step", Ok(json!({"sequence": {"steps": 1}})));
    crm.script("add_contacts_to_cadence", Ok(json!({"status": "ok"})));

    let session = "s-campaign";
    let review = collect(
        &agent,
        "Find CTOs in fintech, write them a professional email, create 'Fintech AI' \
         starting Monday 10:00 business days, add them.",
        session,
    )
    .await;
    let (plan, plan_id) = plan_review(&review);
    assert_eq!(plan["execution_type"], "sequential");
    assert_eq!(plan["steps"][2]["depends_on"], json!(["step_0", "step_1"]));
    assert_eq!(plan["steps"][3]["depends_on"], json!(["step_2"]));

    let events = collect(&agent, &format!("APPROVE_PLAN:{plan_id}"), session).await;
    let statuses = progress_statuses(&events);
    let completed: Vec<&String> = statuses
        .iter()
        .filter(|(_, s)| *s == StepStatus::Completed)
        .map(|(id, _)| id)
        .collect();
    assert_eq!(completed.len(), 4, "all four steps complete: {statuses:?}");

    // Dependency injection: the cadence step's template equals the email.
    let calls = crm.calls();
    let step_call = calls
        .iter()
        .find(|(method, _)| method == "create_cadence_step")
        .expect("cadence step created");
    assert_eq!(step_call.1["subject"], "Quick intro");
    assert_eq!(step_call.1["body"], "Hi [first_name], short note.");
    assert_eq!(step_call.1["sequenceId"], "cad-1");

    // The enrollment call carries the cadence id and the searched ids.
    let add_call = calls
        .iter()
        .find(|(method, _)| method == "add_contacts_to_cadence")
        .expect("contacts added");
    assert_eq!(add_call.1["sequenceId"], "cad-1");
    assert_eq!(add_call.1["recipients_ids"], json!(["11", "12"]));

    let result = final_result(&events);
    assert_eq!(result.tool_outputs.len(), 4);
    let cadence_output = result
        .tool_outputs
        .iter()
        .find(|o| o["tool_name"] == "create_cadence")
        .unwrap();
    assert_eq!(cadence_output["result"]["cadence_id"], "cad-1");
}

/// **Scenario E**: Failure isolation. One of two parallel searches hits a
/// 500; it records status=failed, the sibling succeeds, the final result
/// reports both outcomes and no retry happens.
#[tokio::test]
async fn failure_isolation() {
    let (agent, llm, crm) = build_agent();
    llm.script(
        purpose::AGENT,
        ChatOutcome::with_tool_calls(
            "",
            vec![
                ToolCall::new("c0", "search_leads", json!({"designation": ["CEO"]})),
                ToolCall::new("c1", "search_companies", json!({"industry": ["Retail"]})),
            ],
        ),
    );
    llm.script_json(
        purpose::ANALYZE_DEPENDENCIES,
        json!({"execution_type": "parallel", "confidence": 0.9, "reasoning": "", "dependencies": {}}),
    );
    crm.script(
        "search_contacts",
        Ok(json!({"contacts": [{"id": "5", "name": "Lee"}]})),
    );
    crm.script(
        "search_companies",
        Err(CrmError::Api {
            status: 500,
            message: "internal error".into(),
        }),
    );

    let session = "s-failure";
    let review = collect(&agent, "Find CEOs and retail companies", session).await;
    let (_, plan_id) = plan_review(&review);
    let events = collect(&agent, &format!("APPROVE_PLAN:{plan_id}"), session).await;

    let statuses = progress_statuses(&events);
    assert!(statuses
        .iter()
        .any(|(_, s)| *s == StepStatus::Completed));
    assert!(statuses.iter().any(|(_, s)| *s == StepStatus::Failed));

    let result = final_result(&events);
    assert_eq!(result.tool_outputs.len(), 2, "both outcomes reported");
    let failed = result
        .tool_outputs
        .iter()
        .find(|o| o["result"]["status"] == "failed")
        .expect("failed output present");
    assert_eq!(failed["result"]["kind"], "provider-error");
    assert!(result.message.contains("1 step(s) failed."));

    // No retry: exactly one search_companies call reached the CRM.
    let company_calls = crm
        .calls()
        .iter()
        .filter(|(m, _)| m == "search_companies")
        .count();
    assert_eq!(company_calls, 1);
}

/// **Scenario F**: Empty-result chain. search_companies depends on an
/// empty search_leads and still runs; the cadence is created; enrollment
/// fails with invalid-arguments since no recipients exist anywhere.
#[tokio::test]
async fn empty_result_chain() {
    let (agent, llm, crm) = build_agent();
    llm.script(
        purpose::AGENT,
        ChatOutcome::with_tool_calls(
            "",
            vec![
                ToolCall::new("c0", "search_leads", json!({"designation": ["CTO"]})),
                ToolCall::new("c1", "search_companies", json!({})),
                ToolCall::new("c2", "create_cadence", json!({"name": "Empty Chain"})),
                ToolCall::new("c3", "add_contacts_to_cadence", json!({})),
            ],
        ),
    );
    llm.script_json(
        purpose::ANALYZE_DEPENDENCIES,
        json!({
            "execution_type": "sequential",
            "confidence": 0.9,
            "reasoning": "companies from found contacts; enrollment after cadence",
            "dependencies": {"step_1": ["step_0"], "step_3": ["step_2"]}
        }),
    );
    crm.script("search_contacts", Ok(json!({"contacts": []})));
    crm.script("search_companies", Ok(json!({"companies": []})));
    crm.script("create_cadence", Ok(json!({"_id": "cad-9"})));

    let session = "s-empty";
    let review = collect(&agent, "Find CTOs, their companies, and launch a cadence", session).await;
    let (_, plan_id) = plan_review(&review);
    let events = collect(&agent, &format!("APPROVE_PLAN:{plan_id}"), session).await;

    let result = final_result(&events);
    assert_eq!(result.tool_outputs.len(), 4, "full chain reported");

    // The dependent company search ran despite the empty lead search.
    let company_output = result
        .tool_outputs
        .iter()
        .find(|o| o["tool_name"] == "search_companies")
        .unwrap();
    assert_eq!(company_output["result"]["companies_found"], json!(null));
    assert_eq!(company_output["result"]["total_companies"], 0);

    // Enrollment failed before any outbound call: no recipients anywhere.
    let add_output = result
        .tool_outputs
        .iter()
        .find(|o| o["tool_name"] == "add_contacts_to_cadence")
        .unwrap();
    assert_eq!(add_output["result"]["status"], "failed");
    assert_eq!(add_output["result"]["kind"], "invalid-arguments");
    assert!(!crm
        .calls()
        .iter()
        .any(|(m, _)| m == "add_contacts_to_cadence"));
}

/// **Scenario**: The agent LLM failing entirely still ends the turn with
/// a plain-text reply and no plan.
#[tokio::test]
async fn agent_llm_failure_yields_text() {
    let (agent, _llm, _crm) = build_agent();
    // Nothing scripted: the agent call itself fails.
    let events = collect(&agent, "hello?", "s-llm-down").await;
    let result = final_result(&events);
    assert_eq!(result.kind, ResponseKind::TextResponse);
    assert!(result.message.contains("network error"));
    assert!(has_done(&events));
}
