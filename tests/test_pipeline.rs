//! Appeal pipeline behaviour with scripted model replies
//!
//! Each test scripts the five roles and checks what flows through session
//! state: evidence into the writer, the latest letter into the presenter,
//! and how the refinement loop reacts to approval and to its cap.

use async_trait::async_trait;
use claim_ally::app::ClaimAlly;
use claim_ally::config::AppConfig;
use claim_ally::eligibility::FixedClock;
use claim_ally::error::AppealError;
use claim_ally::llm::provider::LlmError;
use claim_ally::session::keys;
use claim_ally::testing::{date, ScriptedLlmProvider, ScriptedReply};
use claim_ally::tools::{Tool, ToolContext, ToolDescription, ToolError};
use serde_json::{json, Value};
use std::sync::Arc;

const RESEARCHER: &str = "ResearchAssistant";
const WRITER: &str = "LetterWriter";
const REVIEWER: &str = "reviewer";
const REFINER: &str = "RefinerAgent";
const PRESENTER: &str = "FinalOutputPresenter";

fn app_with(provider: Arc<ScriptedLlmProvider>, search: Option<Arc<dyn Tool>>) -> ClaimAlly {
    ClaimAlly::new(
        AppConfig::default(),
        provider,
        Arc::new(FixedClock(date(2026, 10, 19))),
        search,
    )
}

fn text(s: &str) -> ScriptedReply {
    ScriptedReply::text(s)
}

fn exit_loop() -> ScriptedReply {
    ScriptedReply::tool_call("exit_loop", json!({}))
}

fn system_prompt(request: &claim_ally::llm::provider::CompletionRequest) -> &str {
    &request.messages[0].content
}

#[tokio::test]
async fn test_approval_on_first_pass_ends_loop() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("MRI is covered when conservative therapy fails.")])
            .script(WRITER, vec![text("Letter v1")])
            .script(REVIEWER, vec![text("APPROVED")])
            .script(REFINER, vec![exit_loop()])
            .script(PRESENTER, vec![text("Final letter v1")]),
    );
    let app = app_with(provider.clone(), None);

    let draft = app
        .draft_letter("2026-05-01", "POL-77", "not medically necessary")
        .await
        .unwrap();

    assert_eq!(draft.letter, "Final letter v1");
    assert_eq!(provider.requests_for(REVIEWER).await.len(), 1);
    assert_eq!(provider.requests_for(REFINER).await.len(), 1);

    // Exit signal leaves the letter untouched
    assert_eq!(draft.state.get(keys::APPEAL_LETTER), Some("Letter v1"));
    assert_eq!(draft.state.get(keys::REVIEW_RESULT), Some("APPROVED"));
    assert_eq!(draft.state.get(keys::DENIAL_DATE), Some("2026-05-01"));

    let writer = &provider.requests_for(WRITER).await[0];
    assert!(system_prompt(writer).contains("MRI is covered when conservative therapy fails."));
    assert!(writer.messages[1].content.contains("POL-77"));

    let presenter = &provider.requests_for(PRESENTER).await[0];
    assert!(system_prompt(presenter).contains("Letter v1"));
}

#[tokio::test]
async fn test_loop_stops_at_cap_and_forwards_last_letter() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("evidence")])
            .script(WRITER, vec![text("Letter v1")])
            .script(
                REVIEWER,
                vec![text("Too informal."), text("Cite the policy."), text("Still weak.")],
            )
            .script(
                REFINER,
                vec![text("Letter v2"), text("Letter v3"), text("Letter v4")],
            )
            .script(PRESENTER, vec![text("Final letter v4")]),
    );
    let app = app_with(provider.clone(), None);

    let draft = app
        .draft_letter("2026-05-01", "POL-77", "out of network")
        .await
        .unwrap();

    assert_eq!(draft.letter, "Final letter v4");
    assert_eq!(provider.requests_for(REVIEWER).await.len(), 3);
    assert_eq!(provider.requests_for(REFINER).await.len(), 3);
    assert_eq!(draft.state.get(keys::APPEAL_LETTER), Some("Letter v4"));

    let refiner_calls = provider.requests_for(REFINER).await;
    assert!(system_prompt(&refiner_calls[1]).contains("Cite the policy."));

    let presenter = &provider.requests_for(PRESENTER).await[0];
    assert!(system_prompt(presenter).contains("Letter v4"));
}

#[tokio::test]
async fn test_approval_on_second_pass() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("evidence")])
            .script(WRITER, vec![text("Letter v1")])
            .script(REVIEWER, vec![text("Add the claim number."), text("APPROVED")])
            .script(REFINER, vec![text("Letter v2"), exit_loop()])
            .script(PRESENTER, vec![text("Final letter v2")]),
    );
    let app = app_with(provider.clone(), None);

    let draft = app
        .draft_letter("2026-05-01", "POL-77", "duplicate claim")
        .await
        .unwrap();

    assert_eq!(draft.letter, "Final letter v2");
    assert_eq!(provider.requests_for(REVIEWER).await.len(), 2);

    let second_review = &provider.requests_for(REVIEWER).await[1];
    assert!(system_prompt(second_review).contains("Letter v2"));
}

#[tokio::test]
async fn test_approval_with_trailing_newline_ends_loop() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("evidence")])
            .script(WRITER, vec![text("Letter v1")])
            .script(REVIEWER, vec![text("APPROVED\n")])
            .script(REFINER, vec![exit_loop()])
            .script(PRESENTER, vec![text("Final letter v1\n")]),
    );
    let app = app_with(provider.clone(), None);

    let draft = app
        .draft_letter("2026-05-01", "POL-77", "not medically necessary")
        .await
        .unwrap();

    assert_eq!(provider.requests_for(REVIEWER).await.len(), 1);
    assert_eq!(draft.state.get(keys::REVIEW_RESULT), Some("APPROVED"));
    assert_eq!(draft.letter, "Final letter v1");
}

#[tokio::test]
async fn test_configured_refinement_cap() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("evidence")])
            .script(WRITER, vec![text("Letter v1")])
            .script(REVIEWER, vec![text("Too vague."), text("Still vague.")])
            .script(REFINER, vec![text("Letter v2"), text("Letter v3")])
            .script(PRESENTER, vec![text("Final letter v3")]),
    );
    let mut config = AppConfig::default();
    config.pipeline.max_refinement_iterations = 2;
    let app = ClaimAlly::new(
        config,
        provider.clone(),
        Arc::new(FixedClock(date(2026, 10, 19))),
        None,
    );

    let draft = app
        .draft_letter("2026-05-01", "POL-77", "not covered")
        .await
        .unwrap();

    assert_eq!(provider.requests_for(REVIEWER).await.len(), 2);
    assert_eq!(provider.remaining(REVIEWER).await, 0);
    assert_eq!(draft.state.get(keys::APPEAL_LETTER), Some("Letter v3"));
}

#[tokio::test]
async fn test_exit_without_approval_is_ignored() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("evidence")])
            .script(WRITER, vec![text("Letter v1")])
            .script(
                REVIEWER,
                vec![text("Needs work."), text("Needs work."), text("Needs work.")],
            )
            .script(REFINER, vec![exit_loop(), text("Letter v2"), text("Letter v3")])
            .script(PRESENTER, vec![text("Final letter v3")]),
    );
    let app = app_with(provider.clone(), None);

    let draft = app
        .draft_letter("2026-05-01", "POL-77", "experimental treatment")
        .await
        .unwrap();

    assert_eq!(provider.requests_for(REVIEWER).await.len(), 3);
    assert_eq!(draft.state.get(keys::APPEAL_LETTER), Some("Letter v3"));
    assert_eq!(draft.letter, "Final letter v3");
}

#[tokio::test]
async fn test_model_error_names_failing_role() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("evidence")])
            .script(WRITER, vec![text("Letter v1")])
            .script(
                REVIEWER,
                vec![ScriptedReply::error(LlmError::HttpStatus {
                    status: 400,
                    body: "bad request".to_string(),
                })],
            ),
    );
    let app = app_with(provider.clone(), None);

    let error = app
        .draft_letter("2026-05-01", "POL-77", "not covered")
        .await
        .unwrap_err();

    match error {
        AppealError::Llm { agent, .. } => assert_eq!(agent, REVIEWER),
        other => panic!("expected model error, got {other:?}"),
    }
    assert!(provider.requests_for(PRESENTER).await.is_empty());
}

struct CannedSearch;

#[async_trait]
impl Tool for CannedSearch {
    fn describe(&self) -> ToolDescription {
        ToolDescription {
            name: "web_search".to_string(),
            description: "Search the web".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"query": {"type": "string"}},
                "required": ["query"]
            }),
        }
    }

    async fn execute(
        &self,
        parameters: &Value,
        _context: &mut ToolContext<'_>,
    ) -> Result<Value, ToolError> {
        Ok(json!({
            "query": parameters["query"],
            "results": [{"title": "State appeal rights", "url": "https://example.com/appeals"}]
        }))
    }
}

#[tokio::test]
async fn test_researcher_uses_search_results() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(
                RESEARCHER,
                vec![
                    ScriptedReply::tool_call("web_search", json!({"query": "MRI medical necessity appeal"})),
                    text("Evidence with sources"),
                ],
            )
            .script(WRITER, vec![text("Letter v1")])
            .script(REVIEWER, vec![text("APPROVED")])
            .script(REFINER, vec![exit_loop()])
            .script(PRESENTER, vec![text("Final")]),
    );
    let app = app_with(provider.clone(), Some(Arc::new(CannedSearch)));

    let draft = app
        .draft_letter("2026-05-01", "POL-77", "not medically necessary")
        .await
        .unwrap();

    assert_eq!(draft.state.get(keys::EVIDENCE), Some("Evidence with sources"));

    let research = provider.requests_for(RESEARCHER).await;
    assert_eq!(research.len(), 2);
    let tools = research[0].tools.as_ref().expect("researcher offers tools");
    assert_eq!(tools[0].name, "web_search");
    let feedback = &research[1].messages.last().unwrap().content;
    assert!(feedback.contains("Tool web_search returned"));
    assert!(feedback.contains("State appeal rights"));
}

#[tokio::test]
async fn test_researcher_without_search_offers_no_tools() {
    let provider = Arc::new(
        ScriptedLlmProvider::new()
            .script(RESEARCHER, vec![text("evidence")])
            .script(WRITER, vec![text("Letter v1")])
            .script(REVIEWER, vec![text("APPROVED")])
            .script(REFINER, vec![exit_loop()])
            .script(PRESENTER, vec![text("Final")]),
    );
    let app = app_with(provider.clone(), None);

    app.draft_letter("2026-05-01", "POL-77", "not covered")
        .await
        .unwrap();

    assert!(provider.requests_for(RESEARCHER).await[0].tools.is_none());
}
