//! USSD and IVR access channel routes.
//!
//! Both channels are stateless on the wire: the gateway re-invokes the
//! endpoint on every keystroke or call event, and conversational position
//! lives entirely in the session store under the gateway-issued id. Each
//! handler performs exactly one engine step per request, holding the
//! per-session lock across its read-step-write sequence so concurrent
//! retries for the same session cannot lose an update.
//!
//! The handlers always answer HTTP 200 with a well-formed body. Internal
//! failures surface as localized dialogue text, never as protocol errors;
//! the telecom side of a USSD or IVR session must always receive something
//! to show or play.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use farmline_core::{Language, SessionRecord, StepOutcome};

use crate::state::AppState;

/// Create access channel router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/access-channels/ussd", post(handle_ussd))
        .route("/access-channels/ivr", post(handle_ivr))
}

// --- USSD ---

#[derive(Debug, Deserialize)]
pub struct UssdRequest {
    pub session_id: String,
    pub phone_number: String,
    /// What the user dialed; empty or absent on the opening request.
    pub user_input: Option<String>,
    /// Sent by some gateways; not used for routing.
    #[allow(dead_code)]
    pub service_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UssdResponse {
    pub session_id: String,
    /// Prefixed `CON ` while the session continues, `END ` once it ends.
    /// The gateway keys telecom-side session control off that prefix.
    pub message: String,
}

/// Handle one USSD keystroke
pub async fn handle_ussd(
    State(state): State<Arc<AppState>>,
    Json(req): Json<UssdRequest>,
) -> Json<UssdResponse> {
    let input = req.user_input.as_deref().unwrap_or("");
    info!(session_id = %req.session_id, phone = %req.phone_number, "ussd event");

    let outcome = step_session(&state, &req.session_id, input).await;

    let prefix = if outcome.terminal { "END" } else { "CON" };
    Json(UssdResponse {
        session_id: req.session_id,
        message: format!("{prefix} {}", outcome.text),
    })
}

// --- IVR ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IvrEventType {
    NewCall,
    DtmfInput,
    SpeechTranscribed,
}

#[derive(Debug, Deserialize)]
pub struct IvrEventRequest {
    pub call_id: String,
    pub phone_number: String,
    pub event_type: IvrEventType,
    /// DTMF digits entered by the caller.
    pub dtmf_input: Option<String>,
    /// Transcribed text from the caller's speech.
    pub speech_to_text_result: Option<String>,
    /// Caller's preferred language, when the gateway knows it.
    pub language_preference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IvrResponse {
    pub call_id: String,
    /// Executed by the telephony gateway in array order.
    pub actions: Vec<IvrAction>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum IvrAction {
    PlayAudio { audio_config: AudioConfig },
    GetInput {
        input_type: &'static str,
        max_digits: u8,
        timeout_ms: u32,
    },
    Hangup,
}

#[derive(Debug, Serialize)]
pub struct AudioConfig {
    /// Text for the gateway's TTS layer.
    pub text: String,
    pub language: &'static str,
}

const DTMF_TIMEOUT_MS: u32 = 5000;

impl IvrAction {
    fn play(text: String, language: Language) -> Self {
        IvrAction::PlayAudio {
            audio_config: AudioConfig {
                text,
                language: language.code(),
            },
        }
    }

    fn get_dtmf() -> Self {
        IvrAction::GetInput {
            input_type: "dtmf",
            max_digits: 1,
            timeout_ms: DTMF_TIMEOUT_MS,
        }
    }
}

/// Handle one IVR call event
pub async fn handle_ivr(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IvrEventRequest>,
) -> Json<IvrResponse> {
    info!(call_id = %req.call_id, phone = %req.phone_number, event = ?req.event_type, "ivr event");

    let outcome = match req.event_type {
        // Every call starts fresh regardless of any stored session under
        // this call id; a known language preference skips the language menu.
        IvrEventType::NewCall => bootstrap_call(&state, &req).await,
        IvrEventType::DtmfInput => {
            let input = req.dtmf_input.as_deref().unwrap_or("");
            step_session(&state, &req.call_id, input).await
        }
        // Transcribed speech is free text feeding whichever flow is awaiting
        // a region, crop, or description.
        IvrEventType::SpeechTranscribed => {
            let input = req.speech_to_text_result.as_deref().unwrap_or("");
            step_session(&state, &req.call_id, input).await
        }
    };

    let mut actions = vec![IvrAction::play(outcome.text, outcome.language)];
    if outcome.terminal {
        actions.push(IvrAction::Hangup);
    } else {
        actions.push(IvrAction::get_dtmf());
    }

    Json(IvrResponse {
        call_id: req.call_id,
        actions,
    })
}

/// Start a call at the language prompt, or straight at the main menu when
/// the gateway supplied a valid language preference.
async fn bootstrap_call(state: &AppState, req: &IvrEventRequest) -> StepOutcome {
    let _guard = state.sessions.lock(&req.call_id).await;
    // Discard any leftover record from a previous call with this id.
    state.sessions.delete(&req.call_id).await;

    let language = req
        .language_preference
        .as_deref()
        .and_then(Language::from_code);

    let record = SessionRecord::new(&req.call_id);
    let input = match language {
        // Replay the keystroke the preference stands in for.
        Some(Language::En) => "1",
        Some(Language::Am) => "2",
        None => "",
    };
    let outcome = state.engine.step(record, input).await;
    if let Some(record) = &outcome.record {
        state.sessions.write(record.clone()).await;
    }
    outcome
}

/// The shared read-step-write sequence, atomic per session id.
async fn step_session(state: &AppState, session_id: &str, input: &str) -> StepOutcome {
    let _guard = state.sessions.lock(session_id).await;
    let record = state.sessions.read(session_id).await;
    let outcome = state.engine.step(record, input).await;
    match &outcome.record {
        Some(record) => state.sessions.write(record.clone()).await,
        None => state.sessions.delete(session_id).await,
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use farmline_core::{DialogueState, MenuCatalog, PriceRecord, SessionStore, StaticPriceBook};
    use serde_json::{json, Value};

    fn test_state() -> Arc<AppState> {
        let prices = StaticPriceBook::new(vec![PriceRecord {
            region: "Oromia".to_string(),
            crop_type: "maize".to_string(),
            date: "2025-06-10".parse().unwrap(),
            price_per_kg: 18.5,
            currency: "ETB".to_string(),
        }]);
        AppState::with_parts(Config::default(), MenuCatalog::new().unwrap(), Arc::new(prices))
            .unwrap()
    }

    async fn ussd(state: &Arc<AppState>, session_id: &str, input: &str) -> UssdResponse {
        let req = UssdRequest {
            session_id: session_id.to_string(),
            phone_number: "+251900000000".to_string(),
            user_input: Some(input.to_string()),
            service_code: None,
        };
        handle_ussd(State(Arc::clone(state)), Json(req)).await.0
    }

    async fn ivr(state: &Arc<AppState>, req: Value) -> IvrResponse {
        let req: IvrEventRequest = serde_json::from_value(req).unwrap();
        handle_ivr(State(Arc::clone(state)), Json(req)).await.0
    }

    #[tokio::test]
    async fn ussd_opening_request_is_con_welcome() {
        let state = test_state();
        let resp = ussd(&state, "s1", "").await;
        assert!(resp.message.starts_with("CON "));
        assert!(resp.message.contains("select your language"));
        assert_eq!(resp.session_id, "s1");
    }

    #[tokio::test]
    async fn ussd_full_crop_info_session_ends_with_end_prefix() {
        let state = test_state();
        ussd(&state, "s1", "").await;
        ussd(&state, "s1", "1").await;
        ussd(&state, "s1", "1").await;
        ussd(&state, "s1", "Oromia").await;
        let resp = ussd(&state, "s1", "maize").await;
        assert!(resp.message.starts_with("END "));
        assert!(resp.message.contains("Crop: maize, Region: Oromia"));
        // Terminal step deletes the record.
        assert_eq!(state.sessions.active_count().await, 0);
    }

    #[tokio::test]
    async fn ussd_exit_then_retry_restarts_session() {
        let state = test_state();
        ussd(&state, "s1", "1").await;
        let resp = ussd(&state, "s1", "0").await;
        assert!(resp.message.starts_with("END "));
        assert!(resp.message.contains("Thank you"));
        assert_eq!(state.sessions.active_count().await, 0);

        // Same id, fresh session.
        let resp = ussd(&state, "s1", "").await;
        assert!(resp.message.starts_with("CON "));
        assert!(resp.message.contains("select your language"));
    }

    #[tokio::test]
    async fn ussd_market_price_round_trip() {
        let state = test_state();
        ussd(&state, "s1", "2").await;
        ussd(&state, "s1", "3").await;
        let resp = ussd(&state, "s1", "maize").await;
        assert!(resp.message.starts_with("END "));
        assert!(resp.message.contains("Oromia: 18.5 ETB (2025-06-10)"));
    }

    #[tokio::test]
    async fn ussd_unknown_crop_is_not_found() {
        let state = test_state();
        ussd(&state, "s1", "1").await;
        ussd(&state, "s1", "3").await;
        let resp = ussd(&state, "s1", "quinoa").await;
        assert!(resp.message.starts_with("END "));
        assert!(resp.message.contains("Not found"));
    }

    #[tokio::test]
    async fn ussd_missing_user_input_is_treated_as_empty() {
        let state = test_state();
        let req = UssdRequest {
            session_id: "s1".to_string(),
            phone_number: "+251900000000".to_string(),
            user_input: None,
            service_code: Some("*384#".to_string()),
        };
        let resp = handle_ussd(State(Arc::clone(&state)), Json(req)).await.0;
        assert!(resp.message.starts_with("CON "));
    }

    #[tokio::test]
    async fn ussd_sessions_are_independent() {
        let state = test_state();
        ussd(&state, "s1", "1").await;
        ussd(&state, "s2", "2").await;
        assert_eq!(state.sessions.read("s1").await.language, Some(Language::En));
        assert_eq!(state.sessions.read("s2").await.language, Some(Language::Am));
    }

    #[tokio::test]
    async fn ivr_new_call_without_preference_prompts_language() {
        let state = test_state();
        let resp = ivr(
            &state,
            json!({
                "call_id": "c1",
                "phone_number": "+251900000000",
                "event_type": "new_call"
            }),
        )
        .await;
        assert_eq!(resp.actions.len(), 2);
        let rendered = serde_json::to_value(&resp.actions).unwrap();
        assert_eq!(rendered[0]["action"], "play_audio");
        assert!(rendered[0]["audio_config"]["text"]
            .as_str()
            .unwrap()
            .contains("select your language"));
        assert_eq!(rendered[1]["action"], "get_input");
        assert_eq!(rendered[1]["input_type"], "dtmf");
    }

    #[tokio::test]
    async fn ivr_new_call_with_preference_skips_to_main_menu() {
        let state = test_state();
        let resp = ivr(
            &state,
            json!({
                "call_id": "c1",
                "phone_number": "+251900000000",
                "event_type": "new_call",
                "language_preference": "am"
            }),
        )
        .await;
        let rendered = serde_json::to_value(&resp.actions).unwrap();
        let text = rendered[0]["audio_config"]["text"].as_str().unwrap();
        assert!(text.contains("ዋና ምናሌ"));
        assert_eq!(rendered[0]["audio_config"]["language"], "am");
        assert_eq!(state.sessions.read("c1").await.state, DialogueState::MainMenu);
    }

    #[tokio::test]
    async fn ivr_new_call_discards_stale_session() {
        let state = test_state();
        // Leave a session mid-flow under this call id.
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "new_call"}),
        )
        .await;
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "dtmf_input", "dtmf_input": "1"}),
        )
        .await;
        assert_eq!(state.sessions.read("c1").await.state, DialogueState::MainMenu);

        // A new call under the same id starts over.
        let resp = ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "new_call"}),
        )
        .await;
        let rendered = serde_json::to_value(&resp.actions).unwrap();
        assert!(rendered[0]["audio_config"]["text"]
            .as_str()
            .unwrap()
            .contains("select your language"));
        assert_eq!(
            state.sessions.read("c1").await.state,
            DialogueState::AwaitingLanguage
        );
    }

    #[tokio::test]
    async fn ivr_dtmf_walks_the_same_state_machine_as_ussd() {
        let state = test_state();
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "new_call"}),
        )
        .await;
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "dtmf_input", "dtmf_input": "1"}),
        )
        .await;
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "dtmf_input", "dtmf_input": "2"}),
        )
        .await;
        assert_eq!(
            state.sessions.read("c1").await.state,
            DialogueState::PestHelpAwaitCrop
        );
    }

    #[tokio::test]
    async fn ivr_speech_feeds_text_awaiting_flows_and_terminal_hangs_up() {
        let state = test_state();
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "new_call", "language_preference": "en"}),
        )
        .await;
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "dtmf_input", "dtmf_input": "2"}),
        )
        .await;
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "speech_transcribed", "speech_to_text_result": "teff"}),
        )
        .await;
        let resp = ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "speech_transcribed", "speech_to_text_result": "leaves turning yellow"}),
        )
        .await;
        let rendered = serde_json::to_value(&resp.actions).unwrap();
        assert!(rendered[0]["audio_config"]["text"]
            .as_str()
            .unwrap()
            .contains("Pest for teff"));
        assert_eq!(rendered[1]["action"], "hangup");
        assert_eq!(state.sessions.active_count().await, 0);
    }

    #[tokio::test]
    async fn ivr_missing_dtmf_payload_is_invalid_input_not_error() {
        let state = test_state();
        ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "new_call", "language_preference": "en"}),
        )
        .await;
        let resp = ivr(
            &state,
            json!({"call_id": "c1", "phone_number": "p", "event_type": "dtmf_input"}),
        )
        .await;
        let rendered = serde_json::to_value(&resp.actions).unwrap();
        assert!(rendered[0]["audio_config"]["text"]
            .as_str()
            .unwrap()
            .contains("Invalid input"));
        assert_eq!(rendered[1]["action"], "get_input");
    }

    #[test]
    fn ivr_event_type_rejects_unknown_variants() {
        let parsed: Result<IvrEventType, _> = serde_json::from_str("\"call_dropped\"");
        assert!(parsed.is_err());
        let parsed: IvrEventType = serde_json::from_str("\"speech_transcribed\"").unwrap();
        assert_eq!(parsed, IvrEventType::SpeechTranscribed);
    }
}
