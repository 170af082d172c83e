//! Task dispatch: routes an authenticated request to one of the four task
//! handlers and persists each generated answer.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::answer_store::AnswerStore;
use crate::error::{GatewayError, GatewayResult};
use crate::generation::GenerationBackend;
use crate::tool;

const QA_SYSTEM_PROMPT: &str = "You are a concise Q&A assistant.";
const QA_TEMPERATURE: f32 = 0.2;
const PLATFORM_TEMPERATURE: f32 = 0.7;
const IMAGE_PLACEHOLDER: &str = "[image generated]";
const NO_ANSWERS_SENTINEL: &str = "no answers yet";

/// Body of `POST /ai-task`. The discriminant stays a free string so an
/// unknown value maps to a validation failure (400), not a body parse error.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub extras: Option<Value>,
}

/// What a handled task returns to the HTTP edge.
#[derive(Debug, Clone, Serialize)]
pub struct TaskOutcome {
    pub task: String,
    pub data: Value,
}

/// Style directives keyed by lower-cased platform name. Unrecognized
/// platforms fall back to the neutral style.
fn platform_style(platform: &str) -> &'static str {
    match platform.to_lowercase().as_str() {
        "twitter" | "x" => {
            "Short, punchy, <=280 chars, add relevant hashtag and emoji if appropriate."
        }
        "facebook" => "Friendly paragraph, 1-2 sentences, add call-to-action.",
        "linkedin" => "Professional tone, 2-3 sentences, value-focused, no slang.",
        "instagram" => "Casual, vibe-forward, include 2-3 tasteful hashtags.",
        "tiktok" => "High energy hook + 1 line idea for visuals; 1-2 hashtags.",
        "reddit" => "Neutral, discussion-starting, avoid emojis.",
        "medium" => "Thoughtful intro paragraph, 3-5 sentences.",
        _ => "Neutral style.",
    }
}

/// State-free router over the four tasks. The backend and store are injected,
/// never global.
pub struct TaskDispatcher {
    backend: Arc<dyn GenerationBackend>,
    store: AnswerStore,
    tool_hint_enabled: bool,
}

impl TaskDispatcher {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: AnswerStore,
        tool_hint_enabled: bool,
    ) -> Self {
        Self {
            backend,
            store,
            tool_hint_enabled,
        }
    }

    pub async fn dispatch(&self, req: TaskRequest) -> GatewayResult<TaskOutcome> {
        match req.task.as_str() {
            "qa" => self.run_qa(req).await,
            "latest" => self.run_latest(),
            "image" => self.run_image(req).await,
            "platform_content" => self.run_platform_content(req).await,
            other => Err(GatewayError::validation(format!("unknown task {other}"))),
        }
    }

    async fn run_qa(&self, req: TaskRequest) -> GatewayResult<TaskOutcome> {
        let prompt = required_field(req.prompt.as_deref(), "prompt is required for qa")?;

        let user = if self.tool_hint_enabled {
            match tool::upper_hint(prompt) {
                Ok(hint) => format!("({hint})\n{prompt}"),
                Err(e) => {
                    tracing::warn!("tool hint skipped: {e}");
                    prompt.to_string()
                }
            }
        } else {
            prompt.to_string()
        };

        let answer = self
            .backend
            .chat(QA_SYSTEM_PROMPT, &user, QA_TEMPERATURE)
            .await?;
        self.store.save("qa", &answer)?;
        Ok(TaskOutcome {
            task: "qa".to_string(),
            data: json!({ "answer": answer }),
        })
    }

    fn run_latest(&self) -> GatewayResult<TaskOutcome> {
        let data = match self.store.latest()? {
            Some(row) => json!({
                "id": row.id,
                "task": row.task,
                "content": row.content,
                "created_at_ms": row.created_at_ms,
            }),
            None => json!({ "message": NO_ANSWERS_SENTINEL }),
        };
        Ok(TaskOutcome {
            task: "latest".to_string(),
            data,
        })
    }

    async fn run_image(&self, req: TaskRequest) -> GatewayResult<TaskOutcome> {
        let prompt = required_field(req.prompt.as_deref(), "prompt is required for image")?;
        let image_b64 = self.backend.generate_image(prompt).await?;
        // The table stores a placeholder, never the image payload itself.
        self.store.save("image", IMAGE_PLACEHOLDER)?;
        Ok(TaskOutcome {
            task: "image".to_string(),
            data: json!({ "image_b64": image_b64 }),
        })
    }

    async fn run_platform_content(&self, req: TaskRequest) -> GatewayResult<TaskOutcome> {
        let prompt = required_field(req.prompt.as_deref(), "prompt and platform are required")?;
        let platform = required_field(req.platform.as_deref(), "prompt and platform are required")?;

        let system = format!(
            "You craft platform-tailored content. Style guide: {}",
            platform_style(platform)
        );
        let text = self
            .backend
            .chat(&system, prompt, PLATFORM_TEMPERATURE)
            .await?;
        self.store.save("platform_content", &text)?;
        Ok(TaskOutcome {
            task: "platform_content".to_string(),
            data: json!({ "text": text }),
        })
    }
}

fn required_field<'a>(value: Option<&'a str>, msg: &str) -> GatewayResult<&'a str> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(GatewayError::validation(msg)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::MockBackend;

    fn dispatcher_with(backend: Arc<MockBackend>) -> (tempfile::TempDir, TaskDispatcher) {
        let dir = tempfile::tempdir().unwrap();
        let store = AnswerStore::new(dir.path().join("answers.db")).unwrap();
        let dispatcher = TaskDispatcher::new(backend, store, false);
        (dir, dispatcher)
    }

    fn request(task: &str, prompt: Option<&str>, platform: Option<&str>) -> TaskRequest {
        TaskRequest {
            task: task.to_string(),
            prompt: prompt.map(str::to_string),
            platform: platform.map(str::to_string),
            extras: None,
        }
    }

    #[tokio::test]
    async fn qa_answers_and_persists() {
        let backend = Arc::new(MockBackend::new("4"));
        let (_dir, dispatcher) = dispatcher_with(Arc::clone(&backend));

        let outcome = dispatcher
            .dispatch(request("qa", Some("2+2?"), None))
            .await
            .unwrap();
        assert_eq!(outcome.task, "qa");
        assert_eq!(outcome.data["answer"], "4");

        let latest = dispatcher.dispatch(request("latest", None, None)).await.unwrap();
        assert_eq!(latest.data["task"], "qa");
        assert_eq!(latest.data["content"], "4");

        let calls = backend.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].system, QA_SYSTEM_PROMPT);
        assert_eq!(calls[0].temperature, QA_TEMPERATURE);
    }

    #[tokio::test]
    async fn qa_without_prompt_is_rejected_and_persists_nothing() {
        let backend = Arc::new(MockBackend::new("unused"));
        let (_dir, dispatcher) = dispatcher_with(Arc::clone(&backend));

        for prompt in [None, Some(""), Some("   ")] {
            let err = dispatcher
                .dispatch(request("qa", prompt, None))
                .await
                .unwrap_err();
            assert!(matches!(err, GatewayError::Validation(_)));
        }

        let latest = dispatcher.dispatch(request("latest", None, None)).await.unwrap();
        assert_eq!(latest.data["message"], "no answers yet");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn latest_on_empty_store_returns_sentinel() {
        let backend = Arc::new(MockBackend::new("unused"));
        let (_dir, dispatcher) = dispatcher_with(backend);

        let outcome = dispatcher.dispatch(request("latest", None, None)).await.unwrap();
        assert_eq!(outcome.task, "latest");
        assert_eq!(outcome.data["message"], "no answers yet");
    }

    #[tokio::test]
    async fn latest_tracks_the_most_recent_call() {
        let backend = Arc::new(MockBackend::new("reply"));
        let (_dir, dispatcher) = dispatcher_with(backend);

        dispatcher
            .dispatch(request("qa", Some("first"), None))
            .await
            .unwrap();
        dispatcher
            .dispatch(request("image", Some("a cat"), None))
            .await
            .unwrap();
        dispatcher
            .dispatch(request("platform_content", Some("launch"), Some("reddit")))
            .await
            .unwrap();

        let latest = dispatcher.dispatch(request("latest", None, None)).await.unwrap();
        assert_eq!(latest.data["task"], "platform_content");
        assert_eq!(latest.data["content"], "reply");
    }

    #[tokio::test]
    async fn image_returns_payload_but_persists_placeholder() {
        let backend = Arc::new(MockBackend::new("unused"));
        let (_dir, dispatcher) = dispatcher_with(backend);

        let outcome = dispatcher
            .dispatch(request("image", Some("a lighthouse"), None))
            .await
            .unwrap();
        assert_eq!(outcome.data["image_b64"], "bW9jay1pbWFnZQ==");

        let latest = dispatcher.dispatch(request("latest", None, None)).await.unwrap();
        assert_eq!(latest.data["task"], "image");
        assert_eq!(latest.data["content"], IMAGE_PLACEHOLDER);
    }

    #[tokio::test]
    async fn platform_lookup_is_case_insensitive() {
        let backend = Arc::new(MockBackend::new("tweet"));
        let (_dir, dispatcher) = dispatcher_with(Arc::clone(&backend));

        dispatcher
            .dispatch(request("platform_content", Some("launch"), Some("twitter")))
            .await
            .unwrap();
        dispatcher
            .dispatch(request("platform_content", Some("launch"), Some("TWITTER")))
            .await
            .unwrap();

        let calls = backend.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].system, calls[1].system);
        assert_eq!(calls[0].temperature, PLATFORM_TEMPERATURE);
    }

    #[tokio::test]
    async fn unknown_platform_falls_back_to_neutral_style() {
        let backend = Arc::new(MockBackend::new("post"));
        let (_dir, dispatcher) = dispatcher_with(Arc::clone(&backend));

        let outcome = dispatcher
            .dispatch(request("platform_content", Some("launch"), Some("myspace")))
            .await
            .unwrap();
        assert_eq!(outcome.data["text"], "post");

        let calls = backend.calls();
        assert!(calls[0].system.contains("Neutral style."));
    }

    #[tokio::test]
    async fn platform_content_requires_both_fields() {
        let backend = Arc::new(MockBackend::new("unused"));
        let (_dir, dispatcher) = dispatcher_with(backend);

        let err = dispatcher
            .dispatch(request("platform_content", Some("launch"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));

        let err = dispatcher
            .dispatch(request("platform_content", None, Some("reddit")))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_task_is_a_validation_error() {
        let backend = Arc::new(MockBackend::new("unused"));
        let (_dir, dispatcher) = dispatcher_with(backend);

        let err = dispatcher
            .dispatch(request("summarize", Some("text"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
    }

    #[tokio::test]
    async fn upstream_failure_propagates_and_persists_nothing() {
        let backend = Arc::new(MockBackend::failing());
        let dir = tempfile::tempdir().unwrap();
        let store = AnswerStore::new(dir.path().join("answers.db")).unwrap();
        let dispatcher = TaskDispatcher::new(backend, store.clone(), false);

        let err = dispatcher
            .dispatch(request("qa", Some("2+2?"), None))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
        assert!(store.latest().unwrap().is_none());
    }

    #[tokio::test]
    async fn tool_hint_prefixes_the_user_message() {
        let backend = Arc::new(MockBackend::new("4"));
        let dir = tempfile::tempdir().unwrap();
        let store = AnswerStore::new(dir.path().join("answers.db")).unwrap();
        let dispatcher = TaskDispatcher::new(backend.clone(), store, true);

        dispatcher
            .dispatch(request("qa", Some("2+2?"), None))
            .await
            .unwrap();

        let calls = backend.calls();
        assert!(calls[0].user.starts_with("(upper tool says: 2+2?"));
        assert!(calls[0].user.ends_with("2+2?"));
    }
}
