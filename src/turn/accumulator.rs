//! Fold a fragment stream into the in-flight model message.

use futures::StreamExt;
use tracing::debug;

use crate::conversation::{ConversationStore, Part};
use crate::gemini::types::{FunctionCall, WirePart};
use crate::gemini::{BackendError, Fragment, FragmentStream};

/// Result of one streaming pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamOutcome {
    /// Concatenated text deltas
    pub text: String,
    /// First call request of the pass
    pub call_request: Option<FunctionCall>,
    /// Thought signature that came with `call_request`
    pub call_signature: Option<String>,
    /// Call requests seen after the first
    pub dropped_calls: usize,
}

impl StreamOutcome {
    /// The reply as it is recorded in the session history.
    pub fn wire_parts(&self) -> Vec<WirePart> {
        let mut parts = Vec::new();
        if !self.text.is_empty() {
            parts.push(WirePart::text(self.text.clone()));
        }
        if let Some(call) = &self.call_request {
            parts.push(WirePart::FunctionCall {
                function_call: call.clone(),
                thought_signature: self.call_signature.clone(),
            });
        }
        parts
    }
}

/// Per-pass accumulation state.
///
/// Every text delta republishes the whole buffer as the message's only part.
/// Once a call request is retained the message belongs to the resolver, so
/// later deltas of the same pass are buffered but not published.
pub struct StreamAccumulator<'a> {
    store: &'a ConversationStore,
    message_id: &'a str,
    outcome: StreamOutcome,
}

impl<'a> StreamAccumulator<'a> {
    pub fn new(store: &'a ConversationStore, message_id: &'a str) -> Self {
        Self {
            store,
            message_id,
            outcome: StreamOutcome::default(),
        }
    }

    /// Apply one fragment. Returns the call request if this fragment is the
    /// first one of the pass.
    pub fn apply(&mut self, fragment: Fragment) -> Option<&FunctionCall> {
        match fragment {
            Fragment::Text(delta) => {
                self.outcome.text.push_str(&delta);
                if self.outcome.call_request.is_none() {
                    self.store.replace_parts(
                        self.message_id,
                        vec![Part::text(self.outcome.text.clone())],
                    );
                }
                None
            }
            Fragment::CallRequest {
                call,
                thought_signature,
            } => {
                if self.outcome.call_request.is_some() {
                    self.outcome.dropped_calls += 1;
                    debug!(name = %call.name, "Dropping additional call request");
                    return None;
                }
                debug!(name = %call.name, signed = thought_signature.is_some(), "Retained call request");
                self.outcome.call_request = Some(call);
                self.outcome.call_signature = thought_signature;
                self.outcome.call_request.as_ref()
            }
        }
    }

    pub fn finish(self) -> StreamOutcome {
        self.outcome
    }
}

/// Run one pass over `stream`, calling `on_call` as soon as the first call
/// request arrives. A stream error aborts the pass.
pub async fn accumulate<F>(
    store: &ConversationStore,
    message_id: &str,
    mut stream: FragmentStream,
    mut on_call: F,
) -> Result<StreamOutcome, BackendError>
where
    F: FnMut(&FunctionCall),
{
    let mut acc = StreamAccumulator::new(store, message_id);
    while let Some(fragment) = stream.next().await {
        if let Some(call) = acc.apply(fragment?) {
            on_call(call);
        }
    }

    let outcome = acc.finish();
    debug!(
        chars = outcome.text.len(),
        call = outcome.call_request.is_some(),
        dropped = outcome.dropped_calls,
        "Stream pass complete"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::Message;
    use futures::stream;
    use serde_json::json;

    fn setup() -> (ConversationStore, String) {
        let store = ConversationStore::new();
        let placeholder = Message::model_placeholder();
        let id = placeholder.id.clone();
        store.append(placeholder);
        (store, id)
    }

    fn call(name: &str) -> Fragment {
        Fragment::CallRequest {
            call: FunctionCall {
                name: name.into(),
                args: json!({}),
            },
            thought_signature: None,
        }
    }

    fn signed_call(name: &str, signature: &str) -> Fragment {
        Fragment::CallRequest {
            call: FunctionCall {
                name: name.into(),
                args: json!({}),
            },
            thought_signature: Some(signature.into()),
        }
    }

    fn text(s: &str) -> Fragment {
        Fragment::Text(s.into())
    }

    #[tokio::test]
    async fn test_final_text_is_ordered_concatenation() {
        let (store, id) = setup();
        let fragments = vec![Ok(text("The ")), Ok(text("quick ")), Ok(text("fox"))];

        let outcome = accumulate(&store, &id, stream::iter(fragments).boxed(), |_| {})
            .await
            .unwrap();

        assert_eq!(outcome.text, "The quick fox");
        let snap = store.snapshot();
        assert_eq!(snap.message(&id).unwrap().parts, vec![Part::text("The quick fox")]);
    }

    #[tokio::test]
    async fn test_published_buffer_only_grows() {
        let (store, id) = setup();
        let mut rx = store.subscribe();
        let mut acc = StreamAccumulator::new(&store, &id);

        let mut seen = Vec::new();
        for delta in ["a", "b", "c"] {
            acc.apply(text(delta));
            seen.push(rx.borrow_and_update().message(&id).unwrap().text());
        }
        assert_eq!(seen, vec!["a", "ab", "abc"]);
    }

    #[tokio::test]
    async fn test_only_first_call_is_retained() {
        let (store, id) = setup();
        let fragments = vec![Ok(call("setReminder")), Ok(call("other")), Ok(call("third"))];
        let mut calls = Vec::new();

        let outcome = accumulate(&store, &id, stream::iter(fragments).boxed(), |c| {
            calls.push(c.name.clone())
        })
        .await
        .unwrap();

        assert_eq!(calls, vec!["setReminder"]);
        assert_eq!(outcome.call_request.unwrap().name, "setReminder");
        assert_eq!(outcome.dropped_calls, 2);
    }

    #[tokio::test]
    async fn test_text_after_call_is_not_published() {
        let (store, id) = setup();
        let mut acc = StreamAccumulator::new(&store, &id);
        acc.apply(text("Let me "));
        acc.apply(call("setReminder"));
        store.replace_parts(&id, vec![Part::text("confirmed")]);
        acc.apply(text("do that."));

        assert_eq!(store.snapshot().message(&id).unwrap().text(), "confirmed");
        let outcome = acc.finish();
        assert_eq!(outcome.text, "Let me do that.");
        assert_eq!(outcome.wire_parts().len(), 2);
    }

    #[tokio::test]
    async fn test_stream_error_aborts_pass() {
        let (store, id) = setup();
        let fragments = vec![
            Ok(text("partial")),
            Err(BackendError::Decode("boom".into())),
            Ok(text("never")),
        ];

        let err = accumulate(&store, &id, stream::iter(fragments).boxed(), |_| {})
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Decode(_)));
        assert_eq!(store.snapshot().message(&id).unwrap().text(), "partial");
    }

    #[tokio::test]
    async fn test_wire_parts_keep_call_signature() {
        let (store, id) = setup();
        let fragments = vec![
            Ok(text("On it.")),
            Ok(signed_call("setReminder", "c2lnLTE=")),
            Ok(signed_call("other", "c2lnLTI=")),
        ];

        let outcome = accumulate(&store, &id, stream::iter(fragments).boxed(), |_| {})
            .await
            .unwrap();

        let wire = serde_json::to_value(outcome.wire_parts()).unwrap();
        assert_eq!(
            wire,
            json!([
                {"text": "On it."},
                {"functionCall": {"name": "setReminder", "args": {}}, "thoughtSignature": "c2lnLTE="}
            ])
        );
    }

    #[test]
    fn test_empty_outcome_has_no_wire_parts() {
        assert!(StreamOutcome::default().wire_parts().is_empty());
    }
}
