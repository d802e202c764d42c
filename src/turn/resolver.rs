//! Answer call requests locally.

use serde_json::json;
use tracing::{debug, warn};

use crate::gemini::types::{FunctionCall, FunctionResponse};
use crate::tools::{ReminderArgs, SET_REMINDER};

/// How a call request is answered.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Text that replaces the in-flight message right away
    pub confirmation: Option<String>,
    /// Synthetic result sent back to the model
    pub response: FunctionResponse,
}

pub fn resolve(call: &FunctionCall) -> Resolution {
    match call.name.as_str() {
        SET_REMINDER => {
            let args = ReminderArgs::from_value(&call.args);
            debug!(task = %args.task, datetime = %args.datetime, "Resolving reminder");
            Resolution {
                confirmation: Some(args.confirmation()),
                response: FunctionResponse {
                    name: call.name.clone(),
                    response: args.success_response(),
                },
            }
        }
        other => {
            warn!(name = other, "Model requested an unknown function");
            Resolution {
                confirmation: None,
                response: FunctionResponse {
                    name: call.name.clone(),
                    response: json!({
                        "success": false,
                        "error": format!("Unknown function: {}", other),
                    }),
                },
            }
        }
    }
}
