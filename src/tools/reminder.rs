//! The `setReminder` callable.
//!
//! Nothing is actually scheduled: the call is answered locally with a
//! confirmation for the user and a synthetic success result for the model.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::gemini::types::{FunctionDeclaration, Tool};

pub const SET_REMINDER: &str = "setReminder";

/// Accepted datetime layouts, tried in order after RFC 3339.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Declaration sent with chat-mode requests.
pub fn declaration() -> FunctionDeclaration {
    FunctionDeclaration {
        name: SET_REMINDER.to_string(),
        description: "Sets a reminder for the user. The function requires a task description \
                      and a specific date and time."
            .to_string(),
        parameters: json!({
            "type": "OBJECT",
            "properties": {
                "task": {
                    "type": "STRING",
                    "description": "A detailed description of the task for the reminder."
                },
                "datetime": {
                    "type": "STRING",
                    "description": "The exact date and time for the reminder in ISO 8601 format (e.g., YYYY-MM-DDTHH:mm:ss)."
                }
            },
            "required": ["task", "datetime"]
        }),
    }
}

/// The tool list for a session that offers reminders.
pub fn reminder_tools() -> Vec<Tool> {
    vec![Tool {
        function_declarations: vec![declaration()],
    }]
}

/// Arguments supplied by the model. Not validated: missing fields are empty
/// and non-string values are kept in their JSON form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReminderArgs {
    pub task: String,
    pub datetime: String,
}

impl ReminderArgs {
    pub fn from_value(args: &Value) -> Self {
        #[derive(Deserialize, Default)]
        struct Raw {
            #[serde(default)]
            task: Value,
            #[serde(default)]
            datetime: Value,
        }

        let raw: Raw = serde_json::from_value(args.clone()).unwrap_or_default();
        Self {
            task: value_to_string(raw.task),
            datetime: value_to_string(raw.datetime),
        }
    }

    /// Text shown in place of the in-flight reply.
    pub fn confirmation(&self) -> String {
        format!(
            "Okay, I've set a reminder for you to \"{}\" on {}.",
            self.task,
            format_datetime(&self.datetime)
        )
    }

    /// The result returned to the model.
    pub fn success_response(&self) -> Value {
        json!({
            "success": true,
            "message": format!("Reminder set for {} at {}", self.task, self.datetime),
        })
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// Render an ISO-8601 datetime for people, e.g.
/// `Tuesday, January 2, 2024 at 9:00 AM`. Unparseable input is returned as is.
pub fn format_datetime(raw: &str) -> String {
    let raw = raw.trim();
    let parsed = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        });

    match parsed {
        Some(dt) => dt.format("%A, %B %-d, %Y at %-I:%M %p").to_string(),
        None => raw.to_string(),
    }
}
