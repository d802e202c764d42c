//! Client-side callables offered to the model.

pub mod reminder;

pub use reminder::{format_datetime, reminder_tools, ReminderArgs, SET_REMINDER};
