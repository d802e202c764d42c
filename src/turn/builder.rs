//! Assemble one turn's display and wire parts.

use crate::attachments::EncodedAttachment;
use crate::conversation::Part;
use crate::gemini::types::WirePart;

/// Question asked about a text attachment sent without a prompt.
pub const DEFAULT_DOCUMENT_QUESTION: &str = "Summarize the document.";

/// The two renditions of one user turn.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnParts {
    /// What the log shows
    pub display: Vec<Part>,
    /// What the backend receives
    pub wire: Vec<WirePart>,
}

/// Build the parts for a turn, or `None` when there is nothing to send.
pub fn build_turn(prompt: &str, attachment: Option<&EncodedAttachment>) -> Option<TurnParts> {
    let prompt = prompt.trim();
    let has_prompt = !prompt.is_empty();

    let turn = match attachment {
        None if !has_prompt => return None,
        None => TurnParts {
            display: vec![Part::text(prompt)],
            wire: vec![WirePart::text(prompt)],
        },
        Some(EncodedAttachment::Image {
            mime_type, data, ..
        }) => {
            let mut display = vec![Part::inline_data(mime_type.clone(), data.clone())];
            let mut wire = vec![WirePart::inline_data(mime_type.clone(), data.clone())];
            if has_prompt {
                display.push(Part::text(prompt));
                wire.push(WirePart::text(prompt));
            }
            TurnParts { display, wire }
        }
        Some(EncodedAttachment::Text { file_name, content }) => {
            let mut display = vec![Part::file_name(file_name.clone())];
            if has_prompt {
                display.push(Part::text(prompt));
            }
            let question = if has_prompt {
                prompt
            } else {
                DEFAULT_DOCUMENT_QUESTION
            };
            TurnParts {
                display,
                wire: vec![WirePart::text(document_context(file_name, content, question))],
            }
        }
    };
    Some(turn)
}

fn document_context(file_name: &str, content: &str, question: &str) -> String {
    format!(
        "Use the following document as context for the question below.\n\n\
         --- Document: {file_name} ---\n{content}\n--- End of document ---\n\n\
         Question: {question}"
    )
}
