//! Fixed instructions sent to the model.

/// The persona and question strategy for the first turn of a session.
#[inline]
pub fn brainstorm_persona() -> &'static str {
    include_str!("prompts/brainstorm.md").trim_end()
}

/// The instruction that turns a transcript into Mermaid flowchart source.
#[inline]
pub fn user_flow_instruction() -> &'static str {
    include_str!("prompts/user_flow.md").trim_end()
}

pub(crate) const USER_FLOW_REQUEST_PREFIX: &str = "Based on this brainstorming session, generate a detailed user flow in Mermaid.js format:\n\n";

/// Reply shown in place of the model's when a completion fails.
pub const APOLOGY: &str = "Sorry, I encountered an error. Please try again.";
