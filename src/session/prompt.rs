//! Prompt composition with role markers

pub const SYSTEM_MARKER: &str = "<|system|>";
pub const USER_MARKER: &str = "<|user|>";

/// Join the system prompt and user payload into the single engine input.
///
/// Engines trained on this delimiter convention expect exactly
/// `<|system|>{system}\n<|user|>{user}` with nothing after the payload.
pub fn compose_prompt(system_prompt: &str, user_payload: &str) -> String {
    let mut prompt = String::with_capacity(
        SYSTEM_MARKER.len() + system_prompt.len() + 1 + USER_MARKER.len() + user_payload.len(),
    );
    prompt.push_str(SYSTEM_MARKER);
    prompt.push_str(system_prompt);
    prompt.push('\n');
    prompt.push_str(USER_MARKER);
    prompt.push_str(user_payload);
    prompt
}
