// Shared prompt fragments. Each feature that calls the AI service keeps its
// own prompts.rs alongside it.

/// Appended to system prompts that expect structured output.
pub const JSON_ONLY_INSTRUCTION: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences.";
