// src/prompt.rs
// Builds the structured analysis prompt sent with every chunk.

use crate::chunker::Chunk;

/// Fixed system message for every completion request.
pub const SYSTEM_PROMPT: &str = "You are a relationship analysis expert. Provide detailed, structured analysis with specific examples and actionable insights. Your analysis should be comprehensive and include concrete examples from the conversation.";

/// Five-section analysis prompt, annotated with where in the conversation
/// this chunk sits.
pub fn build_prompt(chunk: &Chunk) -> String {
    let opening = if chunk.is_first {
        "This is the beginning of the conversation."
    } else {
        ""
    };
    let closing = if chunk.is_last {
        "This is the end of the conversation."
    } else {
        "This is a part of the conversation."
    };

    format!(
        r#"As a relationship analysis expert, analyze this chat content and provide a detailed, structured analysis. Your analysis should be comprehensive and include specific examples from the conversation.

Required sections for your analysis:
1. Overall Relationship Dynamics
   - Key patterns and themes
   - Power dynamics
   - Level of engagement

2. Communication Patterns
   - Communication style
   - Active listening
   - Response patterns
   - Specific examples from the chat

3. Emotional Expression
   - Emotional awareness
   - Supportiveness
   - Empathy levels
   - Specific examples

4. Areas for Improvement
   - Communication gaps
   - Potential misunderstandings
   - Growth opportunities
   - Specific suggestions

5. Specific Recommendations
   - Actionable steps
   - Communication strategies
   - Relationship building activities

{opening}
{closing}

Chat content to analyze:
{content}

Please provide a detailed analysis with specific examples and actionable insights."#,
        opening = opening,
        closing = closing,
        content = chunk.text,
    )
}
