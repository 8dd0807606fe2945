// Prompt construction
// Pure function of the task description and the resolved language profile.

use promptrun_common::languages::{LanguageProfile, PromptMode};

const PLAIN_SUFFIX: &str =
    "Provide only the raw code, with no explanations and no markdown formatting.";

const JSON_STRUCTURE: &str = r#"{
  "language": "The programming language used",
  "code": "The script must be self-contained, complete, and ready to execute. The code must include any necessary imports or setup.",
  "explanation": "A brief, one-sentence explanation of the code"
}"#;

/// Build the instruction sent to the LLM
pub fn build(task: &str, profile: &LanguageProfile) -> String {
    let instruction = profile.render_template(task);
    match profile.mode {
        PromptMode::Plain => format!("{} {}", instruction, PLAIN_SUFFIX),
        PromptMode::Structured => format!(
            "{} You MUST respond with a single JSON object that strictly follows this structure, using exactly the fields language, code and explanation:\n{}\nThe language field must be \"{}\". Do not include any other text or markdown formatting outside of the JSON object.",
            instruction, JSON_STRUCTURE, profile.display_name
        ),
    }
}
