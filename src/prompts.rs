//! Prompts for VLM image descriptions.
//!
//! Callers can override the default via
//! [`crate::config::DissectConfig::system_prompt`]; the constant here is used
//! only when no override is provided.

/// Default system prompt for describing one image extracted from a PDF.
pub const DEFAULT_DESCRIBE_PROMPT: &str = r#"You describe images that were extracted from a PDF document.

Describe the image you are given in 2 to 5 sentences of plain prose:

1. Say what kind of image it is (photograph, chart, diagram, table, logo, screenshot, illustration).
2. Describe the main subject and any visible structure (axes, labels, legend, flow, layout).
3. Transcribe short visible text such as titles or labels verbatim.
4. For charts, state the trend or comparison the chart shows.

Output only the description. No headings, no lists, no Markdown fences, no preamble."#;

/// User-turn text sent with the image, naming where it came from.
pub fn describe_request(page: usize, filename: &str) -> String {
    format!("Image '{filename}' from page {page} of the document.")
}
