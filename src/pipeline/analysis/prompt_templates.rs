//! Analysis prompt templates, one per `AnalysisType`.
//!
//! Each template has a single `{content}` slot followed by a fixed
//! five-point rubric.

use crate::models::{AnalysisContent, AnalysisType};

const CONTENT_SLOT: &str = "{content}";

/// Stand-in for image content that carries no extracted text.
pub const IMAGE_PLACEHOLDER: &str = "[Image Content] Please analyze the provided image.";

const GENERAL_TEMPLATE: &str = "Analyze the following content and provide comprehensive insights:
{content}

Please provide:
1. Main topics and concepts
2. Key information and findings
3. Technical details if present
4. Context and relationships
5. Summary and implications";

const TECHNICAL_TEMPLATE: &str = "Perform a technical analysis of the following content:
{content}

Focus on:
1. Technical terms and concepts
2. Processes or methods described
3. Specifications or measurements
4. Technical relationships
5. Implementation details";

const EDUCATIONAL_TEMPLATE: &str = "Analyze the following content from an educational perspective:
{content}

Consider:
1. Learning objectives
2. Key concepts to understand
3. Prerequisites and background knowledge
4. Examples and illustrations
5. Potential questions and exercises";

pub fn template_for(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::General => GENERAL_TEMPLATE,
        AnalysisType::Technical => TECHNICAL_TEMPLATE,
        AnalysisType::Educational => EDUCATIONAL_TEMPLATE,
    }
}

/// The text that fills the content slot.
pub fn content_text(content: &AnalysisContent) -> String {
    match content {
        AnalysisContent::Text(text) => text.clone(),
        AnalysisContent::Image { text: Some(text), .. } if !text.trim().is_empty() => text.clone(),
        AnalysisContent::Image { .. } => IMAGE_PLACEHOLDER.to_string(),
        AnalysisContent::TextWithContext { text, context } => with_context(text, context),
    }
}

/// Text followed by a numbered block of related snippets. No snippets, no block.
fn with_context(text: &str, context: &[String]) -> String {
    let snippets: Vec<&str> = context
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if snippets.is_empty() {
        return text.to_string();
    }

    let mut out = String::from(text);
    out.push_str("\n\nRelated context from previously analyzed content:");
    for (i, snippet) in snippets.iter().enumerate() {
        out.push_str(&format!("\n[{}] {}", i + 1, snippet));
    }
    out
}

/// Fill the template's content slot exactly once.
pub fn render_prompt(content: &AnalysisContent, analysis_type: AnalysisType) -> String {
    template_for(analysis_type).replacen(CONTENT_SLOT, &content_text(content), 1)
}
