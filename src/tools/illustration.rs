//! Code-generated visual aids for report sections.
//!
//! Image search is deliberately absent: verifying that a found image is
//! actually relevant would need a vision model, while generated
//! visualizations (mermaid, p5, three, d3, plain HTML) are produced by the
//! model itself and can be checked as code.

use crate::llm::{self, strip_code_fences, LLMClient};
use crate::types::{
    Illustration, IllustrationDecision, IllustrationKind, IllustrationNeed, Result,
};
use std::sync::Arc;

const NEED_SYSTEM: &str = "\
You are a strict editorial reviewer deciding whether a report section needs a visual aid. \
Most sections do not. Approve one only when a diagram, animation, chart, or 3D scene would \
materially improve a reader's understanding beyond what the prose already conveys, and give \
a concrete justification tied to the section content. Decoration is not a justification.";

const DECIDE_SYSTEM: &str = "\
You are an expert visual director and technical educator. Select the most effective \
visualization library for the topic:

- `mermaid` - structural and logical relationships: architectures, flowcharts, sequence \
and state diagrams, hierarchies.
- `p5` - conceptual animations and simulations: algorithms, physics, change over time.
- `three` - inherently 3-dimensional concepts: molecules, orbits, spatial fields.
- `d3` - quantitative data: statistical charts, trends, comparisons.
- `html` - simple tables, CSS diagrams, small widgets that fit none of the above.

Analyze whether the concept is a structure, a process, data, or a space, and choose the \
library that best explains it. Provide a code_prompt that is specific and descriptive, \
explicitly requesting animation or interactivity where suitable.";

const GENERATE_SYSTEM: &str = "\
You are an expert web developer specializing in data visualization and educational \
animations. Generate a COMPLETE, self-contained HTML5 document (including <!DOCTYPE html>) \
that renders the requested visualization.

Constraints:
1. Self-contained: a single valid HTML document, libraries loaded from reliable CDNs \
(d3.v7, p5 1.4, three r128, mermaid latest).
2. Responsive: fit 100% width, no body margin or padding.
3. Mermaid: initialize with `mermaid.initialize({ startOnLoad: true });`, put the diagram \
inside a `<div class=\"mermaid\">`, start strictly with the diagram type (e.g. `graph TD`), \
and ALWAYS wrap node labels in double quotes (`id[\"Label Text\"]`) to survive special \
characters. No version strings, no markdown.
4. P5/Three: animate with loops or requestAnimationFrame when the prompt implies a process; \
resize the canvas with the window.

Output ONLY the HTML code. Do not wrap it in markdown fences.";

const VERIFY_SYSTEM: &str = "\
You are a quality assurance reviewer for visualization code. Review the HTML/JS document \
below against this checklist:
1. Syntax: unclosed tags, script errors, invalid library usage.
2. Completeness: no placeholder comments or missing data; the page must be fully functional, \
with mock data if necessary.
3. Relevance: the visualization must convey the topic it was generated for.
4. Responsiveness: window dimensions or 100% width/height.
5. Mermaid: valid diagram syntax and ALL node labels wrapped in double quotes.

If the code is perfect, output it exactly as is. If anything fails the checklist, output the \
full corrected document. Output ONLY the HTML code, no markdown fences.";

pub struct IllustrationTool {
    llm: Arc<dyn LLMClient>,
}

impl IllustrationTool {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Produce a visual aid for a completed section, or `None` when one is
    /// not warranted.
    pub async fn illustrate(&self, topic: &str, description: &str) -> Result<Option<Illustration>> {
        let brief = format!("Topic: {}\nDescription: {}", topic, description);

        let need: IllustrationNeed =
            llm::structured(self.llm.as_ref(), NEED_SYSTEM, &brief).await?;
        if !need.needs_illustration {
            tracing::debug!(topic, reason = %need.reason, "skipping illustration");
            return Ok(None);
        }

        let decision: IllustrationDecision =
            llm::structured(self.llm.as_ref(), DECIDE_SYSTEM, &brief).await?;
        tracing::debug!(
            topic,
            library = decision.visualization_type.as_str(),
            "illustration strategy selected"
        );

        let generated = self
            .llm
            .generate_with_system(
                GENERATE_SYSTEM,
                &format!(
                    "Create a {} visualization for: {}",
                    decision.visualization_type.as_str(),
                    decision.code_prompt
                ),
            )
            .await?;
        let generated = strip_code_fences(&generated).to_string();

        // One verification-and-repair pass over the model's own output
        let verified = self
            .llm
            .generate_with_system(
                VERIFY_SYSTEM,
                &format!(
                    "Topic: {}\nDescription: {}\nCode prompt: {}\n\n{}",
                    topic, description, decision.code_prompt, generated
                ),
            )
            .await?;

        Ok(Some(Illustration {
            kind: IllustrationKind::Code,
            visualization_type: decision.visualization_type,
            content: strip_code_fences(&verified).to_string(),
        }))
    }
}
