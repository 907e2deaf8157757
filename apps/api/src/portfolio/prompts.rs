// Prompt constants for portfolio generation.
// The section markers must match the ones the assembler scans for.

use crate::portfolio::assembler::{CSS_MARKER, HTML_MARKER, JS_MARKER};

/// Portfolio generation prompt. Replace: {resume_text}, {html_marker},
/// {css_marker}, {js_marker}
pub const PORTFOLIO_PROMPT_TEMPLATE: &str = r#"You are an expert web designer and front-end developer.
Turn the resume below into a modern, responsive, single-page personal portfolio website.

REQUIREMENTS:
- Sections: hero with name and headline, about, experience, projects, skills, education, contact
- Use ONLY facts present in the resume. Do NOT invent employers, dates, metrics or links
- Bootstrap 5 and Font Awesome 6 are already loaded on the page; use their classes freely
- Output the <body> content only: no <html>, <head> or <body> tags, no external files
- Smooth scrolling navigation, subtle animations, accessible colour contrast
- Mobile first; the layout must work from 320px wide upward

OUTPUT FORMAT (follow exactly, no commentary before or after):
{html_marker}
(the HTML markup)
{css_marker}
(the CSS rules)
{js_marker}
(the JavaScript)

RESUME:
{resume_text}"#;

pub fn build_portfolio_prompt(resume_text: &str) -> String {
    // Markers first so resume text containing a placeholder is left untouched.
    PORTFOLIO_PROMPT_TEMPLATE
        .replace("{html_marker}", HTML_MARKER)
        .replace("{css_marker}", CSS_MARKER)
        .replace("{js_marker}", JS_MARKER)
        .replace("{resume_text}", resume_text)
}
