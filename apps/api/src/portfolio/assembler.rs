//! Response Assembler: turns one free-form backend answer into a complete,
//! standalone HTML document.
//!
//! Backends are asked to answer as
//!
//! ```text
//! ===HTML===
//! ...markup...
//! ===CSS===
//! ...style rules...
//! ===JS===
//! ...script...
//! ```
//!
//! but nothing guarantees they do. Every step here is best-effort and
//! `assemble` never fails and never returns an empty string: if rendering
//! breaks for any reason the raw answer is shown in a fallback page.

use std::fmt::{self, Write as _};
use std::panic::{self, UnwindSafe};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, warn};

pub const HTML_MARKER: &str = "===HTML===";
pub const CSS_MARKER: &str = "===CSS===";
pub const JS_MARKER: &str = "===JS===";

/// Characters of the raw answer shown on the fallback page.
pub const FALLBACK_PREVIEW_CHARS: usize = 3000;

pub const FOOTER_CREDIT: &str = "Generated with PortfolioGen";

/// Opening fence with an optional language tag, or a bare closing fence.
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_+\-]*").unwrap());

static MARKUP_ROOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<!doctype\b|<html[\s>]").unwrap());

/// The three logical blocks of a backend answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segments {
    pub markup: String,
    pub style: String,
    pub behavior: String,
}

/// Splits on the ordered markers in a single forward scan.
///
/// Returns `None` when the HTML marker is absent. A missing CSS marker leaves
/// everything after the HTML marker as markup; a missing JS marker leaves
/// everything after the CSS marker as style.
pub fn split_sections(text: &str) -> Option<Segments> {
    let start = text.find(HTML_MARKER)? + HTML_MARKER.len();
    let mut rest = &text[start..];

    let mut blocks = ["", "", ""];
    let mut slot = 0;
    for marker in [CSS_MARKER, JS_MARKER] {
        let Some(pos) = rest.find(marker) else {
            break;
        };
        blocks[slot] = &rest[..pos];
        rest = &rest[pos + marker.len()..];
        slot += 1;
    }
    blocks[slot] = rest;

    let [markup, style, behavior] = blocks.map(strip_code_fences);
    Some(Segments {
        markup,
        style,
        behavior,
    })
}

/// Removes every code-fence token (with or without a language tag) and trims.
pub fn strip_code_fences(segment: &str) -> String {
    CODE_FENCE.replace_all(segment, "").trim().to_string()
}

/// Markup for answers without usable sections: everything from the first
/// doctype or `<html` tag, else the whole answer.
fn locate_markup(raw: &str) -> String {
    let from = MARKUP_ROOT
        .find(raw)
        .map(|m| &raw[m.start()..])
        .unwrap_or(raw);
    let stripped = strip_code_fences(from);
    if stripped.is_empty() {
        raw.to_string()
    } else {
        stripped
    }
}

/// Structured split, then the markup-root fallback when no markup came out.
pub fn parse_response(raw: &str) -> Segments {
    let mut segments = split_sections(raw).unwrap_or_default();
    if segments.markup.is_empty() {
        segments.markup = locate_markup(raw);
    }
    segments
}

/// Parses `raw` and wraps it into the final document stamped with `generated_at`.
pub fn assemble(raw: &str, generated_at: DateTime<Utc>) -> String {
    assemble_with(raw, generated_at, |segments, at| {
        render_document(segments, at)
    })
}

fn assemble_with<F>(raw: &str, generated_at: DateTime<Utc>, render: F) -> String
where
    F: FnOnce(&Segments, DateTime<Utc>) -> Result<String, fmt::Error> + UnwindSafe,
{
    let attempt = panic::catch_unwind(move || {
        let segments = parse_response(raw);
        render(&segments, generated_at)
    });

    match attempt {
        Ok(Ok(document)) if !document.trim().is_empty() => document,
        Ok(Ok(_)) => {
            warn!("Assembled document was empty, serving fallback");
            fallback_document(raw)
        }
        Ok(Err(e)) => {
            warn!("HTML creation error: {e}, serving fallback");
            fallback_document(raw)
        }
        Err(_) => {
            error!("HTML creation panicked, serving fallback");
            fallback_document(raw)
        }
    }
}

const DOCUMENT_HEAD: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>AI Generated Portfolio</title>
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.4.0/css/all.min.css">
    <link href="https://fonts.googleapis.com/css2?family=Poppins:wght@300;400;500;600;700&display=swap" rel="stylesheet">
    <style>
        * {
            margin: 0;
            padding: 0;
            box-sizing: border-box;
        }

        body {
            font-family: 'Poppins', -apple-system, BlinkMacSystemFont, sans-serif;
            line-height: 1.6;
            color: #333;
            background-color: #f8fafc;
        }

        .container {
            max-width: 1200px;
            margin: 0 auto;
            padding: 0 20px;
        }

        section {
            padding: 80px 0;
        }

        @media (max-width: 768px) {
            .container {
                padding: 0 15px;
            }

            section {
                padding: 60px 0;
            }
        }

        /* Generated styles */
"#;

const BOOTSTRAP_BUNDLE: &str =
    r#"<script src="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/js/bootstrap.bundle.min.js"></script>"#;

fn or_placeholder<'a>(segment: &'a str, placeholder: &'a str) -> &'a str {
    if segment.trim().is_empty() {
        placeholder
    } else {
        segment
    }
}

/// Wraps the segments into the fixed page skeleton.
pub fn render_document(segments: &Segments, generated_at: DateTime<Utc>) -> Result<String, fmt::Error> {
    let mut doc = String::with_capacity(
        DOCUMENT_HEAD.len()
            + segments.markup.len()
            + segments.style.len()
            + segments.behavior.len()
            + 1024,
    );

    doc.push_str(DOCUMENT_HEAD);
    writeln!(
        doc,
        "        {}\n    </style>\n</head>\n<body>",
        or_placeholder(&segments.style, "/* No CSS generated by AI */")
    )?;
    writeln!(
        doc,
        "    {}\n",
        or_placeholder(&segments.markup, "<!-- No HTML generated by AI -->")
    )?;
    writeln!(doc, "    {BOOTSTRAP_BUNDLE}\n")?;
    writeln!(
        doc,
        "    <script>\n        {}\n    </script>\n",
        or_placeholder(&segments.behavior, "// No JavaScript generated by AI")
    )?;
    write!(
        doc,
        r#"    <div style="background: #1f2937; color: white; padding: 20px; text-align: center; margin-top: 50px;">
        <p style="margin: 0; font-size: 0.9em; opacity: 0.8;">
            {FOOTER_CREDIT} | {} UTC
        </p>
    </div>
</body>
</html>"#,
        generated_at.format("%Y-%m-%d %H:%M:%S")
    )?;

    Ok(doc)
}

/// Minimal escaping for text placed inside element content or attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Always-valid page showing the raw answer, truncated, with a way home.
pub fn fallback_document(raw: &str) -> String {
    let preview = match raw.char_indices().nth(FALLBACK_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &raw[..idx]),
        None => raw.to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Portfolio Generated by PortfolioGen</title>
    <style>
        body {{
            font-family: Arial, sans-serif;
            padding: 40px;
            background: linear-gradient(135deg, #667eea 0%, #764ba2 100%);
            color: white;
            min-height: 100vh;
        }}
        .container {{
            max-width: 800px;
            margin: 0 auto;
            background: rgba(255,255,255,0.1);
            padding: 40px;
            border-radius: 20px;
        }}
        .error {{
            color: #ff6b6b;
            background: rgba(0,0,0,0.2);
            padding: 20px;
            border-radius: 10px;
            margin: 20px 0;
        }}
        pre {{
            background: rgba(0,0,0,0.3);
            padding: 20px;
            border-radius: 10px;
            overflow: auto;
            color: #f1f5f9;
            max-height: 400px;
            white-space: pre-wrap;
        }}
    </style>
</head>
<body>
    <div class="container">
        <h1>Portfolio Generated Successfully!</h1>
        <div class="error">
            <p>Note: There was an issue parsing the AI response.</p>
        </div>
        <pre>
{}
        </pre>
        <p style="margin-top: 30px;">
            <a href="/" style="color: white; background: #6366f1; padding: 10px 20px; border-radius: 5px; text-decoration: none;">
                Back to Generator
            </a>
        </p>
    </div>
</body>
</html>"#,
        escape_html(&preview)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, 9, 26, 53).unwrap()
    }

    #[test]
    fn test_split_all_three_sections() {
        let raw = "Sure! Here you go.\n===HTML===\n<section>Hi</section>\n===CSS===\nh1 { color: red; }\n===JS===\nconsole.log(1);\n";
        let segments = split_sections(raw).unwrap();
        assert_eq!(segments.markup, "<section>Hi</section>");
        assert_eq!(segments.style, "h1 { color: red; }");
        assert_eq!(segments.behavior, "console.log(1);");
    }

    #[test]
    fn test_split_strips_fences_per_segment() {
        let raw = "===HTML===\n```html\n<main></main>\n```\n===CSS===\n```css\nmain{}\n```\n===JS===\n```javascript\nlet x = 1;\n```";
        let segments = split_sections(raw).unwrap();
        assert_eq!(segments.markup, "<main></main>");
        assert_eq!(segments.style, "main{}");
        assert_eq!(segments.behavior, "let x = 1;");
    }

    #[test]
    fn test_split_without_css_marker_is_all_markup() {
        let segments = split_sections("===HTML===<p>only</p>===JS===alert(1)").unwrap();
        assert_eq!(segments.markup, "<p>only</p>===JS===alert(1)");
        assert!(segments.style.is_empty());
        assert!(segments.behavior.is_empty());
    }

    #[test]
    fn test_split_without_js_marker_is_all_style() {
        let segments = split_sections("===HTML===<p>x</p>===CSS===p{}\n").unwrap();
        assert_eq!(segments.markup, "<p>x</p>");
        assert_eq!(segments.style, "p{}");
        assert!(segments.behavior.is_empty());
    }

    #[test]
    fn test_split_without_html_marker() {
        assert!(split_sections("<p>no markers</p>").is_none());
        assert!(split_sections("").is_none());
    }

    #[test]
    fn test_parse_falls_back_to_doctype() {
        let raw = "Here is your site:\n```html\n<!DOCTYPE html><html><body>Hi</body></html>\n```";
        let segments = parse_response(raw);
        assert_eq!(segments.markup, "<!DOCTYPE html><html><body>Hi</body></html>");
        assert!(segments.style.is_empty());
        assert!(segments.behavior.is_empty());
    }

    #[test]
    fn test_parse_falls_back_to_html_tag() {
        let segments = parse_response("Intro text <html lang=\"en\"><body/></html>");
        assert_eq!(segments.markup, "<html lang=\"en\"><body/></html>");
    }

    #[test]
    fn test_parse_uses_whole_text_without_root() {
        let segments = parse_response("Jane Doe\nRust engineer");
        assert_eq!(segments.markup, "Jane Doe\nRust engineer");
    }

    #[test]
    fn test_parse_empty_markup_section_triggers_fallback_scan() {
        let raw = "===HTML===\n```html\n```\n===CSS===\nbody{}";
        let segments = parse_response(raw);
        // Structured markup is empty, so the whole answer (fence-stripped) is used.
        assert!(segments.markup.contains("===CSS==="));
        assert_eq!(segments.style, "body{}");
    }

    #[test]
    fn test_assemble_wraps_segments() {
        let raw = "===HTML===<section id=\"about\">About me</section>===CSS===.x{color:blue}===JS===init();";
        let doc = assemble(raw, at());
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<section id=\"about\">About me</section>"));
        assert!(doc.contains(".x{color:blue}"));
        assert!(doc.contains("init();"));
        assert!(doc.contains("bootstrap.bundle.min.js"));
        assert!(doc.contains("<body>") && doc.trim_end().ends_with("</html>"));
        assert!(doc.contains("Generated with PortfolioGen | 2026-03-14 09:26:53 UTC"));
        // Generated CSS comes after the base rules.
        assert!(doc.find(".x{color:blue}").unwrap() > doc.find("box-sizing").unwrap());
    }

    #[test]
    fn test_assemble_uses_placeholders() {
        let doc = assemble("===HTML===<p>x</p>", at());
        assert!(doc.contains("/* No CSS generated by AI */"));
        assert!(doc.contains("// No JavaScript generated by AI"));
        assert!(!doc.contains("<!-- No HTML generated by AI -->"));
    }

    #[test]
    fn test_assemble_never_empty() {
        for raw in ["", "   ", "```", "===HTML===", "===HTML======CSS======JS==="] {
            let doc = assemble(raw, at());
            assert!(!doc.trim().is_empty(), "empty document for {raw:?}");
            assert!(doc.contains("</html>"));
        }
    }

    #[test]
    fn test_assemble_falls_back_on_render_error() {
        let doc = assemble_with("raw answer", at(), |_, _| Err(fmt::Error));
        assert!(doc.contains("There was an issue parsing the AI response"));
        assert!(doc.contains("raw answer"));
    }

    #[test]
    fn test_assemble_falls_back_on_panic() {
        let doc = assemble_with("raw <b>answer</b>", at(), |_, _| panic!("renderer bug"));
        assert!(doc.contains("raw &lt;b&gt;answer&lt;/b&gt;"));
        assert!(doc.contains("href=\"/\""));
    }

    #[test]
    fn test_assemble_falls_back_on_empty_render() {
        let doc = assemble_with("something", at(), |_, _| Ok(String::new()));
        assert!(doc.contains("<pre>"));
    }

    #[test]
    fn test_fallback_truncates_by_characters() {
        let raw = "é".repeat(FALLBACK_PREVIEW_CHARS + 10);
        let doc = fallback_document(&raw);
        let expected = format!("{}...", "é".repeat(FALLBACK_PREVIEW_CHARS));
        assert!(doc.contains(&expected));
        assert!(!doc.contains(&"é".repeat(FALLBACK_PREVIEW_CHARS + 1)));

        let short = fallback_document("short");
        assert!(short.contains("short") && !short.contains("short..."));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }
}
