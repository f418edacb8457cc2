//! Content assembly: joins per-section drafts into one Markdown body.
//!
//! Heading integrity is enforced (a section that does not open with its
//! suggested heading gets it prepended), whitespace between sections is
//! context-sensitive (a single newline after block-ending content, a
//! blank line otherwise), and failed sections leave an inspectable
//! placeholder comment.

pub mod media;

use std::sync::OnceLock;

use regex::Regex;

use crate::record::{ArticleOutline, ArticleRecord};

/// Assembler outcome statuses.
pub mod status {
    pub const SUCCESS: &str = "SUCCESS";
    pub const SUCCESS_EMPTY_OUTLINE: &str = "SUCCESS_EMPTY_OUTLINE";
    pub const FAILED_MISSING_OUTLINE: &str = "FAILED_MISSING_OUTLINE";
    pub const WARNING_PARTIAL_ASSEMBLY: &str = "WARNING_PARTIAL_ASSEMBLY";
    pub const WARNING_ALL_BODY_SECTIONS_FAILED: &str = "WARNING_ALL_BODY_SECTIONS_FAILED";
}

fn ends_with_block_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:```|</table>|</pre>|</ul>|</ol>|</div>)\s*$").expect("valid regex")
    })
}

/// Join markdown parts with intelligent newline management: a single
/// newline when the accumulated content ends with a block element, a
/// blank line otherwise.
fn safe_join_markdown_sections(parts: &[String]) -> String {
    let mut assembled = String::new();
    for part in parts {
        let stripped = part.trim();
        if stripped.is_empty() {
            continue;
        }
        if assembled.is_empty() {
            assembled.push_str(stripped);
        } else if ends_with_block_re().is_match(&assembled) {
            assembled.push('\n');
            assembled.push_str(stripped);
        } else {
            assembled.push_str("\n\n");
            assembled.push_str(stripped);
        }
    }
    assembled.trim().to_string()
}

/// Assemble the article body from the outline, writing
/// `assembled_article_body_md` and returning the assembler status.
///
/// Assembly is deterministic: identical section inputs always yield
/// byte-identical output.
pub fn assemble_article(record: &mut ArticleRecord) -> String {
    let Some(outline) = record.article_outline.clone() else {
        tracing::error!(id = %record.id, "missing outline; cannot assemble");
        record.assembled_article_body_md =
            Some("<p>Error: Article content could not be assembled due to missing outline.</p>"
                .to_string());
        return status::FAILED_MISSING_OUTLINE.to_string();
    };

    if outline.sections.is_empty() {
        tracing::warn!(id = %record.id, "outline has no sections; body will be empty");
        record.assembled_article_body_md = Some(String::new());
        return status::SUCCESS_EMPTY_OUTLINE.to_string();
    }

    let (parts, stats) = collect_section_parts(&outline);
    let body = safe_join_markdown_sections(&parts);
    tracing::info!(
        id = %record.id,
        assembled = stats.assembled,
        total = stats.total,
        words = body.split_whitespace().count(),
        "content assembled",
    );
    record.assembled_article_body_md = Some(body);

    if stats.body_present > 0 && stats.body_assembled == 0 && stats.assembled < stats.total {
        status::WARNING_ALL_BODY_SECTIONS_FAILED.to_string()
    } else if stats.assembled < stats.total {
        status::WARNING_PARTIAL_ASSEMBLY.to_string()
    } else {
        status::SUCCESS.to_string()
    }
}

struct AssemblyStats {
    total: usize,
    assembled: usize,
    body_present: usize,
    body_assembled: usize,
}

fn collect_section_parts(outline: &ArticleOutline) -> (Vec<String>, AssemblyStats) {
    let mut parts = Vec::new();
    let mut stats = AssemblyStats {
        total: outline.sections.len(),
        assembled: 0,
        body_present: 0,
        body_assembled: 0,
    };

    for section in &outline.sections {
        let is_body = !matches!(section.section_type.as_str(), "introduction" | "conclusion");
        if is_body {
            stats.body_present += 1;
        }

        let heading = section.heading_suggestion.trim();
        match section
            .generated_markdown
            .as_deref()
            .filter(|md| !md.trim().is_empty())
        {
            Some(markdown) => {
                let markdown = if markdown.trim_start().starts_with(heading) {
                    markdown.to_string()
                } else {
                    tracing::warn!(heading, "section missing its heading; prepending");
                    format!("{heading}\n\n{}", markdown.trim_start())
                };
                parts.push(markdown);
                // Fallback content still counts as assembled.
                stats.assembled += 1;
                if is_body {
                    stats.body_assembled += 1;
                }
            }
            None => {
                tracing::warn!(
                    heading,
                    writer_status = section.writer_status.as_deref().unwrap_or("UNKNOWN"),
                    "section has no usable markdown; inserting failure placeholder",
                );
                parts.push(format!(
                    "<!-- SECTION FAILED TO GENERATE: {} (Type: {}, Status: {}) -->",
                    heading,
                    section.section_type,
                    section.writer_status.as_deref().unwrap_or("UNKNOWN")
                ));
            }
        }
    }

    (parts, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::OutlineSection;

    fn section(
        section_type: &str,
        heading: &str,
        markdown: Option<&str>,
        writer_status: &str,
    ) -> OutlineSection {
        OutlineSection {
            section_type: section_type.to_string(),
            heading_suggestion: heading.to_string(),
            writing_instructions: String::new(),
            generated_markdown: markdown.map(str::to_string),
            writer_status: Some(writer_status.to_string()),
        }
    }

    fn record_with_sections(sections: Vec<OutlineSection>) -> ArticleRecord {
        let mut record = ArticleRecord::new("asm1");
        record.article_outline = Some(ArticleOutline {
            article_h1_suggestion: String::new(),
            outline_strategy_notes: String::new(),
            sections,
        });
        record
    }

    #[test]
    fn fenced_block_gets_single_newline_before_next_heading() {
        let mut record = record_with_sections(vec![
            section(
                "introduction",
                "## Intro",
                Some("## Intro\n\nOpening."),
                "SUCCESS",
            ),
            section(
                "body_section",
                "### Benchmarks",
                Some("### Benchmarks\n\nNumbers:\n\n```python\nprint('hi')\n```"),
                "SUCCESS",
            ),
            section(
                "body_section",
                "### Analysis",
                Some("### Analysis\n\nWhat it means."),
                "SUCCESS",
            ),
        ]);

        let status = assemble_article(&mut record);
        assert_eq!(status, status::SUCCESS);

        let body = record.assembled_article_body_md.unwrap();
        // Single newline between the closing fence and the next heading.
        assert!(body.contains("```\n### Analysis"));
        // Blank line between ordinary sections.
        assert!(body.contains("Opening.\n\n### Benchmarks"));
    }

    #[test]
    fn missing_heading_is_prepended() {
        let mut record = record_with_sections(vec![section(
            "body_section",
            "### Core Principle",
            Some("This section forgot its heading."),
            "SUCCESS",
        )]);

        assemble_article(&mut record);
        let body = record.assembled_article_body_md.unwrap();
        assert!(body.starts_with("### Core Principle\n\nThis section forgot its heading."));
    }

    #[test]
    fn failed_section_leaves_placeholder_comment() {
        let mut record = record_with_sections(vec![
            section("introduction", "## Intro", Some("## Intro\n\nHi."), "SUCCESS"),
            section("body_section", "### Missing", None, "FAILED_NO_CONTENT"),
        ]);

        let status = assemble_article(&mut record);
        assert_eq!(status, status::WARNING_ALL_BODY_SECTIONS_FAILED);
        assert!(record.assembled_article_body_md.unwrap().contains(
            "<!-- SECTION FAILED TO GENERATE: ### Missing (Type: body_section, Status: FAILED_NO_CONTENT) -->"
        ));
    }

    #[test]
    fn partial_assembly_status() {
        let mut record = record_with_sections(vec![
            section("body_section", "### A", Some("### A\n\nBody A."), "SUCCESS"),
            section("body_section", "### B", None, "FAILED_LLM_CALL"),
        ]);

        assert_eq!(assemble_article(&mut record), status::WARNING_PARTIAL_ASSEMBLY);
    }

    #[test]
    fn missing_outline_fails_with_error_body() {
        let mut record = ArticleRecord::new("asm2");
        let status = assemble_article(&mut record);
        assert_eq!(status, status::FAILED_MISSING_OUTLINE);
        assert!(record
            .assembled_article_body_md
            .unwrap()
            .contains("missing outline"));
    }

    #[test]
    fn empty_outline_succeeds_with_empty_body() {
        let mut record = record_with_sections(vec![]);
        let status = assemble_article(&mut record);
        assert_eq!(status, status::SUCCESS_EMPTY_OUTLINE);
        assert_eq!(record.assembled_article_body_md.as_deref(), Some(""));
    }

    #[test]
    fn assembly_is_idempotent_for_identical_inputs() {
        let sections = vec![
            section("introduction", "## Intro", Some("## Intro\n\nHi."), "SUCCESS"),
            section(
                "body_section",
                "### Code",
                Some("### Code\n\n```rust\nfn x() {}\n```"),
                "SUCCESS",
            ),
            section("conclusion", "## End", Some("## End\n\nBye."), "SUCCESS"),
        ];

        let mut first = record_with_sections(sections.clone());
        let mut second = record_with_sections(sections);
        assemble_article(&mut first);
        assemble_article(&mut second);

        assert_eq!(
            first.assembled_article_body_md,
            second.assembled_article_body_md
        );
    }
}
