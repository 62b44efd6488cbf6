//! Whole-matter tool prompt construction.
//!
//! Each tool renders the matter's reassembled documents into a
//! (system, user) prompt pair for a single completion call. Document
//! blocks are headed `=== {name} [{kind}] ===`; the citation checker
//! drops the kind tag because its two sections are already
//! type-filtered.

use indexmap::IndexMap;

use juris_core::{AssembledDocument, JurisError, Matter};

use crate::prompts::matter_context;

/// The whole-matter analysis tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatterTool {
    Proposition,
    Inconsistency,
    Chronology,
    Persons,
    Issues,
    Citations,
    Briefing,
    Draft,
}

impl MatterTool {
    /// Stable name, recorded in history and accepted by the CLI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Proposition => "proposition",
            Self::Inconsistency => "inconsistency",
            Self::Chronology => "chronology",
            Self::Persons => "persons",
            Self::Issues => "issues",
            Self::Citations => "citations",
            Self::Briefing => "briefing",
            Self::Draft => "draft",
        }
    }
}

impl std::fmt::Display for MatterTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for MatterTool {
    type Err = JurisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "proposition" => Ok(Self::Proposition),
            "inconsistency" => Ok(Self::Inconsistency),
            "chronology" => Ok(Self::Chronology),
            "persons" => Ok(Self::Persons),
            "issues" => Ok(Self::Issues),
            "citations" => Ok(Self::Citations),
            "briefing" => Ok(Self::Briefing),
            "draft" => Ok(Self::Draft),
            other => Err(JurisError::input(format!("Unknown tool: {}", other))),
        }
    }
}

/// A fully rendered prompt pair for one tool run.
#[derive(Debug)]
pub struct ToolPrompt {
    /// System instruction.
    pub system: String,

    /// User-turn prompt carrying the document context.
    pub user: String,
}

fn document_blocks(documents: &IndexMap<String, AssembledDocument>) -> String {
    documents
        .iter()
        .map(|(name, doc)| format!("=== {} [{}] ===\n{}", name, doc.doc_kind, doc.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn unkinded_blocks(documents: &IndexMap<String, AssembledDocument>) -> String {
    documents
        .iter()
        .map(|(name, doc)| format!("=== {} ===\n{}", name, doc.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn focus_line(instructions: Option<&str>) -> String {
    match instructions.filter(|s| !s.is_empty()) {
        Some(instructions) => format!("Focus: {}\n\n", instructions),
        None => String::new(),
    }
}

/// Split the matter's documents into anchor and comparison block text.
///
/// Named anchors are marked `=== ANCHOR: ... ===`. When no name
/// matches, the first half of the documents (insertion order, rounding
/// up) becomes the anchor set, unmarked.
fn partition_anchors(
    documents: &IndexMap<String, AssembledDocument>,
    anchor_names: &[String],
) -> (String, String) {
    let mut anchor_blocks = Vec::new();
    let mut other_blocks = Vec::new();

    for (name, doc) in documents {
        if anchor_names.iter().any(|anchor| anchor == name) {
            anchor_blocks.push(format!(
                "=== ANCHOR: {} [{}] ===\n{}",
                name, doc.doc_kind, doc.text
            ));
        } else {
            other_blocks.push(format!("=== {} [{}] ===\n{}", name, doc.doc_kind, doc.text));
        }
    }

    if anchor_blocks.is_empty() {
        let split = (documents.len() + 1) / 2;
        anchor_blocks = documents
            .iter()
            .take(split)
            .map(|(name, doc)| format!("=== {} [{}] ===\n{}", name, doc.doc_kind, doc.text))
            .collect();
        other_blocks = documents
            .iter()
            .skip(split)
            .map(|(name, doc)| format!("=== {} [{}] ===\n{}", name, doc.doc_kind, doc.text))
            .collect();
    }

    (anchor_blocks.join("\n\n"), other_blocks.join("\n\n"))
}

/// Evidence assessment for a stated proposition, graded 1-5.
pub fn proposition(
    matter: &Matter,
    documents: &IndexMap<String, AssembledDocument>,
    proposition: &str,
) -> ToolPrompt {
    let system = format!(
        r#"You are a senior litigation counsel in {jurisdiction} conducting an evidence assessment for the matter "{name}".
{context}

Your task is to find ALL references across the matter documents that are relevant to the stated proposition — whether supporting, contradicting, or neutral — and grade each reference by its evidentiary strength.

For each relevant passage found, output it in exactly this format:

### [Document name] — [Brief description of the reference]
GRADE: [1-5]
[Quote or description of the relevant passage]
**Analysis:** [Why this is or is not good evidence for the proposition, and how it would be used or countered in argument]

Grading scale:
GRADE: 5 = Strong direct evidence — clearly establishes or directly contradicts the proposition
GRADE: 4 = Good supportive evidence — strongly consistent with or against the proposition
GRADE: 3 = Moderate — relevant but indirect, requires inference
GRADE: 2 = Weak — tangentially relevant, limited probative value
GRADE: 1 = Contrary — directly contradicts or undermines the proposition

After all references, provide:
## Overall Assessment
A summary of the overall strength of evidence for and against the proposition, and a preliminary view on whether it can be established on the balance of probabilities.

⚠️ Professional Caution: AI-generated analysis. Verify all passages against source documents before reliance."#,
        jurisdiction = matter.jurisdiction,
        name = matter.name,
        context = matter_context(matter),
    );

    let user = format!(
        "PROPOSITION TO TEST: \"{}\"\n\nSearch all documents for relevant evidence.\n\nDOCUMENTS:\n\n{}",
        proposition,
        document_blocks(documents)
    );

    ToolPrompt { system, user }
}

/// Forensic inconsistency analysis between anchor and other documents.
pub fn inconsistency(
    matter: &Matter,
    documents: &IndexMap<String, AssembledDocument>,
    anchor_names: &[String],
    instructions: Option<&str>,
) -> ToolPrompt {
    let (anchor_text, other_text) = partition_anchors(documents, anchor_names);

    let system = format!(
        r#"You are a senior litigation counsel conducting forensic inconsistency analysis for the matter "{name}" in {jurisdiction}.
{context}

Identify every factual inconsistency, contradiction, and conflict between the anchor documents and other documents.

Inconsistencies include: direct contradictions, conflicting accounts of the same event, facts in pleadings contradicted by evidence, witness statements contradicting exhibits or other witnesses, admissions undermining positions taken elsewhere, and material omissions.

For each inconsistency:
### [N]. [Brief description]
**Anchor:** [Document name and exact or paraphrased quote]
**Contradiction:** [Document name and exact or paraphrased quote]
**Significance:** CRITICAL / SIGNIFICANT / MINOR
**Tactical note:** [How this can be used or needs to be addressed]

End with:
## Summary
Overall assessment of the factual landscape and the most significant inconsistencies.

⚠️ Professional Caution: AI-generated analysis. Verify all quotations against source documents before reliance."#,
        name = matter.name,
        jurisdiction = matter.jurisdiction,
        context = matter_context(matter),
    );

    let comparison = if other_text.is_empty() {
        "(comparing anchor documents internally)".to_string()
    } else {
        other_text
    };
    let addendum = match instructions.filter(|s| !s.is_empty()) {
        Some(instructions) => format!("Additional instructions: {}", instructions),
        None => String::new(),
    };

    let user = format!(
        "ANCHOR DOCUMENTS:\n\n{}\n\nOTHER DOCUMENTS:\n\n{}\n\n{}",
        anchor_text, comparison, addendum
    );

    ToolPrompt { system, user }
}

/// Full-matter chronology extraction.
pub fn chronology(
    matter: &Matter,
    documents: &IndexMap<String, AssembledDocument>,
    instructions: Option<&str>,
) -> ToolPrompt {
    let system = format!(
        "You are a senior litigation counsel constructing a chronology for the matter \"{}\" in {}.\n{}",
        matter.name,
        matter.jurisdiction,
        matter_context(matter),
    );

    let user = format!(
        r#"Extract a full chronology. Format:

## Chronology — {name}

**[DATE]** — [Event] *(Source: [document])*

Flag disputed dates as DISPUTED with both versions. Group by year if spanning multiple years.

End with ## Key Dates Summary.

{focus}DOCUMENTS:

{blocks}"#,
        name = matter.name,
        focus = focus_line(instructions),
        blocks = document_blocks(documents),
    );

    ToolPrompt { system, user }
}

/// Persons and entities index.
pub fn persons(
    matter: &Matter,
    documents: &IndexMap<String, AssembledDocument>,
    instructions: Option<&str>,
) -> ToolPrompt {
    let system = format!(
        "You are a senior litigation counsel compiling a persons and entities index for the matter \"{}\" in {}.\n{}",
        matter.name,
        matter.jurisdiction,
        matter_context(matter),
    );

    let user = format!(
        r#"Compile a persons and entities index.

## Persons & Entities Index — {name}

### [Name]
**Role:** [role]
**Mentioned in:** [documents]
**Key facts:** [what documents reveal, including conflicting accounts]

{focus}DOCUMENTS:

{blocks}"#,
        name = matter.name,
        focus = focus_line(instructions),
        blocks = document_blocks(documents),
    );

    ToolPrompt { system, user }
}

/// Issue tracker with per-party evidence positions.
pub fn issues(
    matter: &Matter,
    documents: &IndexMap<String, AssembledDocument>,
    instructions: Option<&str>,
) -> ToolPrompt {
    let system = format!(
        "You are a senior litigation counsel in {} mapping issues for the matter \"{}\".\n{}",
        matter.jurisdiction,
        matter.name,
        matter_context(matter),
    );

    let user = format!(
        r#"Produce an issue tracker.

## Issue Tracker — {name}

### Issue [N]: [description]
**Type:** Legal / Factual / Mixed
**Raised by:** [party]
**Evidence for Claimant:** [documents and passages]
**Evidence for Defendant:** [documents and passages]
**Assessment:** [preliminary view]

End with ## Overall Assessment.

{focus}DOCUMENTS:

{blocks}"#,
        name = matter.name,
        focus = focus_line(instructions),
        blocks = document_blocks(documents),
    );

    ToolPrompt { system, user }
}

/// Citation check of skeleton arguments and pleadings against uploaded
/// case law.
pub fn citations(
    matter: &Matter,
    filings: &IndexMap<String, AssembledDocument>,
    authorities: &IndexMap<String, AssembledDocument>,
) -> ToolPrompt {
    let system = format!(
        "You are a senior litigation counsel in {} checking citations for the matter \"{}\".\n{}",
        matter.jurisdiction,
        matter.name,
        matter_context(matter),
    );

    let filings_text = unkinded_blocks(filings);
    let authorities_text = unkinded_blocks(authorities);

    let user = format!(
        r#"Check citations in skeleton arguments and pleadings against uploaded case law.

## Citation Check — {name}

### [Case name]
**Cited for:** [proposition]
**Found in uploads:** Yes / No / Partial
**Accuracy:** [does the judgment support the proposition?]
**Flag:** ✓ Accurate / ⚠️ Overstated / ✗ Incorrect / ? Not uploaded

SKELETON ARGUMENTS:

{filings}

CASE LAW:

{authorities}"#,
        name = matter.name,
        filings = if filings_text.is_empty() {
            "None".to_string()
        } else {
            filings_text
        },
        authorities = if authorities_text.is_empty() {
            "No case law uploaded".to_string()
        } else {
            authorities_text
        },
    );

    ToolPrompt { system, user }
}

/// Structured nine-section briefing note.
pub fn briefing(
    matter: &Matter,
    documents: &IndexMap<String, AssembledDocument>,
    instructions: Option<&str>,
) -> ToolPrompt {
    let system = format!(
        "You are a senior litigation counsel in {} producing a briefing note for the matter \"{}\".\n{}",
        matter.jurisdiction,
        matter.name,
        matter_context(matter),
    );

    let user = format!(
        r#"Produce a structured briefing note.

## Briefing Note — {name}
**Jurisdiction:** {jurisdiction}
**Date:** {date}

## 1. Background
## 2. The Parties
## 3. The Claim
## 4. Key Facts
## 5. Legal Issues
## 6. Evidence Summary
## 7. Current Procedural Position
## 8. Key Risks
## 9. Next Steps

{focus}DOCUMENTS:

{blocks}"#,
        name = matter.name,
        jurisdiction = matter.jurisdiction,
        date = chrono::Local::now().format("%-d %B %Y"),
        focus = focus_line(instructions),
        blocks = document_blocks(documents),
    );

    ToolPrompt { system, user }
}

/// Drafting tool. Falls back to a skeleton argument when no
/// instructions are given.
pub fn draft(
    matter: &Matter,
    documents: &IndexMap<String, AssembledDocument>,
    instructions: Option<&str>,
) -> ToolPrompt {
    let system = format!(
        "You are a senior litigation counsel in {jurisdiction} drafting a legal document for the matter \"{name}\". Apply {jurisdiction} law, procedure, and drafting conventions throughout.\n{context}",
        jurisdiction = matter.jurisdiction,
        name = matter.name,
        context = matter_context(matter),
    );

    let request = instructions
        .filter(|s| !s.is_empty())
        .unwrap_or("Draft a skeleton argument based on the matter documents.");

    let user = format!(
        "{}\n\nApply {} court rules and conventions. Use proper legal drafting style.\n\nDOCUMENTS:\n\n{}\n\n⚠️ Professional Caution: AI-generated draft. Review carefully before use.",
        request,
        matter.jurisdiction,
        document_blocks(documents)
    );

    ToolPrompt { system, user }
}
