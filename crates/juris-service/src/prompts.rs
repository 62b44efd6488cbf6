//! System prompt construction for the analysis lane.
//!
//! Prompt text is observable behavior: tests assert that grounding
//! context and instructions reach the completion backend verbatim.

use juris_core::{Matter, RetrievedPassage};
use juris_query::group_by_document;

/// Render retrieved passages as the grounding-context block, grouped by
/// source document in first-seen order. `None` when nothing was
/// retrieved.
pub fn retrieved_context(passages: Vec<RetrievedPassage>) -> Option<String> {
    if passages.is_empty() {
        return None;
    }

    let mut context = String::from("RELEVANT PASSAGES FROM MATTER DOCUMENTS:\n\n");
    for (name, group) in group_by_document(passages) {
        let contents: Vec<&str> = group.iter().map(|p| p.content.as_str()).collect();
        context.push_str(&format!(
            "--- {} [{}] ---\n{}\n\n",
            name,
            group[0].doc_kind,
            contents.join("\n\n")
        ));
    }

    Some(context)
}

/// The nature/issues context lines shared by the tool prompts. Empty
/// when the matter carries neither.
pub fn matter_context(matter: &Matter) -> String {
    let mut lines = Vec::new();
    if !matter.nature.is_empty() {
        lines.push(format!("Nature of the dispute: {}", matter.nature));
    }
    if !matter.issues.is_empty() {
        lines.push(format!("Key issues: {}", matter.issues));
    }
    lines.join("\n")
}

/// Build the analysis-lane system prompt around the grounding context.
pub fn analysis_system_prompt(
    matter: &Matter,
    context: Option<&str>,
    query_type: Option<&str>,
    focus_areas: &[String],
) -> String {
    let grounding = match context {
        Some(context) => format!(
            "The following passages are retrieved from the matter documents as most relevant to this question. Refer to them specifically, quoting where helpful:\n\n{}",
            context
        ),
        None => "No documents uploaded yet. Answer based on your legal knowledge.".to_string(),
    };

    let focus = if focus_areas.is_empty() {
        "all relevant issues".to_string()
    } else {
        focus_areas.join(", ")
    };

    let query_type = query_type
        .filter(|q| !q.is_empty())
        .unwrap_or("General Legal Analysis");

    format!(
        r#"You are a senior litigation counsel specialising in {jurisdiction} offshore common law litigation. You have deep expertise in Bermuda, Cayman Islands and BVI law, court rules (RSC Bermuda, GCR Cayman, CPR BVI), statutes, company law, trust law, insolvency, and English common law precedent as applied offshore.

Matter: "{name}"

{grounding}

In every response:
1. Apply {jurisdiction}-specific law — cite local statutes, court rules, and leading authority by name
2. Refer to document passages specifically, identifying which document they come from
3. Flag where {jurisdiction} law diverges from English law or other offshore jurisdictions
4. Be precise — identify unsettled points and flag litigation risk
5. Address these focus areas: {focus}
6. Use clear ## headings. Do not truncate your response.
Analysis type: {query_type}
End with: ⚠️ Professional Caution: AI-generated analysis. Verify against current primary sources before reliance."#,
        jurisdiction = matter.jurisdiction,
        name = matter.name,
        grounding = grounding,
        focus = focus,
        query_type = query_type,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(content: &str, document_name: &str, doc_kind: &str) -> RetrievedPassage {
        RetrievedPassage {
            content: content.to_string(),
            document_name: document_name.to_string(),
            doc_kind: doc_kind.to_string(),
        }
    }

    #[test]
    fn test_retrieved_context_groups_by_document() {
        let context = retrieved_context(vec![
            passage("clause one", "agreement.txt", "Contract"),
            passage("prayer for relief", "claim.txt", "Pleading"),
            passage("clause two", "agreement.txt", "Contract"),
        ])
        .unwrap();

        assert!(context.starts_with("RELEVANT PASSAGES FROM MATTER DOCUMENTS:\n\n"));
        assert!(context.contains("--- agreement.txt [Contract] ---\nclause one\n\nclause two"));
        assert!(context.contains("--- claim.txt [Pleading] ---\nprayer for relief"));
    }

    #[test]
    fn test_retrieved_context_empty() {
        assert!(retrieved_context(Vec::new()).is_none());
    }

    #[test]
    fn test_matter_context_lines() {
        let mut matter = Matter::new("Smith v Jones", None, None, None, "alice");
        assert_eq!(matter_context(&matter), "");

        matter.nature = "Breach of charterparty".to_string();
        matter.issues = "Delivery; demurrage".to_string();
        assert_eq!(
            matter_context(&matter),
            "Nature of the dispute: Breach of charterparty\nKey issues: Delivery; demurrage"
        );
    }

    #[test]
    fn test_analysis_prompt_with_context() {
        let matter = Matter::new("Smith v Jones", Some("Cayman Islands"), None, None, "alice");
        let system = analysis_system_prompt(
            &matter,
            Some("RELEVANT PASSAGES FROM MATTER DOCUMENTS:\n\n--- a.txt [Other] ---\nbody\n\n"),
            Some("Risk Assessment"),
            &["limitation".to_string(), "quantum".to_string()],
        );

        assert!(system.contains("specialising in Cayman Islands offshore common law litigation"));
        assert!(system.contains("Matter: \"Smith v Jones\""));
        assert!(system.contains("--- a.txt [Other] ---"));
        assert!(system.contains("5. Address these focus areas: limitation, quantum"));
        assert!(system.contains("Analysis type: Risk Assessment"));
        assert!(system.contains("Professional Caution"));
    }

    #[test]
    fn test_analysis_prompt_defaults_without_context() {
        let matter = Matter::new("Smith v Jones", None, None, None, "alice");
        let system = analysis_system_prompt(&matter, None, None, &[]);

        assert!(system.contains("No documents uploaded yet. Answer based on your legal knowledge."));
        assert!(!system.contains("RELEVANT PASSAGES"));
        assert!(system.contains("5. Address these focus areas: all relevant issues"));
        assert!(system.contains("Analysis type: General Legal Analysis"));
    }
}
