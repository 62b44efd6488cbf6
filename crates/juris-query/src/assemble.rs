//! Grouping and document reassembly.

use indexmap::IndexMap;

use juris_core::{AssembledDocument, Passage, RetrievedPassage};

/// Group retrieved passages by source document.
///
/// Documents keep the order they first appear in, and passages keep
/// their arrival order within each document.
pub fn group_by_document(
    passages: Vec<RetrievedPassage>,
) -> IndexMap<String, Vec<RetrievedPassage>> {
    let mut groups: IndexMap<String, Vec<RetrievedPassage>> = IndexMap::new();

    for passage in passages {
        groups
            .entry(passage.document_name.clone())
            .or_default()
            .push(passage);
    }

    groups
}

/// Reassemble full documents from stored passages.
///
/// Passages are grouped by document name, ordered by their position in
/// the document, and joined with blank lines.
pub fn assemble_documents(passages: Vec<Passage>) -> IndexMap<String, AssembledDocument> {
    let mut groups: IndexMap<String, Vec<Passage>> = IndexMap::new();

    for passage in passages {
        groups
            .entry(passage.document_name.clone())
            .or_default()
            .push(passage);
    }

    groups
        .into_iter()
        .map(|(name, mut group)| {
            group.sort_by_key(|p| p.seq);
            let doc_kind = group[0].doc_kind.clone();
            let text = group
                .iter()
                .map(|p| p.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");

            (name, AssembledDocument { doc_kind, text })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use ulid::Ulid;

    fn retrieved(name: &str, kind: &str, content: &str) -> RetrievedPassage {
        RetrievedPassage {
            content: content.to_string(),
            document_name: name.to_string(),
            doc_kind: kind.to_string(),
        }
    }

    #[test]
    fn test_group_preserves_first_seen_order() {
        let passages = vec![
            retrieved("reply.txt", "Pleading", "reply first"),
            retrieved("claim.txt", "Pleading", "claim first"),
            retrieved("reply.txt", "Pleading", "reply second"),
        ];

        let groups = group_by_document(passages);

        let names: Vec<&String> = groups.keys().collect();
        assert_eq!(names, vec!["reply.txt", "claim.txt"]);
        assert_eq!(groups["reply.txt"].len(), 2);
        assert_eq!(groups["reply.txt"][0].content, "reply first");
        assert_eq!(groups["reply.txt"][1].content, "reply second");
    }

    #[test]
    fn test_assemble_sorts_by_position_and_joins() {
        let matter_id = Ulid::new();
        let doc_id = Ulid::new();

        // Deliberately out of order
        let passages = vec![
            Passage::new(matter_id, doc_id, "affidavit.txt", "Affidavit", 2, "third"),
            Passage::new(matter_id, doc_id, "affidavit.txt", "Affidavit", 0, "first"),
            Passage::new(matter_id, doc_id, "affidavit.txt", "Affidavit", 1, "second"),
        ];

        let assembled = assemble_documents(passages);

        assert_eq!(assembled.len(), 1);
        let doc = &assembled["affidavit.txt"];
        assert_eq!(doc.doc_kind, "Affidavit");
        assert_eq!(doc.text, "first\n\nsecond\n\nthird");
    }

    #[test]
    fn test_assemble_multiple_documents() {
        let matter_id = Ulid::new();
        let doc_a = Ulid::new();
        let doc_b = Ulid::new();

        let passages = vec![
            Passage::new(matter_id, doc_b, "b.txt", "Case Law", 0, "b zero"),
            Passage::new(matter_id, doc_a, "a.txt", "Pleading", 0, "a zero"),
            Passage::new(matter_id, doc_b, "b.txt", "Case Law", 1, "b one"),
        ];

        let assembled = assemble_documents(passages);

        let names: Vec<&String> = assembled.keys().collect();
        assert_eq!(names, vec!["b.txt", "a.txt"]);
        assert_eq!(assembled["b.txt"].text, "b zero\n\nb one");
        assert_eq!(assembled["a.txt"].doc_kind, "Pleading");
    }
}
