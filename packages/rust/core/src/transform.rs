//! Table → Document transform.
//!
//! 1. Empty cells become missing.
//! 2. Missing cells are forward-filled per column.
//! 3. Rows are grouped by `(Conversation ID, Prompt)`, then by `Classification`.
//!
//! Grouping is stable: rows inside a leaf group keep table order. Group order
//! is either ascending by key or first appearance, per [`GroupOrder`].

use std::collections::HashMap;
use std::hash::Hash;

use sheet2xml_shared::{
    ColumnNames, Conversation, Document, GroupOrder, Response, Result, Sheet2XmlError, Table,
};
use tracing::{debug, instrument};

/// Run the full transform: normalize, forward-fill, group.
#[instrument(skip_all, fields(rows = table.len()))]
pub fn transform(mut table: Table, columns: &ColumnNames, order: GroupOrder) -> Result<Document> {
    normalize_missing(&mut table);
    forward_fill(&mut table);
    build_document(&table, columns, order)
}

/// Replace every empty-string cell with the missing marker.
pub fn normalize_missing(table: &mut Table) {
    for row in table.rows_mut() {
        for cell in row.iter_mut() {
            if cell.as_deref() == Some("") {
                *cell = None;
            }
        }
    }
}

/// Fill each missing cell from the nearest preceding non-missing cell in the
/// same column. Cells before a column's first value stay missing.
pub fn forward_fill(table: &mut Table) {
    let width = table.columns().len();
    let mut last: Vec<Option<String>> = vec![None; width];

    for row in table.rows_mut() {
        for (cell, carried) in row.iter_mut().zip(last.iter_mut()) {
            match cell {
                Some(value) => *carried = Some(value.clone()),
                None => cell.clone_from(carried),
            }
        }
    }
}

/// Column positions the grouping reads.
struct ColumnIndex {
    conversation_id: usize,
    prompt: usize,
    classification: usize,
    text: usize,
    feedback: usize,
    next_conversation_id: usize,
}

impl ColumnIndex {
    fn resolve(table: &Table, names: &ColumnNames) -> Result<Self> {
        let missing: Vec<&str> = names
            .all()
            .into_iter()
            .filter(|name| table.column_index(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Sheet2XmlError::validation(format!(
                "sheet is missing required column(s): {}",
                missing.join(", ")
            )));
        }

        let idx = |name: &str| table.column_index(name).unwrap_or_default();
        Ok(Self {
            conversation_id: idx(&names.conversation_id),
            prompt: idx(&names.prompt),
            classification: idx(&names.classification),
            text: idx(&names.text),
            feedback: idx(&names.feedback),
            next_conversation_id: idx(&names.next_conversation_id),
        })
    }
}

/// Group an already normalized and filled table into a [`Document`].
///
/// A table with no data rows yields an empty document. Missing grouping keys
/// group under the empty string; missing text values become empty strings.
pub fn build_document(table: &Table, names: &ColumnNames, order: GroupOrder) -> Result<Document> {
    if table.is_empty() {
        return Ok(Document::default());
    }
    let cols = ColumnIndex::resolve(table, names)?;
    let rows = table.rows();
    let value = |row: usize, col: usize| rows[row][col].clone().unwrap_or_default();

    let conversation_groups = group_rows(
        0..rows.len(),
        |row| (value(row, cols.conversation_id), value(row, cols.prompt)),
        order,
    );

    let conversations: Vec<Conversation> = conversation_groups
        .into_iter()
        .map(|((id, prompt), members)| {
            let responses = group_rows(
                members.into_iter(),
                |row| value(row, cols.classification),
                order,
            )
            .into_iter()
            .map(|(classification, members)| Response {
                classification,
                texts: members.iter().map(|&row| value(row, cols.text)).collect(),
                feedback: value(members[0], cols.feedback),
                next_conversation_id: members
                    .iter()
                    .find_map(|&row| rows[row][cols.next_conversation_id].clone()),
            })
            .collect();

            Conversation {
                id,
                prompt,
                responses,
            }
        })
        .collect();

    let document = Document { conversations };
    debug!(
        conversations = document.conversations.len(),
        responses = document.response_count(),
        "grouped rows"
    );
    Ok(document)
}

/// Partition row indices by key. Member lists keep input order; groups are
/// in first-seen order, or sorted ascending by key for [`GroupOrder::Sorted`].
fn group_rows<K, I, F>(rows: I, key: F, order: GroupOrder) -> Vec<(K, Vec<usize>)>
where
    K: Ord + Hash + Clone,
    I: Iterator<Item = usize>,
    F: Fn(usize) -> K,
{
    let mut groups: Vec<(K, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<K, usize> = HashMap::new();

    for row in rows {
        let k = key(row);
        match positions.get(&k) {
            Some(&pos) => groups[pos].1.push(row),
            None => {
                positions.insert(k.clone(), groups.len());
                groups.push((k, vec![row]));
            }
        }
    }

    if order == GroupOrder::Sorted {
        groups.sort_by(|a, b| a.0.cmp(&b.0));
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheet2xml_shared::Cell;

    const HEADERS: [&str; 6] = [
        "Conversation ID",
        "Prompt",
        "Classification",
        "Text",
        "Feedback",
        "Next Conversation ID",
    ];

    fn table(rows: &[[&str; 6]]) -> Table {
        Table::new(
            HEADERS.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|v| Some(v.to_string())).collect())
                .collect(),
        )
        .unwrap()
    }

    fn column(table: &Table, idx: usize) -> Vec<Cell> {
        table.rows().iter().map(|r| r[idx].clone()).collect()
    }

    fn s(v: &str) -> Cell {
        Some(v.to_string())
    }

    #[test]
    fn normalize_turns_empty_into_missing() {
        let mut t = table(&[["1", "", "A", "x", "", ""]]);
        normalize_missing(&mut t);
        assert_eq!(
            t.rows()[0],
            vec![s("1"), None, s("A"), s("x"), None, None]
        );
    }

    #[test]
    fn forward_fill_uses_nearest_preceding_value() {
        let mut t = table(&[
            ["1", "", "", "", "", ""],
            ["", "", "", "", "", ""],
            ["2", "", "", "", "", ""],
            ["", "", "", "", "", ""],
        ]);
        normalize_missing(&mut t);
        forward_fill(&mut t);
        assert_eq!(column(&t, 0), vec![s("1"), s("1"), s("2"), s("2")]);
    }

    #[test]
    fn forward_fill_leaves_leading_missing_cells() {
        let mut t = table(&[
            ["", "", "", "", "", ""],
            ["", "Hi", "", "", "", ""],
            ["", "", "", "", "", ""],
        ]);
        normalize_missing(&mut t);
        forward_fill(&mut t);
        assert_eq!(column(&t, 1), vec![None, s("Hi"), s("Hi")]);
        assert_eq!(column(&t, 0), vec![None, None, None]);
    }

    #[test]
    fn forward_fill_is_per_column() {
        let mut t = table(&[
            ["1", "Hi", "A", "x", "ok", ""],
            ["", "", "B", "", "", "9"],
            ["", "", "", "z", "", ""],
        ]);
        normalize_missing(&mut t);
        forward_fill(&mut t);
        assert_eq!(column(&t, 2), vec![s("A"), s("B"), s("B")]);
        assert_eq!(column(&t, 3), vec![s("x"), s("x"), s("z")]);
        assert_eq!(column(&t, 5), vec![None, s("9"), s("9")]);
    }

    #[test]
    fn worked_example() {
        let t = table(&[
            ["1", "Hi", "A", "x", "ok", ""],
            ["1", "Hi", "A", "y", "", "2"],
        ]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap();

        assert_eq!(
            doc,
            Document {
                conversations: vec![Conversation {
                    id: "1".into(),
                    prompt: "Hi".into(),
                    responses: vec![Response {
                        classification: "A".into(),
                        texts: vec!["x".into(), "y".into()],
                        feedback: "ok".into(),
                        next_conversation_id: Some("2".into()),
                    }],
                }],
            }
        );
    }

    #[test]
    fn feedback_comes_from_first_row_of_group() {
        let t = table(&[
            ["1", "Hi", "A", "x", "first", ""],
            ["1", "Hi", "A", "y", "second", ""],
            ["1", "Hi", "A", "z", "third", ""],
        ]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap();
        let response = &doc.conversations[0].responses[0];
        assert_eq!(response.feedback, "first");
        assert_eq!(response.texts, vec!["x", "y", "z"]);
    }

    #[test]
    fn next_conversation_id_absent_when_never_set() {
        let t = table(&[
            ["1", "Hi", "A", "x", "ok", ""],
            ["1", "Hi", "B", "y", "ok", ""],
        ]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap();
        assert!(
            doc.conversations[0]
                .responses
                .iter()
                .all(|r| r.next_conversation_id.is_none())
        );
    }

    #[test]
    fn next_conversation_id_is_first_value_in_group() {
        // Rows are non-adjacent: B sits between the two A rows.
        let t = table(&[
            ["1", "Hi", "A", "x", "ok", ""],
            ["1", "Hi", "B", "y", "ok", "7"],
            ["1", "Hi", "A", "z", "ok", "8"],
        ]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap();
        let responses = &doc.conversations[0].responses;
        assert_eq!(responses[0].classification, "A");
        // Row 3's own "8" is the first non-missing value in group A.
        assert_eq!(responses[0].next_conversation_id.as_deref(), Some("8"));
        assert_eq!(responses[0].texts, vec!["x", "z"]);
        assert_eq!(responses[1].next_conversation_id.as_deref(), Some("7"));
    }

    #[test]
    fn sorted_order_is_lexicographic_not_row_order() {
        let t = table(&[
            ["2", "Second", "Z", "z", "f", ""],
            ["10", "Tenth", "B", "b", "f", ""],
            ["10", "Tenth", "A", "a", "f", ""],
            ["1", "First", "M", "m", "f", ""],
        ]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap();

        let ids: Vec<&str> = doc.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "10", "2"]);
        let classes: Vec<&str> = doc.conversations[1]
            .responses
            .iter()
            .map(|r| r.classification.as_str())
            .collect();
        assert_eq!(classes, vec!["A", "B"]);
    }

    #[test]
    fn sorted_order_uses_prompt_as_secondary_key() {
        let t = table(&[
            ["1", "b prompt", "A", "x", "f", ""],
            ["1", "a prompt", "A", "y", "f", ""],
        ]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap();
        let prompts: Vec<&str> = doc.conversations.iter().map(|c| c.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["a prompt", "b prompt"]);
        assert!(doc.conversations.iter().all(|c| c.id == "1"));
    }

    #[test]
    fn first_seen_order_follows_rows() {
        let t = table(&[
            ["2", "Second", "Z", "z", "f", ""],
            ["10", "Tenth", "B", "b", "f", ""],
            ["10", "Tenth", "A", "a", "f", ""],
            ["1", "First", "M", "m", "f", ""],
        ]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::FirstSeen).unwrap();

        let ids: Vec<&str> = doc.conversations.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "10", "1"]);
        let classes: Vec<&str> = doc.conversations[1]
            .responses
            .iter()
            .map(|r| r.classification.as_str())
            .collect();
        assert_eq!(classes, vec!["B", "A"]);
    }

    #[test]
    fn every_row_lands_in_exactly_one_leaf() {
        let rows = [
            ["1", "Hi", "A", "r0", "f", ""],
            ["", "", "", "r1", "", ""],
            ["", "", "B", "r2", "", "2"],
            ["2", "Yo", "A", "r3", "f", ""],
            ["", "", "", "r4", "", ""],
            ["1", "Hi", "A", "r5", "f", ""],
            ["", "Other", "", "r6", "", ""],
        ];
        let doc = transform(table(&rows), &ColumnNames::default(), GroupOrder::Sorted).unwrap();

        let mut texts: Vec<String> = doc
            .conversations
            .iter()
            .flat_map(|c| c.responses.iter())
            .flat_map(|r| r.texts.iter().cloned())
            .collect();
        texts.sort();
        let expected: Vec<String> = (0..rows.len()).map(|i| format!("r{i}")).collect();
        assert_eq!(texts, expected);
    }

    #[test]
    fn leading_missing_values_become_empty_strings() {
        let t = table(&[["", "", "", "", "", ""], ["1", "Hi", "A", "x", "ok", ""]]);
        let doc = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap();

        assert_eq!(doc.conversations.len(), 2);
        let blank = &doc.conversations[0];
        assert_eq!(blank.id, "");
        assert_eq!(blank.prompt, "");
        assert_eq!(blank.responses[0].classification, "");
        assert_eq!(blank.responses[0].texts, vec![""]);
        assert_eq!(blank.responses[0].feedback, "");
        assert_eq!(blank.responses[0].next_conversation_id, None);
    }

    #[test]
    fn missing_columns_are_validation_error() {
        let t = Table::new(
            vec!["Conversation ID".into(), "Prompt".into()],
            vec![vec![s("1"), s("Hi")]],
        )
        .unwrap();
        let err = transform(t, &ColumnNames::default(), GroupOrder::Sorted).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Classification"));
        assert!(msg.contains("Next Conversation ID"));
        assert!(!msg.contains("Prompt,"));
    }

    #[test]
    fn custom_column_names() {
        let columns = ColumnNames {
            prompt: "Question".into(),
            ..ColumnNames::default()
        };
        let headers = [
            "Conversation ID",
            "Question",
            "Classification",
            "Text",
            "Feedback",
            "Next Conversation ID",
            "Notes",
        ];
        let t = Table::new(
            headers.iter().map(|h| h.to_string()).collect(),
            vec![vec![s("1"), s("Why?"), s("A"), s("x"), s("ok"), None, s("ignored")]],
        )
        .unwrap();
        let doc = transform(t, &columns, GroupOrder::Sorted).unwrap();
        assert_eq!(doc.conversations[0].prompt, "Why?");
    }

    #[test]
    fn empty_table_is_empty_document() {
        let doc = transform(Table::default(), &ColumnNames::default(), GroupOrder::Sorted).unwrap();
        assert!(doc.conversations.is_empty());
    }
}
