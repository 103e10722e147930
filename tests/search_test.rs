use std::collections::BTreeMap;

use tracelens::search::SpanSearch;

use test_helpers::*;

#[test]
fn test_search_matches_span_names_case_insensitively() {
    let node = create_test_node("node_a");
    let spans = vec![
        create_test_span("produce_block", node.clone(), 0.0, 1.0, &[1]),
        create_test_span("apply_chunk", node.clone(), 1.0, 2.0, &[2]),
        create_test_span("Produce_Chunk", node, 2.0, 3.0, &[3]),
    ];

    let mut search = SpanSearch {
        query: "produce".to_string(),
        ..SpanSearch::default()
    };
    let count = search.run(&spans).unwrap();

    assert_eq!(count, 2);
    assert!(search.is_match(&[1]));
    assert!(!search.is_match(&[2]));
    assert!(search.is_match(&[3]));
}

#[test]
fn test_search_matches_node_names_and_attributes() {
    let node_a = create_test_node("validator-0");
    let node_b = create_test_node("rpc-node");
    let mut attrs = BTreeMap::new();
    attrs.insert("shard_id".to_string(), int_attr(3));
    let spans = vec![
        create_test_span("task", node_a, 0.0, 1.0, &[1]),
        create_test_span_with_attributes("task", node_b, 1.0, 2.0, &[2], attrs),
    ];

    let mut search = SpanSearch {
        query: "validator".to_string(),
        ..SpanSearch::default()
    };
    assert_eq!(search.run(&spans).unwrap(), 1);
    assert!(search.is_match(&[1]));

    search.query = "shard_id = 3".to_string();
    assert_eq!(search.run(&spans).unwrap(), 1);
    assert!(search.is_match(&[2]));
}

#[test]
fn test_search_supports_regex_patterns() {
    let node = create_test_node("node_a");
    let spans = vec![
        create_test_span("apply_chunk_0", node.clone(), 0.0, 1.0, &[1]),
        create_test_span("apply_chunk_12", node.clone(), 1.0, 2.0, &[2]),
        create_test_span("apply_block", node, 2.0, 3.0, &[3]),
    ];

    let mut search = SpanSearch {
        query: r"apply_chunk_\d+$".to_string(),
        ..SpanSearch::default()
    };
    assert_eq!(search.run(&spans).unwrap(), 2);
}

#[test]
fn test_invalid_pattern_reports_error_and_keeps_previous_results() {
    let node = create_test_node("node_a");
    let spans = vec![create_test_span("task", node, 0.0, 1.0, &[1])];

    let mut search = SpanSearch {
        query: "task".to_string(),
        ..SpanSearch::default()
    };
    assert_eq!(search.run(&spans).unwrap(), 1);

    search.query = "task(".to_string();
    let err = search.run(&spans).unwrap_err();
    assert!(format!("{err}").contains("invalid search pattern"));
    // The last successful results stay usable.
    assert!(search.active);
    assert!(search.is_match(&[1]));
}

#[test]
fn test_empty_query_clears_the_search() {
    let node = create_test_node("node_a");
    let spans = vec![create_test_span("task", node, 0.0, 1.0, &[1])];

    let mut search = SpanSearch {
        query: "task".to_string(),
        ..SpanSearch::default()
    };
    search.run(&spans).unwrap();
    assert!(search.active);

    search.query = "  ".to_string();
    assert_eq!(search.run(&spans).unwrap(), 0);
    assert!(!search.active);
    assert!(!search.is_match(&[1]));
}
