use folio::document::{DocumentSession, NavigationEntry, OpenOptions, build_navigation_tree};
use folio::test_utils::test_helpers::{FakeBackend, deep_outline, flat_outline};

/// Walk down the first-child chain without recursion
fn chain_depth(root: &NavigationEntry) -> usize {
    let mut depth = 0;
    let mut entry = root;
    while let Some(child) = entry.children.first() {
        assert_eq!(entry.children.len(), 1);
        assert_eq!(child.title, format!("Level {depth}"));
        depth += 1;
        entry = child;
    }
    depth
}

#[test]
fn test_deep_outline_is_flattened_and_dropped_iteratively() {
    let depth = 100_000;
    let graph = deep_outline(depth);

    let mut resolved = 0;
    let tree = build_navigation_tree(Some(&graph), |page: &usize| {
        resolved += 1;
        Some(*page)
    });

    assert_eq!(resolved, depth);
    assert_eq!(chain_depth(&tree), depth);
    assert_eq!(tree.entry_count(), depth + 1);

    let rows = tree.rows();
    assert_eq!(rows.len(), depth + 1);
    assert_eq!(rows[depth].depth, depth);
    assert_eq!(rows[depth].page_label, "1");
    drop(rows);

    drop(tree);
}

#[test]
fn test_deep_tree_clones_and_compares_iteratively() {
    let depth = 100_000;
    let tree = build_navigation_tree(Some(&deep_outline(depth)), |page: &usize| Some(*page));

    let mut copy = tree.clone();
    assert_eq!(chain_depth(&copy), depth);
    assert!(copy == tree);
    assert!(format!("{copy:?}").contains("children: 1"));

    let mut leaf = &mut copy;
    for _ in 0..depth {
        leaf = &mut leaf.children[0];
    }
    leaf.page_number = Some(2);
    assert!(copy != tree);
}

#[test]
fn test_deep_outline_through_session() {
    let backend = FakeBackend::with_pages(1).outline(deep_outline(5_000));
    let session =
        DocumentSession::open(&backend, "deep.pdf", None, OpenOptions::default()).unwrap();

    let tree = session.navigation_tree().unwrap();
    assert_eq!(chain_depth(&tree), 5_000);
}

#[test]
fn test_long_sibling_chain_keeps_order() {
    let count = 50_000;
    let tree = build_navigation_tree(Some(&flat_outline(count)), |page: &usize| Some(*page));

    assert_eq!(tree.children.len(), count);
    for (i, entry) in tree.children.iter().enumerate() {
        assert_eq!(entry.title, format!("Entry {i}"));
        assert_eq!(entry.page_number, Some(i + 1));
    }
}
