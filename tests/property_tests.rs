//! Property-based tests for the invariants called out in spec §8.

use proptest::prelude::*;
use relbase_core::index::BTree;
use relbase_core::table::Table;
use relbase_core::value::ColumnType;

#[derive(Debug, Clone)]
enum Op {
    Insert(i64),
    DeleteExisting,
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    prop::collection::vec(
        prop_oneof![
            (0i64..1000).prop_map(Op::Insert),
            Just(Op::DeleteExisting),
        ],
        0..200,
    )
}

proptest! {
    /// Arbitrary interleavings of insert/delete always leave `meta_length`'s
    /// would-be value (the live row count) equal to the number of ids that
    /// were inserted and never subsequently deleted (spec §8 `meta_length`
    /// invariant), and every freed position is reused by a later insert
    /// rather than leaking an ever-growing `rows` vector.
    #[test]
    fn insert_delete_preserves_live_row_count(ops in ops_strategy()) {
        let mut t = Table::new(
            "t",
            vec!["id".into()],
            vec![ColumnType::Int],
            Some(0),
        );
        let mut free = Vec::new();
        let mut live_ids: Vec<i64> = Vec::new();

        for op in ops {
            match op {
                Op::Insert(id) => {
                    if live_ids.contains(&id) {
                        continue;
                    }
                    let before_len = t.rows.len();
                    let before_free = free.len();
                    t.insert(&[id.to_string()], &mut free).unwrap();
                    live_ids.push(id);
                    if before_free > 0 {
                        prop_assert_eq!(t.rows.len(), before_len, "reused a freed slot instead of growing");
                    }
                }
                Op::DeleteExisting => {
                    if let Some(id) = live_ids.pop() {
                        let deleted = t.delete_where(&format!("id={id}"), &mut free).unwrap();
                        prop_assert_eq!(deleted, 1);
                    }
                }
            }
        }

        prop_assert_eq!(t.live_row_count(), live_ids.len());
        // every free position holds a tombstone, and every tombstone's
        // position is in the free list exactly once.
        let mut tombstone_positions: Vec<usize> = t
            .rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.as_live().is_none())
            .map(|(i, _)| i)
            .collect();
        let mut free_sorted = free.clone();
        tombstone_positions.sort_unstable();
        free_sorted.sort_unstable();
        prop_assert_eq!(tombstone_positions, free_sorted);
    }
}

proptest! {
    /// The B-tree's `find` agrees with a linear scan of everything inserted
    /// so far, for arbitrary insertion orders (spec §8).
    #[test]
    fn btree_find_agrees_with_linear_scan(keys in prop::collection::vec(0i64..500, 0..300)) {
        let mut bt: BTree<i64> = BTree::new();
        let mut inserted: Vec<(i64, usize)> = Vec::new();
        for (payload, &key) in keys.iter().enumerate() {
            bt.insert(key, payload);
            inserted.push((key, payload));
        }

        for &(key, _) in &inserted {
            let expected = inserted.iter().find(|(k, _)| *k == key).map(|(_, p)| *p);
            prop_assert_eq!(bt.find(&key), expected);
        }
        prop_assert_eq!(bt.find(&-1), None);
    }
}
