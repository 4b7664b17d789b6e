#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use crate::hierarchy::HierarchyDefinition;
    use crate::table::{NodeId, Table, Value};
    use crate::{table, ExpandConfig, Result};
    use proptest::prelude::*;

    fn org() -> Table {
        table! {
            ["dept", "parent_dept"];
            [1, 0], [12, 1], [120, 12], [121, 12], [122, 12],
            [13, 1], [130, 13], [1301, 130], [2, 0], [21, 2],
        }
    }

    fn count_by_node(expanded: &Table, col: &str) -> HashMap<NodeId, usize> {
        let mut counts = HashMap::new();
        for v in expanded.column(col).into_iter().flatten() {
            if let Some(id) = NodeId::from_value(v) {
                *counts.entry(id).or_default() += 1;
            }
        }
        counts
    }

    #[test]
    fn test_headcount_rollup() -> Result<()> {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0)?;
        let pers = table! {
            ["dept", "pnr", "name"];
            [1, 456, "John"],
            [12, 573, "Peter"],
            [121, 574, "Paul"],
            [121, 578, "Mary"],
            [130, 666, "George"],
        };

        let expanded = h.expand(&pers, "dept", &["h_ix", "h_level"])?;
        let counts = count_by_node(&expanded, "dept");

        // 1: everyone, 12: Peter+Paul+Mary, 13: George via 130
        assert_eq!(counts[&NodeId::from(1)], 5);
        assert_eq!(counts[&NodeId::from(12)], 3);
        assert_eq!(counts[&NodeId::from(121)], 2);
        assert_eq!(counts[&NodeId::from(13)], 1);
        assert_eq!(counts[&NodeId::from(130)], 1);
        assert!(!counts.contains_key(&NodeId::from(2)));
        assert!(!counts.contains_key(&NodeId::from(0)));
        Ok(())
    }

    #[test]
    fn test_sum_rollup_over_payload() -> Result<()> {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0)?;
        let costs = table! {
            ["dept", "amount"];
            [120, 10.0], [121, 2.5], [21, 4.0], [1301, 1.0],
        };
        let expanded = h.expand(&costs, "dept", &[])?;

        let mut totals: HashMap<NodeId, f64> = HashMap::new();
        for row in expanded.rows() {
            let id = NodeId::from_value(&row[0]).unwrap();
            *totals.entry(id).or_default() += row[1].as_float64().unwrap();
        }
        assert!((totals[&NodeId::from(1)] - 13.5).abs() < 1e-12);
        assert!((totals[&NodeId::from(12)] - 12.5).abs() < 1e-12);
        assert!((totals[&NodeId::from(2)] - 4.0).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_rollup_sorted_in_declaration_order() -> Result<()> {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0)?;
        let pers = table! { ["dept", "pnr"]; [21, 1], [1301, 2], [1, 3] };
        let expanded = h
            .expander(ExpandConfig::new("dept").with_columns(["h_ix", "h_level"]))
            .expand(&pers)?;

        let mut keys: Vec<(i64, i64)> = expanded
            .rows()
            .iter()
            .map(|r| (r[2].as_int64().unwrap(), r[3].as_int64().unwrap()))
            .collect();
        keys.sort_unstable();
        keys.dedup();
        let ordered: Vec<i64> = keys
            .iter()
            .map(|&(ix, _)| {
                let rec = h.iter().find(|r| r.ordering_index == ix).unwrap();
                match &rec.node {
                    NodeId::Int(i) => *i,
                    NodeId::Str(_) => unreachable!(),
                }
            })
            .collect();
        assert_eq!(ordered, vec![1, 13, 130, 1301, 2, 21]);
        Ok(())
    }

    #[test]
    fn test_one_definition_many_fact_tables() -> Result<()> {
        let h = HierarchyDefinition::build(&org(), "dept", "parent_dept", 0)?;
        let a = table! { ["dept", "x"]; [121, 1] };
        let b = table! { ["unit", "y", "z"]; [21, "p", true] };
        assert_eq!(h.expand(&a, "dept", &[])?.len(), 3);
        let out = h.expand(&b, "unit", &["h_level"])?;
        assert_eq!(out.len(), 2);
        assert_eq!(out.get(1, "z"), Some(&Value::Bool(true)));
        assert_eq!(out.get(1, "h_level"), Some(&Value::Int64(2)));
        Ok(())
    }

    /// Random tree: node `i + 1` hangs under `parents[i]` (0 is the root).
    fn random_tree() -> impl Strategy<Value = Vec<usize>> {
        (1usize..80).prop_flat_map(|n| (0..n).map(|i| 0..=i).collect::<Vec<_>>())
    }

    fn edges_for(parents: &[usize]) -> Table {
        let mut edges = Table::new(["node", "parent_node"]);
        for (i, &p) in parents.iter().enumerate() {
            edges
                .push_row(vec![Value::from((i + 1) as i64), Value::from(p as i64)])
                .unwrap();
        }
        edges
    }

    proptest! {
        #[test]
        fn level_equals_chain_length(parents in random_tree()) {
            let h = HierarchyDefinition::builder("node").build(&edges_for(&parents)).unwrap();
            for rec in h.iter() {
                let chain = h.ancestor_chain(&rec.node).unwrap();
                prop_assert_eq!(chain.len(), rec.level);
                prop_assert_eq!(chain[chain.len() - 1], &rec.node);
                prop_assert_eq!(&h.get(chain[0]).unwrap().parent, h.root());
                for pair in chain.windows(2) {
                    prop_assert_eq!(&h.get(pair[1]).unwrap().parent, pair[0]);
                }
            }
        }

        #[test]
        fn rollup_counts_telescope(
            parents in random_tree(),
            picks in proptest::collection::vec(any::<prop::sample::Index>(), 0..120),
        ) {
            let edges = edges_for(&parents);
            let h = HierarchyDefinition::builder("node").build(&edges).unwrap();

            let mut facts = Table::new(["node", "id"]);
            for (k, pick) in picks.iter().enumerate() {
                let node = (pick.index(parents.len()) + 1) as i64;
                facts.push_row(vec![Value::from(node), Value::from(k as i64)]).unwrap();
            }

            let expanded = h.expand(&facts, "node", &[]).unwrap();
            let counts = count_by_node(&expanded, "node");
            let count = |id: &NodeId| counts.get(id).copied().unwrap_or(0);

            // Parents see at least their children's facts.
            for rec in h.iter() {
                if &rec.parent != h.root() {
                    prop_assert!(count(&rec.parent) >= count(&rec.node));
                }
            }
            // Top-level totals partition the facts.
            let top_total: usize = h.top_level().map(|r| count(&r.node)).sum();
            prop_assert_eq!(top_total, facts.len());

            // Same input, same output.
            let again = h.expand(&facts, "node", &[]).unwrap();
            prop_assert_eq!(expanded, again);
        }
    }
}
