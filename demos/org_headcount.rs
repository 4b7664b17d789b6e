use std::collections::BTreeMap;

use rollup::{edges_from_paths, table, HealthCheck, HierarchyDefinition, NodeId, StructureConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. An organization as (dept, parent_dept) edges under root 0
    let org = table! {
        ["dept", "parent_dept", "manager"];
        [1, 0, "Mgr_1"], [12, 1, "Mgr_12"], [120, 12, "Mgr_120"],
        [121, 12, "Mgr_121"], [122, 12, "Mgr_122"], [13, 1, "Mgr_13"],
        [130, 13, "Mgr_130"], [1301, 130, "Mgr_1301"], [2, 0, "Mgr_2"],
        [21, 2, "Mgr_21"],
    };
    let h = HierarchyDefinition::build(&org, "dept", "parent_dept", 0)?;
    println!("{}", h.health_check());

    // 2. Staff, one row per person
    let pers = table! {
        ["dept", "pnr", "name"];
        [1, 456, "John"],
        [12, 573, "Peter"],
        [121, 574, "Paul"],
        [121, 578, "Mary"],
        [130, 666, "George"],
    };

    // 3. Expand and count per dept: one group-by covers every level
    let expanded = h.expand(&pers, "dept", &["h_ix", "h_level"])?;
    let mut counts: BTreeMap<(i64, i64), (String, usize)> = BTreeMap::new();
    for row in expanded.rows() {
        let key = (row[3].as_int64().unwrap_or(0), row[4].as_int64().unwrap_or(0));
        counts.entry(key).or_insert_with(|| (row[0].to_string(), 0)).1 += 1;
    }
    println!("dept  level  headcount");
    for ((_, level), (dept, n)) in &counts {
        println!("{dept:<5} {level:<6} {n}");
    }

    // 4. The same kind of hierarchy, described by label paths
    let labelled = table! {
        ["labels", "dept"];
        ["RvB", 10],
        ["RvB|Sales & Marketing", 100],
        ["RvB|Sales & Marketing|Marketing", 120],
        ["RvB|Finance & ICT", 200],
    };
    let edges = edges_from_paths(&labelled, "labels", &StructureConfig::new("dept", 0))?;
    let h2 = HierarchyDefinition::build(&edges, "dept", "parent_dept", 0)?;
    println!("level of Marketing: {:?}", h2.level(&NodeId::from(120)));

    Ok(())
}
