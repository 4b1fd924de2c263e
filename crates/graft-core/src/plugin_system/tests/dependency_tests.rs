// crates/graft-core/src/plugin_system/tests/dependency_tests.rs
#![cfg(test)]

use crate::plugin_system::{DependencyResolver, OrderingError, PluginRecord};

fn plugin(name: &str, priority: i64) -> PluginRecord {
    PluginRecord::new(name).with_priority(priority)
}

fn order_of(records: Vec<PluginRecord>) -> Vec<String> {
    DependencyResolver::new()
        .resolve(records)
        .expect("batch should resolve")
        .names()
        .into_iter()
        .map(String::from)
        .collect()
}

#[test]
fn test_descending_priority_without_dependencies() {
    let order = order_of(vec![plugin("p3", 1), plugin("p1", 10), plugin("p2", 5)]);
    assert_eq!(order, vec!["p1", "p2", "p3"]);
}

#[test]
fn test_equal_priorities_keep_batch_order() {
    let order = order_of(vec![
        plugin("a", 1),
        plugin("b", 5),
        plugin("c", 5),
        plugin("d", -2),
        plugin("e", 0),
    ]);
    assert_eq!(order, vec!["b", "c", "a", "e", "d"]);
}

#[test]
fn test_default_priority_is_zero() {
    let record = PluginRecord::new("plain");
    assert_eq!(record.priority(), 0);

    let order = order_of(vec![plugin("negative", -1), PluginRecord::new("plain"), plugin("positive", 1)]);
    assert_eq!(order, vec!["positive", "plain", "negative"]);
}

#[test]
fn test_dependency_beats_priority() {
    let order = order_of(vec![
        plugin("a", 100).depends_on("b"),
        plugin("b", 1),
    ]);
    assert_eq!(order, vec!["b", "a"]);
}

#[test]
fn test_transitive_dependencies_are_pulled_forward() {
    let order = order_of(vec![
        plugin("a", 0),
        plugin("b", 0).depends_on("a"),
        plugin("c", 10).depends_on("b"),
        plugin("x", 5),
    ]);
    assert_eq!(order, vec!["a", "b", "c", "x"]);
}

#[test]
fn test_diamond_dependencies() {
    let order = order_of(vec![
        plugin("d", 10).depends_on("b").depends_on("c"),
        plugin("c", 5).depends_on("a"),
        plugin("b", 1).depends_on("a"),
        plugin("a", 0),
    ]);
    assert_eq!(order, vec!["a", "b", "c", "d"]);

    let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
    assert!(pos("a") < pos("b"));
    assert!(pos("a") < pos("c"));
    assert!(pos("b") < pos("d"));
    assert!(pos("c") < pos("d"));
}

#[test]
fn test_cycle_reports_full_path() {
    let result = DependencyResolver::new().resolve(vec![
        plugin("a", 0).depends_on("b"),
        plugin("b", 0).depends_on("c"),
        plugin("c", 0).depends_on("a"),
    ]);

    match result {
        Err(OrderingError::CircularDependency(path)) => {
            assert_eq!(path, vec!["a", "b", "c", "a"]);
        }
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
}

#[test]
fn test_cycle_message_format() {
    let err = DependencyResolver::new()
        .resolve(vec![plugin("a", 0).depends_on("b"), plugin("b", 0).depends_on("a")])
        .unwrap_err();
    assert_eq!(err.to_string(), "Circular dependency detected: a -> b -> a");
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let err = DependencyResolver::new()
        .resolve(vec![plugin("solo", 0).depends_on("solo")])
        .unwrap_err();
    assert_eq!(err, OrderingError::CircularDependency(vec!["solo".into(), "solo".into()]));
}

#[test]
fn test_cycle_behind_acyclic_prefix() {
    let err = DependencyResolver::new()
        .resolve(vec![
            plugin("entry", 0).depends_on("x"),
            plugin("x", 0).depends_on("y"),
            plugin("y", 0).depends_on("x"),
        ])
        .unwrap_err();
    assert_eq!(err, OrderingError::CircularDependency(vec!["x".into(), "y".into(), "x".into()]));
}

#[test]
fn test_long_dependency_chain() {
    const LEN: usize = 50_000;
    let records: Vec<PluginRecord> = (0..LEN)
        .map(|i| {
            let record = plugin(&format!("p{}", i), 0);
            if i + 1 < LEN {
                record.depends_on(format!("p{}", i + 1))
            } else {
                record
            }
        })
        .collect();

    let order = order_of(records);
    assert_eq!(order.len(), LEN);
    assert_eq!(order[0], format!("p{}", LEN - 1));
    assert_eq!(order[LEN - 1], "p0");
}

#[test]
fn test_long_chain_closing_into_a_cycle() {
    const LEN: usize = 50_000;
    let records: Vec<PluginRecord> = (0..LEN)
        .map(|i| plugin(&format!("p{}", i), 0).depends_on(format!("p{}", (i + 1) % LEN)))
        .collect();

    match DependencyResolver::new().resolve(records).unwrap_err() {
        OrderingError::CircularDependency(path) => {
            assert_eq!(path.len(), LEN + 1);
            assert_eq!(path.first().map(String::as_str), Some("p0"));
            assert_eq!(path.last().map(String::as_str), Some("p0"));
        }
        other => panic!("Expected CircularDependency, got {:?}", other),
    }
}

#[test]
fn test_missing_dependency_names_both_plugins() {
    let err = DependencyResolver::new()
        .resolve(vec![plugin("present", 0), plugin("needy", 0).depends_on("ghost")])
        .unwrap_err();

    assert_eq!(
        err,
        OrderingError::MissingDependency {
            plugin: "needy".into(),
            dependency: "ghost".into(),
        }
    );
    let message = err.to_string();
    assert!(message.contains("needy"));
    assert!(message.contains("ghost"));
}

#[test]
fn test_duplicate_dependency_declarations_collapse() {
    let record = plugin("a", 0).depends_on("b").depends_on("b").depends_on("c");
    assert_eq!(record.dependencies(), ["b".to_string(), "c".to_string()]);
}

#[test]
fn test_empty_batch() {
    let order = DependencyResolver::new().resolve(Vec::new()).unwrap();
    assert!(order.is_empty());
    assert_eq!(order.len(), 0);
}

#[test]
fn test_resolved_order_lookup() {
    let order = DependencyResolver::new()
        .resolve(vec![plugin("low", 1), plugin("high", 9)])
        .unwrap();
    assert_eq!(order.position("high"), Some(0));
    assert_eq!(order.position("low"), Some(1));
    assert_eq!(order.get("low").map(|p| p.priority()), Some(1));
    assert!(order.get("missing").is_none());
}
