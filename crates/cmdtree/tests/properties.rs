//! Property-based tests for discovery and schema inheritance using proptest.

use cmdtree::{
    ConfigField, Handler, HandlerResult, Output, Registry, ScanOptions, ScanReport, Scanner,
    Schema, SchemaConflict, StaticModule, StaticPackage, StaticSource, Value, ValueType,
};
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// ============================================================================
// Test helpers
// ============================================================================

/// Root modules plus packages of modules; names may collide on purpose.
#[derive(Debug, Clone)]
struct Layout {
    modules: BTreeSet<String>,
    packages: BTreeMap<String, BTreeSet<String>>,
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z_]{0,5}"
}

fn layout_strategy() -> impl Strategy<Value = Layout> {
    (
        prop::collection::btree_set(name_strategy(), 0..4),
        prop::collection::btree_map(
            name_strategy(),
            prop::collection::btree_set(name_strategy(), 0..4),
            0..4,
        ),
    )
        .prop_map(|(modules, packages)| Layout { modules, packages })
}

fn noop() -> Handler {
    Handler::new(|_| -> HandlerResult { Ok(Output::Silent) })
}

fn source(layout: &Layout) -> StaticSource {
    let module = |name: &String| {
        StaticModule::new(name.clone())
            .field(ConfigField::integer("level").default(1))
            .function("main", noop())
    };
    let mut root = StaticPackage::new().field(ConfigField::boolean("verbose").default(false));
    for name in &layout.modules {
        root = root.module(module(name));
    }
    for (name, modules) in &layout.packages {
        let package = modules
            .iter()
            .fold(StaticPackage::new(), |pkg, m| pkg.module(module(m)));
        root = root.package(name.clone(), package);
    }
    StaticSource::new(root)
}

fn scan(layout: &Layout) -> (ScanReport, Registry) {
    let registry = Registry::isolated();
    let options = ScanOptions {
        program: "app".into(),
        ..ScanOptions::default()
    };
    let report = Scanner::new(&source(layout), &options)
        .scan(&registry)
        .expect("static sources always have a root");
    (report, registry)
}

// ============================================================================
// Property tests
// ============================================================================

proptest! {
    /// Scanning the same source twice gives the same tree and registry.
    #[test]
    fn scanning_is_deterministic(layout in layout_strategy()) {
        let (a, first) = scan(&layout);
        let (b, second) = scan(&layout);

        prop_assert_eq!(a.tree.outline(), b.tree.outline());
        prop_assert_eq!(first.identities(), second.identities());
        let diagnostics = |r: &ScanReport| -> Vec<String> {
            r.diagnostics.iter().map(|d| d.to_string()).collect()
        };
        prop_assert_eq!(diagnostics(&a), diagnostics(&b));
    }

    /// Every command node is registered, in tree order, and nothing else is.
    #[test]
    fn registry_mirrors_tree_commands(layout in layout_strategy()) {
        let (report, registry) = scan(&layout);
        let commands: Vec<_> = report.tree.commands().map(|n| n.identity.clone()).collect();
        prop_assert_eq!(commands, registry.identities());
        for entry in registry.all() {
            let node = report.tree.find(&entry.identity);
            prop_assert!(node.is_some());
            prop_assert_eq!(&node.unwrap().schema, &entry.schema);
        }
    }

    /// A descendant override wins on default and help but keeps the type.
    #[test]
    fn override_wins_on_default_and_help(
        ancestor_default in any::<i64>(),
        descendant_default in proptest::option::of(any::<i64>()),
        ancestor_help in "[a-z ]{0,12}",
        descendant_help in "[a-z ]{0,12}",
    ) {
        let ancestor = Schema::from_fields(vec![
            ConfigField::integer("count").default(ancestor_default).help(ancestor_help.clone()),
            ConfigField::boolean("verbose").default(false),
        ])
        .unwrap();
        let mut field = ConfigField::integer("count").help(descendant_help.clone());
        if let Some(d) = descendant_default {
            field = field.default(d);
        }
        let own = Schema::from_fields(vec![field, ConfigField::string("name")]).unwrap();

        let effective = ancestor.inherit(&own).unwrap();
        prop_assert_eq!(effective.names(), vec!["count", "verbose", "name"]);

        let count = effective.get("count").unwrap();
        prop_assert_eq!(&count.ty, &ValueType::Integer);
        let expected_default = Value::Int(descendant_default.unwrap_or(ancestor_default));
        prop_assert_eq!(count.default.as_ref(), Some(&expected_default));
        let expected_help = if descendant_help.is_empty() { ancestor_help } else { descendant_help };
        prop_assert_eq!(&count.help, &expected_help);
    }

    /// Changing a field's type is always a conflict.
    #[test]
    fn type_change_is_a_conflict(name in "[a-z]{1,8}", choice in 0usize..4) {
        let types = [
            ValueType::Integer,
            ValueType::Boolean,
            ValueType::StringList,
            ValueType::Float,
        ];
        let ancestor = Schema::from_fields(vec![ConfigField::string(name.clone())]).unwrap();
        let own = Schema::from_fields(vec![ConfigField::new(name, types[choice].clone())]).unwrap();
        let conflict = ancestor.inherit(&own).unwrap_err();
        prop_assert!(
            matches!(conflict, SchemaConflict::TypeChanged { .. }),
            "unexpected conflict: {}",
            conflict
        );
    }
}
