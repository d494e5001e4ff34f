//! Behavioural properties of value resolution and view compilation,
//! exercised through the public library API.

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use vaultport::config::{QueryConfig, ResolverConfig};
use vaultport::frontmatter::FrontmatterBuilder;
use vaultport::query::parser::{parse_filter, parse_view};
use vaultport::query::types::{Condition, Expr, FilterLeaf, FilterNode, QuickOption, ViewOwner};
use vaultport::query::QueryCompiler;
use vaultport::registry::{LinkTarget, RelationDefinition, Registries, ValueFormat};
use vaultport::resolve::value::{DisplayValue, ValueResolver};

fn relation(id: &str, key: &str, name: &str, format: ValueFormat) -> RelationDefinition {
    RelationDefinition {
        id: id.to_string(),
        key: key.to_string(),
        display_name: name.to_string(),
        value_format: format,
        max_count: 0,
    }
}

fn registries() -> Registries {
    let mut registries = Registries::default();
    for definition in [
        relation("rel-status", "status", "Status", ValueFormat::Status),
        relation("rel-state", "state", "Status", ValueFormat::Status),
        relation("rel-assignee", "assignee", "Assignee", ValueFormat::ObjectRef),
        relation("rel-tag", "tag", "Tag", ValueFormat::Tag),
        relation("rel-files", "files", "Files", ValueFormat::File),
        relation("rel-due", "due", "Due date", ValueFormat::Date),
        relation("rel-notes", "notes", "Notes", ValueFormat::PlainText),
        relation("rel-context", "createdInContext", "Created in", ValueFormat::ObjectRef),
        relation(
            "bafyreigdmqpykrgxyaxtlafqpqhzrb7qy2rh75nldvfd4tucqmi7qyqwxq",
            "bafyreigdmqpykrgxyaxtlafqpqhzrb7qy2rh75nldvfd4tucqmi7qyqwxq",
            "Status",
            ValueFormat::PlainText,
        ),
    ] {
        registries.relations.insert(definition);
    }
    registries.options.insert("opt-open".into(), "Open".into());
    registries.options.insert("tag-a".into(), "alpha".into());
    registries.options.insert("tag-b".into(), "beta".into());
    registries.names.insert("opt-x".into(), "Done".into());
    registries.names.insert("obj-ada".into(), "Ada".into());
    registries.names.insert("obj-bob".into(), "Bob".into());
    registries
        .links
        .insert("obj-ada".into(), LinkTarget::Document("People/Ada.md".into()));
    registries.files.insert("file-1".into(), "files/a.pdf".into());
    registries.files.insert("file-2".into(), "files/b.pdf".into());
    registries
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 15, 10, 0, 0).unwrap()
}

fn leaf(key: &str, condition: Condition, value: Value) -> FilterLeaf {
    FilterLeaf {
        property_key: key.to_string(),
        condition,
        value,
        format: None,
        include_time: false,
        quick_option: QuickOption::ExactDate,
    }
}

mod resolution {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_element_lists_collapse_without_list_hint() {
        let registries = registries();
        let config = ResolverConfig::default();
        let resolver = ValueResolver::new(&registries, &config);

        for (key, id) in [
            ("assignee", "obj-bob"),
            ("status", "opt-open"),
            ("tag", "tag-a"),
            ("files", "file-1"),
        ] {
            let resolved = resolver.resolve_value(key, &json!([id]), false);
            assert!(!resolved.is_list(), "{} should collapse", key);
        }
    }

    #[test]
    fn multi_element_lists_keep_length_and_order() {
        let registries = registries();
        let config = ResolverConfig::default();
        let resolver = ValueResolver::new(&registries, &config);

        assert_eq!(
            resolver.resolve_value("tag", &json!(["tag-b", "tag-a"]), true),
            DisplayValue::List(vec![json!("beta"), json!("alpha")])
        );
        assert_eq!(
            resolver.resolve_value("files", &json!(["file-2", "file-1"]), true),
            DisplayValue::List(vec![json!("files/b.pdf"), json!("files/a.pdf")])
        );
        assert_eq!(
            resolver.resolve_value("assignee", &json!(["obj-bob", "obj-ada"]), true),
            DisplayValue::List(vec![json!("Bob"), json!("[[People/Ada]]")])
        );
    }

    #[test]
    fn unresolved_ids_stay_visible() {
        let registries = registries();
        let config = ResolverConfig::default();
        let resolver = ValueResolver::new(&registries, &config);

        for key in ["assignee", "status", "tag", "files"] {
            let text = resolver
                .resolve_value(key, &json!(["ghost-id-42"]), true)
                .to_text();
            assert!(text.contains("ghost-id-42"), "{} dropped the id: {}", key, text);
        }
    }

    #[test]
    fn status_falls_back_to_name_registry() {
        let registries = registries();
        let config = ResolverConfig::default();
        let resolver = ValueResolver::new(&registries, &config);

        assert_eq!(
            resolver.resolve_value("status", &json!(["opt-x"]), true),
            DisplayValue::List(vec![json!("Done")])
        );
    }

    #[test]
    fn unparseable_dates_pass_through() {
        let registries = registries();
        let config = ResolverConfig::default();
        let resolver = ValueResolver::new(&registries, &config);

        assert_eq!(
            resolver.resolve_value("due", &json!("someday"), false),
            DisplayValue::Scalar(json!("someday"))
        );
        assert_eq!(
            resolver.resolve_value("due", &json!("2024-03-15T22:30:00Z"), false),
            DisplayValue::Scalar(json!("2024-03-15"))
        );
    }

    #[test]
    fn rename_collision_falls_back_to_raw_key() {
        let registries = registries();
        let config = ResolverConfig::default();
        let builder = FrontmatterBuilder::new(ValueResolver::new(&registries, &config));
        let opaque = "bafyreigdmqpykrgxyaxtlafqpqhzrb7qy2rh75nldvfd4tucqmi7qyqwxq";

        let mut details = serde_json::Map::new();
        details.insert(opaque.to_string(), json!("imported"));
        details.insert("rel-state".to_string(), json!("opt-open"));
        let entries = builder.build(&details, &BTreeSet::new());
        let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(names, vec!["Status", "rel-state"]);
    }
}

mod compilation {
    use super::*;
    use pretty_assertions::assert_eq;

    fn compiler<'a>(resolver: ValueResolver<'a>, config: &'a QueryConfig) -> QueryCompiler<'a> {
        QueryCompiler::new(resolver, config).with_now(now())
    }

    #[test]
    fn compiling_twice_is_identical() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let compiler = compiler(ValueResolver::new(&registries, &resolver_config), &query_config);

        let raw = json!({
            "id": "v1",
            "name": "Mine",
            "relations": [{"key": "name", "isVisible": true}, {"key": "status", "isVisible": true}],
            "sorts": [{"relationKey": "due", "type": "desc"}],
            "groupRelationKey": "due",
            "filters": [
                {"relationKey": "assignee", "condition": "In", "value": ["obj-ada", "obj-bob"]},
                {"relationKey": "due", "condition": "Equal", "quickOption": "CurrentWeek"}
            ]
        });
        let view = parse_view(&raw, false).unwrap();
        let owner = ViewOwner {
            id: "coll-1".into(),
            is_collection: true,
            allowed_types: vec![],
        };

        let first = compiler.compile_view(&view, Some(&owner));
        let second = compiler.compile_view(&view, Some(&owner));
        assert_eq!(first, second);
        assert_eq!(first.group_by.as_ref().map(|g| g.direction.as_str()), Some("DESC"));
    }

    #[test]
    fn quick_options_only_move_date_bounds() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let resolver = ValueResolver::new(&registries, &resolver_config);
        let later = Utc.with_ymd_and_hms(2024, 3, 22, 10, 0, 0).unwrap();
        let early = QueryCompiler::new(resolver, &query_config).with_now(now());
        let late = QueryCompiler::new(resolver, &query_config).with_now(later);

        let raw = json!({
            "id": "v1",
            "name": "This week",
            "relations": [{"key": "name", "isVisible": true}, {"key": "due", "isVisible": true}],
            "sorts": [{"relationKey": "due", "type": "asc"}],
            "filters": [
                {"relationKey": "status", "condition": "In", "value": ["opt-open"]},
                {"relationKey": "due", "condition": "Equal", "quickOption": "Today"},
                {"relationKey": "due", "condition": "Equal", "quickOption": "CurrentWeek"}
            ]
        });
        let view = parse_view(&raw, false).unwrap();
        let mut first = early.compile_view(&view, None);
        let mut second = late.compile_view(&view, None);

        let first_filters = first.filters.take().unwrap().render();
        let second_filters = second.filters.take().unwrap().render();
        assert_eq!(first, second);
        assert_ne!(first_filters, second_filters);

        let mask = |text: &str, bounds: [&str; 4]| {
            let [day_end, week_end, day, week] = bounds;
            text.replace(day_end, "DAY_END")
                .replace(week_end, "WEEK_END")
                .replace(day, "DAY")
                .replace(week, "WEEK")
        };
        assert_eq!(
            mask(
                &first_filters,
                ["2024-03-15T23:59:59", "2024-03-17T23:59:59", "2024-03-15", "2024-03-11"]
            ),
            mask(
                &second_filters,
                ["2024-03-22T23:59:59", "2024-03-24T23:59:59", "2024-03-22", "2024-03-18"]
            )
        );
    }

    #[test]
    fn every_condition_compiles() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let compiler = compiler(ValueResolver::new(&registries, &resolver_config), &query_config);

        for condition in Condition::ALL {
            let node = FilterNode::Leaf(leaf("notes", condition, json!("draft")));
            let expr = compiler.compile_node(&node);
            assert!(expr.is_some(), "{:?} compiled to nothing", condition);
        }
    }

    #[test]
    fn empty_like_compiles_to_nothing() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let compiler = compiler(ValueResolver::new(&registries, &resolver_config), &query_config);

        for condition in [Condition::Like, Condition::NotLike] {
            let node = FilterNode::Leaf(leaf("notes", condition, json!("")));
            assert_eq!(compiler.compile_node(&node), None);
        }
    }

    #[test]
    fn negated_branch_degenerates() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let compiler = compiler(ValueResolver::new(&registries, &resolver_config), &query_config);

        let a = json!({"relationKey": "notes", "condition": "NotLike", "value": "x"});
        let b = json!({"relationKey": "status", "condition": "NotEqual", "value": "opt-open"});

        let single = parse_filter(&json!({"operator": "not", "nestedFilters": [a.clone()]})).unwrap();
        let direct = parse_filter(&a).unwrap();
        assert_eq!(compiler.compile_node(&single), compiler.compile_node(&direct));

        let pair = parse_filter(&json!({"operator": "not", "nestedFilters": [a.clone(), b.clone()]}))
            .unwrap();
        let expected = Expr::all(vec![
            compiler.compile_node(&parse_filter(&a).unwrap()).unwrap(),
            compiler.compile_node(&parse_filter(&b).unwrap()).unwrap(),
        ]);
        assert_eq!(compiler.compile_node(&pair), expected);
    }

    #[test]
    fn today_window() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let compiler = compiler(ValueResolver::new(&registries, &resolver_config), &query_config);

        let mut today = leaf("due", Condition::Equal, Value::Null);
        today.quick_option = QuickOption::Today;
        let expr = compiler.compile_node(&FilterNode::Leaf(today)).unwrap();
        assert_eq!(
            expr.render(),
            r#"note.due >= date("2024-03-15") && note.due <= date("2024-03-15T23:59:59")"#
        );
    }

    #[test]
    fn collection_scope_without_filters() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let compiler = compiler(ValueResolver::new(&registries, &resolver_config), &query_config);

        let view = parse_view(&json!({"id": "v1", "name": "All"}), false).unwrap();
        let owner = ViewOwner {
            id: "coll-1".into(),
            is_collection: true,
            allowed_types: vec![],
        };
        let compiled = compiler.compile_view(&view, Some(&owner));
        assert_eq!(
            compiled.filters.map(|f| f.render()),
            Some(
                r#"note.createdInContext == "coll-1" || list(note.createdInContext).contains("coll-1")"#
                    .to_string()
            )
        );
    }

    #[test]
    fn custom_sort_holds_display_values() {
        let registries = registries();
        let resolver_config = ResolverConfig::default();
        let query_config = QueryConfig::default();
        let compiler = compiler(ValueResolver::new(&registries, &resolver_config), &query_config);

        let raw = json!({
            "name": "Ranked",
            "sorts": [{"relationKey": "status", "type": "custom", "customOrder": ["opt-open", "opt-x"]}]
        });
        let compiled = compiler.compile_view(&parse_view(&raw, false).unwrap(), None);
        assert_eq!(compiled.sort[0].direction, "CUSTOM");
        assert_eq!(compiled.sort[0].custom_order, vec!["Open".to_string(), "Done".to_string()]);
    }
}
