//! Schema registry behaviour: caching, merging and prefix lookup

mod common;

use std::collections::BTreeSet;
use std::io::Write;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use tempfile::NamedTempFile;
use xsdbind::namespaces::XSD_NAMESPACE;
use xsdbind::schema::{merge, Element, TypeRef};
use xsdbind::QName;
use xsdbind::{Schema, SchemaRegistry, SchemaSource};

fn schema_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

fn declaring(element: &str) -> String {
    format!(
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:a">
             <xs:element name="{}" type="xs:string"/>
           </xs:schema>"#,
        element
    )
}

#[test]
fn test_resolve_same_uri_twice_returns_cached_instance() {
    common::init_logging();
    let file = schema_file(&declaring("Foo"));
    let registry = SchemaRegistry::new();
    let source = SchemaSource::from_path(file.path()).unwrap();

    let first = registry.resolve("urn:a", source.clone()).unwrap();
    let second = registry.resolve("urn:a", source).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_two_documents_merge_into_one_schema() {
    common::init_logging();
    let foo = schema_file(&declaring("Foo"));
    let bar = schema_file(&declaring("Bar"));
    let registry = SchemaRegistry::new();

    registry
        .resolve("urn:a", SchemaSource::from_path(foo.path()).unwrap())
        .unwrap();
    let merged = registry
        .resolve("urn:a", SchemaSource::from_path(bar.path()).unwrap())
        .unwrap();

    let names: Vec<&str> = merged.elements.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Foo", "Bar"]);
    assert_eq!(merged.sources.len(), 2);

    // both locations are now known, so neither is parsed again
    let again = registry
        .resolve("urn:a", SchemaSource::from_path(foo.path()).unwrap())
        .unwrap();
    assert!(Arc::ptr_eq(&merged, &again));
}

#[test]
fn test_failed_merge_leaves_cache_intact() {
    common::init_logging();
    let registry = SchemaRegistry::new();
    let mut foreign = Schema::new("urn:b");
    foreign.add_element(Element::new("Other", Some("urn:b")));
    let cached = registry.register("urn:a", foreign);

    let err = registry
        .resolve("urn:a", SchemaSource::bytes(declaring("Foo")))
        .unwrap_err();
    assert!(err.is_structural());

    let still = registry.get("urn:a").unwrap();
    assert!(Arc::ptr_eq(&cached, &still));
    assert!(still.element("Foo").is_none());
}

#[test]
fn test_malformed_schema_is_not_cached() {
    let registry = SchemaRegistry::new();
    let err = registry
        .resolve(
            "urn:a",
            SchemaSource::bytes("<xs:schema xmlns:xs=\"http://www.w3.org/2001/XMLSchema\">"),
        )
        .unwrap_err();
    assert!(err.is_malformed());
    assert!(registry.is_empty());
}

#[test]
fn test_register_bypasses_parsing() {
    let registry = SchemaRegistry::new();
    registry.register("urn:key", Schema::new("urn:other").with_prefix("o"));
    assert_eq!(registry.get("urn:key").unwrap().target_namespace, "urn:other");
    assert_eq!(registry.lookup_by_prefix("o").len(), 1);
    assert_eq!(registry.namespaces(), vec!["urn:key".to_string()]);
}

#[test]
fn test_imports_resolve_lazily() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("types.xsd"),
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:types">
             <xs:simpleType name="Code">
               <xs:restriction base="xs:string"><xs:length value="3"/></xs:restriction>
             </xs:simpleType>
           </xs:schema>"#,
    )
    .unwrap();
    let main = dir.path().join("main.xsd");
    std::fs::write(
        &main,
        r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
               xmlns:t="urn:types" targetNamespace="urn:main">
             <xs:import namespace="urn:types" schemaLocation="types.xsd"/>
             <xs:element name="code" type="t:Code"/>
           </xs:schema>"#,
    )
    .unwrap();

    let registry = SchemaRegistry::new();
    let schema = registry
        .resolve("urn:main", SchemaSource::from_path(&main).unwrap())
        .unwrap();
    assert!(!registry.contains("urn:types"));
    assert_eq!(schema.import("urn:types").and_then(|i| i.prefix.as_deref()), Some("t"));

    let resolver = xsdbind::Resolver::new(&registry, schema.clone());
    let element = schema.element("code").unwrap();
    assert!(resolver.element_accepts(element, &"abc".into()));
    assert!(!resolver.element_accepts(element, &"abcd".into()));
    assert!(registry.contains("urn:types"));
}

fn schema_with(names: &BTreeSet<String>, type_name: &str) -> Schema {
    let mut schema = Schema::new("urn:p");
    for name in names {
        let element = Element::new(name.clone(), Some("urn:p"))
            .with_type(TypeRef::Named(QName::namespaced(XSD_NAMESPACE, type_name)));
        schema.add_element(element);
    }
    schema
}

proptest! {
    #[test]
    fn merge_is_union_with_first_winning(
        first in prop::collection::btree_set("[a-e]{1,2}", 0..8),
        second in prop::collection::btree_set("[a-e]{1,2}", 0..8),
    ) {
        let a = schema_with(&first, "string");
        let b = schema_with(&second, "int");
        let merged = merge(&a, &b).unwrap();

        let expected: BTreeSet<String> = first.union(&second).cloned().collect();
        let actual: BTreeSet<String> = merged.elements.keys().cloned().collect();
        prop_assert_eq!(actual, expected);

        for name in &first {
            prop_assert_eq!(merged.element(name), a.element(name));
        }
        for name in second.difference(&first) {
            prop_assert_eq!(merged.element(name), b.element(name));
        }
    }
}
