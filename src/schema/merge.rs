//! Merging two schemas of the same target namespace
//!
//! The merge is a deterministic union in which the first schema wins every
//! conflict. Name collisions are not errors; they are logged and the first
//! declaration is kept.

use indexmap::IndexMap;

use super::schemas::Schema;
use crate::error::{Error, Result};

/// Merge two schemas for the same namespace
///
/// Scalar properties come from `first` when set, else from `second`.
/// Target namespaces must agree unless one of them is empty. Form defaults
/// are OR-ed, derivation-control defaults are combined bitwise, and every
/// declaration collection becomes a name-keyed union preferring `first`.
pub fn merge(first: &Schema, second: &Schema) -> Result<Schema> {
    let target_namespace = match (
        first.target_namespace.as_str(),
        second.target_namespace.as_str(),
    ) {
        (a, b) if a == b => a.to_string(),
        ("", b) => b.to_string(),
        (a, "") => a.to_string(),
        (a, b) => {
            return Err(Error::structural(format!(
                "cannot merge schemas with different target namespaces '{}' and '{}'",
                a, b
            )))
        }
    };

    let mut sources = first.sources.clone();
    for source in &second.sources {
        if !sources.contains(source) {
            sources.push(source.clone());
        }
    }
    let mut includes = first.includes.clone();
    for include in &second.includes {
        if !includes.contains(include) {
            includes.push(include.clone());
        }
    }

    Ok(Schema {
        target_namespace: target_namespace.clone(),
        id: prefer(&first.id, &second.id),
        version: prefer(&first.version, &second.version),
        prefix: prefer(&first.prefix, &second.prefix),
        uri: first.uri.clone().or_else(|| second.uri.clone()),
        sources,
        element_form_default: first.element_form_default || second.element_form_default,
        attribute_form_default: first.attribute_form_default || second.attribute_form_default,
        block_default: first.block_default | second.block_default,
        final_default: first.final_default | second.final_default,
        elements: union(&target_namespace, "element", &first.elements, &second.elements),
        complex_types: union(
            &target_namespace,
            "complexType",
            &first.complex_types,
            &second.complex_types,
        ),
        simple_types: union(
            &target_namespace,
            "simpleType",
            &first.simple_types,
            &second.simple_types,
        ),
        groups: union(&target_namespace, "group", &first.groups, &second.groups),
        attributes: union(&target_namespace, "attribute", &first.attributes, &second.attributes),
        attribute_groups: union(
            &target_namespace,
            "attributeGroup",
            &first.attribute_groups,
            &second.attribute_groups,
        ),
        imports: union(&target_namespace, "import", &first.imports, &second.imports),
        includes,
    })
}

fn prefer(first: &Option<String>, second: &Option<String>) -> Option<String> {
    match first {
        Some(v) if !v.is_empty() => Some(v.clone()),
        _ => second.clone().filter(|v| !v.is_empty()),
    }
}

fn union<V: Clone + PartialEq>(
    namespace: &str,
    kind: &str,
    first: &IndexMap<String, V>,
    second: &IndexMap<String, V>,
) -> IndexMap<String, V> {
    let mut merged = first.clone();
    for (name, declaration) in second {
        match merged.get(name) {
            None => {
                merged.insert(name.clone(), declaration.clone());
            }
            Some(existing) if existing == declaration => {}
            Some(_) => {
                tracing::warn!(
                    namespace,
                    kind,
                    name = %name,
                    "merge collision; keeping the first declaration"
                );
            }
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::elements::Element;
    use crate::schema::schemas::DerivationSet;
    use crate::schema::types::TypeRef;
    use crate::namespaces::{QName, XSD_NAMESPACE};

    #[test]
    fn test_merge_unions_declarations() {
        let mut a = Schema::new("urn:a");
        a.add_element(Element::new("Foo", Some("urn:a")));
        let mut b = Schema::new("urn:a");
        b.add_element(Element::new("Bar", Some("urn:a")));

        let merged = merge(&a, &b).unwrap();
        let names: Vec<_> = merged.elements.keys().cloned().collect();
        assert_eq!(names, vec!["Foo", "Bar"]);
    }

    #[test]
    fn test_first_schema_wins_collisions() {
        let mut a = Schema::new("urn:a");
        a.add_element(
            Element::new("Foo", Some("urn:a"))
                .with_type(TypeRef::named(QName::namespaced(XSD_NAMESPACE, "int"))),
        );
        let mut b = Schema::new("urn:a");
        b.add_element(
            Element::new("Foo", Some("urn:a"))
                .with_type(TypeRef::named(QName::namespaced(XSD_NAMESPACE, "string"))),
        );

        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.elements["Foo"], a.elements["Foo"]);
    }

    #[test]
    fn test_scalar_and_flag_rules() {
        let mut a = Schema::new("");
        a.id = Some(String::new());
        a.block_default = DerivationSet::EXTENSION;
        let mut b = Schema::new("urn:b").with_prefix("b");
        b.id = Some("second".into());
        b.element_form_default = true;
        b.block_default = DerivationSet::RESTRICTION;

        let merged = merge(&a, &b).unwrap();
        assert_eq!(merged.target_namespace, "urn:b");
        assert_eq!(merged.id.as_deref(), Some("second"));
        assert_eq!(merged.prefix.as_deref(), Some("b"));
        assert!(merged.element_form_default);
        assert!(merged.block_default.contains(DerivationSet::EXTENSION));
        assert!(merged.block_default.contains(DerivationSet::RESTRICTION));
    }

    #[test]
    fn test_namespace_mismatch_fails() {
        let err = merge(&Schema::new("urn:a"), &Schema::new("urn:b")).unwrap_err();
        assert!(err.is_structural());
    }
}
