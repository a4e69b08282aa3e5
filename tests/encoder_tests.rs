//! Document encoder: element selection, namespaces and round trips through
//! the instance parser

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;
use xsdbind::{
    DocumentWriter, EncodeOptions, FilterStrictness, InstanceParser, ParserConfig, Record,
    SchemaRegistry,
    SchemaSource, Value,
};

use common::{registry_with, ORDER_XML, ORDER_XSD};

const INTS_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:a="urn:a" targetNamespace="urn:a">
  <xs:simpleType name="Small">
    <xs:restriction base="xs:integer">
      <xs:maxInclusive value="100"/>
    </xs:restriction>
  </xs:simpleType>
  <xs:element name="Foo" type="a:Small"/>
  <xs:element name="Big" type="xs:integer"/>
  <xs:element name="Label" type="xs:string"/>
</xs:schema>"#;

#[test]
fn test_integer_example() {
    let (registry, schema) = registry_with("urn:a", INTS_XSD);
    let out = DocumentWriter::new(&registry, schema)
        .write_string(&Value::Integer(42))
        .unwrap();
    assert_eq!(
        out,
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Foo xmlns=\"urn:a\">42</Foo>\n"
    );
}

#[test]
fn test_facets_steer_element_choice() {
    let (registry, schema) = registry_with("urn:a", INTS_XSD);
    let writer = DocumentWriter::new(&registry, schema);
    let out = writer.write_string(&Value::Integer(1000)).unwrap();
    assert!(out.contains("<Big xmlns=\"urn:a\">1000</Big>"));
    let out = writer.write_string(&Value::String("x".into())).unwrap();
    assert!(out.contains("<Label xmlns=\"urn:a\">x</Label>"));
}

#[test]
fn test_no_matching_element_is_structural() {
    let xsd = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:a">
      <xs:element name="Foo" type="xs:integer"/>
    </xs:schema>"#;
    let (registry, schema) = registry_with("urn:a", xsd);
    let err = DocumentWriter::new(&registry, schema)
        .write_string(&Value::String("x".into()))
        .unwrap_err();
    assert!(err.is_structural());
    assert!(!err.is_stop());
}

#[test]
fn test_ambiguity_is_resolved_by_search_order() {
    let (registry, schema) = registry_with("urn:a", INTS_XSD);
    let outputs: Vec<String> = (0..5)
        .map(|_| {
            DocumentWriter::new(&registry, schema.clone())
                .write_string(&Value::Integer(7))
                .unwrap()
        })
        .collect();
    assert!(outputs.iter().all(|o| o == &outputs[0]));
    assert!(outputs[0].contains("<Foo"));
}

#[test]
fn test_explicit_search_order_comes_first() {
    common::init_logging();
    let registry = SchemaRegistry::new();
    let primary = registry
        .resolve(
            "urn:b",
            SchemaSource::bytes(
                r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:b">
                     <xs:element name="Num" type="xs:long"/>
                   </xs:schema>"#,
            ),
        )
        .unwrap();
    let ints = registry.resolve("urn:a", SchemaSource::bytes(INTS_XSD)).unwrap();

    let default = DocumentWriter::new(&registry, primary.clone());
    assert_eq!(default.search_order().len(), 1);
    let out = default.write_string(&Value::Integer(3)).unwrap();
    assert!(out.contains("<Num xmlns=\"urn:b\">3</Num>"));

    let options = EncodeOptions::new().with_schema(ints.clone());
    let writer = DocumentWriter::with_options(&registry, primary, options);
    assert!(Arc::ptr_eq(&writer.search_order()[0], &ints));
    let out = writer.write_string(&Value::Integer(3)).unwrap();
    assert!(out.contains("<a:Foo xmlns=\"urn:b\" xmlns:a=\"urn:a\">3</a:Foo>"));
}

#[test]
fn test_schema_location_only_for_absolute_uris() {
    let (registry, schema) = registry_with("urn:a", INTS_XSD);
    let relative = EncodeOptions::new().with_schema_location("urn:a", "ints.xsd");
    let out = DocumentWriter::with_options(&registry, schema.clone(), relative)
        .write_string(&Value::Integer(1))
        .unwrap();
    assert!(!out.contains("schemaLocation"));

    let absolute =
        EncodeOptions::new().with_schema_location("urn:a", "http://example.org/ints.xsd");
    let out = DocumentWriter::with_options(&registry, schema, absolute)
        .write_string(&Value::Integer(1))
        .unwrap();
    assert!(out.contains("xsi:schemaLocation=\"urn:a http://example.org/ints.xsd\""));
}

#[test]
fn test_file_schema_location_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ints.xsd");
    std::fs::write(&path, INTS_XSD).unwrap();
    let registry = SchemaRegistry::new();
    let schema = registry
        .resolve("urn:a", SchemaSource::from_path(&path).unwrap())
        .unwrap();
    let location = schema.uri.clone().unwrap();

    let out = DocumentWriter::new(&registry, schema)
        .write_string(&Value::Integer(1))
        .unwrap();
    assert!(out.contains(&format!("xsi:schemaLocation=\"urn:a {}\"", location)));
}

#[test]
fn test_required_attribute_missing_is_error() {
    let (registry, schema) = registry_with("urn:order", ORDER_XSD);
    let element = schema.element("order").unwrap().clone();
    let record = Record::new().with_field(
        "item",
        Record::new().with_field("sku", "A").with_field("qty", 1),
    );
    let options = EncodeOptions::new().with_base_element(element);
    let writer = DocumentWriter::with_options(&registry, schema, options);
    let err = writer.write_string(&Value::Record(record)).unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn test_decoded_document_encodes_back() {
    let (registry, schema) = registry_with("urn:order", ORDER_XSD);
    let doc = InstanceParser::new(&registry).parse(ORDER_XML.as_bytes()).unwrap();

    let xml = DocumentWriter::new(&registry, schema)
        .write_string(&doc.value)
        .unwrap();
    assert!(xml.starts_with(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><order xmlns=\"urn:order\""
    ));

    let again = InstanceParser::new(&registry).parse(xml.as_bytes()).unwrap();
    assert_eq!(again.value, doc.value);
}

#[test]
fn test_indented_output() {
    let (registry, schema) = registry_with("urn:order", ORDER_XSD);
    let doc = InstanceParser::new(&registry).parse(ORDER_XML.as_bytes()).unwrap();
    let options = EncodeOptions::new().with_indent(Some(2)).with_encoding("ISO-8859-1");
    let xml = DocumentWriter::with_options(&registry, schema, options)
        .write_string(&doc.value)
        .unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>"));
    assert!(xml.contains("\n  <item>"));
    assert!(xml.ends_with("</order>\n"));
}

const REPEATS_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:r="urn:r" targetNamespace="urn:r" elementFormDefault="qualified">
  <xs:element name="pairs">
    <xs:complexType>
      <xs:sequence maxOccurs="unbounded">
        <xs:element name="a" type="xs:int"/>
        <xs:element name="b" type="xs:string"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:element name="mix">
    <xs:complexType>
      <xs:choice maxOccurs="unbounded">
        <xs:element name="x" type="xs:int"/>
        <xs:element name="y" type="xs:string"/>
      </xs:choice>
    </xs:complexType>
  </xs:element>
  <xs:element name="card">
    <xs:complexType>
      <xs:all>
        <xs:element name="name" type="xs:string"/>
        <xs:element name="rank" type="xs:int" minOccurs="0"/>
      </xs:all>
    </xs:complexType>
  </xs:element>
  <xs:element name="hand">
    <xs:complexType>
      <xs:sequence maxOccurs="2">
        <xs:element ref="r:card"/>
      </xs:sequence>
    </xs:complexType>
  </xs:element>
  <xs:group name="Line">
    <xs:sequence>
      <xs:element name="sku" type="xs:string"/>
      <xs:element name="qty" type="xs:int"/>
    </xs:sequence>
  </xs:group>
  <xs:element name="lines">
    <xs:complexType>
      <xs:group ref="r:Line" maxOccurs="3"/>
    </xs:complexType>
  </xs:element>
</xs:schema>"#;

/// Decode, encode and decode again; returns the encoded text
fn reencode(registry: &SchemaRegistry, schema: Arc<xsdbind::Schema>, document: &str) -> String {
    let strict = ParserConfig::new().with_strictness(FilterStrictness::High);
    let doc = InstanceParser::new(registry)
        .with_config(strict.clone())
        .parse(document.as_bytes())
        .unwrap();
    let xml = DocumentWriter::new(registry, schema).write_string(&doc.value).unwrap();
    let again = InstanceParser::new(registry)
        .with_config(strict)
        .parse(xml.as_bytes())
        .unwrap();
    assert_eq!(again.value, doc.value);
    xml
}

#[test]
fn test_repeated_sequence_encodes_back() {
    let (registry, schema) = registry_with("urn:r", REPEATS_XSD);
    let xml = reencode(
        &registry,
        schema,
        r#"<pairs xmlns="urn:r"><a>1</a><b>x</b><a>2</a><b>y</b></pairs>"#,
    );
    assert!(xml.contains("<a>1</a><b>x</b><a>2</a><b>y</b></pairs>"));
}

#[test]
fn test_repeated_choice_encodes_back() {
    let (registry, schema) = registry_with("urn:r", REPEATS_XSD);
    let xml = reencode(&registry, schema.clone(), r#"<mix xmlns="urn:r"><x>1</x><y>s</y></mix>"#);
    assert!(xml.contains("<x>1</x><y>s</y></mix>"));

    let xml = reencode(&registry, schema, r#"<mix xmlns="urn:r"><y>s</y><x>1</x><x>2</x></mix>"#);
    assert!(xml.contains("<x>1</x><x>2</x><y>s</y></mix>"));
}

#[test]
fn test_all_group_encodes_in_declaration_order() {
    let (registry, schema) = registry_with("urn:r", REPEATS_XSD);
    let xml = reencode(
        &registry,
        schema.clone(),
        r#"<card xmlns="urn:r"><rank>2</rank><name>Ace</name></card>"#,
    );
    assert!(xml.contains("<name>Ace</name><rank>2</rank></card>"));

    let record = Record::named(xsdbind::QName::namespaced("urn:r", "card")).with_field("rank", 2);
    let element = schema.element("card").unwrap().clone();
    let options = EncodeOptions::new().with_base_element(element);
    let err = DocumentWriter::with_options(&registry, schema, options)
        .write_string(&Value::Record(record))
        .unwrap_err();
    assert!(err.is_structural());
}

#[test]
fn test_repeated_sequence_of_all_groups_encodes_back() {
    let (registry, schema) = registry_with("urn:r", REPEATS_XSD);
    let xml = reencode(
        &registry,
        schema,
        concat!(
            r#"<hand xmlns="urn:r"><card><name>Ace</name></card>"#,
            r#"<card><rank>9</rank><name>Nine</name></card></hand>"#,
        ),
    );
    assert!(xml.contains(
        "<card><name>Ace</name></card><card><name>Nine</name><rank>9</rank></card></hand>"
    ));
}

#[test]
fn test_repeated_group_reference_keeps_its_bound() {
    let (registry, schema) = registry_with("urn:r", REPEATS_XSD);
    let xml = reencode(
        &registry,
        schema.clone(),
        r#"<lines xmlns="urn:r"><sku>A</sku><qty>1</qty><sku>B</sku><qty>2</qty></lines>"#,
    );
    assert!(xml.contains("<sku>A</sku><qty>1</qty><sku>B</sku><qty>2</qty></lines>"));

    let four = (0..4).map(|i| format!("<sku>S{}</sku><qty>{}</qty>", i, i)).collect::<String>();
    let document = format!("<lines xmlns=\"urn:r\">{}</lines>", four);
    let doc = InstanceParser::new(&registry).parse(document.as_bytes()).unwrap();
    let err = DocumentWriter::new(&registry, schema)
        .write_string(&doc.value)
        .unwrap_err();
    assert!(err.is_structural());

    let strict = ParserConfig::new().with_strictness(FilterStrictness::High);
    let err = InstanceParser::new(&registry)
        .with_config(strict)
        .parse(document.as_bytes())
        .unwrap_err();
    assert!(err.is_structural());
}
