//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Once;

use xsdbind::{SchemaRegistry, SchemaSource, Schema};
use std::sync::Arc;

static INIT: Once = Once::new();

/// Install a test subscriber once; `RUST_LOG` selects the level
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Fresh registry with one in-memory schema resolved into it
pub fn registry_with(namespace: &str, xsd: &str) -> (SchemaRegistry, Arc<Schema>) {
    init_logging();
    let registry = SchemaRegistry::new();
    let schema = registry
        .resolve(namespace, SchemaSource::bytes(xsd))
        .expect("schema parses");
    (registry, schema)
}

pub const ORDER_XSD: &str = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
    xmlns:o="urn:order" targetNamespace="urn:order" elementFormDefault="qualified">
  <xs:element name="order">
    <xs:complexType>
      <xs:sequence>
        <xs:element name="item" type="o:Item" maxOccurs="unbounded"/>
        <xs:element name="note" type="xs:string" minOccurs="0"/>
      </xs:sequence>
      <xs:attribute name="id" type="xs:int" use="required"/>
      <xs:attribute name="status" type="o:Status" default="open"/>
    </xs:complexType>
  </xs:element>
  <xs:complexType name="Item">
    <xs:sequence>
      <xs:element name="sku" type="xs:string"/>
      <xs:element name="qty" type="xs:positiveInteger"/>
      <xs:element name="price" type="xs:decimal" minOccurs="0"/>
    </xs:sequence>
  </xs:complexType>
  <xs:simpleType name="Status">
    <xs:restriction base="xs:string">
      <xs:enumeration value="open"/>
      <xs:enumeration value="shipped"/>
    </xs:restriction>
  </xs:simpleType>
</xs:schema>"#;

pub const ORDER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<order xmlns="urn:order" id="7" status="shipped">
  <item><sku>A-1</sku><qty>2</qty><price>9.50</price></item>
  <item><sku>B-2</sku><qty>1</qty></item>
  <note>leave at door</note>
</order>"#;
