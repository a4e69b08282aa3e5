//! Schema Registry
//!
//! A process-wide cache from target namespace to parsed [`Schema`]. Lookups
//! either return the cached schema, parse a new document, or merge a newly
//! parsed document into the cached schema for the same namespace. The cache
//! only grows; cached schemas are never mutated in place, a merge publishes
//! a new `Arc` instead.
//!
//! A single lock covers the whole check-parse-merge-write sequence of
//! [`SchemaRegistry::resolve`].

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use url::Url;

use crate::error::Result;
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::path_to_url;
use crate::schema::merge::merge;
use crate::schema::parsing::SchemaParser;
use crate::schema::schemas::{Import, Schema};

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::new);

/// Where a schema document comes from
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// A document location
    Uri(Url),
    /// Document content already in memory
    Bytes {
        /// Raw document
        data: Vec<u8>,
        /// URI of the document, for relative references and cache identity
        base: Option<Url>,
    },
}

impl SchemaSource {
    /// Source for a filesystem path
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Ok(SchemaSource::Uri(path_to_url(path.as_ref())?))
    }

    /// Source for in-memory content without a location
    pub fn bytes(data: impl Into<Vec<u8>>) -> Self {
        SchemaSource::Bytes {
            data: data.into(),
            base: None,
        }
    }

    /// URI identifying the document, if known
    pub fn uri(&self) -> Option<&Url> {
        match self {
            SchemaSource::Uri(url) => Some(url),
            SchemaSource::Bytes { base, .. } => base.as_ref(),
        }
    }
}

/// Cache of parsed schemas keyed by target namespace
#[derive(Debug)]
pub struct SchemaRegistry {
    schemas: Mutex<IndexMap<String, Arc<Schema>>>,
    loader: Loader,
}

impl SchemaRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::with_loader(Loader::new())
    }

    /// Create an empty registry loading documents through `loader`
    pub fn with_loader(loader: Loader) -> Self {
        Self {
            schemas: Mutex::new(IndexMap::new()),
            loader,
        }
    }

    /// The process-wide registry
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    /// Limits used for loading and resolution
    pub fn limits(&self) -> Limits {
        self.loader.limits().clone()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, Arc<Schema>>> {
        self.schemas.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Cached schema for a namespace
    pub fn get(&self, namespace: &str) -> Option<Arc<Schema>> {
        self.lock().get(namespace).cloned()
    }

    /// True if a schema is cached for the namespace
    pub fn contains(&self, namespace: &str) -> bool {
        self.lock().contains_key(namespace)
    }

    /// Cached namespaces in registration order
    pub fn namespaces(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True if nothing is cached
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Cache a pre-built schema under `namespace`, replacing any entry
    ///
    /// The key is not checked against the schema's own target namespace.
    pub fn register(&self, namespace: &str, schema: impl Into<Arc<Schema>>) -> Arc<Schema> {
        let schema = schema.into();
        self.lock().insert(namespace.to_string(), schema.clone());
        schema
    }

    /// Schemas whose declared prefix is `prefix`
    ///
    /// A schema also matches when another cached schema imports it under
    /// that prefix.
    pub fn lookup_by_prefix(&self, prefix: &str) -> Vec<Arc<Schema>> {
        let schemas = self.lock();
        let mut found: Vec<Arc<Schema>> = Vec::new();
        let mut push = |schema: &Arc<Schema>| {
            if !found.iter().any(|s| Arc::ptr_eq(s, schema)) {
                found.push(schema.clone());
            }
        };
        for schema in schemas.values() {
            if schema.prefix.as_deref() == Some(prefix) {
                push(schema);
            }
        }
        for schema in schemas.values() {
            for import in schema.imports.values() {
                if import.prefix.as_deref() == Some(prefix) {
                    if let Some(imported) = schemas.get(&import.namespace) {
                        push(imported);
                    }
                }
            }
        }
        found
    }

    /// An import of `namespace` with a known location, from any cached schema
    pub fn find_import(&self, namespace: &str) -> Option<Import> {
        self.lock()
            .values()
            .filter_map(|schema| schema.import(namespace))
            .find(|import| import.location.is_some())
            .cloned()
    }

    /// Resolve a namespace from the cache or a source document
    ///
    /// - A cached schema already backed by the source URI is returned as is.
    /// - Otherwise the source is parsed and cached under the target namespace
    ///   found in the document, which may differ from `namespace`.
    /// - When that namespace is already cached, the cached schema is merged
    ///   with the new one (the cached declarations win) and the entry is
    ///   replaced. A failed merge leaves the cache unchanged.
    pub fn resolve(&self, namespace: &str, source: SchemaSource) -> Result<Arc<Schema>> {
        let mut schemas = self.lock();

        if let (Some(cached), Some(uri)) = (schemas.get(namespace), source.uri()) {
            if cached.includes_uri(uri) {
                return Ok(cached.clone());
            }
        }

        let parsed = self.parse_source(&source)?;
        let key = parsed.target_namespace.clone();
        if key != namespace {
            tracing::debug!(
                requested = namespace,
                found = %key,
                "schema declares a different target namespace"
            );
        }

        let published = match schemas.get(&key) {
            Some(cached) => {
                if let Some(uri) = source.uri() {
                    if cached.includes_uri(uri) {
                        return Ok(cached.clone());
                    }
                }
                Arc::new(merge(cached, &parsed)?)
            }
            None => Arc::new(parsed),
        };
        schemas.insert(key, published.clone());
        Ok(published)
    }

    /// Parse a document without caching it
    pub fn parse_source(&self, source: &SchemaSource) -> Result<Schema> {
        let mut visited = Vec::new();
        match source {
            SchemaSource::Uri(url) => self.parse_document(url, 0, &mut visited),
            SchemaSource::Bytes { data, base } => {
                if let Some(base) = base {
                    visited.push(base.clone());
                }
                self.parse_bytes(data, base.as_ref(), 0, &mut visited)
            }
        }
    }

    fn parse_document(&self, url: &Url, depth: usize, visited: &mut Vec<Url>) -> Result<Schema> {
        visited.push(url.clone());
        let data = self.loader.load_url(url)?;
        self.parse_bytes(&data, Some(url), depth, visited)
    }

    fn parse_bytes(
        &self,
        data: &[u8],
        base: Option<&Url>,
        depth: usize,
        visited: &mut Vec<Url>,
    ) -> Result<Schema> {
        self.loader.limits().check_schema_depth(depth)?;
        let mut parser = SchemaParser::new().with_limits(self.limits());
        if let Some(base) = base {
            parser = parser.with_base_uri(base.clone());
        }
        let mut schema = parser.parse(data)?;

        for include in schema.includes.clone() {
            let url = match Url::parse(&include) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(location = %include, error = %e, "invalid include location");
                    continue;
                }
            };
            if visited.contains(&url) {
                continue;
            }
            let included = self.parse_document(&url, depth + 1, visited)?;
            schema = merge(&schema, &included)?;
            if !schema.sources.contains(&url) {
                schema.sources.push(url);
            }
        }
        Ok(schema)
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self::new()
    }
}
