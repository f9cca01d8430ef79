//! Module Building
//!
//! Drives the full binding pipeline over one document: component type
//! synthesis, operation binding, client assembly. The result is an
//! [`ApiModule`], an immutable namespace of types and grouped operations
//! that outlives the document it was built from and is safe to share
//! across threads. Building the same document twice yields modules with
//! identical names and structure.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::info;
use url::Url;

use crate::client::{assemble, ClientDescriptor};
use crate::document::{SchemaDocument, Server};
use crate::error::Result;
use crate::operation::bind_operations;
use crate::synth::TypeSynthesizer;
use crate::types::{TypeId, TypeRegistry, TypedInstance};

/// Builds an [`ApiModule`] from a loaded document.
pub struct ModuleBuilder {
    document: SchemaDocument,
}

impl ModuleBuilder {
    pub fn new(document: SchemaDocument) -> Self {
        Self { document }
    }

    /// Run the binding pipeline: synthesize component types, bind
    /// operations, assemble clients.
    pub fn build(self) -> Result<ApiModule> {
        let mut synth = TypeSynthesizer::new(&self.document);
        synth.synthesize_components()?;
        let operations = bind_operations(&self.document, &mut synth)?;
        let registry = synth.into_registry();
        let clients = assemble(operations);

        let title = self
            .document
            .root()
            .pointer("/info/title")
            .and_then(Value::as_str)
            .map(String::from);
        let servers = self.document.servers();

        info!(
            title = title.as_deref().unwrap_or("(untitled)"),
            types = registry.len(),
            groups = clients.len(),
            "module built"
        );

        Ok(ApiModule {
            title,
            servers,
            types: Arc::new(registry),
            clients,
        })
    }
}

/// The built, immutable binding surface for one API.
#[derive(Debug)]
pub struct ApiModule {
    title: Option<String>,
    servers: Vec<Server>,
    types: Arc<TypeRegistry>,
    clients: Vec<ClientDescriptor>,
}

impl ApiModule {
    /// Build a module directly from a document.
    pub fn build(document: SchemaDocument) -> Result<Self> {
        ModuleBuilder::new(document).build()
    }

    /// The document's `info.title`, if declared.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    /// Base URL taken from the first declared server, if it parses.
    pub fn default_base_url(&self) -> Option<Url> {
        self.servers
            .first()
            .and_then(|server| Url::parse(&server.url).ok())
    }

    pub fn types(&self) -> &Arc<TypeRegistry> {
        &self.types
    }

    /// Look up a synthesized type by its translated name.
    pub fn type_id(&self, name: &str) -> Option<TypeId> {
        self.types.lookup(name)
    }

    /// Construct an instance of a synthesized type from a raw mapping.
    pub fn instance(&self, type_name: &str, data: &Map<String, Value>) -> Option<TypedInstance> {
        let id = self.types.lookup(type_name)?;
        Some(TypedInstance::new(self.types.clone(), id, data))
    }

    /// The client descriptor for one group.
    pub fn client(&self, group: &str) -> Option<&ClientDescriptor> {
        self.clients.iter().find(|c| c.group == group)
    }

    pub fn clients(&self) -> impl Iterator<Item = &ClientDescriptor> {
        self.clients.iter()
    }

    pub fn client_names(&self) -> Vec<&str> {
        self.clients.iter().map(|c| c.group.as_str()).collect()
    }
}
