//! Runtime binding of OpenAPI documents to typed, callable API clients.
//!
//! A document is loaded once, its component schemas are synthesized into
//! an immutable type registry, and its operations are bound into grouped
//! clients with snake_case method names. No code generation step: the
//! whole surface is built at runtime from the document alone.
//!
//! The pipeline, in order:
//!
//! 1. [`document`] loads and wraps the parsed document
//! 2. [`resolve`] dereferences `$ref` pointers with stable identity
//! 3. [`synth`] realizes schemas as [`types::TypeDescriptor`]s
//! 4. [`operation`] binds path items into operation descriptors
//! 5. [`client`] groups operations and executes calls over a [`transport`]
//! 6. [`module`] drives the pipeline and owns the result
//!
//! ```no_run
//! use std::sync::Arc;
//! use openapi_bind::{ApiClient, ApiModule, CallArgs, ClientConfig, SchemaDocument};
//!
//! # async fn run() -> openapi_bind::Result<()> {
//! let document = SchemaDocument::from_file("petstore.yaml")?;
//! let module = Arc::new(ApiModule::build(document)?);
//! let client = ApiClient::new(module, ClientConfig::new())?;
//!
//! let outcome = client
//!     .call("pets", "get_pet", &CallArgs::new().arg("petId", 42))
//!     .await?;
//! if let Some(pet) = outcome.typed() {
//!     println!("{:?}", pet.get("name"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod module;
pub mod names;
pub mod operation;
pub mod resolve;
pub mod synth;
pub mod transport;
pub mod types;

pub use client::{ApiClient, BoundOperation, CallOutcome, ClientDescriptor, ResourceClient};
pub use config::ClientConfig;
pub use document::{SchemaDocument, Server};
pub use error::{BindError, Result};
pub use module::{ApiModule, ModuleBuilder};
pub use operation::{
    CallArgs, HttpMethod, OperationDescriptor, ParamLocation, ParameterDescriptor,
};
pub use transport::{ApiRequest, ApiResponse, HttpTransport, Transport};
pub use types::{
    FieldDescriptor, FieldType, TypeDescriptor, TypeId, TypeRegistry, TypedInstance,
};
