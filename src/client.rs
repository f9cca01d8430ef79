//! Client Assembly
//!
//! Groups bound operations into per-resource client descriptors and
//! exposes the callable surface: an [`ApiClient`] over a built module,
//! with [`ResourceClient`] handles for each group. Group names come from
//! each operation's first tag; untagged operations land in the `default`
//! group. Method-name collisions within a group are disambiguated with a
//! numeric suffix in declaration order.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::error::{BindError, Result};
use crate::module::ApiModule;
use crate::names;
use crate::operation::{CallArgs, OperationDescriptor};
use crate::transport::{ApiResponse, HttpTransport, Transport};
use crate::types::TypedInstance;

/// An operation under its final, collision-free method name.
#[derive(Debug, Clone)]
pub struct BoundOperation {
    pub name: String,
    pub operation: OperationDescriptor,
}

/// The callable surface for one resource group.
#[derive(Debug, Clone)]
pub struct ClientDescriptor {
    /// Translated group name (`pets`, `store`, `default`)
    pub group: String,
    operations: Vec<BoundOperation>,
}

impl ClientDescriptor {
    /// Look up an operation by its assembled method name.
    pub fn get(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations
            .iter()
            .find(|op| op.name == name)
            .map(|op| &op.operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BoundOperation> {
        self.operations.iter()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Group operations by tag, preserving first-appearance order of groups
/// and declaration order of operations within each group.
pub fn assemble(operations: Vec<OperationDescriptor>) -> Vec<ClientDescriptor> {
    let mut clients: Vec<ClientDescriptor> = Vec::new();

    for operation in operations {
        let group = operation
            .tag
            .as_deref()
            .map(names::member_name)
            .unwrap_or_else(|| "default".to_string());

        let index = match clients.iter().position(|c| c.group == group) {
            Some(index) => index,
            None => {
                clients.push(ClientDescriptor {
                    group,
                    operations: Vec::new(),
                });
                clients.len() - 1
            }
        };
        let client = &mut clients[index];

        // First claimant keeps the translated name; later collisions get
        // a numeric suffix, deterministically.
        let mut name = operation.method_name.clone();
        let mut n = 2;
        while client.operations.iter().any(|op| op.name == name) {
            name = format!("{}_{n}", operation.method_name);
            n += 1;
        }

        client.operations.push(BoundOperation { name, operation });
    }

    debug!(groups = clients.len(), "client assembly complete");
    clients
}

// =============================================================================
// Callable Clients
// =============================================================================

/// The result of one invocation.
///
/// Responses marshal to a typed instance only when the operation declares
/// an object-typed success response, the response status is a success,
/// and the body parses as a JSON object; anything else comes back raw.
/// Error statuses stay raw even when their body is a mapping: the
/// declared type describes the success shape, and constructing it from an
/// error payload would silently drop that payload's fields. Status
/// interpretation beyond that gate is left to the caller.
#[derive(Debug)]
pub enum CallOutcome {
    Typed {
        instance: TypedInstance,
        response: ApiResponse,
    },
    Raw(ApiResponse),
}

impl CallOutcome {
    pub fn response(&self) -> &ApiResponse {
        match self {
            CallOutcome::Typed { response, .. } => response,
            CallOutcome::Raw(response) => response,
        }
    }

    pub fn typed(&self) -> Option<&TypedInstance> {
        match self {
            CallOutcome::Typed { instance, .. } => Some(instance),
            CallOutcome::Raw(_) => None,
        }
    }

    pub fn into_typed(self) -> Option<TypedInstance> {
        match self {
            CallOutcome::Typed { instance, .. } => Some(instance),
            CallOutcome::Raw(_) => None,
        }
    }
}

/// A live client over a built module.
///
/// Cheap to clone; the module and transport are shared. Requests carry
/// the configured default headers followed by per-call headers.
#[derive(Clone)]
pub struct ApiClient {
    module: Arc<ApiModule>,
    transport: Arc<dyn Transport>,
    config: ClientConfig,
    base_url: Url,
}

impl ApiClient {
    /// Build a client with the default HTTP transport.
    pub fn new(module: Arc<ApiModule>, config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Self::with_transport(module, config, transport)
    }

    /// Build a client over a caller-supplied transport.
    pub fn with_transport(
        module: Arc<ApiModule>,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Result<Self> {
        let base_url = match &config.base_url {
            Some(url) => url.clone(),
            None => module.default_base_url().ok_or_else(|| {
                BindError::InvalidDocument(
                    "no base URL configured and the document declares no servers".to_string(),
                )
            })?,
        };

        Ok(Self {
            module,
            transport,
            config,
            base_url,
        })
    }

    pub fn module(&self) -> &Arc<ApiModule> {
        &self.module
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The client handle for one resource group.
    pub fn group(&self, name: &str) -> Result<ResourceClient<'_>> {
        let descriptor = self
            .module
            .client(name)
            .ok_or_else(|| BindError::UnknownGroup(name.to_string()))?;
        Ok(ResourceClient {
            client: self,
            descriptor,
        })
    }

    /// Invoke an operation by group and method name.
    pub async fn call(&self, group: &str, name: &str, args: &CallArgs) -> Result<CallOutcome> {
        self.group(group)?.call(name, args).await
    }

    async fn execute(
        &self,
        operation: &OperationDescriptor,
        args: &CallArgs,
    ) -> Result<CallOutcome> {
        let mut request = operation.build_request(&self.base_url, args)?;
        if !self.config.default_headers.is_empty() {
            let mut headers = self.config.default_headers.clone();
            headers.append(&mut request.headers);
            request.headers = headers;
        }

        let response = self.transport.execute(request).await?;

        if let Some(ty) = operation.response {
            if response.is_success() {
                if let Ok(Value::Object(body)) = response.json() {
                    let instance =
                        TypedInstance::new(self.module.types().clone(), ty, &body);
                    return Ok(CallOutcome::Typed { instance, response });
                }
            }
        }
        Ok(CallOutcome::Raw(response))
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("groups", &self.module.client_names())
            .finish_non_exhaustive()
    }
}

/// Handle for invoking one group's operations.
#[derive(Debug, Clone, Copy)]
pub struct ResourceClient<'a> {
    client: &'a ApiClient,
    descriptor: &'a ClientDescriptor,
}

impl<'a> ResourceClient<'a> {
    pub fn descriptor(&self) -> &'a ClientDescriptor {
        self.descriptor
    }

    /// Invoke an operation by its assembled method name.
    pub async fn call(&self, name: &str, args: &CallArgs) -> Result<CallOutcome> {
        let operation =
            self.descriptor
                .get(name)
                .ok_or_else(|| BindError::UnknownOperation {
                    group: self.descriptor.group.clone(),
                    name: name.to_string(),
                })?;
        self.client.execute(operation, args).await
    }
}
