use sift_types::{ActionSpec, FieldDefinition, NamingConvention, ResourceSchema};

/// Read-only access to resource schemas and exposed actions.
///
/// Implementations must be safe for concurrent reads; the engine never
/// mutates what a provider hands out. Schema nodes are addressed by name so
/// cyclic schemas resolve lazily at each recursion step.
pub trait SchemaProvider: Send + Sync {
    /// Looks up a resource or embedded type by name.
    fn get_resource(&self, resource: &str) -> Option<&ResourceSchema>;

    /// Looks up a field of `resource` by its source name.
    fn get_field(&self, resource: &str, name: &str) -> Option<&FieldDefinition> {
        self.get_resource(resource)?.field(name)
    }

    /// Lists the fields of `resource` in declaration order.
    fn list_fields(&self, resource: &str) -> Option<&[FieldDefinition]> {
        self.get_resource(resource).map(|schema| schema.fields.as_slice())
    }

    /// Looks up an exposed action by its RPC name.
    fn get_action(&self, name: &str) -> Option<&ActionSpec>;

    /// Naming convention used for every client-facing identifier.
    fn naming(&self) -> NamingConvention;
}

/// Finds the field a client refers to.
///
/// Client-facing names take precedence; the raw source name is accepted as a
/// fallback so snake_case clients keep working under a camelCase convention.
pub fn find_field_by_client_name<'a>(provider: &'a dyn SchemaProvider, resource: &str, client_name: &str) -> Option<&'a FieldDefinition> {
    let naming = provider.naming();
    let fields = provider.list_fields(resource)?;
    fields
        .iter()
        .find(|field| naming.client_name(&field.name, field.client_name.as_deref()) == client_name)
        .or_else(|| fields.iter().find(|field| field.name == client_name))
}
