use crate::builder::BuilderError;
use crate::deserializer::DeserializationError;
use crate::model::document::DocumentError;
use crate::model::error::{ErrorRepr, SourceRepr};
use crate::model::link::LinkError;
use crate::model::version::JsonApiVersion;
use crate::renderer::RenderError;
use crate::utils::{english_enumerate, JsonPointer};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JsonApiSerdeError {
    #[error(transparent)]
    Deserialization(#[from] DeserializationError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Builder(#[from] BuilderError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Mapper(#[from] MapperError),
    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] LinkError),
    #[error("Invalid JSON:API version: {0}, the valid format: `<major>.<minor>`")]
    InvalidJsonApiVersion(String),
    #[error("Unsupported JSON:API version: {0}, supported versions: {}", supported_versions())]
    UnsupportedJsonApiVersion(String),
    #[error("Invalid decimal number: {0}")]
    InvalidDecimal(String),
    #[error("Invalid timezone offset: {0}, the valid formats: `Z`, `+09:00`, `-0130`")]
    InvalidTimezoneOffset(String),
    #[error("Invalid declaration: {0}")]
    InvalidDeclaration(String),
    #[error("Unhandled")]
    Unhandled(#[source] Box<dyn std::error::Error + Send + Sync>),
}

unhandled_errors!(serde_json::Error);

fn supported_versions() -> String {
    english_enumerate(JsonApiVersion::ALL.iter().map(|v| v.as_str()), " and ")
}

fn fmt_detail(detail: &Option<String>) -> String {
    detail.as_ref().map(|d| format!(" ({})", d)).unwrap_or_default()
}

/// Errors raised when a resource does not satisfy its descriptor, typically while mapping a
/// deserialized resource onto a domain object
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MapperError {
    #[error("attribute ({name}) in \"{resource}\" contains an invalid value{}: {actual}", fmt_detail(.detail))]
    InvalidAttributeValue {
        resource: String,
        name: String,
        actual: String,
        detail: Option<String>,
        pointer: Option<JsonPointer>,
    },
    #[error("attribute ({name}) in \"{resource}\" is immutable")]
    ImmutableAttribute { resource: String, name: String, pointer: Option<JsonPointer> },
    #[error("attribute ({name}) not supplied as specified in \"{resource}\"")]
    AttributeNotFound { resource: String, name: String, pointer: Option<JsonPointer> },
    #[error("relationship ({name}) not supplied as specified in \"{resource}\"")]
    RelationshipNotFound { resource: String, name: String, pointer: Option<JsonPointer> },
    #[error("no resource known as \"{name}\"")]
    UnknownResourceType { name: String, pointer: Option<JsonPointer> },
    #[error("invalid identifier: {message}")]
    InvalidIdentifier { message: String, pointer: Option<JsonPointer> },
    #[error("{0}")]
    InvalidStructure(String),
}

impl MapperError {
    /// The location in the incoming document the error refers to, if known
    pub fn pointer(&self) -> Option<&JsonPointer> {
        match self {
            MapperError::InvalidAttributeValue { pointer, .. }
            | MapperError::ImmutableAttribute { pointer, .. }
            | MapperError::AttributeNotFound { pointer, .. }
            | MapperError::RelationshipNotFound { pointer, .. }
            | MapperError::UnknownResourceType { pointer, .. }
            | MapperError::InvalidIdentifier { pointer, .. } => pointer.as_ref(),
            MapperError::InvalidStructure(_) => None,
        }
    }

    pub fn to_error_repr(&self) -> ErrorRepr {
        let status = match self {
            MapperError::UnknownResourceType { .. } => "409",
            MapperError::ImmutableAttribute { .. } => "403",
            _ => "422",
        };
        ErrorRepr {
            status: Some(status.into()),
            detail: Some(self.to_string()),
            source: self
                .pointer()
                .map(|p| SourceRepr { pointer: Some(p.to_string()), ..Default::default() }),
            ..Default::default()
        }
    }
}
