use crate::deserializer::ReprDeserializer;
use crate::model::error::ErrorRepr;
use crate::model::link::LinksRepr;
use crate::model::resource::{ResourceIdRepr, ResourceRepr};
use crate::model::version::JsonApiVersion;
use crate::model::Meta;
use crate::renderer::ReprRenderer;
use crate::utils::JsonPointer;
use serde::{de, ser, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum DocumentError {
    #[error("either data, errors, or meta must be specified")]
    MissingTopLevelMember,
    #[error("either data, links, errors, or meta must be specified")]
    MissingRelationshipTopLevelMember,
    #[error("{expected:?} document cannot hold {actual:?} data")]
    MismatchedData { expected: DataKind, actual: DataKind },
    #[error("data and errors must not coexist in a document")]
    DataWithErrors,
}

/// Shape of the primary data of a document
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum DataKind {
    /// A resource or `null`
    Resource,
    /// An array of resources
    Resources,
    /// A resource identifier or `null`
    Identifier,
    /// An array of resource identifiers
    Identifiers,
}

impl DataKind {
    pub fn is_collection(self) -> bool { matches!(self, DataKind::Resources | DataKind::Identifiers) }

    pub fn holds_identifiers(self) -> bool {
        matches!(self, DataKind::Identifier | DataKind::Identifiers)
    }
}

/// Owned primary data handed over to [`DocumentRepr::from_parts`]
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryData {
    Resource(Option<ResourceRepr>),
    Resources(Vec<ResourceRepr>),
    Identifier(Option<ResourceIdRepr>),
    Identifiers(Vec<ResourceIdRepr>),
}

impl PrimaryData {
    pub fn kind(&self) -> DataKind {
        match self {
            PrimaryData::Resource(_) => DataKind::Resource,
            PrimaryData::Resources(_) => DataKind::Resources,
            PrimaryData::Identifier(_) => DataKind::Identifier,
            PrimaryData::Identifiers(_) => DataKind::Identifiers,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PrimaryDataRef<'a> {
    Resource(Option<&'a ResourceRepr>),
    Resources(&'a [ResourceRepr]),
    Identifier(Option<&'a ResourceIdRepr>),
    Identifiers(&'a [ResourceIdRepr]),
}

/// Top-level members shared by every kind of document.
///
/// `errors` and `meta` are `None` when the member is absent, which is not the same as an empty
/// `errors` array or an empty `meta` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentParts {
    pub jsonapi: Meta,
    pub errors: Option<Vec<ErrorRepr>>,
    pub included: Vec<ResourceRepr>,
    pub links: Option<LinksRepr>,
    pub meta: Option<Meta>,
    pub source: Option<JsonPointer>,
}

/// Common interface of the four kinds of top-level document
pub trait DocumentRepr: Sized {
    const DATA_KIND: DataKind;

    fn jsonapi(&self) -> &Meta;

    fn errors(&self) -> Option<&[ErrorRepr]>;

    fn included(&self) -> &[ResourceRepr];

    fn links(&self) -> Option<&LinksRepr>;

    fn meta(&self) -> Option<&Meta>;

    fn source(&self) -> Option<&JsonPointer>;

    /// `None` when the document has no `data` member
    fn data(&self) -> Option<PrimaryDataRef<'_>>;

    /// Assembles a document; `data` is `None` when the document has no `data` member.
    fn from_parts(parts: DocumentParts, data: Option<PrimaryData>) -> Result<Self, DocumentError>;

    /// The version declared in `jsonapi.version`, if any and well-formed
    fn version(&self) -> Option<JsonApiVersion> {
        self.jsonapi().get("version").and_then(Value::as_str).and_then(|v| v.parse().ok())
    }
}

fn check_parts(
    kind: DataKind, parts: &DocumentParts, data: &Option<PrimaryData>,
) -> Result<(), DocumentError> {
    if let Some(data) = data {
        if data.kind() != kind {
            return Err(DocumentError::MismatchedData { expected: kind, actual: data.kind() });
        }
    }
    if data.is_some() && parts.errors.is_some() {
        return Err(DocumentError::DataWithErrors);
    }
    let has_content = data.is_some() || parts.errors.is_some() || parts.meta.is_some();
    if kind.holds_identifiers() {
        if !has_content && parts.links.is_none() {
            return Err(DocumentError::MissingRelationshipTopLevelMember);
        }
    } else if !has_content {
        return Err(DocumentError::MissingTopLevelMember);
    }
    Ok(())
}

macro_rules! document_repr {
    ($(#[$attr:meta])* $name:ident, $kind:ident, $data_ty:ty, |$data:ident| $as_ref:expr) => {
        $(#[$attr])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $name {
            pub jsonapi: Meta,
            pub errors: Option<Vec<ErrorRepr>>,
            pub included: Vec<ResourceRepr>,
            pub links: Option<LinksRepr>,
            pub meta: Option<Meta>,
            pub data: Option<$data_ty>,
            pub source: Option<JsonPointer>,
        }

        impl DocumentRepr for $name {
            const DATA_KIND: DataKind = DataKind::$kind;

            fn jsonapi(&self) -> &Meta { &self.jsonapi }

            fn errors(&self) -> Option<&[ErrorRepr]> { self.errors.as_deref() }

            fn included(&self) -> &[ResourceRepr] { &self.included }

            fn links(&self) -> Option<&LinksRepr> { self.links.as_ref() }

            fn meta(&self) -> Option<&Meta> { self.meta.as_ref() }

            fn source(&self) -> Option<&JsonPointer> { self.source.as_ref() }

            fn data(&self) -> Option<PrimaryDataRef<'_>> {
                self.data.as_ref().map(|$data| PrimaryDataRef::$kind($as_ref))
            }

            fn from_parts(
                parts: DocumentParts, data: Option<PrimaryData>,
            ) -> Result<Self, DocumentError> {
                check_parts(Self::DATA_KIND, &parts, &data)?;
                let data = match data {
                    Some(PrimaryData::$kind(data)) => Some(data),
                    _ => None,
                };
                let DocumentParts { jsonapi, errors, included, links, meta, source } = parts;
                Ok(Self { jsonapi, errors, included, links, meta, data, source })
            }
        }

        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                ReprRenderer::default()
                    .render(self)
                    .map_err(ser::Error::custom)?
                    .serialize(serializer)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let value = Value::deserialize(deserializer)?;
                ReprDeserializer::new().deserialize(&value, false).map_err(de::Error::custom)
            }
        }
    };
}

document_repr!(
    /// Document whose primary data is a single resource or `null`
    SingletonDocumentRepr,
    Resource,
    Option<ResourceRepr>,
    |data| data.as_ref()
);

document_repr!(
    /// Document whose primary data is an array of resources
    CollectionDocumentRepr,
    Resources,
    Vec<ResourceRepr>,
    |data| data.as_slice()
);

document_repr!(
    /// Relationship document of a to-one relationship
    ToOneRelDocumentRepr,
    Identifier,
    Option<ResourceIdRepr>,
    |data| data.as_ref()
);

document_repr!(
    /// Relationship document of a to-many relationship
    ToManyRelDocumentRepr,
    Identifiers,
    Vec<ResourceIdRepr>,
    |data| data.as_slice()
);
