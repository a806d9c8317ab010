//! Turns parsed JSON into document reprs.
//!
//! Every repr produced remembers the JSON pointer it was read from. When a
//! [`DescriptorQuerier`] is given, resources are checked against the descriptor of their type and
//! attribute values are converted to the declared types. Problems are collected rather than
//! reported one at a time, unless [`DeserializerOptions::stop_at_first_error`] is set.

use crate::descriptor::{DescriptorQuerier, RelationshipType, ResourceDescriptor};
use crate::model::attribute::{AttributeValue, Attributes};
use crate::model::document::{DataKind, DocumentParts, DocumentRepr, PrimaryData};
use crate::model::error::{ErrorRepr, SourceRepr};
use crate::model::link::{Link, LinksRepr};
use crate::model::resource::{LinkageData, LinkageRepr, ResourceIdRepr, ResourceRepr};
use crate::model::version::JsonApiVersion;
use crate::model::Meta;
use crate::utils::formatting::{english_enumerate, OR};
use crate::utils::{
    ConverterContext, DefaultConverterContext, ErrorCollectingConverterContext, JsonPointer,
    TypedValueConverter, ValidationError,
};
use itertools::Itertools;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid document: {}", .errors.iter().join(", "))]
pub struct DeserializationError {
    /// The document as it was given
    pub payload: Value,
    pub errors: Vec<ValidationError>,
}

impl DeserializationError {
    /// One error object per validation error, suitable for a `400 Bad Request` response
    pub fn to_error_reprs(&self) -> Vec<ErrorRepr> {
        self.errors
            .iter()
            .map(|err| ErrorRepr {
                status: Some("400".into()),
                detail: Some(err.message.clone()),
                source: Some(SourceRepr { pointer: Some(err.pointer.to_string()), parameter: None }),
                ..Default::default()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Deserialize)]
#[serde(default)]
pub struct DeserializerOptions {
    /// Reports attributes required on creation that the resources lack
    pub require_complete_set_of_attributes: bool,
    pub stop_at_first_error: bool,
}

#[derive(Default)]
pub struct ReprDeserializer<'q> {
    querier: Option<&'q dyn DescriptorQuerier>,
    converter: TypedValueConverter,
}

impl std::fmt::Debug for ReprDeserializer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReprDeserializer")
            .field("schema", &self.querier.is_some())
            .field("converter", &self.converter)
            .finish()
    }
}

impl ReprDeserializer<'static> {
    /// A deserializer without schema: attributes are taken as plain JSON values
    pub fn new() -> Self { Default::default() }
}

impl<'q> ReprDeserializer<'q> {
    pub fn with_querier(querier: &'q dyn DescriptorQuerier) -> Self {
        Self { querier: Some(querier), converter: Default::default() }
    }

    /// The converter used for attribute values, where custom types are registered
    pub fn converter_mut(&mut self) -> &mut TypedValueConverter { &mut self.converter }

    pub fn deserialize<D: DocumentRepr>(
        &self, document: &Value, require_complete_set_of_attributes: bool,
    ) -> Result<D, DeserializationError> {
        let options =
            DeserializerOptions { require_complete_set_of_attributes, ..Default::default() };
        self.deserialize_with_options(document, &options)
    }

    pub fn deserialize_with_options<D: DocumentRepr>(
        &self, document: &Value, options: &DeserializerOptions,
    ) -> Result<D, DeserializationError> {
        log::debug!("deserializing {:?} document", D::DATA_KIND);
        let mut collecting = ErrorCollectingConverterContext::default();
        let mut stopping = DefaultConverterContext::default();
        let ctx: &mut dyn ConverterContext =
            if options.stop_at_first_error { &mut stopping } else { &mut collecting };

        let mut reader = Reader { de: self, ctx, options };
        let parts = reader.read_document(D::DATA_KIND, document);
        let result = match parts {
            Some((parts, data)) if !reader.ctx.stopped() && reader.ctx.errors().is_empty() => {
                match D::from_parts(parts, data) {
                    Ok(doc) => Some(doc),
                    Err(err) => {
                        reader.error::<()>(&JsonPointer::root(), err.to_string());
                        None
                    },
                }
            },
            _ => None,
        };
        let errors = reader.ctx.take_errors();
        match result {
            Some(doc) if errors.is_empty() => Ok(doc),
            _ => {
                log::warn!("document rejected with {} error(s)", errors.len());
                Err(DeserializationError { payload: document.clone(), errors })
            },
        }
    }

    pub fn deserialize_str<D: DocumentRepr>(
        &self, document: &str, require_complete_set_of_attributes: bool,
    ) -> crate::Result<D> {
        let value: Value = serde_json::from_str(document)?;
        Ok(self.deserialize(&value, require_complete_set_of_attributes)?)
    }
}

struct Reader<'a, 'q> {
    de: &'a ReprDeserializer<'q>,
    ctx: &'a mut dyn ConverterContext,
    options: &'a DeserializerOptions,
}

impl<'a, 'q> Reader<'a, 'q> {
    fn error<T>(&mut self, pointer: &JsonPointer, message: impl Into<String>) -> Option<T> {
        self.ctx.validation_error_occurred(ValidationError::new(pointer.clone(), message));
        None
    }

    fn mismatch<T>(&mut self, pointer: &JsonPointer, value: &Value, expected: &str) -> Option<T> {
        self.ctx.validation_error_occurred(ValidationError::type_mismatch(
            pointer.clone(),
            value,
            expected,
        ));
        None
    }

    fn object<'v>(&mut self, pointer: &JsonPointer, value: &'v Value) -> Option<&'v Map<String, Value>> {
        match value {
            Value::Object(map) => Some(map),
            value => self.mismatch(pointer, value, "object"),
        }
    }

    fn array<'v>(&mut self, pointer: &JsonPointer, value: &'v Value, expected: &str) -> Option<&'v [Value]> {
        match value {
            Value::Array(items) => Some(items),
            value => self.mismatch(pointer, value, expected),
        }
    }

    fn string(&mut self, pointer: &JsonPointer, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            value => self.mismatch(pointer, value, "string"),
        }
    }

    fn optional_string(&mut self, pointer: &JsonPointer, map: &Map<String, Value>, name: &str) -> Option<String> {
        match map.get(name) {
            None | Some(Value::Null) => None,
            Some(value) => self.string(&pointer.join(name), value),
        }
    }

    fn required<'v>(&mut self, pointer: &JsonPointer, map: &'v Map<String, Value>, name: &str) -> Option<&'v Value> {
        match map.get(name) {
            Some(value) => Some(value),
            None => self.error(&pointer.join(name), format!("value must have a property \"{}\"", name)),
        }
    }

    fn meta(&mut self, pointer: &JsonPointer, map: &Map<String, Value>) -> Meta {
        match map.get("meta") {
            None | Some(Value::Null) => Meta::new(),
            Some(value) => self.object(&pointer.join("meta"), value).cloned().unwrap_or_default(),
        }
    }

    /// Iterates over the items of an array, stopping early when the context says so
    fn items<T>(
        &mut self, pointer: &JsonPointer, items: &[Value],
        mut read: impl FnMut(&mut Self, &JsonPointer, &Value) -> Option<T>,
    ) -> Vec<T> {
        let mut result = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if let Some(item) = read(self, &pointer.index(i), item) {
                result.push(item);
            }
            if self.ctx.stopped() {
                break;
            }
        }
        result
    }

    fn read_document(
        &mut self, kind: DataKind, value: &Value,
    ) -> Option<(DocumentParts, Option<PrimaryData>)> {
        let root = JsonPointer::root();
        let map = self.object(&root, value)?;

        if map.contains_key("data") && map.contains_key("errors") {
            self.error::<()>(&root, "\"data\" and \"errors\" must not coexist in a document");
        }
        if map.contains_key("included") && !map.contains_key("data") {
            self.error::<()>(&root.join("included"), "\"included\" must not be present without \"data\"");
        }

        let mut parts = DocumentParts { source: Some(root.clone()), ..Default::default() };
        if let Some(jsonapi) = map.get("jsonapi") {
            parts.jsonapi = self.read_jsonapi(&root.join("jsonapi"), jsonapi).unwrap_or_default();
        }
        if let Some(errors) = map.get("errors") {
            let pointer = root.join("errors");
            if let Some(items) = self.array(&pointer, errors, "array of errors") {
                parts.errors = Some(self.items(&pointer, items, Self::read_error));
            }
        }
        if let Some(links) = map.get("links") {
            parts.links = self.read_links(&root.join("links"), links);
        }
        parts.meta = match map.get("meta") {
            None | Some(Value::Null) => None,
            Some(value) => self.object(&root.join("meta"), value).cloned(),
        };
        let data = match map.get("data") {
            Some(data) => self.read_data(kind, &root.join("data"), data),
            None => None,
        };
        if let Some(included) = map.get("included") {
            let pointer = root.join("included");
            if let Some(items) = self.array(&pointer, included, "array of resources") {
                parts.included = self.items(&pointer, items, Self::read_resource);
            }
        }
        Some((parts, data))
    }

    fn read_jsonapi(&mut self, pointer: &JsonPointer, value: &Value) -> Option<Meta> {
        let map = self.object(pointer, value)?;
        if let Some(version) = map.get("version") {
            let version_pointer = pointer.join("version");
            let version = self.string(&version_pointer, version)?;
            if version.parse::<JsonApiVersion>().is_err() {
                return self.error(&version_pointer, format!("bad JSON:API version ({:?})", version));
            }
        }
        Some(map.clone())
    }

    fn read_data(&mut self, kind: DataKind, pointer: &JsonPointer, value: &Value) -> Option<PrimaryData> {
        match (kind, value) {
            (DataKind::Resource, Value::Null) => Some(PrimaryData::Resource(None)),
            (DataKind::Resource, Value::Object(_)) => {
                self.read_resource(pointer, value).map(|r| PrimaryData::Resource(Some(r)))
            },
            (DataKind::Identifier, Value::Null) => Some(PrimaryData::Identifier(None)),
            (DataKind::Identifier, Value::Object(_)) => {
                self.read_resource_id(pointer, value).map(|r| PrimaryData::Identifier(Some(r)))
            },
            (DataKind::Resources, Value::Array(items)) => {
                Some(PrimaryData::Resources(self.items(pointer, items, Self::read_resource)))
            },
            (DataKind::Identifiers, Value::Array(items)) => {
                Some(PrimaryData::Identifiers(self.items(pointer, items, Self::read_resource_id)))
            },
            (DataKind::Resource, value) => self.mismatch(pointer, value, "resource or null"),
            (DataKind::Identifier, value) => {
                self.mismatch(pointer, value, "resource identifier or null")
            },
            (DataKind::Resources, value) => self.mismatch(pointer, value, "array of resources"),
            (DataKind::Identifiers, value) => {
                self.mismatch(pointer, value, "array of resource identifiers")
            },
        }
    }

    fn read_link(&mut self, pointer: &JsonPointer, value: &Value) -> Option<Link> {
        let (href, meta) = match value {
            Value::String(href) => (href.as_str(), None),
            Value::Object(map) => {
                let href_pointer = pointer.join("href");
                let href = match self.required(pointer, map, "href")? {
                    Value::String(href) => href.as_str(),
                    value => return self.mismatch(&href_pointer, value, "string"),
                };
                (href, Some(self.meta(pointer, map)))
            },
            value => return self.mismatch(pointer, value, "string or link object"),
        };
        let link = match meta {
            Some(meta) => Link::with_meta(href, meta),
            None => href.parse::<Link>(),
        };
        match link {
            Ok(link) => Some(link),
            Err(err) => self.error(pointer, err.to_string()),
        }
    }

    fn read_links(&mut self, pointer: &JsonPointer, value: &Value) -> Option<LinksRepr> {
        let map = self.object(pointer, value)?;
        let mut links = LinksRepr { source: Some(pointer.clone()), ..Default::default() };
        for (name, value) in map {
            if value.is_null() {
                continue;
            }
            let link = self.read_link(&pointer.join(name), value);
            match links.get_mut(name) {
                Some(slot) => *slot = link,
                None => log::trace!("ignoring link \"{}\" at {}", name, pointer),
            }
        }
        Some(links)
    }

    fn read_error(&mut self, pointer: &JsonPointer, value: &Value) -> Option<ErrorRepr> {
        let map = self.object(pointer, value)?;
        let source = match map.get("source") {
            None | Some(Value::Null) => None,
            Some(value) => {
                let source_pointer = pointer.join("source");
                self.object(&source_pointer, value).map(|source| SourceRepr {
                    pointer: self.optional_string(&source_pointer, source, "pointer"),
                    parameter: self.optional_string(&source_pointer, source, "parameter"),
                })
            },
        };
        Some(ErrorRepr {
            id: self.optional_string(pointer, map, "id"),
            links: match map.get("links") {
                Some(links) => self.read_links(&pointer.join("links"), links),
                None => None,
            },
            status: self.optional_string(pointer, map, "status"),
            code: self.optional_string(pointer, map, "code"),
            title: self.optional_string(pointer, map, "title"),
            detail: self.optional_string(pointer, map, "detail"),
            source,
            meta: self.meta(pointer, map),
            location: Some(pointer.clone()),
        })
    }

    fn descriptor(&mut self, pointer: &JsonPointer, ty: &str) -> Option<Option<&'q ResourceDescriptor>> {
        match self.de.querier {
            None => Some(None),
            Some(querier) => match querier.query(ty) {
                Some(descr) => Some(Some(descr)),
                None => self.error(pointer, format!("unknown resource type \"{}\"", ty)),
            },
        }
    }

    fn read_resource_id(&mut self, pointer: &JsonPointer, value: &Value) -> Option<ResourceIdRepr> {
        let map = match value {
            Value::Object(map) => map,
            value => return self.mismatch(pointer, value, "resource identifier"),
        };
        let ty = self.required(pointer, map, "type")?;
        let ty = self.string(&pointer.join("type"), ty)?;
        let id = self.required(pointer, map, "id")?;
        let id = self.string(&pointer.join("id"), id)?;
        self.descriptor(pointer, &ty)?;
        Some(ResourceIdRepr { ty, id, meta: self.meta(pointer, map), source: Some(pointer.clone()) })
    }

    fn read_resource(&mut self, pointer: &JsonPointer, value: &Value) -> Option<ResourceRepr> {
        let map = match value {
            Value::Object(map) => map,
            value => return self.mismatch(pointer, value, "resource"),
        };
        let ty = self.required(pointer, map, "type")?;
        let ty = self.string(&pointer.join("type"), ty)?;
        log::trace!("reading resource of type \"{}\" at {}", ty, pointer);
        let descr = self.descriptor(pointer, &ty)?;
        let id = self.optional_string(pointer, map, "id");

        let attributes = match map.get("attributes") {
            None | Some(Value::Null) => Map::new(),
            Some(value) => self.object(&pointer.join("attributes"), value)?.clone(),
        };
        let attributes = match descr {
            Some(descr) => self.read_described_attributes(pointer, descr, &attributes),
            None => attributes.into_iter().map(|(k, v)| (k, AttributeValue::from(v))).collect(),
        };

        let mut relationships = crate::model::resource::Relationships::new();
        if let Some(value) = map.get("relationships") {
            let rels_pointer = pointer.join("relationships");
            if let Some(rels) = self.object(&rels_pointer, value) {
                for (name, value) in rels {
                    let rel_pointer = rels_pointer.join(name);
                    let expected = match descr.map(|d| d.relationship(name)) {
                        None => None,
                        Some(Some(rel)) => Some(rel.ty),
                        Some(None) => {
                            self.error::<()>(&rel_pointer, format!("unknown relationship \"{}\"", name));
                            continue;
                        },
                    };
                    if let Some(linkage) = self.read_linkage(&rel_pointer, value, expected) {
                        relationships.insert(name.clone(), linkage);
                    }
                    if self.ctx.stopped() {
                        break;
                    }
                }
            }
        }

        let links = match map.get("links") {
            Some(links) => self.read_links(&pointer.join("links"), links),
            None => None,
        };
        Some(ResourceRepr {
            ty,
            id,
            attributes,
            relationships,
            links,
            meta: self.meta(pointer, map),
            source: Some(pointer.clone()),
        })
    }

    fn read_described_attributes(
        &mut self, pointer: &JsonPointer, descr: &ResourceDescriptor, given: &Map<String, Value>,
    ) -> Attributes {
        let attrs_pointer = pointer.join("attributes");
        let mut attributes = Attributes::new();
        for attr in &descr.attributes {
            match given.get(&attr.name) {
                Some(value) => {
                    let converted = self.de.converter.convert(
                        &mut *self.ctx,
                        &attrs_pointer.join(&attr.name),
                        &attr.effective_type(),
                        value,
                    );
                    if let Some(converted) = converted {
                        attributes.insert(attr.name.clone(), converted);
                    }
                },
                None => {
                    if self.options.require_complete_set_of_attributes
                        && attr.required_on_creation
                        && !attr.read_only
                    {
                        self.error::<()>(
                            pointer,
                            format!(
                                "attribute \"{}\" is not provided where a complete set of attributes is wanted",
                                attr.name
                            ),
                        );
                    }
                },
            }
            if self.ctx.stopped() {
                return attributes;
            }
        }
        for name in given.keys().filter(|name| descr.attribute(name).is_none()) {
            self.error::<()>(&attrs_pointer.join(name), format!("unknown attribute \"{}\"", name));
            if self.ctx.stopped() {
                break;
            }
        }
        attributes
    }

    fn read_linkage(
        &mut self, pointer: &JsonPointer, value: &Value, expected: Option<RelationshipType>,
    ) -> Option<LinkageRepr> {
        let map = match value {
            Value::Object(map) => map,
            value => return self.mismatch(pointer, value, "relationship object"),
        };
        if !["links", "data", "meta"].iter().any(|k| map.contains_key(*k)) {
            return self.error(
                pointer,
                format!(
                    "relationship object must contain at least one of {}",
                    english_enumerate(vec!["\"links\"", "\"data\"", "\"meta\""], OR)
                ),
            );
        }
        let data_pointer = pointer.join("data");
        let data = match (map.get("data"), expected) {
            (None, _) => None,
            (Some(Value::Null), Some(RelationshipType::ToMany)) | (Some(Value::Object(_)), Some(RelationshipType::ToMany)) => {
                return self.mismatch(&data_pointer, &map["data"], "array of resource identifiers");
            },
            (Some(Value::Array(_)), Some(RelationshipType::ToOne)) => {
                return self.mismatch(&data_pointer, &map["data"], "resource identifier or null");
            },
            (Some(Value::Null), _) => Some(LinkageData::ToOne(None)),
            (Some(value @ Value::Object(_)), _) => {
                Some(LinkageData::ToOne(Some(self.read_resource_id(&data_pointer, value)?)))
            },
            (Some(Value::Array(items)), _) => {
                Some(LinkageData::ToMany(self.items(&data_pointer, items, Self::read_resource_id)))
            },
            (Some(value), _) => {
                return self.mismatch(&data_pointer, value, "resource linkage");
            },
        };
        let links = match map.get("links") {
            Some(links) => self.read_links(&pointer.join("links"), links),
            None => None,
        };
        Some(LinkageRepr { data, links, meta: self.meta(pointer, map), source: Some(pointer.clone()) })
    }
}
