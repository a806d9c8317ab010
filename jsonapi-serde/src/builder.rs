//! Incremental construction of reprs.
//!
//! Builders hand out mutable child builders (`next`, `set`, `next_included`, ...) so a document
//! can be filled in the order its source data is walked, then turned into reprs with `build`.

use crate::model::attribute::{AttributeValue, Attributes};
use crate::model::document::{
    CollectionDocumentRepr, DocumentError, DocumentParts, DocumentRepr, PrimaryData,
    SingletonDocumentRepr, ToManyRelDocumentRepr, ToOneRelDocumentRepr,
};
use crate::model::error::ErrorRepr;
use crate::model::link::LinksRepr;
use crate::model::resource::{LinkageData, LinkageRepr, ResourceIdRepr, ResourceRepr};
use crate::model::version::JsonApiVersion;
use crate::model::Meta;
use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum BuilderError {
    #[error("resource type is not set")]
    MissingType,
    #[error("relationship \"{0}\" is not a to-one relationship")]
    NotToOne(String),
    #[error("relationship \"{0}\" is not a to-many relationship")]
    NotToMany(String),
    #[error("resource identifier at index {0} lacks its type or id")]
    IncompleteIdentifier(usize),
    #[error("collection has items but is not marked as done")]
    NotDone,
    #[error(transparent)]
    Document(#[from] DocumentError),
}

#[derive(Debug, Clone, Default)]
pub struct ResourceIdReprBuilder {
    ty: Option<String>,
    id: Option<String>,
    pub meta: Meta,
}

impl ResourceIdReprBuilder {
    pub fn set_type(&mut self, ty: impl Into<String>) -> &mut Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    pub fn add_meta(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.meta.insert(key.into(), value);
        self
    }

    /// `None` until both type and id are set
    pub fn build(&self) -> Option<ResourceIdRepr> {
        match (&self.ty, &self.id) {
            (Some(ty), Some(id)) => Some(ResourceIdRepr {
                ty: ty.clone(),
                id: id.clone(),
                meta: self.meta.clone(),
                source: None,
            }),
            _ => None,
        }
    }
}

fn build_identifiers(builders: &[ResourceIdReprBuilder]) -> Result<Vec<ResourceIdRepr>, BuilderError> {
    builders
        .iter()
        .enumerate()
        .map(|(i, b)| b.build().ok_or(BuilderError::IncompleteIdentifier(i)))
        .collect()
}

/// Builds a to-one relationship; its data stays absent until `set` or `nullify` is called
#[derive(Debug, Clone, Default)]
pub struct ToOneRelReprBuilder {
    data: Option<Option<ResourceIdReprBuilder>>,
    pub links: Option<LinksRepr>,
    pub meta: Meta,
}

impl ToOneRelReprBuilder {
    pub fn set(&mut self) -> &mut ResourceIdReprBuilder {
        self.data.get_or_insert(None).get_or_insert_with(Default::default)
    }

    /// Makes the linkage an explicit `null`
    pub fn nullify(&mut self) { self.data = Some(None); }

    pub fn build(&self) -> LinkageRepr {
        LinkageRepr {
            data: self
                .data
                .as_ref()
                .map(|data| LinkageData::ToOne(data.as_ref().and_then(ResourceIdReprBuilder::build))),
            links: self.links.clone(),
            meta: self.meta.clone(),
            source: None,
        }
    }
}

/// Builds a to-many relationship; its data is only emitted once `done` is called
#[derive(Debug, Clone, Default)]
pub struct ToManyRelReprBuilder {
    data: Vec<ResourceIdReprBuilder>,
    done: bool,
    pub links: Option<LinksRepr>,
    pub meta: Meta,
}

impl ToManyRelReprBuilder {
    pub fn next(&mut self) -> &mut ResourceIdReprBuilder {
        self.data.push(Default::default());
        let last = self.data.len() - 1;
        &mut self.data[last]
    }

    pub fn done(&mut self) { self.done = true; }

    pub fn build(&self) -> Result<LinkageRepr, BuilderError> {
        let data = if self.done {
            Some(LinkageData::ToMany(build_identifiers(&self.data)?))
        } else {
            None
        };
        Ok(LinkageRepr { data, links: self.links.clone(), meta: self.meta.clone(), source: None })
    }
}

#[derive(Debug, Clone)]
pub enum LinkageReprBuilder {
    ToOne(ToOneRelReprBuilder),
    ToMany(ToManyRelReprBuilder),
}

impl LinkageReprBuilder {
    pub fn build(&self) -> Result<LinkageRepr, BuilderError> {
        match self {
            LinkageReprBuilder::ToOne(b) => Ok(b.build()),
            LinkageReprBuilder::ToMany(b) => b.build(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceReprBuilder {
    ty: Option<String>,
    id: Option<String>,
    attributes: Attributes,
    relationships: IndexMap<String, LinkageReprBuilder>,
    pub links: Option<LinksRepr>,
    pub meta: Meta,
}

impl ResourceReprBuilder {
    pub fn set_type(&mut self, ty: impl Into<String>) -> &mut Self {
        self.ty = Some(ty.into());
        self
    }

    pub fn set_id(&mut self, id: impl Into<String>) -> &mut Self {
        self.id = Some(id.into());
        self
    }

    pub fn add_attribute(&mut self, name: impl Into<String>, value: impl Into<AttributeValue>) -> &mut Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn add_meta(&mut self, key: impl Into<String>, value: Value) -> &mut Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn set_links(&mut self, links: LinksRepr) -> &mut Self {
        self.links = Some(links);
        self
    }

    /// The builder of relationship `name`, created on first use
    pub fn next_to_one_relationship(&mut self, name: &str) -> Result<&mut ToOneRelReprBuilder, BuilderError> {
        let rel = self
            .relationships
            .entry(name.to_owned())
            .or_insert_with(|| LinkageReprBuilder::ToOne(Default::default()));
        match rel {
            LinkageReprBuilder::ToOne(b) => Ok(b),
            LinkageReprBuilder::ToMany(_) => Err(BuilderError::NotToOne(name.to_owned())),
        }
    }

    /// The builder of relationship `name`, created on first use
    pub fn next_to_many_relationship(&mut self, name: &str) -> Result<&mut ToManyRelReprBuilder, BuilderError> {
        let rel = self
            .relationships
            .entry(name.to_owned())
            .or_insert_with(|| LinkageReprBuilder::ToMany(Default::default()));
        match rel {
            LinkageReprBuilder::ToMany(b) => Ok(b),
            LinkageReprBuilder::ToOne(_) => Err(BuilderError::NotToMany(name.to_owned())),
        }
    }

    pub fn build(&self) -> Result<ResourceRepr, BuilderError> {
        let ty = self.ty.clone().ok_or(BuilderError::MissingType)?;
        let relationships = self
            .relationships
            .iter()
            .map(|(k, v)| v.build().map(|v| (k.clone(), v)))
            .collect::<Result<_, _>>()?;
        Ok(ResourceRepr {
            ty,
            id: self.id.clone(),
            attributes: self.attributes.clone(),
            relationships,
            links: self.links.clone(),
            meta: self.meta.clone(),
            source: None,
        })
    }
}

/// Top-level members every document builder carries; `errors` and `meta` stay absent until set
#[derive(Debug, Clone, Default)]
pub struct DocumentBuilderCommon {
    pub jsonapi: Meta,
    pub errors: Option<Vec<ErrorRepr>>,
    pub included: Vec<ResourceReprBuilder>,
    pub links: Option<LinksRepr>,
    pub meta: Option<Meta>,
}

impl DocumentBuilderCommon {
    fn parts(&self) -> Result<DocumentParts, BuilderError> {
        Ok(DocumentParts {
            jsonapi: self.jsonapi.clone(),
            errors: self.errors.clone(),
            included: self.included.iter().map(ResourceReprBuilder::build).collect::<Result<_, _>>()?,
            links: self.links.clone(),
            meta: self.meta.clone(),
            source: None,
        })
    }
}

pub trait DocumentBuilder {
    type Document: DocumentRepr;

    fn common_mut(&mut self) -> &mut DocumentBuilderCommon;

    fn build(&self) -> Result<Self::Document, BuilderError>;

    fn next_included(&mut self) -> &mut ResourceReprBuilder {
        let included = &mut self.common_mut().included;
        included.push(Default::default());
        let last = included.len() - 1;
        &mut included[last]
    }

    fn set_links(&mut self, links: LinksRepr) { self.common_mut().links = Some(links); }

    fn add_meta(&mut self, key: impl Into<String>, value: Value) {
        self.common_mut().meta.get_or_insert_with(Default::default).insert(key.into(), value);
    }

    /// Replaces the top-level `meta`, which renders even when empty
    fn set_meta(&mut self, meta: Meta) { self.common_mut().meta = Some(meta); }

    fn add_error(&mut self, error: ErrorRepr) {
        self.common_mut().errors.get_or_insert_with(Vec::new).push(error);
    }

    fn set_version(&mut self, version: JsonApiVersion) {
        self.common_mut().jsonapi.insert("version".into(), Value::String(version.to_string()));
    }
}

#[derive(Debug, Clone, Default)]
pub struct SingletonDocumentBuilder {
    common: DocumentBuilderCommon,
    data: Option<Option<ResourceReprBuilder>>,
}

impl SingletonDocumentBuilder {
    pub fn new() -> Self { Default::default() }

    /// The primary resource
    pub fn data(&mut self) -> &mut ResourceReprBuilder {
        self.data.get_or_insert(None).get_or_insert_with(Default::default)
    }

    /// Makes the primary data an explicit `null`
    pub fn nullify(&mut self) { self.data = Some(None); }
}

impl DocumentBuilder for SingletonDocumentBuilder {
    type Document = SingletonDocumentRepr;

    fn common_mut(&mut self) -> &mut DocumentBuilderCommon { &mut self.common }

    fn build(&self) -> Result<SingletonDocumentRepr, BuilderError> {
        let data = match &self.data {
            Some(data) => Some(PrimaryData::Resource(data.as_ref().map(ResourceReprBuilder::build).transpose()?)),
            None => None,
        };
        Ok(SingletonDocumentRepr::from_parts(self.common.parts()?, data)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CollectionDocumentBuilder {
    common: DocumentBuilderCommon,
    data: Vec<ResourceReprBuilder>,
    done: bool,
}

impl CollectionDocumentBuilder {
    pub fn new() -> Self { Default::default() }

    pub fn next(&mut self) -> &mut ResourceReprBuilder {
        self.data.push(Default::default());
        let last = self.data.len() - 1;
        &mut self.data[last]
    }

    pub fn done(&mut self) { self.done = true; }
}

impl DocumentBuilder for CollectionDocumentBuilder {
    type Document = CollectionDocumentRepr;

    fn common_mut(&mut self) -> &mut DocumentBuilderCommon { &mut self.common }

    fn build(&self) -> Result<CollectionDocumentRepr, BuilderError> {
        let data = match (self.done, self.data.is_empty()) {
            (true, _) => Some(PrimaryData::Resources(
                self.data.iter().map(ResourceReprBuilder::build).collect::<Result<_, _>>()?,
            )),
            (false, true) => None,
            (false, false) => return Err(BuilderError::NotDone),
        };
        Ok(CollectionDocumentRepr::from_parts(self.common.parts()?, data)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToOneRelDocumentBuilder {
    common: DocumentBuilderCommon,
    data: Option<Option<ResourceIdReprBuilder>>,
}

impl ToOneRelDocumentBuilder {
    pub fn new() -> Self { Default::default() }

    pub fn set(&mut self) -> &mut ResourceIdReprBuilder {
        self.data.get_or_insert(None).get_or_insert_with(Default::default)
    }

    pub fn nullify(&mut self) { self.data = Some(None); }
}

impl DocumentBuilder for ToOneRelDocumentBuilder {
    type Document = ToOneRelDocumentRepr;

    fn common_mut(&mut self) -> &mut DocumentBuilderCommon { &mut self.common }

    fn build(&self) -> Result<ToOneRelDocumentRepr, BuilderError> {
        let data = self
            .data
            .as_ref()
            .map(|data| PrimaryData::Identifier(data.as_ref().and_then(ResourceIdReprBuilder::build)));
        Ok(ToOneRelDocumentRepr::from_parts(self.common.parts()?, data)?)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToManyRelDocumentBuilder {
    common: DocumentBuilderCommon,
    data: Vec<ResourceIdReprBuilder>,
    done: bool,
}

impl ToManyRelDocumentBuilder {
    pub fn new() -> Self { Default::default() }

    pub fn next(&mut self) -> &mut ResourceIdReprBuilder {
        self.data.push(Default::default());
        let last = self.data.len() - 1;
        &mut self.data[last]
    }

    pub fn done(&mut self) { self.done = true; }
}

impl DocumentBuilder for ToManyRelDocumentBuilder {
    type Document = ToManyRelDocumentRepr;

    fn common_mut(&mut self) -> &mut DocumentBuilderCommon { &mut self.common }

    fn build(&self) -> Result<ToManyRelDocumentRepr, BuilderError> {
        let data = match (self.done, self.data.is_empty()) {
            (true, _) => Some(PrimaryData::Identifiers(build_identifiers(&self.data)?)),
            (false, true) => None,
            (false, false) => return Err(BuilderError::NotDone),
        };
        Ok(ToManyRelDocumentRepr::from_parts(self.common.parts()?, data)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::*;
    use crate::model::link::Link;
    use serde_json::json;

    #[test]
    fn resource_id_builder_test() {
        let mut builder = ResourceIdReprBuilder::default();
        assert!(builder.build().is_none());
        builder.set_type("dogs");
        assert!(builder.build().is_none());
        builder.set_id("1");
        assert_eq!(builder.build(), Some(ResourceIdRepr::new("dogs", "1")));
    }

    #[test]
    fn resource_builder_test() {
        let mut builder = ResourceReprBuilder::default();
        assert_eq!(builder.build().unwrap_err(), BuilderError::MissingType);

        builder.set_type("dogs").set_id("1").add_attribute("name", "Rex").add_attribute("age", 3i64);
        builder.next_to_one_relationship("owner").unwrap().set().set_type("people").set_id("9");
        let friends = builder.next_to_many_relationship("friends").unwrap();
        friends.next().set_type("dogs").set_id("2");
        assert_eq!(
            builder.next_to_many_relationship("owner").unwrap_err().to_string(),
            r#"relationship "owner" is not a to-many relationship"#
        );
        assert!(builder.next_to_one_relationship("friends").is_err());

        let repr = builder.build().unwrap();
        assert_eq!(repr.attributes.keys().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(
            repr.relationship("owner").and_then(|r| r.data.clone()),
            Some(LinkageData::ToOne(Some(ResourceIdRepr::new("people", "9"))))
        );
        // not done yet
        assert_eq!(repr.relationship("friends").and_then(|r| r.data.clone()), None);

        builder.next_to_many_relationship("friends").unwrap().done();
        let repr = builder.build().unwrap();
        assert_eq!(
            repr.relationship("friends").and_then(|r| r.data.clone()),
            Some(LinkageData::ToMany(vec![ResourceIdRepr::new("dogs", "2")]))
        );
    }

    #[test]
    fn incomplete_identifier_test() {
        let mut builder = ToManyRelReprBuilder::default();
        builder.next().set_type("dogs").set_id("1");
        builder.next().set_type("dogs");
        builder.done();
        assert_eq!(builder.build().unwrap_err(), BuilderError::IncompleteIdentifier(1));

        let mut builder = ToOneRelReprBuilder::default();
        assert_eq!(builder.build().data, None);
        builder.set().set_type("dogs");
        assert_eq!(builder.build().data, Some(LinkageData::ToOne(None)));
    }

    #[test]
    fn singleton_document_builder_test() {
        let mut builder = SingletonDocumentBuilder::new();
        assert!(matches!(builder.build(), Err(BuilderError::Document(DocumentError::MissingTopLevelMember))));

        builder.set_version(JsonApiVersion::V1_0);
        builder.add_meta("count", json!(1));
        builder.data().set_type("dogs").set_id("1");
        builder.next_included().set_type("people").set_id("9");
        let doc = builder.build().unwrap();
        assert_eq!(doc.version(), Some(JsonApiVersion::V1_0));
        assert_eq!(doc.data.flatten().and_then(|d| d.id), Some("1".to_string()));
        assert_eq!(doc.included.len(), 1);
        assert_eq!(doc.meta.and_then(|m| m.get("count").cloned()), Some(json!(1)));

        let mut builder = SingletonDocumentBuilder::new();
        builder.nullify();
        assert_eq!(builder.build().unwrap().data, Some(None));

        let mut builder = SingletonDocumentBuilder::new();
        builder.set_meta(Meta::new());
        let doc = builder.build().unwrap();
        assert_eq!((doc.data, doc.meta), (None, Some(Meta::new())));
    }

    #[test]
    fn collection_document_builder_test() {
        let mut builder = CollectionDocumentBuilder::new();
        builder.next().set_type("dogs").set_id("1");
        assert_eq!(builder.build().unwrap_err(), BuilderError::NotDone);
        builder.next().set_type("dogs").set_id("2");
        builder.done();
        let doc = builder.build().unwrap();
        assert_eq!(doc.data.map(|d| d.len()), Some(2));

        let mut builder = CollectionDocumentBuilder::new();
        builder.add_error(ErrorRepr { status: Some("404".into()), ..Default::default() });
        let doc = builder.build().unwrap();
        assert_eq!(doc.errors.map(|e| e.len()), Some(1));
        assert!(doc.data.is_none());

        builder.done();
        assert_eq!(builder.build().unwrap_err(), BuilderError::Document(DocumentError::DataWithErrors));
    }

    #[test]
    fn relationship_document_builder_test() {
        let mut builder = ToOneRelDocumentBuilder::new();
        builder.set_links(LinksRepr::with_self("/dogs/1/relationships/owner".parse::<Link>().unwrap()));
        assert_eq!(builder.build().unwrap().data, None);
        builder.set().set_type("people").set_id("9");
        assert_eq!(builder.build().unwrap().data, Some(Some(ResourceIdRepr::new("people", "9"))));

        let mut builder = ToManyRelDocumentBuilder::new();
        builder.next().set_type("dogs").set_id("2");
        builder.done();
        assert_eq!(builder.build().unwrap().data, Some(vec![ResourceIdRepr::new("dogs", "2")]));
        assert!(ToManyRelDocumentBuilder::new().build().is_err());

        let mut builder = ToManyRelDocumentBuilder::new();
        builder.set_links(LinksRepr::with_self("/dogs/1/relationships/friends".parse::<Link>().unwrap()));
        assert_eq!(builder.build().unwrap().data, None);
    }
}
