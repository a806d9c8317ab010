use crate::builder::ResourceReprBuilder;
use crate::descriptor::{attribute_pointer, ResourceDescriptor};
use crate::error::MapperError;
use crate::model::attribute::{AttributeField, AttributeValue, Attributes};
use crate::model::document::{
    CollectionDocumentRepr, DocumentParts, DocumentRepr, PrimaryData, SingletonDocumentRepr,
};
use crate::model::link::{Link, LinksRepr};
use crate::model::resource::{ResourceIdRepr, ResourceRepr};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

pub type IncludeQuery = HashSet<String>;
pub type FieldsQuery = HashMap<String, HashSet<String>>;

/// Entities a relationship field points to
pub enum Related<'a> {
    ToOne(Option<&'a dyn Entity>),
    ToMany(Vec<&'a dyn Entity>),
}

impl<'a> Related<'a> {
    pub fn entities(&self) -> Vec<&'a dyn Entity> {
        match self {
            Related::ToOne(e) => e.iter().copied().collect(),
            Related::ToMany(es) => es.clone(),
        }
    }
}

/// Drives how entities are turned into documents
#[derive(Debug, Clone, Default)]
pub struct EntityContext {
    /// Base of the generated links, e.g. `http://example.com/api`
    pub uri: String,
    /// Dotted relationship paths whose resources go to `included`
    ///
    /// `None` includes every reachable resource, `Some` of an empty set includes nothing
    pub include: Option<IncludeQuery>,
    /// For any resource type found here, only the named attributes and relationships are kept
    pub fields: FieldsQuery,
}

impl EntityContext {
    pub fn new(uri: impl Into<String>) -> Self { Self { uri: uri.into(), ..Default::default() } }

    pub fn with_include<I, S>(mut self, include: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include = Some(include.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_fields<I, S>(mut self, ty: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.insert(ty.into(), fields.into_iter().map(Into::into).collect());
        self
    }

    fn selects(&self, ty: &str, field: &str) -> bool {
        self.fields.get(ty).map_or(true, |fields| fields.contains(field))
    }
}

pub trait Entity {
    fn ty(&self) -> &str;

    fn id(&self) -> String;

    fn attributes(&self) -> Attributes;

    fn relationships(&self) -> Vec<(&'static str, Related<'_>)>;

    fn to_resource_identifier(&self) -> ResourceIdRepr { ResourceIdRepr::new(self.ty(), self.id()) }

    fn links(&self, uri: &str) -> crate::Result<LinksRepr> {
        Ok(LinksRepr::with_self(link_under(uri, &[self.ty(), self.id().as_str()])?))
    }

    fn to_relationship_links(&self, field_name: &str, uri: &str) -> crate::Result<LinksRepr> {
        let (ty, id) = (self.ty(), self.id());
        Ok(LinksRepr {
            self_: Some(link_under(uri, &[ty, id.as_str(), "relationships", field_name])?),
            related: Some(link_under(uri, &[ty, id.as_str(), field_name])?),
            ..Default::default()
        })
    }

    /// Returns the resource object of this entity, restricted to `ctx.fields`
    fn to_resource(&self, ctx: &EntityContext) -> crate::Result<ResourceRepr> {
        let ty = self.ty();
        let mut builder = ResourceReprBuilder::default();
        builder.set_type(ty).set_id(self.id()).set_links(self.links(&ctx.uri)?);
        for (k, v) in self.attributes() {
            if ctx.selects(ty, &k) {
                builder.add_attribute(k, v);
            }
        }
        for (name, related) in self.relationships() {
            if !ctx.selects(ty, name) {
                continue;
            }
            let links = self.to_relationship_links(name, &ctx.uri)?;
            match related {
                Related::ToOne(entity) => {
                    let rel = builder.next_to_one_relationship(name)?;
                    rel.links = Some(links);
                    match entity {
                        Some(entity) => {
                            rel.set().set_type(entity.ty()).set_id(entity.id());
                        },
                        None => rel.nullify(),
                    }
                },
                Related::ToMany(entities) => {
                    let rel = builder.next_to_many_relationship(name)?;
                    rel.links = Some(links);
                    for entity in entities {
                        rel.next().set_type(entity.ty()).set_id(entity.id());
                    }
                    rel.done();
                },
            }
        }
        Ok(builder.build()?)
    }

    fn to_document(&self, ctx: &EntityContext) -> crate::Result<SingletonDocumentRepr>
    where
        Self: Sized,
    {
        to_singleton_document(Some(self), ctx)
    }
}

impl<T: Entity + ?Sized> Entity for Box<T> {
    fn ty(&self) -> &str { self.as_ref().ty() }

    fn id(&self) -> String { self.as_ref().id() }

    fn attributes(&self) -> Attributes { self.as_ref().attributes() }

    fn relationships(&self) -> Vec<(&'static str, Related<'_>)> { self.as_ref().relationships() }
}

impl<T: Entity + ?Sized> Entity for &T {
    fn ty(&self) -> &str { (**self).ty() }

    fn id(&self) -> String { (**self).id() }

    fn attributes(&self) -> Attributes { (**self).attributes() }

    fn relationships(&self) -> Vec<(&'static str, Related<'_>)> { (**self).relationships() }
}

/// An entity with a static schema
pub trait Described: Entity {
    const TYPE: &'static str;

    fn descriptor() -> ResourceDescriptor;
}

/// A field holding at most one related entity
pub trait ToOneField {
    fn related(&self) -> Related<'_>;

    /// Type name of the related entity
    fn destination() -> &'static str;
}

impl<T: Described> ToOneField for Option<T> {
    fn related(&self) -> Related<'_> { Related::ToOne(self.as_ref().map(|e| e as &dyn Entity)) }

    fn destination() -> &'static str { T::TYPE }
}

impl<T: Described> ToOneField for Box<T> {
    fn related(&self) -> Related<'_> { Related::ToOne(Some(self.as_ref() as &dyn Entity)) }

    fn destination() -> &'static str { T::TYPE }
}

impl<T: Described> ToOneField for &T {
    fn related(&self) -> Related<'_> { Related::ToOne(Some(*self as &dyn Entity)) }

    fn destination() -> &'static str { T::TYPE }
}

/// A field holding any number of related entities
pub trait ToManyField {
    fn related(&self) -> Related<'_>;

    fn destination() -> &'static str;
}

impl<T: Described> ToManyField for Vec<T> {
    fn related(&self) -> Related<'_> { Related::ToMany(self.iter().map(|e| e as &dyn Entity).collect()) }

    fn destination() -> &'static str { T::TYPE }
}

impl<T: Described> ToManyField for HashSet<T> {
    fn related(&self) -> Related<'_> { Related::ToMany(self.iter().map(|e| e as &dyn Entity).collect()) }

    fn destination() -> &'static str { T::TYPE }
}

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// `uri` followed by `segments`, each percent-encoded as a single path segment
fn link_under(uri: &str, segments: &[&str]) -> crate::Result<Link> {
    let mut href = uri.trim_end_matches('/').to_owned();
    for segment in segments {
        href.push('/');
        href.extend(utf8_percent_encode(segment, PATH_SEGMENT));
    }
    Ok(href.parse::<Link>()?)
}

type Key = (String, String);

fn key(entity: &dyn Entity) -> Key { (entity.ty().to_owned(), entity.id()) }

/// Walks the relationships of `primary` and returns the resources that go to `included`.
///
/// Each resource shows up once and resources of the primary data never do.
fn collect_included(primary: &[&dyn Entity], ctx: &EntityContext) -> crate::Result<Vec<ResourceRepr>> {
    let mut seen: HashSet<Key> = primary.iter().map(|e| key(*e)).collect();
    let mut included = vec![];
    match &ctx.include {
        None => {
            let mut stack: Vec<&dyn Entity> = primary.to_vec();
            while let Some(entity) = stack.pop() {
                for (_, related) in entity.relationships() {
                    for related in related.entities() {
                        if seen.insert(key(related)) {
                            included.push(related.to_resource(ctx)?);
                            stack.push(related);
                        }
                    }
                }
            }
        },
        Some(paths) => {
            let mut paths: Vec<&String> = paths.iter().collect();
            paths.sort();
            for path in paths {
                let mut current: Vec<&dyn Entity> = primary.to_vec();
                for segment in path.split('.') {
                    let mut next: Vec<&dyn Entity> = vec![];
                    let mut next_keys = HashSet::new();
                    for entity in current.iter().copied() {
                        for (name, related) in entity.relationships() {
                            if name != segment {
                                continue;
                            }
                            for related in related.entities() {
                                let k = key(related);
                                if seen.insert(k.clone()) {
                                    included.push(related.to_resource(ctx)?);
                                }
                                if next_keys.insert(k) {
                                    next.push(related);
                                }
                            }
                        }
                    }
                    if next.is_empty() {
                        log::debug!("include path \"{}\" stops before \"{}\"", path, segment);
                        break;
                    }
                    current = next;
                }
            }
        },
    }
    Ok(included)
}

pub fn to_singleton_document<E: Entity>(
    entity: Option<&E>, ctx: &EntityContext,
) -> crate::Result<SingletonDocumentRepr> {
    let entity = entity.map(|e| e as &dyn Entity);
    let (data, links, included) = match entity {
        Some(entity) => (
            Some(entity.to_resource(ctx)?),
            Some(entity.links(&ctx.uri)?),
            collect_included(&[entity], ctx)?,
        ),
        None => (None, None, vec![]),
    };
    let parts = DocumentParts { included, links, ..Default::default() };
    Ok(SingletonDocumentRepr::from_parts(parts, Some(PrimaryData::Resource(data)))?)
}

pub fn to_collection_document<E: Entity>(
    entities: &[E], ctx: &EntityContext,
) -> crate::Result<CollectionDocumentRepr> {
    let entities: Vec<&dyn Entity> = entities.iter().map(|e| e as &dyn Entity).collect();
    let data = entities.iter().map(|e| e.to_resource(ctx)).collect::<crate::Result<Vec<_>>>()?;
    let parts = DocumentParts { included: collect_included(&entities, ctx)?, ..Default::default() };
    Ok(CollectionDocumentRepr::from_parts(parts, Some(PrimaryData::Resources(data)))?)
}

/// An entity that can be built from a deserialized resource
pub trait FromResource: Sized {
    fn from_resource(repr: &ResourceRepr) -> Result<Self, MapperError>;
}

fn invalid_value(repr: &ResourceRepr, name: &str, value: &AttributeValue, detail: String) -> MapperError {
    MapperError::InvalidAttributeValue {
        resource: repr.ty.clone(),
        name: name.to_owned(),
        actual: value.to_string(),
        detail: Some(detail),
        pointer: attribute_pointer(repr.source.as_ref(), name),
    }
}

/// Reads attribute `name`; a missing attribute is only accepted for nullable types
pub fn extract_attribute<T: AttributeField>(repr: &ResourceRepr, name: &str) -> Result<T, MapperError> {
    match repr.attribute(name) {
        Some(value) => T::from_attribute_value(value).map_err(|detail| invalid_value(repr, name, value, detail)),
        None if T::allow_null() => {
            T::from_attribute_value(&AttributeValue::Null).map_err(|detail| invalid_value(repr, name, &AttributeValue::Null, detail))
        },
        None => Err(MapperError::AttributeNotFound {
            resource: repr.ty.clone(),
            name: name.to_owned(),
            pointer: repr.source.clone(),
        }),
    }
}

/// Reads attribute `name` if present
pub fn extract_optional_attribute<T: AttributeField>(
    repr: &ResourceRepr, name: &str,
) -> Result<Option<T>, MapperError> {
    repr.attribute(name)
        .map(|value| T::from_attribute_value(value).map_err(|detail| invalid_value(repr, name, value, detail)))
        .transpose()
}

pub fn extract_id<T: FromStr>(repr: &ResourceRepr) -> Result<T, MapperError> {
    let id = repr.id.as_ref().ok_or_else(|| MapperError::InvalidIdentifier {
        message: format!("resource of type \"{}\" has no id", repr.ty),
        pointer: repr.source.clone(),
    })?;
    id.parse().map_err(|_| MapperError::InvalidIdentifier {
        message: format!("bad id \"{}\" for \"{}\"", id, repr.ty),
        pointer: repr.source.as_ref().map(|p| p.join("id")),
    })
}

#[cfg(test)]
mod tests {
    use crate::entity::*;
    use crate::model::resource::LinkageData;
    use crate::utils::JsonPointer;

    struct Person {
        id: u32,
        name: String,
    }

    struct Dog {
        id: u32,
        name: String,
        owner: Option<Person>,
        friends: Vec<Dog>,
    }

    impl Entity for Person {
        fn ty(&self) -> &str { "people" }

        fn id(&self) -> String { self.id.to_string() }

        fn attributes(&self) -> Attributes {
            let mut attributes = Attributes::new();
            attributes.insert("name".into(), self.name.to_attribute_value());
            attributes
        }

        fn relationships(&self) -> Vec<(&'static str, Related<'_>)> { vec![] }
    }

    impl Entity for Dog {
        fn ty(&self) -> &str { "dogs" }

        fn id(&self) -> String { self.id.to_string() }

        fn attributes(&self) -> Attributes {
            let mut attributes = Attributes::new();
            attributes.insert("name".into(), self.name.to_attribute_value());
            attributes
        }

        fn relationships(&self) -> Vec<(&'static str, Related<'_>)> {
            vec![
                ("owner", Related::ToOne(self.owner.as_ref().map(|e| e as &dyn Entity))),
                ("friends", Related::ToMany(self.friends.iter().map(|e| e as &dyn Entity).collect())),
            ]
        }
    }

    fn person(id: u32) -> Person { Person { id, name: format!("person {}", id) } }

    fn dog(id: u32, owner: Option<Person>, friends: Vec<Dog>) -> Dog {
        Dog { id, name: format!("dog {}", id), owner, friends }
    }

    fn pack() -> Dog {
        dog(1, Some(person(10)), vec![dog(2, Some(person(10)), vec![]), dog(3, Some(person(11)), vec![])])
    }

    fn included_keys(included: &[ResourceRepr]) -> Vec<String> {
        let mut keys: Vec<String> =
            included.iter().map(|r| format!("{}/{}", r.ty, r.id.as_deref().unwrap_or_default())).collect();
        keys.sort();
        keys
    }

    #[test]
    fn to_resource_test() {
        let _ = env_logger::try_init();
        let ctx = EntityContext::new("http://example.com/api");
        let repr = pack().to_resource(&ctx).unwrap();
        assert_eq!(repr.id.as_deref(), Some("1"));
        assert_eq!(
            repr.links.as_ref().and_then(|l| l.self_.as_ref()).map(ToString::to_string).as_deref(),
            Some("http://example.com/api/dogs/1")
        );
        let owner = repr.relationship("owner").unwrap();
        assert_eq!(owner.data, Some(LinkageData::ToOne(Some(ResourceIdRepr::new("people", "10")))));
        assert_eq!(
            owner.links.as_ref().and_then(|l| l.related.as_ref()).map(ToString::to_string).as_deref(),
            Some("http://example.com/api/dogs/1/owner")
        );
        let friends = repr.relationship("friends").unwrap();
        assert_eq!(friends.data.as_ref().map(|d| d.data().len()), Some(2));

        let ctx = ctx.with_fields("dogs", vec!["owner"]);
        let repr = pack().to_resource(&ctx).unwrap();
        assert!(repr.attributes.is_empty());
        assert_eq!(repr.relationships.keys().collect::<Vec<_>>(), vec!["owner"]);
    }

    #[test]
    fn included_all_test() {
        let doc = pack().to_document(&EntityContext::new("/api")).unwrap();
        assert_eq!(included_keys(&doc.included), vec!["dogs/2", "dogs/3", "people/10", "people/11"]);
        assert_eq!(doc.links.and_then(|l| l.self_).map(|l| l.to_string()).as_deref(), Some("/api/dogs/1"));
    }

    #[test]
    fn included_paths_test() {
        let ctx = EntityContext::new("/api").with_include(Vec::<String>::new());
        assert!(pack().to_document(&ctx).unwrap().included.is_empty());

        let ctx = EntityContext::new("/api").with_include(vec!["owner"]);
        assert_eq!(included_keys(&pack().to_document(&ctx).unwrap().included), vec!["people/10"]);

        let ctx = EntityContext::new("/api").with_include(vec!["friends.owner"]);
        assert_eq!(
            included_keys(&pack().to_document(&ctx).unwrap().included),
            vec!["dogs/2", "dogs/3", "people/10", "people/11"]
        );

        let ctx = EntityContext::new("/api").with_include(vec!["friends.unknown"]);
        assert_eq!(included_keys(&pack().to_document(&ctx).unwrap().included), vec!["dogs/2", "dogs/3"]);
    }

    #[test]
    fn included_deep_paths_test() {
        let puppy = dog(4, Some(person(12)), vec![]);
        let root = dog(1, None, vec![dog(2, Some(person(10)), vec![puppy]), dog(3, None, vec![])]);

        let ctx = EntityContext::new("/api").with_include(vec!["friends.friends.owner"]);
        let doc = root.to_document(&ctx).unwrap();
        assert_eq!(included_keys(&doc.included), vec!["dogs/2", "dogs/3", "dogs/4", "people/12"]);

        // people/10 is only reachable through friends.owner
        let ctx = EntityContext::new("/api").with_include(vec!["friends.friends", "friends.owner"]);
        let doc = root.to_document(&ctx).unwrap();
        assert_eq!(included_keys(&doc.included), vec!["dogs/2", "dogs/3", "dogs/4", "people/10"]);
    }

    struct Label(&'static str);

    impl Entity for Label {
        fn ty(&self) -> &str { "labels" }

        fn id(&self) -> String { self.0.to_owned() }

        fn attributes(&self) -> Attributes { Attributes::new() }

        fn relationships(&self) -> Vec<(&'static str, Related<'_>)> { vec![] }
    }

    #[test]
    fn links_encoding_test() {
        let uri = "http://example.com/api";
        let cases = vec![
            ("John Doe", "John%20Doe"),
            ("café", "caf%C3%A9"),
            ("a/b", "a%2Fb"),
            ("x?y#z", "x%3Fy%23z"),
            ("50%", "50%25"),
        ];
        for (id, encoded) in cases {
            let links = Label(id).links(uri).unwrap();
            assert_eq!(
                links.self_.map(|l| l.to_string()),
                Some(format!("{}/labels/{}", uri, encoded))
            );
            let links = Label(id).to_relationship_links("owner", uri).unwrap();
            assert_eq!(
                links.self_.map(|l| l.to_string()),
                Some(format!("{}/labels/{}/relationships/owner", uri, encoded))
            );
            assert_eq!(
                links.related.map(|l| l.to_string()),
                Some(format!("{}/labels/{}/owner", uri, encoded))
            );
        }

        let doc = to_singleton_document(Some(&Label("John Doe")), &EntityContext::new("/api/")).unwrap();
        assert_eq!(doc.links.and_then(|l| l.self_).map(|l| l.to_string()).as_deref(), Some("/api/labels/John%20Doe"));
        assert_eq!(doc.data.flatten().and_then(|r| r.id).as_deref(), Some("John Doe"));
    }

    #[test]
    fn collection_document_test() {
        let dogs = vec![dog(2, None, vec![]), pack()];
        let doc = to_collection_document(&dogs, &EntityContext::new("/api")).unwrap();
        let data = doc.data.unwrap();
        assert_eq!(data.len(), 2);
        // dog 2 is primary data and must not be repeated
        assert_eq!(included_keys(&doc.included), vec!["dogs/3", "people/10", "people/11"]);
        assert_eq!(data[0].relationship("owner").and_then(|r| r.data.clone()), Some(LinkageData::ToOne(None)));

        let empty: Vec<Dog> = vec![];
        let doc = to_collection_document(&empty, &EntityContext::new("/api")).unwrap();
        assert_eq!(doc.data, Some(vec![]));
        let doc = to_singleton_document::<Dog>(None, &EntityContext::new("/api")).unwrap();
        assert_eq!(doc.data, Some(None));
    }

    #[test]
    fn extract_test() {
        let mut repr = ResourceRepr::new("dogs", Some("7".into()));
        repr.source = Some(JsonPointer::from("/data"));
        repr.attributes.insert("name".into(), AttributeValue::Int(1));

        assert_eq!(extract_id::<u32>(&repr), Ok(7));
        let err = extract_attribute::<String>(&repr, "name").unwrap_err();
        assert_eq!(
            err.to_string(),
            r#"attribute (name) in "dogs" contains an invalid value (string expected, got 1): 1"#
        );
        assert_eq!(err.pointer().map(ToString::to_string).as_deref(), Some("/data/attributes/name"));

        assert_eq!(extract_attribute::<Option<String>>(&repr, "color"), Ok(None));
        assert_eq!(extract_optional_attribute::<String>(&repr, "color"), Ok(None));
        assert!(matches!(
            extract_attribute::<String>(&repr, "color"),
            Err(MapperError::AttributeNotFound { .. })
        ));

        repr.id = Some("x".into());
        let err = extract_id::<u32>(&repr).unwrap_err();
        assert_eq!(err.pointer().map(ToString::to_string).as_deref(), Some("/data/id"));
    }
}
