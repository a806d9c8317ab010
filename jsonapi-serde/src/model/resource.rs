use crate::model::attribute::{AttributeValue, Attributes};
use crate::model::link::LinksRepr;
use crate::model::Meta;
use crate::utils::JsonPointer;
use indexmap::IndexMap;
use std::collections::HashSet;

pub type Relationships = IndexMap<String, LinkageRepr>;

/// Resource identifier object
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ResourceIdRepr {
    pub ty: String,
    pub id: String,
    pub meta: Meta,
    pub source: Option<JsonPointer>,
}

impl ResourceIdRepr {
    pub fn new(ty: impl Into<String>, id: impl Into<String>) -> Self {
        Self { ty: ty.into(), id: id.into(), ..Default::default() }
    }

    /// Whether both identify the same resource, ignoring `meta` and `source`
    pub fn same_as(&self, other: &ResourceIdRepr) -> bool { self.ty == other.ty && self.id == other.id }
}

/// Resource linkage: the `data` member of a relationship
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum LinkageData {
    ToOne(Option<ResourceIdRepr>),
    ToMany(Vec<ResourceIdRepr>),
}

impl LinkageData {
    pub fn data(&self) -> Vec<&ResourceIdRepr> {
        match self {
            LinkageData::ToOne(data) => data.iter().collect(),
            LinkageData::ToMany(data) => data.iter().collect(),
        }
    }

    pub fn is_to_many(&self) -> bool { matches!(self, LinkageData::ToMany(_)) }
}

/// Relationship object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkageRepr {
    /// `None` when the relationship object carries no `data` member
    pub data: Option<LinkageData>,
    pub links: Option<LinksRepr>,
    pub meta: Meta,
    pub source: Option<JsonPointer>,
}

impl LinkageRepr {
    pub fn to_one(data: Option<ResourceIdRepr>) -> Self {
        Self { data: Some(LinkageData::ToOne(data)), ..Default::default() }
    }

    pub fn to_many(data: Vec<ResourceIdRepr>) -> Self {
        Self { data: Some(LinkageData::ToMany(data)), ..Default::default() }
    }
}

/// Resource object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceRepr {
    pub ty: String,
    /// Absent on resources sent for creation
    pub id: Option<String>,
    pub attributes: Attributes,
    pub relationships: Relationships,
    pub links: Option<LinksRepr>,
    pub meta: Meta,
    pub source: Option<JsonPointer>,
}

impl ResourceRepr {
    pub fn new(ty: impl Into<String>, id: Option<String>) -> Self {
        Self { ty: ty.into(), id, ..Default::default() }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> { self.attributes.get(name) }

    pub fn relationship(&self, name: &str) -> Option<&LinkageRepr> { self.relationships.get(name) }

    /// Returns a copy with the given attributes overwritten; new names are appended
    pub fn replace_attributes<I, K>(&self, attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, AttributeValue)>,
        K: Into<String>,
    {
        let mut repr = self.clone();
        for (k, v) in attributes {
            repr.attributes.insert(k.into(), v);
        }
        repr
    }

    pub fn to_identifier(&self) -> Option<ResourceIdRepr> {
        self.id.as_ref().map(|id| ResourceIdRepr::new(self.ty.clone(), id.clone()))
    }

    pub fn identifies(&self, id: &ResourceIdRepr) -> bool {
        self.ty == id.ty && self.id.as_deref() == Some(id.id.as_str())
    }

    /// Keeps only the attributes and relationships named in `fields`
    pub fn retain_fields(mut self, fields: &HashSet<String>) -> Self {
        self.attributes.retain(|k, _| fields.contains(k));
        self.relationships.retain(|k, _| fields.contains(k));
        self
    }
}

#[cfg(test)]
mod tests {
    use crate::model::attribute::AttributeValue;
    use crate::model::resource::{LinkageData, LinkageRepr, ResourceIdRepr, ResourceRepr};
    use std::collections::HashSet;

    fn dog() -> ResourceRepr {
        let mut repr = ResourceRepr::new("dogs", Some("1".into()));
        repr.attributes.insert("name".into(), "Rex".into());
        repr.attributes.insert("age".into(), AttributeValue::Int(3));
        repr.relationships.insert("owner".into(), LinkageRepr::to_one(Some(ResourceIdRepr::new("people", "9"))));
        repr
    }

    #[test]
    fn replace_attributes_test() {
        let repr = dog();
        let replaced = repr.replace_attributes(vec![("age", AttributeValue::Int(4)), ("color", "brown".into())]);
        assert_eq!(repr.attribute("age"), Some(&AttributeValue::Int(3)));
        assert_eq!(replaced.attribute("age"), Some(&AttributeValue::Int(4)));
        assert_eq!(replaced.attributes.keys().collect::<Vec<_>>(), vec!["name", "age", "color"]);
    }

    #[test]
    fn retain_fields_test() {
        let fields: HashSet<String> = vec!["name".to_string()].into_iter().collect();
        let repr = dog().retain_fields(&fields);
        assert_eq!(repr.attributes.len(), 1);
        assert!(repr.relationships.is_empty());
    }

    #[test]
    fn identifier_test() {
        let repr = dog();
        let id = repr.to_identifier().unwrap();
        assert_eq!(id, ResourceIdRepr::new("dogs", "1"));
        assert!(repr.identifies(&id));
        assert!(ResourceRepr::new("dogs", None).to_identifier().is_none());

        let owner = repr.relationship("owner").and_then(|r| r.data.as_ref()).unwrap();
        assert_eq!(owner.data(), vec![&ResourceIdRepr::new("people", "9")]);
        assert!(!owner.is_to_many());
        assert_eq!(LinkageData::ToOne(None).data().len(), 0);
    }
}
