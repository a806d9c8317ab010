use crate::entity::Described;
use crate::error::{JsonApiSerdeError, MapperError};
use crate::model::attribute::AttributeValue;
use crate::model::resource::{LinkageRepr, ResourceRepr};
use crate::utils::{AttributeType, JsonPointer};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    ToOne,
    ToMany,
}

/// What a resource is being validated for
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Operation {
    Create,
    Update,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceAttributeDescriptor {
    pub name: String,
    pub ty: AttributeType,
    pub allow_null: bool,
    pub required_on_creation: bool,
    pub read_only: bool,
}

impl ResourceAttributeDescriptor {
    pub fn new(ty: AttributeType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            allow_null: false,
            required_on_creation: false,
            read_only: false,
        }
    }

    pub fn allow_null(mut self, allow_null: bool) -> Self {
        self.allow_null = allow_null;
        self
    }

    pub fn required_on_creation(mut self, required_on_creation: bool) -> Self {
        self.required_on_creation = required_on_creation;
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// The type incoming values are converted to
    pub fn effective_type(&self) -> AttributeType {
        if self.allow_null {
            self.ty.clone().nullable()
        } else {
            self.ty.clone()
        }
    }

    pub fn extract_value<'a>(&self, repr: &'a ResourceRepr) -> Result<&'a AttributeValue, MapperError> {
        repr.attribute(&self.name).ok_or_else(|| MapperError::AttributeNotFound {
            resource: repr.ty.clone(),
            name: self.name.clone(),
            pointer: repr.source.clone(),
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResourceRelationshipDescriptor {
    pub name: String,
    /// Type name of the related resources
    pub destination: String,
    pub ty: RelationshipType,
}

impl ResourceRelationshipDescriptor {
    pub fn to_one(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self { name: name.into(), destination: destination.into(), ty: RelationshipType::ToOne }
    }

    pub fn to_many(name: impl Into<String>, destination: impl Into<String>) -> Self {
        Self { name: name.into(), destination: destination.into(), ty: RelationshipType::ToMany }
    }

    pub fn extract_related<'a>(&self, repr: &'a ResourceRepr) -> Result<&'a LinkageRepr, MapperError> {
        repr.relationship(&self.name).ok_or_else(|| MapperError::RelationshipNotFound {
            resource: repr.ty.clone(),
            name: self.name.clone(),
            pointer: repr.source.clone(),
        })
    }
}

/// Schema of a resource type
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ResourceDescriptor {
    pub name: String,
    pub attributes: Vec<ResourceAttributeDescriptor>,
    pub relationships: Vec<ResourceRelationshipDescriptor>,
}

impl ResourceDescriptor {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into(), ..Default::default() } }

    pub fn with_attribute(mut self, attribute: ResourceAttributeDescriptor) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn with_relationship(mut self, relationship: ResourceRelationshipDescriptor) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&ResourceAttributeDescriptor> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn relationship(&self, name: &str) -> Option<&ResourceRelationshipDescriptor> {
        self.relationships.iter().find(|r| r.name == name)
    }

    /// Checks a deserialized resource before it is used to create or update a resource
    pub fn validate(&self, repr: &ResourceRepr, operation: Operation) -> Result<(), MapperError> {
        if repr.ty != self.name {
            return Err(MapperError::InvalidStructure(format!(
                "resource of type \"{}\" given where \"{}\" is expected",
                repr.ty, self.name
            )));
        }
        for attr in &self.attributes {
            match (operation, repr.attribute(&attr.name)) {
                (Operation::Update, Some(_)) if attr.read_only => {
                    return Err(MapperError::ImmutableAttribute {
                        resource: self.name.clone(),
                        name: attr.name.clone(),
                        pointer: attribute_pointer(repr.source.as_ref(), &attr.name),
                    });
                },
                (Operation::Create, None) if attr.required_on_creation && !attr.read_only => {
                    return Err(MapperError::AttributeNotFound {
                        resource: self.name.clone(),
                        name: attr.name.clone(),
                        pointer: repr.source.clone(),
                    });
                },
                (_, Some(AttributeValue::Null)) if !attr.allow_null && attr.ty != AttributeType::Any => {
                    return Err(MapperError::InvalidAttributeValue {
                        resource: self.name.clone(),
                        name: attr.name.clone(),
                        actual: "null".into(),
                        detail: Some("null is not allowed".into()),
                        pointer: attribute_pointer(repr.source.as_ref(), &attr.name),
                    });
                },
                _ => {},
            }
        }
        let relationships = repr.source.as_ref().map(|p| p.join("relationships"));
        for (name, linkage) in &repr.relationships {
            let rel = self.relationship(name).ok_or_else(|| MapperError::RelationshipNotFound {
                resource: self.name.clone(),
                name: name.clone(),
                pointer: relationships.as_ref().map(|p| p.join(name)),
            })?;
            if let Some(data) = &linkage.data {
                if data.is_to_many() != (rel.ty == RelationshipType::ToMany) {
                    return Err(MapperError::InvalidStructure(format!(
                        "relationship \"{}\" of \"{}\" is {}",
                        name,
                        self.name,
                        match rel.ty {
                            RelationshipType::ToOne => "to-one",
                            RelationshipType::ToMany => "to-many",
                        }
                    )));
                }
                if let Some(id) = data.data().into_iter().find(|id| id.ty != rel.destination) {
                    return Err(MapperError::UnknownResourceType {
                        name: id.ty.clone(),
                        pointer: id.source.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Resolves a type name to its descriptor
pub trait DescriptorQuerier {
    fn query(&self, name: &str) -> Option<&ResourceDescriptor>;
}

impl DescriptorQuerier for HashMap<String, ResourceDescriptor> {
    fn query(&self, name: &str) -> Option<&ResourceDescriptor> { self.get(name) }
}

/// Descriptors keyed by type name
#[derive(Debug, Clone, Default)]
pub struct DescriptorRegistry {
    descriptors: HashMap<String, ResourceDescriptor>,
}

impl DescriptorRegistry {
    pub fn new() -> Self { Default::default() }

    pub fn register(&mut self, descriptor: ResourceDescriptor) -> crate::Result<()> {
        if self.descriptors.contains_key(&descriptor.name) {
            return Err(JsonApiSerdeError::InvalidDeclaration(format!(
                "resource type \"{}\" is already registered",
                descriptor.name
            )));
        }
        log::debug!("registering resource type \"{}\"", descriptor.name);
        self.descriptors.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    pub fn register_described<E: Described>(&mut self) -> crate::Result<()> {
        self.register(E::descriptor())
    }

    pub fn get(&self, name: &str) -> Option<&ResourceDescriptor> { self.descriptors.get(name) }

    /// Checks that every relationship points to a registered type
    pub fn check_destinations(&self) -> Result<(), JsonApiSerdeError> {
        for descr in self.descriptors.values() {
            for rel in &descr.relationships {
                if !self.descriptors.contains_key(&rel.destination) {
                    return Err(JsonApiSerdeError::InvalidDeclaration(format!(
                        "relationship \"{}\" of \"{}\" refers to unknown resource type \"{}\"",
                        rel.name, descr.name, rel.destination
                    )));
                }
            }
        }
        Ok(())
    }
}

impl DescriptorQuerier for DescriptorRegistry {
    fn query(&self, name: &str) -> Option<&ResourceDescriptor> { self.get(name) }
}

/// Pointer of attribute `name` of the resource at `resource`
pub(crate) fn attribute_pointer(resource: Option<&JsonPointer>, name: &str) -> Option<JsonPointer> {
    resource.map(|p| p.join("attributes").join(name))
}

#[cfg(test)]
mod tests {
    use crate::descriptor::*;
    use crate::model::resource::{LinkageRepr, ResourceIdRepr};

    fn dogs() -> ResourceDescriptor {
        ResourceDescriptor::new("dogs")
            .with_attribute(
                ResourceAttributeDescriptor::new(AttributeType::String, "name").required_on_creation(true),
            )
            .with_attribute(ResourceAttributeDescriptor::new(AttributeType::Int, "age").allow_null(true))
            .with_attribute(ResourceAttributeDescriptor::new(AttributeType::DateTime, "created").read_only(true))
            .with_relationship(ResourceRelationshipDescriptor::to_one("owner", "people"))
    }

    fn dog() -> ResourceRepr {
        let mut repr = ResourceRepr::new("dogs", Some("1".into()));
        repr.source = Some(JsonPointer::from("/data"));
        repr.attributes.insert("name".into(), "Rex".into());
        repr
    }

    #[test]
    fn lookup_test() {
        let descr = dogs();
        assert_eq!(descr.attribute("age").map(|a| a.effective_type()), Some(AttributeType::Int.nullable()));
        assert_eq!(descr.attribute("name").map(|a| a.effective_type()), Some(AttributeType::String));
        assert!(descr.attribute("color").is_none());
        assert_eq!(descr.relationship("owner").map(|r| r.ty), Some(RelationshipType::ToOne));

        let repr = dog();
        assert_eq!(descr.attribute("name").unwrap().extract_value(&repr), Ok(&"Rex".into()));
        let err = descr.attribute("age").unwrap().extract_value(&repr).unwrap_err();
        assert_eq!(err.to_string(), r#"attribute (age) not supplied as specified in "dogs""#);
        let err = descr.relationship("owner").unwrap().extract_related(&repr).unwrap_err();
        assert_eq!(err.to_string(), r#"relationship (owner) not supplied as specified in "dogs""#);
    }

    #[test]
    fn validate_test() {
        let descr = dogs();
        assert!(descr.validate(&dog(), Operation::Create).is_ok());

        let mut repr = dog();
        repr.attributes.clear();
        assert!(matches!(
            descr.validate(&repr, Operation::Create),
            Err(MapperError::AttributeNotFound { .. })
        ));
        assert!(descr.validate(&repr, Operation::Update).is_ok());

        let repr = dog().replace_attributes(vec![("created", "2020-01-01".into())]);
        let err = descr.validate(&repr, Operation::Update).unwrap_err();
        assert_eq!(err.pointer().map(ToString::to_string).as_deref(), Some("/data/attributes/created"));

        let mut repr = dog();
        repr.relationships.insert("owner".into(), LinkageRepr::to_many(vec![]));
        assert!(matches!(
            descr.validate(&repr, Operation::Update),
            Err(MapperError::InvalidStructure(_))
        ));

        let mut repr = dog();
        repr.relationships.insert("owner".into(), LinkageRepr::to_one(Some(ResourceIdRepr::new("cats", "1"))));
        assert!(matches!(
            descr.validate(&repr, Operation::Update),
            Err(MapperError::UnknownResourceType { .. })
        ));
    }

    #[test]
    fn registry_test() {
        let mut registry = DescriptorRegistry::new();
        registry.register(dogs()).unwrap();
        assert!(registry.register(dogs()).is_err());
        assert!(registry.query("dogs").is_some());
        assert!(registry.query("cats").is_none());
        assert!(registry.check_destinations().is_err());
        registry.register(ResourceDescriptor::new("people")).unwrap();
        assert!(registry.check_destinations().is_ok());
    }
}
