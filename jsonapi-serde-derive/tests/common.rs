extern crate jsonapi_serde_derive as jss_derive;

use chrono::{DateTime, Utc};
use jsonapi_serde::model::attribute::{AttributeField, AttributeValue};
use jsonapi_serde::utils::AttributeType;
use uuid::Uuid;

#[derive(jss_derive::EntityDecorator, Clone, Debug)]
#[entity(type = "humans")]
pub struct Human {
    #[entity(id)]
    pub passport_number: String,
    pub name: String,
    #[entity(to_one)]
    pub only_flea: Option<Flea>,
    pub gender: Gender,
}

#[derive(jss_derive::EntityDecorator, Clone, Debug)]
#[entity(type = "dogs")]
pub struct Dog<'a> {
    #[entity(id)]
    pub id: String,
    pub name: String,
    #[entity(to_many)]
    pub fleas: Vec<Flea>,
    #[entity(to_many)]
    pub friends: Vec<Dog<'a>>,
    #[entity(to_one)]
    pub master: &'a Human,
}

#[derive(jss_derive::EntityDecorator, Clone, Debug, PartialEq)]
#[entity(type = "fleas")]
pub struct Flea {
    #[entity(id)]
    pub id: Uuid,
    pub name: String,
    pub born: Option<DateTime<Utc>>,
    #[entity(read_only)]
    pub bites: i64,
    #[entity(skip)]
    pub cache: Option<String>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl AttributeField for Gender {
    fn attribute_type() -> AttributeType { AttributeType::String }

    fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Unknown => "unknown",
        }
        .into()
    }

    fn from_attribute_value(value: &AttributeValue) -> Result<Self, String> {
        match value.as_str() {
            Some("male") => Ok(Gender::Male),
            Some("female") => Ok(Gender::Female),
            Some("unknown") => Ok(Gender::Unknown),
            _ => Err(format!("unknown gender {}", value)),
        }
    }
}

pub fn generate_fleas(len: usize) -> Vec<Flea> {
    let mut fleas = Vec::with_capacity(len);
    for i in 0 .. len {
        let uuid = Uuid::new_v4();
        fleas.push(Flea { id: uuid, name: uuid.to_string(), born: None, bites: i as i64, cache: None });
    }
    fleas
}

pub fn generate_dogs(len: usize, master: &Human) -> Vec<Dog> {
    let mut dogs = Vec::with_capacity(len);
    for _i in 0 .. len {
        let fleas = generate_fleas(3);
        let uuid = Uuid::new_v4().to_string();
        dogs.push(Dog { id: uuid.clone(), name: uuid, fleas, friends: vec![], master });
    }
    dogs
}

pub fn generate_master() -> Human {
    let uuid = Uuid::new_v4().to_string();
    Human {
        passport_number: uuid.clone(),
        name: uuid,
        only_flea: generate_fleas(1).pop(),
        gender: Gender::Male,
    }
}
