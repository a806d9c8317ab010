mod common;

use chrono::{TimeZone, Utc};
use common::*;
use jsonapi_serde::descriptor::{DescriptorRegistry, Operation, RelationshipType};
use jsonapi_serde::deserializer::ReprDeserializer;
use jsonapi_serde::entity::{to_collection_document, Described, Entity, EntityContext, FromResource};
use jsonapi_serde::error::MapperError;
use jsonapi_serde::model::document::SingletonDocumentRepr;
use jsonapi_serde::model::resource::LinkageData;
use jsonapi_serde::utils::AttributeType;
use serde_json::json;

const URI: &str = "https://example.com/api";

#[test]
fn descriptor_test() {
    let _ = env_logger::try_init();
    let human = Human::descriptor();
    assert_eq!(human.name, "humans");
    assert_eq!(human.attributes.iter().map(|a| a.name.as_str()).collect::<Vec<_>>(), vec!["name", "gender"]);
    let only_flea = human.relationship("only_flea").unwrap();
    assert_eq!(only_flea.ty, RelationshipType::ToOne);
    assert_eq!(only_flea.destination, "fleas");

    let flea = Flea::descriptor();
    assert!(flea.attribute("id").is_none());
    assert!(flea.attribute("cache").is_none());
    let born = flea.attribute("born").unwrap();
    assert!(born.allow_null);
    assert!(!born.required_on_creation);
    assert_eq!(born.ty, AttributeType::DateTime.nullable());
    let bites = flea.attribute("bites").unwrap();
    assert!(bites.read_only);
    assert!(!bites.required_on_creation);
    assert!(flea.attribute("name").unwrap().required_on_creation);

    let dog = <Dog as Described>::descriptor();
    assert_eq!(dog.relationship("fleas").map(|r| r.ty), Some(RelationshipType::ToMany));
    assert_eq!(dog.relationship("friends").map(|r| r.destination.as_str()), Some("dogs"));
    assert_eq!(dog.relationship("master").map(|r| r.destination.as_str()), Some("humans"));

    let mut registry = DescriptorRegistry::new();
    registry.register_described::<Dog>().unwrap();
    registry.register_described::<Human>().unwrap();
    assert!(registry.check_destinations().is_err());
    registry.register_described::<Flea>().unwrap();
    registry.check_destinations().unwrap();
    assert!(registry.register_described::<Flea>().is_err());
}

#[test]
fn collection_document_test() {
    let _ = env_logger::try_init();
    let master = generate_master();
    let dogs = generate_dogs(3, &master);
    let doc = to_collection_document(&dogs, &EntityContext::new(URI)).unwrap();

    let data = doc.data.as_ref().unwrap();
    assert_eq!(data.len(), 3);
    // 3 fleas per dog, the master and the master's flea
    assert_eq!(doc.included.len(), 11);
    let first = &data[0];
    assert_eq!(
        first.relationship("master").and_then(|r| r.data.clone()),
        Some(LinkageData::ToOne(Some(master.to_resource_identifier())))
    );

    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["data"][0]["type"], json!("dogs"));
    assert_eq!(value["data"][0]["attributes"], json!({ "name": dogs[0].name }));
    assert_eq!(
        value["data"][0]["relationships"]["master"]["links"]["related"],
        json!(format!("{}/dogs/{}/master", URI, dogs[0].id))
    );
    assert_eq!(value["data"][0]["relationships"]["fleas"]["data"].as_array().map(Vec::len), Some(3));

    let ctx = EntityContext::new(URI).with_include(vec!["master.only_flea"]).with_fields("dogs", vec!["master"]);
    let doc = to_collection_document(&dogs, &ctx).unwrap();
    assert_eq!(doc.included.len(), 2);
    assert_eq!(doc.included[0].ty, "humans");
    assert_eq!(doc.included[1].ty, "fleas");
    assert!(doc.data.unwrap().iter().all(|d| d.attributes.is_empty() && d.relationships.len() == 1));
}

#[test]
fn to_document_test() {
    let _ = env_logger::try_init();
    let master = generate_master();
    let doc = master.to_document(&EntityContext::new(URI)).unwrap();
    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["links"]["self"], json!(format!("{}/humans/{}", URI, master.passport_number)));
    assert_eq!(value["data"]["attributes"]["gender"], json!("male"));
    assert_eq!(value["included"][0]["type"], json!("fleas"));
}

#[test]
fn encoded_links_test() {
    let _ = env_logger::try_init();
    let mut master = generate_master();
    master.passport_number = "TK 42/7".into();
    let doc = master.to_document(&EntityContext::new(URI)).unwrap();
    let value = serde_json::to_value(&doc).unwrap();
    assert_eq!(value["links"]["self"], json!(format!("{}/humans/TK%2042%2F7", URI)));
    assert_eq!(value["data"]["id"], json!("TK 42/7"));
    assert_eq!(
        value["data"]["relationships"]["only_flea"]["links"]["self"],
        json!(format!("{}/humans/TK%2042%2F7/relationships/only_flea", URI))
    );
}

#[test]
fn from_resource_test() {
    let _ = env_logger::try_init();
    let mut registry = DescriptorRegistry::new();
    registry.register_described::<Flea>().unwrap();
    let de = ReprDeserializer::with_querier(&registry);

    let id = uuid::Uuid::new_v4();
    let doc: SingletonDocumentRepr = de
        .deserialize(
            &json!({
                "data": {
                    "type": "fleas",
                    "id": id.to_string(),
                    "attributes": { "name": "tiny", "born": "2020-02-01T12:00:00+09:00" },
                }
            }),
            false,
        )
        .unwrap();
    let repr = doc.data.flatten().unwrap();
    Flea::descriptor().validate(&repr, Operation::Update).unwrap();
    let flea = Flea::from_resource(&repr).unwrap();
    assert_eq!(flea, Flea {
        id,
        name: "tiny".into(),
        born: Some(Utc.with_ymd_and_hms(2020, 2, 1, 3, 0, 0).unwrap()),
        bites: 0,
        cache: None,
    });

    let repr = flea.to_resource(&EntityContext::new(URI)).unwrap();
    assert_eq!(Flea::from_resource(&repr).unwrap(), flea);
}

#[test]
fn from_resource_error_test() {
    let _ = env_logger::try_init();
    let doc: SingletonDocumentRepr = serde_json::from_value(json!({
        "data": { "type": "fleas", "id": "not-a-uuid", "attributes": { "name": 1 } }
    }))
    .unwrap();
    let repr = doc.data.flatten().unwrap();

    match Flea::from_resource(&repr) {
        Err(MapperError::InvalidIdentifier { pointer, .. }) => {
            assert_eq!(pointer.map(|p| p.to_string()).as_deref(), Some("/data/id"))
        },
        other => panic!("unexpected {:?}", other),
    }

    let mut repr = repr;
    repr.id = Some(uuid::Uuid::new_v4().to_string());
    let err = Flea::from_resource(&repr).unwrap_err();
    assert_eq!(err.pointer().map(|p| p.to_string()).as_deref(), Some("/data/attributes/name"));
    assert_eq!(err.to_error_repr().status.as_deref(), Some("422"));

    repr.ty = "dogs".into();
    let err = Flea::from_resource(&repr).unwrap_err();
    assert_eq!(err, MapperError::UnknownResourceType {
        name: "dogs".into(),
        pointer: Some("/data/type".into())
    });
}
