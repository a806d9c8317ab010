pub mod attribute;
pub mod document;
pub mod error;
pub mod link;
pub mod resource;
pub mod version;

/// Free-form `meta` member, keeping insertion order
pub type Meta = serde_json::Map<String, serde_json::Value>;
