use crate::model::link::LinksRepr;
use crate::model::Meta;
use crate::utils::JsonPointer;

/// Error location
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct SourceRepr {
    pub pointer: Option<String>,
    pub parameter: Option<String>,
}

/// Error object
/// All members are optional
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ErrorRepr {
    pub id: Option<String>,
    pub links: Option<LinksRepr>,
    pub status: Option<String>,
    pub code: Option<String>,
    pub title: Option<String>,
    pub detail: Option<String>,
    pub source: Option<SourceRepr>,
    pub meta: Meta,
    /// Where this error object was read from
    pub location: Option<JsonPointer>,
}
