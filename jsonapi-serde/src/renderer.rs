use crate::error::JsonApiSerdeError;
use crate::model::attribute::AttributeValue;
use crate::model::document::{DocumentRepr, PrimaryDataRef};
use crate::model::error::ErrorRepr;
use crate::model::link::{Link, LinksRepr};
use crate::model::resource::{LinkageData, LinkageRepr, ResourceIdRepr, ResourceRepr};
use crate::model::Meta;
use crate::utils::JsonPointer;
use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::convert::TryFrom;
use thiserror::Error;

lazy_static! {
    static ref OFFSET_REGEX: Regex =
        Regex::new(r#"^(?:Z|(?P<sign>[+-])(?P<hours>\d{2}):?(?P<minutes>\d{2}))$"#).unwrap();
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("{pointer}: naive datetime {value}")]
    NaiveDateTime { pointer: JsonPointer, value: NaiveDateTime },
    #[error("{pointer}: {value} does not exist in the assumed timezone")]
    NonexistentLocalTime { pointer: JsonPointer, value: NaiveDateTime },
    #[error("{pointer}: unsupported value {value}")]
    UnsupportedValue { pointer: JsonPointer, value: String },
}

/// Parses `Z`, `+09:00` or `-0130`
pub fn parse_fixed_offset(s: &str) -> Result<FixedOffset, JsonApiSerdeError> {
    let invalid = || JsonApiSerdeError::InvalidTimezoneOffset(s.to_owned());
    let caps = OFFSET_REGEX.captures(s).ok_or_else(invalid)?;
    let (hours, minutes) = match (caps.name("hours"), caps.name("minutes")) {
        (Some(hours), Some(minutes)) => (
            hours.as_str().parse::<i32>().map_err(|_| invalid())?,
            minutes.as_str().parse::<i32>().map_err(|_| invalid())?,
        ),
        _ => (0, 0),
    };
    if minutes >= 60 {
        return Err(invalid());
    }
    let secs = (hours * 60 + minutes) * 60;
    let secs = match caps.name("sign").map(|m| m.as_str()) {
        Some("-") => -secs,
        _ => secs,
    };
    FixedOffset::east_opt(secs).ok_or_else(invalid)
}

/// Renderer settings as written in a configuration file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RendererSettingsModel {
    pub render_decimal_as_str: bool,
    pub render_embedded_links: bool,
    pub assume_naive_timezone_as: Option<String>,
}

impl Default for RendererSettingsModel {
    fn default() -> Self {
        Self { render_decimal_as_str: true, render_embedded_links: false, assume_naive_timezone_as: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RendererOptions {
    /// Decimals become JSON strings instead of (possibly lossy) numbers
    pub render_decimal_as_str: bool,
    /// Renders the `links` member of resource objects
    pub render_embedded_links: bool,
    /// Offset naive date-times are taken to be in; without it they cannot be rendered
    pub assume_naive_timezone_as: Option<FixedOffset>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self { render_decimal_as_str: true, render_embedded_links: false, assume_naive_timezone_as: None }
    }
}

impl TryFrom<RendererSettingsModel> for RendererOptions {
    type Error = JsonApiSerdeError;

    fn try_from(value: RendererSettingsModel) -> Result<Self, Self::Error> {
        let RendererSettingsModel { render_decimal_as_str, render_embedded_links, assume_naive_timezone_as } =
            value;
        let assume_naive_timezone_as =
            assume_naive_timezone_as.as_deref().map(parse_fixed_offset).transpose()?;
        Ok(Self { render_decimal_as_str, render_embedded_links, assume_naive_timezone_as })
    }
}

/// Renders document reprs as JSON:API JSON
#[derive(Debug, Clone, Default)]
pub struct ReprRenderer {
    options: RendererOptions,
}

impl ReprRenderer {
    pub fn new(options: RendererOptions) -> Self { Self { options } }

    pub fn options(&self) -> &RendererOptions { &self.options }

    pub fn render<D: DocumentRepr>(&self, doc: &D) -> Result<Value, RenderError> {
        log::debug!("rendering {:?} document", D::DATA_KIND);
        let root = JsonPointer::root();
        let mut map = Map::new();
        if let Some(links) = doc.links() {
            map.insert("links".into(), self.render_links(links));
        }
        if let Some(errors) = doc.errors() {
            let pointer = root.join("errors");
            let errors = errors.iter().enumerate().map(|(i, e)| self.render_error(&pointer.index(i), e));
            map.insert("errors".into(), Value::Array(errors.collect()));
        }
        if let Some(meta) = doc.meta() {
            map.insert("meta".into(), Value::Object(meta.clone()));
        }
        if !doc.included().is_empty() {
            let pointer = root.join("included");
            let included = doc
                .included()
                .iter()
                .enumerate()
                .map(|(i, r)| self.render_resource_at(&pointer.index(i), r))
                .collect::<Result<Vec<_>, _>>()?;
            map.insert("included".into(), Value::Array(included));
        }
        if let Some(data) = doc.data().filter(|_| doc.errors().is_none()) {
            let pointer = root.join("data");
            let data = match data {
                PrimaryDataRef::Resource(Some(r)) => self.render_resource_at(&pointer, r)?,
                PrimaryDataRef::Resource(None) | PrimaryDataRef::Identifier(None) => Value::Null,
                PrimaryDataRef::Resources(rs) => Value::Array(
                    rs.iter()
                        .enumerate()
                        .map(|(i, r)| self.render_resource_at(&pointer.index(i), r))
                        .collect::<Result<_, _>>()?,
                ),
                PrimaryDataRef::Identifier(Some(id)) => render_identifier(id),
                PrimaryDataRef::Identifiers(ids) => Value::Array(ids.iter().map(render_identifier).collect()),
            };
            map.insert("data".into(), data);
        }
        if !doc.jsonapi().is_empty() {
            map.insert("jsonapi".into(), Value::Object(doc.jsonapi().clone()));
        }
        Ok(Value::Object(map))
    }

    /// Renders a single resource object, as found in `data` or `included`
    pub fn render_resource(&self, resource: &ResourceRepr) -> Result<Value, RenderError> {
        self.render_resource_at(&resource.source.clone().unwrap_or_default(), resource)
    }

    fn render_resource_at(&self, pointer: &JsonPointer, resource: &ResourceRepr) -> Result<Value, RenderError> {
        log::trace!("rendering resource \"{}\" at {}", resource.ty, pointer);
        let mut map = Map::new();
        map.insert("type".into(), Value::String(resource.ty.clone()));
        if let Some(id) = &resource.id {
            map.insert("id".into(), Value::String(id.clone()));
        }
        if self.options.render_embedded_links {
            if let Some(links) = resource.links.as_ref().filter(|l| !l.is_empty()) {
                map.insert("links".into(), self.render_links(links));
            }
        }
        if !resource.attributes.is_empty() {
            let pointer = pointer.join("attributes");
            let mut attributes = Map::new();
            for (k, v) in &resource.attributes {
                attributes.insert(k.clone(), self.render_value(&pointer.join(k), v)?);
            }
            map.insert("attributes".into(), Value::Object(attributes));
        }
        if !resource.relationships.is_empty() {
            let relationships = resource
                .relationships
                .iter()
                .map(|(k, v)| (k.clone(), self.render_linkage(v)))
                .collect();
            map.insert("relationships".into(), Value::Object(relationships));
        }
        insert_meta(&mut map, &resource.meta);
        Ok(Value::Object(map))
    }

    fn render_linkage(&self, linkage: &LinkageRepr) -> Value {
        let mut map = Map::new();
        if let Some(links) = &linkage.links {
            map.insert("links".into(), self.render_links(links));
        }
        match &linkage.data {
            Some(LinkageData::ToOne(Some(id))) => {
                map.insert("data".into(), render_identifier(id));
            },
            Some(LinkageData::ToOne(None)) => {
                map.insert("data".into(), Value::Null);
            },
            Some(LinkageData::ToMany(ids)) => {
                map.insert("data".into(), Value::Array(ids.iter().map(render_identifier).collect()));
            },
            None => {},
        }
        insert_meta(&mut map, &linkage.meta);
        Value::Object(map)
    }

    fn render_links(&self, links: &LinksRepr) -> Value {
        Value::Object(links.iter().map(|(name, link)| (name.to_string(), render_link(link))).collect())
    }

    fn render_error(&self, pointer: &JsonPointer, error: &ErrorRepr) -> Value {
        log::trace!("rendering error at {}", pointer);
        let mut map = Map::new();
        insert_str(&mut map, "id", &error.id);
        if let Some(links) = &error.links {
            map.insert("links".into(), self.render_links(links));
        }
        insert_str(&mut map, "status", &error.status);
        insert_str(&mut map, "code", &error.code);
        insert_str(&mut map, "title", &error.title);
        insert_str(&mut map, "detail", &error.detail);
        if let Some(source) = &error.source {
            let mut rendered = Map::new();
            insert_str(&mut rendered, "pointer", &source.pointer);
            insert_str(&mut rendered, "parameter", &source.parameter);
            map.insert("source".into(), Value::Object(rendered));
        }
        insert_meta(&mut map, &error.meta);
        Value::Object(map)
    }

    fn render_value(&self, pointer: &JsonPointer, value: &AttributeValue) -> Result<Value, RenderError> {
        let unsupported = || RenderError::UnsupportedValue { pointer: pointer.clone(), value: format!("{:?}", value) };
        Ok(match value {
            AttributeValue::Float(f) => Value::Number(Number::from_f64(*f).ok_or_else(unsupported)?),
            AttributeValue::Decimal(d) if self.options.render_decimal_as_str => Value::String(d.to_string()),
            AttributeValue::Decimal(d) => {
                Value::Number(d.to_f64().and_then(Number::from_f64).ok_or_else(unsupported)?)
            },
            AttributeValue::DateTime(dt) => render_date_time(dt),
            AttributeValue::NaiveDateTime(naive) => match self.options.assume_naive_timezone_as {
                Some(offset) => match offset.from_local_datetime(naive).single() {
                    Some(dt) => render_date_time(&dt),
                    None => {
                        return Err(RenderError::NonexistentLocalTime { pointer: pointer.clone(), value: *naive })
                    },
                },
                None => return Err(RenderError::NaiveDateTime { pointer: pointer.clone(), value: *naive }),
            },
            AttributeValue::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, v)| self.render_value(&pointer.index(i), v))
                    .collect::<Result<_, _>>()?,
            ),
            AttributeValue::Object(map) => {
                let mut rendered = Map::new();
                for (k, v) in map {
                    rendered.insert(k.clone(), self.render_value(&pointer.join(k), v)?);
                }
                Value::Object(rendered)
            },
            value => value.to_json(),
        })
    }
}

fn render_date_time(dt: &DateTime<FixedOffset>) -> Value {
    Value::String(dt.with_timezone(&Utc).to_rfc3339_opts(SecondsFormat::AutoSi, false))
}

fn render_identifier(id: &ResourceIdRepr) -> Value {
    let mut map = Map::new();
    map.insert("type".into(), Value::String(id.ty.clone()));
    map.insert("id".into(), Value::String(id.id.clone()));
    insert_meta(&mut map, &id.meta);
    Value::Object(map)
}

fn render_link(link: &Link) -> Value {
    match link {
        Link::Raw(href) => Value::String(href.clone()),
        Link::Object { href, meta } => {
            let mut map = Map::new();
            map.insert("href".into(), Value::String(href.clone()));
            insert_meta(&mut map, meta);
            Value::Object(map)
        },
    }
}

fn insert_str(map: &mut Map<String, Value>, key: &str, value: &Option<String>) {
    if let Some(value) = value {
        map.insert(key.into(), Value::String(value.clone()));
    }
}

fn insert_meta(map: &mut Map<String, Value>, meta: &Meta) {
    if !meta.is_empty() {
        map.insert("meta".into(), Value::Object(meta.clone()));
    }
}
