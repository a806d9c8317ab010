use serde_json::Value;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A JSON pointer (RFC 6901) locating a node inside a JSON document.
///
/// The root pointer renders as `/`.
#[derive(Debug, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct JsonPointer(Vec<String>);

impl JsonPointer {
    pub fn root() -> Self { Default::default() }

    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        Self(segments.into_iter().map(|s| s.to_string()).collect())
    }

    /// Returns a new pointer with `component` appended
    pub fn join(&self, component: impl ToString) -> Self {
        let mut segments = self.0.clone();
        segments.push(component.to_string());
        Self(segments)
    }

    /// Returns a new pointer to the `index`-th element of the array this pointer locates
    pub fn index(&self, index: usize) -> Self { self.join(index) }

    pub fn segments(&self) -> &[String] { &self.0 }

    pub fn is_root(&self) -> bool { self.0.is_empty() }

    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            Some(Self(self.0[.. self.0.len() - 1].to_vec()))
        }
    }

    /// Looks up the node this pointer locates in `value`
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.0.iter().try_fold(value, |node, segment| match node {
            Value::Object(map) => map.get(segment),
            Value::Array(vec) => segment.parse::<usize>().ok().and_then(|i| vec.get(i)),
            _ => None,
        })
    }
}

fn escape(segment: &str) -> String { segment.replace('~', "~0").replace('/', "~1") }

fn unescape(segment: &str) -> String { segment.replace("~1", "/").replace("~0", "~") }

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for segment in &self.0 {
            write!(f, "/{}", escape(segment))?;
        }
        Ok(())
    }
}

impl FromStr for JsonPointer {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('/').unwrap_or(s);
        if s.is_empty() {
            Ok(Self::root())
        } else {
            Ok(Self(s.split('/').map(unescape).collect()))
        }
    }
}

impl From<&str> for JsonPointer {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(pointer) => pointer,
            Err(never) => match never {},
        }
    }
}
