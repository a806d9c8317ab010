use crate::model::Meta;
use crate::utils::JsonPointer;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

lazy_static! {
    // relative references are checked by resolving them against this
    static ref CHECK_BASE: Url = Url::parse("http://check.invalid/").unwrap();
}

#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum LinkError {
    #[error("{0:?} contains whitespace or control characters")]
    ForbiddenCharacter(String),
    #[error("{href:?} is not a URI reference: {source}")]
    Malformed { href: String, source: url::ParseError },
}

/// Checks that `href` is an absolute URI or a relative reference
fn check_href(href: &str) -> Result<(), LinkError> {
    if href.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(LinkError::ForbiddenCharacter(href.to_owned()));
    }
    let parsed = match Url::parse(href) {
        Err(url::ParseError::RelativeUrlWithoutBase) => CHECK_BASE.join(href),
        parsed => parsed,
    };
    parsed.map(|_| ()).map_err(|source| LinkError::Malformed { href: href.to_owned(), source })
}

/// A link, either a bare URI reference or a link object carrying `meta`.
///
/// The reference is kept exactly as written, so relative references, query-only references and
/// fragments survive a round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum Link {
    Raw(String),
    Object { href: String, meta: Meta },
}

impl Link {
    pub fn href(&self) -> &str {
        match self {
            Link::Raw(href) | Link::Object { href, .. } => href,
        }
    }

    pub fn meta(&self) -> Option<&Meta> {
        match self {
            Link::Raw(_) => None,
            Link::Object { meta, .. } => Some(meta),
        }
    }

    /// A link object; fails like [`FromStr`] on a malformed `href`
    pub fn with_meta(href: &str, meta: Meta) -> Result<Self, LinkError> {
        check_href(href)?;
        Ok(Link::Object { href: href.to_owned(), meta })
    }
}

impl FromStr for Link {
    type Err = LinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        check_href(s)?;
        Ok(Link::Raw(s.to_owned()))
    }
}

impl From<Url> for Link {
    fn from(url: Url) -> Self { Link::Raw(url.as_str().to_owned()) }
}

impl From<http::Uri> for Link {
    fn from(uri: http::Uri) -> Self { Link::Raw(uri.to_string()) }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.href()) }
}

links_repr!(
    /// The `links` member of documents, resources and relationships
    LinksRepr {
        "self" => self_,
        "related" => related,
        "next" => next,
        "prev" => prev,
        "first" => first,
        "last" => last,
    }
);

impl LinksRepr {
    pub fn with_self(link: impl Into<Link>) -> Self {
        Self { self_: Some(link.into()), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool { self.iter().next().is_none() }

    /// Present links in rendering order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Link)> + '_ {
        Self::NAMES.iter().filter_map(move |&name| self.get(name).map(|link| (name, link)))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::link::*;

    #[test]
    fn links_test() {
        let mut links = LinksRepr::with_self("/dogs/1".parse::<Link>().unwrap());
        assert!(!links.is_empty());
        *links.get_mut("related").unwrap() = Some("http://example.com/owners/2".parse().unwrap());
        assert!(links.get_mut("about").is_none());
        let names: Vec<_> = links.iter().map(|(name, link)| format!("{}={}", name, link)).collect();
        assert_eq!(names, vec!["self=/dogs/1", "related=http://example.com/owners/2"]);
        assert!(LinksRepr::default().is_empty());
    }

    #[test]
    fn reference_kept_as_written_test() {
        for href in &[
            "?page[offset]=10",
            "dogs/1",
            "/a#frag",
            "#frag",
            "http://example.com",
            "http://example.com/café",
            "https://example.com/articles?page%5Bnumber%5D=2&sort=-created",
        ] {
            let link = href.parse::<Link>().unwrap();
            assert_eq!(link.href(), *href);
            assert_eq!(link.to_string(), *href);
        }
    }

    #[test]
    fn malformed_reference_test() {
        assert!(matches!(
            "http://[::1".parse::<Link>(),
            Err(LinkError::Malformed { source: url::ParseError::InvalidIpv6Address, .. })
        ));
        assert!(matches!("http://".parse::<Link>(), Err(LinkError::Malformed { .. })));
        assert_eq!(
            "/people/John Doe".parse::<Link>().unwrap_err(),
            LinkError::ForbiddenCharacter("/people/John Doe".into())
        );
        assert!("/dogs/1\n".parse::<Link>().is_err());
        assert!(Link::with_meta("http://[::1", Meta::new()).is_err());
    }

    #[test]
    fn conversion_test() {
        let url = Url::parse("http://example.com/dogs?page=2").unwrap();
        assert_eq!(Link::from(url).href(), "http://example.com/dogs?page=2");
        let uri = "/dogs/1?include=owner".parse::<http::Uri>().unwrap();
        assert_eq!(Link::from(uri), Link::Raw("/dogs/1?include=owner".into()));
    }
}
