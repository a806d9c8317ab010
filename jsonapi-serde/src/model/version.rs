use crate::error::JsonApiSerdeError;
use regex::Regex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    static ref VERSION_REGEX: Regex = Regex::new(r#"^\d+\.\d+$"#).unwrap();
}

/// Value of `jsonapi.version`, one of the published JSON:API versions
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum JsonApiVersion {
    V1_0,
    V1_1,
}

impl JsonApiVersion {
    /// Every version the crate reads and writes, oldest first
    pub const ALL: [JsonApiVersion; 2] = [JsonApiVersion::V1_0, JsonApiVersion::V1_1];

    pub fn as_str(self) -> &'static str {
        match self {
            JsonApiVersion::V1_0 => "1.0",
            JsonApiVersion::V1_1 => "1.1",
        }
    }

    pub fn major(self) -> u8 { 1 }

    pub fn minor(self) -> u8 {
        match self {
            JsonApiVersion::V1_0 => 0,
            JsonApiVersion::V1_1 => 1,
        }
    }
}

impl Default for JsonApiVersion {
    fn default() -> Self { JsonApiVersion::V1_0 }
}

impl fmt::Display for JsonApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for JsonApiVersion {
    type Err = JsonApiSerdeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Self::ALL.iter().find(|v| v.as_str() == s) {
            Some(version) => Ok(*version),
            None if VERSION_REGEX.is_match(s) => Err(JsonApiSerdeError::UnsupportedJsonApiVersion(s.into())),
            None => Err(JsonApiSerdeError::InvalidJsonApiVersion(s.into())),
        }
    }
}

impl Serialize for JsonApiVersion {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JsonApiVersion {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::model::version::JsonApiVersion;

    #[test]
    fn serialize_test() {
        assert_eq!(serde_json::to_string(&JsonApiVersion::V1_0).unwrap(), "\"1.0\"");
        let ver: JsonApiVersion = serde_json::from_str("\"1.1\"").unwrap();
        assert_eq!(ver, JsonApiVersion::V1_1);
        assert!(serde_json::from_str::<JsonApiVersion>("\"2.0\"").is_err());
    }

    #[test]
    fn parse_test() {
        assert_eq!("1.0".parse::<JsonApiVersion>().unwrap(), JsonApiVersion::V1_0);
        let v11 = "1.1".parse::<JsonApiVersion>().unwrap();
        assert_eq!((v11.major(), v11.minor()), (1, 1));

        for ver in &["1.", "1.a", ".1", "1.1a", "1.1-alpha1", " 1.0", "1.2", "2.0", "01.0"] {
            assert!(ver.parse::<JsonApiVersion>().is_err(), "{} should be rejected", ver);
        }
        assert_eq!(
            "1.x".parse::<JsonApiVersion>().unwrap_err().to_string(),
            "Invalid JSON:API version: 1.x, the valid format: `<major>.<minor>`"
        );
        assert_eq!(
            "1.2".parse::<JsonApiVersion>().unwrap_err().to_string(),
            "Unsupported JSON:API version: 1.2, supported versions: 1.0 and 1.1"
        );
    }

    #[test]
    fn ord_test() {
        assert!(JsonApiVersion::V1_0 < JsonApiVersion::V1_1);
        assert_eq!(JsonApiVersion::ALL.iter().max(), Some(&JsonApiVersion::V1_1));
        assert_eq!(JsonApiVersion::default(), JsonApiVersion::V1_0);
    }
}
