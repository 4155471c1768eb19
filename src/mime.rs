use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const IMAGE_X_ALPHA8: &str = "image/x-alpha8";
pub const IMAGE_X_RGBA8: &str = "image/x-rgba8";
pub const IMAGE_PNG: &str = "image/png";
pub const IMAGE_JPEG: &str = "image/jpeg";
pub const IMAGE_JPG: &str = "image/jpg";
pub const IMAGE_WEBP: &str = "image/webp";
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// A media type with ordered `key=value` parameters,
/// e.g. `image/x-alpha8;width=512;height=512`.
///
/// Raw pixel formats carry their dimensions in the parameters since no
/// container does it for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeDescriptor {
    mime_type: String,
    params: Vec<(String, String)>,
}

impl MimeDescriptor {
    /// Create a descriptor without parameters. The type must be `major/minor`.
    pub fn new(mime_type: &str) -> Result<Self> {
        let mime_type = mime_type.trim();
        validate_type(mime_type)?;
        Ok(Self {
            mime_type: mime_type.to_string(),
            params: Vec::new(),
        })
    }

    /// `image/x-alpha8;width=<w>;height=<h>`
    pub fn alpha8(width: usize, height: usize) -> Self {
        Self::raw(IMAGE_X_ALPHA8, width, height)
    }

    /// `image/x-rgba8;width=<w>;height=<h>`
    pub fn rgba8(width: usize, height: usize) -> Self {
        Self::raw(IMAGE_X_RGBA8, width, height)
    }

    fn raw(mime_type: &str, width: usize, height: usize) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            params: vec![
                ("width".to_string(), width.to_string()),
                ("height".to_string(), height.to_string()),
            ],
        }
    }

    /// Parse a MIME string.
    ///
    /// Parameter segments without `=`, with an empty key, or repeating a key
    /// are rejected rather than guessed at.
    pub fn parse(s: &str) -> Result<Self> {
        let mut segments = s.split(';');
        let mime_type = segments.next().unwrap_or_default().trim();
        validate_type(mime_type)?;

        let mut descriptor = Self {
            mime_type: mime_type.to_string(),
            params: Vec::new(),
        };

        for segment in segments {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            let (key, value) = segment.split_once('=').ok_or_else(|| {
                Error::config(format!(
                    "MIME parameter '{segment}' in '{s}' is missing '='"
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(Error::config(format!(
                    "MIME parameter '{segment}' in '{s}' has an empty key"
                )));
            }
            if descriptor.param(key).is_some() {
                return Err(Error::config(format!(
                    "MIME parameter '{key}' repeated in '{s}'"
                )));
            }
            descriptor
                .params
                .push((key.to_string(), value.trim().to_string()));
        }

        Ok(descriptor)
    }

    /// Add or replace a parameter, keeping the position of an existing key.
    ///
    /// Key and value are trimmed like parsed ones. A key that is empty or
    /// contains `;` or `=`, or a value containing `;`, is rejected since it
    /// could not be parsed back.
    pub fn with_param(mut self, key: &str, value: impl ToString) -> Result<Self> {
        let key = key.trim();
        let value = value.to_string();
        let value = value.trim();
        if key.is_empty() || key.contains([';', '=']) {
            return Err(Error::config(format!("'{key}' is not a valid MIME parameter key")));
        }
        if value.contains(';') {
            return Err(Error::config(format!(
                "MIME parameter '{key}' has a value containing ';'"
            )));
        }
        match self.params.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => self.params.push((key.to_string(), value.to_string())),
        }
        Ok(self)
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// `(width, height)` from the `width`/`height` parameters.
    pub fn dimensions(&self) -> Result<(usize, usize)> {
        Ok((self.dimension("width")?, self.dimension("height")?))
    }

    fn dimension(&self, key: &str) -> Result<usize> {
        let value = self.param(key).ok_or_else(|| {
            Error::malformed(format!("{} is missing the '{key}' parameter", self))
        })?;
        value.parse::<usize>().map_err(|_| {
            Error::malformed(format!("{} has a non-numeric '{key}' parameter", self))
        })
    }

    /// Type-only equality.
    pub fn is_equal(&self, other: &Self) -> bool {
        self.mime_type == other.mime_type
    }

    /// Type and parameter equality.
    pub fn is_identical(&self, other: &Self) -> bool {
        self == other
    }

    pub fn serialize(&self) -> String {
        self.to_string()
    }
}

fn validate_type(mime_type: &str) -> Result<()> {
    if mime_type.contains(';') {
        return Err(Error::config(format!(
            "'{mime_type}' carries parameters; use MimeDescriptor::parse"
        )));
    }
    match mime_type.split_once('/') {
        Some((major, minor))
            if !major.is_empty() && !minor.is_empty() && !minor.contains('/') =>
        {
            Ok(())
        }
        _ => Err(Error::config(format!(
            "'{mime_type}' is not a valid major/minor media type"
        ))),
    }
}

impl fmt::Display for MimeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.mime_type)?;
        for (key, value) in &self.params {
            write!(f, ";{key}={value}")?;
        }
        Ok(())
    }
}

impl FromStr for MimeDescriptor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for MimeDescriptor {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MimeDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
