use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Separator between provider id and display name in the text form of a
/// location, e.g. `5128581>New York`.
const ID_SEPARATOR: char = '>';

/// A place to fetch weather for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// Provider identifier; `None` until the name has been geocoded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
}

impl Location {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: Some(id.into()), name: name.into(), region: None, country: None }
    }

    pub fn unresolved(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into(), region: None, country: None }
    }

    pub fn is_resolved(&self) -> bool {
        self.id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Name with region and country qualifiers, e.g. "Springfield, IL, US".
    pub fn qualified_name(&self) -> String {
        [Some(self.name.as_str()), self.region.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{id}{ID_SEPARATOR}{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Location text must not be empty")]
pub struct EmptyLocation;

impl FromStr for Location {
    type Err = EmptyLocation;

    /// Accepts `id>name`, a bare `id>` (the id doubles as the name) or a bare
    /// name, which yields an unresolved location.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(EmptyLocation);
        }

        match value.split_once(ID_SEPARATOR) {
            Some((id, name)) => {
                let (id, name) = (id.trim(), name.trim());
                match (id.is_empty(), name.is_empty()) {
                    (true, true) => Err(EmptyLocation),
                    (true, false) => Ok(Location::unresolved(name)),
                    (false, true) => Ok(Location::new(id, id)),
                    (false, false) => Ok(Location::new(id, name)),
                }
            }
            None => Ok(Location::unresolved(value)),
        }
    }
}
