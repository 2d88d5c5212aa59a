//! Common types used across CLI modules

use uuid::Uuid;

/// Identifier that can be either a full UUID or an unambiguous prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdOrPrefix {
    /// Full UUID
    Full(Uuid),
    /// Prefix that should uniquely identify a resource
    Prefix(String),
}

impl IdOrPrefix {
    /// Parse a string into an IdOrPrefix
    ///
    /// Attempts to parse as a full UUID first, otherwise treats as a prefix
    pub fn parse(input: &str) -> Self {
        match Uuid::parse_str(input) {
            Ok(uuid) => IdOrPrefix::Full(uuid),
            Err(_) => IdOrPrefix::Prefix(input.to_lowercase()),
        }
    }

    /// Picks the single candidate this identifier refers to
    ///
    /// # Errors
    /// Fails if no candidate or more than one candidate matches
    pub fn resolve(&self, what: &str, candidates: impl IntoIterator<Item = Uuid>) -> anyhow::Result<Uuid> {
        let prefix = match self {
            IdOrPrefix::Full(uuid) => return Ok(*uuid),
            IdOrPrefix::Prefix(prefix) => prefix,
        };

        let matches: Vec<Uuid> = candidates
            .into_iter()
            .filter(|id| id.to_string().starts_with(prefix.as_str()))
            .collect();

        match matches.as_slice() {
            [] => anyhow::bail!("No {} found with ID starting with '{}'", what, prefix),
            [id] => Ok(*id),
            _ => {
                let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
                anyhow::bail!(
                    "Ambiguous prefix '{}' matches multiple {}s: {}",
                    prefix,
                    what,
                    ids.join(", ")
                )
            }
        }
    }
}

impl std::fmt::Display for IdOrPrefix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdOrPrefix::Full(uuid) => write!(f, "{}", uuid),
            IdOrPrefix::Prefix(prefix) => write!(f, "{}", prefix),
        }
    }
}

impl From<&str> for IdOrPrefix {
    fn from(s: &str) -> Self {
        IdOrPrefix::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_id_skips_lookup() {
        let id = Uuid::new_v4();
        let parsed = IdOrPrefix::parse(&id.to_string());
        assert_eq!(parsed, IdOrPrefix::Full(id));
        assert_eq!(parsed.resolve("job", Vec::new()).unwrap(), id);
    }

    #[test]
    fn test_prefix_resolution() {
        let a = Uuid::parse_str("a1b2c3d4-0000-0000-0000-000000000001").unwrap();
        let b = Uuid::parse_str("a1ffffff-0000-0000-0000-000000000002").unwrap();

        assert_eq!(IdOrPrefix::from("A1B2").resolve("job", [a, b]).unwrap(), a);
        assert!(IdOrPrefix::from("a1").resolve("job", [a, b]).is_err());
        assert!(IdOrPrefix::from("ff").resolve("job", [a, b]).is_err());
    }
}
