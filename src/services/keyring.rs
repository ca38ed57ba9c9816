use thiserror::Error;

#[derive(Debug, Error)]
#[error("Malformed password entry '{entry}' in PDF_PASSWORDS (expected name:value)")]
pub struct KeyringParseError {
    pub entry: String,
}

/// One named candidate password. Names are only used in replies and logs;
/// the value is what gets handed to the document-open operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordEntry {
    pub name: String,
    pub value: String,
}

/// Ordered set of named candidate passwords. Trial order is declaration
/// order, so the first matching entry in the configuration wins.
#[derive(Debug, Clone, Default)]
pub struct Keyring {
    entries: Vec<PasswordEntry>,
}

impl Keyring {
    /// Parse a comma-separated `name:value` list. Only the first colon
    /// separates name from value; values may themselves contain colons.
    pub fn parse(raw: &str) -> Result<Self, KeyringParseError> {
        let mut entries = Vec::new();
        for entry in raw.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }
            let (name, value) = entry.split_once(':').ok_or_else(|| KeyringParseError {
                entry: entry.to_string(),
            })?;
            entries.push(PasswordEntry {
                name: name.to_string(),
                value: value.to_string(),
            });
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PasswordEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preserves_order() {
        let keyring = Keyring::parse("finance:s3cret,hr:letmein,legal:hunter2").unwrap();
        let names: Vec<&str> = keyring.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["finance", "hr", "legal"]);
    }

    #[test]
    fn test_parse_splits_on_first_colon_only() {
        let keyring = Keyring::parse("vault:pa:ss:word").unwrap();
        let entry = keyring.iter().next().unwrap();
        assert_eq!(entry.name, "vault");
        assert_eq!(entry.value, "pa:ss:word");
    }

    #[test]
    fn test_parse_empty_value() {
        let keyring = Keyring::parse("blank:").unwrap();
        assert_eq!(keyring.iter().next().unwrap().value, "");
    }

    #[test]
    fn test_parse_rejects_entry_without_colon() {
        let err = Keyring::parse("finance:ok,broken").unwrap_err();
        assert_eq!(err.entry, "broken");
    }

    #[test]
    fn test_parse_skips_empty_segments() {
        let keyring = Keyring::parse("finance:ok,,hr:fine,").unwrap();
        assert_eq!(keyring.len(), 2);
    }

    #[test]
    fn test_empty_keyring() {
        let keyring = Keyring::parse("").unwrap();
        assert!(keyring.is_empty());
    }
}
