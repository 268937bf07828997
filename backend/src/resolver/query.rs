use serde::{Deserialize, Serialize};
use std::sync::RwLock;

use crate::sources::TokenUtils;

/// How an identifier is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QueryKind {
    ContractAddress,
    Name,
    SymbolOrId,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolutionQuery {
    pub identifier: String,
    pub kind: QueryKind,
}

impl ResolutionQuery {
    pub fn new(identifier: impl Into<String>, kind: QueryKind) -> Self {
        Self {
            identifier: identifier.into().trim().to_string(),
            kind,
        }
    }

    /// Classify a raw identifier. Returns `None` for blank input.
    ///
    /// `0x…` is a contract address, `*.eth` a registry name, a slug
    /// (`[A-Za-z0-9-]+`) a market symbol or id, anything else free text.
    /// Case never changes the kind.
    pub fn infer(raw: &str) -> Option<Self> {
        let identifier = raw.trim();
        if identifier.is_empty() {
            return None;
        }

        let lower = identifier.to_lowercase();
        let query = if lower.starts_with("0x") {
            Self::new(lower, QueryKind::ContractAddress)
        } else if lower.ends_with(".eth") {
            Self::new(lower, QueryKind::Name)
        } else if is_slug(&lower) {
            Self::new(lower, QueryKind::SymbolOrId)
        } else {
            Self::new(identifier, QueryKind::FreeText)
        };
        Some(query)
    }

    /// Contract addresses must be `0x` plus 40 hex characters; other kinds are
    /// always well formed.
    pub fn is_well_formed(&self) -> bool {
        match self.kind {
            QueryKind::ContractAddress => TokenUtils::is_valid_address(&self.identifier),
            _ => !self.identifier.is_empty(),
        }
    }

    pub fn cache_key(&self) -> String {
        format!("{:?}:{}", self.kind, self.identifier.to_lowercase())
    }
}

fn is_slug(identifier: &str) -> bool {
    identifier
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Remembers which identifier a holder currently wants so that a slower,
/// superseded resolution cannot overwrite a newer selection.
#[derive(Debug, Default)]
pub struct SelectionGuard {
    current: RwLock<Option<String>>,
}

impl SelectionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(&self, identifier: &str) {
        if let Ok(mut current) = self.current.write() {
            *current = Some(normalize(identifier));
        }
    }

    pub fn current(&self) -> Option<String> {
        self.current.read().ok().and_then(|c| c.clone())
    }

    pub fn is_current(&self, identifier: &str) -> bool {
        self.current().as_deref() == Some(normalize(identifier).as_str())
    }

    /// Pass `result` through only if `identifier` is still the selection.
    pub fn accept<T>(&self, identifier: &str, result: T) -> Option<T> {
        if self.is_current(identifier) {
            Some(result)
        } else {
            None
        }
    }

    pub fn clear(&self) {
        if let Ok(mut current) = self.current.write() {
            *current = None;
        }
    }
}

fn normalize(identifier: &str) -> String {
    identifier.trim().to_lowercase()
}
