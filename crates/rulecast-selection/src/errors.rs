//! Selection error types.

use std::io;

/// Errors raised while reading the rule catalog.
///
/// [`Catalog::load`](crate::Catalog::load) swallows these into an empty
/// catalog; [`Catalog::try_load`](crate::Catalog::try_load) surfaces them.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Filesystem error reading the catalog file.
    #[error("catalog I/O error: {0}")]
    Io(#[from] io::Error),

    /// Catalog file is not valid JSON or has the wrong structure.
    #[error("malformed catalog: {0}")]
    Json(#[from] serde_json::Error),
}

/// Invalid selection parameters, rejected before any scoring.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectionError {
    /// Maximum rule count below zero.
    #[error("max rule count must not be negative (got {0})")]
    NegativeMaxRules(i64),

    /// Token budget below zero.
    #[error("token budget must not be negative (got {0})")]
    NegativeTokenBudget(i64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_error_display() {
        let err = CatalogError::Io(io::Error::new(io::ErrorKind::NotFound, "gone"));
        assert_eq!(err.to_string(), "catalog I/O error: gone");
    }

    #[test]
    fn catalog_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: CatalogError = json_err.into();
        assert!(err.to_string().starts_with("malformed catalog"));
    }

    #[test]
    fn selection_error_display() {
        assert_eq!(
            SelectionError::NegativeTokenBudget(-5).to_string(),
            "token budget must not be negative (got -5)"
        );
    }
}
