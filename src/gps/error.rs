use thiserror::Error;

/// Errors raised while parsing or resolving a node reference.
///
/// All of these are raised at the point of use; none are collected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GpsError {
    /// The reference string does not conform to the grammar
    #[error("invalid reference '{reference}': {reason}")]
    Syntax { reference: String, reason: String },

    /// A `find`/`dereference` matched no nodes
    #[error("no node found for '{reference}'")]
    NotFound { reference: String },

    /// A `find` matched more than one node
    #[error("'{reference}' is ambiguous: matched {count} nodes")]
    NotUnique { reference: String, count: usize },

    /// A matched node does not own the requested sub-resource
    #[error("node '{node}' has no resource '{resource}' (from '{reference}')")]
    BadReference {
        reference: String,
        node: String,
        resource: String,
    },

    /// `dereference` was called with a reference that has no `#resource` suffix
    #[error("cannot dereference '{reference}' without a #resource selector")]
    MissingResource { reference: String },
}

impl GpsError {
    pub(crate) fn syntax(reference: &str, reason: impl Into<String>) -> Self {
        GpsError::Syntax {
            reference: reference.to_string(),
            reason: reason.into(),
        }
    }
}
