//! Error types shared by every component of the toolkit.

use thiserror::Error;

use crate::composite::NodeId;

/// Boxed cause carried by construction and step failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("product family `{name}` is already registered")]
    DuplicateFamily { name: String },

    #[error("no product family named `{name}`")]
    UnknownFamily { name: String },

    #[error("failed to construct role `{role}` of family `{family}`")]
    FamilyConstruction {
        family: String,
        role: String,
        #[source]
        source: BoxError,
    },

    #[error("family `{family}` does not declare the same roles as the rest of the catalog")]
    RoleMismatch { family: String },

    #[error("assembly step `{step}` failed")]
    StepFailed {
        step: String,
        #[source]
        source: BoxError,
    },

    #[error("template `{key}` is already registered")]
    DuplicateTemplate { key: String },

    #[error("no template registered under `{key}`")]
    UnknownTemplate { key: String },

    #[error("attaching {child} under {container} would create a cycle")]
    Cycle { container: NodeId, child: NodeId },

    #[error("{0} is a leaf and cannot hold children")]
    NotAContainer(NodeId),

    #[error("{0} does not belong to this tree")]
    UnknownNode(NodeId),

    #[error("{0} is already attached to a container")]
    AlreadyAttached(NodeId),

    #[error("invalid catalog configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn construction_error_exposes_cause() {
        let err = Error::FamilyConstruction {
            family: "modern".into(),
            role: "sofa".into(),
            source: "out of fabric".into(),
        };
        assert_eq!(
            err.to_string(),
            "failed to construct role `sofa` of family `modern`"
        );
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("out of fabric"));
    }

    #[test]
    fn step_error_names_step() {
        let err = Error::StepFailed {
            step: "drink".into(),
            source: "empty".into(),
        };
        assert!(err.to_string().contains("`drink`"));
    }
}
