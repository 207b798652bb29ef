use thiserror::Error;

use crate::NodeId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("node {0} not found in the network")]
    NodeNotFound(NodeId),
    #[error("unknown travel mode: {0}")]
    UnknownMode(String),
    #[error("unknown criteria: {0}")]
    UnknownCriteria(String),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("GeoJSON error: {0}")]
    GeoJsonError(String),
}
