use crate::table::CompoId;
use thiserror::Error;

/// Errors raised while loading or analysing a component table.
#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("component record {index} is malformed: missing {field}")]
    MalformedComponentRecord { index: usize, field: &'static str },

    #[error("duplicate component id: {0}")]
    DuplicateComponentId(CompoId),

    #[error("block {block} references child {child} which is not in the table")]
    UnresolvedChildReference { block: CompoId, child: CompoId },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, LayoutError>;
