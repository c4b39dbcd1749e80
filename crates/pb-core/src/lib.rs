pub mod catalog;
pub mod fuzzy;
pub mod id;
pub mod import;
pub mod model;
pub mod validate;

pub use catalog::{Catalog, Category, Component};
pub use fuzzy::{find_similar_names, levenshtein};
pub use id::{ConnectionId, ElementId};
pub use import::{ImportReport, validate_import};
pub use model::*;
pub use validate::{
    DocumentValidator, Issue, IssueKind, ValidateOptions, ValidationReport,
};
