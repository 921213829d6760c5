// models/src/lib.rs

// Domain types shared by every crate in the workspace.
pub mod errors;
pub mod identifiers;
pub mod medical;
pub mod session;

pub use errors::{RecordError, RecordResult, ValidationError, ValidationResult};
pub use identifiers::{AssetKey, AssetKind, RecordScope};
pub use medical::*;
pub use session::{Role, SessionContext, DEFAULT_USER_ID};
