pub mod action;
pub mod change_set;
pub mod error;
pub mod id;
pub mod time;

pub use action::Action;
pub use change_set::ChangeSet;
pub use error::{ErrorKind, PipelineError, Result, ValidationErrors};
pub use id::{IdError, generate_id, validate_id};
pub use time::{format_rfc3339, now_utc, parse_rfc3339};
