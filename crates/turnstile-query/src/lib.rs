//! Query construction for the request pipeline: declarative filter
//! validation against per-resource allow-lists, and offset pagination with
//! stable ordering.

pub mod filter;
pub mod paginate;

pub use filter::{
    Condition, FieldRule, FieldType, FilterOp, FilterSchema, FilterSpec, FilterValue,
    UnknownParams,
};
pub use paginate::{Page, PageLimits, PageRequest, PageWindow};
