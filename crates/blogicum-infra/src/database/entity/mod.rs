//! SeaORM entities for the blog tables.

use sea_orm::ActiveValue;

pub mod category;
pub mod comment;
pub mod location;
pub mod post;
pub mod user;

/// Unsaved records carry id `0` and get one assigned on insert.
pub(crate) fn primary_key(id: i64) -> ActiveValue<i64> {
    if id == 0 {
        ActiveValue::NotSet
    } else {
        ActiveValue::Set(id)
    }
}
