//! Schema entities: tables and the columns, indexes, foreign keys and
//! checks they own.
//!
//! Entities are plain values. Editing produces a new value that replaces the
//! old one in the current table; nothing is shared between an original and a
//! current definition.

mod column;
mod foreign_key;
mod index;
mod table;

pub use column::{Column, Virtuality};
pub use foreign_key::{Check, ForeignKey, ReferentialAction};
pub use index::{Index, IndexOrigin};
pub use table::Table;
