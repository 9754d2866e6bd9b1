//! Data model: documents, view envelopes, change feeds, database info.

pub mod changes;
pub mod document;
pub mod info;
pub mod view;

pub use changes::{ChangeEntry, ChangeFeed, ChangeOptions, ChangeRev, CouchChanges};
pub use document::{CouchDocument, Document, SaveResponse};
pub use info::DatabaseInfo;
pub use view::{CouchView, ViewOptions, ViewResult, ViewRow};
