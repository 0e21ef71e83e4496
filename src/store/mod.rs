//! Document storage: typed attributes, the in-memory table, and its
//! mutation feed.

pub mod attribute;
pub mod stream;
pub mod table;

pub use attribute::{map_from_value, map_to_json, AttributeMap, AttributeValue};
pub use stream::{ChangeFeed, ChangeRecord, StreamEventKind, CHANGE_FEED_CAPACITY};
pub use table::{DocumentTable, UpdateExpression};
