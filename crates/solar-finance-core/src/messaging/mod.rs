//! Free-text intake: `key=value` message bodies in, channel replies out.

pub mod parser;
pub mod response;

pub use parser::{find_missing_fields, parse_structured_message, MissingFields};
pub use response::{
    default_sheet_title, format_failure, format_success, handle_message, Channel, ModelResponse,
};
