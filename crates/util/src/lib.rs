pub mod async_runtime;
pub mod env;
pub mod http;

pub use async_runtime::block_on_future;
pub use http::{JsonParseError, parse_response_body, parse_response_json_strict};
