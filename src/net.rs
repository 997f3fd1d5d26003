//! A TCP transport: one bincode-framed POST per connection.

pub mod client;
pub mod server;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub(crate) struct PostRequest {
    path: String,
    body: Vec<u8>,
}
