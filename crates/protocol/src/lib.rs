pub mod codec;

use serde::{Deserialize, Serialize};

/// One message pushed by a publisher. `id` is chosen by the publisher and
/// echoed in the matching [`PublishReply`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub id: u64,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Delivery {
    /// Written to the message log.
    Ack,
    /// Not written; publish it again.
    Nack,
}

/// Sent once the worker has settled the message. Replies arrive in
/// settlement order, not publish order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReply {
    pub id: u64,
    pub delivery: Delivery,
}
