mod channel;

pub use channel::{ChannelSource, Publisher, SourceStats};

use crate::{context::ReceiveContext, error::SourceError, message::Message};

/// Per-message callback handed to [`MessageSource::receive`].
pub type Handler<'a> = dyn Fn(Message) + Send + Sync + 'a;

/// A pull subscription that pushes delivered messages into a handler.
pub trait MessageSource: Send + Sync {
    fn subscription(&self) -> &str;

    /// Deliver messages to `handler` until `ctx` is done or the source fails.
    ///
    /// The handler may be called from several threads at once. No call is
    /// in progress or made once this returns. Expiry of `ctx` is not an error.
    fn receive(&self, ctx: &ReceiveContext, handler: &Handler<'_>) -> Result<(), SourceError>;
}
