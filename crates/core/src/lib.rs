mod accumulator;
mod context;
mod error;
mod flush;
mod message;
mod session;
mod sink;
pub mod source;

#[cfg(test)]
mod testing;

pub use accumulator::BatchAccumulator;
pub use context::ReceiveContext;
pub use error::{Error, Result, SourceError};
pub use flush::{FlushReport, flush};
pub use message::{Acker, Message, Outcome};
pub use session::{ReceiveSession, SessionReport};
pub use sink::{FileSink, Sink};
pub use source::{ChannelSource, Handler, MessageSource, Publisher, SourceStats};
