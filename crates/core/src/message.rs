use std::fmt;

/// How a message was settled with its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Consumed; the source may forget it.
    Ack,
    /// Not consumed; the source should redeliver it.
    Nack,
}

/// Settlement capability supplied by a message source.
///
/// Takes `self` by box so each message can be settled at most once.
pub trait Acker: Send {
    fn settle(self: Box<Self>, outcome: Outcome);
}

impl<F> Acker for F
where
    F: FnOnce(Outcome) + Send,
{
    fn settle(self: Box<Self>, outcome: Outcome) {
        (*self)(outcome)
    }
}

/// A delivered message: opaque payload plus the means to settle it.
pub struct Message {
    data: Vec<u8>,
    acker: Box<dyn Acker>,
}

impl Message {
    pub fn new(data: impl Into<Vec<u8>>, acker: impl Acker + 'static) -> Self {
        Self {
            data: data.into(),
            acker: Box::new(acker),
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn ack(self) {
        self.settle(Outcome::Ack)
    }

    pub fn nack(self) {
        self.settle(Outcome::Nack)
    }

    pub fn settle(self, outcome: Outcome) {
        self.acker.settle(outcome)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("len", &self.data.len())
            .finish_non_exhaustive()
    }
}
