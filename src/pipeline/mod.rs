//! Recording pipeline: shared types, the bounded utterance queue, the
//! dispatcher worker pool, and the ordered commit path.

pub mod commit;
pub mod dispatcher;
pub mod queue;
pub mod types;

pub use commit::Committer;
pub use dispatcher::DispatcherConfig;
pub use queue::{Dequeue, Enqueue, UtteranceReceiver, UtteranceSender, utterance_queue};
pub use types::{AudioFrame, Utterance};
