pub mod batch;
pub mod flush;
pub mod live;

pub use batch::{Batch, FlushReason};
pub use flush::{BatchSink, FlushController};
pub use live::BatchBuffer;
