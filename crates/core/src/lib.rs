//! Frame orchestration and result streaming for live motion capture.
//!
//! Frames flow from a [`video`] source through the [`pipeline`] event loop,
//! fan out to per-channel [`detection`] workers, and their results are
//! painted by [`overlay`] and streamed by [`dispatch`].

pub mod detection;
pub mod dispatch;
pub mod overlay;
pub mod pipeline;
pub mod shared;
pub mod video;
