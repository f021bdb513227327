//! Reusable service plumbing shared by the batcher crates and the binary:
//! logging bootstrap and a backoff retry helper.

pub mod logging;
pub mod retry;
