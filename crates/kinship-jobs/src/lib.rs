//! # kinship-jobs
//!
//! The asynchronous half of the kinship pipeline.
//!
//! This crate provides:
//! - Submission intake ([`submit`]): validate, vectorize, assess, store, queue
//! - The matching worker, fed by an in-process queue, with parallel pool
//!   scoring and progress events on a broadcast channel
//! - The result delivery protocol ([`DeliveryState`], [`MatchPoller`])
//!
//! ## Example
//!
//! ```ignore
//! use kinship_jobs::{submit, MatchPoller, MatchQueue, MatchWorker, PollConfig, WorkerConfig};
//!
//! let (queue, receiver) = MatchQueue::with_default_capacity();
//! let worker = MatchWorker::new(repo.clone(), MatchEngine::from_env()?, WorkerConfig::from_env());
//! let handle = worker.start(receiver);
//!
//! let submission = submit(repo.as_ref(), response, true, Some(&queue)).await?;
//!
//! let (_cancel_tx, cancel_rx) = tokio::sync::mpsc::channel(1);
//! let state = MatchPoller::new(repo, PollConfig::from_env())
//!     .wait_for_matches(submission.id, cancel_rx)
//!     .await;
//!
//! handle.shutdown().await?;
//! ```

pub mod delivery;
pub mod fanout;
pub mod intake;
pub mod worker;

// Re-export core types
pub use kinship_core::*;

pub use delivery::{DeliveryState, MatchPoller, Observation, PollConfig};
pub use fanout::rank_parallel;
pub use intake::{submit, Submission};
pub use worker::{
    MatchQueue, MatchQueueReceiver, MatchWorker, WorkerConfig, WorkerEvent, WorkerHandle,
};
