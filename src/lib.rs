//! # Observable Groups
//!
//! Keeps asynchronous operations alive while the thing observing them comes
//! and goes, and hands the missed result to whoever attaches next.
//!
//! ## Core Concepts
//!
//! - **Producers**: sources of zero or one value then completion, or an error
//! - **Observers**: receive [`Event`]s; held weakly by the group
//! - **Groups**: track operations by tag for one scope; observers can be
//!   detached or locked out without cancelling the work
//! - **Manager**: creates groups and finds them again by id
//!
//! ## Example
//!
//! ```ignore
//! use observable_groups::{ObservableManager, RecordingObserver, Subject};
//! use std::sync::Arc;
//!
//! let manager = ObservableManager::new();
//! let group = manager.new_group();
//!
//! let request = Subject::<String, String>::new();
//! let observer = Arc::new(RecordingObserver::new());
//! group.add("profile", request.clone(), &observer)?;
//!
//! // The screen goes away; the request keeps running.
//! group.unsubscribe();
//! request.next("Chespirito".to_string());
//! request.complete();
//!
//! // The rebuilt screen picks up the buffered result.
//! let rebuilt = Arc::new(RecordingObserver::new());
//! manager
//!     .get_group(group.id())?
//!     .observable::<String, String>("profile")?
//!     .subscribe(&rebuilt)?;
//! assert_eq!(rebuilt.values(), vec!["Chespirito".to_string()]);
//! ```

pub mod error;
pub mod groups;
pub mod observer;
pub mod producers;
mod subscriptions;
pub mod types;

// Re-exports
pub use error::{GroupError, Result};
pub use groups::{ObservableGroup, ObservableManager, Resubscription};
pub use observer::{ChannelObserver, Observer, ObserverHandle, RecordingObserver};
pub use producers::{
    fail, from_fn, from_receiver, just, never, CancelHandle, Emitter, Producer, Subject,
};
pub use types::*;
