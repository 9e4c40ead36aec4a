//! gputrace - GPU profiler trace session reconstruction.
//!
//! This library consumes the stream of heterogeneous API-call records
//! (OpenCL, HSA, DX12, Vulkan, performance markers, symbol stacks) emitted by
//! an instrumented application run and reconstructs a per-thread, per-queue
//! hierarchical timeline: CPU calls grouped under their enclosing markers,
//! GPU work paired with the CPU call that issued it, queue timelines
//! partitioned into command-list submissions.
//!
//! # Modules
//!
//! - [`record`] - the parsed record model handed over by the trace parser
//! - [`item`] - session items, the nodes of the reconstructed tree
//! - [`container`] - the session data container and finalization pass
//! - [`command_list`] - command-list / command-buffer submission instances
//! - [`occupancy`] - kernel occupancy side-channel data
//! - [`symbols`] - per-thread call-stack symbol entries
//! - [`ingest`] - the parser-facing ingestion listener
//!
//! # Example
//!
//! ```
//! use gputrace::ingest::{CancellationToken, TraceIngestListener};
//! use gputrace::record::{ClApiInfo, TraceRecord};
//!
//! let mut listener = TraceIngestListener::new(CancellationToken::new());
//! listener.on_parse(TraceRecord::ClApi(ClApiInfo {
//!     thread_id: 1,
//!     name: "clEnqueueNDRangeKernel".to_string(),
//!     start: 100,
//!     end: 250,
//!     ..Default::default()
//! }));
//! let session = listener.finish();
//! assert_eq!(session.threads_count(), 1);
//! assert_eq!(session.session_time_range(), (100, 250));
//! ```

pub mod command_list;
pub mod container;
pub mod ingest;
pub mod item;
pub mod occupancy;
pub mod record;
pub mod symbols;

pub use container::SessionDataContainer;
pub use ingest::{CancellationToken, TraceIngestListener, MAX_TRACE_ENTRIES};
pub use item::{ItemId, ItemKind, ItemType, SessionItem};
pub use record::TraceRecord;
