//! Grobview is a viewer and lightweight editor for unstructured meshes.
//!
//! The crate is split into a handful of layers:
//!
//! - [`mesh`] holds meshes of mixed grid objects ("grobs"), their file
//!   formats, and refinement.
//! - [`command`] and [`actor`] implement a cooperative pipeline: commands
//!   are queued, prepared, and run one step per tick, with heavy work pushed
//!   onto a worker pool and polled.
//! - [`scene`] is a tree of nodes, each of which may carry renderable
//!   [`Content`](scene::Content) such as a loaded mesh.
//! - [`render`] provides the camera, view, and GPU plumbing, and [`editor`]
//!   turns input events into camera motion.
//!
//! An [`AppContext`] ties the pipeline's registries together.  A host calls
//! [`AppContext::tick`] once per frame, then renders:
//!
//! ```
//! use grobview::{AppContext, Config, command::ThreadCount};
//! use grobview::{command::CommandQueue, command::NoOp};
//!
//! let ctx = AppContext::new(Config {
//!     threads: ThreadCount::One,
//!     ..Default::default()
//! });
//! let queue = CommandQueue::new(ctx.queues());
//! queue.enqueue(NoOp);
//! ctx.tick(); // prepares the command
//! ctx.tick(); // runs it
//! assert!(queue.is_empty());
//! ```
#![warn(missing_docs)]

pub mod actor;
mod bbox;
pub mod command;
mod context;
pub mod editor;
pub mod mesh;
pub mod render;
pub mod scene;

mod error;
pub use bbox::{BoundingBox, union as union_bbox};
pub use context::{AppContext, Config};
pub use error::Error;
