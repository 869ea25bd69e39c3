//! Grid garage block: store a grid and its mechanical sub-grids into the
//! block as a named prefab, list what is stored, and place a stored prefab
//! back into the world.
//!
//! `block` holds the per-block state machine shared by both sides;
//! `session` is the server command surface, `client` the client-side
//! message intake. `selection` and `placement` are the pure validation
//! passes, and `build` runs prefab unpacking off the main thread.

pub mod block;
pub mod build;
pub mod client;
pub mod placement;
pub mod selection;
pub mod session;

pub use block::{BlockAction, GarageBlock, TickInput, SELECT_RANGE};
pub use build::PreviewBuild;
pub use client::ClientSession;
pub use placement::{
    PlacementContext, PlacementIssue, Requester, Verdict, VOXEL_OVERLAP_LIMIT,
};
pub use selection::SelectDenied;
pub use session::{Destination, GarageSession, RequestContext};
