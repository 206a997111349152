//! Renderer-independent algorithms: grid traversal and draw ordering.

pub mod order;
pub mod raycast;
pub mod types;

pub use order::{Ordered, ResolveStats, Resolver};
pub use raycast::{HitList, cast};
pub use types::{Hit, PixelInfo, Ray, Side, View};
