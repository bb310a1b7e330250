//! Feature store (§4.B / §3): in-memory `features`, `segments`, `nodes`, with
//! the cyclic parent/member index arrays described in §9 "Cyclic structure
//! between segments and features". Nothing here references object references
//! directly; everything is by index, per the design notes.

pub mod context;
pub mod coord;
pub mod feature;
pub mod place;
pub mod segment;

pub use context::{Context, RunStats};
pub use coord::{BBox, Coordinate};
pub use feature::{Feature, FeatureGeometry, Patch, SegmentRef};
pub use place::PlaceName;
pub use segment::Segment;

/// OSM-style tag map. `hashbrown` for parity with the teacher's `pbf::Tags`;
/// iteration order doesn't matter until emission, where keys are sorted.
pub type Tags = hashbrown::HashMap<String, String>;

/// Stable index into `Context::segments`. Never reused or removed; segments are
/// only ever marked `used = 0` (§5 "Stable indices under deletion").
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SegmentId(pub usize);

/// Stable index into `Context::features` until a deletion sweep renumbers it
/// (features may be deleted from §4.H onward; segments never are).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct FeatureId(pub usize);
