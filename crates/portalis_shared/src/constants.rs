//! # Engine Constants
//!
//! Default tunables for the simulation. Every value here is also the default
//! of the corresponding field in the engine configuration, so hosts that never
//! load a config file run with exactly these numbers.

// =============================================================================
// TIMING
// =============================================================================

/// Fixed integration step in milliseconds (60 steps per second).
pub const TIME_STEP_MS: f64 = 1000.0 / 60.0;

/// Fixed integration step in seconds.
pub const TIME_STEP_S: f64 = TIME_STEP_MS / 1000.0;

/// Host frames longer than this are clamped so a slow frame cannot trigger
/// an unbounded catch-up loop (10 FPS floor).
pub const MIN_MILLIS_PER_FRAME: f64 = 1000.0 / 10.0;

// =============================================================================
// GEOMETRY & TRAVERSAL
// =============================================================================

/// Maximum number of portals a single ray or transition may cross.
pub const MAX_PORTALS: usize = 300;

/// Tolerance for parametric intersection and collinearity tests.
pub const INTERSECT_EPSILON: f64 = 1e-8;

/// Tolerance for vertex matching between portal segments.
pub const MATCH_EPSILON: f64 = 1e-4;

/// Squared speeds below this are treated as rest.
pub const VELOCITY_EPSILON: f64 = 1e-15;

/// Initial side length of the quadtree root.
pub const QUADTREE_INIT_DIM: f64 = 256.0;

/// Maximum bodies per quadtree leaf before it subdivides.
pub const QUADTREE_LEAF_CAPACITY: usize = 4;

/// Maximum quadtree depth.
pub const QUADTREE_MAX_DEPTH: u32 = 8;

/// Lightmap cell size in world units.
pub const LIGHT_GRID: f64 = 4.0;

/// Extra lightmap cells around each sector AABB.
pub const LIGHTMAP_BORDER: u32 = 2;

/// Default ceiling height of a new sector.
pub const DEFAULT_CEILING_Z: f64 = 64.0;

// =============================================================================
// PHYSICS
// =============================================================================

/// World units per metre.
pub const UNITS_PER_METER: f64 = 32.0;

/// Metres per world unit.
pub const METERS_PER_UNIT: f64 = 1.0 / UNITS_PER_METER;

/// Standard gravity in m/s².
pub const GRAVITY: f64 = 9.8;

/// Density of air in kg/m³, for quadratic drag.
pub const AIR_DENSITY: f64 = 1.293;

/// Drag coefficient of a sphere.
pub const SPHERE_DRAG_COEFFICIENT: f64 = 0.47;

/// Default floor friction coefficient.
pub const FLOOR_FRICTION: f64 = 0.85;

/// Distance (in world units) a body may travel per collision sub-step.
pub const COLLISION_CHECK: f64 = 2.0;

/// Maximum collision sub-steps and resolution iterations per step.
pub const COLLISION_STEPS: usize = 10;

// =============================================================================
// PLAYER
// =============================================================================

/// Player mass in kg.
pub const PLAYER_MASS: f64 = 80.0;

/// Player bounding diameter.
pub const PLAYER_BOUNDING_RADIUS: f64 = 10.0;

/// Player height.
pub const PLAYER_HEIGHT: f64 = 40.0;

/// Step height a player can climb without jumping.
pub const PLAYER_MOUNT_HEIGHT: f64 = 15.0;

// =============================================================================
// EVENTS
// =============================================================================

/// Capacity of the simulation event queue.
pub const MAX_EVENTS: usize = 1024;
