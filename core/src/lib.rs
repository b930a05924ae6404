#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Crystals spatial engine.
//!
//! This crate defines the vocabulary that connects the authoritative world,
//! the systems that drive it, and the adapters that present it. Rooms are
//! layered grids addressed by [`RoomCoord`], entities are referenced by
//! [`EntityId`], and rooms are linked by directed [`Portal`] values. Every
//! placement writes a [`Presentation`] onto the placed [`Entity`]; the engine
//! never reads presentation state back for gameplay decisions beyond
//! recovering an entity's own coordinates.

use std::{borrow::Borrow, fmt};

use serde::{Deserialize, Serialize};

mod error;

pub use error::{Refused, Rejected, RoomError, WorldError};

/// Width and height of each tile, in pixels.
pub const TILE_SIZE: u32 = 24;
/// Horizontal pixel coordinate of the bottom left corner of a room display.
pub const ORIGIN_X: i32 = 10;
/// Vertical pixel coordinate of the bottom left corner of a room display.
pub const ORIGIN_Y: i32 = 124;

/// Unique identifier assigned to an entity by whoever created it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable key naming a room within a world.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomName(String);

impl RoomName {
    /// Creates a room name from any string-like value.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrows the underlying name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for RoomName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a single grid cell expressed as column and row coordinates.
///
/// Column zero is the left edge of a room and row zero its bottom edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.column, self.row)
    }
}

/// Location of a cell within one specific layer of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomCoord {
    cell: CellCoord,
    layer: u32,
}

impl RoomCoord {
    /// Creates a coordinate from explicit column, row and layer indices.
    #[must_use]
    pub const fn new(column: u32, row: u32, layer: u32) -> Self {
        Self {
            cell: CellCoord::new(column, row),
            layer,
        }
    }

    /// Lifts a cell coordinate onto the provided layer.
    #[must_use]
    pub const fn from_cell(cell: CellCoord, layer: u32) -> Self {
        Self { cell, layer }
    }

    /// Column component of the coordinate.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.cell.column()
    }

    /// Row component of the coordinate.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.cell.row()
    }

    /// Layer (z-level) component of the coordinate.
    #[must_use]
    pub const fn layer(&self) -> u32 {
        self.layer
    }

    /// Column and row without the layer.
    #[must_use]
    pub const fn cell(&self) -> CellCoord {
        self.cell
    }
}

impl fmt::Display for RoomCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.cell.column(),
            self.cell.row(),
            self.layer
        )
    }
}

/// Cardinal movement directions available to entities.
///
/// Rows grow upward, so [`Direction::North`] increases the row index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Movement toward increasing row indices.
    North,
    /// Movement toward increasing column indices.
    East,
    /// Movement toward decreasing row indices.
    South,
    /// Movement toward decreasing column indices.
    West,
}

impl Direction {
    /// Column and row offsets of a single step in this direction.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, 1),
            Self::East => (1, 0),
            Self::South => (0, -1),
            Self::West => (-1, 0),
        }
    }
}

/// Unit direction of an entity's most recent attempted step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Facing {
    dx: i8,
    dy: i8,
}

impl Facing {
    /// Facing of an entity that has never attempted a step.
    pub const IDLE: Self = Self { dx: 0, dy: 0 };

    /// Derives the unit facing from the sign of each step component.
    #[must_use]
    pub const fn from_step(dx: i32, dy: i32) -> Self {
        Self {
            dx: dx.signum() as i8,
            dy: dy.signum() as i8,
        }
    }

    /// Horizontal component, one of `-1`, `0` or `1`.
    #[must_use]
    pub const fn dx(&self) -> i8 {
        self.dx
    }

    /// Vertical component, one of `-1`, `0` or `1`.
    #[must_use]
    pub const fn dy(&self) -> i8 {
        self.dy
    }
}

/// Rectangular leash limiting where an entity may act, centred on a tether cell.
///
/// A `None` range leaves the corresponding axis unbounded. Rooms and worlds
/// store the reach without enforcing it; the traversal system refuses steps
/// that leave it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reach {
    tether: CellCoord,
    x_range: Option<u32>,
    y_range: Option<u32>,
}

impl Reach {
    /// Creates a reach anchored at `tether`.
    #[must_use]
    pub const fn new(tether: CellCoord, x_range: Option<u32>, y_range: Option<u32>) -> Self {
        Self {
            tether,
            x_range,
            y_range,
        }
    }

    /// Cell the reach is anchored to.
    #[must_use]
    pub const fn tether(&self) -> CellCoord {
        self.tether
    }

    /// Moves the anchor while keeping both ranges.
    #[must_use]
    pub const fn tethered_at(self, tether: CellCoord) -> Self {
        Self { tether, ..self }
    }

    /// Reports whether the cell lies inside the tether box, bounds inclusive.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        let within = |range: Option<u32>, anchor: u32, value: u32| {
            range.map_or(true, |range| anchor.abs_diff(value) <= range)
        };
        within(self.x_range, self.tether.column(), cell.column())
            && within(self.y_range, self.tether.row(), cell.row())
    }
}

/// Pixel position written onto an entity's presentation handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelPosition {
    x: i64,
    y: i64,
}

impl PixelPosition {
    /// Creates a pixel position.
    #[must_use]
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Horizontal pixel coordinate.
    #[must_use]
    pub const fn x(&self) -> i64 {
        self.x
    }

    /// Vertical pixel coordinate.
    #[must_use]
    pub const fn y(&self) -> i64 {
        self.y
    }
}

/// Draw priority of a layer. Tokens are dense per room and equal the layer index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenderOrder(u32);

impl RenderOrder {
    /// Creates a render order token.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Numeric draw priority; higher values draw on top.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Token one step above this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

/// Presentation state written by a room whenever it places an entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Presentation {
    room: RoomName,
    position: PixelPosition,
    order: RenderOrder,
}

impl Presentation {
    /// Creates a presentation attachment for the provided room context.
    #[must_use]
    pub const fn new(room: RoomName, position: PixelPosition, order: RenderOrder) -> Self {
        Self {
            room,
            position,
            order,
        }
    }

    /// Room whose presentation context the entity is attached to.
    #[must_use]
    pub const fn room(&self) -> &RoomName {
        &self.room
    }

    /// Pixel position of the entity's tile.
    #[must_use]
    pub const fn position(&self) -> PixelPosition {
        self.position
    }

    /// Draw order of the entity's layer.
    #[must_use]
    pub const fn order(&self) -> RenderOrder {
        self.order
    }
}

/// Affine map between grid cells and presentation pixels.
///
/// `pixel = cell * tile_size + origin` on each axis. The inverse accepts only
/// tile-aligned pixels at or beyond the origin, which keeps the round trip
/// exact.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct TileTransform {
    tile_size: u32,
    origin_x: i32,
    origin_y: i32,
}

impl TileTransform {
    /// Creates a transform with an explicit tile size and origin.
    #[must_use]
    pub const fn new(tile_size: u32, origin_x: i32, origin_y: i32) -> Self {
        Self {
            tile_size,
            origin_x,
            origin_y,
        }
    }

    /// Width and height of one tile in pixels.
    #[must_use]
    pub const fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Pixel coordinates of the room's bottom left corner.
    #[must_use]
    pub const fn origin(&self) -> (i32, i32) {
        (self.origin_x, self.origin_y)
    }

    /// Maps a cell onto the pixel position of its bottom left corner.
    #[must_use]
    pub fn to_pixels(&self, cell: CellCoord) -> PixelPosition {
        let tile = i64::from(self.tile_size);
        PixelPosition::new(
            i64::from(cell.column()) * tile + i64::from(self.origin_x),
            i64::from(cell.row()) * tile + i64::from(self.origin_y),
        )
    }

    /// Recovers the cell whose pixel position is `position`.
    ///
    /// Returns `None` for a zero tile size, for positions before the origin,
    /// and for positions that are not aligned to a tile corner.
    #[must_use]
    pub fn to_cell(&self, position: PixelPosition) -> Option<CellCoord> {
        let column = invert_axis(position.x(), self.origin_x, self.tile_size)?;
        let row = invert_axis(position.y(), self.origin_y, self.tile_size)?;
        Some(CellCoord::new(column, row))
    }
}

impl Default for TileTransform {
    fn default() -> Self {
        Self::new(TILE_SIZE, ORIGIN_X, ORIGIN_Y)
    }
}

fn invert_axis(pixel: i64, origin: i32, tile_size: u32) -> Option<u32> {
    let tile = i64::from(tile_size);
    if tile == 0 {
        return None;
    }
    let offset = pixel.checked_sub(i64::from(origin))?;
    if offset < 0 || offset % tile != 0 {
        return None;
    }
    u32::try_from(offset / tile).ok()
}

/// A tangible, placeable thing that populates rooms.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entity {
    id: EntityId,
    name: String,
    walkable: bool,
    facing: Facing,
    reach: Option<Reach>,
    presentation: Option<Presentation>,
}

impl Entity {
    /// Creates a detached entity that has never been placed.
    #[must_use]
    pub fn new(id: EntityId, name: impl Into<String>, walkable: bool) -> Self {
        Self {
            id,
            name: name.into(),
            walkable,
            facing: Facing::IDLE,
            reach: None,
            presentation: None,
        }
    }

    /// Restricts the entity to act within the provided reach.
    #[must_use]
    pub fn with_reach(mut self, reach: Reach) -> Self {
        self.reach = Some(reach);
        self
    }

    /// Identifier of the entity.
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Display name of the entity.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reports whether other entities may share this entity's grid column.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.walkable
    }

    /// Direction of the entity's most recent attempted step.
    #[must_use]
    pub const fn facing(&self) -> Facing {
        self.facing
    }

    /// Records the direction of an attempted step.
    pub fn face(&mut self, facing: Facing) {
        self.facing = facing;
    }

    /// Reach restricting the entity, if any.
    #[must_use]
    pub const fn reach(&self) -> Option<Reach> {
        self.reach
    }

    /// Re-anchors the entity's reach. Entities without a reach are unaffected.
    pub fn set_tether(&mut self, tether: CellCoord) {
        self.reach = self.reach.map(|reach| reach.tethered_at(tether));
    }

    /// Reports whether the cell lies within the entity's reach.
    ///
    /// Entities without a reach are in range everywhere.
    #[must_use]
    pub fn is_in_range(&self, cell: CellCoord) -> bool {
        self.reach.map_or(true, |reach| reach.contains(cell))
    }

    /// Presentation state last written by a room, if the entity is attached.
    #[must_use]
    pub const fn presentation(&self) -> Option<&Presentation> {
        self.presentation.as_ref()
    }

    /// Attaches the entity to a presentation context.
    pub fn attach(&mut self, presentation: Presentation) {
        self.presentation = Some(presentation);
    }

    /// Detaches the entity from whatever presentation context held it.
    pub fn detach(&mut self) {
        self.presentation = None;
    }
}

/// Directed link from a cell in one room to another room.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Portal {
    source: CellCoord,
    from_room: RoomName,
    to_room: RoomName,
}

impl Portal {
    /// Creates a portal at `(column, row)` of `from_room` leading to `to_room`.
    #[must_use]
    pub fn new(
        column: u32,
        row: u32,
        from_room: impl Into<RoomName>,
        to_room: impl Into<RoomName>,
    ) -> Self {
        Self {
            source: CellCoord::new(column, row),
            from_room: from_room.into(),
            to_room: to_room.into(),
        }
    }

    /// Cell of the source room that triggers the portal.
    #[must_use]
    pub const fn source(&self) -> CellCoord {
        self.source
    }

    /// Room containing the portal.
    #[must_use]
    pub const fn from_room(&self) -> &RoomName {
        &self.from_room
    }

    /// Room the portal leads to.
    #[must_use]
    pub const fn to_room(&self) -> &RoomName {
        &self.to_room
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CellCoord, Direction, Entity, EntityId, Facing, PixelPosition, Portal, Reach, RoomName,
        TileTransform, ORIGIN_X, ORIGIN_Y, TILE_SIZE,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn portal_round_trips_through_bincode() {
        assert_round_trip(&Portal::new(1, 2, "a room", "b room"));
    }

    #[test]
    fn transform_round_trips_through_bincode() {
        assert_round_trip(&TileTransform::new(16, -4, 8));
    }

    #[test]
    fn default_transform_matches_tile_constants() {
        let transform = TileTransform::default();
        let position = transform.to_pixels(CellCoord::new(2, 1));
        assert_eq!(position.x(), i64::from(ORIGIN_X) + 2 * i64::from(TILE_SIZE));
        assert_eq!(position.y(), i64::from(ORIGIN_Y) + i64::from(TILE_SIZE));
    }

    #[test]
    fn transform_inverse_is_exact() {
        let transform = TileTransform::new(24, 10, 124);
        for column in 0..6 {
            for row in 0..6 {
                let cell = CellCoord::new(column, row);
                assert_eq!(transform.to_cell(transform.to_pixels(cell)), Some(cell));
            }
        }
    }

    #[test]
    fn transform_rejects_unaligned_and_negative_pixels() {
        let transform = TileTransform::default();
        assert_eq!(transform.to_cell(PixelPosition::new(11, 124)), None);
        assert_eq!(transform.to_cell(PixelPosition::new(9, 124)), None);
        assert_eq!(
            TileTransform::new(0, 0, 0).to_cell(PixelPosition::new(0, 0)),
            None
        );
    }

    #[test]
    fn facing_uses_step_sign() {
        let facing = Facing::from_step(-5, 0);
        assert_eq!((facing.dx(), facing.dy()), (-1, 0));
        let facing = Facing::from_step(3, -2);
        assert_eq!((facing.dx(), facing.dy()), (1, -1));
        assert_eq!(Facing::from_step(0, 0), Facing::IDLE);
    }

    #[test]
    fn direction_deltas_are_unit_steps() {
        assert_eq!(Direction::North.delta(), (0, 1));
        assert_eq!(Direction::West.delta(), (-1, 0));
    }

    #[test]
    fn reach_limits_each_axis_independently() {
        let reach = Reach::new(CellCoord::new(5, 5), Some(2), None);
        assert!(reach.contains(CellCoord::new(3, 5)));
        assert!(reach.contains(CellCoord::new(7, 100)));
        assert!(!reach.contains(CellCoord::new(8, 5)));
    }

    #[test]
    fn entity_without_reach_is_always_in_range() {
        let entity = Entity::new(EntityId::new(1), "troll", false);
        assert!(entity.is_in_range(CellCoord::new(1000, 1000)));
    }

    #[test]
    fn set_tether_moves_reach_anchor() {
        let mut entity = Entity::new(EntityId::new(1), "troll", false)
            .with_reach(Reach::new(CellCoord::new(0, 0), Some(1), Some(1)));
        assert!(!entity.is_in_range(CellCoord::new(4, 4)));
        entity.set_tether(CellCoord::new(4, 3));
        assert!(entity.is_in_range(CellCoord::new(4, 4)));
    }

    #[test]
    fn room_name_borrows_as_str() {
        let mut names = std::collections::BTreeSet::new();
        let _ = names.insert(RoomName::new("a room"));
        assert!(names.contains("a room"));
    }
}
