//! Failures reported by rooms and worlds.

use thiserror::Error;

use crate::{CellCoord, Entity, EntityId, RoomCoord, RoomName};

/// Reasons a room rejects a query or mutation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The target cell already holds an entity.
    #[error("entity {occupant} already occupies {coord} in room {room}")]
    OccupiedCell {
        /// Room containing the cell.
        room: RoomName,
        /// Cell that was targeted.
        coord: RoomCoord,
        /// Entity currently occupying the cell.
        occupant: EntityId,
    },
    /// The column or row lies outside the room.
    #[error("cell ({column}, {row}) is outside room {room}")]
    CellOutOfBounds {
        /// Room that was addressed.
        room: RoomName,
        /// Requested column.
        column: i64,
        /// Requested row.
        row: i64,
    },
    /// The layer index does not exist in the room.
    #[error("layer {layer} is outside room {room}, which has {layer_count} layers")]
    LayerOutOfRange {
        /// Room that was addressed.
        room: RoomName,
        /// Requested layer.
        layer: u32,
        /// Number of layers the room holds.
        layer_count: u32,
    },
    /// The entity is already placed elsewhere in the room.
    #[error("entity {entity} is already placed in room {room}")]
    DuplicateEntity {
        /// Room that was addressed.
        room: RoomName,
        /// Entity that would appear twice.
        entity: EntityId,
    },
    /// The entity is not placed in the room.
    #[error("entity {entity} is not placed in room {room}")]
    EntityNotInRoom {
        /// Room that was addressed.
        room: RoomName,
        /// Entity that was looked up.
        entity: EntityId,
    },
    /// The entity's presentation state does not resolve to its slot in the room.
    #[error("entity {entity} is not attached to room {room}")]
    DetachedEntity {
        /// Room that was addressed.
        room: RoomName,
        /// Entity whose presentation is missing or stale.
        entity: EntityId,
    },
    /// The room was described with no cells or no layers.
    #[error("room {room} must have a non-zero size and at least one layer")]
    EmptyRoom {
        /// Room being constructed.
        room: RoomName,
    },
    /// An initial layer does not match the room's dimensions.
    #[error("layer {layer} of room {room} is not {width}x{height}")]
    MalformedLayer {
        /// Room being constructed.
        room: RoomName,
        /// Offending layer index.
        layer: usize,
        /// Expected number of columns.
        width: u32,
        /// Expected number of rows.
        height: u32,
    },
    /// A transform with a zero tile size cannot map pixels back to cells.
    #[error("room {room} cannot use a zero tile size")]
    ZeroTileSize {
        /// Room whose transform was being replaced.
        room: RoomName,
    },
}

/// Placement refused by a room. Hands the entity back to the caller.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct Rejected {
    entity: Entity,
    #[source]
    reason: RoomError,
}

impl Rejected {
    /// Pairs a refused entity with the reason it was refused.
    #[must_use]
    pub fn new(entity: Entity, reason: RoomError) -> Self {
        Self { entity, reason }
    }

    /// Reason the placement was refused.
    #[must_use]
    pub const fn reason(&self) -> &RoomError {
        &self.reason
    }

    /// Splits the rejection into the returned entity and the reason.
    #[must_use]
    pub fn into_parts(self) -> (Entity, RoomError) {
        (self.entity, self.reason)
    }

    /// Drops the entity, keeping only the reason.
    #[must_use]
    pub fn into_reason(self) -> RoomError {
        self.reason
    }
}

/// Reasons a world rejects a query or mutation.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum WorldError {
    /// No room is registered under the name.
    #[error("unknown room {name}")]
    UnknownRoom {
        /// Name that was looked up.
        name: String,
    },
    /// Two rooms share a name.
    #[error("room {name} is defined more than once")]
    DuplicateRoom {
        /// Repeated name.
        name: RoomName,
    },
    /// A room-level failure.
    #[error(transparent)]
    Room(#[from] RoomError),
    /// Two portals share a source cell.
    #[error("more than one portal leaves {cell} in room {room}")]
    DuplicatePortal {
        /// Room containing the portals.
        room: RoomName,
        /// Shared source cell.
        cell: CellCoord,
    },
    /// A portal's source cell lies outside its room.
    #[error("portal source {cell} lies outside room {room}")]
    PortalOutOfBounds {
        /// Room containing the portal.
        room: RoomName,
        /// Offending source cell.
        cell: CellCoord,
    },
    /// More than one portal could receive travellers from `from` into `to`.
    #[error("room {to} has more than one portal back to room {from}")]
    AmbiguousReturnPortal {
        /// Room travellers leave.
        from: RoomName,
        /// Room travellers arrive in.
        to: RoomName,
    },
    /// The portal is not part of the world.
    #[error("no portal leaves {cell} in room {room}")]
    UnknownPortal {
        /// Room named by the portal.
        room: RoomName,
        /// Source cell named by the portal.
        cell: CellCoord,
    },
    /// The portal leaves a room other than the focused one.
    #[error("portal leaves room {portal_room} but room {focus} is focused")]
    PortalOutsideFocus {
        /// Room containing the portal.
        portal_room: RoomName,
        /// Currently focused room.
        focus: RoomName,
    },
    /// The destination room has no portal leading back.
    #[error("room {to} has no portal back to room {from}")]
    MissingReturnPortal {
        /// Room travellers leave.
        from: RoomName,
        /// Room travellers arrive in.
        to: RoomName,
    },
}

/// Addition refused by a world. Hands the entity back to the caller.
#[derive(Debug, Error)]
#[error("{reason}")]
pub struct Refused {
    entity: Entity,
    #[source]
    reason: WorldError,
}

impl Refused {
    /// Pairs a refused entity with the reason it was refused.
    #[must_use]
    pub fn new(entity: Entity, reason: impl Into<WorldError>) -> Self {
        Self {
            entity,
            reason: reason.into(),
        }
    }

    /// Reason the addition was refused.
    #[must_use]
    pub const fn reason(&self) -> &WorldError {
        &self.reason
    }

    /// Splits the refusal into the returned entity and the reason.
    #[must_use]
    pub fn into_parts(self) -> (Entity, WorldError) {
        (self.entity, self.reason)
    }

    /// Drops the entity, keeping only the reason.
    #[must_use]
    pub fn into_reason(self) -> WorldError {
        self.reason
    }
}

impl From<Rejected> for Refused {
    fn from(rejected: Rejected) -> Self {
        let (entity, reason) = rejected.into_parts();
        Self::new(entity, reason)
    }
}
