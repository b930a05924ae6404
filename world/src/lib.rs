#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative spatial state for Crystals.
//!
//! A [`World`] owns every [`Room`] and the static portal graph between them,
//! and tracks which room is focused. All placement and movement flows through
//! the world so the per-room occupancy and draw order invariants hold.

use std::collections::BTreeMap;

use crystals_core::{
    CellCoord, Entity, EntityId, Facing, Portal, Refused, Rejected, RoomCoord, RoomError,
    RoomName, WorldError,
};
use tracing::{debug, error, info, warn};

mod portals;
mod room;

pub use room::{LayerGrid, Room};

use portals::PortalGraph;

/// Collection of rooms linked by portals, with one room in focus.
#[derive(Debug)]
pub struct World {
    rooms: Vec<Room>,
    names: BTreeMap<RoomName, usize>,
    portals: PortalGraph,
    focus: usize,
}

impl World {
    /// Assembles a world and focuses `focus`.
    ///
    /// Portals must name known rooms, leave from cells inside their room and
    /// have at most one return portal each.
    pub fn new<R>(rooms: R, portals: Vec<Portal>, focus: &str) -> Result<Self, WorldError>
    where
        R: IntoIterator<Item = Room>,
    {
        let mut names = BTreeMap::new();
        let mut stored = Vec::new();
        for room in rooms {
            if names.insert(room.name().clone(), stored.len()).is_some() {
                return Err(WorldError::DuplicateRoom {
                    name: room.name().clone(),
                });
            }
            stored.push(room);
        }

        let portals = PortalGraph::build(portals, |name| {
            names.get(name).map(|index| &stored[*index])
        })?;
        let focus_index = *names.get(focus).ok_or_else(|| unknown_room(focus))?;

        let mut world = Self {
            rooms: stored,
            names,
            portals,
            focus: focus_index,
        };
        world.focus_on(focus_index);
        Ok(world)
    }

    /// Focuses the named room and re-attaches all of its occupants.
    ///
    /// An unknown name leaves the current focus untouched.
    pub fn set_focus(&mut self, room: &str) -> Result<(), WorldError> {
        let index = self.room_index(room)?;
        self.focus_on(index);
        Ok(())
    }

    /// Room currently in focus.
    #[must_use]
    pub fn focus(&self) -> &Room {
        &self.rooms[self.focus]
    }

    /// Room registered under the name, if any.
    #[must_use]
    pub fn room(&self, name: &str) -> Option<&Room> {
        self.names.get(name).map(|index| &self.rooms[*index])
    }

    /// Portal leaving `cell` of `room`, or of the focused room when `room` is `None`.
    ///
    /// Naming a room the world does not hold is an error.
    pub fn get_portal(
        &self,
        cell: CellCoord,
        room: Option<&str>,
    ) -> Result<Option<&Portal>, WorldError> {
        let index = self.target_index(room)?;
        Ok(self.portals.at(self.rooms[index].name().as_str(), cell))
    }

    /// Portal that receives travellers arriving through `portal`.
    pub fn return_portal(&self, portal: &Portal) -> Result<&Portal, WorldError> {
        let index = self
            .portals
            .index_of(portal)
            .ok_or_else(|| WorldError::UnknownPortal {
                room: portal.from_room().clone(),
                cell: portal.source(),
            })?;
        self.portals
            .return_of(index)
            .ok_or_else(|| WorldError::MissingReturnPortal {
                from: portal.from_room().clone(),
                to: portal.to_room().clone(),
            })
    }

    /// Adds an entity to a room without ever overwriting an occupant.
    ///
    /// With no layer, or a layer at or past the top, a fresh layer is appended
    /// and the entity lands there. Otherwise the entity takes the requested
    /// layer when the cell is free; an occupied cell gets a new layer inserted
    /// directly above it. Returns where the entity landed; a refused entity is
    /// handed back inside the error.
    pub fn add_entity(
        &mut self,
        entity: Entity,
        cell: CellCoord,
        layer: Option<u32>,
        room: Option<&str>,
    ) -> Result<RoomCoord, Refused> {
        let index = match self.target_index(room) {
            Ok(index) => index,
            Err(reason) => return Err(Refused::new(entity, reason)),
        };
        Ok(settle(&mut self.rooms[index], entity, cell, layer)?)
    }

    /// Removes and returns the occupant of `coord`.
    pub fn remove_entity(
        &mut self,
        coord: RoomCoord,
        room: Option<&str>,
    ) -> Result<Option<Entity>, WorldError> {
        let index = self.target_index(room)?;
        Ok(self.rooms[index].pop_at(coord)?)
    }

    /// Steps an entity of the focused room by `(dx, dy)`.
    ///
    /// The entity turns toward the step even when it is blocked. Returns
    /// `false` when the destination column is outside the room or holds a
    /// non-walkable occupant. A successful step keeps the entity's layer when
    /// that cell is free and otherwise stacks it on a new layer.
    pub fn step_entity(&mut self, entity: EntityId, dx: i32, dy: i32) -> Result<bool, WorldError> {
        let room = &mut self.rooms[self.focus];
        if let Some(traveller) = room.entity_mut(entity) {
            traveller.face(Facing::from_step(dx, dy));
        }

        let origin = room.coordinates_of(entity)?;
        let column = i64::from(origin.column()) + i64::from(dx);
        let row = i64::from(origin.row()) + i64::from(dy);
        if !room.is_walkable(column, row) {
            debug!(room = %room.name(), entity = %entity, column, row, "step_blocked");
            return Ok(false);
        }
        let (Ok(column), Ok(row)) = (u32::try_from(column), u32::try_from(row)) else {
            return Ok(false);
        };

        let traveller = room
            .pop_at(origin)?
            .ok_or_else(|| RoomError::EntityNotInRoom {
                room: room.name().clone(),
                entity,
            })?;
        match settle(room, traveller, CellCoord::new(column, row), Some(origin.layer())) {
            Ok(coord) => {
                debug!(
                    room = %room.name(),
                    entity = %entity,
                    from = %origin,
                    to = %coord,
                    "entity_stepped"
                );
                Ok(true)
            }
            Err(rejected) => Err(restore(room, origin, rejected)),
        }
    }

    /// Carries an entity of the focused room through `portal`.
    ///
    /// The entity arrives on the source cell of the destination room's return
    /// portal, keeping its layer when possible, and the destination becomes the
    /// focused room. If the portal cannot be completed the entity stays where
    /// it was and the focus does not change.
    pub fn portal_entity(
        &mut self,
        entity: EntityId,
        portal: &Portal,
    ) -> Result<RoomCoord, WorldError> {
        let from_index = self.focus;
        let from_name = self.rooms[from_index].name().clone();
        if portal.from_room() != &from_name {
            warn!(portal_room = %portal.from_room(), focus = %from_name, "portal_outside_focus");
            return Err(WorldError::PortalOutsideFocus {
                portal_room: portal.from_room().clone(),
                focus: from_name,
            });
        }

        let arrival = match self.return_portal(portal) {
            Ok(receiving) => receiving.source(),
            Err(err) => {
                warn!(entity = %entity, error = %err, "portal_rejected");
                return Err(err);
            }
        };
        let to_index = self.room_index(portal.to_room().as_str())?;
        let origin = self.rooms[from_index].coordinates_of(entity)?;
        if to_index != from_index && self.rooms[to_index].contains(entity) {
            return Err(RoomError::DuplicateEntity {
                room: portal.to_room().clone(),
                entity,
            }
            .into());
        }

        let traveller = self.rooms[from_index]
            .pop_at(origin)?
            .ok_or_else(|| RoomError::EntityNotInRoom {
                room: from_name.clone(),
                entity,
            })?;
        self.focus_on(to_index);

        match settle(
            &mut self.rooms[to_index],
            traveller,
            arrival,
            Some(origin.layer()),
        ) {
            Ok(coord) => {
                info!(
                    entity = %entity,
                    from = %from_name,
                    to = %portal.to_room(),
                    %coord,
                    "entity_portaled"
                );
                Ok(coord)
            }
            Err(rejected) => {
                self.focus_on(from_index);
                Err(restore(&mut self.rooms[from_index], origin, rejected))
            }
        }
    }

    fn focus_on(&mut self, index: usize) {
        self.focus = index;
        let room = &mut self.rooms[index];
        let attached = room.reattach();
        info!(room = %room.name(), attached, "room_focused");
    }

    fn room_index(&self, name: &str) -> Result<usize, WorldError> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| unknown_room(name))
    }

    fn target_index(&self, room: Option<&str>) -> Result<usize, WorldError> {
        room.map_or(Ok(self.focus), |name| self.room_index(name))
    }
}

/// Layer resolution shared by every placement path.
///
/// Never overwrites an occupant; grows the layer stack instead.
fn settle(
    room: &mut Room,
    entity: Entity,
    cell: CellCoord,
    layer: Option<u32>,
) -> Result<RoomCoord, Rejected> {
    if let Err(reason) = room.check_cell(cell) {
        return Err(Rejected::new(entity, reason));
    }
    if room.contains(entity.id()) {
        let reason = RoomError::DuplicateEntity {
            room: room.name().clone(),
            entity: entity.id(),
        };
        return Err(Rejected::new(entity, reason));
    }

    let Some(layer) = layer.filter(|layer| *layer < room.layer_count()) else {
        let top = room.add_layer(None);
        return place_on_fresh_layer(room, entity, RoomCoord::from_cell(cell, top));
    };

    let coord = RoomCoord::from_cell(cell, layer);
    match room.place(entity, coord) {
        Ok(()) => Ok(coord),
        Err(rejected) if matches!(rejected.reason(), RoomError::OccupiedCell { .. }) => {
            let (entity, _) = rejected.into_parts();
            let above = room.add_layer(Some(layer.saturating_add(1)));
            place_on_fresh_layer(room, entity, RoomCoord::from_cell(cell, above))
        }
        Err(rejected) => Err(rejected),
    }
}

fn place_on_fresh_layer(
    room: &mut Room,
    entity: Entity,
    coord: RoomCoord,
) -> Result<RoomCoord, Rejected> {
    match room.place(entity, coord) {
        Ok(()) => Ok(coord),
        Err(rejected) => {
            error!(room = %room.name(), %coord, error = %rejected, "fresh_layer_occupied");
            debug_assert!(false, "fresh layer {coord} already occupied");
            Err(rejected)
        }
    }
}

/// Puts a refused traveller back on the cell it left.
fn restore(room: &mut Room, origin: RoomCoord, rejected: Rejected) -> WorldError {
    let (entity, reason) = rejected.into_parts();
    if let Err(lost) = room.place(entity, origin) {
        error!(room = %room.name(), %origin, error = %lost, "traveller_restore_failed");
    }
    reason.into()
}

fn unknown_room(name: &str) -> WorldError {
    WorldError::UnknownRoom {
        name: name.to_owned(),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use super::{Room, World};
    use crystals_core::{EntityId, Portal, RoomCoord, RoomName};

    /// Name of the focused room.
    #[must_use]
    pub fn focus_name(world: &World) -> &RoomName {
        world.focus().name()
    }

    /// Provides read-only access to the focused room.
    #[must_use]
    pub fn focused_room(world: &World) -> &Room {
        world.focus()
    }

    /// Provides read-only access to the named room.
    #[must_use]
    pub fn room<'world>(world: &'world World, name: &str) -> Option<&'world Room> {
        world.room(name)
    }

    /// Enumerates room names in sorted order.
    pub fn room_names(world: &World) -> impl Iterator<Item = &RoomName> {
        world.names.keys()
    }

    /// Enumerates every portal in the world.
    pub fn portals(world: &World) -> impl Iterator<Item = &Portal> {
        world.portals.iter()
    }

    /// Finds the room and coordinates of an entity anywhere in the world.
    #[must_use]
    pub fn locate(world: &World, entity: EntityId) -> Option<(&RoomName, RoomCoord)> {
        world.rooms.iter().find_map(|room| {
            room.coordinates_of(entity)
                .ok()
                .map(|coord| (room.name(), coord))
        })
    }
}
