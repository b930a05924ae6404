#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Traversal system that chains entity steps with portal transitions.
//!
//! The world never triggers a transition on its own. This system plays the
//! game loop's part: after a successful step onto a portal cell of the
//! focused room it carries the entity through that portal.

use crystals_core::{CellCoord, Direction, EntityId, RoomCoord, RoomName, WorldError};
use crystals_world::World;
use tracing::debug;

/// Result of a single traversal step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The destination column was outside the room or not walkable.
    Blocked,
    /// The entity moved within the focused room.
    Moved {
        /// Coordinates the entity landed on.
        to: RoomCoord,
    },
    /// The entity stepped onto a portal and arrived in another room.
    Portaled {
        /// Room that became focused.
        room: RoomName,
        /// Coordinates the entity arrived on.
        arrival: RoomCoord,
    },
}

/// Running totals of traversal outcomes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TraversalTally {
    /// Steps refused by the world.
    pub blocked: u32,
    /// Steps that stayed within a room.
    pub moved: u32,
    /// Steps that ended with a portal transition.
    pub portaled: u32,
}

/// Stateful driver that steps entities and follows portals.
#[derive(Debug, Default)]
pub struct Traversal {
    tally: TraversalTally,
}

impl Traversal {
    /// Steps `entity` one tile in `direction`.
    pub fn step_toward(
        &mut self,
        world: &mut World,
        entity: EntityId,
        direction: Direction,
    ) -> Result<StepOutcome, WorldError> {
        let (dx, dy) = direction.delta();
        self.step(world, entity, dx, dy)
    }

    /// Steps `entity` by `(dx, dy)` and follows any portal it lands on.
    ///
    /// A step that would leave the entity's reach is blocked before the world
    /// sees it, so the entity keeps its facing.
    pub fn step(
        &mut self,
        world: &mut World,
        entity: EntityId,
        dx: i32,
        dy: i32,
    ) -> Result<StepOutcome, WorldError> {
        if !within_reach(world, entity, dx, dy)? {
            debug!(entity = %entity, dx, dy, "step_out_of_reach");
            self.tally.blocked = self.tally.blocked.saturating_add(1);
            return Ok(StepOutcome::Blocked);
        }
        if !world.step_entity(entity, dx, dy)? {
            self.tally.blocked = self.tally.blocked.saturating_add(1);
            return Ok(StepOutcome::Blocked);
        }

        let landed = world.focus().coordinates_of(entity)?;
        let Some(portal) = world.get_portal(landed.cell(), None)?.cloned() else {
            self.tally.moved = self.tally.moved.saturating_add(1);
            return Ok(StepOutcome::Moved { to: landed });
        };

        debug!(
            entity = %entity,
            cell = %landed.cell(),
            to = %portal.to_room(),
            "portal_reached"
        );
        let arrival = world.portal_entity(entity, &portal)?;
        self.tally.portaled = self.tally.portaled.saturating_add(1);
        Ok(StepOutcome::Portaled {
            room: portal.to_room().clone(),
            arrival,
        })
    }

    /// Totals accumulated since the system was created.
    #[must_use]
    pub const fn tally(&self) -> TraversalTally {
        self.tally
    }
}

/// Reports whether the step target lies inside the entity's reach.
///
/// Targets off the room's grid are left for the world to refuse.
fn within_reach(world: &World, entity: EntityId, dx: i32, dy: i32) -> Result<bool, WorldError> {
    let room = world.focus();
    let Some(traveller) = room.entity(entity) else {
        return Ok(true);
    };
    let origin = room.coordinates_of(entity)?;
    let column = u32::try_from(i64::from(origin.column()) + i64::from(dx));
    let row = u32::try_from(i64::from(origin.row()) + i64::from(dy));
    Ok(match (column, row) {
        (Ok(column), Ok(row)) => traveller.is_in_range(CellCoord::new(column, row)),
        _ => true,
    })
}
