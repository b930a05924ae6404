use crystals_core::{CellCoord, Direction, Entity, EntityId, Portal, Reach, RoomCoord, WorldError};
use crystals_system_traversal::{StepOutcome, Traversal, TraversalTally};
use crystals_world::{query, Room, World};

const HALL: &str = "hall";
const VAULT: &str = "vault";

fn explorer() -> EntityId {
    EntityId::new(1)
}

fn world_with_doorway() -> World {
    let mut hall = Room::empty(HALL, 4, 1).expect("hall");
    let _ = hall.add_layer(None);
    hall.place(
        Entity::new(explorer(), "explorer", false),
        RoomCoord::new(0, 0, 1),
    )
    .expect("free cell");
    hall.place(
        Entity::new(EntityId::new(2), "pillar", false),
        RoomCoord::new(1, 0, 0),
    )
    .expect("free cell");
    let vault = Room::empty(VAULT, 3, 3).expect("vault");
    World::new(
        [hall, vault],
        vec![
            Portal::new(3, 0, HALL, VAULT),
            Portal::new(0, 2, VAULT, HALL),
        ],
        HALL,
    )
    .expect("valid world")
}

#[test]
fn blocked_step_reports_blocked() {
    let mut world = world_with_doorway();
    let mut traversal = Traversal::default();

    let outcome = traversal
        .step_toward(&mut world, explorer(), Direction::East)
        .expect("explorer in focus");

    assert_eq!(outcome, StepOutcome::Blocked);
    assert_eq!(
        traversal.tally(),
        TraversalTally {
            blocked: 1,
            ..TraversalTally::default()
        }
    );
}

#[test]
fn step_onto_portal_cell_crosses_into_destination() {
    let mut world = world_with_doorway();
    let _ = world
        .remove_entity(RoomCoord::new(1, 0, 0), None)
        .expect("in bounds");
    let mut traversal = Traversal::default();

    for expected in [1, 2] {
        let outcome = traversal
            .step_toward(&mut world, explorer(), Direction::East)
            .expect("explorer in focus");
        assert_eq!(
            outcome,
            StepOutcome::Moved {
                to: RoomCoord::new(expected, 0, 1)
            }
        );
    }

    let outcome = traversal
        .step_toward(&mut world, explorer(), Direction::East)
        .expect("explorer in focus");

    assert_eq!(
        outcome,
        StepOutcome::Portaled {
            room: VAULT.into(),
            arrival: RoomCoord::new(0, 2, 1),
        }
    );
    assert_eq!(query::focus_name(&world).as_str(), VAULT);
    assert_eq!(
        traversal.tally(),
        TraversalTally {
            blocked: 0,
            moved: 2,
            portaled: 1,
        }
    );
}

#[test]
fn stepping_back_onto_arrival_portal_returns() {
    let mut world = world_with_doorway();
    let _ = world
        .remove_entity(RoomCoord::new(1, 0, 0), None)
        .expect("in bounds");
    let hall_portal = world
        .get_portal(CellCoord::new(3, 0), None)
        .expect("focused room")
        .cloned()
        .expect("hall portal");
    let _ = world
        .portal_entity(explorer(), &hall_portal)
        .expect("traversed");
    let mut traversal = Traversal::default();

    let away = traversal
        .step_toward(&mut world, explorer(), Direction::East)
        .expect("explorer in focus");
    assert_eq!(
        away,
        StepOutcome::Moved {
            to: RoomCoord::new(1, 2, 1)
        }
    );

    let back = traversal
        .step_toward(&mut world, explorer(), Direction::West)
        .expect("explorer in focus");
    assert_eq!(
        back,
        StepOutcome::Portaled {
            room: HALL.into(),
            arrival: RoomCoord::new(3, 0, 1),
        }
    );
}

#[test]
fn step_of_absent_entity_is_an_error() {
    let mut world = world_with_doorway();
    let mut traversal = Traversal::default();
    let result = traversal.step(&mut world, EntityId::new(40), 1, 0);
    assert!(matches!(result, Err(WorldError::Room(_))));
    assert_eq!(traversal.tally(), TraversalTally::default());
}

#[test]
fn steps_leaving_reach_are_blocked() {
    let mut hall = Room::empty(HALL, 4, 1).expect("hall");
    let _ = hall.add_layer(None);
    let guard = Entity::new(explorer(), "guard", false)
        .with_reach(Reach::new(CellCoord::new(0, 0), Some(1), None));
    hall.place(guard, RoomCoord::new(0, 0, 1))
        .expect("free cell");
    let mut world = World::new([hall], Vec::new(), HALL).expect("valid world");
    let mut traversal = Traversal::default();

    let first = traversal
        .step_toward(&mut world, explorer(), Direction::East)
        .expect("guard in focus");
    assert_eq!(
        first,
        StepOutcome::Moved {
            to: RoomCoord::new(1, 0, 1)
        }
    );

    let second = traversal
        .step_toward(&mut world, explorer(), Direction::East)
        .expect("guard in focus");
    assert_eq!(second, StepOutcome::Blocked);
    assert_eq!(
        query::locate(&world, explorer()).map(|(_, coord)| coord),
        Some(RoomCoord::new(1, 0, 1))
    );
    assert_eq!(
        traversal.tally(),
        TraversalTally {
            blocked: 1,
            moved: 1,
            portaled: 0,
        }
    );
}
