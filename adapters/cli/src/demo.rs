//! Small two-room world used by the command-line walkthrough.

use crystals_core::{
    CellCoord, Entity, EntityId, Portal, Reach, Refused, RoomCoord, TileTransform, WorldError,
};
use crystals_world::{LayerGrid, Room, World};

/// Room the explorer starts in.
pub(crate) const RED_ROOM: &str = "red room";
/// Room on the far side of the doorway.
pub(crate) const BLUE_ROOM: &str = "blue room";
/// Identifier of the entity walked by the CLI.
pub(crate) const EXPLORER: EntityId = EntityId::new(1);

const TROLL: EntityId = EntityId::new(2);
const RED_DOOR: CellCoord = CellCoord::new(5, 2);
const BLUE_DOOR: CellCoord = CellCoord::new(0, 2);

/// Builds the demo world with the explorer standing west of the red doorway.
pub(crate) fn build(transform: TileTransform, start_room: &str) -> Result<World, WorldError> {
    let mut ids = 100;
    let mut red = walled_room(RED_ROOM, 6, 5, RED_DOOR, &mut ids)?;
    let mut blue = walled_room(BLUE_ROOM, 5, 5, BLUE_DOOR, &mut ids)?;
    red.set_transform(transform)?;
    blue.set_transform(transform)?;

    let portals = vec![
        Portal::new(RED_DOOR.column(), RED_DOOR.row(), RED_ROOM, BLUE_ROOM),
        Portal::new(BLUE_DOOR.column(), BLUE_DOOR.row(), BLUE_ROOM, RED_ROOM),
    ];
    let mut world = World::new([red, blue], portals, start_room)?;

    let _ = world
        .add_entity(
            Entity::new(EXPLORER, "explorer", false),
            CellCoord::new(1, 2),
            None,
            Some(RED_ROOM),
        )
        .map_err(Refused::into_reason)?;
    let troll_home = CellCoord::new(3, 3);
    let troll = Entity::new(TROLL, "troll", false)
        .with_reach(Reach::new(troll_home, Some(1), Some(1)));
    let _ = world
        .add_entity(troll, troll_home, Some(1), Some(BLUE_ROOM))
        .map_err(Refused::into_reason)?;
    Ok(world)
}

/// Draws the topmost occupant of every column, top row first.
pub(crate) fn render(room: &Room) -> String {
    let mut out = String::new();
    for row in (0..room.height()).rev() {
        for column in 0..room.width() {
            let top = (0..room.layer_count())
                .rev()
                .find_map(|layer| room.occupant(RoomCoord::new(column, row, layer)));
            out.push(top.map_or(' ', glyph));
        }
        out.push('\n');
    }
    out
}

fn glyph(entity: &Entity) -> char {
    match entity.name() {
        "explorer" => '@',
        "troll" => 'T',
        "doorway" => '+',
        _ if entity.is_walkable() => '.',
        _ => '#',
    }
}

fn walled_room(
    name: &str,
    width: u32,
    height: u32,
    door: CellCoord,
    ids: &mut u32,
) -> Result<Room, WorldError> {
    let mut next = || {
        *ids += 1;
        EntityId::new(*ids)
    };
    let ground: Vec<Vec<Option<Entity>>> = (0..height)
        .map(|row| {
            (0..width)
                .map(|column| {
                    let cell = CellCoord::new(column, row);
                    let edge = column == 0 || row == 0 || column + 1 == width || row + 1 == height;
                    let entity = if cell == door {
                        Entity::new(next(), "doorway", true)
                    } else if edge {
                        Entity::new(next(), "wall", false)
                    } else {
                        Entity::new(next(), "floor", true)
                    };
                    Some(entity)
                })
                .collect()
        })
        .collect();
    let layers: LayerGrid = vec![ground];
    Ok(Room::new(name, width, height, layers)?)
}
