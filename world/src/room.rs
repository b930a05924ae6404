//! Layered occupancy grid backing a single room.

use std::collections::HashMap;

use crystals_core::{
    CellCoord, Entity, EntityId, Presentation, Rejected, RenderOrder, RoomCoord, RoomError,
    RoomName, TileTransform,
};
use tracing::debug;

/// Initial contents of a room, indexed as `layers[z][row][column]`.
pub type LayerGrid = Vec<Vec<Vec<Option<Entity>>>>;

/// Ordered stack of equally sized grids, each cell holding at most one entity.
///
/// Cells live in a single flat arena indexed by
/// `(layer * height + row) * width + column`. The room owns every entity
/// placed in it and keeps one render order token per layer; tokens always
/// equal their layer index.
#[derive(Debug)]
pub struct Room {
    name: RoomName,
    width: u32,
    height: u32,
    transform: TileTransform,
    cells: Vec<Option<EntityId>>,
    render_orders: Vec<RenderOrder>,
    occupants: HashMap<EntityId, Entity>,
}

impl Room {
    /// Builds a room from its initial layers and attaches every occupant.
    pub fn new(
        name: impl Into<RoomName>,
        width: u32,
        height: u32,
        layers: LayerGrid,
    ) -> Result<Self, RoomError> {
        let name = name.into();
        if width == 0 || height == 0 || layers.is_empty() {
            return Err(RoomError::EmptyRoom { room: name });
        }

        let width_usize = usize::try_from(width).unwrap_or(usize::MAX);
        let height_usize = usize::try_from(height).unwrap_or(usize::MAX);
        let malformed = |layer| RoomError::MalformedLayer {
            room: name.clone(),
            layer,
            width,
            height,
        };

        let mut room = Self {
            name: name.clone(),
            width,
            height,
            transform: TileTransform::default(),
            cells: Vec::new(),
            render_orders: Vec::with_capacity(layers.len()),
            occupants: HashMap::new(),
        };

        for (z, layer) in layers.into_iter().enumerate() {
            if layer.len() != height_usize || layer.iter().any(|row| row.len() != width_usize) {
                return Err(malformed(z));
            }
            let _ = room.add_layer(None);
            for (y, row) in layer.into_iter().enumerate() {
                for (x, slot) in row.into_iter().enumerate() {
                    let Some(entity) = slot else {
                        continue;
                    };
                    let coord = RoomCoord::new(index_u32(x), index_u32(y), index_u32(z));
                    room.place(entity, coord).map_err(Rejected::into_reason)?;
                }
            }
        }

        Ok(room)
    }

    /// Builds a room with a single empty layer.
    pub fn empty(name: impl Into<RoomName>, width: u32, height: u32) -> Result<Self, RoomError> {
        let height_usize = usize::try_from(height).unwrap_or(0);
        let width_usize = usize::try_from(width).unwrap_or(0);
        let layer = vec![vec![None; width_usize]; height_usize];
        Self::new(name, width, height, vec![layer])
    }

    /// Name that keys the room within its world.
    #[must_use]
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// Number of columns in every layer.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows in every layer.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of layers currently stacked in the room.
    #[must_use]
    pub fn layer_count(&self) -> u32 {
        index_u32(self.render_orders.len())
    }

    /// Render order tokens, co-indexed with layers.
    #[must_use]
    pub fn render_orders(&self) -> &[RenderOrder] {
        &self.render_orders
    }

    /// Pixel transform used when attaching occupants.
    #[must_use]
    pub const fn transform(&self) -> TileTransform {
        self.transform
    }

    /// Replaces the pixel transform and re-attaches every occupant.
    ///
    /// A zero tile size is refused and the current transform is kept.
    pub fn set_transform(&mut self, transform: TileTransform) -> Result<(), RoomError> {
        if transform.tile_size() == 0 {
            return Err(RoomError::ZeroTileSize {
                room: self.name.clone(),
            });
        }
        self.transform = transform;
        let _ = self.reattach();
        Ok(())
    }

    /// Reports whether every layer's cell at `(column, row)` is empty or walkable.
    ///
    /// Coordinates outside the room are never walkable.
    #[must_use]
    pub fn is_walkable(&self, column: i64, row: i64) -> bool {
        let Some(offset) = self.cell_offset(column, row) else {
            return false;
        };
        let area = self.layer_area();
        self.cells
            .iter()
            .skip(offset)
            .step_by(area)
            .flatten()
            .all(|id| self.occupants.get(id).map_or(true, Entity::is_walkable))
    }

    /// Stacks a new empty layer and returns its index.
    ///
    /// Without an index, or with one at or past the top, the layer is appended.
    /// Otherwise it is inserted at `at` and every layer from `at` upward moves
    /// one step up in draw order.
    pub fn add_layer(&mut self, at: Option<u32>) -> u32 {
        let count = self.render_orders.len();
        let index = at
            .and_then(|at| usize::try_from(at).ok())
            .filter(|at| *at < count)
            .unwrap_or(count);

        let area = self.layer_area();
        let offset = index * area;
        let _ = self
            .cells
            .splice(offset..offset, std::iter::repeat(None).take(area));

        for order in &mut self.render_orders[index..] {
            *order = order.next();
        }
        self.render_orders
            .insert(index, RenderOrder::new(index_u32(index)));
        debug_assert!(self
            .render_orders
            .iter()
            .enumerate()
            .all(|(z, order)| order.get() == index_u32(z)));

        if index < count {
            self.attach_from(offset + area);
        }

        debug!(room = %self.name, layer = index, layer_count = count + 1, "layer_added");
        index_u32(index)
    }

    /// Places an entity, discarding and returning whatever occupied the cell.
    ///
    /// The displaced entity is detached. Fails without touching the room when
    /// the coordinate is outside the room or the entity already sits in
    /// another cell.
    pub fn place_at(
        &mut self,
        mut entity: Entity,
        coord: RoomCoord,
    ) -> Result<Option<Entity>, Rejected> {
        let index = match self.slot(coord) {
            Ok(index) => index,
            Err(reason) => return Err(Rejected::new(entity, reason)),
        };

        let id = entity.id();
        if self.cells[index] != Some(id) && self.occupants.contains_key(&id) {
            let reason = RoomError::DuplicateEntity {
                room: self.name.clone(),
                entity: id,
            };
            return Err(Rejected::new(entity, reason));
        }

        let displaced = match self.cells[index].replace(id) {
            Some(previous) if previous != id => self.occupants.remove(&previous).map(|mut old| {
                old.detach();
                old
            }),
            _ => None,
        };

        entity.attach(self.presentation_for(coord));
        let _ = self.occupants.insert(id, entity);
        debug!(room = %self.name, entity = %id, %coord, "entity_placed");
        Ok(displaced)
    }

    /// Places an entity into an empty cell.
    ///
    /// Refuses with [`RoomError::OccupiedCell`] when the cell is taken.
    pub fn place(&mut self, entity: Entity, coord: RoomCoord) -> Result<(), Rejected> {
        let index = match self.slot(coord) {
            Ok(index) => index,
            Err(reason) => return Err(Rejected::new(entity, reason)),
        };
        if let Some(occupant) = self.cells[index] {
            let reason = RoomError::OccupiedCell {
                room: self.name.clone(),
                coord,
                occupant,
            };
            return Err(Rejected::new(entity, reason));
        }

        self.place_at(entity, coord).map(|_| ())
    }

    /// Removes and returns the occupant of the cell, leaving it empty.
    pub fn pop_at(&mut self, coord: RoomCoord) -> Result<Option<Entity>, RoomError> {
        let index = self.slot(coord)?;
        let popped = self.cells[index]
            .take()
            .and_then(|id| self.occupants.remove(&id))
            .map(|mut entity| {
                entity.detach();
                entity
            });
        if let Some(entity) = &popped {
            debug!(room = %self.name, entity = %entity.id(), %coord, "entity_removed");
        }
        Ok(popped)
    }

    /// Recovers the coordinates of an entity from its presentation state.
    pub fn coordinates_of(&self, id: EntityId) -> Result<RoomCoord, RoomError> {
        let entity = self
            .occupants
            .get(&id)
            .ok_or_else(|| RoomError::EntityNotInRoom {
                room: self.name.clone(),
                entity: id,
            })?;
        let detached = || RoomError::DetachedEntity {
            room: self.name.clone(),
            entity: id,
        };

        let presentation = entity
            .presentation()
            .filter(|presentation| presentation.room() == &self.name)
            .ok_or_else(detached)?;
        let cell = self
            .transform
            .to_cell(presentation.position())
            .ok_or_else(detached)?;
        let layer = self
            .render_orders
            .iter()
            .position(|order| *order == presentation.order())
            .ok_or_else(detached)?;

        let coord = RoomCoord::from_cell(cell, index_u32(layer));
        match self.slot(coord) {
            Ok(index) if self.cells[index] == Some(id) => Ok(coord),
            _ => Err(detached()),
        }
    }

    /// Rewrites every occupant's presentation state. Returns the number of occupants.
    pub fn reattach(&mut self) -> usize {
        self.attach_from(0);
        self.occupants.len()
    }

    /// Entity occupying the coordinate, if any.
    #[must_use]
    pub fn occupant(&self, coord: RoomCoord) -> Option<&Entity> {
        let index = self.slot(coord).ok()?;
        self.cells[index].and_then(|id| self.occupants.get(&id))
    }

    /// Entity with the identifier, if it is placed in the room.
    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.occupants.get(&id)
    }

    /// Reports whether the entity is placed in the room.
    #[must_use]
    pub fn contains(&self, id: EntityId) -> bool {
        self.occupants.contains_key(&id)
    }

    /// Iterates occupants in layer-major, then row-major order.
    pub fn entities(&self) -> impl Iterator<Item = (RoomCoord, &Entity)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(index, slot)| {
            let entity = slot.and_then(|id| self.occupants.get(&id))?;
            Some((self.coord_at(index), entity))
        })
    }

    pub(crate) fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.occupants.get_mut(&id)
    }

    /// Confirms the cell lies within the room's columns and rows.
    pub(crate) fn check_cell(&self, cell: CellCoord) -> Result<(), RoomError> {
        self.cell_offset(i64::from(cell.column()), i64::from(cell.row()))
            .map(|_| ())
            .ok_or_else(|| RoomError::CellOutOfBounds {
                room: self.name.clone(),
                column: i64::from(cell.column()),
                row: i64::from(cell.row()),
            })
    }

    fn attach_from(&mut self, start: usize) {
        let area = self.layer_area();
        let width = self.width_usize();
        for (index, slot) in self.cells.iter().enumerate().skip(start) {
            let Some(entity) = slot.and_then(|id| self.occupants.get_mut(&id)) else {
                continue;
            };
            let coord = coord_from_index(index, area, width);
            entity.attach(presentation(
                &self.name,
                self.transform,
                &self.render_orders,
                coord,
            ));
        }
    }

    fn presentation_for(&self, coord: RoomCoord) -> Presentation {
        presentation(&self.name, self.transform, &self.render_orders, coord)
    }

    fn slot(&self, coord: RoomCoord) -> Result<usize, RoomError> {
        self.check_cell(coord.cell())?;
        let layer_count = self.layer_count();
        if coord.layer() >= layer_count {
            return Err(RoomError::LayerOutOfRange {
                room: self.name.clone(),
                layer: coord.layer(),
                layer_count,
            });
        }
        let offset = self
            .cell_offset(i64::from(coord.column()), i64::from(coord.row()))
            .unwrap_or(0);
        let layer = usize::try_from(coord.layer()).unwrap_or(usize::MAX);
        Ok(layer * self.layer_area() + offset)
    }

    fn cell_offset(&self, column: i64, row: i64) -> Option<usize> {
        if column < 0 || row < 0 || column >= i64::from(self.width) || row >= i64::from(self.height)
        {
            return None;
        }
        let column = usize::try_from(column).ok()?;
        let row = usize::try_from(row).ok()?;
        Some(row * self.width_usize() + column)
    }

    fn coord_at(&self, index: usize) -> RoomCoord {
        coord_from_index(index, self.layer_area(), self.width_usize())
    }

    fn layer_area(&self) -> usize {
        self.width_usize() * usize::try_from(self.height).unwrap_or(0)
    }

    fn width_usize(&self) -> usize {
        usize::try_from(self.width).unwrap_or(0)
    }
}

fn presentation(
    room: &RoomName,
    transform: TileTransform,
    render_orders: &[RenderOrder],
    coord: RoomCoord,
) -> Presentation {
    let order = usize::try_from(coord.layer())
        .ok()
        .and_then(|layer| render_orders.get(layer).copied())
        .unwrap_or(RenderOrder::new(coord.layer()));
    Presentation::new(room.clone(), transform.to_pixels(coord.cell()), order)
}

fn coord_from_index(index: usize, area: usize, width: usize) -> RoomCoord {
    let layer = index / area;
    let within = index % area;
    RoomCoord::new(
        index_u32(within % width),
        index_u32(within / width),
        index_u32(layer),
    )
}

fn index_u32(index: usize) -> u32 {
    u32::try_from(index).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{LayerGrid, Room};
    use crystals_core::{Entity, EntityId, RenderOrder, RoomCoord, RoomError};

    fn wall(id: u32) -> Option<Entity> {
        Some(Entity::new(EntityId::new(id), "wall", false))
    }

    fn floor(id: u32) -> Option<Entity> {
        Some(Entity::new(EntityId::new(id), "floor", true))
    }

    fn sample_room() -> Room {
        let layers: LayerGrid = vec![
            vec![
                vec![wall(1), wall(2), wall(3)],
                vec![wall(4), floor(5), wall(6)],
                vec![wall(7), floor(8), floor(9)],
            ],
            vec![
                vec![None, None, None],
                vec![None, None, None],
                vec![None, None, wall(10)],
            ],
        ];
        Room::new("a room", 3, 3, layers).expect("valid room")
    }

    fn dense(room: &Room) -> bool {
        room.render_orders()
            .iter()
            .enumerate()
            .all(|(z, order)| *order == RenderOrder::new(z as u32))
    }

    #[test]
    fn walkability_considers_every_layer() {
        let room = sample_room();
        assert!(!room.is_walkable(0, 0));
        assert!(room.is_walkable(1, 1));
        assert!(!room.is_walkable(2, 2), "upper layer wall blocks the column");
    }

    #[test]
    fn walkability_fails_closed_outside_room() {
        let room = sample_room();
        for (column, row) in [(-1, 0), (0, -1), (3, 0), (0, 3), (i64::MAX, 1)] {
            assert!(!room.is_walkable(column, row), "({column}, {row})");
        }
    }

    #[test]
    fn initial_occupants_report_their_coordinates() {
        let room = sample_room();
        assert_eq!(
            room.coordinates_of(EntityId::new(1)),
            Ok(RoomCoord::new(0, 0, 0))
        );
        assert_eq!(
            room.coordinates_of(EntityId::new(10)),
            Ok(RoomCoord::new(2, 2, 1))
        );
    }

    #[test]
    fn appended_layer_is_empty_and_tokens_stay_dense() {
        let mut room = sample_room();
        for at in [None, Some(3), Some(40)] {
            let before = room.layer_count();
            let index = room.add_layer(at);
            assert_eq!(index, before);
            assert_eq!(room.layer_count(), before + 1);
            assert!(dense(&room));
            assert_eq!(
                room.entities()
                    .filter(|(coord, _)| coord.layer() == index)
                    .count(),
                0
            );
        }
    }

    #[test]
    fn inserted_layer_shifts_upper_occupants_in_draw_order() {
        let mut room = sample_room();
        let index = room.add_layer(Some(0));
        assert_eq!(index, 0);
        assert_eq!(room.layer_count(), 3);
        assert!(dense(&room));
        assert_eq!(
            room.coordinates_of(EntityId::new(1)),
            Ok(RoomCoord::new(0, 0, 1))
        );
        assert_eq!(
            room.coordinates_of(EntityId::new(10)),
            Ok(RoomCoord::new(2, 2, 2))
        );
        let order = room
            .entity(EntityId::new(10))
            .and_then(|entity| entity.presentation())
            .map(|presentation| presentation.order());
        assert_eq!(order, Some(RenderOrder::new(2)));
    }

    #[test]
    fn place_refuses_occupied_cell_and_returns_entity() {
        let mut room = sample_room();
        let dummy = Entity::new(EntityId::new(50), "tree", false);
        let rejected = room
            .place(dummy, RoomCoord::new(0, 0, 0))
            .expect_err("cell is taken");
        assert!(matches!(
            rejected.reason(),
            RoomError::OccupiedCell { occupant, .. } if *occupant == EntityId::new(1)
        ));
        let (entity, _) = rejected.into_parts();
        assert_eq!(entity.id(), EntityId::new(50));
        assert_eq!(
            room.occupant(RoomCoord::new(0, 0, 0)).map(Entity::id),
            Some(EntityId::new(1))
        );
    }

    #[test]
    fn place_into_empty_cell_attaches_entity() {
        let mut room = sample_room();
        let dummy = Entity::new(EntityId::new(50), "tree", false);
        room.place(dummy, RoomCoord::new(1, 1, 1))
            .expect("cell is free");
        let placed = room.entity(EntityId::new(50)).expect("placed");
        let presentation = placed.presentation().expect("attached");
        assert_eq!(presentation.room().as_str(), "a room");
        assert_eq!(presentation.order(), RenderOrder::new(1));
        assert_eq!(
            room.coordinates_of(EntityId::new(50)),
            Ok(RoomCoord::new(1, 1, 1))
        );
    }

    #[test]
    fn place_at_overwrites_and_detaches_previous_occupant() {
        let mut room = sample_room();
        let dummy = Entity::new(EntityId::new(50), "tree", false);
        let displaced = room
            .place_at(dummy, RoomCoord::new(0, 0, 0))
            .expect("in bounds")
            .expect("wall displaced");
        assert_eq!(displaced.id(), EntityId::new(1));
        assert!(displaced.presentation().is_none());
        assert!(!room.contains(EntityId::new(1)));
        assert_eq!(
            room.occupant(RoomCoord::new(0, 0, 0)).map(Entity::id),
            Some(EntityId::new(50))
        );
    }

    #[test]
    fn place_at_rejects_entity_already_in_room() {
        let mut room = sample_room();
        let copy = Entity::new(EntityId::new(5), "floor", true);
        let rejected = room
            .place_at(copy, RoomCoord::new(0, 0, 1))
            .expect_err("duplicate");
        assert!(matches!(
            rejected.reason(),
            RoomError::DuplicateEntity { .. }
        ));
        assert!(room.occupant(RoomCoord::new(0, 0, 1)).is_none());
    }

    #[test]
    fn place_rejects_out_of_range_coordinates() {
        let mut room = sample_room();
        let dummy = Entity::new(EntityId::new(50), "tree", false);
        let rejected = room
            .place(dummy, RoomCoord::new(3, 0, 0))
            .expect_err("outside");
        assert!(matches!(
            rejected.reason(),
            RoomError::CellOutOfBounds { .. }
        ));
        let (dummy, _) = rejected.into_parts();
        let rejected = room
            .place(dummy, RoomCoord::new(0, 0, 2))
            .expect_err("no such layer");
        assert!(matches!(
            rejected.reason(),
            RoomError::LayerOutOfRange { layer_count: 2, .. }
        ));
    }

    #[test]
    fn pop_at_empties_cell_and_detaches() {
        let mut room = sample_room();
        let popped = room
            .pop_at(RoomCoord::new(0, 0, 0))
            .expect("in bounds")
            .expect("occupied");
        assert_eq!(popped.name(), "wall");
        assert!(popped.presentation().is_none());
        assert!(room.occupant(RoomCoord::new(0, 0, 0)).is_none());
        assert_eq!(room.pop_at(RoomCoord::new(0, 0, 0)), Ok(None));
    }

    #[test]
    fn coordinates_of_unknown_entity_fails() {
        let room = sample_room();
        assert!(matches!(
            room.coordinates_of(EntityId::new(99)),
            Err(RoomError::EntityNotInRoom { .. })
        ));
    }

    #[test]
    fn transform_change_keeps_coordinates() {
        let mut room = sample_room();
        room.set_transform(crystals_core::TileTransform::new(8, -3, 0))
            .expect("non-zero tile");
        assert_eq!(
            room.coordinates_of(EntityId::new(8)),
            Ok(RoomCoord::new(1, 2, 0))
        );
    }

    #[test]
    fn zero_tile_size_is_refused_and_occupants_stay_locatable() {
        let mut room = sample_room();
        let before = room.transform();
        assert!(matches!(
            room.set_transform(crystals_core::TileTransform::new(0, 0, 0)),
            Err(RoomError::ZeroTileSize { .. })
        ));
        assert_eq!(room.transform(), before);
        assert_eq!(
            room.coordinates_of(EntityId::new(9)),
            Ok(RoomCoord::new(2, 2, 0))
        );
    }

    #[test]
    fn malformed_layers_are_rejected() {
        let layers: LayerGrid = vec![vec![vec![None, None], vec![None]]];
        assert!(matches!(
            Room::new("bad", 2, 2, layers),
            Err(RoomError::MalformedLayer { layer: 0, .. })
        ));
        assert!(matches!(
            Room::new("bad", 2, 2, Vec::new()),
            Err(RoomError::EmptyRoom { .. })
        ));
        assert!(matches!(
            Room::empty("bad", 0, 2),
            Err(RoomError::EmptyRoom { .. })
        ));
    }

    #[test]
    fn duplicate_initial_entities_are_rejected() {
        let layers: LayerGrid = vec![vec![vec![wall(1), wall(1)]]];
        assert!(matches!(
            Room::new("bad", 2, 1, layers),
            Err(RoomError::DuplicateEntity { .. })
        ));
    }

    #[test]
    fn entities_iterate_layer_major() {
        let room = sample_room();
        let order: Vec<_> = room.entities().map(|(_, entity)| entity.id().get()).collect();
        assert_eq!(order, vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10]);
    }
}
