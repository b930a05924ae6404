//! Static portal graph linking rooms.

use std::collections::HashMap;

use crystals_core::{CellCoord, Portal, RoomName, WorldError};

use crate::Room;

/// Portals indexed by source cell and paired with their return portals.
#[derive(Debug)]
pub(crate) struct PortalGraph {
    portals: Vec<Portal>,
    by_source: HashMap<RoomName, HashMap<CellCoord, usize>>,
    returns: Vec<Option<usize>>,
}

impl PortalGraph {
    /// Validates and indexes the portals against the provided rooms.
    ///
    /// `room` resolves a name to its room; unknown names are rejected.
    pub(crate) fn build<'a, F>(portals: Vec<Portal>, room: F) -> Result<Self, WorldError>
    where
        F: Fn(&str) -> Option<&'a Room>,
    {
        let mut by_source: HashMap<RoomName, HashMap<CellCoord, usize>> = HashMap::new();
        for (index, portal) in portals.iter().enumerate() {
            let Some(from) = room(portal.from_room().as_str()) else {
                return Err(unknown_room(portal.from_room()));
            };
            if room(portal.to_room().as_str()).is_none() {
                return Err(unknown_room(portal.to_room()));
            }
            if from.check_cell(portal.source()).is_err() {
                return Err(WorldError::PortalOutOfBounds {
                    room: portal.from_room().clone(),
                    cell: portal.source(),
                });
            }
            let cells = by_source.entry(portal.from_room().clone()).or_default();
            if cells.insert(portal.source(), index).is_some() {
                return Err(WorldError::DuplicatePortal {
                    room: portal.from_room().clone(),
                    cell: portal.source(),
                });
            }
        }

        let mut returns = Vec::with_capacity(portals.len());
        for portal in &portals {
            let mut candidates = portals.iter().enumerate().filter(|(_, candidate)| {
                candidate.from_room() == portal.to_room()
                    && candidate.to_room() == portal.from_room()
            });
            let paired = candidates.next().map(|(index, _)| index);
            if candidates.next().is_some() {
                return Err(WorldError::AmbiguousReturnPortal {
                    from: portal.from_room().clone(),
                    to: portal.to_room().clone(),
                });
            }
            returns.push(paired);
        }

        Ok(Self {
            portals,
            by_source,
            returns,
        })
    }

    /// Portal leaving `cell` of `room`, if any.
    pub(crate) fn at(&self, room: &str, cell: CellCoord) -> Option<&Portal> {
        self.index_at(room, cell).map(|index| &self.portals[index])
    }

    /// Index of the registered portal equal to `portal`.
    pub(crate) fn index_of(&self, portal: &Portal) -> Option<usize> {
        self.index_at(portal.from_room().as_str(), portal.source())
            .filter(|index| &self.portals[*index] == portal)
    }

    /// Portal that receives travellers arriving through the portal at `index`.
    pub(crate) fn return_of(&self, index: usize) -> Option<&Portal> {
        self.returns
            .get(index)
            .copied()
            .flatten()
            .map(|paired| &self.portals[paired])
    }

    /// Every portal in construction order.
    pub(crate) fn iter(&self) -> impl Iterator<Item = &Portal> {
        self.portals.iter()
    }

    fn index_at(&self, room: &str, cell: CellCoord) -> Option<usize> {
        self.by_source.get(room)?.get(&cell).copied()
    }
}

fn unknown_room(name: &RoomName) -> WorldError {
    WorldError::UnknownRoom {
        name: name.to_string(),
    }
}
