//! In-crate stand-in for the flower/cactus event tree.
//!
//! An `EventTree` is an arena of `Event`s reached only through `EventId` handles, the
//! same shape every other tree type in this crate uses. The root event is synthetic: it
//! always has exactly one child, which is the actual root of the species phylogeny
//! (mirrors `eventTreeToStTree` in the cactus original, which skips the event tree's
//! root and starts from its single child).

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EventId(pub usize);

#[derive(Clone, Debug)]
pub struct Event {
    pub name: i64,
    pub header: String,
    pub branch_length: f64,
    pub outgroup: bool,
    pub parent: Option<EventId>,
    pub children: Vec<EventId>,
}

#[derive(Clone, Debug, Default)]
pub struct EventTree {
    events: Vec<Event>,
}

impl EventTree {
    pub fn new() -> Self {
        EventTree { events: Vec::new() }
    }

    /// Adds an event and returns its handle. `parent` must already be in the tree.
    pub fn add_event(
        &mut self,
        name: i64,
        header: impl Into<String>,
        branch_length: f64,
        outgroup: bool,
        parent: Option<EventId>,
    ) -> EventId {
        let id = EventId(self.events.len());
        self.events.push(Event {
            name,
            header: header.into(),
            branch_length,
            outgroup,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.events[p.0].children.push(id);
        }
        id
    }

    pub fn get(&self, id: EventId) -> &Event {
        &self.events[id.0]
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// The synthetic root: the one event with no parent. Every `EventTree` built via
    /// `add_event` has exactly one.
    pub fn root(&self) -> EventId {
        self.events
            .iter()
            .position(|e| e.parent.is_none())
            .map(EventId)
            .expect("an event tree always has a root")
    }

    pub fn get_by_name(&self, name: i64) -> Option<EventId> {
        self.events.iter().position(|e| e.name == name).map(EventId)
    }

    pub fn ids(&self) -> impl Iterator<Item = EventId> {
        (0..self.events.len()).map(EventId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_exactly_one_child() {
        let mut tree = EventTree::new();
        let root = tree.add_event(0, "ROOT", 0.0, false, None);
        let species_root = tree.add_event(1, "anc", 0.0, false, Some(root));
        tree.add_event(2, "human", 0.1, false, Some(species_root));
        tree.add_event(3, "mouse", 0.2, false, Some(species_root));

        assert_eq!(tree.root(), root);
        assert_eq!(tree.get(root).children.len(), 1);
        assert_eq!(tree.get(root).children[0], species_root);
    }

    #[test]
    fn lookup_by_name() {
        let mut tree = EventTree::new();
        let root = tree.add_event(0, "ROOT", 0.0, false, None);
        let human = tree.add_event(2, "human", 0.1, false, Some(root));
        assert_eq!(tree.get_by_name(2), Some(human));
        assert_eq!(tree.get_by_name(99), None);
    }
}
