use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::backends::Journal;
use crate::db::{room, Error, RoomStore};

/// Room rows kept in memory; writes go through the shared journal.
pub(crate) struct InMemoryRoomStore {
    journal: Arc<Journal>,
    rooms: Mutex<HashMap<room::Id, room::Object>>,
}

impl InMemoryRoomStore {
    pub(crate) fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            rooms: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(&self, room: room::Object) {
        self.rooms
            .lock()
            .expect("lock")
            .insert(room.id.clone(), room);
    }

    pub(crate) fn get(&self, id: &room::Id) -> Option<room::Object> {
        self.rooms.lock().expect("lock").get(id).cloned()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn update_room(
        &self,
        id: &room::Id,
        provisioning: &room::Provisioning,
    ) -> Result<(), Error> {
        self.journal
            .record(format!("store.update_room {}", id))
            .map_err(|_| Error::Graphql("update failed".to_owned()))?;

        let mut rooms = self.rooms.lock().expect("lock");
        let room = rooms
            .get_mut(id)
            .ok_or_else(|| Error::RoomNotFound(id.to_owned()))?;
        room.apply(provisioning);

        Ok(())
    }

    async fn find_room(&self, id: &room::Id) -> Result<Option<room::Object>, Error> {
        Ok(self.get(id))
    }

    async fn find_room_by_session_id(
        &self,
        session_id: &str,
    ) -> Result<Option<room::Object>, Error> {
        Ok(self
            .rooms
            .lock()
            .expect("lock")
            .values()
            .find(|room| room.session_id.as_deref() == Some(session_id))
            .cloned())
    }
}
