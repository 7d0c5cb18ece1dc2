//! In-memory room directory and state repository.
//!
//! Backs the development binary and the test suites. One store instance
//! holds the rooms of a single domain together with their typed state.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::foundation::{DomainError, ErrorCode, RoomId, RoomUser, UserId};
use crate::domain::room::{Member, Membership, Room, RoomState};
use crate::ports::{RoomDirectory, RoomStateReader, StateChange, StateRepository};

struct MemberRow {
    user: RoomUser,
    membership: Membership,
}

struct RoomRecord<S> {
    room: Room,
    members: Vec<MemberRow>,
    facilitators: HashSet<UserId>,
    state: S,
}

impl<S> RoomRecord<S> {
    fn row_mut(&mut self, user_id: &UserId) -> Option<&mut MemberRow> {
        self.members.iter_mut().find(|row| &row.user.id == user_id)
    }
}

/// Rooms, memberships and state for one domain, held in process memory.
pub struct InMemoryRoomStore<S> {
    rooms: RwLock<HashMap<RoomId, RoomRecord<S>>>,
    /// Error returned by every membership lookup, for failure testing.
    lookup_error: RwLock<Option<DomainError>>,
}

impl<S: RoomState> Default for InMemoryRoomStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: RoomState> InMemoryRoomStore<S> {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            lookup_error: RwLock::new(None),
        }
    }

    /// Creates (or replaces) a room with default state.
    pub fn insert_room(
        &self,
        room: Room,
        facilitators: impl IntoIterator<Item = UserId>,
    ) -> Result<(), DomainError> {
        let record = RoomRecord {
            facilitators: facilitators.into_iter().collect(),
            members: Vec::new(),
            state: S::default(),
            room,
        };
        self.rooms
            .write()
            .map_err(lock_error)?
            .insert(record.room.id.clone(), record);
        Ok(())
    }

    /// Makes every subsequent membership lookup fail with `error`.
    pub fn fail_lookups_with(&self, error: Option<DomainError>) {
        if let Ok(mut slot) = self.lookup_error.write() {
            *slot = error;
        }
    }

    fn read_record<T>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&RoomRecord<S>) -> T,
    ) -> Result<T, DomainError> {
        let rooms = self.rooms.read().map_err(lock_error)?;
        let record = rooms
            .get(room_id)
            .ok_or_else(|| DomainError::room_not_found(room_id))?;
        Ok(f(record))
    }

    fn write_record<T>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&mut RoomRecord<S>) -> Result<T, DomainError>,
    ) -> Result<T, DomainError> {
        let mut rooms = self.rooms.write().map_err(lock_error)?;
        let record = rooms
            .get_mut(room_id)
            .ok_or_else(|| DomainError::room_not_found(room_id))?;
        f(record)
    }
}

fn lock_error<T>(_: PoisonError<T>) -> DomainError {
    DomainError::new(ErrorCode::InternalError, "Room store lock poisoned")
}

#[async_trait]
impl<S: RoomState> RoomDirectory for InMemoryRoomStore<S> {
    async fn get_room(&self, room_id: &RoomId) -> Result<Room, DomainError> {
        self.read_record(room_id, |record| record.room.clone())
    }

    async fn get_membership(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<Membership>, DomainError> {
        if let Some(error) = self.lookup_error.read().map_err(lock_error)?.clone() {
            return Err(error);
        }
        self.read_record(room_id, |record| {
            record
                .members
                .iter()
                .find(|row| &row.user.id == user_id)
                .map(|row| row.membership)
        })
    }

    async fn set_membership_active(
        &self,
        room_id: &RoomId,
        user: &RoomUser,
        active: bool,
    ) -> Result<(), DomainError> {
        self.write_record(room_id, |record| {
            match record.row_mut(&user.id) {
                Some(row) => {
                    row.user = user.clone();
                    row.membership.active = active;
                    if active {
                        row.membership.abandoned = false;
                    }
                }
                None => record.members.push(MemberRow {
                    user: user.clone(),
                    membership: Membership {
                        active,
                        abandoned: false,
                    },
                }),
            }
            Ok(())
        })
    }

    async fn abandon_membership(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), DomainError> {
        self.write_record(room_id, |record| {
            let row = record.row_mut(user_id).ok_or_else(|| {
                DomainError::new(ErrorCode::MembershipNotFound, "User is not a member of this room")
            })?;
            row.membership.abandoned = true;
            row.membership.active = false;
            Ok(())
        })
    }

    async fn authorize_elevated(&self, room_id: &RoomId, user_id: &UserId) -> Result<bool, DomainError> {
        self.read_record(room_id, |record| record.facilitators.contains(user_id))
    }

    async fn promote_facilitator(&self, room_id: &RoomId, user_id: &UserId) -> Result<(), DomainError> {
        self.write_record(room_id, |record| {
            if record.row_mut(user_id).is_none() {
                return Err(DomainError::new(
                    ErrorCode::MembershipNotFound,
                    "Only members can be promoted",
                ));
            }
            record.facilitators.insert(user_id.clone());
            Ok(())
        })
    }

    async fn members(&self, room_id: &RoomId) -> Result<Vec<Member>, DomainError> {
        self.read_record(room_id, |record| {
            record
                .members
                .iter()
                .map(|row| {
                    let facilitator = record.facilitators.contains(&row.user.id);
                    Member::from_user(&row.user, row.membership, facilitator)
                })
                .collect()
        })
    }
}

#[async_trait]
impl<S: RoomState> StateRepository<S> for InMemoryRoomStore<S> {
    async fn load(&self, room_id: &RoomId) -> Result<S, DomainError> {
        self.read_record(room_id, |record| record.state.clone())
    }

    async fn modify(&self, room_id: &RoomId, change: StateChange<S>) -> Result<Value, DomainError> {
        self.write_record(room_id, |record| {
            let mut next = record.state.clone();
            let output = change(&mut next)?;
            record.state = next;
            Ok(output)
        })
    }
}

#[async_trait]
impl<S: RoomState> RoomStateReader for InMemoryRoomStore<S> {
    async fn state_view(&self, room_id: &RoomId) -> Result<Value, DomainError> {
        self.read_record(room_id, |record| record.state.view())
    }
}
