//! In-memory repository doubles for service tests.
//!
//! Async methods yield after their reads so that interleavings between
//! concurrent read-compute-write chains actually surface under the
//! single-threaded test runtime.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use lingua_types::error::RepositoryError;
use lingua_types::message::{Correction, Message, MessageId};
use lingua_types::room::{ChatRoom, RatingEntry, RoomId, RoomStatus, pair_key};
use lingua_types::user::{User, UserId};

use crate::repository::message::MessageRepository;
use crate::repository::room::ChatRoomRepository;
use crate::repository::user::UserRepository;

#[derive(Default)]
pub(crate) struct MemoryUsers {
    pub(crate) users: Mutex<HashMap<UserId, User>>,
    /// When set, rating writes fail -- simulates the ledger losing its
    /// persistence step after a dependent write already landed.
    pub(crate) fail_rating_writes: AtomicBool,
}

impl MemoryUsers {
    pub(crate) fn insert(&self, user: User) -> UserId {
        let id = user.id.clone();
        self.users.lock().unwrap().insert(id.clone(), user);
        id
    }

    pub(crate) fn rating_of(&self, user_id: &UserId) -> f64 {
        self.users.lock().unwrap().get(user_id).unwrap().rating
    }
}

impl UserRepository for &MemoryUsers {
    async fn create(&self, user: &User) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Conflict(user.email.clone()));
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user.clone())
    }

    async fn get(&self, user_id: &UserId) -> Result<Option<User>, RepositoryError> {
        let found = self.users.lock().unwrap().get(user_id).cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn set_rating(&self, user_id: &UserId, rating: f64) -> Result<(), RepositoryError> {
        if self.fail_rating_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Query("simulated write failure".into()));
        }
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(user_id).ok_or(RepositoryError::NotFound)?;
        user.rating = rating;
        Ok(())
    }

    async fn set_points(&self, user_id: &UserId, points: i64) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(user_id).ok_or(RepositoryError::NotFound)?;
        user.points = points;
        Ok(())
    }

    async fn get_points(&self, user_id: &UserId) -> Result<i64, RepositoryError> {
        self.users
            .lock()
            .unwrap()
            .get(user_id)
            .map(|u| u.points)
            .ok_or(RepositoryError::NotFound)
    }

    async fn add_report(&self, user_id: &UserId, reporter: &UserId) -> Result<(), RepositoryError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(user_id).ok_or(RepositoryError::NotFound)?;
        if !user.reports.contains(reporter) {
            user.reports.push(reporter.clone());
        }
        Ok(())
    }

    async fn list_pen_pals(&self, user_id: &UserId) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .values()
            .filter(|u| &u.id != user_id && !u.is_banned())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub(crate) struct MemoryRooms {
    pub(crate) rooms: Mutex<HashMap<RoomId, ChatRoom>>,
}

impl ChatRoomRepository for &MemoryRooms {
    async fn create(&self, room: &ChatRoom) -> Result<ChatRoom, RepositoryError> {
        let mut rooms = self.rooms.lock().unwrap();
        if rooms.values().any(|r| r.pair_key() == room.pair_key()) {
            return Err(RepositoryError::Conflict(room.pair_key()));
        }
        rooms.insert(room.id.clone(), room.clone());
        Ok(room.clone())
    }

    async fn get(&self, room_id: &RoomId) -> Result<Option<ChatRoom>, RepositoryError> {
        let found = self.rooms.lock().unwrap().get(room_id).cloned();
        tokio::task::yield_now().await;
        Ok(found)
    }

    async fn find_pair(
        &self,
        user_a: &UserId,
        user_b: &UserId,
    ) -> Result<Option<ChatRoom>, RepositoryError> {
        let key = pair_key(user_a, user_b);
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .find(|r| r.pair_key() == key)
            .cloned())
    }

    async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<ChatRoom>, RepositoryError> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.users.contains(user_id))
            .cloned()
            .collect())
    }

    async fn count_for_user(&self, user_id: &UserId) -> Result<u32, RepositoryError> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.users.contains(user_id))
            .count() as u32)
    }

    async fn add_message(
        &self,
        room_id: &RoomId,
        message_id: &MessageId,
    ) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id).ok_or(RepositoryError::NotFound)?;
        if !room.messages.contains(message_id) {
            room.messages.push(message_id.clone());
        }
        Ok(())
    }

    async fn set_ratings(
        &self,
        room_id: &RoomId,
        ratings: &[RatingEntry; 2],
    ) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id).ok_or(RepositoryError::NotFound)?;
        room.ratings = ratings.clone();
        Ok(())
    }

    async fn mark_committed(&self, room_id: &RoomId) -> Result<(), RepositoryError> {
        let mut rooms = self.rooms.lock().unwrap();
        let room = rooms.get_mut(room_id).ok_or(RepositoryError::NotFound)?;
        room.status = RoomStatus::Committed;
        Ok(())
    }

    async fn list_pending(&self) -> Result<Vec<ChatRoom>, RepositoryError> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == RoomStatus::Pending)
            .cloned()
            .collect())
    }

    async fn average_rating_for_user(
        &self,
        user_id: &UserId,
    ) -> Result<Option<f64>, RepositoryError> {
        let rooms = self.rooms.lock().unwrap();
        let scores: Vec<f64> = rooms
            .values()
            .filter_map(|r| r.rating_for(user_id))
            .map(|score| score.value())
            .collect();
        if scores.is_empty() {
            Ok(None)
        } else {
            Ok(Some(scores.iter().sum::<f64>() / scores.len() as f64))
        }
    }
}

#[derive(Default)]
pub(crate) struct MemoryMessages {
    pub(crate) messages: Mutex<HashMap<MessageId, Message>>,
    pub(crate) corrections: Mutex<Vec<(MessageId, Correction)>>,
}

impl MessageRepository for &MemoryMessages {
    async fn create_message(&self, message: &Message) -> Result<Message, RepositoryError> {
        self.messages
            .lock()
            .unwrap()
            .insert(message.id.clone(), message.clone());
        Ok(message.clone())
    }

    async fn get_message(&self, message_id: &MessageId) -> Result<Option<Message>, RepositoryError> {
        Ok(self.messages.lock().unwrap().get(message_id).cloned())
    }

    async fn create_correction(
        &self,
        message_id: &MessageId,
        correction: &Correction,
    ) -> Result<Correction, RepositoryError> {
        let mut messages = self.messages.lock().unwrap();
        let message = messages.get_mut(message_id).ok_or(RepositoryError::NotFound)?;
        message.corrections.push(correction.id.clone());
        self.corrections
            .lock()
            .unwrap()
            .push((message_id.clone(), correction.clone()));
        Ok(correction.clone())
    }

    async fn corrections_for_message(
        &self,
        message_id: &MessageId,
    ) -> Result<Vec<Correction>, RepositoryError> {
        Ok(self
            .corrections
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == message_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn corrections_for_author(
        &self,
        author: &UserId,
    ) -> Result<Vec<Correction>, RepositoryError> {
        let messages = self.messages.lock().unwrap();
        let mut found: Vec<Correction> = self
            .corrections
            .lock()
            .unwrap()
            .iter()
            .filter(|(message_id, _)| {
                messages
                    .get(message_id)
                    .is_some_and(|m| &m.author == author)
            })
            .map(|(_, c)| c.clone())
            .collect();
        found.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(found)
    }
}
