//! Recording `Channel` shared by the binary's unit tests.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;
use warden_core::error::WardenError;
use warden_core::message::{IncomingMessage, OutgoingMessage};
use warden_core::traits::Channel;

pub const GROUP: &str = "120363001234567890@g.us";
pub const ADMIN: &str = "111@s.whatsapp.net";
pub const MEMBER: &str = "222@s.whatsapp.net";
pub const OTHER: &str = "333@s.whatsapp.net";

#[derive(Default)]
pub struct MockChannel {
    pub admins: Vec<String>,
    pub sent: Mutex<Vec<OutgoingMessage>>,
    pub announce_calls: Mutex<Vec<(String, bool)>>,
    pub removed: Mutex<Vec<(String, String)>>,
    pub fail_announce: AtomicBool,
    pub fail_remove: AtomicBool,
}

impl MockChannel {
    /// A channel whose group has `ADMIN` as its only admin.
    pub fn with_admin() -> Self {
        Self {
            admins: vec![ADMIN.to_string()],
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn announce_calls(&self) -> Vec<(String, bool)> {
        self.announce_calls.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<(String, String)> {
        self.removed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for MockChannel {
    fn name(&self) -> &str {
        "mock"
    }

    async fn start(&self) -> Result<mpsc::Receiver<IncomingMessage>, WardenError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), WardenError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }

    async fn set_group_announce(&self, group_id: &str, announce: bool) -> Result<(), WardenError> {
        self.announce_calls
            .lock()
            .unwrap()
            .push((group_id.to_string(), announce));
        if self.fail_announce.load(Ordering::SeqCst) {
            return Err(WardenError::Channel("not an admin".into()));
        }
        Ok(())
    }

    async fn group_admins(&self, _group_id: &str) -> Result<Vec<String>, WardenError> {
        Ok(self.admins.clone())
    }

    async fn remove_participant(&self, group_id: &str, user_id: &str) -> Result<(), WardenError> {
        if self.fail_remove.load(Ordering::SeqCst) {
            return Err(WardenError::Channel("forbidden".into()));
        }
        self.removed
            .lock()
            .unwrap()
            .push((group_id.to_string(), user_id.to_string()));
        Ok(())
    }

    async fn stop(&self) -> Result<(), WardenError> {
        Ok(())
    }
}
