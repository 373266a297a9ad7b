use actix_session::Session;
use actix_web::{error, Error};
use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";
/// Session key holding pending flash messages.
pub const MESSAGES_KEY: &str = "messages";

#[derive(Clone, Copy, Debug, Display, PartialEq, Eq, Serialize, Deserialize)]
pub enum Level {
    #[display(fmt = "success")]
    Success,
    #[display(fmt = "info")]
    Info,
    #[display(fmt = "error")]
    Error,
}

/// One-shot notice shown on the next rendered page.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashMessage {
    pub level: Level,
    pub text: String,
}

/// Binds the session to a user. The session id is rotated to prevent fixation.
pub fn authenticate(session: &Session, user_id: i32) -> Result<(), Error> {
    session.renew();
    session
        .insert(USER_ID_KEY, user_id)
        .map_err(error::ErrorInternalServerError)
}

pub fn forget(session: &Session) {
    session.purge();
}

pub fn get_user_id(session: &Session) -> Option<i32> {
    match session.get::<i32>(USER_ID_KEY) {
        Ok(id) => id,
        Err(e) => {
            log::warn!("get_user_id: unreadable session value: {}", e);
            session.remove(USER_ID_KEY);
            None
        }
    }
}

pub fn push_message(session: &Session, level: Level, text: &str) {
    let mut messages = peek_messages(session);
    messages.push(FlashMessage {
        level,
        text: text.to_owned(),
    });

    if let Err(e) = session.insert(MESSAGES_KEY, messages) {
        log::error!("push_message: {}", e);
    }
}

/// Removes and returns every pending message.
pub fn take_messages(session: &Session) -> Vec<FlashMessage> {
    let messages = peek_messages(session);
    if !messages.is_empty() {
        session.remove(MESSAGES_KEY);
    }
    messages
}

fn peek_messages(session: &Session) -> Vec<FlashMessage> {
    match session.get::<Vec<FlashMessage>>(MESSAGES_KEY) {
        Ok(messages) => messages.unwrap_or_default(),
        Err(e) => {
            log::warn!("peek_messages: discarding unreadable messages: {}", e);
            Vec::new()
        }
    }
}
