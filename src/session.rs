//! Display-only sign-in state. Nothing here is authenticated; the record
//! exists so the front end can greet the user by name.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::storage::{KeyValueStore, StorageError};

pub const SESSION_KEY: &str = "user_session";

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("{0}")]
  Validation(String),

  #[error(transparent)]
  Storage(#[from] StorageError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub name: String,
  pub email: String,
}

pub struct SessionStore<S> {
  storage: Arc<S>,
}

impl<S: KeyValueStore> SessionStore<S> {
  pub fn new(storage: Arc<S>) -> Self {
    Self { storage }
  }

  /// Sign in. The display name is the local part of the email.
  pub fn login(&self, email: &str, password: &str) -> Result<Session, SessionError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
      return Err(SessionError::Validation("Please fill in all fields".to_string()));
    }

    let name = email.split('@').next().unwrap_or(email).to_string();
    self.start(Session {
      name,
      email: email.to_string(),
    })
  }

  pub fn register(
    &self,
    name: &str,
    email: &str,
    password: &str,
    confirm: &str,
  ) -> Result<Session, SessionError> {
    let (name, email) = (name.trim(), email.trim());
    if name.is_empty() || email.is_empty() || password.is_empty() || confirm.is_empty() {
      return Err(SessionError::Validation("Please fill in all fields".to_string()));
    }
    if password != confirm {
      return Err(SessionError::Validation("Passwords do not match".to_string()));
    }

    self.start(Session {
      name: name.to_string(),
      email: email.to_string(),
    })
  }

  fn start(&self, session: Session) -> Result<Session, SessionError> {
    let json = serde_json::to_string(&session).map_err(|e| StorageError::Encode {
      key: SESSION_KEY.to_string(),
      message: e.to_string(),
    })?;
    self.storage.save(SESSION_KEY, &json)?;
    info!(name = %session.name, "signed in");
    Ok(session)
  }

  pub fn logout(&self) -> Result<(), SessionError> {
    self.storage.remove(SESSION_KEY)?;
    info!("signed out");
    Ok(())
  }

  /// The signed-in user, if any. An unreadable record counts as signed out.
  pub fn current(&self) -> Result<Option<Session>, SessionError> {
    let Some(raw) = self.storage.load(SESSION_KEY)? else {
      return Ok(None);
    };

    match serde_json::from_str(&raw) {
      Ok(session) => Ok(Some(session)),
      Err(e) => {
        warn!(error = %e, "ignoring unreadable session record");
        Ok(None)
      }
    }
  }
}
