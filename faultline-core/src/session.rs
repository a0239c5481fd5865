//! Release health sessions.

use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::protocol::{
    EnvelopeItem, Event, Level, SessionAttributes, SessionStatus, SessionUpdate,
};
use crate::stack::StackLayer;
use crate::types::random_uuid;
use crate::Client;

/// A release health session tied to a scope.
///
/// The session tracks whether the code running inside it encountered errors
/// or crashed. Updates are shipped as `session` envelope items: the initial
/// update, one per error batch, and a terminal one on close.
#[derive(Clone, Debug)]
pub struct Session {
    client: Arc<Client>,
    session_update: SessionUpdate,
    started: Instant,
    dirty: bool,
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close(SessionStatus::Exited);
        if self.dirty {
            self.client.capture_session(self.session_update.clone());
        }
    }
}

impl Session {
    pub(crate) fn from_stack(stack: &StackLayer) -> Option<Self> {
        let client = stack.client.as_ref()?;
        let options = client.options();
        let user = stack.scope.user.as_deref();
        let distinct_id = user
            .and_then(|user| {
                user.id
                    .as_ref()
                    .or(user.email.as_ref())
                    .or(user.username.as_ref())
            })
            .cloned();
        Some(Self {
            client: client.clone(),
            session_update: SessionUpdate {
                session_id: random_uuid(),
                distinct_id,
                sequence: None,
                timestamp: None,
                started: SystemTime::now(),
                init: true,
                duration: None,
                status: SessionStatus::Ok,
                errors: 0,
                attributes: SessionAttributes {
                    release: options.release.clone()?.into_owned(),
                    environment: options.environment.clone().map(|env| env.into_owned()),
                    ip_address: None,
                    user_agent: None,
                },
            },
            started: Instant::now(),
            dirty: true,
        })
    }

    pub(crate) fn update_from_event(&mut self, event: &Event) {
        if self.session_update.status != SessionStatus::Ok {
            // a session that has already transitioned to a "terminal" state
            // should not receive any more updates
            return;
        }
        let mut has_error = event.level >= Level::Error;
        let mut is_crash = false;
        for exc in &event.exception.values {
            has_error = true;
            if let Some(mechanism) = &exc.mechanism {
                if let Some(false) = mechanism.handled {
                    is_crash = true;
                    break;
                }
            }
        }

        if is_crash {
            self.session_update.status = SessionStatus::Crashed;
        }
        if has_error {
            self.session_update.errors += 1;
            self.dirty = true;
        }
    }

    pub(crate) fn close(&mut self, status: SessionStatus) {
        if self.session_update.status == SessionStatus::Ok {
            let status = match status {
                SessionStatus::Ok => SessionStatus::Exited,
                s => s,
            };
            self.session_update.duration = Some(self.started.elapsed().as_secs_f64());
            self.session_update.status = status;
            self.dirty = true;
        }
    }

    pub(crate) fn create_envelope_item(&mut self) -> Option<EnvelopeItem> {
        if self.dirty {
            let item = self.session_update.clone().into();
            self.session_update.init = false;
            self.dirty = false;
            return Some(item);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Exception, Mechanism};

    fn test_session_update() -> SessionUpdate {
        SessionUpdate {
            session_id: random_uuid(),
            distinct_id: None,
            sequence: None,
            timestamp: None,
            started: SystemTime::now(),
            init: true,
            duration: None,
            status: SessionStatus::Ok,
            errors: 0,
            attributes: SessionAttributes {
                release: "app@1.0.0".into(),
                environment: None,
                ip_address: None,
                user_agent: None,
            },
        }
    }

    fn test_session() -> Session {
        Session {
            client: Arc::new(Client::from_config(())),
            session_update: test_session_update(),
            started: Instant::now(),
            dirty: true,
        }
    }

    #[test]
    fn test_error_events_mark_session_dirty() {
        let mut session = test_session();
        session.create_envelope_item();
        assert!(!session.dirty);

        session.update_from_event(&Event::new());
        assert_eq!(session.session_update.errors, 1);
        assert!(session.dirty);
        assert_eq!(session.session_update.status, SessionStatus::Ok);
    }

    #[test]
    fn test_unhandled_exception_crashes_session() {
        let mut session = test_session();
        let mut event = Event::new();
        event.exception.values.push(Exception {
            ty: "Panic".into(),
            mechanism: Some(Mechanism {
                ty: "panic".into(),
                handled: Some(false),
            }),
            ..Default::default()
        });

        session.update_from_event(&event);
        assert_eq!(session.session_update.status, SessionStatus::Crashed);

        // terminal sessions ignore further updates
        session.update_from_event(&Event::new());
        assert_eq!(session.session_update.errors, 1);
    }

    #[test]
    fn test_init_flag_clears_after_first_item() {
        let mut session = test_session();
        match session.create_envelope_item() {
            Some(EnvelopeItem::SessionUpdate(update)) => assert!(update.init),
            other => panic!("expected session item, got {other:?}"),
        }
        assert!(!session.session_update.init);
        assert!(session.create_envelope_item().is_none());
    }
}
