use std::fmt;

use super::Session;

/// Login state transitions observed on an account handle
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// The session became (or stayed) logged in; carries a snapshot of it
    Login(Session),
    Logout,
}

impl AuthEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            AuthEvent::Login(_) => EventKind::Login,
            AuthEvent::Logout => EventKind::Logout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Login,
    Logout,
}

/// Handle returned on subscription, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Box<dyn FnMut(&AuthEvent) + Send + Sync>;

struct Registration {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    listener: Listener,
}

/// Observer list for `AuthEvent`s.
///
/// Listeners run synchronously, in registration order, on the caller of
/// `emit`. `once` listeners are dropped after their first call.
#[derive(Default)]
pub struct EventChannel {
    next_id: u64,
    registrations: Vec<Registration>,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&AuthEvent) + Send + Sync + 'static,
    {
        self.register(kind, false, Box::new(listener))
    }

    pub fn once<F>(&mut self, kind: EventKind, listener: F) -> ListenerId
    where
        F: FnMut(&AuthEvent) + Send + Sync + 'static,
    {
        self.register(kind, true, Box::new(listener))
    }

    fn register(&mut self, kind: EventKind, once: bool, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.registrations.push(Registration {
            id,
            kind,
            once,
            listener,
        });
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    /// Notify every listener of the event's kind; returns how many ran
    pub fn emit(&mut self, event: &AuthEvent) -> usize {
        let kind = event.kind();
        let mut notified = 0;
        self.registrations.retain_mut(|r| {
            if r.kind != kind {
                return true;
            }
            (r.listener)(event);
            notified += 1;
            !r.once
        });
        notified
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registrations.iter().filter(|r| r.kind == kind).count()
    }
}

impl fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("login_listeners", &self.listener_count(EventKind::Login))
            .field("logout_listeners", &self.listener_count(EventKind::Logout))
            .finish()
    }
}
