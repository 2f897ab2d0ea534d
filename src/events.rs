//! Change notification
//!
//! There is a single signal: "something changed". A [`ChangeNotifier`] holds
//! a list of callbacks; nodes and templates chain notifiers with
//! [`ChangeNotifier::forward_to`] so that a plugin's signal travels up to the
//! template root.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn()>;

#[derive(Default)]
struct NotifierInner {
    listeners: RefCell<Vec<Listener>>,
}

/// Emits the "changed" signal to its subscribers
#[derive(Clone, Default)]
pub struct ChangeNotifier(Rc<NotifierInner>);

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn() + 'static) {
        self.0.listeners.borrow_mut().push(Rc::new(listener));
    }

    /// Re-emit every notification of `self` through `target`
    pub fn forward_to(&self, target: &ChangeNotifier) {
        let target = target.clone();
        self.subscribe(move || target.notify());
    }

    pub fn notify(&self) {
        // Listeners may subscribe further listeners while running
        let listeners: Vec<Listener> = self.0.listeners.borrow().clone();
        tracing::trace!(listeners = listeners.len(), "change notification");
        for listener in listeners {
            listener();
        }
    }

    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }

    pub fn downgrade(&self) -> WeakNotifier {
        WeakNotifier(Rc::downgrade(&self.0))
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Non-owning handle, used by contexts so that dropped plugins stop
/// receiving notifications
#[derive(Clone)]
pub struct WeakNotifier(Weak<NotifierInner>);

impl WeakNotifier {
    /// Notify if the notifier is still alive; returns whether it was
    pub fn notify(&self) -> bool {
        match self.0.upgrade() {
            Some(inner) => {
                ChangeNotifier(inner).notify();
                true
            }
            None => false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for WeakNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeakNotifier(alive: {})", self.is_alive())
    }
}
