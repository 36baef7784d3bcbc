// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The listener record owned by an [`EventChannel`](super::EventChannel).

use std::any::Any;
use std::cell::Cell;
use std::rc::{Rc, Weak};

/// Lifecycle of a single registration.
///
/// Only `Active` registrations are invoked or survive a purge; every other
/// state is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RegistrationState {
    /// Waiting for the next notification.
    Active,
    /// A one-shot registration that has already been invoked.
    Fired,
    /// The owner was dropped; discovered lazily during dispatch.
    Orphaned,
    /// Explicitly removed through `remove` or `clear`.
    Detached,
}

/// A weakly-owned listener bound to some owner object.
pub(crate) struct Registration<P: 'static> {
    /// Type-erased handle used for liveness checks and identity comparison.
    owner: Weak<dyn Any>,
    /// Upgrades the typed owner and runs the callback. Returns `false` when
    /// the owner is gone.
    dispatch: Box<dyn Fn(&P) -> bool>,
    once: bool,
    state: Cell<RegistrationState>,
}

impl<P: 'static> Registration<P> {
    /// Binds `callback` to `owner` without taking a strong reference to it.
    pub(crate) fn new<T, F>(owner: &Rc<T>, once: bool, callback: F) -> Self
    where
        T: 'static,
        F: Fn(&T, &P) + 'static,
    {
        let typed: Weak<T> = Rc::downgrade(owner);
        let erased: Weak<dyn Any> = typed.clone();

        let dispatch = move |payload: &P| match typed.upgrade() {
            Some(owner) => {
                callback(&*owner, payload);
                true
            }
            None => false,
        };

        Self {
            owner: erased,
            dispatch: Box::new(dispatch),
            once,
            state: Cell::new(RegistrationState::Active),
        }
    }

    pub(crate) fn state(&self) -> RegistrationState {
        self.state.get()
    }

    pub(crate) fn is_once(&self) -> bool {
        self.once
    }

    /// `true` while the owner has at least one strong reference.
    pub(crate) fn is_alive(&self) -> bool {
        self.owner.strong_count() > 0
    }

    /// Identity comparison against an owner's allocation address.
    pub(crate) fn is_owned_by(&self, owner: *const ()) -> bool {
        self.owner.as_ptr() as *const () == owner
    }

    /// Should this registration stay in the live list after a purge?
    pub(crate) fn is_retained(&self) -> bool {
        self.state() == RegistrationState::Active && self.is_alive()
    }

    pub(crate) fn detach(&self) {
        self.state.set(RegistrationState::Detached);
    }

    /// Invokes the callback if the registration is still active.
    ///
    /// A one-shot registration is marked `Fired` before the callback runs, so
    /// a reentrant notify (or a panicking callback) can never fire it twice.
    ///
    /// Returns `true` if the callback actually ran.
    pub(crate) fn invoke(&self, payload: &P) -> bool {
        if self.state.get() != RegistrationState::Active {
            return false;
        }
        if self.once {
            self.state.set(RegistrationState::Fired);
        }

        let invoked = (self.dispatch)(payload);
        if !invoked {
            self.state.set(RegistrationState::Orphaned);
        }
        invoked
    }
}
