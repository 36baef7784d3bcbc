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

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::config::ChannelConfig;
use super::registration::Registration;

/// Shared state of a channel.
///
/// Forwarding sources hold `Weak` handles to this, so a target channel is
/// owned solely by whoever created it.
struct ChannelState<P: 'static> {
    label: Option<String>,
    registrations: RefCell<Vec<Rc<Registration<P>>>>,
    forwards: RefCell<Vec<Weak<ChannelState<P>>>>,
}

impl<P: 'static> ChannelState<P> {
    fn name(&self) -> &str {
        self.label.as_deref().unwrap_or("<unnamed>")
    }

    fn notify(&self, payload: &P) {
        // Neither borrow may be held while foreign code runs: callbacks are
        // free to add, remove or notify on this very channel.
        let targets: Vec<Rc<ChannelState<P>>> = self
            .forwards
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect();
        let snapshot: Vec<Rc<Registration<P>>> = self.registrations.borrow().clone();

        log::trace!(
            "Channel '{}' notifying {} forward target(s) and {} listener(s).",
            self.name(),
            targets.len(),
            snapshot.len()
        );

        for target in &targets {
            target.notify(payload);
        }

        for registration in &snapshot {
            registration.invoke(payload);
        }

        self.purge();
    }

    /// Rebuilds both lists against the live state, never the snapshot, so a
    /// reentrant notify's additions and removals are preserved.
    fn purge(&self) -> usize {
        // Released registrations drop their callbacks, and with them whatever
        // the callbacks captured, only once the borrow has ended.
        let released: Vec<Rc<Registration<P>>> = {
            let mut registrations = self.registrations.borrow_mut();
            let (kept, released) = std::mem::take(&mut *registrations)
                .into_iter()
                .partition(|registration| registration.is_retained());
            *registrations = kept;
            released
        };
        let removed = released.len();
        let dropped_targets = {
            let mut forwards = self.forwards.borrow_mut();
            let before = forwards.len();
            forwards.retain(|target| target.strong_count() > 0);
            before - forwards.len()
        };

        if removed > 0 || dropped_targets > 0 {
            log::debug!(
                "Channel '{}' purged {} registration(s) and {} dead forward target(s).",
                self.name(),
                removed,
                dropped_targets
            );
        }
        removed
    }
}

/// A synchronous, single-threaded publish/subscribe channel for payloads of
/// type `P`.
///
/// Listeners are bound to an owner held in an [`Rc`]. The channel only keeps a
/// [`Weak`] handle to that owner, so subscribing never extends its lifetime:
/// once the owner is dropped its listeners stop firing and are purged at the
/// next [`notify`](EventChannel::notify).
///
/// All methods take `&self`, which lets a callback subscribe, unsubscribe or
/// notify on the channel that is currently dispatching.
///
/// # Dispatch order
///
/// 1. Every forward target is notified, in the order it was added.
/// 2. Every listener present when `notify` started is invoked, in
///    registration order. Listeners added during the pass wait for the next
///    call.
/// 3. Orphaned, removed and already-fired one-shot registrations are purged.
///
/// Forwarding cycles (a channel that ends up forwarding to itself) recurse
/// without bound; keeping the forwarding graph acyclic is the caller's job.
/// A panicking callback unwinds straight out of `notify`.
///
/// # Example
///
/// ```rust
/// use beacon_core::EventChannel;
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// struct Counter {
///     hits: Cell<u32>,
/// }
///
/// let channel = EventChannel::<u32>::new();
/// let counter = Rc::new(Counter { hits: Cell::new(0) });
///
/// channel.add(&counter, |c, amount| c.hits.set(c.hits.get() + amount));
/// channel.notify(&3);
/// channel.notify(&4);
/// assert_eq!(counter.hits.get(), 7);
///
/// drop(counter);
/// channel.notify(&1);
/// assert_eq!(channel.listener_count(), 0);
/// ```
pub struct EventChannel<P: 'static> {
    state: Rc<ChannelState<P>>,
}

impl<P: 'static> EventChannel<P> {
    /// Creates an empty, unlabeled channel.
    pub fn new() -> Self {
        Self::with_config(ChannelConfig::default())
    }

    /// Creates an empty channel from the given configuration.
    ///
    /// ## Arguments
    /// * `config` - Label and initial registration capacity for the channel.
    ///
    /// ## Returns
    /// A new channel with no listeners and no forward targets.
    pub fn with_config(config: ChannelConfig) -> Self {
        let state = ChannelState {
            label: config.label,
            registrations: RefCell::new(Vec::with_capacity(config.initial_capacity)),
            forwards: RefCell::new(Vec::new()),
        };
        Self {
            state: Rc::new(state),
        }
    }

    /// The label this channel was configured with, if any.
    pub fn label(&self) -> Option<&str> {
        self.state.label.as_deref()
    }

    /// Registers a persistent listener bound to `owner`.
    ///
    /// The callback receives the owner and the payload. Registering the same
    /// owner several times creates independent listeners that all fire.
    ///
    /// ## Arguments
    /// * `owner` - The object the listener is bound to. Only a weak handle is kept.
    /// * `callback` - Invoked with the owner and the payload on every notification.
    pub fn add<T, F>(&self, owner: &Rc<T>, callback: F)
    where
        T: 'static,
        F: Fn(&T, &P) + 'static,
    {
        self.register(owner, false, callback);
    }

    /// Registers a persistent listener bound to `owner` whose callback only
    /// needs the payload.
    pub fn add_payload<T, F>(&self, owner: &Rc<T>, callback: F)
    where
        T: 'static,
        F: Fn(&P) + 'static,
    {
        self.register(owner, false, move |_: &T, payload: &P| callback(payload));
    }

    /// Registers a one-shot listener bound to `owner`.
    ///
    /// It fires on the first notification after registration and is removed
    /// before any later notification can observe it.
    ///
    /// ## Arguments
    /// * `owner` - The object the listener is bound to. Only a weak handle is kept.
    /// * `callback` - Invoked at most once, with the owner and the payload.
    pub fn once<T, F>(&self, owner: &Rc<T>, callback: F)
    where
        T: 'static,
        F: Fn(&T, &P) + 'static,
    {
        self.register(owner, true, callback);
    }

    /// Payload-only form of [`once`](Self::once).
    pub fn once_payload<T, F>(&self, owner: &Rc<T>, callback: F)
    where
        T: 'static,
        F: Fn(&P) + 'static,
    {
        self.register(owner, true, move |_: &T, payload: &P| callback(payload));
    }

    /// Relays every future notification of this channel to `target`.
    ///
    /// `target` is not kept alive by this channel. Forwarding the same target
    /// twice relays each notification twice.
    ///
    /// ## Arguments
    /// * `target` - The channel that receives every payload this one is notified with.
    pub fn forward(&self, target: &EventChannel<P>) {
        self.state
            .forwards
            .borrow_mut()
            .push(Rc::downgrade(&target.state));
        log::trace!(
            "Channel '{}' now forwards to '{}'.",
            self.state.name(),
            target.state.name()
        );
    }

    /// Removes every listener registered for `owner`, compared by identity.
    ///
    /// Takes effect immediately, including for a dispatch pass that is
    /// already in progress. Forwarding is unaffected.
    ///
    /// ## Arguments
    /// * `owner` - The owner whose registrations should be dropped.
    pub fn remove<T: 'static>(&self, owner: &Rc<T>) {
        let address = Rc::as_ptr(owner) as *const ();
        let released: Vec<Rc<Registration<P>>> = {
            let mut registrations = self.state.registrations.borrow_mut();
            let (released, kept) = std::mem::take(&mut *registrations)
                .into_iter()
                .partition(|registration| registration.is_owned_by(address));
            *registrations = kept;
            released
        };
        for registration in &released {
            registration.detach();
        }
        log::trace!(
            "Channel '{}' removed {} registration(s) by owner.",
            self.state.name(),
            released.len()
        );
    }

    /// Stops relaying to every occurrence of `target`.
    pub fn remove_forward(&self, target: &EventChannel<P>) {
        let address = Rc::as_ptr(&target.state);
        self.state
            .forwards
            .borrow_mut()
            .retain(|forward| forward.as_ptr() != address);
    }

    /// Dispatches `payload` to forward targets, then to listeners.
    ///
    /// See the type-level documentation for ordering and reentrancy rules.
    ///
    /// ## Arguments
    /// * `payload` - The value handed to every forward target and listener.
    pub fn notify(&self, payload: &P) {
        self.state.notify(payload);
    }

    /// Runs the purge pass without notifying anyone.
    ///
    /// Drops orphaned registrations and dead forward targets.
    ///
    /// ## Returns
    /// The number of registrations removed.
    pub fn purge(&self) -> usize {
        self.state.purge()
    }

    /// Removes every listener and every forward target.
    pub fn clear(&self) {
        let registrations = std::mem::take(&mut *self.state.registrations.borrow_mut());
        for registration in &registrations {
            registration.detach();
        }
        self.state.forwards.borrow_mut().clear();
        log::trace!(
            "Channel '{}' cleared {} registration(s).",
            self.state.name(),
            registrations.len()
        );
    }

    /// Number of registrations in the live list, orphans not yet purged included.
    pub fn listener_count(&self) -> usize {
        self.state.registrations.borrow().len()
    }

    /// Number of forward entries, duplicates and dead targets included.
    pub fn forward_count(&self) -> usize {
        self.state.forwards.borrow().len()
    }

    /// `true` if the channel has neither listeners nor forward targets.
    pub fn is_empty(&self) -> bool {
        self.listener_count() == 0 && self.forward_count() == 0
    }

    fn register<T, F>(&self, owner: &Rc<T>, once: bool, callback: F)
    where
        T: 'static,
        F: Fn(&T, &P) + 'static,
    {
        let registration = Registration::new(owner, once, callback);
        log::trace!(
            "Channel '{}' registered a {} listener.",
            self.state.name(),
            if registration.is_once() { "one-shot" } else { "persistent" }
        );
        self.state
            .registrations
            .borrow_mut()
            .push(Rc::new(registration));
    }
}

impl<P: 'static> Default for EventChannel<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: 'static> fmt::Debug for EventChannel<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventChannel")
            .field("label", &self.state.label)
            .field("listeners", &self.listener_count())
            .field("forwards", &self.forward_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::registration::RegistrationState;
    use std::cell::Cell;

    struct Probe {
        hits: Cell<u32>,
    }

    fn probe() -> Rc<Probe> {
        Rc::new(Probe { hits: Cell::new(0) })
    }

    #[test]
    fn test_new_channel_is_empty() {
        let channel = EventChannel::<u8>::new();
        assert!(channel.is_empty());
        assert!(channel.label().is_none());
    }

    #[test]
    fn test_with_config_sets_label() {
        let channel = EventChannel::<u8>::with_config(ChannelConfig::labeled("clicks"));
        assert_eq!(channel.label(), Some("clicks"));
        assert_eq!(
            format!("{channel:?}"),
            "EventChannel { label: Some(\"clicks\"), listeners: 0, forwards: 0 }"
        );
    }

    #[test]
    fn test_remove_detaches_registration() {
        let channel = EventChannel::<u8>::new();
        let owner = probe();
        channel.add(&owner, |p, _| p.hits.set(p.hits.get() + 1));

        let registration = Rc::clone(&channel.state.registrations.borrow()[0]);
        channel.remove(&owner);

        assert_eq!(registration.state(), RegistrationState::Detached);
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn test_once_is_fired_after_notify() {
        let channel = EventChannel::<u8>::new();
        let owner = probe();
        channel.once(&owner, |p, _| p.hits.set(p.hits.get() + 1));

        let registration = Rc::clone(&channel.state.registrations.borrow()[0]);
        channel.notify(&0);

        assert_eq!(registration.state(), RegistrationState::Fired);
        assert_eq!(owner.hits.get(), 1);
        assert_eq!(channel.listener_count(), 0);
    }

    #[test]
    fn test_purge_drops_dead_forward_targets() {
        let source = EventChannel::<u8>::new();
        let target = EventChannel::<u8>::new();
        source.forward(&target);
        assert_eq!(source.forward_count(), 1);

        drop(target);
        assert_eq!(source.purge(), 0);
        assert_eq!(source.forward_count(), 0);
    }

    #[test]
    fn test_clear_detaches_everything() {
        let channel = EventChannel::<u8>::new();
        let target = EventChannel::<u8>::new();
        let owner = probe();
        channel.add(&owner, |p, _| p.hits.set(p.hits.get() + 1));
        channel.forward(&target);

        let registration = Rc::clone(&channel.state.registrations.borrow()[0]);
        channel.clear();

        assert!(channel.is_empty());
        assert_eq!(registration.state(), RegistrationState::Detached);
    }
}
