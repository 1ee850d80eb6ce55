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

//! Multi-subscriber callback lists.
//!
//! Every window event kind owns one [`Callbacks`] list. Emitting calls each
//! subscriber in subscription order; there is no return value and no way for one
//! subscriber to stop the others.

use std::fmt;

/// Handle returned by [`Callbacks::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Handler<A> = Box<dyn FnMut(&A)>;

/// A broadcast list of callbacks taking `&A`.
pub struct Callbacks<A> {
    next_id: u64,
    handlers: Vec<(SubscriptionId, Handler<A>)>,
}

impl<A> Default for Callbacks<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            handlers: Vec::new(),
        }
    }
}

impl<A> fmt::Debug for Callbacks<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks")
            .field("subscribers", &self.handlers.len())
            .finish()
    }
}

impl<A> Callbacks<A> {
    /// An empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `handler`. It runs after every handler subscribed before it.
    pub fn subscribe(&mut self, handler: impl FnMut(&A) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.handlers.push((id, Box::new(handler)));
        id
    }

    /// Removes a handler. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.handlers.len();
        self.handlers.retain(|(handler_id, _)| *handler_id != id);
        self.handlers.len() != before
    }

    /// Calls every handler with `args`.
    pub fn emit(&mut self, args: &A) {
        for (_, handler) in &mut self.handlers {
            handler(args);
        }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Removes every handler.
    pub fn clear(&mut self) {
        self.handlers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn every_subscriber_runs_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut callbacks = Callbacks::<u32>::new();
        for tag in ["a", "b"] {
            let log = Rc::clone(&log);
            callbacks.subscribe(move |value| log.borrow_mut().push(format!("{tag}{value}")));
        }
        callbacks.emit(&7);
        assert_eq!(*log.borrow(), vec!["a7", "b7"]);
    }

    #[test]
    fn unsubscribe_removes_only_that_handler() {
        let hits = Rc::new(RefCell::new(0));
        let mut callbacks = Callbacks::<()>::new();
        let first = {
            let hits = Rc::clone(&hits);
            callbacks.subscribe(move |_| *hits.borrow_mut() += 1)
        };
        {
            let hits = Rc::clone(&hits);
            callbacks.subscribe(move |_| *hits.borrow_mut() += 10);
        }

        assert!(callbacks.unsubscribe(first));
        assert!(!callbacks.unsubscribe(first));
        callbacks.emit(&());
        assert_eq!(*hits.borrow(), 10);
        assert_eq!(callbacks.len(), 1);
    }

    #[test]
    fn emit_without_subscribers_is_a_no_op() {
        let mut callbacks = Callbacks::<(f64, f64)>::new();
        assert!(callbacks.is_empty());
        callbacks.emit(&(1.0, 2.0));
    }
}
