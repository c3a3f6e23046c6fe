// IR key listener: periodic decode plus callback dispatch
//
// Idle until the first callback is registered, then every poll tick decodes
// one raw code and hands each recognized key to all callbacks. There is no
// debouncing: a held button that keeps transmitting fires on every tick it
// decodes.

use tracing::{debug, info};

use crate::ir::{self, IrSource, NO_KEY};

/// Callback invoked with each decoded key
pub type KeyCallback = Box<dyn FnMut(i32) + Send>;

/// Listener state (idle -> listening, never back)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Listening,
}

pub struct KeyListener<S: IrSource> {
    source: S,
    last_key: i32,
    state: ListenerState,
    callbacks: Vec<KeyCallback>,
}

impl<S: IrSource> KeyListener<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            last_key: NO_KEY,
            state: ListenerState::Idle,
            callbacks: Vec::new(),
        }
    }

    /// Decode whatever the receiver holds right now
    ///
    /// Does not touch the last dispatched key or notify callbacks.
    pub fn read_decoded_key(&mut self) -> i32 {
        ir::decode(self.source.read_raw_code())
    }

    /// Register a callback; the first registration starts listening
    ///
    /// Registering the same logic twice means it runs twice per key.
    pub fn on_key_received(&mut self, callback: impl FnMut(i32) + Send + 'static) {
        self.callbacks.push(Box::new(callback));
        if self.state == ListenerState::Idle {
            info!("IR listener registered, polling started");
            self.state = ListenerState::Listening;
        }
    }

    /// One poll iteration
    ///
    /// Returns the key dispatched to the callbacks, if any. Does nothing
    /// while idle.
    pub fn tick(&mut self) -> Option<i32> {
        if self.state == ListenerState::Idle {
            return None;
        }

        let key = self.read_decoded_key();
        if key == NO_KEY {
            return None;
        }

        debug!("IR key {} decoded", key);
        self.last_key = key;
        for callback in self.callbacks.iter_mut() {
            callback(key);
        }
        Some(key)
    }

    /// Last key dispatched by a poll tick, or `NO_KEY` before the first one
    pub fn last_key(&self) -> i32 {
        self.last_key
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn is_listening(&self) -> bool {
        self.state == ListenerState::Listening
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{LatchedCode, NO_SIGNAL};
    use std::sync::{Arc, Mutex};

    fn recorder() -> (Arc<Mutex<Vec<i32>>>, impl FnMut(i32) + Send + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        (seen, move |key| sink.lock().unwrap().push(key))
    }

    #[test]
    fn test_idle_listener_does_not_poll() {
        let codes = LatchedCode::new();
        codes.push(0xf629D);
        let mut listener = KeyListener::new(codes.clone());

        assert_eq!(listener.state(), ListenerState::Idle);
        assert_eq!(listener.tick(), None);
        assert!(!codes.is_empty(), "Idle tick must not consume the receiver");
        assert_eq!(listener.last_key(), NO_KEY);
    }

    #[test]
    fn test_repeated_code_fires_every_tick() {
        let codes = LatchedCode::new();
        let mut listener = KeyListener::new(codes.clone());
        let (seen, callback) = recorder();
        listener.on_key_received(callback);

        codes.push(0xf629D);
        assert_eq!(listener.tick(), Some(12));
        assert_eq!(*seen.lock().unwrap(), vec![12]);

        codes.push(NO_SIGNAL);
        assert_eq!(listener.tick(), None);
        assert_eq!(*seen.lock().unwrap(), vec![12]);

        codes.push(0xf629D);
        assert_eq!(listener.tick(), Some(12));
        assert_eq!(*seen.lock().unwrap(), vec![12, 12]);

        // Nothing received since the last tick
        assert_eq!(listener.tick(), None);
    }

    #[test]
    fn test_callbacks_run_in_registration_order() {
        let codes = LatchedCode::new();
        let mut listener = KeyListener::new(codes.clone());
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let order = order.clone();
            listener.on_key_received(move |key| order.lock().unwrap().push((id, key)));
        }
        assert_eq!(listener.callback_count(), 3);

        codes.push(0xf4AB5);
        listener.tick();
        assert_eq!(*order.lock().unwrap(), vec![(0, 0), (1, 0), (2, 0)]);
    }

    #[test]
    fn test_miss_keeps_last_key() {
        let codes = LatchedCode::new();
        let mut listener = KeyListener::new(codes.clone());
        listener.on_key_received(|_| {});

        codes.push(0xf52AD);
        listener.tick();
        assert_eq!(listener.last_key(), 11);

        codes.push(0xDEADBEEF);
        assert_eq!(listener.tick(), None);
        assert_eq!(listener.last_key(), 11);
        assert!(listener.is_listening());
    }

    #[test]
    fn test_on_demand_read_does_not_dispatch() {
        let codes = LatchedCode::new();
        let mut listener = KeyListener::new(codes.clone());
        let (seen, callback) = recorder();
        listener.on_key_received(callback);

        codes.push(0xf9867);
        assert_eq!(listener.read_decoded_key(), 2);
        assert_eq!(listener.read_decoded_key(), NO_KEY);
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(listener.last_key(), NO_KEY);
    }
}
