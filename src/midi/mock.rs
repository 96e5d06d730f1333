// Copyright (C) 2026 The faderdeck authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    error::Error,
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Barrier, Mutex,
    },
};

use tokio::{sync::mpsc::Sender, task::JoinHandle};

/// A mock MIDI device. Produces only the events tests feed it.
#[derive(Clone)]
pub struct Device {
    name: String,
    barrier: Arc<Barrier>,
    closed: Arc<AtomicBool>,
    event: Arc<Mutex<Vec<u8>>>,
    event_thread: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Device {
    /// Gets the given mock device.
    pub fn get(name: &str) -> Device {
        Device {
            name: name.to_string(),
            closed: Arc::new(AtomicBool::new(false)),
            barrier: Arc::new(Barrier::new(2)),
            event: Arc::new(Mutex::new(Vec::new())),
            event_thread: Arc::new(Mutex::new(None)),
        }
    }

    #[cfg(test)]
    /// Sends the mock event through to the sender.
    pub fn mock_event(&self, event: &[u8]) {
        {
            let mut mutex_event = self.event.lock().expect("unable to get event lock");
            *mutex_event = event.to_vec();
        }
        // Wait until the thread goes to receive the event.
        self.barrier.wait();
        // Wait until the thread has locked the mutex.
        self.barrier.wait();
    }
}

impl super::Device for Device {
    fn name(&self) -> String {
        self.name.clone()
    }

    /// Watches MIDI input for events and sends them to the given sender.
    fn watch_events(&self, sender: Sender<Vec<u8>>) -> Result<(), Box<dyn Error>> {
        let mut event_thread = self.event_thread.lock().expect("unable to get lock");
        if event_thread.is_some() {
            return Err("Already watching events.".into());
        }

        let barrier = self.barrier.clone();
        let event = self.event.clone();
        let closed = self.closed.clone();
        *event_thread = Some(tokio::task::spawn_blocking(move || loop {
            barrier.wait();

            {
                if closed.load(Ordering::Relaxed) {
                    return;
                }
                let event = event.lock().expect("unable to get event lock");
                sender
                    .blocking_send(event.to_vec())
                    .expect("error sending event");
            }
            barrier.wait();
        }));

        Ok(())
    }

    /// Stops watching events.
    fn stop_watch_events(&self) {
        let watcher = self.event_thread.lock().expect("unable to get lock").take();
        if watcher.is_none() {
            // Nobody is on the barrier.
            return;
        }
        self.closed.store(true, Ordering::Relaxed);
        // Wait for watcher thread to move to next loop iteration.
        self.barrier.wait();
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name,)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::midi::Device as _;

    #[test]
    fn test_stop_without_watcher_returns() {
        let device = Device::get("mock unwatched");
        // With no watcher thread there is nobody on the barrier, so this
        // must not block. Repeat stops must not block either.
        device.stop_watch_events();
        device.stop_watch_events();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_watch_delivers_events_until_stopped() {
        let device = Device::get("mock watched");
        let (tx, mut rx) = tokio::sync::mpsc::channel(1);
        device
            .watch_events(tx)
            .expect("unable to watch mock device");

        let (other_tx, _other_rx) = tokio::sync::mpsc::channel(1);
        assert!(device.watch_events(other_tx).is_err());

        let sender = device.clone();
        tokio::task::spawn_blocking(move || sender.mock_event(&[0x90, 60, 100]))
            .await
            .expect("error sending mock event");
        assert_eq!(rx.recv().await, Some(vec![0x90, 60, 100]));

        let stopper = device.clone();
        tokio::task::spawn_blocking(move || {
            stopper.stop_watch_events();
            stopper.stop_watch_events();
        })
        .await
        .expect("error stopping mock device");
    }
}
