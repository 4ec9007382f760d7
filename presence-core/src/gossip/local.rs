//! An in-process stand-in for a same-origin `BroadcastChannel`, used by
//! tests and by the single-process (single-tab) degraded mode described in
//! spec §7 ("BroadcastChannel unavailable").

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};

use super::{GossipBus, GossipInbox, GossipMessage};
use crate::ids::TabId;

#[derive(Default)]
pub struct LocalGossipBus {
    subscribers: Mutex<HashMap<TabId, Sender<GossipMessage>>>,
}

impl LocalGossipBus {
    pub fn new() -> Self {
        Self::default()
    }
}

struct LocalInbox {
    rx: Receiver<GossipMessage>,
}

impl GossipInbox for LocalInbox {
    fn try_recv(&mut self) -> Option<GossipMessage> {
        self.rx.try_recv().ok()
    }
}

impl GossipBus for LocalGossipBus {
    fn subscribe(&self, tab_id: TabId) -> Box<dyn GossipInbox> {
        let (tx, rx) = channel();
        self.subscribers.lock().unwrap().insert(tab_id, tx);
        Box::new(LocalInbox { rx })
    }

    fn publish(&self, from: &TabId, msg: GossipMessage) {
        let subscribers = self.subscribers.lock().unwrap();
        for (tab_id, tx) in subscribers.iter() {
            if tab_id == from {
                continue; // senders never see their own echo
            }
            // Best-effort: a dropped receiver (tab gone) just misses it.
            let _ = tx.send(msg.clone());
        }
    }

    fn unsubscribe(&self, tab_id: &TabId) {
        self.subscribers.lock().unwrap().remove(tab_id);
    }
}
