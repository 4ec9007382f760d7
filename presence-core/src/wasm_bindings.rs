//! DOM-facing adapters for the transport-agnostic traits in this crate,
//! compiled only under the `wasm` feature. Follows the same
//! `web_sys::window()`-plus-`Closure` wiring style as `flbrowser::web::Web`,
//! scaled down to the three seams this crate actually needs: a clock, a
//! same-origin gossip channel, and persisted session-id storage.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::Closure;
use web_sys::{BroadcastChannel, MessageEvent};

use crate::clock::Clock;
use crate::gossip::{GossipBus, GossipInbox, GossipMessage};
use crate::ids::{SessionId, SessionIdStore, TabId};

pub struct WasmClock;

impl Clock for WasmClock {
    fn now_ms(&self) -> u64 {
        js_sys::Date::now() as u64
    }
}

/// Wraps a same-origin `BroadcastChannel` named after the customer/session
/// scope, matching the channel-per-scope layout assumed by the gossip
/// protocol.
pub struct BroadcastChannelGossipBus {
    channel: BroadcastChannel,
    // Keeps the JS closure alive for the channel's lifetime; dropping it
    // detaches the listener.
    _onmessage: Closure<dyn FnMut(MessageEvent)>,
    subscribers: std::sync::Arc<Mutex<HashMap<TabId, Sender<GossipMessage>>>>,
}

struct WasmInbox {
    rx: Receiver<GossipMessage>,
}

impl GossipInbox for WasmInbox {
    fn try_recv(&mut self) -> Option<GossipMessage> {
        self.rx.try_recv().ok()
    }
}

impl BroadcastChannelGossipBus {
    pub fn new(scope_name: &str) -> Result<std::sync::Arc<Self>, wasm_bindgen::JsValue> {
        let channel = BroadcastChannel::new(scope_name)?;
        let subscribers: std::sync::Arc<Mutex<HashMap<TabId, Sender<GossipMessage>>>> =
            std::sync::Arc::new(Mutex::new(HashMap::new()));

        let fanout = subscribers.clone();
        let onmessage = Closure::wrap(Box::new(move |event: MessageEvent| {
            let Some(text) = event.data().as_string() else {
                return;
            };
            let Ok(msg) = serde_json::from_str::<GossipMessage>(&text) else {
                return;
            };
            let subs = fanout.lock().unwrap();
            for tx in subs.values() {
                let _ = tx.send(msg.clone());
            }
        }) as Box<dyn FnMut(MessageEvent)>);
        channel.set_onmessage(Some(onmessage.as_ref().unchecked_ref()));

        Ok(std::sync::Arc::new(Self {
            channel,
            _onmessage: onmessage,
            subscribers,
        }))
    }
}

// Safety note: wasm is single-threaded; these impls exist only so the
// trait objects satisfy `Send + Sync` bounds shared with the native side.
unsafe impl Send for BroadcastChannelGossipBus {}
unsafe impl Sync for BroadcastChannelGossipBus {}

impl GossipBus for BroadcastChannelGossipBus {
    fn subscribe(&self, tab_id: TabId) -> Box<dyn GossipInbox> {
        let (tx, rx) = channel();
        self.subscribers.lock().unwrap().insert(tab_id, tx);
        Box::new(WasmInbox { rx })
    }

    fn publish(&self, _from: &TabId, msg: GossipMessage) {
        // BroadcastChannel never echoes to its own sender, so there is no
        // self-filtering to do on the way out (unlike `LocalGossipBus`,
        // which has to do it manually).
        if let Ok(text) = serde_json::to_string(&msg) {
            let _ = self.channel.post_message(&wasm_bindgen::JsValue::from_str(&text));
        }
    }

    fn unsubscribe(&self, tab_id: &TabId) {
        self.subscribers.lock().unwrap().remove(tab_id);
    }
}

/// `sessionStorage`/`localStorage`-backed `SessionIdStore`. Uses
/// `localStorage` so the session id survives across tabs opened at
/// different times, matching the 24 h idle-window rule in `ids.rs`.
pub struct LocalStorageSessionIdStore {
    key: &'static str,
}

impl LocalStorageSessionIdStore {
    pub fn new(key: &'static str) -> Self {
        Self { key }
    }

    fn storage(&self) -> Option<web_sys::Storage> {
        web_sys::window()?.local_storage().ok()?
    }
}

impl SessionIdStore for LocalStorageSessionIdStore {
    fn read(&self) -> Option<(SessionId, u64)> {
        let storage = self.storage()?;
        let raw = storage.get_item(self.key).ok()??;
        let (id, ts) = raw.split_once('|')?;
        Some((SessionId(id.to_string()), ts.parse().ok()?))
    }

    fn write(&self, session_id: &SessionId, last_seen_ms: u64) {
        if let Some(storage) = self.storage() {
            let _ = storage.set_item(self.key, &format!("{}|{}", session_id.0, last_seen_ms));
        }
    }
}
