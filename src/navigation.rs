//! Pathname-change observation as an explicit subscription service.
//!
//! Multiple consumers share one host-side navigation hook: the first
//! subscription installs it, the last removal uninstalls it. The host
//! reports changes by calling [`NavigationObserver::navigated`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub type NavigationCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Installed/uninstalled around the first/last subscription, so the host
/// only intercepts its router while someone is listening.
pub struct NavigationHook {
    pub install: Box<dyn Fn() + Send + Sync>,
    pub uninstall: Box<dyn Fn() + Send + Sync>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct ObserverState {
    pathname: String,
    subscribers: HashMap<u64, NavigationCallback>,
    next_id: u64,
}

pub struct NavigationObserver {
    state: Mutex<ObserverState>,
    hook: Option<NavigationHook>,
}

impl NavigationObserver {
    pub fn new(initial_pathname: &str) -> Self {
        Self {
            state: Mutex::new(ObserverState {
                pathname: initial_pathname.to_string(),
                subscribers: HashMap::new(),
                next_id: 0,
            }),
            hook: None,
        }
    }

    pub fn with_hook(initial_pathname: &str, hook: NavigationHook) -> Self {
        let mut observer = Self::new(initial_pathname);
        observer.hook = Some(hook);
        observer
    }

    pub fn pathname(&self) -> String {
        self.state.lock().unwrap().pathname.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().unwrap().subscribers.len()
    }

    pub fn subscribe(&self, callback: NavigationCallback) -> SubscriptionId {
        let id = {
            let mut state = self.state.lock().unwrap();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.insert(id, callback);
            if state.subscribers.len() == 1 {
                if let Some(hook) = &self.hook {
                    (hook.install)();
                }
            }
            id
        };
        SubscriptionId(id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut state = self.state.lock().unwrap();
        if state.subscribers.remove(&id.0).is_some() && state.subscribers.is_empty() {
            if let Some(hook) = &self.hook {
                (hook.uninstall)();
            }
        }
    }

    /// Host-side notification that the page's pathname changed. No-op when
    /// the pathname is unchanged.
    pub fn navigated(&self, pathname: &str) {
        let callbacks: Vec<NavigationCallback> = {
            let mut state = self.state.lock().unwrap();
            if state.pathname == pathname {
                return;
            }
            state.pathname = pathname.to_string();
            state.subscribers.values().cloned().collect()
        };
        for callback in callbacks {
            callback(pathname);
        }
    }
}
