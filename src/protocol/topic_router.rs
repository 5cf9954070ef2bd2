// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Topic routing for subscription handlers.
//!
//! The [`TopicRouter`] maps each subscribed topic to its handler and the QoS
//! it was subscribed with, so the broker can both dispatch inbound messages
//! and replay subscriptions after a reconnect.
//!
//! ```text
//! MQTT Message: homeassistant/switch/0xabc/set → ON
//!                     ↓
//!             TopicRouter.handler_for()
//!                     ↓
//!        Arc<dyn MessageHandler>.handle()  (own task)
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{MessageHandler, QoS};

struct Route {
    qos: QoS,
    handler: Arc<dyn MessageHandler>,
}

/// Routes inbound messages to subscription handlers by exact topic.
#[derive(Default)]
pub struct TopicRouter {
    routes: RwLock<HashMap<String, Route>>,
}

impl TopicRouter {
    /// Creates a new empty topic router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `topic`.
    ///
    /// If a previous registration exists for this topic, it will be replaced.
    pub fn register(&self, topic: impl Into<String>, qos: QoS, handler: Arc<dyn MessageHandler>) {
        let topic = topic.into();
        tracing::debug!(topic = %topic, "Registering topic handler");
        self.routes.write().insert(topic, Route { qos, handler });
    }

    /// Unregisters a topic.
    ///
    /// Returns `true` if the topic was previously registered.
    pub fn unregister(&self, topic: &str) -> bool {
        tracing::debug!(topic = %topic, "Unregistering topic handler");
        self.routes.write().remove(topic).is_some()
    }

    /// Returns the handler registered for `topic`, if any.
    #[must_use]
    pub fn handler_for(&self, topic: &str) -> Option<Arc<dyn MessageHandler>> {
        self.routes
            .read()
            .get(topic)
            .map(|route| Arc::clone(&route.handler))
    }

    /// Returns every registered topic with its QoS.
    #[must_use]
    pub fn subscriptions(&self) -> Vec<(String, QoS)> {
        self.routes
            .read()
            .iter()
            .map(|(topic, route)| (topic.clone(), route.qos))
            .collect()
    }

    /// Returns the number of registered topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    /// Returns `true` if no topic is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }
}

impl std::fmt::Debug for TopicRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopicRouter")
            .field("topics", &self.routes.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
