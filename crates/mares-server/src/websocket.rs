//! WebSocket-based live reload.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// WebSocket endpoint browsers connect to.
pub const RELOAD_PATH: &str = "/__livereload";

/// Path the client script is served from.
pub const CLIENT_PATH: &str = "/__livereload.js";

/// Messages sent to connected browsers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReloadMessage {
    /// Full page reload
    Reload,

    /// Connection established
    Connected,
}

/// Hub for broadcasting reload messages to all connected browsers.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    sender: broadcast::Sender<ReloadMessage>,
}

impl ReloadHub {
    /// Create a new hub.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Send a message to every subscriber.
    pub fn send(&self, msg: ReloadMessage) {
        // No receivers just means no browser is open
        let _ = self.sender.send(msg);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadMessage> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

/// Client-side script that reloads the page when told to.
pub fn client_script() -> String {
    format!(
        r#"
(function() {{
  'use strict';

  const scheme = location.protocol === 'https:' ? 'wss://' : 'ws://';
  const ws = new WebSocket(scheme + location.host + '{}');

  ws.onmessage = function(event) {{
    const msg = JSON.parse(event.data);
    if (msg.type === 'reload') {{
      location.reload();
    }}
  }};

  ws.onclose = function() {{
    console.log('[livereload] Disconnected');
    setTimeout(function() {{ location.reload(); }}, 1000);
  }};
}})();
"#,
        RELOAD_PATH
    )
}
