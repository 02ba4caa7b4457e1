//! Internal constants for diagram rendering.

use std::time::Duration;

/// Public `PlantUML` render server.
pub const DEFAULT_SERVER_URL: &str = "https://www.plantuml.com/plantuml";

/// Default HTTP timeout for render-server requests (30 seconds).
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for a local renderer process (60 seconds).
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(60);

/// The public server refuses requests without a browser-like agent.
pub(crate) const USER_AGENT: &str = "Mozilla/5.0";

/// How often a running renderer process is polled for exit.
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long stderr is collected after a renderer exits. A grandchild that
/// inherited the pipe may keep it open past the renderer's own exit.
pub(crate) const STDERR_GRACE: Duration = Duration::from_secs(1);
