//! System-wide constants and defaults.

/// Template used when none is given.
pub const DEFAULT_TEMPLATE: &str = "busybox";

/// Number of task units fanned out per phase when none is given.
pub const DEFAULT_COUNT: usize = 10;

/// Number of full CREATE→START→STOP→DESTROY cycles when none is given.
pub const DEFAULT_ITERATION: usize = 1;

/// LXC tools the LXC backend shells out to.
pub const LXC_TOOLS: [&str; 4] = ["lxc-create", "lxc-start", "lxc-stop", "lxc-destroy"];

/// Longest container name the LXC tools accept.
pub const MAX_CONTAINER_NAME_LEN: usize = 64;
