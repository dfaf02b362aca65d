/*!
 * System Limits and Constants
 *
 * Centralized location for thread table, stack and timer limits.
 * Performance-critical constants are marked with [PERF].
 */

use std::time::Duration;

// =============================================================================
// THREAD TABLE
// =============================================================================

/// Maximum number of simultaneously live threads, including thread 0
/// Bounds the identifier space: ids are always below this value
pub const MAX_THREADS: usize = 1024;

/// Identifier of the bootstrap thread created by `init`
pub const BOOTSTRAP_TID: u32 = 0;

// =============================================================================
// STACKS
// =============================================================================

/// Smallest stack a thread may be created with (32KB)
/// Leaves room for the panic machinery and formatted logging
pub const MIN_STACK_SIZE: usize = 32 * 1024;

/// Default per-thread stack (256KB)
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Largest configurable per-thread stack (64MB)
pub const MAX_STACK_SIZE: usize = 64 * 1024 * 1024;

/// Stack alignment required by both supported ABIs
pub const STACK_ALIGN: usize = 16;

/// Marker written at the lowest address of every stack
/// A changed value means the thread overflowed its stack
pub const STACK_CANARY: u64 = 0x7574_6872_6561_6473;

// =============================================================================
// PREEMPTION
// =============================================================================

/// Shortest accepted preemption interval (100us)
/// [PERF] Below this the process spends most of its time in the handler
pub const MIN_PREEMPT_INTERVAL: Duration = Duration::from_micros(100);

/// Longest accepted preemption interval (10s)
pub const MAX_PREEMPT_INTERVAL: Duration = Duration::from_secs(10);

// =============================================================================
// ENVIRONMENT
// =============================================================================

/// Overrides `SchedulerConfig::max_threads`
pub const ENV_MAX_THREADS: &str = "UTHREAD_MAX_THREADS";

/// Overrides `SchedulerConfig::stack_size` (bytes)
pub const ENV_STACK_SIZE: &str = "UTHREAD_STACK_SIZE";

/// Enables preemption with the given interval in microseconds
pub const ENV_PREEMPT_US: &str = "UTHREAD_PREEMPT_US";

/// Switches tracing output to JSON when set to `1` or `true`
pub const ENV_TRACE_JSON: &str = "UTHREAD_TRACE_JSON";
