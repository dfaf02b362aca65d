/*!
 * Monitoring
 * Tracing setup and scheduler reporting
 */

mod tracer;

pub use tracer::{init_tracing, report_stats};
