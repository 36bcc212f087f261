/*!
 * Monitoring
 * Structured logging for the toolkit and its workers
 */

mod tracer;

pub use tracer::{init_tracing, WorkerSpan};
