/*!
 * Monitoring
 * Tracing setup shared by the library and the layout tool
 */

mod tracer;

pub use tracer::{init_tracing, TRACE_JSON_ENV};
