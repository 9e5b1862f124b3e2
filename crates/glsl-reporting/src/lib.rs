//! Hash-reporting-style diagnostic plumbing for the shader compiler:
//! the fixed code taxonomy (`spec.md` §6.4), the [`Report`] value that
//! carries one diagnostic, and the append-only [`log::ShaderLog`] that
//! accumulates them in encounter order.

pub mod codes;
pub mod log;
pub mod report;

pub use codes::DiagnosticCode;
pub use log::ShaderLog;
pub use report::{Report, ReportKind};
