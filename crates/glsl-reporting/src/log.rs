//! Compile log: appends [`Report`]s in encounter order and exposes the
//! text the driver hands back on `shader.log` (`spec.md` §5 "Ordering",
//! §6.2).

use glsl_utils::log_buf::LogBuffer;

use crate::report::Report;

#[derive(Debug, Default)]
pub struct ShaderLog {
    reports: Vec<Report>,
}

impl ShaderLog {
    pub fn new() -> Self {
        Self { reports: Vec::new() }
    }

    pub fn push(&mut self, report: Report) {
        self.reports.push(report);
    }

    pub fn has_errors(&self) -> bool {
        self.reports.iter().any(Report::is_error)
    }

    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Render the log to text in the order reports were pushed, one per
    /// line, the form the driver appends to `Shader::log`.
    pub fn render(&self) -> String {
        let mut buf = LogBuffer::new();
        for report in &self.reports {
            buf.append_line(&report.to_string());
        }
        buf.into_inner()
    }
}
