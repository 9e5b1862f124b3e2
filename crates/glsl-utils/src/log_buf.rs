//! Append-only text log, used for both the compile log (diagnostics) and
//! the generated IL text (`spec.md` §4.1). The original grows a byte buffer
//! and hands back a `malloc`'d null-terminated copy; here the buffer is
//! just an owned `String` and the "extract" step is `into_inner`.

use std::fmt::{self, Write};

#[derive(Debug, Default, Clone)]
pub struct LogBuffer {
    text: String,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self { text: String::new() }
    }

    pub fn append(&mut self, text: &str) {
        self.text.push_str(text);
    }

    pub fn append_line(&mut self, text: &str) {
        self.text.push_str(text);
        self.text.push('\n');
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn into_inner(self) -> String {
        self.text
    }
}

impl Write for LogBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.text.push_str(s);
        Ok(())
    }
}

impl fmt::Display for LogBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}
