//! Indentation-aware line buffer used as the body of every code region.

/// Accumulates generated source lines at a tracked indentation depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndentedBuffer {
    lines: Vec<String>,
    /// Current indentation depth
    depth: usize,
    /// Spaces per indentation level
    tab_width: usize,
}

impl Default for IndentedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl IndentedBuffer {
    pub fn new() -> Self {
        Self::with_tab_width(4)
    }

    pub fn with_tab_width(tab_width: usize) -> Self {
        Self { lines: Vec::new(), depth: 0, tab_width }
    }

    /// Get current indentation string.
    pub fn prefix(&self) -> String {
        " ".repeat(self.depth * self.tab_width)
    }

    /// Append one line at the current depth. Blank lines carry no indentation.
    pub fn writeline(&mut self, line: impl AsRef<str>) {
        let line = line.as_ref();
        if line.trim().is_empty() {
            self.lines.push(String::new());
        } else {
            self.lines.push(format!("{}{line}", self.prefix()));
        }
    }

    pub fn writelines<I>(&mut self, lines: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        for line in lines {
            self.writeline(line);
        }
    }

    /// Append another buffer's lines, re-indented under the current depth.
    pub fn splice(&mut self, other: &IndentedBuffer) {
        let prefix = self.prefix();
        for line in &other.lines {
            if line.is_empty() {
                self.lines.push(String::new());
            } else {
                self.lines.push(format!("{prefix}{line}"));
            }
        }
    }

    /// Increase indentation depth.
    pub fn push_indent(&mut self) {
        self.depth += 1;
    }

    /// Decrease indentation depth.
    pub fn pop_indent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Run `f` one level deeper, restoring the depth afterwards.
    pub fn indented<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.push_indent();
        let result = f(self);
        self.pop_indent();
        result
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Full contents, one newline-terminated line per entry.
    pub fn getvalue(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Contents without leading or trailing whitespace.
    pub fn trimmed(&self) -> String {
        self.getvalue().trim().to_string()
    }
}
