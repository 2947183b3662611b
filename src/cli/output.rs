//! Colored terminal output for build operations.

use std::io::Write;
use termcolor::{BufferWriter, Color, ColorChoice, ColorSpec, WriteColor};

/// Output manager for consistent colored terminal output
#[derive(Debug)]
pub struct OutputManager {
    bufwtr: BufferWriter,
    verbose: bool,
    quiet: bool,
}

impl Clone for OutputManager {
    fn clone(&self) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

impl OutputManager {
    /// Create a new output manager
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            bufwtr: BufferWriter::stdout(ColorChoice::Auto),
            verbose,
            quiet,
        }
    }

    fn print_marked(&self, marker: &str, color: Color, bold: bool, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(bold));
        let _ = write!(&mut buffer, "{marker}");
        let _ = buffer.reset();
        let _ = writeln!(&mut buffer, " {message}");
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print an info message (normal output)
    pub fn info(&self, message: &str) {
        self.print_marked("ℹ", Color::Cyan, false, message);
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        self.print_marked("✓", Color::Green, true, message);
    }

    /// Print a warning message
    pub fn warn(&self, message: &str) {
        self.print_marked("⚠", Color::Yellow, true, message);
    }

    /// Print a verbose message (only in verbose mode)
    pub fn verbose(&self, message: &str) {
        if !self.verbose {
            return;
        }
        self.print_marked("→", Color::Blue, false, message);
    }

    /// Print an error message to stderr (always shown)
    pub fn error(&self, message: &str) {
        let bufwtr = BufferWriter::stderr(ColorChoice::Auto);
        let mut buffer = bufwtr.buffer();
        if buffer
            .set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))
            .is_err()
            || write!(&mut buffer, "✗").is_err()
            || buffer.reset().is_err()
            || writeln!(&mut buffer, " {message}").is_err()
            || bufwtr.print(&buffer).is_err()
        {
            // Stderr failed, fall back to stdout
            println!("✗ {message}");
        }
    }

    /// Print a section header
    pub fn section(&self, title: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer);
        let _ = buffer.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
        let _ = writeln!(&mut buffer, "═══ {title} ═══");
        let _ = buffer.reset();
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print indented text (for sub-items)
    pub fn indent(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "    {message}");
        let _ = self.bufwtr.print(&buffer);
    }

    /// Print a plain message (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.quiet {
            return;
        }
        let mut buffer = self.bufwtr.buffer();
        let _ = writeln!(&mut buffer, "{message}");
        let _ = self.bufwtr.print(&buffer);
    }

    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn is_quiet(&self) -> bool {
        self.quiet
    }
}
