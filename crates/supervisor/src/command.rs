//! Invocations of the external node binary.

use std::fmt;
use std::path::{Path, PathBuf};

/// A single invocation of the node binary: executable, argument vector, and
/// optional stdin contents.
#[derive(Clone, PartialEq, Eq)]
pub struct NodeCommand {
    /// The arguments to pass to the executable.
    pub args: Vec<String>,

    /// The executable to run.
    pub executable: PathBuf,

    /// File that receives stdout and stderr of a background process.
    pub log_file: Option<PathBuf>,

    /// Data written to the process's stdin, then closed.
    pub stdin: Option<String>,
}

impl NodeCommand {
    /// Creates a new `NodeCommand`.
    #[must_use]
    pub fn new<P: AsRef<Path>, A: Into<String>>(
        executable: P,
        args: impl IntoIterator<Item = A>,
    ) -> Self {
        Self {
            args: args.into_iter().map(Into::into).collect(),
            executable: executable.as_ref().to_path_buf(),
            log_file: None,
            stdin: None,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn with_args<A: Into<String>>(mut self, args: impl IntoIterator<Item = A>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the data piped to stdin.
    #[must_use]
    pub fn with_stdin(mut self, stdin: impl Into<String>) -> Self {
        self.stdin = Some(stdin.into());
        self
    }

    /// Sets the log file used when the process runs in the background.
    #[must_use]
    pub fn with_log_file<P: AsRef<Path>>(mut self, log_file: P) -> Self {
        self.log_file = Some(log_file.as_ref().to_path_buf());
        self
    }
}

// Stdin may carry a mnemonic, so it is never printed.
impl fmt::Debug for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeCommand")
            .field("args", &self.args)
            .field("executable", &self.executable)
            .field("log_file", &self.log_file)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl fmt::Display for NodeCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.executable.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
