/// Error categories surfaced to the binary.
///
/// The category decides the process exit code:
/// - `2`: bad input (usage, unreadable file, missing columns)
/// - `3`: the file parsed but no usable rows remain
/// - `4`: runtime failures while writing exports or driving the terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Io,
    Schema { missing: Vec<String> },
    EmptyDataset,
    Export,
    Terminal,
}

impl ErrorKind {
    pub fn exit_code(&self) -> u8 {
        match self {
            ErrorKind::Usage | ErrorKind::Io | ErrorKind::Schema { .. } => 2,
            ErrorKind::EmptyDataset => 3,
            ErrorKind::Export | ErrorKind::Terminal => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn export(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Export, message)
    }

    pub fn terminal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Terminal, message)
    }

    /// Required columns are absent. Fatal: nothing downstream may run.
    pub fn schema(missing: Vec<String>) -> Self {
        let message = format!("Missing required column(s): {}", missing.join(", "));
        Self::new(ErrorKind::Schema { missing }, message)
    }

    pub fn empty_dataset(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::EmptyDataset, message)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Columns reported by a schema failure (empty for every other kind).
    pub fn missing_columns(&self) -> &[String] {
        match &self.kind {
            ErrorKind::Schema { missing } => missing,
            _ => &[],
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code())
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
