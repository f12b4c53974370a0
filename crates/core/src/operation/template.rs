//! Command templates with an unresolved source slot.

use std::fmt;
use std::path::Path;

use super::error::OperationError;

/// Reserved token marking the unresolved source in a command template.
pub const PLACEHOLDER: &str = "gis_curried";

/// One argument position of a command template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// A fixed argument.
    Literal(String),
    /// The upstream artifact's path, supplied at bind time.
    Source,
}

/// A program plus argument segments, some of which may await a source path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    segments: Vec<Segment>,
}

impl CommandTemplate {
    /// Creates a template for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            segments: Vec::new(),
        }
    }

    /// Parses a whitespace-separated command such as `"gdal_translate -q"`.
    ///
    /// A token equal to [`PLACEHOLDER`] becomes a source slot. A token that
    /// merely contains it is rejected.
    pub fn parse(command: &str) -> Result<Self, OperationError> {
        let mut tokens = command.split_whitespace();
        let program = tokens
            .next()
            .ok_or_else(|| OperationError::configuration("command template is empty"))?;
        if program.contains(PLACEHOLDER) {
            return Err(OperationError::configuration(format!(
                "program name cannot be the source placeholder: {}",
                program
            )));
        }

        let mut template = Self::new(program);
        for token in tokens {
            if token == PLACEHOLDER {
                template.push_source();
            } else {
                template.push_literal(token)?;
            }
        }
        Ok(template)
    }

    /// Appends a fixed argument.
    pub fn push_literal(&mut self, arg: impl Into<String>) -> Result<(), OperationError> {
        let arg = arg.into();
        if arg.contains(PLACEHOLDER) {
            return Err(OperationError::configuration(format!(
                "argument contains the reserved token {}: {}",
                PLACEHOLDER, arg
            )));
        }
        self.segments.push(Segment::Literal(arg));
        Ok(())
    }

    /// Appends a source slot.
    pub fn push_source(&mut self) {
        self.segments.push(Segment::Source);
    }

    /// The program to invoke.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Argument segments in order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Whether any source slot is still unresolved.
    pub fn is_curried(&self) -> bool {
        self.segments.iter().any(|s| matches!(s, Segment::Source))
    }

    /// Substitutes `source` into every source slot.
    ///
    /// Fails with `IncompleteBinding` if a slot exists and no source is given.
    pub fn resolve(&self, source: Option<&Path>) -> Result<ResolvedCommand, OperationError> {
        let mut args = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            match (segment, source) {
                (Segment::Literal(arg), _) => args.push(arg.clone()),
                (Segment::Source, Some(path)) => args.push(path.to_string_lossy().to_string()),
                (Segment::Source, None) => {
                    return Err(OperationError::IncompleteBinding {
                        command: self.to_string(),
                    })
                }
            }
        }
        Ok(ResolvedCommand {
            program: self.program.clone(),
            args,
        })
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for segment in &self.segments {
            match segment {
                Segment::Literal(arg) => write!(f, " {}", arg)?,
                Segment::Source => write!(f, " {}", PLACEHOLDER)?,
            }
        }
        Ok(())
    }
}

/// A fully resolved argument vector, invoked without a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommand {
    program: String,
    args: Vec<String>,
}

impl ResolvedCommand {
    /// Creates a command from a program and its arguments.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// The program to invoke.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

/// Space-joined rendering for logs. Not shell-safe.
impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
