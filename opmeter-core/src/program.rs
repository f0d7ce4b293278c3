//! Program bytes under measurement

use crate::ProgramError;
use std::fmt;

/// An immutable compiled program together with the text it was supplied as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    id: String,
    code: Vec<u8>,
}

impl Program {
    /// Decode a hex program. A leading `0x` and surrounding whitespace are ignored.
    pub fn from_hex(text: &str) -> Result<Self, ProgramError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(ProgramError::Empty);
        }
        let code = hex::decode(digits)?;
        Ok(Self {
            id: trimmed.to_string(),
            code,
        })
    }

    /// Wrap raw bytes; the identifier becomes their hex encoding
    pub fn from_bytes(code: impl Into<Vec<u8>>) -> Self {
        let code = code.into();
        Self {
            id: hex::encode(&code),
            code,
        }
    }

    /// Identifier used in reports
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Raw instruction bytes
    pub fn code(&self) -> &[u8] {
        &self.code
    }

    /// Code length in bytes
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether the program has no bytes
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
