//! Domain error types.

/// A parse error with position information for rule parsing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("parse error at position {position}: {message}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    /// Format the error with a caret pointing at the error position in the input.
    pub fn display_with_context(&self, input: &str) -> String {
        let caret = " ".repeat(self.position) + "^";
        format!(
            "{input}\n{caret}\n{err}",
            input = input,
            caret = caret,
            err = self
        )
    }
}

/// Top-level error type for moho.
#[derive(Debug, thiserror::Error)]
pub enum MohoError {
    #[error("insufficient history on {timeframe}: have {have} candles, need {need}")]
    InsufficientHistory {
        timeframe: String,
        have: usize,
        need: usize,
    },

    #[error("informative timeframe {informative} is not a whole multiple of {primary}")]
    MisalignedTimeframes {
        primary: String,
        informative: String,
    },

    #[error("invalid parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("unknown parameter {key}")]
    UnknownParameter { key: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    RuleParse(#[from] ParseError),

    #[error("invalid rule: {reason}")]
    RuleInvalid { reason: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&MohoError> for std::process::ExitCode {
    fn from(err: &MohoError) -> Self {
        let code: u8 = match err {
            MohoError::Io(_) => 1,
            MohoError::ConfigParse { .. }
            | MohoError::ConfigInvalid { .. }
            | MohoError::InvalidParameter { .. }
            | MohoError::UnknownParameter { .. } => 2,
            MohoError::Data { .. } => 3,
            MohoError::RuleParse(_) | MohoError::RuleInvalid { .. } => 4,
            MohoError::InsufficientHistory { .. } | MohoError::MisalignedTimeframes { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_context_points_at_position() {
        let err = ParseError {
            message: "expected ')'".into(),
            position: 6,
        };
        let shown = err.display_with_context("BELOW(rsi");
        let lines: Vec<&str> = shown.lines().collect();
        assert_eq!(lines[0], "BELOW(rsi");
        assert_eq!(lines[1], "      ^");
        assert!(lines[2].contains("position 6"));
    }

    #[test]
    fn insufficient_history_message() {
        let err = MohoError::InsufficientHistory {
            timeframe: "5m".into(),
            have: 10,
            need: 200,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history on 5m: have 10 candles, need 200"
        );
    }

    #[test]
    fn parse_error_converts() {
        let err: MohoError = ParseError {
            message: "x".into(),
            position: 0,
        }
        .into();
        assert!(matches!(err, MohoError::RuleParse(_)));
    }
}
