use std::{borrow::Cow, fmt, panic::Location};

/// Human-friendly error message that records where it was raised.
///
/// Every error enum in the workspace wraps one of these so a failed pipeline
/// compilation can point at both the offending key and the call-site that
/// rejected it. Build one with [`DiagnosticMessage::new`] or the [`diag!`]
/// macro.
#[derive(Clone, Debug)]
pub struct DiagnosticMessage {
    message: Cow<'static, str>,
    location: &'static Location<'static>,
}

impl DiagnosticMessage {
    #[track_caller]
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            message: message.into(),
            location: Location::caller(),
        }
    }

    pub fn message(&self) -> &str {
        self.message.as_ref()
    }

    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Prefix the message with extra context (e.g. the step id being
    /// expanded) while keeping the original call-site.
    pub fn with_context(self, context: impl fmt::Display) -> Self {
        Self {
            message: Cow::Owned(format!("{}: {}", context, self.message)),
            location: self.location,
        }
    }
}

impl fmt::Display for DiagnosticMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (at {}:{})",
            self.message,
            self.location.file(),
            self.location.line()
        )
    }
}

/// `format!`-style constructor for [`DiagnosticMessage`].
#[macro_export]
macro_rules! diag {
    ($msg:literal $(,)?) => {
        $crate::error::diagnostics::DiagnosticMessage::new($msg)
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::error::diagnostics::DiagnosticMessage::new(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_call_site() {
        let msg = DiagnosticMessage::new("missing etl.s3_etl_bucket");
        let rendered = msg.to_string();
        assert!(rendered.starts_with("missing etl.s3_etl_bucket (at "));
        assert!(rendered.contains("diagnostics.rs"));
    }

    #[test]
    fn context_is_prefixed() {
        let msg = crate::diag!("unknown node {}", "orders").with_context("step load0");
        assert_eq!(msg.message(), "step load0: unknown node orders");
    }
}
