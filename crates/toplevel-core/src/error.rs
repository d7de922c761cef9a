use std::fmt;

/// Machine-readable error codes for scripting around `apt-toplevel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    PackageNotFound,
    DatabaseUnreadable,
    DatabaseMalformed,
    ConfigParseError,
    InternalInvariant,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PackageNotFound => "E1001",
            Self::DatabaseUnreadable => "E2001",
            Self::DatabaseMalformed => "E2002",
            Self::ConfigParseError => "E3001",
            Self::InternalInvariant => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::PackageNotFound => "Package not found in package database",
            Self::DatabaseUnreadable => "Package database unreadable",
            Self::DatabaseMalformed => "Package database malformed",
            Self::ConfigParseError => "Config file parse error",
            Self::InternalInvariant => "Internal invariant violated",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::PackageNotFound => {
                Some("Check the spelling, or qualify the name with an architecture (name:arch).")
            }
            Self::DatabaseUnreadable => {
                Some("Check --root-dir and that var/lib/dpkg/status is readable.")
            }
            Self::DatabaseMalformed => Some("Repair the dpkg status file or apt lists and retry."),
            Self::ConfigParseError => Some("Fix syntax in apt-toplevel/config.toml and retry."),
            Self::InternalInvariant => Some("This is a bug in apt-toplevel. Report it with logs."),
        }
    }

    /// Process exit status for this class of failure.
    #[must_use]
    pub const fn exit_code(self) -> u8 {
        match self {
            Self::PackageNotFound => 1,
            Self::DatabaseUnreadable | Self::DatabaseMalformed | Self::ConfigParseError => 3,
            Self::InternalInvariant => 70,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 5] = [
        ErrorCode::PackageNotFound,
        ErrorCode::DatabaseUnreadable,
        ErrorCode::DatabaseMalformed,
        ErrorCode::ConfigParseError,
        ErrorCode::InternalInvariant,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::DatabaseMalformed.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn invariant_exit_code_differs_from_input_errors() {
        assert_ne!(
            ErrorCode::InternalInvariant.exit_code(),
            ErrorCode::PackageNotFound.exit_code()
        );
        assert_ne!(
            ErrorCode::InternalInvariant.exit_code(),
            ErrorCode::DatabaseUnreadable.exit_code()
        );
        assert!(ALL.iter().all(|c| c.exit_code() != 0 && c.exit_code() != 2));
    }
}
