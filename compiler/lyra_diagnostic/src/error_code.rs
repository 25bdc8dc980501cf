//! Error codes for analyzer diagnostics.

use std::fmt;

/// Error codes for all analyzer diagnostics.
///
/// Format: E#### grouped by concern:
/// - E20xx: Names and scopes
/// - E21xx: Types
/// - E22xx: Effects
/// - E23xx: Overload resolution
/// - E24xx: Control flow / reachability
/// - E25xx: Attributes and access
/// - E9xxx: Internal analyzer errors
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    // Names and scopes (E20xx)
    /// Unknown identifier
    E2001,
    /// Duplicate definition in the same scope
    E2002,
    /// Ambiguous unqualified reference
    E2003,
    /// Unknown qualifier
    E2004,
    /// Identifier exceeds maximum length (truncated)
    E2005,
    /// `using` target is not a module
    E2006,
    /// Definition used before it is defined
    E2007,

    // Types (E21xx)
    /// Type mismatch (subtype constraint failed)
    E2101,
    /// Inheritance cycle
    E2102,
    /// Supertype is not a class or interface
    E2103,
    /// Recursive function type cannot be inferred
    E2104,
    /// Symbol or expression used in a position its kind does not support
    E2105,
    /// Assignment target is not mutable
    E2106,
    /// Condition is not a failure context or logic value
    E2107,
    /// Wrong number of call arguments
    E2108,

    // Effects (E22xx)
    /// Required effect not allowed in this context
    E2201,
    /// `transacts` effect not allowed in this context
    E2202,
    /// Failure-capable expression outside a failure context
    E2203,
    /// Unknown effect attribute
    E2204,

    // Overloads (E23xx)
    /// No matching overload
    E2301,
    /// Ambiguous call
    E2302,
    /// Symbol is ambiguous between a type and functions
    E2303,
    /// Function used in type position
    E2304,

    // Control flow (E24xx)
    /// Unreachable code
    E2401,
    /// `break` outside a loop
    E2402,
    /// May not break or return out of `defer`
    E2403,
    /// Infinite loop with no exit
    E2404,
    /// `return` outside a function
    E2405,

    // Attributes and access (E25xx)
    /// Unknown attribute
    E2501,
    /// Attribute not allowed on this definition
    E2502,
    /// Definition is not accessible from this scope
    E2503,
    /// Override target not found in an ancestor scope
    E2504,
    /// Override signature is incompatible
    E2505,
    /// Use of deprecated definition
    E2506,
    /// Use of experimental definition
    E2507,

    // Internal errors (E9xxx)
    /// Internal analyzer invariant violated
    E9001,
}

impl ErrorCode {
    /// The short code string, e.g. `"E2101"`.
    pub fn as_str(self) -> &'static str {
        macro_rules! codes {
            ($($code:ident),* $(,)?) => {
                match self { $(ErrorCode::$code => stringify!($code),)* }
            };
        }
        codes!(
            E2001, E2002, E2003, E2004, E2005, E2006, E2007, E2101, E2102, E2103, E2104, E2105,
            E2106, E2107, E2108, E2201, E2202, E2203, E2204, E2301, E2302, E2303, E2304, E2401,
            E2402, E2403, E2404, E2405, E2501, E2502, E2503, E2504, E2505, E2506, E2507, E9001,
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
