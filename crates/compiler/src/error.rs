use thiserror::Error;

/// Hard failures of the driver or its configuration — programmer errors, not
/// user-code errors. User-code problems never surface here; they are
/// collected as diagnostics on the batch output.
#[derive(Debug, Error)]
pub enum CompilerError {
    #[error("instruction map is not ready: `{0}` has no concrete opcode")]
    UnmappedOpcode(&'static str),

    #[error("unknown core opcode name `{0}` in instruction map")]
    UnknownCoreOpcode(String),

    #[error("unknown primitive type representation `{0}`")]
    UnknownPrimitive(String),

    #[error("malformed catalog entry: {0}")]
    Catalog(String),

    #[error("malformed configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("a binding is already registered for extension `{0}`")]
    DuplicateBinding(String),

    #[error("no binding is registered for extension `{0}`")]
    MissingBinding(String),

    #[error("no id has been allocated for {group} `{name}`")]
    UnresolvedId { group: String, name: String },

    #[error("malformed binary config: {0}")]
    MalformedBinary(String),
}
