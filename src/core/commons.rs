// src/core/commons.rs

use std::borrow::Cow;

/// How paths should be written into a command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Posix,
    Windows,
}

impl PathStyle {
    /// The style of the filesystem the process is running on.
    pub fn host() -> Self {
        if cfg!(windows) { Self::Windows } else { Self::Posix }
    }
}

/// Helper function to wrap a string in quotes and escape internal quotes.
pub fn wrap_value(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\\\""))
}

/// Quotes one token for the shell that matches `style`. `sh` gets single quotes, so
/// `$`, backticks and backslashes reach the program untouched. `cmd` gets [`wrap_value`].
/// Fails only for a NUL byte, which no shell argument can carry.
pub fn quote_for_shell(value: &str, style: PathStyle) -> Result<String, shlex::QuoteError> {
    match style {
        PathStyle::Posix => shlex::try_quote(value).map(Cow::into_owned),
        PathStyle::Windows => Ok(wrap_value(value)),
    }
}

/// Upper-cases the drive letter of a Windows path (`c:\work` -> `C:\work`).
/// Pure string transform; the path does not have to exist.
pub fn normalize_path(path: &str, style: PathStyle) -> String {
    if style == PathStyle::Posix {
        return path.to_string();
    }
    let mut chars = path.chars();
    match (chars.next(), chars.next()) {
        (Some(drive), Some(':')) if drive.is_ascii_alphabetic() => {
            format!("{}:{}", drive.to_ascii_uppercase(), chars.as_str())
        }
        _ => path.to_string(),
    }
}
