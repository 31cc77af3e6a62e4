//! Commands sent to the server.
//!
//! A [`Command`] is an ordered list of binary-safe tokens. Numbers are
//! rendered in decimal, so `Command::new("GET").arg(2)` is `["GET", "2"]`.
//!
//! # Example
//!
//! ```
//! use ferry_core::Command;
//!
//! let get = Command::new("GET").arg(2);
//! assert_eq!(get, Command::from(["GET", "2"]));
//! assert_eq!(get.name(), Some("GET"));
//! ```

use std::fmt;

use bytes::Bytes;

/// Conversion into a single command token.
pub trait IntoArg {
    /// Render this value as a command token.
    fn into_arg(self) -> Bytes;
}

impl IntoArg for Bytes {
    fn into_arg(self) -> Bytes {
        self
    }
}

impl IntoArg for &str {
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl IntoArg for String {
    fn into_arg(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoArg for &String {
    fn into_arg(self) -> Bytes {
        self.as_str().into_arg()
    }
}

impl IntoArg for &[u8] {
    fn into_arg(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl IntoArg for Vec<u8> {
    fn into_arg(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoArg for f64 {
    fn into_arg(self) -> Bytes {
        Bytes::from(self.to_string())
    }
}

macro_rules! int_arg {
    ($($ty:ty),*) => {
        $(
            impl IntoArg for $ty {
                fn into_arg(self) -> Bytes {
                    Bytes::from(self.to_string())
                }
            }
        )*
    };
}

int_arg!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// An ordered sequence of command tokens.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Command {
    args: Vec<Bytes>,
}

impl Command {
    /// Start a command with its name.
    #[must_use]
    pub fn new(name: impl IntoArg) -> Self {
        Self {
            args: vec![name.into_arg()],
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl IntoArg) -> Self {
        self.push(arg);
        self
    }

    /// Append an argument in place.
    pub fn push(&mut self, arg: impl IntoArg) {
        self.args.push(arg.into_arg());
    }

    /// The command name (first token), if it is valid UTF-8.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.args
            .first()
            .and_then(|name| std::str::from_utf8(name).ok())
    }

    /// All tokens, name included.
    #[must_use]
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Returns `true` if the command has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// Consume into the token list.
    #[must_use]
    pub fn into_args(self) -> Vec<Bytes> {
        self.args
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Command")?;
        f.debug_list()
            .entries(self.args.iter().map(|arg| String::from_utf8_lossy(arg)))
            .finish()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, arg) in self.args.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            f.write_str(&String::from_utf8_lossy(arg))?;
        }
        Ok(())
    }
}

impl From<&str> for Command {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl<A: IntoArg, const N: usize> From<[A; N]> for Command {
    fn from(args: [A; N]) -> Self {
        args.into_iter().collect()
    }
}

impl<A: IntoArg> From<Vec<A>> for Command {
    fn from(args: Vec<A>) -> Self {
        args.into_iter().collect()
    }
}

impl<A: IntoArg> FromIterator<A> for Command {
    fn from_iter<I: IntoIterator<Item = A>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().map(IntoArg::into_arg).collect(),
        }
    }
}

impl<A: IntoArg> Extend<A> for Command {
    fn extend<I: IntoIterator<Item = A>>(&mut self, iter: I) {
        self.args.extend(iter.into_iter().map(IntoArg::into_arg));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_are_rendered_in_decimal() {
        let command = Command::new("GET").arg(2);
        assert_eq!(command.args(), &[Bytes::from("GET"), Bytes::from("2")]);

        let command = Command::new("INCRBYFLOAT").arg("k").arg(1.5);
        assert_eq!(command.to_string(), "INCRBYFLOAT k 1.5");
    }

    #[test]
    fn conversions() {
        assert_eq!(Command::from("PING"), Command::new("PING"));
        assert_eq!(
            Command::from(vec!["SET", "k", "v"]),
            Command::from(["SET", "k", "v"])
        );

        let mut command = Command::new("DEL");
        command.extend(["a", "b"]);
        assert_eq!(command.len(), 3);
    }

    #[test]
    fn name_and_emptiness() {
        assert_eq!(Command::from(["ECHO", "hi"]).name(), Some("ECHO"));
        assert!(Command::default().is_empty());
        assert_eq!(Command::default().name(), None);
    }

    #[test]
    fn debug_is_readable() {
        let debug = format!("{:?}", Command::from(["GET", "2"]));
        assert_eq!(debug, r#"Command["GET", "2"]"#);
    }
}
