//! Server replies.
//!
//! [`Reply`] is opaque to the dispatch engine: it is produced by a connection
//! (or a short-circuiting middleware) and handed back to the caller as is.

use bytes::Bytes;

use crate::Command;

/// A successful reply from the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Reply {
    /// Absent value.
    Nil,
    /// Simple status string such as `OK`, `QUEUED` or `PONG`.
    Status(String),
    /// Signed integer.
    Integer(i64),
    /// Binary-safe string.
    Bulk(Bytes),
    /// Ordered list of nested replies.
    Array(Vec<Reply>),
}

impl Reply {
    /// Returns `true` for [`Reply::Nil`].
    #[must_use]
    pub const fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Status or UTF-8 bulk payload as a string slice.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Status(status) => Some(status),
            Self::Bulk(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Integer payload.
    #[must_use]
    pub const fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Nested replies of an array.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Consume an array reply into its items.
    ///
    /// # Errors
    ///
    /// Returns the reply unchanged if it is not an array.
    pub fn into_array(self) -> std::result::Result<Vec<Self>, Self> {
        match self {
            Self::Array(items) => Ok(items),
            other => Err(other),
        }
    }
}

impl From<&str> for Reply {
    fn from(status: &str) -> Self {
        Self::Status(status.to_owned())
    }
}

impl From<String> for Reply {
    fn from(status: String) -> Self {
        Self::Status(status)
    }
}

impl From<i64> for Reply {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Bytes> for Reply {
    fn from(bytes: Bytes) -> Self {
        Self::Bulk(bytes)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Reply {
    fn from(items: Vec<T>) -> Self {
        items.into_iter().collect()
    }
}

impl<T: Into<Self>> From<Option<T>> for Reply {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Nil, Into::into)
    }
}

/// Echo a command back as an array of bulk strings.
impl From<Command> for Reply {
    fn from(command: Command) -> Self {
        Self::Array(command.into_args().into_iter().map(Self::Bulk).collect())
    }
}

impl<T: Into<Self>> FromIterator<T> for Reply {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::Array(iter.into_iter().map(Into::into).collect())
    }
}
