//! Actions
//!
//! An [`Action`] is a unit of work performed against a [`Connection`]. A
//! [`Cmd`] is the generic one: it writes its own request and reads its own
//! response.
//!
//! ```no_run
//! use skyhash::{dial, Client, Cmd, DialConfig, SkyString};
//!
//! # fn main() -> skyhash::Result<()> {
//! let conn = dial("tcp", "127.0.0.1:2003", &DialConfig::default())?;
//!
//! let mut get = Cmd::new(SkyString::default(), "GET", ["foo"]);
//! conn.execute(&mut get)?;
//! println!("foo = {}", get.into_inner().as_str());
//! # Ok(())
//! # }
//! ```

use std::io::{BufRead, Write};

use crate::error::Result;
use crate::network::Connection;
use crate::protocol::{AnyArray, Marshal, Query, Unmarshal};

/// A task performed using a connection
pub trait Action {
    /// Keys acted on. May be empty.
    fn keys(&self) -> &[String];

    /// Perform the action
    fn run(&mut self, conn: &Connection) -> Result<()>;
}

/// An action that writes its own request and reads its own response
pub trait CmdAction: Action + Marshal + Unmarshal {}

impl<T: Action + Marshal + Unmarshal> CmdAction for T {}

/// Something that carries out actions
pub trait Client {
    /// Perform an action
    fn execute(&self, action: &mut dyn Action) -> Result<()>;

    /// After closing, every further call fails
    fn close(&self) -> Result<()>;
}

/// A single command and the receiver for its reply
///
/// By default the first argument is reported as the key; use
/// [`Cmd::with_keys`] for commands that touch several keys or none.
#[derive(Debug, Clone)]
pub struct Cmd<R> {
    args: AnyArray,
    keys: Vec<String>,
    receiver: R,
}

impl<R: Unmarshal> Cmd<R> {
    pub fn new<I, S>(receiver: R, name: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut elements = vec![name.into()];
        elements.extend(args.into_iter().map(Into::into));
        let keys = elements.get(1).cloned().into_iter().collect();
        Self {
            args: AnyArray(elements),
            keys,
            receiver,
        }
    }

    /// Override the reported keys
    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Command name followed by its arguments
    pub fn args(&self) -> &[String] {
        &self.args.0
    }

    pub fn receiver(&self) -> &R {
        &self.receiver
    }

    /// Take the decoded reply
    pub fn into_inner(self) -> R {
        self.receiver
    }
}

impl<R> Marshal for Cmd<R> {
    fn marshal(&self, writer: &mut dyn Write) -> Result<()> {
        Query::single(self.args.clone()).marshal(writer)
    }
}

impl<R: Unmarshal> Unmarshal for Cmd<R> {
    fn unmarshal(&mut self, reader: &mut dyn BufRead) -> Result<()> {
        self.receiver.unmarshal(reader)
    }
}

impl<R: Unmarshal> Action for Cmd<R> {
    fn keys(&self) -> &[String] {
        &self.keys
    }

    fn run(&mut self, conn: &Connection) -> Result<()> {
        tracing::trace!("Running {:?} on {}", self.args.0.first(), conn.peer_addr());
        conn.encode(&*self)?;
        conn.decode(self)
    }
}
