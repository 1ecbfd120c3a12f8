//! Outgoing commands.

use std::io::{Read, Write};

use tracing::debug;

use super::Opcode;
use crate::transport::{Connection, ConnectionResult};

/// One typed argument frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    Str(String),
    Int(i32),
    Bool(bool),
}

/// An opcode and its arguments, written as consecutive frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    opcode: Opcode,
    args: Vec<Arg>,
}

impl Command {
    pub fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            args: Vec::new(),
        }
    }

    pub fn str(mut self, value: impl Into<String>) -> Self {
        self.args.push(Arg::Str(value.into()));
        self
    }

    pub fn int(mut self, value: i32) -> Self {
        self.args.push(Arg::Int(value));
        self
    }

    pub fn bool(mut self, value: bool) -> Self {
        self.args.push(Arg::Bool(value));
        self
    }

    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    /// Write the opcode and every argument, then flush.
    pub fn write_to<R: Read, W: Write>(&self, conn: &mut Connection<R, W>) -> ConnectionResult<()> {
        debug!(opcode = %self.opcode, args = self.args.len(), "sending command");
        conn.send_string(self.opcode.token())?;
        for arg in &self.args {
            match arg {
                Arg::Str(s) => conn.send_string(s)?,
                Arg::Int(i) => conn.send_int(*i)?,
                Arg::Bool(b) => conn.send_bool(*b)?,
            }
        }
        conn.flush()
    }
}
