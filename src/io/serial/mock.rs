// src/io/serial/mock.rs
//
// Scripted in-memory port for tests. The script is shared, so a test keeps a
// handle to it after the transport takes ownership of the port.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::rc::Rc;

use super::{PortIo, PortOpener};

#[derive(Debug, Default)]
pub struct PortScript {
    /// Chunks the "device" will deliver, one per read
    pub incoming: VecDeque<Vec<u8>>,
    /// Everything written to the device, one entry per write
    pub written: Vec<Vec<u8>>,
    /// Number of `bytes_to_read` calls (one per poll of a connected transport)
    pub polls: usize,
    /// Make the next poll fail with this error kind
    pub fail_reads: Option<io::ErrorKind>,
    /// Make writes fail with this error kind
    pub fail_writes: Option<io::ErrorKind>,
}

pub type SharedScript = Rc<RefCell<PortScript>>;

pub fn script() -> SharedScript {
    Rc::new(RefCell::new(PortScript::default()))
}

pub struct ScriptedPort(SharedScript);

impl PortIo for ScriptedPort {
    fn bytes_to_read(&mut self) -> io::Result<usize> {
        let mut s = self.0.borrow_mut();
        s.polls += 1;
        if let Some(kind) = s.fail_reads {
            return Err(io::Error::new(kind, "device unplugged"));
        }
        Ok(s.incoming.front().map(Vec::len).unwrap_or(0))
    }

    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut s = self.0.borrow_mut();
        let Some(mut chunk) = s.incoming.pop_front() else {
            return Err(io::Error::new(io::ErrorKind::TimedOut, "no data"));
        };
        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        if n < chunk.len() {
            s.incoming.push_front(chunk.split_off(n));
        }
        Ok(n)
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        let mut s = self.0.borrow_mut();
        if let Some(kind) = s.fail_writes {
            return Err(io::Error::new(kind, "write rejected"));
        }
        s.written.push(data.to_vec());
        Ok(())
    }
}

/// Opener handing out `ScriptedPort`s, or failing like a missing device.
pub struct ScriptedOpener {
    pub script: SharedScript,
    pub fail_with: Option<String>,
}

impl ScriptedOpener {
    pub fn new(script: &SharedScript) -> Self {
        Self {
            script: script.clone(),
            fail_with: None,
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            script: script(),
            fail_with: Some(reason.to_string()),
        }
    }
}

impl PortOpener for ScriptedOpener {
    fn open(&self, _port: &str, _baud: u32) -> Result<Box<dyn PortIo>, String> {
        match &self.fail_with {
            Some(reason) => Err(reason.clone()),
            None => Ok(Box::new(ScriptedPort(self.script.clone()))),
        }
    }
}
