//! Subprocess-backed instrument clients.
//!
//! Both external programs speak a line-oriented text protocol on
//! stdio. Each client owns a reader thread that forwards raw output
//! chunks over a bounded channel, so every blocking wait has a real
//! deadline (`recv_timeout`) even when the child stops mid-line: the
//! ready prompt of the meter reader, notably, arrives without a
//! trailing newline.

use crate::proto::{NEEDS_CALIBRATION_MARKER, READY_MARKER, RESULT_MARKER, parse_result_line};
use crate::{Colorimeter, InstrumentError, InstrumentResult, PatternGenerator, PatternMode};
use hdrcal_math::Vec3;
use std::io::{Read, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender, sync_channel};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const INIT_TIMEOUT: Duration = Duration::from_secs(15);
const ACK_TIMEOUT: Duration = Duration::from_secs(10);
const MEASURE_TIMEOUT: Duration = Duration::from_secs(30);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(50);

/// Spawns a child with piped stdio plus a chunk-forwarding reader
/// thread.
fn spawn_piped(
    program: &str,
    args: &[String],
    process: &'static str,
) -> InstrumentResult<(Child, ChildStdin, Receiver<String>)> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()?;
    let stdin = child.stdin.take().expect("stdin was piped");
    let mut stdout = child.stdout.take().expect("stdout was piped");

    let (tx, rx): (SyncSender<String>, Receiver<String>) = sync_channel(64);
    std::thread::Builder::new()
        .name(format!("{process}-reader"))
        .spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match stdout.read(&mut buf) {
                    Ok(0) | Err(_) => break, // EOF closes the channel
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if tx.send(chunk).is_err() {
                            break;
                        }
                    }
                }
            }
        })?;
    Ok((child, stdin, rx))
}

/// Accumulates chunks into `buf` until `marker` appears or `deadline`
/// passes.
fn wait_for_marker(
    rx: &Receiver<String>,
    buf: &mut String,
    marker: &str,
    deadline: Duration,
    operation: &'static str,
    process: &'static str,
) -> InstrumentResult<()> {
    let start = Instant::now();
    loop {
        if buf.contains(marker) {
            return Ok(());
        }
        let remaining = deadline
            .checked_sub(start.elapsed())
            .ok_or(InstrumentError::Timeout {
                operation,
                deadline,
            })?;
        match rx.recv_timeout(remaining) {
            Ok(chunk) => buf.push_str(&chunk),
            Err(RecvTimeoutError::Timeout) => {
                return Err(InstrumentError::Timeout {
                    operation,
                    deadline,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(InstrumentError::ProcessExited { process });
            }
        }
    }
}

/// Pattern generator driven over stdio.
///
/// Protocol: a `mode …` line at startup, then one
/// `window 100 R G B` line per patch, each acknowledged with one
/// output line.
pub struct ProcessPatternGenerator {
    child: Child,
    stdin: ChildStdin,
    rx: Receiver<String>,
    buf: String,
    mode: PatternMode,
    stopped: bool,
}

impl ProcessPatternGenerator {
    /// Spawns the generator and selects `mode`.
    pub fn spawn(program: &str, mode: PatternMode) -> InstrumentResult<Self> {
        let (child, stdin, rx) = spawn_piped(program, &[], "pattern generator")?;
        let mut generator = Self {
            child,
            stdin,
            rx,
            buf: String::new(),
            mode,
            stopped: false,
        };
        writeln!(generator.stdin, "{} ", mode.command())?;
        generator.stdin.flush()?;
        generator.wait_ack("set mode")?;
        Ok(generator)
    }

    /// Waits for one acknowledgement line.
    fn wait_ack(&mut self, operation: &'static str) -> InstrumentResult<()> {
        wait_for_marker(
            &self.rx,
            &mut self.buf,
            "\n",
            ACK_TIMEOUT,
            operation,
            "pattern generator",
        )?;
        if let Some(end) = self.buf.find('\n') {
            let ack: String = self.buf.drain(..=end).collect();
            debug!(ack = ack.trim(), "pattern generator ack");
        }
        Ok(())
    }
}

impl PatternGenerator for ProcessPatternGenerator {
    fn display(&mut self, rgb: [u32; 3]) -> InstrumentResult<()> {
        write!(self.stdin, "window 100 {} {} {} \r\n", rgb[0], rgb[1], rgb[2])?;
        self.stdin.flush()?;
        self.wait_ack("display patch")
    }

    fn mode(&self) -> PatternMode {
        self.mode
    }

    fn shutdown(&mut self) -> InstrumentResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        if self.child.try_wait()?.is_none() {
            self.child.kill()?;
            self.child.wait()?;
        }
        Ok(())
    }
}

impl Drop for ProcessPatternGenerator {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("pattern generator shutdown failed: {e}");
        }
    }
}

/// Colorimeter reader driven over stdio.
///
/// Startup blocks until the reader prints its ready prompt. A
/// measurement sends the read command and scans output for the result
/// line; stale output from a previous interaction is drained first so
/// a late line can never satisfy the wrong request.
pub struct ProcessColorimeter {
    child: Child,
    stdin: ChildStdin,
    rx: Receiver<String>,
    buf: String,
    needs_cal: bool,
    stopped: bool,
}

impl ProcessColorimeter {
    /// Spawns the reader and waits for its ready prompt.
    pub fn spawn(program: &str, args: &[String]) -> InstrumentResult<Self> {
        let (child, stdin, rx) = spawn_piped(program, args, "meter reader")?;
        let mut meter = Self {
            child,
            stdin,
            rx,
            buf: String::new(),
            needs_cal: false,
            stopped: false,
        };
        wait_for_marker(
            &meter.rx,
            &mut meter.buf,
            READY_MARKER,
            INIT_TIMEOUT,
            "meter reader startup",
            "meter reader",
        )?;
        meter.scan_calibration_flag();
        meter.buf.clear();
        Ok(meter)
    }

    fn scan_calibration_flag(&mut self) {
        if self.buf.contains(NEEDS_CALIBRATION_MARKER) {
            self.needs_cal = true;
        }
    }

    fn drain_stale(&mut self) {
        while let Ok(chunk) = self.rx.try_recv() {
            self.buf.push_str(&chunk);
        }
        self.scan_calibration_flag();
        self.buf.clear();
    }
}

impl Colorimeter for ProcessColorimeter {
    fn measure(&mut self) -> InstrumentResult<Vec3> {
        self.drain_stale();
        self.stdin.write_all(b"x")?;
        self.stdin.flush()?;

        // Wait until a complete result line (marker plus its newline)
        // has arrived
        let start = Instant::now();
        let line = loop {
            if let Some(pos) = self.buf.find(RESULT_MARKER) {
                if let Some(end) = self.buf[pos..].find('\n') {
                    break self.buf[pos..pos + end].trim_end().to_string();
                }
            }
            let remaining = MEASURE_TIMEOUT.checked_sub(start.elapsed()).ok_or(
                InstrumentError::Timeout {
                    operation: "measure",
                    deadline: MEASURE_TIMEOUT,
                },
            )?;
            match self.rx.recv_timeout(remaining) {
                Ok(chunk) => self.buf.push_str(&chunk),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(InstrumentError::Timeout {
                        operation: "measure",
                        deadline: MEASURE_TIMEOUT,
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(InstrumentError::ProcessExited {
                        process: "meter reader",
                    });
                }
            }
        };
        self.scan_calibration_flag();
        self.buf.clear();
        parse_result_line(&line)
    }

    fn needs_calibration(&self) -> bool {
        self.needs_cal
    }

    fn calibrate(&mut self) -> InstrumentResult<()> {
        // The reader's own calibration routine; it reprints the ready
        // prompt once the white reference has been read.
        self.drain_stale();
        self.stdin.write_all(b"k")?;
        self.stdin.flush()?;
        wait_for_marker(
            &self.rx,
            &mut self.buf,
            READY_MARKER,
            SHUTDOWN_TIMEOUT,
            "instrument calibration",
            "meter reader",
        )?;
        self.needs_cal = self.buf.contains(NEEDS_CALIBRATION_MARKER);
        self.buf.clear();
        Ok(())
    }

    fn shutdown(&mut self) -> InstrumentResult<()> {
        if self.stopped {
            return Ok(());
        }
        self.stopped = true;
        // Ask politely first; the reader needs two q's to unwind its
        // menu, then give it a bounded grace period
        let _ = self.stdin.write_all(b"qq");
        let _ = self.stdin.flush();
        let start = Instant::now();
        while start.elapsed() < SHUTDOWN_TIMEOUT {
            if self.child.try_wait()?.is_some() {
                return Ok(());
            }
            match self.rx.recv_timeout(Duration::from_millis(100)) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => continue,
            }
        }
        if self.child.try_wait()?.is_none() {
            warn!("meter reader ignored quit, killing");
            self.child.kill()?;
            self.child.wait()?;
        }
        Ok(())
    }
}

impl Drop for ProcessColorimeter {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!("meter reader shutdown failed: {e}");
        }
    }
}
