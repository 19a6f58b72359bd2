//! Process Runner
//!
//! Launches one prover invocation for a (query, tier) pair and turns it into
//! an [`Attempt`]. The child leads its own process group; on deadline or
//! cancellation the whole group is SIGKILLed, stragglers that left the group
//! are found through `/proc`, and the result is verified before returning.

use crate::shutdown::CancelToken;
use std::ffi::OsString;
use std::fs;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};
use stratabench_core::{
    Attempt, AttemptOutcome, BoundedOutput, DEFAULT_OUTPUT_LIMIT, Query, Tier, classify_output,
};
use thiserror::Error;
use tracing::{debug, warn};

/// How often a running attempt checks for exit, deadline and cancellation
pub const POLL_TICK: Duration = Duration::from_millis(10);

/// Status word recorded when the prover could not be started
pub const SPAWN_ERROR: &str = "SpawnError";

/// How long output readers may lag behind process exit
const READER_GRACE: Duration = Duration::from_secs(2);

/// Poll ticks between descendant snapshots
const WATCH_EVERY: u32 = 5;

/// How long the hardkill waits for the group to disappear
const KILL_VERIFY: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to prepare scratch file in {dir}: {source}")]
    Scratch {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to wait for prover (pid {pid}): {source}")]
    Wait {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// Runs single attempts; the seam between tier selection and processes
pub trait AttemptRunner: Sync {
    /// Run `query` against `tier` for at most `limit`
    fn run_attempt(
        &self,
        query: &Query,
        tier: &Tier,
        limit: Duration,
        cancel: &CancelToken,
    ) -> Result<Attempt, RunnerError>;
}

/// Prover binary plus argument template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProverCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ProverCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Expand `{input}` and `{timeout}`; the input path is appended when no
    /// argument mentions it
    pub fn args_for(&self, input: &Path, limit: Duration) -> Vec<OsString> {
        let seconds = timeout_arg(limit).to_string();
        let mut saw_input = false;
        let mut args: Vec<OsString> = self
            .args
            .iter()
            .map(|arg| {
                if arg == "{input}" {
                    saw_input = true;
                    return input.as_os_str().to_os_string();
                }
                if arg.contains("{input}") {
                    saw_input = true;
                }
                arg.replace("{input}", &input.to_string_lossy())
                    .replace("{timeout}", &seconds)
                    .into()
            })
            .collect();
        if !saw_input {
            args.push(input.as_os_str().to_os_string());
        }
        args
    }
}

/// Tier limit in whole seconds, rounded up, never zero
pub fn timeout_arg(limit: Duration) -> u64 {
    let secs = limit.as_secs() + u64::from(limit.subsec_nanos() > 0);
    secs.max(1)
}

/// Runner settings shared by every attempt
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Bytes kept from stdout and from stderr
    pub output_limit: usize,
    /// Scratch directory, system temp if `None`
    pub scratch_dir: Option<PathBuf>,
    /// Raw output of unproved attempts is written here
    pub raw_log_dir: Option<PathBuf>,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            output_limit: DEFAULT_OUTPUT_LIMIT,
            scratch_dir: None,
            raw_log_dir: None,
        }
    }
}

/// Runs the external prover as a child process
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    command: ProverCommand,
    options: RunnerOptions,
}

#[derive(Clone, Copy)]
enum Ending {
    Exited(ExitStatus),
    Deadline,
    Cancelled,
}

impl ProcessRunner {
    pub fn new(command: ProverCommand, options: RunnerOptions) -> Self {
        Self { command, options }
    }

    pub fn command(&self) -> &ProverCommand {
        &self.command
    }

    fn scratch_file(&self, query: &Query, tier: &Tier) -> Result<tempfile::NamedTempFile, RunnerError> {
        let dir = self
            .options
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        let scratch_err = |source: io::Error| RunnerError::Scratch {
            dir: dir.clone(),
            source,
        };
        fs::create_dir_all(&dir).map_err(scratch_err)?;
        let mut file = tempfile::Builder::new()
            .prefix(&format!("strata_{}_{}_", file_safe(&query.id), file_safe(tier.name())))
            .suffix(".p")
            .tempfile_in(&dir)
            .map_err(scratch_err)?;
        file.write_all(tier.payload(&query.formula).as_bytes())
            .and_then(|()| file.flush())
            .map_err(scratch_err)?;
        Ok(file)
    }

    fn spawn_failure(&self, tier: &Tier, started: Instant, limit: Duration, err: &io::Error) -> Attempt {
        Attempt {
            tier_rank: tier.rank(),
            tier_name: tier.name().to_string(),
            started,
            deadline: limit,
            outcome: AttemptOutcome::Error,
            szs_status: SPAWN_ERROR.to_string(),
            elapsed: started.elapsed(),
            exit_code: None,
            output: String::new(),
            detail: Some(format!(
                "failed to spawn {}: {}",
                self.command.program.display(),
                err
            )),
        }
    }

    fn save_raw_log(&self, query: &Query, tier: &Tier, attempt: &Attempt) {
        let Some(dir) = &self.options.raw_log_dir else {
            return;
        };
        let path = dir.join(raw_log_name(&query.id, tier.name()));
        let mut text = format!(
            "# query: {}\n# tier: {} {} ({})\n# outcome: {} ({})\n# elapsed: {} ms, limit {} s, exit {}\n",
            query.id,
            tier.rank(),
            tier.name(),
            tier.axioms_path().display(),
            attempt.outcome,
            attempt.szs_status,
            attempt.elapsed.as_millis(),
            timeout_arg(attempt.deadline),
            attempt
                .exit_code
                .map_or_else(|| "signal".to_string(), |c| c.to_string()),
        );
        if let Some(detail) = &attempt.detail {
            for line in detail.lines() {
                text.push_str("# ");
                text.push_str(line);
                text.push('\n');
            }
        }
        text.push_str(&attempt.output);

        if let Err(e) = fs::create_dir_all(dir).and_then(|()| fs::write(&path, text)) {
            warn!(path = %path.display(), error = %e, "failed to write raw log");
        }
    }
}

impl AttemptRunner for ProcessRunner {
    fn run_attempt(
        &self,
        query: &Query,
        tier: &Tier,
        limit: Duration,
        cancel: &CancelToken,
    ) -> Result<Attempt, RunnerError> {
        // Removed on drop, whichever way this function returns.
        let scratch = self.scratch_file(query, tier)?;

        let mut cmd = Command::new(&self.command.program);
        cmd.args(self.command.args_for(scratch.path(), limit))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .process_group(0);

        let started = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(query = %query.id, tier = tier.name(), error = %e, "prover spawn failed");
                return Ok(self.spawn_failure(tier, started, limit, &e));
            }
        };
        let pid = child.id();
        debug!(query = %query.id, tier = tier.name(), pid, ?limit, "attempt started");

        let pipes = [
            child.stdout.as_ref().map(|s| s.as_raw_fd()),
            child.stderr.as_ref().map(|s| s.as_raw_fd()),
        ];
        let mut watch = DescendantWatch::new(pid as i32, pipe_links(pipes.into_iter().flatten()));

        let limit_bytes = self.options.output_limit;
        let stdout = spawn_reader(child.stdout.take(), limit_bytes);
        let stderr = spawn_reader(child.stderr.take(), limit_bytes);

        let deadline = started + limit;
        let mut tick: u32 = 0;
        let ending = loop {
            match child.try_wait() {
                Ok(Some(status)) => break Ending::Exited(status),
                Ok(None) => {}
                Err(source) => {
                    hardkill(&mut child, &mut watch);
                    return Err(RunnerError::Wait { pid, source });
                }
            }
            if cancel.is_cancelled() {
                break Ending::Cancelled;
            }
            let now = Instant::now();
            if now >= deadline {
                break Ending::Deadline;
            }
            if tick % WATCH_EVERY == 0 {
                watch.refresh();
            }
            tick = tick.wrapping_add(1);
            thread::sleep(POLL_TICK.min(deadline - now));
        };
        let elapsed = started.elapsed();

        let kill = match ending {
            // Helpers left behind, in the group or detached from it, die with the attempt.
            Ending::Exited(_) => sweep_exited(pid as libc::pid_t, &watch),
            Ending::Deadline | Ending::Cancelled => Some(hardkill(&mut child, &mut watch)),
        };

        let mut output = BoundedOutput::new(limit_bytes.saturating_mul(2));
        output.append(&collect(stdout, limit_bytes, READER_GRACE));
        output.append(&collect(stderr, limit_bytes, READER_GRACE));
        let output = output.to_string_lossy();

        let (outcome, szs_status, exit_code) = match ending {
            Ending::Exited(status) => {
                let verdict = classify_output(&output, status.code());
                (verdict.outcome, verdict.szs_status, status.code())
            }
            Ending::Deadline => (AttemptOutcome::TimedOut, "Timeout".to_string(), None),
            Ending::Cancelled => (AttemptOutcome::Interrupted, "Interrupted".to_string(), None),
        };

        let attempt = Attempt {
            tier_rank: tier.rank(),
            tier_name: tier.name().to_string(),
            started,
            deadline: limit,
            outcome,
            szs_status,
            elapsed,
            exit_code,
            output,
            detail: kill.map(|k| k.notes.join("\n")),
        };
        debug!(
            query = %query.id,
            tier = tier.name(),
            outcome = %attempt.outcome,
            szs = %attempt.szs_status,
            elapsed_ms = attempt.elapsed.as_millis() as u64,
            "attempt finished"
        );

        if attempt.outcome != AttemptOutcome::Proved && attempt.outcome != AttemptOutcome::Interrupted {
            self.save_raw_log(query, tier, &attempt);
        }
        Ok(attempt)
    }
}

/// Whether an attempt failed because the prover could not be started
pub fn is_spawn_failure(attempt: &Attempt) -> bool {
    attempt.outcome == AttemptOutcome::Error && attempt.szs_status == SPAWN_ERROR
}

fn file_safe(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// `raw_<query>_<tier>.log`, with a hash suffix when either name had to be rewritten
fn raw_log_name(query_id: &str, tier_name: &str) -> String {
    let (q, t) = (file_safe(query_id), file_safe(tier_name));
    if q == query_id && t == tier_name {
        format!("raw_{q}_{t}.log")
    } else {
        let hash = fxhash::hash64(&(query_id, tier_name)) as u32;
        format!("raw_{q}_{t}_{hash:08x}.log")
    }
}

/// Output drained so far plus a signal sent at end of stream
struct Capture {
    buffer: Arc<Mutex<BoundedOutput>>,
    done: mpsc::Receiver<()>,
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>, limit: usize) -> Option<Capture> {
    let mut source = source?;
    let buffer = Arc::new(Mutex::new(BoundedOutput::new(limit)));
    let (tx, done) = mpsc::channel();
    let sink = Arc::clone(&buffer);
    thread::Builder::new()
        .name("prover-output".to_string())
        .spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match source.read(&mut chunk) {
                    Ok(0) => break,
                    Ok(n) => match sink.lock() {
                        Ok(mut captured) => captured.extend(&chunk[..n]),
                        Err(poisoned) => poisoned.into_inner().extend(&chunk[..n]),
                    },
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(_) => break,
                }
            }
            let _ = tx.send(());
        })
        .ok()?;
    Some(Capture { buffer, done })
}

/// Wait up to `grace` for end of stream; whatever was read is kept either way
fn collect(capture: Option<Capture>, limit: usize, grace: Duration) -> BoundedOutput {
    let Some(capture) = capture else {
        return BoundedOutput::new(limit);
    };
    if capture.done.recv_timeout(grace).is_err() {
        warn!("prover output still open after exit; keeping what was read");
    }
    match capture.buffer.lock() {
        Ok(captured) => captured.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// `pipe:[inode]` links for the parent's ends of the child's output pipes
fn pipe_links(fds: impl Iterator<Item = RawFd>) -> Vec<PathBuf> {
    fds.filter_map(|fd| fs::read_link(format!("/proc/self/fd/{fd}")).ok())
        .collect()
}

/// Processes that may outlive an attempt's leader
///
/// Descendants are remembered from periodic snapshots, because a helper that
/// calls `setsid` leaves the process group and is reparented once the leader
/// exits. Anything still holding the attempt's output pipes is caught too.
#[derive(Debug, Default)]
pub struct DescendantWatch {
    root: i32,
    seen: Vec<ProcEntry>,
    pipes: Vec<PathBuf>,
}

impl DescendantWatch {
    pub fn new(root: i32, pipes: Vec<PathBuf>) -> Self {
        Self {
            root,
            seen: Vec::new(),
            pipes,
        }
    }

    /// Record the current descendants of the leader
    pub fn refresh(&mut self) {
        self.refresh_from(&process_table());
    }

    pub fn refresh_from(&mut self, table: &[ProcEntry]) {
        for p in descendants(self.root, table) {
            if !self.seen.iter().any(|s| s.pid == p.pid && s.start_time == p.start_time) {
                self.seen.push(p);
            }
        }
    }

    pub fn seen(&self) -> &[ProcEntry] {
        &self.seen
    }

    /// Live processes outside `pgid` that belong to the attempt
    pub fn strays(&self, pgid: i32, table: &[ProcEntry]) -> Vec<i32> {
        let me = std::process::id() as i32;
        let mut strays: Vec<i32> = table
            .iter()
            .filter(|p| p.is_alive() && p.pgrp != pgid)
            .filter(|p| {
                self.seen
                    .iter()
                    .any(|s| s.pid == p.pid && s.start_time == p.start_time)
            })
            .map(|p| p.pid)
            .collect();
        if !self.pipes.is_empty() {
            // Our own children may briefly hold copies between fork and exec.
            for p in table
                .iter()
                .filter(|p| p.is_alive() && p.pid != me && p.ppid != me && p.pgrp != pgid)
            {
                if !strays.contains(&p.pid) && holds_any(p.pid, &self.pipes) {
                    strays.push(p.pid);
                }
            }
        }
        strays
    }
}

fn holds_any(pid: i32, pipes: &[PathBuf]) -> bool {
    let Ok(fds) = fs::read_dir(format!("/proc/{pid}/fd")) else {
        return false;
    };
    fds.filter_map(Result::ok)
        .filter_map(|e| fs::read_link(e.path()).ok())
        .any(|link| pipes.contains(&link))
}

/// What the hardkill did
#[derive(Debug, Default)]
pub struct KillReport {
    /// Human-readable steps, kept in the raw log
    pub notes: Vec<String>,
    /// Processes still alive after verification
    pub survivors: Vec<i32>,
}

/// SIGKILL the child's process group and every descendant, reap, and verify
pub fn hardkill(child: &mut Child, watch: &mut DescendantWatch) -> KillReport {
    let pgid = child.id() as libc::pid_t;
    let mut report = KillReport::default();

    // Snapshot before the leader dies: its children are reparented afterwards.
    let table = process_table();
    watch.refresh_from(&table);
    let strays = watch.strays(pgid, &table);

    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        report.notes.push(format!("killpg({pgid}, SIGKILL) ok"));
    } else {
        report.notes.push(format!(
            "killpg({pgid}, SIGKILL) failed: {}",
            io::Error::last_os_error()
        ));
    }
    kill_strays(&strays, &mut report);

    match child.wait() {
        Ok(status) => report.notes.push(format!("reaped: {status}")),
        Err(e) => report.notes.push(format!("wait failed: {e}")),
    }

    verify_dead(pgid, &strays, &mut report);
    report
}

/// Clean up after a leader that exited on its own
///
/// Returns a report only when something had to be killed.
fn sweep_exited(pgid: libc::pid_t, watch: &DescendantWatch) -> Option<KillReport> {
    let mut report = KillReport::default();
    if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
        debug!(pgid, "killed leftover prover helpers");
        report.notes.push(format!("killpg({pgid}, SIGKILL) after exit"));
    }
    let strays = watch.strays(pgid, &process_table());
    kill_strays(&strays, &mut report);
    if report.notes.is_empty() {
        return None;
    }
    verify_dead(pgid, &strays, &mut report);
    Some(report)
}

fn kill_strays(strays: &[i32], report: &mut KillReport) {
    for &pid in strays {
        unsafe { libc::kill(pid, libc::SIGKILL) };
    }
    if !strays.is_empty() {
        report
            .notes
            .push(format!("killed {} descendant(s) outside the group", strays.len()));
    }
}

fn verify_dead(pgid: libc::pid_t, strays: &[i32], report: &mut KillReport) {
    let verify_until = Instant::now() + KILL_VERIFY;
    loop {
        let survivors: Vec<i32> = process_table()
            .iter()
            .filter(|p| p.is_alive() && (p.pgrp == pgid || strays.contains(&p.pid)))
            .map(|p| p.pid)
            .collect();
        if survivors.is_empty() {
            report.notes.push("verified: no survivors".to_string());
            return;
        }
        if Instant::now() >= verify_until {
            warn!(pgid, ?survivors, "prover processes survived hardkill");
            report
                .notes
                .push(format!("survivors after hardkill: {survivors:?}"));
            report.survivors = survivors;
            return;
        }
        for &pid in &survivors {
            unsafe { libc::kill(pid, libc::SIGKILL) };
        }
        thread::sleep(POLL_TICK);
    }
}

/// One row of the process table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcEntry {
    pub pid: i32,
    pub ppid: i32,
    pub pgrp: i32,
    pub state: char,
    /// Clock ticks after boot; tells a process from a later one reusing its pid
    pub start_time: u64,
}

impl ProcEntry {
    /// Running or sleeping, i.e. not a zombie waiting to be reaped
    pub fn is_alive(&self) -> bool {
        !matches!(self.state, 'Z' | 'X' | 'x')
    }
}

/// Parse `/proc/<pid>/stat`; the command name may itself contain parentheses
pub fn parse_stat(text: &str) -> Option<ProcEntry> {
    let (head, rest) = text.rsplit_once(')')?;
    let pid = head.split_once('(')?.0.trim().parse().ok()?;
    let mut fields = rest.split_whitespace();
    let state = fields.next()?.chars().next()?;
    let ppid = fields.next()?.parse().ok()?;
    let pgrp = fields.next()?.parse().ok()?;
    // Field 22 overall; 0 when the line is cut short.
    let start_time = fields.nth(16).and_then(|f| f.parse().ok()).unwrap_or(0);
    Some(ProcEntry {
        pid,
        ppid,
        pgrp,
        state,
        start_time,
    })
}

/// Snapshot of every visible process (empty where `/proc` is unavailable)
pub fn process_table() -> Vec<ProcEntry> {
    let Ok(entries) = fs::read_dir("/proc") else {
        return Vec::new();
    };
    entries
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().bytes().all(|b| b.is_ascii_digit()))
        .filter_map(|e| fs::read_to_string(e.path().join("stat")).ok())
        .filter_map(|text| parse_stat(&text))
        .collect()
}

/// Transitive children of `root` in `table`
pub fn descendants(root: i32, table: &[ProcEntry]) -> Vec<ProcEntry> {
    let mut found = Vec::new();
    let mut frontier = vec![root];
    while let Some(parent) = frontier.pop() {
        for p in table.iter().filter(|p| p.ppid == parent && p.pid != root) {
            if !found.iter().any(|f: &ProcEntry| f.pid == p.pid) {
                found.push(*p);
                frontier.push(p.pid);
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_substitution() {
        let cmd = ProverCommand::new(
            "vampire",
            vec!["--time_limit".into(), "{timeout}".into(), "{input}".into()],
        );
        let args = cmd.args_for(Path::new("/tmp/p.p"), Duration::from_millis(61_500));
        assert_eq!(args, ["--time_limit", "62", "/tmp/p.p"].map(OsString::from));
    }

    #[test]
    fn test_input_appended_when_absent() {
        let cmd = ProverCommand::new("eprover", vec!["--auto".into()]);
        let args = cmd.args_for(Path::new("/tmp/q.p"), Duration::from_secs(5));
        assert_eq!(args, ["--auto", "/tmp/q.p"].map(OsString::from));

        let cmd = ProverCommand::new("x", vec!["--problem={input}".into()]);
        let args = cmd.args_for(Path::new("/tmp/q.p"), Duration::from_secs(5));
        assert_eq!(args, ["--problem=/tmp/q.p"].map(OsString::from));
    }

    #[test]
    fn test_timeout_arg_rounds_up() {
        assert_eq!(timeout_arg(Duration::from_secs(61)), 61);
        assert_eq!(timeout_arg(Duration::from_millis(1)), 1);
        assert_eq!(timeout_arg(Duration::ZERO), 1);
        assert_eq!(timeout_arg(Duration::from_millis(2001)), 3);
    }

    #[test]
    fn test_parse_stat() {
        let line = "4242 (vampire (z3)) S 4241 4242 100 0 -1 4194304 \
                    120 0 0 0 15 3 0 0 20 0 1 0 987654 1000 200";
        let p = parse_stat(line).unwrap();
        assert_eq!(
            p,
            ProcEntry {
                pid: 4242,
                ppid: 4241,
                pgrp: 4242,
                state: 'S',
                start_time: 987654,
            }
        );
        assert!(p.is_alive());
        assert!(!parse_stat("12 (sh) Z 1 12").unwrap().is_alive());
        assert!(parse_stat("garbage").is_none());
    }

    #[test]
    fn test_descendants_walk() {
        let table = [
            entry(10, 1, 10),
            entry(11, 10, 10),
            entry(12, 11, 12),
            entry(13, 12, 12),
            entry(20, 1, 20),
        ];
        let mut pids: Vec<i32> = descendants(10, &table).iter().map(|e| e.pid).collect();
        pids.sort_unstable();
        assert_eq!(pids, [11, 12, 13]);
    }

    fn entry(pid: i32, ppid: i32, pgrp: i32) -> ProcEntry {
        ProcEntry {
            pid,
            ppid,
            pgrp,
            state: 'S',
            start_time: 100 + pid as u64,
        }
    }

    #[test]
    fn test_watch_remembers_reparented_helpers() {
        let mut watch = DescendantWatch::new(10, Vec::new());
        watch.refresh_from(&[entry(10, 1, 10), entry(11, 10, 10), entry(12, 10, 12)]);
        assert_eq!(watch.seen().len(), 2);

        // Leader gone, the setsid helper now belongs to init.
        let after = [entry(12, 1, 12), entry(30, 1, 30)];
        assert_eq!(watch.strays(10, &after), [12]);

        // Same pid, different process.
        let reused = [ProcEntry {
            start_time: 9999,
            ..entry(12, 1, 12)
        }];
        assert!(watch.strays(10, &reused).is_empty());

        // Group members are left to killpg.
        assert!(watch.strays(12, &after).is_empty());
    }

    #[test]
    fn test_collect_keeps_partial_output() {
        let mut captured = BoundedOutput::new(64);
        captured.extend(b"% SZS status Theorem for q\n");
        let (_still_open, done) = mpsc::channel::<()>();
        let capture = Capture {
            buffer: Arc::new(Mutex::new(captured)),
            done,
        };
        let out = collect(Some(capture), 64, Duration::from_millis(20));
        assert_eq!(out.to_string_lossy(), "% SZS status Theorem for q\n");
    }

    #[test]
    fn test_raw_log_names_do_not_collide() {
        assert_eq!(raw_log_name("test_wk_1", "Best0"), "raw_test_wk_1_Best0.log");
        let dotted = raw_log_name("a.b", "Best0");
        let plain = raw_log_name("a_b", "Best0");
        assert_ne!(dotted, plain);
        assert!(dotted.starts_with("raw_a_b_Best0_") && dotted.ends_with(".log"));
        assert_ne!(raw_log_name("q", "T.1"), raw_log_name("q", "T_1"));
    }

    #[test]
    fn test_file_safe() {
        assert_eq!(file_safe("test_wk_1"), "test_wk_1");
        assert_eq!(file_safe("Best0.ax"), "Best0_ax");
        assert_eq!(file_safe("a/b c"), "a_b_c");
    }
}
