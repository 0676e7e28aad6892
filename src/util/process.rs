//! Subprocess execution utilities.

use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::builder::error::{BuildError, BuildResult};
use crate::builder::progress::Progress;

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            stdin: None,
        }
    }

    /// Build from an argv-style command line (`[program, args...]`).
    pub fn from_argv<S: AsRef<str>>(argv: &[S]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(ProcessBuilder::new(program.as_ref()).args(args.iter().map(|a| a.as_ref())))
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set several environment variables.
    pub fn envs<'a>(mut self, vars: impl IntoIterator<Item = (&'a String, &'a String)>) -> Self {
        for (key, value) in vars {
            self.env.insert(key.clone(), value.clone());
        }
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Set stdin data.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    pub fn get_env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn get_stdin(&self) -> Option<&[u8]> {
        self.stdin.as_deref()
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run through `runner`, streaming output into `progress`, and require a
    /// zero exit status.
    pub fn run_checked(&self, runner: &dyn CommandRunner, progress: &mut Progress) -> BuildResult<()> {
        let command = self.display_command();
        tracing::info!("Running `{}`", command);
        progress.started(&command);

        let outcome = runner.run(self, progress).map_err(|source| BuildError::Spawn {
            command: command.clone(),
            source,
        });
        let success = matches!(outcome, Ok(ref o) if o.success());
        progress.finished(&command, success);

        let outcome = outcome?;
        if !outcome.success() {
            return Err(BuildError::Command {
                command,
                code: outcome.code,
            });
        }
        Ok(())
    }
}

/// Exit information of a finished native tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Exit code, `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl CommandOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes native tools on behalf of the build drivers.
pub trait CommandRunner: Send + Sync {
    /// Run `cmd` to completion, feeding each stdout line to `progress`.
    fn run(&self, cmd: &ProcessBuilder, progress: &mut Progress) -> io::Result<CommandOutcome>;

    /// Locate an optional helper program.
    fn find_program(&self, name: &str) -> Option<PathBuf> {
        find_executable(name)
    }
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &ProcessBuilder, progress: &mut Progress) -> io::Result<CommandOutcome> {
        let mut command = cmd.build_command();
        command.stdin(if cmd.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });
        command.stdout(Stdio::piped());
        command.stderr(Stdio::inherit());

        let mut child = command.spawn()?;

        let writer = match (cmd.stdin.clone(), child.stdin.take()) {
            (Some(data), Some(mut stdin)) => Some(std::thread::spawn(move || stdin.write_all(&data))),
            _ => None,
        };

        let streamed = match child.stdout.take() {
            Some(stdout) => stream_lines(stdout, progress),
            None => Ok(()),
        };
        if streamed.is_err() {
            // the child may be blocked on a full pipe
            let _ = child.kill();
        }

        // reap the child and the writer before reporting any error
        let status = child.wait();
        let written = writer.map(|writer| writer.join());

        streamed?;
        let status = status?;
        match written {
            Some(Ok(Err(e))) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e),
            Some(Err(_)) => return Err(io::Error::other("stdin writer thread panicked")),
            _ => {}
        }

        Ok(CommandOutcome {
            code: status.code(),
        })
    }
}

fn stream_lines(stdout: impl Read, progress: &mut Progress) -> io::Result<()> {
    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            return Ok(());
        }
        progress.line(String::from_utf8_lossy(&buf).trim_end());
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
