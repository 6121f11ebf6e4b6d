use std::{
    io::{self, Read, Write},
    process::{Child, Command, ExitStatus, Stdio},
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use log::debug;

use super::{normalize, RenderError, Renderer};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Returns whether `program --version` runs successfully.
pub(super) fn probe(program: &str) -> bool {
    let ok = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success());
    debug!("probing {program:?}: {ok}");
    ok
}

/// Pipes markdown through an external converter (pandoc by default).
#[derive(Debug, Clone)]
pub(crate) struct PandocRenderer {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl PandocRenderer {
    pub fn new(program: String, args: Vec<String>, timeout: Option<Duration>) -> Self {
        Self {
            program,
            args,
            timeout,
        }
    }

    fn io_error(&self, source: io::Error) -> RenderError {
        RenderError::Io {
            program: self.program.clone(),
            source,
        }
    }

    fn timed_out(&self) -> RenderError {
        RenderError::Timeout {
            program: self.program.clone(),
            timeout: self.timeout.unwrap_or_default(),
        }
    }

    fn wait(
        &self,
        child: &mut Child,
        deadline: Option<Instant>,
    ) -> Result<ExitStatus, RenderError> {
        let Some(deadline) = deadline else {
            return child.wait().map_err(|e| self.io_error(e));
        };

        loop {
            if let Some(status) = child.try_wait().map_err(|e| self.io_error(e))? {
                return Ok(status);
            }
            if Instant::now() >= deadline {
                // the child may have exited in between; either way it is gone afterwards
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out());
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    // forked helpers may hold a pipe open past the converter's death; the thread is
    // abandoned once the deadline passes
    fn collect<T>(
        &self,
        pipe: Receiver<io::Result<T>>,
        deadline: Option<Instant>,
    ) -> Result<io::Result<T>, RenderError> {
        let received = match deadline {
            Some(deadline) => pipe
                .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                .map_err(|e| match e {
                    RecvTimeoutError::Timeout => Some(self.timed_out()),
                    RecvTimeoutError::Disconnected => None,
                }),
            None => pipe.recv().map_err(|_| None),
        };
        match received {
            Ok(result) => Ok(result),
            Err(Some(timeout)) => Err(timeout),
            Err(None) => Ok(Err(io::Error::other("pipe thread panicked"))),
        }
    }
}

fn spawn_pipe<T, F>(work: F) -> Receiver<io::Result<T>>
where
    T: Send + 'static,
    F: FnOnce() -> io::Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // nobody listens any more after a timeout
        let _ = tx.send(work());
    });
    rx
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<io::Result<Vec<u8>>> {
    spawn_pipe(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

impl Renderer for PandocRenderer {
    fn render(&self, markdown: &str) -> Result<String, RenderError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| RenderError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        // stdin is fed from its own thread so a converter that writes before it has read
        // everything cannot deadlock us
        let stdin = child.stdin.take();
        let input = normalize(markdown);
        let written = spawn_pipe(move || {
            if let Some(mut stdin) = stdin {
                stdin.write_all(input.as_bytes())?;
            }
            Ok(())
        });
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait(&mut child, deadline)?;
        let stdout = self.collect(stdout, deadline)?.map_err(|e| self.io_error(e))?;
        let stderr = self.collect(stderr, deadline)?.map_err(|e| self.io_error(e))?;
        let written = self.collect(written, deadline)?;

        if !status.success() {
            return Err(RenderError::Failed {
                program: self.program.clone(),
                status,
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }
        written.map_err(|e| self.io_error(e))?;

        let html = String::from_utf8(stdout).map_err(|source| RenderError::Utf8 {
            program: self.program.clone(),
            source,
        })?;
        Ok(html.trim_end().to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn renderer(program: &str, args: &[&str], timeout: Option<Duration>) -> PandocRenderer {
        PandocRenderer::new(
            program.to_string(),
            args.iter().map(|s| s.to_string()).collect(),
            timeout,
        )
    }

    #[test]
    fn output_is_captured_and_trimmed() {
        let html = renderer("cat", &[], Some(Duration::from_secs(10)))
            .render("<p>already html</p>\n\n\n")
            .unwrap();
        assert_eq!(html, "<p>already html</p>");
    }

    #[test]
    fn large_input_does_not_deadlock() {
        let markdown = "line of text\n".repeat(100_000);
        let html = renderer("cat", &[], None).render(&markdown).unwrap();
        assert_eq!(html.lines().count(), 100_000);
    }

    #[test]
    fn non_zero_exit_is_an_error() {
        let err = renderer("sh", &["-c", "echo broken >&2; exit 3"], None)
            .render("text")
            .unwrap_err();
        match err {
            RenderError::Failed { stderr, .. } => assert_eq!(stderr, "broken"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let err = renderer("notefeed-no-such-converter", &[], None)
            .render("text")
            .unwrap_err();
        assert!(matches!(err, RenderError::Spawn { .. }));
    }

    #[test]
    fn hung_converter_is_killed() {
        let started = Instant::now();
        let err = renderer("sleep", &["30"], Some(Duration::from_millis(200)))
            .render("text")
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn forked_helper_cannot_outlive_the_timeout() {
        // `sh` forks `sleep`, which keeps stdout open after `sh` is killed
        let started = Instant::now();
        let err = renderer("sh", &["-c", "sleep 6; true"], Some(Duration::from_millis(200)))
            .render("text")
            .unwrap_err();
        assert!(matches!(err, RenderError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn probe_rejects_missing_program() {
        assert!(!probe("notefeed-no-such-converter"));
    }
}
