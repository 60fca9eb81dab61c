//! Git-backed history source
//!
//! Drives the system `git` binary. Commit metadata and touched paths come
//! from one `git log --name-status` pass; post-commit manifest contents are
//! fetched through a persistent `git cat-file --batch` child instead of one
//! subprocess per file.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::{ArgusError, ArgusResult};
use crate::pkg::{KeywordSet, PackageId};
use crate::repo::manifest;

use super::source::{HistoryCommit, HistorySource, TouchedPackage};

/// History source reading a git checkout.
#[derive(Debug)]
pub struct GitHistorySource {
    root: PathBuf,
}

impl GitHistorySource {
    /// Open `root` as a git checkout.
    pub async fn discover(root: &Path) -> ArgusResult<Self> {
        let out = git(root, &["rev-parse", "--is-inside-work-tree"]).await?;
        if !out.status.success() {
            return Err(ArgusError::NotAGitRepository(root.to_path_buf()));
        }
        Ok(Self {
            root: root.to_path_buf(),
        })
    }
}

#[async_trait]
impl HistorySource for GitHistorySource {
    async fn head(&self) -> ArgusResult<String> {
        let out = git(&self.root, &["rev-parse", "HEAD"]).await?;
        let stdout = success_stdout(out, "git rev-parse HEAD")?;
        Ok(stdout.trim().to_string())
    }

    async fn contains(&self, commit: &str) -> ArgusResult<bool> {
        let spec = format!("{commit}^{{commit}}");
        let out = git(&self.root, &["cat-file", "-e", &spec]).await?;
        Ok(out.status.success())
    }

    async fn commits_since(&self, checkpoint: Option<&str>) -> ArgusResult<Vec<HistoryCommit>> {
        let range = match checkpoint {
            Some(c) => format!("{c}..HEAD"),
            None => "HEAD".to_string(),
        };
        let out = git(
            &self.root,
            &[
                "log",
                "--topo-order",
                "--reverse",
                "--name-status",
                "--no-renames",
                "--diff-merges=first-parent",
                "--format=%x01%H %ct",
                range.as_str(),
            ],
        )
        .await?;
        let stdout = success_stdout(out, "git log")?;
        let raw = parse_log(&stdout)?;

        let mut batch = CatFileBatch::spawn(&self.root).await?;
        let mut commits = Vec::with_capacity(raw.len());
        for rc in raw {
            let timestamp = DateTime::<Utc>::from_timestamp(rc.timestamp, 0).ok_or_else(|| {
                ArgusError::Internal(format!(
                    "commit {} has out-of-range timestamp {}",
                    rc.hash, rc.timestamp
                ))
            })?;
            let mut packages = Vec::new();
            for (status, path) in &rc.changes {
                // Deletions leave no resulting state; anything else with
                // readable content counts (T = typechange).
                if !matches!(status, 'A' | 'M' | 'T') {
                    continue;
                }
                let Some((category, name, version)) =
                    manifest::ident_from_path(Path::new(path))
                else {
                    continue;
                };
                let spec = format!("{}:{}", rc.hash, path);
                let Some(blob) = batch.read_blob(&spec).await? else {
                    warn!("missing blob for {spec}");
                    continue;
                };
                let content = String::from_utf8_lossy(&blob);
                let body = match manifest::parse(&content, Path::new(path)) {
                    Ok(body) => body,
                    Err(e) => {
                        warn!("skipping unparsable manifest in {}: {e}", rc.hash);
                        continue;
                    }
                };
                packages.push(TouchedPackage {
                    id: PackageId::new(category, name, body.slot, version),
                    keywords: KeywordSet::from_labels(&body.keywords),
                });
            }
            commits.push(HistoryCommit {
                hash: rc.hash,
                timestamp,
                packages,
            });
        }
        batch.close().await?;
        Ok(commits)
    }
}

async fn git(root: &Path, args: &[&str]) -> ArgusResult<std::process::Output> {
    debug!("Executing: git {}", args.join(" "));
    Command::new("git")
        .arg("-C")
        .arg(root)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| ArgusError::command_failed(format!("git {}", args.join(" ")), e))
}

fn success_stdout(out: std::process::Output, command: &str) -> ArgusResult<String> {
    if !out.status.success() {
        return Err(ArgusError::command_exec(
            command,
            String::from_utf8_lossy(&out.stderr).trim().to_string(),
        ));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// One commit as reported by `git log`.
#[derive(Debug, PartialEq, Eq)]
struct RawCommit {
    hash: String,
    timestamp: i64,
    changes: Vec<(char, String)>,
}

/// Parse `git log --name-status --format=%x01%H %ct` output. The 0x01
/// marker keeps headers unambiguous; status lines are tab-separated; blank
/// separator lines vary between git versions and are ignored.
fn parse_log(output: &str) -> ArgusResult<Vec<RawCommit>> {
    let mut commits: Vec<RawCommit> = Vec::new();
    for line in output.lines() {
        if let Some(header) = line.strip_prefix('\u{1}') {
            let mut fields = header.split_whitespace();
            let (Some(hash), Some(ts)) = (fields.next(), fields.next()) else {
                return Err(ArgusError::command_exec(
                    "git log",
                    format!("malformed header: {header:?}"),
                ));
            };
            let timestamp = ts.parse::<i64>().map_err(|_| {
                ArgusError::command_exec("git log", format!("malformed timestamp: {ts:?}"))
            })?;
            commits.push(RawCommit {
                hash: hash.to_string(),
                timestamp,
                changes: Vec::new(),
            });
        } else if let Some((status, path)) = line.split_once('\t') {
            let Some(commit) = commits.last_mut() else {
                continue;
            };
            let Some(code) = status.chars().next() else {
                continue;
            };
            // Rename/copy lines carry two paths; the new one is last.
            let path = if matches!(code, 'R' | 'C') {
                path.rsplit('\t').next().unwrap_or(path)
            } else {
                path
            };
            commit.changes.push((code, path.to_string()));
        }
    }
    Ok(commits)
}

/// Persistent `git cat-file --batch` child for blob reads.
struct CatFileBatch {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl CatFileBatch {
    async fn spawn(root: &Path) -> ArgusResult<Self> {
        let mut child = Command::new("git")
            .arg("-C")
            .arg(root)
            .args(["cat-file", "--batch"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ArgusError::command_failed("git cat-file --batch", e))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ArgusError::Internal("git cat-file stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ArgusError::Internal("git cat-file stdout unavailable".into()))?;
        Ok(Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    /// Fetch one blob by `<commit>:<path>` spec; `None` if the object does
    /// not exist at that revision.
    async fn read_blob(&mut self, spec: &str) -> ArgusResult<Option<Vec<u8>>> {
        let io_err = |e: std::io::Error| ArgusError::command_failed("git cat-file --batch", e);
        self.stdin.write_all(spec.as_bytes()).await.map_err(io_err)?;
        self.stdin.write_all(b"\n").await.map_err(io_err)?;
        self.stdin.flush().await.map_err(io_err)?;

        let mut header = String::new();
        let n = self.stdout.read_line(&mut header).await.map_err(io_err)?;
        if n == 0 {
            return Err(ArgusError::command_exec(
                "git cat-file --batch",
                "unexpected EOF",
            ));
        }
        let header = header.trim_end();
        if header.ends_with(" missing") || header.ends_with(" ambiguous") {
            return Ok(None);
        }
        // "<oid> <type> <size>"
        let size = header
            .rsplit(' ')
            .next()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| {
                ArgusError::command_exec(
                    "git cat-file --batch",
                    format!("unexpected response: {header}"),
                )
            })?;
        let mut buf = vec![0u8; size + 1]; // content plus trailing newline
        self.stdout.read_exact(&mut buf).await.map_err(io_err)?;
        buf.truncate(size);
        Ok(Some(buf))
    }

    async fn close(mut self) -> ArgusResult<()> {
        drop(self.stdin);
        self.child
            .wait()
            .await
            .map_err(|e| ArgusError::command_failed("git cat-file --batch", e))?;
        Ok(())
    }
}
