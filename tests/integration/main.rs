//! Integration tests for Argus
//!
//! Scan tests drive the real binary against throwaway package trees built
//! with the system git binary. Commit dates are pinned relative to a fixed
//! `--today` so age-based findings are reproducible.

mod fixtures {
    use assert_cmd::cargo::cargo_bin_cmd;
    use chrono::{Days, NaiveDate};
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::process::Command;
    use tempfile::TempDir;

    /// Evaluation date passed to every scan.
    pub const TODAY: &str = "2024-06-15";

    pub fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    /// Committer date `days` before `TODAY`, noon UTC.
    pub fn commit_date(days: u64) -> String {
        let date = today().checked_sub_days(Days::new(days)).unwrap();
        let noon = date.and_hms_opt(12, 0, 0).unwrap();
        format!("{} +0000", noon.format("%Y-%m-%d %H:%M:%S"))
    }

    /// Isolated global config plus cache directory for one test.
    pub struct TestEnv {
        dir: TempDir,
    }

    impl TestEnv {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let cache = dir.path().join("cache");
            fs::write(
                dir.path().join("config.toml"),
                format!("[cache]\ndir = \"{}\"\n", cache.display()),
            )
            .unwrap();
            Self { dir }
        }

        pub fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        pub fn append_config(&self, extra: &str) {
            let mut content = fs::read_to_string(self.config_path()).unwrap();
            content.push_str(extra);
            fs::write(self.config_path(), content).unwrap();
        }

        /// The binary under test, pointed at this environment's config and
        /// shielded from the developer's git configuration.
        pub fn argus(&self) -> assert_cmd::Command {
            let mut cmd = cargo_bin_cmd!("argus");
            cmd.current_dir(self.dir.path())
                .env("GIT_CONFIG_GLOBAL", "/dev/null")
                .env("GIT_CONFIG_SYSTEM", "/dev/null")
                .arg("--config")
                .arg(self.config_path());
            cmd
        }
    }

    /// A package tree under a tempdir.
    pub struct Tree {
        dir: TempDir,
    }

    impl Tree {
        pub fn new(name: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::write(
                dir.path().join("repo.toml"),
                format!("name = \"{name}\"\n"),
            )
            .unwrap();
            Self { dir }
        }

        pub fn root(&self) -> &Path {
            self.dir.path()
        }

        /// Write one manifest at the conventional location.
        pub fn manifest(&self, cat: &str, name: &str, version: &str, body: &str) {
            let path = self
                .dir
                .path()
                .join(cat)
                .join(name)
                .join(format!("{name}-{version}.pkg"));
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }

        /// Write a `.argus.toml` overlay at the tree root.
        pub fn local_config(&self, content: &str) {
            fs::write(self.dir.path().join(".argus.toml"), content).unwrap();
        }
    }

    /// A package tree that is also a git checkout.
    pub struct GitTree {
        pub tree: Tree,
    }

    impl GitTree {
        pub fn init(name: &str) -> Self {
            let tree = Tree::new(name);
            git(tree.root(), &["init", "-q"], None);
            git(
                tree.root(),
                &["config", "user.email", "person@email.com"],
                None,
            );
            git(tree.root(), &["config", "user.name", "Person"], None);
            Self { tree }
        }

        pub fn root(&self) -> &Path {
            self.tree.root()
        }

        /// Stage everything and commit it, dated `days` before `TODAY`.
        pub fn commit_all(&self, msg: &str, days: u64) {
            git(self.root(), &["add", "--all"], None);
            git(
                self.root(),
                &["commit", "-q", "-m", msg],
                Some(&commit_date(days)),
            );
        }

        /// Rewrite the tip commit, dated `days` before `TODAY`.
        pub fn amend(&self, msg: &str, days: u64) {
            git(
                self.root(),
                &["commit", "--amend", "-q", "-m", msg],
                Some(&commit_date(days)),
            );
        }

        pub fn head(&self) -> String {
            let out = git(self.root(), &["rev-parse", "HEAD"], None);
            String::from_utf8(out.stdout).unwrap().trim().to_string()
        }
    }

    fn git(root: &Path, args: &[&str], date: Option<&str>) -> std::process::Output {
        let mut cmd = Command::new("git");
        cmd.arg("-C")
            .arg(root)
            .args(args)
            .env("GIT_CONFIG_GLOBAL", "/dev/null")
            .env("GIT_CONFIG_SYSTEM", "/dev/null");
        if let Some(date) = date {
            cmd.env("GIT_COMMITTER_DATE", date)
                .env("GIT_AUTHOR_DATE", date);
        }
        let out = cmd.output().unwrap();
        assert!(
            out.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&out.stderr)
        );
        out
    }
}

mod cli_tests {
    use crate::fixtures::{TestEnv, Tree, TODAY};
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;

    fn argus() -> Command {
        cargo_bin_cmd!("argus")
    }

    #[test]
    fn help_displays() {
        argus()
            .arg("--help")
            .assert()
            .success()
            .stdout(
                predicate::str::contains("Package Tree Auditor")
                    .and(predicate::str::contains("scan"))
                    .and(predicate::str::contains("checks"))
                    .and(predicate::str::contains("cache"))
                    .and(predicate::str::contains("completions")),
            );
    }

    #[test]
    fn version_displays() {
        argus()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("argus"));
    }

    #[test]
    fn checks_lists_registry() {
        argus().arg("checks").assert().success().stdout(
            predicate::str::contains("deprecated-inherit")
                .and(predicate::str::contains("stabilize"))
                .and(predicate::str::contains("package-set"))
                .and(predicate::str::contains("history"))
                .and(predicate::str::contains("2 check(s)")),
        );
    }

    #[test]
    fn completions_generate() {
        argus()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("_argus"));
    }

    #[test]
    fn scan_rejects_unknown_check() {
        let env = TestEnv::new();
        let tree = Tree::new("core");
        env.argus()
            .args(["scan", "--checks", "bogus", "--repo"])
            .arg(tree.root())
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown check 'bogus'"));
    }

    #[test]
    fn scan_rejects_missing_path() {
        let env = TestEnv::new();
        env.argus()
            .args(["scan", "--repo", "/nonexistent/tree"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Path not found"));
    }

    #[test]
    fn scan_rejects_non_tree() {
        let env = TestEnv::new();
        let dir = tempfile::tempdir().unwrap();
        env.argus()
            .args(["scan", "--repo"])
            .arg(dir.path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("Package tree unreadable"))
            .stderr(predicate::str::contains("Not a package tree"));
    }

    #[test]
    fn scan_rejects_malformed_today() {
        let env = TestEnv::new();
        env.argus()
            .args(["scan", "--today", "June 15"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("expected YYYY-MM-DD"));

        // Well-formed dates parse wherever the flag lands.
        let tree = Tree::new("overlay");
        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(tree.root())
            .assert()
            .success();
    }
}

mod config_tests {
    use crate::fixtures::{TestEnv, Tree};
    use assert_cmd::cargo::cargo_bin_cmd;
    use predicates::prelude::*;

    #[test]
    fn config_path_prints_location() {
        let env = TestEnv::new();
        env.argus()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show_prints_merged_defaults() {
        let env = TestEnv::new();
        env.argus()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(
                predicate::str::contains("[stabilize]")
                    .and(predicate::str::contains(r#"reference_repo = "core""#))
                    .and(predicate::str::contains("stable_days = 30")),
            );
    }

    #[test]
    fn config_init_creates_and_respects_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.toml");

        let mut cmd = cargo_bin_cmd!("argus");
        cmd.arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(path.exists());

        let mut cmd = cargo_bin_cmd!("argus");
        cmd.arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn config_set_roundtrips() {
        let env = TestEnv::new();
        env.argus()
            .args(["config", "set", "stabilize.stable_days", "45"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Set stabilize.stable_days = 45"));

        env.argus()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("stable_days = 45"));
    }

    #[test]
    fn config_set_unknown_key_lists_valid_ones() {
        let env = TestEnv::new();
        env.argus()
            .args(["config", "set", "bogus.key", "1"])
            .assert()
            .success()
            .stderr(
                predicate::str::contains("Unknown config key")
                    .and(predicate::str::contains("stabilize.stable_days")),
            );
    }

    #[test]
    fn config_set_local_writes_overlay() {
        let env = TestEnv::new();
        let tree = Tree::new("core");

        env.argus()
            .current_dir(tree.root())
            .args(["config", "set", "--local", "stabilize.stable_days", "10"])
            .assert()
            .success()
            .stdout(predicate::str::contains(".argus.toml"));

        env.argus()
            .current_dir(tree.root())
            .args([
                "config",
                "set",
                "--local",
                "stabilize.extended_arches",
                "mips,arm64",
            ])
            .assert()
            .success();

        let overlay = std::fs::read_to_string(tree.root().join(".argus.toml")).unwrap();
        assert!(overlay.contains("stable_days = 10"), "{overlay}");
        assert!(overlay.contains(r#"extended_arches = ["mips", "arm64"]"#), "{overlay}");
    }
}

mod cache_tests {
    use crate::fixtures::{TestEnv, Tree};
    use predicates::prelude::*;

    #[test]
    fn cache_info_without_cache() {
        let env = TestEnv::new();
        let tree = Tree::new("core");
        env.argus()
            .args(["cache", "info", "--repo"])
            .arg(tree.root())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("Store:")
                    .and(predicate::str::contains("No cache for this tree.")),
            );
    }

    #[test]
    fn cache_clear_without_cache() {
        let env = TestEnv::new();
        let tree = Tree::new("core");
        env.argus()
            .args(["cache", "clear", "--repo"])
            .arg(tree.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache for"));
    }

    #[test]
    fn cache_clear_all_without_caches() {
        let env = TestEnv::new();
        env.argus()
            .args(["cache", "clear", "--all", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No caches to clear."));
    }
}

mod scan_tests {
    use crate::fixtures::{GitTree, TestEnv, Tree, TODAY};
    use predicates::prelude::*;

    /// Tree named `core` whose lineage went stable long ago and whose latest
    /// version has sat unstable for `days`.
    fn overdue_tree(days: u64) -> GitTree {
        let git = GitTree::init("core");
        git.tree
            .manifest("dev-util", "tool", "1", "keywords = [\"amd64\"]\n");
        git.commit_all("add tool-1", 100);
        git.tree
            .manifest("dev-util", "tool", "2", "keywords = [\"~amd64\"]\n");
        git.commit_all("add tool-2", days);
        git
    }

    #[test]
    fn reports_overdue_stabilization() {
        let env = TestEnv::new();
        let git = overdue_tree(40);

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("core: 2 packages")
                    .and(predicate::str::contains(
                        "dev-util/tool-2: slot(0) unstable for 40 days: ~amd64",
                    ))
                    .and(predicate::str::contains("1 finding(s)")),
            );
    }

    #[test]
    fn finding_appears_exactly_at_threshold() {
        let env = TestEnv::new();
        let git = overdue_tree(30);

        // One day early the version is 29 days old.
        env.argus()
            .args(["scan", "--today", "2024-06-14", "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("No findings"));

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("unstable for 30 days: ~amd64"));
    }

    #[test]
    fn overdue_arches_share_one_finding() {
        let env = TestEnv::new();
        let git = GitTree::init("core");
        git.tree
            .manifest("dev-util", "tool", "1", "keywords = [\"amd64\", \"x86\"]\n");
        git.commit_all("add tool-1", 100);
        git.tree
            .manifest("dev-util", "tool", "2", "keywords = [\"~amd64\", \"~x86\"]\n");
        git.commit_all("add tool-2", 45);

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("unstable for 45 days: ~amd64 ~x86")
                    .and(predicate::str::contains("1 finding(s)")),
            );
    }

    #[test]
    fn skips_outside_reference_repo() {
        let env = TestEnv::new();
        let git = GitTree::init("overlay");
        git.tree
            .manifest("dev-util", "tool", "1", "keywords = [\"~amd64\"]\n");
        git.commit_all("add tool-1", 100);

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("No findings (1 check(s) skipped)"))
            .stderr(
                predicate::str::contains("stabilize skipped")
                    .and(predicate::str::contains("not running against core repo")),
            );
    }

    #[test]
    fn skips_when_tree_is_not_git() {
        let env = TestEnv::new();
        let tree = Tree::new("core");
        tree.manifest("dev-util", "tool", "1", "keywords = [\"~amd64\"]\n");

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(tree.root())
            .assert()
            .success()
            .stderr(
                predicate::str::contains("stabilize skipped")
                    .and(predicate::str::contains("history cache unavailable")),
            );
    }

    #[test]
    fn skips_when_repo_has_no_commits() {
        let env = TestEnv::new();
        let git = GitTree::init("core");
        git.tree
            .manifest("dev-util", "tool", "1", "keywords = [\"~amd64\"]\n");

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stderr(predicate::str::contains("history cache unavailable"));
    }

    #[test]
    fn no_cache_flag_disables_the_check() {
        let env = TestEnv::new();
        let git = overdue_tree(40);

        env.argus()
            .args(["scan", "--no-cache", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("No findings (1 check(s) skipped)"))
            .stderr(predicate::str::contains("history cache support required"));
    }

    #[test]
    fn uncommitted_latest_is_not_judged() {
        let env = TestEnv::new();
        let git = GitTree::init("core");
        git.tree
            .manifest("dev-util", "tool", "1", "keywords = [\"amd64\"]\n");
        git.commit_all("add tool-1", 100);
        // Present in the working tree, absent from history.
        git.tree
            .manifest("dev-util", "tool", "2", "keywords = [\"~amd64\"]\n");

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("core: 2 packages")
                    .and(predicate::str::contains("No findings")),
            );
    }

    #[test]
    fn local_overlay_redirects_reference_repo() {
        let env = TestEnv::new();
        let git = overdue_tree(40);
        git.tree
            .local_config("[stabilize]\nreference_repo = \"elsewhere\"\n");

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stderr(predicate::str::contains(
                "not running against elsewhere repo",
            ));

        env.argus()
            .args(["scan", "--no-local", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("unstable for 40 days"));
    }

    #[test]
    fn selected_checks_only() {
        let env = TestEnv::new();
        let tree = Tree::new("core");
        tree.manifest("dev-util", "tool", "1", "keywords = [\"~amd64\"]\n");

        // Stabilize is not requested, so its addon never initializes and
        // the missing git checkout goes unnoticed.
        env.argus()
            .args(["scan", "--checks", "deprecated-inherit", "--repo"])
            .arg(tree.root())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("1 check(s) ready")
                    .and(predicate::str::contains("No findings")),
            )
            .stderr(predicate::str::contains("skipped").not());
    }

    #[test]
    fn json_report_carries_findings_and_date() {
        let env = TestEnv::new();
        env.append_config("\n[deprecated.inherits]\noldtool = \"newtool\"\n");

        let git = GitTree::init("core");
        git.tree
            .manifest("dev-util", "tool", "1", "keywords = [\"amd64\"]\n");
        git.commit_all("add tool-1", 100);
        git.tree.manifest(
            "dev-util",
            "tool",
            "2",
            "keywords = [\"~amd64\"]\ninherit = [\"oldtool\"]\n",
        );
        git.commit_all("add tool-2", 40);

        let assert = env
            .argus()
            .args(["scan", "--format", "json", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success();

        // Quiet mode keeps stdout pure JSON.
        let report: serde_json::Value =
            serde_json::from_slice(&assert.get_output().stdout).unwrap();
        assert_eq!(report["repo"], "core");
        assert_eq!(report["today"], TODAY);
        assert_eq!(report["packages"], 2);

        let findings = report["findings"].as_array().unwrap();
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0]["check"], "deprecated-inherit");
        assert_eq!(findings[0]["inherits"][0][0], "oldtool");
        assert_eq!(findings[1]["check"], "stabilize");
        assert_eq!(findings[1]["age_days"], 40);
        assert_eq!(findings[1]["pkg"]["version"], "2");
        assert!(report["skipped"].as_array().unwrap().is_empty());
    }

    #[test]
    fn json_report_carries_skips() {
        let env = TestEnv::new();
        let tree = Tree::new("core");
        tree.manifest("dev-util", "tool", "1", "keywords = [\"~amd64\"]\n");

        let assert = env
            .argus()
            .args(["scan", "--format", "json", "--today", TODAY, "--repo"])
            .arg(tree.root())
            .assert()
            .success();

        let report: serde_json::Value =
            serde_json::from_slice(&assert.get_output().stdout).unwrap();
        assert!(report["findings"].as_array().unwrap().is_empty());

        let skipped = report["skipped"].as_array().unwrap();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0]["kind"], "stabilize");
        assert!(skipped[0]["reason"]
            .as_str()
            .unwrap()
            .starts_with("history cache unavailable:"));
    }

    #[test]
    fn cache_lifecycle_across_scans() {
        let env = TestEnv::new();
        let git = overdue_tree(40);

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("unstable for 40 days"));

        // The cache checkpoint sits at HEAD.
        let head = git.head();
        env.argus()
            .args(["cache", "info", "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(
                predicate::str::contains("Checkpoint:")
                    .and(predicate::str::contains(&head[..12]))
                    .and(predicate::str::contains("Entries:")),
            );

        // A later commit is picked up incrementally and shifts the lineage's
        // latest version.
        git.tree
            .manifest("dev-util", "tool", "3", "keywords = [\"~amd64\"]\n");
        git.commit_all("add tool-3", 35);

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(
                predicate::str::contains(
                    "dev-util/tool-3: slot(0) unstable for 35 days: ~amd64",
                )
                .and(predicate::str::contains("tool-2: slot(0)").not()),
            );

        let head = git.head();
        env.argus()
            .args(["cache", "info", "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains(&head[..12]));

        // Clearing needs consent; a piped run without --yes backs out.
        env.argus()
            .args(["cache", "clear", "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("Aborted."));

        env.argus()
            .args(["cache", "clear", "--yes", "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("Removed"));

        env.argus()
            .args(["cache", "info", "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("No cache for this tree."));
    }

    #[test]
    fn survives_history_rewrite() {
        let env = TestEnv::new();
        let git = overdue_tree(40);

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("unstable for 40 days"));

        // Amending drops the cached checkpoint from history; the next scan
        // rebuilds from scratch instead of failing.
        git.amend("rework tool-2", 40);

        env.argus()
            .args(["scan", "--today", TODAY, "--repo"])
            .arg(git.root())
            .assert()
            .success()
            .stdout(predicate::str::contains("unstable for 40 days"));
    }
}
