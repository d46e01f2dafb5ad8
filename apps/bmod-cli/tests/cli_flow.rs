// cli_flow.rs — Operator workflow through the `bmod` binary.
//
// Flow:
//   1. bmod translate → dry run, nothing stored
//   2. bmod policy add --text / --file → policies persisted under .bmod/
//   3. bmod check → denied requests exit non-zero with reasons
//   4. non-admin policy add → refused, and the refusal is audited
//   5. bmod policy remove → the action is allowed again
//   6. bmod policy history → accepted changes, rebuilt from the audit log
//   7. bmod audit verify / query → hash chain intact, entries filterable

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn bmod(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_bmod"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn operator_workflow_end_to_end() {
    let project = TempDir::new().unwrap();
    let root = project.path();

    // =========================================================
    // 1. Dry-run translation stores nothing
    // =========================================================

    let out = bmod(root, &["translate", "Block user spam@example.com"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("# intent: block_user"));
    assert!(text.contains("kind: user_access"));
    assert!(text.contains("spam@example.com"));

    let out = bmod(root, &["policy", "list"]);
    assert!(stdout(&out).contains("No policies."));

    // =========================================================
    // 2. Add one policy from text, one from a YAML file
    // =========================================================

    let out = bmod(
        root,
        &[
            "policy", "add", "--text", "Never delete files", "--admin", "ops", "--role", "admin",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    assert!(stdout(&out).contains("action_restriction"));

    let rule_file = root.join("no-critical.yaml");
    std::fs::write(
        &rule_file,
        "kind: security_level\nrestricted_levels: [critical]\n",
    )
    .unwrap();
    let out = bmod(
        root,
        &[
            "policy",
            "add",
            "--file",
            rule_file.to_str().unwrap(),
            "--description",
            "no critical actions",
            "--role",
            "admin",
        ],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let listing = stdout(&bmod(root, &["policy", "list"]));
    assert!(listing.contains("action_restriction"));
    assert!(listing.contains("no critical actions"));

    // =========================================================
    // 3. Check requests
    // =========================================================

    let out = bmod(root, &["check", "--actor", "alice", "--action", "delete_file"]);
    assert!(!out.status.success());
    assert!(stdout(&out).contains("DENIED"));

    let out = bmod(
        root,
        &["check", "--actor", "alice", "--action", "read_file", "--level", "critical"],
    );
    assert!(!out.status.success());

    let out = bmod(root, &["check", "--actor", "alice", "--action", "read_file"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("ALLOWED"));

    // =========================================================
    // 4. A non-admin cannot change policies
    // =========================================================

    let out = bmod(
        root,
        &[
            "policy", "add", "--text", "Never send emails", "--admin", "mallory", "--role", "guest",
        ],
    );
    assert!(!out.status.success());
    assert!(!stdout(&bmod(root, &["policy", "list"])).contains("send"));

    // =========================================================
    // 5. Remove the delete restriction
    // =========================================================

    let listing = stdout(&bmod(root, &["policy", "list"]));
    let id = listing
        .lines()
        .find(|l| l.contains("action_restriction"))
        .and_then(|l| l.split_whitespace().next())
        .unwrap()
        .to_string();
    let out = bmod(root, &["policy", "remove", &id, "--role", "admin"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let out = bmod(root, &["check", "--actor", "alice", "--action", "delete_file"]);
    assert!(out.status.success());
    let all = stdout(&bmod(root, &["policy", "list", "--all"]));
    let removed = all.lines().find(|l| l.starts_with(&id)).unwrap();
    assert!(removed.contains(" no "));
    assert!(!stdout(&bmod(root, &["policy", "list"])).contains(&id));

    // =========================================================
    // 6. Modification history
    // =========================================================

    let history = stdout(&bmod(root, &["policy", "history"]));
    let rows: Vec<&str> = history.lines().skip(2).collect();
    assert_eq!(rows.len(), 3, "{}", history);
    assert!(rows[0].contains("added") && rows[0].contains("Never delete files"));
    assert!(rows[0].contains("ops"));
    assert!(rows[2].contains("removed") && rows[2].contains(&id));

    let last = stdout(&bmod(root, &["policy", "history", "--limit", "1"]));
    assert_eq!(last.lines().skip(2).count(), 1);
    assert!(last.contains("removed"));

    // =========================================================
    // 7. Audit trail
    // =========================================================

    let out = bmod(root, &["audit", "verify"]);
    assert!(out.status.success());
    // 2 adds, 3 checks, 1 rejection, 1 removal, 1 check.
    assert!(stdout(&out).contains("8 entry(ies)"));

    let denied = stdout(&bmod(root, &["audit", "query", "--denied"]));
    assert!(denied.contains("delete_file denied"));
    assert!(!denied.contains("read_file allowed"));

    let mutations = stdout(&bmod(root, &["audit", "query", "--mutations"]));
    assert!(mutations.contains("modification_rejected"));
    assert!(mutations.contains("policy_removed"));

    let tail = stdout(&bmod(root, &["audit", "tail", "-n", "1"]));
    assert!(tail.contains("delete_file allowed"));
}

#[test]
fn policy_changes_need_an_explicit_role() {
    let project = TempDir::new().unwrap();
    let root = project.path();

    let out = bmod(root, &["policy", "add", "--text", "Never delete files"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unauthorized modification"));
    assert!(stdout(&bmod(root, &["policy", "list"])).contains("No policies."));

    let rejected = stdout(&bmod(root, &["audit", "query", "--mutations"]));
    assert!(rejected.contains("modification_rejected"));
    assert!(stdout(&bmod(root, &["policy", "history"])).contains("No modifications."));
}

#[test]
fn audit_commands_without_a_log() {
    let project = TempDir::new().unwrap();
    let out = bmod(project.path(), &["audit", "verify"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("No audit log found"));
}
