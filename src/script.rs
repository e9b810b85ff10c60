use std::fmt::Write as _;

use anyhow::anyhow;

/// Target shell family for an emitted automation script.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl std::str::FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "posix" => Ok(Self::Posix),
            "windows" => Ok(Self::Windows),
            other => Err(anyhow!(
                "unknown platform {} (expected posix|windows)",
                other
            )),
        }
    }
}

const PULL_ATTEMPTS: u32 = 5;
const BACKOFF_CAP_SECS: u32 = 60;

/// Renders a complete, directly executable script that pulls every requested
/// image (with retry/backoff) and then runs them sequentially, extracting
/// each image's payload under the mount path and renaming it after its tag.
///
/// Deterministic for identical inputs; every id appears exactly once, in the
/// order supplied.
pub fn emit(
    platform: Platform,
    entry_ids: &[String],
    docker_user: &str,
    repo_name: &str,
    mount_path: &str,
) -> String {
    match platform {
        Platform::Posix => emit_posix(entry_ids, docker_user, repo_name, mount_path),
        Platform::Windows => emit_windows(entry_ids, docker_user, repo_name, mount_path),
    }
}

fn emit_posix(entry_ids: &[String], docker_user: &str, repo_name: &str, mount_path: &str) -> String {
    let mut out = String::new();

    out.push_str("#!/bin/sh\n");
    let _ = writeln!(out, "# Pull and extract {} image(s).", entry_ids.len());
    out.push_str("set -u\n\n");
    let _ = writeln!(out, "DOCKER_USER=\"{docker_user}\"");
    let _ = writeln!(out, "REPO=\"{repo_name}\"");
    let _ = writeln!(out, "MOUNT_PATH=\"{mount_path}\"");
    out.push_str(
        r#"
command -v docker >/dev/null 2>&1 || { echo "docker not found" >&2; exit 1; }
docker info >/dev/null 2>&1 || { echo "docker daemon not reachable" >&2; exit 1; }
ping -c 1 hub.docker.com >/dev/null 2>&1 || { echo "registry not reachable" >&2; exit 1; }

pull_with_retry() {
    image="$1"
    attempt=1
    delay=2
"#,
    );
    let _ = writeln!(out, "    while [ \"$attempt\" -le {PULL_ATTEMPTS} ]; do");
    out.push_str(
        r#"        if docker pull "$image"; then
            return 0
        fi
"#,
    );
    let _ = writeln!(
        out,
        "        echo \"pull failed for $image (attempt $attempt/{PULL_ATTEMPTS}); retrying in ${{delay}}s\" >&2"
    );
    out.push_str(
        r#"        sleep "$delay"
        delay=$((delay * 2))
"#,
    );
    let _ = writeln!(
        out,
        "        [ \"$delay\" -gt {BACKOFF_CAP_SECS} ] && delay={BACKOFF_CAP_SECS}"
    );
    out.push_str("        attempt=$((attempt + 1))\n    done\n");
    let _ = writeln!(
        out,
        "    echo \"giving up on $image after {PULL_ATTEMPTS} attempts\" >&2"
    );
    out.push_str("    return 1\n}\n\n");

    for id in entry_ids {
        let _ = writeln!(out, "pull_with_retry \"$DOCKER_USER/$REPO:{id}\" || exit 1");
    }
    out.push('\n');

    for id in entry_ids {
        let _ = writeln!(
            out,
            "docker run --rm -v \"$MOUNT_PATH:/extract\" \"$DOCKER_USER/$REPO:{id}\" sh -c 'cp -a /home /extract/' || exit 1"
        );
        let _ = writeln!(
            out,
            "[ -d \"$MOUNT_PATH/home\" ] && mv \"$MOUNT_PATH/home\" \"$MOUNT_PATH/{id}\""
        );
    }
    out.push_str("\necho \"done\"\n");

    out
}

fn emit_windows(
    entry_ids: &[String],
    docker_user: &str,
    repo_name: &str,
    mount_path: &str,
) -> String {
    let mut out = String::new();

    out.push_str("@echo off\nsetlocal enabledelayedexpansion\n");
    let _ = writeln!(out, "rem Pull and extract {} image(s).", entry_ids.len());
    let _ = writeln!(out, "set \"DOCKER_USER={docker_user}\"");
    let _ = writeln!(out, "set \"REPO={repo_name}\"");
    let _ = writeln!(out, "set \"MOUNT_PATH={mount_path}\"");
    out.push_str(
        r#"
where docker >nul 2>&1 || (echo docker not found & exit /b 1)
docker info >nul 2>&1 || (echo docker daemon not reachable & exit /b 1)
ping -n 1 hub.docker.com >nul 2>&1 || (echo registry not reachable & exit /b 1)

"#,
    );

    for id in entry_ids {
        let _ = writeln!(
            out,
            "call :pull_with_retry \"%DOCKER_USER%/%REPO%:{id}\" || exit /b 1"
        );
    }
    out.push('\n');

    for id in entry_ids {
        let _ = writeln!(
            out,
            "docker run --rm -v \"%MOUNT_PATH%:/extract\" \"%DOCKER_USER%/%REPO%:{id}\" sh -c \"cp -a /home /extract/\" || exit /b 1"
        );
        let _ = writeln!(
            out,
            "if exist \"%MOUNT_PATH%\\home\" move \"%MOUNT_PATH%\\home\" \"%MOUNT_PATH%\\{id}\" >nul"
        );
    }
    out.push_str("\necho done\nexit /b 0\n\n");

    out.push_str(":pull_with_retry\nset \"IMAGE=%~1\"\nset /a ATTEMPT=1\nset /a DELAY=2\n:pull_again\ndocker pull \"%IMAGE%\" && exit /b 0\n");
    let _ = writeln!(
        out,
        "echo pull failed for %IMAGE% (attempt !ATTEMPT!/{PULL_ATTEMPTS})"
    );
    out.push_str("timeout /t !DELAY! /nobreak >nul\nset /a DELAY=!DELAY!*2\n");
    let _ = writeln!(out, "if !DELAY! gtr {BACKOFF_CAP_SECS} set /a DELAY={BACKOFF_CAP_SECS}");
    out.push_str("set /a ATTEMPT+=1\n");
    let _ = writeln!(out, "if !ATTEMPT! leq {PULL_ATTEMPTS} goto pull_again");
    let _ = writeln!(out, "echo giving up on %IMAGE% after {PULL_ATTEMPTS} attempts");
    out.push_str("exit /b 1\n");

    out
}
