use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

pub struct ServerGuard {
    pub base_url: String,
    child: Child,
}

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

pub fn spawn_admin_server(data_dir: &Path, secret: &str) -> Result<ServerGuard> {
    let addr_file = data_dir.join("addr.txt");
    let _ = std::fs::remove_file(&addr_file);

    let child = Command::new(env!("CARGO_BIN_EXE_tagdeck-admin"))
        .args([
            "--addr",
            "127.0.0.1:0",
            "--addr-file",
            addr_file.to_str().unwrap(),
            "--data-dir",
            data_dir.to_str().unwrap(),
            "--secret",
            secret,
        ])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn tagdeck-admin")?;

    let base_url = read_addr_file(&addr_file)?;
    wait_for_healthz(&base_url)?;

    Ok(ServerGuard { base_url, child })
}

fn read_addr_file(addr_file: &Path) -> Result<String> {
    let start = Instant::now();
    loop {
        if start.elapsed() > Duration::from_secs(5) {
            anyhow::bail!("addr file not written at {}", addr_file.display());
        }
        if let Ok(contents) = std::fs::read_to_string(addr_file) {
            let contents = contents.trim();
            if !contents.is_empty() {
                return Ok(format!("http://{}", contents));
            }
        }
        thread::sleep(Duration::from_millis(25));
    }
}

fn wait_for_healthz(base_url: &str) -> Result<()> {
    let client = reqwest::blocking::Client::new();
    let start = Instant::now();
    loop {
        if start.elapsed() > Duration::from_secs(5) {
            anyhow::bail!("server at {} never became healthy", base_url);
        }
        if let Ok(resp) = client.get(format!("{}/healthz", base_url)).send()
            && resp.status().is_success()
        {
            return Ok(());
        }
        thread::sleep(Duration::from_millis(25));
    }
}
