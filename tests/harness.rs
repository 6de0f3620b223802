use std::time::Duration;

use tokio::process::{Child, Command};

/// Find a free port by binding to :0 and dropping the listener.
pub fn free_port() -> u16 {
    std::net::TcpListener::bind("127.0.0.1:0")
        .expect("bind probe listener")
        .local_addr()
        .expect("probe listener addr")
        .port()
}

/// Spawn the netmood binary in run mode on the given port and wait for
/// /health to answer.
pub async fn spawn_node(port: u16, extra_env: &[(&str, &str)]) -> (String, Child) {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_netmood"));
    cmd.arg("run")
        .env("NETMOOD_LISTEN", format!("127.0.0.1:{}", port))
        .env("NETMOOD_SOURCE", "sim")
        .kill_on_drop(true);
    for (key, value) in extra_env {
        cmd.env(key, value);
    }

    let child = cmd.spawn().expect("failed to spawn netmood");
    let base = format!("http://127.0.0.1:{}", port);
    let client = reqwest::Client::new();

    let mut ready = false;
    for _ in 0..100 {
        if let Ok(resp) = client.get(format!("{}/health", base)).send().await {
            if resp.status().is_success() {
                ready = true;
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(ready, "netmood did not become ready on {}", base);

    (base, child)
}
