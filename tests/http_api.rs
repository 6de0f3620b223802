use std::time::Duration;

#[path = "harness.rs"]
mod harness;

#[tokio::test]
async fn full_pipeline_over_http() {
    let port = harness::free_port();
    let (base, mut child) = harness::spawn_node(port, &[]).await;
    let client = reqwest::Client::new();

    // Health reports the capturing state and the probed source.
    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["state"], "capturing");
    assert_eq!(health["source"], "simulation");

    // The simulation source ticks at 2 Hz; stats start counting quickly.
    let mut total = 0;
    for _ in 0..50 {
        let stats: serde_json::Value = client
            .get(format!("{}/stats", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        total = stats["total"].as_u64().unwrap_or(0);
        if total >= 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert!(total >= 1, "no observations consumed");

    // /analysis is 404 until ten observations were consumed, then a
    // snapshot with normalized percentages and a non-empty alert list.
    let mut analysis = None;
    for _ in 0..120 {
        let resp = client.get(format!("{}/analysis", base)).send().await.unwrap();
        if resp.status().is_success() {
            analysis = Some(resp.json::<serde_json::Value>().await.unwrap());
            break;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
    let analysis = analysis.expect("no analysis snapshot within timeout");
    assert!(analysis["sample_count"].as_u64().unwrap() >= 10);

    let percentages = analysis["percentages"].as_object().unwrap();
    let sum: f64 = percentages.values().map(|v| v.as_f64().unwrap()).sum();
    assert!((sum - 100.0).abs() < 1.01, "percentages sum to {}", sum);

    assert!(!analysis["alerts"].as_array().unwrap().is_empty());

    // Prometheus exposition carries the pipeline counters.
    let metrics_text = client
        .get(format!("{}/metrics", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(metrics_text.contains("netmood_observations_total"));

    // Export always answers with the CSV header, records optional.
    let export_text = client
        .get(format!("{}/export", base))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(export_text.starts_with(
        "timestamp,source-address,destination-address,protocol,byte-count,rate,entropy,mood-label"
    ));

    child.kill().await.ok();
}
