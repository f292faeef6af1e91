use once_cell::sync::Lazy;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Entry {
    id: String,
    date: String,
    #[serde(rename = "type")]
    kind: String,
    start_time: String,
    duration: Option<i64>,
    pain_level: u8,
    #[serde(default)]
    triggers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetupStatus {
    datastore: bool,
    patient: bool,
    pain_scale: bool,
    complete: bool,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_suffix() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}_{}", std::process::id(), nanos)
}

fn temp_path(name: &str) -> String {
    let mut path = std::env::temp_dir();
    path.push(format!("headache_http_{}_{name}", unique_suffix()));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/headaches")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let database = temp_path("entries.db");
    let config_dir = temp_path("conf");
    let child = Command::new(env!("CARGO_BIN_EXE_headache_tracker"))
        .env("HOST", "127.0.0.1")
        .env("PORT", port.to_string())
        .env("DATABASE_URL", format!("sqlite:{database}"))
        .env("APP_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn create(client: &Client, base_url: &str, body: Value) -> Entry {
    let response = client
        .post(format!("{base_url}/api/headaches"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    response.json().await.unwrap()
}

#[tokio::test]
async fn http_create_then_read_back() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let created = create(
        &client,
        &server.base_url,
        json!({
            "type": "migraine",
            "date": "2024-01-10",
            "startTime": "08:00",
            "endTime": "09:15",
            "painLevel": 7,
            "triggers": ["stress", "stress"]
        }),
    )
    .await;
    assert!(!created.id.is_empty());
    assert_eq!(created.duration, Some(75));
    assert_eq!(created.triggers, vec!["stress".to_string()]);

    let fetched: Entry = client
        .get(format!("{}/api/headaches/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.date, "2024-01-10");
    assert_eq!(fetched.kind, "migraine");
    assert_eq!(fetched.start_time, "08:00");
    assert_eq!(fetched.pain_level, 7);

    let all: Vec<Entry> = client
        .get(format!("{}/api/headaches", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(all.iter().any(|entry| entry.id == created.id));
}

#[tokio::test]
async fn http_invalid_pain_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/headaches", server.base_url))
        .json(&json!({ "type": "cluster", "date": "2024-01-10", "startTime": "02:00", "painLevel": 11 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("painLevel"));
}

#[tokio::test]
async fn http_unknown_id_is_not_found() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let update = client
        .put(format!("{}/api/headaches/does-not-exist", server.base_url))
        .json(&json!({ "painLevel": 3 }))
        .send()
        .await
        .unwrap();
    assert_eq!(update.status(), StatusCode::NOT_FOUND);

    let delete = client
        .delete(format!("{}/api/headaches/does-not-exist", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(delete.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_update_then_delete_twice() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let created = create(
        &client,
        &server.base_url,
        json!({ "type": "migraine", "date": "2024-02-01", "startTime": "10:00", "painLevel": 4 }),
    )
    .await;

    let updated: Entry = client
        .put(format!("{}/api/headaches/{}", server.base_url, created.id))
        .json(&json!({ "painLevel": 6, "endTime": "11:30" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated.pain_level, 6);
    assert_eq!(updated.duration, Some(90));
    assert_eq!(updated.date, "2024-02-01");

    let first = client
        .delete(format!("{}/api/headaches/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["success"], json!(true));

    let second = client
        .delete(format!("{}/api/headaches/{}", server.base_url, created.id))
        .send()
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_log_form_tracks_an_episode() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let id = format!("episode-{}", unique_suffix());

    let send = |event: Value| {
        let client = client.clone();
        let url = format!("{}/log", server.base_url);
        async move {
            let response = client
                .post(url)
                .form(&[("data", event.to_string())])
                .send()
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            response.text().await.unwrap()
        }
    };

    assert_eq!(
        send(json!({ "type": "headacheStart", "headacheId": id, "value": "cluster", "timestamp": "2024-03-01T01:00:00+00:00" })).await,
        "Success"
    );
    assert_eq!(send(json!({ "type": "painLevel", "headacheId": id, "value": 8 })).await, "Success");
    assert_eq!(send(json!({ "type": "painLevel", "headacheId": id, "value": 12 })).await, "Failure");
    assert_eq!(send(json!({ "type": "painLevel", "headacheId": "never-started", "value": 5 })).await, "Failure");
    assert_eq!(send(json!({ "type": "headacheStart", "headacheId": id })).await, "Failure");
    assert_eq!(
        send(json!({ "type": "headacheEnd", "headacheId": id, "timestamp": "2024-03-01T01:40:00+00:00" })).await,
        "Success"
    );

    let entry: Entry = client
        .get(format!("{}/api/headaches/{}", server.base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(entry.kind, "cluster");
    assert_eq!(entry.pain_level, 8);
    assert_eq!(entry.duration, Some(40));

    let response = client
        .post(format!("{}/headaches/delete", server.base_url))
        .form(&[("headacheId", id.as_str())])
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let gone = client
        .get(format!("{}/api/headaches/{}", server.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn http_setup_completes_after_all_files() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let status = |client: Client, url: String| async move {
        client.get(url).send().await.unwrap().json::<SetupStatus>().await.unwrap()
    };
    let setup_url = format!("{}/api/setup", server.base_url);

    let before = status(client.clone(), setup_url.clone()).await;
    assert!(!before.complete);

    let bad = client
        .post(format!("{}/api/setup/patient", server.base_url))
        .json(&json!({ "firstName": " ", "lastName": "Doe" }))
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status(), StatusCode::BAD_REQUEST);

    let patient = client
        .post(format!("{}/api/setup/patient", server.base_url))
        .json(&json!({ "firstName": "Sam", "lastName": "Doe", "abortives": ["Oxygen On"] }))
        .send()
        .await
        .unwrap();
    assert!(patient.status().is_success());

    let scale = client
        .post(format!("{}/api/setup/pain-scale", server.base_url))
        .json(&json!({ "scale": "uk_nhs" }))
        .send()
        .await
        .unwrap();
    assert!(scale.status().is_success());

    let middle = status(client.clone(), setup_url.clone()).await;
    assert!(middle.patient && middle.pain_scale);
    assert!(!middle.datastore);
    assert!(!middle.complete);

    let datastore = client
        .post(format!("{}/api/setup/datastore", server.base_url))
        .json(&json!({ "url": "sqlite:data/headache_tracker.db" }))
        .send()
        .await
        .unwrap();
    assert!(datastore.status().is_success());

    let after = status(client.clone(), setup_url).await;
    assert!(after.complete);

    let options: Value = client
        .get(format!("{}/api/options", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let relief = options["relief"].as_array().unwrap();
    assert!(relief.iter().any(|option| option["name"] == "Oxygen On"));
}

#[tokio::test]
async fn http_stats_and_export() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let stats: Value = client
        .get(format!("{}/api/stats?months=3", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["monthlyTrends"].as_array().unwrap().len(), 3);
    assert_eq!(stats["painLevelDistribution"].as_array().unwrap().len(), 10);

    let export = client
        .get(format!("{}/api/export", server.base_url))
        .send()
        .await
        .unwrap();
    assert!(export.status().is_success());
    let disposition = export
        .headers()
        .get(reqwest::header::CONTENT_DISPOSITION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(disposition.contains("headache-data-backup-"));
    let _: Vec<Value> = export.json().await.unwrap();
}

#[tokio::test]
async fn http_import_counts_rows_that_fail() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let marker = format!("imported-{}", unique_suffix());

    let summary: Value = client
        .post(format!("{}/api/import", server.base_url))
        .json(&json!([
            { "type": "migraine", "date": "2023-11-02", "startTime": "07:00", "painLevel": 5, "notes": marker },
            { "type": "migraine", "date": "2023-11-03", "startTime": "07:00", "painLevel": 0, "notes": marker },
            { "date": "not a date" }
        ]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary, json!({ "imported": 1, "failed": 2 }));

    let found: Vec<Entry> = client
        .get(format!("{}/api/headaches", server.base_url))
        .query(&[("q", marker.as_str())])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].date, "2023-11-02");
}

#[tokio::test]
async fn http_event_import_skips_unstarted_and_existing_episodes() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let suffix = unique_suffix();
    let fresh = format!("fresh-{suffix}");
    let existing = format!("existing-{suffix}");
    let unstarted = format!("unstarted-{suffix}");

    let response = client
        .post(format!("{}/log", server.base_url))
        .form(&[("data", json!({ "type": "headacheStart", "headacheId": existing }).to_string())])
        .send()
        .await
        .unwrap();
    assert_eq!(response.text().await.unwrap(), "Success");

    let summary: Value = client
        .post(format!("{}/api/import/events", server.base_url))
        .json(&json!([
            { "type": "headacheStart", "headacheId": fresh, "value": "cluster", "timestamp": "2023-10-01T02:00:00+00:00" },
            { "type": "painLevel", "headacheId": fresh, "value": 6, "timestamp": "2023-10-01T02:05:00+00:00" },
            { "type": "abortive", "headacheId": fresh, "value": "Oxygen On", "timestamp": "2023-10-01T02:06:00+00:00" },
            { "type": "painLevel", "headacheId": fresh, "value": 9, "timestamp": "2023-10-01T02:10:00+00:00" },
            { "type": "abortive", "headacheId": fresh, "value": "Oxygen Off", "timestamp": "2023-10-01T02:26:00+00:00" },
            { "type": "headacheEnd", "headacheId": fresh, "timestamp": "2023-10-01T02:45:00+00:00" },
            { "type": "headacheStart", "headacheId": existing, "timestamp": "2023-10-02T05:00:00+00:00" },
            { "type": "painLevel", "headacheId": unstarted, "value": 4, "timestamp": "2023-10-03T05:00:00+00:00" },
            { "type": "noSuchEvent", "headacheId": fresh }
        ]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary, json!({ "imported": 1, "failed": 2 }));

    let report: Value = client
        .get(format!("{}/api/headaches/{}/report", server.base_url, fresh))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(report["entry"]["type"], "cluster");
    assert_eq!(report["entry"]["painLevel"], 9);
    assert_eq!(report["entry"]["painReadings"].as_array().unwrap().len(), 2);
    assert_eq!(report["entry"]["actions"].as_array().unwrap().len(), 2);
    assert_eq!(report["durationLabel"], "45m");
    assert_eq!(report["oxygenMinutes"], 20);
    assert_eq!(report["oxygenLabel"], "20m");

    let kept: Entry = client
        .get(format!("{}/api/headaches/{}", server.base_url, existing))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_ne!(kept.date, "2023-10-02");

    let unknown = client
        .get(format!("{}/api/headaches/{}/report", server.base_url, unstarted))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
    let body: Value = unknown.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn http_list_filters_sorts_and_rejects_bad_params() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let marker = format!("listing-{}", unique_suffix());

    for (kind, date, pain) in [
        ("migraine", "2023-09-01", 6),
        ("cluster", "2023-09-02", 9),
        ("cluster", "2023-09-03", 3),
    ] {
        create(
            &client,
            &server.base_url,
            json!({ "type": kind, "date": date, "startTime": "06:00", "painLevel": pain, "notes": marker }),
        )
        .await;
    }

    let list = |params: Vec<(&'static str, String)>| {
        let client = client.clone();
        let url = format!("{}/api/headaches", server.base_url);
        async move { client.get(url).query(&params).send().await.unwrap() }
    };

    let clusters: Vec<Entry> = list(vec![("q", marker.to_uppercase()), ("type", "cluster".into())])
        .await
        .json()
        .await
        .unwrap();
    let dates: Vec<&str> = clusters.iter().map(|entry| entry.date.as_str()).collect();
    assert_eq!(dates, ["2023-09-03", "2023-09-02"]);

    let by_pain: Vec<Entry> = list(vec![
        ("q", marker.clone()),
        ("sort", "painLevel".into()),
        ("order", "asc".into()),
    ])
    .await
    .json()
    .await
    .unwrap();
    let levels: Vec<u8> = by_pain.iter().map(|entry| entry.pain_level).collect();
    assert_eq!(levels, [3, 6, 9]);

    let oldest_first: Vec<Entry> = list(vec![("q", marker.clone()), ("order", "asc".into())])
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(oldest_first[0].date, "2023-09-01");

    for params in [
        vec![("sort", "weather".to_string())],
        vec![("order", "sideways".to_string())],
        vec![("type", "tension".to_string())],
    ] {
        let response = list(params).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = response.json().await.unwrap();
        assert!(body["error"].is_string());
    }

    let stats = client
        .get(format!("{}/api/stats?months=abc", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(stats.status(), StatusCode::BAD_REQUEST);
    let body: Value = stats.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn http_medical_report_lists_history_oldest_first() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let oldest = create(
        &client,
        &server.base_url,
        json!({ "type": "migraine", "date": "2001-01-01", "startTime": "12:00", "endTime": "13:30", "painLevel": 4 }),
    )
    .await;

    let summary: Value = client
        .get(format!("{}/api/report/medical", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let episodes = summary["episodes"].as_array().unwrap();
    assert_eq!(summary["totalEpisodes"], json!(episodes.len()));
    assert_eq!(summary["firstEpisode"], "2001-01-01");
    assert_eq!(episodes[0]["entry"]["id"], json!(oldest.id));
    assert_eq!(episodes[0]["durationLabel"], "1h 30m");
    assert!(summary["spanDays"].as_i64().unwrap() >= 0);
}
