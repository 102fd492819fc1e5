use async_trait::async_trait;
use rstest::rstest;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use emote_bridge_lib::bridge::ScriptCall;
use emote_bridge_lib::transfer::ProgressCallback;
use emote_bridge_lib::{
    connect_in_process, BridgeConfig, DownloadProvider, FolderProject, HostThread,
    InProcessBridge, TransferClient, TransferError, TransferRequest,
};

/// 测试只通过 send_bytes 传输，不访问网络
struct NoNetwork;

#[async_trait]
impl DownloadProvider for NoNetwork {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransferError> {
        Err(TransferError::Download(format!("offline: {}", url)))
    }
}

struct Fixture {
    _temp: TempDir,
    work_dir: PathBuf,
    project: Arc<Mutex<FolderProject>>,
    client: TransferClient<InProcessBridge>,
    host_thread: HostThread,
}

fn fixture_with(config: BridgeConfig, project: FolderProject, temp: TempDir) -> Fixture {
    let work_dir = config.work_dir();
    let project = Arc::new(Mutex::new(project));
    let (client, host_thread) =
        connect_in_process(&config, project.clone(), Arc::new(NoNetwork)).unwrap();

    Fixture {
        _temp: temp,
        work_dir,
        project,
        client,
        host_thread,
    }
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let config = BridgeConfig::default().with_work_root(temp.path().join("work"));
    let project = FolderProject::open(temp.path().join("project"));
    fixture_with(config, project, temp)
}

fn request(name: &str) -> TransferRequest {
    TransferRequest::new("https://cdn.example/4x.png", name, "01GGD5PJA8000FH13S498E9D8X", false)
}

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.filter_map(|e| e.ok()).map(|e| e.path()).collect(),
        Err(_) => Vec::new(),
    }
}

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: ProgressCallback = Arc::new(move |p| sink.lock().unwrap().push(p.percent));
    (callback, seen)
}

#[rstest]
#[case(0)]
#[case(1000)]
#[case(4321)]
#[tokio::test]
async fn round_trip_reproduces_the_buffer(#[case] len: usize) {
    let fx = fixture();
    let bytes = sample(len);
    let (callback, percents) = recorder();

    let result = fx
        .client
        .send_bytes(&request("Kappa"), &bytes, Some(callback))
        .await
        .unwrap();

    let expected_chunks = (len + 999) / 1000;
    assert_eq!(result.chunks, expected_chunks);
    assert_eq!(result.bytes, len as u64);

    let imported = PathBuf::from(result.imported_path.unwrap());
    assert_eq!(fs::read(&imported).unwrap(), bytes);

    let percents = percents.lock().unwrap();
    assert_eq!(percents.len(), expected_chunks);
    assert!(percents.windows(2).all(|w| w[0] < w[1]));
    if len > 0 {
        assert_eq!(percents.last().copied(), Some(100.0));
    }
}

#[tokio::test]
async fn long_display_names_still_import() {
    let fx = fixture();
    let req = TransferRequest::new(
        "https://cdn.example/4x.png",
        "a".repeat(260),
        "01GGD5PJA8000FH13S498E9D8X",
        false,
    );
    let bytes = sample(2500);

    let result = fx.client.send_bytes(&req, &bytes, None).await.unwrap();

    assert!(result.file_name.len() <= 255);
    assert!(result.file_name.ends_with("_01GGD5PJ.png"));
    assert_eq!(result.file_name, req.file_name());
    let imported = PathBuf::from(result.imported_path.unwrap());
    assert_eq!(fs::read(&imported).unwrap(), bytes);
}

#[tokio::test]
async fn start_is_exclusive_and_idle_calls_fail() {
    let fx = fixture();
    let channel = fx.client.channel();

    channel
        .call(&ScriptCall::StartSession {
            file_name: "first.png".into(),
        })
        .await
        .unwrap();

    let err = channel
        .call(&ScriptCall::StartSession {
            file_name: "second.png".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::AlreadyOpen(_)));

    // 客户端也不会打断已有会话
    let err = fx
        .client
        .send_bytes(&request("Other"), &sample(10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::AlreadyOpen(_)));

    // 原会话不受影响
    channel
        .call(&ScriptCall::AppendChunk {
            index: 0,
            bytes: vec![1, 2, 3],
        })
        .await
        .unwrap();
    assert!(fx.work_dir.join("first.png").exists());
    assert!(!fx.work_dir.join("second.png").exists());

    fx.client.abort().await.unwrap();

    let err = channel
        .call(&ScriptCall::AppendChunk {
            index: 0,
            bytes: vec![1],
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::NoSession(_)));

    let err = channel
        .call(&ScriptCall::FinishSession {
            expected_len: None,
            sha256: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::NoSession(_)));
}

#[tokio::test]
async fn failed_append_leaves_no_file_and_host_idle() {
    let temp = TempDir::new().unwrap();
    let config = BridgeConfig::default()
        .with_work_root(temp.path().join("work"))
        .with_max_session_bytes(2500);
    let project = FolderProject::open(temp.path().join("project"));
    let fx = fixture_with(config, project, temp);

    // 第 3 块（共 4 块）超出配额
    let req = request("Big");
    let err = fx
        .client
        .send_bytes(&req, &sample(4000), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::Io(_)));
    assert!(!fx.work_dir.join(req.file_name()).exists());

    fx.client
        .channel()
        .call(&ScriptCall::StartSession {
            file_name: "next.png".into(),
        })
        .await
        .unwrap();
    fx.client.abort().await.unwrap();

    let result = fx
        .client
        .send_bytes(&request("Small"), &sample(2000), None)
        .await
        .unwrap();
    assert_eq!(result.chunks, 2);
}

#[tokio::test]
async fn abort_is_idempotent() {
    let fx = fixture();
    fx.client.abort().await.unwrap();
    fx.client.abort().await.unwrap();

    fx.client
        .channel()
        .call(&ScriptCall::StartSession {
            file_name: "a.png".into(),
        })
        .await
        .unwrap();
    fx.client.abort().await.unwrap();
    fx.client.abort().await.unwrap();
    assert!(files_in(&fx.work_dir).is_empty());
}

#[tokio::test]
async fn purge_empties_the_work_dir_and_transfers_still_work() {
    let fx = fixture();
    fx.client
        .send_bytes(&request("Kappa"), &sample(1500), None)
        .await
        .unwrap();
    fs::write(fx.work_dir.join("stale.gif"), b"old").unwrap();
    fs::create_dir_all(fx.work_dir.join("leftover")).unwrap();

    let report = fx.client.purge_all().await.unwrap();
    assert_eq!(report.removed, 3);
    assert_eq!(report.failed, 0);
    assert!(files_in(&fx.work_dir).is_empty());

    // 目录被整个删掉后也能按需重建
    fs::remove_dir_all(&fx.work_dir).unwrap();
    let result = fx
        .client
        .send_bytes(&request("Kappa"), &sample(1500), None)
        .await
        .unwrap();
    assert_eq!(result.bytes, 1500);
}

#[tokio::test]
async fn timeline_placement_is_reported_by_the_host() {
    let fx = fixture();
    let result = fx
        .client
        .send_bytes(&request("NoSeq"), &sample(10), None)
        .await
        .unwrap();
    assert!(!result.added_to_timeline);

    let temp = TempDir::new().unwrap();
    let config = BridgeConfig::default().with_work_root(temp.path().join("work"));
    let project =
        FolderProject::open(temp.path().join("project")).with_active_sequence("Main", 12.5);
    let fx = fixture_with(config, project, temp);

    let result = fx
        .client
        .send_bytes(&request("WithSeq"), &sample(10), None)
        .await
        .unwrap();
    assert!(result.added_to_timeline);

    let project = fx.project.lock().unwrap();
    let sequence = project.sequence().unwrap();
    assert_eq!(sequence.video_tracks[0].len(), 1);
    assert_eq!(sequence.video_tracks[0][0].start_seconds, 12.5);
    assert_eq!(project.items().len(), 1);
}

#[tokio::test]
async fn missing_project_is_reported_before_any_write() {
    let temp = TempDir::new().unwrap();
    let config = BridgeConfig::default().with_work_root(temp.path().join("work"));
    let fx = fixture_with(config, FolderProject::closed(), temp);

    let err = fx
        .client
        .send_bytes(&request("Kappa"), &sample(10), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TransferError::NoTargetContext(_)));
    assert!(files_in(&fx.work_dir).is_empty());
}

#[tokio::test]
async fn dropping_the_client_shuts_the_host_down() {
    let fx = fixture();
    fx.client
        .send_bytes(&request("Kappa"), &sample(10), None)
        .await
        .unwrap();
    fx.client
        .channel()
        .call(&ScriptCall::StartSession {
            file_name: "dangling.png".into(),
        })
        .await
        .unwrap();
    assert!(!files_in(&fx.work_dir).is_empty());

    let Fixture {
        _temp,
        work_dir,
        client,
        host_thread,
        ..
    } = fx;
    drop(client);
    host_thread.join();

    assert!(files_in(&work_dir).is_empty());
}
