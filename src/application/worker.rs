//! The transfer worker: a single consumer that turns queued commands into uploads.
//!
//! For a segment command every destination gets, in order:
//! 1. the segment bytes, read from `temp_dir` and rewound before each destination,
//! 2. its own media playlist (each destination may serve segments under its own URL),
//!    followed by a CDN invalidation when the backend supports one,
//! 3. a best-effort delete of the segment that aged out of retention.
//!
//! A failing destination is logged and skipped; a failing command is logged and the loop
//! moves on to the next one. Nothing is retried.

use crate::adapters::local::queue::{command_queue, CommandReceiver, CommandSender};
use crate::config::Config;
use crate::domain::commands::{Command, SegmentCommand};
use crate::domain::hls::{render_master_playlist, render_media_playlist};
use crate::domain::naming::{master_playlist_name, media_playlist_name, segment_name};
use crate::domain::profile::EncodingProfile;
use crate::domain::retention::segment_to_retire;
use crate::error::{TransferError, TransferResult, WorkerError};
use crate::ports::backend::TransferTarget;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::io::{Cursor, SeekFrom};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::AsyncSeekExt;
use tokio::task::{JoinError, JoinHandle};

/// Per-run constants the worker needs, fixed at startup.
#[derive(Clone, Debug)]
pub struct WorkerContext {
    pub temp_dir: PathBuf,
    pub segment_prefix: String,
    pub index_prefix: String,
    pub segment_length: u64,
    pub index_segment_count: u64,
    pub delete_nth_segment_back: Option<u64>,
    pub encoding_profiles: Vec<EncodingProfile>,
}

impl From<&Config> for WorkerContext {
    fn from(config: &Config) -> Self {
        Self {
            temp_dir: config.temp_dir.clone(),
            segment_prefix: config.segment_prefix.clone(),
            index_prefix: config.index_prefix.clone(),
            segment_length: config.segment_length,
            index_segment_count: config.index_segment_count,
            delete_nth_segment_back: config.delete_nth_segment_back,
            encoding_profiles: config.encoding_profiles.clone(),
        }
    }
}

pub struct TransferWorker {
    ctx: WorkerContext,
    targets: Vec<TransferTarget>,
}

/// Producer-side handle to a spawned worker.
pub struct WorkerHandle {
    sender: CommandSender,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn sender(&self) -> CommandSender {
        self.sender.clone()
    }

    pub fn push(&self, command: Command) -> bool {
        self.sender.push(command)
    }

    /// Queue `Quit` behind everything already pushed and wait for the worker to drain.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.sender.push(Command::Quit);
        self.join.await
    }

    /// Wait for the worker without queueing `Quit`.
    pub async fn join(self) -> Result<(), JoinError> {
        let WorkerHandle { sender, join } = self;
        drop(sender);
        join.await
    }
}

impl TransferWorker {
    pub fn new(ctx: WorkerContext, targets: Vec<TransferTarget>) -> Self {
        Self { ctx, targets }
    }

    /// Start the consumer loop on its own task.
    pub fn spawn(self) -> WorkerHandle {
        let (sender, receiver) = command_queue();
        let join = tokio::spawn(self.run(receiver));
        WorkerHandle { sender, join }
    }

    pub async fn run(self, mut commands: CommandReceiver) {
        tracing::info!(destinations = self.targets.len(), "Transfer worker started");

        while let Some(command) = commands.pop().await {
            if command == Command::Quit {
                tracing::info!("Quit received");
                break;
            }

            let outcome = AssertUnwindSafe(self.process(&command))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(WorkerError::Panicked(panic_message(panic))));

            if let Err(e) = outcome {
                tracing::error!(command = %command, error = %e, "Command failed");
            }
        }

        tracing::info!("Transfer worker stopped");
    }

    /// Handle one command. Destination failures are logged, not returned.
    pub async fn process(&self, command: &Command) -> Result<(), WorkerError> {
        match command {
            Command::Quit => Ok(()),
            Command::BuildMultiVariantIndex => {
                self.ship_master_playlist().await;
                Ok(())
            }
            Command::ShipSegment(segment) => self.ship_segment(segment).await,
        }
    }

    async fn ship_segment(&self, command: &SegmentCommand) -> Result<(), WorkerError> {
        let ctx = &self.ctx;
        let segment = segment_name(
            &ctx.segment_prefix,
            &command.profile_name,
            command.last_segment,
        );
        let source_path = ctx.temp_dir.join(&segment);

        let mut source = File::open(&source_path)
            .await
            .map_err(|source| WorkerError::SourceRead {
                path: source_path.clone(),
                source,
            })?;

        let mut failed = 0;
        for target in &self.targets {
            let (name, source) = (segment.as_str(), &mut source);
            let result = guarded(async move {
                source.seek(SeekFrom::Start(0)).await?;
                target.backend.create_file(name, source).await
            })
            .await;
            if !record(target, "upload", &segment, result) {
                failed += 1;
            }
        }

        // The local copy goes whether or not any destination accepted it.
        drop(source);
        if let Err(e) = tokio::fs::remove_file(&source_path).await {
            tracing::warn!(path = %source_path.display(), error = %e, "Failed to remove segment source");
        }

        let playlist = media_playlist_name(&ctx.index_prefix, &command.profile_name);
        for target in &self.targets {
            let mut content = Cursor::new(render_media_playlist(
                ctx.index_segment_count,
                ctx.segment_length,
                &ctx.segment_prefix,
                &command.profile_name,
                &target.url_prefix,
                command.first_segment,
                command.last_segment,
                command.stream_ended,
            ));
            let result = guarded(target.backend.create_file(&playlist, &mut content)).await;
            if !record(target, "upload", &playlist, result) {
                failed += 1;
                continue;
            }

            if target.backend.capabilities().invalidate {
                let result = guarded(target.backend.invalidate(&playlist)).await;
                record(target, "invalidate", &playlist, result);
            }
        }

        if let Some(depth) = ctx.delete_nth_segment_back {
            if let Some(retired) = segment_to_retire(
                command.last_segment,
                depth,
                &ctx.segment_prefix,
                &command.profile_name,
            ) {
                for target in &self.targets {
                    let result = guarded(target.backend.try_delete_file(&retired)).await;
                    record(target, "delete", &retired, result);
                }
            }
        }

        tracing::info!(
            segment = %segment,
            profile = %command.profile_name,
            stream_ended = command.stream_ended,
            failed_uploads = failed,
            "Segment shipped"
        );
        Ok(())
    }

    async fn ship_master_playlist(&self) {
        let ctx = &self.ctx;
        let name = master_playlist_name(&ctx.index_prefix);

        for target in &self.targets {
            let mut content = Cursor::new(render_master_playlist(
                &ctx.index_prefix,
                &ctx.encoding_profiles,
                &target.url_prefix_for_playlists,
            ));
            let result = guarded(target.backend.create_file(&name, &mut content)).await;
            record(target, "upload", &name, result);
        }
    }
}

/// Run one backend call, turning a panic into an error so the next destination still runs.
async fn guarded<F>(call: F) -> TransferResult<()>
where
    F: Future<Output = TransferResult<()>>,
{
    AssertUnwindSafe(call)
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(TransferError::Panicked(panic_message(panic))))
}

fn panic_message(panic: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn record(target: &TransferTarget, action: &str, file: &str, result: TransferResult<()>) -> bool {
    match result {
        Ok(()) => {
            tracing::debug!(
                destination = %target.name,
                backend = target.backend.kind(),
                action,
                file,
                "Transfer succeeded"
            );
            true
        }
        Err(e) => {
            tracing::error!(
                destination = %target.name,
                backend = target.backend.kind(),
                action,
                file,
                error = %e,
                "Transfer failed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::backend::{Backend, BackendCapabilities, ContentSource};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use tempfile::{tempdir, TempDir};
    use tokio::io::AsyncReadExt;

    #[derive(Default)]
    struct Calls {
        uploads: Vec<(String, Vec<u8>)>,
        deletes: Vec<String>,
        invalidations: Vec<String>,
    }

    #[derive(Default)]
    struct RecordingBackend {
        calls: Mutex<Calls>,
        fail_uploads: bool,
        panic_uploads: bool,
        cdn: bool,
    }

    impl RecordingBackend {
        fn uploads(&self) -> Vec<(String, Vec<u8>)> {
            self.calls.lock().unwrap().uploads.clone()
        }

        fn upload_names(&self) -> Vec<String> {
            self.uploads().into_iter().map(|(name, _)| name).collect()
        }

        fn upload(&self, name: &str) -> Option<String> {
            self.uploads()
                .into_iter()
                .find(|(n, _)| n == name)
                .map(|(_, data)| String::from_utf8(data).unwrap())
        }

        fn deletes(&self) -> Vec<String> {
            self.calls.lock().unwrap().deletes.clone()
        }

        fn invalidations(&self) -> Vec<String> {
            self.calls.lock().unwrap().invalidations.clone()
        }
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        fn kind(&self) -> &'static str {
            "recording"
        }

        fn capabilities(&self) -> BackendCapabilities {
            BackendCapabilities {
                invalidate: self.cdn,
            }
        }

        async fn create_file(
            &self,
            name: &str,
            content: &mut dyn ContentSource,
        ) -> TransferResult<()> {
            if self.panic_uploads {
                panic!("backend exploded");
            }
            let mut data = Vec::new();
            content.read_to_end(&mut data).await?;
            if self.fail_uploads {
                return Err(TransferError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "connection refused",
                )));
            }
            self.calls
                .lock()
                .unwrap()
                .uploads
                .push((name.to_string(), data));
            Ok(())
        }

        async fn try_delete_file(&self, name: &str) -> TransferResult<()> {
            self.calls.lock().unwrap().deletes.push(name.to_string());
            Ok(())
        }

        async fn invalidate(&self, name: &str) -> TransferResult<()> {
            self.calls
                .lock()
                .unwrap()
                .invalidations
                .push(name.to_string());
            Ok(())
        }
    }

    fn context(dir: &TempDir) -> WorkerContext {
        WorkerContext {
            temp_dir: dir.path().to_path_buf(),
            segment_prefix: "live".to_string(),
            index_prefix: "index".to_string(),
            segment_length: 10,
            index_segment_count: 3,
            delete_nth_segment_back: None,
            encoding_profiles: vec![
                EncodingProfile::new("ep_512k", 512_000),
                EncodingProfile::new("ep_128k", 128_000),
            ],
        }
    }

    fn target(name: &str, backend: Arc<RecordingBackend>) -> TransferTarget {
        TransferTarget::new(
            name,
            backend,
            format!("http://{}.example.com/seg/", name),
            Some(format!("http://{}.example.com/idx/", name)),
        )
    }

    fn write_segment(dir: &TempDir, index: u64, data: &[u8]) -> PathBuf {
        let path = dir.path().join(segment_name("live", "ep_128k", index));
        std::fs::write(&path, data).unwrap();
        path
    }

    fn ship(first: u64, last: u64, ended: bool) -> Command {
        Command::ShipSegment(SegmentCommand {
            first_segment: first,
            last_segment: last,
            stream_ended: ended,
            profile_name: "ep_128k".to_string(),
        })
    }

    #[tokio::test]
    async fn test_ship_segment_reaches_every_backend() {
        let dir = tempdir().unwrap();
        let payload = vec![0x47u8; 4096];
        let source = write_segment(&dir, 5, &payload);

        let a = Arc::new(RecordingBackend::default());
        let b = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(
            context(&dir),
            vec![target("a", a.clone()), target("b", b.clone())],
        );

        worker.process(&ship(1, 5, false)).await.unwrap();

        for backend in [&a, &b] {
            let uploads = backend.uploads();
            assert_eq!(uploads.len(), 2);
            assert_eq!(uploads[0].0, "live_ep_128k-00005.ts");
            assert_eq!(uploads[0].1, payload);
            assert_eq!(uploads[1].0, "index_ep_128k.m3u8");
        }
        assert!(!source.exists(), "local segment should be removed");
    }

    #[tokio::test]
    async fn test_playlist_uses_each_backend_url_prefix() {
        let dir = tempdir().unwrap();
        write_segment(&dir, 5, b"ts");

        let a = Arc::new(RecordingBackend::default());
        let b = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(
            context(&dir),
            vec![target("a", a.clone()), target("b", b.clone())],
        );

        worker.process(&ship(1, 5, true)).await.unwrap();

        let playlist = a.upload("index_ep_128k.m3u8").unwrap();
        assert!(playlist.contains("#EXT-X-MEDIA-SEQUENCE:3\n"));
        assert!(playlist.contains("http://a.example.com/seg/live_ep_128k-00003.ts\n"));
        assert!(playlist.contains("http://a.example.com/seg/live_ep_128k-00005.ts\n"));
        assert!(!playlist.contains("00002.ts"));
        assert!(playlist.ends_with("#EXT-X-ENDLIST\n"));

        let playlist = b.upload("index_ep_128k.m3u8").unwrap();
        assert!(playlist.contains("http://b.example.com/seg/live_ep_128k-00004.ts\n"));
    }

    #[tokio::test]
    async fn test_failing_backend_does_not_block_others() {
        let dir = tempdir().unwrap();
        let source = write_segment(&dir, 2, b"segment");

        let broken = Arc::new(RecordingBackend {
            fail_uploads: true,
            ..Default::default()
        });
        let healthy = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(
            context(&dir),
            vec![target("broken", broken.clone()), target("ok", healthy.clone())],
        );

        worker.process(&ship(1, 2, false)).await.unwrap();

        assert!(broken.uploads().is_empty());
        assert_eq!(
            healthy.upload_names(),
            vec!["live_ep_128k-00002.ts", "index_ep_128k.m3u8"]
        );
        assert_eq!(healthy.upload("live_ep_128k-00002.ts").unwrap(), "segment");
        assert!(!source.exists(), "local segment is removed even after failures");
    }

    #[tokio::test]
    async fn test_panicking_backend_does_not_block_others() {
        let dir = tempdir().unwrap();
        write_segment(&dir, 2, b"segment");

        let exploding = Arc::new(RecordingBackend {
            panic_uploads: true,
            ..Default::default()
        });
        let healthy = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(
            context(&dir),
            vec![target("boom", exploding), target("ok", healthy.clone())],
        );

        worker.process(&ship(1, 2, false)).await.unwrap();
        assert_eq!(healthy.uploads().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidation_only_for_capable_backends() {
        let dir = tempdir().unwrap();
        write_segment(&dir, 7, b"ts");

        let plain = Arc::new(RecordingBackend::default());
        let cdn = Arc::new(RecordingBackend {
            cdn: true,
            ..Default::default()
        });
        let worker = TransferWorker::new(
            context(&dir),
            vec![target("plain", plain.clone()), target("cdn", cdn.clone())],
        );

        worker.process(&ship(1, 7, false)).await.unwrap();

        assert!(plain.invalidations().is_empty());
        assert_eq!(cdn.invalidations(), vec!["index_ep_128k.m3u8"]);
    }

    #[tokio::test]
    async fn test_retention_deletes_on_every_backend() {
        let dir = tempdir().unwrap();
        write_segment(&dir, 20, b"ts");

        let mut ctx = context(&dir);
        ctx.delete_nth_segment_back = Some(5);
        let a = Arc::new(RecordingBackend::default());
        let b = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(ctx, vec![target("a", a.clone()), target("b", b.clone())]);

        worker.process(&ship(1, 20, false)).await.unwrap();

        assert_eq!(a.deletes(), vec!["live_ep_128k-00015.ts"]);
        assert_eq!(b.deletes(), vec!["live_ep_128k-00015.ts"]);
    }

    #[tokio::test]
    async fn test_no_retention_without_depth() {
        let dir = tempdir().unwrap();
        write_segment(&dir, 20, b"ts");

        let a = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(context(&dir), vec![target("a", a.clone())]);

        worker.process(&ship(1, 20, false)).await.unwrap();
        assert!(a.deletes().is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_abandons_command() {
        let dir = tempdir().unwrap();
        let a = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(context(&dir), vec![target("a", a.clone())]);

        let err = worker.process(&ship(1, 9, false)).await.unwrap_err();
        assert!(matches!(err, WorkerError::SourceRead { .. }));
        assert!(a.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_master_playlist_per_backend() {
        let dir = tempdir().unwrap();
        let a = Arc::new(RecordingBackend::default());
        let b = Arc::new(RecordingBackend::default());
        let worker = TransferWorker::new(
            context(&dir),
            vec![target("a", a.clone()), target("b", b.clone())],
        );

        worker
            .process(&Command::BuildMultiVariantIndex)
            .await
            .unwrap();

        assert_eq!(
            a.upload("index_multi.m3u8").unwrap(),
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=512000\n\
             http://a.example.com/idx/index_ep_512k.m3u8\n\
             #EXT-X-STREAM-INF:PROGRAM-ID=1,BANDWIDTH=128000\n\
             http://a.example.com/idx/index_ep_128k.m3u8\n"
        );
        assert!(b
            .upload("index_multi.m3u8")
            .unwrap()
            .contains("http://b.example.com/idx/index_ep_512k.m3u8"));
    }

    #[tokio::test]
    async fn test_quit_processed_after_queued_commands() {
        let dir = tempdir().unwrap();
        for index in 1..=4 {
            write_segment(&dir, index, format!("segment {}", index).as_bytes());
        }

        let a = Arc::new(RecordingBackend::default());
        let handle = TransferWorker::new(context(&dir), vec![target("a", a.clone())]).spawn();

        for index in 1..=4 {
            assert!(handle.push(ship(1, index, false)));
        }
        handle.shutdown().await.unwrap();

        let segments: Vec<String> = a
            .upload_names()
            .into_iter()
            .filter(|n| n.ends_with(".ts"))
            .collect();
        assert_eq!(
            segments,
            vec![
                "live_ep_128k-00001.ts",
                "live_ep_128k-00002.ts",
                "live_ep_128k-00003.ts",
                "live_ep_128k-00004.ts",
            ]
        );
    }

    #[tokio::test]
    async fn test_loop_survives_failed_command() {
        let dir = tempdir().unwrap();
        write_segment(&dir, 2, b"ts");

        let a = Arc::new(RecordingBackend::default());
        let handle = TransferWorker::new(context(&dir), vec![target("a", a.clone())]).spawn();

        // Segment 1 was never written: the command fails, the next one still runs.
        handle.push(ship(1, 1, false));
        handle.push(ship(1, 2, false));
        handle.push(Command::BuildMultiVariantIndex);
        handle.shutdown().await.unwrap();

        assert_eq!(
            a.upload_names(),
            vec!["live_ep_128k-00002.ts", "index_ep_128k.m3u8", "index_multi.m3u8"]
        );
    }

    #[tokio::test]
    async fn test_worker_stops_when_senders_dropped() {
        let dir = tempdir().unwrap();
        let a = Arc::new(RecordingBackend::default());
        let handle = TransferWorker::new(context(&dir), vec![target("a", a.clone())]).spawn();

        handle.push(Command::BuildMultiVariantIndex);
        handle.join().await.unwrap();

        assert_eq!(a.upload_names(), vec!["index_multi.m3u8"]);
    }
}
