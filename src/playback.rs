use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::watch;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::playlist::PlaylistTrack;

/// Narration capability, outside this system's control. Implementations can
/// be unsupported, can error and can hang; the engine treats all three as
/// non-fatal.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Speaks the text, resolving when done or on error.
    async fn speak(&self, text: &str) -> std::result::Result<(), String>;
    fn pause(&self);
    fn resume(&self);
    fn cancel(&self);
}

/// How a playing preview came to an end.
#[derive(Debug)]
pub enum MediaEnd {
    /// Natural end of media.
    Ended,
    /// Media failure mid-track.
    Failed(String),
}

/// Audio output for preview clips.
#[async_trait]
pub trait AudioSink: Send + Sync {
    async fn load(&self, url: &str) -> std::result::Result<(), String>;
    fn play(&self) -> std::result::Result<(), String>;
    fn pause(&self);
    fn resume(&self);
    /// Halts playback and resets the position to the start.
    fn stop(&self);
    fn set_volume(&self, volume: f32);
    /// Resolves when the currently playing media ends or fails.
    async fn wait_ended(&self) -> MediaEnd;
}

/// Playback phase of the countdown session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Idle,
    Intro,
    TrackPlaying,
    DemoInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaybackStatus {
    pub phase: Phase,
    pub paused: bool,
    /// Index into the playlist in playback order.
    pub current: Option<usize>,
}

pub struct PlaybackSettings {
    pub target_volume: f32,
    pub fade_in: Duration,
    pub fade_out: Duration,
    pub resume_fade_in: Duration,
    pub fade_steps: u32,
    /// When the fade-out starts, measured from the start of the preview.
    /// Chosen so the fade completes just before the 30 second clip ends.
    pub fade_out_at: Duration,
    /// Dwell time on a track without a preview before advancing.
    pub demo_dwell: Duration,
    pub advance_delay: Duration,
    pub error_skip_delay: Duration,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            target_volume: 0.7,
            fade_in: Duration::from_millis(1500),
            fade_out: Duration::from_millis(1500),
            resume_fade_in: Duration::from_millis(500),
            fade_steps: 20,
            fade_out_at: Duration::from_secs(27),
            demo_dwell: Duration::from_secs(3),
            advance_delay: Duration::from_millis(500),
            error_skip_delay: Duration::from_secs(1),
        }
    }
}

enum PreviewOutcome {
    Completed,
    Failed,
    Cancelled,
}

struct EngineState {
    playlist: Arc<Vec<PlaylistTrack>>,
    current: Option<usize>,
    phase: Phase,
    paused: bool,
    session: Option<Uuid>,
}

/// Drives a countdown session: narrates each track, then plays its preview
/// with volume fades, honoring pause/resume/stop.
///
/// Every timer task snapshots the session generation when scheduled and
/// checks it again before acting, so `stop` (which bumps the generation)
/// turns stale callbacks into no-ops instead of letting them resurrect a
/// finished session.
pub struct PlaybackEngine {
    narrator: Arc<dyn Narrator>,
    sink: Arc<dyn AudioSink>,
    settings: PlaybackSettings,
    state: Mutex<EngineState>,
    // Self-handle for spawning timer tasks from &self methods.
    weak: Weak<PlaybackEngine>,
    generation: watch::Sender<u64>,
    // Bumped whenever pending fade timers must die: on pause, stop, natural
    // end of media and at the start of each preview.
    fade_epoch: AtomicU64,
}

impl PlaybackEngine {
    pub fn new(narrator: Arc<dyn Narrator>, sink: Arc<dyn AudioSink>) -> Arc<Self> {
        Self::with_settings(narrator, sink, PlaybackSettings::default())
    }

    pub fn with_settings(
        narrator: Arc<dyn Narrator>,
        sink: Arc<dyn AudioSink>,
        settings: PlaybackSettings,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            narrator,
            sink,
            settings,
            state: Mutex::new(EngineState {
                playlist: Arc::new(Vec::new()),
                current: None,
                phase: Phase::Idle,
                paused: false,
                session: None,
            }),
            weak: weak.clone(),
            generation: watch::Sender::new(0),
            fade_epoch: AtomicU64::new(0),
        })
    }

    /// Begins a new countdown session at the first playlist entry.
    /// Any previous session is invalidated first.
    pub fn start(&self, playlist: Arc<Vec<PlaylistTrack>>) -> Result<Uuid> {
        if playlist.is_empty() {
            return Err(Error::EmptyPlaylist);
        }

        self.generation.send_modify(|g| *g += 1);
        self.fade_epoch.fetch_add(1, Ordering::SeqCst);
        self.narrator.cancel();
        self.sink.stop();

        let generation = *self.generation.borrow();
        let session = Uuid::new_v4();
        let track_count = playlist.len();
        {
            let mut state = self.state.lock().unwrap();
            state.playlist = playlist;
            state.current = Some(0);
            state.phase = Phase::Intro;
            state.paused = false;
            state.session = Some(session);
        }

        info!("Playback session {} started ({} tracks)", session, track_count);
        if let Some(engine) = self.weak.upgrade() {
            tokio::spawn(engine.run(generation));
        }
        Ok(session)
    }

    /// Pauses narration or audio. No-op while showing demo info or idle.
    pub fn pause(&self) {
        let mut state = self.state.lock().unwrap();
        if state.paused {
            return;
        }
        match state.phase {
            Phase::Intro => {
                state.paused = true;
                self.narrator.pause();
            }
            Phase::TrackPlaying => {
                state.paused = true;
                // Any in-flight fade and the scheduled fade-out die here.
                self.fade_epoch.fetch_add(1, Ordering::SeqCst);
                self.sink.pause();
            }
            Phase::DemoInfo | Phase::Idle => {}
        }
    }

    /// Resumes a paused session. Resuming audio re-triggers a short fade-in.
    pub fn resume(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.paused {
            return;
        }
        state.paused = false;
        match state.phase {
            Phase::Intro => self.narrator.resume(),
            Phase::TrackPlaying => {
                self.sink.resume();
                let generation = *self.generation.borrow();
                let epoch = self.fade_epoch.fetch_add(1, Ordering::SeqCst) + 1;
                self.spawn_fade(
                    generation,
                    epoch,
                    self.settings.resume_fade_in,
                    0.0,
                    self.settings.target_volume,
                );
            }
            Phase::DemoInfo | Phase::Idle => {}
        }
    }

    /// Tears down the session: cancels every pending timer and narration,
    /// resets the audio position and volume, returns to idle.
    pub fn stop(&self) {
        self.generation.send_modify(|g| *g += 1);
        self.fade_epoch.fetch_add(1, Ordering::SeqCst);
        self.narrator.cancel();
        self.sink.stop();
        self.sink.set_volume(self.settings.target_volume);

        let mut state = self.state.lock().unwrap();
        if let Some(session) = state.session.take() {
            info!("Playback session {} stopped", session);
        }
        state.phase = Phase::Idle;
        state.current = None;
        state.paused = false;
    }

    pub fn status(&self) -> PlaybackStatus {
        let state = self.state.lock().unwrap();
        PlaybackStatus {
            phase: state.phase,
            paused: state.paused,
            current: state.current,
        }
    }

    pub fn current_track(&self) -> Option<PlaylistTrack> {
        let state = self.state.lock().unwrap();
        state
            .current
            .and_then(|index| state.playlist.get(index).cloned())
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().phase != Phase::Idle
    }

    fn cancelled(&self, generation: u64) -> bool {
        *self.generation.borrow() != generation
    }

    fn fade_cancelled(&self, generation: u64, epoch: u64) -> bool {
        self.cancelled(generation) || self.fade_epoch.load(Ordering::SeqCst) != epoch
    }

    async fn run(self: Arc<Self>, generation: u64) {
        let playlist = self.state.lock().unwrap().playlist.clone();

        let mut index = 0;
        while index < playlist.len() {
            if self.cancelled(generation) {
                return;
            }
            let track = &playlist[index];
            {
                let mut state = self.state.lock().unwrap();
                state.current = Some(index);
                state.phase = Phase::Intro;
            }

            self.narrate(track).await;
            if self.cancelled(generation) {
                return;
            }

            match track.preview_url.as_deref() {
                None => {
                    debug!("No preview available for this track (demo mode)");
                    self.state.lock().unwrap().phase = Phase::DemoInfo;
                    tokio::time::sleep(self.settings.demo_dwell).await;
                }
                Some(url) => match self.play_preview(generation, url).await {
                    PreviewOutcome::Completed => {
                        tokio::time::sleep(self.settings.advance_delay).await;
                    }
                    PreviewOutcome::Failed => {
                        tokio::time::sleep(self.settings.error_skip_delay).await;
                    }
                    PreviewOutcome::Cancelled => return,
                },
            }

            if self.cancelled(generation) {
                return;
            }
            index += 1;
        }

        let mut state = self.state.lock().unwrap();
        if !self.cancelled(generation) {
            if let Some(session) = state.session.take() {
                info!("Playback session {} finished", session);
            }
            state.phase = Phase::Idle;
            state.current = None;
            state.paused = false;
        }
    }

    /// Narration is best-effort: failures and timeouts are logged and
    /// swallowed so playback continues audibly either way.
    async fn narrate(&self, track: &PlaylistTrack) {
        let text = format!(
            "Number {}: {} by {}",
            track.position, track.title, track.artist
        );
        debug!("Narrating: {}", text);

        let budget = narration_budget(&text);
        match tokio::time::timeout(budget, self.narrator.speak(&text)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Narration failed (continuing anyway): {}", e),
            Err(_) => {
                warn!("Narration timed out (continuing anyway)");
                self.narrator.cancel();
            }
        }
    }

    async fn play_preview(&self, generation: u64, url: &str) -> PreviewOutcome {
        self.state.lock().unwrap().phase = Phase::TrackPlaying;
        debug!("Playing track preview: {}", url);

        if let Err(e) = self.sink.load(url).await {
            warn!("Preview failed to load: {}", e);
            return PreviewOutcome::Failed;
        }
        if self.cancelled(generation) {
            return PreviewOutcome::Cancelled;
        }

        self.sink.set_volume(0.0);
        if let Err(e) = self.sink.play() {
            warn!("Preview failed to start: {}", e);
            return PreviewOutcome::Failed;
        }

        let epoch = self.fade_epoch.fetch_add(1, Ordering::SeqCst) + 1;
        self.spawn_fade(
            generation,
            epoch,
            self.settings.fade_in,
            0.0,
            self.settings.target_volume,
        );
        self.spawn_fade_out_timer(generation, epoch);

        let mut generation_rx = self.generation.subscribe();
        tokio::select! {
            end = self.sink.wait_ended() => {
                // Clear pending fade timers before advancing.
                self.fade_epoch.fetch_add(1, Ordering::SeqCst);
                match end {
                    MediaEnd::Ended => {
                        debug!("Preview ended naturally");
                        PreviewOutcome::Completed
                    }
                    MediaEnd::Failed(e) => {
                        warn!("Playback error mid-track (skipping): {}", e);
                        PreviewOutcome::Failed
                    }
                }
            }
            _ = generation_rx.wait_for(|g| *g != generation) => PreviewOutcome::Cancelled,
        }
    }

    /// Steps the volume linearly on a timer; a stepped approximation rather
    /// than a continuous curve.
    fn spawn_fade(&self, generation: u64, epoch: u64, duration: Duration, from: f32, to: f32) {
        let Some(engine) = self.weak.upgrade() else {
            return;
        };
        let steps = self.settings.fade_steps.max(1);
        let step_duration = duration / steps;

        tokio::spawn(async move {
            for step in 1..=steps {
                tokio::time::sleep(step_duration).await;
                if engine.fade_cancelled(generation, epoch) {
                    return;
                }
                engine.sink.set_volume(fade_volume(from, to, step, steps));
            }
        });
    }

    fn spawn_fade_out_timer(&self, generation: u64, epoch: u64) {
        let Some(engine) = self.weak.upgrade() else {
            return;
        };

        tokio::spawn(async move {
            tokio::time::sleep(engine.settings.fade_out_at).await;
            if engine.fade_cancelled(generation, epoch) {
                return;
            }
            if engine.state.lock().unwrap().paused {
                return;
            }
            debug!("Starting fade out");
            engine.spawn_fade(
                generation,
                epoch,
                engine.settings.fade_out,
                engine.settings.target_volume,
                0.0,
            );
        });
    }
}

fn fade_volume(from: f32, to: f32, step: u32, steps: u32) -> f32 {
    from + (to - from) * (step as f32 / steps as f32)
}

/// Safety timeout for narration, so a silent or hanging voice never stalls
/// the session: 100 ms per character with a 4 second floor.
fn narration_budget(text: &str) -> Duration {
    Duration::from_millis((text.chars().count() as u64 * 100).max(4000))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::TrackSource;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    struct TestNarrator {
        spoken: Mutex<Vec<String>>,
        cancels: AtomicUsize,
        fail: bool,
    }

    impl TestNarrator {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                spoken: Mutex::new(Vec::new()),
                cancels: AtomicUsize::new(0),
                fail,
            })
        }
    }

    #[async_trait]
    impl Narrator for TestNarrator {
        async fn speak(&self, text: &str) -> std::result::Result<(), String> {
            self.spoken.lock().unwrap().push(text.to_string());
            if self.fail {
                Err("speech synthesis not supported".to_string())
            } else {
                Ok(())
            }
        }

        fn pause(&self) {}
        fn resume(&self) {}
        fn cancel(&self) {
            self.cancels.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct TestSink {
        volumes: Mutex<Vec<f32>>,
        loads: Mutex<Vec<String>>,
        pauses: AtomicUsize,
        resumes: AtomicUsize,
        stops: AtomicUsize,
        fail_play: bool,
        ends: tokio::sync::Mutex<mpsc::UnboundedReceiver<MediaEnd>>,
    }

    impl TestSink {
        fn new(fail_play: bool) -> (Arc<Self>, mpsc::UnboundedSender<MediaEnd>) {
            let (tx, rx) = mpsc::unbounded_channel();
            let sink = Arc::new(Self {
                volumes: Mutex::new(Vec::new()),
                loads: Mutex::new(Vec::new()),
                pauses: AtomicUsize::new(0),
                resumes: AtomicUsize::new(0),
                stops: AtomicUsize::new(0),
                fail_play,
                ends: tokio::sync::Mutex::new(rx),
            });
            (sink, tx)
        }

        fn volume_count(&self) -> usize {
            self.volumes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AudioSink for TestSink {
        async fn load(&self, url: &str) -> std::result::Result<(), String> {
            self.loads.lock().unwrap().push(url.to_string());
            Ok(())
        }

        fn play(&self) -> std::result::Result<(), String> {
            if self.fail_play {
                Err("media failure".to_string())
            } else {
                Ok(())
            }
        }

        fn pause(&self) {
            self.pauses.fetch_add(1, Ordering::SeqCst);
        }

        fn resume(&self) {
            self.resumes.fetch_add(1, Ordering::SeqCst);
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn set_volume(&self, volume: f32) {
            self.volumes.lock().unwrap().push(volume);
        }

        async fn wait_ended(&self) -> MediaEnd {
            match self.ends.lock().await.recv().await {
                Some(end) => end,
                None => std::future::pending().await,
            }
        }
    }

    fn track(position: usize, title: &str, preview: Option<&str>) -> PlaylistTrack {
        PlaylistTrack {
            position,
            title: title.to_string(),
            artist: "Artist".to_string(),
            album: None,
            cover_url: "cover.jpg".to_string(),
            preview_url: preview.map(str::to_string),
            external_link: None,
            playcount: 1,
            source: if preview.is_some() {
                TrackSource::Resolved
            } else {
                TrackSource::MetadataOnly
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn session_walks_playlist_and_finishes_idle() {
        let narrator = TestNarrator::new(false);
        let (sink, ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator.clone(), sink.clone());

        // Countdown order: position 3 first, position 1 last; the middle
        // entry has no preview and passes through demo info.
        let playlist = Arc::new(vec![
            track(3, "Third", Some("https://cdn.example/3.mp3")),
            track(2, "Second", None),
            track(1, "First", Some("https://cdn.example/1.mp3")),
        ]);
        ends.send(MediaEnd::Ended).unwrap();
        ends.send(MediaEnd::Ended).unwrap();

        engine.start(playlist).unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        let spoken = narrator.spoken.lock().unwrap().clone();
        assert_eq!(
            spoken,
            vec![
                "Number 3: Third by Artist".to_string(),
                "Number 2: Second by Artist".to_string(),
                "Number 1: First by Artist".to_string(),
            ]
        );
        let loads = sink.loads.lock().unwrap().clone();
        assert_eq!(
            loads,
            vec![
                "https://cdn.example/3.mp3".to_string(),
                "https://cdn.example/1.mp3".to_string(),
            ]
        );

        let status = engine.status();
        assert_eq!(status.phase, Phase::Idle);
        assert_eq!(status.current, None);
        assert!(!engine.is_playing());
    }

    #[tokio::test(start_paused = true)]
    async fn empty_playlist_is_rejected() {
        let narrator = TestNarrator::new(false);
        let (sink, _ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator, sink);

        let result = engine.start(Arc::new(Vec::new()));
        assert!(matches!(result, Err(Error::EmptyPlaylist)));
        assert_eq!(engine.status().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn narration_failure_does_not_stall_playback() {
        let narrator = TestNarrator::new(true);
        let (sink, ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator.clone(), sink.clone());

        ends.send(MediaEnd::Ended).unwrap();
        engine
            .start(Arc::new(vec![track(1, "Only", Some("https://cdn.example/1.mp3"))]))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(sink.loads.lock().unwrap().len(), 1);
        assert_eq!(engine.status().phase, Phase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn fade_in_steps_toward_target_volume() {
        let narrator = TestNarrator::new(false);
        let (sink, _ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator, sink.clone());

        engine
            .start(Arc::new(vec![track(1, "Only", Some("https://cdn.example/1.mp3"))]))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        let volumes = sink.volumes.lock().unwrap().clone();
        assert_eq!(volumes[0], 0.0);
        assert!(volumes.len() >= 21, "expected all fade steps, got {:?}", volumes);
        assert!((volumes.last().unwrap() - 0.7).abs() < 1e-6);
        assert!(volumes.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_scheduled_fade_out() {
        let narrator = TestNarrator::new(false);
        let (sink, _ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator, sink.clone());

        engine
            .start(Arc::new(vec![track(1, "Only", Some("https://cdn.example/1.mp3"))]))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        engine.stop();
        assert_eq!(engine.status().phase, Phase::Idle);
        assert!(sink.stops.load(Ordering::SeqCst) >= 1);

        // Past the scheduled fade-out time: the stale timer must stay dead.
        let baseline = sink.volume_count();
        tokio::time::sleep(Duration::from_secs(40)).await;
        assert_eq!(sink.volume_count(), baseline);
    }

    #[tokio::test(start_paused = true)]
    async fn new_session_after_stop_gets_no_stale_callbacks() {
        let narrator = TestNarrator::new(false);
        let (sink, _ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator, sink.clone());

        let playlist = Arc::new(vec![track(1, "Only", Some("https://cdn.example/1.mp3"))]);
        let first = engine.start(playlist.clone()).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        engine.stop();
        tokio::time::sleep(Duration::from_secs(40)).await;

        let second = engine.start(playlist).unwrap();
        assert_ne!(first, second);
        tokio::time::sleep(Duration::from_secs(5)).await;

        // Fade-in of the new session completed and nothing zeroed it out.
        let volumes = sink.volumes.lock().unwrap().clone();
        assert!((volumes.last().unwrap() - 0.7).abs() < 1e-6);
        assert_eq!(engine.status().phase, Phase::TrackPlaying);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_cancels_fades_and_resume_fades_back_in() {
        let narrator = TestNarrator::new(false);
        let (sink, _ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator, sink.clone());

        engine
            .start(Arc::new(vec![track(1, "Only", Some("https://cdn.example/1.mp3"))]))
            .unwrap();
        // Pause mid fade-in.
        tokio::time::sleep(Duration::from_millis(400)).await;
        engine.pause();
        assert_eq!(sink.pauses.load(Ordering::SeqCst), 1);
        assert!(engine.status().paused);

        let baseline = sink.volume_count();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.volume_count(), baseline, "fade must die on pause");

        engine.resume();
        assert_eq!(sink.resumes.load(Ordering::SeqCst), 1);
        assert!(!engine.status().paused);
        tokio::time::sleep(Duration::from_secs(1)).await;

        let volumes = sink.volumes.lock().unwrap().clone();
        assert!((volumes.last().unwrap() - 0.7).abs() < 1e-6);
    }

    #[tokio::test(start_paused = true)]
    async fn demo_track_advances_after_dwell() {
        let narrator = TestNarrator::new(false);
        let (sink, _ends) = TestSink::new(false);
        let engine = PlaybackEngine::new(narrator.clone(), sink.clone());

        engine
            .start(Arc::new(vec![track(1, "NoClip", None)]))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(engine.status().phase, Phase::DemoInfo);

        // Pause is a no-op while showing demo info.
        engine.pause();
        assert!(!engine.status().paused);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(engine.status().phase, Phase::Idle);
        assert_eq!(narrator.spoken.lock().unwrap().len(), 1);
        assert!(sink.loads.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn media_failure_skips_to_next_track() {
        let narrator = TestNarrator::new(false);
        let (sink, _ends) = TestSink::new(true);
        let engine = PlaybackEngine::new(narrator.clone(), sink.clone());

        engine
            .start(Arc::new(vec![
                track(2, "Broken", Some("https://cdn.example/2.mp3")),
                track(1, "AlsoBroken", Some("https://cdn.example/1.mp3")),
            ]))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(sink.loads.lock().unwrap().len(), 2);
        assert_eq!(narrator.spoken.lock().unwrap().len(), 2);
        assert_eq!(engine.status().phase, Phase::Idle);
    }
}
