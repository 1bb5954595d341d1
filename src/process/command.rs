//! Transcoder command construction
//!
//! A [`Transcoder`] turns a [`TranscodeJob`] into a ready-to-spawn command.
//! [`FfmpegTranscoder`] is the production implementation; tests substitute
//! small shell scripts through the same trait.

use std::path::PathBuf;

use tokio::process::Command;

use crate::camera::CameraId;

/// Everything a transcoder needs to produce one camera's HLS output
#[derive(Debug, Clone)]
pub struct TranscodeJob {
    pub camera_id: CameraId,
    /// RTSP source including credentials
    pub source_url: String,
    /// Playlist file written by the transcoder
    pub playlist_path: PathBuf,
    /// printf-style segment file pattern (`camera_7_%03d.ts`)
    pub segment_pattern: PathBuf,
}

/// Builds the process that transcodes a camera to HLS
pub trait Transcoder: Send + Sync + 'static {
    /// Create the command for a job. Stdio is configured by the caller.
    fn command(&self, job: &TranscodeJob) -> Command;
}

/// HLS muxer options for low-latency live output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HlsOptions {
    /// RTSP transport (`tcp` avoids UDP packet loss on busy networks)
    pub rtsp_transport: String,
    pub video_codec: String,
    pub preset: String,
    pub tune: String,
    pub audio_codec: String,
    /// Target segment duration in seconds
    pub segment_seconds: u32,
    /// Number of segments kept in the rolling playlist
    pub list_size: u32,
    pub hls_flags: String,
    /// Maximum demux delay in microseconds
    pub max_delay_us: u64,
    pub buffer_size: String,
}

impl Default for HlsOptions {
    fn default() -> Self {
        Self {
            rtsp_transport: "tcp".to_string(),
            video_codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            tune: "zerolatency".to_string(),
            audio_codec: "aac".to_string(),
            segment_seconds: 2,
            list_size: 4,
            hls_flags: "delete_segments+program_date_time".to_string(),
            max_delay_us: 500_000,
            buffer_size: "4M".to_string(),
        }
    }
}

impl HlsOptions {
    /// Set segment duration
    pub fn segment_seconds(mut self, seconds: u32) -> Self {
        self.segment_seconds = seconds.max(1);
        self
    }

    /// Set rolling window size
    pub fn list_size(mut self, size: u32) -> Self {
        self.list_size = size.max(1);
        self
    }

    /// Copy the source video instead of re-encoding it
    pub fn copy_video(mut self) -> Self {
        self.video_codec = "copy".to_string();
        self
    }
}

/// Transcoder backed by an `ffmpeg` binary
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary: PathBuf,
    options: HlsOptions,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>, options: HlsOptions) -> Self {
        Self {
            binary: binary.into(),
            options,
        }
    }

    /// Path or name of the binary that will be spawned
    pub fn binary(&self) -> &PathBuf {
        &self.binary
    }

    /// Full argument list for a job
    pub fn args(&self, job: &TranscodeJob) -> Vec<String> {
        let o = &self.options;
        let mut args: Vec<String> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "warning".into(),
            "-rtsp_transport".into(),
            o.rtsp_transport.clone(),
            "-i".into(),
            job.source_url.clone(),
            "-c:v".into(),
            o.video_codec.clone(),
        ];

        // Encoder tuning only applies when actually encoding
        if o.video_codec != "copy" {
            args.extend([
                "-preset".into(),
                o.preset.clone(),
                "-tune".into(),
                o.tune.clone(),
            ]);
        }

        args.extend([
            "-c:a".into(),
            o.audio_codec.clone(),
            "-f".into(),
            "hls".into(),
            "-hls_time".into(),
            o.segment_seconds.to_string(),
            "-hls_list_size".into(),
            o.list_size.to_string(),
            "-hls_flags".into(),
            o.hls_flags.clone(),
            "-hls_segment_filename".into(),
            job.segment_pattern.to_string_lossy().into_owned(),
            "-max_delay".into(),
            o.max_delay_us.to_string(),
            "-bufsize".into(),
            o.buffer_size.clone(),
            "-y".into(),
            job.playlist_path.to_string_lossy().into_owned(),
        ]);

        args
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new("ffmpeg", HlsOptions::default())
    }
}

impl Transcoder for FfmpegTranscoder {
    fn command(&self, job: &TranscodeJob) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(self.args(job));
        command
    }
}
