//! Microphone capture and speaker playback
//!
//! [`AlsaDevice`] shells out to the standard ALSA tools (`arecord`, `aplay`)
//! and falls back to PulseAudio's `paplay` for playback.

use crate::error::ModalityError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;

/// Sample rate expected by the speech recognizer
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Records and plays 16 kHz mono 16-bit PCM WAV audio
#[async_trait]
pub trait AudioDevice: Send {
    /// Record one utterance and return it as WAV bytes
    async fn record(&mut self) -> Result<Vec<u8>, ModalityError>;

    /// Play WAV bytes through the speaker, returning once playback ends
    async fn play(&mut self, wav: &[u8]) -> Result<(), ModalityError>;
}

pub struct AlsaDevice {
    mic_device: String,
    speaker_device: String,
    record_secs: u64,
    work_dir: PathBuf,
}

impl AlsaDevice {
    pub fn new(mic_device: impl Into<String>, speaker_device: impl Into<String>, record_secs: u64) -> Self {
        let work_dir = dirs::cache_dir()
            .map(|d| d.join("consolegpt").join("audio"))
            .unwrap_or_else(|| std::env::temp_dir().join("consolegpt_audio"));

        Self {
            mic_device: mic_device.into(),
            speaker_device: speaker_device.into(),
            record_secs: record_secs.max(1),
            work_dir,
        }
    }

    /// Directory for temporary recordings and synthesized speech
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_dir = dir.into();
        self
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn record_args(&self, path: &Path) -> Vec<String> {
        vec![
            "-q".to_string(),
            "-D".to_string(),
            self.mic_device.clone(),
            "-f".to_string(),
            "S16_LE".to_string(),
            "-r".to_string(),
            SAMPLE_RATE_HZ.to_string(),
            "-c".to_string(),
            "1".to_string(),
            "-d".to_string(),
            self.record_secs.to_string(),
            path.display().to_string(),
        ]
    }

    async fn ensure_work_dir(&self) -> Result<(), ModalityError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        Ok(())
    }
}

async fn run_tool(program: &str, args: &[String]) -> Result<Output, ModalityError> {
    Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| ModalityError::Device {
            message: format!("failed to run {}: {}", program, e),
        })
}

#[async_trait]
impl AudioDevice for AlsaDevice {
    async fn record(&mut self) -> Result<Vec<u8>, ModalityError> {
        self.ensure_work_dir().await?;
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
        let path = self.work_dir.join(format!("recording_{}.wav", timestamp));

        crate::debug_log!("Recording {}s from {}", self.record_secs, self.mic_device);
        let output = run_tool("arecord", &self.record_args(&path)).await?;
        if !output.status.success() {
            return Err(ModalityError::Device {
                message: format!(
                    "audio recording failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let wav = tokio::fs::read(&path).await?;
        let _ = tokio::fs::remove_file(&path).await;
        Ok(wav)
    }

    async fn play(&mut self, wav: &[u8]) -> Result<(), ModalityError> {
        self.ensure_work_dir().await?;
        let path = self.work_dir.join("speech.wav");
        tokio::fs::write(&path, wav).await?;
        let file = path.display().to_string();

        let played = run_tool(
            "aplay",
            &["-q".to_string(), "-D".to_string(), self.speaker_device.clone(), file.clone()],
        )
        .await;

        match played {
            Ok(output) if output.status.success() => Ok(()),
            first => {
                let fallback = run_tool("paplay", &[file]).await?;
                if fallback.status.success() {
                    return Ok(());
                }
                let reason = match first {
                    Ok(output) => String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    Err(e) => e.to_string(),
                };
                Err(ModalityError::Device {
                    message: format!("audio playback failed. Tried aplay and paplay: {}", reason),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_args_request_16khz_mono() {
        let device = AlsaDevice::new("plughw:1,0", "default", 4).with_work_dir("/tmp/x");
        let args = device.record_args(Path::new("/tmp/x/rec.wav"));
        assert_eq!(
            args,
            vec!["-q", "-D", "plughw:1,0", "-f", "S16_LE", "-r", "16000", "-c", "1", "-d", "4", "/tmp/x/rec.wav"]
        );
    }

    #[test]
    fn test_record_secs_has_floor() {
        let device = AlsaDevice::new("default", "default", 0);
        assert_eq!(device.record_secs, 1);
    }

    #[tokio::test]
    async fn test_missing_tool_is_device_error() {
        let result = run_tool("consolegpt-no-such-audio-tool", &[]).await;
        assert!(matches!(result, Err(ModalityError::Device { .. })));
    }
}
