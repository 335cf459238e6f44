//! Composition root for the CLI: wires config, devices, services, and the
//! session controller together.

use crate::audio::source::FrameSource;
use crate::cli::Cli;
use crate::config::Config;
use crate::defaults;
use crate::error::Result;
use crate::session::{SessionConfig, SessionController, SessionOptions};
use crate::speaker::SpeakerPolicy;
use crate::stt::service::TranscriptionService;
use crate::transcript::entry::{EntryKind, TranscriptEntry};
use crate::transcript::store::TranscriptStore;
use anyhow::{Context, bail};
use owo_colors::OwoColorize;
use std::io::BufRead;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Runs the default record command until Enter or `--max-duration`.
pub fn run_record(mut config: Config, cli: &Cli) -> anyhow::Result<()> {
    if let Some(device) = &cli.device {
        config.audio.device = Some(device.clone());
    }
    if let Some(language) = &cli.language {
        config.stt.language = language.clone();
    }
    if let Some(workers) = cli.workers {
        config.dispatch.pool_size = workers;
    }
    config.validate()?;

    let options = SessionOptions {
        meeting_title: cli
            .title
            .clone()
            .unwrap_or_else(|| defaults::DEFAULT_MEETING_TITLE.to_string()),
        participants: cli.participants.clone(),
        policy: if cli.diarize {
            SpeakerPolicy::Diarized
        } else {
            SpeakerPolicy::SingleSpeaker
        },
    };

    let source = build_source(&config)?;
    let service = build_stt_service(&config)?;

    let (entry_tx, entry_rx) = crossbeam_channel::unbounded::<TranscriptEntry>();
    let done = Arc::new(AtomicBool::new(false));
    let printer = {
        let done = done.clone();
        let quiet = cli.quiet;
        std::thread::spawn(move || {
            loop {
                match entry_rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(entry) => {
                        if !quiet {
                            print_entry(&entry);
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                        if done.load(Ordering::SeqCst) {
                            break;
                        }
                    }
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                }
            }
        })
    };

    let mut controller = SessionController::new(
        SessionConfig::from_config(&config),
        options.clone(),
        source,
        service,
    )
    .with_entry_sender(entry_tx);

    controller.start().context("failed to start recording")?;
    if !cli.quiet {
        match cli.max_duration {
            Some(duration) => eprintln!(
                "Recording \"{}\" for {} — transcribing as you speak.",
                options.meeting_title,
                humantime::format_duration(duration)
            ),
            None => eprintln!(
                "Recording \"{}\" — press Enter to stop.",
                options.meeting_title
            ),
        }
    }

    wait_for_stop(cli.max_duration);

    let stop_result = controller.stop();
    done.store(true, Ordering::SeqCst);
    let _ = printer.join();
    stop_result.context("recording session failed")?;

    let store = controller.transcript();
    if !cli.quiet {
        print_statistics(&store);
    }

    if let Some(path) = &cli.export {
        let file = std::fs::File::create(path)
            .with_context(|| format!("cannot create {}", path.display()))?;
        store.export_jsonl(std::io::BufWriter::new(file))?;
        if !cli.quiet {
            eprintln!("Transcript exported to {}", path.display());
        }
    }

    if cli.summarize {
        let summary = summarize(&config, &options, &store)?;
        println!("\n{}", "Meeting summary".bold());
        println!("{summary}");
    }

    Ok(())
}

/// Lists capture devices.
pub fn run_devices() -> anyhow::Result<()> {
    #[cfg(feature = "cpal-audio")]
    {
        let devices = crate::audio::capture::list_devices()?;
        if devices.is_empty() {
            eprintln!("No audio input devices found.");
        }
        for device in devices {
            println!("{device}");
        }
        Ok(())
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        bail!("built without the cpal-audio feature; no device support")
    }
}

fn build_source(config: &Config) -> anyhow::Result<Box<dyn FrameSource>> {
    #[cfg(feature = "cpal-audio")]
    {
        let source = crate::audio::capture::CpalFrameSource::new(
            config.audio.device.as_deref(),
            config.audio.sample_rate,
            config.audio.frame_size,
        )?;
        Ok(Box::new(source))
    }
    #[cfg(not(feature = "cpal-audio"))]
    {
        let _ = config;
        bail!("built without the cpal-audio feature; no capture device support")
    }
}

fn build_stt_service(config: &Config) -> anyhow::Result<Arc<dyn TranscriptionService>> {
    #[cfg(feature = "remote")]
    {
        let service = crate::stt::remote::HttpTranscriptionService::new(
            crate::stt::remote::HttpSttConfig {
                endpoint: config.stt.endpoint.clone(),
                api_key: api_key()?,
                model: config.stt.model.clone(),
                timeout: Duration::from_secs(config.stt.request_timeout_secs),
            },
        )?;
        Ok(Arc::new(service))
    }
    #[cfg(not(feature = "remote"))]
    {
        let _ = config;
        bail!("built without the remote feature; no transcription service available")
    }
}

#[cfg(feature = "remote")]
fn summarize(
    config: &Config,
    options: &SessionOptions,
    store: &TranscriptStore,
) -> Result<String> {
    use crate::summary::SummarizationService;

    let summarizer = crate::summary::remote::HttpSummarizer::new(
        crate::summary::remote::HttpSummaryConfig {
            endpoint: config.summary.endpoint.clone(),
            api_key: api_key().map_err(|e| crate::error::MeetscribeError::Summarization {
                message: e.to_string(),
            })?,
            model: config.summary.model.clone(),
            ..Default::default()
        },
    )?;
    summarizer.summarize(
        &store.full_text(),
        &options.meeting_title,
        &options.participants,
    )
}

#[cfg(not(feature = "remote"))]
fn summarize(_: &Config, _: &SessionOptions, _: &TranscriptStore) -> Result<String> {
    Err(crate::error::MeetscribeError::Summarization {
        message: "built without the remote feature".to_string(),
    })
}

#[cfg(feature = "remote")]
fn api_key() -> anyhow::Result<String> {
    if let Ok(key) = std::env::var(defaults::API_KEY_ENV)
        && !key.is_empty()
    {
        return Ok(key);
    }
    if let Ok(key) = std::env::var("OPENAI_API_KEY")
        && !key.is_empty()
    {
        return Ok(key);
    }
    bail!(
        "no API key found — set {} or OPENAI_API_KEY",
        defaults::API_KEY_ENV
    )
}

fn wait_for_stop(max_duration: Option<Duration>) {
    match max_duration {
        Some(duration) => std::thread::sleep(duration),
        None => {
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
        }
    }
}

fn print_entry(entry: &TranscriptEntry) {
    let stamp = format_offset(entry.start_ms);
    match entry.kind {
        EntryKind::Speech => match &entry.speaker {
            Some(speaker) => {
                println!("[{stamp}] {}: {}", speaker.cyan().bold(), entry.text);
            }
            None => println!("[{stamp}] {}", entry.text),
        },
        EntryKind::TranscriptionFailed => {
            println!(
                "[{stamp}] {} {}",
                "transcription failed:".red(),
                entry.text
            );
        }
    }
}

fn print_statistics(store: &TranscriptStore) {
    let profiles = store.speaker_profiles();
    if profiles.is_empty() {
        return;
    }
    eprintln!();
    eprintln!("{}", "Speaker statistics".bold());
    for profile in profiles {
        let label = profile.label.as_deref().unwrap_or("(unattributed)");
        eprintln!(
            "  {:<16} {:>4} utterances  {:>6} words  {:>8}",
            label,
            profile.utterances,
            profile.words,
            format_offset(profile.speaking_ms)
        );
    }
}

fn format_offset(ms: u64) -> String {
    let total_secs = ms / 1000;
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(0), "00:00");
        assert_eq!(format_offset(61_500), "01:01");
        assert_eq!(format_offset(600_000), "10:00");
    }
}
