//! `yt-dlp` helpers shared by the video adapters (YouTube, Bilibili).
//!
//! yt-dlp already implements every video site's moving-target logic, so we
//! shell out to it instead of scraping: one bounded call for metadata, one
//! best-effort call for captions (VTT, normalized to plain text).

use crate::shellout;
use reachpipe_core::{Error, Result};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

pub const METADATA_TIMEOUT: Duration = Duration::from_secs(30);
pub const CAPTIONS_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_METADATA_CHARS: usize = 2_000_000;
const MAX_TRANSCRIPT_CHARS: usize = 200_000;

#[derive(Debug, Clone)]
pub struct VideoInfo {
    pub title: String,
    pub uploader: Option<String>,
    pub upload_date: Option<String>,
    pub description: String,
}

fn subtitle_langs() -> String {
    shellout::env("REACHPIPE_SUBTITLE_LANGS").unwrap_or_else(|| "en,en-US,zh-CN".to_string())
}

/// `yt-dlp -J <url>`: single-video metadata as JSON.
pub fn fetch_metadata(url: &str, proxy: Option<&str>) -> Result<VideoInfo> {
    let mut args: Vec<&str> = vec!["-J", "--no-warnings", "--skip-download"];
    if let Some(p) = proxy {
        args.push("--proxy");
        args.push(p);
    }
    args.push(url);

    let out = shellout::run_text("yt-dlp", &args, METADATA_TIMEOUT, MAX_METADATA_CHARS)
        .map_err(|code| Error::Tool(format!("yt-dlp metadata failed: {code}")))?;
    let v: serde_json::Value =
        serde_json::from_str(&out).map_err(|e| Error::Tool(format!("yt-dlp bad json: {e}")))?;

    let title = v
        .get("title")
        .and_then(|t| t.as_str())
        .unwrap_or(url)
        .to_string();
    Ok(VideoInfo {
        title,
        uploader: v
            .get("uploader")
            .and_then(|t| t.as_str())
            .map(|s| s.to_string()),
        upload_date: v
            .get("upload_date")
            .and_then(|t| t.as_str())
            .map(format_upload_date),
        description: v
            .get("description")
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .to_string(),
    })
}

// yt-dlp dates are YYYYMMDD; keep ISO-ish.
fn format_upload_date(raw: &str) -> String {
    if raw.len() == 8 && raw.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &raw[0..4], &raw[4..6], &raw[6..8])
    } else {
        raw.to_string()
    }
}

/// Request human and auto captions as VTT into a scratch dir, then
/// normalize the first file found to plain text.
pub fn fetch_transcript(url: &str, proxy: Option<&str>, timeout: Duration) -> Result<String> {
    let tmpdir = tempfile::tempdir().map_err(|e| Error::Tool(format!("tempdir failed: {e}")))?;
    let out_tmpl = tmpdir.path().join("%(id)s.%(ext)s");
    let langs = subtitle_langs();

    let mut cmd = Command::new("yt-dlp");
    cmd.arg("--skip-download")
        .arg("--write-sub")
        .arg("--write-auto-sub")
        .arg("--sub-lang")
        .arg(&langs)
        .arg("--sub-format")
        .arg("vtt")
        .arg("-o")
        .arg(out_tmpl.as_os_str())
        .arg("--no-warnings");
    if let Some(p) = proxy {
        cmd.arg("--proxy").arg(p);
    }
    cmd.arg(url);

    shellout::run_stdout_bounded(cmd, timeout, 64 * 1024)
        .map_err(|code| Error::Tool(format!("yt-dlp captions failed: {code}")))?;

    let mut vtt_path: Option<PathBuf> = None;
    if let Ok(rd) = std::fs::read_dir(tmpdir.path()) {
        for ent in rd.flatten() {
            let p = ent.path();
            if p.extension().and_then(|s| s.to_str()) == Some("vtt") {
                vtt_path = Some(p);
                break;
            }
        }
    }
    let Some(p) = vtt_path else {
        return Err(Error::Tool("no captions found".to_string()));
    };
    let vtt = std::fs::read_to_string(&p).map_err(|e| Error::Tool(format!("caption read failed: {e}")))?;
    Ok(vtt_to_text(&vtt, MAX_TRANSCRIPT_CHARS))
}

/// Deterministic VTT → text: drop the header, timing lines, and numeric cue
/// ids; keep cue text with paragraph breaks between cues.
pub fn vtt_to_text(vtt: &str, max_chars: usize) -> String {
    let mut out = String::new();
    let mut prev_blank = true;
    for line in vtt.lines() {
        let l = line.trim();
        if l.is_empty() {
            if !prev_blank {
                out.push_str("\n\n");
                prev_blank = true;
            }
            continue;
        }
        if l.eq_ignore_ascii_case("webvtt") || l.contains("-->") {
            prev_blank = false;
            continue;
        }
        if l.chars().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !prev_blank {
            out.push(' ');
        }
        out.push_str(&l.split_whitespace().collect::<Vec<_>>().join(" "));
        prev_blank = false;
        if out.chars().count() >= max_chars {
            break;
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vtt_to_text_drops_timings_and_ids() {
        let vtt = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nHello   world\n\n2\n00:00:01.000 --> 00:00:02.000\nSecond line\n";
        let t = vtt_to_text(vtt, 10_000);
        assert!(t.contains("Hello world"));
        assert!(t.contains("Second line"));
        assert!(!t.contains("-->"));
        assert!(!t.contains("WEBVTT"));
    }

    #[test]
    fn upload_dates_become_iso_ish() {
        assert_eq!(format_upload_date("20260114"), "2026-01-14");
        assert_eq!(format_upload_date("last week"), "last week");
    }

    #[test]
    fn missing_ytdlp_is_a_tool_error() {
        if !shellout::has("yt-dlp") {
            let err = fetch_metadata("https://example.com/v", None).unwrap_err();
            assert!(matches!(err, Error::Tool(_)));
        }
    }
}
