use anyhow::Result;
use std::path::{Path, PathBuf};
use std::process::Command;

use mashup_core::config::Config;
use mashup_core::error::ConfigError;
use mashup_deliver::SmtpSettings;

pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = Config::load(config_path)?;

    println!("mashup dependency check\n");

    let mut all_ok = true;

    all_ok &= check_tool(
        "yt-dlp",
        config.yt_dlp_path(),
        &["--version"],
        |out| out.trim().to_string(),
        "pip install yt-dlp",
    );

    all_ok &= check_tool(
        "ffmpeg",
        config.ffmpeg_path(),
        &["-version"],
        first_line_version,
        "apt install ffmpeg (or brew install ffmpeg)",
    );

    all_ok &= check_tool(
        "ffprobe",
        config.ffprobe_path(),
        &["-version"],
        first_line_version,
        "installed alongside ffmpeg",
    );

    // SMTP only matters for `mashup serve`
    print!("smtp:          ");
    match SmtpSettings::from_config(&config.smtp) {
        Ok(settings) => println!("OK ({}:{})", settings.host, settings.port),
        Err(e) => {
            println!("NOT CONFIGURED");
            println!("               {} (needed by `mashup serve` only)", e);
        }
    }

    println!();
    if all_ok {
        println!("All dependencies OK!");
    } else {
        println!("Some dependencies are missing. See above for installation instructions.");
    }

    Ok(())
}

fn check_tool(
    name: &str,
    path: Result<PathBuf, ConfigError>,
    version_args: &[&str],
    parse_version: fn(&str) -> String,
    install_hint: &str,
) -> bool {
    print!("{:<15}", format!("{}:", name));
    match path {
        Ok(path) => match Command::new(&path).args(version_args).output() {
            Ok(out) if out.status.success() => {
                println!("OK ({})", parse_version(&String::from_utf8_lossy(&out.stdout)));
                true
            }
            _ => {
                println!("FOUND at {} but failed to get version", path.display());
                false
            }
        },
        Err(_) => {
            println!("NOT FOUND");
            println!("               Install with: {}", install_hint);
            false
        }
    }
}

/// "ffmpeg version 6.1.1 Copyright ..." -> "6.1.1"
fn first_line_version(output: &str) -> String {
    output
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(2))
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line_version() {
        assert_eq!(
            first_line_version("ffprobe version 6.1.1-3ubuntu5 Copyright (c) 2007-2023\nbuilt with gcc"),
            "6.1.1-3ubuntu5"
        );
        assert_eq!(first_line_version(""), "unknown");
    }
}
