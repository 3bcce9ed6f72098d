use tubelink::{ResolutionResult, Track};

use crate::OutputFormat;

pub fn print_result(result: &ResolutionResult, format: OutputFormat) {
    if format == OutputFormat::Json {
        println!("{}", pretty(&result.to_json()));
        return;
    }

    if let Some(playlist) = &result.playlist {
        println!("📃 {} ({} tracks)", playlist.title, playlist.tracks.len());
        if !playlist.author.name.is_empty() {
            println!("   by {}", playlist.author.name);
        }
        println!("   {}", playlist.url);
        println!();
    }

    for (i, track) in result.tracks.iter().enumerate() {
        println!("{:>3}. {}", i + 1, track_line(track));
    }
}

pub fn print_track(track: &Track, format: OutputFormat) {
    match format {
        OutputFormat::Json => println!("{}", pretty(&track.to_json())),
        OutputFormat::Text => println!("{}", track_line(track)),
    }
}

fn track_line(track: &Track) -> String {
    let duration = if track.is_live {
        "LIVE".to_string()
    } else {
        track.duration_text.clone()
    };
    format!("{} - {} [{}] {}", track.author, track.title, duration, track.url)
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
