//! Playable-duration estimation for encoded audio.

use std::io::Cursor;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Unrecognized audio stream: {0}")]
    UnsupportedFormat(String),

    #[error("Audio stream has no playable track")]
    NoTrack,

    #[error("Duration task failed: {0}")]
    TaskFailed(String),
}

/// Walks the stream frame by frame and returns the summed playback time in
/// whole seconds (fractions are truncated).
///
/// A frame that cannot be read ends the walk and the time accumulated so far
/// is returned; synthesized audio is frequently cut short and a partial
/// estimate is still useful. Only a stream that cannot be identified at all is
/// an error.
pub fn estimate_duration(audio: &[u8]) -> Result<u64, AudioError> {
    let source = MediaSourceStream::new(Box::new(Cursor::new(audio.to_vec())), Default::default());

    let mut hint = Hint::new();
    hint.with_extension("mp3");

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            source,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AudioError::UnsupportedFormat(e.to_string()))?;
    let mut format = probed.format;

    let (track_id, time_base) = {
        let track = format.default_track().ok_or(AudioError::NoTrack)?;
        let params = &track.codec_params;
        let time_base = params
            .time_base
            .or_else(|| params.sample_rate.map(|rate| TimeBase::new(1, rate)))
            .ok_or(AudioError::NoTrack)?;
        (track.id, time_base)
    };

    let mut total_seconds = 0f64;
    let mut frames = 0u64;
    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }
        let time = time_base.calc_time(packet.dur());
        total_seconds += time.seconds as f64 + time.frac;
        frames += 1;
    }

    log::debug!("Estimated {:.3}s of audio from {} frames", total_seconds, frames);
    Ok(total_seconds as u64)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// MPEG-1 Layer III, 128 kbit/s, 44.1 kHz, no padding, no CRC.
    const FRAME_HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
    const FRAME_LEN: usize = 417;

    /// Builds `count` silent frames of 1152 samples each (~26.12 ms).
    pub(crate) fn silent_mp3(count: usize) -> Vec<u8> {
        let mut frame = vec![0u8; FRAME_LEN];
        frame[..4].copy_from_slice(&FRAME_HEADER);
        frame.repeat(count)
    }

    #[test]
    fn test_sums_frame_durations() {
        // 400 * 1152 / 44100 = 10.45s
        assert_eq!(estimate_duration(&silent_mp3(400)).unwrap(), 10);
    }

    #[test]
    fn test_fractional_seconds_truncate() {
        // 200 * 1152 / 44100 = 5.22s
        assert_eq!(estimate_duration(&silent_mp3(200)).unwrap(), 5);
    }

    #[test]
    fn test_concatenated_streams_add_up() {
        let mut audio = silent_mp3(200);
        audio.extend(silent_mp3(200));
        assert_eq!(estimate_duration(&audio).unwrap(), 10);
    }

    #[test]
    fn test_truncated_stream_returns_partial_duration() {
        let mut audio = silent_mp3(200);
        audio.extend_from_slice(&silent_mp3(1)[..FRAME_LEN / 2]);
        assert_eq!(estimate_duration(&audio).unwrap(), 5);
    }

    #[test]
    fn test_garbage_is_an_error() {
        let garbage = b"definitely not an audio stream".repeat(40);
        assert!(estimate_duration(&garbage).is_err());
        assert!(estimate_duration(&[]).is_err());
    }
}
