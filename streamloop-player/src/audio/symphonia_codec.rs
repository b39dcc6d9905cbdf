//! Frame decoder backed by symphonia
//!
//! Opens an in-memory payload (Ogg Vorbis and every other format symphonia is
//! built with) and serves frames on demand.
//!
//! # Arena use
//!
//! Each decoded packet is converted to interleaved f32 in the arena before it
//! is copied out to the caller, so the arena must hold one full packet:
//! `max_frames_per_packet * channels` samples. `open` reports
//! [`OpenError::OutOfMemory`] when it does not, which is what lets the stream
//! descriptor's probe size the arena per payload.
//!
//! # Seeking
//!
//! Seeks use `SeekMode::Accurate`. The reader lands at or before the requested
//! timestamp; the difference is decoded and discarded so the next frame
//! returned is exactly the one asked for. Timestamps are taken to be in
//! frames, which holds for audio tracks whose time base is `1/sample_rate`.

use crate::audio::arena::Arena;
use crate::audio::codec::{FrameDecoder, OpenError, SeekError};
use crate::audio::types::{AudioFrame, StreamInfo};
use std::io::Cursor;
use std::sync::Arc;
use streamloop_common::time::frames_to_seconds;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{Decoder, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// Packet size assumed when the codec does not declare one (covers Vorbis'
/// largest block)
const FALLBACK_MAX_FRAMES_PER_PACKET: u64 = 8192;

// A decode error in more than 3 consecutive packets ends the stream
const MAX_DECODE_RETRIES: usize = 3;

/// Symphonia format reader + codec pair for one payload
pub struct SymphoniaDecoder {
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    info: StreamInfo,
    length_seconds: f64,

    /// Frames of interleaved PCM the arena can stage
    staging_frames: usize,

    /// Next unread frame in the arena
    pending_offset: usize,

    /// Valid frames in the arena
    pending_frames: usize,

    /// Frames still to discard after an accurate seek landed early
    skip_frames: u64,

    /// Reader hit end of stream or an unrecoverable error
    finished: bool,
}

impl SymphoniaDecoder {
    /// Decode packets until one yields frames, staging them in the arena.
    ///
    /// Returns false at end of stream.
    fn refill(&mut self, arena: &mut Arena) -> bool {
        if self.finished {
            return false;
        }

        let channels = self.info.channel_count as usize;
        let mut decode_errors = 0;

        loop {
            let packet = match self.format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    self.finished = true;
                    return false;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    self.finished = true;
                    return false;
                }
            };

            // Skip packets for other tracks
            if packet.track_id() != self.track_id {
                continue;
            }

            let decoded = match self.decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(e)) => {
                    decode_errors += 1;
                    warn!("Decode error: {}", e);
                    if decode_errors > MAX_DECODE_RETRIES {
                        self.finished = true;
                        return false;
                    }
                    continue;
                }
                Err(e) => {
                    warn!("Decoder failed: {}", e);
                    self.finished = true;
                    return false;
                }
            };
            decode_errors = 0;

            let staging = &mut arena.samples_mut()[..self.staging_frames * channels];
            let frames = stage_interleaved(&decoded, staging, channels);

            let skip = self.skip_frames.min(frames as u64) as usize;
            self.skip_frames -= skip as u64;
            if skip == frames {
                continue;
            }

            self.pending_offset = skip;
            self.pending_frames = frames;
            return true;
        }
    }
}

impl FrameDecoder for SymphoniaDecoder {
    fn open(payload: Arc<[u8]>, arena: &mut Arena) -> Result<Self, OpenError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(payload)), Default::default());

        let probed = symphonia::default::get_probe()
            .format(
                &Hint::new(),
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| OpenError::Fatal(format!("Failed to probe format: {}", e)))?;

        let format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| OpenError::Fatal("No audio track found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let sample_rate = codec_params
            .sample_rate
            .filter(|&rate| rate > 0)
            .ok_or_else(|| OpenError::Fatal("Sample rate not found".to_string()))?;

        let channel_count = codec_params
            .channels
            .map(|c| c.count() as u16)
            .filter(|&count| count > 0)
            .ok_or_else(|| OpenError::Fatal("Channel count not found".to_string()))?;

        let total_frames = codec_params
            .n_frames
            .ok_or_else(|| OpenError::Fatal("Stream length unknown".to_string()))?;

        let decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| OpenError::Fatal(format!("Failed to create decoder: {}", e)))?;

        let staging_frames = decoder
            .codec_params()
            .max_frames_per_packet
            .or(codec_params.max_frames_per_packet)
            .unwrap_or(FALLBACK_MAX_FRAMES_PER_PACKET) as usize;

        let required_samples = staging_frames * channel_count as usize;
        if arena.capacity_samples() < required_samples {
            debug!(
                "Arena of {} bytes cannot stage {} frames x {} channels",
                arena.size_bytes(),
                staging_frames,
                channel_count
            );
            return Err(OpenError::OutOfMemory);
        }

        debug!(
            "Audio format: sample_rate={}, channels={}, frames={}",
            sample_rate, channel_count, total_frames
        );

        Ok(Self {
            format,
            decoder,
            track_id,
            info: StreamInfo {
                channel_count,
                sample_rate,
            },
            length_seconds: frames_to_seconds(total_frames, sample_rate),
            staging_frames,
            pending_offset: 0,
            pending_frames: 0,
            skip_frames: 0,
            finished: false,
        })
    }

    fn stream_info(&self) -> StreamInfo {
        self.info
    }

    fn total_length_seconds(&self) -> f64 {
        self.length_seconds
    }

    fn decode_frames(&mut self, arena: &mut Arena, out: &mut [AudioFrame]) -> usize {
        let channels = self.info.channel_count as usize;
        let mut written = 0;

        while written < out.len() {
            if self.pending_offset >= self.pending_frames {
                if !self.refill(arena) {
                    break;
                }
                continue;
            }

            let count = (self.pending_frames - self.pending_offset).min(out.len() - written);
            let staging = arena.samples();

            for (i, frame) in out[written..written + count].iter_mut().enumerate() {
                let base = (self.pending_offset + i) * channels;
                frame.left = staging[base];
                if channels > 1 {
                    frame.right = staging[base + 1];
                }
            }

            self.pending_offset += count;
            written += count;
        }

        written
    }

    fn seek_to_frame(&mut self, _arena: &mut Arena, frame: u64) -> Result<(), SeekError> {
        let seeked = self
            .format
            .seek(
                SeekMode::Accurate,
                SeekTo::TimeStamp {
                    ts: frame,
                    track_id: self.track_id,
                },
            )
            .map_err(|e| SeekError {
                frame,
                reason: e.to_string(),
            })?;

        self.decoder.reset();
        self.pending_offset = 0;
        self.pending_frames = 0;
        self.finished = false;
        self.skip_frames = seeked.required_ts.saturating_sub(seeked.actual_ts);

        debug!(
            "Seeked to frame {} (landed at {}, skipping {})",
            frame, seeked.actual_ts, self.skip_frames
        );
        Ok(())
    }
}

/// Convert a decoded packet to interleaved f32 in `staging`.
///
/// Returns the number of frames staged.
fn stage_interleaved(decoded: &AudioBufferRef<'_>, staging: &mut [f32], channels: usize) -> usize {
    match decoded {
        AudioBufferRef::U8(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::U16(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::U24(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::U32(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::S8(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::S16(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::S24(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::S32(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::F32(buf) => copy_planes(&**buf, staging, channels),
        AudioBufferRef::F64(buf) => copy_planes(&**buf, staging, channels),
    }
}

fn copy_planes<S>(buf: &AudioBuffer<S>, staging: &mut [f32], channels: usize) -> usize
where
    S: Sample + IntoSample<f32>,
{
    let frames = buf.frames().min(staging.len() / channels);
    if frames < buf.frames() {
        warn!(
            "Packet of {} frames exceeds arena staging of {} frames, truncating",
            buf.frames(),
            frames
        );
    }

    let planes = buf.spec().channels.count().min(channels);
    for ch in 0..planes {
        for (i, &sample) in buf.chan(ch)[..frames].iter().enumerate() {
            staging[i * channels + ch] = sample.into_sample();
        }
    }

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_garbage_payload_is_fatal() {
        let payload: Arc<[u8]> = Arc::from(&b"definitely not an audio stream"[..]);
        let mut arena = Arena::with_size(1 << 20);

        let result = SymphoniaDecoder::open(payload, &mut arena);
        assert!(matches!(result, Err(OpenError::Fatal(_))));
    }

    #[test]
    fn test_empty_payload_is_fatal() {
        let payload: Arc<[u8]> = Arc::from(Vec::new());
        let mut arena = Arena::with_size(1 << 20);

        let result = SymphoniaDecoder::open(payload, &mut arena);
        assert!(matches!(result, Err(OpenError::Fatal(_))));
    }

    // Decoding real streams is covered in tests/symphonia_codec_tests.rs
}
