/*!
    Time-domain tempo stretching without pitch change.
*/

/// Analysis window length in milliseconds.
const SEQUENCE_MS: usize = 82;
/// Span searched for the best-aligned window start, in milliseconds.
const SEEK_WINDOW_MS: usize = 28;
/// Crossfade length between consecutive windows, in milliseconds.
const OVERLAP_MS: usize = 12;

/**
    A WSOLA (waveform-similarity overlap-add) tempo stretcher over
    interleaved f32 samples.

    The stretcher consumes input at `tempo` times the rate it produces
    output, so the emitted sample count is `input_count / tempo` while the
    pitch is preserved: output is assembled from input windows at their
    original sample rate, crossfaded at the most similar alignment found
    within a small seek span.

    The interface mirrors a streaming resampler: feed with
    [`put_samples`](Self::put_samples), drain with
    [`receive_samples`](Self::receive_samples), and call
    [`flush`](Self::flush) once at end of stream. After the flush the
    lifetime output count is exactly `round(total_input / tempo)` frames
    per channel.
*/
pub struct TempoStretcher {
    channels: usize,
    tempo: f64,
    seq_len: usize,
    seek_window: usize,
    overlap: usize,
    /// Pending input, interleaved; the front is the current window origin.
    input: Vec<f32>,
    /// Stretched output waiting to be received, interleaved.
    output: Vec<f32>,
    /// Tail of the previously emitted window, used for alignment and
    /// crossfading.
    prev_tail: Vec<f32>,
    primed: bool,
    /// Fractional part of the input read position.
    in_frac: f64,
    total_in: usize,
    total_emitted: usize,
    flushed: bool,
}

impl TempoStretcher {
    /**
        Create a stretcher for the given stream parameters.

        `tempo` above 1.0 speeds playback up (fewer output samples);
        below 1.0 slows it down.

        # Panics

        Panics if `tempo` is not positive or `channels` is zero.
    */
    pub fn new(sample_rate: u32, channels: usize, tempo: f64) -> Self {
        assert!(tempo > 0.0, "tempo must be positive");
        assert!(channels > 0, "channel count cannot be zero");

        let per_ms = sample_rate as usize / 1000;
        let seq_len = (SEQUENCE_MS * per_ms).max(64);
        let overlap = (OVERLAP_MS * per_ms).max(16).min(seq_len / 4);
        let seek_window = (SEEK_WINDOW_MS * per_ms).max(16);

        Self {
            channels,
            tempo,
            seq_len,
            seek_window,
            overlap,
            input: Vec::new(),
            output: Vec::new(),
            prev_tail: vec![0.0; overlap * channels],
            primed: false,
            in_frac: 0.0,
            total_in: 0,
            total_emitted: 0,
            flushed: false,
        }
    }

    /**
        Feed interleaved samples into the stretcher.

        `interleaved.len()` must be a multiple of the channel count.
    */
    pub fn put_samples(&mut self, interleaved: &[f32]) {
        debug_assert_eq!(interleaved.len() % self.channels, 0);
        self.total_in += interleaved.len() / self.channels;
        self.input.extend_from_slice(interleaved);
        self.process_windows();
    }

    /**
        Move stretched samples into `out`, whole frames only.

        Returns the number of frames (per-channel samples) written;
        `out` receives `frames * channels` values. Returns 0 when no
        output is pending.
    */
    pub fn receive_samples(&mut self, out: &mut [f32]) -> usize {
        let frames = (out.len() / self.channels).min(self.output.len() / self.channels);
        let count = frames * self.channels;
        out[..count].copy_from_slice(&self.output[..count]);
        self.output.drain(..count);
        frames
    }

    /**
        Flush the stretcher at end of stream.

        Feeds silence until every real input sample has been consumed,
        then trims the lifetime output to exactly
        `round(total_input / tempo)` frames.
    */
    pub fn flush(&mut self) {
        if self.flushed {
            return;
        }
        self.flushed = true;

        let target = (self.total_in as f64 / self.tempo).round() as usize;
        while self.total_emitted < target {
            let pad = vec![0.0f32; (self.seek_window + self.seq_len) * self.channels];
            self.input.extend_from_slice(&pad);
            self.process_windows();
        }

        let excess = self.total_emitted - target;
        if excess > 0 {
            // everything past the target is padding silence
            let keep = self.output.len().saturating_sub(excess * self.channels);
            self.output.truncate(keep);
            self.total_emitted = target;
        }
    }

    /**
        Lifetime count of frames emitted (received or still pending).
    */
    pub fn emitted_frames(&self) -> usize {
        self.total_emitted
    }

    /**
        Run the overlap-add loop over every complete window available.
    */
    fn process_windows(&mut self) {
        let ch = self.channels;
        let seq = self.seq_len;
        let overlap = self.overlap;
        let step_out = seq - overlap;
        let step_in = step_out as f64 * self.tempo;
        let needed = (self.seek_window + seq) * ch;

        while self.input.len() >= needed {
            let offset = if self.primed { self.best_offset() } else { 0 };
            let start = offset * ch;
            let window = &self.input[start..start + seq * ch];

            if self.primed {
                // crossfade the window head against the previous tail
                for frame in 0..overlap {
                    let fade = frame as f32 / overlap as f32;
                    for c in 0..ch {
                        let a = self.prev_tail[frame * ch + c];
                        let b = window[frame * ch + c];
                        self.output.push(a * (1.0 - fade) + b * fade);
                    }
                }
                self.output
                    .extend_from_slice(&window[overlap * ch..step_out * ch]);
            } else {
                self.output.extend_from_slice(&window[..step_out * ch]);
                self.primed = true;
            }

            self.prev_tail.clear();
            self.prev_tail.extend_from_slice(&window[step_out * ch..]);
            self.total_emitted += step_out;

            // advance the nominal read position at the tempo rate
            self.in_frac += step_in;
            let advance = (self.in_frac as usize).min(self.input.len() / ch);
            self.in_frac -= advance as f64;
            self.input.drain(..advance * ch);
        }
    }

    /**
        Find the window start within the seek span whose head best matches
        the previous tail, by normalized cross-correlation.
    */
    fn best_offset(&self) -> usize {
        let ch = self.channels;
        let overlap_samples = self.overlap * ch;

        let mut best = 0;
        let mut best_score = f32::NEG_INFINITY;
        for offset in 0..self.seek_window {
            let candidate = &self.input[offset * ch..offset * ch + overlap_samples];
            let mut corr = 0.0f32;
            let mut energy = 1e-9f32;
            for i in 0..overlap_samples {
                corr += self.prev_tail[i] * candidate[i];
                energy += candidate[i] * candidate[i];
            }
            let score = corr / energy.sqrt();
            if score > best_score {
                best_score = score;
                best = offset;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(rate: u32, frames: usize, channels: usize, freq: f32) -> Vec<f32> {
        let mut samples = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let t = i as f32 / rate as f32;
            let value = (2.0 * std::f32::consts::PI * freq * t).sin();
            for _ in 0..channels {
                samples.push(value);
            }
        }
        samples
    }

    fn run(rate: u32, channels: usize, tempo: f64, frames: usize) -> usize {
        let mut stretcher = TempoStretcher::new(rate, channels, tempo);
        let input = sine(rate, frames, channels, 440.0);

        let mut received = 0usize;
        let mut buf = vec![0.0f32; 4096 * channels];
        for chunk in input.chunks(1024 * channels) {
            stretcher.put_samples(chunk);
            loop {
                let n = stretcher.receive_samples(&mut buf);
                if n == 0 {
                    break;
                }
                received += n;
            }
        }

        stretcher.flush();
        loop {
            let n = stretcher.receive_samples(&mut buf);
            if n == 0 {
                break;
            }
            received += n;
        }
        received
    }

    #[test]
    fn double_speed_halves_sample_count() {
        let frames = 44100 * 2;
        let out = run(44100, 2, 2.0, frames);
        assert_eq!(out, frames / 2);
    }

    #[test]
    fn half_speed_doubles_sample_count() {
        let frames = 44100;
        let out = run(44100, 2, 0.5, frames);
        assert_eq!(out, frames * 2);
    }

    #[test]
    fn fractional_tempo_rounds_to_nearest() {
        let frames = 44100;
        let out = run(44100, 1, 1.5, frames);
        assert_eq!(out, (frames as f64 / 1.5).round() as usize);
    }

    #[test]
    fn mono_and_stereo_agree_on_frame_counts() {
        let frames = 22050;
        assert_eq!(run(44100, 1, 2.0, frames), run(44100, 2, 2.0, frames));
    }

    #[test]
    fn flush_without_input_emits_nothing() {
        let mut stretcher = TempoStretcher::new(44100, 2, 1.5);
        stretcher.flush();
        let mut buf = [0.0f32; 64];
        assert_eq!(stretcher.receive_samples(&mut buf), 0);
    }

    #[test]
    fn flush_is_idempotent() {
        let mut stretcher = TempoStretcher::new(44100, 1, 2.0);
        stretcher.put_samples(&sine(44100, 10000, 1, 440.0));
        stretcher.flush();
        let emitted = stretcher.emitted_frames();
        stretcher.flush();
        assert_eq!(stretcher.emitted_frames(), emitted);
        assert_eq!(emitted, 5000);
    }

    #[test]
    fn output_preserves_signal_level() {
        // a stretched sine should stay a full-scale sine, not fade out
        let mut stretcher = TempoStretcher::new(44100, 1, 2.0);
        stretcher.put_samples(&sine(44100, 44100, 1, 440.0));

        let mut buf = vec![0.0f32; 16384];
        let frames = stretcher.receive_samples(&mut buf);
        assert!(frames > 1000);

        let peak = buf[..frames].iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.8, "peak {peak} after stretching");
    }
}
