/*!
    The audio processing stage.
*/

use media_types::{AudioFrame, ChannelLayout, MediaError, Pts, Result};

use crate::graph::{FilterBank, FilterBankConfig};
use crate::ring::SampleRing;
use crate::tempo::TempoStretcher;

/**
    Configuration for the audio processor.
*/
#[derive(Clone, Debug)]
pub struct AudioProcessorConfig {
    /// Playback speed factor; 1.0 disables tempo stretching.
    pub speed_factor: f64,
    /// Samples per channel the downstream encoder requires per frame.
    pub frame_size: usize,
    /// Optional filter bank, applied only when speed change is disabled.
    pub filters: FilterBankConfig,
}

impl AudioProcessorConfig {
    /**
        A pass-through configuration for the given encoder frame size.
    */
    pub fn passthrough(frame_size: usize) -> Self {
        Self {
            speed_factor: 1.0,
            frame_size,
            filters: FilterBankConfig::default(),
        }
    }
}

/**
    The audio processor: optional tempo stretching or filtering, followed
    by repacketization into exactly the encoder's frame size.

    Output timestamps are the cumulative count of emitted samples at the
    input sample rate, independent of input timing; the tempo change is
    realized entirely in the sample-count axis. Sample values on the
    pass-through path are untouched; only frame boundaries move.
*/
pub struct AudioProcessor {
    sample_rate: u32,
    channels: usize,
    layout: ChannelLayout,
    frame_size: usize,
    tempo: Option<TempoStretcher>,
    filter_bank: Option<FilterBank>,
    ring: SampleRing,
    receive_buf: Vec<f32>,
    frame_buf: Vec<f32>,
    samples_emitted: i64,
}

impl AudioProcessor {
    /**
        Create a processor for the given stream parameters.

        # Panics

        Panics if `frame_size` is zero.
    */
    pub fn new(
        config: &AudioProcessorConfig,
        sample_rate: u32,
        layout: ChannelLayout,
    ) -> Result<Self> {
        assert!(config.frame_size > 0, "encoder frame size cannot be zero");

        let channels = layout.channels() as usize;
        let speed_enabled = config.speed_factor != 1.0;

        let tempo = speed_enabled
            .then(|| TempoStretcher::new(sample_rate, channels, config.speed_factor));
        let filter_bank = if !speed_enabled && !config.filters.is_identity() {
            Some(FilterBank::new(
                &config.filters,
                sample_rate,
                layout.channels(),
            )?)
        } else {
            None
        };

        let frame_samples = config.frame_size * channels;
        Ok(Self {
            sample_rate,
            channels,
            layout,
            frame_size: config.frame_size,
            tempo,
            filter_bank,
            ring: SampleRing::new(config.frame_size, channels),
            receive_buf: vec![0.0; frame_samples],
            frame_buf: vec![0.0; frame_samples],
            samples_emitted: 0,
        })
    }

    /**
        Process one decoded frame, returning zero or more fixed-size
        output frames.

        Only interleaved f32 input is supported; any other layout fails
        the stage.
    */
    pub fn process(&mut self, frame: &AudioFrame) -> Result<Vec<AudioFrame>> {
        let samples = frame.to_f32().ok_or_else(|| {
            MediaError::UnsupportedFormat(format!(
                "audio sample format {:?}, expected f32",
                frame.format
            ))
        })?;

        let mut emitted = Vec::new();
        if self.tempo.is_some() {
            if let Some(tempo) = self.tempo.as_mut() {
                tempo.put_samples(&samples);
            }
            self.drain_stretcher(&mut emitted)?;
        } else {
            let samples = match self.filter_bank.as_mut() {
                Some(bank) => bank.process(&samples, frame.samples, frame.sample_rate)?,
                None => samples,
            };
            self.repacketize(&samples, &mut emitted)?;
        }

        Ok(emitted)
    }

    /**
        Flush at end of stream: drain the stretcher or filter bank, then
        zero-pad whatever partial frame remains in the ring up to the
        full encoder frame size.
    */
    pub fn flush(&mut self) -> Result<Vec<AudioFrame>> {
        let mut emitted = Vec::new();

        if self.tempo.is_some() {
            if let Some(tempo) = self.tempo.as_mut() {
                tempo.flush();
            }
            self.drain_stretcher(&mut emitted)?;
        }

        let residual = match self.filter_bank.as_mut() {
            Some(bank) => bank.flush()?,
            None => Vec::new(),
        };
        if !residual.is_empty() {
            self.repacketize(&residual, &mut emitted)?;
        }

        if self.ring.available() > 0 {
            self.frame_buf.fill(0.0);
            self.ring.read_remainder(&mut self.frame_buf);
            emitted.push(self.make_frame());
        }

        Ok(emitted)
    }

    /**
        Cumulative emitted sample count, which is also the pts the next
        output frame will carry.
    */
    pub fn samples_emitted(&self) -> i64 {
        self.samples_emitted
    }

    /**
        Pull everything the stretcher has ready through the ring.
    */
    fn drain_stretcher(&mut self, emitted: &mut Vec<AudioFrame>) -> Result<()> {
        loop {
            let frames = match self.tempo.as_mut() {
                Some(tempo) => tempo.receive_samples(&mut self.receive_buf),
                None => 0,
            };
            if frames == 0 {
                return Ok(());
            }
            let count = frames * self.channels;
            if !self.ring.write(&self.receive_buf[..count]) {
                return Err(MediaError::BufferOverflow(
                    "audio repacketizer rejected stretched samples".into(),
                ));
            }
            self.drain_ring(emitted);
        }
    }

    /**
        Write interleaved samples through the ring in frame-sized chunks,
        draining full frames as they complete.
    */
    fn repacketize(&mut self, samples: &[f32], emitted: &mut Vec<AudioFrame>) -> Result<()> {
        for chunk in samples.chunks(self.frame_size * self.channels) {
            if !self.ring.write(chunk) {
                return Err(MediaError::BufferOverflow(
                    "audio repacketizer rejected samples".into(),
                ));
            }
            self.drain_ring(emitted);
        }
        Ok(())
    }

    fn drain_ring(&mut self, emitted: &mut Vec<AudioFrame>) {
        while self.ring.read_frame(&mut self.frame_buf) {
            emitted.push(self.make_frame());
        }
    }

    fn make_frame(&mut self) -> AudioFrame {
        let frame = AudioFrame::from_f32(
            &self.frame_buf,
            self.frame_size,
            self.sample_rate,
            self.layout,
            Some(Pts(self.samples_emitted)),
        );
        self.samples_emitted += self.frame_size as i64;
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME_SIZE: usize = 1536;

    fn input_frame(samples: usize, value: f32) -> AudioFrame {
        let interleaved = vec![value; samples * 2];
        AudioFrame::from_f32(&interleaved, samples, 44100, ChannelLayout::Stereo, None)
    }

    fn passthrough_processor() -> AudioProcessor {
        AudioProcessor::new(
            &AudioProcessorConfig::passthrough(FRAME_SIZE),
            44100,
            ChannelLayout::Stereo,
        )
        .unwrap()
    }

    #[test]
    fn repacketizes_to_encoder_frame_size() {
        let mut processor = passthrough_processor();

        // 1000 + 1000 samples: one full 1536 frame plus 464 buffered
        let mut emitted = processor.process(&input_frame(1000, 0.5)).unwrap();
        assert!(emitted.is_empty());
        emitted = processor.process(&input_frame(1000, 0.5)).unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].samples, FRAME_SIZE);
        assert_eq!(emitted[0].pts, Some(Pts(0)));

        let tail = processor.flush().unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].samples, FRAME_SIZE);
        assert_eq!(tail[0].pts, Some(Pts(FRAME_SIZE as i64)));
    }

    #[test]
    fn flush_zero_pads_the_tail() {
        let mut processor = passthrough_processor();
        processor.process(&input_frame(100, 1.0)).unwrap();

        let tail = processor.flush().unwrap();
        assert_eq!(tail.len(), 1);

        let samples = tail[0].to_f32().unwrap();
        assert_eq!(samples.len(), FRAME_SIZE * 2);
        assert!(samples[..200].iter().all(|&s| s == 1.0));
        assert!(samples[200..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn pts_is_cumulative_sample_count() {
        let mut processor = passthrough_processor();

        let mut emitted = Vec::new();
        for _ in 0..5 {
            emitted.extend(processor.process(&input_frame(FRAME_SIZE, 0.25)).unwrap());
        }

        assert_eq!(emitted.len(), 5);
        for (index, frame) in emitted.iter().enumerate() {
            assert_eq!(frame.pts, Some(Pts((index * FRAME_SIZE) as i64)));
        }
        assert_eq!(processor.samples_emitted(), 5 * FRAME_SIZE as i64);
    }

    #[test]
    fn passthrough_preserves_sample_values() {
        let mut processor = passthrough_processor();

        let mut collected = Vec::new();
        for frame in processor.process(&input_frame(FRAME_SIZE, 0.75)).unwrap() {
            collected.extend(frame.to_f32().unwrap());
        }

        assert_eq!(collected.len(), FRAME_SIZE * 2);
        assert!(collected.iter().all(|&s| s == 0.75));
    }

    #[test]
    fn double_speed_emits_half_the_samples() {
        let config = AudioProcessorConfig {
            speed_factor: 2.0,
            frame_size: FRAME_SIZE,
            filters: FilterBankConfig::default(),
        };
        let mut processor = AudioProcessor::new(&config, 44100, ChannelLayout::Stereo).unwrap();

        let total_in = 44100 * 2;
        let mut frames = Vec::new();
        for _ in 0..(total_in / 1024) {
            frames.extend(processor.process(&input_frame(1024, 0.1)).unwrap());
        }
        frames.extend(processor.flush().unwrap());

        // 88064 input samples stretch to 44032, packaged in 1536-sample
        // frames with the tail zero-padded
        let consumed = (total_in / 1024) * 1024;
        let expected_samples = consumed / 2;
        let expected_frames = expected_samples.div_ceil(FRAME_SIZE);
        assert_eq!(frames.len(), expected_frames);
        assert!(frames.iter().all(|f| f.samples == FRAME_SIZE));
        assert_eq!(
            processor.samples_emitted(),
            (expected_frames * FRAME_SIZE) as i64
        );
    }

    #[test]
    fn half_speed_emits_double_the_samples() {
        let config = AudioProcessorConfig {
            speed_factor: 0.5,
            frame_size: FRAME_SIZE,
            filters: FilterBankConfig::default(),
        };
        let mut processor = AudioProcessor::new(&config, 44100, ChannelLayout::Stereo).unwrap();

        let total_in = 44100;
        let mut frames = Vec::new();
        for _ in 0..(total_in / 1050) {
            frames.extend(processor.process(&input_frame(1050, 0.2)).unwrap());
        }
        frames.extend(processor.flush().unwrap());

        let consumed = (total_in / 1050) * 1050;
        let expected_frames = (consumed * 2).div_ceil(FRAME_SIZE);
        assert_eq!(frames.len(), expected_frames);
    }

    #[test]
    fn rejects_non_float_input() {
        use media_types::SampleFormat;

        let mut processor = passthrough_processor();
        let frame = AudioFrame::new(
            vec![0u8; 400],
            100,
            44100,
            ChannelLayout::Stereo,
            SampleFormat::S16,
            None,
        );

        let result = processor.process(&frame);
        assert!(matches!(result, Err(MediaError::UnsupportedFormat(_))));
    }

    #[test]
    fn empty_stream_flushes_to_nothing() {
        let mut processor = passthrough_processor();
        assert!(processor.flush().unwrap().is_empty());
    }
}
