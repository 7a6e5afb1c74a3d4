/*!
    String-described audio filter bank.

    When speed change is disabled the audio processor can route samples
    through an in-process filter graph instead of the tempo stretcher.
    The graph is described by the same option string syntax the codec
    library's filters use, assembled from a plain options struct.
*/

use ffmpeg_next::{filter, format::Sample, frame::Audio as AudioFrameRaw, ChannelLayout};
use tracing::debug;

use media_types::{MediaError, Result};

/**
    Dynamic range compressor settings.
*/
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompressorSettings {
    /// Level above which compression starts, in dB.
    pub threshold_db: f64,
    /// Compression ratio (e.g. 4.0 for 4:1).
    pub ratio: f64,
    /// Attack time in milliseconds.
    pub attack_ms: f64,
    /// Release time in milliseconds.
    pub release_ms: f64,
}

impl Default for CompressorSettings {
    fn default() -> Self {
        Self {
            threshold_db: -20.0,
            ratio: 4.0,
            attack_ms: 5.0,
            release_ms: 50.0,
        }
    }
}

/**
    Options for the audio filter bank. The default configuration is an
    identity pass-through and builds no graph at all.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct FilterBankConfig {
    /// Linear volume gain; 1.0 leaves levels unchanged.
    pub volume: f64,
    /// Low-pass cutoff frequency in Hz.
    pub lowpass_hz: Option<f64>,
    /// High-pass cutoff frequency in Hz.
    pub highpass_hz: Option<f64>,
    /// Dynamic range compression.
    pub compressor: Option<CompressorSettings>,
    /// Resample target rate in Hz.
    pub resample_hz: Option<u32>,
}

impl Default for FilterBankConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            lowpass_hz: None,
            highpass_hz: None,
            compressor: None,
            resample_hz: None,
        }
    }
}

impl FilterBankConfig {
    /**
        Returns true when no filter is configured and the bank can be
        skipped entirely, leaving samples untouched.
    */
    pub fn is_identity(&self) -> bool {
        self.volume == 1.0
            && self.lowpass_hz.is_none()
            && self.highpass_hz.is_none()
            && self.compressor.is_none()
            && self.resample_hz.is_none()
    }

    /**
        Build the filter chain description string.
    */
    pub fn description(&self) -> String {
        let mut parts = Vec::new();
        if self.volume != 1.0 {
            parts.push(format!("volume={}", self.volume));
        }
        if let Some(freq) = self.lowpass_hz {
            parts.push(format!("lowpass=f={freq}"));
        }
        if let Some(freq) = self.highpass_hz {
            parts.push(format!("highpass=f={freq}"));
        }
        if let Some(c) = self.compressor {
            parts.push(format!(
                "acompressor=threshold={}dB:ratio={}:attack={}:release={}",
                c.threshold_db, c.ratio, c.attack_ms, c.release_ms
            ));
        }
        if let Some(rate) = self.resample_hz {
            parts.push(format!("aresample={rate}"));
        }
        if parts.is_empty() {
            "anull".to_string()
        } else {
            parts.join(",")
        }
    }
}

/**
    A configured filter graph processing interleaved f32 samples.
*/
pub struct FilterBank {
    graph: filter::Graph,
    channels: usize,
    samples_pushed: i64,
}

impl FilterBank {
    /**
        Build and validate the graph for the given stream parameters.
    */
    pub fn new(config: &FilterBankConfig, sample_rate: u32, channels: u16) -> Result<Self> {
        let description = config.description();
        debug!(filter = %description, "building audio filter graph");

        let layout_name = if channels == 1 { "mono" } else { "stereo" };
        let args = format!(
            "time_base=1/{sample_rate}:sample_rate={sample_rate}:sample_fmt=flt:channel_layout={layout_name}"
        );

        let mut graph = filter::Graph::new();
        graph
            .add(
                &filter::find("abuffer")
                    .ok_or_else(|| MediaError::CodecMissing("abuffer".into()))?,
                "in",
                &args,
            )
            .map_err(|e| MediaError::CodecInit(format!("abuffer: {e}")))?;
        graph
            .add(
                &filter::find("abuffersink")
                    .ok_or_else(|| MediaError::CodecMissing("abuffersink".into()))?,
                "out",
                "",
            )
            .map_err(|e| MediaError::CodecInit(format!("abuffersink: {e}")))?;

        graph
            .output("in", 0)
            .and_then(|parser| parser.input("out", 0))
            .and_then(|parser| parser.parse(&description))
            .map_err(|e| MediaError::CodecInit(format!("filter graph '{description}': {e}")))?;
        graph
            .validate()
            .map_err(|e| MediaError::CodecInit(format!("filter graph '{description}': {e}")))?;

        Ok(Self {
            graph,
            channels: channels as usize,
            samples_pushed: 0,
        })
    }

    /**
        Run interleaved samples through the graph and collect whatever it
        emits. Filters buffer internally, so output length can differ
        from input length on any single call.
    */
    pub fn process(&mut self, samples: &[f32], samples_per_channel: usize, sample_rate: u32) -> Result<Vec<f32>> {
        let mut frame = AudioFrameRaw::new(
            Sample::F32(ffmpeg_next::format::sample::Type::Packed),
            samples_per_channel,
            ChannelLayout::default(self.channels as i32),
        );
        frame.set_rate(sample_rate);
        frame.set_pts(Some(self.samples_pushed));
        self.samples_pushed += samples_per_channel as i64;

        let bytes = bytemuck::cast_slice(samples);
        frame.data_mut(0)[..bytes.len()].copy_from_slice(bytes);

        self.graph
            .get("in")
            .ok_or_else(|| MediaError::CodecInit("filter source missing".into()))?
            .source()
            .add(&frame)
            .map_err(|e| MediaError::EncodeSubmit(format!("filter push: {e}")))?;

        self.drain()
    }

    /**
        Signal end of stream to the graph and collect buffered samples.
    */
    pub fn flush(&mut self) -> Result<Vec<f32>> {
        self.graph
            .get("in")
            .ok_or_else(|| MediaError::CodecInit("filter source missing".into()))?
            .source()
            .flush()
            .map_err(|e| MediaError::EncodeSubmit(format!("filter flush: {e}")))?;

        self.drain()
    }

    fn drain(&mut self) -> Result<Vec<f32>> {
        let mut output = Vec::new();
        let mut filtered = AudioFrameRaw::empty();

        while self
            .graph
            .get("out")
            .ok_or_else(|| MediaError::CodecInit("filter sink missing".into()))?
            .sink()
            .frame(&mut filtered)
            .is_ok()
        {
            append_interleaved(&filtered, self.channels, &mut output);
        }

        Ok(output)
    }
}

/**
    Append a filtered frame's samples to `output` as interleaved f32,
    handling both packed and planar float layouts coming out of the
    graph.
*/
fn append_interleaved(frame: &AudioFrameRaw, channels: usize, output: &mut Vec<f32>) {
    let samples = frame.samples();
    let read_f32 = |bytes: &[u8], index: usize| {
        let offset = index * 4;
        f32::from_ne_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ])
    };

    if frame.is_planar() && channels > 1 {
        let planes: Vec<&[u8]> = (0..channels).map(|ch| frame.data(ch)).collect();
        for s in 0..samples {
            for plane in &planes {
                output.push(read_f32(plane, s));
            }
        }
    } else {
        let data = frame.data(0);
        for i in 0..samples * channels {
            output.push(read_f32(data, i));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_identity() {
        let config = FilterBankConfig::default();
        assert!(config.is_identity());
        assert_eq!(config.description(), "anull");
    }

    #[test]
    fn volume_only_description() {
        let config = FilterBankConfig {
            volume: 0.5,
            ..Default::default()
        };
        assert!(!config.is_identity());
        assert_eq!(config.description(), "volume=0.5");
    }

    #[test]
    fn chained_description_keeps_order() {
        let config = FilterBankConfig {
            volume: 1.2,
            lowpass_hz: Some(8000.0),
            highpass_hz: Some(120.0),
            ..Default::default()
        };
        assert_eq!(
            config.description(),
            "volume=1.2,lowpass=f=8000,highpass=f=120"
        );
    }

    #[test]
    fn compressor_description() {
        let config = FilterBankConfig {
            compressor: Some(CompressorSettings::default()),
            ..Default::default()
        };
        assert_eq!(
            config.description(),
            "acompressor=threshold=-20dB:ratio=4:attack=5:release=50"
        );
    }

    #[test]
    fn resample_description() {
        let config = FilterBankConfig {
            resample_hz: Some(48000),
            ..Default::default()
        };
        assert!(!config.is_identity());
        assert_eq!(config.description(), "aresample=48000");
    }
}
