use compat_mode_config::QualityPreset;

/// The local media pipeline's video quality bounds.
pub trait QualityPipeline {
    fn apply_preferred_quality(&self, value: u32);

    fn apply_max_receiver_quality(&self, value: u32);
}

/// Applies both bounds of a preset, preferred quality first.
pub fn apply_preset(pipeline: &dyn QualityPipeline, preset: QualityPreset) {
    debug!(preferred = preset.preferred, max_receiver = preset.max_receiver, "applying quality preset");
    pipeline.apply_preferred_quality(preset.preferred);
    pipeline.apply_max_receiver_quality(preset.max_receiver);
}
