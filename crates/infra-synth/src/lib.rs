// Resona Infra-Synth - subprocess adapter for the generation capability

pub mod subprocess_synthesizer;

pub use subprocess_synthesizer::{SubprocessSynthesizer, SynthRunnerConfig};
