//! Builds what the rendering engine is handed for one job: the input props
//! of the chat composition plus the encoder settings.

use std::collections::HashMap;

use serde::Serialize;

use super::model::{JobId, RenderPayload, ScriptEntry};

pub const COMPOSITION_ID: &str = "ChatVideo";
pub const CODEC: &str = "h264";
pub const FPS: u32 = 30;

const TYPING_MS_PER_CHAR: u64 = 50;
const MIN_TYPING_FRAMES: u64 = 15;
const BUBBLE_IN_FRAMES: u64 = 15;
const READ_PAUSE_FRAMES: u64 = 30;
const OUTRO_FRAMES: u64 = 60;

const CRF_STANDARD: u8 = 18;
const CRF_HIGH: u8 = 10;

/// Frames needed to play the whole script, typing indicator included.
pub fn duration_in_frames(script: &[ScriptEntry]) -> u64 {
    let frames: u64 = script
        .iter()
        .map(|entry| {
            // UTF-16 units, matching how the composition measures a message.
            let chars = entry.message.encode_utf16().count() as u64;
            let typing = (chars * TYPING_MS_PER_CHAR * FPS as u64).div_ceil(1000);
            BUBBLE_IN_FRAMES + typing.max(MIN_TYPING_FRAMES) + READ_PAUSE_FRAMES
        })
        .sum();
    frames + OUTRO_FRAMES
}

/// Constant rate factor for the encoder; lower means better quality.
pub fn crf_for_quality(quality: Option<&str>) -> u8 {
    match quality {
        Some("high") => CRF_HIGH,
        _ => CRF_STANDARD,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InputProps {
    pub script: Vec<ScriptEntry>,
    pub participants: Vec<String>,
    pub chat_name: Option<String>,
    pub render_id: JobId,
    pub duration_in_frames: u64,
    pub participant_colors: HashMap<String, String>,
    pub resolution: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionDescriptor {
    pub composition_id: &'static str,
    pub codec: &'static str,
    pub fps: u32,
    pub crf: u8,
    pub duration_in_frames: u64,
    pub input_props: InputProps,
}

impl CompositionDescriptor {
    pub fn build(job_id: JobId, payload: &RenderPayload) -> Self {
        let duration_in_frames = duration_in_frames(&payload.script);

        Self {
            composition_id: COMPOSITION_ID,
            codec: CODEC,
            fps: FPS,
            crf: crf_for_quality(payload.quality.as_deref()),
            duration_in_frames,
            input_props: InputProps {
                script: payload.script.clone(),
                participants: payload.participants.clone(),
                chat_name: payload.chat_name.clone(),
                render_id: job_id,
                duration_in_frames,
                participant_colors: payload.participant_colors.clone(),
                resolution: payload.resolution.clone(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry(message: &str) -> ScriptEntry {
        ScriptEntry {
            sender: "Ana".to_string(),
            message: message.to_string(),
        }
    }

    #[test]
    fn empty_script_is_just_the_outro() {
        assert_eq!(duration_in_frames(&[]), 60);
    }

    #[test]
    fn short_messages_use_minimum_typing_time() {
        // 2 chars -> 3 frames of typing, clamped to 15.
        assert_eq!(duration_in_frames(&[entry("hi")]), 15 + 15 + 30 + 60);
    }

    #[test]
    fn long_messages_scale_with_length() {
        // 21 chars * 50ms = 1050ms -> 31.5 frames, rounded up to 32.
        let message = "a".repeat(21);
        assert_eq!(duration_in_frames(&[entry(&message)]), 15 + 32 + 30 + 60);
    }

    #[test]
    fn counts_utf16_units_not_bytes() {
        let ascii = duration_in_frames(&[entry(&"a".repeat(40))]);
        let accented = duration_in_frames(&[entry(&"é".repeat(40))]);
        assert_eq!(ascii, accented);
    }

    #[test]
    fn emoji_outside_bmp_count_twice() {
        // 40 emoji = 80 UTF-16 units -> 4000ms -> 120 frames of typing.
        let message = "😂".repeat(40);
        assert_eq!(duration_in_frames(&[entry(&message)]), 15 + 120 + 30 + 60);
        assert_eq!(
            duration_in_frames(&[entry(&message)]),
            duration_in_frames(&[entry(&"a".repeat(80))])
        );
    }

    #[test]
    fn high_quality_uses_lower_crf() {
        assert_eq!(crf_for_quality(Some("high")), 10);
        assert_eq!(crf_for_quality(Some("standard")), 18);
        assert_eq!(crf_for_quality(None), 18);
        assert!(crf_for_quality(Some("high")) < crf_for_quality(Some("standard")));
    }

    #[test]
    fn descriptor_carries_job_id_and_duration() {
        let payload = RenderPayload {
            script: vec![entry("hello"), entry("world")],
            participants: vec!["Ana".to_string()],
            chat_name: Some("Family".to_string()),
            resolution: Some("1080p".to_string()),
            quality: Some("high".to_string()),
            participant_colors: HashMap::new(),
        };
        let id = Uuid::new_v4();
        let descriptor = CompositionDescriptor::build(id, &payload);

        assert_eq!(descriptor.input_props.render_id, id);
        assert_eq!(descriptor.crf, 10);
        assert_eq!(descriptor.duration_in_frames, duration_in_frames(&payload.script));
        assert_eq!(descriptor.input_props.duration_in_frames, descriptor.duration_in_frames);

        let json = serde_json::to_value(&descriptor.input_props).unwrap();
        assert_eq!(json["chatName"], "Family");
        assert_eq!(json["renderId"], id.to_string());
    }
}
