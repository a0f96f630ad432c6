// src/prompts.rs - Prompt builders and response parsers. Everything here is
// pure: form data in, (system, user) prompt pair or parsed record out.
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pipeline::GenerationOptions;

lazy_static! {
    // Strips markdown code fences the models like to wrap JSON answers in.
    static ref FENCE_RE: Regex = Regex::new(r"```json|```").unwrap();
}

pub const VIDEO_PROMPT_SYSTEM: &str = "You are an expert video prompt engineer. \
Create a detailed, production-ready video generation prompt from the user's \
preferences. Describe the subject, camera work, lighting, pacing, and \
atmosphere in vivid, concrete language. Respond with the prompt text only.";

pub const IMAGE_TO_VIDEO_SYSTEM: &str = "Create a detailed video prompt based on \
image analysis and user preferences. Generate a comprehensive prompt for video \
generation that brings the static image to life.";

pub const IMAGE_ANALYSIS_SYSTEM: &str = "Analyze this image and provide detailed information for video generation:
1. Main subjects and objects
2. Scene composition and layout
3. Lighting conditions and mood
4. Colors and visual style
5. Suggested camera angles and movements
6. Potential story elements or narrative
7. Technical video specifications recommendations

Return analysis in JSON format with these fields: subjects, composition, lighting, colors, style, cameraWork, narrative, technical.";

pub const VIDEO_SPECS_SYSTEM: &str = "Analyze the video prompt and create detailed \
video specifications. Return JSON with title, description, visual_style, mood, \
and scenes array.";

/// Builds the (system, user) pair for the main generator form.
pub fn video_prompt_request(options: &GenerationOptions) -> (String, String) {
    let topic = options.topic.as_deref().unwrap_or("an original subject");
    let user = format!(
        "Create a video generation prompt with these preferences:\n\
- Topic: {}\n\
- Style: {}\n\
- Duration: {}\n\
- Mood: {}\n\
- Quality: {}",
        topic, options.style, options.duration, options.mood, options.quality
    );
    (VIDEO_PROMPT_SYSTEM.to_string(), user)
}

/// Image analysis record as returned by the vision call (or its fallback).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageAnalysis {
    pub subjects: String,
    pub composition: String,
    pub lighting: String,
    pub colors: String,
    pub style: String,
    pub camera_work: String,
    pub narrative: String,
    pub technical: String,
}

impl Default for ImageAnalysis {
    fn default() -> Self {
        fallback_image_analysis()
    }
}

/// The fixed record used whenever the remote analysis path fails.
pub fn fallback_image_analysis() -> ImageAnalysis {
    ImageAnalysis {
        subjects: "Image contains visual elements suitable for video generation".to_string(),
        composition: "Standard composition with balanced elements".to_string(),
        lighting: "Adequate lighting conditions detected".to_string(),
        colors: "Natural color palette".to_string(),
        style: "Suitable for various video styles".to_string(),
        camera_work: "Multiple camera angles possible".to_string(),
        narrative: "Story potential available".to_string(),
        technical: "Compatible with standard video specifications".to_string(),
    }
}

/// Parses the model's analysis answer. Fences are stripped, non-string
/// fields are stringified, missing fields become "Not specified". A body
/// that is not JSON at all degrades to a partial record carrying the first
/// hundred characters of the answer.
pub fn parse_image_analysis(raw: &str) -> ImageAnalysis {
    let stripped = FENCE_RE.replace_all(raw, "");
    let stripped = stripped.trim();

    let map: serde_json::Map<String, Value> = match serde_json::from_str(stripped) {
        Ok(map) => map,
        Err(_) => {
            let mut analysis = fallback_image_analysis();
            analysis.subjects = "Analysis available".to_string();
            analysis.composition = raw.chars().take(100).collect();
            return analysis;
        }
    };

    let field = |key: &str| -> String {
        match map.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => "Not specified".to_string(),
            Some(other) => other.to_string(),
        }
    };

    ImageAnalysis {
        subjects: field("subjects"),
        composition: field("composition"),
        lighting: field("lighting"),
        colors: field("colors"),
        style: field("style"),
        camera_work: field("cameraWork"),
        narrative: field("narrative"),
        technical: field("technical"),
    }
}

/// Preferences for animating a still image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ImageToVideoPrefs {
    pub style: String,
    pub duration: String,
    pub camera_movement: String,
    pub mood: String,
}

impl Default for ImageToVideoPrefs {
    fn default() -> Self {
        Self {
            style: "cinematic".to_string(),
            duration: "10s".to_string(),
            camera_movement: "smooth pan".to_string(),
            mood: "cinematic".to_string(),
        }
    }
}

pub fn image_to_video_request(
    analysis: &ImageAnalysis,
    prefs: &ImageToVideoPrefs,
) -> (String, String) {
    let analysis_json =
        serde_json::to_string_pretty(analysis).unwrap_or_else(|_| "{}".to_string());
    let user = format!(
        "Based on this image analysis:\n{}\n\n\
Create a {} video prompt with:\n\
- Duration: {}\n\
- Camera Movement: {}\n\
- Mood: {}\n\
- Style: {}\n\n\
Generate a detailed video prompt that animates this image into a compelling \
video sequence with all technical specifications.",
        analysis_json,
        prefs.style,
        prefs.duration,
        prefs.camera_movement,
        prefs.mood,
        prefs.style
    );
    (IMAGE_TO_VIDEO_SYSTEM.to_string(), user)
}

/// Deterministic image-to-video prompt used when every remote tier fails.
pub fn fallback_image_prompt(analysis: &ImageAnalysis, prefs: &ImageToVideoPrefs) -> String {
    format!(
        "{} video transformation of uploaded image. \
Duration: {} with {} camera movement. \
{} mood with professional video production, attention to detail and cinematic quality. \
Image analysis: {}. Composition: {}.",
        prefs.style,
        prefs.duration,
        prefs.camera_movement,
        prefs.mood,
        analysis.subjects,
        analysis.composition
    )
}

/// Structured specification a preview renderer can work from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoSpecs {
    pub title: String,
    pub description: String,
    pub visual_style: String,
    pub mood: String,
    pub scenes: Vec<String>,
}

impl Default for VideoSpecs {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            visual_style: String::new(),
            mood: String::new(),
            scenes: Vec::new(),
        }
    }
}

pub fn video_specs_request(prompt: &str) -> (String, String) {
    let user = format!(
        "Create video specifications for: \"{}\"\n\n\
Format:\n\
{{\n\
  \"title\": \"Short video title\",\n\
  \"description\": \"Detailed description\",\n\
  \"visual_style\": \"realistic/cinematic/animated\",\n\
  \"mood\": \"dramatic/calm/energetic\",\n\
  \"scenes\": [\"scene 1\", \"scene 2\"]\n\
}}",
        prompt
    );
    (VIDEO_SPECS_SYSTEM.to_string(), user)
}

/// Deterministic spec record for when the remote answer is unusable.
pub fn fallback_video_specs(prompt: &str) -> VideoSpecs {
    VideoSpecs {
        title: "Generated Video".to_string(),
        description: format!("Video created from prompt: {}", prompt),
        visual_style: "realistic".to_string(),
        mood: "neutral".to_string(),
        scenes: vec![prompt.chars().take(50).collect()],
    }
}

pub fn parse_video_specs(raw: &str, prompt: &str) -> VideoSpecs {
    let stripped = FENCE_RE.replace_all(raw, "");
    serde_json::from_str(stripped.trim()).unwrap_or_else(|_| fallback_video_specs(prompt))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn video_prompt_embeds_every_form_field() {
        let options = GenerationOptions {
            topic: Some("city timelapse".to_string()),
            style: "documentary".to_string(),
            duration: "60s".to_string(),
            mood: "calm".to_string(),
            quality: "8K".to_string(),
        };
        let (system, user) = video_prompt_request(&options);
        assert_eq!(system, VIDEO_PROMPT_SYSTEM);
        for field in ["city timelapse", "documentary", "60s", "calm", "8K"] {
            assert!(user.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn analysis_parser_strips_fences_and_keeps_strings() {
        let raw = "```json\n{\"subjects\": \"a red fox\", \"cameraWork\": \"slow dolly\"}\n```";
        let analysis = parse_image_analysis(raw);
        assert_eq!(analysis.subjects, "a red fox");
        assert_eq!(analysis.camera_work, "slow dolly");
        assert_eq!(analysis.lighting, "Not specified");
    }

    #[test]
    fn analysis_parser_stringifies_non_string_fields() {
        let raw = "{\"subjects\": [\"fox\", \"forest\"], \"lighting\": {\"kind\": \"soft\"}}";
        let analysis = parse_image_analysis(raw);
        assert!(analysis.subjects.contains("fox"));
        assert!(analysis.lighting.contains("soft"));
    }

    #[test]
    fn analysis_parser_degrades_on_plain_prose() {
        let raw = "The image shows a sunset over the ocean with warm colors.";
        let analysis = parse_image_analysis(raw);
        assert_eq!(analysis.subjects, "Analysis available");
        assert!(analysis.composition.starts_with("The image shows"));
    }

    #[test]
    fn image_to_video_prompt_carries_analysis_and_prefs() {
        let analysis = fallback_image_analysis();
        let prefs = ImageToVideoPrefs {
            style: "anime".to_string(),
            duration: "15s".to_string(),
            camera_movement: "orbit".to_string(),
            mood: "dreamy".to_string(),
        };
        let (_, user) = image_to_video_request(&analysis, &prefs);
        for field in ["anime", "15s", "orbit", "dreamy", &analysis.subjects] {
            assert!(user.contains(field), "missing {}", field);
        }
    }

    #[test]
    fn specs_parser_accepts_fenced_json() {
        let raw = "```json\n{\"title\": \"Fox Run\", \"description\": \"d\", \
\"visual_style\": \"cinematic\", \"mood\": \"calm\", \"scenes\": [\"one\"]}\n```";
        let specs = parse_video_specs(raw, "ignored");
        assert_eq!(specs.title, "Fox Run");
        assert_eq!(specs.scenes, vec!["one".to_string()]);
    }

    #[test]
    fn specs_parser_falls_back_deterministically() {
        let first = parse_video_specs("not json", "a fox running through snow");
        let second = parse_video_specs("still not json", "a fox running through snow");
        assert_eq!(first, second);
        assert_eq!(first.title, "Generated Video");
        assert!(first.description.contains("a fox running through snow"));
        assert_eq!(first.scenes, vec!["a fox running through snow".to_string()]);
    }
}
