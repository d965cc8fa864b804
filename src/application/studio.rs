//! Studio presets: the fixed text the chat surfaces and the enhancer send
//! or show.
//!
//! The consultant preamble is provider configuration, not logic. It must reach
//! the provider's instruction channel byte for byte.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::foundation::ValidationError;
use crate::ports::GenerationParams;

/// System preamble shared by both chat surfaces.
pub const CONSULTANT_PREAMBLE: &str = r#"You are a professional AI Video Editing Consultant and Client Support Agent for Inertix Studio, a high-end video editing house led by a visionary editor.

Your goal is to understand client needs, recommend services, and convert visitors into leads.

TONE:
Confident, Clear, Friendly but professional. Zero fluff, straight answers.

SERVICES OFFERED:
- YouTube Long-Form Editing
- YouTube Shorts / Reels / TikToks
- Instagram Reels Editing
- Gaming Montages
- Cinematic Edits
- Brand / Promo Videos
- Talking-Head Videos
- Ads & Commercial Edits

CORE BEHAVIOR:
1. Greeting: Start by asking what kind of video they are planning and where they want to post it.
2. Understand: Ask max 3 smart questions (Purpose, Platform, Length, Deadline).
3. Recommend: Suggest an editing style, format, and estimated timeline.
4. Convert: Always end with a call to action like "Want to start your project now?" or "Ready to move forward?".

FAQ KNOWLEDGE:
- Pricing: Depends on length, complexity, and turnaround. Exact quotes provided after details are shared.
- Timelines: Shorts (24-72h), YouTube (3-7 days), Ads (5-10 days).
- Revisions: 2 standard revisions included.
- Tools: Premiere Pro, After Effects, DaVinci Resolve.

DO NOT mention being an AI unless directly asked. Focus on saving the editor's time and providing elite service."#;

/// Greeting seeded into the floating chat widget.
pub const WIDGET_OPENING: &str =
    "Welcome to the Inertix Archive. I am your studio agent. How can I assist your vision today?";

/// Greeting seeded into the about-page consultant panel.
pub const PANEL_OPENING: &str = "Hey! I\u{2019}m the editing assistant here at Inertix. Tell me what kind of video you\u{2019}re planning and where you want to post it.";

/// Assistant turn appended when a chat exchange fails.
pub const CHAT_FALLBACK: &str = "Transmission error. Please check your connection.";

/// Result returned when an enhancement fails.
pub const ENHANCE_FALLBACK: &str = "Failed to synthesize description.";

/// Temperature used for consultant conversations.
pub const CHAT_TEMPERATURE: f32 = 0.7;

/// Reasoning budget used for consultant conversations.
pub const CHAT_THINKING_BUDGET: u32 = 32768;

// Continuation lines keep their trailing spaces and four-space indent.
const ENHANCE_INSTRUCTION: &str = "Enhance and polish the following video description for a professional video editing studio portfolio. \n    \
     Make it cinematic, high-end, and technical yet evocative. \n    \
     Keep it concise (1-2 sentences). Return ONLY the enhanced text.";

/// Builds the single rewriting prompt sent for a raw description.
pub fn enhancement_prompt(raw_text: &str) -> String {
    format!("{}\n\n    Description: {}", ENHANCE_INSTRUCTION, raw_text)
}

/// Generation parameters for consultant conversations.
pub fn chat_params() -> GenerationParams {
    GenerationParams::default()
        .with_temperature(CHAT_TEMPERATURE)
        .with_thinking_budget(CHAT_THINKING_BUDGET)
}

/// The chat surfaces of the studio site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Surface {
    /// Floating chat bot in the corner of every page.
    #[default]
    Widget,
    /// Consultant panel embedded in the about section.
    Panel,
}

impl Surface {
    pub fn opening_text(self) -> &'static str {
        match self {
            Surface::Widget => WIDGET_OPENING,
            Surface::Panel => PANEL_OPENING,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Surface::Widget => write!(f, "widget"),
            Surface::Panel => write!(f, "panel"),
        }
    }
}

impl FromStr for Surface {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "widget" => Ok(Surface::Widget),
            "panel" => Ok(Surface::Panel),
            other => Err(ValidationError::invalid_format(
                "surface",
                format!("expected 'widget' or 'panel', got '{}'", other),
            )),
        }
    }
}

/// Everything that distinguishes one chat surface from another.
///
/// Both surfaces run the same session mechanics; only this data differs.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceProfile {
    pub surface: Surface,
    pub opening_text: String,
    pub system_preamble: Option<String>,
    pub params: GenerationParams,
    pub fallback_text: String,
}

impl SurfaceProfile {
    /// Profile for a surface with the studio defaults.
    pub fn for_surface(surface: Surface) -> Self {
        Self {
            surface,
            opening_text: surface.opening_text().to_string(),
            system_preamble: Some(CONSULTANT_PREAMBLE.to_string()),
            params: chat_params(),
            fallback_text: CHAT_FALLBACK.to_string(),
        }
    }

    pub fn widget() -> Self {
        Self::for_surface(Surface::Widget)
    }

    pub fn panel() -> Self {
        Self::for_surface(Surface::Panel)
    }

    /// Overrides the generation parameters.
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}
