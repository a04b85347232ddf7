//! Centralized constants for the kiosk agent
//!
//! Single source of truth for thresholds and defaults. Settings structs use
//! these as their `Default` values so code and config files agree.

/// Intent classification
pub mod classification {
    /// Rule confidence above which the statistical model is not consulted
    pub const RULE_OVERRIDE_CONFIDENCE: f32 = 0.8;

    /// Confidence assigned when a token names a menu item
    pub const MENU_TOKEN_CONFIDENCE: f32 = 0.85;

    /// Softmax temperature for the statistical model
    pub const SOFTMAX_TEMPERATURE: f32 = 0.1;

    /// Base weights of the rule groups
    pub const ORDER_WEIGHT: f32 = 0.9;
    pub const OPTION_WEIGHT: f32 = 0.85;
    pub const GREETING_WEIGHT: f32 = 0.95;
    pub const FAREWELL_WEIGHT: f32 = 0.95;
    pub const CASUAL_WEIGHT: f32 = 0.7;
}

/// Order extraction
pub mod extraction {
    /// Utterance-level fuzzy match acceptance
    pub const TOKEN_MATCH_THRESHOLD: f32 = 0.3;

    /// Candidate verification acceptance
    pub const VERIFY_MATCH_THRESHOLD: f32 = 0.5;

    /// Tokens shorter than this (in characters) are ignored
    pub const MIN_TOKEN_CHARS: usize = 2;
}

/// Escalation
pub mod escalation {
    /// Turns classified below this confidence go to the fallback
    pub const MIN_CONFIDENCE: f32 = 0.3;
}

/// Semantic template matching
pub mod semantic {
    pub const SIMILARITY_THRESHOLD: f32 = 0.8;
    pub const TOP_K: usize = 3;
    pub const EMBEDDING_DIM: usize = 256;
}

/// Sessions
pub mod session {
    pub const MAX_SESSIONS: usize = 1000;
    /// Idle age after which the sweep removes a session
    pub const TIMEOUT_SECS: u64 = 3600;
    pub const SWEEP_INTERVAL_SECS: u64 = 300;
    /// History turns included in fallback context
    pub const FALLBACK_HISTORY_TURNS: usize = 10;
}

/// Generative fallback endpoint
pub mod endpoints {
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";
    pub const DEFAULT_MODEL: &str = "gpt-4o";
    pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
}
